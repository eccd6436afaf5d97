//! Presence subscription state automaton.

use serde::{Deserialize, Serialize};

use crate::error::{ResencError, ResencResult, StackResult};

/// Subscription states. Both are resting states; the cycle repeats on explicit calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PresenceState {
    /// No platform handle is held.
    Unsubscribed,
    /// A platform handle is held.
    Subscribed,
}

impl PresenceState {
    pub fn is_subscribed(&self) -> bool {
        matches!(self, Self::Subscribed)
    }

    /// Get valid transitions from current state.
    pub fn valid_transitions(&self) -> &'static [PresenceState] {
        match self {
            Self::Unsubscribed => &[Self::Subscribed],
            Self::Subscribed => &[Self::Unsubscribed],
        }
    }

    /// Check if transition to target state is valid.
    pub fn can_transition_to(&self, target: PresenceState) -> bool {
        self.valid_transitions().contains(&target)
    }

    /// Next state after `event`, or a protocol error if the event cannot happen here.
    pub fn on(self, event: &PresenceEvent) -> ResencResult<PresenceState> {
        let next = match (self, event) {
            (_, PresenceEvent::SubscribeSucceeded) => Self::Subscribed,
            (_, PresenceEvent::UnsubscribeSucceeded) => Self::Unsubscribed,
            // A failed call leaves the state as it was.
            (Self::Unsubscribed, PresenceEvent::SubscribeFailed(_))
            | (Self::Subscribed, PresenceEvent::UnsubscribeFailed(_)) => return Ok(self),
            _ => {
                return Err(ResencError::Protocol(format!(
                    "Invalid presence transition from {:?} on {:?}",
                    self, event
                )));
            }
        };

        if self.can_transition_to(next) {
            tracing::debug!("Presence state: {:?} -> {:?}", self, next);
            Ok(next)
        } else {
            Err(ResencError::Protocol(format!(
                "Invalid presence transition: {:?} -> {:?}",
                self, next
            )))
        }
    }
}

/// Outcomes of platform calls that drive [`PresenceState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceEvent {
    SubscribeSucceeded,
    SubscribeFailed(StackResult),
    UnsubscribeSucceeded,
    UnsubscribeFailed(StackResult),
}
