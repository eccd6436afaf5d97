//! In-process presence platform.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;

use resenc_core::{PresenceNotification, StackResult};

use crate::presence::{
    presence_uri, ConnectivityType, PresenceCallback, PresenceHandle, PresencePlatform,
};

struct Subscription {
    host: String,
    resource_type: Option<String>,
    callback: PresenceCallback,
}

#[derive(Default)]
struct LocalState {
    next_handle: u64,
    subscriptions: HashMap<PresenceHandle, Subscription>,
    subscribe_failure: Option<StackResult>,
    unsubscribe_failure: Option<StackResult>,
}

/// Presence platform that delivers announcements within the process.
///
/// Hosts announce themselves with [`announce`](Self::announce) and leave with
/// [`stop`](Self::stop). Failures can be scripted to exercise error paths.
#[derive(Default)]
pub struct LocalPresencePlatform {
    state: Mutex<LocalState>,
}

impl LocalPresencePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LocalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every subscribe call fail with `code` until cleared with `None`.
    pub fn set_subscribe_failure(&self, code: Option<StackResult>) {
        self.state().subscribe_failure = code;
    }

    /// Make every unsubscribe call fail with `code` until cleared with `None`.
    pub fn set_unsubscribe_failure(&self, code: Option<StackResult>) {
        self.state().unsubscribe_failure = code;
    }

    pub fn subscription_count(&self) -> usize {
        self.state().subscriptions.len()
    }

    /// Deliver a live beacon from `host`. Returns how many subscribers were notified.
    ///
    /// Subscriptions filtered by resource type only see beacons for that type.
    pub fn announce(&self, host: &str, resource_type: Option<&str>, nonce: u32) -> usize {
        let notification = PresenceNotification {
            host: host.to_string(),
            resource_type: resource_type.map(str::to_string),
            result: StackResult::Ok,
            nonce,
            timestamp: Utc::now(),
        };

        self.deliver(&notification, |sub| match (&sub.resource_type, resource_type) {
            (None, _) => true,
            (Some(wanted), Some(rt)) => wanted == rt,
            (Some(_), None) => false,
        })
    }

    /// Tell every subscriber of `host` that it stopped advertising presence.
    pub fn stop(&self, host: &str) -> usize {
        let notification = PresenceNotification {
            host: host.to_string(),
            resource_type: None,
            result: StackResult::PresenceStopped,
            nonce: 0,
            timestamp: Utc::now(),
        };

        self.deliver(&notification, |_| true)
    }

    fn deliver<F>(&self, notification: &PresenceNotification, filter: F) -> usize
    where
        F: Fn(&Subscription) -> bool,
    {
        // Callbacks run without the lock so they may call back into the platform.
        let callbacks: Vec<PresenceCallback> = self
            .state()
            .subscriptions
            .values()
            .filter(|&sub| sub.host == notification.host && filter(sub))
            .map(|sub| sub.callback.clone())
            .collect();

        for callback in &callbacks {
            callback(notification);
        }

        tracing::debug!(
            "Delivered {} presence from {} to {} subscriber(s)",
            notification.result,
            notification.host,
            callbacks.len()
        );
        callbacks.len()
    }
}

impl PresencePlatform for LocalPresencePlatform {
    fn subscribe_presence(
        &self,
        host: &str,
        resource_type: Option<&str>,
        _connectivity: ConnectivityType,
        callback: PresenceCallback,
    ) -> Result<PresenceHandle, StackResult> {
        let mut state = self.state();

        if let Some(code) = state.subscribe_failure {
            return Err(code);
        }
        if host.is_empty() {
            return Err(StackResult::InvalidUri);
        }

        state.next_handle += 1;
        let handle = PresenceHandle::new(state.next_handle);
        state.subscriptions.insert(
            handle,
            Subscription {
                host: host.to_string(),
                resource_type: resource_type.filter(|rt| !rt.is_empty()).map(str::to_string),
                callback,
            },
        );

        tracing::debug!(
            "Presence subscription {} on {}",
            handle.id(),
            presence_uri(host, resource_type)
        );
        Ok(handle)
    }

    fn unsubscribe_presence(&self, handle: PresenceHandle) -> StackResult {
        let mut state = self.state();

        if let Some(code) = state.unsubscribe_failure {
            return code;
        }

        match state.subscriptions.remove(&handle) {
            Some(_) => StackResult::Ok,
            None => StackResult::NoResource,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use resenc_core::ResencError;

    use crate::presence::PresenceSubscriber;

    type Seen = Arc<Mutex<Vec<(StackResult, u32, String)>>>;

    fn recorder() -> (Seen, impl Fn(&PresenceNotification) + Send + Sync + 'static) {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback = move |n: &PresenceNotification| {
            sink.lock()
                .unwrap()
                .push((n.result, n.nonce, n.host.clone()));
        };
        (seen, callback)
    }

    #[test]
    fn announce_reaches_host_subscribers() {
        let platform = Arc::new(LocalPresencePlatform::new());
        let (seen, callback) = recorder();
        let _subscriber = PresenceSubscriber::subscribe(
            platform.clone(),
            "coap://10.0.0.2",
            ConnectivityType::Default,
            callback,
        )
        .unwrap();

        assert_eq!(platform.announce("coap://10.0.0.2", Some("core.light"), 7), 1);
        assert_eq!(platform.announce("coap://10.0.0.9", None, 8), 0);
        assert_eq!(platform.stop("coap://10.0.0.2"), 1);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (StackResult::Ok, 7, "coap://10.0.0.2".to_string()),
                (StackResult::PresenceStopped, 0, "coap://10.0.0.2".to_string()),
            ]
        );
    }

    #[test]
    fn resource_type_filters_beacons() {
        let platform = Arc::new(LocalPresencePlatform::new());
        let (seen, callback) = recorder();
        let _subscriber = PresenceSubscriber::subscribe_with_type(
            platform.clone(),
            "coap://h",
            "core.light",
            ConnectivityType::Default,
            callback,
        )
        .unwrap();

        assert_eq!(platform.announce("coap://h", Some("core.fan"), 1), 0);
        assert_eq!(platform.announce("coap://h", None, 2), 0);
        assert_eq!(platform.announce("coap://h", Some("core.light"), 3), 1);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn dropped_subscriber_stops_receiving() {
        let platform = Arc::new(LocalPresencePlatform::new());
        let (seen, callback) = recorder();
        let subscriber = PresenceSubscriber::subscribe(
            platform.clone(),
            "coap://h",
            ConnectivityType::Ip,
            callback,
        )
        .unwrap();
        assert_eq!(platform.subscription_count(), 1);

        drop(subscriber);
        assert_eq!(platform.subscription_count(), 0);
        assert_eq!(platform.announce("coap://h", None, 1), 0);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn empty_host_is_invalid_uri() {
        let platform = Arc::new(LocalPresencePlatform::new());
        let err = PresenceSubscriber::subscribe(platform, "", ConnectivityType::Default, |_| {})
            .unwrap_err();
        assert!(matches!(
            err,
            ResencError::PlatformSubscription { code: StackResult::InvalidUri, .. }
        ));
    }

    #[test]
    fn scripted_failures() {
        let platform = Arc::new(LocalPresencePlatform::new());

        platform.set_subscribe_failure(Some(StackResult::CommunicationError));
        assert!(PresenceSubscriber::subscribe(
            platform.clone(),
            "coap://h",
            ConnectivityType::Default,
            |_| {}
        )
        .is_err());
        assert_eq!(platform.subscription_count(), 0);

        platform.set_subscribe_failure(None);
        let mut subscriber = PresenceSubscriber::subscribe(
            platform.clone(),
            "coap://h",
            ConnectivityType::Default,
            |_| {},
        )
        .unwrap();

        platform.set_unsubscribe_failure(Some(StackResult::Error));
        assert!(subscriber.unsubscribe().is_err());
        assert!(subscriber.is_subscribing());
        assert_eq!(platform.subscription_count(), 1);

        platform.set_unsubscribe_failure(None);
        subscriber.unsubscribe().unwrap();
        assert_eq!(platform.subscription_count(), 0);
    }

    #[test]
    fn unknown_handle_is_no_resource() {
        let platform = LocalPresencePlatform::new();
        assert_eq!(
            platform.unsubscribe_presence(PresenceHandle::new(42)),
            StackResult::NoResource
        );
    }
}
