//! Presence subscriptions.
//!
//! A [`PresenceSubscriber`] owns at most one platform subscription handle. The handle is
//! released exactly once: by [`PresenceSubscriber::unsubscribe`], or when the subscriber
//! is dropped.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use resenc_core::{
    PresenceEvent, PresenceNotification, PresenceState, ResencError, ResencResult, StackResult,
};

/// Well-known presence resource path appended to the host.
pub const PRESENCE_URI: &str = "/oic/ad";

/// Opaque platform subscription handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PresenceHandle(u64);

impl PresenceHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Transport the platform should use to reach the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityType {
    /// Let the platform choose.
    #[default]
    Default,
    Ip,
    Ipv4,
    Ipv6,
}

/// Receives presence notifications for one subscription.
pub type PresenceCallback = Arc<dyn Fn(&PresenceNotification) + Send + Sync>;

/// Presence primitives provided by the platform stack.
pub trait PresencePlatform: Send + Sync {
    fn subscribe_presence(
        &self,
        host: &str,
        resource_type: Option<&str>,
        connectivity: ConnectivityType,
        callback: PresenceCallback,
    ) -> Result<PresenceHandle, StackResult>;

    fn unsubscribe_presence(&self, handle: PresenceHandle) -> StackResult;
}

/// Presence query a platform issues for `host`, optionally filtered by resource type.
pub fn presence_uri(host: &str, resource_type: Option<&str>) -> String {
    match resource_type {
        Some(rt) if !rt.is_empty() => format!("{}{}?rt={}", host, PRESENCE_URI, rt),
        _ => format!("{}{}", host, PRESENCE_URI),
    }
}

/// Owner of one presence subscription.
pub struct PresenceSubscriber {
    platform: Arc<dyn PresencePlatform>,
    handle: Option<PresenceHandle>,
    state: PresenceState,
}

impl PresenceSubscriber {
    /// An unsubscribed subscriber bound to `platform`.
    pub fn new(platform: Arc<dyn PresencePlatform>) -> Self {
        Self {
            platform,
            handle: None,
            state: PresenceState::Unsubscribed,
        }
    }

    /// Subscribe to presence of every resource on `host`.
    pub fn subscribe<F>(
        platform: Arc<dyn PresencePlatform>,
        host: &str,
        connectivity: ConnectivityType,
        callback: F,
    ) -> ResencResult<Self>
    where
        F: Fn(&PresenceNotification) + Send + Sync + 'static,
    {
        let mut subscriber = Self::new(platform);
        subscriber.resubscribe(host, None, connectivity, callback)?;
        Ok(subscriber)
    }

    /// Subscribe to presence of resources of `resource_type` on `host`.
    pub fn subscribe_with_type<F>(
        platform: Arc<dyn PresencePlatform>,
        host: &str,
        resource_type: &str,
        connectivity: ConnectivityType,
        callback: F,
    ) -> ResencResult<Self>
    where
        F: Fn(&PresenceNotification) + Send + Sync + 'static,
    {
        let mut subscriber = Self::new(platform);
        subscriber.resubscribe(host, Some(resource_type), connectivity, callback)?;
        Ok(subscriber)
    }

    /// Subscribe again, releasing any handle held first.
    pub fn resubscribe<F>(
        &mut self,
        host: &str,
        resource_type: Option<&str>,
        connectivity: ConnectivityType,
        callback: F,
    ) -> ResencResult<()>
    where
        F: Fn(&PresenceNotification) + Send + Sync + 'static,
    {
        self.unsubscribe()?;

        tracing::debug!("Subscribing to {}", presence_uri(host, resource_type));

        match self
            .platform
            .subscribe_presence(host, resource_type, connectivity, Arc::new(callback))
        {
            Ok(handle) => {
                self.state = self.state.on(&PresenceEvent::SubscribeSucceeded)?;
                self.handle = Some(handle);
                Ok(())
            }
            Err(code) => {
                self.state = self.state.on(&PresenceEvent::SubscribeFailed(code))?;
                Err(ResencError::platform(
                    code,
                    format!("subscribe_presence to {} failed", host),
                ))
            }
        }
    }

    /// Release the subscription. Does nothing when not subscribed.
    ///
    /// On platform failure the handle is kept so the call can be retried.
    pub fn unsubscribe(&mut self) -> ResencResult<()> {
        let Some(handle) = self.handle else {
            return Ok(());
        };

        let code = self.platform.unsubscribe_presence(handle);
        if code.is_ok() {
            self.state = self.state.on(&PresenceEvent::UnsubscribeSucceeded)?;
            self.handle = None;
            Ok(())
        } else {
            self.state = self.state.on(&PresenceEvent::UnsubscribeFailed(code))?;
            Err(ResencError::platform(code, "unsubscribe_presence failed"))
        }
    }

    pub fn is_subscribing(&self) -> bool {
        self.handle.is_some()
    }

    pub fn state(&self) -> PresenceState {
        self.state
    }

    pub fn handle(&self) -> Option<PresenceHandle> {
        self.handle
    }

    /// Move the subscription out, leaving `self` unsubscribed on the same platform.
    pub fn take(&mut self) -> Self {
        let state = std::mem::replace(&mut self.state, PresenceState::Unsubscribed);
        Self {
            platform: Arc::clone(&self.platform),
            handle: self.handle.take(),
            state,
        }
    }
}

impl std::fmt::Debug for PresenceSubscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceSubscriber")
            .field("handle", &self.handle)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Drop for PresenceSubscriber {
    fn drop(&mut self) {
        if let Err(e) = self.unsubscribe() {
            tracing::warn!("Dropping presence subscriber: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Platform that records calls and fails on demand.
    #[derive(Default)]
    struct RecordingPlatform {
        next: AtomicU64,
        subscribed: Mutex<Vec<(String, Option<String>)>>,
        unsubscribed: Mutex<Vec<PresenceHandle>>,
        fail_subscribe: Mutex<Option<StackResult>>,
        fail_unsubscribe: Mutex<Option<StackResult>>,
    }

    impl PresencePlatform for RecordingPlatform {
        fn subscribe_presence(
            &self,
            host: &str,
            resource_type: Option<&str>,
            _connectivity: ConnectivityType,
            _callback: PresenceCallback,
        ) -> Result<PresenceHandle, StackResult> {
            if let Some(code) = *self.fail_subscribe.lock().unwrap() {
                return Err(code);
            }
            self.subscribed
                .lock()
                .unwrap()
                .push((host.to_string(), resource_type.map(str::to_string)));
            Ok(PresenceHandle::new(self.next.fetch_add(1, Ordering::SeqCst) + 1))
        }

        fn unsubscribe_presence(&self, handle: PresenceHandle) -> StackResult {
            if let Some(code) = *self.fail_unsubscribe.lock().unwrap() {
                return code;
            }
            self.unsubscribed.lock().unwrap().push(handle);
            StackResult::Ok
        }
    }

    fn platform() -> Arc<RecordingPlatform> {
        Arc::new(RecordingPlatform::default())
    }

    fn subscribe(platform: &Arc<RecordingPlatform>, host: &str) -> PresenceSubscriber {
        PresenceSubscriber::subscribe(platform.clone(), host, ConnectivityType::Default, |_| {})
            .unwrap()
    }

    #[test]
    fn presence_uri_formats() {
        assert_eq!(presence_uri("coap://10.0.0.1", None), "coap://10.0.0.1/oic/ad");
        assert_eq!(
            presence_uri("coap://10.0.0.1", Some("core.light")),
            "coap://10.0.0.1/oic/ad?rt=core.light"
        );
        assert_eq!(presence_uri("coap://10.0.0.1", Some("")), "coap://10.0.0.1/oic/ad");
    }

    #[test]
    fn lifecycle() {
        let platform = platform();
        let mut subscriber = PresenceSubscriber::new(platform.clone());
        assert!(!subscriber.is_subscribing());
        assert_eq!(subscriber.state(), PresenceState::Unsubscribed);

        subscriber
            .resubscribe("coap://host", None, ConnectivityType::Default, |_| {})
            .unwrap();
        assert!(subscriber.is_subscribing());
        assert_eq!(subscriber.state(), PresenceState::Subscribed);

        subscriber.unsubscribe().unwrap();
        assert!(!subscriber.is_subscribing());
        assert_eq!(platform.unsubscribed.lock().unwrap().len(), 1);

        // Second unsubscribe is a no-op.
        subscriber.unsubscribe().unwrap();
        assert_eq!(platform.unsubscribed.lock().unwrap().len(), 1);
    }

    #[test]
    fn parameterized_constructors_subscribe() {
        let platform = platform();
        let all = PresenceSubscriber::subscribe(
            platform.clone(),
            "coap://a",
            ConnectivityType::Ip,
            |_| {},
        )
        .unwrap();
        let typed = PresenceSubscriber::subscribe_with_type(
            platform.clone(),
            "coap://b",
            "core.light",
            ConnectivityType::Ipv4,
            |_| {},
        )
        .unwrap();

        assert!(all.is_subscribing());
        assert!(typed.is_subscribing());
        assert_eq!(
            *platform.subscribed.lock().unwrap(),
            vec![
                ("coap://a".to_string(), None),
                ("coap://b".to_string(), Some("core.light".to_string())),
            ]
        );
    }

    #[test]
    fn subscribe_failure_carries_code() {
        let platform = platform();
        *platform.fail_subscribe.lock().unwrap() = Some(StackResult::CommunicationError);

        let err = PresenceSubscriber::subscribe(
            platform.clone(),
            "coap://a",
            ConnectivityType::Default,
            |_| {},
        )
        .unwrap_err();
        match err {
            ResencError::PlatformSubscription { code, .. } => {
                assert_eq!(code, StackResult::CommunicationError)
            }
            other => panic!("unexpected error: {other}"),
        }

        let mut subscriber = PresenceSubscriber::new(platform);
        assert!(subscriber
            .resubscribe("coap://a", None, ConnectivityType::Default, |_| {})
            .is_err());
        assert!(!subscriber.is_subscribing());
        assert!(subscriber.handle().is_none());
    }

    #[test]
    fn unsubscribe_failure_keeps_handle() {
        let platform = platform();
        let mut subscriber = subscribe(&platform, "coap://a");

        *platform.fail_unsubscribe.lock().unwrap() = Some(StackResult::NoResource);
        let err = subscriber.unsubscribe().unwrap_err();
        assert!(matches!(
            err,
            ResencError::PlatformSubscription { code: StackResult::NoResource, .. }
        ));
        assert!(subscriber.is_subscribing());

        *platform.fail_unsubscribe.lock().unwrap() = None;
        subscriber.unsubscribe().unwrap();
        assert!(!subscriber.is_subscribing());
    }

    #[test]
    fn drop_unsubscribes_and_swallows_failure() {
        let platform = platform();
        {
            let _subscriber = subscribe(&platform, "coap://a");
        }
        assert_eq!(platform.unsubscribed.lock().unwrap().len(), 1);

        let subscriber = subscribe(&platform, "coap://a");
        *platform.fail_unsubscribe.lock().unwrap() = Some(StackResult::Error);
        drop(subscriber);
        assert_eq!(platform.unsubscribed.lock().unwrap().len(), 1);
    }

    #[test]
    fn take_transfers_handle() {
        let platform = platform();
        let mut source = subscribe(&platform, "coap://a");
        let handle = source.handle();

        let destination = source.take();
        assert!(!source.is_subscribing());
        assert_eq!(source.state(), PresenceState::Unsubscribed);
        assert!(destination.is_subscribing());
        assert_eq!(destination.handle(), handle);

        drop(source);
        assert!(platform.unsubscribed.lock().unwrap().is_empty());
        drop(destination);
        assert_eq!(*platform.unsubscribed.lock().unwrap(), vec![handle.unwrap()]);
    }

    #[test]
    fn assignment_releases_previous_subscription() {
        let platform = platform();
        let mut target = subscribe(&platform, "coap://a");
        let old = target.handle().unwrap();

        target = subscribe(&platform, "coap://b");
        assert_eq!(*platform.unsubscribed.lock().unwrap(), vec![old]);
        assert!(target.is_subscribing());
        assert_ne!(target.handle(), Some(old));
    }

    #[test]
    fn resubscribe_releases_held_handle_first() {
        let platform = platform();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut subscriber = PresenceSubscriber::subscribe(
            platform.clone(),
            "coap://a",
            ConnectivityType::Default,
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        )
        .unwrap();
        let first = subscriber.handle().unwrap();

        subscriber
            .resubscribe("coap://a", Some("core.fan"), ConnectivityType::Default, |_| {})
            .unwrap();
        assert_eq!(*platform.unsubscribed.lock().unwrap(), vec![first]);
        assert_ne!(subscriber.handle(), Some(first));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
