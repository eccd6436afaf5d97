//! Server-side resource object: owns an attribute store and answers requests for it.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use resenc_core::{
    AcceptanceMethod, AttributeStore, AttributeValue, Method, ResencResult, ResourceRequest,
    ResourceResponse,
};

use crate::config::ResourceDefaults;
use crate::response::{GetResponse, SetResponse};

/// When attribute changes are pushed to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AutoNotifyPolicy {
    Never,
    Always,
    /// Only when a value was added, changed or removed.
    #[default]
    Updated,
}

/// How a `Default` acceptance method is treated for this resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SetRequestHandlerPolicy {
    /// New keys and kind changes make the request be ignored.
    #[default]
    Never,
    /// Request attributes are applied even with new keys or kind changes.
    Acceptance,
}

/// What a user handler learns about the request it is answering.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestInfo {
    pub request_id: Uuid,
    pub uri: String,
    pub method: Method,
}

impl From<&ResourceRequest> for RequestInfo {
    fn from(request: &ResourceRequest) -> Self {
        Self {
            request_id: request.request_id,
            uri: request.uri.clone(),
            method: request.method,
        }
    }
}

/// Snapshot pushed to in-process observers.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceNotification {
    pub uri: String,
    pub attributes: AttributeStore,
    pub timestamp: DateTime<Utc>,
}

/// User handler for Get requests. It may rewrite the request attributes.
pub type GetHandlerFn = Box<dyn Fn(&RequestInfo, &mut AttributeStore) -> GetResponse + Send + Sync>;

/// User handler for Set requests. Rewritten request attributes are what gets merged.
pub type SetHandlerFn = Box<dyn Fn(&RequestInfo, &mut AttributeStore) -> SetResponse + Send + Sync>;

/// Called with `(old, new)` after a Set request changes the listened key.
pub type AttributeUpdatedListener = Arc<dyn Fn(&AttributeValue, &AttributeValue) + Send + Sync>;

/// Builder for [`ResourceObject`].
pub struct ResourceObjectBuilder {
    uri: String,
    resource_type: String,
    interface: String,
    observable: bool,
    discoverable: bool,
    attributes: AttributeStore,
    defaults: ResourceDefaults,
}

impl ResourceObjectBuilder {
    pub fn set_discoverable(mut self, discoverable: bool) -> Self {
        self.discoverable = discoverable;
        self
    }

    pub fn set_observable(mut self, observable: bool) -> Self {
        self.observable = observable;
        self
    }

    pub fn set_attributes(mut self, attributes: AttributeStore) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_defaults(mut self, defaults: ResourceDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn build(self) -> ResourceObject {
        let (notifier, _) = broadcast::channel(self.defaults.notification_capacity.max(1));

        ResourceObject {
            uri: self.uri,
            resource_type: self.resource_type,
            interface: self.interface,
            observable: self.observable,
            discoverable: self.discoverable,
            attributes: Mutex::new(self.attributes),
            get_handler: None,
            set_handler: None,
            auto_notify_policy: self.defaults.auto_notify_policy,
            set_request_handler_policy: self.defaults.set_request_handler_policy,
            listeners: Mutex::new(HashMap::new()),
            notifier,
        }
    }
}

/// A resource exposed by the server.
///
/// The store lives behind a mutex so concurrent requests against one resource are
/// serialized; the attribute types themselves do no locking.
pub struct ResourceObject {
    uri: String,
    resource_type: String,
    interface: String,
    observable: bool,
    discoverable: bool,
    attributes: Mutex<AttributeStore>,
    get_handler: Option<GetHandlerFn>,
    set_handler: Option<SetHandlerFn>,
    auto_notify_policy: AutoNotifyPolicy,
    set_request_handler_policy: SetRequestHandlerPolicy,
    listeners: Mutex<HashMap<String, AttributeUpdatedListener>>,
    notifier: broadcast::Sender<ResourceNotification>,
}

impl ResourceObject {
    /// Start building a resource. It is observable and discoverable by default.
    pub fn builder(
        uri: impl Into<String>,
        resource_type: impl Into<String>,
        interface: impl Into<String>,
    ) -> ResourceObjectBuilder {
        ResourceObjectBuilder {
            uri: uri.into(),
            resource_type: resource_type.into(),
            interface: interface.into(),
            observable: true,
            discoverable: true,
            attributes: AttributeStore::new(),
            defaults: ResourceDefaults::default(),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn is_observable(&self) -> bool {
        self.observable
    }

    pub fn is_discoverable(&self) -> bool {
        self.discoverable
    }

    fn store(&self) -> MutexGuard<'_, AttributeStore> {
        self.attributes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set one attribute, notifying observers per the auto-notify policy.
    pub fn set_attribute(&self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        let key = key.into();
        let value = value.into();
        let mut store = self.store();
        let updated = store.get(&key).ok() != Some(&value);
        store.set(key, value);
        self.auto_notify(&store, updated, self.auto_notify_policy);
    }

    /// Clone of the value under `key`.
    pub fn attribute_value(&self, key: &str) -> ResencResult<AttributeValue> {
        self.store().get(key).cloned()
    }

    /// Remove an attribute. Observers are notified when something was removed.
    pub fn remove_attribute(&self, key: &str) -> bool {
        let mut store = self.store();
        let erased = store.erase(key);
        if erased {
            self.auto_notify(&store, true, self.auto_notify_policy);
        }
        erased
    }

    pub fn contains_attribute(&self, key: &str) -> bool {
        self.store().contains(key)
    }

    /// Snapshot of all attributes.
    pub fn attributes(&self) -> AttributeStore {
        self.store().clone()
    }

    /// Exclusive access to the store; observers are notified when the guard drops.
    pub fn lock(&self) -> AttributesGuard<'_> {
        self.lock_with_policy(self.auto_notify_policy)
    }

    /// Like [`lock`](Self::lock) but with an explicit auto-notify policy.
    pub fn lock_with_policy(&self, policy: AutoNotifyPolicy) -> AttributesGuard<'_> {
        let store = self.store();
        let before = match policy {
            AutoNotifyPolicy::Updated => Some(store.clone()),
            AutoNotifyPolicy::Never | AutoNotifyPolicy::Always => None,
        };
        AttributesGuard {
            resource: self,
            store,
            before,
            policy,
        }
    }

    pub fn set_get_request_handler<F>(&mut self, handler: F)
    where
        F: Fn(&RequestInfo, &mut AttributeStore) -> GetResponse + Send + Sync + 'static,
    {
        self.get_handler = Some(Box::new(handler));
    }

    pub fn set_set_request_handler<F>(&mut self, handler: F)
    where
        F: Fn(&RequestInfo, &mut AttributeStore) -> SetResponse + Send + Sync + 'static,
    {
        self.set_handler = Some(Box::new(handler));
    }

    pub fn auto_notify_policy(&self) -> AutoNotifyPolicy {
        self.auto_notify_policy
    }

    pub fn set_auto_notify_policy(&mut self, policy: AutoNotifyPolicy) {
        self.auto_notify_policy = policy;
    }

    pub fn set_request_handler_policy(&self) -> SetRequestHandlerPolicy {
        self.set_request_handler_policy
    }

    pub fn set_set_request_handler_policy(&mut self, policy: SetRequestHandlerPolicy) {
        self.set_request_handler_policy = policy;
    }

    /// Register `listener` for `key`, replacing any earlier one.
    pub fn add_attribute_updated_listener<F>(&self, key: impl Into<String>, listener: F)
    where
        F: Fn(&AttributeValue, &AttributeValue) + Send + Sync + 'static,
    {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), Arc::new(listener));
    }

    pub fn remove_attribute_updated_listener(&self, key: &str) -> bool {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some()
    }

    /// Receive a snapshot each time this resource notifies.
    pub fn subscribe_notifications(&self) -> broadcast::Receiver<ResourceNotification> {
        self.notifier.subscribe()
    }

    /// Push the current attributes to observers. Returns how many received it.
    pub fn notify(&self) -> usize {
        let store = self.store();
        self.send_notification(&store)
    }

    fn send_notification(&self, store: &AttributeStore) -> usize {
        if !self.observable {
            return 0;
        }

        let notification = ResourceNotification {
            uri: self.uri.clone(),
            attributes: store.clone(),
            timestamp: Utc::now(),
        };

        // No receivers is a normal outcome.
        self.notifier.send(notification).unwrap_or(0)
    }

    fn auto_notify(&self, store: &AttributeStore, changed: bool, policy: AutoNotifyPolicy) {
        let should_notify = match policy {
            AutoNotifyPolicy::Never => false,
            AutoNotifyPolicy::Always => true,
            AutoNotifyPolicy::Updated => changed,
        };

        if should_notify {
            let observers = self.send_notification(store);
            tracing::debug!("Notified {} observer(s) of {}", observers, self.uri);
        }
    }

    /// Answer a request of either method.
    pub fn handle_request(&self, request: &ResourceRequest) -> ResourceResponse {
        match request.method {
            Method::Get => self.handle_get(request),
            Method::Set => self.handle_set(request),
        }
    }

    /// Run the Get handler chain.
    pub fn handle_get(&self, request: &ResourceRequest) -> ResourceResponse {
        let mut attrs = request.attributes.clone();
        let response = match &self.get_handler {
            Some(handler) => handler(&RequestInfo::from(request), &mut attrs),
            None => GetResponse::default_action(),
        };

        let body = response.build_response(&self.store());
        ResourceResponse::to_request(request, body)
    }

    /// Run the Set handler chain: user handler, acceptance, listeners, notify, respond.
    pub fn handle_set(&self, request: &ResourceRequest) -> ResourceResponse {
        let mut attrs = request.attributes.clone();
        let response = match &self.set_handler {
            Some(handler) => handler(&RequestInfo::from(request), &mut attrs),
            None => SetResponse::default_action(),
        };

        let (changed, merged) = self.apply_acceptance_method(&response, &attrs);

        self.auto_notify(&merged, changed, self.auto_notify_policy);
        let body = response.build_response(&merged);
        ResourceResponse::to_request(request, body)
    }

    /// Merge `attrs` per `response` and fire listeners.
    ///
    /// Returns whether anything changed, and the store as it was right after the merge.
    fn apply_acceptance_method(
        &self,
        response: &SetResponse,
        attrs: &AttributeStore,
    ) -> (bool, AttributeStore) {
        let method = match (response.acceptance_method(), self.set_request_handler_policy) {
            (AcceptanceMethod::Default, SetRequestHandlerPolicy::Acceptance) => {
                AcceptanceMethod::Accept
            }
            (method, _) => method,
        };

        let (updates, merged) = {
            let mut store = self.store();
            let decision = response
                .handler()
                .apply_acceptance_method(method, &mut store, attrs);

            let updates: Vec<(String, AttributeValue, AttributeValue)> = decision
                .changed(&store)
                .map(|entry| {
                    let new = store.get(&entry.key).cloned().unwrap_or_default();
                    (
                        entry.key.clone(),
                        entry.prior.clone().unwrap_or_default(),
                        new,
                    )
                })
                .collect();
            (updates, store.clone())
        };

        tracing::debug!("{} attribute(s) updated on {}", updates.len(), self.uri);

        for (key, old, new) in &updates {
            let listener = self
                .listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(key)
                .cloned();

            if let Some(listener) = listener {
                listener(old, new);
            }
        }

        (!updates.is_empty(), merged)
    }
}

/// Exclusive, auto-notifying access to a resource's attributes.
pub struct AttributesGuard<'a> {
    resource: &'a ResourceObject,
    store: MutexGuard<'a, AttributeStore>,
    before: Option<AttributeStore>,
    policy: AutoNotifyPolicy,
}

impl Deref for AttributesGuard<'_> {
    type Target = AttributeStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

impl DerefMut for AttributesGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.store
    }
}

impl Drop for AttributesGuard<'_> {
    fn drop(&mut self) {
        let changed = match &self.before {
            Some(before) => *before != *self.store,
            None => true,
        };
        self.resource.auto_notify(&self.store, changed, self.policy);
    }
}
