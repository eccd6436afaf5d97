//! Server configuration for resenc.

use std::net::SocketAddr;
use std::path::Path;

use resenc_core::{ResencError, ResencResult};
use serde::{Deserialize, Serialize};

use crate::resource::{AutoNotifyPolicy, SetRequestHandlerPolicy};

const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([127, 0, 0, 1], 5683);

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Max frame size in bytes.
    pub max_message_size: usize,
    /// Defaults applied to resources built with [`ResourceDefaults`].
    pub resource_defaults: ResourceDefaults,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(DEFAULT_BIND_ADDR),
            max_message_size: 1024 * 1024, // 1MB
            resource_defaults: ResourceDefaults::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address.
    pub fn with_addr(addr: impl Into<SocketAddr>) -> Self {
        Self {
            bind_addr: addr.into(),
            ..Default::default()
        }
    }

    /// Load a JSON config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> ResencResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ResencError::InvalidParameter(format!("cannot read {}: {}", path.display(), e))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    pub fn with_resource_defaults(mut self, defaults: ResourceDefaults) -> Self {
        self.resource_defaults = defaults;
        self
    }
}

/// Per-resource policies applied when a resource is built from config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceDefaults {
    pub auto_notify_policy: AutoNotifyPolicy,
    pub set_request_handler_policy: SetRequestHandlerPolicy,
    /// Buffered notifications per observer before the oldest are dropped.
    pub notification_capacity: usize,
}

impl Default for ResourceDefaults {
    fn default() -> Self {
        Self {
            auto_notify_policy: AutoNotifyPolicy::Updated,
            set_request_handler_policy: SetRequestHandlerPolicy::Never,
            notification_capacity: 16,
        }
    }
}
