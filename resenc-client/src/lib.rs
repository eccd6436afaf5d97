//! resenc client SDK: presence subscriptions and remote resource access.
//!
//! # Example
//!
//! ```no_run
//! use resenc_client::RemoteResource;
//! use resenc_core::AttributeStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut light = RemoteResource::connect("127.0.0.1:5683", "/a/light").await?;
//!
//!     let response = light.set(AttributeStore::new().with("on-off", true)).await?;
//!     println!("Light now: {:?}", response.attributes);
//!
//!     Ok(())
//! }
//! ```

mod connection;
mod local;
mod presence;

pub use connection::{Connection, ConnectionConfig};
pub use local::LocalPresencePlatform;
pub use presence::{
    presence_uri, ConnectivityType, PresenceCallback, PresenceHandle, PresencePlatform,
    PresenceSubscriber, PRESENCE_URI,
};

use std::net::SocketAddr;

use resenc_core::{AttributeStore, ResencError, ResencResult, ResourceRequest, ResourceResponse};

/// A resource on a remote resenc server.
pub struct RemoteResource {
    connection: Connection,
    uri: String,
}

impl RemoteResource {
    /// Connect to the server at `addr` and address the resource at `uri`.
    pub async fn connect(addr: impl AsRef<str>, uri: impl Into<String>) -> ResencResult<Self> {
        let addr: SocketAddr = addr
            .as_ref()
            .parse()
            .map_err(|e| ResencError::Transport(format!("Invalid address: {}", e)))?;

        Self::with_config(&ConnectionConfig::new(addr), uri).await
    }

    pub async fn with_config(
        config: &ConnectionConfig,
        uri: impl Into<String>,
    ) -> ResencResult<Self> {
        let uri = uri.into();
        if uri.is_empty() {
            return Err(ResencError::InvalidParameter("empty resource uri".to_string()));
        }

        Ok(Self {
            connection: Connection::connect(config).await?,
            uri,
        })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Fetch the resource's attributes.
    pub async fn get(&mut self) -> ResencResult<ResourceResponse> {
        let request = ResourceRequest::get(self.uri.as_str());
        self.connection.send_request(&request).await
    }

    /// Ask the server to merge `attrs` into the resource.
    pub async fn set(&mut self, attrs: AttributeStore) -> ResencResult<ResourceResponse> {
        let request = ResourceRequest::set(self.uri.as_str(), attrs);
        self.connection.send_request(&request).await
    }
}
