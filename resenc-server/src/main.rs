//! resenc server binary.

use std::net::SocketAddr;

use resenc_core::{AttributeStore, ResencError, ResencResult};
use resenc_server::{ResourceObject, ResourceRegistry, Server, ServerConfig, SetResponse};

#[tokio::main]
async fn main() -> ResencResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Either a bind address or a JSON config file
    let config = match std::env::args().nth(1) {
        Some(arg) if arg.ends_with(".json") => ServerConfig::load(&arg)?,
        Some(arg) => {
            let addr: SocketAddr = arg.parse().map_err(|e| {
                ResencError::InvalidParameter(format!("Invalid bind address {}: {}", arg, e))
            })?;
            ServerConfig::with_addr(addr)
        }
        None => ServerConfig::default(),
    };

    let mut light = ResourceObject::builder("/a/light", "core.light", "oic.if.baseline")
        .with_defaults(config.resource_defaults)
        .set_attributes(AttributeStore::new().with("on-off", false).with("dim", 0))
        .build();

    light.set_set_request_handler(|info, attrs| {
        tracing::info!(
            "{} request {} with {} attribute(s)",
            info.method,
            info.request_id,
            attrs.len()
        );
        SetResponse::default_action()
    });

    light.add_attribute_updated_listener("on-off", |old, new| {
        tracing::info!("Light switched from {} to {}", old, new);
    });

    let mut registry = ResourceRegistry::new();
    registry.register(light);

    tracing::info!("Registered resources: {:?}", registry.uris());

    Server::new(config, registry).run().await
}
