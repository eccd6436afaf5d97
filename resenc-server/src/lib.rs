//! resenc server: resource objects, request handlers and the reference TCP server.

pub mod config;
pub mod handler;
pub mod registry;
pub mod request_handler;
pub mod resource;
pub mod response;

pub use config::{ResourceDefaults, ServerConfig};
pub use handler::Server;
pub use registry::ResourceRegistry;
pub use request_handler::{HandlerFields, RequestHandler, SetRequestHandler};
pub use resource::{
    AttributeUpdatedListener, AttributesGuard, AutoNotifyPolicy, GetHandlerFn, RequestInfo,
    ResourceNotification, ResourceObject, ResourceObjectBuilder, SetHandlerFn,
    SetRequestHandlerPolicy,
};
pub use response::{GetResponse, SetResponse};
