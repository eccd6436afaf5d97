//! Message types exchanged between a resource server and its clients.
//!
//! These are the decoded forms the transport hands to the core and receives back;
//! how they are framed on the wire belongs to the transport.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attributes::AttributeStore;
use crate::error::StackResult;

/// Error code used when a handler does not set one explicitly.
pub const DEFAULT_ERROR_CODE: i32 = 200;

/// Error code for requests rejected before they reach a resource.
pub const BAD_REQUEST_CODE: i32 = 400;

/// Error code for requests addressed to an unknown resource URI.
pub const NOT_FOUND_CODE: i32 = 404;

/// Request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Method {
    Get,
    Set,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Set => write!(f, "SET"),
        }
    }
}

/// A decoded request against one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequest {
    pub request_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub uri: String,
    pub method: Method,
    #[serde(default)]
    pub attributes: AttributeStore,
}

impl ResourceRequest {
    fn new(uri: impl Into<String>, method: Method, attributes: AttributeStore) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            uri: uri.into(),
            method,
            attributes,
        }
    }

    /// Create a Get request. Query attributes are optional and usually empty.
    pub fn get(uri: impl Into<String>) -> Self {
        Self::new(uri, Method::Get, AttributeStore::new())
    }

    /// Create a Set request carrying the candidate attributes.
    pub fn set(uri: impl Into<String>, attributes: AttributeStore) -> Self {
        Self::new(uri, Method::Set, attributes)
    }
}

/// Response payload assembled by a request handler: result code plus attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseBody {
    pub error_code: i32,
    pub attributes: AttributeStore,
}

/// Response sent back for a [`ResourceRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceResponse {
    pub in_response_to: Uuid,
    pub timestamp: DateTime<Utc>,
    pub uri: String,
    pub error_code: i32,
    pub attributes: AttributeStore,
}

impl ResourceResponse {
    /// Wrap a handler-built body as the answer to `request`.
    pub fn to_request(request: &ResourceRequest, body: ResponseBody) -> Self {
        Self {
            in_response_to: request.request_id,
            timestamp: Utc::now(),
            uri: request.uri.clone(),
            error_code: body.error_code,
            attributes: body.attributes,
        }
    }

    /// An attribute-less answer carrying only `error_code`.
    pub fn error(request: &ResourceRequest, error_code: i32) -> Self {
        Self::to_request(
            request,
            ResponseBody {
                error_code,
                attributes: AttributeStore::new(),
            },
        )
    }
}

/// A presence event delivered to a subscriber's callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceNotification {
    pub host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    /// `Ok` for a live beacon, `PresenceStopped`/`PresenceTimeout` otherwise.
    pub result: StackResult,
    pub nonce: u32,
    pub timestamp: DateTime<Utc>,
}
