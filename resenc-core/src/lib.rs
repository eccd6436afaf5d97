//! # resenc-core
//!
//! Core library for resenc, the resource attribute negotiation engine.
//!
//! This crate provides typed attribute values and stores, the acceptance policy
//! that decides how remote writes are merged, the error taxonomy and platform
//! result codes, the presence state automaton, and the request/response messages
//! shared by servers and clients.

pub mod acceptance;
pub mod attributes;
pub mod error;
pub mod message;
pub mod state;
pub mod value;

pub use acceptance::{
    acceptable_attribute_value, acceptable_attributes, apply_acceptance_method,
    replace_attributes, AcceptanceDecision, AcceptanceMethod, ReplacedAttribute,
};
pub use attributes::AttributeStore;
pub use error::{ResencError, ResencResult, StackResult};
pub use message::{
    Method, PresenceNotification, ResourceRequest, ResourceResponse, ResponseBody,
    BAD_REQUEST_CODE, DEFAULT_ERROR_CODE, NOT_FOUND_CODE,
};
pub use state::{PresenceEvent, PresenceState};
pub use value::{AttributeType, AttributeValue, BaseKind, Sequence, ValueKind, MAX_SEQUENCE_DEPTH};
