//! Responses returned by user request handlers.
//!
//! A response only describes how to answer; nothing is validated or applied until the
//! resource object turns it into a body.

use resenc_core::{AcceptanceMethod, AttributeStore, ResponseBody};

use crate::request_handler::{RequestHandler, SetRequestHandler};

/// Answer to a Get request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GetResponse {
    handler: RequestHandler,
}

impl GetResponse {
    /// Live attributes with the default error code.
    pub fn default_action() -> Self {
        Self::default()
    }

    /// Live attributes with `error_code`.
    pub fn create_with_code(error_code: i32) -> Self {
        Self {
            handler: RequestHandler::with_error_code(error_code),
        }
    }

    /// `attrs` instead of the live attributes, default error code.
    pub fn create(attrs: AttributeStore) -> Self {
        Self {
            handler: RequestHandler::with_attributes(attrs),
        }
    }

    pub fn create_with_attributes_and_code(attrs: AttributeStore, error_code: i32) -> Self {
        Self {
            handler: RequestHandler::with_attributes_and_code(attrs, error_code),
        }
    }

    pub fn handler(&self) -> &RequestHandler {
        &self.handler
    }

    pub fn error_code(&self) -> i32 {
        self.handler.error_code()
    }

    pub fn build_response(self, store: &AttributeStore) -> ResponseBody {
        self.handler.build_response(store)
    }
}

/// Answer to a Set request, including how its attributes are merged.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SetResponse {
    handler: SetRequestHandler,
}

impl SetResponse {
    pub fn default_action() -> Self {
        Self::default()
    }

    /// Merge the request unconditionally.
    pub fn accept() -> Self {
        Self::default_action().set_acceptance_method(AcceptanceMethod::Accept)
    }

    pub fn accept_with_code(error_code: i32) -> Self {
        Self::create_with_code(error_code).set_acceptance_method(AcceptanceMethod::Accept)
    }

    /// Answer without touching the store.
    pub fn ignore() -> Self {
        Self::default_action().set_acceptance_method(AcceptanceMethod::Ignore)
    }

    pub fn ignore_with_code(error_code: i32) -> Self {
        Self::create_with_code(error_code).set_acceptance_method(AcceptanceMethod::Ignore)
    }

    pub fn create_with_code(error_code: i32) -> Self {
        Self {
            handler: SetRequestHandler::with_error_code(error_code),
        }
    }

    pub fn create(attrs: AttributeStore) -> Self {
        Self {
            handler: SetRequestHandler::with_attributes(attrs),
        }
    }

    pub fn create_with_attributes_and_code(attrs: AttributeStore, error_code: i32) -> Self {
        Self {
            handler: SetRequestHandler::with_attributes_and_code(attrs, error_code),
        }
    }

    pub fn set_acceptance_method(mut self, method: AcceptanceMethod) -> Self {
        self.handler.set_acceptance_method(method);
        self
    }

    pub fn acceptance_method(&self) -> AcceptanceMethod {
        self.handler.acceptance_method()
    }

    pub fn handler(&self) -> &SetRequestHandler {
        &self.handler
    }

    pub fn error_code(&self) -> i32 {
        self.handler.error_code()
    }

    pub fn build_response(self, store: &AttributeStore) -> ResponseBody {
        self.handler.build_response(store)
    }
}
