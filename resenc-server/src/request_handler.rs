//! Request handlers: turn a response description into a response body.

use resenc_core::{
    apply_acceptance_method, AcceptanceDecision, AcceptanceMethod, AttributeStore, ResponseBody,
    DEFAULT_ERROR_CODE,
};

/// Which response fields a handler was given explicitly.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum HandlerFields {
    /// Neither: answer with the live attributes and the default code.
    #[default]
    Unset,
    ErrorOnly(i32),
    AttrsOnly(AttributeStore),
    Both(AttributeStore, i32),
}

impl HandlerFields {
    pub fn error_code(&self) -> i32 {
        match self {
            Self::ErrorOnly(code) | Self::Both(_, code) => *code,
            Self::Unset | Self::AttrsOnly(_) => DEFAULT_ERROR_CODE,
        }
    }

    /// Attributes that replace the live store in the response, if any.
    pub fn attributes(&self) -> Option<&AttributeStore> {
        match self {
            Self::AttrsOnly(attrs) | Self::Both(attrs, _) => Some(attrs),
            Self::Unset | Self::ErrorOnly(_) => None,
        }
    }

    fn build(self, store: &AttributeStore) -> ResponseBody {
        let error_code = self.error_code();
        let attributes = match self {
            Self::AttrsOnly(attrs) | Self::Both(attrs, _) => attrs,
            Self::Unset | Self::ErrorOnly(_) => store.clone(),
        };
        ResponseBody {
            error_code,
            attributes,
        }
    }
}

/// Handler for the Get path.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestHandler {
    fields: HandlerFields,
}

impl RequestHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error_code(error_code: i32) -> Self {
        Self {
            fields: HandlerFields::ErrorOnly(error_code),
        }
    }

    pub fn with_attributes(attrs: AttributeStore) -> Self {
        Self {
            fields: HandlerFields::AttrsOnly(attrs),
        }
    }

    pub fn with_attributes_and_code(attrs: AttributeStore, error_code: i32) -> Self {
        Self {
            fields: HandlerFields::Both(attrs, error_code),
        }
    }

    pub fn fields(&self) -> &HandlerFields {
        &self.fields
    }

    pub fn error_code(&self) -> i32 {
        self.fields.error_code()
    }

    /// Build the body: explicit attributes verbatim, otherwise a copy of `store`.
    pub fn build_response(self, store: &AttributeStore) -> ResponseBody {
        self.fields.build(store)
    }
}

/// Handler for the Set path: a [`RequestHandler`] plus an acceptance method.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SetRequestHandler {
    fields: HandlerFields,
    acceptance_method: AcceptanceMethod,
}

impl SetRequestHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_error_code(error_code: i32) -> Self {
        Self {
            fields: HandlerFields::ErrorOnly(error_code),
            ..Default::default()
        }
    }

    pub fn with_attributes(attrs: AttributeStore) -> Self {
        Self {
            fields: HandlerFields::AttrsOnly(attrs),
            ..Default::default()
        }
    }

    pub fn with_attributes_and_code(attrs: AttributeStore, error_code: i32) -> Self {
        Self {
            fields: HandlerFields::Both(attrs, error_code),
            ..Default::default()
        }
    }

    pub fn fields(&self) -> &HandlerFields {
        &self.fields
    }

    pub fn error_code(&self) -> i32 {
        self.fields.error_code()
    }

    pub fn acceptance_method(&self) -> AcceptanceMethod {
        self.acceptance_method
    }

    pub fn set_acceptance_method(&mut self, method: AcceptanceMethod) {
        self.acceptance_method = method;
    }

    /// Merge `attrs` into `store` with an explicit `method`.
    pub fn apply_acceptance_method(
        &self,
        method: AcceptanceMethod,
        store: &mut AttributeStore,
        attrs: &AttributeStore,
    ) -> AcceptanceDecision {
        apply_acceptance_method(method, store, attrs)
    }

    /// Merge `attrs` into `store` with this handler's own method.
    pub fn apply(&self, store: &mut AttributeStore, attrs: &AttributeStore) -> AcceptanceDecision {
        self.apply_acceptance_method(self.acceptance_method, store, attrs)
    }

    /// Build the body. Does not run the acceptance policy.
    pub fn build_response(self, store: &AttributeStore) -> ResponseBody {
        self.fields.build(store)
    }
}
