//! Resource registry for the resenc server.

use std::collections::HashMap;
use std::sync::Arc;

use resenc_core::{
    AttributeStore, AttributeValue, ResourceRequest, ResourceResponse, Sequence,
    BAD_REQUEST_CODE, NOT_FOUND_CODE,
};

use crate::resource::ResourceObject;

/// Resources served by one server, keyed by URI.
#[derive(Default)]
pub struct ResourceRegistry {
    resources: HashMap<String, Arc<ResourceObject>>,
}

impl ResourceRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource under its own URI, replacing any earlier one.
    pub fn register(&mut self, resource: ResourceObject) -> Arc<ResourceObject> {
        let resource = Arc::new(resource);
        self.resources
            .insert(resource.uri().to_string(), Arc::clone(&resource));
        resource
    }

    pub fn unregister(&mut self, uri: &str) -> Option<Arc<ResourceObject>> {
        self.resources.remove(uri)
    }

    pub fn get(&self, uri: &str) -> Option<&Arc<ResourceObject>> {
        self.resources.get(uri)
    }

    /// Get all registered URIs, sorted.
    pub fn uris(&self) -> Vec<String> {
        let mut uris: Vec<String> = self.resources.keys().cloned().collect();
        uris.sort();
        uris
    }

    /// Route a request to its resource.
    pub fn handle(&self, request: &ResourceRequest) -> ResourceResponse {
        if has_empty_key(&request.attributes) {
            tracing::debug!("Rejecting {} {}: empty attribute key", request.method, request.uri);
            return ResourceResponse::error(request, BAD_REQUEST_CODE);
        }

        match self.resources.get(&request.uri) {
            Some(resource) => resource.handle_request(request),
            None => {
                tracing::debug!("No resource at {}", request.uri);
                ResourceResponse::error(request, NOT_FOUND_CODE)
            }
        }
    }
}

fn has_empty_key(attrs: &AttributeStore) -> bool {
    attrs
        .iter()
        .any(|(key, value)| key.is_empty() || value_has_empty_key(value))
}

fn value_has_empty_key(value: &AttributeValue) -> bool {
    match value {
        AttributeValue::Attributes(nested) => has_empty_key(nested),
        AttributeValue::AttributesSeq(seq) => match seq {
            Sequence::Flat(v) => v.iter().any(has_empty_key),
            Sequence::Nested(v) => v.iter().flatten().any(has_empty_key),
            Sequence::Deep(v) => v.iter().flatten().flatten().any(has_empty_key),
        },
        _ => false,
    }
}
