//! The attribute store held by a resource.

use std::collections::hash_map;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ResencError, ResencResult};
use crate::value::AttributeValue;

/// Mapping from attribute name to typed value.
///
/// Iteration order is unspecified. Equality compares keys and values only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeStore {
    values: HashMap<String, AttributeValue>,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chainable insert, handy for building literal stores.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Look up `key`, failing with `KeyNotFound` if absent.
    pub fn get(&self, key: &str) -> ResencResult<&AttributeValue> {
        self.values.get(key).ok_or_else(|| ResencError::KeyNotFound {
            key: key.to_string(),
        })
    }

    pub fn get_mut(&mut self, key: &str) -> ResencResult<&mut AttributeValue> {
        self.values
            .get_mut(key)
            .ok_or_else(|| ResencError::KeyNotFound {
                key: key.to_string(),
            })
    }

    /// Insert or overwrite `key`, returning the displaced value.
    ///
    /// The store does not police kinds; a later write may change a key's kind.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Option<AttributeValue> {
        self.values.insert(key.into(), value.into())
    }

    /// Remove `key` if present. Returns whether anything was removed.
    pub fn erase(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Deep structural equality over all keys and values.
    pub fn equals(&self, other: &AttributeStore) -> bool {
        self == other
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.values.keys().map(String::as_str)
    }

    /// Borrowing iterator over `(key, value)` pairs; may be restarted freely.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.values.iter(),
        }
    }
}

/// Iterator returned by [`AttributeStore::iter`].
pub struct Iter<'a> {
    inner: hash_map::Iter<'a, String, AttributeValue>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a AttributeValue);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k.as_str(), v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a> IntoIterator for &'a AttributeStore {
    type Item = (&'a str, &'a AttributeValue);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for AttributeStore {
    type Item = (String, AttributeValue);
    type IntoIter = hash_map::IntoIter<String, AttributeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl<K, V> FromIterator<(K, V)> for AttributeStore
where
    K: Into<String>,
    V: Into<AttributeValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut store = Self::new();
        store.extend(iter);
        store
    }
}

impl<K, V> Extend<(K, V)> for AttributeStore
where
    K: Into<String>,
    V: Into<AttributeValue>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.set(key, value);
        }
    }
}
