//! Acceptance policy for incoming attribute writes.
//!
//! Decides which entries of a candidate set may be merged into a resource's store:
//! - `acceptable_attribute_value`: same kind (base kind and sequence depth)
//! - `acceptable_attributes`: every candidate key is known and kind-compatible
//! - `replace_attributes`: merge and record what was displaced

use serde::{Deserialize, Serialize};

use crate::attributes::AttributeStore;
use crate::value::{AttributeValue, BaseKind};

/// How a Set request's attributes are merged into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AcceptanceMethod {
    /// Merge only if the whole candidate set passes the type/key gate.
    #[default]
    Default,
    /// Merge unconditionally, allowing new keys and kind changes.
    Accept,
    /// Never merge.
    Ignore,
}

/// One key written by a merge, with the value it displaced.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplacedAttribute {
    pub key: String,
    /// `None` when the key did not exist before the merge.
    pub prior: Option<AttributeValue>,
}

/// The diff produced by a merge, ordered by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcceptanceDecision {
    entries: Vec<ReplacedAttribute>,
}

impl AcceptanceDecision {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[ReplacedAttribute] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ReplacedAttribute> {
        self.entries.iter()
    }

    pub fn get(&self, key: &str) -> Option<&ReplacedAttribute> {
        self.entries.iter().find(|e| e.key == key)
    }

    /// Entries whose value in `dest` now differs from what it displaced.
    pub fn changed<'a>(
        &'a self,
        dest: &'a AttributeStore,
    ) -> impl Iterator<Item = &'a ReplacedAttribute> + 'a {
        self.entries
            .iter()
            .filter(move |e| dest.get(&e.key).ok() != e.prior.as_ref())
    }

    pub fn has_changes(&self, dest: &AttributeStore) -> bool {
        self.changed(dest).next().is_some()
    }

    /// Put every displaced value back, undoing the merge that produced this decision.
    pub fn restore(&self, dest: &mut AttributeStore) {
        for entry in self.entries.iter().rev() {
            match &entry.prior {
                Some(value) => {
                    dest.set(entry.key.clone(), value.clone());
                }
                None => {
                    dest.erase(&entry.key);
                }
            }
        }
    }

    pub fn into_entries(self) -> Vec<ReplacedAttribute> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a AcceptanceDecision {
    type Item = &'a ReplacedAttribute;
    type IntoIter = std::slice::Iter<'a, ReplacedAttribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Whether `value` may overwrite `dest` without changing its shape.
///
/// Nested attribute sets must themselves be acceptable against the destination set.
pub fn acceptable_attribute_value(dest: &AttributeValue, value: &AttributeValue) -> bool {
    let kind = dest.kind();
    if kind != value.kind() {
        return false;
    }

    if kind.depth == 0 && kind.base == BaseKind::Attributes {
        if let (AttributeValue::Attributes(dest), AttributeValue::Attributes(value)) =
            (dest, value)
        {
            return acceptable_attributes(dest, value);
        }
    }

    true
}

/// All-or-nothing gate: every key of `attrs` must exist in `dest` with a compatible kind.
pub fn acceptable_attributes(dest: &AttributeStore, attrs: &AttributeStore) -> bool {
    attrs.iter().all(|(key, value)| match dest.get(key) {
        Ok(current) => acceptable_attribute_value(current, value),
        Err(_) => false,
    })
}

/// Write every entry of `attrs` into `dest`, recording what each write displaced.
pub fn replace_attributes(dest: &mut AttributeStore, attrs: &AttributeStore) -> AcceptanceDecision {
    let mut keys: Vec<&str> = attrs.keys().collect();
    keys.sort_unstable();

    let entries = keys
        .into_iter()
        .filter_map(|key| {
            let value = attrs.get(key).ok()?;
            let prior = dest.set(key, value.clone());
            Some(ReplacedAttribute {
                key: key.to_string(),
                prior,
            })
        })
        .collect();

    AcceptanceDecision { entries }
}

/// Merge `attrs` into `dest` according to `method`.
pub fn apply_acceptance_method(
    method: AcceptanceMethod,
    dest: &mut AttributeStore,
    attrs: &AttributeStore,
) -> AcceptanceDecision {
    match method {
        AcceptanceMethod::Ignore => AcceptanceDecision::empty(),
        AcceptanceMethod::Accept => replace_attributes(dest, attrs),
        AcceptanceMethod::Default => {
            if acceptable_attributes(dest, attrs) {
                replace_attributes(dest, attrs)
            } else {
                tracing::debug!(
                    "Rejected {} attribute(s): unknown key or kind change",
                    attrs.len()
                );
                AcceptanceDecision::empty()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "key";

    fn light() -> AttributeStore {
        AttributeStore::new().with("on-off", false).with("dim", 0)
    }

    #[test]
    fn empty_attributes_are_acceptable() {
        let dest = AttributeStore::new().with(KEY, 1);
        assert!(acceptable_attributes(&dest, &AttributeStore::new()));
    }

    #[test]
    fn attributes_are_acceptable_against_themselves() {
        let dest = AttributeStore::new().with(KEY, 1);
        assert!(acceptable_attributes(&dest, &dest.clone()));
    }

    #[test]
    fn unknown_key_is_not_acceptable() {
        let dest = AttributeStore::new().with(KEY, 1);
        let attrs = AttributeStore::new().with("unknown", 1);
        assert!(!acceptable_attributes(&dest, &attrs));
    }

    #[test]
    fn different_kind_is_not_acceptable() {
        let dest = AttributeStore::new().with(KEY, 1);
        let attrs = AttributeStore::new().with(KEY, "");
        assert!(!acceptable_attributes(&dest, &attrs));
    }

    #[test]
    fn different_sequence_depth_is_not_acceptable() {
        let dest = AttributeStore::new().with(KEY, vec![1i64]);
        let attrs = AttributeStore::new().with(KEY, vec![vec![1i64]]);
        assert!(!acceptable_attributes(&dest, &attrs));

        let same_shape = AttributeStore::new().with(KEY, vec![5i64, 6, 7]);
        assert!(acceptable_attributes(&dest, &same_shape));
    }

    #[test]
    fn different_kind_of_nested_attribute_is_not_acceptable() {
        let nested = AttributeStore::new().with("nested_value", -99);
        let dest = AttributeStore::new().with(KEY, 1).with("nested", nested);

        let bad_nested = AttributeStore::new().with("nested_value", "abc");
        let attrs = AttributeStore::new().with("nested", bad_nested);
        assert!(!acceptable_attributes(&dest, &attrs));

        let good_nested = AttributeStore::new().with("nested_value", 7);
        let attrs = AttributeStore::new().with("nested", good_nested);
        assert!(acceptable_attributes(&dest, &attrs));
    }

    #[test]
    fn one_bad_key_rejects_the_whole_set() {
        let mut dest = light();
        let attrs = AttributeStore::new().with("dim", 50).with("on-off", "yes");

        let decision = apply_acceptance_method(AcceptanceMethod::Default, &mut dest, &attrs);
        assert!(decision.is_empty());
        assert_eq!(dest, light());
    }

    #[test]
    fn replace_will_overwrite_existing() {
        let mut dest = AttributeStore::new().with(KEY, 1);
        let attrs = AttributeStore::new().with(KEY, "newValue");

        replace_attributes(&mut dest, &attrs);
        assert_eq!(dest.get(KEY).unwrap().as_str().unwrap(), "newValue");
    }

    #[test]
    fn replace_with_empty_set_is_noop() {
        let mut dest = light();
        let decision = replace_attributes(&mut dest, &AttributeStore::new());
        assert!(decision.is_empty());
        assert_eq!(dest, light());
    }

    #[test]
    fn accept_records_absent_marker_for_new_keys() {
        let mut dest = light();
        let attrs = AttributeStore::new().with("color", "red").with("dim", 1.5);

        let decision = apply_acceptance_method(AcceptanceMethod::Accept, &mut dest, &attrs);

        assert_eq!(decision.len(), 2);
        assert_eq!(decision.get("color").unwrap().prior, None);
        assert_eq!(decision.get("dim").unwrap().prior, Some(AttributeValue::Int(0)));
        assert_eq!(dest.get("color").unwrap().as_str().unwrap(), "red");
        assert_eq!(dest.get("dim").unwrap().as_double().unwrap(), 1.5);
        assert_eq!(dest.get("on-off").unwrap().as_bool().unwrap(), false);
    }

    #[test]
    fn ignore_never_mutates() {
        let mut dest = light();
        let attrs = AttributeStore::new().with("on-off", true).with("new", 1);

        let decision = apply_acceptance_method(AcceptanceMethod::Ignore, &mut dest, &attrs);
        assert!(decision.is_empty());
        assert_eq!(dest, light());
    }

    #[test]
    fn restore_undoes_merge() {
        let mut dest = light();
        let attrs = AttributeStore::new()
            .with("on-off", "x")
            .with("dim", 80)
            .with("extra", vec![1.0f64]);

        let decision = replace_attributes(&mut dest, &attrs);
        assert_ne!(dest, light());

        decision.restore(&mut dest);
        assert_eq!(dest, light());
    }

    #[test]
    fn changed_skips_rewrites_of_equal_values() {
        let mut dest = light();
        let attrs = AttributeStore::new().with("on-off", true).with("dim", 0);

        let decision = replace_attributes(&mut dest, &attrs);
        assert_eq!(decision.len(), 2);

        let changed: Vec<_> = decision.changed(&dest).map(|e| e.key.as_str()).collect();
        assert_eq!(changed, vec!["on-off"]);
        assert!(decision.has_changes(&dest));
    }

    #[test]
    fn light_scenario() {
        let mut dest = light();

        let decision = apply_acceptance_method(
            AcceptanceMethod::Default,
            &mut dest,
            &AttributeStore::new().with("on-off", true),
        );
        assert_eq!(
            decision.entries(),
            &[ReplacedAttribute {
                key: "on-off".to_string(),
                prior: Some(AttributeValue::Bool(false)),
            }]
        );
        assert_eq!(dest, AttributeStore::new().with("on-off", true).with("dim", 0));

        let c2 = AttributeStore::new().with("on-off", "x");
        let rejected = apply_acceptance_method(AcceptanceMethod::Default, &mut dest, &c2);
        assert!(rejected.is_empty());
        assert_eq!(dest, AttributeStore::new().with("on-off", true).with("dim", 0));

        let accepted = apply_acceptance_method(AcceptanceMethod::Accept, &mut dest, &c2);
        assert_eq!(accepted.len(), 1);
        assert_eq!(dest, AttributeStore::new().with("on-off", "x").with("dim", 0));
    }

    #[test]
    fn acceptance_method_serde() {
        assert_eq!(
            serde_json::to_string(&AcceptanceMethod::Accept).unwrap(),
            "\"ACCEPT\""
        );
        assert_eq!(AcceptanceMethod::default(), AcceptanceMethod::Default);
    }
}
