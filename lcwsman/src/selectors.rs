//! Invoke selector resolution.
//!
//! A method is invoked on a concrete instance of its class. The instance is
//! addressed by the key properties of the first enumerated item, filtered on
//! [`INVOKE_SELECTOR_KEYS`], plus the CIM namespace selector.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::soap::{Properties, SelectorSet, text};

/// Properties that may address a service instance.
pub const INVOKE_SELECTOR_KEYS: [&str; 5] = [
    "CreationClassName",
    "SystemCreationClassName",
    "SystemName",
    "Name",
    "InstanceID",
];

/// Selector set built from one enumerated instance. Array-valued properties
/// never address an instance and are skipped.
pub fn invoke_selectors(instance: &Properties) -> SelectorSet {
    let mut selectors: SelectorSet = INVOKE_SELECTOR_KEYS
        .iter()
        .filter_map(|key| text(instance, key).map(|value| (*key, value)))
        .collect();
    selectors.insert_cim_namespace();
    selectors
}

/// Resolved selector sets, per class, for the lifetime of one client.
///
/// Entries are never invalidated.
#[derive(Debug, Default)]
pub struct SelectorCache {
    entries: RefCell<HashMap<String, SelectorSet>>,
}

impl SelectorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, class: &str) -> Option<SelectorSet> {
        self.entries.borrow().get(class).cloned()
    }

    pub fn insert(&self, class: &str, selectors: SelectorSet) {
        self.entries.borrow_mut().insert(class.to_string(), selectors);
    }

    pub fn contains(&self, class: &str) -> bool {
        self.entries.borrow().contains_key(class)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soap::Property;

    #[test]
    fn only_allowed_keys_are_kept() {
        let mut instance = Properties::new();
        instance.insert("CreationClassName".into(), "DCIM_JobService".into());
        instance.insert("Name".into(), "JobService".into());
        instance.insert("SystemName".into(), "Idrac".into());
        instance.insert("Extra".into(), "ignored".into());
        instance.insert(
            "InstanceID".into(),
            Property::List(vec!["a".into(), "b".into()]),
        );

        let selectors = invoke_selectors(&instance);
        assert_eq!(
            selectors.names(),
            vec!["CreationClassName", "SystemName", "Name", "__cimnamespace"]
        );
        assert_eq!(selectors.get("__cimnamespace"), Some("root/dcim"));
        assert!(!selectors.contains("Extra"));
    }

    #[test]
    fn cache_returns_stored_sets() {
        let cache = SelectorCache::new();
        assert!(cache.get("DCIM_LCService").is_none());

        cache.insert("DCIM_LCService", SelectorSet::with_cim_namespace());
        assert_eq!(cache.get("DCIM_LCService"), Some(SelectorSet::with_cim_namespace()));
        assert_eq!(cache.len(), 1);
    }
}
