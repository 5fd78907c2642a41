//! Structures de l'enveloppe SOAP

use crate::namespace::{self, CIM_NAMESPACE_SELECTOR, DCIM_NAMESPACE};

/// A serialized request, ready to be posted.
///
/// Envelopes are built fresh for every send and never reused: a retried send
/// rebuilds the document so that it carries a new MessageID.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// `uuid:<v4>` carried in `wsa:MessageID`. `None` for Identify, which has
    /// no addressing headers.
    pub message_id: Option<String>,

    /// Action URI, `None` for Identify.
    pub action: Option<String>,

    /// XML document
    pub document: String,
}

/// Ordered `wsman:SelectorSet` content (name → value).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorSet {
    selectors: Vec<(String, String)>,
}

impl SelectorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selector set carrying only the DCIM namespace selector.
    pub fn with_cim_namespace() -> Self {
        let mut set = Self::new();
        set.insert_cim_namespace();
        set
    }

    /// Adds `__cimnamespace=root/dcim`.
    pub fn insert_cim_namespace(&mut self) {
        self.insert(CIM_NAMESPACE_SELECTOR, DCIM_NAMESPACE);
    }

    /// Inserts a selector, replacing the value in place if the name exists.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.selectors.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.selectors.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.selectors
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.selectors.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.selectors.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for SelectorSet {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut set = SelectorSet::new();
        for (name, value) in iter {
            set.insert(name, value);
        }
        set
    }
}

/// CIM endpoint reference passed as a method argument.
///
/// Serialized as a full addressable-reference block rather than a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CimReference {
    pub resource_uri: String,
    pub selectors: SelectorSet,
}

impl CimReference {
    pub fn new(resource_uri: impl Into<String>, selectors: SelectorSet) -> Self {
        Self {
            resource_uri: resource_uri.into(),
            selectors,
        }
    }

    /// Reference keyed by `InstanceID` only.
    pub fn by_instance_id(resource_uri: impl Into<String>, instance_id: impl Into<String>) -> Self {
        let mut selectors = SelectorSet::new();
        selectors.insert("InstanceID", instance_id);
        Self::new(resource_uri, selectors)
    }

    /// `DCIM_SoftwareIdentity` handle, used by the software installation service.
    pub fn software_identity(instance_id: impl Into<String>) -> Self {
        Self::by_instance_id(namespace::resource_uri("DCIM_SoftwareIdentity"), instance_id)
    }
}

/// Value of one `<Method>_INPUT` property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Text(String),
    Reference(CimReference),
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

impl From<CimReference> for PropertyValue {
    fn from(value: CimReference) -> Self {
        PropertyValue::Reference(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_insert_keeps_order_and_replaces() {
        let mut set = SelectorSet::new();
        set.insert("Name", "a");
        set.insert("InstanceID", "b");
        set.insert("Name", "c");

        assert_eq!(set.names(), vec!["Name", "InstanceID"]);
        assert_eq!(set.get("Name"), Some("c"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn software_identity_reference() {
        let reference = CimReference::software_identity("DCIM:INSTALLED#802__RAID.Integrated.1-1");
        assert!(reference.resource_uri.ends_with("/DCIM_SoftwareIdentity"));
        assert_eq!(
            reference.selectors.get("InstanceID"),
            Some("DCIM:INSTALLED#802__RAID.Integrated.1-1")
        );
    }
}
