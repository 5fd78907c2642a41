//! Property maps extracted from responses.

use std::collections::BTreeMap;

/// A single returned property. Attributes that repeat in one instance
/// (CIM arrays) are coalesced into `List`, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Property {
    Text(String),
    List(Vec<String>),
}

impl Property {
    /// Text of a scalar property, `None` for arrays.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Property::Text(text) => Some(text),
            Property::List(_) => None,
        }
    }

    /// Every value, a scalar counting as a one-element list.
    pub fn values(&self) -> Vec<&str> {
        match self {
            Property::Text(text) => vec![text.as_str()],
            Property::List(items) => items.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Property::List(_))
    }
}

impl From<&str> for Property {
    fn from(value: &str) -> Self {
        Property::Text(value.to_string())
    }
}

/// Local name → value for one instance.
pub type Properties = BTreeMap<String, Property>;

/// Adds `value` under `name`; a second occurrence turns the entry into a list.
pub fn insert_coalescing(properties: &mut Properties, name: &str, value: String) {
    match properties.remove(name) {
        None => {
            properties.insert(name.to_string(), Property::Text(value));
        }
        Some(Property::Text(first)) => {
            properties.insert(name.to_string(), Property::List(vec![first, value]));
        }
        Some(Property::List(mut items)) => {
            items.push(value);
            properties.insert(name.to_string(), Property::List(items));
        }
    }
}

/// Text of a scalar property.
pub fn text<'a>(properties: &'a Properties, name: &str) -> Option<&'a str> {
    properties.get(name).and_then(Property::as_text)
}

/// One Pull response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullBatch {
    pub items: Vec<Properties>,
    pub end_of_sequence: bool,
}
