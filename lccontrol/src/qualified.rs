//! Values returned by the firmware, with their schema metadata.

use std::collections::BTreeMap;
use std::fmt;

use lcwsman::{Properties, Property};

use crate::errors::LcError;
use crate::schema::{ClassDef, Qualifiers, ValueMap};

const NO_DESCRIPTION: &str = "No description provided";

/// Raw value plus its display form.
///
/// The display form is the value-map entry for the raw value (the raw value
/// itself when unmapped), suffixed with the units or PUnit qualifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedValue {
    raw: String,
    display: String,
    mapped: bool,
    qualifiers: Qualifiers,
}

impl QualifiedValue {
    pub fn new(raw: impl Into<String>, qualifiers: Qualifiers) -> Self {
        let raw = raw.into();
        let (mut display, mapped) = match qualifiers.map_value(&raw) {
            Some(display) => (display.to_string(), true),
            None => (raw.clone(), false),
        };

        if let Some(unit) = qualifiers.units.or(qualifiers.punit) {
            display = format!("{} {}", display, unit);
        }

        Self {
            raw,
            display,
            mapped,
            qualifiers,
        }
    }

    /// Value without schema metadata.
    pub fn unqualified(raw: impl Into<String>) -> Self {
        Self::new(raw, Qualifiers::NONE)
    }

    /// Value exactly as sent by the firmware.
    pub fn unmapped_value(&self) -> &str {
        &self.raw
    }

    /// Mapped and unit-suffixed value.
    pub fn value(&self) -> &str {
        &self.display
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    pub fn units(&self) -> Option<&'static str> {
        self.qualifiers.units
    }

    pub fn punit(&self) -> Option<&'static str> {
        self.qualifiers.punit
    }

    pub fn value_map(&self) -> ValueMap {
        self.qualifiers.value_map
    }

    pub fn description(&self) -> String {
        if self.qualifiers.description.is_empty() {
            NO_DESCRIPTION.to_string()
        } else {
            self.qualifiers.description.join("\n")
        }
    }
}

impl fmt::Display for QualifiedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

/// A property map with every value qualified.
///
/// The raw map stays available for introspection: the firmware may return
/// more than the schema declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedProperties {
    raw: Properties,
    values: BTreeMap<String, Vec<QualifiedValue>>,
}

impl QualifiedProperties {
    pub fn qualify(raw: Properties, qualifiers: impl Fn(&str) -> Qualifiers) -> Self {
        let values = raw
            .iter()
            .map(|(name, property)| {
                let q = qualifiers(name);
                let values = property
                    .values()
                    .into_iter()
                    .map(|v| QualifiedValue::new(v, q))
                    .collect();
                (name.clone(), values)
            })
            .collect();

        Self { raw, values }
    }

    /// Scalar attribute. Errors when the firmware did not return it or
    /// returned an array.
    pub fn attribute(&self, name: &str) -> Result<&QualifiedValue, LcError> {
        match (self.raw.get(name), self.values.get(name)) {
            (Some(Property::Text(_)), Some(values)) => values
                .first()
                .ok_or_else(|| LcError::attribute_not_returned(name)),
            (Some(Property::List(_)), _) => Err(LcError::Attribute(format!(
                "Attribute '{}' is an array",
                name
            ))),
            _ => Err(LcError::attribute_not_returned(name)),
        }
    }

    /// Every value of an attribute, a scalar counting as one.
    pub fn values(&self, name: &str) -> Result<&[QualifiedValue], LcError> {
        self.values
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| LcError::attribute_not_returned(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.raw.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.raw.keys().map(String::as_str)
    }

    /// Map returned by the firmware, untranslated.
    pub fn raw(&self) -> &Properties {
        &self.raw
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

/// One instance of a DCIM class, as returned by Get or Enumerate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DcimInstance {
    class: &'static str,
    properties: QualifiedProperties,
}

impl DcimInstance {
    pub fn new(class: &'static ClassDef, raw: Properties) -> Self {
        Self {
            class: class.name,
            properties: QualifiedProperties::qualify(raw, |name| class.qualifiers(name)),
        }
    }

    pub fn class(&self) -> &'static str {
        self.class
    }

    pub fn attribute(&self, name: &str) -> Result<&QualifiedValue, LcError> {
        self.properties.attribute(name)
    }

    pub fn values(&self, name: &str) -> Result<&[QualifiedValue], LcError> {
        self.properties.values(name)
    }

    pub fn properties(&self) -> &QualifiedProperties {
        &self.properties
    }

    pub fn raw(&self) -> &Properties {
        self.properties.raw()
    }
}
