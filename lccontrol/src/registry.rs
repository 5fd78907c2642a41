//! Version registry: picks the class tables matching the firmware.

use std::cmp::Ordering;

use tracing::debug;

use crate::dcim::v2303030;
use crate::errors::LcError;
use crate::schema::ClassDef;

/// Class tables valid from `version` onward.
#[derive(Debug, Clone, Copy)]
pub struct SchemaSet {
    pub version: &'static str,
    pub classes: &'static [ClassDef],
}

impl SchemaSet {
    pub fn class(&self, name: &str) -> Result<&'static ClassDef, LcError> {
        self.classes
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| LcError::UnknownClass(name.to_string()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    sets: Vec<SchemaSet>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every table shipped with this crate.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(v2303030::VERSION, v2303030::SCHEMA);
        registry
    }

    pub fn register(&mut self, version: &'static str, classes: &'static [ClassDef]) {
        self.sets.push(SchemaSet { version, classes });
        self.sets
            .sort_by(|a, b| compare_versions(a.version, b.version));
    }

    pub fn versions(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.sets.iter().map(|s| s.version)
    }

    /// Newest set whose minimum version is not above `lc_version`.
    pub fn resolve(&self, lc_version: &str) -> Result<SchemaSet, LcError> {
        let set = self
            .sets
            .iter()
            .rev()
            .find(|s| compare_versions(s.version, lc_version) != Ordering::Greater)
            .copied()
            .ok_or_else(|| LcError::UnsupportedVersion(lc_version.to_string()))?;

        debug!(lc_version, schema = set.version, "Resolved DCIM schema");
        Ok(set)
    }
}

/// Compares dotted versions field by field, numerically.
///
/// Missing fields count as 0 and non-numeric fields compare as text, so
/// `2.30.30.30 < 2.40.40.40 < 10.0`.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.trim().split('.');
    let mut right = b.trim().split('.');

    loop {
        let ordering = match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (l, r) => compare_field(l.unwrap_or("0"), r.unwrap_or("0")),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
}

fn compare_field(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}
