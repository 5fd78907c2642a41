//! Static description of DCIM classes.
//!
//! Tables are plain data: attribute names with their value-maps and
//! qualifiers, and methods with their arguments. Nothing is synthesized at
//! runtime; attributes returned by the firmware but missing from a table are
//! kept, unqualified.

/// Raw value → display string.
pub type ValueMap = &'static [(&'static str, &'static str)];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Qualifiers {
    pub value_map: ValueMap,
    pub units: Option<&'static str>,
    pub punit: Option<&'static str>,
    pub description: &'static [&'static str],
}

impl Qualifiers {
    pub const NONE: Qualifiers = Qualifiers {
        value_map: &[],
        units: None,
        punit: None,
        description: &[],
    };

    pub const fn mapped(value_map: ValueMap) -> Self {
        Qualifiers {
            value_map,
            units: None,
            punit: None,
            description: &[],
        }
    }

    /// Display string of `raw`, if mapped.
    pub fn map_value(&self, raw: &str) -> Option<&'static str> {
        self.value_map
            .iter()
            .find(|(key, _)| *key == raw)
            .map(|(_, display)| *display)
    }

    /// Raw value for an argument given either as a display string (any case)
    /// or already as a raw value. `None` when the value-map knows neither.
    pub fn unmap<'a>(&self, value: &'a str) -> Option<&'a str> {
        if self.value_map.is_empty() {
            return Some(value);
        }
        self.value_map
            .iter()
            .find(|(_, display)| display.eq_ignore_ascii_case(value))
            .map(|(raw, _)| *raw)
            .or_else(|| self.map_value(value).map(|_| value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDef {
    pub name: &'static str,
    pub qualifiers: Qualifiers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgDef {
    pub name: &'static str,
    pub direction: Direction,
    pub required: bool,
    pub qualifiers: Qualifiers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodDef {
    pub name: &'static str,
    pub args: &'static [ArgDef],
}

impl MethodDef {
    /// Input arguments, in declaration order.
    pub fn inputs(&self) -> impl Iterator<Item = &'static ArgDef> + use<> {
        self.args.iter().filter(|a| a.direction == Direction::In)
    }

    pub fn input(&self, name: &str) -> Option<&'static ArgDef> {
        self.inputs().find(|a| a.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&'static ArgDef> {
        self.args
            .iter()
            .find(|a| a.direction == Direction::Out && a.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassDef {
    pub name: &'static str,
    /// Property used to address instances in Get. `None` when the schema
    /// declares no key.
    pub key: Option<&'static str>,
    pub attributes: &'static [AttributeDef],
    pub methods: &'static [MethodDef],
}

impl ClassDef {
    pub fn attribute(&self, name: &str) -> Option<&'static AttributeDef> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&'static MethodDef> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Qualifiers of attribute `name`, empty when not declared.
    pub fn qualifiers(&self, name: &str) -> Qualifiers {
        self.attribute(name)
            .map(|a| a.qualifiers)
            .unwrap_or(Qualifiers::NONE)
    }
}

pub(crate) const fn attr(name: &'static str) -> AttributeDef {
    AttributeDef {
        name,
        qualifiers: Qualifiers::NONE,
    }
}

pub(crate) const fn mapped_attr(name: &'static str, value_map: ValueMap) -> AttributeDef {
    AttributeDef {
        name,
        qualifiers: Qualifiers::mapped(value_map),
    }
}

pub(crate) const fn arg_in(name: &'static str, required: bool, value_map: ValueMap) -> ArgDef {
    ArgDef {
        name,
        direction: Direction::In,
        required,
        qualifiers: Qualifiers::mapped(value_map),
    }
}

pub(crate) const fn arg_out(name: &'static str, value_map: ValueMap) -> ArgDef {
    ArgDef {
        name,
        direction: Direction::Out,
        required: false,
        qualifiers: Qualifiers::mapped(value_map),
    }
}
