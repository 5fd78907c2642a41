//! DCIM client: WS-Management calls typed by the class tables.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use lcwsman::soap::text;
use lcwsman::{
    CimReference, HttpTransport, Properties, PropertyValue, SelectorSet, Transport, WsmanClient,
};
use tracing::{debug, error, info};

use crate::errors::LcError;
use crate::qualified::{DcimInstance, QualifiedProperties};
use crate::registry::{SchemaRegistry, SchemaSet};
use crate::schema::{ArgDef, ClassDef, MethodDef, Qualifiers};

/// Keys tried, in order, for classes that declare none.
pub const DEFAULT_KEYS: [&str; 3] = ["InstanceID", "FQDD", "CreationClassName"];

/// Return values meaning the command was accepted.
pub const ACCEPTED_RETURN_VALUES: [&str; 2] = ["0", "4096"];

/// Argument passed to [`DcimClient::invoke`].
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Text(String),
    /// Sent as one property per item.
    List(Vec<String>),
    Reference(CimReference),
    /// Not sent.
    None,
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Text(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::Text(value)
    }
}

impl From<Vec<String>> for ArgValue {
    fn from(values: Vec<String>) -> Self {
        ArgValue::List(values)
    }
}

impl From<&[&str]> for ArgValue {
    fn from(values: &[&str]) -> Self {
        ArgValue::List(values.iter().map(|v| v.to_string()).collect())
    }
}

impl From<CimReference> for ArgValue {
    fn from(reference: CimReference) -> Self {
        ArgValue::Reference(reference)
    }
}

impl<V: Into<ArgValue>> From<Option<V>> for ArgValue {
    fn from(value: Option<V>) -> Self {
        value.map(Into::into).unwrap_or(ArgValue::None)
    }
}

pub struct DcimClient<T: Transport = HttpTransport> {
    wsman: WsmanClient<T>,
    schema: SchemaSet,
    lc_version: String,
    detected_keys: RefCell<HashMap<&'static str, &'static str>>,
}

impl<T: Transport> DcimClient<T> {
    /// Identifies the firmware and selects the class tables for its version.
    pub fn connect(wsman: WsmanClient<T>) -> Result<Self, LcError> {
        Self::connect_with_registry(wsman, &SchemaRegistry::builtin())
    }

    pub fn connect_with_registry(
        wsman: WsmanClient<T>,
        registry: &SchemaRegistry,
    ) -> Result<Self, LcError> {
        let identify = wsman.identify()?;
        let lc_version = text(&identify, "LifecycleControllerVersion")
            .ok_or_else(|| {
                LcError::Value("Identify response has no LifecycleControllerVersion".to_string())
            })?
            .to_string();

        let schema = registry.resolve(&lc_version)?;
        info!(lc_version = %lc_version, schema = schema.version, "Connected to LifeCycle controller");

        Ok(Self {
            wsman,
            schema,
            lc_version,
            detected_keys: RefCell::new(HashMap::new()),
        })
    }

    pub fn lc_version(&self) -> &str {
        &self.lc_version
    }

    pub fn schema(&self) -> &SchemaSet {
        &self.schema
    }

    pub fn wsman(&self) -> &WsmanClient<T> {
        &self.wsman
    }

    pub fn class(&self, name: &str) -> Result<&'static ClassDef, LcError> {
        self.schema.class(name)
    }

    /// Property used to address instances of `class` in Get.
    pub fn key_of(&self, class: &ClassDef) -> &'static str {
        class
            .key
            .or_else(|| self.detected_keys.borrow().get(class.name).copied())
            .unwrap_or("InstanceID")
    }

    pub fn get(&self, class: &str, key_value: &str) -> Result<DcimInstance, LcError> {
        let class = self.class(class)?;
        let key = self.key_of(class);
        if class.key.is_none() {
            debug!(class = class.name, key, "Class has no declared key");
        }

        let mut selectors = SelectorSet::new();
        selectors.insert(key, key_value);

        let raw = self.wsman.get(class.name, &selectors)?;
        Ok(DcimInstance::new(class, raw))
    }

    /// Every instance of `class`, keyed by its key property.
    ///
    /// Classes without a declared key use the first of [`DEFAULT_KEYS`]
    /// found in the response; the detected key is then used by [`get`].
    /// Instances without any key are named `UnknownKey.<n>`.
    ///
    /// [`get`]: DcimClient::get
    pub fn enumerate(&self, class: &str) -> Result<BTreeMap<String, DcimInstance>, LcError> {
        let class = self.class(class)?;
        let mut key = class
            .key
            .or_else(|| self.detected_keys.borrow().get(class.name).copied());

        let mut instances = BTreeMap::new();
        for (count, raw) in self.wsman.enumerate(class.name)?.into_iter().enumerate() {
            if key.is_none() {
                key = DEFAULT_KEYS.into_iter().find(|k| raw.contains_key(*k));
                if let Some(detected) = key {
                    debug!(class = class.name, key = detected, "Detected instance key");
                    self.detected_keys.borrow_mut().insert(class.name, detected);
                }
            }

            let name = key
                .and_then(|k| text(&raw, k))
                .map(str::to_string)
                .unwrap_or_else(|| format!("UnknownKey.{}", count));
            instances.insert(name, DcimInstance::new(class, raw));
        }

        Ok(instances)
    }

    /// Invokes `method` on the service instance of `class`.
    ///
    /// Arguments given as display strings are translated back to raw values
    /// through the argument value-map. The command must be accepted by the
    /// firmware (`ReturnValue` 0 or 4096).
    pub fn invoke(
        &self,
        class: &str,
        method: &str,
        args: &[(&str, ArgValue)],
    ) -> Result<QualifiedProperties, LcError> {
        let class = self.class(class)?;
        let method = class
            .method(method)
            .ok_or_else(|| LcError::unknown_method(class.name, method))?;

        let properties = build_properties(class, method, args)?;
        let raw = self.wsman.invoke(class.name, method.name, &properties)?;
        check_return_value(class, method, &raw)?;

        Ok(QualifiedProperties::qualify(raw, |name| {
            method
                .output(name)
                .map(|a| a.qualifiers)
                .unwrap_or(Qualifiers::NONE)
        }))
    }
}

/// Input properties of `method`, in declaration order.
fn build_properties(
    class: &ClassDef,
    method: &MethodDef,
    args: &[(&str, ArgValue)],
) -> Result<Vec<(String, PropertyValue)>, LcError> {
    if let Some((name, _)) = args.iter().find(|(name, _)| method.input(name).is_none()) {
        return Err(LcError::Argument(format!(
            "{}.{} has no argument '{}'",
            class.name, method.name, name
        )));
    }

    let mut properties = Vec::new();
    for def in method.inputs() {
        let value = args
            .iter()
            .find(|(name, _)| *name == def.name)
            .map(|(_, value)| value)
            .unwrap_or(&ArgValue::None);

        match value {
            ArgValue::None if def.required => {
                return Err(LcError::Argument(format!(
                    "{}.{} requires argument '{}'",
                    class.name, method.name, def.name
                )));
            }
            ArgValue::None => {}
            ArgValue::Text(v) => properties.push((def.name.to_string(), unmap(def, v)?)),
            ArgValue::List(items) => {
                for item in items {
                    properties.push((def.name.to_string(), unmap(def, item)?));
                }
            }
            ArgValue::Reference(reference) => {
                properties.push((def.name.to_string(), reference.clone().into()))
            }
        }
    }

    Ok(properties)
}

fn unmap(def: &ArgDef, value: &str) -> Result<PropertyValue, LcError> {
    def.qualifiers
        .unmap(value)
        .map(PropertyValue::from)
        .ok_or_else(|| {
            let allowed: Vec<_> = def.qualifiers.value_map.iter().map(|(_, d)| *d).collect();
            LcError::Argument(format!(
                "The provided value '{}' for argument '{}' is not in the list of mapped values: {:?}",
                value, def.name, allowed
            ))
        })
}

fn check_return_value(class: &ClassDef, method: &MethodDef, raw: &Properties) -> Result<(), LcError> {
    let return_value = text(raw, "ReturnValue").ok_or_else(|| {
        let message = format!("No 'ReturnValue' in {}.{} output", class.name, method.name);
        error!("{}", message);
        LcError::Value(message)
    })?;

    if ACCEPTED_RETURN_VALUES.contains(&return_value) {
        return Ok(());
    }

    let message_id = text(raw, "MessageID").unwrap_or_default();
    let message = text(raw, "Message").unwrap_or_default();
    error!(
        class = class.name,
        method = method.name,
        return_value,
        message_id,
        "Expected {:?}, got {}: {}",
        ACCEPTED_RETURN_VALUES,
        return_value,
        message
    );

    Err(LcError::Command {
        return_value: return_value.to_string(),
        message_id: message_id.to_string(),
        message: message.to_string(),
    })
}
