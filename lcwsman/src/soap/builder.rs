//! Construction des requêtes WS-Management
//!
//! Every request except Identify starts from the same addressing template
//! (Action, To, ResourceURI, MessageID, ReplyTo). The builders locate the
//! template anchors they fill in; a missing anchor is a programming defect
//! reported as [`WsmanError::EnvelopeBuild`].

use uuid::Uuid;
use xmltree::Element;

use super::envelope::{CimReference, Envelope, PropertyValue, SelectorSet};
use super::xml::{find_child_mut, push_element, text_element};
use crate::errors::WsmanError;
use crate::namespace::{
    self, ADDRESSING, ANONYMOUS, ENUMERATION, SOAP_ENV, TRANSFER, WSMAN, WSMAN_IDENTITY,
};

/// Batch size requested by Pull when the caller does not choose one.
pub const DEFAULT_MAX_ELEMENTS: u32 = 50;

pub fn get_action() -> String {
    format!("{}/Get", TRANSFER)
}

pub fn enumerate_action() -> String {
    format!("{}/Enumerate", ENUMERATION)
}

pub fn pull_action() -> String {
    format!("{}/Pull", ENUMERATION)
}

/// Action URI of a method invocation: `<resourceURI>/<method>`.
pub fn invoke_action(class: &str, method: &str) -> String {
    format!("{}/{}", namespace::resource_uri(class), method)
}

fn serialize(root: &Element) -> Result<String, WsmanError> {
    let mut buf = Vec::new();
    let config = xmltree::EmitterConfig::new()
        .write_document_declaration(true)
        .perform_indent(true)
        .indent_string("  ");
    root.write_with_config(&mut buf, config)
        .map_err(|err| WsmanError::envelope_build(format!("XML serialization failed: {}", err)))?;

    String::from_utf8(buf)
        .map_err(|err| WsmanError::envelope_build(format!("Serialized envelope is not UTF-8: {}", err)))
}

/// Class, method and property names end up as element names.
fn ensure_xml_name(kind: &str, name: &str) -> Result<(), WsmanError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(WsmanError::envelope_build(format!(
            "{} '{}' is not a valid element name",
            kind, name
        )))
    }
}

fn must_understand(name: &str) -> Element {
    let mut elem = Element::new(name);
    elem.attributes
        .insert("s:mustUnderstand".to_string(), "true".to_string());
    elem
}

fn selector_set_element(selectors: &SelectorSet) -> Element {
    let mut set = Element::new("wsman:SelectorSet");
    for (name, value) in selectors.iter() {
        let mut selector = text_element("wsman:Selector", value);
        selector
            .attributes
            .insert("Name".to_string(), name.to_string());
        push_element(&mut set, selector);
    }
    set
}

/// Fills `parent` with the addressable-reference block of `reference`.
fn append_reference(parent: &mut Element, reference: &CimReference) {
    push_element(parent, text_element("wsa:Address", ANONYMOUS));

    let mut params = Element::new("wsa:ReferenceParameters");
    push_element(
        &mut params,
        text_element("wsman:ResourceURI", &reference.resource_uri),
    );
    push_element(&mut params, selector_set_element(&reference.selectors));
    push_element(parent, params);
}

/// The addressing template shared by Get, Enumerate, Pull and Invoke.
struct AddressedTemplate {
    root: Element,
    action: String,
}

impl AddressedTemplate {
    fn new(to: &str, action: String, resource_uri: &str) -> Result<Self, WsmanError> {
        let mut header = Element::new("s:Header");
        push_element(&mut header, must_understand("wsa:Action"));
        push_element(&mut header, must_understand("wsa:To"));
        push_element(&mut header, must_understand("wsman:ResourceURI"));
        push_element(&mut header, must_understand("wsa:MessageID"));
        let mut reply_to = Element::new("wsa:ReplyTo");
        push_element(&mut reply_to, text_element("wsa:Address", ANONYMOUS));
        push_element(&mut header, reply_to);

        let mut root = Element::new("s:Envelope");
        root.attributes
            .insert("xmlns:s".to_string(), SOAP_ENV.to_string());
        root.attributes
            .insert("xmlns:wsa".to_string(), ADDRESSING.to_string());
        root.attributes
            .insert("xmlns:wsman".to_string(), WSMAN.to_string());
        push_element(&mut root, header);
        push_element(&mut root, Element::new("s:Body"));

        let mut template = AddressedTemplate { root, action };
        let action = template.action.clone();
        template.set_header_text("wsa:Action", &action)?;
        template.set_header_text("wsa:To", to)?;
        template.set_header_text("wsman:ResourceURI", resource_uri)?;
        Ok(template)
    }

    fn section_mut(&mut self, name: &str) -> Result<&mut Element, WsmanError> {
        find_child_mut(&mut self.root, name)
            .ok_or_else(|| WsmanError::envelope_build(format!("Template anchor '{}' not found", name)))
    }

    fn set_header_text(&mut self, name: &str, text: &str) -> Result<(), WsmanError> {
        let header = self.section_mut("s:Header")?;
        let elem = find_child_mut(header, name).ok_or_else(|| {
            WsmanError::envelope_build(format!("Template anchor 's:Header/{}' not found", name))
        })?;
        elem.children.clear();
        elem.children.push(xmltree::XMLNode::Text(text.to_string()));
        Ok(())
    }

    fn add_selectors(&mut self, selectors: &SelectorSet) -> Result<(), WsmanError> {
        let header = self.section_mut("s:Header")?;
        push_element(header, selector_set_element(selectors));
        Ok(())
    }

    fn add_body(&mut self, content: Element) -> Result<(), WsmanError> {
        let body = self.section_mut("s:Body")?;
        push_element(body, content);
        Ok(())
    }

    /// Stamps a fresh MessageID and serializes.
    fn finish(mut self) -> Result<Envelope, WsmanError> {
        let message_id = format!("uuid:{}", Uuid::new_v4());
        self.set_header_text("wsa:MessageID", &message_id)?;

        Ok(Envelope {
            message_id: Some(message_id),
            action: Some(self.action),
            document: serialize(&self.root)?,
        })
    }
}

/// Identify predates the addressing and management namespaces: basic SOAP
/// with a `wsmid:Identify` body and an empty header.
pub fn build_identify() -> Result<Envelope, WsmanError> {
    let mut root = Element::new("s:Envelope");
    root.attributes
        .insert("xmlns:s".to_string(), SOAP_ENV.to_string());
    root.attributes
        .insert("xmlns:wsmid".to_string(), WSMAN_IDENTITY.to_string());

    let mut body = Element::new("s:Body");
    push_element(&mut body, Element::new("wsmid:Identify"));
    push_element(&mut root, Element::new("s:Header"));
    push_element(&mut root, body);

    Ok(Envelope {
        message_id: None,
        action: None,
        document: serialize(&root)?,
    })
}

/// WS-Transfer Get of the instance of `class` identified by `selectors`.
pub fn build_get(to: &str, class: &str, selectors: &SelectorSet) -> Result<Envelope, WsmanError> {
    ensure_xml_name("class", class)?;

    let mut template =
        AddressedTemplate::new(to, get_action(), &namespace::resource_uri(class))?;
    template.add_selectors(selectors)?;
    template.finish()
}

/// WS-Enumeration Enumerate requesting a new context.
pub fn build_enumerate(to: &str, class: &str) -> Result<Envelope, WsmanError> {
    ensure_xml_name("class", class)?;

    let mut template =
        AddressedTemplate::new(to, enumerate_action(), &namespace::resource_uri(class))?;
    let mut enumerate = Element::new("wsen:Enumerate");
    enumerate
        .attributes
        .insert("xmlns:wsen".to_string(), ENUMERATION.to_string());
    template.add_body(enumerate)?;
    template.finish()
}

/// WS-Enumeration Pull. A batch size above one also requests the
/// server-side enumeration optimization.
pub fn build_pull(
    to: &str,
    class: &str,
    context: &str,
    max_elements: u32,
) -> Result<Envelope, WsmanError> {
    ensure_xml_name("class", class)?;

    let mut template = AddressedTemplate::new(to, pull_action(), &namespace::resource_uri(class))?;

    let mut pull = Element::new("wsen:Pull");
    pull.attributes
        .insert("xmlns:wsen".to_string(), ENUMERATION.to_string());
    push_element(&mut pull, text_element("wsen:EnumerationContext", context));
    if max_elements > 1 {
        push_element(&mut pull, Element::new("wsman:OptimizeEnumeration"));
        push_element(
            &mut pull,
            text_element("wsman:MaxElements", &max_elements.to_string()),
        );
    }

    template.add_body(pull)?;
    template.finish()
}

/// Method invocation. `properties` become the children of
/// `<method>_INPUT`, in order; a name may repeat to pass an array.
pub fn build_invoke(
    to: &str,
    class: &str,
    method: &str,
    selectors: &SelectorSet,
    properties: &[(String, PropertyValue)],
) -> Result<Envelope, WsmanError> {
    ensure_xml_name("class", class)?;
    ensure_xml_name("method", method)?;

    let resource_uri = namespace::resource_uri(class);
    let mut template = AddressedTemplate::new(to, invoke_action(class, method), &resource_uri)?;
    template.add_selectors(selectors)?;

    let mut input = Element::new(&format!("p:{}_INPUT", method));
    input
        .attributes
        .insert("xmlns:p".to_string(), resource_uri.clone());

    for (name, value) in properties {
        ensure_xml_name("property", name)?;
        let elem_name = format!("p:{}", name);
        let elem = match value {
            PropertyValue::Text(text) => text_element(&elem_name, text),
            PropertyValue::Reference(reference) => {
                let mut elem = Element::new(&elem_name);
                append_reference(&mut elem, reference);
                elem
            }
        };
        push_element(&mut input, elem);
    }

    template.add_body(input)?;
    template.finish()
}
