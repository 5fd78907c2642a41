//! Parser des réponses WS-Management
//!
//! Every entry point parses the document, looks for a `s:Fault` first and
//! only then runs the operation-specific extraction.

use std::io::Cursor;

use tracing::{debug, error};
use xmltree::Element;

use super::fault::extract_fault;
use super::properties::{Properties, Property, PullBatch, insert_coalescing};
use super::xml::{child_elements, find_child, find_children, find_descendants, text_of};
use crate::errors::WsmanError;
use crate::namespace::{self, ADDRESSING, ENUMERATION, SOAP_ENV, WSMAN, WSMAN_IDENTITY};

/// Parses `xml`, raises the fault it carries if any, and returns the SOAP body.
fn checked_body(xml: &[u8]) -> Result<Element, WsmanError> {
    let root = Element::parse(Cursor::new(xml))?;

    if root.name != "Envelope" || root.namespace.as_deref() != Some(SOAP_ENV) {
        return Err(WsmanError::element_not_found(
            "Response is not a SOAP 1.2 Envelope",
        ));
    }

    let body = find_child(&root, SOAP_ENV, "Body")
        .ok_or_else(|| WsmanError::element_not_found("Missing SOAP Body in response"))?;

    if let Some(fault) = extract_fault(body) {
        error!(%fault, "WSMAN fault in response");
        return Err(WsmanError::Fault(fault));
    }

    Ok(body.clone())
}

/// Only performs fault detection.
pub fn check_fault(xml: &[u8]) -> Result<(), WsmanError> {
    checked_body(xml).map(|_| ())
}

fn elements_to_properties<'a>(elements: impl Iterator<Item = &'a Element>) -> Properties {
    let mut properties = Properties::new();
    for elem in elements {
        insert_coalescing(&mut properties, &elem.name, text_of(elem));
    }
    properties
}

/// Identify: flat map of the identity fields (`ProductVendor`,
/// `ProductVersion`, `LifecycleControllerVersion`, ...).
pub fn parse_identify(xml: &[u8]) -> Result<Properties, WsmanError> {
    let body = checked_body(xml)?;
    let response = find_child(&body, WSMAN_IDENTITY, "IdentifyResponse")
        .ok_or_else(|| WsmanError::element_not_found("Missing IdentifyResponse in Identify response"))?;

    // Nested blocks such as SecurityProfiles are not identity fields.
    let fields = child_elements(response).filter(|e| child_elements(e).next().is_none());
    Ok(elements_to_properties(fields))
}

/// Get: properties of the single returned instance.
pub fn parse_get(xml: &[u8], class: &str) -> Result<Properties, WsmanError> {
    let body = checked_body(xml)?;
    let class_ns = namespace::resource_uri(class);

    let instance = find_child(&body, &class_ns, class).ok_or_else(|| {
        WsmanError::element_not_found(format!("No {} instance in Get response", class))
    })?;

    Ok(elements_to_properties(
        child_elements(instance).filter(|e| e.namespace.as_deref() == Some(class_ns.as_str())),
    ))
}

/// Enumerate: the enumeration context, nothing else.
pub fn parse_enumerate(xml: &[u8]) -> Result<String, WsmanError> {
    let body = checked_body(xml)?;

    find_child(&body, ENUMERATION, "EnumerateResponse")
        .and_then(|r| find_child(r, ENUMERATION, "EnumerationContext"))
        .map(text_of)
        .ok_or_else(|| {
            WsmanError::element_not_found("Failed to find EnumerationContext in Enumerate response")
        })
}

/// Pull: the batch of items plus the end-of-sequence flag. A missing
/// `EndOfSequence` element means more batches follow.
pub fn parse_pull(xml: &[u8], class: &str) -> Result<PullBatch, WsmanError> {
    let body = checked_body(xml)?;
    let class_ns = namespace::resource_uri(class);

    let response = find_child(&body, ENUMERATION, "PullResponse")
        .ok_or_else(|| WsmanError::element_not_found("Missing PullResponse in Pull response"))?;

    let end_of_sequence = find_child(response, ENUMERATION, "EndOfSequence").is_some();

    let items: Vec<Properties> = match find_child(response, ENUMERATION, "Items") {
        Some(items) => find_children(items, &class_ns, class)
            .map(|item| elements_to_properties(child_elements(item)))
            .collect(),
        None => Vec::new(),
    };

    if items.is_empty() {
        debug!(class, end_of_sequence, "Pull response carried no items");
    }

    Ok(PullBatch {
        items,
        end_of_sequence,
    })
}

/// Invoke: the `<method>_OUTPUT` properties.
///
/// An output element wrapping a `wsa:EndpointReference` (a job handle) is
/// replaced by the `InstanceID` selector of that reference. More than one
/// reference, or a reference without exactly one `InstanceID`, is ambiguous
/// and reported as [`WsmanError::ElementNotFound`].
pub fn parse_invoke(xml: &[u8], class: &str, method: &str) -> Result<Properties, WsmanError> {
    let body = checked_body(xml)?;
    let class_ns = namespace::resource_uri(class);
    let output_name = format!("{}_OUTPUT", method);

    let output = find_child(&body, &class_ns, &output_name).ok_or_else(|| {
        WsmanError::element_not_found(format!("Missing {} in Invoke response", output_name))
    })?;

    let elements: Vec<&Element> = child_elements(output)
        .filter(|e| e.namespace.as_deref() == Some(class_ns.as_str()))
        .collect();

    if elements.is_empty() {
        return Err(WsmanError::element_not_found(format!(
            "No elements found in {}",
            output_name
        )));
    }

    let references: Vec<&Element> = elements
        .iter()
        .copied()
        .filter(|e| find_child(e, ADDRESSING, "EndpointReference").is_some())
        .collect();

    if references.len() > 1 {
        return Err(WsmanError::element_not_found(format!(
            "Found {} endpoint references in {}, expected at most one",
            references.len(),
            output_name
        )));
    }

    let mut properties = Properties::new();
    for elem in elements {
        if references.first().is_some_and(|r| std::ptr::eq(*r, elem)) {
            let instance_id = referenced_instance_id(elem)?;
            debug!(element = %elem.name, instance_id = %instance_id, "Resolved endpoint reference");
            properties.insert(elem.name.clone(), Property::Text(instance_id));
        } else {
            insert_coalescing(&mut properties, &elem.name, text_of(elem));
        }
    }

    Ok(properties)
}

fn referenced_instance_id(elem: &Element) -> Result<String, WsmanError> {
    let mut selectors = Vec::new();
    find_descendants(elem, WSMAN, "Selector", &mut selectors);

    let ids: Vec<&Element> = selectors
        .into_iter()
        .filter(|s| s.attributes.get("Name").map(String::as_str) == Some("InstanceID"))
        .collect();

    match ids.as_slice() {
        [only] => Ok(text_of(only)),
        _ => Err(WsmanError::element_not_found(format!(
            "Expected exactly one InstanceID selector in {} reference, found {}",
            elem.name,
            ids.len()
        ))),
    }
}
