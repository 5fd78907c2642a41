//! SOAP Faults reported by the endpoint

use std::fmt;

use xmltree::Element;

use super::xml::{find_child, text_of};
use crate::namespace::SOAP_ENV;

/// Protocol-level error reported by the firmware. Terminal, never retried.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fault {
    /// `s:Code/s:Value`, e.g. `s:Sender`
    pub code: Option<String>,

    /// `s:Code/s:Subcode/s:Value`, e.g. `wsman:InvalidSelectors`
    pub subcode: Option<String>,

    /// `s:Reason/s:Text`
    pub reason: Option<String>,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Code: {}, Subcode: {}, Reason: {}",
            self.code.as_deref().unwrap_or_default(),
            self.subcode.as_deref().unwrap_or_default(),
            self.reason.as_deref().unwrap_or_default()
        )
    }
}

/// Extracts the fault carried by a SOAP body, if any.
pub(crate) fn extract_fault(body: &Element) -> Option<Fault> {
    let fault = find_child(body, SOAP_ENV, "Fault")?;

    let code_elem = find_child(fault, SOAP_ENV, "Code");
    let code = code_elem
        .and_then(|c| find_child(c, SOAP_ENV, "Value"))
        .map(text_of);
    let subcode = code_elem
        .and_then(|c| find_child(c, SOAP_ENV, "Subcode"))
        .and_then(|s| find_child(s, SOAP_ENV, "Value"))
        .map(text_of);
    let reason = find_child(fault, SOAP_ENV, "Reason")
        .and_then(|r| find_child(r, SOAP_ENV, "Text"))
        .map(text_of);

    Some(Fault {
        code,
        subcode,
        reason,
    })
}
