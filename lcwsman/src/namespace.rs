//! Namespaces and well-known URIs of the WS-Management stack.

/// SOAP 1.2 envelope
pub const SOAP_ENV: &str = "http://www.w3.org/2003/05/soap-envelope";

/// WS-Addressing (2004/08)
pub const ADDRESSING: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing";

/// WS-Management
pub const WSMAN: &str = "http://schemas.dmtf.org/wbem/wsman/1/wsman.xsd";

/// WS-Management identity (Identify operation)
pub const WSMAN_IDENTITY: &str = "http://schemas.dmtf.org/wbem/wsman/identity/1/wsmanidentity.xsd";

/// WS-Transfer (Get)
pub const TRANSFER: &str = "http://schemas.xmlsoap.org/ws/2004/09/transfer";

/// WS-Enumeration (Enumerate / Pull)
pub const ENUMERATION: &str = "http://schemas.xmlsoap.org/ws/2004/09/enumeration";

/// Vendor CIM schema root. Not standard.
pub const DCIM: &str = "http://schemas.dell.com/wbem/wscim/1/cim-schema/2";

/// Anonymous reply address used for ReplyTo and object references.
pub const ANONYMOUS: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing/role/anonymous";

/// Selector naming the CIM namespace of the target instance.
pub const CIM_NAMESPACE_SELECTOR: &str = "__cimnamespace";

/// CIM namespace hosting the DCIM classes.
pub const DCIM_NAMESPACE: &str = "root/dcim";

/// Resource URI of a DCIM class, e.g. `DCIM_NICView`.
pub fn resource_uri(class: &str) -> String {
    format!("{}/{}", DCIM, class)
}
