//! # Module SOAP - enveloppes WS-Management
//!
//! Construction des requêtes SOAP 1.2 et extraction des réponses pour les cinq
//! opérations WS-Management utilisées par le contrôleur.
//!
//! ## Fonctionnalités
//!
//! - Construction des enveloppes Identify, Get, Enumerate, Pull et Invoke
//! - Sélecteurs ordonnés et références CIM en argument de méthode
//! - Détection des SOAP Faults avant toute extraction
//! - Coalescence des propriétés répétées (tableaux CIM)
//!
//! ## Architecture
//!
//! - [`Envelope`] : requête sérialisée, avec son MessageID
//! - [`SelectorSet`] / [`CimReference`] : adressage d'une instance
//! - [`Properties`] : propriétés extraites d'une réponse
//! - [`Fault`] : erreur SOAP
//!
//! ## Example
//!
//! ```ignore
//! use lcwsman::soap::{SelectorSet, build_get, parse_get};
//!
//! let mut selectors = SelectorSet::with_cim_namespace();
//! selectors.insert("InstanceID", "System.Embedded.1");
//!
//! let envelope = build_get("https://10.0.0.5:443/wsman", "DCIM_SystemView", &selectors)?;
//! // ... post envelope.document ...
//! let props = parse_get(&response_bytes, "DCIM_SystemView")?;
//! ```

mod builder;
mod envelope;
mod fault;
mod parser;
mod properties;
mod xml;

pub use builder::{
    DEFAULT_MAX_ELEMENTS, build_enumerate, build_get, build_identify, build_invoke, build_pull,
    enumerate_action, get_action, invoke_action, pull_action,
};
pub use envelope::{CimReference, Envelope, PropertyValue, SelectorSet};
pub use fault::Fault;
pub use parser::{check_fault, parse_enumerate, parse_get, parse_identify, parse_invoke, parse_pull};
pub use properties::{Properties, Property, PullBatch, insert_coalescing, text};
