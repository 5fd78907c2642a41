//! # lcwsman - moteur WS-Management pour Lifecycle Controller
//!
//! Client bloquant pour le protocole WS-Management (SOAP 1.2, WS-Addressing,
//! WS-Enumeration, WS-Transfer) exposé par les contrôleurs de gestion hors
//! bande.
//!
//! ## Couches
//!
//! - [`transport`] : envoi HTTPS d'une enveloppe, avec reprise bornée des
//!   erreurs de connexion
//! - [`soap`] : construction des enveloppes et analyse des réponses
//! - [`enumeration`] : pagination Enumerate / Pull
//! - [`selectors`] : résolution et cache des sélecteurs d'Invoke
//! - [`WsmanClient`] : les cinq opérations
//!
//! ## Example
//!
//! ```ignore
//! use lcwsman::{BasicAuth, Endpoint, WsmanClient};
//!
//! let endpoint = Endpoint::new("10.0.0.5", BasicAuth::new("root", "calvin"));
//! let client = WsmanClient::connect(&endpoint);
//!
//! let identity = client.identify()?;
//! let nics = client.enumerate("DCIM_NICView")?;
//! ```

pub mod client;
pub mod enumeration;
pub mod errors;
pub mod namespace;
pub mod selectors;
pub mod soap;
pub mod transport;

pub use client::WsmanClient;
pub use enumeration::Pager;
pub use errors::WsmanError;
pub use selectors::{INVOKE_SELECTOR_KEYS, SelectorCache};
pub use soap::{CimReference, Fault, Properties, Property, PropertyValue, PullBatch, SelectorSet};
pub use transport::{BasicAuth, Endpoint, HttpConfig, HttpTransport, MockTransport, Transport};
