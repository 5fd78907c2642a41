//! # lccontrol
//!
//! Couche DCIM et orchestration des jobs pour les Lifecycle Controllers.
//!
//! - [`DcimClient`] : appels WS-Management typés par les tables de classes
//!   ([`schema`], [`dcim`]), sélectionnées selon la version du firmware
//!   ([`registry`])
//! - [`QualifiedValue`] : valeur brute et sa forme affichable (value-map,
//!   unités)
//! - [`Lifecycle`] : attente du contrôleur, files de jobs, redémarrages,
//!   LED d'identification, alimentation, santé, BIOS, RAID
//!
//! ## Exemple
//!
//! ```no_run
//! use lcconfig::Config;
//! use lccontrol::{DcimClient, Lifecycle, settings};
//! use lcwsman::WsmanClient;
//!
//! let config = Config::load("")?;
//! let wsman = WsmanClient::connect(&settings::endpoint(&config, "192.168.0.120")?);
//! let lifecycle = Lifecycle::new(DcimClient::connect(wsman)?, settings::poll_settings(&config));
//!
//! lifecycle.poll_lc_ready()?;
//! println!("{}", lifecycle.health_report()?);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod bios;
pub mod client;
pub mod countdown;
pub mod dcim;
pub mod errors;
pub mod lifecycle;
pub mod qualified;
pub mod raid;
pub mod registry;
pub mod schema;
pub mod settings;

pub use client::{ArgValue, DcimClient};
pub use countdown::{Clock, Countdown, ManualClock, SystemClock};
pub use errors::LcError;
pub use lifecycle::{
    ChassisStatus, HealthReport, JobInfo, JobOutcome, JobState, Lifecycle, PollSettings,
    SystemInfo,
};
pub use qualified::{DcimInstance, QualifiedProperties, QualifiedValue};
pub use raid::{DriveRole, RaidInventory, RaidLayout, RaidLevel, VirtualDiskSpec};
pub use registry::{SchemaRegistry, SchemaSet};
