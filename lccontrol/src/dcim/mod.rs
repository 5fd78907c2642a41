//! Tables des classes DCIM, une par version du firmware
//!
//! Chaque sous-module décrit les classes disponibles à partir d'une version
//! du Lifecycle Controller. Le registre ([`crate::registry`]) choisit la
//! table à utiliser au moment de la connexion.

pub mod v2303030;

pub const LC_SERVICE: &str = "DCIM_LCService";
pub const JOB_SERVICE: &str = "DCIM_JobService";
pub const LIFECYCLE_JOB: &str = "DCIM_LifecycleJob";
pub const SYSTEM_VIEW: &str = "DCIM_SystemView";
pub const POWER_SERVICE: &str = "DCIM_CSPowerManagementService";
pub const SYSTEM_MANAGEMENT_SERVICE: &str = "DCIM_SystemManagementService";
pub const SOFTWARE_IDENTITY: &str = "DCIM_SoftwareIdentity";
pub const BIOS_SERVICE: &str = "DCIM_BIOSService";
pub const BIOS_ENUMERATION: &str = "DCIM_BIOSEnumeration";
pub const RAID_SERVICE: &str = "DCIM_RAIDService";
pub const CONTROLLER_VIEW: &str = "DCIM_ControllerView";
pub const ENCLOSURE_VIEW: &str = "DCIM_EnclosureView";
pub const PHYSICAL_DISK_VIEW: &str = "DCIM_PhysicalDiskView";
pub const VIRTUAL_DISK_VIEW: &str = "DCIM_VirtualDiskView";
