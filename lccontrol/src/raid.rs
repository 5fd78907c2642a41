//! RAID configuration through the RAID service and the storage views.
//!
//! A [`RaidLayout`] describes the wanted state of every drive: member of a
//! virtual disk, global hot spare or pass-through (Non-RAID). Applying it
//! wipes the virtual disks of the controllers it touches and rebuilds them.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use lcwsman::Transport;
use tracing::{error, info, warn};

use crate::client::ArgValue;
use crate::countdown::Clock;
use crate::dcim::{
    CONTROLLER_VIEW, ENCLOSURE_VIEW, PHYSICAL_DISK_VIEW, RAID_SERVICE, VIRTUAL_DISK_VIEW,
};
use crate::errors::LcError;
use crate::lifecycle::Lifecycle;
use crate::qualified::{DcimInstance, QualifiedProperties};

/// MessageID returned by CreateTargetedConfigJob when nothing is pending.
const NO_CONFIGURATION_CHANGE: &str = "STOR026";

const BAD_STATUS: &[(&str, &[&str])] = &[("PrimaryStatus", &["Degraded", "Error"])];

const BAD_DISK_STATUS: &[(&str, &[&str])] = &[
    ("RaidStatus", &["Offline", "Blocked", "Failed", "Degraded"]),
    ("PrimaryStatus", &["Degraded", "Error"]),
    ("PredictiveFailureState", &["Smart Alert Present"]),
];

/// Storage views, each keyed by FQDD.
#[derive(Debug, Clone, Default)]
pub struct RaidInventory {
    pub virtual_disks: BTreeMap<String, DcimInstance>,
    pub enclosures: BTreeMap<String, DcimInstance>,
    pub controllers: BTreeMap<String, DcimInstance>,
    pub physical_disks: BTreeMap<String, DcimInstance>,
}

impl RaidInventory {
    /// Controllers holding a disk with a foreign configuration.
    pub fn foreign_controllers(&self) -> BTreeSet<String> {
        self.physical_disks
            .iter()
            .filter(|(_, disk)| attribute_value(disk, "RaidStatus") == Some("Foreign"))
            .filter_map(|(fqdd, _)| {
                warn!("Disk {} is foreign.", fqdd);
                fqdd.split(':').nth(2).map(str::to_string)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RaidLevel {
    Raid0,
    Raid1,
    Raid5,
    Raid6,
    Raid10,
    Raid50,
    Raid60,
}

impl RaidLevel {
    /// Value expected by CreateVirtualDisk for `RAIDLevel`.
    pub fn raw(self) -> &'static str {
        match self {
            RaidLevel::Raid0 => "2",
            RaidLevel::Raid1 => "4",
            RaidLevel::Raid5 => "64",
            RaidLevel::Raid6 => "128",
            RaidLevel::Raid10 => "2048",
            RaidLevel::Raid50 => "8192",
            RaidLevel::Raid60 => "16384",
        }
    }
}

impl fmt::Display for RaidLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RaidLevel::Raid0 => "RAID0",
            RaidLevel::Raid1 => "RAID1",
            RaidLevel::Raid5 => "RAID5",
            RaidLevel::Raid6 => "RAID6",
            RaidLevel::Raid10 => "RAID10",
            RaidLevel::Raid50 => "RAID50",
            RaidLevel::Raid60 => "RAID60",
        };
        f.write_str(name)
    }
}

/// Accepte `RAID10`, `raid-10` ou `Raid10`.
impl FromStr for RaidLevel {
    type Err = LcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "").as_str() {
            "RAID0" => Ok(RaidLevel::Raid0),
            "RAID1" => Ok(RaidLevel::Raid1),
            "RAID5" => Ok(RaidLevel::Raid5),
            "RAID6" => Ok(RaidLevel::Raid6),
            "RAID10" => Ok(RaidLevel::Raid10),
            "RAID50" => Ok(RaidLevel::Raid50),
            "RAID60" => Ok(RaidLevel::Raid60),
            _ => Err(LcError::Configuration(format!("Unknown RAID level {}", s))),
        }
    }
}

/// A virtual disk to create, named by its FQDD (`Disk.Virtual.0:RAID.Integrated.1-1`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualDiskSpec {
    fqdd: String,
    pub level: RaidLevel,
    pub span_depth: u32,
    pub span_length: u32,
    pub name: Option<String>,
    pub drives: Vec<String>,
}

impl VirtualDiskSpec {
    /// A single span over `drives`.
    pub fn new(fqdd: &str, level: RaidLevel, drives: Vec<String>) -> Result<Self, LcError> {
        if fqdd.split(':').nth(1).is_none_or(str::is_empty) {
            let message = format!("Virtual disk {} does not name its controller", fqdd);
            error!("{}", message);
            return Err(LcError::Configuration(message));
        }
        if drives.is_empty() {
            return Err(LcError::Configuration(format!(
                "Virtual disk {} has no physical disk",
                fqdd
            )));
        }

        Ok(Self {
            fqdd: fqdd.to_string(),
            level,
            span_depth: 1,
            span_length: drives.len() as u32,
            name: None,
            drives,
        })
    }

    pub fn with_span(mut self, depth: u32, length: u32) -> Self {
        self.span_depth = depth;
        self.span_length = length;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn fqdd(&self) -> &str {
        &self.fqdd
    }

    /// Controller FQDD.
    pub fn target(&self) -> &str {
        self.fqdd.split(':').nth(1).unwrap_or_default()
    }

    /// `VDPropNameArray` and `VDPropValueArray` for CreateVirtualDisk.
    pub fn properties(&self) -> (Vec<String>, Vec<String>) {
        let mut properties = vec![
            ("RAIDLevel", self.level.raw().to_string()),
            ("SpanDepth", self.span_depth.to_string()),
            ("SpanLength", self.span_length.to_string()),
        ];
        if let Some(name) = &self.name {
            properties.push(("VirtualDiskName", name.clone()));
        }

        properties
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .unzip()
    }
}

/// Role of a drive outside any virtual disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveRole {
    NonRaid,
    Spare,
}

/// Wanted state of every drive of the host.
#[derive(Debug, Clone)]
pub struct RaidLayout {
    name: String,
    virtual_disks: Vec<VirtualDiskSpec>,
    raid: BTreeSet<String>,
    jbod: BTreeSet<String>,
    spares: BTreeSet<String>,
    explicit_jbod: bool,
    controllers: BTreeSet<String>,
}

impl RaidLayout {
    /// Checks the layout against the drives present on the host.
    ///
    /// Drives left out of both `virtual_disks` and `drive_roles` become
    /// pass-through drives.
    pub fn new<S: AsRef<str>>(
        name: &str,
        virtual_disks: Vec<VirtualDiskSpec>,
        drive_roles: &BTreeMap<String, DriveRole>,
        physical_drives: impl IntoIterator<Item = S>,
    ) -> Result<Self, LcError> {
        let present: BTreeSet<String> = physical_drives
            .into_iter()
            .map(|d| d.as_ref().to_string())
            .collect();

        let raid: BTreeSet<String> = virtual_disks
            .iter()
            .flat_map(|vd| vd.drives.iter().cloned())
            .collect();
        let with_role = |role: DriveRole| -> BTreeSet<String> {
            drive_roles
                .iter()
                .filter(|(_, r)| **r == role)
                .map(|(fqdd, _)| fqdd.clone())
                .collect()
        };
        let mut jbod = with_role(DriveRole::NonRaid);
        let spares = with_role(DriveRole::Spare);
        let explicit_jbod = !jbod.is_empty();

        let check_disjoint = |a: &BTreeSet<String>, b: &BTreeSet<String>, what: &str| {
            let both: Vec<&String> = a.intersection(b).collect();
            if both.is_empty() {
                return Ok(());
            }
            let message = format!(
                "Configuration '{}': Drives are configured for both {}: {:?}",
                name, what, both
            );
            error!("{}", message);
            Err(LcError::Configuration(message))
        };
        check_disjoint(&raid, &jbod, "RAID and Non-RAID")?;
        check_disjoint(&raid, &spares, "RAID and hot spare")?;

        let mentioned: BTreeSet<String> = raid.iter().chain(&jbod).chain(&spares).cloned().collect();
        let missing: Vec<&String> = mentioned.difference(&present).collect();
        if !missing.is_empty() {
            let message = format!(
                "Configuration '{}': Drives not present on physical host: {:?}",
                name, missing
            );
            error!("{}", message);
            return Err(LcError::Configuration(message));
        }

        for drive in present.difference(&mentioned) {
            info!(
                "Disk {} not mentioned in configuration. Setting to JBOD/single RAID0 mode.",
                drive
            );
            jbod.insert(drive.clone());
        }

        let controllers: BTreeSet<String> = raid
            .iter()
            .chain(&jbod)
            .chain(&spares)
            .map(|drive| drive_controller(drive))
            .collect::<Result<_, _>>()?;

        Ok(Self {
            name: name.to_string(),
            virtual_disks,
            raid,
            jbod,
            spares,
            explicit_jbod,
            controllers,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn virtual_disks(&self) -> &[VirtualDiskSpec] {
        &self.virtual_disks
    }

    /// Members of a virtual disk.
    pub fn raid_drives(&self) -> &BTreeSet<String> {
        &self.raid
    }

    pub fn jbod_drives(&self) -> &BTreeSet<String> {
        &self.jbod
    }

    pub fn spare_drives(&self) -> &BTreeSet<String> {
        &self.spares
    }

    pub fn all_drives(&self) -> BTreeSet<String> {
        self.raid
            .iter()
            .chain(&self.jbod)
            .chain(&self.spares)
            .cloned()
            .collect()
    }

    /// Some drives were asked for as Non-RAID, not just left out.
    pub fn explicit_jbod(&self) -> bool {
        self.explicit_jbod
    }

    pub fn controllers(&self) -> &BTreeSet<String> {
        &self.controllers
    }
}

/// Controller of a drive FQDD `Disk.Bay.N:Enclosure.X.N-N:RAID.X.N-N`.
fn drive_controller(drive: &str) -> Result<String, LcError> {
    let parts: Vec<&str> = drive.split(':').collect();
    match parts.as_slice() {
        [bay, enclosure, controller]
            if bay.starts_with("Disk.Bay.")
                && enclosure.starts_with("Enclosure.")
                && controller.starts_with("RAID.") =>
        {
            Ok(controller.to_string())
        }
        _ => {
            let message = format!("Malformed drive: {}", drive);
            error!("{}", message);
            Err(LcError::Configuration(message))
        }
    }
}

fn attribute_value<'a>(instance: &'a DcimInstance, name: &str) -> Option<&'a str> {
    instance.attribute(name).ok().map(|v| v.value())
}

fn reboot_required(result: &QualifiedProperties) -> Result<bool, LcError> {
    Ok(result.attribute("RebootRequired")?.value() != "OPTIONAL")
}

/// Fails on the first element showing one of the `bad` values.
fn check_views(
    views: &BTreeMap<String, DcimInstance>,
    bad: &[(&str, &[&str])],
) -> Result<(), LcError> {
    for (fqdd, view) in views {
        for (attribute, bad_values) in bad {
            let Some(status) = attribute_value(view, attribute) else {
                continue;
            };
            if bad_values.contains(&status) {
                let message = format!(
                    "Storage Element {} is bad/degraded. Attribute {} is {}",
                    fqdd, attribute, status
                );
                error!("{}", message);
                return Err(LcError::Storage(message));
            }
        }
    }
    Ok(())
}

/// Basic drive, enclosure and controller health check.
pub fn check_storage_health(inventory: &RaidInventory) -> Result<(), LcError> {
    check_views(&inventory.controllers, BAD_STATUS)?;
    check_views(&inventory.enclosures, BAD_STATUS)?;
    check_views(&inventory.physical_disks, BAD_DISK_STATUS)
}

impl<T: Transport, C: Clock> Lifecycle<T, C> {
    /// Current storage views.
    pub fn raid_inventory(&self) -> Result<RaidInventory, LcError> {
        self.poll_lc_ready()?;
        self.storage_views()
    }

    fn storage_views(&self) -> Result<RaidInventory, LcError> {
        info!("Enumerating host raid attributes");

        Ok(RaidInventory {
            virtual_disks: self.client().enumerate(VIRTUAL_DISK_VIEW)?,
            enclosures: self.client().enumerate(ENCLOSURE_VIEW)?,
            controllers: self.client().enumerate(CONTROLLER_VIEW)?,
            physical_disks: self.client().enumerate(PHYSICAL_DISK_VIEW)?,
        })
    }

    pub fn blink_drive(&self, fqdd: &str) -> Result<(), LcError> {
        info!("Blinking drive FQDD {}", fqdd);
        self.client()
            .invoke(RAID_SERVICE, "BlinkTarget", &[("Target", fqdd.into())])?;
        Ok(())
    }

    pub fn unblink_drive(&self, fqdd: &str) -> Result<(), LcError> {
        info!("Unblinking drive FQDD {}", fqdd);
        self.client()
            .invoke(RAID_SERVICE, "UnBlinkTarget", &[("Target", fqdd.into())])?;
        Ok(())
    }

    /// Clears the foreign configuration of every controller holding a
    /// foreign disk, rebooting when one of them asks for it.
    ///
    /// Returns whether anything was cleared.
    pub fn clear_foreign_config(&self, inventory: &RaidInventory) -> Result<bool, LcError> {
        info!("Checking for foreign drives");

        let controllers = inventory.foreign_controllers();
        let mut reboot_needed = false;
        for controller in &controllers {
            let result = self.client().invoke(
                RAID_SERVICE,
                "ClearForeignConfig",
                &[("Target", controller.as_str().into())],
            )?;
            reboot_needed |= reboot_required(&result)?;
        }

        if reboot_needed {
            info!("Reboot needed to clear foreign configuration");
            self.queue_jobs_and_reboot(&[])?;
        }
        Ok(!controllers.is_empty())
    }

    /// Resets every controller, then returns the new inventory.
    pub fn reset_raid_config(&self) -> Result<RaidInventory, LcError> {
        self.poll_lc_ready()?;
        self.normalize_job_queue()?;

        info!("Calling ResetConfig on all controllers");
        let controllers = self.client().enumerate(CONTROLLER_VIEW)?;

        let mut reboot_needed = false;
        for controller in controllers.keys() {
            let result = self.client().invoke(
                RAID_SERVICE,
                "ResetConfig",
                &[("Target", controller.as_str().into())],
            )?;
            reboot_needed |= reboot_required(&result)?;
        }

        if reboot_needed {
            info!("Reboot needed to complete RAID configuration reset");
            self.queue_jobs_and_reboot(&[])?;
        }

        self.storage_views()
    }

    /// Drops any configuration staged on `controllers`.
    ///
    /// The firmware accepts this call whether or not something is pending,
    /// so any refusal is an error.
    pub fn clear_pending_raid_configuration(
        &self,
        controllers: &BTreeSet<String>,
    ) -> Result<(), LcError> {
        for target in controllers {
            info!("Clearing any pending configuration on {}", target);
            self.client()
                .invoke(
                    RAID_SERVICE,
                    "DeletePendingConfiguration",
                    &[("Target", target.as_str().into())],
                )
                .map_err(|e| {
                    storage_error(e, format!("Unable to clear pending configuration on {}", target))
                })?;
        }
        Ok(())
    }

    /// Deletes the virtual disks living on `controllers`.
    pub fn delete_virtual_disks(&self, controllers: &BTreeSet<String>) -> Result<(), LcError> {
        for vdisk in self.client().enumerate(VIRTUAL_DISK_VIEW)?.into_keys() {
            if !controllers.iter().any(|c| vdisk.contains(c.as_str())) {
                info!(
                    "Not removing Virtual Disk {} because we are not configuring that controller",
                    vdisk
                );
                continue;
            }

            info!("Removing Virtual Disk {}", vdisk);
            self.client()
                .invoke(
                    RAID_SERVICE,
                    "DeleteVirtualDisk",
                    &[("Target", vdisk.as_str().into())],
                )
                .map_err(|e| {
                    storage_error(e, format!("Unable to delete Virtual disk {}", vdisk))
                })?;
        }
        Ok(())
    }

    /// Rebuilds the storage of the controllers named by `layout`.
    ///
    /// Every virtual disk on those controllers is deleted first. Returns the
    /// configuration jobs that were run; an empty list means no controller
    /// had anything to commit and the host was not rebooted.
    pub fn apply_raid_layout(&self, layout: &RaidLayout) -> Result<Vec<String>, LcError> {
        self.poll_lc_ready()?;
        self.normalize_job_queue()?;
        info!("Applying RAID configuration '{}'", layout.name());

        let inventory = self.storage_views()?;
        self.clear_foreign_config(&inventory)?;
        check_storage_health(&inventory)?;

        self.clear_pending_raid_configuration(layout.controllers())?;
        self.delete_virtual_disks(layout.controllers())?;
        self.normalize_hot_spares(layout)?;
        self.normalize_raid_drives(layout)?;

        for vd in layout.virtual_disks() {
            info!("Creating virtual disk {} ({})", vd.fqdd(), vd.drives.join(", "));
            self.create_virtual_disk(vd)?;
        }

        // Les spares ne s'assignent qu'une fois les disques virtuels créés
        self.assign_hot_spares(layout)?;
        self.assign_jbods(layout)?;

        let mut jobs = Vec::new();
        for target in layout.controllers() {
            info!("Creating configuration job for target {}", target);
            match self.client().invoke(
                RAID_SERVICE,
                "CreateTargetedConfigJob",
                &[("Target", target.as_str().into())],
            ) {
                Ok(result) => jobs.push(result.attribute("Job")?.unmapped_value().to_string()),
                Err(e) if e.command_message_id() == Some(NO_CONFIGURATION_CHANGE) => {
                    info!("No configuration changes were necessary for {}", target);
                }
                Err(e) => return Err(e),
            }
        }

        if !jobs.is_empty() {
            self.queue_jobs_and_reboot(&jobs)?;
        }
        Ok(jobs)
    }

    fn physical_disk_status(&self, fqdd: &str, attribute: &str) -> Result<String, LcError> {
        let disk = self.client().get(PHYSICAL_DISK_VIEW, fqdd)?;
        Ok(disk.attribute(attribute)?.value().to_string())
    }

    /// Unassigns spares that are no longer wanted as spares.
    fn normalize_hot_spares(&self, layout: &RaidLayout) -> Result<(), LcError> {
        info!("Normalizing hot spares");

        for disk in layout.all_drives().difference(layout.spare_drives()) {
            if self.physical_disk_status(disk, "HotSpareStatus")? != "No" {
                info!("Unassigning spare disk {}", disk);
                self.client()
                    .invoke(RAID_SERVICE, "UnassignSpare", &[("Target", disk.as_str().into())])?;
            }
        }
        Ok(())
    }

    /// Puts future virtual disk members and spares in RAID mode.
    fn normalize_raid_drives(&self, layout: &RaidLayout) -> Result<(), LcError> {
        info!("Normalizing RAID drives");

        let mut pd_array = Vec::new();
        for disk in layout.raid_drives().union(layout.spare_drives()) {
            if self.physical_disk_status(disk, "RaidStatus")? == "Non-RAID" {
                info!("Converting {} to RAID", disk);
                pd_array.push(disk.clone());
            }
        }

        if !pd_array.is_empty() {
            self.client()
                .invoke(RAID_SERVICE, "ConvertToRAID", &[("PDArray", pd_array.into())])?;
        }
        Ok(())
    }

    fn create_virtual_disk(&self, vd: &VirtualDiskSpec) -> Result<(), LcError> {
        let (names, values) = vd.properties();
        self.client().invoke(
            RAID_SERVICE,
            "CreateVirtualDisk",
            &[
                ("Target", vd.target().into()),
                ("PDArray", vd.drives.clone().into()),
                ("VDPropNameArray", names.into()),
                ("VDPropValueArray", values.into()),
            ],
        )?;
        Ok(())
    }

    fn assign_hot_spares(&self, layout: &RaidLayout) -> Result<(), LcError> {
        for disk in layout.spare_drives() {
            if self.physical_disk_status(disk, "HotSpareStatus")? != "Global" {
                info!("Converting {} to global spare", disk);
                self.client()
                    .invoke(RAID_SERVICE, "AssignSpare", &[("Target", disk.as_str().into())])?;
            }
        }
        Ok(())
    }

    /// Sets up the drives outside any virtual disk.
    ///
    /// When virtual disks are defined and no drive was explicitly asked for
    /// as Non-RAID, each left-over drive becomes its own RAID0 volume so the
    /// virtual disks keep the first device names at boot.
    fn assign_jbods(&self, layout: &RaidLayout) -> Result<(), LcError> {
        if !layout.virtual_disks().is_empty() && !layout.explicit_jbod() {
            for disk in layout.jbod_drives() {
                if self.physical_disk_status(disk, "RaidStatus")? == "Non-RAID" {
                    info!("Converting {} to RAID", disk);
                    self.client().invoke(
                        RAID_SERVICE,
                        "ConvertToRAID",
                        &[("PDArray", ArgValue::List(vec![disk.clone()]))],
                    )?;
                }

                info!("Creating implicit single volume RAID0 for {}", disk);
                let controller = drive_controller(disk)?;
                let vd = VirtualDiskSpec::new(
                    &format!("VirtualDisk:{}", controller),
                    RaidLevel::Raid0,
                    vec![disk.clone()],
                )?;
                self.create_virtual_disk(&vd)?;
            }
            return Ok(());
        }

        let mut pd_array = Vec::new();
        for disk in layout.jbod_drives() {
            if self.physical_disk_status(disk, "RaidStatus")? != "Non-RAID" {
                info!("Converting {} to Non-RAID", disk);
                pd_array.push(disk.clone());
            }
        }

        if !pd_array.is_empty() {
            self.client()
                .invoke(RAID_SERVICE, "ConvertToNonRAID", &[("PDArray", pd_array.into())])?;
        }
        Ok(())
    }
}

/// Refusals of the RAID service become storage errors; transport and
/// protocol errors are kept as they are.
fn storage_error(err: LcError, context: String) -> LcError {
    match err {
        LcError::Command { .. } => {
            error!("{}: {}", context, err);
            LcError::Storage(format!("{}: {}", context, err))
        }
        other => other,
    }
}
