mod common;

use std::collections::BTreeMap;

use common::{FakeLc, init_logging};
use lccontrol::{DriveRole, LcError, RaidLayout, RaidLevel, VirtualDiskSpec};

const CONTROLLER: &str = "RAID.Integrated.1-1";
const ENCLOSURE: &str = "Enclosure.Internal.0-1:RAID.Integrated.1-1";
const BAY_0: &str = "Disk.Bay.0:Enclosure.Internal.0-1:RAID.Integrated.1-1";
const BAY_1: &str = "Disk.Bay.1:Enclosure.Internal.0-1:RAID.Integrated.1-1";
const BAY_2: &str = "Disk.Bay.2:Enclosure.Internal.0-1:RAID.Integrated.1-1";
const BAY_3: &str = "Disk.Bay.3:Enclosure.Internal.0-1:RAID.Integrated.1-1";
const OLD_VD: &str = "Disk.Virtual.0:RAID.Integrated.1-1";

// Valeurs brutes de RaidStatus et HotSpareStatus
const READY: &str = "1";
const ONLINE: &str = "2";
const FOREIGN: &str = "3";
const NON_RAID: &str = "8";
const NO_SPARE: &str = "0";

const DISK_VIEW: &str = "DCIM_PhysicalDiskView";

fn fake_with_storage() -> FakeLc {
    let fake = FakeLc::new();
    fake.add_controller(CONTROLLER);
    fake.add_enclosure(ENCLOSURE);
    fake.add_physical_disk(BAY_0, ONLINE, NO_SPARE);
    fake.add_physical_disk(BAY_1, NON_RAID, NO_SPARE);
    fake.add_physical_disk(BAY_2, NON_RAID, NO_SPARE);
    fake.add_physical_disk(BAY_3, READY, NO_SPARE);
    fake.add_virtual_disk(OLD_VD);
    fake
}

fn mirror() -> VirtualDiskSpec {
    VirtualDiskSpec::new(
        "Disk.Virtual.0:RAID.Integrated.1-1",
        RaidLevel::Raid1,
        vec![BAY_0.to_string(), BAY_1.to_string()],
    )
    .unwrap()
}

fn all_bays() -> [&'static str; 4] {
    [BAY_0, BAY_1, BAY_2, BAY_3]
}

fn non_status_methods(fake: &FakeLc) -> Vec<String> {
    fake.methods()
        .into_iter()
        .filter(|m| m != "GetRemoteServicesAPIStatus")
        .collect()
}

#[test]
fn test_raid_inventory() {
    init_logging();
    let fake = fake_with_storage();
    let lifecycle = fake.lifecycle();

    let inventory = lifecycle.raid_inventory().unwrap();

    assert_eq!(inventory.controllers.keys().collect::<Vec<_>>(), vec![CONTROLLER]);
    assert_eq!(inventory.enclosures.keys().collect::<Vec<_>>(), vec![ENCLOSURE]);
    assert_eq!(inventory.virtual_disks.keys().collect::<Vec<_>>(), vec![OLD_VD]);
    assert_eq!(inventory.physical_disks.len(), 4);

    let disk = &inventory.physical_disks[BAY_1];
    assert_eq!(disk.attribute("RaidStatus").unwrap().value(), "Non-RAID");
    assert_eq!(disk.attribute("HotSpareStatus").unwrap().value(), "No");
}

#[test]
fn test_blink_and_unblink_drive() {
    let fake = fake_with_storage();
    let lifecycle = fake.lifecycle();

    lifecycle.blink_drive(BAY_2).unwrap();
    lifecycle.unblink_drive(BAY_2).unwrap();

    assert_eq!(fake.calls("BlinkTarget")[0].input("Target"), vec![BAY_2]);
    assert_eq!(fake.calls("UnBlinkTarget")[0].input("Target"), vec![BAY_2]);
}

#[test]
fn test_foreign_disks_are_cleared_per_controller() {
    let fake = fake_with_storage();
    fake.add_physical_disk(BAY_2, FOREIGN, NO_SPARE);
    fake.add_physical_disk(BAY_3, FOREIGN, NO_SPARE);
    let lifecycle = fake.lifecycle();
    let inventory = lifecycle.raid_inventory().unwrap();

    assert!(lifecycle.clear_foreign_config(&inventory).unwrap());

    // Un seul appel pour le contrôleur, sans redémarrage
    let clear = fake.calls("ClearForeignConfig");
    assert_eq!(clear.len(), 1);
    assert_eq!(clear[0].input("Target"), vec![CONTROLLER]);
    assert!(fake.calls("CreateRebootJob").is_empty());
}

#[test]
fn test_foreign_clear_reboots_when_required() {
    let fake = fake_with_storage();
    fake.add_physical_disk(BAY_2, FOREIGN, NO_SPARE);
    fake.set_raid_reboot_required("YES");
    let lifecycle = fake.lifecycle();
    let inventory = lifecycle.raid_inventory().unwrap();

    lifecycle.clear_foreign_config(&inventory).unwrap();

    assert_eq!(fake.calls("CreateRebootJob").len(), 1);
    let setup = fake.calls("SetupJobQueue");
    assert_eq!(setup[0].input("JobArray"), vec![fake.reboot_job_id().as_str()]);
}

#[test]
fn test_nothing_foreign_nothing_cleared() {
    let fake = fake_with_storage();
    let lifecycle = fake.lifecycle();
    let inventory = lifecycle.raid_inventory().unwrap();

    assert!(!lifecycle.clear_foreign_config(&inventory).unwrap());
    assert!(fake.calls("ClearForeignConfig").is_empty());
}

#[test]
fn test_degraded_disk_stops_the_layout() {
    let fake = fake_with_storage();
    fake.set_view_field(DISK_VIEW, BAY_1, "PredictiveFailureState", "1");
    let lifecycle = fake.lifecycle();

    let layout = RaidLayout::new("os", vec![mirror()], &BTreeMap::new(), all_bays()).unwrap();
    let err = lifecycle.apply_raid_layout(&layout).unwrap_err();

    assert!(
        matches!(&err, LcError::Storage(msg) if msg.contains(BAY_1) && msg.contains("Smart Alert Present")),
        "{}",
        err
    );
    // Rien n'a été détruit
    assert!(fake.calls("DeleteVirtualDisk").is_empty());
    assert!(fake.calls("DeletePendingConfiguration").is_empty());
}

#[test]
fn test_mirror_with_spare_and_implicit_single_drive_volumes() {
    init_logging();
    let fake = fake_with_storage();
    let lifecycle = fake.lifecycle();

    let roles = BTreeMap::from([(BAY_3.to_string(), DriveRole::Spare)]);
    let layout = RaidLayout::new("os", vec![mirror()], &roles, all_bays()).unwrap();
    let jobs = lifecycle.apply_raid_layout(&layout).unwrap();

    assert_eq!(jobs, fake.raid_job_ids());
    assert_eq!(jobs.len(), 1);
    assert_eq!(
        non_status_methods(&fake),
        vec![
            "DeleteJobQueue",
            "DeletePendingConfiguration",
            "DeleteVirtualDisk",
            "ConvertToRAID",
            "CreateVirtualDisk",
            "AssignSpare",
            "ConvertToRAID",
            "CreateVirtualDisk",
            "CreateTargetedConfigJob",
            "CreateRebootJob",
            "SetupJobQueue",
        ]
    );

    assert_eq!(fake.calls("DeleteVirtualDisk")[0].input("Target"), vec![OLD_VD]);

    let convert = fake.calls("ConvertToRAID");
    assert_eq!(convert[0].input("PDArray"), vec![BAY_1]);
    assert_eq!(convert[1].input("PDArray"), vec![BAY_2]);

    let create = fake.calls("CreateVirtualDisk");
    assert_eq!(create[0].input("Target"), vec![CONTROLLER]);
    assert_eq!(create[0].input("PDArray"), vec![BAY_0, BAY_1]);
    assert_eq!(
        create[0].input("VDPropNameArray"),
        vec!["RAIDLevel", "SpanDepth", "SpanLength"]
    );
    assert_eq!(create[0].input("VDPropValueArray"), vec!["4", "1", "2"]);
    // Le disque restant devient un RAID0 à lui seul
    assert_eq!(create[1].input("PDArray"), vec![BAY_2]);
    assert_eq!(create[1].input("VDPropValueArray"), vec!["2", "1", "1"]);

    assert_eq!(fake.calls("AssignSpare")[0].input("Target"), vec![BAY_3]);

    let setup = fake.calls("SetupJobQueue");
    assert_eq!(
        setup[0].input("JobArray"),
        vec![jobs[0].as_str(), fake.reboot_job_id().as_str()]
    );
}

#[test]
fn test_explicit_non_raid_drives_are_converted() {
    let fake = fake_with_storage();
    let lifecycle = fake.lifecycle();

    // Pas de disque virtuel : tous les disques passent en Non-RAID
    let roles = BTreeMap::from([(BAY_0.to_string(), DriveRole::NonRaid)]);
    let layout = RaidLayout::new("jbod", vec![], &roles, all_bays()).unwrap();
    assert!(layout.explicit_jbod());

    lifecycle.apply_raid_layout(&layout).unwrap();

    let convert = fake.calls("ConvertToNonRAID");
    assert_eq!(convert.len(), 1);
    assert_eq!(convert[0].input("PDArray"), vec![BAY_0, BAY_3]);
    assert!(fake.calls("CreateVirtualDisk").is_empty());
}

#[test]
fn test_unchanged_controller_is_not_rebooted() {
    let fake = fake_with_storage();
    fake.fail_method(
        "CreateTargetedConfigJob",
        "2",
        "STOR026",
        "No configuration changes to apply.",
    );
    let lifecycle = fake.lifecycle();

    let layout = RaidLayout::new("os", vec![mirror()], &BTreeMap::new(), all_bays()).unwrap();
    let jobs = lifecycle.apply_raid_layout(&layout).unwrap();

    assert!(jobs.is_empty());
    assert!(fake.calls("CreateRebootJob").is_empty());
}

#[test]
fn test_other_job_refusals_are_reported() {
    let fake = fake_with_storage();
    fake.fail_method("CreateTargetedConfigJob", "2", "STOR023", "Controller busy");
    let lifecycle = fake.lifecycle();

    let layout = RaidLayout::new("os", vec![mirror()], &BTreeMap::new(), all_bays()).unwrap();
    let err = lifecycle.apply_raid_layout(&layout).unwrap_err();

    assert_eq!(err.command_message_id(), Some("STOR023"));
    assert!(fake.calls("CreateRebootJob").is_empty());
}

#[test]
fn test_refused_virtual_disk_deletion_is_a_storage_error() {
    let fake = fake_with_storage();
    fake.fail_method("DeleteVirtualDisk", "2", "STOR029", "Virtual disk is in use");
    let lifecycle = fake.lifecycle();

    let layout = RaidLayout::new("os", vec![mirror()], &BTreeMap::new(), all_bays()).unwrap();
    let err = lifecycle.apply_raid_layout(&layout).unwrap_err();

    assert!(matches!(err, LcError::Storage(msg) if msg.contains(OLD_VD)));
    assert!(fake.calls("CreateVirtualDisk").is_empty());
}

#[test]
fn test_virtual_disks_of_other_controllers_are_kept() {
    let fake = fake_with_storage();
    fake.add_virtual_disk("Disk.Virtual.0:RAID.Slot.3-1");
    let lifecycle = fake.lifecycle();

    let controllers = [CONTROLLER.to_string()].into_iter().collect();
    lifecycle.delete_virtual_disks(&controllers).unwrap();

    let delete = fake.calls("DeleteVirtualDisk");
    assert_eq!(delete.len(), 1);
    assert_eq!(delete[0].input("Target"), vec![OLD_VD]);
}

#[test]
fn test_reset_config_reboots_when_required() {
    let fake = fake_with_storage();
    fake.set_raid_reboot_required("YES");
    let lifecycle = fake.lifecycle();

    let inventory = lifecycle.reset_raid_config().unwrap();

    assert_eq!(fake.calls("ResetConfig")[0].input("Target"), vec![CONTROLLER]);
    assert_eq!(fake.calls("CreateRebootJob").len(), 1);
    assert_eq!(inventory.physical_disks.len(), 4);
}
