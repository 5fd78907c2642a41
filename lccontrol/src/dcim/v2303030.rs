//! Classes for Lifecycle Controller 2.30.30.30 and later.

use crate::schema::{
    ArgDef, AttributeDef, ClassDef, MethodDef, Qualifiers, ValueMap, arg_in, arg_out, attr, mapped_attr,
};

use super::{
    BIOS_ENUMERATION, BIOS_SERVICE, CONTROLLER_VIEW, ENCLOSURE_VIEW, JOB_SERVICE, LC_SERVICE,
    LIFECYCLE_JOB, PHYSICAL_DISK_VIEW, POWER_SERVICE, RAID_SERVICE, SOFTWARE_IDENTITY,
    SYSTEM_MANAGEMENT_SERVICE, SYSTEM_VIEW, VIRTUAL_DISK_VIEW,
};

pub const VERSION: &str = "2.30.30.30";

const RETURN_VALUE: ValueMap = &[
    ("0", "Completed with No Error"),
    ("1", "Not Supported"),
    ("2", "Failed"),
    ("4096", "Job Created"),
];

const HEALTH: ValueMap = &[("0", "Unknown"), ("1", "OK"), ("2", "Degraded"), ("3", "Error")];

const BOOLEAN: ValueMap = &[("0", "false"), ("1", "true")];

// Attributs communs aux services
const SERVICE_ATTRIBUTES: &[AttributeDef] = &[
    attr("CreationClassName"),
    attr("ElementName"),
    attr("Name"),
    attr("SystemCreationClassName"),
    attr("SystemName"),
];

const LC_SERVICE_CLASS: ClassDef = ClassDef {
    name: LC_SERVICE,
    key: None,
    attributes: SERVICE_ATTRIBUTES,
    methods: &[MethodDef {
        name: "GetRemoteServicesAPIStatus",
        args: &[
            arg_out("Status", &[("0", "Ready"), ("1", "Not Ready")]),
            arg_out("Message", &[]),
            arg_out("MessageID", &[]),
            arg_out(
                "ServerStatus",
                &[
                    ("0", "Powered off"),
                    ("1", "In POST"),
                    ("2", "Out of POST"),
                    ("3", "Collecting System Inventory"),
                    ("4", "Automated Task Execution"),
                    ("5", "Lifecycle Controller Unified Server Configurator"),
                    (
                        "6",
                        "Server has halted at F1/F2 error prompt because of a POST error",
                    ),
                    (
                        "7",
                        "Server has halted at F1/F2/F11 prompt because there are no bootable devices available",
                    ),
                    ("8", "Server has entered F2 setup menu"),
                    ("9", "Server has entered F11 Boot Manager menu"),
                ],
            ),
            arg_out(
                "LCStatus",
                &[
                    ("0", "Ready"),
                    ("1", "Not Initialized"),
                    ("2", "Reloading data"),
                    ("3", "Disabled"),
                    ("4", "In Recovery"),
                    ("5", "In Use"),
                ],
            ),
            arg_out("ReturnValue", RETURN_VALUE),
        ],
    }],
};

const JOB_SERVICE_CLASS: ClassDef = ClassDef {
    name: JOB_SERVICE,
    key: None,
    attributes: SERVICE_ATTRIBUTES,
    methods: &[
        MethodDef {
            name: "SetupJobQueue",
            args: &[
                arg_in("JobArray", false, &[]),
                arg_in("StartTimeInterval", false, &[]),
                arg_in("UntilTime", false, &[]),
                arg_out("Message", &[]),
                arg_out("MessageID", &[]),
                arg_out("ReturnValue", RETURN_VALUE),
            ],
        },
        MethodDef {
            name: "DeleteJobQueue",
            args: &[
                arg_in("JobID", true, &[]),
                arg_out("Message", &[]),
                arg_out("MessageID", &[]),
                arg_out("ReturnValue", RETURN_VALUE),
            ],
        },
        MethodDef {
            name: "CreateRebootJob",
            args: &[
                arg_in(
                    "RebootJobType",
                    true,
                    &[
                        ("1", "PowerCycle"),
                        ("2", "Graceful Reboot without forced shutdown"),
                        ("3", "Graceful Reboot with forced shutdown"),
                    ],
                ),
                arg_out("RebootJobID", &[]),
                arg_out("Message", &[]),
                arg_out("MessageID", &[]),
                arg_out("ReturnValue", RETURN_VALUE),
            ],
        },
    ],
};

const LIFECYCLE_JOB_CLASS: ClassDef = ClassDef {
    name: LIFECYCLE_JOB,
    key: Some("InstanceID"),
    attributes: &[
        attr("InstanceID"),
        attr("JobStartTime"),
        attr("JobStatus"),
        attr("JobUntilTime"),
        attr("Message"),
        attr("MessageArguments"),
        attr("MessageID"),
        attr("Name"),
        AttributeDef {
            name: "PercentComplete",
            qualifiers: Qualifiers {
                units: Some("%"),
                ..Qualifiers::NONE
            },
        },
    ],
    methods: &[],
};

const SYSTEM_VIEW_CLASS: ClassDef = ClassDef {
    name: SYSTEM_VIEW,
    key: Some("InstanceID"),
    attributes: &[
        attr("BIOSVersionString"),
        mapped_attr("BatteryRollupStatus", HEALTH),
        attr("BoardSerialNumber"),
        mapped_attr("CPURollupStatus", HEALTH),
        attr("ChassisServiceTag"),
        mapped_attr("CurrentRollupStatus", HEALTH),
        attr("ExpressServiceCode"),
        attr("FQDD"),
        mapped_attr("FanRollupStatus", HEALTH),
        attr("HostName"),
        mapped_attr("IDSDMRollupStatus", HEALTH),
        attr("InstanceID"),
        mapped_attr("IntrusionRollupStatus", HEALTH),
        attr("LastSystemInventoryTime"),
        attr("LifecycleControllerVersion"),
        mapped_attr("LicensingRollupStatus", HEALTH),
        attr("Manufacturer"),
        attr("Model"),
        mapped_attr("PSRollupStatus", HEALTH),
        mapped_attr("PowerState", &[("2", "On"), ("8", "Off - Soft")]),
        mapped_attr("PrimaryStatus", HEALTH),
        mapped_attr("RollupStatus", HEALTH),
        mapped_attr("SDCardRollupStatus", HEALTH),
        attr("ServiceTag"),
        mapped_attr("StorageRollupStatus", HEALTH),
        AttributeDef {
            name: "SysMemTotalSize",
            qualifiers: Qualifiers {
                units: Some("MB"),
                description: &["Total amount of system memory installed."],
                ..Qualifiers::NONE
            },
        },
        attr("SystemGeneration"),
        attr("SystemID"),
        mapped_attr("TempRollupStatus", HEALTH),
        mapped_attr("VoltRollupStatus", HEALTH),
    ],
    methods: &[],
};

const POWER_SERVICE_CLASS: ClassDef = ClassDef {
    name: POWER_SERVICE,
    key: None,
    attributes: SERVICE_ATTRIBUTES,
    methods: &[MethodDef {
        name: "RequestPowerStateChange",
        args: &[
            arg_in(
                "PowerState",
                true,
                &[
                    ("2", "Power On"),
                    ("5", "Power Cycle (Off - Soft)"),
                    ("6", "Power Off - Hard"),
                    ("8", "Power Off - Soft"),
                    ("9", "Power Cycle (Off - Hard)"),
                    ("10", "Master Bus Reset"),
                    ("11", "Diagnostic Interrupt (NMI)"),
                    ("12", "Power Off - Soft Graceful"),
                    ("13", "Power Off - Hard Graceful"),
                ],
            ),
            arg_out("Job", &[]),
            arg_out("ReturnValue", RETURN_VALUE),
        ],
    }],
};

const SYSTEM_MANAGEMENT_SERVICE_CLASS: ClassDef = ClassDef {
    name: SYSTEM_MANAGEMENT_SERVICE,
    key: None,
    attributes: SERVICE_ATTRIBUTES,
    methods: &[MethodDef {
        name: "IdentifyChassis",
        args: &[
            arg_in("IdentifyState", true, &[("0", "Disabled"), ("1", "Enabled")]),
            arg_in("DurationLimit", false, &[]),
            arg_out("Message", &[]),
            arg_out("MessageID", &[]),
            arg_out("ReturnValue", RETURN_VALUE),
        ],
    }],
};

const SOFTWARE_IDENTITY_CLASS: ClassDef = ClassDef {
    name: SOFTWARE_IDENTITY,
    key: Some("InstanceID"),
    attributes: &[
        attr("ComponentType"),
        attr("ElementName"),
        attr("FQDD"),
        attr("InstanceID"),
        attr("Status"),
        mapped_attr("Updateable", BOOLEAN),
        attr("VersionString"),
    ],
    methods: &[],
};

const MESSAGE: ArgDef = arg_out("Message", &[]);
const MESSAGE_ID: ArgDef = arg_out("MessageID", &[]);
const RESULT: ArgDef = arg_out("ReturnValue", RETURN_VALUE);

const BIOS_SERVICE_CLASS: ClassDef = ClassDef {
    name: BIOS_SERVICE,
    key: None,
    attributes: SERVICE_ATTRIBUTES,
    methods: &[
        MethodDef {
            name: "SetAttribute",
            args: &[
                arg_in("Target", true, &[]),
                arg_in("AttributeName", true, &[]),
                arg_in("AttributeValue", true, &[]),
                MESSAGE,
                MESSAGE_ID,
                RESULT,
                arg_out("RebootRequired", &[]),
                arg_out("SetResult", &[]),
            ],
        },
        MethodDef {
            name: "DeletePendingConfiguration",
            args: &[
                arg_in("Target", true, &[]),
                MESSAGE,
                MESSAGE_ID,
                RESULT,
            ],
        },
        MethodDef {
            name: "CreateTargetedConfigJob",
            args: &[
                arg_in("Target", true, &[]),
                arg_in(
                    "RebootJobType",
                    false,
                    &[
                        ("1", "PowerCycle"),
                        ("2", "Graceful Reboot without forced shutdown"),
                        ("3", "Graceful Reboot with forced shutdown"),
                    ],
                ),
                arg_in("ScheduledStartTime", false, &[]),
                arg_in("UntilTime", false, &[]),
                arg_out("Job", &[]),
                MESSAGE,
                MESSAGE_ID,
                RESULT,
            ],
        },
    ],
};

const BIOS_ENUMERATION_CLASS: ClassDef = ClassDef {
    name: BIOS_ENUMERATION,
    key: Some("InstanceID"),
    attributes: &[
        attr("AttributeDisplayName"),
        attr("AttributeName"),
        attr("CurrentValue"),
        attr("Dependency"),
        attr("FQDD"),
        attr("GroupDisplayName"),
        attr("GroupID"),
        attr("InstanceID"),
        attr("IsReadOnly"),
        attr("PendingValue"),
        attr("PossibleValues"),
        attr("PossibleValuesDescription"),
    ],
    methods: &[],
};

const REBOOT_JOB_TYPE: ValueMap = &[
    ("1", "PowerCycle"),
    ("2", "Graceful Reboot without forced shutdown"),
    ("3", "Graceful Reboot with forced shutdown"),
];

const RAID_STATUS: ValueMap = &[
    ("0", "Unknown"),
    ("1", "Ready"),
    ("2", "Online"),
    ("3", "Foreign"),
    ("4", "Offline"),
    ("5", "Blocked"),
    ("6", "Failed"),
    ("7", "Degraded"),
    ("8", "Non-RAID"),
];

const RAID_TYPES: ValueMap = &[
    ("1", "No RAID"),
    ("2", "RAID-0"),
    ("4", "RAID-1"),
    ("64", "RAID-5"),
    ("128", "RAID-6"),
    ("2048", "RAID-10"),
    ("8192", "RAID-50"),
    ("16384", "RAID-60"),
];

const TARGET_ONLY: &[ArgDef] = &[arg_in("Target", true, &[]), MESSAGE, MESSAGE_ID, RESULT];

/// Méthode du service RAID qui ne prend qu'une cible.
const fn raid_target_method(name: &'static str) -> MethodDef {
    MethodDef {
        name,
        args: TARGET_ONLY,
    }
}

const RAID_SERVICE_CLASS: ClassDef = ClassDef {
    name: RAID_SERVICE,
    key: None,
    attributes: SERVICE_ATTRIBUTES,
    methods: &[
        raid_target_method("BlinkTarget"),
        raid_target_method("UnBlinkTarget"),
        raid_target_method("DeletePendingConfiguration"),
        raid_target_method("DeleteVirtualDisk"),
        raid_target_method("UnassignSpare"),
        MethodDef {
            name: "ClearForeignConfig",
            args: &[
                arg_in("Target", true, &[]),
                MESSAGE,
                MESSAGE_ID,
                RESULT,
                arg_out("RebootRequired", &[]),
            ],
        },
        MethodDef {
            name: "ResetConfig",
            args: &[
                arg_in("Target", true, &[]),
                MESSAGE,
                MESSAGE_ID,
                RESULT,
                arg_out("RebootRequired", &[]),
            ],
        },
        MethodDef {
            name: "AssignSpare",
            args: &[
                arg_in("Target", true, &[]),
                arg_in("VirtualDiskArray", false, &[]),
                MESSAGE,
                MESSAGE_ID,
                RESULT,
                arg_out("RebootRequired", &[]),
            ],
        },
        MethodDef {
            name: "ConvertToRAID",
            args: &[
                arg_in("PDArray", true, &[]),
                MESSAGE,
                MESSAGE_ID,
                RESULT,
                arg_out("RebootRequired", &[]),
            ],
        },
        MethodDef {
            name: "ConvertToNonRAID",
            args: &[
                arg_in("PDArray", true, &[]),
                MESSAGE,
                MESSAGE_ID,
                RESULT,
                arg_out("RebootRequired", &[]),
            ],
        },
        MethodDef {
            name: "CreateVirtualDisk",
            args: &[
                arg_in("Target", true, &[]),
                arg_in("PDArray", true, &[]),
                arg_in("VDPropNameArray", true, &[]),
                arg_in("VDPropValueArray", true, &[]),
                arg_out("NewVirtualDisk", &[]),
                MESSAGE,
                MESSAGE_ID,
                RESULT,
                arg_out("RebootRequired", &[]),
            ],
        },
        MethodDef {
            name: "CreateTargetedConfigJob",
            args: &[
                arg_in("Target", true, &[]),
                arg_in("RebootJobType", false, REBOOT_JOB_TYPE),
                arg_in("ScheduledStartTime", false, &[]),
                arg_in("UntilTime", false, &[]),
                arg_in("Realtime", false, &[("0", "Off"), ("1", "On")]),
                arg_out("Job", &[]),
                MESSAGE,
                MESSAGE_ID,
                RESULT,
            ],
        },
    ],
};

const CONTROLLER_VIEW_CLASS: ClassDef = ClassDef {
    name: CONTROLLER_VIEW,
    key: Some("FQDD"),
    attributes: &[
        attr("DeviceDescription"),
        attr("FQDD"),
        attr("InstanceID"),
        mapped_attr("PrimaryStatus", HEALTH),
        attr("ProductName"),
    ],
    methods: &[],
};

const ENCLOSURE_VIEW_CLASS: ClassDef = ClassDef {
    name: ENCLOSURE_VIEW,
    key: Some("FQDD"),
    attributes: &[
        attr("DeviceDescription"),
        attr("FQDD"),
        attr("InstanceID"),
        mapped_attr("PrimaryStatus", HEALTH),
        attr("ProductName"),
    ],
    methods: &[],
};

const PHYSICAL_DISK_VIEW_CLASS: ClassDef = ClassDef {
    name: PHYSICAL_DISK_VIEW,
    key: Some("FQDD"),
    attributes: &[
        attr("DeviceDescription"),
        attr("FQDD"),
        mapped_attr(
            "HotSpareStatus",
            &[("0", "No"), ("1", "Dedicated"), ("2", "Global")],
        ),
        attr("InstanceID"),
        mapped_attr("MediaType", &[("0", "HDD"), ("1", "SSD")]),
        attr("Model"),
        mapped_attr(
            "PredictiveFailureState",
            &[("0", "Smart Alert Absent"), ("1", "Smart Alert Present")],
        ),
        mapped_attr("PrimaryStatus", HEALTH),
        mapped_attr("RaidStatus", RAID_STATUS),
        attr("SerialNumber"),
        AttributeDef {
            name: "SizeInBytes",
            qualifiers: Qualifiers {
                units: Some("bytes"),
                ..Qualifiers::NONE
            },
        },
    ],
    methods: &[],
};

const VIRTUAL_DISK_VIEW_CLASS: ClassDef = ClassDef {
    name: VIRTUAL_DISK_VIEW,
    key: Some("FQDD"),
    attributes: &[
        attr("DeviceDescription"),
        attr("FQDD"),
        attr("InstanceID"),
        attr("Name"),
        mapped_attr("PrimaryStatus", HEALTH),
        mapped_attr("RAIDStatus", RAID_STATUS),
        mapped_attr("RAIDTypes", RAID_TYPES),
        AttributeDef {
            name: "SizeInBytes",
            qualifiers: Qualifiers {
                units: Some("bytes"),
                ..Qualifiers::NONE
            },
        },
    ],
    methods: &[],
};

pub static SCHEMA: &[ClassDef] = &[
    LC_SERVICE_CLASS,
    JOB_SERVICE_CLASS,
    LIFECYCLE_JOB_CLASS,
    SYSTEM_VIEW_CLASS,
    POWER_SERVICE_CLASS,
    SYSTEM_MANAGEMENT_SERVICE_CLASS,
    SOFTWARE_IDENTITY_CLASS,
    BIOS_SERVICE_CLASS,
    BIOS_ENUMERATION_CLASS,
    RAID_SERVICE_CLASS,
    CONTROLLER_VIEW_CLASS,
    ENCLOSURE_VIEW_CLASS,
    PHYSICAL_DISK_VIEW_CLASS,
    VIRTUAL_DISK_VIEW_CLASS,
];
