#![allow(dead_code)]

//! Faux Lifecycle Controller branché sur `MockTransport`.
//!
//! Chaque requête est relue avec xmltree et dispatchée selon son Action ;
//! les réponses sont construites à partir d'un état scripté par le test.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use lccontrol::{DcimClient, Lifecycle, ManualClock, PollSettings};
use lcwsman::namespace::{DCIM, resource_uri};
use lcwsman::soap::{enumerate_action, get_action, pull_action};
use lcwsman::{MockTransport, WsmanClient, WsmanError};
use xmltree::{Element, XMLNode};

const ENVELOPE_OPEN: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope" xmlns:wsa="http://schemas.xmlsoap.org/ws/2004/08/addressing" xmlns:wsen="http://schemas.xmlsoap.org/ws/2004/09/enumeration" xmlns:wsman="http://schemas.dmtf.org/wbem/wsman/1/wsman.xsd"><s:Header/><s:Body>"#;
const ENVELOPE_CLOSE: &str = "</s:Body></s:Envelope>";

pub fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// One GetRemoteServicesAPIStatus answer.
#[derive(Debug, Clone, Copy)]
pub struct ReadyStatus {
    pub status: &'static str,
    pub server_status: &'static str,
    pub lc_status: &'static str,
}

pub const READY: ReadyStatus = ReadyStatus {
    status: "0",
    server_status: "2",
    lc_status: "0",
};

pub const NOT_READY: ReadyStatus = ReadyStatus {
    status: "1",
    server_status: "1",
    lc_status: "5",
};

pub const fn halted_server(server_status: &'static str) -> ReadyStatus {
    ReadyStatus {
        status: "1",
        server_status,
        lc_status: "0",
    }
}

pub const fn halted_lc(lc_status: &'static str) -> ReadyStatus {
    ReadyStatus {
        status: "1",
        server_status: "2",
        lc_status,
    }
}

/// A method call received by the fake.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub class: String,
    pub method: String,
    pub inputs: Vec<(String, String)>,
}

impl Invocation {
    pub fn input(&self, name: &str) -> Vec<&str> {
        self.inputs
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

struct Failure {
    return_value: Option<String>,
    message_id: String,
    message: String,
}

struct BiosAttribute {
    current: String,
    possible: Vec<String>,
    read_only: bool,
}

struct State {
    lc_version: String,
    ready: VecDeque<ReadyStatus>,
    jobs: HashMap<String, VecDeque<String>>,
    reboot_job_id: String,
    config_job_id: String,
    system_view: Vec<(String, String)>,
    bios: BTreeMap<String, BiosAttribute>,
    failures: HashMap<String, Failure>,
    invocations: Vec<Invocation>,
    job_gets: Vec<String>,
    /// Vues de stockage, par classe puis par FQDD.
    views: HashMap<String, BTreeMap<String, Vec<(String, String)>>>,
    raid_jobs: Vec<String>,
    raid_reboot_required: String,
}

/// Pops the next scripted value, the last one repeating forever.
fn next_scripted<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

#[derive(Clone)]
pub struct FakeLc {
    state: Arc<Mutex<State>>,
}

impl FakeLc {
    pub fn new() -> Self {
        let system_view = [
            ("InstanceID", "System.Embedded.1"),
            ("FQDD", "System.Embedded.1"),
            ("Manufacturer", "Dell Inc."),
            ("Model", "PowerEdge R630"),
            ("ServiceTag", "ABC1234"),
            ("SystemID", "1537"),
            ("LifecycleControllerVersion", "2.30.30.30"),
            ("PrimaryStatus", "1"),
            ("RollupStatus", "1"),
            ("FanRollupStatus", "1"),
            ("PSRollupStatus", "1"),
            ("TempRollupStatus", "1"),
            ("SysMemTotalSize", "65536"),
        ];

        Self {
            state: Arc::new(Mutex::new(State {
                lc_version: "2.30.30.30".to_string(),
                ready: VecDeque::from([READY]),
                jobs: HashMap::new(),
                reboot_job_id: "RID_100000000001".to_string(),
                config_job_id: "JID_200000000001".to_string(),
                system_view: system_view
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                bios: BTreeMap::new(),
                failures: HashMap::new(),
                invocations: Vec::new(),
                job_gets: Vec::new(),
                views: HashMap::new(),
                raid_jobs: Vec::new(),
                raid_reboot_required: "OPTIONAL".to_string(),
            })),
        }
    }

    pub fn transport(&self) -> MockTransport {
        let state = self.state.clone();
        MockTransport::with_handler(move |payload| {
            let mut state = state.lock().unwrap();
            handle(&mut state, payload).map(String::into_bytes)
        })
    }

    pub fn client(&self) -> DcimClient<MockTransport> {
        DcimClient::connect(WsmanClient::new(self.transport())).unwrap()
    }

    /// Client driven by a manual clock with the default budgets.
    pub fn lifecycle(&self) -> Lifecycle<MockTransport, ManualClock> {
        self.lifecycle_with(PollSettings::default())
    }

    pub fn lifecycle_with(&self, settings: PollSettings) -> Lifecycle<MockTransport, ManualClock> {
        Lifecycle::with_clock(self.client(), ManualClock::new(), settings)
    }

    pub fn set_lc_version(&self, version: &str) {
        self.state.lock().unwrap().lc_version = version.to_string();
    }

    pub fn script_ready(&self, statuses: &[ReadyStatus]) {
        self.state.lock().unwrap().ready = statuses.iter().copied().collect();
    }

    pub fn script_job(&self, job_id: &str, statuses: &[&str]) {
        self.state
            .lock()
            .unwrap()
            .jobs
            .insert(job_id.to_string(), statuses.iter().map(|s| s.to_string()).collect());
    }

    pub fn reboot_job_id(&self) -> String {
        self.state.lock().unwrap().reboot_job_id.clone()
    }

    pub fn config_job_id(&self) -> String {
        self.state.lock().unwrap().config_job_id.clone()
    }

    pub fn set_system_field(&self, name: &str, value: &str) {
        let mut state = self.state.lock().unwrap();
        state.system_view.retain(|(k, _)| k != name);
        state.system_view.push((name.to_string(), value.to_string()));
    }

    pub fn set_bios_attribute(&self, name: &str, current: &str, possible: &[&str], read_only: bool) {
        self.state.lock().unwrap().bios.insert(
            name.to_string(),
            BiosAttribute {
                current: current.to_string(),
                possible: possible.iter().map(|p| p.to_string()).collect(),
                read_only,
            },
        );
    }

    /// Makes every call to `method` answer with `return_value`.
    pub fn fail_method(&self, method: &str, return_value: &str, message_id: &str, message: &str) {
        self.state.lock().unwrap().failures.insert(
            method.to_string(),
            Failure {
                return_value: Some(return_value.to_string()),
                message_id: message_id.to_string(),
                message: message.to_string(),
            },
        );
    }

    /// Makes every call to `method` answer without any ReturnValue.
    pub fn omit_return_value(&self, method: &str) {
        self.state.lock().unwrap().failures.insert(
            method.to_string(),
            Failure {
                return_value: None,
                message_id: String::new(),
                message: String::new(),
            },
        );
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.state.lock().unwrap().invocations.clone()
    }

    pub fn calls(&self, method: &str) -> Vec<Invocation> {
        self.invocations()
            .into_iter()
            .filter(|i| i.method == method)
            .collect()
    }

    pub fn methods(&self) -> Vec<String> {
        self.invocations().into_iter().map(|i| i.method).collect()
    }

    pub fn job_gets(&self) -> Vec<String> {
        self.state.lock().unwrap().job_gets.clone()
    }

    fn add_view(&self, class: &str, fqdd: &str, fields: &[(&str, &str)]) {
        let mut instance = pairs(&[("FQDD", fqdd), ("InstanceID", fqdd)]);
        instance.extend(pairs(fields));
        self.state
            .lock()
            .unwrap()
            .views
            .entry(class.to_string())
            .or_default()
            .insert(fqdd.to_string(), instance);
    }

    /// Raw RaidStatus and HotSpareStatus values; the disk is otherwise healthy.
    pub fn add_physical_disk(&self, fqdd: &str, raid_status: &str, hot_spare: &str) {
        self.add_view(
            "DCIM_PhysicalDiskView",
            fqdd,
            &[
                ("RaidStatus", raid_status),
                ("HotSpareStatus", hot_spare),
                ("PrimaryStatus", "1"),
                ("PredictiveFailureState", "0"),
                ("MediaType", "0"),
            ],
        );
    }

    pub fn add_controller(&self, fqdd: &str) {
        self.add_view("DCIM_ControllerView", fqdd, &[("PrimaryStatus", "1")]);
    }

    pub fn add_enclosure(&self, fqdd: &str) {
        self.add_view("DCIM_EnclosureView", fqdd, &[("PrimaryStatus", "1")]);
    }

    pub fn add_virtual_disk(&self, fqdd: &str) {
        self.add_view(
            "DCIM_VirtualDiskView",
            fqdd,
            &[("RAIDTypes", "4"), ("RAIDStatus", "2"), ("PrimaryStatus", "1")],
        );
    }

    pub fn set_view_field(&self, class: &str, fqdd: &str, name: &str, value: &str) {
        let mut state = self.state.lock().unwrap();
        let instance = state
            .views
            .get_mut(class)
            .and_then(|instances| instances.get_mut(fqdd))
            .unwrap();
        instance.retain(|(k, _)| k != name);
        instance.push((name.to_string(), value.to_string()));
    }

    /// Answer of ClearForeignConfig and ResetConfig.
    pub fn set_raid_reboot_required(&self, value: &str) {
        self.state.lock().unwrap().raid_reboot_required = value.to_string();
    }

    /// Configuration jobs created through the RAID service, in order.
    pub fn raid_job_ids(&self) -> Vec<String> {
        self.state.lock().unwrap().raid_jobs.clone()
    }
}

fn wrap(body: &str) -> String {
    format!("{}{}{}", ENVELOPE_OPEN, body, ENVELOPE_CLOSE)
}

fn fields_xml(fields: &[(String, String)]) -> String {
    fields
        .iter()
        .map(|(name, value)| format!("<n1:{name}>{value}</n1:{name}>"))
        .collect()
}

fn instance_xml(class: &str, fields: &[(String, String)]) -> String {
    format!(
        r#"<n1:{class} xmlns:n1="{uri}">{fields}</n1:{class}>"#,
        uri = resource_uri(class),
        fields = fields_xml(fields)
    )
}

fn job_reference(name: &str, job_id: &str) -> String {
    format!(
        r#"<n1:{name}><wsa:EndpointReference><wsa:Address>http://schemas.xmlsoap.org/ws/2004/08/addressing/role/anonymous</wsa:Address><wsa:ReferenceParameters><wsman:ResourceURI>{uri}</wsman:ResourceURI><wsman:SelectorSet><wsman:Selector Name="InstanceID">{job_id}</wsman:Selector><wsman:Selector Name="__cimnamespace">root/dcim</wsman:Selector></wsman:SelectorSet></wsa:ReferenceParameters></wsa:EndpointReference></n1:{name}>"#,
        uri = resource_uri("DCIM_LifecycleJob"),
    )
}

fn fault(reason: &str) -> String {
    wrap(&format!(
        "<s:Fault><s:Code><s:Value>s:Sender</s:Value></s:Code><s:Reason><s:Text>{}</s:Text></s:Reason></s:Fault>",
        reason
    ))
}

fn pairs(fields: &[(&str, &str)]) -> Vec<(String, String)> {
    fields
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn child_text(elem: &Element, name: &str) -> String {
    elem.get_child(name)
        .and_then(|e| e.get_text())
        .map(|t| t.into_owned())
        .unwrap_or_default()
}

fn elements(elem: &Element) -> impl Iterator<Item = &Element> {
    elem.children.iter().filter_map(|node| match node {
        XMLNode::Element(e) => Some(e),
        _ => None,
    })
}

fn handle(state: &mut State, payload: &str) -> Result<String, WsmanError> {
    let root = Element::parse(Cursor::new(payload.as_bytes()))?;
    let header = root.get_child("Header");
    let body = root.get_child("Body");

    if body.and_then(|b| b.get_child("Identify")).is_some() {
        return Ok(wrap(&format!(
            r#"<wsmid:IdentifyResponse xmlns:wsmid="http://schemas.dmtf.org/wbem/wsman/identity/1/wsmanidentity.xsd" xmlns:dellident="http://schemas.dell.com/wbem/wscim/1/cim-schema/2/wsmanidentity.xsd"><wsmid:ProductVendor>Fake LC</wsmid:ProductVendor><dellident:LifecycleControllerVersion>{}</dellident:LifecycleControllerVersion></wsmid:IdentifyResponse>"#,
            state.lc_version
        )));
    }

    let header = header.ok_or_else(|| WsmanError::element_not_found("request has no header"))?;
    let action = child_text(header, "Action");
    let uri = child_text(header, "ResourceURI");
    let class = uri.trim_start_matches(DCIM).trim_start_matches('/').to_string();
    let selectors: HashMap<String, String> = header
        .get_child("SelectorSet")
        .map(|set| {
            elements(set)
                .filter_map(|s| {
                    let name = s.attributes.get("Name")?.clone();
                    Some((name, s.get_text().map(|t| t.into_owned()).unwrap_or_default()))
                })
                .collect()
        })
        .unwrap_or_default();

    if action == enumerate_action() {
        return Ok(wrap(&format!(
            "<wsen:EnumerateResponse><wsen:EnumerationContext>ctx-{}</wsen:EnumerationContext></wsen:EnumerateResponse>",
            class
        )));
    }

    if action == pull_action() {
        let items: String = enumerate(state, &class)
            .iter()
            .map(|fields| instance_xml(&class, fields))
            .collect();
        return Ok(wrap(&format!(
            "<wsen:PullResponse><wsen:Items>{}</wsen:Items><wsen:EndOfSequence/></wsen:PullResponse>",
            items
        )));
    }

    if action == get_action() {
        return Ok(get(state, &class, &selectors));
    }

    let method = action
        .strip_prefix(&format!("{}/", uri))
        .ok_or_else(|| WsmanError::element_not_found(format!("unexpected action {}", action)))?
        .to_string();
    let inputs = body
        .and_then(|b| b.get_child(format!("{}_INPUT", method).as_str()))
        .map(|input| {
            elements(input)
                .map(|e| (e.name.clone(), e.get_text().map(|t| t.into_owned()).unwrap_or_default()))
                .collect()
        })
        .unwrap_or_default();

    state.invocations.push(Invocation {
        class: class.clone(),
        method: method.clone(),
        inputs,
    });
    Ok(invoke(state, &class, &method))
}

fn enumerate(state: &State, class: &str) -> Vec<Vec<(String, String)>> {
    match class {
        "DCIM_BIOSEnumeration" => state
            .bios
            .iter()
            .map(|(name, attr)| bios_fields(name, attr))
            .collect(),
        "DCIM_SystemView" => vec![state.system_view.clone()],
        "DCIM_PhysicalDiskView" | "DCIM_ControllerView" | "DCIM_EnclosureView"
        | "DCIM_VirtualDiskView" => state
            .views
            .get(class)
            .map(|instances| instances.values().cloned().collect())
            .unwrap_or_default(),
        _ => vec![pairs(&[
            ("CreationClassName", class),
            ("Name", class),
            ("SystemCreationClassName", "DCIM_ComputerSystem"),
            ("SystemName", "DCIM:ComputerSystem"),
            ("ElementName", "Fake service"),
        ])],
    }
}

fn bios_fields(name: &str, attr: &BiosAttribute) -> Vec<(String, String)> {
    let instance_id = format!("BIOS.Setup.1-1:{}", name);
    let mut fields = pairs(&[
        ("InstanceID", instance_id.as_str()),
        ("AttributeName", name),
        ("CurrentValue", attr.current.as_str()),
        ("IsReadOnly", if attr.read_only { "true" } else { "false" }),
    ]);
    for possible in &attr.possible {
        fields.push(("PossibleValues".to_string(), possible.clone()));
    }
    fields
}

fn get(state: &mut State, class: &str, selectors: &HashMap<String, String>) -> String {
    let id = selectors.get("InstanceID").cloned().unwrap_or_default();

    match class {
        "DCIM_LifecycleJob" => {
            state.job_gets.push(id.clone());
            let status = state
                .jobs
                .get_mut(&id)
                .and_then(next_scripted)
                .unwrap_or_else(|| "Completed".to_string());
            let message = format!("Job is {}", status);
            let fields = pairs(&[
                ("InstanceID", id.as_str()),
                ("JobStatus", status.as_str()),
                ("Message", message.as_str()),
                ("MessageID", "SUP018"),
                ("Name", "ConfigBIOS:BIOS.Setup.1-1"),
            ]);
            wrap(&instance_xml(class, &fields))
        }
        "DCIM_SystemView" => wrap(&instance_xml(class, &state.system_view)),
        "DCIM_BIOSEnumeration" => {
            let name = id.rsplit(':').next().unwrap_or_default();
            match state.bios.get(name) {
                Some(attr) => wrap(&instance_xml(class, &bios_fields(name, attr))),
                None => fault("No such BIOS attribute"),
            }
        }
        "DCIM_PhysicalDiskView" => {
            let fqdd = selectors.get("FQDD").cloned().unwrap_or_default();
            match state.views.get(class).and_then(|disks| disks.get(&fqdd)) {
                Some(fields) => wrap(&instance_xml(class, fields)),
                None => fault("No such physical disk"),
            }
        }
        _ => fault(&format!("Get not supported on {}", class)),
    }
}

fn invoke(state: &mut State, class: &str, method: &str) -> String {
    let (mut fields, mut references) = match method {
        "GetRemoteServicesAPIStatus" => {
            let status = next_scripted(&mut state.ready).unwrap_or(READY);
            let (message_id, message) = if status.status == "0" {
                ("LC061", "Lifecycle Controller Remote Services is ready.")
            } else {
                ("LC060", "Lifecycle Controller Remote Services is not ready.")
            };
            let fields = pairs(&[
                ("Status", status.status),
                ("ServerStatus", status.server_status),
                ("LCStatus", status.lc_status),
                ("MessageID", message_id),
                ("Message", message),
                ("ReturnValue", "0"),
            ]);
            (fields, String::new())
        }
        "CreateRebootJob" => (
            pairs(&[("ReturnValue", "4096")]),
            job_reference("RebootJobID", &state.reboot_job_id),
        ),
        "CreateTargetedConfigJob"
            if class == "DCIM_RAIDService" && !state.failures.contains_key(method) =>
        {
            let job_id = format!("JID_3000000000{:02}", state.raid_jobs.len() + 1);
            state.raid_jobs.push(job_id.clone());
            (pairs(&[("ReturnValue", "4096")]), job_reference("Job", &job_id))
        }
        "ClearForeignConfig" | "ResetConfig" => (
            pairs(&[
                ("MessageID", "STOR001"),
                ("Message", "The operation successfully completed."),
                ("RebootRequired", state.raid_reboot_required.as_str()),
                ("ReturnValue", "0"),
            ]),
            String::new(),
        ),
        "CreateTargetedConfigJob" => (
            pairs(&[("ReturnValue", "4096")]),
            job_reference("Job", &state.config_job_id),
        ),
        _ => (
            pairs(&[
                ("MessageID", "SUP000"),
                ("Message", "Command successful"),
                ("ReturnValue", "0"),
            ]),
            String::new(),
        ),
    };

    if let Some(failure) = state.failures.get(method) {
        references.clear();
        fields = pairs(&[
            ("MessageID", failure.message_id.as_str()),
            ("Message", failure.message.as_str()),
        ]);
        if let Some(return_value) = &failure.return_value {
            fields.push(("ReturnValue".to_string(), return_value.clone()));
        }
    }

    wrap(&format!(
        r#"<n1:{method}_OUTPUT xmlns:n1="{uri}">{references}{fields}</n1:{method}_OUTPUT>"#,
        uri = resource_uri(class),
        fields = fields_xml(&fields),
    ))
}
