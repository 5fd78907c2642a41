//! Orchestration des jobs du Lifecycle Controller
//!
//! Le contrôleur exécute les changements de configuration sous forme de
//! jobs asynchrones. Ce module attend que le contrôleur soit prêt, met les
//! jobs en file (avec ou sans redémarrage) et suit leur progression jusqu'à
//! un état terminal.
//!
//! Toutes les attentes sont bornées par un budget ([`Countdown`]) ; l'horloge
//! est injectée pour que les tests n'attendent jamais réellement.

use std::cell::RefCell;
use std::fmt;
use std::time::Duration;

use lcwsman::{HttpTransport, Transport};
use tracing::{debug, error, info};

use crate::client::{ArgValue, DcimClient};
use crate::countdown::{Clock, Countdown, SystemClock};
use crate::dcim::{
    JOB_SERVICE, LC_SERVICE, LIFECYCLE_JOB, POWER_SERVICE, SYSTEM_MANAGEMENT_SERVICE, SYSTEM_VIEW,
};
use crate::errors::LcError;
use crate::qualified::{QualifiedProperties, QualifiedValue};

/// FQDD of the system view instance.
pub const SYSTEM_FQDD: &str = "System.Embedded.1";

/// ServerStatus values: POST error prompt, F2 setup, F11 boot manager.
const HALTED_SERVER_STATUS: [&str; 3] = ["6", "8", "9"];
/// LCStatus values: disabled, in recovery.
const HALTED_LC_STATUS: [&str; 2] = ["3", "4"];

const JOB_SUCCESS_STATES: [&str; 2] = ["completed", "reboot completed"];
const JOB_FAIL_STATES: [&str; 3] = ["failed", "reboot failed", "completed with errors"];
const JOB_REBOOT_STATES: [&str; 1] = ["downloaded"];

const CLEAR_ALL_JOBS: &str = "JID_CLEARALL";
const TIME_NOW: &str = "TIME_NOW";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub ready_timeout: Duration,
    pub ready_interval: Duration,
    pub job_timeout: Duration,
    pub job_interval: Duration,
    /// Reboot with a graceful shutdown instead of a power cycle.
    pub graceful_reboot: bool,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            ready_timeout: Duration::from_secs(1800),
            ready_interval: Duration::from_secs(20),
            job_timeout: Duration::from_secs(1800),
            job_interval: Duration::from_secs(10),
            graceful_reboot: false,
        }
    }
}

/// Classification of a `JobStatus` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Succeeded,
    Failed,
    /// Firmware staged; a reboot applies it.
    RebootNeeded,
}

impl JobState {
    /// Classifies a status, ignoring case.
    pub fn classify(status: &str) -> Self {
        let status = status.to_lowercase();
        if JOB_SUCCESS_STATES.contains(&status.as_str()) {
            JobState::Succeeded
        } else if JOB_FAIL_STATES.contains(&status.as_str()) {
            JobState::Failed
        } else if JOB_REBOOT_STATES.contains(&status.as_str()) {
            JobState::RebootNeeded
        } else {
            JobState::Running
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInfo {
    pub id: String,
    pub status: String,
    pub message: String,
    pub message_id: String,
}

impl JobInfo {
    pub fn state(&self) -> JobState {
        JobState::classify(&self.status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JobOutcome {
    pub succeeded: bool,
    pub reboot_needed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInfo {
    pub system_id: String,
    pub service_tag: String,
    pub model: String,
    pub lc_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChassisStatus {
    pub lc_status: QualifiedValue,
    pub server_status: QualifiedValue,
}

/// Health of the system view: primary status plus every other status not OK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub manufacturer: String,
    pub model: String,
    pub service_tag: String,
    pub primary_status: QualifiedValue,
    /// `(attribute, value)` of each status whose raw value is not `1` (OK).
    pub degraded: Vec<(String, QualifiedValue)>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.primary_status.unmapped_value() == "1" && self.degraded.is_empty()
    }
}

impl fmt::Display for HealthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "The health of your {} {} with service tag {} is '{}'",
            self.manufacturer, self.model, self.service_tag, self.primary_status
        )?;
        for (name, value) in &self.degraded {
            write!(f, "\nThe status '{}' is reporting '{}'", name, value)?;
        }
        Ok(())
    }
}

/// Last values logged by the readiness loop.
#[derive(Default)]
struct ReadySnapshot {
    message_id: Option<String>,
    server_status: Option<String>,
    lc_status: Option<String>,
}

fn changed(previous: &mut Option<String>, current: &str) -> bool {
    if previous.as_deref() == Some(current) {
        return false;
    }
    *previous = Some(current.to_string());
    true
}

pub struct Lifecycle<T: Transport = HttpTransport, C: Clock = SystemClock> {
    client: DcimClient<T>,
    clock: C,
    settings: PollSettings,
    system: RefCell<Option<SystemInfo>>,
}

impl<T: Transport> Lifecycle<T, SystemClock> {
    pub fn new(client: DcimClient<T>, settings: PollSettings) -> Self {
        Self::with_clock(client, SystemClock, settings)
    }
}

impl<T: Transport, C: Clock> Lifecycle<T, C> {
    pub fn with_clock(client: DcimClient<T>, clock: C, settings: PollSettings) -> Self {
        Self {
            client,
            clock,
            settings,
            system: RefCell::new(None),
        }
    }

    pub fn client(&self) -> &DcimClient<T> {
        &self.client
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    fn remote_services_status(&self) -> Result<QualifiedProperties, LcError> {
        self.client
            .invoke(LC_SERVICE, "GetRemoteServicesAPIStatus", &[])
    }

    pub fn poll_lc_ready(&self) -> Result<(), LcError> {
        self.poll_lc_ready_with(self.settings.ready_timeout, self.settings.ready_interval)
    }

    /// Waits until the remote services API reports ready.
    ///
    /// A server stopped at a POST prompt or in a setup menu, and a
    /// controller disabled or in recovery, are reported as [`LcError::Halted`]
    /// at once: only someone at the console can get them out of there.
    pub fn poll_lc_ready_with(&self, timeout: Duration, interval: Duration) -> Result<(), LcError> {
        info!("Making sure the LC is ready for commands");

        let mut previous = ReadySnapshot::default();

        for remaining in Countdown::new(&self.clock, timeout, interval) {
            let status = self.remote_services_status()?;

            let message_id = status.attribute("MessageID")?;
            if changed(&mut previous.message_id, message_id.value()) {
                let message = status
                    .attribute("Message")
                    .map(|m| m.value().to_string())
                    .unwrap_or_default();
                info!(
                    "Status is '{}': {}: {}",
                    status.attribute("Status")?,
                    message_id,
                    message
                );
            }

            let server_status = status.attribute("ServerStatus")?;
            if changed(&mut previous.server_status, server_status.value()) {
                info!("Server Status is '{}'", server_status);
            }
            if HALTED_SERVER_STATUS.contains(&server_status.unmapped_value()) {
                let message = format!(
                    "Server is halted at F1/F2 error prompt or in a configuration menu ({})",
                    server_status
                );
                error!("{}", message);
                return Err(LcError::Halted(message));
            }

            let lc_status = status.attribute("LCStatus")?;
            if changed(&mut previous.lc_status, lc_status.value()) {
                info!("LCStatus is '{}'", lc_status);
            }
            if HALTED_LC_STATUS.contains(&lc_status.unmapped_value()) {
                let message = format!(
                    "Server Lifecycle controller is '{}'. Please enable and retry.",
                    lc_status
                );
                error!("{}", message);
                return Err(LcError::Halted(message));
            }

            if status.attribute("Status")?.unmapped_value() == "0" {
                return Ok(());
            }

            debug!(remaining = ?remaining, "LC not ready");
        }

        let message = format!("Lifecycle controller not ready after {:?}", timeout);
        error!("{}", message);
        Err(LcError::Timeout(message))
    }

    /// Current state of a job.
    pub fn job_info(&self, job_id: &str) -> Result<JobInfo, LcError> {
        let job = self.client.get(LIFECYCLE_JOB, job_id)?;
        let raw = |name: &str| {
            job.attribute(name)
                .map(|v| v.unmapped_value().to_string())
                .unwrap_or_default()
        };

        Ok(JobInfo {
            id: job_id.to_string(),
            status: job.attribute("JobStatus")?.unmapped_value().to_string(),
            message: raw("Message"),
            message_id: raw("MessageID"),
        })
    }

    pub fn poll_job(&self, job_id: &str) -> Result<JobOutcome, LcError> {
        self.poll_job_with(job_id, self.settings.job_timeout, self.settings.job_interval)
    }

    /// Follows a job until it reaches a terminal state.
    ///
    /// Readiness is checked before every query. Running out of time is not an
    /// error: the outcome is then reported as failed.
    pub fn poll_job_with(
        &self,
        job_id: &str,
        timeout: Duration,
        interval: Duration,
    ) -> Result<JobOutcome, LcError> {
        debug!(job_id, "BEGIN_POLLING");

        let mut previous: Option<String> = None;
        let mut outcome = None;

        for _ in Countdown::new(&self.clock, timeout, interval) {
            self.poll_lc_ready()?;
            let job = self.job_info(job_id)?;
            let status = job.status.to_lowercase();

            if previous.as_deref() == Some(status.as_str()) {
                continue;
            }
            info!(
                job_id,
                "Job state transition from {} to {}",
                previous.as_deref().unwrap_or("None"),
                status
            );
            previous = Some(status);

            outcome = match job.state() {
                JobState::Running => continue,
                JobState::Failed => {
                    error!("Job {} failed: {}: {}", job_id, job.message_id, job.message);
                    Some(JobOutcome::default())
                }
                JobState::Succeeded => {
                    info!("Job {} complete: {}: {}", job_id, job.message_id, job.message);
                    Some(JobOutcome {
                        succeeded: true,
                        reboot_needed: false,
                    })
                }
                JobState::RebootNeeded => {
                    info!("Job {} complete: {}: {}", job_id, job.message_id, job.message);
                    Some(JobOutcome {
                        succeeded: true,
                        reboot_needed: true,
                    })
                }
            };
            break;
        }

        let outcome = outcome.unwrap_or_else(|| {
            error!("LC job {} timed out", job_id);
            JobOutcome::default()
        });

        debug!(job_id, "END_POLLING");
        Ok(outcome)
    }

    /// Polls every job in order, then fails with the list of failed jobs.
    pub fn poll_jobs(&self, job_ids: &[String]) -> Result<(), LcError> {
        let mut failed = Vec::new();

        for job_id in job_ids {
            if self.poll_job(job_id)?.succeeded {
                info!("Job {} complete!", job_id);
            } else {
                error!("Job {} failed!", job_id);
                failed.push(job_id.clone());
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            error!(jobs = ?failed, "LC configuration jobs failed. Aborting!");
            Err(LcError::job_failure(failed))
        }
    }

    fn setup_job_queue(&self, job_ids: &[String]) -> Result<(), LcError> {
        info!(jobs = ?job_ids, "Setting up job queue");
        self.client.invoke(
            JOB_SERVICE,
            "SetupJobQueue",
            &[
                ("JobArray", ArgValue::List(job_ids.to_vec())),
                ("StartTimeInterval", TIME_NOW.into()),
            ],
        )?;
        Ok(())
    }

    /// Queues jobs that need no reboot and waits for them.
    pub fn queue_jobs(&self, job_ids: &[String]) -> Result<(), LcError> {
        self.setup_job_queue(job_ids)?;
        self.poll_jobs(job_ids)
    }

    /// Queues jobs behind a reboot job and waits for all of them.
    ///
    /// The reboot job is polled first. If it fails, the other jobs are not
    /// polled and the error names the reboot job.
    ///
    /// The queue is not cleared here: the caller must have run
    /// [`normalize_job_queue`] before creating `job_ids`, otherwise a job left
    /// over from an earlier run is started by this reboot as well. Use
    /// [`reboot`] for a plain reboot.
    ///
    /// [`normalize_job_queue`]: Lifecycle::normalize_job_queue
    /// [`reboot`]: Lifecycle::reboot
    pub fn queue_jobs_and_reboot(&self, job_ids: &[String]) -> Result<(), LcError> {
        if job_ids.is_empty() {
            info!("No jobs to run. Assuming just a reboot is desired.");
        }

        let (reboot_type, reboot_desc) = if self.settings.graceful_reboot {
            ("2", "Graceful Reboot without forced shutdown")
        } else {
            ("1", "PowerCycle")
        };

        info!("Setting up reboot job of type '{}'", reboot_desc);
        let result = self.client.invoke(
            JOB_SERVICE,
            "CreateRebootJob",
            &[("RebootJobType", reboot_type.into())],
        )?;
        let reboot_id = reboot_job_id(&result)?;

        let mut queue = job_ids.to_vec();
        queue.push(reboot_id.clone());
        self.setup_job_queue(&queue)?;

        if self.poll_job(&reboot_id)?.succeeded {
            info!("Reboot complete. Waiting for jobs to complete.");
            self.poll_jobs(job_ids)
        } else {
            error!(reboot_id = %reboot_id, "Reboot job failed.");
            Err(LcError::job_failure(vec![reboot_id]))
        }
    }

    /// Clears the job queue, then reboots through a reboot job.
    pub fn reboot(&self) -> Result<(), LcError> {
        self.normalize_job_queue()?;
        self.queue_jobs_and_reboot(&[])
    }

    /// Deletes every queued job, then waits for the controller.
    pub fn normalize_job_queue(&self) -> Result<(), LcError> {
        info!("Clearing Job Queue");
        self.client
            .invoke(JOB_SERVICE, "DeleteJobQueue", &[("JobID", CLEAR_ALL_JOBS.into())])?;
        self.poll_lc_ready()
    }

    /// Identity of the system, read once and then cached.
    pub fn system_info(&self) -> Result<SystemInfo, LcError> {
        if let Some(info) = self.system.borrow().as_ref() {
            return Ok(info.clone());
        }

        info!("Getting system ID");
        let view = self.client.get(SYSTEM_VIEW, SYSTEM_FQDD)?;
        let info = SystemInfo {
            system_id: view.attribute("SystemID")?.value().to_string(),
            service_tag: view.attribute("ServiceTag")?.value().to_string(),
            model: view.attribute("Model")?.value().to_string(),
            lc_version: view.attribute("LifecycleControllerVersion")?.value().to_string(),
        };
        info!(
            "SystemID: '{}', ServiceTag: '{}', Model: '{}'",
            info.system_id, info.service_tag, info.model
        );

        // Certains DRAC remontent 0 jusqu'à un racreset
        match info.system_id.trim().parse::<u64>() {
            Ok(0) => {
                return Err(LcError::Data(
                    "DRAC thinks its SystemID is 0. DRAC has lost its mind and should be reset."
                        .to_string(),
                ));
            }
            Ok(_) => {}
            Err(e) => {
                error!("SystemID '{}' is not a number: {}", info.system_id, e);
                return Err(LcError::Data(format!(
                    "Got a SystemID '{}' from the DRAC that is not a number greater than zero.",
                    info.system_id
                )));
            }
        }

        info!("Lifecycle Controller Version {}", info.lc_version);
        *self.system.borrow_mut() = Some(info.clone());
        Ok(info)
    }

    pub fn service_tag(&self) -> Result<String, LcError> {
        Ok(self.system_info()?.service_tag)
    }

    pub fn system_id(&self) -> Result<String, LcError> {
        Ok(self.system_info()?.system_id)
    }

    pub fn system_model(&self) -> Result<String, LcError> {
        Ok(self.system_info()?.model)
    }

    /// Turns the chassis identify LED on or off.
    pub fn identify_chassis(&self, on: bool) -> Result<(), LcError> {
        info!(
            "Turning {} the chassis Identify LED",
            if on { "on" } else { "off" }
        );
        self.client.invoke(
            SYSTEM_MANAGEMENT_SERVICE,
            "IdentifyChassis",
            &[("IdentifyState", ArgValue::from(if on { "1" } else { "0" }))],
        )?;
        Ok(())
    }

    /// `Ok(false)` when the firmware refuses the change, e.g. already on.
    pub fn power_on(&self) -> Result<bool, LcError> {
        info!("Turning on system");
        self.request_power_state("2")
    }

    pub fn power_off(&self) -> Result<bool, LcError> {
        info!("Turning off system");
        self.request_power_state("8")
    }

    pub fn power_cycle(&self) -> Result<bool, LcError> {
        info!("Power cycling system");
        self.request_power_state("9")
    }

    fn request_power_state(&self, state: &str) -> Result<bool, LcError> {
        match self.client.invoke(
            POWER_SERVICE,
            "RequestPowerStateChange",
            &[("PowerState", state.into())],
        ) {
            Ok(_) => Ok(true),
            Err(e @ LcError::Command { .. }) => {
                error!(power_state = state, "Failed to set power state: {}", e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub fn chassis_status(&self) -> Result<ChassisStatus, LcError> {
        let status = self.remote_services_status()?;
        let chassis = ChassisStatus {
            lc_status: status.attribute("LCStatus")?.clone(),
            server_status: status.attribute("ServerStatus")?.clone(),
        };
        info!("LC status is {}", chassis.lc_status);
        info!("Server status is {}", chassis.server_status);
        Ok(chassis)
    }

    pub fn health_report(&self) -> Result<HealthReport, LcError> {
        let view = self.client.get(SYSTEM_VIEW, SYSTEM_FQDD)?;

        let mut degraded = Vec::new();
        for name in view.properties().names() {
            if !name.contains("Status") || name == "PrimaryStatus" || name == "RollupStatus" {
                continue;
            }
            let status = view.attribute(name)?;
            if status.unmapped_value() != "1" {
                degraded.push((name.to_string(), status.clone()));
            }
        }

        Ok(HealthReport {
            manufacturer: view.attribute("Manufacturer")?.value().to_string(),
            model: view.attribute("Model")?.value().to_string(),
            service_tag: view.attribute("ServiceTag")?.value().to_string(),
            primary_status: view.attribute("PrimaryStatus")?.clone(),
            degraded,
        })
    }
}

/// Id of the reboot job created by `CreateRebootJob`.
fn reboot_job_id(result: &QualifiedProperties) -> Result<String, LcError> {
    result
        .attribute("RebootJobID")
        .or_else(|_| result.attribute("Job"))
        .map(|v| v.unmapped_value().to_string())
}
