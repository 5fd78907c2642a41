//! BIOS settings through the BIOS service.

use std::collections::BTreeMap;

use lcwsman::Transport;
use tracing::{error, info};

use crate::client::ArgValue;
use crate::countdown::Clock;
use crate::dcim::{BIOS_ENUMERATION, BIOS_SERVICE};
use crate::errors::LcError;
use crate::lifecycle::Lifecycle;

pub const BIOS_TARGET: &str = "BIOS.Setup.1-1";

/// MessageID returned when there is no pending configuration to delete.
const NO_PENDING_CONFIGURATION: &str = "BIOS012";

impl<T: Transport, C: Clock> Lifecycle<T, C> {
    /// Current value of every BIOS attribute, by attribute name.
    pub fn bios_inventory(&self) -> Result<BTreeMap<String, String>, LcError> {
        self.poll_lc_ready()?;
        info!("Enumerating BIOS settings...");

        let mut settings = BTreeMap::new();
        for instance in self.client().enumerate(BIOS_ENUMERATION)?.into_values() {
            let name = instance.attribute("AttributeName")?.unmapped_value().to_string();
            let current = instance
                .attribute("CurrentValue")
                .map(|v| v.unmapped_value().to_string())
                .unwrap_or_default();
            settings.insert(name, current);
        }

        Ok(settings)
    }

    pub fn clear_pending_bios_configuration(&self) -> Result<(), LcError> {
        info!("Clearing any pending BIOS configuration.");

        match self.client().invoke(
            BIOS_SERVICE,
            "DeletePendingConfiguration",
            &[("Target", BIOS_TARGET.into())],
        ) {
            Ok(_) => Ok(()),
            Err(e) if e.command_message_id() == Some(NO_PENDING_CONFIGURATION) => {
                info!("No pending configuration to clear");
                Ok(())
            }
            Err(e) => {
                error!("Failed to clear pending BIOS configuration: {}", e);
                Err(e)
            }
        }
    }

    /// Applies `settings` (attribute name → value) and reboots to commit them.
    ///
    /// Attributes already at the requested value are left alone. Returns the
    /// configuration job id, or `None` when nothing had to change.
    pub fn apply_bios_settings(
        &self,
        settings: &BTreeMap<String, String>,
    ) -> Result<Option<String>, LcError> {
        self.poll_lc_ready()?;
        self.normalize_job_queue()?;
        self.clear_pending_bios_configuration()?;

        let mut pending = false;
        for (name, expected) in settings {
            info!("Getting current setting for {}", name);
            let setting = self
                .client()
                .get(BIOS_ENUMERATION, &format!("{}:{}", BIOS_TARGET, name))?;

            let current = setting.attribute("CurrentValue")?.unmapped_value();
            if current == expected {
                info!("BIOS setting {} is already {}", name, current);
                continue;
            }

            let read_only = setting
                .attribute("IsReadOnly")
                .map(|v| v.unmapped_value() == "true")
                .unwrap_or(false);
            if read_only {
                let message = format!("Attempt to change read only BIOS setting: {}", name);
                error!("{}", message);
                return Err(LcError::Configuration(message));
            }

            let possible: Vec<&str> = setting
                .values("PossibleValues")
                .map(|values| values.iter().map(|v| v.unmapped_value()).collect())
                .unwrap_or_default();
            if !possible.contains(&expected.as_str()) {
                let message = format!(
                    "Changing BIOS setting {} to {} is not in the list of allowed values: {:?}",
                    name, expected, possible
                );
                error!("{}", message);
                return Err(LcError::Configuration(message));
            }

            info!("Changing {} from {} to {}", name, current, expected);
            self.client().invoke(
                BIOS_SERVICE,
                "SetAttribute",
                &[
                    ("Target", BIOS_TARGET.into()),
                    ("AttributeName", ArgValue::from(name.as_str())),
                    ("AttributeValue", ArgValue::from(expected.as_str())),
                ],
            )?;
            pending = true;
        }

        if !pending {
            return Ok(None);
        }

        let result = self.client().invoke(
            BIOS_SERVICE,
            "CreateTargetedConfigJob",
            &[("Target", BIOS_TARGET.into())],
        )?;
        let job_id = result.attribute("Job")?.unmapped_value().to_string();
        info!("Created BIOS configuration job {}", job_id);

        self.queue_jobs_and_reboot(std::slice::from_ref(&job_id))?;
        Ok(Some(job_id))
    }
}
