//! Availability zone lookup.

use std::ffi::OsString;

use serde::Deserialize;
use tracing::debug;

use crate::command::{CommandError, CommandRunner, ProcessCommandRunner, run_json};

/// Lists the availability zones of a region.
pub trait Zones {
    /// Error type returned by the lookup.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the zone names for `region`, in provider order.
    ///
    /// # Errors
    ///
    /// Returns the provider's error when the zones cannot be listed.
    fn get(&self, region: &str) -> Result<Vec<String>, Self::Error>;
}

/// GCP zones via `gcloud compute zones list`.
#[derive(Clone, Debug)]
pub struct GcpZones<R: CommandRunner> {
    gcloud_bin: String,
    project_id: String,
    runner: R,
}

impl GcpZones<ProcessCommandRunner> {
    /// Creates a lookup wired to the real process runner.
    #[must_use]
    pub fn with_process_runner(
        gcloud_bin: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Self {
        Self::new(gcloud_bin, project_id, ProcessCommandRunner)
    }
}

impl<R: CommandRunner> GcpZones<R> {
    /// Creates a lookup for `project_id` using the provided runner.
    #[must_use]
    pub fn new(gcloud_bin: impl Into<String>, project_id: impl Into<String>, runner: R) -> Self {
        Self {
            gcloud_bin: gcloud_bin.into(),
            project_id: project_id.into(),
            runner,
        }
    }
}

impl<R: CommandRunner> Zones for GcpZones<R> {
    type Error = CommandError;

    fn get(&self, region: &str) -> Result<Vec<String>, Self::Error> {
        debug!(region, "listing gcp zones");
        let args = [
            OsString::from("compute"),
            OsString::from("zones"),
            OsString::from("list"),
            OsString::from(format!("--project={}", self.project_id)),
            OsString::from(format!("--filter=region:{region}")),
            OsString::from("--format=json"),
        ];
        let zones: Vec<GcpZone> = run_json(&self.runner, &self.gcloud_bin, &args, "zones")?;
        Ok(zones.into_iter().map(|zone| zone.name).collect())
    }
}

#[derive(Debug, Deserialize)]
struct GcpZone {
    name: String,
}
