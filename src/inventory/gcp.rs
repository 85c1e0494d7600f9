//! GCP inventory via the `gcloud` CLI.

use std::collections::BTreeMap;
use std::ffi::OsString;

use serde::Deserialize;
use tracing::debug;

use super::{InventoryGateway, InventoryRecord, NetworkRecord, network_or_scope};
use crate::command::{CommandError, CommandRunner, run_json};

/// Default Google Cloud CLI binary name.
pub const DEFAULT_GCLOUD_BIN: &str = "gcloud";

/// Lists GCP networks and compute instances by shelling out to `gcloud`.
///
/// Instance labels are reported as tags.
#[derive(Clone, Debug)]
pub struct GcpGateway<R: CommandRunner> {
    gcloud_bin: String,
    project_id: String,
    runner: R,
}

impl<R: CommandRunner> GcpGateway<R> {
    /// Creates a gateway for `project_id` using the provided runner.
    #[must_use]
    pub fn new(gcloud_bin: impl Into<String>, project_id: impl Into<String>, runner: R) -> Self {
        Self {
            gcloud_bin: gcloud_bin.into(),
            project_id: project_id.into(),
            runner,
        }
    }

    fn build_list_args(&self, resource: &str, filter: Option<String>) -> Vec<OsString> {
        let mut args = vec![
            OsString::from("compute"),
            OsString::from(resource),
            OsString::from("list"),
            OsString::from(format!("--project={}", self.project_id)),
        ];
        if let Some(expression) = filter {
            args.push(OsString::from(format!("--filter={expression}")));
        }
        args.push(OsString::from("--format=json"));
        args
    }
}

impl<R: CommandRunner> InventoryGateway for GcpGateway<R> {
    type Error = CommandError;

    fn network_suffix(&self) -> &'static str {
        "-network"
    }

    fn list_instances(
        &self,
        scope: &str,
        network_name: &str,
    ) -> Result<Vec<InventoryRecord>, Self::Error> {
        let network = network_or_scope(network_name, scope);
        debug!(scope, network, "listing gcp instances");
        let args = self.build_list_args(
            "instances",
            Some(format!("networkInterfaces.network:{network}")),
        );
        let instances: Vec<GcpInstance> =
            run_json(&self.runner, &self.gcloud_bin, &args, "instances")?;
        Ok(instances
            .into_iter()
            .map(|instance| InventoryRecord {
                name: instance.name,
                tags: instance.labels.unwrap_or_default(),
            })
            .collect())
    }

    fn list_networks(&self) -> Result<Vec<NetworkRecord>, Self::Error> {
        let args = self.build_list_args("networks", None);
        let networks: Vec<GcpNetwork> = run_json(&self.runner, &self.gcloud_bin, &args, "networks")?;
        Ok(networks
            .into_iter()
            .map(|network| NetworkRecord { name: network.name })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct GcpInstance {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    labels: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct GcpNetwork {
    #[serde(default)]
    name: Option<String>,
}
