//! Azure inventory via the `az` CLI.

use std::collections::BTreeMap;
use std::ffi::OsString;

use serde::Deserialize;
use tracing::debug;

use super::{InventoryGateway, InventoryRecord, NetworkRecord, tags_from_nullable};
use crate::command::{CommandError, CommandRunner, run_json};

/// Default Azure CLI binary name.
pub const DEFAULT_AZ_BIN: &str = "az";

/// Lists Azure virtual networks and VMs by shelling out to `az`.
#[derive(Clone, Debug)]
pub struct AzureGateway<R: CommandRunner> {
    az_bin: String,
    subscription_id: Option<String>,
    runner: R,
}

impl<R: CommandRunner> AzureGateway<R> {
    /// Creates a gateway using the provided runner.
    #[must_use]
    pub fn new(az_bin: impl Into<String>, runner: R) -> Self {
        Self {
            az_bin: az_bin.into(),
            subscription_id: None,
            runner,
        }
    }

    /// Scopes every listing to a subscription.
    #[must_use]
    pub fn subscription(mut self, subscription_id: Option<String>) -> Self {
        self.subscription_id = subscription_id.filter(|id| !id.trim().is_empty());
        self
    }

    fn build_args(&self, subcommand: &[&str], extra: &[String]) -> Vec<OsString> {
        let mut args: Vec<OsString> = subcommand.iter().map(OsString::from).collect();
        args.push(OsString::from("list"));
        for value in extra {
            args.push(OsString::from(value));
        }
        if let Some(subscription) = &self.subscription_id {
            args.push(OsString::from("--subscription"));
            args.push(OsString::from(subscription));
        }
        args.push(OsString::from("--output"));
        args.push(OsString::from("json"));
        args
    }
}

impl<R: CommandRunner> InventoryGateway for AzureGateway<R> {
    type Error = CommandError;

    fn network_suffix(&self) -> &'static str {
        "-bosh-vn"
    }

    fn list_instances(
        &self,
        scope: &str,
        _network_name: &str,
    ) -> Result<Vec<InventoryRecord>, Self::Error> {
        debug!(resource_group = scope, "listing azure vms");
        let args = self.build_args(
            &["vm"],
            &[String::from("--resource-group"), scope.to_owned()],
        );
        let vms: Vec<AzureVm> = run_json(&self.runner, &self.az_bin, &args, "vms")?;
        Ok(vms
            .into_iter()
            .map(|vm| InventoryRecord {
                name: vm.name,
                tags: tags_from_nullable(vm.tags),
            })
            .collect())
    }

    fn list_networks(&self) -> Result<Vec<NetworkRecord>, Self::Error> {
        let args = self.build_args(&["network", "vnet"], &[]);
        let networks: Vec<AzureVirtualNetwork> =
            run_json(&self.runner, &self.az_bin, &args, "virtual networks")?;
        Ok(networks
            .into_iter()
            .map(|network| NetworkRecord { name: network.name })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct AzureVm {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    tags: Option<BTreeMap<String, Option<String>>>,
}

#[derive(Debug, Deserialize)]
struct AzureVirtualNetwork {
    #[serde(default)]
    name: Option<String>,
}
