//! Gateway selected from an environment's provider.

use super::{AwsGateway, AzureGateway, GcpGateway, InventoryGateway, InventoryRecord, NetworkRecord};
use crate::command::{CommandError, CommandRunner};
use crate::state::{EnvironmentState, Iaas};

/// CLI binaries used by the provider gateways.
#[derive(Clone, Copy, Debug)]
pub struct ProviderBins<'a> {
    /// `aws` binary.
    pub aws: &'a str,
    /// `gcloud` binary.
    pub gcloud: &'a str,
    /// `az` binary.
    pub az: &'a str,
}

/// Inventory gateway for whichever provider hosts an environment.
#[derive(Clone, Debug)]
pub enum ProviderGateway<R: CommandRunner> {
    /// AWS, scoped to the environment's region.
    Aws(AwsGateway<R>),
    /// GCP, scoped to the environment's project.
    Gcp(GcpGateway<R>),
    /// Azure, scoped to the environment's subscription.
    Azure(AzureGateway<R>),
}

impl<R: CommandRunner> ProviderGateway<R> {
    /// Builds the gateway matching `state.iaas`.
    #[must_use]
    pub fn for_state(state: &EnvironmentState, bins: ProviderBins<'_>, runner: R) -> Self {
        match state.iaas {
            Iaas::Aws => Self::Aws(AwsGateway::new(bins.aws, &state.aws.region, runner)),
            Iaas::Gcp => Self::Gcp(GcpGateway::new(bins.gcloud, &state.gcp.project_id, runner)),
            Iaas::Azure => Self::Azure(
                AzureGateway::new(bins.az, runner)
                    .subscription(Some(state.azure.subscription_id.clone())),
            ),
        }
    }
}

impl<R: CommandRunner> InventoryGateway for ProviderGateway<R> {
    type Error = CommandError;

    fn network_suffix(&self) -> &'static str {
        match self {
            Self::Aws(gateway) => gateway.network_suffix(),
            Self::Gcp(gateway) => gateway.network_suffix(),
            Self::Azure(gateway) => gateway.network_suffix(),
        }
    }

    fn list_instances(
        &self,
        scope: &str,
        network_name: &str,
    ) -> Result<Vec<InventoryRecord>, Self::Error> {
        match self {
            Self::Aws(gateway) => gateway.list_instances(scope, network_name),
            Self::Gcp(gateway) => gateway.list_instances(scope, network_name),
            Self::Azure(gateway) => gateway.list_instances(scope, network_name),
        }
    }

    fn list_networks(&self) -> Result<Vec<NetworkRecord>, Self::Error> {
        match self {
            Self::Aws(gateway) => gateway.list_networks(),
            Self::Gcp(gateway) => gateway.list_networks(),
            Self::Azure(gateway) => gateway.list_networks(),
        }
    }
}
