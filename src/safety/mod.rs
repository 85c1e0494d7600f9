//! Safety checks run before an environment is created or destroyed.
//!
//! The gate is provider agnostic: it asks an [`InventoryGateway`] for raw
//! listings and applies one tag policy. Only the director and jumpbox VMs
//! (tag `job` equal to `bosh` or `jumpbox`) may remain in an environment's
//! scope when it is torn down; anything else means workloads are still
//! deployed.

use std::fmt;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::inventory::{InventoryGateway, InventoryRecord, default_instance_scope};

/// Tag key identifying a VM's role.
pub const JOB_TAG: &str = "job";
/// Tag key naming the BOSH deployment that owns a VM.
pub const DEPLOYMENT_TAG: &str = "deployment";
/// Roles that may exist in a scope being deleted.
pub const PERMITTED_JOBS: [&str; 2] = ["bosh", "jumpbox"];

/// Instance reported when an environment is not safe to delete.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OffendingInstance {
    /// Instance name; empty when the provider reported none.
    pub name: String,
    /// Value of the `deployment` tag, if present.
    pub deployment: Option<String>,
}

impl fmt::Display for OffendingInstance {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.deployment {
            Some(deployment) => write!(formatter, " (deployment: {deployment}): {}", self.name),
            None => write!(formatter, ": {}", self.name),
        }
    }
}

impl From<&InventoryRecord> for OffendingInstance {
    fn from(record: &InventoryRecord) -> Self {
        Self {
            name: record.name.clone().unwrap_or_default(),
            deployment: record.tag_value(DEPLOYMENT_TAG).map(str::to_owned),
        }
    }
}

/// Errors returned by the safety gate.
///
/// Listing failures and unsafe verdicts share this type; callers tell them
/// apart by variant or message.
#[derive(Debug, Error)]
pub enum SafetyError<E>
where
    E: std::error::Error + 'static,
{
    /// Raised when the provider cannot list networks.
    #[error("List networks: {0}")]
    ListNetworks(#[source] E),
    /// Raised when the provider cannot list instances.
    #[error("List instances: {0}")]
    ListInstances(#[source] E),
    /// Raised when unexpected VMs remain in the environment's scope.
    #[error("bbl environment is not safe to delete; vms still exist in resource group: {scope}{instance}")]
    NotSafeToDelete {
        /// Scope that was inspected.
        scope: String,
        /// Instance reported to the operator.
        instance: OffendingInstance,
    },
}

/// Decides whether environments exist and whether they may be deleted.
#[derive(Clone, Debug)]
pub struct SafetyGate<G> {
    gateway: G,
}

impl<G: InventoryGateway> SafetyGate<G> {
    /// Creates a gate over the given inventory gateway.
    #[must_use]
    pub const fn new(gateway: G) -> Self {
        Self { gateway }
    }

    /// Returns `true` when the network `<scope_name><suffix>` already exists.
    ///
    /// # Errors
    ///
    /// Returns [`SafetyError::ListNetworks`] when listing fails; the answer is
    /// then unknown rather than negative.
    pub fn check_exists(&self, scope_name: &str) -> Result<bool, SafetyError<G::Error>> {
        let expected = format!("{scope_name}{}", self.gateway.network_suffix());
        let networks = self
            .gateway
            .list_networks()
            .map_err(SafetyError::ListNetworks)?;

        let exists = networks
            .iter()
            .any(|network| network.name.as_deref() == Some(expected.as_str()));
        debug!(network = %expected, exists, "checked for existing network");
        Ok(exists)
    }

    /// Verifies that only the director and jumpbox VMs remain in the
    /// environment's scope, `<env_id>-bosh`.
    ///
    /// `network_name` is handed to the gateway for providers that list by
    /// network; it never changes the scope named in the verdict.
    ///
    /// When several VMs offend, the first one in listing order that carries a
    /// `deployment` tag is reported, falling back to the first offender.
    ///
    /// # Errors
    ///
    /// Returns [`SafetyError::ListInstances`] when listing fails and
    /// [`SafetyError::NotSafeToDelete`] when other VMs are present.
    pub fn validate_safe_to_delete(
        &self,
        network_name: &str,
        env_id: &str,
    ) -> Result<(), SafetyError<G::Error>> {
        let scope = default_instance_scope(env_id);
        let instances = self
            .gateway
            .list_instances(&scope, network_name)
            .map_err(SafetyError::ListInstances)?;

        let offenders: Vec<&InventoryRecord> = instances
            .iter()
            .filter(|instance| !is_permitted(instance))
            .collect();

        let reported = offenders
            .iter()
            .find(|instance| instance.tag_value(DEPLOYMENT_TAG).is_some())
            .or_else(|| offenders.first());

        match reported {
            None => {
                info!(%scope, vms = instances.len(), "environment is safe to delete");
                Ok(())
            }
            Some(instance) => {
                warn!(%scope, offending = offenders.len(), "environment still has deployed vms");
                Err(SafetyError::NotSafeToDelete {
                    scope,
                    instance: OffendingInstance::from(*instance),
                })
            }
        }
    }
}

fn is_permitted(instance: &InventoryRecord) -> bool {
    instance
        .tag_value(JOB_TAG)
        .is_some_and(|job| PERMITTED_JOBS.contains(&job))
}
