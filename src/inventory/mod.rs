//! Provider inventory gateways.
//!
//! Each IaaS exposes the same two listings: compute instances inside a scope
//! and the networks known to the account. Gateways translate the provider's
//! native JSON into [`InventoryRecord`] and [`NetworkRecord`] without
//! interpreting tags; deciding what the tags mean is the safety gate's job.

use std::collections::BTreeMap;

mod aws;
mod azure;
mod gcp;
mod provider;

pub use aws::{AwsGateway, DEFAULT_AWS_BIN};
pub use azure::{AzureGateway, DEFAULT_AZ_BIN};
pub use gcp::{DEFAULT_GCLOUD_BIN, GcpGateway};
pub use provider::{ProviderBins, ProviderGateway};

/// Suffix appended to an environment id to name its dedicated resource scope.
pub const SCOPE_SUFFIX: &str = "-bosh";

/// One discovered compute instance.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct InventoryRecord {
    /// Instance name, when the provider reports one.
    pub name: Option<String>,
    /// Instance tags; empty when the provider reports none.
    pub tags: BTreeMap<String, String>,
}

impl InventoryRecord {
    /// Creates a record with the given name and no tags.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            tags: BTreeMap::new(),
        }
    }

    /// Adds a tag to the record.
    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Looks up a tag value.
    #[must_use]
    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

/// One network (or resource group) known to the provider.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NetworkRecord {
    /// Network name, when the provider reports one.
    pub name: Option<String>,
}

impl NetworkRecord {
    /// Creates a record for the named network.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}

/// Returns the resource scope the safety gate inspects: `<env_id>-bosh`.
#[must_use]
pub fn default_instance_scope(env_id: &str) -> String {
    format!("{env_id}{SCOPE_SUFFIX}")
}

/// Read-only view of a provider's compute inventory.
pub trait InventoryGateway {
    /// Provider specific error type returned by listings.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Suffix appended to a scope name to form the environment's network name.
    fn network_suffix(&self) -> &'static str;

    /// Lists every compute instance belonging to the environment whose
    /// resource scope is `scope`, in provider order.
    ///
    /// `network_name` is the environment's network as recorded by Terraform,
    /// or empty when unknown. Providers that cannot list by resource group
    /// use it to select the environment's instances.
    ///
    /// # Errors
    ///
    /// Returns the provider error when the listing call fails.
    fn list_instances(
        &self,
        scope: &str,
        network_name: &str,
    ) -> Result<Vec<InventoryRecord>, Self::Error>;

    /// Lists every network known to the provider.
    ///
    /// # Errors
    ///
    /// Returns the provider error when the listing call fails.
    fn list_networks(&self) -> Result<Vec<NetworkRecord>, Self::Error>;
}

/// Network filter for gateways that list by network: the network name when
/// known, otherwise the environment's scope.
fn network_or_scope<'a>(network_name: &'a str, scope: &'a str) -> &'a str {
    let trimmed = network_name.trim();
    if trimmed.is_empty() { scope } else { trimmed }
}

/// Converts a provider tag map whose values may be null.
fn tags_from_nullable(tags: Option<BTreeMap<String, Option<String>>>) -> BTreeMap<String, String> {
    tags.unwrap_or_default()
        .into_iter()
        .map(|(key, value)| (key, value.unwrap_or_default()))
        .collect()
}
