//! Persisted identity and infrastructure state of one environment.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Current schema version written to `bbl-state.json`.
pub const STATE_VERSION: u32 = 1;

/// Infrastructure provider hosting an environment.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Iaas {
    /// Amazon Web Services.
    Aws,
    /// Google Cloud Platform.
    Gcp,
    /// Microsoft Azure.
    Azure,
}

impl Iaas {
    /// Returns the lowercase provider name used in state files and messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Gcp => "gcp",
            Self::Azure => "azure",
        }
    }

    /// Name of the Terraform output holding the environment's network
    /// identifier for this provider.
    #[must_use]
    pub const fn network_output(self) -> &'static str {
        match self {
            Self::Aws => "vpc_id",
            Self::Gcp | Self::Azure => "network_name",
        }
    }
}

impl fmt::Display for Iaas {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// AWS credentials and placement.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AwsState {
    /// Access key id.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Target region (for example `us-east-1`).
    pub region: String,
}

/// GCP credentials and placement.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GcpState {
    /// Service account key JSON.
    pub service_account_key: String,
    /// Project identifier.
    #[serde(rename = "projectID")]
    pub project_id: String,
    /// Zone for the director.
    pub zone: String,
    /// Region containing `zone`.
    pub region: String,
}

/// Azure credentials and placement.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AzureState {
    /// Subscription identifier.
    pub subscription_id: String,
    /// Tenant identifier.
    pub tenant_id: String,
    /// Service principal client id.
    pub client_id: String,
    /// Service principal secret.
    pub client_secret: String,
    /// Azure location (for example `westus`).
    pub location: String,
}

/// Connection details of the BOSH director, set once it exists.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoshState {
    /// Director URL, including scheme and port.
    pub director_address: String,
    /// Director admin username.
    pub director_username: String,
    /// Director admin password.
    pub director_password: String,
}

/// Load balancer most recently provisioned for the environment.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct LbState {
    /// LB type name; empty when none has been created.
    #[serde(rename = "type")]
    pub lb_type: String,
}

/// The persisted record identifying one managed environment.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentState {
    /// Schema version.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Provider hosting the environment.
    pub iaas: Iaas,
    /// Stable environment identity.
    #[serde(rename = "envID", default)]
    pub env_id: String,
    /// AWS block.
    #[serde(default)]
    pub aws: AwsState,
    /// GCP block.
    #[serde(default)]
    pub gcp: GcpState,
    /// Azure block.
    #[serde(default)]
    pub azure: AzureState,
    /// Director connection info.
    #[serde(default)]
    pub bosh: BoshState,
    /// Load balancer block.
    #[serde(default)]
    pub lb: LbState,
    /// Opaque Terraform state blob.
    #[serde(rename = "tfState", default)]
    pub tf_state: String,
}

const fn default_version() -> u32 {
    STATE_VERSION
}

impl EnvironmentState {
    /// Creates an empty state for the given provider.
    #[must_use]
    pub fn new(iaas: Iaas) -> Self {
        Self {
            version: STATE_VERSION,
            iaas,
            env_id: String::new(),
            aws: AwsState::default(),
            gcp: GcpState::default(),
            azure: AzureState::default(),
            bosh: BoshState::default(),
            lb: LbState::default(),
            tf_state: String::new(),
        }
    }

    /// Sets the environment identifier.
    #[must_use]
    pub fn with_env_id(mut self, env_id: impl Into<String>) -> Self {
        self.env_id = env_id.into();
        self
    }

    /// Sets the Terraform state blob.
    #[must_use]
    pub fn with_tf_state(mut self, tf_state: impl Into<String>) -> Self {
        self.tf_state = tf_state.into();
        self
    }

    /// Returns `true` when recording `candidate` would discard applied
    /// infrastructure state, i.e. an empty blob over a non-empty one.
    #[must_use]
    pub fn would_lose_tf_state(&self, candidate: &str) -> bool {
        candidate.is_empty() && !self.tf_state.is_empty()
    }
}
