//! Infrastructure-as-code contracts and the Terraform implementation.
//!
//! Workflows see Terraform through two narrow traits: [`InfraApplier`] turns
//! a template plus the prior state blob into a new blob, and
//! [`InfraOutputter`] reads named outputs back out of a blob. The blob itself
//! is opaque to everything but Terraform.

mod executor;
mod templates;

pub use executor::{DEFAULT_TERRAFORM_BIN, TerraformError, TerraformExecutor};
pub use templates::{
    GCP_BASE_TEMPLATE, GCP_CONCOURSE_LB_TEMPLATE, TemplateError, TemplateSelector,
};

/// Inputs for one apply or destroy run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ApplyInput<'a> {
    /// Provider credentials (for GCP, the service account key JSON).
    pub credentials: &'a str,
    /// Environment identifier, exposed to templates as `env_id`.
    pub env_id: &'a str,
    /// Provider project identifier.
    pub project_id: &'a str,
    /// Availability zone.
    pub zone: &'a str,
    /// Region.
    pub region: &'a str,
    /// Template body.
    pub template: &'a str,
    /// State blob from the previous run; empty on first apply.
    pub prior_state: &'a str,
}

/// Applies and destroys infrastructure templates.
pub trait InfraApplier {
    /// Error type returned by the applier.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Applies `input.template` on top of `input.prior_state` and returns the
    /// new state blob.
    ///
    /// # Errors
    ///
    /// Returns the applier's error when the run fails.
    fn apply(&self, input: &ApplyInput<'_>) -> Result<String, Self::Error>;

    /// Destroys everything tracked by `input.prior_state` and returns the
    /// resulting state blob.
    ///
    /// # Errors
    ///
    /// Returns the applier's error when the run fails.
    fn destroy(&self, input: &ApplyInput<'_>) -> Result<String, Self::Error>;
}

/// Reads named outputs from applied infrastructure.
pub trait InfraOutputter {
    /// Error type returned by the outputter.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the value of output `name` recorded in `tf_state`.
    ///
    /// # Errors
    ///
    /// Returns the outputter's error when the output cannot be read.
    fn get(&self, tf_state: &str, name: &str) -> Result<String, Self::Error>;
}
