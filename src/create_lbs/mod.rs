//! Load balancer provisioning for GCP environments.
//!
//! The workflow runs in two phases. Phase one applies the Terraform template
//! and checkpoints the returned state blob before anything else can fail, so
//! a later failure never loses track of infrastructure that now exists.
//! Phase two reads the Terraform outputs and publishes a cloud config to the
//! BOSH director; it can be re-run on its own via
//! [`GcpCreateLbs::publish_cloud_config`].

use std::error::Error as StdError;

use thiserror::Error;
use tracing::{info, warn};

use crate::cloud_config::{
    BoxError, CloudConfigGenerator, CloudConfigInput, Marshal, marshal_yaml,
};
use crate::director::{DirectorClient, DirectorClientProvider};
use crate::lb::{LbRequest, LbType};
use crate::state::{EnvironmentState, Iaas};
use crate::state_store::StateStore;
use crate::terraform::{ApplyInput, InfraApplier, InfraOutputter, TemplateError, TemplateSelector};
use crate::zones::Zones;

/// Terraform output holding the environment's network.
pub const NETWORK_NAME_OUTPUT: &str = "network_name";
/// Terraform output holding the environment's subnetwork.
pub const SUBNETWORK_NAME_OUTPUT: &str = "subnetwork_name";
/// Terraform output holding the internal firewall tag.
pub const INTERNAL_TAG_NAME_OUTPUT: &str = "internal_tag_name";
/// Terraform output holding the Concourse target pool.
pub const CONCOURSE_TARGET_POOL_OUTPUT: &str = "concourse_target_pool";

/// Errors returned by [`GcpCreateLbs`].
///
/// Collaborator failures are carried boxed and display exactly as the
/// collaborator reported them.
#[derive(Debug, Error)]
pub enum CreateLbsError {
    /// The stored environment is not on GCP.
    #[error("iaas type must be gcp")]
    IaasMismatch,
    /// The requested LB type is not supported.
    #[error("\"{requested}\" is not a valid lb type, valid lb types are: {valid}")]
    InvalidLbType {
        /// Type named by the caller.
        requested: String,
        /// Comma-joined valid types.
        valid: String,
    },
    /// No template is bundled for the request.
    #[error(transparent)]
    Template(#[from] TemplateError),
    /// Terraform apply failed.
    #[error("{0}")]
    Apply(#[source] BoxError),
    /// The state checkpoint could not be written.
    #[error("{0}")]
    StateStore(#[source] BoxError),
    /// A Terraform output could not be read.
    #[error("{0}")]
    Output(#[source] BoxError),
    /// Zones could not be listed.
    #[error("{0}")]
    Zones(#[source] BoxError),
    /// The cloud config could not be generated.
    #[error("{0}")]
    Generate(#[source] BoxError),
    /// The cloud config could not be serialised.
    #[error("{0}")]
    Marshal(#[source] BoxError),
    /// The director rejected the cloud config.
    #[error("{0}")]
    Director(#[source] BoxError),
}

fn boxed<E: StdError + Send + Sync + 'static>(err: E) -> BoxError {
    Box::new(err)
}

/// Provisions a load balancer for a GCP environment and publishes the
/// resulting cloud config.
#[derive(Clone, Debug)]
pub struct GcpCreateLbs<A, O, Z, C, P, S> {
    applier: A,
    outputter: O,
    zones: Z,
    generator: C,
    director: P,
    store: S,
    marshal: Marshal,
    templates: TemplateSelector,
}

impl<A, O, Z, C, P, S> GcpCreateLbs<A, O, Z, C, P, S>
where
    A: InfraApplier,
    O: InfraOutputter,
    Z: Zones,
    C: CloudConfigGenerator,
    P: DirectorClientProvider,
    S: StateStore,
{
    /// Creates a workflow that renders cloud configs as YAML.
    #[must_use]
    pub fn new(applier: A, outputter: O, zones: Z, generator: C, director: P, store: S) -> Self {
        Self {
            applier,
            outputter,
            zones,
            generator,
            director,
            store,
            marshal: marshal_yaml,
            templates: TemplateSelector,
        }
    }

    /// Replaces the cloud config serialiser.
    #[must_use]
    pub fn with_marshal(mut self, marshal: Marshal) -> Self {
        self.marshal = marshal;
        self
    }

    /// Provisions the requested load balancer and publishes the cloud
    /// config, returning the checkpointed state.
    ///
    /// Input is validated before any collaborator is called.
    ///
    /// # Errors
    ///
    /// Returns [`CreateLbsError::IaasMismatch`] or
    /// [`CreateLbsError::InvalidLbType`] for invalid input, and the failing
    /// collaborator's error otherwise. A failure after the checkpoint leaves
    /// the new state blob persisted.
    pub async fn execute(
        &self,
        request: &LbRequest,
        state: EnvironmentState,
    ) -> Result<EnvironmentState, CreateLbsError> {
        if state.iaas != Iaas::Gcp {
            return Err(CreateLbsError::IaasMismatch);
        }
        let lb_type = LbType::parse_for(Iaas::Gcp, &request.lb_type).map_err(|invalid| {
            CreateLbsError::InvalidLbType {
                requested: invalid.requested,
                valid: invalid.valid,
            }
        })?;

        let state = self.apply_and_checkpoint(lb_type, state)?;
        self.publish_cloud_config(&state).await?;
        Ok(state)
    }

    fn apply_and_checkpoint(
        &self,
        lb_type: LbType,
        mut state: EnvironmentState,
    ) -> Result<EnvironmentState, CreateLbsError> {
        let template = self.templates.select(Iaas::Gcp, Some(lb_type))?;
        info!(env_id = %state.env_id, %lb_type, "applying load balancer template");
        let tf_state = self
            .applier
            .apply(&ApplyInput {
                credentials: &state.gcp.service_account_key,
                env_id: &state.env_id,
                project_id: &state.gcp.project_id,
                zone: &state.gcp.zone,
                region: &state.gcp.region,
                template: &template,
                prior_state: &state.tf_state,
            })
            .map_err(|err| CreateLbsError::Apply(boxed(err)))?;

        if state.would_lose_tf_state(&tf_state) {
            warn!(env_id = %state.env_id, "apply returned an empty state; keeping the previous checkpoint");
            return Ok(state);
        }

        state.tf_state = tf_state;
        lb_type.as_str().clone_into(&mut state.lb.lb_type);
        self.store
            .set(&state)
            .map_err(|err| CreateLbsError::StateStore(boxed(err)))?;
        info!(env_id = %state.env_id, "checkpointed terraform state");
        Ok(state)
    }

    /// Reads the Terraform outputs recorded in `state` and pushes the
    /// resulting cloud config to the director.
    ///
    /// Performs no apply and no state writes, so it can be retried after a
    /// failure in this phase.
    ///
    /// # Errors
    ///
    /// Returns the failing collaborator's error verbatim.
    pub async fn publish_cloud_config(
        &self,
        state: &EnvironmentState,
    ) -> Result<(), CreateLbsError> {
        let network_name = self.output(state, NETWORK_NAME_OUTPUT)?;
        let subnetwork_name = self.output(state, SUBNETWORK_NAME_OUTPUT)?;
        let internal_tag_name = self.output(state, INTERNAL_TAG_NAME_OUTPUT)?;
        let load_balancer = self.output(state, CONCOURSE_TARGET_POOL_OUTPUT)?;

        let azs = self
            .zones
            .get(&state.gcp.region)
            .map_err(|err| CreateLbsError::Zones(boxed(err)))?;
        let cloud_config = self
            .generator
            .generate(&CloudConfigInput {
                azs,
                tags: vec![internal_tag_name],
                network_name,
                subnetwork_name,
                load_balancer,
            })
            .map_err(|err| CreateLbsError::Generate(boxed(err)))?;
        let yaml = (self.marshal)(&cloud_config).map_err(CreateLbsError::Marshal)?;

        let client = self.director.client(
            &state.bosh.director_address,
            &state.bosh.director_username,
            &state.bosh.director_password,
        );
        client
            .update_cloud_config(&yaml)
            .await
            .map_err(|err| CreateLbsError::Director(boxed(err)))?;
        info!(env_id = %state.env_id, "published cloud config");
        Ok(())
    }

    fn output(&self, state: &EnvironmentState, name: &str) -> Result<String, CreateLbsError> {
        self.outputter
            .get(&state.tf_state, name)
            .map_err(|err| CreateLbsError::Output(boxed(err)))
    }
}
