//! Environment teardown guarded by the safety gate.

use thiserror::Error;
use tracing::{info, warn};

use crate::cloud_config::BoxError;
use crate::inventory::InventoryGateway;
use crate::lb::LbType;
use crate::safety::SafetyGate;
use crate::state::EnvironmentState;
use crate::state_store::StateStore;
use crate::terraform::{ApplyInput, InfraApplier, InfraOutputter, TemplateError, TemplateSelector};

/// Errors returned by [`DestroyOrchestrator`].
#[derive(Debug, Error)]
pub enum DestroyError {
    /// The environment's network could not be read from Terraform.
    #[error("{0}")]
    Output(#[source] BoxError),
    /// The safety gate refused or could not decide.
    #[error("{0}")]
    Safety(#[source] BoxError),
    /// No template is bundled for the environment.
    #[error(transparent)]
    Template(#[from] TemplateError),
    /// Terraform destroy failed.
    #[error("{0}")]
    Destroy(#[source] BoxError),
    /// The post-destroy checkpoint could not be written.
    #[error("{0}")]
    StateStore(#[source] BoxError),
}

/// Runs the safety gate, destroys infrastructure, then checkpoints.
#[derive(Clone, Debug)]
pub struct DestroyOrchestrator<G, A, O, S> {
    gate: SafetyGate<G>,
    applier: A,
    outputter: O,
    store: S,
    templates: TemplateSelector,
}

impl<G, A, O, S> DestroyOrchestrator<G, A, O, S>
where
    G: InventoryGateway,
    A: InfraApplier,
    O: InfraOutputter,
    S: StateStore,
{
    /// Creates an orchestrator from its collaborators.
    #[must_use]
    pub const fn new(gate: SafetyGate<G>, applier: A, outputter: O, store: S) -> Self {
        Self {
            gate,
            applier,
            outputter,
            store,
            templates: TemplateSelector,
        }
    }

    /// Tears down the environment's infrastructure.
    ///
    /// Nothing is destroyed unless the safety gate passes. An environment
    /// without Terraform state is returned unchanged once the gate passes.
    ///
    /// # Errors
    ///
    /// Returns [`DestroyError::Safety`] when VMs other than the director and
    /// jumpbox remain, and the failing collaborator's error otherwise.
    pub fn execute(&self, mut state: EnvironmentState) -> Result<EnvironmentState, DestroyError> {
        self.validate(&state)?;

        if state.tf_state.is_empty() {
            info!(env_id = %state.env_id, "no terraform state; nothing to destroy");
            return Ok(state);
        }

        let lb_type = LbType::parse_for(state.iaas, &state.lb.lb_type).ok();
        let template = self.templates.select(state.iaas, lb_type)?;
        info!(env_id = %state.env_id, iaas = %state.iaas, "destroying infrastructure");
        let tf_state = self
            .applier
            .destroy(&ApplyInput {
                credentials: &state.gcp.service_account_key,
                env_id: &state.env_id,
                project_id: &state.gcp.project_id,
                zone: &state.gcp.zone,
                region: &state.gcp.region,
                template: &template,
                prior_state: &state.tf_state,
            })
            .map_err(|err| DestroyError::Destroy(Box::new(err)))?;

        if state.would_lose_tf_state(&tf_state) {
            warn!(env_id = %state.env_id, "destroy returned an empty state; keeping the previous checkpoint");
            return Ok(state);
        }

        state.tf_state = tf_state;
        state.lb.lb_type.clear();
        self.store
            .set(&state)
            .map_err(|err| DestroyError::StateStore(Box::new(err)))?;
        info!(env_id = %state.env_id, "environment destroyed");
        Ok(state)
    }

    /// Runs the safety gate against the environment's network without
    /// touching any infrastructure.
    ///
    /// # Errors
    ///
    /// Returns [`DestroyError::Output`] when the network name cannot be read
    /// and [`DestroyError::Safety`] when the gate refuses or cannot decide.
    pub fn validate(&self, state: &EnvironmentState) -> Result<(), DestroyError> {
        let network_name = self.network_name(state)?;
        self.gate
            .validate_safe_to_delete(&network_name, &state.env_id)
            .map_err(|err| DestroyError::Safety(Box::new(err)))
    }

    fn network_name(&self, state: &EnvironmentState) -> Result<String, DestroyError> {
        if state.tf_state.is_empty() {
            return Ok(String::new());
        }
        self.outputter
            .get(&state.tf_state, state.iaas.network_output())
            .map_err(|err| DestroyError::Output(Box::new(err)))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::inventory::{InventoryRecord, NetworkRecord};
    use crate::state::Iaas;
    use rstest::{fixture, rstest};

    #[derive(Clone, Debug, Error)]
    #[error("{0}")]
    struct FakeError(String);

    #[derive(Debug, Default)]
    struct Recorder {
        calls: RefCell<Vec<String>>,
        listings: RefCell<Vec<(String, String)>>,
        saved: RefCell<Vec<EnvironmentState>>,
    }

    impl Recorder {
        fn push(&self, call: impl Into<String>) {
            self.calls.borrow_mut().push(call.into());
        }
    }

    struct Gateway<'a> {
        recorder: &'a Recorder,
        instances: Vec<InventoryRecord>,
    }

    impl InventoryGateway for Gateway<'_> {
        type Error = FakeError;

        fn network_suffix(&self) -> &'static str {
            "-network"
        }

        fn list_instances(
            &self,
            scope: &str,
            network_name: &str,
        ) -> Result<Vec<InventoryRecord>, Self::Error> {
            self.recorder.push("list_instances");
            self.recorder
                .listings
                .borrow_mut()
                .push((scope.to_owned(), network_name.to_owned()));
            Ok(self.instances.clone())
        }

        fn list_networks(&self) -> Result<Vec<NetworkRecord>, Self::Error> {
            Ok(Vec::new())
        }
    }

    struct Applier<'a> {
        recorder: &'a Recorder,
        result: Result<String, FakeError>,
    }

    impl InfraApplier for Applier<'_> {
        type Error = FakeError;

        fn apply(&self, _input: &ApplyInput<'_>) -> Result<String, Self::Error> {
            self.recorder.push("apply");
            self.result.clone()
        }

        fn destroy(&self, input: &ApplyInput<'_>) -> Result<String, Self::Error> {
            self.recorder.push(format!("destroy:{}", input.prior_state));
            self.result.clone()
        }
    }

    struct Outputter<'a> {
        recorder: &'a Recorder,
    }

    impl InfraOutputter for Outputter<'_> {
        type Error = FakeError;

        fn get(&self, _tf_state: &str, name: &str) -> Result<String, Self::Error> {
            self.recorder.push(format!("output:{name}"));
            Ok(String::from("some-env-id-network"))
        }
    }

    struct Store<'a> {
        recorder: &'a Recorder,
    }

    impl StateStore for Store<'_> {
        type Error = FakeError;

        fn set(&self, state: &EnvironmentState) -> Result<(), Self::Error> {
            self.recorder.push("store");
            self.recorder.saved.borrow_mut().push(state.clone());
            Ok(())
        }
    }

    fn orchestrator<'a>(
        recorder: &'a Recorder,
        instances: Vec<InventoryRecord>,
        result: Result<String, FakeError>,
    ) -> DestroyOrchestrator<Gateway<'a>, Applier<'a>, Outputter<'a>, Store<'a>> {
        DestroyOrchestrator::new(
            SafetyGate::new(Gateway {
                recorder,
                instances,
            }),
            Applier { recorder, result },
            Outputter { recorder },
            Store { recorder },
        )
    }

    #[fixture]
    fn gcp_state() -> EnvironmentState {
        let mut state = EnvironmentState::new(Iaas::Gcp)
            .with_env_id("some-env-id")
            .with_tf_state("some-tf-state");
        state.lb.lb_type = String::from("concourse");
        state
    }

    #[rstest]
    fn refuses_when_workloads_remain(gcp_state: EnvironmentState) {
        let recorder = Recorder::default();
        let instances = vec![InventoryRecord::named("web/0").tag("deployment", "cf")];

        let err = orchestrator(&recorder, instances, Ok(String::from("unused")))
            .execute(gcp_state)
            .expect_err("unsafe");

        assert_eq!(
            err.to_string(),
            "bbl environment is not safe to delete; vms still exist in resource group: \
             some-env-id-bosh (deployment: cf): web/0"
        );
        assert_eq!(
            recorder.calls.borrow().as_slice(),
            ["output:network_name", "list_instances"]
        );
        assert_eq!(
            recorder.listings.borrow().as_slice(),
            [(
                String::from("some-env-id-bosh"),
                String::from("some-env-id-network")
            )]
        );
        assert!(recorder.saved.borrow().is_empty());
    }

    #[rstest]
    fn destroys_and_checkpoints_when_safe(gcp_state: EnvironmentState) {
        let recorder = Recorder::default();
        let instances = vec![
            InventoryRecord::named("bosh/0").tag("job", "bosh"),
            InventoryRecord::named("jumpbox/0").tag("job", "jumpbox"),
        ];

        let state = orchestrator(&recorder, instances, Ok(String::from("some-destroyed-state")))
            .execute(gcp_state)
            .expect("destroy");

        assert_eq!(state.tf_state, "some-destroyed-state");
        assert!(state.lb.lb_type.is_empty());
        assert_eq!(
            recorder.calls.borrow().as_slice(),
            [
                "output:network_name",
                "list_instances",
                "destroy:some-tf-state",
                "store"
            ]
        );
        assert_eq!(recorder.saved.borrow().as_slice(), [state]);
    }

    #[rstest]
    fn without_tf_state_only_the_gate_runs() {
        let recorder = Recorder::default();
        let state = EnvironmentState::new(Iaas::Gcp).with_env_id("some-env-id");

        let returned = orchestrator(&recorder, Vec::new(), Ok(String::new()))
            .execute(state.clone())
            .expect("nothing to destroy");

        assert_eq!(returned, state);
        assert_eq!(recorder.calls.borrow().as_slice(), ["list_instances"]);
        assert_eq!(
            recorder.listings.borrow().as_slice(),
            [(String::from("some-env-id-bosh"), String::new())]
        );
    }

    #[rstest]
    fn destroy_failure_is_returned_verbatim(gcp_state: EnvironmentState) {
        let recorder = Recorder::default();

        let err = orchestrator(
            &recorder,
            Vec::new(),
            Err(FakeError(String::from("failed to destroy"))),
        )
        .execute(gcp_state)
        .expect_err("destroy failure");

        assert_eq!(err.to_string(), "failed to destroy");
        assert!(recorder.saved.borrow().is_empty());
    }

    #[rstest]
    fn empty_destroy_result_is_not_checkpointed(gcp_state: EnvironmentState) {
        let recorder = Recorder::default();

        let state = orchestrator(&recorder, Vec::new(), Ok(String::new()))
            .execute(gcp_state)
            .expect("destroy");

        assert_eq!(state.tf_state, "some-tf-state");
        assert!(recorder.saved.borrow().is_empty());
    }
}
