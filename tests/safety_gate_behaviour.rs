//! Behavioural scenarios for the safety gate and guarded teardown.
//!
//! Provider CLIs are replaced by scripted output so the gate sees the same
//! JSON the real `gcloud` and `az` binaries return.

use bbl::inventory::{AzureGateway, GcpGateway, ProviderBins, ProviderGateway};
use bbl::test_support::{ScriptedRunner, json_gcp_instances, json_gcp_networks};
use bbl::{
    DestroyError, DestroyOrchestrator, EnvironmentState, FileStateStore, Iaas, SafetyError,
    SafetyGate, TerraformExecutor,
};
use rstest::{fixture, rstest};
use tempfile::TempDir;

const BINS: ProviderBins<'static> = ProviderBins {
    aws: "aws",
    gcloud: "gcloud",
    az: "az",
};

#[fixture]
fn gcp_state() -> EnvironmentState {
    let mut state = EnvironmentState::new(Iaas::Gcp)
        .with_env_id("some-env-id")
        .with_tf_state(r#"{"version": 3}"#);
    state.gcp.project_id = String::from("some-project-id");
    state.lb.lb_type = String::from("concourse");
    state
}

#[rstest]
fn azure_reports_deployment_of_offending_vm() {
    let runner = ScriptedRunner::new();
    runner.push_output(
        Some(0),
        r#"[
            {"name": "bosh/0", "tags": {"job": "bosh"}},
            {"name": "jumpbox/0", "tags": {"job": "jumpbox"}},
            {"name": "some-vm", "tags": {"deployment": "some-deployment"}}
        ]"#,
        "",
    );
    let gate = SafetyGate::new(AzureGateway::new("az", runner.clone()));

    let err = gate
        .validate_safe_to_delete("", "some-env-id")
        .expect_err("unsafe");

    assert_eq!(
        err.to_string(),
        "bbl environment is not safe to delete; vms still exist in resource group: \
         some-env-id-bosh (deployment: some-deployment): some-vm"
    );
    assert_eq!(
        runner.invocations()[0].command_string(),
        "az vm list --resource-group some-env-id-bosh --output json"
    );
}

#[rstest]
fn azure_cli_failure_is_wrapped() {
    let runner = ScriptedRunner::new();
    runner.push_output(Some(1), "", "Please run 'az login' to setup account.");
    let gate = SafetyGate::new(AzureGateway::new("az", runner));

    let err = gate.check_exists("some-env-id").expect_err("listing failure");

    assert!(matches!(err, SafetyError::ListNetworks(_)));
    assert_eq!(
        err.to_string(),
        "List networks: az exited with status 1: Please run 'az login' to setup account."
    );
}

#[rstest]
#[case(&["some-env-id-network"], true)]
#[case(&["some-env-id-net", "default"], false)]
#[case(&[], false)]
fn gcp_check_exists_matches_network_name(#[case] networks: &[&str], #[case] expected: bool) {
    let runner = ScriptedRunner::new();
    runner.push_output(Some(0), json_gcp_networks(networks), "");
    let gate = SafetyGate::new(GcpGateway::new("gcloud", "some-project-id", runner));

    assert_eq!(gate.check_exists("some-env-id").expect("check"), expected);
}

#[rstest]
fn destroy_refuses_while_workloads_remain(gcp_state: EnvironmentState) {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let store = FileStateStore::new(
        camino::Utf8PathBuf::from_path_buf(tmp.path().to_path_buf())
            .unwrap_or_else(|path| panic!("non-utf8 tempdir: {}", path.display())),
    );
    let director_labels: &[(&str, &str)] = &[("job", "bosh")];
    let web_labels: &[(&str, &str)] = &[("job", "web"), ("deployment", "cf")];
    let gcloud = ScriptedRunner::new();
    gcloud.push_output(
        Some(0),
        json_gcp_instances(&[("some-env-id-bosh", director_labels), ("web-0", web_labels)]),
        "",
    );
    let terraform = ScriptedRunner::new();
    terraform.push_output(Some(0), "\"some-env-id-network\"", "");
    let executor = TerraformExecutor::new("terraform", terraform.clone());
    let orchestrator = DestroyOrchestrator::new(
        SafetyGate::new(ProviderGateway::for_state(&gcp_state, BINS, gcloud.clone())),
        executor.clone(),
        executor,
        &store,
    );

    let err = orchestrator.execute(gcp_state).expect_err("unsafe");

    assert!(matches!(err, DestroyError::Safety(_)));
    assert_eq!(
        err.to_string(),
        "bbl environment is not safe to delete; vms still exist in resource group: \
         some-env-id-bosh (deployment: cf): web-0"
    );
    assert_eq!(terraform.invocations().len(), 1);
    assert_eq!(
        gcloud.invocations()[0].command_string(),
        "gcloud compute instances list --project=some-project-id \
         --filter=networkInterfaces.network:some-env-id-network --format=json"
    );
    assert_eq!(store.get().expect("read state"), None);
}

#[rstest]
fn destroy_runs_terraform_once_gate_passes(gcp_state: EnvironmentState) {
    let tmp = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
    let store = FileStateStore::new(
        camino::Utf8PathBuf::from_path_buf(tmp.path().to_path_buf())
            .unwrap_or_else(|path| panic!("non-utf8 tempdir: {}", path.display())),
    );
    let gcloud = ScriptedRunner::new();
    gcloud.push_output(
        Some(0),
        json_gcp_instances(&[("some-env-id-bosh", &[("job", "bosh")])]),
        "",
    );
    let terraform = ScriptedRunner::new();
    terraform.push_output(Some(0), "\"some-env-id-network\"", "");
    terraform.push_success();
    terraform.push_success();
    let executor = TerraformExecutor::new("terraform", terraform.clone());
    let orchestrator = DestroyOrchestrator::new(
        SafetyGate::new(ProviderGateway::for_state(&gcp_state, BINS, gcloud)),
        executor.clone(),
        executor,
        &store,
    );

    let state = orchestrator.execute(gcp_state).expect("destroy");

    let subcommands: Vec<String> = terraform
        .invocations()
        .iter()
        .filter_map(|call| call.args.get(1))
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    assert_eq!(subcommands, vec!["output", "init", "destroy"]);
    assert!(state.lb.lb_type.is_empty());
    assert_eq!(store.get().expect("read state"), Some(state));
}
