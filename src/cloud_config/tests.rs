//! Unit tests for GCP cloud config generation.

use super::*;
use rstest::{fixture, rstest};

#[fixture]
fn input() -> CloudConfigInput {
    CloudConfigInput {
        azs: vec![String::from("us-east1-b"), String::from("us-east1-c")],
        tags: vec![String::from("some-internal-tag")],
        network_name: String::from("some-network-name"),
        subnetwork_name: String::from("some-subnetwork-name"),
        load_balancer: String::from("env-id-concourse-target-pool"),
    }
}

#[rstest]
fn one_az_and_subnet_per_zone(input: CloudConfigInput) {
    let config = GcpCloudConfigGenerator.generate(&input).expect("generate");

    let az_names: Vec<_> = config.azs.iter().map(|az| az.name.as_str()).collect();
    assert_eq!(az_names, vec!["z1", "z2"]);
    assert_eq!(config.azs[1].cloud_properties.zone, "us-east1-c");

    let private = &config.networks[0];
    assert_eq!(private.name, "private");
    let ranges: Vec<_> = private.subnets.iter().map(|s| s.range.as_str()).collect();
    assert_eq!(ranges, vec!["10.0.16.0/20", "10.0.32.0/20"]);
    let first = &private.subnets[0];
    assert_eq!(first.gateway, "10.0.16.1");
    assert_eq!(first.static_ips, vec!["10.0.31.190-10.0.31.254"]);
    assert_eq!(first.cloud_properties.network_name, "some-network-name");
    assert_eq!(first.cloud_properties.subnetwork_name, "some-subnetwork-name");
    assert_eq!(first.cloud_properties.tags, vec!["some-internal-tag"]);
}

#[rstest]
fn lb_extension_targets_pool(input: CloudConfigInput) {
    let config = GcpCloudConfigGenerator.generate(&input).expect("generate");

    assert_eq!(
        config.vm_extensions,
        vec![VmExtension {
            name: String::from("lb"),
            cloud_properties: ExtensionProperties {
                target_pool: Some(String::from("env-id-concourse-target-pool")),
            },
        }]
    );
}

#[rstest]
fn lb_extension_is_empty_without_pool(input: CloudConfigInput) {
    let config = GcpCloudConfigGenerator
        .generate(&CloudConfigInput {
            load_balancer: String::new(),
            ..input
        })
        .expect("generate");

    assert_eq!(config.vm_extensions[0].cloud_properties, ExtensionProperties::default());
}

#[rstest]
#[case(0, CloudConfigError::NoZones)]
#[case(16, CloudConfigError::TooManyZones { count: 16 })]
fn zone_counts_are_bounded(
    input: CloudConfigInput,
    #[case] count: usize,
    #[case] expected: CloudConfigError,
) {
    let azs = (0..count).map(|i| format!("zone-{i}")).collect();

    let err = GcpCloudConfigGenerator
        .generate(&CloudConfigInput { azs, ..input })
        .expect_err("invalid zones");

    assert_eq!(err, expected);
}

#[rstest]
fn marshal_yaml_renders_bosh_keys(input: CloudConfigInput) {
    let config = GcpCloudConfigGenerator.generate(&input).expect("generate");

    let yaml = String::from_utf8(marshal_yaml(&config).expect("marshal")).expect("utf8");

    assert!(yaml.contains("azs:"));
    assert!(yaml.contains("type: manual"));
    assert!(yaml.contains("static:"));
    assert!(yaml.contains("target_pool: env-id-concourse-target-pool"));
    let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).expect("valid yaml");
    assert_eq!(
        parsed["compilation"]["az"],
        serde_yaml::Value::String(String::from("z1"))
    );
}
