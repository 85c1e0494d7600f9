//! AWS inventory via the `aws` CLI.

use std::collections::BTreeMap;
use std::ffi::OsString;

use serde::Deserialize;
use tracing::debug;

use super::{InventoryGateway, InventoryRecord, NetworkRecord, network_or_scope};
use crate::command::{CommandError, CommandRunner, run_json};

/// Default AWS CLI binary name.
pub const DEFAULT_AWS_BIN: &str = "aws";

const NAME_TAG: &str = "Name";

/// Lists VPCs and EC2 instances by shelling out to `aws ec2`.
///
/// Instances are reported by instance id; VPCs by their `Name` tag.
#[derive(Clone, Debug)]
pub struct AwsGateway<R: CommandRunner> {
    aws_bin: String,
    region: String,
    runner: R,
}

impl<R: CommandRunner> AwsGateway<R> {
    /// Creates a gateway for `region` using the provided runner.
    #[must_use]
    pub fn new(aws_bin: impl Into<String>, region: impl Into<String>, runner: R) -> Self {
        Self {
            aws_bin: aws_bin.into(),
            region: region.into(),
            runner,
        }
    }

    fn build_args(&self, operation: &str, filters: Option<String>) -> Vec<OsString> {
        let mut args = vec![
            OsString::from("ec2"),
            OsString::from(operation),
            OsString::from("--region"),
            OsString::from(&self.region),
        ];
        if let Some(filter) = filters {
            args.push(OsString::from("--filters"));
            args.push(OsString::from(filter));
        }
        args.push(OsString::from("--output"));
        args.push(OsString::from("json"));
        args
    }
}

impl<R: CommandRunner> InventoryGateway for AwsGateway<R> {
    type Error = CommandError;

    fn network_suffix(&self) -> &'static str {
        "-vpc"
    }

    fn list_instances(
        &self,
        scope: &str,
        network_name: &str,
    ) -> Result<Vec<InventoryRecord>, Self::Error> {
        let vpc_id = network_or_scope(network_name, scope);
        debug!(scope, vpc_id, "listing aws instances");
        let args = self.build_args(
            "describe-instances",
            Some(format!("Name=vpc-id,Values={vpc_id}")),
        );
        let response: DescribeInstances = run_json(&self.runner, &self.aws_bin, &args, "instances")?;
        Ok(response
            .reservations
            .into_iter()
            .flat_map(|reservation| reservation.instances)
            .map(|instance| InventoryRecord {
                name: instance.instance_id,
                tags: tags_from_pairs(instance.tags),
            })
            .collect())
    }

    fn list_networks(&self) -> Result<Vec<NetworkRecord>, Self::Error> {
        let args = self.build_args("describe-vpcs", None);
        let response: DescribeVpcs = run_json(&self.runner, &self.aws_bin, &args, "vpcs")?;
        Ok(response
            .vpcs
            .into_iter()
            .map(|vpc| NetworkRecord {
                name: vpc
                    .tags
                    .into_iter()
                    .find(|tag| tag.key == NAME_TAG)
                    .map(|tag| tag.value),
            })
            .collect())
    }
}

fn tags_from_pairs(tags: Vec<AwsTag>) -> BTreeMap<String, String> {
    tags.into_iter().map(|tag| (tag.key, tag.value)).collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeInstances {
    #[serde(default)]
    reservations: Vec<Reservation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Reservation {
    #[serde(default)]
    instances: Vec<AwsInstance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AwsInstance {
    #[serde(default)]
    instance_id: Option<String>,
    #[serde(default)]
    tags: Vec<AwsTag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeVpcs {
    #[serde(default)]
    vpcs: Vec<AwsVpc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AwsVpc {
    #[serde(default)]
    tags: Vec<AwsTag>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AwsTag {
    key: String,
    #[serde(default)]
    value: String,
}
