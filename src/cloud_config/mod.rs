//! BOSH cloud configuration for GCP environments.
//!
//! The generator lays out one availability zone per GCP zone, one `/20`
//! subnet per zone carved from the environment's `10.0.0.0/16` subnetwork,
//! and an `lb` VM extension pointing at the load balancer target pool.

use std::error::Error as StdError;

use serde::Serialize;
use thiserror::Error;

/// Boxed error returned by marshal functions.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Serialises a cloud configuration for the director.
pub type Marshal = fn(&CloudConfig) -> Result<Vec<u8>, BoxError>;

const SUBNET_STRIDE: usize = 16;
const VM_EXTENSION_LB: &str = "lb";
const PRIVATE_NETWORK: &str = "private";
const DEFAULT_VM_TYPE: &str = "default";

/// Inputs gathered from applied infrastructure.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CloudConfigInput {
    /// Zone names, one availability zone each.
    pub azs: Vec<String>,
    /// Network tags applied to every VM.
    pub tags: Vec<String>,
    /// GCP network name.
    pub network_name: String,
    /// GCP subnetwork name.
    pub subnetwork_name: String,
    /// Target pool name; empty when no load balancer exists.
    pub load_balancer: String,
}

/// Errors raised while generating a cloud configuration.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum CloudConfigError {
    /// Raised when the region reported no zones.
    #[error("cannot generate cloud config without availability zones")]
    NoZones,
    /// Raised when more zones are supplied than subnets fit in `10.0.0.0/16`.
    #[error("cannot lay out {count} availability zones in 10.0.0.0/16")]
    TooManyZones {
        /// Number of zones supplied.
        count: usize,
    },
}

/// Builds a cloud configuration from infrastructure outputs.
pub trait CloudConfigGenerator {
    /// Error type returned by the generator.
    type Error: StdError + Send + Sync + 'static;

    /// Generates the cloud configuration for `input`.
    ///
    /// # Errors
    ///
    /// Returns the generator's error when the input cannot be laid out.
    fn generate(&self, input: &CloudConfigInput) -> Result<CloudConfig, Self::Error>;
}

/// A BOSH cloud configuration document.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CloudConfig {
    /// Availability zones.
    pub azs: Vec<Az>,
    /// VM sizes.
    pub vm_types: Vec<VmType>,
    /// Persistent disk sizes.
    pub disk_types: Vec<DiskType>,
    /// Networks.
    pub networks: Vec<Network>,
    /// VM extensions.
    pub vm_extensions: Vec<VmExtension>,
    /// Compilation worker settings.
    pub compilation: Compilation,
}

/// One availability zone.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Az {
    /// BOSH AZ name (`z1`, `z2`, ...).
    pub name: String,
    /// GCP placement.
    pub cloud_properties: ZoneProperties,
}

/// GCP placement of an availability zone.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ZoneProperties {
    /// GCP zone name.
    pub zone: String,
}

/// A named VM size.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct VmType {
    /// VM type name.
    pub name: String,
    /// GCP machine settings.
    pub cloud_properties: MachineProperties,
}

/// GCP machine settings.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct MachineProperties {
    /// GCP machine type.
    pub machine_type: String,
    /// Root disk size in GiB.
    pub root_disk_size_gb: u32,
    /// Root disk type.
    pub root_disk_type: String,
}

/// A named persistent disk size.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct DiskType {
    /// Disk type name.
    pub name: String,
    /// Size in MiB.
    pub disk_size: u32,
}

/// A BOSH network.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Network {
    /// Network name.
    pub name: String,
    /// `manual` or `vip`.
    #[serde(rename = "type")]
    pub network_type: String,
    /// Subnets for manual networks.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subnets: Vec<Subnet>,
}

/// One subnet of a manual network.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Subnet {
    /// CIDR range.
    pub range: String,
    /// Gateway address.
    pub gateway: String,
    /// AZ the subnet lives in.
    pub az: String,
    /// Reserved address ranges.
    pub reserved: Vec<String>,
    /// Static address ranges.
    #[serde(rename = "static")]
    pub static_ips: Vec<String>,
    /// GCP network placement.
    pub cloud_properties: SubnetProperties,
}

/// GCP network placement of a subnet.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct SubnetProperties {
    /// Whether VMs receive an ephemeral external IP.
    pub ephemeral_external_ip: bool,
    /// GCP network name.
    pub network_name: String,
    /// GCP subnetwork name.
    pub subnetwork_name: String,
    /// Network tags.
    pub tags: Vec<String>,
}

/// A named VM extension.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct VmExtension {
    /// Extension name.
    pub name: String,
    /// Extension properties.
    pub cloud_properties: ExtensionProperties,
}

/// Properties of a VM extension.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ExtensionProperties {
    /// Target pool that instances join.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_pool: Option<String>,
}

/// Compilation worker settings.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Compilation {
    /// Number of compilation workers.
    pub workers: u32,
    /// Network used by compilation VMs.
    pub network: String,
    /// AZ used by compilation VMs.
    pub az: String,
    /// Whether compilation VMs are reused.
    pub reuse_compilation_vms: bool,
    /// VM type used by compilation VMs.
    pub vm_type: String,
}

/// Generator for GCP environments.
#[derive(Clone, Copy, Debug, Default)]
pub struct GcpCloudConfigGenerator;

impl CloudConfigGenerator for GcpCloudConfigGenerator {
    type Error = CloudConfigError;

    fn generate(&self, input: &CloudConfigInput) -> Result<CloudConfig, Self::Error> {
        if input.azs.is_empty() {
            return Err(CloudConfigError::NoZones);
        }
        if SUBNET_STRIDE * (input.azs.len() + 1) > 256 {
            return Err(CloudConfigError::TooManyZones {
                count: input.azs.len(),
            });
        }

        let azs: Vec<Az> = input
            .azs
            .iter()
            .enumerate()
            .map(|(index, zone)| Az {
                name: az_name(index),
                cloud_properties: ZoneProperties { zone: zone.clone() },
            })
            .collect();
        let subnets = (0..input.azs.len())
            .map(|index| subnet(index, input))
            .collect();

        Ok(CloudConfig {
            azs,
            vm_types: vm_types(),
            disk_types: disk_types(),
            networks: vec![
                Network {
                    name: String::from(PRIVATE_NETWORK),
                    network_type: String::from("manual"),
                    subnets,
                },
                Network {
                    name: String::from("public"),
                    network_type: String::from("vip"),
                    subnets: Vec::new(),
                },
            ],
            vm_extensions: vec![VmExtension {
                name: String::from(VM_EXTENSION_LB),
                cloud_properties: ExtensionProperties {
                    target_pool: Some(input.load_balancer.clone())
                        .filter(|pool| !pool.is_empty()),
                },
            }],
            compilation: Compilation {
                workers: 5,
                network: String::from(PRIVATE_NETWORK),
                az: az_name(0),
                reuse_compilation_vms: true,
                vm_type: String::from(DEFAULT_VM_TYPE),
            },
        })
    }
}

fn az_name(index: usize) -> String {
    format!("z{}", index + 1)
}

fn subnet(index: usize, input: &CloudConfigInput) -> Subnet {
    let octet = SUBNET_STRIDE * (index + 1);
    Subnet {
        range: format!("10.0.{octet}.0/20"),
        gateway: format!("10.0.{octet}.1"),
        az: az_name(index),
        reserved: vec![format!("10.0.{octet}.2-10.0.{octet}.3")],
        static_ips: vec![format!("10.0.{}.190-10.0.{}.254", octet + 15, octet + 15)],
        cloud_properties: SubnetProperties {
            ephemeral_external_ip: true,
            network_name: input.network_name.clone(),
            subnetwork_name: input.subnetwork_name.clone(),
            tags: input.tags.clone(),
        },
    }
}

fn vm_types() -> Vec<VmType> {
    [
        ("minimal", "n1-standard-1", 10),
        (DEFAULT_VM_TYPE, "n1-standard-2", 20),
        ("large", "n1-standard-4", 50),
    ]
    .into_iter()
    .map(|(name, machine_type, root_disk_size_gb)| VmType {
        name: name.to_owned(),
        cloud_properties: MachineProperties {
            machine_type: machine_type.to_owned(),
            root_disk_size_gb,
            root_disk_type: String::from("pd-ssd"),
        },
    })
    .collect()
}

fn disk_types() -> Vec<DiskType> {
    [("default", 1024), ("large", 4096)]
        .into_iter()
        .map(|(name, disk_size)| DiskType {
            name: name.to_owned(),
            disk_size,
        })
        .collect()
}

/// Renders a cloud configuration as YAML.
///
/// # Errors
///
/// Returns the serialiser's error when the document cannot be rendered.
pub fn marshal_yaml(cloud_config: &CloudConfig) -> Result<Vec<u8>, BoxError> {
    let rendered = serde_yaml::to_string(cloud_config)?;
    Ok(rendered.into_bytes())
}

#[cfg(test)]
mod tests;
