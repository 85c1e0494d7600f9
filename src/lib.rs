//! Core library for `bbl`, the BOSH bootloader.
//!
//! The crate orchestrates an environment's lifecycle across three external
//! systems: Terraform for infrastructure, the provider CLIs for inventory,
//! and the BOSH director for cloud configuration. Two workflows are exposed:
//! load balancer provisioning on GCP ([`GcpCreateLbs`]) and guarded teardown
//! ([`DestroyOrchestrator`]), both built on the [`SafetyGate`] and the
//! persisted [`EnvironmentState`].

pub mod cloud_config;
pub mod command;
pub mod config;
pub mod create_lbs;
pub mod destroy;
pub mod director;
pub mod inventory;
pub mod lb;
pub mod safety;
pub mod state;
pub mod state_store;
pub mod terraform;
pub mod test_support;
pub mod zones;

pub use cloud_config::{
    CloudConfig, CloudConfigGenerator, CloudConfigInput, GcpCloudConfigGenerator, marshal_yaml,
};
pub use command::{CommandError, CommandOutput, CommandRunner, ProcessCommandRunner};
pub use config::{BblConfig, ConfigError};
pub use create_lbs::{CreateLbsError, GcpCreateLbs};
pub use destroy::{DestroyError, DestroyOrchestrator};
pub use director::{BoshClientProvider, DirectorClient, DirectorClientProvider};
pub use inventory::{InventoryGateway, InventoryRecord, NetworkRecord, ProviderGateway};
pub use lb::{LbRequest, LbType};
pub use safety::{SafetyError, SafetyGate};
pub use state::{EnvironmentState, Iaas};
pub use state_store::{FileStateStore, StateStore, StateStoreError};
pub use terraform::{InfraApplier, InfraOutputter, TerraformExecutor};
pub use zones::{GcpZones, Zones};
