//! Command-line interface definitions for the `bbl` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `bbl` binary.
#[derive(Debug, Parser)]
#[command(
    name = "bbl",
    about = "Bootstrap and tear down BOSH director environments",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Provision a load balancer and publish the cloud config.
    #[command(
        name = "create-lbs",
        about = "Provision a load balancer and publish the cloud config"
    )]
    CreateLbs(CreateLbsCommand),
    /// Report whether an environment's network already exists.
    #[command(
        name = "check-exists",
        about = "Report whether an environment's network already exists"
    )]
    CheckExists(CheckExistsCommand),
    /// Check that only the director and jumpbox VMs remain.
    #[command(
        name = "validate-delete",
        about = "Check that only the director and jumpbox VMs remain"
    )]
    ValidateDelete,
    /// Destroy the environment's infrastructure once it is safe to do so.
    #[command(
        name = "destroy",
        about = "Destroy the environment's infrastructure once it is safe to do so"
    )]
    Destroy,
}

/// Arguments for the `bbl create-lbs` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct CreateLbsCommand {
    /// Load balancer type to provision (for example `concourse`).
    #[arg(long = "type", value_name = "TYPE")]
    pub(crate) lb_type: String,
}

/// Arguments for the `bbl check-exists` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct CheckExistsCommand {
    /// Environment name whose network should be looked up.
    #[arg(long, value_name = "NAME")]
    pub(crate) name: String,
}
