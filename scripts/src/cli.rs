//! Definitions of CLI arguments and commands for the deploy scripts

use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use crate::{
    client::DeployerClient,
    commands::{deploy, renounce_minter},
    constants::{DEFAULT_ARTIFACTS_DIR, DEFAULT_DEPLOYMENTS_PATH},
    errors::ScriptError,
    networks::NetworkProfile,
};

/// Deploy and configure the perpetual protocol contracts
#[derive(Parser)]
pub struct Cli {
    /// Name of the target network profile
    #[arg(short, long)]
    pub network: String,

    /// Path to the deployments address book file
    #[arg(short, long, default_value = DEFAULT_DEPLOYMENTS_PATH)]
    pub deployments_path: String,

    /// Directory containing the compiled contract artifacts
    #[arg(short, long, default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts_dir: String,

    /// The command to run
    #[command(subcommand)]
    pub command: Command,
}

/// The deploy script subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Deploy the contract suite, then apply governance parameters and the
    /// minter grant
    Deploy(DeployArgs),
    /// Permanently renounce minter-role administration on the share token
    RenounceMinter(RenounceMinterArgs),
}

impl Command {
    /// Dispatch the parsed command
    pub async fn run(
        self,
        client: Arc<DeployerClient>,
        profile: &NetworkProfile,
        deployments_path: &str,
        artifacts_dir: &str,
    ) -> Result<(), ScriptError> {
        match self {
            Command::Deploy(args) => {
                deploy(args, client, profile, deployments_path, artifacts_dir).await
            }
            Command::RenounceMinter(args) => {
                renounce_minter(args, client, profile, deployments_path).await
            }
        }
    }
}

/// Arguments to the `deploy` command
#[derive(Args)]
pub struct DeployArgs {
    /// Skip deployment and only re-apply configuration to already-deployed
    /// artifacts
    #[arg(long)]
    pub config_only: bool,

    /// Override the price feed aggregator address wrapped by the price
    /// feeder, in hex
    #[arg(long)]
    pub price_feed: Option<String>,
}

/// Arguments to the `renounce-minter` command
#[derive(Args)]
pub struct RenounceMinterArgs {
    /// Acknowledge that renouncing permanently locks out future minter
    /// grants
    #[arg(long)]
    pub irreversible: bool,
}
