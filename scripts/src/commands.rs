//! Implementations of the deploy script commands

use std::sync::Arc;

use ethers::types::Address;
use tracing::{info, warn};

use crate::{
    cli::{DeployArgs, RenounceMinterArgs},
    client::{ArtifactStore, DeployerClient, SignerClient},
    constants::{AMM, PERPETUAL, SHARE_TOKEN},
    deployments::{AddressBook, DeployedArtifact},
    errors::ScriptError,
    governance,
    networks::NetworkProfile,
    sequencer::run_steps,
    steps::protocol_steps,
};

/// Look up an artifact the configuration phase targets, failing if the
/// contract has not been deployed to this network
fn require_artifact<'a>(
    book: &'a AddressBook,
    name: &str,
    profile: &NetworkProfile,
) -> Result<&'a DeployedArtifact, ScriptError> {
    book.lookup(name, profile.name)
        .ok_or_else(|| ScriptError::ConfigurationFailed {
            key: name.to_string(),
            cause: String::from("not deployed on this network"),
        })
}

/// Print the per-run address summary
fn print_summary(artifacts: &[DeployedArtifact]) {
    println!("  Address summary --------------------------------------");
    for artifact in artifacts {
        println!("   > {:<18} {:#x}", artifact.name, artifact.address);
    }
    println!();
}

/// Deploy the contract suite and apply its post-deploy configuration.
///
/// With `--config-only`, deployment is skipped entirely and the governance
/// parameters and minter grant are re-applied to the artifacts already
/// recorded for this network.
pub async fn deploy(
    args: DeployArgs,
    client: Arc<DeployerClient>,
    profile: &NetworkProfile,
    deployments_path: &str,
    artifacts_dir: &str,
) -> Result<(), ScriptError> {
    let deployer_address: Address = client.address();
    let chain = SignerClient::new(client, profile);
    let mut book = AddressBook::open(deployments_path)?;

    if !args.config_only {
        let artifacts = ArtifactStore::new(artifacts_dir);
        let steps = protocol_steps(profile, deployer_address, args.price_feed.clone())?;
        let deployed = run_steps(&chain, profile, &mut book, &artifacts, &steps).await?;
        print_summary(&deployed);
    }

    let perpetual = require_artifact(&book, PERPETUAL, profile)?.address;
    let parameters = governance::default_parameters()?;
    governance::apply_governance(&chain, profile, perpetual, &parameters).await?;

    let share_token = require_artifact(&book, SHARE_TOKEN, profile)?.address;
    let amm = require_artifact(&book, AMM, profile)?.address;
    governance::grant_minter(&chain, profile, &book, share_token, amm).await?;

    info!("deployment of `{}` complete", profile.name);
    Ok(())
}

/// Permanently renounce minter-role administration on the share token.
///
/// Requires the explicit `--irreversible` acknowledgement; this action can
/// never be undone and is deliberately not part of `deploy`.
pub async fn renounce_minter(
    args: RenounceMinterArgs,
    client: Arc<DeployerClient>,
    profile: &NetworkProfile,
    deployments_path: &str,
) -> Result<(), ScriptError> {
    if !args.irreversible {
        return Err(ScriptError::ConfigurationFailed {
            key: String::from("renounceMinter"),
            cause: String::from(
                "refusing to run without --irreversible: this permanently locks out future minter grants",
            ),
        });
    }

    warn!(
        "renouncing minter-role administration on `{}` - THIS CANNOT BE UNDONE",
        profile.name
    );
    let chain = SignerClient::new(client, profile);
    let mut book = AddressBook::open(deployments_path)?;
    let share_token = require_artifact(&book, SHARE_TOKEN, profile)?.address;

    let tx = governance::renounce_minter(&chain, profile, &mut book, share_token).await?;
    info!("minter-role administration renounced (tx {:#x})", tx);
    Ok(())
}
