//! Entrypoint for the deploy scripts

use clap::Parser;
use deploy_scripts::{cli::Cli, client::setup_client, errors::ScriptError, networks};

#[tokio::main]
async fn main() -> Result<(), ScriptError> {
    let Cli {
        network,
        deployments_path,
        artifacts_dir,
        command,
    } = Cli::parse();

    tracing_subscriber::fmt().pretty().init();

    let profile = networks::resolve(&network)?;
    let client = setup_client(&profile).await?;

    command
        .run(client, &profile, &deployments_path, &artifacts_dir)
        .await
}
