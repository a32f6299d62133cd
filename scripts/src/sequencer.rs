//! The deployment step sequencer: executes a declared, ordered list of
//! deployment steps against one network, idempotently and resumably.
//!
//! Steps run strictly sequentially. Before each step the address book is
//! consulted: an already-recorded artifact is skipped and its address fed
//! into the in-memory resolved map, so re-running a partially failed
//! sequence fast-forwards to the first unfinished step.

use std::collections::BTreeMap;

use chrono::Utc;
use ethers::{
    abi::Token,
    types::{Address, U256},
};
use tracing::{error, info};

use crate::{
    client::{ArtifactStore, ChainClient},
    deployments::{AddressBook, DeployedArtifact},
    errors::ScriptError,
    networks::NetworkProfile,
};

/// The addresses resolved so far in a run, as visible to one step's
/// argument-resolution function
pub struct ResolvedAddresses<'a> {
    /// The step whose arguments are being resolved
    step: &'a str,
    /// Addresses of every earlier step, keyed by step name
    addresses: &'a BTreeMap<String, Address>,
}

impl ResolvedAddresses<'_> {
    /// The recorded address of an earlier step.
    ///
    /// Fails with [`ScriptError::UnresolvedDependency`] if the named step
    /// has not yet deployed, which is a step-graph configuration bug.
    pub fn address(&self, dependency: &str) -> Result<Address, ScriptError> {
        self.addresses
            .get(dependency)
            .copied()
            .ok_or_else(|| ScriptError::UnresolvedDependency {
                step: self.step.to_string(),
                dependency: dependency.to_string(),
            })
    }
}

/// A function computing a step's constructor arguments from previously
/// resolved addresses
pub type ArgResolver =
    Box<dyn Fn(&ResolvedAddresses<'_>) -> Result<Vec<Token>, ScriptError> + Send + Sync>;

/// One named deployment step in a run.
///
/// Dependencies must name steps that appear earlier in the declared order;
/// forward references and cycles are configuration errors surfaced as
/// [`ScriptError::UnresolvedDependency`], never resolved by the sequencer.
pub struct DeploymentStep {
    /// The step name, unique within a run; doubles as the logical contract
    /// name in the address book
    pub name: &'static str,
    /// The artifact (contract) to deploy
    pub contract: &'static str,
    /// Names of earlier steps whose addresses this step's arguments need
    pub deps: Vec<&'static str>,
    /// A per-step gas limit, overriding the profile's default
    pub gas_limit: Option<U256>,
    /// The constructor argument resolver
    pub args: ArgResolver,
}

impl DeploymentStep {
    /// A step with no dependencies and no constructor arguments
    pub fn new(name: &'static str, contract: &'static str) -> Self {
        Self {
            name,
            contract,
            deps: Vec::new(),
            gas_limit: None,
            args: Box::new(|_| Ok(Vec::new())),
        }
    }

    /// Declare the earlier steps this step depends on
    pub fn depends_on(mut self, deps: &[&'static str]) -> Self {
        self.deps = deps.to_vec();
        self
    }

    /// Set a per-step gas limit
    pub fn with_gas_limit(mut self, gas: u64) -> Self {
        self.gas_limit = Some(U256::from(gas));
        self
    }

    /// Set the constructor argument resolver
    pub fn with_args(
        mut self,
        args: impl Fn(&ResolvedAddresses<'_>) -> Result<Vec<Token>, ScriptError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.args = Box::new(args);
        self
    }
}

/// Run the given steps, in declared order, against the profile's network.
///
/// For each step: skip it if the address book already holds a record
/// (idempotency), otherwise resolve its dependencies, deploy with the
/// resolved constructor arguments, wait for the profile's confirmation
/// count, and record the result before moving on. A transaction failure
/// aborts the run with [`ScriptError::DeploymentFailed`]; steps after the
/// failing one are never attempted, and previously recorded artifacts remain
/// valid for the next run.
///
/// Returns every step's artifact (pre-existing and newly deployed alike) in
/// step order.
pub async fn run_steps<C: ChainClient>(
    client: &C,
    profile: &NetworkProfile,
    book: &mut AddressBook,
    artifacts: &ArtifactStore,
    steps: &[DeploymentStep],
) -> Result<Vec<DeployedArtifact>, ScriptError> {
    let mut resolved: BTreeMap<String, Address> = BTreeMap::new();
    let mut run_artifacts = Vec::with_capacity(steps.len());
    let mut last_successful: Option<&str> = None;

    for step in steps {
        if let Some(existing) = book.lookup(step.name, profile.name) {
            info!(
                "`{}` already deployed at {:#x}, skipping",
                step.name, existing.address
            );
            resolved.insert(step.name.to_string(), existing.address);
            run_artifacts.push(existing.clone());
            last_successful = Some(step.name);
            continue;
        }

        // Dependency and argument resolution happen before any network call
        for dep in &step.deps {
            if !resolved.contains_key(*dep) {
                return Err(ScriptError::UnresolvedDependency {
                    step: step.name.to_string(),
                    dependency: dep.to_string(),
                });
            }
        }
        let args = (step.args)(&ResolvedAddresses {
            step: step.name,
            addresses: &resolved,
        })?;
        let artifact = artifacts.load(step.contract)?;

        info!("deploying `{}` ({})...", step.name, step.contract);
        let gas_limit = step.gas_limit.unwrap_or(profile.gas_limit);
        let (address, tx) = match client.deploy(&artifact, args, gas_limit).await {
            Ok(deployed) => deployed,
            Err(e) => {
                match last_successful {
                    Some(last) => error!(
                        "run aborted at `{}`; last successful step was `{}`",
                        step.name, last
                    ),
                    None => error!("run aborted at the first step, `{}`", step.name),
                }
                return Err(ScriptError::DeploymentFailed {
                    step: step.name.to_string(),
                    cause: e.to_string(),
                });
            }
        };

        let record = DeployedArtifact {
            name: step.name.to_string(),
            network: profile.name.to_string(),
            address,
            tx,
            deployed_at: Utc::now(),
        };
        book.record(record.clone())?;
        resolved.insert(step.name.to_string(), address);
        info!("`{}` deployed at {:#x} (tx {:#x})", step.name, address, tx);
        run_artifacts.push(record);
        last_successful = Some(step.name);
    }

    Ok(run_artifacts)
}
