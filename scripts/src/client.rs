//! RPC client setup and the chain capability interface used by the
//! sequencer and the configuration applier.
//!
//! The orchestrator only ever touches the chain through [`ChainClient`]: it
//! deploys opaque artifacts and submits signed calls, and never interprets
//! contract internals.

use std::{env, fs, path::PathBuf, str::FromStr, sync::Arc, time::Duration};

use ethers::{
    abi::{Abi, Token},
    contract::ContractFactory,
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{coins_bip39::English, LocalWallet, MnemonicBuilder, Signer},
    types::{Address, Bytes, TransactionRequest, TxHash, U256},
};
use serde::Deserialize;
use tokio::time::timeout;

use crate::{
    errors::ScriptError,
    networks::{CredentialSource, NetworkProfile},
};

/// The concrete signing client used against real networks
pub type DeployerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Sets up the client with which to deploy and configure contracts, resolving
/// the signing credential from the profile's environment reference and
/// adopting the chain id reported by the node.
///
/// The resolved credential is moved into the wallet and never logged.
pub async fn setup_client(profile: &NetworkProfile) -> Result<Arc<DeployerClient>, ScriptError> {
    let provider = Provider::<Http>::try_from(profile.rpc_url.as_str())
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;

    let wallet = resolve_wallet(profile.credential)?;

    let chain_id = provider
        .get_chainid()
        .await
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?
        .as_u64();
    if let Some(expected) = profile.chain_id {
        if expected != chain_id {
            return Err(ScriptError::ClientInitialization(format!(
                "node reports chain id {} but the `{}` profile expects {}",
                chain_id, profile.name, expected
            )));
        }
    }

    let client = Arc::new(SignerMiddleware::new(
        provider,
        wallet.with_chain_id(chain_id),
    ));

    Ok(client)
}

/// Resolve a wallet from a credential reference
fn resolve_wallet(credential: CredentialSource) -> Result<LocalWallet, ScriptError> {
    match credential {
        CredentialSource::PrivateKeyEnv(var) => {
            let key = env::var(var).map_err(|_| {
                ScriptError::ClientInitialization(format!(
                    "environment variable `{}` is not set",
                    var
                ))
            })?;
            LocalWallet::from_str(&key)
                .map_err(|e| ScriptError::ClientInitialization(e.to_string()))
        }
        CredentialSource::MnemonicEnv(var) => {
            let phrase = env::var(var).map_err(|_| {
                ScriptError::ClientInitialization(format!(
                    "environment variable `{}` is not set",
                    var
                ))
            })?;
            MnemonicBuilder::<English>::default()
                .phrase(phrase.as_str())
                .build()
                .map_err(|e| ScriptError::ClientInitialization(e.to_string()))
        }
    }
}

/// A compiled contract artifact: an opaque ABI and creation bytecode pair.
///
/// The orchestrator deploys artifacts but does not implement or interpret
/// them.
#[derive(Debug, Clone)]
pub struct ContractArtifact {
    /// The contract name the artifact was loaded under
    pub name: String,
    /// The contract ABI
    pub abi: Abi,
    /// The contract creation bytecode
    pub bytecode: Bytes,
}

/// The subset of a Truffle-format build artifact the scripts consume
#[derive(Deserialize)]
struct RawArtifact {
    /// The contract ABI
    abi: Abi,
    /// The contract creation bytecode, as a hex string
    bytecode: Bytes,
}

/// Loads compiled contract artifacts from a build output directory,
/// `<dir>/<Contract>.json`
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    /// The directory containing the artifact files
    dir: PathBuf,
}

impl ArtifactStore {
    /// Create a store over the given artifacts directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Load the artifact for the named contract
    pub fn load(&self, contract: &str) -> Result<ContractArtifact, ScriptError> {
        let path = self.dir.join(format!("{}.json", contract));
        let contents = fs::read_to_string(&path).map_err(|e| {
            ScriptError::ArtifactParsing(format!("{}: {}", path.display(), e))
        })?;
        let raw: RawArtifact = serde_json::from_str(&contents).map_err(|e| {
            ScriptError::ArtifactParsing(format!("{}: {}", path.display(), e))
        })?;

        Ok(ContractArtifact {
            name: contract.to_string(),
            abi: raw.abi,
            bytecode: raw.bytecode,
        })
    }
}

/// The capability interface over the target ledger network.
///
/// Implementations submit one transaction at a time and block until the
/// network's confirmation count is observed or a terminal failure occurs; a
/// transaction already submitted is never retracted.
#[allow(async_fn_in_trait)]
pub trait ChainClient {
    /// Deploy a contract from its artifact with the given constructor
    /// arguments, returning the deployed address and the deployment
    /// transaction hash once confirmed
    async fn deploy(
        &self,
        artifact: &ContractArtifact,
        args: Vec<Token>,
        gas_limit: U256,
    ) -> Result<(Address, TxHash), ScriptError>;

    /// Submit a signed call with pre-encoded calldata to a deployed
    /// contract, returning the transaction hash once confirmed
    async fn call(
        &self,
        to: Address,
        calldata: Vec<u8>,
        gas_limit: U256,
    ) -> Result<TxHash, ScriptError>;
}

/// The ethers-backed [`ChainClient`], carrying the gas, confirmation, and
/// timeout policy of the selected network profile
pub struct SignerClient<M> {
    /// The underlying middleware stack
    client: Arc<M>,
    /// The gas price for every submitted transaction, in wei
    gas_price: U256,
    /// The number of confirmations to wait for
    confirmations: usize,
    /// The bound on each confirmation wait
    confirmation_timeout: Duration,
}

impl<M: Middleware + 'static> SignerClient<M> {
    /// Wrap a middleware client with the execution policy of `profile`
    pub fn new(client: Arc<M>, profile: &NetworkProfile) -> Self {
        Self {
            client,
            gas_price: profile.gas_price,
            confirmations: profile.confirmations,
            confirmation_timeout: Duration::from_secs(profile.confirmation_timeout_secs),
        }
    }
}

impl<M: Middleware + 'static> ChainClient for SignerClient<M> {
    async fn deploy(
        &self,
        artifact: &ContractArtifact,
        args: Vec<Token>,
        gas_limit: U256,
    ) -> Result<(Address, TxHash), ScriptError> {
        let factory = ContractFactory::new(
            artifact.abi.clone(),
            artifact.bytecode.clone(),
            self.client.clone(),
        );

        let mut deployer = factory
            .deploy_tokens(args)
            .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))?;
        deployer.tx.set_gas(gas_limit);
        deployer.tx.set_gas_price(self.gas_price);
        let deployer = deployer.confirmations(self.confirmations);

        let (contract, receipt) = timeout(self.confirmation_timeout, deployer.send_with_receipt())
            .await
            .map_err(|_| {
                ScriptError::ContractDeployment(format!(
                    "confirmation timeout after {}s",
                    self.confirmation_timeout.as_secs()
                ))
            })?
            .map_err(|e| ScriptError::ContractDeployment(e.to_string()))?;

        Ok((contract.address(), receipt.transaction_hash))
    }

    async fn call(
        &self,
        to: Address,
        calldata: Vec<u8>,
        gas_limit: U256,
    ) -> Result<TxHash, ScriptError> {
        let tx = TransactionRequest::new()
            .to(to)
            .data(calldata)
            .gas(gas_limit)
            .gas_price(self.gas_price);

        let pending = self
            .client
            .send_transaction(tx, None /* block */)
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?
            .confirmations(self.confirmations);

        let receipt = timeout(self.confirmation_timeout, pending)
            .await
            .map_err(|_| {
                ScriptError::ContractInteraction(format!(
                    "confirmation timeout after {}s",
                    self.confirmation_timeout.as_secs()
                ))
            })?
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?
            .ok_or_else(|| {
                ScriptError::ContractInteraction(String::from(
                    "transaction dropped from the mempool",
                ))
            })?;

        if receipt.status != Some(1u64.into()) {
            return Err(ScriptError::ContractInteraction(format!(
                "transaction {:#x} reverted",
                receipt.transaction_hash
            )));
        }

        Ok(receipt.transaction_hash)
    }
}
