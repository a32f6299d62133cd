//! The network profile registry: static per-network connection and execution
//! parameters, selected once per run.

use ethers::types::U256;

use crate::{
    constants::{DEFAULT_CONFIRMATION_TIMEOUT_SECS, MNEMONIC_ENV_VAR, PRIVATE_KEY_ENV_VAR},
    errors::ScriptError,
};

/// A reference to the deployer's signing credential.
///
/// Profiles never carry a literal secret; the referenced environment variable
/// is resolved at client setup, and the raw value is never logged or
/// persisted.
#[derive(Debug, Clone, Copy)]
pub enum CredentialSource {
    /// A hex private key read from the named environment variable
    PrivateKeyEnv(&'static str),
    /// A BIP-39 mnemonic phrase read from the named environment variable
    MnemonicEnv(&'static str),
}

/// Connection and execution parameters for a single target network
#[derive(Debug, Clone)]
pub struct NetworkProfile {
    /// The registry name of the network
    pub name: &'static str,
    /// The RPC endpoint URL
    pub rpc_url: String,
    /// The expected chain id, checked against the node at client setup.
    ///
    /// `None` for local development networks with arbitrary chain ids; the
    /// client always adopts the chain id reported by the node.
    pub chain_id: Option<u64>,
    /// The deployer's signing credential reference
    pub credential: CredentialSource,
    /// The default gas limit for deployment and configuration transactions
    pub gas_limit: U256,
    /// The gas price, in wei
    pub gas_price: U256,
    /// The number of confirmations to wait for before treating a
    /// transaction as final
    pub confirmations: usize,
    /// The number of seconds to wait for the confirmation count before
    /// treating the transaction as failed
    pub confirmation_timeout_secs: u64,
    /// The address of an existing collateral token on this network, in hex.
    ///
    /// Networks without one deploy the test token instead.
    pub collateral_token: Option<String>,
    /// The address of the price feed aggregator wrapped by the price feeder,
    /// in hex
    pub price_feed: Option<String>,
}

/// Resolve a network name to its profile.
///
/// Pure lookup over the statically configured set; fails with
/// [`ScriptError::UnknownNetwork`] for any name not registered here.
pub fn resolve(name: &str) -> Result<NetworkProfile, ScriptError> {
    match name {
        "development" => Ok(NetworkProfile {
            name: "development",
            rpc_url: String::from("http://127.0.0.1:8545"),
            chain_id: None,
            credential: CredentialSource::PrivateKeyEnv(PRIVATE_KEY_ENV_VAR),
            gas_limit: U256::from(80_000_000u64),
            gas_price: U256::from(10_000_000_000u64),
            confirmations: 0,
            confirmation_timeout_secs: DEFAULT_CONFIRMATION_TIMEOUT_SECS,
            collateral_token: None,
            price_feed: None,
        }),
        "localchain" => Ok(NetworkProfile {
            name: "localchain",
            rpc_url: String::from("http://103.96.148.28:28545"),
            chain_id: Some(2021),
            credential: CredentialSource::MnemonicEnv(MNEMONIC_ENV_VAR),
            gas_limit: U256::from(8_000_000u64),
            gas_price: U256::from(10_000_000_000u64),
            confirmations: 0,
            confirmation_timeout_secs: DEFAULT_CONFIRMATION_TIMEOUT_SECS,
            collateral_token: None,
            price_feed: None,
        }),
        "ropsten" => Ok(NetworkProfile {
            name: "ropsten",
            rpc_url: String::from("https://ropsten.infura.io"),
            chain_id: Some(3),
            credential: CredentialSource::PrivateKeyEnv(PRIVATE_KEY_ENV_VAR),
            gas_limit: U256::from(8_000_000u64),
            gas_price: U256::from(10_000_000_000u64),
            confirmations: 0,
            confirmation_timeout_secs: DEFAULT_CONFIRMATION_TIMEOUT_SECS,
            collateral_token: None,
            price_feed: None,
        }),
        "rinkeby" => Ok(NetworkProfile {
            name: "rinkeby",
            rpc_url: String::from("https://rinkeby.infura.io/v3/9aa3d95b3bc440fa88ea12eaa4456161"),
            chain_id: Some(4),
            credential: CredentialSource::PrivateKeyEnv(PRIVATE_KEY_ENV_VAR),
            gas_limit: U256::from(8_000_000u64),
            gas_price: U256::from(10_000_000_000u64),
            confirmations: 0,
            confirmation_timeout_secs: DEFAULT_CONFIRMATION_TIMEOUT_SECS,
            collateral_token: None,
            // The Rinkeby ETH/USD aggregator
            price_feed: Some(String::from(
                "0x8A753747A1Fa494EC906cE90E9f37563A8AF630e",
            )),
        }),
        "arbrinkeby" => Ok(NetworkProfile {
            name: "arbrinkeby",
            rpc_url: String::from("https://rinkeby.arbitrum.io/rpc"),
            chain_id: Some(421_611),
            credential: CredentialSource::PrivateKeyEnv(PRIVATE_KEY_ENV_VAR),
            gas_limit: U256::from(80_000_000u64),
            gas_price: U256::from(10_000_000_000u64),
            confirmations: 0,
            confirmation_timeout_secs: DEFAULT_CONFIRMATION_TIMEOUT_SECS,
            collateral_token: None,
            price_feed: None,
        }),
        "production" => Ok(NetworkProfile {
            name: "production",
            rpc_url: String::from("https://mainnet.infura.io"),
            chain_id: Some(1),
            credential: CredentialSource::PrivateKeyEnv(PRIVATE_KEY_ENV_VAR),
            gas_limit: U256::from(8_000_000u64),
            gas_price: U256::from(26_000_000_000u64),
            confirmations: 2,
            confirmation_timeout_secs: DEFAULT_CONFIRMATION_TIMEOUT_SECS,
            // The existing mainnet collateral token; the test token is never
            // deployed here
            collateral_token: Some(String::from(
                "0xB22794F905dfC64544F19C5566000B8063339C9b",
            )),
            // The mainnet ETH/USD aggregator
            price_feed: Some(String::from(
                "0x5f4eC3Df9cbd43714FE2740f5E3616155c5b8419",
            )),
        }),
        other => Err(ScriptError::UnknownNetwork(other.to_string())),
    }
}
