//! Constants used in the deploy scripts

/// The logical name of the global config contract in the address book
pub const GLOBAL_CONFIG: &str = "global-config";

/// The logical name of the collateral token contract in the address book.
///
/// Only deployed (as the test token) on networks whose profile does not
/// carry an existing collateral token address.
pub const COLLATERAL_TOKEN: &str = "collateral-token";

/// The logical name of the share token contract in the address book
pub const SHARE_TOKEN: &str = "share-token";

/// The logical name of the perpetual contract in the address book
pub const PERPETUAL: &str = "perpetual";

/// The logical name of the perpetual proxy contract in the address book
pub const PROXY: &str = "proxy";

/// The logical name of the price feeder contract in the address book
pub const PRICE_FEEDER: &str = "price-feeder";

/// The logical name of the AMM contract in the address book
pub const AMM: &str = "amm";

/// The sentinel record name marking that minter-role administration on the
/// share token has been renounced.
///
/// Once this record exists for a network, the orchestrator refuses to grant
/// (or re-renounce) the minter role on that network.
pub const MINTER_RENOUNCED: &str = "share-token.minter-renounced";

/// The governance key for the initial margin rate
pub const INITIAL_MARGIN_RATE: &str = "initialMarginRate";

/// The governance key for the maintenance margin rate
pub const MAINTENANCE_MARGIN_RATE: &str = "maintenanceMarginRate";

/// The governance key for the liquidation penalty rate
pub const LIQUIDATION_PENALTY_RATE: &str = "liquidationPenaltyRate";

/// The governance key for the penalty fund rate
pub const PENALTY_FUND_RATE: &str = "penaltyFundRate";

/// The governance key for the taker dev fee rate
pub const TAKER_DEV_FEE_RATE: &str = "takerDevFeeRate";

/// The governance key for the maker dev fee rate
pub const MAKER_DEV_FEE_RATE: &str = "makerDevFeeRate";

/// The governance key for the trading lot size
pub const TRADING_LOT_SIZE: &str = "tradingLotSize";

/// The governance key for the lot size
pub const LOT_SIZE: &str = "lotSize";

/// The number of decimals in a wad fixed-point value
pub const WAD_DECIMALS: usize = 18;

/// The width in bytes of an encoded governance parameter key
pub const KEY_WIDTH: usize = 32;

/// The environment variable holding the deployer's private key
pub const PRIVATE_KEY_ENV_VAR: &str = "PK";

/// The environment variable holding the deployer's mnemonic phrase
pub const MNEMONIC_ENV_VAR: &str = "MNEMONIC";

/// The default path of the deployments file
pub const DEFAULT_DEPLOYMENTS_PATH: &str = "deployments.jsonl";

/// The default directory containing compiled contract artifacts
pub const DEFAULT_ARTIFACTS_DIR: &str = "build/contracts";

/// The default number of seconds to wait for a transaction to reach its
/// confirmation count before treating the step as failed
pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 300;

/// The number of decimals of the collateral token passed to the perpetual
/// constructor
pub const COLLATERAL_DECIMALS: u8 = 18;
