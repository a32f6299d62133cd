//! Governance parameter encoding, validation, and the post-deploy
//! configuration applier.
//!
//! Protocol parameters are written on-chain as `(bytes32 key, int256 value)`
//! pairs: the key is the ASCII parameter name occupying the leading bytes of
//! a zero-padded 32-byte identifier, and the value is a wad (fixed-point
//! integer scaled by 10^18). The contract matches on the encoded key bytes,
//! not the name string, so both encodings here are bit-exact.

use alloy_primitives::{FixedBytes, I256, U256};
use alloy_sol_types::SolCall;
use ethers::types::{Address, TxHash};
use tracing::{info, warn};

use crate::{
    client::ChainClient,
    constants::{
        INITIAL_MARGIN_RATE, KEY_WIDTH, LIQUIDATION_PENALTY_RATE, LOT_SIZE,
        MAINTENANCE_MARGIN_RATE, MAKER_DEV_FEE_RATE, MINTER_RENOUNCED, PENALTY_FUND_RATE,
        TAKER_DEV_FEE_RATE, TRADING_LOT_SIZE, WAD_DECIMALS,
    },
    deployments::{AddressBook, DeployedArtifact},
    errors::ScriptError,
    networks::NetworkProfile,
    solidity::{addMinterCall, renounceMinterCall, setGovernanceParameterCall, to_alloy_address},
};

/// One wad: 10^18, the fixed-point scale of every governance value
pub const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Parse a decimal string into a wad-scaled integer.
///
/// Lossless for any value with at most 18 fractional decimal digits; more
/// fractional digits than the scale can represent are rejected rather than
/// rounded.
pub fn to_wad(value: &str) -> Result<U256, ScriptError> {
    let (int_part, frac_part) = match value.split_once('.') {
        Some((i, f)) => (i, f),
        None => (value, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(ScriptError::CalldataConstruction(format!(
            "`{}` is not a decimal value",
            value
        )));
    }
    if frac_part.len() > WAD_DECIMALS {
        return Err(ScriptError::CalldataConstruction(format!(
            "`{}` has more than {} fractional digits",
            value, WAD_DECIMALS
        )));
    }

    // Scaling by 10^18 is appending (18 - |frac|) zeros to the digits
    let mut digits = String::with_capacity(int_part.len() + WAD_DECIMALS);
    digits.push_str(int_part);
    digits.push_str(frac_part);
    for _ in frac_part.len()..WAD_DECIMALS {
        digits.push('0');
    }

    U256::from_str_radix(&digits, 10)
        .map_err(|_| ScriptError::CalldataConstruction(format!("`{}` is not a decimal value", value)))
}

/// Render a wad-scaled integer back as a decimal string
pub fn from_wad(value: U256) -> String {
    let int_part = value / WAD;
    let frac_part = value % WAD;
    if frac_part.is_zero() {
        return int_part.to_string();
    }

    let frac = format!("{:0>width$}", frac_part.to_string(), width = WAD_DECIMALS);
    format!("{}.{}", int_part, frac.trim_end_matches('0'))
}

/// Encode a parameter name as its fixed-width on-chain key.
///
/// The ASCII bytes of the name occupy the leading bytes of the identifier;
/// the remainder is zero, and names longer than the width are truncated.
/// `"initialMarginRate"` encodes to `0x696e697469616c4d617267696e52617465`
/// followed by fifteen zero bytes.
pub fn encode_key(name: &str) -> [u8; KEY_WIDTH] {
    let mut key = [0u8; KEY_WIDTH];
    let bytes = name.as_bytes();
    let len = bytes.len().min(KEY_WIDTH);
    key[..len].copy_from_slice(&bytes[..len]);
    key
}

/// A single governance parameter write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GovernanceParameter {
    /// The parameter name, encoded to its fixed-width key on submission
    pub key: &'static str,
    /// The wad-scaled value
    pub value: U256,
}

/// The default governance parameter set applied after deployment
pub fn default_parameters() -> Result<Vec<GovernanceParameter>, ScriptError> {
    Ok(vec![
        GovernanceParameter {
            key: INITIAL_MARGIN_RATE,
            value: to_wad("0.10")?,
        },
        GovernanceParameter {
            key: MAINTENANCE_MARGIN_RATE,
            value: to_wad("0.075")?,
        },
        GovernanceParameter {
            key: LIQUIDATION_PENALTY_RATE,
            value: to_wad("0.045")?,
        },
        GovernanceParameter {
            key: PENALTY_FUND_RATE,
            value: to_wad("0.03")?,
        },
        GovernanceParameter {
            key: TAKER_DEV_FEE_RATE,
            value: to_wad("0")?,
        },
        GovernanceParameter {
            key: MAKER_DEV_FEE_RATE,
            value: to_wad("0")?,
        },
        GovernanceParameter {
            key: TRADING_LOT_SIZE,
            value: to_wad("10")?,
        },
        GovernanceParameter {
            key: LOT_SIZE,
            value: to_wad("10")?,
        },
    ])
}

/// The value of a key within a parameter set, if present
fn value_of(parameters: &[GovernanceParameter], key: &str) -> Option<U256> {
    parameters.iter().find(|p| p.key == key).map(|p| p.value)
}

/// Validate the cross-parameter ordering invariants of a parameter set.
///
/// The margin-rate group must satisfy, for whichever members are present:
/// 1 > initialMarginRate > maintenanceMarginRate > liquidationPenaltyRate >
/// penaltyFundRate. Violations are rejected here, before any transaction is
/// submitted, rather than left to the chain.
pub fn validate_parameters(parameters: &[GovernanceParameter]) -> Result<(), ScriptError> {
    let initial = value_of(parameters, INITIAL_MARGIN_RATE);
    let maintenance = value_of(parameters, MAINTENANCE_MARGIN_RATE);
    let liquidation = value_of(parameters, LIQUIDATION_PENALTY_RATE);
    let penalty_fund = value_of(parameters, PENALTY_FUND_RATE);

    if let Some(initial) = initial {
        if initial >= WAD {
            return Err(ScriptError::InvalidParameterOrdering(format!(
                "{} must be below 1, got {}",
                INITIAL_MARGIN_RATE,
                from_wad(initial)
            )));
        }
    }
    // The chain is transitive: each present member must sit below the
    // nearest present member above it, so an omitted middle member cannot
    // open a gap in the invariant
    let chain = [
        (INITIAL_MARGIN_RATE, initial),
        (MAINTENANCE_MARGIN_RATE, maintenance),
        (LIQUIDATION_PENALTY_RATE, liquidation),
        (PENALTY_FUND_RATE, penalty_fund),
    ];
    let mut above: Option<(&str, U256)> = None;
    for (key, value) in chain {
        let value = match value {
            Some(value) => value,
            None => continue,
        };
        if let Some((above_key, above_value)) = above {
            if value >= above_value {
                return Err(ScriptError::InvalidParameterOrdering(format!(
                    "{} ({}) must be below {} ({})",
                    key,
                    from_wad(value),
                    above_key,
                    from_wad(above_value)
                )));
            }
        }
        above = Some((key, value));
    }

    Ok(())
}

/// Apply a governance parameter set to a deployed contract, in declared
/// order.
///
/// The whole set is validated before the first transaction is submitted. A
/// failed write aborts with [`ScriptError::ConfigurationFailed`]; parameters
/// applied earlier in the same run remain in effect on-chain, and nothing is
/// retried automatically.
pub async fn apply_governance<C: ChainClient>(
    client: &C,
    profile: &NetworkProfile,
    target: Address,
    parameters: &[GovernanceParameter],
) -> Result<(), ScriptError> {
    validate_parameters(parameters)?;

    for parameter in parameters {
        info!(
            "setting governance parameter {} = {}",
            parameter.key,
            from_wad(parameter.value)
        );
        let calldata = setGovernanceParameterCall {
            key: FixedBytes(encode_key(parameter.key)),
            value: I256::from_raw(parameter.value),
        }
        .abi_encode();
        client
            .call(target, calldata, profile.gas_limit)
            .await
            .map_err(|e| ScriptError::ConfigurationFailed {
                key: parameter.key.to_string(),
                cause: e.to_string(),
            })?;
    }

    Ok(())
}

/// Grant the minter role on the share token to `minter`.
///
/// Refused (without submitting a transaction) once minter-role
/// administration has been renounced on this network.
pub async fn grant_minter<C: ChainClient>(
    client: &C,
    profile: &NetworkProfile,
    book: &AddressBook,
    share_token: Address,
    minter: Address,
) -> Result<TxHash, ScriptError> {
    if book.lookup(MINTER_RENOUNCED, profile.name).is_some() {
        return Err(ScriptError::ConfigurationFailed {
            key: String::from("addMinter"),
            cause: String::from("minter-role administration has been renounced on this network"),
        });
    }

    info!("granting minter role to {:#x}", minter);
    let calldata = addMinterCall {
        account: to_alloy_address(minter),
    }
    .abi_encode();
    client
        .call(share_token, calldata, profile.gas_limit)
        .await
        .map_err(|e| ScriptError::ConfigurationFailed {
            key: String::from("addMinter"),
            cause: e.to_string(),
        })
}

/// Renounce minter-role administration on the share token.
///
/// This is a one-way, terminal action: once the renounce transaction
/// confirms, a durable sentinel record is written to the address book and
/// every later grant (or repeat renounce) through these scripts is refused.
/// It is never bundled into a default run and must be invoked explicitly.
pub async fn renounce_minter<C: ChainClient>(
    client: &C,
    profile: &NetworkProfile,
    book: &mut AddressBook,
    share_token: Address,
) -> Result<TxHash, ScriptError> {
    if book.lookup(MINTER_RENOUNCED, profile.name).is_some() {
        return Err(ScriptError::ConfigurationFailed {
            key: String::from("renounceMinter"),
            cause: String::from("minter-role administration is already renounced on this network"),
        });
    }

    warn!("renouncing minter-role administration; future grants will be impossible");
    let calldata = renounceMinterCall {}.abi_encode();
    let tx = client
        .call(share_token, calldata, profile.gas_limit)
        .await
        .map_err(|e| ScriptError::ConfigurationFailed {
            key: String::from("renounceMinter"),
            cause: e.to_string(),
        })?;

    book.record(DeployedArtifact {
        name: MINTER_RENOUNCED.to_string(),
        network: profile.name.to_string(),
        address: share_token,
        tx,
        deployed_at: chrono::Utc::now(),
    })?;

    Ok(tx)
}
