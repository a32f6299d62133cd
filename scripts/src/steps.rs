//! The protocol's deployment step graph.
//!
//! Declared in dependency order: the sequencer never reorders, and every
//! dependency names an earlier step. Per-network literals (an existing
//! collateral token, the price feed aggregator) come from the network
//! profile, with the test token deployed where no collateral token is
//! configured.

use std::str::FromStr;

use ethers::{
    abi::Token,
    types::{Address, U256},
};

use crate::{
    constants::{
        AMM, COLLATERAL_DECIMALS, COLLATERAL_TOKEN, GLOBAL_CONFIG, PERPETUAL, PRICE_FEEDER, PROXY,
        SHARE_TOKEN,
    },
    errors::ScriptError,
    networks::NetworkProfile,
    sequencer::DeploymentStep,
};

/// The gas limit for the perpetual deployment, the largest contract in the
/// suite
const PERPETUAL_GAS_LIMIT: u64 = 300_000_000;

/// The gas limit for the AMM deployment
const AMM_GAS_LIMIT: u64 = 6_900_000;

/// Parse a configured hex address
fn parse_address(value: &str) -> Result<Address, ScriptError> {
    Address::from_str(value).map_err(|e| {
        ScriptError::CalldataConstruction(format!("invalid address `{}`: {}", value, e))
    })
}

/// Build the full protocol step list for one network.
///
/// `deployer` is the signing account, which becomes the dev account of the
/// perpetual; `price_feed_override` takes precedence over the profile's
/// configured aggregator.
pub fn protocol_steps(
    profile: &NetworkProfile,
    deployer: Address,
    price_feed_override: Option<String>,
) -> Result<Vec<DeploymentStep>, ScriptError> {
    let collateral = profile
        .collateral_token
        .as_deref()
        .map(parse_address)
        .transpose()?;
    // A missing feed is a configuration error known before any deployment;
    // refuse to build the list rather than abort mid-run
    let price_feed = match price_feed_override
        .as_deref()
        .or(profile.price_feed.as_deref())
    {
        Some(value) => parse_address(value)?,
        None => {
            return Err(ScriptError::CalldataConstruction(String::from(
                "no price feed configured for this network; pass --price-feed",
            )))
        }
    };

    let mut steps = vec![DeploymentStep::new(GLOBAL_CONFIG, "GlobalConfig")];

    if collateral.is_none() {
        steps.push(
            DeploymentStep::new(COLLATERAL_TOKEN, "TestToken").with_args(|_| {
                Ok(vec![
                    Token::String(String::from("TestUSDT")),
                    Token::String(String::from("USDT")),
                    Token::Uint(U256::from(6u8)),
                ])
            }),
        );
    }

    steps.push(
        DeploymentStep::new(SHARE_TOKEN, "ShareToken").with_args(|_| {
            Ok(vec![
                Token::String(String::from("Share Token")),
                Token::String(String::from("STK")),
                Token::Uint(U256::from(18u8)),
            ])
        }),
    );

    let perpetual_deps: &[&'static str] = if collateral.is_some() {
        &[GLOBAL_CONFIG]
    } else {
        &[GLOBAL_CONFIG, COLLATERAL_TOKEN]
    };
    steps.push(
        DeploymentStep::new(PERPETUAL, "Perpetual")
            .depends_on(perpetual_deps)
            .with_gas_limit(PERPETUAL_GAS_LIMIT)
            .with_args(move |resolved| {
                let ctk = match collateral {
                    Some(address) => address,
                    None => resolved.address(COLLATERAL_TOKEN)?,
                };
                Ok(vec![
                    Token::Address(resolved.address(GLOBAL_CONFIG)?),
                    Token::Address(deployer),
                    Token::Address(ctk),
                    Token::Uint(U256::from(COLLATERAL_DECIMALS)),
                ])
            }),
    );

    steps.push(
        DeploymentStep::new(PROXY, "Proxy")
            .depends_on(&[PERPETUAL])
            .with_args(|resolved| Ok(vec![Token::Address(resolved.address(PERPETUAL)?)])),
    );

    steps.push(
        DeploymentStep::new(PRICE_FEEDER, "ChainlinkAdapter")
            .with_args(move |_| Ok(vec![Token::Address(price_feed)])),
    );

    steps.push(
        DeploymentStep::new(AMM, "AMM")
            .depends_on(&[GLOBAL_CONFIG, PROXY, PRICE_FEEDER])
            .with_gas_limit(AMM_GAS_LIMIT)
            .with_args(|resolved| {
                Ok(vec![
                    Token::Address(resolved.address(GLOBAL_CONFIG)?),
                    Token::Address(resolved.address(PROXY)?),
                    Token::Address(resolved.address(PRICE_FEEDER)?),
                ])
            }),
    );

    Ok(steps)
}
