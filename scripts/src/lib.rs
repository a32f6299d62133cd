//! Scripts for deploying and initializing the perpetual protocol contracts.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod cli;
pub mod client;
mod commands;
pub mod constants;
pub mod deployments;
pub mod errors;
pub mod governance;
pub mod networks;
pub mod sequencer;
mod solidity;
pub mod steps;
