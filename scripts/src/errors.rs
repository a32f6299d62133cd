//! Definitions of errors that can occur during the execution of the deploy scripts

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

/// Errors that can occur during the execution of the deploy scripts
#[derive(Debug)]
pub enum ScriptError {
    /// The requested network is not present in the profile registry
    UnknownNetwork(String),
    /// Error initializing the RPC client
    ClientInitialization(String),
    /// Error parsing a compiled contract artifact
    ArtifactParsing(String),
    /// Error reading the deployments file
    ReadDeployments(String),
    /// Error writing the deployments file
    WriteDeployments(String),
    /// A record for the (contract, network) pair already exists in the
    /// address book.
    ///
    /// The book is append-only; a duplicate indicates either a corrupted
    /// deployments file or a colliding concurrent run.
    DuplicateArtifact {
        /// The logical contract name of the duplicated record
        name: String,
        /// The network of the duplicated record
        network: String,
    },
    /// A step declared a dependency whose address is not yet resolved.
    ///
    /// This is a step-graph configuration bug (a forward reference or an
    /// undeclared step), not a transient failure.
    UnresolvedDependency {
        /// The step whose arguments could not be resolved
        step: String,
        /// The missing dependency
        dependency: String,
    },
    /// Error constructing calldata for a contract method
    CalldataConstruction(String),
    /// Error submitting or confirming a contract deployment transaction
    ContractDeployment(String),
    /// Error submitting or confirming a contract method call
    ContractInteraction(String),
    /// A deployment transaction failed (reverted, out of gas, or timed out).
    ///
    /// Safe to re-run the whole sequence: completed steps are skipped
    /// idempotently and the run resumes from the failing step.
    DeploymentFailed {
        /// The step whose deployment transaction failed
        step: String,
        /// The underlying failure
        cause: String,
    },
    /// A governance parameter set violates a cross-parameter ordering
    /// invariant; caught before any transaction is submitted
    InvalidParameterOrdering(String),
    /// A configuration transaction failed.
    ///
    /// Not retried automatically: parameters applied earlier in the same run
    /// remain in effect on-chain, and a blind retry of a state-changing call
    /// risks duplicate effects.
    ConfigurationFailed {
        /// The parameter key or role call that failed
        key: String,
        /// The underlying failure
        cause: String,
    },
}

impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::UnknownNetwork(s) => write!(f, "unknown network: {}", s),
            ScriptError::ClientInitialization(s) => write!(f, "error initializing client: {}", s),
            ScriptError::ArtifactParsing(s) => write!(f, "error parsing artifact: {}", s),
            ScriptError::ReadDeployments(s) => write!(f, "error reading deployments: {}", s),
            ScriptError::WriteDeployments(s) => write!(f, "error writing deployments: {}", s),
            ScriptError::DuplicateArtifact { name, network } => {
                write!(
                    f,
                    "duplicate artifact record for `{}` on `{}`",
                    name, network
                )
            }
            ScriptError::UnresolvedDependency { step, dependency } => {
                write!(
                    f,
                    "step `{}` depends on `{}` which has no resolved address",
                    step, dependency
                )
            }
            ScriptError::CalldataConstruction(s) => {
                write!(f, "error constructing calldata: {}", s)
            }
            ScriptError::ContractDeployment(s) => write!(f, "error deploying contract: {}", s),
            ScriptError::ContractInteraction(s) => {
                write!(f, "error interacting with contract: {}", s)
            }
            ScriptError::DeploymentFailed { step, cause } => {
                write!(f, "error deploying step `{}`: {}", step, cause)
            }
            ScriptError::InvalidParameterOrdering(s) => {
                write!(f, "invalid parameter ordering: {}", s)
            }
            ScriptError::ConfigurationFailed { key, cause } => {
                write!(f, "error applying configuration `{}`: {}", key, cause)
            }
        }
    }
}

impl Error for ScriptError {}
