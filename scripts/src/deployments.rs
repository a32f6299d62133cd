//! The artifact address book: a durable, append-only record of every
//! contract deployed per network.
//!
//! The book is what makes a multi-step, multi-run deployment resumable: the
//! sequencer consults it before every step and skips work that is already
//! recorded. The on-disk format is one JSON record per line, keyed uniquely
//! by (name, network), so operators can audit and diff what has been
//! deployed.

use std::{
    collections::BTreeMap,
    fs::{self, File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use ethers::types::{Address, TxHash};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::errors::ScriptError;

/// A single deployed contract instance.
///
/// Created exactly once per (name, network) pair and never mutated after
/// creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedArtifact {
    /// The logical contract name
    pub name: String,
    /// The network the contract was deployed to
    pub network: String,
    /// The on-chain address of the deployed contract
    pub address: Address,
    /// The hash of the deployment transaction
    pub tx: TxHash,
    /// When the record was written
    pub deployed_at: DateTime<Utc>,
}

/// The durable address book backing a deployment run.
///
/// Holding an `AddressBook` implies holding an exclusive advisory lock on
/// the deployments file, enforcing the one-orchestrator-per-network writer
/// discipline; a second process attempting to open the same file fails fast
/// rather than racing.
pub struct AddressBook {
    /// The path of the deployments file
    path: PathBuf,
    /// The locked file handle, used for appends; the lock is released when
    /// the book is dropped
    file: File,
    /// All records, keyed by (name, network)
    records: BTreeMap<(String, String), DeployedArtifact>,
}

impl AddressBook {
    /// Open (creating if absent) the deployments file at `path`, acquire its
    /// exclusive lock, and load all existing records.
    ///
    /// Fails with [`ScriptError::DuplicateArtifact`] if the file contains two
    /// records for the same (name, network) pair, which indicates a corrupted
    /// file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ScriptError::WriteDeployments(e.to_string()))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)
            .map_err(|e| ScriptError::ReadDeployments(e.to_string()))?;
        file.try_lock_exclusive().map_err(|e| {
            ScriptError::WriteDeployments(format!(
                "could not lock deployments file (already held by another run?): {}",
                e
            ))
        })?;

        let contents =
            fs::read_to_string(&path).map_err(|e| ScriptError::ReadDeployments(e.to_string()))?;
        let mut records = BTreeMap::new();
        for line in contents.lines().filter(|l| !l.trim().is_empty()) {
            let artifact: DeployedArtifact =
                serde_json::from_str(line).map_err(|e| ScriptError::ReadDeployments(e.to_string()))?;
            let key = (artifact.name.clone(), artifact.network.clone());
            if records.insert(key, artifact.clone()).is_some() {
                return Err(ScriptError::DuplicateArtifact {
                    name: artifact.name,
                    network: artifact.network,
                });
            }
        }

        Ok(Self {
            path,
            file,
            records,
        })
    }

    /// The path of the backing deployments file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up the record for a (name, network) pair.
    ///
    /// Absence is a valid, expected result: it means the contract has not
    /// been deployed to that network yet.
    pub fn lookup(&self, name: &str, network: &str) -> Option<&DeployedArtifact> {
        self.records
            .get(&(name.to_string(), network.to_string()))
    }

    /// Append a new record to the book.
    ///
    /// The book is append-only: a record for an existing (name, network)
    /// pair is rejected with [`ScriptError::DuplicateArtifact`] rather than
    /// overwritten, protecting deployment history from accidental
    /// redeployment. The record is written as a single line and synced
    /// before this returns, so a reader observes either the full record or
    /// none of it.
    pub fn record(&mut self, artifact: DeployedArtifact) -> Result<(), ScriptError> {
        let key = (artifact.name.clone(), artifact.network.clone());
        if self.records.contains_key(&key) {
            return Err(ScriptError::DuplicateArtifact {
                name: artifact.name,
                network: artifact.network,
            });
        }

        let mut line = serde_json::to_string(&artifact)
            .map_err(|e| ScriptError::WriteDeployments(e.to_string()))?;
        line.push('\n');
        self.file
            .write_all(line.as_bytes())
            .map_err(|e| ScriptError::WriteDeployments(e.to_string()))?;
        self.file
            .sync_data()
            .map_err(|e| ScriptError::WriteDeployments(e.to_string()))?;

        self.records.insert(key, artifact);
        Ok(())
    }

    /// Iterate over all records in the book, in key order
    pub fn records(&self) -> impl Iterator<Item = &DeployedArtifact> {
        self.records.values()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use ethers::types::{Address, TxHash};
    use tempdir::TempDir;

    use super::{AddressBook, DeployedArtifact};
    use crate::errors::ScriptError;

    /// Build a test record
    fn artifact(name: &str, network: &str, seed: u64) -> DeployedArtifact {
        DeployedArtifact {
            name: name.to_string(),
            network: network.to_string(),
            address: Address::from_low_u64_be(seed),
            tx: TxHash::from_low_u64_be(seed),
            deployed_at: Utc::now(),
        }
    }

    /// Recorded artifacts are visible to lookup; absent pairs are `None`
    #[test]
    fn test_record_and_lookup() {
        let dir = TempDir::new("address-book").unwrap();
        let mut book = AddressBook::open(dir.path().join("deployments.jsonl")).unwrap();

        book.record(artifact("perpetual", "development", 1)).unwrap();

        let found = book.lookup("perpetual", "development").unwrap();
        assert_eq!(found.address, Address::from_low_u64_be(1));
        assert!(book.lookup("perpetual", "production").is_none());
        assert!(book.lookup("amm", "development").is_none());
    }

    /// A second record for the same (name, network) pair is rejected
    #[test]
    fn test_duplicate_record_rejected() {
        let dir = TempDir::new("address-book").unwrap();
        let mut book = AddressBook::open(dir.path().join("deployments.jsonl")).unwrap();

        book.record(artifact("amm", "development", 1)).unwrap();
        let err = book.record(artifact("amm", "development", 2)).unwrap_err();
        assert!(matches!(err, ScriptError::DuplicateArtifact { .. }));

        // The same name on a different network is a distinct key
        book.record(artifact("amm", "rinkeby", 3)).unwrap();
    }

    /// Records survive closing and reopening the book
    #[test]
    fn test_persistence_across_reopen() {
        let dir = TempDir::new("address-book").unwrap();
        let path = dir.path().join("deployments.jsonl");

        {
            let mut book = AddressBook::open(&path).unwrap();
            book.record(artifact("global-config", "development", 7)).unwrap();
            book.record(artifact("perpetual", "development", 8)).unwrap();
        }

        let book = AddressBook::open(&path).unwrap();
        assert_eq!(book.records().count(), 2);
        assert_eq!(
            book.lookup("perpetual", "development").unwrap().address,
            Address::from_low_u64_be(8),
        );
    }

    /// The on-disk format is one complete JSON record per line
    #[test]
    fn test_one_record_per_line() {
        let dir = TempDir::new("address-book").unwrap();
        let path = dir.path().join("deployments.jsonl");

        let mut book = AddressBook::open(&path).unwrap();
        book.record(artifact("proxy", "development", 1)).unwrap();
        book.record(artifact("amm", "development", 2)).unwrap();
        drop(book);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            // Every line parses as a full record: name, network, address,
            // and tx are all present or the line is absent entirely
            let parsed: DeployedArtifact = serde_json::from_str(line).unwrap();
            assert!(!parsed.name.is_empty());
            assert!(!parsed.network.is_empty());
        }
    }

    /// A second open of the same file fails while the lock is held
    #[test]
    fn test_single_writer_lock() {
        let dir = TempDir::new("address-book").unwrap();
        let path = dir.path().join("deployments.jsonl");

        let _book = AddressBook::open(&path).unwrap();
        let err = match AddressBook::open(&path) {
            Ok(_) => panic!("second open must fail while the lock is held"),
            Err(e) => e,
        };
        assert!(matches!(err, ScriptError::WriteDeployments(_)));
    }
}
