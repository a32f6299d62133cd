//! End-to-end tests of the deployment sequencer and the configuration
//! applier against a mocked chain

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use chrono::Utc;
use ethers::{
    abi::Token,
    types::{Address, TxHash, U256},
};
use tempdir::TempDir;

use deploy_scripts::{
    client::{ArtifactStore, ChainClient, ContractArtifact},
    constants::MINTER_RENOUNCED,
    deployments::{AddressBook, DeployedArtifact},
    errors::ScriptError,
    governance::{self, to_wad, GovernanceParameter},
    networks::{self, NetworkProfile},
    sequencer::{run_steps, DeploymentStep},
};

/// The mutable state of the mocked chain
#[derive(Default)]
struct MockState {
    /// A counter used to mint deterministic addresses
    next_address: u64,
    /// The contract names deployed, in submission order
    deploys: Vec<String>,
    /// The `(target, calldata)` of every submitted call
    calls: Vec<(Address, Vec<u8>)>,
}

/// A mocked chain client recording every submitted transaction
#[derive(Default)]
struct MockChain {
    /// The recorded state
    state: Mutex<MockState>,
    /// A contract name whose deployment fails with a simulated revert
    fail_contract: Option<&'static str>,
}

impl MockChain {
    /// A chain where deploying `contract` reverts
    fn failing_on(contract: &'static str) -> Self {
        Self {
            fail_contract: Some(contract),
            ..Self::default()
        }
    }

    /// The contract names deployed so far
    fn deploys(&self) -> Vec<String> {
        self.state.lock().unwrap().deploys.clone()
    }

    /// The calls submitted so far
    fn calls(&self) -> Vec<(Address, Vec<u8>)> {
        self.state.lock().unwrap().calls.clone()
    }
}

impl ChainClient for MockChain {
    async fn deploy(
        &self,
        artifact: &ContractArtifact,
        _args: Vec<Token>,
        _gas_limit: U256,
    ) -> Result<(Address, TxHash), ScriptError> {
        if self.fail_contract == Some(artifact.name.as_str()) {
            return Err(ScriptError::ContractDeployment(String::from(
                "simulated revert",
            )));
        }
        let mut state = self.state.lock().unwrap();
        state.next_address += 1;
        state.deploys.push(artifact.name.clone());
        Ok((
            Address::from_low_u64_be(state.next_address),
            TxHash::from_low_u64_be(state.next_address),
        ))
    }

    async fn call(
        &self,
        to: Address,
        calldata: Vec<u8>,
        _gas_limit: U256,
    ) -> Result<TxHash, ScriptError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push((to, calldata));
        Ok(TxHash::from_low_u64_be(0xca11))
    }
}

/// Write a minimal artifact file for `contract` into `dir`
fn write_artifact(dir: &Path, contract: &str) {
    fs::write(
        dir.join(format!("{}.json", contract)),
        r#"{"abi":[],"bytecode":"0x6080"}"#,
    )
    .unwrap();
}

/// A test fixture: a profile, an artifact store over a temp dir, and a book
/// path
struct Fixture {
    /// Keeps the temp dir alive for the test's duration
    _dir: TempDir,
    /// The target network profile
    profile: NetworkProfile,
    /// The artifact store over the fixture's artifact files
    artifacts: ArtifactStore,
    /// The path of the deployments file
    book_path: PathBuf,
}

impl Fixture {
    /// Create a fixture with artifact files for the named contracts
    fn new(contracts: &[&str]) -> Self {
        let dir = TempDir::new("orchestration").unwrap();
        for contract in contracts {
            write_artifact(dir.path(), contract);
        }
        let artifacts = ArtifactStore::new(dir.path());
        let book_path = dir.path().join("deployments.jsonl");
        Self {
            _dir: dir,
            profile: networks::resolve("development").unwrap(),
            artifacts,
            book_path,
        }
    }
}

/// A two-step list: `a`, then `b` which consumes `a`'s address
fn two_steps() -> Vec<DeploymentStep> {
    vec![
        DeploymentStep::new("a", "A"),
        DeploymentStep::new("b", "B")
            .depends_on(&["a"])
            .with_args(|resolved| Ok(vec![Token::Address(resolved.address("a")?)])),
    ]
}

/// Running the same step list twice performs zero additional deployment
/// transactions and leaves the address book byte-identical
#[tokio::test]
async fn test_idempotent_rerun() {
    let fixture = Fixture::new(&["A", "B"]);
    let chain = MockChain::default();
    let mut book = AddressBook::open(&fixture.book_path).unwrap();

    let first = run_steps(&chain, &fixture.profile, &mut book, &fixture.artifacts, &two_steps())
        .await
        .unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(chain.deploys(), vec!["A", "B"]);
    let book_after_first = fs::read_to_string(&fixture.book_path).unwrap();

    let second = run_steps(&chain, &fixture.profile, &mut book, &fixture.artifacts, &two_steps())
        .await
        .unwrap();
    assert_eq!(second, first);
    assert_eq!(chain.deploys(), vec!["A", "B"], "second run must deploy nothing");
    assert_eq!(
        fs::read_to_string(&fixture.book_path).unwrap(),
        book_after_first,
    );
}

/// With `a` already recorded from a prior run, only `b` is deployed, and the
/// returned list contains both in step order
#[tokio::test]
async fn test_resume_skips_recorded_steps() {
    let fixture = Fixture::new(&["A", "B"]);
    let chain = MockChain::default();
    let mut book = AddressBook::open(&fixture.book_path).unwrap();

    let prior = DeployedArtifact {
        name: String::from("a"),
        network: fixture.profile.name.to_string(),
        address: Address::from_low_u64_be(0xaa),
        tx: TxHash::from_low_u64_be(0xaa),
        deployed_at: Utc::now(),
    };
    book.record(prior.clone()).unwrap();

    let artifacts = run_steps(&chain, &fixture.profile, &mut book, &fixture.artifacts, &two_steps())
        .await
        .unwrap();

    assert_eq!(chain.deploys(), vec!["B"], "only b's deployment is submitted");
    assert_eq!(artifacts.len(), 2);
    assert_eq!(artifacts[0], prior);
    assert_eq!(artifacts[1].name, "b");
}

/// A failing step aborts the run; earlier artifacts stay recorded and a
/// re-run resumes from the failed step without repeating them
#[tokio::test]
async fn test_failure_aborts_and_rerun_resumes() {
    let fixture = Fixture::new(&["A", "B", "C"]);
    let steps = || {
        vec![
            DeploymentStep::new("a", "A"),
            DeploymentStep::new("b", "B"),
            DeploymentStep::new("c", "C").depends_on(&["b"]).with_args(
                |resolved| Ok(vec![Token::Address(resolved.address("b")?)]),
            ),
        ]
    };

    let chain = MockChain::failing_on("B");
    let mut book = AddressBook::open(&fixture.book_path).unwrap();
    let err = run_steps(&chain, &fixture.profile, &mut book, &fixture.artifacts, &steps())
        .await
        .unwrap_err();
    assert!(matches!(err, ScriptError::DeploymentFailed { ref step, .. } if step == "b"));
    // `c` was never attempted; `a` remains recorded
    assert_eq!(chain.deploys(), vec!["A"]);
    assert!(book.lookup("a", "development").is_some());
    assert!(book.lookup("b", "development").is_none());

    let chain = MockChain::default();
    let artifacts = run_steps(&chain, &fixture.profile, &mut book, &fixture.artifacts, &steps())
        .await
        .unwrap();
    assert_eq!(chain.deploys(), vec!["B", "C"], "a is skipped on the re-run");
    assert_eq!(artifacts.len(), 3);
    assert_eq!(
        artifacts.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(),
        vec!["a", "b", "c"],
    );
}

/// A step whose dependency has not run fails before any network call
#[tokio::test]
async fn test_unresolved_dependency_is_fatal() {
    let fixture = Fixture::new(&["B"]);
    let chain = MockChain::default();
    let mut book = AddressBook::open(&fixture.book_path).unwrap();

    let steps = vec![DeploymentStep::new("b", "B")
        .depends_on(&["a"])
        .with_args(|resolved| Ok(vec![Token::Address(resolved.address("a")?)]))];

    let err = run_steps(&chain, &fixture.profile, &mut book, &fixture.artifacts, &steps)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ScriptError::UnresolvedDependency { ref step, ref dependency }
            if step == "b" && dependency == "a"
    ));
    assert!(chain.deploys().is_empty(), "no deployment may be submitted");
}

/// An ordering violation is rejected before any configuration transaction is
/// submitted
#[tokio::test]
async fn test_invalid_parameter_set_submits_nothing() {
    let profile = networks::resolve("development").unwrap();
    let chain = MockChain::default();

    // liquidationPenaltyRate >= maintenanceMarginRate
    let parameters = vec![
        GovernanceParameter {
            key: "maintenanceMarginRate",
            value: to_wad("0.075").unwrap(),
        },
        GovernanceParameter {
            key: "liquidationPenaltyRate",
            value: to_wad("0.08").unwrap(),
        },
    ];

    let err = governance::apply_governance(
        &chain,
        &profile,
        Address::from_low_u64_be(1),
        &parameters,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ScriptError::InvalidParameterOrdering(_)));
    assert!(chain.calls().is_empty(), "zero transactions were submitted");
}

/// Applying a valid set submits one call per parameter, in declared order,
/// with the documented key and value encoding
#[tokio::test]
async fn test_governance_calldata_encoding() {
    let profile = networks::resolve("development").unwrap();
    let chain = MockChain::default();
    let target = Address::from_low_u64_be(0x9e);

    let parameters = governance::default_parameters().unwrap();
    governance::apply_governance(&chain, &profile, target, &parameters)
        .await
        .unwrap();

    let calls = chain.calls();
    assert_eq!(calls.len(), parameters.len());

    let (to, calldata) = &calls[0];
    assert_eq!(*to, target);
    let selector = ethers::utils::id("setGovernanceParameter(bytes32,int256)");
    assert_eq!(&calldata[..4], selector.as_slice());
    assert_eq!(
        &calldata[4..36],
        governance::encode_key("initialMarginRate").as_slice(),
    );
    // int256 value, big-endian: 0.10 scaled by 10^18
    let value = ethers::types::U256::from_big_endian(&calldata[36..68]);
    assert_eq!(value, ethers::types::U256::from(100_000_000_000_000_000u64));
}

/// After a successful renounce, any later grant (or repeat renounce) through
/// the scripts fails without submitting a transaction, and the lockout
/// survives reopening the book
#[tokio::test]
async fn test_renounce_is_terminal() {
    let fixture = Fixture::new(&[]);
    let chain = MockChain::default();
    let mut book = AddressBook::open(&fixture.book_path).unwrap();

    let share_token = Address::from_low_u64_be(0x5a);
    let amm = Address::from_low_u64_be(0xa3);

    // A grant before the renounce goes through
    governance::grant_minter(&chain, &fixture.profile, &book, share_token, amm)
        .await
        .unwrap();
    assert_eq!(chain.calls().len(), 1);

    governance::renounce_minter(&chain, &fixture.profile, &mut book, share_token)
        .await
        .unwrap();
    assert!(book.lookup(MINTER_RENOUNCED, "development").is_some());
    assert_eq!(chain.calls().len(), 2);

    let err = governance::grant_minter(&chain, &fixture.profile, &book, share_token, amm)
        .await
        .unwrap_err();
    assert!(matches!(err, ScriptError::ConfigurationFailed { .. }));
    let err = governance::renounce_minter(&chain, &fixture.profile, &mut book, share_token)
        .await
        .unwrap_err();
    assert!(matches!(err, ScriptError::ConfigurationFailed { .. }));
    assert_eq!(chain.calls().len(), 2, "the refusals submitted nothing");

    // The sentinel is durable
    drop(book);
    let book = AddressBook::open(&fixture.book_path).unwrap();
    let err = governance::grant_minter(&chain, &fixture.profile, &book, share_token, amm)
        .await
        .unwrap_err();
    assert!(matches!(err, ScriptError::ConfigurationFailed { .. }));
}
