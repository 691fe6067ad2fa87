//! Loader: the mutating entry point for artifacts.
//!
//! A deployment either ends with the artifact compiled, deployed, verified
//! on chain, indexed by the [`Registry`] and persisted as JSON, or it leaves
//! nothing behind except, in one case, a reusable cached binary.

pub mod order;
pub mod source;
pub mod storage;

use crate::codec::decode::read_address;
use crate::codec::encode::AbiBuilder;
use crate::config::Config;
use crate::core::definitions::is_identifier;
use crate::core::errors::PtErrorKind;
use crate::core::records::{
    ArtifactKind, ConditionRecord, FeatureRecord, ParticleRecord, TransformationRecord,
};
use crate::engine::errors::AccountError;
use crate::engine::{Bytecode, Engine};
use crate::registry::{Indexed, Registry};
use crate::types::address::Address;
use crate::{debug, error, info, warn};
use dashmap::DashMap;
use source::SourceError;
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// Gas for the `getOwner()` verification call.
const OWNER_CHECK_GAS: u64 = 1_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadErrorKind {
    InvalidData,
    InvalidAddress,
    CompilationError,
    /// Deployment reverted with a decodable contract error.
    Deploy(PtErrorKind),
    Generic,
}

impl fmt::Display for LoadErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadErrorKind::InvalidData => f.write_str("INVALID_DATA"),
            LoadErrorKind::InvalidAddress => f.write_str("INVALID_ADDRESS"),
            LoadErrorKind::CompilationError => f.write_str("COMPILATION_ERROR"),
            LoadErrorKind::Deploy(kind) => write!(f, "{}", kind),
            LoadErrorKind::Generic => f.write_str("GENERIC_ERROR"),
        }
    }
}

#[derive(Clone, Debug, Error)]
#[error("{kind}: {message}")]
pub struct LoaderError {
    pub kind: LoadErrorKind,
    pub message: String,
}

impl LoaderError {
    fn new(kind: LoadErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    fn invalid_data(message: impl Into<String>) -> Self {
        Self::new(LoadErrorKind::InvalidData, message)
    }

    fn generic(message: impl Into<String>) -> Self {
        Self::new(LoadErrorKind::Generic, message)
    }
}

impl From<SourceError> for LoaderError {
    fn from(e: SourceError) -> Self {
        LoaderError::invalid_data(e.to_string())
    }
}

fn require_identifier(what: &str, name: &str) -> Result<(), LoaderError> {
    if name.is_empty() {
        return Err(LoaderError::invalid_data(format!("{} is empty", what)));
    }
    if !is_identifier(name) {
        return Err(LoaderError::invalid_data(format!(
            "{} `{}` is not a valid identifier",
            what, name
        )));
    }
    Ok(())
}

/// Kind-specific parts of the pipeline.
pub trait Artifact: Indexed {
    /// Rejects names and snippets that cannot be spliced into a contract.
    fn validate(&self) -> Result<(), LoaderError>;

    /// Wrapper contract source.
    fn source(&self) -> Result<String, SourceError>;

    /// Replay order of stored records, plus the names that cannot be
    /// replayed at all.
    fn replay_order(records: BTreeMap<String, Self>) -> (Vec<Self>, Vec<String>) {
        (records.into_values().collect(), Vec::new())
    }
}

impl Artifact for TransformationRecord {
    fn validate(&self) -> Result<(), LoaderError> {
        require_identifier("transformation name", &self.transformation.name)?;
        if self.transformation.sol_src.is_empty() {
            return Err(LoaderError::invalid_data("transformation source is empty"));
        }
        Ok(())
    }

    fn source(&self) -> Result<String, SourceError> {
        source::transformation_source(&self.transformation)
    }
}

impl Artifact for ConditionRecord {
    fn validate(&self) -> Result<(), LoaderError> {
        require_identifier("condition name", &self.condition.name)?;
        if self.condition.sol_src.is_empty() {
            return Err(LoaderError::invalid_data("condition source is empty"));
        }
        Ok(())
    }

    fn source(&self) -> Result<String, SourceError> {
        source::condition_source(&self.condition)
    }
}

impl Artifact for FeatureRecord {
    fn validate(&self) -> Result<(), LoaderError> {
        require_identifier("feature name", &self.feature.name)?;
        for transformation in self.feature.transformation_names() {
            require_identifier("transformation name", transformation)?;
        }
        Ok(())
    }

    fn source(&self) -> Result<String, SourceError> {
        Ok(source::feature_source(&self.feature))
    }
}

impl Artifact for ParticleRecord {
    fn validate(&self) -> Result<(), LoaderError> {
        let particle = &self.particle;
        require_identifier("particle name", &particle.name)?;
        require_identifier("feature name", &particle.feature_name)?;
        if !particle.condition_name.is_empty() {
            require_identifier("condition name", &particle.condition_name)?;
        }
        for (_, composite) in particle.composites() {
            require_identifier("composite name", composite)?;
        }
        Ok(())
    }

    fn source(&self) -> Result<String, SourceError> {
        Ok(source::particle_source(&self.particle))
    }

    fn replay_order(mut records: BTreeMap<String, Self>) -> (Vec<Self>, Vec<String>) {
        let (names, blocked) = order::particle_order(&records);
        let ordered = names
            .iter()
            .filter_map(|name| records.remove(name))
            .collect();
        (ordered, blocked)
    }
}

/// Drives artifacts through compile, deploy, verify, register and persist.
#[derive(Clone)]
pub struct Loader {
    engine: Engine,
    registry: Registry,
    storage: PathBuf,
    contracts: PathBuf,
    node_modules: PathBuf,
    locks: Arc<DashMap<(ArtifactKind, String), Arc<Mutex<()>>>>,
}

impl Loader {
    /// Creates the loader and the storage layout under `config.storage_path`.
    pub async fn new(config: &Config, engine: Engine, registry: Registry) -> io::Result<Self> {
        storage::ensure_layout(&config.storage_path).await?;
        Ok(Self {
            engine,
            registry,
            storage: config.storage_path.clone(),
            contracts: config.contracts_dir(),
            node_modules: config.node_modules_dir(),
            locks: Arc::new(DashMap::new()),
        })
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage
    }

    /// Drops cached binaries built from older templates.
    pub async fn ensure_build_version(&self) -> Result<bool, LoaderError> {
        storage::ensure_build_version(&self.storage)
            .await
            .map_err(|e| LoaderError::generic(format!("build cache cleanup failed: {}", e)))
    }

    /// Runs the full pipeline for `record` and returns the deployed address.
    pub async fn deploy<R: Artifact>(&self, record: R) -> Result<Address, LoaderError> {
        let kind = R::KIND;
        let result = self.deploy_inner(record).await;
        if let Err(e) = &result {
            error!("Failed to load {}: {}", kind, e);
        }
        result
    }

    async fn deploy_inner<R: Artifact>(&self, record: R) -> Result<Address, LoaderError> {
        let kind = R::KIND;
        record.validate()?;
        let owner = Address::from_hex(record.owner()).map_err(|e| {
            LoaderError::new(
                LoadErrorKind::InvalidAddress,
                format!("owner `{}`: {}", record.owner(), e),
            )
        })?;

        let key = (kind, record.name().to_string());
        let lock = self.locks.entry(key.clone()).or_default().clone();
        let result = {
            let _guard = lock.lock().await;
            self.pipeline(record, owner).await
        };
        drop(lock);
        self.locks.remove_if(&key, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    /// Compile, deploy, verify, register and persist, rolling back on failure.
    /// Runs under the per-name lock.
    async fn pipeline<R: Artifact>(&self, record: R, owner: Address) -> Result<Address, LoaderError> {
        let kind = R::KIND;
        let name = record.name().to_string();
        let build_dir = storage::build_dir(&self.storage, kind);
        let bin = build_dir.join(format!("{}.bin", name));
        if tokio::fs::try_exists(&bin).await.unwrap_or(false) {
            debug!("Using cached build of {} `{}`", kind, name);
        } else {
            self.compile(&record, &build_dir).await?;
        }

        match self.engine.add_account(owner, self.engine.gas_limit()).await {
            Ok(()) | Err(AccountError::AlreadyExists(_)) => {}
            Err(e) => return Err(LoaderError::generic(e.to_string())),
        }

        let constructor_args = AbiBuilder::new()
            .arg(&self.engine.registry_address())
            .finish();
        let address = match self
            .engine
            .deploy(
                Bytecode::Path(bin.clone()),
                owner,
                constructor_args,
                self.engine.gas_limit(),
                0,
            )
            .await
        {
            Ok(address) => address,
            Err(e) => {
                let reason = e.pt_error().ok().flatten();
                if let Some(reason) = &reason
                    && reason.kind == kind.already_registered()
                {
                    warn!("{} `{}` is already registered on chain", kind, name);
                    return Err(LoaderError::new(
                        LoadErrorKind::Deploy(reason.kind),
                        reason.to_string(),
                    ));
                }
                storage::remove_build_artifacts(&build_dir, &name).await;
                return Err(match reason {
                    Some(reason) => {
                        LoaderError::new(LoadErrorKind::Deploy(reason.kind), reason.to_string())
                    }
                    None => LoaderError::generic(format!("{}: {}", e.chain_kind(), e)),
                });
            }
        };
        debug!("Deployed {} `{}` at {}", kind, name, address);

        if let Err(e) = self.verify_owner(address, owner).await {
            storage::remove_build_artifacts(&build_dir, &name).await;
            return Err(e);
        }

        if let Err(e) = self.registry.add(address, record.clone()).await {
            storage::remove_build_artifacts(&build_dir, &name).await;
            return Err(LoaderError::generic(e.to_string()));
        }

        if let Err(e) = storage::save_record(&self.storage, &record).await {
            self.registry.remove::<R>(&name, address).await;
            storage::remove_build_artifacts(&build_dir, &name).await;
            return Err(LoaderError::generic(format!(
                "failed to persist {} `{}`: {}",
                kind, name, e
            )));
        }

        info!("Loaded {} `{}` at {}", kind, name, address);
        Ok(address)
    }

    /// Writes the wrapper source, compiles it into `build_dir` and removes
    /// the source again.
    async fn compile<R: Artifact>(&self, record: &R, build_dir: &Path) -> Result<(), LoaderError> {
        let name = record.name();
        let source = record.source()?;
        let source_path = build_dir.join(format!("{}.sol", name));
        tokio::fs::write(&source_path, source).await.map_err(|e| {
            LoaderError::generic(format!("cannot write {}: {}", source_path.display(), e))
        })?;

        let result = self
            .engine
            .compile(
                &source_path,
                build_dir,
                Some(&self.contracts),
                Some(&self.node_modules),
            )
            .await;
        storage::remove_file(&source_path).await;

        result.map_err(|e| {
            LoaderError::new(
                LoadErrorKind::CompilationError,
                format!("{} `{}`: {}", R::KIND, name, e),
            )
        })?;

        if !tokio::fs::try_exists(build_dir.join(format!("{}.bin", name)))
            .await
            .unwrap_or(false)
        {
            storage::remove_build_artifacts(build_dir, name).await;
            return Err(LoaderError::new(
                LoadErrorKind::CompilationError,
                format!("compiler produced no binary for `{}`", name),
            ));
        }
        Ok(())
    }

    /// Asks the contract for its owner and compares it with `expected`.
    async fn verify_owner(&self, contract: Address, expected: Address) -> Result<(), LoaderError> {
        let registry = self.engine.registry_address();
        if let Err(e) = self.engine.set_gas(registry, self.engine.gas_limit()).await {
            debug!("Cannot top up registry {}: {}", registry, e);
        }
        let output = self
            .engine
            .execute(
                registry,
                contract,
                AbiBuilder::call("getOwner()").finish(),
                OWNER_CHECK_GAS,
                0,
            )
            .await
            .map_err(|e| LoaderError::generic(format!("getOwner() failed: {}", e)))?;
        let actual = read_address(&output, 0)
            .map_err(|e| LoaderError::generic(format!("getOwner() output: {}", e)))?;
        if actual != expected {
            return Err(LoaderError::invalid_data(format!(
                "contract {} is owned by {}, not {}",
                contract, actual, expected
            )));
        }
        Ok(())
    }

    pub async fn deploy_transformation(
        &self,
        record: TransformationRecord,
    ) -> Result<Address, LoaderError> {
        self.deploy(record).await
    }

    pub async fn deploy_condition(&self, record: ConditionRecord) -> Result<Address, LoaderError> {
        self.deploy(record).await
    }

    pub async fn deploy_feature(&self, record: FeatureRecord) -> Result<Address, LoaderError> {
        self.deploy(record).await
    }

    pub async fn deploy_particle(&self, record: ParticleRecord) -> Result<Address, LoaderError> {
        self.deploy(record).await
    }

    /// Replays every stored record of one kind.
    ///
    /// Every item is attempted. Returns the number loaded, or an error naming
    /// how many failed.
    pub async fn load_stored<R: Artifact>(&self) -> Result<usize, LoaderError> {
        let kind = R::KIND;
        let records = storage::load_records::<R>(&self.storage)
            .await
            .map_err(|e| LoaderError::generic(format!("cannot scan {}: {}", kind.plural(), e)))?;
        let (ordered, blocked) = R::replay_order(records);
        for name in &blocked {
            error!("Cannot order {} `{}`: composite cycle", kind, name);
        }

        let total = ordered.len();
        let step = total / 100 + 1;
        let mut loaded = 0usize;
        for (i, record) in ordered.into_iter().enumerate() {
            if self.deploy(record).await.is_ok() {
                loaded += 1;
            }
            if (i + 1) % step == 0 || i + 1 == total {
                info!("Loading {}: {}/{}", kind.plural(), i + 1, total);
            }
        }

        let failed = total - loaded + blocked.len();
        if failed > 0 {
            return Err(LoaderError::generic(format!(
                "{} of {} stored {} failed to load",
                failed,
                total + blocked.len(),
                kind.plural()
            )));
        }
        Ok(loaded)
    }

    /// Replays all stored artifacts, dependencies first.
    pub async fn load_all(&self) -> Result<(), LoaderError> {
        let results = [
            self.load_stored::<TransformationRecord>().await,
            self.load_stored::<ConditionRecord>().await,
            self.load_stored::<FeatureRecord>().await,
            self.load_stored::<ParticleRecord>().await,
        ];
        let errors: Vec<String> = results
            .into_iter()
            .filter_map(Result::err)
            .map(|e| e.message)
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(LoaderError::generic(errors.join("; ")))
        }
    }
}
