//! Error taxonomies shared across the crate.
//!
//! [`ChainErrorKind`] classifies failures talking to a chain backend.
//! [`PtErrorKind`] classifies the custom errors raised by the registry
//! contracts; it is recovered from revert data by matching the first four bytes
//! against a table of error selectors.

use crate::codec::decode::{read_bytes32, read_u32};
use crate::types::hash::{Hash, selector};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

/// Failures of a chain interaction, independent of the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChainErrorKind {
    InvalidConfig,
    InvalidInput,
    RpcError,
    RpcMalformed,
    SigningError,
    TransactionReverted,
    Timeout,
}

impl fmt::Display for ChainErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChainErrorKind::InvalidConfig => "INVALID_CONFIG",
            ChainErrorKind::InvalidInput => "INVALID_INPUT",
            ChainErrorKind::RpcError => "RPC_ERROR",
            ChainErrorKind::RpcMalformed => "RPC_MALFORMED",
            ChainErrorKind::SigningError => "SIGNING_ERROR",
            ChainErrorKind::TransactionReverted => "TRANSACTION_REVERTED",
            ChainErrorKind::Timeout => "TIMEOUT",
        };
        f.write_str(s)
    }
}

/// Custom errors raised by the registry contracts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PtErrorKind {
    InvalidInput,
    ParticleAlreadyRegistered,
    ParticleMissing,
    ParticleDimensionsMismatch,
    FeatureAlreadyRegistered,
    FeatureMissing,
    TransformationAlreadyRegistered,
    TransformationArgumentsMismatch,
    TransformationMissing,
    ConditionAlreadyRegistered,
    ConditionArgumentsMismatch,
    ConditionMissing,
    RegistryError,
    ConditionNotMet,
}

impl PtErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PtErrorKind::InvalidInput => "INVALID_INPUT",
            PtErrorKind::ParticleAlreadyRegistered => "PARTICLE_ALREADY_REGISTERED",
            PtErrorKind::ParticleMissing => "PARTICLE_MISSING",
            PtErrorKind::ParticleDimensionsMismatch => "PARTICLE_DIMENSIONS_MISMATCH",
            PtErrorKind::FeatureAlreadyRegistered => "FEATURE_ALREADY_REGISTERED",
            PtErrorKind::FeatureMissing => "FEATURE_MISSING",
            PtErrorKind::TransformationAlreadyRegistered => "TRANSFORMATION_ALREADY_REGISTERED",
            PtErrorKind::TransformationArgumentsMismatch => "TRANSFORMATION_ARGUMENTS_MISMATCH",
            PtErrorKind::TransformationMissing => "TRANSFORMATION_MISSING",
            PtErrorKind::ConditionAlreadyRegistered => "CONDITION_ALREADY_REGISTERED",
            PtErrorKind::ConditionArgumentsMismatch => "CONDITION_ARGUMENTS_MISMATCH",
            PtErrorKind::ConditionMissing => "CONDITION_MISSING",
            PtErrorKind::RegistryError => "REGISTRY_ERROR",
            PtErrorKind::ConditionNotMet => "CONDITION_NOT_MET",
        }
    }
}

impl fmt::Display for PtErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error signatures as declared by the contracts.
const ERROR_SIGNATURES: [(&str, PtErrorKind); 13] = [
    ("ParticleAlreadyRegistered(bytes32)", PtErrorKind::ParticleAlreadyRegistered),
    ("ParticleMissing(bytes32)", PtErrorKind::ParticleMissing),
    ("ParticleDimensionsMismatch(bytes32)", PtErrorKind::ParticleDimensionsMismatch),
    ("FeatureAlreadyRegistered(bytes32)", PtErrorKind::FeatureAlreadyRegistered),
    ("FeatureMissing(bytes32)", PtErrorKind::FeatureMissing),
    ("TransformationAlreadyRegistered(bytes32)", PtErrorKind::TransformationAlreadyRegistered),
    ("TransformationArgumentsMismatch(bytes32)", PtErrorKind::TransformationArgumentsMismatch),
    ("TransformationMissing(bytes32)", PtErrorKind::TransformationMissing),
    ("ConditionAlreadyRegistered(bytes32)", PtErrorKind::ConditionAlreadyRegistered),
    ("ConditionArgumentsMismatch(bytes32)", PtErrorKind::ConditionArgumentsMismatch),
    ("ConditionMissing(bytes32)", PtErrorKind::ConditionMissing),
    ("RegistryError(uint32)", PtErrorKind::RegistryError),
    ("ConditionNotMet(bytes32)", PtErrorKind::ConditionNotMet),
];

static SELECTORS: LazyLock<HashMap<[u8; 4], PtErrorKind>> = LazyLock::new(|| {
    ERROR_SIGNATURES
        .iter()
        .map(|(signature, kind)| (selector(signature), *kind))
        .collect()
});

/// Selector of the custom error behind `kind`, if the contracts declare one.
pub fn error_selector(kind: PtErrorKind) -> Option<[u8; 4]> {
    ERROR_SIGNATURES
        .iter()
        .find(|(_, k)| *k == kind)
        .map(|(signature, _)| selector(signature))
}

/// A decoded contract error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PtError {
    pub kind: PtErrorKind,
    /// `bytes32` argument, usually the short name of the offending artifact.
    pub name: Option<Hash>,
    /// `uint32` argument of `RegistryError`.
    pub code: Option<u32>,
}

impl fmt::Display for PtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(name) = self.name.as_ref().and_then(Hash::as_short_string) {
            write!(f, "({})", name)?;
        }
        if let Some(code) = self.code {
            write!(f, "({})", code)?;
        }
        Ok(())
    }
}

/// Revert data that could not be matched.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RevertParseError {
    #[error("revert data shorter than a selector")]
    InvalidValue,
    #[error("unknown error selector 0x{}", hex::encode(.0))]
    Unknown([u8; 4]),
}

/// Decodes revert data into a contract error.
///
/// Empty output means the frame failed without data and yields `Ok(None)`.
pub fn decode_revert(output: &[u8]) -> Result<Option<PtError>, RevertParseError> {
    if output.is_empty() {
        return Ok(None);
    }
    let Some(head) = output.get(..4) else {
        return Err(RevertParseError::InvalidValue);
    };
    let mut sel = [0u8; 4];
    sel.copy_from_slice(head);
    let kind = *SELECTORS.get(&sel).ok_or(RevertParseError::Unknown(sel))?;
    let (name, code) = match kind {
        PtErrorKind::RegistryError => (None, read_u32(output, 4).ok()),
        _ => (read_bytes32(output, 4).ok(), None),
    };
    Ok(Some(PtError { kind, name, code }))
}
