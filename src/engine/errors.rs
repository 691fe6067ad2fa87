use crate::core::errors::{ChainErrorKind, PtError, RevertParseError, decode_revert};
use crate::types::bytes::Bytes;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::vm::Status;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeployErrorKind {
    InvalidBytecode,
    Revert,
    OutOfGas,
    Failure,
    AddressCollision,
    InsufficientBalance,
    Io,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecuteErrorKind {
    InvalidInput,
    Revert,
    OutOfGas,
    Failure,
    InsufficientBalance,
}

impl fmt::Display for DeployErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeployErrorKind::InvalidBytecode => "INVALID_BYTECODE",
            DeployErrorKind::Revert => "REVERT",
            DeployErrorKind::OutOfGas => "OUT_OF_GAS",
            DeployErrorKind::Failure => "FAILURE",
            DeployErrorKind::AddressCollision => "ADDRESS_COLLISION",
            DeployErrorKind::InsufficientBalance => "INSUFFICIENT_BALANCE",
            DeployErrorKind::Io => "IO",
        };
        f.write_str(s)
    }
}

impl fmt::Display for ExecuteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecuteErrorKind::InvalidInput => "INVALID_INPUT",
            ExecuteErrorKind::Revert => "REVERT",
            ExecuteErrorKind::OutOfGas => "OUT_OF_GAS",
            ExecuteErrorKind::Failure => "FAILURE",
            ExecuteErrorKind::InsufficientBalance => "INSUFFICIENT_BALANCE",
        };
        f.write_str(s)
    }
}

/// Failure of a deploy or execute request.
///
/// `output` holds the raw revert data so callers can decode a contract error.
#[derive(Clone, Debug, Error)]
pub enum EngineError {
    #[error("deploy failed ({kind}): {message}")]
    Deploy {
        kind: DeployErrorKind,
        message: String,
        output: Bytes,
    },
    #[error("execute failed ({kind}): {message}")]
    Execute {
        kind: ExecuteErrorKind,
        message: String,
        output: Bytes,
    },
    /// The engine task has stopped.
    #[error("engine is not running")]
    Closed,
}

impl EngineError {
    pub(crate) fn deploy(kind: DeployErrorKind, message: impl Into<String>) -> Self {
        EngineError::Deploy {
            kind,
            message: message.into(),
            output: Bytes::default(),
        }
    }

    pub(crate) fn execute(kind: ExecuteErrorKind, message: impl Into<String>) -> Self {
        EngineError::Execute {
            kind,
            message: message.into(),
            output: Bytes::default(),
        }
    }

    /// Maps an unsuccessful creation status.
    pub(crate) fn from_deploy_status(status: Status, output: Bytes) -> Self {
        let (kind, message) = match status {
            Status::Success => (DeployErrorKind::Failure, "unexpected success".to_string()),
            Status::Revert => (DeployErrorKind::Revert, "constructor reverted".to_string()),
            Status::Failure(err) => {
                let kind = match err {
                    VMError::OutOfGas { .. } => DeployErrorKind::OutOfGas,
                    VMError::AddressCollision { .. } => DeployErrorKind::AddressCollision,
                    VMError::InsufficientBalance => DeployErrorKind::InsufficientBalance,
                    _ => DeployErrorKind::Failure,
                };
                (kind, err.to_string())
            }
        };
        EngineError::Deploy {
            kind,
            message,
            output,
        }
    }

    /// Maps an unsuccessful call status.
    pub(crate) fn from_execute_status(status: Status, output: Bytes) -> Self {
        let (kind, message) = match status {
            Status::Success => (ExecuteErrorKind::Failure, "unexpected success".to_string()),
            Status::Revert => (ExecuteErrorKind::Revert, "call reverted".to_string()),
            Status::Failure(err) => {
                let kind = match err {
                    VMError::OutOfGas { .. } => ExecuteErrorKind::OutOfGas,
                    VMError::InsufficientBalance => ExecuteErrorKind::InsufficientBalance,
                    _ => ExecuteErrorKind::Failure,
                };
                (kind, err.to_string())
            }
        };
        EngineError::Execute {
            kind,
            message,
            output,
        }
    }

    /// Raw returned bytes, empty if there were none.
    pub fn output(&self) -> &[u8] {
        match self {
            EngineError::Deploy { output, .. } | EngineError::Execute { output, .. } => output,
            EngineError::Closed => &[],
        }
    }

    /// Decodes the returned bytes as a contract error.
    pub fn pt_error(&self) -> Result<Option<PtError>, RevertParseError> {
        decode_revert(self.output())
    }

    /// Class of the failure in the backend-independent taxonomy.
    pub fn chain_kind(&self) -> ChainErrorKind {
        match self {
            EngineError::Deploy {
                kind: DeployErrorKind::InvalidBytecode,
                ..
            }
            | EngineError::Execute {
                kind: ExecuteErrorKind::InvalidInput,
                ..
            } => ChainErrorKind::InvalidInput,
            EngineError::Deploy {
                kind: DeployErrorKind::Io,
                ..
            }
            | EngineError::Closed => ChainErrorKind::RpcError,
            _ => ChainErrorKind::TransactionReverted,
        }
    }
}

/// Account bookkeeping failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("account {0} already exists")]
    AlreadyExists(String),
    #[error("account {0} does not exist")]
    Missing(String),
    #[error("engine is not running")]
    Closed,
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("source file {0} does not exist")]
    SourceMissing(PathBuf),
    #[error("an include path requires a base path")]
    IncludeWithoutBase,
    #[error("failed to start compiler: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("compiler exited with code {code:?}")]
    Failed { code: Option<i32> },
    #[error("engine is not running")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::PtErrorKind;
    use crate::core::errors::tests::revert_data;

    #[test]
    fn status_mapping() {
        let err = EngineError::from_deploy_status(
            Status::Failure(VMError::AddressCollision {
                address: "0x00".into(),
            }),
            Bytes::default(),
        );
        assert!(matches!(
            err,
            EngineError::Deploy {
                kind: DeployErrorKind::AddressCollision,
                ..
            }
        ));

        let err = EngineError::from_execute_status(
            Status::Failure(VMError::OutOfGas {
                needed: 3,
                remaining: 1,
            }),
            Bytes::default(),
        );
        assert!(matches!(
            err,
            EngineError::Execute {
                kind: ExecuteErrorKind::OutOfGas,
                ..
            }
        ));
    }

    #[test]
    fn chain_kind_mapping() {
        let bad_code = EngineError::deploy(DeployErrorKind::InvalidBytecode, "zz");
        assert_eq!(bad_code.chain_kind(), ChainErrorKind::InvalidInput);
        let zero = EngineError::execute(ExecuteErrorKind::InvalidInput, "zero recipient");
        assert_eq!(zero.chain_kind(), ChainErrorKind::InvalidInput);
        let reverted = EngineError::from_execute_status(Status::Revert, Bytes::default());
        assert_eq!(reverted.chain_kind(), ChainErrorKind::TransactionReverted);
        let missing = EngineError::deploy(DeployErrorKind::Io, "no such file");
        assert_eq!(missing.chain_kind(), ChainErrorKind::RpcError);
        assert_eq!(EngineError::Closed.chain_kind(), ChainErrorKind::RpcError);
    }

    #[test]
    fn revert_output_decodes() {
        let output = Bytes::from(revert_data(PtErrorKind::FeatureAlreadyRegistered, "F"));
        let err = EngineError::from_deploy_status(Status::Revert, output);
        assert_eq!(
            err.pt_error().unwrap().map(|e| e.kind),
            Some(PtErrorKind::FeatureAlreadyRegistered)
        );
    }
}
