//! Sampling particles through the on-chain runner.

use crate::codec::WORD_SIZE;
use crate::codec::decode::{
    DecodeError, decode_string, decode_uint32_array, read_bytes, read_offset, read_size,
};
use crate::codec::encode::AbiBuilder;
use crate::core::errors::{PtError, PtErrorKind};
use crate::core::execute::{ExecuteRequest, Samples};
use crate::engine::Engine;
use crate::engine::errors::{AccountError, EngineError};
use crate::types::address::Address;
use crate::{debug, error};
use thiserror::Error;

pub const MAX_SAMPLES_COUNT: u32 = 65536;

const GEN_SIGNATURE: &str = "gen(string,uint32,(uint32,uint32)[])";

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("samples_count {0} is too large (max {MAX_SAMPLES_COUNT})")]
    TooManySamples(u32),
    #[error("runner is not deployed")]
    NotBootstrapped,
    #[error("account setup failed: {0}")]
    Account(#[from] AccountError),
    #[error("runner reverted with {0}")]
    Contract(PtError),
    #[error("failed to execute code: {0}")]
    Execute(EngineError),
    #[error("failed to decode samples: {0}")]
    Decode(#[from] DecodeError),
}

impl RunnerError {
    /// Contract error behind the failure, e.g. `CONDITION_NOT_MET`.
    pub fn pt_error_kind(&self) -> Option<PtErrorKind> {
        match self {
            RunnerError::Contract(e) => Some(e.kind),
            _ => None,
        }
    }
}

/// Runs `request` against the bootstrapped runner proxy.
pub async fn generate(
    engine: &Engine,
    sender: Address,
    request: &ExecuteRequest,
) -> Result<Vec<Samples>, RunnerError> {
    let runner = engine.runner_address();
    if runner.is_zero() {
        return Err(RunnerError::NotBootstrapped);
    }
    generate_at(engine, runner, sender, request).await
}

/// Runs `request` against the runner at `runner`.
pub async fn generate_at(
    engine: &Engine,
    runner: Address,
    sender: Address,
    request: &ExecuteRequest,
) -> Result<Vec<Samples>, RunnerError> {
    if request.samples_count > MAX_SAMPLES_COUNT {
        return Err(RunnerError::TooManySamples(request.samples_count));
    }
    let input = AbiBuilder::call(GEN_SIGNATURE)
        .arg(&request.particle_name)
        .arg(&request.samples_count)
        .arg(&request.instance_pairs())
        .finish();

    let gas = engine.gas_limit();
    match engine.add_account(sender, gas).await {
        Ok(()) | Err(AccountError::AlreadyExists(_)) => {}
        Err(e) => return Err(e.into()),
    }
    engine.set_gas(sender, gas).await?;
    engine.set_gas(runner, gas).await?;

    let output = engine
        .execute(sender, runner, input, gas, 0)
        .await
        .map_err(|e| match e.pt_error() {
            Ok(Some(reason)) => RunnerError::Contract(reason),
            _ => RunnerError::Execute(e),
        })?;
    debug!(
        "runner: `{}` returned {} bytes",
        request.particle_name,
        output.len()
    );
    decode_samples(&output)
        .inspect_err(|e| error!("runner: bad output: {}", e))
        .map_err(RunnerError::Decode)
}

/// Decodes the returned `(string path, uint32[] data)[]`.
pub fn decode_samples(buf: &[u8]) -> Result<Vec<Samples>, DecodeError> {
    let array_at = read_offset(buf, 0, 0)?;
    let count = read_size(buf, array_at)?;
    let head = array_at + WORD_SIZE;
    let head_len = count
        .checked_mul(WORD_SIZE)
        .ok_or(DecodeError::Overflow { offset: array_at })?;
    read_bytes(buf, head, head_len)?;

    (0..count)
        .map(|i| {
            let tuple_at = read_offset(buf, head + i * WORD_SIZE, head)?;
            let path_at = read_offset(buf, tuple_at, tuple_at)?;
            let data_at = read_offset(buf, tuple_at + WORD_SIZE, tuple_at)?;
            Ok(Samples {
                path: decode_string(buf, path_at)?,
                data: decode_uint32_array(buf, data_at)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::codec::encode::{AbiEncode, u64_word};
    use crate::core::execute::RunningInstance;
    use crate::engine::Bytecode;
    use crate::utils::test_utils::utils::{owner, returning_init, reverting_init};

    fn encode_samples(samples: &[Samples]) -> Vec<u8> {
        let tuples: Vec<Vec<u8>> = samples
            .iter()
            .map(|s| {
                let path = s.path.encode();
                let mut out = u64_word(2 * WORD_SIZE as u64).to_vec();
                out.extend_from_slice(&u64_word((2 * WORD_SIZE + path.len()) as u64));
                out.extend_from_slice(&path);
                out.extend_from_slice(&s.data.encode());
                out
            })
            .collect();
        let mut out = u64_word(WORD_SIZE as u64).to_vec();
        out.extend_from_slice(&u64_word(samples.len() as u64));
        let mut offset = samples.len() * WORD_SIZE;
        for tuple in &tuples {
            out.extend_from_slice(&u64_word(offset as u64));
            offset += tuple.len();
        }
        for tuple in &tuples {
            out.extend_from_slice(tuple);
        }
        out
    }

    fn samples() -> Vec<Samples> {
        vec![
            Samples {
                path: "Wave".into(),
                data: vec![1, 2, 3],
            },
            Samples {
                path: "Wave/Inner".into(),
                data: vec![],
            },
        ]
    }

    fn request(count: u32) -> ExecuteRequest {
        ExecuteRequest {
            particle_name: "Wave".into(),
            samples_count: count,
            running_instances: vec![RunningInstance {
                start_point: 0,
                transformation_shift: 1,
            }],
        }
    }

    // ========== Decode Tests ==========

    #[test]
    fn decodes_nested_samples() {
        assert_eq!(decode_samples(&encode_samples(&samples())).unwrap(), samples());
        assert_eq!(decode_samples(&encode_samples(&[])).unwrap(), vec![]);
    }

    #[test]
    fn rejects_truncated_output() {
        let blob = encode_samples(&samples());
        assert!(decode_samples(&blob[..blob.len() - 1]).is_err());
        assert!(decode_samples(&[]).is_err());

        let mut huge = u64_word(WORD_SIZE as u64).to_vec();
        huge.extend_from_slice(&u64_word(u64::MAX / 2));
        assert!(decode_samples(&huge).is_err());
    }

    // ========== Execution Tests ==========

    #[tokio::test]
    async fn generate_decodes_runner_output() {
        let engine = Engine::new(&Config::default());
        let runner = engine
            .deploy(
                Bytecode::Hex(returning_init(&encode_samples(&samples()))),
                owner("deployer"),
                Vec::new(),
                1_000_000,
                0,
            )
            .await
            .unwrap();
        let out = generate_at(&engine, runner, owner("alice"), &request(4))
            .await
            .unwrap();
        assert_eq!(out, samples());
        assert_eq!(
            engine.balance(owner("alice")).await.map(|b| b.low_u64()),
            Some(engine.gas_limit())
        );
    }

    #[tokio::test]
    async fn condition_not_met_is_surfaced() {
        let engine = Engine::new(&Config::default());
        let runner = engine
            .deploy(
                Bytecode::Hex(reverting_init(PtErrorKind::ConditionNotMet)),
                owner("deployer"),
                Vec::new(),
                1_000_000,
                0,
            )
            .await
            .unwrap();
        let err = generate_at(&engine, runner, owner("alice"), &request(1))
            .await
            .unwrap_err();
        assert_eq!(err.pt_error_kind(), Some(PtErrorKind::ConditionNotMet));
    }

    #[tokio::test]
    async fn request_limits() {
        let engine = Engine::new(&Config::default());
        assert!(matches!(
            generate(&engine, owner("alice"), &request(1)).await,
            Err(RunnerError::NotBootstrapped)
        ));
        assert!(matches!(
            generate_at(&engine, owner("runner"), owner("alice"), &request(MAX_SAMPLES_COUNT + 1))
                .await,
            Err(RunnerError::TooManySamples(_))
        ));
    }
}
