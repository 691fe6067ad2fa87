//! VM Engine: the single owner of the embedded machine.
//!
//! [`Engine`] is a cheap, cloneable handle. Every operation is sent as a
//! [`Command`] to one background task that owns the world state, so deploys,
//! calls, compilations and account changes are totally ordered. Each command
//! carries a oneshot channel for its reply.

pub mod compiler;
pub mod errors;

use crate::codec::encode::AbiBuilder;
use crate::config::Config;
use crate::types::address::Address;
use crate::types::bytes::Bytes;
use crate::types::hash::Hash;
use crate::types::u256::U256;
use crate::virtual_machine::state::{Account, MemoryState, State};
use crate::virtual_machine::vm::{Env, Message, VM};
use crate::{debug, error, info, warn};
use errors::{AccountError, CompileError, DeployErrorKind, EngineError, ExecuteErrorKind};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, OnceLock};
use thiserror::Error;
use tokio::sync::mpsc::{Receiver, Sender, channel};
use tokio::sync::oneshot;

/// Salt of every deterministic deployment: Keccak-256 of `message_salt_42`.
pub static DEPLOY_SALT: LazyLock<U256> =
    LazyLock::new(|| U256::from(Hash::digest(b"message_salt_42")));

/// Native stack of the engine thread. Nested calls recurse in the
/// interpreter, so it must hold
/// [`MAX_CALL_DEPTH`](crate::virtual_machine::vm::MAX_CALL_DEPTH) frames.
pub const ENGINE_STACK_SIZE: usize = 512 * 1024 * 1024;

/// Account that deploys the bootstrap contracts.
pub fn genesis_address() -> Address {
    Address::from_tag(b"genesis")
}

pub fn console_address() -> Address {
    Address::from_tag(b"console.log")
}

/// Where init code comes from.
#[derive(Clone, Debug)]
pub enum Bytecode {
    /// File holding hex init code, as written by the compiler.
    Path(PathBuf),
    /// Hex init code.
    Hex(String),
}

/// Stable addresses recorded by bootstrap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryPoints {
    pub registry: Address,
    pub runner: Address,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("engine already bootstrapped")]
    AlreadyBootstrapped,
    #[error("failed to compile {contract}: {source}")]
    Compile {
        contract: &'static str,
        source: CompileError,
    },
    #[error("failed to deploy {contract}: {source}")]
    Deploy {
        contract: &'static str,
        source: EngineError,
    },
}

/// Requests processed by the engine task.
enum Command {
    AddAccount {
        address: Address,
        balance: u64,
        done: oneshot::Sender<Result<(), AccountError>>,
    },
    SetGas {
        address: Address,
        amount: u64,
        done: oneshot::Sender<Result<(), AccountError>>,
    },
    Balance {
        address: Address,
        done: oneshot::Sender<Option<U256>>,
    },
    Compile {
        source: PathBuf,
        out_dir: PathBuf,
        base_path: Option<PathBuf>,
        include_path: Option<PathBuf>,
        done: oneshot::Sender<Result<(), CompileError>>,
    },
    Deploy {
        code: Bytecode,
        sender: Address,
        constructor_args: Vec<u8>,
        gas_limit: u64,
        value: u64,
        done: oneshot::Sender<Result<Address, EngineError>>,
    },
    Execute {
        sender: Address,
        recipient: Address,
        input: Vec<u8>,
        gas_limit: u64,
        value: u64,
        done: oneshot::Sender<Result<Bytes, EngineError>>,
    },
}

/// Handle to the engine task.
#[derive(Clone)]
pub struct Engine {
    command_tx: Sender<Command>,
    entry_points: Arc<OnceLock<EntryPoints>>,
    contracts_dir: PathBuf,
    node_modules_dir: PathBuf,
    out_dir: PathBuf,
    gas_limit: u64,
}

impl Engine {
    /// Starts the engine task with genesis and console accounts funded.
    ///
    /// The task runs on its own thread with a current-thread runtime and an
    /// [`ENGINE_STACK_SIZE`] stack. If the thread cannot start, every command
    /// fails with a `Closed` error. Contracts are not deployed until
    /// [`bootstrap`](Self::bootstrap).
    pub fn new(config: &Config) -> Self {
        let mut state = MemoryState::new();
        for address in [genesis_address(), console_address()] {
            state.set_account(
                address,
                Some(Account::with_balance(U256::from_u64(config.default_gas_limit))),
            );
        }
        let env = Env {
            chain_id: config.evm_chain_id,
            gas_limit: config.default_gas_limit,
            ..Env::default()
        };

        let (command_tx, command_rx) = channel(64);
        let task = EngineTask {
            state,
            vm: VM::new(env),
            solc_path: config.solc_path.clone(),
            command_rx,
        };
        let spawned = std::thread::Builder::new()
            .name("dcn-engine".into())
            .stack_size(ENGINE_STACK_SIZE)
            .spawn(move || {
                match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime.block_on(task.run()),
                    Err(e) => error!("Failed to build the engine runtime: {}", e),
                }
            });
        if let Err(e) = spawned {
            error!("Failed to start the engine thread: {}", e);
        }

        Self {
            command_tx,
            entry_points: Arc::new(OnceLock::new()),
            contracts_dir: config.contracts_dir(),
            node_modules_dir: config.node_modules_dir(),
            out_dir: config.out_dir(),
            gas_limit: config.default_gas_limit,
        }
    }

    /// Gas used for deployments and top-ups when the caller has no better value.
    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    /// Registry proxy address, zero before bootstrap.
    pub fn registry_address(&self) -> Address {
        self.entry_points
            .get()
            .map(|e| e.registry)
            .unwrap_or_default()
    }

    /// Runner proxy address, zero before bootstrap.
    pub fn runner_address(&self) -> Address {
        self.entry_points.get().map(|e| e.runner).unwrap_or_default()
    }

    /// Creates and funds an account. Fails if it already exists.
    pub async fn add_account(&self, address: Address, balance: u64) -> Result<(), AccountError> {
        let (done, rx) = oneshot::channel();
        self.send(Command::AddAccount {
            address,
            balance,
            done,
        })
        .await;
        rx.await.unwrap_or(Err(AccountError::Closed))
    }

    /// Overwrites the balance of an existing account.
    pub async fn set_gas(&self, address: Address, amount: u64) -> Result<(), AccountError> {
        let (done, rx) = oneshot::channel();
        self.send(Command::SetGas {
            address,
            amount,
            done,
        })
        .await;
        rx.await.unwrap_or(Err(AccountError::Closed))
    }

    /// Balance of `address`, `None` if the account does not exist.
    pub async fn balance(&self, address: Address) -> Option<U256> {
        let (done, rx) = oneshot::channel();
        self.send(Command::Balance { address, done }).await;
        rx.await.unwrap_or(None)
    }

    /// Compiles `source` into `out_dir` with the configured compiler.
    pub async fn compile(
        &self,
        source: &Path,
        out_dir: &Path,
        base_path: Option<&Path>,
        include_path: Option<&Path>,
    ) -> Result<(), CompileError> {
        let (done, rx) = oneshot::channel();
        self.send(Command::Compile {
            source: source.to_path_buf(),
            out_dir: out_dir.to_path_buf(),
            base_path: base_path.map(Path::to_path_buf),
            include_path: include_path.map(Path::to_path_buf),
            done,
        })
        .await;
        rx.await.unwrap_or(Err(CompileError::Closed))
    }

    /// Deploys `code` followed by `constructor_args` with the fixed salt.
    pub async fn deploy(
        &self,
        code: Bytecode,
        sender: Address,
        constructor_args: Vec<u8>,
        gas_limit: u64,
        value: u64,
    ) -> Result<Address, EngineError> {
        let (done, rx) = oneshot::channel();
        self.send(Command::Deploy {
            code,
            sender,
            constructor_args,
            gas_limit,
            value,
            done,
        })
        .await;
        rx.await.unwrap_or(Err(EngineError::Closed))
    }

    /// Calls `recipient` and returns its output.
    ///
    /// The zero address is rejected here: creations go through
    /// [`deploy`](Self::deploy).
    pub async fn execute(
        &self,
        sender: Address,
        recipient: Address,
        input: Vec<u8>,
        gas_limit: u64,
        value: u64,
    ) -> Result<Bytes, EngineError> {
        if recipient.is_zero() {
            warn!("execute: rejected call to the zero address from {}", sender);
            return Err(EngineError::execute(
                ExecuteErrorKind::InvalidInput,
                "recipient is the zero address",
            ));
        }
        let (done, rx) = oneshot::channel();
        self.send(Command::Execute {
            sender,
            recipient,
            input,
            gas_limit,
            value,
            done,
        })
        .await;
        rx.await.unwrap_or(Err(EngineError::Closed))
    }

    /// Compiles and deploys the registry and runner, each behind a proxy.
    pub async fn bootstrap(&self) -> Result<EntryPoints, BootstrapError> {
        if self.entry_points.get().is_some() {
            return Err(BootstrapError::AlreadyBootstrapped);
        }
        let contracts = self.contracts_dir.clone();
        let node_modules = self.node_modules_dir.clone();
        let out = self.out_dir.clone();
        let proxy_out = out.join("proxy");
        let genesis = genesis_address();

        let build = |contract: &'static str, source: PathBuf, out_dir: PathBuf| {
            let contracts = contracts.clone();
            let node_modules = node_modules.clone();
            async move {
                self.compile(&source, &out_dir, Some(&contracts), Some(&node_modules))
                    .await
                    .map_err(|source| BootstrapError::Compile { contract, source })
            }
        };
        let deploy = |contract: &'static str, bin: PathBuf, args: Vec<u8>| async move {
            self.deploy(Bytecode::Path(bin), genesis, args, self.gas_limit, 0)
                .await
                .map_err(|source| BootstrapError::Deploy { contract, source })
        };

        build(
            "RegistryBase",
            contracts.join("registry").join("RegistryBase.sol"),
            out.join("registry"),
        )
        .await?;
        build(
            "PTRegistryProxy",
            contracts.join("proxy").join("PTRegistryProxy.sol"),
            proxy_out.clone(),
        )
        .await?;
        let registry_impl = deploy(
            "RegistryBase",
            out.join("registry").join("RegistryBase.bin"),
            Vec::new(),
        )
        .await?;
        info!("Registry implementation address: {}", registry_impl);
        let registry = deploy(
            "PTRegistryProxy",
            proxy_out.join("PTRegistryProxy.bin"),
            AbiBuilder::new().arg(&registry_impl).finish(),
        )
        .await?;
        info!("Registry proxy address: {}", registry);

        build(
            "Runner",
            contracts.join("runner").join("Runner.sol"),
            out.join("runner"),
        )
        .await?;
        build(
            "PTContractProxy",
            contracts.join("proxy").join("PTContractProxy.sol"),
            proxy_out.clone(),
        )
        .await?;
        let runner_impl = deploy(
            "Runner",
            out.join("runner").join("Runner.bin"),
            Vec::new(),
        )
        .await?;
        info!("Runner implementation address: {}", runner_impl);
        let runner = deploy(
            "PTContractProxy",
            proxy_out.join("PTContractProxy.bin"),
            AbiBuilder::new().arg(&runner_impl).arg(&registry).finish(),
        )
        .await?;
        info!("Runner proxy address: {}", runner);

        let entry_points = EntryPoints { registry, runner };
        self.entry_points
            .set(entry_points)
            .map_err(|_| BootstrapError::AlreadyBootstrapped)?;
        Ok(entry_points)
    }

    async fn send(&self, command: Command) {
        if self.command_tx.send(command).await.is_err() {
            error!("engine: command channel closed");
        }
    }
}

/// Parses hex init code, tolerating surrounding whitespace and a `0x` prefix.
pub fn parse_bytecode(text: &str) -> Result<Vec<u8>, EngineError> {
    let text = text.trim();
    let digits = text.strip_prefix("0x").unwrap_or(text);
    let code = hex::decode(digits).map_err(|e| {
        EngineError::deploy(
            DeployErrorKind::InvalidBytecode,
            format!("cannot parse bytecode: {}", e),
        )
    })?;
    if code.is_empty() {
        return Err(EngineError::deploy(
            DeployErrorKind::InvalidBytecode,
            "empty bytecode",
        ));
    }
    Ok(code)
}

/// Background task owning the world state.
struct EngineTask {
    state: MemoryState,
    vm: VM,
    solc_path: PathBuf,
    command_rx: Receiver<Command>,
}

impl EngineTask {
    /// Processes commands one at a time until every handle is dropped.
    async fn run(mut self) {
        while let Some(command) = self.command_rx.recv().await {
            self.handle(command).await;
        }
        debug!("engine: all handles dropped, stopping");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::AddAccount {
                address,
                balance,
                done,
            } => {
                let _ = done.send(self.add_account(address, balance));
            }
            Command::SetGas {
                address,
                amount,
                done,
            } => {
                let _ = done.send(self.set_gas(address, amount));
            }
            Command::Balance { address, done } => {
                let _ = done.send(self.state.account(&address).map(|a| a.balance));
            }
            Command::Compile {
                source,
                out_dir,
                base_path,
                include_path,
                done,
            } => {
                let result = compiler::compile(
                    &self.solc_path,
                    &source,
                    &out_dir,
                    base_path.as_deref(),
                    include_path.as_deref(),
                )
                .await;
                let _ = done.send(result);
            }
            Command::Deploy {
                code,
                sender,
                constructor_args,
                gas_limit,
                value,
                done,
            } => {
                let result = self
                    .deploy(code, sender, constructor_args, gas_limit, value)
                    .await;
                let _ = done.send(result);
            }
            Command::Execute {
                sender,
                recipient,
                input,
                gas_limit,
                value,
                done,
            } => {
                let _ = done.send(self.execute(sender, recipient, input, gas_limit, value));
            }
        }
    }

    fn add_account(&mut self, address: Address, balance: u64) -> Result<(), AccountError> {
        if self.state.contains(&address) {
            warn!("addAccount: account {} already exists", address);
            return Err(AccountError::AlreadyExists(address.to_string()));
        }
        self.state.set_account(
            address,
            Some(Account::with_balance(U256::from_u64(balance))),
        );
        Ok(())
    }

    fn set_gas(&mut self, address: Address, amount: u64) -> Result<(), AccountError> {
        let Some(mut account) = self.state.account(&address) else {
            warn!("setGas: account {} does not exist", address);
            return Err(AccountError::Missing(address.to_string()));
        };
        account.balance = U256::from_u64(amount);
        self.state.set_account(address, Some(account));
        Ok(())
    }

    async fn deploy(
        &mut self,
        code: Bytecode,
        sender: Address,
        constructor_args: Vec<u8>,
        gas_limit: u64,
        value: u64,
    ) -> Result<Address, EngineError> {
        let text = match code {
            Bytecode::Hex(text) => text,
            Bytecode::Path(path) => tokio::fs::read_to_string(&path).await.map_err(|e| {
                error!("deploy: cannot read {}: {}", path.display(), e);
                EngineError::deploy(
                    DeployErrorKind::Io,
                    format!("cannot read {}: {}", path.display(), e),
                )
            })?,
        };
        let mut input = parse_bytecode(&text)?;
        if !constructor_args.is_empty() {
            debug!("deploy: constructor args {}", hex::encode(&constructor_args));
        }
        input.extend_from_slice(&constructor_args);

        let msg = Message::create2(
            sender,
            Bytes::from(input),
            *DEPLOY_SALT,
            gas_limit,
            U256::from_u64(value),
        );
        let result = self.vm.transact(&mut self.state, msg);
        if !result.is_success() {
            let err = EngineError::from_deploy_status(result.status, result.output);
            error!(
                "Failed to deploy contract: {} output=0x{}",
                err,
                hex::encode(err.output())
            );
            return Err(err);
        }
        debug!(
            "deploy: gas left {}, used {}",
            result.gas_left,
            result.profile.total()
        );
        result.create_address.ok_or_else(|| {
            EngineError::deploy(DeployErrorKind::Failure, "creation returned no address")
        })
    }

    fn execute(
        &mut self,
        sender: Address,
        recipient: Address,
        input: Vec<u8>,
        gas_limit: u64,
        value: u64,
    ) -> Result<Bytes, EngineError> {
        let msg = Message::call(
            sender,
            recipient,
            Bytes::from(input),
            gas_limit,
            U256::from_u64(value),
        );
        let result = self.vm.transact(&mut self.state, msg);
        if !result.is_success() {
            let err = EngineError::from_execute_status(result.status, result.output);
            error!(
                "Failed to execute call to {}: {} output=0x{}",
                recipient,
                err,
                hex::encode(err.output())
            );
            return Err(err);
        }
        Ok(result.output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::PtErrorKind;
    use crate::utils::test_utils::utils::{
        OWNER_INIT, owner, returning_init, revert_init, runtime_init, test_config,
    };
    use crate::virtual_machine::vm::create2_address;
    use tempfile::TempDir;

    fn engine() -> Engine {
        Engine::new(&Config::default())
    }

    // ========== Account Tests ==========

    #[tokio::test]
    async fn genesis_and_console_are_funded() {
        let engine = engine();
        let funded = Some(U256::from_u64(engine.gas_limit()));
        assert_eq!(engine.balance(genesis_address()).await, funded);
        assert_eq!(engine.balance(console_address()).await, funded);
        assert_eq!(&console_address().0[9..], b"console.log");
        assert_eq!(engine.registry_address(), Address::zero());
    }

    #[tokio::test]
    async fn add_account_only_once() {
        let engine = engine();
        let alice = owner("alice");
        engine.add_account(alice, 10).await.unwrap();
        assert_eq!(
            engine.add_account(alice, 99).await,
            Err(AccountError::AlreadyExists(alice.to_string()))
        );
        assert_eq!(engine.balance(alice).await, Some(U256::from_u64(10)));
    }

    #[tokio::test]
    async fn set_gas_requires_account() {
        let engine = engine();
        let bob = owner("bob");
        assert!(matches!(
            engine.set_gas(bob, 5).await,
            Err(AccountError::Missing(_))
        ));
        engine.add_account(bob, 1).await.unwrap();
        engine.set_gas(bob, 5).await.unwrap();
        assert_eq!(engine.balance(bob).await, Some(U256::from_u64(5)));
    }

    // ========== Deploy Tests ==========

    #[tokio::test]
    async fn deploy_uses_fixed_salt() {
        let engine = engine();
        let sender = owner("alice");
        let args = AbiBuilder::new().arg(&owner("registry")).finish();
        let address = engine
            .deploy(
                Bytecode::Hex(OWNER_INIT.into()),
                sender,
                args.clone(),
                1_000_000,
                0,
            )
            .await
            .unwrap();
        let mut init = hex::decode(OWNER_INIT).unwrap();
        init.extend_from_slice(&args);
        assert_eq!(address, create2_address(&sender, *DEPLOY_SALT, &init));

        let output = engine
            .execute(owner("registry"), address, Vec::new(), 1_000_000, 0)
            .await
            .unwrap();
        assert_eq!(&output[12..32], sender.as_slice());
    }

    #[tokio::test]
    async fn same_code_same_sender_collides() {
        let engine = engine();
        let sender = owner("alice");
        let deploy = || {
            engine.deploy(
                Bytecode::Hex(OWNER_INIT.into()),
                sender,
                Vec::new(),
                1_000_000,
                0,
            )
        };
        deploy().await.unwrap();
        let err = deploy().await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Deploy {
                kind: DeployErrorKind::AddressCollision,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn revert_keeps_output() {
        let engine = engine();
        let err = engine
            .deploy(
                Bytecode::Hex(revert_init(PtErrorKind::ConditionAlreadyRegistered)),
                owner("alice"),
                Vec::new(),
                1_000_000,
                0,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Deploy {
                kind: DeployErrorKind::Revert,
                ..
            }
        ));
        assert_eq!(
            err.pt_error().unwrap().unwrap().kind,
            PtErrorKind::ConditionAlreadyRegistered
        );
    }

    #[tokio::test]
    async fn bad_bytecode_is_rejected() {
        let engine = engine();
        for text in ["zz", "", "   \n"] {
            let err = engine
                .deploy(Bytecode::Hex(text.into()), owner("a"), Vec::new(), 1_000_000, 0)
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                EngineError::Deploy {
                    kind: DeployErrorKind::InvalidBytecode,
                    ..
                }
            ));
        }
        let err = engine
            .deploy(
                Bytecode::Path(PathBuf::from("/nonexistent/A.bin")),
                owner("a"),
                Vec::new(),
                1_000_000,
                0,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Deploy {
                kind: DeployErrorKind::Io,
                ..
            }
        ));
    }

    #[test]
    fn parse_bytecode_accepts_prefix_and_newline() {
        assert_eq!(parse_bytecode("0x6001\n").unwrap(), vec![0x60, 0x01]);
    }

    // ========== Execute Tests ==========

    #[tokio::test]
    async fn zero_recipient_is_invalid_input() {
        let engine = engine();
        let err = engine
            .execute(owner("alice"), Address::zero(), vec![1, 2, 3], 1_000_000, 0)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Execute {
                kind: ExecuteErrorKind::InvalidInput,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn execute_returns_output() {
        let engine = engine();
        let blob = b"hello world".to_vec();
        let address = engine
            .deploy(
                Bytecode::Hex(returning_init(&blob)),
                genesis_address(),
                Vec::new(),
                1_000_000,
                0,
            )
            .await
            .unwrap();
        let output = engine
            .execute(owner("x"), address, Vec::new(), 1_000_000, 0)
            .await
            .unwrap();
        assert_eq!(output.to_vec(), blob);
    }

    #[tokio::test]
    async fn execute_out_of_gas() {
        let engine = engine();
        let address = engine
            .deploy(
                Bytecode::Hex(OWNER_INIT.into()),
                genesis_address(),
                Vec::new(),
                1_000_000,
                0,
            )
            .await
            .unwrap();
        let err = engine
            .execute(owner("x"), address, Vec::new(), 21_010, 0)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Execute {
                kind: ExecuteErrorKind::OutOfGas,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn self_calling_contract_returns() {
        let engine = engine();
        // Calls its own address with all remaining gas, then stops.
        let runtime = hex::decode("5f5f5f5f5f305af100").unwrap();
        let address = engine
            .deploy(
                Bytecode::Hex(runtime_init(&runtime)),
                genesis_address(),
                Vec::new(),
                1_000_000,
                0,
            )
            .await
            .unwrap();
        let output = engine
            .execute(owner("attacker"), address, Vec::new(), 30_000_000, 0)
            .await
            .unwrap();
        assert!(output.is_empty());
        assert!(engine.balance(genesis_address()).await.is_some());
    }

    // ========== Bootstrap Tests ==========

    #[tokio::test]
    async fn bootstrap_records_proxies() {
        let dir = TempDir::new().unwrap();
        let engine = Engine::new(&test_config(dir.path()));
        let entry = engine.bootstrap().await.unwrap();
        assert!(!entry.registry.is_zero());
        assert!(!entry.runner.is_zero());
        assert_ne!(entry.registry, entry.runner);
        assert_eq!(engine.registry_address(), entry.registry);
        assert_eq!(engine.runner_address(), entry.runner);
        assert!(dir.path().join("pt/out/proxy/PTRegistryProxy.bin").exists());
        assert!(matches!(
            engine.bootstrap().await,
            Err(BootstrapError::AlreadyBootstrapped)
        ));
    }

    #[tokio::test]
    async fn bootstrap_fails_without_sources() {
        let dir = TempDir::new().unwrap();
        let mut config = test_config(dir.path());
        config.pt_path = dir.path().join("missing");
        let engine = Engine::new(&config);
        assert!(matches!(
            engine.bootstrap().await,
            Err(BootstrapError::Compile {
                contract: "RegistryBase",
                source: CompileError::SourceMissing(_)
            })
        ));
    }
}
