//! Core interpreter.
//!
//! Executes Shanghai-revision contract bytecode on a stack of 256-bit words.
//! Every call frame runs against its own [`OverlayState`]; a frame that reverts
//! or fails drops its overlay, a frame that succeeds commits it into the
//! caller's view. All arithmetic wraps modulo 2^256.

use crate::types::address::Address;
use crate::types::bytes::Bytes;
use crate::types::hash::Hash;
use crate::types::u256::U256;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::{Opcode, Opcode as Op};
use crate::virtual_machine::state::{OverlayState, State};
use gas::{Gas, GasCategory, GasProfile};
use memory::Memory;
use stack::Stack;

pub mod gas;
pub mod memory;
pub mod stack;

/// Deepest allowed nesting of calls and creations.
pub const MAX_CALL_DEPTH: usize = 1024;

/// Block-level values visible to contracts.
#[derive(Clone, Debug)]
pub struct Env {
    pub chain_id: u64,
    pub block_number: u64,
    pub timestamp: u64,
    pub gas_limit: u64,
    pub coinbase: Address,
    pub base_fee: U256,
    pub gas_price: U256,
    pub prev_randao: U256,
}

impl Default for Env {
    fn default() -> Self {
        Self {
            chain_id: 1,
            block_number: 1,
            timestamp: 0,
            gas_limit: gas::BLOCK_GAS_LIMIT,
            coinbase: Address::zero(),
            base_fee: U256::ZERO,
            gas_price: U256::ZERO,
            prev_randao: U256::ZERO,
        }
    }
}

/// How a frame was entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallKind {
    Call,
    CallCode,
    DelegateCall,
    StaticCall,
    Create,
    Create2 { salt: U256 },
}

impl CallKind {
    pub fn is_create(&self) -> bool {
        matches!(self, CallKind::Create | CallKind::Create2 { .. })
    }

    /// Whether entering the frame moves `value` from caller to callee.
    fn transfers_value(&self) -> bool {
        matches!(
            self,
            CallKind::Call | CallKind::CallCode | CallKind::Create | CallKind::Create2 { .. }
        )
    }
}

/// Input of one frame.
#[derive(Clone, Debug)]
pub struct Message {
    pub kind: CallKind,
    /// `CALLER` seen by the executed code; the deployer for creations.
    pub caller: Address,
    /// Storage and balance context. Filled in by the interpreter for creations.
    pub address: Address,
    /// Account whose code runs.
    pub code_address: Address,
    pub value: U256,
    /// Call data, or init code for creations.
    pub input: Bytes,
    pub gas: u64,
    pub is_static: bool,
    pub depth: usize,
}

impl Message {
    /// A plain message call.
    pub fn call(caller: Address, to: Address, input: Bytes, gas: u64, value: U256) -> Self {
        Self {
            kind: CallKind::Call,
            caller,
            address: to,
            code_address: to,
            value,
            input,
            gas,
            is_static: false,
            depth: 0,
        }
    }

    /// A salted contract creation.
    pub fn create2(caller: Address, init_code: Bytes, salt: U256, gas: u64, value: U256) -> Self {
        Self {
            kind: CallKind::Create2 { salt },
            caller,
            address: Address::zero(),
            code_address: Address::zero(),
            value,
            input: init_code,
            gas,
            is_static: false,
            depth: 0,
        }
    }
}

/// Event emitted by a `LOGn` instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<Hash>,
    pub data: Bytes,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Success,
    /// `REVERT` executed: state discarded, unused gas returned.
    Revert,
    /// Exceptional halt: state discarded, all gas consumed.
    Failure(VMError),
}

/// Outcome of a transaction or of a nested frame.
#[derive(Clone, Debug)]
pub struct ExecutionResult {
    pub status: Status,
    pub gas_left: u64,
    /// Return or revert data. Empty for successful creations.
    pub output: Bytes,
    pub create_address: Option<Address>,
    pub logs: Vec<Log>,
    /// Gas breakdown; only filled for whole transactions.
    pub profile: GasProfile,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    fn failed(error: VMError, gas_left: u64) -> Self {
        Self {
            status: Status::Failure(error),
            gas_left,
            output: Bytes::default(),
            create_address: None,
            logs: Vec::new(),
            profile: GasProfile::new(),
        }
    }
}

/// Address of a contract created with `CREATE`: the last 20 bytes of the
/// Keccak-256 of the RLP list `[sender, nonce]`.
pub fn create_address(sender: &Address, nonce: u64) -> Address {
    let nonce_bytes = nonce.to_be_bytes();
    let significant = &nonce_bytes[nonce.leading_zeros() as usize / 8..];
    let mut nonce_rlp = Vec::with_capacity(9);
    match significant {
        [] => nonce_rlp.push(0x80),
        [b] if *b < 0x80 => nonce_rlp.push(*b),
        bytes => {
            nonce_rlp.push(0x80 + bytes.len() as u8);
            nonce_rlp.extend_from_slice(bytes);
        }
    }

    let mut h = Hash::keccak();
    h.update(&[0xc0 + (21 + nonce_rlp.len()) as u8, 0x94]);
    h.update(sender.as_slice());
    h.update(&nonce_rlp);
    Address::from_word(&h.finalize().0)
}

/// Address of a contract created with `CREATE2`.
pub fn create2_address(sender: &Address, salt: U256, init_code: &[u8]) -> Address {
    let mut h = Hash::keccak();
    h.update(&[0xff]);
    h.update(sender.as_slice());
    h.update(&salt.to_be_bytes());
    h.update(Hash::digest(init_code).as_slice());
    Address::from_word(&h.finalize().0)
}

/// Bytecode interpreter bound to one block environment.
pub struct VM {
    env: Env,
}

impl VM {
    pub fn new(env: Env) -> Self {
        Self { env }
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Runs one transaction and commits its writes into `state` if it succeeds.
    ///
    /// The intrinsic cost is charged before any code runs. Reverted and failed
    /// transactions leave `state` untouched.
    pub fn transact(&self, state: &mut dyn State, msg: Message) -> ExecutionResult {
        let intrinsic = gas::intrinsic(&msg.input, msg.kind.is_create());
        if msg.gas < intrinsic {
            return ExecutionResult::failed(
                VMError::OutOfGas {
                    needed: intrinsic,
                    remaining: msg.gas,
                },
                0,
            );
        }

        let (result, writes) = {
            let root: &dyn State = &*state;
            let mut interpreter = Interpreter {
                env: &self.env,
                root,
                origin: msg.caller,
                profile: GasProfile::new(),
            };
            interpreter.profile.add(GasCategory::Intrinsic, intrinsic);

            let mut top = OverlayState::new(root);
            let msg = Message {
                gas: msg.gas - intrinsic,
                ..msg
            };
            let mut result = interpreter.execute(&mut top, msg);
            result.profile = interpreter.profile;
            (result, top.into_writes())
        };

        if result.is_success() {
            state.commit(writes);
        }
        result
    }
}

enum Halt {
    Stop,
    Return(Vec<u8>),
    Revert(Vec<u8>),
}

struct Frame {
    ctx: Message,
    code: Bytes,
    jumpdests: Vec<bool>,
    pc: usize,
    stack: Stack,
    memory: Memory,
    gas: Gas,
    return_data: Bytes,
    logs: Vec<Log>,
}

impl Frame {
    fn new(ctx: Message, code: Bytes) -> Self {
        Self {
            jumpdests: analyze_jumpdests(&code),
            gas: Gas::new(ctx.gas),
            ctx,
            code,
            pc: 0,
            stack: Stack::new(),
            memory: Memory::new(),
            return_data: Bytes::default(),
            logs: Vec::new(),
        }
    }

    /// Converts how the frame stopped into a result.
    fn finish(self, halt: Result<Halt, VMError>) -> ExecutionResult {
        let (status, output, logs) = match halt {
            Ok(Halt::Stop) => (Status::Success, Vec::new(), self.logs),
            Ok(Halt::Return(output)) => (Status::Success, output, self.logs),
            Ok(Halt::Revert(output)) => (Status::Revert, output, Vec::new()),
            Err(error) => return ExecutionResult::failed(error, 0),
        };
        ExecutionResult {
            status,
            gas_left: self.gas.remaining(),
            output: output.into(),
            create_address: None,
            logs,
            profile: GasProfile::new(),
        }
    }
}

/// Marks every `JUMPDEST` byte that is not inside push data.
fn analyze_jumpdests(code: &[u8]) -> Vec<bool> {
    let mut valid = vec![false; code.len()];
    let mut pc = 0;
    while pc < code.len() {
        let byte = code[pc];
        if byte == Opcode::JumpDest as u8 {
            valid[pc] = true;
        } else if (Opcode::Push1 as u8..=Opcode::Push32 as u8).contains(&byte) {
            pc += (byte - Opcode::Push0 as u8) as usize;
        }
        pc += 1;
    }
    valid
}

/// Reads 32 bytes of `src` at `offset`, zero-padded past the end.
fn padded_word(src: &[u8], offset: U256) -> U256 {
    let mut word = [0u8; 32];
    if let Some(start) = offset.to_usize().filter(|&s| s < src.len()) {
        let end = (start + 32).min(src.len());
        word[..end - start].copy_from_slice(&src[start..end]);
    }
    U256::from_be_bytes(&word)
}

fn transfer(state: &mut dyn State, from: Address, to: Address, value: U256) {
    if value.is_zero() {
        return;
    }
    let mut sender = state.account(&from).unwrap_or_default();
    sender.balance = sender.balance - value;
    state.set_account(from, Some(sender));
    let mut recipient = state.account(&to).unwrap_or_default();
    recipient.balance = recipient.balance + value;
    state.set_account(to, Some(recipient));
}

fn shift_amount(shift: U256) -> usize {
    shift.to_usize().map_or(256, |s| s.min(256))
}

macro_rules! binary {
    ($frame:expr, |$a:ident, $b:ident| $body:expr) => {{
        let [$a, $b] = $frame.stack.pop_n::<2>()?;
        $frame.stack.push($body)?;
    }};
}

/// Per-transaction interpreter state shared by all frames.
struct Interpreter<'a> {
    env: &'a Env,
    /// State before the transaction, for original storage values.
    root: &'a dyn State,
    origin: Address,
    profile: GasProfile,
}

impl Interpreter<'_> {
    fn execute(&mut self, state: &mut dyn State, msg: Message) -> ExecutionResult {
        if msg.depth > MAX_CALL_DEPTH {
            return ExecutionResult::failed(VMError::CallDepthExceeded, msg.gas);
        }
        if msg.kind.transfers_value() && !msg.value.is_zero() {
            let balance = state
                .account(&msg.caller)
                .map(|a| a.balance)
                .unwrap_or_default();
            if balance < msg.value {
                return ExecutionResult::failed(VMError::InsufficientBalance, msg.gas);
            }
        }

        if msg.kind.is_create() {
            self.create(state, msg)
        } else {
            self.call(state, msg)
        }
    }

    fn call(&mut self, state: &mut dyn State, msg: Message) -> ExecutionResult {
        let (result, writes) = {
            let mut overlay = OverlayState::new(&*state);
            if msg.kind.transfers_value() {
                transfer(&mut overlay, msg.caller, msg.address, msg.value);
            }
            let code = overlay
                .account(&msg.code_address)
                .map(|a| a.code)
                .unwrap_or_default();

            let result = if code.is_empty() {
                ExecutionResult {
                    status: Status::Success,
                    gas_left: msg.gas,
                    output: Bytes::default(),
                    create_address: None,
                    logs: Vec::new(),
                    profile: GasProfile::new(),
                }
            } else {
                let mut frame = Frame::new(msg, code);
                let halt = self.run(&mut overlay, &mut frame);
                frame.finish(halt)
            };
            (result, overlay.into_writes())
        };

        if result.is_success() {
            state.commit(writes);
        }
        result
    }

    fn create(&mut self, state: &mut dyn State, msg: Message) -> ExecutionResult {
        if msg.input.len() > gas::MAX_INITCODE_SIZE {
            return ExecutionResult::failed(
                VMError::CodeSizeExceeded {
                    size: msg.input.len(),
                    limit: gas::MAX_INITCODE_SIZE,
                },
                0,
            );
        }

        // The deployer's nonce moves even when the creation fails.
        let mut deployer = state.account(&msg.caller).unwrap_or_default();
        let Some(next_nonce) = deployer.nonce.checked_add(1) else {
            return ExecutionResult::failed(VMError::NonceOverflow, msg.gas);
        };
        let address = match msg.kind {
            CallKind::Create2 { salt } => create2_address(&msg.caller, salt, &msg.input),
            _ => create_address(&msg.caller, deployer.nonce),
        };
        deployer.nonce = next_nonce;
        state.set_account(msg.caller, Some(deployer));

        if state
            .account(&address)
            .is_some_and(|a| a.nonce != 0 || !a.code.is_empty())
        {
            return ExecutionResult::failed(
                VMError::AddressCollision {
                    address: address.to_string(),
                },
                0,
            );
        }

        let (result, writes) = {
            let mut overlay = OverlayState::new(&*state);
            let mut account = overlay.account(&address).unwrap_or_default();
            account.nonce = 1;
            overlay.set_account(address, Some(account));
            transfer(&mut overlay, msg.caller, address, msg.value);

            let init_code = msg.input.clone();
            let ctx = Message {
                address,
                code_address: address,
                input: Bytes::default(),
                ..msg
            };
            let mut frame = Frame::new(ctx, init_code);
            let halt = self.run(&mut overlay, &mut frame);
            let halt = match halt {
                Ok(Halt::Return(code)) => self
                    .deposit(&mut overlay, &mut frame, address, code)
                    .map(|_| Halt::Stop),
                Ok(Halt::Stop) => Ok(Halt::Stop),
                other => other,
            };
            let mut result = frame.finish(halt);
            if result.is_success() {
                result.create_address = Some(address);
            }
            (result, overlay.into_writes())
        };

        if result.is_success() {
            state.commit(writes);
        }
        result
    }

    /// Validates and stores the runtime code returned by init code.
    fn deposit(
        &mut self,
        state: &mut dyn State,
        frame: &mut Frame,
        address: Address,
        code: Vec<u8>,
    ) -> Result<(), VMError> {
        if code.len() > gas::MAX_CODE_SIZE {
            return Err(VMError::CodeSizeExceeded {
                size: code.len(),
                limit: gas::MAX_CODE_SIZE,
            });
        }
        if code.first() == Some(&0xef) {
            return Err(VMError::InvalidCodePrefix);
        }
        self.charge(
            frame,
            GasCategory::Deploy,
            gas::CODE_DEPOSIT_BYTE * code.len() as u64,
        )?;
        let mut account = state.account(&address).unwrap_or_default();
        account.set_code(code.into());
        state.set_account(address, Some(account));
        Ok(())
    }

    fn charge(
        &mut self,
        frame: &mut Frame,
        category: GasCategory,
        amount: u64,
    ) -> Result<(), VMError> {
        frame.gas.charge(amount)?;
        self.profile.add(category, amount);
        Ok(())
    }

    /// Charges expansion for an `(offset, len)` operand pair and grows memory.
    fn touch_memory(
        &mut self,
        frame: &mut Frame,
        offset: U256,
        len: U256,
    ) -> Result<Option<(usize, usize)>, VMError> {
        let Some((offset, len)) = Memory::range(offset, len)? else {
            return Ok(None);
        };
        let cost = frame.memory.expansion_gas(offset, len);
        self.charge(frame, GasCategory::Memory, cost)?;
        frame.memory.grow(offset, len);
        Ok(Some((offset, len)))
    }

    fn copy_to_memory(
        &mut self,
        frame: &mut Frame,
        dest: U256,
        len: U256,
        src: &[u8],
        src_offset: U256,
    ) -> Result<(), VMError> {
        let Some((dest, len)) = self.touch_memory(frame, dest, len)? else {
            return Ok(());
        };
        self.charge(frame, GasCategory::Copy, gas::WORD_COPY * gas::words(len))?;
        frame.memory.copy_padded(dest, src, src_offset, len);
        Ok(())
    }

    fn memory_slice(&mut self, frame: &mut Frame, offset: U256, len: U256) -> Result<Vec<u8>, VMError> {
        Ok(match self.touch_memory(frame, offset, len)? {
            Some((offset, len)) => frame.memory.slice(offset, len).to_vec(),
            None => Vec::new(),
        })
    }

    fn jump(frame: &mut Frame, target: U256) -> Result<(), VMError> {
        match target.to_usize() {
            Some(dest) if frame.jumpdests.get(dest) == Some(&true) => {
                frame.pc = dest;
                Ok(())
            }
            _ => Err(VMError::InvalidJump {
                target: format!("{target:?}"),
            }),
        }
    }

    fn require_mutable(frame: &Frame, op: Opcode) -> Result<(), VMError> {
        if frame.ctx.is_static {
            return Err(VMError::StaticViolation {
                instruction: op.mnemonic(),
            });
        }
        Ok(())
    }

    /// Executes instructions until the frame halts.
    fn run(&mut self, state: &mut dyn State, frame: &mut Frame) -> Result<Halt, VMError> {
        loop {
            let offset = frame.pc;
            let Some(&byte) = frame.code.get(offset) else {
                return Ok(Halt::Stop);
            };
            let op = Opcode::try_from(byte)
                .map_err(|_| VMError::InvalidOpcode { opcode: byte, offset })?;
            let (pops, pushes) = op.stack_io();
            frame.stack.require(op.mnemonic(), pops, pushes)?;
            self.charge(frame, GasCategory::OpcodeBase, op.base_gas())?;
            frame.pc += 1;

            if let Some(halt) = self.step(state, frame, op, offset)? {
                return Ok(halt);
            }
        }
    }

    fn step(
        &mut self,
        state: &mut dyn State,
        f: &mut Frame,
        op: Opcode,
        offset: usize,
    ) -> Result<Option<Halt>, VMError> {
        match op {
            Op::Stop => return Ok(Some(Halt::Stop)),
            // Arithmetic
            Op::Add => binary!(f, |a, b| a + b),
            Op::Mul => binary!(f, |a, b| a * b),
            Op::Sub => binary!(f, |a, b| a - b),
            Op::Div => binary!(f, |a, b| a.div_rem(b).0),
            Op::SDiv => binary!(f, |a, b| a.signed_div(b)),
            Op::Mod => binary!(f, |a, b| a.div_rem(b).1),
            Op::SMod => binary!(f, |a, b| a.signed_rem(b)),
            Op::AddMod => {
                let [a, b, n] = f.stack.pop_n::<3>()?;
                f.stack.push(a.add_mod(b, n))?;
            }
            Op::MulMod => {
                let [a, b, n] = f.stack.pop_n::<3>()?;
                f.stack.push(a.mul_mod(b, n))?;
            }
            Op::Exp => {
                let [base, exponent] = f.stack.pop_n::<2>()?;
                self.charge(f, GasCategory::Exp, gas::EXP_BYTE * exponent.byte_len() as u64)?;
                f.stack.push(base.wrapping_pow(exponent))?;
            }
            Op::SignExtend => binary!(f, |b, x| x.sign_extend(b)),
            // Comparison and bitwise
            Op::Lt => binary!(f, |a, b| U256::from(a < b)),
            Op::Gt => binary!(f, |a, b| U256::from(a > b)),
            Op::SLt => binary!(f, |a, b| U256::from(a.signed_cmp(&b).is_lt())),
            Op::SGt => binary!(f, |a, b| U256::from(a.signed_cmp(&b).is_gt())),
            Op::Eq => binary!(f, |a, b| U256::from(a == b)),
            Op::IsZero => {
                let a = f.stack.pop()?;
                f.stack.push(U256::from(a.is_zero()))?;
            }
            Op::And => binary!(f, |a, b| a & b),
            Op::Or => binary!(f, |a, b| a | b),
            Op::Xor => binary!(f, |a, b| a ^ b),
            Op::Not => {
                let a = f.stack.pop()?;
                f.stack.push(!a)?;
            }
            Op::Byte => binary!(f, |i, x| x.byte(i)),
            Op::Shl => binary!(f, |shift, value| value << shift_amount(shift)),
            Op::Shr => binary!(f, |shift, value| value >> shift_amount(shift)),
            Op::Sar => binary!(f, |shift, value| value.sar(shift_amount(shift))),
            Op::Keccak256 => {
                let [offset, len] = f.stack.pop_n::<2>()?;
                let data = self.memory_slice(f, offset, len)?;
                self.charge(f, GasCategory::Copy, gas::KECCAK_WORD * gas::words(data.len()))?;
                f.stack.push(Hash::digest(&data).into())?;
            }
            // Environment
            Op::Address => f.stack.push(f.ctx.address.into())?,
            Op::Balance => {
                let who = Address::from(f.stack.pop()?);
                let balance = state.account(&who).map(|a| a.balance).unwrap_or_default();
                f.stack.push(balance)?;
            }
            Op::Origin => f.stack.push(self.origin.into())?,
            Op::Caller => f.stack.push(f.ctx.caller.into())?,
            Op::CallValue => f.stack.push(f.ctx.value)?,
            Op::CallDataLoad => {
                let at = f.stack.pop()?;
                f.stack.push(padded_word(&f.ctx.input, at))?;
            }
            Op::CallDataSize => f.stack.push(U256::from(f.ctx.input.len() as u64))?,
            Op::CallDataCopy => {
                let [dest, src, len] = f.stack.pop_n::<3>()?;
                let input = f.ctx.input.clone();
                self.copy_to_memory(f, dest, len, &input, src)?;
            }
            Op::CodeSize => f.stack.push(U256::from(f.code.len() as u64))?,
            Op::CodeCopy => {
                let [dest, src, len] = f.stack.pop_n::<3>()?;
                let code = f.code.clone();
                self.copy_to_memory(f, dest, len, &code, src)?;
            }
            Op::GasPrice => f.stack.push(self.env.gas_price)?,
            Op::ExtCodeSize => {
                let who = Address::from(f.stack.pop()?);
                let size = state.account(&who).map_or(0, |a| a.code.len());
                f.stack.push(U256::from(size as u64))?;
            }
            Op::ExtCodeCopy => {
                let [who, dest, src, len] = f.stack.pop_n::<4>()?;
                let code = state
                    .account(&who.into())
                    .map(|a| a.code)
                    .unwrap_or_default();
                self.copy_to_memory(f, dest, len, &code, src)?;
            }
            Op::ReturnDataSize => f.stack.push(U256::from(f.return_data.len() as u64))?,
            Op::ReturnDataCopy => {
                let [dest, src, len] = f.stack.pop_n::<3>()?;
                let available = f.return_data.len();
                let end = src
                    .to_usize()
                    .zip(len.to_usize())
                    .and_then(|(s, l)| s.checked_add(l));
                match end {
                    Some(end) if end <= available => {}
                    _ => {
                        return Err(VMError::ReturnDataOutOfBounds {
                            end: end.unwrap_or(usize::MAX),
                            len: available,
                        });
                    }
                }
                let data = f.return_data.clone();
                self.copy_to_memory(f, dest, len, &data, src)?;
            }
            Op::ExtCodeHash => {
                let who = Address::from(f.stack.pop()?);
                let hash = match state.account(&who) {
                    Some(account) if !account.is_empty() => account.code_hash.into(),
                    _ => U256::ZERO,
                };
                f.stack.push(hash)?;
            }
            // Block
            Op::BlockHash => {
                f.stack.pop()?;
                f.stack.push(U256::ZERO)?;
            }
            Op::Coinbase => f.stack.push(self.env.coinbase.into())?,
            Op::Timestamp => f.stack.push(U256::from(self.env.timestamp))?,
            Op::Number => f.stack.push(U256::from(self.env.block_number))?,
            Op::PrevRandao => f.stack.push(self.env.prev_randao)?,
            Op::GasLimit => f.stack.push(U256::from(self.env.gas_limit))?,
            Op::ChainId => f.stack.push(U256::from(self.env.chain_id))?,
            Op::SelfBalance => {
                let balance = state
                    .account(&f.ctx.address)
                    .map(|a| a.balance)
                    .unwrap_or_default();
                f.stack.push(balance)?;
            }
            Op::BaseFee => f.stack.push(self.env.base_fee)?,
            // Stack, memory, storage and flow
            Op::Pop => {
                f.stack.pop()?;
            }
            Op::MLoad => {
                let at = f.stack.pop()?;
                let word = match self.touch_memory(f, at, U256::from(32))? {
                    Some((at, _)) => f.memory.load_word(at),
                    None => U256::ZERO,
                };
                f.stack.push(word)?;
            }
            Op::MStore => {
                let [at, value] = f.stack.pop_n::<2>()?;
                if let Some((at, _)) = self.touch_memory(f, at, U256::from(32))? {
                    f.memory.store(at, &value.to_be_bytes());
                }
            }
            Op::MStore8 => {
                let [at, value] = f.stack.pop_n::<2>()?;
                if let Some((at, _)) = self.touch_memory(f, at, U256::ONE)? {
                    f.memory.store_byte(at, value.low_u64() as u8);
                }
            }
            Op::SLoad => {
                let key = f.stack.pop()?;
                f.stack.push(state.storage(&f.ctx.address, &key))?;
            }
            Op::SStore => {
                Self::require_mutable(f, op)?;
                if f.gas.remaining() <= gas::CALL_STIPEND {
                    return Err(VMError::OutOfGas {
                        needed: gas::CALL_STIPEND + 1,
                        remaining: f.gas.remaining(),
                    });
                }
                let [key, value] = f.stack.pop_n::<2>()?;
                let address = f.ctx.address;
                let current = state.storage(&address, &key);
                let original = self.root.storage(&address, &key);
                let cost = if current == value || original != current {
                    gas::WARM_STORAGE_READ
                } else if original.is_zero() {
                    gas::SSTORE_SET
                } else {
                    gas::SSTORE_RESET
                };
                self.charge(f, GasCategory::StateStore, cost)?;
                state.set_storage(address, key, value);
            }
            Op::Jump => {
                let target = f.stack.pop()?;
                Self::jump(f, target)?;
            }
            Op::JumpI => {
                let [target, condition] = f.stack.pop_n::<2>()?;
                if !condition.is_zero() {
                    Self::jump(f, target)?;
                }
            }
            Op::Pc => f.stack.push(U256::from(offset as u64))?,
            Op::MSize => f.stack.push(U256::from(f.memory.len() as u64))?,
            Op::Gas => f.stack.push(U256::from(f.gas.remaining()))?,
            Op::JumpDest => {}
            Op::Push0 => f.stack.push(U256::ZERO)?,
            Op::Push1 | Op::Push2 | Op::Push3 | Op::Push4 | Op::Push5 | Op::Push6 | Op::Push7
            | Op::Push8 | Op::Push9 | Op::Push10 | Op::Push11 | Op::Push12 | Op::Push13
            | Op::Push14 | Op::Push15 | Op::Push16 | Op::Push17 | Op::Push18 | Op::Push19
            | Op::Push20 | Op::Push21 | Op::Push22 | Op::Push23 | Op::Push24 | Op::Push25
            | Op::Push26 | Op::Push27 | Op::Push28 | Op::Push29 | Op::Push30 | Op::Push31
            | Op::Push32 => {
                let n = op.immediate_len();
                let mut word = [0u8; 32];
                let start = f.pc.min(f.code.len());
                let end = (f.pc + n).min(f.code.len());
                // Immediates cut off by the end of code read as zero bytes.
                word[32 - n..32 - n + (end - start)].copy_from_slice(&f.code[start..end]);
                f.stack.push(U256::from_be_bytes(&word))?;
                f.pc += n;
            }
            Op::Dup1 | Op::Dup2 | Op::Dup3 | Op::Dup4 | Op::Dup5 | Op::Dup6 | Op::Dup7
            | Op::Dup8 | Op::Dup9 | Op::Dup10 | Op::Dup11 | Op::Dup12 | Op::Dup13 | Op::Dup14
            | Op::Dup15 | Op::Dup16 => {
                f.stack.dup((op as u8 - Op::Dup1 as u8 + 1) as usize)?;
            }
            Op::Swap1 | Op::Swap2 | Op::Swap3 | Op::Swap4 | Op::Swap5 | Op::Swap6 | Op::Swap7
            | Op::Swap8 | Op::Swap9 | Op::Swap10 | Op::Swap11 | Op::Swap12 | Op::Swap13
            | Op::Swap14 | Op::Swap15 | Op::Swap16 => {
                f.stack.swap((op as u8 - Op::Swap1 as u8 + 1) as usize)?;
            }
            Op::Log0 | Op::Log1 | Op::Log2 | Op::Log3 | Op::Log4 => {
                Self::require_mutable(f, op)?;
                let [at, len] = f.stack.pop_n::<2>()?;
                let topic_count = (op as u8 - Op::Log0 as u8) as usize;
                let mut topics = Vec::with_capacity(topic_count);
                for _ in 0..topic_count {
                    topics.push(Hash::from(f.stack.pop()?));
                }
                let data = self.memory_slice(f, at, len)?;
                self.charge(f, GasCategory::Log, gas::LOG_DATA * data.len() as u64)?;
                f.logs.push(Log {
                    address: f.ctx.address,
                    topics,
                    data: data.into(),
                });
            }
            // System
            Op::Create | Op::Create2 => {
                Self::require_mutable(f, op)?;
                let [value, at, len] = f.stack.pop_n::<3>()?;
                let kind = if op == Op::Create2 {
                    CallKind::Create2 {
                        salt: f.stack.pop()?,
                    }
                } else {
                    CallKind::Create
                };
                let init_code = self.memory_slice(f, at, len)?;
                if init_code.len() > gas::MAX_INITCODE_SIZE {
                    return Err(VMError::CodeSizeExceeded {
                        size: init_code.len(),
                        limit: gas::MAX_INITCODE_SIZE,
                    });
                }
                let words = gas::words(init_code.len());
                self.charge(f, GasCategory::Deploy, gas::INITCODE_WORD * words)?;
                if op == Op::Create2 {
                    self.charge(f, GasCategory::Copy, gas::KECCAK_WORD * words)?;
                }

                let child_gas = gas::all_but_one_64th(f.gas.remaining());
                f.gas.charge(child_gas)?;
                let msg = Message {
                    kind,
                    caller: f.ctx.address,
                    address: Address::zero(),
                    code_address: Address::zero(),
                    value,
                    input: init_code.into(),
                    gas: child_gas,
                    is_static: false,
                    depth: f.ctx.depth + 1,
                };
                let result = self.execute(state, msg);
                f.gas.reclaim(result.gas_left);
                f.return_data = if result.status == Status::Revert {
                    result.output
                } else {
                    Bytes::default()
                };
                match result.create_address.filter(|_| result.status == Status::Success) {
                    Some(created) => {
                        f.logs.extend(result.logs);
                        f.stack.push(created.into())?;
                    }
                    None => f.stack.push(U256::ZERO)?,
                }
            }
            Op::Call | Op::CallCode | Op::DelegateCall | Op::StaticCall => {
                let requested = f.stack.pop()?;
                let to = Address::from(f.stack.pop()?);
                let value = if matches!(op, Op::Call | Op::CallCode) {
                    f.stack.pop()?
                } else {
                    U256::ZERO
                };
                let [in_at, in_len, out_at, out_len] = f.stack.pop_n::<4>()?;
                if op == Op::Call && !value.is_zero() {
                    Self::require_mutable(f, op)?;
                }

                let input = self.memory_slice(f, in_at, in_len)?;
                let out = self.touch_memory(f, out_at, out_len)?;

                let mut extra = 0;
                if !value.is_zero() {
                    extra += gas::CALL_VALUE;
                    if op == Op::Call && state.account(&to).is_none_or(|a| a.is_empty()) {
                        extra += gas::NEW_ACCOUNT;
                    }
                }
                self.charge(f, GasCategory::CallOverhead, extra)?;

                let available = gas::all_but_one_64th(f.gas.remaining());
                let forwarded = requested.to_u64().map_or(available, |g| g.min(available));
                f.gas.charge(forwarded)?;
                let stipend = if value.is_zero() { 0 } else { gas::CALL_STIPEND };

                let ctx = &f.ctx;
                let (kind, caller, address, value, is_static) = match op {
                    Op::Call => (CallKind::Call, ctx.address, to, value, ctx.is_static),
                    Op::CallCode => (
                        CallKind::CallCode,
                        ctx.address,
                        ctx.address,
                        value,
                        ctx.is_static,
                    ),
                    Op::DelegateCall => (
                        CallKind::DelegateCall,
                        ctx.caller,
                        ctx.address,
                        ctx.value,
                        ctx.is_static,
                    ),
                    _ => (CallKind::StaticCall, ctx.address, to, U256::ZERO, true),
                };
                let msg = Message {
                    kind,
                    caller,
                    address,
                    code_address: to,
                    value,
                    input: input.into(),
                    gas: forwarded + stipend,
                    is_static,
                    depth: ctx.depth + 1,
                };

                let result = self.execute(state, msg);
                f.gas.reclaim(result.gas_left);
                if let Some((at, len)) = out {
                    let n = len.min(result.output.len());
                    f.memory.store(at, &result.output[..n]);
                }
                f.return_data = result.output;
                let success = result.status == Status::Success;
                if success {
                    f.logs.extend(result.logs);
                }
                f.stack.push(U256::from(success))?;
            }
            Op::Return => {
                let [at, len] = f.stack.pop_n::<2>()?;
                return Ok(Some(Halt::Return(self.memory_slice(f, at, len)?)));
            }
            Op::Revert => {
                let [at, len] = f.stack.pop_n::<2>()?;
                return Ok(Some(Halt::Revert(self.memory_slice(f, at, len)?)));
            }
            Op::Invalid => return Err(VMError::DesignatedInvalid { offset }),
            Op::SelfDestruct => {
                Self::require_mutable(f, op)?;
                let beneficiary = Address::from(f.stack.pop()?);
                let address = f.ctx.address;
                let balance = state.account(&address).map(|a| a.balance).unwrap_or_default();
                if !balance.is_zero()
                    && state.account(&beneficiary).is_none_or(|a| a.is_empty())
                {
                    self.charge(f, GasCategory::CallOverhead, gas::NEW_ACCOUNT)?;
                }
                transfer(state, address, beneficiary, balance);
                // Removal is immediate rather than deferred to the end of the
                // transaction; the destroyed contract's balance is burned when it
                // names itself as beneficiary.
                state.set_account(address, None);
                return Ok(Some(Halt::Stop));
            }
        }
        Ok(None)
    }
}
