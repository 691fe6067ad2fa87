//! Embedded bytecode virtual machine for contract deployment and calls.
//!
//! Implements the Shanghai revision of the EVM instruction set, which is what
//! the contract compiler targets. The engine owns one [`state::MemoryState`]
//! and drives it through [`vm::VM::transact`].
//!
//! # Architecture
//!
//! - **Stack machine**: 256-bit words, at most 1024 items per frame
//! - **Memory**: byte-addressed, grown in words, quadratic expansion cost
//! - **Frames**: every call or creation runs on its own state overlay which
//!   is committed into the caller only on success
//! - **Gas metering**: static per-opcode cost plus memory, copy, storage,
//!   log and creation surcharges, with category profiling
//!
//! Precompiled contracts are not provided: calls to their addresses behave
//! like calls to accounts without code.
//!
//! # Modules
//!
//! - [`errors`]: Execution error types
//! - [`isa`]: Opcode table
//! - [`state`]: World state trait, overlay and in-memory base store
//! - [`vm`]: Interpreter, gas metering, stack and memory

pub mod errors;
pub mod isa;
#[cfg(test)]
mod isa_static_check;
pub mod state;
pub mod vm;
