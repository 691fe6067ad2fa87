//! Instruction set definitions (Shanghai revision).
//!
//! The [`for_each_opcode!`](crate::for_each_opcode) macro holds the canonical
//! opcode table and invokes a callback macro for code generation, so the enum,
//! the decoder and the static checks all derive from one list.
//!
//! Each entry reads `Name = byte, "MNEMONIC" => [pops, pushes], base_gas`.
//! `base_gas` is the static part of the cost; memory expansion, copy, hashing,
//! storage and call costs are charged by the interpreter on top of it.

use crate::virtual_machine::errors::VMError;

/// Invokes a callback macro with the complete opcode definition list.
#[macro_export]
macro_rules! for_each_opcode {
    ($callback:ident) => {
        $callback! {
            // =========================
            // Stop and arithmetic
            // =========================
            Stop = 0x00, "STOP" => [0, 0], 0,
            Add = 0x01, "ADD" => [2, 1], 3,
            Mul = 0x02, "MUL" => [2, 1], 5,
            Sub = 0x03, "SUB" => [2, 1], 3,
            Div = 0x04, "DIV" => [2, 1], 5,
            SDiv = 0x05, "SDIV" => [2, 1], 5,
            Mod = 0x06, "MOD" => [2, 1], 5,
            SMod = 0x07, "SMOD" => [2, 1], 5,
            AddMod = 0x08, "ADDMOD" => [3, 1], 8,
            MulMod = 0x09, "MULMOD" => [3, 1], 8,
            Exp = 0x0A, "EXP" => [2, 1], 10,
            SignExtend = 0x0B, "SIGNEXTEND" => [2, 1], 5,
            // =========================
            // Comparison and bitwise
            // =========================
            Lt = 0x10, "LT" => [2, 1], 3,
            Gt = 0x11, "GT" => [2, 1], 3,
            SLt = 0x12, "SLT" => [2, 1], 3,
            SGt = 0x13, "SGT" => [2, 1], 3,
            Eq = 0x14, "EQ" => [2, 1], 3,
            IsZero = 0x15, "ISZERO" => [1, 1], 3,
            And = 0x16, "AND" => [2, 1], 3,
            Or = 0x17, "OR" => [2, 1], 3,
            Xor = 0x18, "XOR" => [2, 1], 3,
            Not = 0x19, "NOT" => [1, 1], 3,
            Byte = 0x1A, "BYTE" => [2, 1], 3,
            Shl = 0x1B, "SHL" => [2, 1], 3,
            Shr = 0x1C, "SHR" => [2, 1], 3,
            Sar = 0x1D, "SAR" => [2, 1], 3,
            Keccak256 = 0x20, "KECCAK256" => [2, 1], 30,
            // =========================
            // Environment
            // =========================
            Address = 0x30, "ADDRESS" => [0, 1], 2,
            Balance = 0x31, "BALANCE" => [1, 1], 100,
            Origin = 0x32, "ORIGIN" => [0, 1], 2,
            Caller = 0x33, "CALLER" => [0, 1], 2,
            CallValue = 0x34, "CALLVALUE" => [0, 1], 2,
            CallDataLoad = 0x35, "CALLDATALOAD" => [1, 1], 3,
            CallDataSize = 0x36, "CALLDATASIZE" => [0, 1], 2,
            CallDataCopy = 0x37, "CALLDATACOPY" => [3, 0], 3,
            CodeSize = 0x38, "CODESIZE" => [0, 1], 2,
            CodeCopy = 0x39, "CODECOPY" => [3, 0], 3,
            GasPrice = 0x3A, "GASPRICE" => [0, 1], 2,
            ExtCodeSize = 0x3B, "EXTCODESIZE" => [1, 1], 100,
            ExtCodeCopy = 0x3C, "EXTCODECOPY" => [4, 0], 100,
            ReturnDataSize = 0x3D, "RETURNDATASIZE" => [0, 1], 2,
            ReturnDataCopy = 0x3E, "RETURNDATACOPY" => [3, 0], 3,
            ExtCodeHash = 0x3F, "EXTCODEHASH" => [1, 1], 100,
            // =========================
            // Block
            // =========================
            BlockHash = 0x40, "BLOCKHASH" => [1, 1], 20,
            Coinbase = 0x41, "COINBASE" => [0, 1], 2,
            Timestamp = 0x42, "TIMESTAMP" => [0, 1], 2,
            Number = 0x43, "NUMBER" => [0, 1], 2,
            PrevRandao = 0x44, "PREVRANDAO" => [0, 1], 2,
            GasLimit = 0x45, "GASLIMIT" => [0, 1], 2,
            ChainId = 0x46, "CHAINID" => [0, 1], 2,
            SelfBalance = 0x47, "SELFBALANCE" => [0, 1], 5,
            BaseFee = 0x48, "BASEFEE" => [0, 1], 2,
            // =========================
            // Stack, memory, storage and flow
            // =========================
            Pop = 0x50, "POP" => [1, 0], 2,
            MLoad = 0x51, "MLOAD" => [1, 1], 3,
            MStore = 0x52, "MSTORE" => [2, 0], 3,
            MStore8 = 0x53, "MSTORE8" => [2, 0], 3,
            SLoad = 0x54, "SLOAD" => [1, 1], 100,
            SStore = 0x55, "SSTORE" => [2, 0], 0,
            Jump = 0x56, "JUMP" => [1, 0], 8,
            JumpI = 0x57, "JUMPI" => [2, 0], 10,
            Pc = 0x58, "PC" => [0, 1], 2,
            MSize = 0x59, "MSIZE" => [0, 1], 2,
            Gas = 0x5A, "GAS" => [0, 1], 2,
            JumpDest = 0x5B, "JUMPDEST" => [0, 0], 1,
            // =========================
            // Push
            // =========================
            Push0 = 0x5F, "PUSH0" => [0, 1], 2,
            Push1 = 0x60, "PUSH1" => [0, 1], 3,
            Push2 = 0x61, "PUSH2" => [0, 1], 3,
            Push3 = 0x62, "PUSH3" => [0, 1], 3,
            Push4 = 0x63, "PUSH4" => [0, 1], 3,
            Push5 = 0x64, "PUSH5" => [0, 1], 3,
            Push6 = 0x65, "PUSH6" => [0, 1], 3,
            Push7 = 0x66, "PUSH7" => [0, 1], 3,
            Push8 = 0x67, "PUSH8" => [0, 1], 3,
            Push9 = 0x68, "PUSH9" => [0, 1], 3,
            Push10 = 0x69, "PUSH10" => [0, 1], 3,
            Push11 = 0x6A, "PUSH11" => [0, 1], 3,
            Push12 = 0x6B, "PUSH12" => [0, 1], 3,
            Push13 = 0x6C, "PUSH13" => [0, 1], 3,
            Push14 = 0x6D, "PUSH14" => [0, 1], 3,
            Push15 = 0x6E, "PUSH15" => [0, 1], 3,
            Push16 = 0x6F, "PUSH16" => [0, 1], 3,
            Push17 = 0x70, "PUSH17" => [0, 1], 3,
            Push18 = 0x71, "PUSH18" => [0, 1], 3,
            Push19 = 0x72, "PUSH19" => [0, 1], 3,
            Push20 = 0x73, "PUSH20" => [0, 1], 3,
            Push21 = 0x74, "PUSH21" => [0, 1], 3,
            Push22 = 0x75, "PUSH22" => [0, 1], 3,
            Push23 = 0x76, "PUSH23" => [0, 1], 3,
            Push24 = 0x77, "PUSH24" => [0, 1], 3,
            Push25 = 0x78, "PUSH25" => [0, 1], 3,
            Push26 = 0x79, "PUSH26" => [0, 1], 3,
            Push27 = 0x7A, "PUSH27" => [0, 1], 3,
            Push28 = 0x7B, "PUSH28" => [0, 1], 3,
            Push29 = 0x7C, "PUSH29" => [0, 1], 3,
            Push30 = 0x7D, "PUSH30" => [0, 1], 3,
            Push31 = 0x7E, "PUSH31" => [0, 1], 3,
            Push32 = 0x7F, "PUSH32" => [0, 1], 3,
            // =========================
            // Dup
            // =========================
            Dup1 = 0x80, "DUP1" => [1, 2], 3,
            Dup2 = 0x81, "DUP2" => [2, 3], 3,
            Dup3 = 0x82, "DUP3" => [3, 4], 3,
            Dup4 = 0x83, "DUP4" => [4, 5], 3,
            Dup5 = 0x84, "DUP5" => [5, 6], 3,
            Dup6 = 0x85, "DUP6" => [6, 7], 3,
            Dup7 = 0x86, "DUP7" => [7, 8], 3,
            Dup8 = 0x87, "DUP8" => [8, 9], 3,
            Dup9 = 0x88, "DUP9" => [9, 10], 3,
            Dup10 = 0x89, "DUP10" => [10, 11], 3,
            Dup11 = 0x8A, "DUP11" => [11, 12], 3,
            Dup12 = 0x8B, "DUP12" => [12, 13], 3,
            Dup13 = 0x8C, "DUP13" => [13, 14], 3,
            Dup14 = 0x8D, "DUP14" => [14, 15], 3,
            Dup15 = 0x8E, "DUP15" => [15, 16], 3,
            Dup16 = 0x8F, "DUP16" => [16, 17], 3,
            // =========================
            // Swap
            // =========================
            Swap1 = 0x90, "SWAP1" => [2, 2], 3,
            Swap2 = 0x91, "SWAP2" => [3, 3], 3,
            Swap3 = 0x92, "SWAP3" => [4, 4], 3,
            Swap4 = 0x93, "SWAP4" => [5, 5], 3,
            Swap5 = 0x94, "SWAP5" => [6, 6], 3,
            Swap6 = 0x95, "SWAP6" => [7, 7], 3,
            Swap7 = 0x96, "SWAP7" => [8, 8], 3,
            Swap8 = 0x97, "SWAP8" => [9, 9], 3,
            Swap9 = 0x98, "SWAP9" => [10, 10], 3,
            Swap10 = 0x99, "SWAP10" => [11, 11], 3,
            Swap11 = 0x9A, "SWAP11" => [12, 12], 3,
            Swap12 = 0x9B, "SWAP12" => [13, 13], 3,
            Swap13 = 0x9C, "SWAP13" => [14, 14], 3,
            Swap14 = 0x9D, "SWAP14" => [15, 15], 3,
            Swap15 = 0x9E, "SWAP15" => [16, 16], 3,
            Swap16 = 0x9F, "SWAP16" => [17, 17], 3,
            // =========================
            // Logging
            // =========================
            Log0 = 0xA0, "LOG0" => [2, 0], 375,
            Log1 = 0xA1, "LOG1" => [3, 0], 750,
            Log2 = 0xA2, "LOG2" => [4, 0], 1125,
            Log3 = 0xA3, "LOG3" => [5, 0], 1500,
            Log4 = 0xA4, "LOG4" => [6, 0], 1875,
            // =========================
            // System
            // =========================
            Create = 0xF0, "CREATE" => [3, 1], 32000,
            Call = 0xF1, "CALL" => [7, 1], 100,
            CallCode = 0xF2, "CALLCODE" => [7, 1], 100,
            Return = 0xF3, "RETURN" => [2, 0], 0,
            DelegateCall = 0xF4, "DELEGATECALL" => [6, 1], 100,
            Create2 = 0xF5, "CREATE2" => [4, 1], 32000,
            StaticCall = 0xFA, "STATICCALL" => [6, 1], 100,
            Revert = 0xFD, "REVERT" => [2, 0], 0,
            Invalid = 0xFE, "INVALID" => [0, 0], 0,
            SelfDestruct = 0xFF, "SELFDESTRUCT" => [1, 0], 5000,
        }
    };
}

#[macro_export]
macro_rules! define_opcodes {
    (
        $(
            $name:ident = $opcode:expr, $mnemonic:literal => [$pops:expr, $pushes:expr], $gas:expr
        ),* $(,)?
    ) => {
        /// One interpreter instruction.
        #[repr(u8)]
        #[derive(Copy, Clone, Debug, Eq, PartialEq)]
        pub enum Opcode {
            $( $name = $opcode, )*
        }

        impl TryFrom<u8> for Opcode {
            type Error = VMError;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $( $opcode => Ok(Opcode::$name), )*
                    _ => Err(VMError::InvalidOpcode {
                        opcode: value,
                        offset: 0,
                    }),
                }
            }
        }

        impl Opcode {
            /// Returns the mnemonic for this opcode.
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( Opcode::$name => $mnemonic, )*
                }
            }

            /// Returns the static gas cost for this opcode.
            pub const fn base_gas(&self) -> u64 {
                match self {
                    $( Opcode::$name => $gas, )*
                }
            }

            /// Returns `(items popped, items pushed)`.
            pub const fn stack_io(&self) -> (usize, usize) {
                match self {
                    $( Opcode::$name => ($pops, $pushes), )*
                }
            }
        }
    };
}

for_each_opcode!(define_opcodes);

impl Opcode {
    /// Number of immediate bytes following a `PUSHn`.
    pub const fn immediate_len(&self) -> usize {
        let byte = *self as u8;
        if byte >= Opcode::Push1 as u8 && byte <= Opcode::Push32 as u8 {
            (byte - Opcode::Push0 as u8) as usize
        } else {
            0
        }
    }
}
