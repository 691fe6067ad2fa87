use thiserror::Error;

/// Errors that abort a call frame.
///
/// Any of these consumes all gas given to the frame and discards its state
/// changes. A `REVERT` is not an error: it is reported as an outcome.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum VMError {
    /// Byte is not an opcode of the supported revision.
    #[error("invalid opcode 0x{opcode:02x} at offset {offset}")]
    InvalidOpcode { opcode: u8, offset: usize },
    /// The designated `INVALID` instruction was executed.
    #[error("designated invalid instruction at offset {offset}")]
    DesignatedInvalid { offset: usize },
    /// Jump target is not a `JUMPDEST`.
    #[error("invalid jump destination {target}")]
    InvalidJump { target: String },
    /// Stack holds fewer items than the instruction pops.
    #[error("stack underflow: {instruction} needs {needed} items, {available} available")]
    StackUnderflow {
        instruction: &'static str,
        needed: usize,
        available: usize,
    },
    /// Stack would exceed its 1024-item limit.
    #[error("stack overflow at {instruction}")]
    StackOverflow { instruction: &'static str },
    /// Frame ran out of gas.
    #[error("out of gas: needed {needed}, remaining {remaining}")]
    OutOfGas { needed: u64, remaining: u64 },
    /// Memory offset or size does not fit the addressable range.
    #[error("memory access out of range")]
    MemoryLimit,
    /// `RETURNDATACOPY` past the end of the last return buffer.
    #[error("return data read out of bounds: {end} > {len}")]
    ReturnDataOutOfBounds { end: usize, len: usize },
    /// State-modifying instruction inside a static call.
    #[error("{instruction} not allowed in static context")]
    StaticViolation { instruction: &'static str },
    /// Nested call depth exceeded 1024.
    #[error("call depth limit exceeded")]
    CallDepthExceeded,
    /// Sender balance below the transferred value.
    #[error("insufficient balance for transfer")]
    InsufficientBalance,
    /// Contract creation target already has code or a nonce.
    #[error("contract address collision at {address}")]
    AddressCollision { address: String },
    /// Init code or deployed code exceeds its size limit.
    #[error("code size {size} exceeds limit {limit}")]
    CodeSizeExceeded { size: usize, limit: usize },
    /// Deployed code starts with the reserved 0xEF byte.
    #[error("deployed code starts with reserved byte 0xef")]
    InvalidCodePrefix,
    /// Sender nonce cannot be incremented further.
    #[error("nonce overflow")]
    NonceOverflow,
}
