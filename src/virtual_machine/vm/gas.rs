use crate::virtual_machine::errors::VMError;

/// Number of gas categories tracked by [`GasProfile`].
const GAS_CATEGORY_COUNT: usize = 9;

/// Categories of gas consumption for profiling and debugging.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum GasCategory {
    /// Intrinsic cost of the transaction (base, calldata, creation).
    Intrinsic = 0,
    /// Static cost of each executed opcode.
    OpcodeBase = 1,
    /// Memory expansion.
    Memory = 2,
    /// Per-word copy and hashing surcharges.
    Copy = 3,
    /// Storage writes.
    StateStore = 4,
    /// Value-transfer and new-account surcharges on calls.
    CallOverhead = 5,
    /// Init code and deposit cost of created contracts.
    Deploy = 6,
    /// Log topics and data.
    Log = 7,
    /// Exponent byte surcharge.
    Exp = 8,
}

impl GasCategory {
    pub const fn as_str(&self) -> &'static str {
        match self {
            GasCategory::Intrinsic => "Intrinsic",
            GasCategory::OpcodeBase => "Opcode Base",
            GasCategory::Memory => "Memory",
            GasCategory::Copy => "Copy",
            GasCategory::StateStore => "State Store",
            GasCategory::CallOverhead => "Call Overhead",
            GasCategory::Deploy => "Deployment",
            GasCategory::Log => "Log",
            GasCategory::Exp => "Exp",
        }
    }

    /// All categories in discriminant order.
    const ALL: [GasCategory; GAS_CATEGORY_COUNT] = [
        GasCategory::Intrinsic,
        GasCategory::OpcodeBase,
        GasCategory::Memory,
        GasCategory::Copy,
        GasCategory::StateStore,
        GasCategory::CallOverhead,
        GasCategory::Deploy,
        GasCategory::Log,
        GasCategory::Exp,
    ];
}

/// Gas consumption profile for debugging and optimization.
///
/// Backed by a flat array indexed by [`GasCategory`] discriminant. Only gas
/// charged by an instruction is recorded; gas forwarded to a child frame shows
/// up under the child's own charges.
#[derive(Clone, Debug)]
pub struct GasProfile {
    counts: [u64; GAS_CATEGORY_COUNT],
}

impl Default for GasProfile {
    fn default() -> Self {
        Self {
            counts: [0; GAS_CATEGORY_COUNT],
        }
    }
}

impl GasProfile {
    /// Creates a new empty gas profile.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds gas to the specified category.
    #[inline(always)]
    pub fn add(&mut self, category: GasCategory, amount: u64) {
        let slot = &mut self.counts[category as usize];
        *slot = slot.saturating_add(amount);
    }

    /// Returns the total gas across all categories.
    pub fn total(&self) -> u64 {
        self.counts
            .iter()
            .fold(0u64, |acc, &v| acc.saturating_add(v))
    }

    /// Returns an iterator over all categories and their gas costs.
    pub fn iter(&self) -> impl Iterator<Item = (GasCategory, u64)> {
        GasCategory::ALL.into_iter().zip(self.counts)
    }
}

/// Gas meter of one call frame.
#[derive(Clone, Copy, Debug)]
pub struct Gas {
    limit: u64,
    remaining: u64,
}

impl Gas {
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            remaining: limit,
        }
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn used(&self) -> u64 {
        self.limit - self.remaining
    }

    /// Deducts `amount`, failing without deducting if it exceeds what is left.
    pub fn charge(&mut self, amount: u64) -> Result<(), VMError> {
        if amount > self.remaining {
            return Err(VMError::OutOfGas {
                needed: amount,
                remaining: self.remaining,
            });
        }
        self.remaining -= amount;
        Ok(())
    }

    /// Gives back gas a child frame did not use.
    pub fn reclaim(&mut self, amount: u64) {
        self.remaining = self.remaining.saturating_add(amount).min(self.limit);
    }
}

/// Maximum cumulative gas allowed for one transaction.
pub const BLOCK_GAS_LIMIT: u64 = 30_000_000;

pub const TX_BASE: u64 = 21_000;
pub const TX_CREATE: u64 = 32_000;
pub const TX_DATA_ZERO: u64 = 4;
pub const TX_DATA_NON_ZERO: u64 = 16;

pub const WORD_COPY: u64 = 3;
pub const KECCAK_WORD: u64 = 6;
pub const EXP_BYTE: u64 = 50;
pub const LOG_TOPIC: u64 = 375;
pub const LOG_DATA: u64 = 8;
pub const INITCODE_WORD: u64 = 2;
pub const CODE_DEPOSIT_BYTE: u64 = 200;

pub const SSTORE_SET: u64 = 20_000;
pub const SSTORE_RESET: u64 = 2_900;
pub const WARM_STORAGE_READ: u64 = 100;
/// `SSTORE` fails when no more than this much gas is left.
pub const CALL_STIPEND: u64 = 2_300;

pub const CALL_VALUE: u64 = 9_000;
pub const NEW_ACCOUNT: u64 = 25_000;

pub const MAX_CODE_SIZE: usize = 24_576;
pub const MAX_INITCODE_SIZE: usize = 2 * MAX_CODE_SIZE;

/// Number of 32-byte words needed to hold `len` bytes.
pub fn words(len: usize) -> u64 {
    (len as u64).div_ceil(32)
}

/// Total cost of a memory of `words` words.
pub fn memory_cost(words: u64) -> u64 {
    words
        .saturating_mul(3)
        .saturating_add(words.saturating_mul(words) / 512)
}

/// Gas available to forward to a child call: all but one 64th.
pub fn all_but_one_64th(remaining: u64) -> u64 {
    remaining - remaining / 64
}

/// Cost of a transaction before any instruction runs.
pub fn intrinsic(input: &[u8], is_create: bool) -> u64 {
    let data: u64 = input
        .iter()
        .map(|&b| if b == 0 { TX_DATA_ZERO } else { TX_DATA_NON_ZERO })
        .sum();
    let create = if is_create {
        TX_CREATE + INITCODE_WORD * words(input.len())
    } else {
        0
    };
    TX_BASE + data + create
}
