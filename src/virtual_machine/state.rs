//! World state seen by the interpreter.
//!
//! The [`State`] trait exposes accounts and contract storage. [`OverlayState`]
//! buffers the writes of one call frame on top of a read-only parent so a
//! failed frame can be dropped wholesale, and [`MemoryState`] is the flat base
//! store the engine owns.

use crate::types::address::Address;
use crate::types::bytes::Bytes;
use crate::types::hash::Hash;
use crate::types::u256::U256;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Keccak-256 of empty input: the code hash of accounts without code.
pub static EMPTY_CODE_HASH: LazyLock<Hash> = LazyLock::new(|| Hash::digest(&[]));

/// An account of the world state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub nonce: u64,
    pub balance: U256,
    pub code: Bytes,
    pub code_hash: Hash,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            nonce: 0,
            balance: U256::ZERO,
            code: Bytes::default(),
            code_hash: *EMPTY_CODE_HASH,
        }
    }
}

impl Account {
    /// An externally owned account holding `balance`.
    pub fn with_balance(balance: U256) -> Self {
        Self {
            balance,
            ..Self::default()
        }
    }

    pub fn set_code(&mut self, code: Bytes) {
        self.code_hash = Hash::digest(&code);
        self.code = code;
    }

    /// No nonce, no balance and no code.
    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && self.code.is_empty()
    }
}

/// Pending writes of an overlay: `None` deletes an account.
#[derive(Debug, Default)]
pub struct StateWrites {
    pub accounts: BTreeMap<Address, Option<Account>>,
    pub storage: BTreeMap<(Address, U256), U256>,
}

/// Account and storage interface for VM execution.
pub trait State {
    /// Retrieves an account, returning `None` if it does not exist.
    fn account(&self, address: &Address) -> Option<Account>;
    /// Reads a storage slot; missing slots read as zero.
    fn storage(&self, address: &Address, key: &U256) -> U256;
    /// Creates, replaces or (with `None`) removes an account.
    fn set_account(&mut self, address: Address, account: Option<Account>);
    /// Writes a storage slot.
    fn set_storage(&mut self, address: Address, key: U256, value: U256);

    /// Applies the writes of a finished overlay.
    fn commit(&mut self, writes: StateWrites) {
        for (address, account) in writes.accounts {
            self.set_account(address, account);
        }
        for ((address, key), value) in writes.storage {
            self.set_storage(address, key, value);
        }
    }
}

/// Write-buffering overlay on top of a parent state.
///
/// Reads fall through to the parent for anything not written yet. Writes stay
/// local until [`into_writes`](Self::into_writes) hands them back for
/// [`State::commit`], or the overlay is dropped.
pub struct OverlayState<'a> {
    base: &'a dyn State,
    accounts: BTreeMap<Address, Option<Account>>,
    storage: BTreeMap<(Address, U256), U256>,
}

impl<'a> OverlayState<'a> {
    /// Creates a new overlay backed by the given parent state.
    pub fn new(base: &'a dyn State) -> Self {
        Self {
            base,
            accounts: BTreeMap::new(),
            storage: BTreeMap::new(),
        }
    }

    /// Consumes the overlay and returns its pending writes.
    pub fn into_writes(self) -> StateWrites {
        StateWrites {
            accounts: self.accounts,
            storage: self.storage,
        }
    }
}

impl State for OverlayState<'_> {
    fn account(&self, address: &Address) -> Option<Account> {
        match self.accounts.get(address) {
            Some(account) => account.clone(),
            None => self.base.account(address),
        }
    }

    fn storage(&self, address: &Address, key: &U256) -> U256 {
        match self.storage.get(&(*address, *key)) {
            Some(value) => *value,
            None => self.base.storage(address, key),
        }
    }

    fn set_account(&mut self, address: Address, account: Option<Account>) {
        self.accounts.insert(address, account);
    }

    fn set_storage(&mut self, address: Address, key: U256, value: U256) {
        self.storage.insert((address, key), value);
    }
}

/// In-memory base store.
#[derive(Debug, Default)]
pub struct MemoryState {
    accounts: BTreeMap<Address, Account>,
    storage: BTreeMap<(Address, U256), U256>,
}

impl MemoryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.accounts.contains_key(address)
    }
}

impl State for MemoryState {
    fn account(&self, address: &Address) -> Option<Account> {
        self.accounts.get(address).cloned()
    }

    fn storage(&self, address: &Address, key: &U256) -> U256 {
        self.storage
            .get(&(*address, *key))
            .copied()
            .unwrap_or_default()
    }

    fn set_account(&mut self, address: Address, account: Option<Account>) {
        match account {
            Some(account) => {
                self.accounts.insert(address, account);
            }
            None => {
                self.accounts.remove(&address);
                self.storage.retain(|(owner, _), _| *owner != address);
            }
        }
    }

    fn set_storage(&mut self, address: Address, key: U256, value: U256) {
        if value.is_zero() {
            self.storage.remove(&(address, key));
        } else {
            self.storage.insert((address, key), value);
        }
    }
}
