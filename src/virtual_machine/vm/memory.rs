use crate::types::u256::U256;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::vm::gas::{memory_cost, words};

/// Highest byte offset a frame may address.
///
/// Gas makes anything close to this unreachable; the bound keeps offset
/// arithmetic inside `usize`.
pub const MAX_MEMORY: usize = 1 << 32;

/// Byte-addressed, word-grown scratch memory of one call frame.
#[derive(Debug, Default)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Resolves an `(offset, len)` operand pair into a checked byte range.
    ///
    /// A zero length never touches memory, whatever the offset.
    pub fn range(offset: U256, len: U256) -> Result<Option<(usize, usize)>, VMError> {
        if len.is_zero() {
            return Ok(None);
        }
        let offset = offset.to_usize().ok_or(VMError::MemoryLimit)?;
        let len = len.to_usize().ok_or(VMError::MemoryLimit)?;
        match offset.checked_add(len) {
            Some(end) if end <= MAX_MEMORY => Ok(Some((offset, len))),
            _ => Err(VMError::MemoryLimit),
        }
    }

    /// Gas for growing memory to cover `offset..offset + len`.
    pub fn expansion_gas(&self, offset: usize, len: usize) -> u64 {
        let current = words(self.data.len());
        let needed = words(offset + len);
        if needed <= current {
            return 0;
        }
        memory_cost(needed) - memory_cost(current)
    }

    /// Grows memory to cover `offset..offset + len`, rounded up to a word.
    pub fn grow(&mut self, offset: usize, len: usize) {
        let size = words(offset + len) as usize * 32;
        if size > self.data.len() {
            self.data.resize(size, 0);
        }
    }

    pub fn load_word(&self, offset: usize) -> U256 {
        let mut word = [0u8; 32];
        word.copy_from_slice(&self.data[offset..offset + 32]);
        U256::from_be_bytes(&word)
    }

    pub fn store(&mut self, offset: usize, bytes: &[u8]) {
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    pub fn store_byte(&mut self, offset: usize, byte: u8) {
        self.data[offset] = byte;
    }

    /// Writes `len` bytes of `src` starting at `src_offset`, zero-filling past
    /// the end of `src`.
    pub fn copy_padded(&mut self, dst: usize, src: &[u8], src_offset: U256, len: usize) {
        let target = &mut self.data[dst..dst + len];
        target.fill(0);
        let Some(start) = src_offset.to_usize().filter(|&s| s < src.len()) else {
            return;
        };
        let available = (src.len() - start).min(len);
        target[..available].copy_from_slice(&src[start..start + available]);
    }

    pub fn slice(&self, offset: usize, len: usize) -> &[u8] {
        &self.data[offset..offset + len]
    }
}
