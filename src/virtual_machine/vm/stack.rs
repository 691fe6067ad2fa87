use crate::types::u256::U256;
use crate::virtual_machine::errors::VMError;

/// Maximum number of items on the operand stack.
pub const STACK_LIMIT: usize = 1024;

/// Operand stack of one call frame.
///
/// [`require`](Stack::require) validates the whole pop/push shape of an
/// instruction up front and remembers its mnemonic for later error reports.
#[derive(Debug)]
pub struct Stack {
    data: Vec<U256>,
    instruction: &'static str,
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

impl Stack {
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(32),
            instruction: "",
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Checks that `instruction` can pop `pops` items and then push `pushes`.
    pub fn require(
        &mut self,
        instruction: &'static str,
        pops: usize,
        pushes: usize,
    ) -> Result<(), VMError> {
        self.instruction = instruction;
        if self.data.len() < pops {
            return Err(self.underflow(pops));
        }
        if self.data.len() - pops + pushes > STACK_LIMIT {
            return Err(VMError::StackOverflow { instruction });
        }
        Ok(())
    }

    pub fn push(&mut self, value: U256) -> Result<(), VMError> {
        if self.data.len() >= STACK_LIMIT {
            return Err(VMError::StackOverflow {
                instruction: self.instruction,
            });
        }
        self.data.push(value);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<U256, VMError> {
        self.data.pop().ok_or_else(|| self.underflow(1))
    }

    /// Pops `N` items, top of stack first.
    pub fn pop_n<const N: usize>(&mut self) -> Result<[U256; N], VMError> {
        if self.data.len() < N {
            return Err(self.underflow(N));
        }
        let mut out = [U256::ZERO; N];
        for slot in out.iter_mut() {
            *slot = self.pop()?;
        }
        Ok(out)
    }

    /// Pushes a copy of the `n`-th item (1 = top).
    pub fn dup(&mut self, n: usize) -> Result<(), VMError> {
        let len = self.data.len();
        if n == 0 || len < n {
            return Err(self.underflow(n));
        }
        self.push(self.data[len - n])
    }

    /// Swaps the top item with the one `n` below it.
    pub fn swap(&mut self, n: usize) -> Result<(), VMError> {
        let len = self.data.len();
        if n == 0 || len <= n {
            return Err(self.underflow(n + 1));
        }
        self.data.swap(len - 1, len - 1 - n);
        Ok(())
    }

    /// Stack contents, bottom first.
    pub fn as_slice(&self) -> &[U256] {
        &self.data
    }

    fn underflow(&self, needed: usize) -> VMError {
        VMError::StackUnderflow {
            instruction: self.instruction,
            needed,
            available: self.data.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(v: u64) -> U256 {
        U256::from_u64(v)
    }

    #[test]
    fn push_pop_order() {
        let mut stack = Stack::new();
        stack.push(u(1)).unwrap();
        stack.push(u(2)).unwrap();
        let [a, b] = stack.pop_n::<2>().unwrap();
        assert_eq!((a, b), (u(2), u(1)));
        assert!(stack.is_empty());
    }

    #[test]
    fn require_reports_instruction() {
        let mut stack = Stack::new();
        stack.push(u(1)).unwrap();
        let err = stack.require("ADD", 2, 1).unwrap_err();
        assert_eq!(
            err,
            VMError::StackUnderflow {
                instruction: "ADD",
                needed: 2,
                available: 1
            }
        );
    }

    #[test]
    fn overflow_at_limit() {
        let mut stack = Stack::new();
        for i in 0..STACK_LIMIT {
            stack.push(u(i as u64)).unwrap();
        }
        assert!(matches!(
            stack.require("PUSH1", 0, 1),
            Err(VMError::StackOverflow { instruction: "PUSH1" })
        ));
        assert!(stack.push(u(0)).is_err());
    }

    #[test]
    fn dup_and_swap() {
        let mut stack = Stack::new();
        for v in [1, 2, 3] {
            stack.push(u(v)).unwrap();
        }
        stack.dup(3).unwrap();
        assert_eq!(stack.as_slice(), &[u(1), u(2), u(3), u(1)]);
        stack.swap(2).unwrap();
        assert_eq!(stack.as_slice(), &[u(1), u(1), u(3), u(2)]);
        assert!(stack.swap(4).is_err());
    }
}
