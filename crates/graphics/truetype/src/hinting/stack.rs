use crate::{Error, Result};

/// Refuse to grow the stack beyond this, regardless of what the font claims to need
const MAX_STACK_ELEMENTS: usize = 1 << 16;

/// The interpreter stack.
///
/// Every element is a 32 bit value whose meaning depends on the instruction
/// consuming it: integers, indices, booleans or [F26Dot6](super::F26Dot6) distances.
#[derive(Clone, Debug, Default)]
pub struct Stack {
    items: Vec<i32>,
}

impl Stack {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity.min(MAX_STACK_ELEMENTS)),
        }
    }

    #[inline]
    pub fn push(&mut self, value: i32) -> Result<()> {
        if self.items.len() == MAX_STACK_ELEMENTS {
            return Err(Error::hinting("stack overflow"));
        }
        self.items.push(value);
        Ok(())
    }

    #[inline]
    pub fn push_bool(&mut self, value: bool) -> Result<()> {
        self.push(i32::from(value))
    }

    #[inline]
    pub fn pop(&mut self) -> Result<i32> {
        self.items
            .pop()
            .ok_or_else(|| Error::hinting("pop from empty stack"))
    }

    #[inline]
    pub fn pop_bool(&mut self) -> Result<bool> {
        Ok(self.pop()? != 0)
    }

    /// Pop a value that is interpreted as an unsigned 32 bit integer
    #[inline]
    pub fn pop_u32(&mut self) -> Result<u32> {
        Ok(self.pop()? as u32)
    }

    pub fn peek(&self) -> Result<i32> {
        self.items
            .last()
            .copied()
            .ok_or_else(|| Error::hinting("read from empty stack"))
    }

    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.items.len()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Index into the stack, counting from the top, starting at `1`
    fn position_from_top(&self, n: i32) -> Result<usize> {
        usize::try_from(n)
            .ok()
            .filter(|&n| n != 0 && n <= self.items.len())
            .map(|n| self.items.len() - n)
            .ok_or_else(|| {
                Error::hinting(format!(
                    "stack element {n} requested but the stack only has {} elements",
                    self.items.len()
                ))
            })
    }

    /// Copy the `n`th element to the top of the stack (`CINDEX`)
    pub fn copy_from_top(&mut self, n: i32) -> Result<()> {
        let value = self.items[self.position_from_top(n)?];
        self.push(value)
    }

    /// Move the `n`th element to the top of the stack (`MINDEX`)
    pub fn move_to_top(&mut self, n: i32) -> Result<()> {
        let position = self.position_from_top(n)?;
        let value = self.items.remove(position);
        self.items.push(value);
        Ok(())
    }

    /// Swap the two topmost elements
    pub fn swap(&mut self) -> Result<()> {
        let len = self.items.len();
        if len < 2 {
            return Err(Error::hinting("pop from empty stack"));
        }
        self.items.swap(len - 1, len - 2);
        Ok(())
    }

    /// Move the third element to the top (`ROLL`)
    pub fn roll(&mut self) -> Result<()> {
        self.move_to_top(3)
    }

    #[cfg(test)]
    pub fn items(&self) -> &[i32] {
        &self.items
    }
}
