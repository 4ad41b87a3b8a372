use crate::{ttf_tables::program::Program, Error, Result};

/// Don't trust fonts that claim to need more than this many storage slots or functions
const MAX_ENTRIES_TO_RESERVE: usize = 1 << 12;

/// Indices on the stack are unsigned 32 bit integers
fn to_index(value: i32) -> usize {
    value as u32 as usize
}

fn clamp_reservation(what: &str, requested: usize) -> usize {
    if MAX_ENTRIES_TO_RESERVE < requested {
        log::warn!(
            "Font needs {requested} {what}, but we won't reserve more than {MAX_ENTRIES_TO_RESERVE}"
        );
        MAX_ENTRIES_TO_RESERVE
    } else {
        requested
    }
}

/// The storage area, addressed by `RS` and `WS`
#[derive(Clone, Debug)]
pub struct Storage {
    values: Box<[i32]>,
}

impl Storage {
    #[must_use]
    pub fn new(size: usize) -> Self {
        let size = clamp_reservation("storage areas", size);
        Self {
            values: vec![0; size].into_boxed_slice(),
        }
    }

    pub fn read(&self, index: i32) -> Result<i32> {
        self.values
            .get(to_index(index))
            .copied()
            .ok_or(Error::IndexOutOfRange {
                what: "storage",
                index: to_index(index),
                limit: self.values.len(),
            })
    }

    pub fn write(&mut self, index: i32, value: i32) -> Result<()> {
        let limit = self.values.len();
        let slot = self
            .values
            .get_mut(to_index(index))
            .ok_or(Error::IndexOutOfRange {
                what: "storage",
                index: to_index(index),
                limit,
            })?;
        *slot = value;
        Ok(())
    }
}

/// Where the body of a function lives.
///
/// Functions are usually defined in the font program, but the control value
/// program may define them too.
#[derive(Clone, Copy, Debug)]
pub struct FunctionDefinition<'a> {
    pub program: Program<'a>,

    /// Offset of the first instruction after the `FDEF`
    pub start: usize,
}

#[derive(Clone, Debug)]
pub struct FunctionTable<'a> {
    functions: Box<[Option<FunctionDefinition<'a>>]>,
}

impl<'a> FunctionTable<'a> {
    #[must_use]
    pub fn new(size: usize) -> Self {
        let size = clamp_reservation("function definitions", size);
        Self {
            functions: vec![None; size].into_boxed_slice(),
        }
    }

    pub fn define(&mut self, index: i32, function: FunctionDefinition<'a>) -> Result<()> {
        let limit = self.functions.len();
        let slot = self
            .functions
            .get_mut(to_index(index))
            .ok_or(Error::IndexOutOfRange {
                what: "function",
                index: to_index(index),
                limit,
            })?;

        if let Some(previous) = slot {
            return Err(Error::hinting(format!(
                "function {index} is defined twice (first in {:?} program at offset {})",
                previous.program.kind(),
                previous.start
            )));
        }

        *slot = Some(function);
        Ok(())
    }

    pub fn get(&self, index: i32) -> Result<FunctionDefinition<'a>> {
        let slot = self
            .functions
            .get(to_index(index))
            .ok_or(Error::IndexOutOfRange {
                what: "function",
                index: to_index(index),
                limit: self.functions.len(),
            })?;

        slot.ok_or_else(|| Error::hinting(format!("call to undefined function {index}")))
    }
}
