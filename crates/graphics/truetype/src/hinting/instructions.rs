use std::iter::FusedIterator;

use super::op::Opcode;
use crate::{Error, Result};

/// A decoded instruction together with its inline data
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instruction<'a> {
    /// Position of the opcode within the program
    pub offset: usize,
    pub opcode: Opcode,

    /// The raw bytes pushed by `PUSHB`, `PUSHW`, `NPUSHB` and `NPUSHW`, empty otherwise
    pub operands: &'a [u8],
}

impl<'a> Instruction<'a> {
    /// Decode the instruction at `offset`
    pub fn decode(program: &'a [u8], offset: usize) -> Result<Self> {
        let byte = *program
            .get(offset)
            .ok_or_else(|| Error::hinting(format!("no instruction at offset {offset}")))?;
        let opcode = Opcode::from_byte(byte);

        let (operands_start, operand_size) = match opcode.inline_operand_size() {
            Some(size) => (offset + 1, size),
            None => {
                let count = *program.get(offset + 1).ok_or_else(|| truncated(opcode, offset))?;
                let size = if opcode == Opcode::NPUSHW {
                    2 * count as usize
                } else {
                    count as usize
                };
                (offset + 2, size)
            },
        };

        let operands = program
            .get(operands_start..operands_start + operand_size)
            .ok_or_else(|| truncated(opcode, offset))?;

        Ok(Self {
            offset,
            opcode,
            operands,
        })
    }

    /// Offset of the instruction that follows this one
    #[must_use]
    pub fn next_offset(&self) -> usize {
        let count_byte = usize::from(self.opcode.inline_operand_size().is_none());
        self.offset + 1 + count_byte + self.operands.len()
    }
}

fn truncated(opcode: Opcode, offset: usize) -> Error {
    Error::hinting(format!(
        "{} at offset {offset} is missing its inline data",
        opcode.mnemonic()
    ))
}

/// An iterator over the instructions of a program
///
/// ## Why?
/// Truetype instructions encode their operands as part of the program.
/// For example, the PUSHB instructions push bytes on the stack, and these bytes
/// are stored directly after the instruction.
/// Therefore, simply iterating over the bytes of a program is not sufficient, since
/// operands will be misinterpreted as opcodes.
#[derive(Clone, Debug)]
pub struct Instructions<'a> {
    program: &'a [u8],
    offset: usize,
    done: bool,
}

impl<'a> Instructions<'a> {
    #[must_use]
    pub fn new(program: &'a [u8]) -> Self {
        Self::starting_at(program, 0)
    }

    #[must_use]
    pub fn starting_at(program: &'a [u8], offset: usize) -> Self {
        Self {
            program,
            offset,
            done: false,
        }
    }
}

impl<'a> Iterator for Instructions<'a> {
    type Item = Result<Instruction<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.program.len() <= self.offset {
            return None;
        }

        match Instruction::decode(self.program, self.offset) {
            Ok(instruction) => {
                self.offset = instruction.next_offset();
                Some(Ok(instruction))
            },
            Err(error) => {
                self.done = true;
                Some(Err(error))
            },
        }
    }
}

impl<'a> FusedIterator for Instructions<'a> {}

#[derive(Clone, Copy, Debug)]
struct OpenIf {
    offset: usize,
    has_else: bool,
}

/// Check that the control flow of a program is well-formed before running it.
///
/// This way a malformed program fails before any of it was executed, instead of
/// halfway through while searching for the end of a block.
pub fn validate(program: &[u8]) -> Result<()> {
    let mut open_ifs: Vec<OpenIf> = vec![];

    // Offset of the open FDEF and the number of IFs that were open outside of it
    let mut open_function: Option<(usize, usize)> = None;

    for instruction in Instructions::new(program) {
        let instruction = instruction?;
        let offset = instruction.offset;

        match instruction.opcode {
            Opcode::IF => open_ifs.push(OpenIf {
                offset,
                has_else: false,
            }),
            Opcode::ELSE => {
                let inside_function = open_function.map_or(0, |(_, depth)| depth);
                let is_inside_if = inside_function < open_ifs.len();
                match open_ifs.last_mut() {
                    Some(open_if) if is_inside_if => {
                        if open_if.has_else {
                            return Err(Error::hinting(format!(
                                "second ELSE at offset {offset} for the IF at offset {}",
                                open_if.offset
                            )));
                        }
                        open_if.has_else = true;
                    },
                    _ => {
                        return Err(Error::hinting(format!(
                            "ELSE at offset {offset} without a matching IF"
                        )))
                    },
                }
            },
            Opcode::EIF => {
                let inside_function = open_function.map_or(0, |(_, depth)| depth);
                if open_ifs.len() <= inside_function {
                    return Err(Error::hinting(format!(
                        "EIF at offset {offset} without a matching IF"
                    )));
                }
                open_ifs.pop();
            },
            Opcode::FDEF | Opcode::IDEF => {
                if let Some((start, _)) = open_function {
                    return Err(Error::hinting(format!(
                        "{} at offset {offset} is nested inside the definition at offset {start}",
                        instruction.opcode.mnemonic()
                    )));
                }
                open_function = Some((offset, open_ifs.len()));
            },
            Opcode::ENDF => match open_function.take() {
                Some((start, depth)) => {
                    if open_ifs.len() != depth {
                        return Err(Error::hinting(format!(
                            "function defined at offset {start} ends inside an IF block"
                        )));
                    }
                },
                None => {
                    return Err(Error::hinting(format!(
                        "ENDF at offset {offset} without a matching FDEF"
                    )))
                },
            },
            _ => {},
        }
    }

    if let Some((start, _)) = open_function {
        return Err(Error::hinting(format!(
            "missing ENDF for the function defined at offset {start}"
        )));
    }

    if let Some(open_if) = open_ifs.last() {
        return Err(Error::hinting(format!(
            "missing EIF for the IF at offset {}",
            open_if.offset
        )));
    }

    Ok(())
}
