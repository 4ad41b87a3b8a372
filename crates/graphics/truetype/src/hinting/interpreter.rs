use super::{
    graphics_state::{RoundState, UnitVector, Zone},
    instructions::{validate, Instruction, Instructions},
    op::Opcode,
    stack::Stack,
    storage::{FunctionDefinition, FunctionTable, Storage},
    F26Dot6, GraphicsState,
};
use crate::{
    path::{Contour, GlyphPoint},
    ttf_tables::{
        cvt::CvtTable,
        glyf::SimpleGlyph,
        maxp::MaxPTable,
        program::{Program, ProgramKind},
    },
    Error, Result,
};

/// Maximum nesting of `CALL` and `LOOPCALL`
pub const MAX_CALL_DEPTH: usize = 64;

/// Upper bound for the number of instructions executed in a single hinting run.
///
/// Jumps make it possible to write programs that never terminate.
pub const MAX_INSTRUCTIONS: usize = 1_000_000;

/// The value pushed by `GETINFO` when asked for the engine version
const ENGINE_VERSION: i32 = 35;

/// `INSTCTRL` selector that prevents glyph programs from running
const INHIBIT_GLYPH_PROGRAMS: u32 = 1 << 0;

/// `SCANCTRL` flags other than the ppem threshold (`0x100`)
const UNSUPPORTED_SCAN_CONTROL_FLAGS: u32 = 0x3E00;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum IterationDecision {
    Continue,
    Return,
}

/// Executes the font program, the control value program and a glyph program
/// against one shared state.
///
/// An interpreter is meant to be used for a single glyph at a single resolution.
#[derive(Clone, Debug)]
pub struct Interpreter<'a> {
    stack: Stack,
    storage: Storage,
    functions: FunctionTable<'a>,
    graphics_state: GraphicsState,

    /// Control values, scaled to the current resolution
    cvt: Vec<F26Dot6>,
    twilight_zone: Vec<GlyphPoint>,
    glyph_zone: Vec<GlyphPoint>,
    ppem: u32,
    units_per_em: u16,
    executed_instructions: usize,
}

impl<'a> Interpreter<'a> {
    /// Create an interpreter for rendering with the given grid size (in font units per pixel)
    pub fn new(maxp: &MaxPTable, cvt: &CvtTable, units_per_em: u16, grid_size: u32) -> Result<Self> {
        if grid_size == 0 || u32::from(units_per_em) < grid_size {
            return Err(Error::InvalidGridSize(grid_size));
        }
        let ppem = u32::from(units_per_em) / grid_size;

        let cvt = cvt
            .values()
            .iter()
            .map(|&value| F26Dot6::from_funits(value.into(), ppem, units_per_em))
            .collect();

        Ok(Self {
            stack: Stack::with_capacity(maxp.max_stack_elements.into()),
            storage: Storage::new(maxp.max_storage.into()),
            functions: FunctionTable::new(maxp.max_function_defs.into()),
            graphics_state: GraphicsState::default(),
            cvt,
            twilight_zone: vec![GlyphPoint::on_curve(0, 0); maxp.max_twilight_points.into()],
            glyph_zone: vec![],
            ppem,
            units_per_em,
            executed_instructions: 0,
        })
    }

    #[inline]
    #[must_use]
    pub fn ppem(&self) -> u32 {
        self.ppem
    }

    #[inline]
    #[must_use]
    pub fn graphics_state(&self) -> &GraphicsState {
        &self.graphics_state
    }

    /// The current control values, in pixels
    #[inline]
    #[must_use]
    pub fn cvt(&self) -> &[F26Dot6] {
        &self.cvt
    }

    /// Run the whole hinting pipeline for a glyph.
    ///
    /// Returns the glyph with the adjusted outline.
    pub fn hint(
        mut self,
        font_program: Program<'a>,
        control_value_program: Program<'a>,
        glyph: &'a SimpleGlyph,
    ) -> Result<SimpleGlyph> {
        self.run(font_program)?;
        self.run(control_value_program)?;

        self.glyph_zone = glyph.points().copied().collect();
        if self.graphics_state.instruct_control & INHIBIT_GLYPH_PROGRAMS == 0 {
            self.run(Program::new(ProgramKind::Glyph, &glyph.instructions))?;
        } else {
            log::debug!("Glyph program is inhibited by the control value program");
        }

        let mut points = self.glyph_zone.into_iter();
        let contours = glyph
            .contours
            .iter()
            .map(|contour| Contour::new(points.by_ref().take(contour.len()).collect()))
            .collect();

        Ok(SimpleGlyph {
            metrics: glyph.metrics,
            instructions: glyph.instructions.clone(),
            contours,
        })
    }

    /// Validate and execute a program
    pub fn run(&mut self, program: Program<'a>) -> Result<()> {
        if program.is_empty() {
            return Ok(());
        }

        validate(program.bytecode())?;
        log::debug!(
            "Executing {:?} program ({} bytes) at {} ppem",
            program.kind(),
            program.bytecode().len(),
            self.ppem
        );

        self.execute(program, 0, 0)
    }

    /// Execute instructions starting at `start` until the end of the program,
    /// or until the `ENDF` of the current function if `call_depth` is nonzero.
    fn execute(&mut self, program: Program<'a>, start: usize, call_depth: usize) -> Result<()> {
        let bytecode = program.bytecode();
        let mut pc = start;

        while pc < bytecode.len() {
            self.executed_instructions += 1;
            if MAX_INSTRUCTIONS < self.executed_instructions {
                return Err(Error::hinting(format!(
                    "exceeded the limit of {MAX_INSTRUCTIONS} executed instructions"
                )));
            }

            let instruction = Instruction::decode(bytecode, pc)?;
            log::trace!(
                "{:?}@{}: {} (stack depth {})",
                program.kind(),
                instruction.offset,
                instruction.opcode.mnemonic(),
                self.stack.depth()
            );

            let mut next_pc = instruction.next_offset();
            match self.execute_instruction(program, &instruction, &mut next_pc, call_depth)? {
                IterationDecision::Continue => pc = next_pc,
                IterationDecision::Return => return Ok(()),
            }
        }

        if call_depth != 0 {
            return Err(Error::hinting("function body runs past the end of its program"));
        }
        Ok(())
    }

    fn execute_instruction(
        &mut self,
        program: Program<'a>,
        instruction: &Instruction<'a>,
        next_pc: &mut usize,
        call_depth: usize,
    ) -> Result<IterationDecision> {
        let offset = instruction.offset;

        match instruction.opcode {
            Opcode::SVTCA(axis) => self.graphics_state.set_vectors_to_axis(axis),
            Opcode::SPVTCA(axis) => {
                self.graphics_state.projection_vector = UnitVector::from_axis(axis);
            },
            Opcode::SFVTCA(axis) => {
                self.graphics_state.freedom_vector = UnitVector::from_axis(axis);
            },
            Opcode::SRP0 => self.graphics_state.rp0 = self.stack.pop_u32()?,
            Opcode::SRP1 => self.graphics_state.rp1 = self.stack.pop_u32()?,
            Opcode::SRP2 => self.graphics_state.rp2 = self.stack.pop_u32()?,
            Opcode::SZP0 => self.graphics_state.zp0 = Zone::try_from(self.stack.pop()?)?,
            Opcode::SZP1 => self.graphics_state.zp1 = Zone::try_from(self.stack.pop()?)?,
            Opcode::SZP2 => self.graphics_state.zp2 = Zone::try_from(self.stack.pop()?)?,
            Opcode::SZPS => {
                let zone = Zone::try_from(self.stack.pop()?)?;

                self.graphics_state.zp0 = zone;
                self.graphics_state.zp1 = zone;
                self.graphics_state.zp2 = zone;
            },
            Opcode::SLOOP => {
                let n = self.stack.pop()?;
                if n <= 0 {
                    return Err(Error::hinting(format!("SLOOP with a count of {n}")));
                }
                self.graphics_state.loop_n = n as u32;
            },
            Opcode::RTG => self.graphics_state.round_state = RoundState::Grid,
            Opcode::RTHG => self.graphics_state.round_state = RoundState::HalfGrid,
            Opcode::RTDG => self.graphics_state.round_state = RoundState::DoubleGrid,
            Opcode::RDTG => self.graphics_state.round_state = RoundState::DownToGrid,
            Opcode::RUTG => self.graphics_state.round_state = RoundState::UpToGrid,
            Opcode::ROFF => self.graphics_state.round_state = RoundState::Off,
            Opcode::SMD => {
                self.graphics_state.minimum_distance = F26Dot6::from_bits(self.stack.pop()?);
            },
            Opcode::SCVTCI => {
                self.graphics_state.control_value_cut_in = F26Dot6::from_bits(self.stack.pop()?);
            },
            Opcode::SSWCI => {
                self.graphics_state.single_width_cut_in = F26Dot6::from_bits(self.stack.pop()?);
            },
            Opcode::SSW => {
                let funits = self.stack.pop()?;
                self.graphics_state.single_width_value =
                    F26Dot6::from_funits(funits, self.ppem, self.units_per_em);
            },
            Opcode::FLIPON => self.graphics_state.auto_flip = true,
            Opcode::FLIPOFF => self.graphics_state.auto_flip = false,
            Opcode::SDB => self.graphics_state.delta_base = self.stack.pop_u32()?,
            Opcode::SDS => {
                let delta_shift = self.stack.pop_u32()?;
                if 6 < delta_shift {
                    return Err(Error::hinting(format!(
                        "delta shift must be at most 6, got {delta_shift}"
                    )));
                }
                self.graphics_state.delta_shift = delta_shift;
            },
            Opcode::SCANCTRL => {
                let flags = self.stack.pop_u32()?;
                self.set_scan_control(flags)?;
            },
            Opcode::SCANTYPE => self.graphics_state.scan_type = self.stack.pop()?,
            Opcode::INSTCTRL => {
                let selector = self.stack.pop()?;
                let value = self.stack.pop()?;
                self.set_instruction_control(program.kind(), selector, value)?;
            },
            Opcode::GETINFO => {
                let request = self.stack.pop()?;
                let result = if request & 1 != 0 { ENGINE_VERSION } else { 0 };
                self.stack.push(result)?;
            },

            // Stack manipulation
            Opcode::DUP => {
                let top = self.stack.peek()?;
                self.stack.push(top)?;
            },
            Opcode::POP => {
                self.stack.pop()?;
            },
            Opcode::CLEAR => self.stack.clear(),
            Opcode::SWAP => self.stack.swap()?,
            Opcode::DEPTH => {
                let depth = self.stack.depth() as i32;
                self.stack.push(depth)?;
            },
            Opcode::CINDEX => {
                let n = self.stack.pop()?;
                self.stack.copy_from_top(n)?;
            },
            Opcode::MINDEX => {
                let n = self.stack.pop()?;
                self.stack.move_to_top(n)?;
            },
            Opcode::ROLL => self.stack.roll()?,
            Opcode::PUSHB(_) | Opcode::NPUSHB => {
                for &byte in instruction.operands {
                    self.stack.push(i32::from(byte))?;
                }
            },
            Opcode::PUSHW(_) | Opcode::NPUSHW => {
                for word in instruction.operands.chunks_exact(2) {
                    let word = i16::from_be_bytes([word[0], word[1]]);
                    self.stack.push(i32::from(word))?;
                }
            },

            // Storage and control values
            Opcode::WS => {
                let value = self.stack.pop()?;
                let index = self.stack.pop()?;
                self.storage.write(index, value)?;
            },
            Opcode::RS => {
                let index = self.stack.pop()?;
                let value = self.storage.read(index)?;
                self.stack.push(value)?;
            },
            Opcode::WCVTP => {
                let value = F26Dot6::from_bits(self.stack.pop()?);
                let index = self.stack.pop()?;
                *self.cvt_entry(index)? = value;
            },
            Opcode::WCVTF => {
                let funits = self.stack.pop()?;
                let index = self.stack.pop()?;
                let value = F26Dot6::from_funits(funits, self.ppem, self.units_per_em);
                *self.cvt_entry(index)? = value;
            },
            Opcode::RCVT => {
                let index = self.stack.pop()?;
                let value = *self.cvt_entry(index)?;
                self.stack.push(value.bits())?;
            },
            Opcode::MPPEM => self.stack.push(self.ppem as i32)?,

            // Logical and relational functions
            Opcode::LT => self.compare(|e1, e2| e1 < e2)?,
            Opcode::LTEQ => self.compare(|e1, e2| e1 <= e2)?,
            Opcode::GT => self.compare(|e1, e2| e1 > e2)?,
            Opcode::GTEQ => self.compare(|e1, e2| e1 >= e2)?,
            Opcode::EQ => self.compare(|e1, e2| e1 == e2)?,
            Opcode::NEQ => self.compare(|e1, e2| e1 != e2)?,
            Opcode::AND => self.compare(|e1, e2| e1 != 0 && e2 != 0)?,
            Opcode::OR => self.compare(|e1, e2| e1 != 0 || e2 != 0)?,
            Opcode::NOT => {
                let value = self.stack.pop_bool()?;
                self.stack.push_bool(!value)?;
            },
            Opcode::ODD | Opcode::EVEN => {
                let value = F26Dot6::from_bits(self.stack.pop()?);
                let rounded = self.graphics_state.round_state.round(value, F26Dot6::ZERO);
                let is_odd = rounded.trunc_to_int() & 1 == 1;
                self.stack
                    .push_bool(is_odd == (instruction.opcode == Opcode::ODD))?;
            },

            // Arithmetic
            Opcode::ADD => self.arithmetic(|e1, e2| Ok(e1.wrapping_add(e2)))?,
            Opcode::SUB => self.arithmetic(|e1, e2| Ok(e1.wrapping_sub(e2)))?,
            Opcode::DIV => self.arithmetic(|e1, e2| {
                if e2 == 0 {
                    return Err(Error::hinting("division by zero"));
                }
                Ok((i64::from(e1) * 64 / i64::from(e2)) as i32)
            })?,
            Opcode::MUL => self.arithmetic(|e1, e2| Ok((i64::from(e1) * i64::from(e2) / 64) as i32))?,
            Opcode::MAX => self.arithmetic(|e1, e2| Ok(e1.max(e2)))?,
            Opcode::MIN => self.arithmetic(|e1, e2| Ok(e1.min(e2)))?,
            Opcode::ABS => self.map_top(F26Dot6::abs)?,
            Opcode::NEG => self.map_top(|value| -value)?,
            Opcode::FLOOR => self.map_top(|value| value.floor())?,
            Opcode::CEILING => self.map_top(|value| value.ceil())?,
            Opcode::ROUND(_) => {
                let round_state = self.graphics_state.round_state;
                self.map_top(|value| round_state.round(value, F26Dot6::ZERO))?;
            },
            Opcode::NROUND(_) => {
                // Engine compensation is zero, so this only checks the operand
                self.stack.peek()?;
            },

            // Control flow
            Opcode::IF => {
                if !self.stack.pop_bool()? {
                    // Find the corresponding ELSE (or EIF) instruction, then jump one *past* it
                    *next_pc = find_end_of_block(program, *next_pc, true)?;
                }
            },
            Opcode::ELSE => {
                // If we just found the ELSE it means we're done executing the IF block.
                // Find the corresponding EIF and jump past it.
                *next_pc = find_end_of_block(program, *next_pc, false)?;
            },
            Opcode::EIF => {},
            Opcode::JMPR => {
                let jump_offset = self.stack.pop()?;
                *next_pc = jump_target(program, offset, jump_offset)?;
            },
            Opcode::JROT | Opcode::JROF => {
                let condition = self.stack.pop_bool()?;
                let jump_offset = self.stack.pop()?;
                if condition == (instruction.opcode == Opcode::JROT) {
                    *next_pc = jump_target(program, offset, jump_offset)?;
                }
            },

            // Functions
            Opcode::FDEF => {
                let index = self.stack.pop()?;
                let function = FunctionDefinition {
                    program,
                    start: *next_pc,
                };
                self.functions.define(index, function)?;
                *next_pc = find_end_of_function(program, *next_pc)?;
            },
            Opcode::ENDF => {
                if call_depth == 0 {
                    return Err(Error::hinting(format!(
                        "ENDF at offset {offset} outside of a function"
                    )));
                }
                return Ok(IterationDecision::Return);
            },
            Opcode::CALL => {
                let index = self.stack.pop()?;
                self.call(index, call_depth)?;
            },
            Opcode::LOOPCALL => {
                let index = self.stack.pop()?;
                let count = self.stack.pop()?;
                for _ in 0..count.max(0) {
                    self.call(index, call_depth)?;
                }
            },

            // Delta exceptions
            Opcode::DELTAC1 => self.delta_c(0)?,
            Opcode::DELTAC2 => self.delta_c(16)?,
            Opcode::DELTAC3 => self.delta_c(32)?,

            // Point movement
            Opcode::MIAP(_) => {
                let cvt_index = self.stack.pop()?;
                let point_index = self.stack.pop_u32()?;

                self.cvt_entry(cvt_index)?;
                let zone = self.graphics_state.zp0;
                let zone_len = self.zone(zone).len();
                if zone_len <= point_index as usize {
                    return Err(Error::IndexOutOfRange {
                        what: "point",
                        index: point_index as usize,
                        limit: zone_len,
                    });
                }

                log::warn!(
                    "MIAP at offset {offset} does not move point {point_index} in the {zone:?} zone, positioning is not applied"
                );
                self.graphics_state.rp0 = point_index;
                self.graphics_state.rp1 = point_index;
            },

            // Anachronistic or debugging instructions without an effect
            Opcode::AA | Opcode::DEBUG => {
                self.stack.pop()?;
            },

            Opcode::Unknown(byte) => {
                return Err(Error::hinting(format!(
                    "unknown opcode {byte:#04x} at offset {offset}"
                )));
            },
            other => {
                return Err(Error::UnimplementedOpcode {
                    mnemonic: other.mnemonic(),
                    offset,
                })
            },
        }

        Ok(IterationDecision::Continue)
    }

    fn call(&mut self, index: i32, call_depth: usize) -> Result<()> {
        let function = self.functions.get(index)?;
        if call_depth == MAX_CALL_DEPTH {
            return Err(Error::hinting(format!(
                "function calls are nested deeper than {MAX_CALL_DEPTH}"
            )));
        }

        self.execute(function.program, function.start, call_depth + 1)
    }

    /// Pop `e2`, then `e1` and push `f(e1, e2)`
    fn compare<F: FnOnce(i32, i32) -> bool>(&mut self, f: F) -> Result<()> {
        let e2 = self.stack.pop()?;
        let e1 = self.stack.pop()?;
        self.stack.push_bool(f(e1, e2))
    }

    /// Pop `e2`, then `e1` and push `f(e1, e2)`
    fn arithmetic<F: FnOnce(i32, i32) -> Result<i32>>(&mut self, f: F) -> Result<()> {
        let e2 = self.stack.pop()?;
        let e1 = self.stack.pop()?;
        self.stack.push(f(e1, e2)?)
    }

    fn map_top<F: FnOnce(F26Dot6) -> F26Dot6>(&mut self, f: F) -> Result<()> {
        let value = F26Dot6::from_bits(self.stack.pop()?);
        self.stack.push(f(value).bits())
    }

    fn cvt_entry(&mut self, index: i32) -> Result<&mut F26Dot6> {
        let limit = self.cvt.len();
        self.cvt
            .get_mut(index as u32 as usize)
            .ok_or(Error::IndexOutOfRange {
                what: "cvt",
                index: index as u32 as usize,
                limit,
            })
    }

    fn zone(&self, zone: Zone) -> &[GlyphPoint] {
        match zone {
            Zone::Twilight => &self.twilight_zone,
            Zone::Glyph => &self.glyph_zone,
        }
    }

    /// <https://developer.apple.com/fonts/TrueType-Reference-Manual/RM05/Chap5.html#DELTAC1>
    fn delta_c(&mut self, bias: u32) -> Result<()> {
        let num_pairs = self.stack.pop_u32()?;

        for _ in 0..num_pairs {
            let cvt_index = self.stack.pop()?;
            let encoded = self.stack.pop_u32()?;

            // A target that overflows can't match any resolution
            let target_ppem = ((encoded >> 4) & 0xF)
                .checked_add(self.graphics_state.delta_base)
                .and_then(|ppem| ppem.checked_add(bias));
            if target_ppem != Some(self.ppem) {
                continue;
            }

            // The low nibble encodes -8..=8, skipping zero
            let mut magnitude = (encoded & 0xF) as i32 - 8;
            if magnitude >= 0 {
                magnitude += 1;
            }
            let adjustment = magnitude * (1 << (6 - self.graphics_state.delta_shift));

            log::debug!("Adjusting cvt[{cvt_index}] by {adjustment}/64 at {} ppem", self.ppem);
            *self.cvt_entry(cvt_index)? += F26Dot6::from_bits(adjustment);
        }
        Ok(())
    }

    /// <https://developer.apple.com/fonts/TrueType-Reference-Manual/RM05/Chap5.html#SCANCTRL>
    fn set_scan_control(&mut self, flags: u32) -> Result<()> {
        let threshold = flags & 0xFF;

        if threshold == 0xFF {
            self.graphics_state.scan_control = true;
        } else if threshold == 0 {
            self.graphics_state.scan_control = false;
        } else {
            if flags & UNSUPPORTED_SCAN_CONTROL_FLAGS != 0 {
                return Err(Error::hinting(format!(
                    "unsupported SCANCTRL flags {flags:#x}"
                )));
            }

            if flags & 0x100 != 0 && self.ppem <= threshold {
                self.graphics_state.scan_control = true;
            }
        }
        Ok(())
    }

    /// <https://developer.apple.com/fonts/TrueType-Reference-Manual/RM05/Chap5.html#INSTCTRL>
    fn set_instruction_control(&mut self, kind: ProgramKind, selector: i32, value: i32) -> Result<()> {
        if !(1..=3).contains(&selector) {
            return Err(Error::hinting(format!(
                "INSTCTRL selector must be 1, 2 or 3, got {selector}"
            )));
        }

        if kind != ProgramKind::ControlValue {
            log::debug!("Ignoring INSTCTRL outside of the control value program");
            return Ok(());
        }

        let flag = 1 << (selector - 1);
        if value != 0 {
            self.graphics_state.instruct_control |= flag;
        } else {
            self.graphics_state.instruct_control &= !flag;
        }
        Ok(())
    }
}

/// Offset of the instruction after the `ELSE` or `EIF` that closes the block
/// containing `start`.
///
/// `ELSE` is only considered if `stop_at_else` is set.
fn find_end_of_block(program: Program<'_>, start: usize, stop_at_else: bool) -> Result<usize> {
    let mut depth = 0;
    for instruction in Instructions::starting_at(program.bytecode(), start) {
        let instruction = instruction?;
        match instruction.opcode {
            Opcode::IF => depth += 1,
            Opcode::ELSE if depth == 0 && stop_at_else => return Ok(instruction.next_offset()),
            Opcode::EIF => {
                if depth == 0 {
                    return Ok(instruction.next_offset());
                }
                depth -= 1;
            },
            _ => {},
        }
    }

    Err(Error::hinting(format!(
        "missing EIF for the block ending at offset {start}"
    )))
}

/// Offset of the instruction after the `ENDF` that closes the function starting at `start`
fn find_end_of_function(program: Program<'_>, start: usize) -> Result<usize> {
    for instruction in Instructions::starting_at(program.bytecode(), start) {
        let instruction = instruction?;
        if instruction.opcode == Opcode::ENDF {
            return Ok(instruction.next_offset());
        }
    }

    Err(Error::hinting(format!(
        "missing ENDF for the function starting at offset {start}"
    )))
}

/// Jumps are relative to the jump instruction itself
fn jump_target(program: Program<'_>, offset: usize, jump_offset: i32) -> Result<usize> {
    let target = offset as i64 + i64::from(jump_offset);
    if target < 0 || (program.bytecode().len() as i64) < target {
        return Err(Error::hinting(format!(
            "jump from offset {offset} by {jump_offset} leaves the program"
        )));
    }
    Ok(target as usize)
}
