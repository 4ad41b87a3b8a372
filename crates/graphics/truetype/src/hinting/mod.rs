//! The TrueType bytecode interpreter.
//!
//! Fonts ship small programs that adjust glyph outlines to the pixel grid
//! at a given resolution. See
//! <https://developer.apple.com/fonts/TrueType-Reference-Manual/RM03/Chap3.html> for an overview.

mod graphics_state;
mod instructions;
mod interpreter;
mod op;
mod stack;
mod storage;

use std::{fmt, ops};

pub use graphics_state::{GraphicsState, RoundState, UnitVector, Zone};
pub use instructions::{validate, Instruction, Instructions};
pub use interpreter::{Interpreter, MAX_CALL_DEPTH, MAX_INSTRUCTIONS};
pub use op::{Axis, Opcode};

/// Fixed point number with 6 fractional bits, the unit of distances inside the interpreter
#[derive(Clone, Copy, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct F26Dot6(i32);

impl F26Dot6 {
    pub const ZERO: Self = Self(0);
    pub const HALF: Self = Self(32);
    pub const ONE: Self = Self(64);

    #[inline]
    #[must_use]
    pub const fn from_bits(bits: i32) -> Self {
        Self(bits)
    }

    #[inline]
    #[must_use]
    pub const fn bits(&self) -> i32 {
        self.0
    }

    /// Scale a distance in font units to pixels at the given resolution
    #[must_use]
    pub fn from_funits(value: i32, ppem: u32, units_per_em: u16) -> Self {
        let scaled = i64::from(value) * 64 * i64::from(ppem);
        let units_per_em = i64::from(units_per_em.max(1));

        // Round to nearest, away from zero on ties
        let half = units_per_em / 2;
        let bits = if scaled < 0 {
            (scaled - half) / units_per_em
        } else {
            (scaled + half) / units_per_em
        };
        Self(bits as i32)
    }

    #[inline]
    #[must_use]
    pub const fn abs(self) -> Self {
        Self(self.0.wrapping_abs())
    }

    #[inline]
    #[must_use]
    pub const fn floor(self) -> Self {
        Self(self.0 & !63)
    }

    #[inline]
    #[must_use]
    pub const fn ceil(self) -> Self {
        Self(self.0.wrapping_add(63) & !63)
    }

    /// The integer part
    #[inline]
    #[must_use]
    pub const fn trunc_to_int(self) -> i32 {
        self.0 >> 6
    }
}

impl From<F26Dot6> for f32 {
    fn from(value: F26Dot6) -> Self {
        value.0 as f32 / 64.
    }
}

impl fmt::Debug for F26Dot6 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", f32::from(*self))
    }
}

impl fmt::Display for F26Dot6 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", f32::from(*self))
    }
}

impl ops::Add for F26Dot6 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.wrapping_add(rhs.0))
    }
}

impl ops::AddAssign for F26Dot6 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl ops::Sub for F26Dot6 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0.wrapping_sub(rhs.0))
    }
}

impl ops::Neg for F26Dot6 {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(self.0.wrapping_neg())
    }
}
