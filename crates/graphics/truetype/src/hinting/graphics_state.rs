use super::{op::Axis, F26Dot6};
use crate::{Error, Result};

/// A vector of length one, stored as two `2.14` fixed point components
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitVector {
    x: i32,
    y: i32,
}

impl UnitVector {
    const ONE: i32 = 1 << 14;

    pub const X_AXIS: Self = Self { x: Self::ONE, y: 0 };
    pub const Y_AXIS: Self = Self { x: 0, y: Self::ONE };

    /// Normalize `(x, y)` to unit length.
    ///
    /// The null vector can't be normalized and is rejected.
    pub fn new(x: i32, y: i32) -> Result<Self> {
        let length = f64::from(x).hypot(f64::from(y));
        if length == 0. {
            return Err(Error::hinting("cannot normalize the null vector"));
        }

        let scale = f64::from(Self::ONE) / length;
        Ok(Self {
            x: (f64::from(x) * scale).round() as i32,
            y: (f64::from(y) * scale).round() as i32,
        })
    }

    #[must_use]
    pub fn from_axis(axis: Axis) -> Self {
        match axis {
            Axis::X => Self::X_AXIS,
            Axis::Y => Self::Y_AXIS,
        }
    }

    /// The `x` component in `2.14` fixed point
    #[inline]
    #[must_use]
    pub fn x(&self) -> i32 {
        self.x
    }

    /// The `y` component in `2.14` fixed point
    #[inline]
    #[must_use]
    pub fn y(&self) -> i32 {
        self.y
    }

    /// Replace the `x` component and renormalize
    pub fn set_x(&mut self, x: i32) -> Result<()> {
        *self = Self::new(x, self.y)?;
        Ok(())
    }

    /// Replace the `y` component and renormalize
    pub fn set_y(&mut self, y: i32) -> Result<()> {
        *self = Self::new(self.x, y)?;
        Ok(())
    }

    #[must_use]
    pub fn length(&self) -> f64 {
        f64::from(self.x).hypot(f64::from(self.y)) / f64::from(Self::ONE)
    }
}

/// <https://developer.apple.com/fonts/TrueType-Reference-Manual/RM04/Chap4.html#round%20state>
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundState {
    HalfGrid,
    Grid,
    DoubleGrid,
    DownToGrid,
    UpToGrid,
    Off,
}

impl RoundState {
    /// Round a distance according to the current round state.
    ///
    /// `compensation` is the engine compensation for the distance type, it is
    /// applied before rounding and the sign of the input is preserved.
    #[must_use]
    pub fn round(&self, value: F26Dot6, compensation: F26Dot6) -> F26Dot6 {
        let magnitude = value.abs() + compensation;
        let rounded = match self {
            Self::HalfGrid => magnitude.floor() + F26Dot6::HALF,
            Self::Grid => (magnitude + F26Dot6::HALF).floor(),
            Self::DoubleGrid => F26Dot6::from_bits(magnitude.bits().wrapping_add(16) & !31),
            Self::DownToGrid => magnitude.floor(),
            Self::UpToGrid => magnitude.ceil(),
            Self::Off => return value,
        };

        // Rounding never changes the sign of a distance
        let rounded = rounded.max(F26Dot6::ZERO);
        if value.bits() < 0 {
            -rounded
        } else {
            rounded
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Zone {
    /// Z0
    Twilight,

    /// Z1
    Glyph,
}

impl TryFrom<i32> for Zone {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        let zone = match value {
            0 => Zone::Twilight,
            1 => Zone::Glyph,
            _ => {
                return Err(Error::hinting(format!(
                    "{value} is neither the twilight (0) nor the glyph zone (1)"
                )))
            },
        };

        Ok(zone)
    }
}

/// <https://developer.apple.com/fonts/TrueType-Reference-Manual/RM04/Chap4.html>
#[derive(Clone, Copy, Debug)]
pub struct GraphicsState {
    /// <https://developer.apple.com/fonts/TrueType-Reference-Manual/RM04/Chap4.html#auto%20flip>
    pub auto_flip: bool,

    /// <https://developer.apple.com/fonts/TrueType-Reference-Manual/RM04/Chap4.html#control_value_cut-in>
    pub control_value_cut_in: F26Dot6,

    /// <https://developer.apple.com/fonts/TrueType-Reference-Manual/RM04/Chap4.html#delta%20base>
    pub delta_base: u32,

    /// <https://developer.apple.com/fonts/TrueType-Reference-Manual/RM04/Chap4.html#delta%20shift>
    pub delta_shift: u32,

    /// <https://developer.apple.com/fonts/TrueType-Reference-Manual/RM04/Chap4.html#freedom%20vector>
    pub freedom_vector: UnitVector,

    /// <https://developer.apple.com/fonts/TrueType-Reference-Manual/RM04/Chap4.html#instruct%20control>
    pub instruct_control: u32,

    /// <https://developer.apple.com/fonts/TrueType-Reference-Manual/RM04/Chap4.html#loop>
    pub loop_n: u32,

    /// <https://developer.apple.com/fonts/TrueType-Reference-Manual/RM04/Chap4.html#minimum%20distance>
    pub minimum_distance: F26Dot6,

    /// <https://developer.apple.com/fonts/TrueType-Reference-Manual/RM04/Chap4.html#projection%20vector>
    pub projection_vector: UnitVector,

    /// <https://developer.apple.com/fonts/TrueType-Reference-Manual/RM04/Chap4.html#round%20state>
    pub round_state: RoundState,

    /// <https://developer.apple.com/fonts/TrueType-Reference-Manual/RM04/Chap4.html#rp0>
    pub rp0: u32,

    /// <https://developer.apple.com/fonts/TrueType-Reference-Manual/RM04/Chap4.html#rp1>
    pub rp1: u32,

    /// <https://developer.apple.com/fonts/TrueType-Reference-Manual/RM04/Chap4.html#rp2>
    pub rp2: u32,

    /// <https://developer.apple.com/fonts/TrueType-Reference-Manual/RM04/Chap4.html#scan%20control>
    pub scan_control: bool,

    /// Set by `SCANTYPE`
    pub scan_type: i32,

    /// <https://developer.apple.com/fonts/TrueType-Reference-Manual/RM04/Chap4.html#single_width_cut_in>
    pub single_width_cut_in: F26Dot6,

    /// <https://developer.apple.com/fonts/TrueType-Reference-Manual/RM04/Chap4.html#single_width_value>
    pub single_width_value: F26Dot6,

    /// <https://developer.apple.com/fonts/TrueType-Reference-Manual/RM04/Chap4.html#zp0>
    pub zp0: Zone,

    /// <https://developer.apple.com/fonts/TrueType-Reference-Manual/RM04/Chap4.html#zp1>
    pub zp1: Zone,

    /// <https://developer.apple.com/fonts/TrueType-Reference-Manual/RM04/Chap4.html#zp2>
    pub zp2: Zone,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            auto_flip: true,
            // 17/16 pixels
            control_value_cut_in: F26Dot6::from_bits(68),
            delta_base: 9,
            delta_shift: 3,
            freedom_vector: UnitVector::X_AXIS,
            instruct_control: 0,
            loop_n: 1,
            minimum_distance: F26Dot6::ONE,
            projection_vector: UnitVector::X_AXIS,
            round_state: RoundState::Grid,
            rp0: 0,
            rp1: 0,
            rp2: 0,
            scan_control: false,
            scan_type: 0,
            single_width_cut_in: F26Dot6::ZERO,
            single_width_value: F26Dot6::ZERO,
            zp0: Zone::Glyph,
            zp1: Zone::Glyph,
            zp2: Zone::Glyph,
        }
    }
}

impl GraphicsState {
    pub fn set_vectors_to_axis(&mut self, axis: Axis) {
        self.projection_vector = UnitVector::from_axis(axis);
        self.freedom_vector = UnitVector::from_axis(axis);
    }
}
