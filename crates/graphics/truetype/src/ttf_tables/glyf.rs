//! [Glyph](https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6glyf.html) table implementation

use std::fmt;

use super::{cmap::GlyphID, loca::LocaTable};
use crate::{
    path::{Contour, GlyphPoint},
    stream::Stream,
    Error, Result,
};

/// The maximum depth of composite glyphs referencing other composite glyphs.
///
/// Fonts may contain reference cycles, this bounds the work done for those.
pub const MAX_COMPOSITE_DEPTH: usize = 8;

/// The maximum number of components resolved for one glyph, counted across all nesting levels
pub const MAX_COMPOSITE_COMPONENTS: usize = 1024;

/// Point indices are `u16`, no resolved glyph can have more points than that
const MAX_POINTS: usize = u16::MAX as usize + 1;

pub struct GlyphOutlineTable<'a> {
    data: &'a [u8],
    loca_table: LocaTable<'a>,
}

impl<'a> GlyphOutlineTable<'a> {
    #[must_use]
    pub fn new(data: &'a [u8], loca_table: LocaTable<'a>) -> Self {
        Self { data, loca_table }
    }

    /// Decode the outline of a glyph.
    ///
    /// Composite glyphs are resolved into their components, the result
    /// is always a flat list of contours.
    pub fn get_glyph(&self, glyph_id: GlyphID) -> Result<SimpleGlyph> {
        let mut num_components = 0;
        self.resolve(glyph_id, 0, &mut num_components)
    }

    fn resolve(&self, glyph_id: GlyphID, depth: usize, num_components: &mut usize) -> Result<SimpleGlyph> {
        let range = self.loca_table.get_glyph_range(glyph_id)?;
        if range.is_empty() {
            // Glyphs without outlines, like the one for a space
            return Ok(SimpleGlyph::default());
        }

        let data = self
            .data
            .get(range.clone())
            .ok_or(Error::TruncatedFile {
                offset: range.start,
            })?;

        // Memory map is like this (same for simple & compound glyphs):
        // num contours          : i16
        // min x                 : i16
        // min y                 : i16
        // max x                 : i16
        // max y                 : i16
        let mut stream = Stream::new(data);
        let num_contours = stream.read::<i16>()?;
        let metrics = Metrics {
            min_x: stream.read()?,
            min_y: stream.read()?,
            max_x: stream.read()?,
            max_y: stream.read()?,
        };

        // A glyph is simple if num_contours is positive or zero
        if num_contours >= 0 {
            read_simple_glyph(glyph_id, stream, num_contours as usize, metrics)
        } else {
            if depth == MAX_COMPOSITE_DEPTH {
                return Err(Error::MalformedGlyph {
                    glyph_id: glyph_id.numeric(),
                    reason: "composite glyphs are nested too deeply",
                });
            }
            self.read_composite_glyph(glyph_id, stream, metrics, depth, num_components)
        }
    }

    fn read_composite_glyph(
        &self,
        glyph_id: GlyphID,
        mut stream: Stream<'a>,
        metrics: Metrics,
        depth: usize,
        num_components: &mut usize,
    ) -> Result<SimpleGlyph> {
        // Memory map for compound glyphs looks like this:
        //
        // component flag: u16                       \
        // glyph index: u16                           |
        // X offset, type depends on component flags  | Repeated any number
        // Y offset, type depends on component flags  | of times
        // Transformation options                    /
        let mut contours = vec![];
        let mut num_points = 0;
        let mut flag;
        loop {
            *num_components += 1;
            if MAX_COMPOSITE_COMPONENTS < *num_components {
                return Err(Error::MalformedGlyph {
                    glyph_id: glyph_id.numeric(),
                    reason: "composite glyph has too many components",
                });
            }

            flag = CompoundGlyphFlag(stream.read::<u16>()?);
            let component_id = GlyphID::new(stream.read::<u16>()?);

            if !flag.args_are_xy_values() {
                return Err(Error::UnsupportedComposite {
                    glyph_id: glyph_id.numeric(),
                });
            }

            let (x_offset, y_offset) = if flag.arg_1_and_2_are_words() {
                (stream.read::<i16>()?, stream.read::<i16>()?)
            } else {
                (
                    i16::from(stream.read::<i8>()?),
                    i16::from(stream.read::<i8>()?),
                )
            };

            let transform = if flag.has_scale() {
                let scale = read_f2dot14(&mut stream)?;
                Some([scale, 0., 0., scale])
            } else if flag.has_xy_scale() {
                let x_scale = read_f2dot14(&mut stream)?;
                let y_scale = read_f2dot14(&mut stream)?;
                Some([x_scale, 0., 0., y_scale])
            } else if flag.has_two_by_two() {
                Some([
                    read_f2dot14(&mut stream)?,
                    read_f2dot14(&mut stream)?,
                    read_f2dot14(&mut stream)?,
                    read_f2dot14(&mut stream)?,
                ])
            } else {
                None
            };

            log::debug!(
                "Glyph {glyph_id} references {component_id} at ({x_offset}, {y_offset}) with {flag:?}"
            );

            let component = self.resolve(component_id, depth + 1, num_components)?;
            num_points += component.num_points();
            if MAX_POINTS < num_points {
                return Err(Error::MalformedGlyph {
                    glyph_id: glyph_id.numeric(),
                    reason: "composite glyph has too many points",
                });
            }

            for mut contour in component.contours {
                for point in contour.points_mut() {
                    if let Some(transform) = transform {
                        apply_transform(point, transform);
                    }
                    point.x = point.x.wrapping_add(x_offset);
                    point.y = point.y.wrapping_add(y_offset);
                }
                contours.push(contour);
            }

            if flag.is_last_component() {
                break;
            }
        }

        let instructions = if flag.has_instructions() {
            let instruction_length = stream.read::<u16>()? as usize;
            stream.read_bytes(instruction_length)?.to_vec()
        } else {
            vec![]
        };

        Ok(SimpleGlyph {
            metrics,
            instructions,
            contours,
        })
    }
}

fn read_simple_glyph(
    glyph_id: GlyphID,
    mut stream: Stream<'_>,
    num_contours: usize,
    metrics: Metrics,
) -> Result<SimpleGlyph> {
    let malformed = |reason| Error::MalformedGlyph {
        glyph_id: glyph_id.numeric(),
        reason,
    };

    if num_contours == 0 {
        return Ok(SimpleGlyph {
            metrics,
            ..Default::default()
        });
    }

    // Simple glyphs are structured as follows:
    //
    // end points of contours: [u16; num contours]
    // instruction length    : u16
    // instructions          : [u8; instruction length]
    // flags                 : [u8; unknown]
    // x coords              : [u8 or i16; last value in "end points of contours" + 1]
    // y coords              : [u8 or i16; last value in "end points of contours" + 1]
    let mut end_points = Vec::with_capacity(num_contours);
    for _ in 0..num_contours {
        let end_point = stream.read::<u16>()? as usize;
        if end_points.last().is_some_and(|&previous| end_point <= previous) {
            return Err(malformed("contour end points are not increasing"));
        }
        end_points.push(end_point);
    }

    let instruction_length = stream.read::<u16>()? as usize;
    let instructions = stream.read_bytes(instruction_length)?.to_vec();

    // last value in end_points_of_contours
    let num_points = end_points.last().map_or(0, |&last| last + 1);

    // The size of the flag array is unknown, because a flag can repeat itself
    let mut flags = Vec::with_capacity(num_points);
    while flags.len() < num_points {
        let flag = GlyphFlag(stream.read::<u8>()?);
        flags.push(flag);

        if flag.repeat() {
            let repeat_for = stream.read::<u8>()? as usize;
            if num_points < flags.len() + repeat_for {
                return Err(malformed("flag repeat count exceeds the number of points"));
            }
            flags.extend(std::iter::repeat(flag).take(repeat_for));
        }
    }

    let xs = read_coordinates(&mut stream, &flags, GlyphFlag::coordinate_type_x)?;
    let ys = read_coordinates(&mut stream, &flags, GlyphFlag::coordinate_type_y)?;

    let mut points = flags
        .iter()
        .zip(xs)
        .zip(ys)
        .map(|((flag, x), y)| GlyphPoint {
            x,
            y,
            on_curve: flag.is_on_curve(),
        });

    let mut contours = Vec::with_capacity(num_contours);
    let mut first_point = 0;
    for end_point in end_points {
        let contour_points: Vec<GlyphPoint> = points.by_ref().take(end_point + 1 - first_point).collect();
        if contour_points.len() != end_point + 1 - first_point {
            return Err(malformed("point count does not match contour end points"));
        }
        contours.push(Contour::new(contour_points));
        first_point = end_point + 1;
    }

    Ok(SimpleGlyph {
        metrics,
        instructions,
        contours,
    })
}

/// Decode one delta-encoded coordinate per flag into absolute positions
fn read_coordinates(
    stream: &mut Stream<'_>,
    flags: &[GlyphFlag],
    coordinate_type: fn(&GlyphFlag) -> GlyphCoordinateType,
) -> Result<Vec<i16>> {
    let mut previous: i16 = 0;
    let mut coordinates = Vec::with_capacity(flags.len());

    for flag in flags {
        let delta = match coordinate_type(flag) {
            GlyphCoordinateType::SignedDelta16B => stream.read::<i16>()?,
            GlyphCoordinateType::ZeroDelta16B => 0,
            GlyphCoordinateType::Negative8B => -i16::from(stream.read::<u8>()?),
            GlyphCoordinateType::Positive8B => i16::from(stream.read::<u8>()?),
        };

        previous = previous.wrapping_add(delta);
        coordinates.push(previous);
    }

    Ok(coordinates)
}

fn read_f2dot14(stream: &mut Stream<'_>) -> Result<f32> {
    Ok(f32::from(stream.read::<i16>()?) / 16384.)
}

/// Apply a `[xx, xy, yx, yy]` component transform
fn apply_transform(point: &mut GlyphPoint, [a, b, c, d]: [f32; 4]) {
    let x = f32::from(point.x);
    let y = f32::from(point.y);

    // Float to int casts saturate
    point.x = (a * x + c * y).round() as i16;
    point.y = (b * x + d * y).round() as i16;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Metrics {
    pub min_x: i16,
    pub min_y: i16,
    pub max_x: i16,
    pub max_y: i16,
}

impl Metrics {
    #[must_use]
    pub fn width(&self) -> i32 {
        i32::from(self.max_x) - i32::from(self.min_x)
    }

    #[must_use]
    pub fn height(&self) -> i32 {
        i32::from(self.max_y) - i32::from(self.min_y)
    }
}

/// A fully resolved glyph outline
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SimpleGlyph {
    pub metrics: Metrics,
    pub instructions: Vec<u8>,
    pub contours: Vec<Contour>,
}

impl SimpleGlyph {
    #[must_use]
    pub fn num_points(&self) -> usize {
        self.contours.iter().map(Contour::len).sum()
    }

    pub fn points(&self) -> impl Iterator<Item = &GlyphPoint> {
        self.contours.iter().flat_map(|contour| contour.points())
    }

    /// Index of the last point of every contour, like the `endPtsOfContours` array
    #[must_use]
    pub fn end_points(&self) -> Vec<usize> {
        self.contours
            .iter()
            .scan(0, |num_points, contour| {
                *num_points += contour.len();
                Some(*num_points)
            })
            .filter(|&num_points| num_points != 0)
            .map(|num_points| num_points - 1)
            .collect()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct GlyphFlag(u8);

impl GlyphFlag {
    const POINT_ON_CURVE: u8 = 1;
    const PRIMARY_FLAG_X: u8 = 2;
    const PRIMARY_FLAG_Y: u8 = 4;
    const REPEAT: u8 = 8;
    const SECONDARY_FLAG_X: u8 = 16;
    const SECONDARY_FLAG_Y: u8 = 32;

    pub fn is_on_curve(&self) -> bool {
        self.0 & Self::POINT_ON_CURVE != 0
    }

    pub fn repeat(&self) -> bool {
        self.0 & Self::REPEAT != 0
    }

    pub fn coordinate_type_x(&self) -> GlyphCoordinateType {
        GlyphCoordinateType::new(
            self.0 & Self::PRIMARY_FLAG_X != 0,
            self.0 & Self::SECONDARY_FLAG_X != 0,
        )
    }

    pub fn coordinate_type_y(&self) -> GlyphCoordinateType {
        GlyphCoordinateType::new(
            self.0 & Self::PRIMARY_FLAG_Y != 0,
            self.0 & Self::SECONDARY_FLAG_Y != 0,
        )
    }
}

#[derive(Clone, Copy, Debug)]
pub enum GlyphCoordinateType {
    /// The current coordinate is 16 bit signed delta change.
    SignedDelta16B,
    /// The current coordinate is 16 bit, has the same value as the previous one.
    ZeroDelta16B,
    /// The current coordinate is 8 bit, value is negative.
    Negative8B,
    /// The current coordinate is 8 bit, value is positive.
    Positive8B,
}

impl GlyphCoordinateType {
    fn new(is_byte: bool, is_same_or_positive: bool) -> Self {
        match (is_byte, is_same_or_positive) {
            (false, false) => Self::SignedDelta16B,
            (false, true) => Self::ZeroDelta16B,
            (true, false) => Self::Negative8B,
            (true, true) => Self::Positive8B,
        }
    }
}

#[derive(Clone, Copy)]
pub struct CompoundGlyphFlag(u16);

impl CompoundGlyphFlag {
    const ARG_1_AND_2_ARE_WORDS: u16 = 1 << 0;
    const ARGS_ARE_XY_VALUES: u16 = 1 << 1;
    const WE_HAVE_A_SCALE: u16 = 1 << 3;
    const MORE_COMPONENTS: u16 = 1 << 5;
    const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 1 << 6;
    const WE_HAVE_A_TWO_BY_TWO: u16 = 1 << 7;
    const WE_HAVE_INSTRUCTIONS: u16 = 1 << 8;

    pub fn arg_1_and_2_are_words(&self) -> bool {
        self.0 & Self::ARG_1_AND_2_ARE_WORDS != 0
    }

    pub fn args_are_xy_values(&self) -> bool {
        self.0 & Self::ARGS_ARE_XY_VALUES != 0
    }

    pub fn has_scale(&self) -> bool {
        self.0 & Self::WE_HAVE_A_SCALE != 0
    }

    pub fn is_last_component(&self) -> bool {
        self.0 & Self::MORE_COMPONENTS == 0
    }

    pub fn has_xy_scale(&self) -> bool {
        self.0 & Self::WE_HAVE_AN_X_AND_Y_SCALE != 0
    }

    pub fn has_two_by_two(&self) -> bool {
        self.0 & Self::WE_HAVE_A_TWO_BY_TWO != 0
    }

    pub fn has_instructions(&self) -> bool {
        self.0 & Self::WE_HAVE_INSTRUCTIONS != 0
    }
}

impl fmt::Debug for CompoundGlyphFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compound Glyph Flag")
            .field("arg 1 and 2 are words", &self.arg_1_and_2_are_words())
            .field("args are xy values", &self.args_are_xy_values())
            .field("has scale", &self.has_scale())
            .field("is last component", &self.is_last_component())
            .field("has xy scale", &self.has_xy_scale())
            .field("has two by two", &self.has_two_by_two())
            .field("has instructions", &self.has_instructions())
            .finish()
    }
}
