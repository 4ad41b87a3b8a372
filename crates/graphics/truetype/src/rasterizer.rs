//! Binary glyph rasterization.
//!
//! Every cell of a grid laid over the glyph's bounding box is tested with a
//! horizontal ray cast from its center. Two additional tests look for outline
//! crossings inside the cell itself, which catches strokes that are thinner
//! than a cell and would otherwise fall between two cell centers.

use std::fmt;

use crate::{
    path::{Operation, Point},
    ttf_tables::glyf::SimpleGlyph,
    Error, Result,
};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Position {
    x: f64,
    y: f64,
}

impl Position {
    fn transposed(self) -> Self {
        Self {
            x: self.y,
            y: self.x,
        }
    }
}

impl From<Point> for Position {
    fn from(value: Point) -> Self {
        Self {
            x: value.x.into(),
            y: value.y.into(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Segment {
    Line(Position, Position),

    /// Start point, control point, end point
    Quad(Position, Position, Position),
}

/// A point where a segment crosses a scan line
#[derive(Clone, Copy, Debug)]
struct Crossing {
    /// The coordinate along the scan line
    position: f64,

    /// `-1` if the outline moves upwards at the crossing, `+1` otherwise
    winding: i32,
}

impl Segment {
    /// Swap the axes, so that vertical scan lines can be treated like horizontal ones
    fn transposed(self) -> Self {
        match self {
            Self::Line(p0, p1) => Self::Line(p0.transposed(), p1.transposed()),
            Self::Quad(p0, p1, p2) => {
                Self::Quad(p0.transposed(), p1.transposed(), p2.transposed())
            },
        }
    }

    /// Find all crossings with the horizontal line at `scan_y`.
    ///
    /// Only intersections at `t` in `(0, 1]` are reported, so a crossing exactly
    /// at the shared point of two segments is counted once.
    fn crossings(&self, scan_y: f64, crossings: &mut Vec<Crossing>) -> Result<()> {
        match *self {
            Self::Line(p0, p1) => {
                if p0.y == p1.y {
                    return Ok(());
                }

                let t = (scan_y - p0.y) / (p1.y - p0.y);
                if 0. < t && t <= 1. {
                    crossings.push(Crossing {
                        position: p0.x + t * (p1.x - p0.x),
                        winding: if p1.y > p0.y { -1 } else { 1 },
                    });
                }
            },
            Self::Quad(p0, p1, p2) => {
                // y(t) = ay * t^2 + by * t + cy
                let ay = p2.y - 2. * p1.y + p0.y;
                let by = 2. * (p1.y - p0.y);
                let cy = p0.y - scan_y;

                let ax = p2.x - 2. * p1.x + p0.x;
                let bx = 2. * (p1.x - p0.x);

                let mut roots = [None, None];
                if ay == 0. {
                    if by == 0. {
                        if cy == 0. {
                            return Err(Error::DegenerateGeometry(
                                "curve runs along the scan line",
                            ));
                        }
                        return Ok(());
                    }
                    roots[0] = Some(-cy / by);
                } else {
                    let discriminant = by * by - 4. * ay * cy;
                    if discriminant < 0. {
                        return Ok(());
                    }
                    let root = discriminant.sqrt();
                    roots[0] = Some((-by + root) / (2. * ay));
                    roots[1] = Some((-by - root) / (2. * ay));
                }

                for t in roots.into_iter().flatten() {
                    if !(0. < t && t <= 1.) {
                        continue;
                    }

                    let dy_dt = 2. * ay * t + by;
                    let dx_dt = 2. * ax * t + bx;
                    let direction = if dy_dt == 0. { dx_dt } else { dy_dt };

                    crossings.push(Crossing {
                        position: ax * t * t + bx * t + p0.x,
                        winding: if direction > 0. { -1 } else { 1 },
                    });
                }
            },
        }

        Ok(())
    }
}

fn segments(glyph: &SimpleGlyph) -> Result<Vec<Segment>> {
    let mut segments = vec![];

    for contour in &glyph.contours {
        let mut current = Position::default();
        for operation in contour.operations()? {
            match operation {
                Operation::MoveTo(to) => current = to.into(),
                Operation::LineTo(to) => {
                    let to = to.into();
                    segments.push(Segment::Line(current, to));
                    current = to;
                },
                Operation::QuadBezTo(control, to) => {
                    let to = to.into();
                    segments.push(Segment::Quad(current, control.into(), to));
                    current = to;
                },
            }
        }
    }

    Ok(segments)
}

fn crossings_along(segments: &[Segment], scan: f64) -> Result<Vec<Crossing>> {
    let mut crossings = vec![];
    for segment in segments {
        segment.crossings(scan, &mut crossings)?;
    }
    Ok(crossings)
}

/// Whether any crossing lies in the half-open interval `(start, start + length]`
fn crosses_window(crossings: &[Crossing], start: f64, length: f64) -> bool {
    crossings
        .iter()
        .any(|crossing| start < crossing.position && crossing.position <= start + length)
}

/// Turns glyph outlines into [PixelMasks](PixelMask) at a fixed grid size
#[derive(Clone, Copy, Debug)]
pub struct Rasterizer {
    grid_size: u32,
}

impl Rasterizer {
    /// The grid size is the edge length of a pixel in font units.
    pub fn new(grid_size: u32, units_per_em: u16) -> Result<Self> {
        if grid_size == 0 || u32::from(units_per_em) < grid_size {
            return Err(Error::InvalidGridSize(grid_size));
        }

        Ok(Self { grid_size })
    }

    #[inline]
    #[must_use]
    pub fn grid_size(&self) -> u32 {
        self.grid_size
    }

    pub fn rasterize(&self, glyph: &SimpleGlyph) -> Result<PixelMask> {
        let metrics = glyph.metrics;
        let (glyph_width, glyph_height) = (metrics.width(), metrics.height());
        if glyph_width < 0 || glyph_height < 0 {
            return Err(Error::DegenerateGeometry("bounding box has a negative size"));
        }

        let grid = self.grid_size as i32;
        let width = (glyph_width as u32).div_ceil(self.grid_size) as usize + 1;
        let height = (glyph_height as u32).div_ceil(self.grid_size) as usize + 1;
        let origin = Point {
            x: metrics.min_x.into(),
            y: metrics.min_y.into(),
        };

        // Centers of the cells along each axis. The scan lines are moved by half a unit
        // so they never pass exactly through a point of the (integer) outline.
        let center = |origin: i32, index: usize| origin + index as i32 * grid + grid / 2;
        let cell_start = |origin: i32, index: usize| f64::from(origin + index as i32 * grid);
        let grid = f64::from(grid);

        let segments = segments(glyph)?;
        let transposed: Vec<Segment> = segments.iter().map(|segment| segment.transposed()).collect();

        let columns = (0..width)
            .map(|x| crossings_along(&transposed, f64::from(center(origin.x, x)) + 0.5))
            .collect::<Result<Vec<_>>>()?;

        let mut cells = vec![false; width * height];
        for y in 0..height {
            let row = crossings_along(&segments, f64::from(center(origin.y, y)) + 0.5)?;

            for x in 0..width {
                let center_x = f64::from(center(origin.x, x));

                let winding: i32 = row
                    .iter()
                    .filter(|crossing| crossing.position > center_x)
                    .map(|crossing| crossing.winding)
                    .sum();

                cells[y * width + x] = winding % 2 != 0
                    || crosses_window(&row, cell_start(origin.x, x), grid)
                    || crosses_window(&columns[x], cell_start(origin.y, y), grid);
            }
        }

        log::debug!(
            "Rasterized {glyph_width}x{glyph_height} units into a {width}x{height} mask (grid size {})",
            self.grid_size
        );

        Ok(PixelMask {
            width,
            height,
            grid_size: self.grid_size,
            origin,
            cells,
        })
    }
}

/// A binary coverage grid over a glyph's bounding box.
///
/// Row `0` is the bottom row of the glyph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelMask {
    width: usize,
    height: usize,
    grid_size: u32,
    origin: Point,
    cells: Vec<bool>,
}

impl PixelMask {
    #[inline]
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// The edge length of one cell, in font units
    #[inline]
    #[must_use]
    pub fn grid_size(&self) -> u32 {
        self.grid_size
    }

    /// The lower left corner of the mask, in font units
    #[inline]
    #[must_use]
    pub fn origin(&self) -> Point {
        self.origin
    }

    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> Option<bool> {
        if self.width <= x || self.height <= y {
            return None;
        }
        Some(self.cells[y * self.width + x])
    }

    #[must_use]
    pub fn filled_cells(&self) -> usize {
        self.cells.iter().filter(|&&cell| cell).count()
    }
}

impl fmt::Display for PixelMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.width.max(1)).rev() {
            for &cell in row {
                f.write_str(if cell { "#" } else { "." })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
