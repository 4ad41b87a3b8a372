//! Glyph outlines as closed contours of on- and off-curve points.

use crate::{Error, Result};

/// A single point of a glyph outline, in font units
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlyphPoint {
    pub x: i16,
    pub y: i16,

    /// Off-curve points are the control points of quadratic bezier curves
    pub on_curve: bool,
}

impl GlyphPoint {
    #[inline]
    #[must_use]
    pub const fn on_curve(x: i16, y: i16) -> Self {
        Self {
            x,
            y,
            on_curve: true,
        }
    }

    #[inline]
    #[must_use]
    pub const fn off_curve(x: i16, y: i16) -> Self {
        Self {
            x,
            y,
            on_curve: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn to_point(self) -> Point {
        Point {
            x: self.x.into(),
            y: self.y.into(),
        }
    }

    /// The implicit on-curve point between two consecutive off-curve points
    #[must_use]
    fn midpoint(self, other: Self) -> Self {
        let x = (i32::from(self.x) + i32::from(other.x)) / 2;
        let y = (i32::from(self.y) + i32::from(other.y)) / 2;

        // The mean of two i16 values is always a valid i16
        Self::on_curve(x as i16, y as i16)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    MoveTo(Point),
    LineTo(Point),

    /// Control point, end point
    QuadBezTo(Point, Point),
}

/// A closed outline.
///
/// The last point is implicitly connected back to the first one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Contour {
    points: Vec<GlyphPoint>,
}

impl Contour {
    #[must_use]
    pub fn new(points: Vec<GlyphPoint>) -> Self {
        Self { points }
    }

    #[inline]
    #[must_use]
    pub fn points(&self) -> &[GlyphPoint] {
        &self.points
    }

    #[inline]
    pub fn points_mut(&mut self) -> &mut [GlyphPoint] {
        &mut self.points
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Insert the implied on-curve point between every pair of
    /// consecutive off-curve points, including the pair that wraps around.
    #[must_use]
    pub fn flatten(&self) -> Vec<GlyphPoint> {
        let mut flattened = Vec::with_capacity(self.points.len() * 2);

        for (index, &point) in self.points.iter().enumerate() {
            flattened.push(point);

            let next = self.points[(index + 1) % self.points.len()];
            if !point.on_curve && !next.on_curve && self.points.len() > 1 {
                flattened.push(point.midpoint(next));
            }
        }

        flattened
    }

    /// Describe the contour as a sequence of drawing operations.
    ///
    /// Contours with less than two points don't enclose anything and produce no operations.
    pub fn operations(&self) -> Result<Vec<Operation>> {
        if self.points.len() < 2 {
            return Ok(vec![]);
        }

        let points = self.flatten();

        // After flattening, any contour with two or more points has an on-curve point
        let start = points
            .iter()
            .position(|point| point.on_curve)
            .ok_or(Error::DegenerateGeometry("contour has no on-curve point"))?;

        let num_points = points.len();
        let point_at = |offset: usize| points[(start + offset) % num_points];

        let mut operations = vec![Operation::MoveTo(point_at(0).to_point())];
        let mut offset = 1;
        while offset <= num_points {
            let current = point_at(offset);

            if current.on_curve {
                operations.push(Operation::LineTo(current.to_point()));
                offset += 1;
            } else {
                let next = point_at(offset + 1);
                if !next.on_curve {
                    return Err(Error::DegenerateGeometry(
                        "off-curve point is not followed by an on-curve point",
                    ));
                }

                operations.push(Operation::QuadBezTo(current.to_point(), next.to_point()));
                offset += 2;
            }
        }

        Ok(operations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(x: i32, y: i32) -> Point {
        Point { x, y }
    }

    #[test]
    fn flatten_inserts_midpoints() {
        let contour = Contour::new(vec![
            GlyphPoint::on_curve(0, 0),
            GlyphPoint::off_curve(10, 10),
            GlyphPoint::off_curve(20, 11),
            GlyphPoint::on_curve(30, 0),
        ]);

        assert_eq!(
            contour.flatten(),
            [
                GlyphPoint::on_curve(0, 0),
                GlyphPoint::off_curve(10, 10),
                GlyphPoint::on_curve(15, 10),
                GlyphPoint::off_curve(20, 11),
                GlyphPoint::on_curve(30, 0),
            ]
        );
    }

    #[test]
    fn flatten_wraps_around() {
        let contour = Contour::new(vec![
            GlyphPoint::off_curve(0, 0),
            GlyphPoint::on_curve(10, 0),
            GlyphPoint::off_curve(10, 10),
        ]);

        let flattened = contour.flatten();
        assert_eq!(flattened.len(), 4);
        assert_eq!(flattened[3], GlyphPoint::on_curve(5, 5));
    }

    #[test]
    fn operations_of_a_triangle() {
        let contour = Contour::new(vec![
            GlyphPoint::on_curve(0, 0),
            GlyphPoint::on_curve(10, 0),
            GlyphPoint::on_curve(0, 10),
        ]);

        assert_eq!(
            contour.operations().unwrap(),
            [
                Operation::MoveTo(point(0, 0)),
                Operation::LineTo(point(10, 0)),
                Operation::LineTo(point(0, 10)),
                Operation::LineTo(point(0, 0)),
            ]
        );
    }

    #[test]
    fn operations_start_on_curve() {
        let contour = Contour::new(vec![
            GlyphPoint::off_curve(5, 10),
            GlyphPoint::on_curve(10, 0),
            GlyphPoint::on_curve(0, 0),
        ]);

        assert_eq!(
            contour.operations().unwrap(),
            [
                Operation::MoveTo(point(10, 0)),
                Operation::LineTo(point(0, 0)),
                Operation::QuadBezTo(point(5, 10), point(10, 0)),
            ]
        );
    }

    #[test]
    fn only_off_curve_points() {
        let contour = Contour::new(vec![
            GlyphPoint::off_curve(0, 0),
            GlyphPoint::off_curve(10, 0),
            GlyphPoint::off_curve(10, 10),
            GlyphPoint::off_curve(0, 10),
        ]);

        let operations = contour.operations().unwrap();
        assert_eq!(operations[0], Operation::MoveTo(point(5, 0)));
        assert_eq!(operations.len(), 5);
        assert!(operations[1..]
            .iter()
            .all(|op| matches!(op, Operation::QuadBezTo(..))));
    }

    #[test]
    fn single_point_contour() {
        let contour = Contour::new(vec![GlyphPoint::off_curve(0, 0)]);
        assert!(contour.operations().unwrap().is_empty());
    }
}
