//! [Head](https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6head.html) table implementation

use crate::{
    stream::{read_i16_at, read_u16_at, read_u32_at, slice_at},
    Error, Result,
};

const HEAD_TABLE_SIZE: usize = 54;
const MAGIC_NUMBER: u32 = 0x5F0F3CF5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocaTableFormat {
    Short,
    Long,
}

#[derive(Clone, Copy, Debug)]
pub struct HeadTable {
    units_per_em: u16,

    /// The minimum x value that can be encountered while
    /// rendering a glyph from this font, in `FUnits`.
    min_x: i16,

    /// The minimum y value that can be encountered while
    /// rendering a glyph from this font, in `FUnits`.
    min_y: i16,

    /// The maximum x value that can be encountered while
    /// rendering a glyph from this font, in `FUnits`.
    max_x: i16,

    /// The maximum y value that can be encountered while
    /// rendering a glyph from this font, in `FUnits`.
    max_y: i16,

    loca_table_format: LocaTableFormat,
}

impl HeadTable {
    pub fn new(data: &[u8]) -> Result<Self> {
        let data = slice_at(data, 0, HEAD_TABLE_SIZE)?;

        let major_version = read_u16_at(data, 0)?;
        let minor_version = read_u16_at(data, 2)?;
        if (major_version, minor_version) != (1, 0) {
            return Err(Error::MalformedHeader("unsupported head table version"));
        }

        if read_u32_at(data, 12)? != MAGIC_NUMBER {
            return Err(Error::MalformedHeader("invalid head table magic number"));
        }

        let units_per_em = read_u16_at(data, 18)?;
        if units_per_em == 0 {
            return Err(Error::MalformedHeader("units per em must not be zero"));
        }

        let loca_table_format = match read_i16_at(data, 50)? {
            0 => LocaTableFormat::Short,
            1 => LocaTableFormat::Long,
            _ => return Err(Error::MalformedHeader("invalid index to loca format")),
        };

        Ok(Self {
            units_per_em,
            min_x: read_i16_at(data, 36)?,
            min_y: read_i16_at(data, 38)?,
            max_x: read_i16_at(data, 40)?,
            max_y: read_i16_at(data, 42)?,
            loca_table_format,
        })
    }

    #[inline]
    #[must_use]
    pub fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    #[inline]
    #[must_use]
    pub fn min_x(&self) -> i16 {
        self.min_x
    }

    #[inline]
    #[must_use]
    pub fn min_y(&self) -> i16 {
        self.min_y
    }

    #[inline]
    #[must_use]
    pub fn max_x(&self) -> i16 {
        self.max_x
    }

    #[inline]
    #[must_use]
    pub fn max_y(&self) -> i16 {
        self.max_y
    }

    /// Get the format of the [Loca Table](crate::ttf_tables::loca::LocaTable).
    #[inline]
    #[must_use]
    pub fn loca_table_format(&self) -> LocaTableFormat {
        self.loca_table_format
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_font;

    #[test]
    fn parse_head() {
        let data = test_font::head_table(2048, [-10, -20, 1000, 900], LocaTableFormat::Long);
        let head = HeadTable::new(&data).unwrap();

        assert_eq!(head.units_per_em(), 2048);
        assert_eq!(head.min_x(), -10);
        assert_eq!(head.min_y(), -20);
        assert_eq!(head.max_x(), 1000);
        assert_eq!(head.max_y(), 900);
        assert_eq!(head.loca_table_format(), LocaTableFormat::Long);
    }

    #[test]
    fn bad_magic_number() {
        let mut data = test_font::head_table(1000, [0; 4], LocaTableFormat::Short);
        data[12..16].copy_from_slice(&0xDEADBEEF_u32.to_be_bytes());

        assert!(matches!(
            HeadTable::new(&data),
            Err(Error::MalformedHeader(_))
        ));
    }

    #[test]
    fn bad_version() {
        let mut data = test_font::head_table(1000, [0; 4], LocaTableFormat::Short);
        data[0..2].copy_from_slice(&2_u16.to_be_bytes());

        assert!(matches!(
            HeadTable::new(&data),
            Err(Error::MalformedHeader(_))
        ));
    }

    #[test]
    fn truncated() {
        let data = test_font::head_table(1000, [0; 4], LocaTableFormat::Short);

        assert!(matches!(
            HeadTable::new(&data[..40]),
            Err(Error::TruncatedFile { .. })
        ));
    }
}
