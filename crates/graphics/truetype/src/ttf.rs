//! [TrueType](https://developer.apple.com/fonts/TrueType-Reference-Manual) font parser
//!
//! ## Reference Material:
//! * <https://learn.microsoft.com/en-us/typography/opentype/spec/otff>
//! * <https://formats.kaitai.io/ttf/index.html>
//! * <https://handmade.network/forums/articles/t/7330-implementing_a_font_reader_and_rasterizer_from_scratch%252C_part_1__ttf_font_reader>

use std::{fmt, fs, path::Path};

use crate::{
    hinting::Interpreter,
    rasterizer::{PixelMask, Rasterizer},
    stream::slice_at,
    ttf_tables::{
        cmap::{CMAPTable, GlyphID},
        cvt::CvtTable,
        glyf::{GlyphOutlineTable, SimpleGlyph},
        head::HeadTable,
        loca::LocaTable,
        maxp::MaxPTable,
        offset::{self, OffsetTable, Tag},
        program::{Program, ProgramKind},
    },
    Error, Result,
};

/// The bytes of a font file (`.ttf`, `.otf` or `.ttc`).
///
/// Fonts borrow from the file, so it has to outlive them.
#[derive(Clone)]
pub struct FontFile {
    data: Vec<u8>,
}

impl FontFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path.as_ref())?;
        log::debug!("Read {} bytes from {}", data.len(), path.as_ref().display());
        Ok(Self::from_bytes(data))
    }

    #[must_use]
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    #[inline]
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The number of fonts in the file, `1` unless the file is a collection
    pub fn num_fonts(&self) -> Result<usize> {
        offset::num_fonts(&self.data)
    }

    /// Parse the font at `index`, which must be `0` for files that aren't collections
    pub fn font(&self, index: usize) -> Result<Font<'_>> {
        Font::new(&self.data, index)
    }
}

impl fmt::Debug for FontFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontFile")
            .field("size", &self.data.len())
            .finish()
    }
}

/// What to do when the hinting program of a glyph fails
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HintingPolicy {
    /// Return the error to the caller
    #[default]
    Strict,

    /// Log the error and rasterize the outline as if the font had no instructions
    FallbackToUnhinted,

    /// Never run any hinting instructions
    Disabled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderOptions {
    /// The size of one em, in pixels
    pub pixel_size: u32,
    pub hinting: HintingPolicy,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            pixel_size: 24,
            hinting: HintingPolicy::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedGlyph {
    pub glyph_id: GlyphID,

    /// The outline that was rasterized, after hinting
    pub outline: SimpleGlyph,
    pub mask: PixelMask,
}

pub struct Font<'a> {
    offset_table: OffsetTable,
    head_table: HeadTable,
    maxp_table: MaxPTable,
    cmap_table: CMAPTable<'a>,
    glyph_table: GlyphOutlineTable<'a>,
    cvt_table: CvtTable,
    font_program: Program<'a>,
    control_value_program: Program<'a>,
}

impl<'a> Font<'a> {
    pub fn new(data: &'a [u8], index: usize) -> Result<Self> {
        let offset_table = OffsetTable::new(data, index)?;
        let table = |tag| find_table(data, &offset_table, tag);

        let head_table = HeadTable::new(table(Tag::HEAD)?)?;
        let maxp_table = MaxPTable::new(table(Tag::MAXP)?)?;
        let cmap_table = CMAPTable::new(table(Tag::CMAP)?)?;

        let loca_table = LocaTable::new(
            table(Tag::LOCA)?,
            head_table.loca_table_format(),
            maxp_table.num_glyphs,
        );
        let glyph_table = GlyphOutlineTable::new(table(Tag::GLYF)?, loca_table);

        // The hinting tables are optional
        let optional_table = |tag| match table(tag) {
            Ok(data) => Ok(data),
            Err(Error::MissingTable(_)) => Ok(&[][..]),
            Err(error) => Err(error),
        };
        let cvt_table = CvtTable::new(optional_table(Tag::CVT)?)?;
        let font_program = Program::new(ProgramKind::Font, optional_table(Tag::FPGM)?);
        let control_value_program =
            Program::new(ProgramKind::ControlValue, optional_table(Tag::PREP)?);

        Ok(Self {
            offset_table,
            head_table,
            maxp_table,
            cmap_table,
            glyph_table,
            cvt_table,
            font_program,
            control_value_program,
        })
    }

    #[inline]
    #[must_use]
    pub fn offset_table(&self) -> &OffsetTable {
        &self.offset_table
    }

    #[inline]
    #[must_use]
    pub fn head(&self) -> &HeadTable {
        &self.head_table
    }

    #[inline]
    #[must_use]
    pub fn cmap(&self) -> &CMAPTable<'a> {
        &self.cmap_table
    }

    /// Get the total number of glyphs defined in the font
    #[inline]
    #[must_use]
    pub fn num_glyphs(&self) -> u16 {
        self.maxp_table.num_glyphs
    }

    /// Return the number of coordinate points per font size unit.
    /// This value is used to scale fonts, ie. when you render a font with
    /// size `17px`, one `em` equals `17px`.
    ///
    /// Note that this value does not constrain the size of individual glyphs.
    /// A glyph may have a size larger than `1em`.
    #[inline]
    #[must_use]
    pub fn units_per_em(&self) -> u16 {
        self.head_table.units_per_em()
    }

    /// Get the Glyph index for a given codepoint.
    ///
    /// `Ok(None)` means the font has no glyph for the codepoint, callers usually
    /// fall back to [GlyphID::REPLACEMENT] in that case.
    pub fn glyph_id(&self, codepoint: u32, variation_selector: u32) -> Result<Option<GlyphID>> {
        self.cmap_table
            .find_glyph_id(codepoint, variation_selector)
    }

    pub fn decode_glyph(&self, glyph_id: GlyphID) -> Result<SimpleGlyph> {
        self.glyph_table.get_glyph(glyph_id)
    }

    /// The edge length of a pixel in font units when rendering at `pixel_size` pixels per em
    pub fn grid_size_for(&self, pixel_size: u32) -> Result<u32> {
        if pixel_size == 0 {
            return Err(Error::InvalidGridSize(0));
        }

        let grid_size = u32::from(self.units_per_em()) / pixel_size;
        if grid_size == 0 {
            return Err(Error::InvalidGridSize(grid_size));
        }
        Ok(grid_size)
    }

    /// Run the font program, the control value program and the glyph's own instructions
    /// on a glyph outline.
    ///
    /// A fresh interpreter is used for every call.
    pub fn hint_glyph(&self, glyph: &SimpleGlyph, grid_size: u32) -> Result<SimpleGlyph> {
        let interpreter = Interpreter::new(
            &self.maxp_table,
            &self.cvt_table,
            self.units_per_em(),
            grid_size,
        )?;

        interpreter.hint(self.font_program, self.control_value_program, glyph)
    }

    /// Render the glyph for a codepoint.
    ///
    /// Returns `Ok(None)` if the font does not contain a glyph for the codepoint.
    pub fn render(&self, codepoint: u32, options: &RenderOptions) -> Result<Option<RenderedGlyph>> {
        let Some(glyph_id) = self.glyph_id(codepoint, 0)? else {
            log::debug!("No glyph for codepoint {codepoint:#x}");
            return Ok(None);
        };

        self.render_glyph(glyph_id, options).map(Some)
    }

    pub fn render_glyph(&self, glyph_id: GlyphID, options: &RenderOptions) -> Result<RenderedGlyph> {
        let grid_size = self.grid_size_for(options.pixel_size)?;
        let outline = self.decode_glyph(glyph_id)?;

        let outline = match options.hinting {
            HintingPolicy::Disabled => outline,
            HintingPolicy::Strict => self.hint_glyph(&outline, grid_size)?,
            HintingPolicy::FallbackToUnhinted => match self.hint_glyph(&outline, grid_size) {
                Ok(hinted) => hinted,
                Err(error) => {
                    log::warn!("Failed to hint glyph {glyph_id} ({error}), rendering it unhinted");
                    outline
                },
            },
        };

        let mask = Rasterizer::new(grid_size, self.units_per_em())?.rasterize(&outline)?;

        Ok(RenderedGlyph {
            glyph_id,
            outline,
            mask,
        })
    }
}

fn find_table<'a>(data: &'a [u8], offset_table: &OffsetTable, tag: Tag) -> Result<&'a [u8]> {
    let entry = offset_table
        .get_table(tag)
        .ok_or(Error::MissingTable(tag))?;
    slice_at(data, entry.offset(), entry.length())
}

impl<'a> fmt::Debug for Font<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Font")
            .field("units_per_em", &self.units_per_em())
            .field("num_glyphs", &self.num_glyphs())
            .field("cmap", &self.cmap_table)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        path::GlyphPoint,
        test_font::{collection, FontBuilder, TestGlyph},
    };

    /// A capital "A" with a triangular counter, 600 units wide and 700 units high
    fn letter_a() -> TestGlyph {
        TestGlyph::Simple {
            contours: vec![
                vec![
                    GlyphPoint::on_curve(0, 0),
                    GlyphPoint::on_curve(250, 700),
                    GlyphPoint::on_curve(350, 700),
                    GlyphPoint::on_curve(600, 0),
                    GlyphPoint::on_curve(480, 0),
                    GlyphPoint::on_curve(300, 560),
                    GlyphPoint::on_curve(120, 0),
                ],
                vec![
                    GlyphPoint::on_curve(180, 200),
                    GlyphPoint::on_curve(420, 200),
                    GlyphPoint::on_curve(380, 300),
                    GlyphPoint::on_curve(220, 300),
                ],
            ],
            instructions: vec![],
        }
    }

    fn font_with_a() -> FontFile {
        FontFile::from_bytes(
            FontBuilder::new()
                .units_per_em(1000)
                .glyph(letter_a())
                .map('A', 1)
                .build(),
        )
    }

    #[test]
    fn render_letter_a() {
        let file = font_with_a();
        let font = file.font(0).unwrap();
        let options = RenderOptions {
            pixel_size: 20,
            hinting: HintingPolicy::Strict,
        };

        let rendered = font.render('A' as u32, &options).unwrap().unwrap();
        assert_eq!(rendered.glyph_id, GlyphID::new(1));

        // Grid size is 1000 / 20 = 50
        assert_eq!(rendered.mask.grid_size(), 50);
        assert_eq!(rendered.mask.width(), 600 / 50 + 1);
        assert_eq!(rendered.mask.height(), 700_usize.div_ceil(50) + 1);
        assert!(0 < rendered.mask.filled_cells());

        // Rendering is deterministic
        let again = font.render('A' as u32, &options).unwrap().unwrap();
        assert_eq!(rendered, again);
    }

    #[test]
    fn unmapped_codepoint() {
        let file = font_with_a();
        let font = file.font(0).unwrap();

        assert!(font
            .render('Z' as u32, &RenderOptions::default())
            .unwrap()
            .is_none());
        assert_eq!(font.glyph_id('A' as u32, 0).unwrap(), Some(GlyphID::new(1)));
    }

    #[test]
    fn variation_selector() {
        let file = font_with_a();
        let font = file.font(0).unwrap();

        assert!(matches!(
            font.glyph_id('A' as u32, 0xFE00),
            Err(Error::UnsupportedVariationSelector(0xFE00))
        ));
    }

    #[test]
    fn grid_size() {
        let file = font_with_a();
        let font = file.font(0).unwrap();

        assert_eq!(font.grid_size_for(24).unwrap(), 41);
        assert_eq!(font.grid_size_for(1000).unwrap(), 1);
        assert!(matches!(
            font.grid_size_for(0),
            Err(Error::InvalidGridSize(0))
        ));
        assert!(matches!(
            font.grid_size_for(1001),
            Err(Error::InvalidGridSize(0))
        ));
    }

    #[test]
    fn collection_index() {
        let first = FontBuilder::new().units_per_em(1000).build();
        let second = FontBuilder::new().units_per_em(2048).build();
        let file = FontFile::from_bytes(collection(&[first, second], 0x00010000));

        assert_eq!(file.num_fonts().unwrap(), 2);
        assert_eq!(file.font(0).unwrap().units_per_em(), 1000);
        assert_eq!(file.font(1).unwrap().units_per_em(), 2048);
        assert!(matches!(
            file.font(2),
            Err(Error::IndexOutOfRange { what: "font", .. })
        ));
    }

    #[test]
    fn missing_required_table() {
        let file = FontFile::from_bytes(FontBuilder::new().without_table(Tag::GLYF).build());

        assert!(matches!(
            file.font(0),
            Err(Error::MissingTable(tag)) if tag == Tag::GLYF
        ));
    }

    #[test]
    fn hinting_tables_are_optional() {
        let file = FontFile::from_bytes(
            FontBuilder::new()
                .without_table(Tag::CVT)
                .without_table(Tag::FPGM)
                .without_table(Tag::PREP)
                .glyph(TestGlyph::square(0, 0, 500))
                .build(),
        );
        let font = file.font(0).unwrap();
        let glyph = font.decode_glyph(GlyphID::new(1)).unwrap();

        assert_eq!(font.hint_glyph(&glyph, 50).unwrap(), glyph);
    }

    fn font_with_glyph_program(instructions: Vec<u8>) -> FontFile {
        FontFile::from_bytes(
            FontBuilder::new()
                .glyph(TestGlyph::Simple {
                    contours: vec![vec![
                        GlyphPoint::on_curve(0, 0),
                        GlyphPoint::on_curve(0, 500),
                        GlyphPoint::on_curve(500, 500),
                        GlyphPoint::on_curve(500, 0),
                    ]],
                    instructions,
                })
                .map('x', 1)
                .build(),
        )
    }

    #[test]
    fn strict_hinting_reports_failures() {
        // POP on an empty stack
        let file = font_with_glyph_program(vec![0x21]);
        let font = file.font(0).unwrap();

        assert!(matches!(
            font.render('x' as u32, &RenderOptions::default()),
            Err(Error::HintingFailure { .. })
        ));
    }

    #[test]
    fn unimplemented_instruction_is_reported() {
        // SHPIX
        let file = font_with_glyph_program(vec![0x38]);
        let font = file.font(0).unwrap();

        assert!(matches!(
            font.render('x' as u32, &RenderOptions::default()),
            Err(Error::UnimplementedOpcode {
                mnemonic: "SHPIX",
                offset: 0
            })
        ));
    }

    #[test]
    fn fallback_to_unhinted() {
        let file = font_with_glyph_program(vec![0x21]);
        let font = file.font(0).unwrap();

        let fallback = font
            .render(
                'x' as u32,
                &RenderOptions {
                    pixel_size: 10,
                    hinting: HintingPolicy::FallbackToUnhinted,
                },
            )
            .unwrap()
            .unwrap();
        let unhinted = font
            .render(
                'x' as u32,
                &RenderOptions {
                    pixel_size: 10,
                    hinting: HintingPolicy::Disabled,
                },
            )
            .unwrap()
            .unwrap();

        assert_eq!(fallback, unhinted);
        assert_eq!(fallback.mask.filled_cells(), 25);
    }

    #[test]
    fn programs_share_state() {
        // fpgm defines function 0, which pushes 1. prep stores 7 in cvt entry 0.
        // The glyph program checks both and pops the result.
        let file = FontFile::from_bytes(
            FontBuilder::new()
                .cvt(vec![0, 64])
                .fpgm(vec![0xB0, 0x00, 0x2C, 0xB0, 0x01, 0x2D])
                .prep(vec![0xB1, 0x00, 0x07, 0x44])
                .glyph(TestGlyph::Simple {
                    contours: vec![vec![
                        GlyphPoint::on_curve(0, 0),
                        GlyphPoint::on_curve(0, 100),
                        GlyphPoint::on_curve(100, 100),
                    ]],
                    // CALL 0, RCVT 0, ADD, PUSHB 8, EQ, IF, EIF
                    instructions: vec![
                        0xB0, 0x00, 0x2B, 0xB0, 0x00, 0x45, 0x60, 0xB0, 0x08, 0x54, 0x58, 0x59,
                    ],
                })
                .build(),
        );
        let font = file.font(0).unwrap();

        let rendered = font
            .render_glyph(GlyphID::new(1), &RenderOptions::default())
            .unwrap();
        assert_eq!(rendered.glyph_id, GlyphID::new(1));
    }

    #[test]
    fn open_missing_file() {
        assert!(matches!(
            FontFile::open("/this/font/does/not/exist.ttf"),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn open_file() {
        let path = std::env::temp_dir().join(format!("truetype-test-{}.ttf", std::process::id()));
        std::fs::write(&path, font_with_a().data()).unwrap();

        let file = FontFile::open(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(file.num_fonts().unwrap(), 1);
        assert_eq!(file.font(0).unwrap().num_glyphs(), 2);
    }
}
