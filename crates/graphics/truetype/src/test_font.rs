//! Assembles small sfnt files in memory, so tests don't depend on font files on disk.

use crate::{
    path::GlyphPoint,
    ttf_tables::{head::LocaTableFormat, offset::Tag},
};

const HEAD_MAGIC: u32 = 0x5F0F3CF5;

fn push_u16(buffer: &mut Vec<u8>, value: u16) {
    buffer.extend_from_slice(&value.to_be_bytes());
}

fn push_i16(buffer: &mut Vec<u8>, value: i16) {
    buffer.extend_from_slice(&value.to_be_bytes());
}

fn push_u32(buffer: &mut Vec<u8>, value: u32) {
    buffer.extend_from_slice(&value.to_be_bytes());
}

fn pad_to_four(buffer: &mut Vec<u8>) {
    while buffer.len() % 4 != 0 {
        buffer.push(0);
    }
}

fn checksum(data: &[u8]) -> u32 {
    data.chunks(4)
        .map(|chunk| {
            let mut word = [0; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            u32::from_be_bytes(word)
        })
        .fold(0, u32::wrapping_add)
}

fn bounding_box<'a, I: Iterator<Item = &'a GlyphPoint>>(points: I) -> [i16; 4] {
    points.fold(None, |bbox: Option<[i16; 4]>, point| {
        Some(match bbox {
            None => [point.x, point.y, point.x, point.y],
            Some([min_x, min_y, max_x, max_y]) => [
                min_x.min(point.x),
                min_y.min(point.y),
                max_x.max(point.x),
                max_y.max(point.y),
            ],
        })
    })
    .unwrap_or_default()
}

pub fn head_table(units_per_em: u16, [min_x, min_y, max_x, max_y]: [i16; 4], loca_format: LocaTableFormat) -> Vec<u8> {
    let mut data = Vec::with_capacity(54);
    push_u16(&mut data, 1); // major version
    push_u16(&mut data, 0); // minor version
    push_u32(&mut data, 0x00010000); // font revision
    push_u32(&mut data, 0); // checksum adjustment
    push_u32(&mut data, HEAD_MAGIC);
    push_u16(&mut data, 0); // flags
    push_u16(&mut data, units_per_em);
    data.extend_from_slice(&[0; 16]); // created, modified
    push_i16(&mut data, min_x);
    push_i16(&mut data, min_y);
    push_i16(&mut data, max_x);
    push_i16(&mut data, max_y);
    push_u16(&mut data, 0); // mac style
    push_u16(&mut data, 8); // lowest readable size
    push_i16(&mut data, 2); // font direction hint
    push_i16(
        &mut data,
        match loca_format {
            LocaTableFormat::Short => 0,
            LocaTableFormat::Long => 1,
        },
    );
    push_i16(&mut data, 0); // glyph data format
    data
}

/// A version 1.0 maxp table
pub fn maxp_table(num_glyphs: u16, twilight_points: u16, storage: u16, function_defs: u16) -> Vec<u8> {
    let mut data = Vec::with_capacity(32);
    push_u32(&mut data, 0x00010000);
    push_u16(&mut data, num_glyphs);
    push_u16(&mut data, 256); // max points
    push_u16(&mut data, 16); // max contours
    push_u16(&mut data, 256); // max composite points
    push_u16(&mut data, 16); // max composite contours
    push_u16(&mut data, 2); // max zones
    push_u16(&mut data, twilight_points);
    push_u16(&mut data, storage);
    push_u16(&mut data, function_defs);
    push_u16(&mut data, 0); // max instruction defs
    push_u16(&mut data, 256); // max stack elements
    push_u16(&mut data, 1024); // max size of instructions
    push_u16(&mut data, 4); // max component elements
    push_u16(&mut data, 2); // max component depth
    data
}

pub enum CmapSubtable {
    /// Segments are `(start, end, id_delta, id_range_offset)`.
    /// The final `0xFFFF` segment is added automatically.
    Format4 {
        platform: (u16, u16),
        segments: Vec<(u16, u16, i16, u16)>,
    },

    /// Groups are `(start, end, start_glyph_id)`
    Format12 {
        platform: (u16, u16),
        groups: Vec<(u32, u32, u32)>,
    },

    /// An empty variation sequence table
    Format14 { platform: (u16, u16) },
}

impl CmapSubtable {
    fn platform(&self) -> (u16, u16) {
        match self {
            Self::Format4 { platform, .. }
            | Self::Format12 { platform, .. }
            | Self::Format14 { platform } => *platform,
        }
    }

    fn encode(&self) -> Vec<u8> {
        let mut data = vec![];
        match self {
            Self::Format4 { segments, .. } => {
                let mut segments = segments.clone();
                segments.push((0xFFFF, 0xFFFF, 1, 0));
                let segment_count = segments.len() as u16;

                push_u16(&mut data, 4);
                push_u16(&mut data, 16 + 8 * segment_count); // length
                push_u16(&mut data, 0); // language
                push_u16(&mut data, segment_count * 2);

                // Binary search hints
                let entry_selector = 15 - segment_count.leading_zeros() as u16;
                let search_range = 2 << entry_selector;
                push_u16(&mut data, search_range);
                push_u16(&mut data, entry_selector);
                push_u16(&mut data, (segment_count * 2).saturating_sub(search_range));

                for &(_, end, _, _) in &segments {
                    push_u16(&mut data, end);
                }
                push_u16(&mut data, 0); // reserved
                for &(start, _, _, _) in &segments {
                    push_u16(&mut data, start);
                }
                for &(_, _, delta, _) in &segments {
                    push_i16(&mut data, delta);
                }
                for &(_, _, _, range_offset) in &segments {
                    push_u16(&mut data, range_offset);
                }
            },
            Self::Format12 { groups, .. } => {
                push_u16(&mut data, 12);
                push_u16(&mut data, 0); // reserved
                push_u32(&mut data, 16 + 12 * groups.len() as u32);
                push_u32(&mut data, 0); // language
                push_u32(&mut data, groups.len() as u32);
                for &(start, end, glyph_id) in groups {
                    push_u32(&mut data, start);
                    push_u32(&mut data, end);
                    push_u32(&mut data, glyph_id);
                }
            },
            Self::Format14 { .. } => {
                push_u16(&mut data, 14);
                push_u32(&mut data, 10); // length
                push_u32(&mut data, 0); // number of variation selector records
            },
        }
        data
    }
}

pub fn cmap_table(subtables: &[CmapSubtable]) -> Vec<u8> {
    let mut data = vec![];
    push_u16(&mut data, 0);
    push_u16(&mut data, subtables.len() as u16);

    let mut subtable_data = vec![];
    let mut offset = 4 + 8 * subtables.len();
    for subtable in subtables {
        let (platform_id, encoding_id) = subtable.platform();
        push_u16(&mut data, platform_id);
        push_u16(&mut data, encoding_id);
        push_u32(&mut data, offset as u32);

        let encoded = subtable.encode();
        offset += encoded.len();
        subtable_data.extend(encoded);
    }

    data.extend(subtable_data);
    data
}

/// Encode a simple glyph, using the most compact coordinate encoding and flag repeats
pub fn encode_simple_glyph(contours: &[Vec<GlyphPoint>], instructions: &[u8]) -> Vec<u8> {
    const ON_CURVE: u8 = 1;
    const X_IS_BYTE: u8 = 2;
    const Y_IS_BYTE: u8 = 4;
    const REPEAT: u8 = 8;
    const X_SAME_OR_POSITIVE: u8 = 16;
    const Y_SAME_OR_POSITIVE: u8 = 32;

    let mut data = vec![];
    let [min_x, min_y, max_x, max_y] = bounding_box(contours.iter().flatten());
    push_i16(&mut data, contours.len() as i16);
    push_i16(&mut data, min_x);
    push_i16(&mut data, min_y);
    push_i16(&mut data, max_x);
    push_i16(&mut data, max_y);

    let mut end_point = 0;
    for contour in contours {
        end_point += contour.len();
        push_u16(&mut data, end_point as u16 - 1);
    }

    push_u16(&mut data, instructions.len() as u16);
    data.extend_from_slice(instructions);

    // Encodes one coordinate delta, returns the flag bits
    let encode = |delta: i16, is_byte: u8, same_or_positive: u8, out: &mut Vec<u8>| {
        if delta == 0 {
            same_or_positive
        } else if delta.unsigned_abs() <= 255 {
            out.push(delta.unsigned_abs() as u8);
            if delta > 0 {
                is_byte | same_or_positive
            } else {
                is_byte
            }
        } else {
            push_i16(out, delta);
            0
        }
    };

    let mut flags = vec![];
    let mut xs = vec![];
    let mut ys = vec![];
    let mut previous = GlyphPoint::on_curve(0, 0);
    for &point in contours.iter().flatten() {
        let mut flag = if point.on_curve { ON_CURVE } else { 0 };
        flag |= encode(point.x - previous.x, X_IS_BYTE, X_SAME_OR_POSITIVE, &mut xs);
        flag |= encode(point.y - previous.y, Y_IS_BYTE, Y_SAME_OR_POSITIVE, &mut ys);
        flags.push(flag);
        previous = point;
    }

    let mut remaining = flags.as_slice();
    while let Some(&flag) = remaining.first() {
        let run = remaining
            .iter()
            .take(256)
            .take_while(|&&other| other == flag)
            .count();
        if run > 1 {
            data.push(flag | REPEAT);
            data.push((run - 1) as u8);
        } else {
            data.push(flag);
        }
        remaining = &remaining[run..];
    }

    data.extend(xs);
    data.extend(ys);
    data
}

#[derive(Clone, Copy, Debug)]
pub struct Component {
    pub glyph: u16,
    pub dx: i16,
    pub dy: i16,

    /// Uniform scale, in F2Dot14
    pub scale: Option<i16>,
}

impl Component {
    pub fn offset(glyph: u16, dx: i16, dy: i16) -> Self {
        Self {
            glyph,
            dx,
            dy,
            scale: None,
        }
    }
}

fn encode_composite_glyph(components: &[Component], instructions: Option<&[u8]>, bbox: [i16; 4]) -> Vec<u8> {
    const ARG_1_AND_2_ARE_WORDS: u16 = 1 << 0;
    const ARGS_ARE_XY_VALUES: u16 = 1 << 1;
    const WE_HAVE_A_SCALE: u16 = 1 << 3;
    const MORE_COMPONENTS: u16 = 1 << 5;
    const WE_HAVE_INSTRUCTIONS: u16 = 1 << 8;

    let mut data = vec![];
    push_i16(&mut data, -1);
    for value in bbox {
        push_i16(&mut data, value);
    }

    for (index, component) in components.iter().enumerate() {
        let is_last = index == components.len() - 1;
        let fits_in_byte = |value: i16| i8::try_from(value).is_ok();
        let use_words = !fits_in_byte(component.dx) || !fits_in_byte(component.dy);

        let mut flag = ARGS_ARE_XY_VALUES;
        if use_words {
            flag |= ARG_1_AND_2_ARE_WORDS;
        }
        if component.scale.is_some() {
            flag |= WE_HAVE_A_SCALE;
        }
        if !is_last {
            flag |= MORE_COMPONENTS;
        } else if instructions.is_some() {
            flag |= WE_HAVE_INSTRUCTIONS;
        }

        push_u16(&mut data, flag);
        push_u16(&mut data, component.glyph);
        if use_words {
            push_i16(&mut data, component.dx);
            push_i16(&mut data, component.dy);
        } else {
            data.push(component.dx as i8 as u8);
            data.push(component.dy as i8 as u8);
        }
        if let Some(scale) = component.scale {
            push_i16(&mut data, scale);
        }
    }

    if let Some(instructions) = instructions {
        push_u16(&mut data, instructions.len() as u16);
        data.extend_from_slice(instructions);
    }
    data
}

#[derive(Clone, Debug)]
pub enum TestGlyph {
    Simple {
        contours: Vec<Vec<GlyphPoint>>,
        instructions: Vec<u8>,
    },
    Composite {
        components: Vec<Component>,
        instructions: Option<Vec<u8>>,
    },

    /// No outline at all, like a space
    Empty,

    /// Bytes that are copied into the glyf table as they are
    Raw(Vec<u8>),
}

impl TestGlyph {
    /// A clockwise square with its lower left corner at `(x, y)`
    pub fn square(x: i16, y: i16, size: i16) -> Self {
        Self::Simple {
            contours: vec![vec![
                GlyphPoint::on_curve(x, y),
                GlyphPoint::on_curve(x, y + size),
                GlyphPoint::on_curve(x + size, y + size),
                GlyphPoint::on_curve(x + size, y),
            ]],
            instructions: vec![],
        }
    }

    fn bounding_box(&self, glyphs: &[TestGlyph]) -> Option<[i16; 4]> {
        match self {
            Self::Simple { contours, .. } => Some(bounding_box(contours.iter().flatten())),
            Self::Composite { components, .. } => {
                let mut points = vec![];
                for component in components {
                    if let Some(Self::Simple { contours, .. }) = glyphs.get(component.glyph as usize) {
                        points.extend(contours.iter().flatten().map(|point| {
                            GlyphPoint::on_curve(point.x + component.dx, point.y + component.dy)
                        }));
                    }
                }
                Some(bounding_box(points.iter()))
            },
            Self::Empty | Self::Raw(_) => None,
        }
    }

    fn encode(&self, glyphs: &[TestGlyph]) -> Vec<u8> {
        match self {
            Self::Simple {
                contours,
                instructions,
            } => encode_simple_glyph(contours, instructions),
            Self::Composite {
                components,
                instructions,
            } => encode_composite_glyph(
                components,
                instructions.as_deref(),
                self.bounding_box(glyphs).unwrap_or_default(),
            ),
            Self::Empty => vec![],
            Self::Raw(data) => data.clone(),
        }
    }
}

/// Wrap tables into an sfnt with a table directory
pub fn sfnt(tables: &[(Tag, Vec<u8>)]) -> Vec<u8> {
    let num_tables = tables.len() as u16;
    let entry_selector = if num_tables == 0 { 0 } else { 15 - num_tables.leading_zeros() as u16 };
    let search_range = (1 << entry_selector) * 16;

    let mut data = vec![];
    push_u32(&mut data, 0x00010000);
    push_u16(&mut data, num_tables);
    push_u16(&mut data, search_range);
    push_u16(&mut data, entry_selector);
    push_u16(&mut data, (num_tables * 16).saturating_sub(search_range));

    let mut offset = 12 + 16 * tables.len();
    for (tag, table) in tables {
        push_u32(&mut data, u32::from_be_bytes(tag.to_bytes()));
        push_u32(&mut data, checksum(table));
        push_u32(&mut data, offset as u32);
        push_u32(&mut data, table.len() as u32);
        offset += table.len().next_multiple_of(4);
    }

    for (_, table) in tables {
        data.extend_from_slice(table);
        pad_to_four(&mut data);
    }
    data
}

/// Combine fonts built by [FontBuilder] into a collection
pub fn collection(fonts: &[Vec<u8>], version: u32) -> Vec<u8> {
    let header_size = 12 + 4 * fonts.len() + if version >= 0x00020000 { 12 } else { 0 };

    let mut data = vec![];
    data.extend_from_slice(b"ttcf");
    push_u32(&mut data, version);
    push_u32(&mut data, fonts.len() as u32);

    let mut body = vec![];
    for font in fonts {
        let base = header_size + body.len();
        push_u32(&mut data, base as u32);

        let mut font = font.clone();
        let num_tables = u16::from_be_bytes([font[4], font[5]]) as usize;
        for index in 0..num_tables {
            let position = 12 + 16 * index + 8;
            let offset = u32::from_be_bytes(font[position..position + 4].try_into().unwrap());
            font[position..position + 4].copy_from_slice(&(offset + base as u32).to_be_bytes());
        }

        body.extend(font);
        pad_to_four(&mut body);
    }

    if version >= 0x00020000 {
        // No digital signature
        data.extend_from_slice(&[0; 12]);
    }

    data.extend(body);
    data
}

/// Builds a complete font.
///
/// Glyph `0` is always an empty `.notdef` glyph, glyphs added with
/// [glyph](FontBuilder::glyph) get the ids `1, 2, ...`.
pub struct FontBuilder {
    units_per_em: u16,
    loca_format: LocaTableFormat,
    glyphs: Vec<TestGlyph>,
    mappings: Vec<(u32, u16)>,
    cvt: Option<Vec<i16>>,
    fpgm: Option<Vec<u8>>,
    prep: Option<Vec<u8>>,
    omitted_tables: Vec<Tag>,
}

impl FontBuilder {
    pub fn new() -> Self {
        Self {
            units_per_em: 1000,
            loca_format: LocaTableFormat::Short,
            glyphs: vec![TestGlyph::Empty],
            mappings: vec![],
            cvt: None,
            fpgm: None,
            prep: None,
            omitted_tables: vec![],
        }
    }

    pub fn units_per_em(mut self, units_per_em: u16) -> Self {
        self.units_per_em = units_per_em;
        self
    }

    pub fn loca_format(mut self, format: LocaTableFormat) -> Self {
        self.loca_format = format;
        self
    }

    pub fn glyph(mut self, glyph: TestGlyph) -> Self {
        self.glyphs.push(glyph);
        self
    }

    /// Map a character to a glyph id
    pub fn map(mut self, character: char, glyph: u16) -> Self {
        self.mappings.push((character as u32, glyph));
        self
    }

    pub fn cvt(mut self, values: Vec<i16>) -> Self {
        self.cvt = Some(values);
        self
    }

    pub fn fpgm(mut self, program: Vec<u8>) -> Self {
        self.fpgm = Some(program);
        self
    }

    pub fn prep(mut self, program: Vec<u8>) -> Self {
        self.prep = Some(program);
        self
    }

    pub fn without_table(mut self, tag: Tag) -> Self {
        self.omitted_tables.push(tag);
        self
    }

    fn cmap(&self) -> Vec<u8> {
        let mut mappings = self.mappings.clone();
        mappings.sort_unstable();

        let segments = mappings
            .iter()
            .filter_map(|&(codepoint, glyph)| {
                let codepoint = u16::try_from(codepoint).ok()?;
                Some((codepoint, codepoint, glyph.wrapping_sub(codepoint) as i16, 0))
            })
            .collect();
        let mut subtables = vec![CmapSubtable::Format4 {
            platform: (3, 1),
            segments,
        }];

        if mappings.iter().any(|&(codepoint, _)| codepoint > 0xFFFF) {
            subtables.push(CmapSubtable::Format12 {
                platform: (3, 10),
                groups: mappings
                    .iter()
                    .map(|&(codepoint, glyph)| (codepoint, codepoint, glyph.into()))
                    .collect(),
            });
        }

        cmap_table(&subtables)
    }

    pub fn build(&self) -> Vec<u8> {
        let mut glyf = vec![];
        let mut offsets = vec![0];
        for glyph in &self.glyphs {
            glyf.extend(glyph.encode(&self.glyphs));

            // Short offsets can only address even positions
            if self.loca_format == LocaTableFormat::Short && glyf.len() % 2 != 0 {
                glyf.push(0);
            }
            offsets.push(glyf.len());
        }

        let mut loca = vec![];
        for offset in offsets {
            match self.loca_format {
                LocaTableFormat::Short => push_u16(&mut loca, (offset / 2) as u16),
                LocaTableFormat::Long => push_u32(&mut loca, offset as u32),
            }
        }

        let font_bbox = self
            .glyphs
            .iter()
            .filter_map(|glyph| glyph.bounding_box(&self.glyphs))
            .reduce(|a, b| [a[0].min(b[0]), a[1].min(b[1]), a[2].max(b[2]), a[3].max(b[3])])
            .unwrap_or_default();

        let mut tables = vec![(Tag::CMAP, self.cmap())];
        if let Some(cvt) = &self.cvt {
            let mut data = vec![];
            for &value in cvt {
                push_i16(&mut data, value);
            }
            tables.push((Tag::CVT, data));
        }
        if let Some(fpgm) = &self.fpgm {
            tables.push((Tag::FPGM, fpgm.clone()));
        }
        tables.push((Tag::GLYF, glyf));
        tables.push((
            Tag::HEAD,
            head_table(self.units_per_em, font_bbox, self.loca_format),
        ));
        tables.push((Tag::LOCA, loca));
        tables.push((
            Tag::MAXP,
            maxp_table(self.glyphs.len() as u16, 4, 16, 16),
        ));
        if let Some(prep) = &self.prep {
            tables.push((Tag::PREP, prep.clone()));
        }

        tables.retain(|(tag, _)| !self.omitted_tables.contains(tag));
        sfnt(&tables)
    }
}

#[test]
fn builder_produces_a_readable_font() {
    use crate::{ttf_tables::cmap::GlyphID, FontFile};

    let file = FontFile::from_bytes(
        FontBuilder::new()
            .loca_format(LocaTableFormat::Long)
            .glyph(TestGlyph::square(-20, 10, 300))
            .map('a', 1)
            .map('\u{1F600}', 1)
            .build(),
    );
    let font = file.font(0).unwrap();

    assert_eq!(font.num_glyphs(), 2);
    assert_eq!(font.head().min_x(), -20);
    assert_eq!(font.head().max_y(), 310);
    assert_eq!(font.glyph_id('a' as u32, 0).unwrap(), Some(GlyphID::new(1)));
    assert_eq!(font.glyph_id(0x1F600, 0).unwrap(), Some(GlyphID::new(1)));

    let glyph = font.decode_glyph(GlyphID::new(1)).unwrap();
    assert_eq!(glyph.num_points(), 4);
    assert_eq!(glyph.metrics.max_x, 280);
}
