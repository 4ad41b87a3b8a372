//! The tables of a TrueType font that are needed to render glyphs.

pub mod cmap;
pub mod cvt;
pub mod glyf;
pub mod head;
pub mod loca;
pub mod maxp;
pub mod offset;
pub mod program;
