//! TrueType font loading, hinting and rasterization.
//!
//! A [FontFile] owns the raw bytes of a `.ttf` or `.ttc` file. Each [Font] inside it
//! maps characters to glyphs, runs the font's hinting programs and renders
//! glyphs into a [PixelMask] where every cell is either filled or empty.
//!
//! ```no_run
//! use truetype::{FontFile, RenderOptions};
//!
//! let file = FontFile::open("DejaVuSans.ttf")?;
//! let font = file.font(0)?;
//!
//! if let Some(glyph) = font.render('A' as u32, &RenderOptions::default())? {
//!     println!("{}", glyph.mask);
//! }
//! # Ok::<(), truetype::Error>(())
//! ```

mod error;
pub mod hinting;
pub mod path;
pub mod rasterizer;
mod stream;
pub mod ttf;
pub mod ttf_tables;

#[cfg(test)]
mod test_font;

pub use error::{Error, Result};
pub use rasterizer::{PixelMask, Rasterizer};
pub use stream::{Readable, Stream};
pub use ttf::{Font, FontFile, HintingPolicy, RenderOptions, RenderedGlyph};
pub use ttf_tables::{cmap::GlyphID, glyf::SimpleGlyph};
