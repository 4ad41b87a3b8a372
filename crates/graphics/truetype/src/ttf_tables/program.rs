//! The [font program](https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6fpgm.html)
//! and [control value program](https://developer.apple.com/fonts/TrueType-Reference-Manual/RM06/Chap6prep.html).
//!
//! Both tables are nothing but a flat list of instructions.

/// Where a piece of bytecode comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgramKind {
    /// `fpgm`, executed once per hinting run before anything else
    Font,

    /// `prep`, executed after the font program whenever the resolution changes
    ControlValue,

    /// The instructions stored alongside a glyph outline
    Glyph,
}

#[derive(Clone, Copy, Debug)]
pub struct Program<'a> {
    kind: ProgramKind,
    bytecode: &'a [u8],
}

impl<'a> Program<'a> {
    #[inline]
    #[must_use]
    pub fn new(kind: ProgramKind, bytecode: &'a [u8]) -> Self {
        Self { kind, bytecode }
    }

    /// A program for a table that is not present in the font
    #[inline]
    #[must_use]
    pub fn empty(kind: ProgramKind) -> Self {
        Self::new(kind, &[])
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> ProgramKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn bytecode(&self) -> &'a [u8] {
        self.bytecode
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytecode.is_empty()
    }
}
