//! The TrueType instruction set.
//!
//! See <https://developer.apple.com/fonts/TrueType-Reference-Manual/RM05/Chap5.html>
//! for a description of every instruction.

/// Axis selected by the `a` bit of `SVTCA`, `SPVTCA` and `SFVTCA`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    fn from_bit(bit: u8) -> Self {
        if bit & 1 == 0 {
            Self::Y
        } else {
            Self::X
        }
    }
}

/// A single decoded instruction.
///
/// Instructions that exist in several variants (selected by the low bits of the opcode)
/// carry the variant bits. Bytes that do not name an instruction decode to [Opcode::Unknown].
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opcode {
    SVTCA(Axis),
    SPVTCA(Axis),
    SFVTCA(Axis),
    SPVTL(u8),
    SFVTL(u8),
    SPVFS,
    SFVFS,
    GPV,
    GFV,
    SFVTPV,
    ISECT,
    SRP0,
    SRP1,
    SRP2,
    SZP0,
    SZP1,
    SZP2,
    SZPS,
    SLOOP,
    RTG,
    RTHG,
    SMD,
    ELSE,
    JMPR,
    SCVTCI,
    SSWCI,
    SSW,
    DUP,
    POP,
    CLEAR,
    SWAP,
    DEPTH,
    CINDEX,
    MINDEX,
    ALIGNPTS,
    UTP,
    LOOPCALL,
    CALL,
    FDEF,
    ENDF,
    MDAP(u8),
    IUP(u8),
    SHP(u8),
    SHC(u8),
    SHZ(u8),
    SHPIX,
    IP,
    MSIRP(u8),
    ALIGNRP,
    RTDG,
    MIAP(u8),
    NPUSHB,
    NPUSHW,
    WS,
    RS,
    WCVTP,
    RCVT,
    GC(u8),
    SCFS,
    MD(u8),
    MPPEM,
    MPS,
    FLIPON,
    FLIPOFF,
    DEBUG,
    LT,
    LTEQ,
    GT,
    GTEQ,
    EQ,
    NEQ,
    ODD,
    EVEN,
    IF,
    EIF,
    AND,
    OR,
    NOT,
    DELTAP1,
    SDB,
    SDS,
    ADD,
    SUB,
    DIV,
    MUL,
    ABS,
    NEG,
    FLOOR,
    CEILING,
    ROUND(u8),
    NROUND(u8),
    WCVTF,
    DELTAP2,
    DELTAP3,
    DELTAC1,
    DELTAC2,
    DELTAC3,
    SROUND,
    S45ROUND,
    JROT,
    JROF,
    ROFF,
    RUTG,
    RDTG,
    SANGW,
    AA,
    FLIPPT,
    FLIPRGON,
    FLIPRGOFF,
    SCANCTRL,
    SDPVTL(u8),
    GETINFO,
    IDEF,
    ROLL,
    MAX,
    MIN,
    SCANTYPE,
    INSTCTRL,

    /// Push `n + 1` bytes that follow the instruction
    PUSHB(u8),

    /// Push `n + 1` words that follow the instruction
    PUSHW(u8),
    MDRP(u8),
    MIRP(u8),
    Unknown(u8),
}

impl Opcode {
    #[must_use]
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x00..=0x01 => Self::SVTCA(Axis::from_bit(byte)),
            0x02..=0x03 => Self::SPVTCA(Axis::from_bit(byte)),
            0x04..=0x05 => Self::SFVTCA(Axis::from_bit(byte)),
            0x06..=0x07 => Self::SPVTL(byte & 1),
            0x08..=0x09 => Self::SFVTL(byte & 1),
            0x0A => Self::SPVFS,
            0x0B => Self::SFVFS,
            0x0C => Self::GPV,
            0x0D => Self::GFV,
            0x0E => Self::SFVTPV,
            0x0F => Self::ISECT,
            0x10 => Self::SRP0,
            0x11 => Self::SRP1,
            0x12 => Self::SRP2,
            0x13 => Self::SZP0,
            0x14 => Self::SZP1,
            0x15 => Self::SZP2,
            0x16 => Self::SZPS,
            0x17 => Self::SLOOP,
            0x18 => Self::RTG,
            0x19 => Self::RTHG,
            0x1A => Self::SMD,
            0x1B => Self::ELSE,
            0x1C => Self::JMPR,
            0x1D => Self::SCVTCI,
            0x1E => Self::SSWCI,
            0x1F => Self::SSW,
            0x20 => Self::DUP,
            0x21 => Self::POP,
            0x22 => Self::CLEAR,
            0x23 => Self::SWAP,
            0x24 => Self::DEPTH,
            0x25 => Self::CINDEX,
            0x26 => Self::MINDEX,
            0x27 => Self::ALIGNPTS,
            0x29 => Self::UTP,
            0x2A => Self::LOOPCALL,
            0x2B => Self::CALL,
            0x2C => Self::FDEF,
            0x2D => Self::ENDF,
            0x2E..=0x2F => Self::MDAP(byte & 1),
            0x30..=0x31 => Self::IUP(byte & 1),
            0x32..=0x33 => Self::SHP(byte & 1),
            0x34..=0x35 => Self::SHC(byte & 1),
            0x36..=0x37 => Self::SHZ(byte & 1),
            0x38 => Self::SHPIX,
            0x39 => Self::IP,
            0x3A..=0x3B => Self::MSIRP(byte & 1),
            0x3C => Self::ALIGNRP,
            0x3D => Self::RTDG,
            0x3E..=0x3F => Self::MIAP(byte & 1),
            0x40 => Self::NPUSHB,
            0x41 => Self::NPUSHW,
            0x42 => Self::WS,
            0x43 => Self::RS,
            0x44 => Self::WCVTP,
            0x45 => Self::RCVT,
            0x46..=0x47 => Self::GC(byte & 1),
            0x48 => Self::SCFS,
            0x49..=0x4A => Self::MD(byte & 1),
            0x4B => Self::MPPEM,
            0x4C => Self::MPS,
            0x4D => Self::FLIPON,
            0x4E => Self::FLIPOFF,
            0x4F => Self::DEBUG,
            0x50 => Self::LT,
            0x51 => Self::LTEQ,
            0x52 => Self::GT,
            0x53 => Self::GTEQ,
            0x54 => Self::EQ,
            0x55 => Self::NEQ,
            0x56 => Self::ODD,
            0x57 => Self::EVEN,
            0x58 => Self::IF,
            0x59 => Self::EIF,
            0x5A => Self::AND,
            0x5B => Self::OR,
            0x5C => Self::NOT,
            0x5D => Self::DELTAP1,
            0x5E => Self::SDB,
            0x5F => Self::SDS,
            0x60 => Self::ADD,
            0x61 => Self::SUB,
            0x62 => Self::DIV,
            0x63 => Self::MUL,
            0x64 => Self::ABS,
            0x65 => Self::NEG,
            0x66 => Self::FLOOR,
            0x67 => Self::CEILING,
            0x68..=0x6B => Self::ROUND(byte & 0b11),
            0x6C..=0x6F => Self::NROUND(byte & 0b11),
            0x70 => Self::WCVTF,
            0x71 => Self::DELTAP2,
            0x72 => Self::DELTAP3,
            0x73 => Self::DELTAC1,
            0x74 => Self::DELTAC2,
            0x75 => Self::DELTAC3,
            0x76 => Self::SROUND,
            0x77 => Self::S45ROUND,
            0x78 => Self::JROT,
            0x79 => Self::JROF,
            0x7A => Self::ROFF,
            0x7C => Self::RUTG,
            0x7D => Self::RDTG,
            0x7E => Self::SANGW,
            0x7F => Self::AA,
            0x80 => Self::FLIPPT,
            0x81 => Self::FLIPRGON,
            0x82 => Self::FLIPRGOFF,
            0x85 => Self::SCANCTRL,
            0x86..=0x87 => Self::SDPVTL(byte & 1),
            0x88 => Self::GETINFO,
            0x89 => Self::IDEF,
            0x8A => Self::ROLL,
            0x8B => Self::MAX,
            0x8C => Self::MIN,
            0x8D => Self::SCANTYPE,
            0x8E => Self::INSTCTRL,
            0xB0..=0xB7 => Self::PUSHB(byte - 0xB0),
            0xB8..=0xBF => Self::PUSHW(byte - 0xB8),
            0xC0..=0xDF => Self::MDRP(byte & 0b11111),
            0xE0..=0xFF => Self::MIRP(byte & 0b11111),
            _ => Self::Unknown(byte),
        }
    }

    #[must_use]
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::SVTCA(_) => "SVTCA",
            Self::SPVTCA(_) => "SPVTCA",
            Self::SFVTCA(_) => "SFVTCA",
            Self::SPVTL(_) => "SPVTL",
            Self::SFVTL(_) => "SFVTL",
            Self::SPVFS => "SPVFS",
            Self::SFVFS => "SFVFS",
            Self::GPV => "GPV",
            Self::GFV => "GFV",
            Self::SFVTPV => "SFVTPV",
            Self::ISECT => "ISECT",
            Self::SRP0 => "SRP0",
            Self::SRP1 => "SRP1",
            Self::SRP2 => "SRP2",
            Self::SZP0 => "SZP0",
            Self::SZP1 => "SZP1",
            Self::SZP2 => "SZP2",
            Self::SZPS => "SZPS",
            Self::SLOOP => "SLOOP",
            Self::RTG => "RTG",
            Self::RTHG => "RTHG",
            Self::SMD => "SMD",
            Self::ELSE => "ELSE",
            Self::JMPR => "JMPR",
            Self::SCVTCI => "SCVTCI",
            Self::SSWCI => "SSWCI",
            Self::SSW => "SSW",
            Self::DUP => "DUP",
            Self::POP => "POP",
            Self::CLEAR => "CLEAR",
            Self::SWAP => "SWAP",
            Self::DEPTH => "DEPTH",
            Self::CINDEX => "CINDEX",
            Self::MINDEX => "MINDEX",
            Self::ALIGNPTS => "ALIGNPTS",
            Self::UTP => "UTP",
            Self::LOOPCALL => "LOOPCALL",
            Self::CALL => "CALL",
            Self::FDEF => "FDEF",
            Self::ENDF => "ENDF",
            Self::MDAP(_) => "MDAP",
            Self::IUP(_) => "IUP",
            Self::SHP(_) => "SHP",
            Self::SHC(_) => "SHC",
            Self::SHZ(_) => "SHZ",
            Self::SHPIX => "SHPIX",
            Self::IP => "IP",
            Self::MSIRP(_) => "MSIRP",
            Self::ALIGNRP => "ALIGNRP",
            Self::RTDG => "RTDG",
            Self::MIAP(_) => "MIAP",
            Self::NPUSHB => "NPUSHB",
            Self::NPUSHW => "NPUSHW",
            Self::WS => "WS",
            Self::RS => "RS",
            Self::WCVTP => "WCVTP",
            Self::RCVT => "RCVT",
            Self::GC(_) => "GC",
            Self::SCFS => "SCFS",
            Self::MD(_) => "MD",
            Self::MPPEM => "MPPEM",
            Self::MPS => "MPS",
            Self::FLIPON => "FLIPON",
            Self::FLIPOFF => "FLIPOFF",
            Self::DEBUG => "DEBUG",
            Self::LT => "LT",
            Self::LTEQ => "LTEQ",
            Self::GT => "GT",
            Self::GTEQ => "GTEQ",
            Self::EQ => "EQ",
            Self::NEQ => "NEQ",
            Self::ODD => "ODD",
            Self::EVEN => "EVEN",
            Self::IF => "IF",
            Self::EIF => "EIF",
            Self::AND => "AND",
            Self::OR => "OR",
            Self::NOT => "NOT",
            Self::DELTAP1 => "DELTAP1",
            Self::SDB => "SDB",
            Self::SDS => "SDS",
            Self::ADD => "ADD",
            Self::SUB => "SUB",
            Self::DIV => "DIV",
            Self::MUL => "MUL",
            Self::ABS => "ABS",
            Self::NEG => "NEG",
            Self::FLOOR => "FLOOR",
            Self::CEILING => "CEILING",
            Self::ROUND(_) => "ROUND",
            Self::NROUND(_) => "NROUND",
            Self::WCVTF => "WCVTF",
            Self::DELTAP2 => "DELTAP2",
            Self::DELTAP3 => "DELTAP3",
            Self::DELTAC1 => "DELTAC1",
            Self::DELTAC2 => "DELTAC2",
            Self::DELTAC3 => "DELTAC3",
            Self::SROUND => "SROUND",
            Self::S45ROUND => "S45ROUND",
            Self::JROT => "JROT",
            Self::JROF => "JROF",
            Self::ROFF => "ROFF",
            Self::RUTG => "RUTG",
            Self::RDTG => "RDTG",
            Self::SANGW => "SANGW",
            Self::AA => "AA",
            Self::FLIPPT => "FLIPPT",
            Self::FLIPRGON => "FLIPRGON",
            Self::FLIPRGOFF => "FLIPRGOFF",
            Self::SCANCTRL => "SCANCTRL",
            Self::SDPVTL(_) => "SDPVTL",
            Self::GETINFO => "GETINFO",
            Self::IDEF => "IDEF",
            Self::ROLL => "ROLL",
            Self::MAX => "MAX",
            Self::MIN => "MIN",
            Self::SCANTYPE => "SCANTYPE",
            Self::INSTCTRL => "INSTCTRL",
            Self::PUSHB(_) => "PUSHB",
            Self::PUSHW(_) => "PUSHW",
            Self::MDRP(_) => "MDRP",
            Self::MIRP(_) => "MIRP",
            Self::Unknown(_) => "<unknown>",
        }
    }

    /// The number of bytes of inline data following the opcode, if it
    /// can be determined from the opcode alone.
    ///
    /// `NPUSHB` and `NPUSHW` store their operand count in the instruction stream
    /// and return `None`.
    #[must_use]
    pub fn inline_operand_size(&self) -> Option<usize> {
        match self {
            Self::PUSHB(n) => Some(*n as usize + 1),
            Self::PUSHW(n) => Some(2 * (*n as usize + 1)),
            Self::NPUSHB | Self::NPUSHW => None,
            _ => Some(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_variants() {
        assert_eq!(Opcode::from_byte(0x00), Opcode::SVTCA(Axis::Y));
        assert_eq!(Opcode::from_byte(0x01), Opcode::SVTCA(Axis::X));
        assert_eq!(Opcode::from_byte(0x3F), Opcode::MIAP(1));
        assert_eq!(Opcode::from_byte(0x6A), Opcode::ROUND(2));
        assert_eq!(Opcode::from_byte(0xB3), Opcode::PUSHB(3));
        assert_eq!(Opcode::from_byte(0xBF), Opcode::PUSHW(7));
        assert_eq!(Opcode::from_byte(0xD4), Opcode::MDRP(0x14));
        assert_eq!(Opcode::from_byte(0x28), Opcode::Unknown(0x28));
        assert_eq!(Opcode::from_byte(0x91), Opcode::Unknown(0x91));
    }

    #[test]
    fn every_known_byte_has_a_mnemonic() {
        for byte in 0..=u8::MAX {
            let opcode = Opcode::from_byte(byte);
            if !matches!(opcode, Opcode::Unknown(_)) {
                assert!(opcode.mnemonic().chars().all(|c| c.is_ascii_alphanumeric()));
            }
        }
    }

    #[test]
    fn operand_sizes() {
        assert_eq!(Opcode::PUSHB(0).inline_operand_size(), Some(1));
        assert_eq!(Opcode::PUSHW(1).inline_operand_size(), Some(4));
        assert_eq!(Opcode::NPUSHW.inline_operand_size(), None);
        assert_eq!(Opcode::ADD.inline_operand_size(), Some(0));
    }
}
