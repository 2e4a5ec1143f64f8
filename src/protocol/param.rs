//! Parameter tag algebra.
//!
//! A [`ParamTag`] packs everything the codec needs to know about one
//! parameter slot into a 16-bit value:
//!
//! ```text
//! ┌───────────┬─────────────┬──────────────┬─────────┐
//! │ Directive │  Datatype   │ Length class │  Kind   │
//! │ bits 11-14│  bits 6-10  │  bits 3-5    │ bits 0-2│
//! └───────────┴─────────────┴──────────────┴─────────┘
//! ```
//!
//! The layout is part of the wire format: DYNAMIC slots carry the tag of the
//! runtime datatype inline, as a little-endian `u16`.

use std::fmt;
use std::str::FromStr;

/// Bit regions of a parameter tag.
pub mod bits {
    /// Payload has a fixed width selected by the length class.
    pub const FIXED_LENGTH: u16 = 1 << 0;
    /// Payload is preceded by an `i32` length and a definition byte.
    pub const PREFIXED_LENGTH: u16 = 1 << 1;
    /// Control directive; produces no value of its own.
    pub const SPECIAL: u16 = 1 << 2;

    /// Kind bits (0-2).
    pub const KINDS: u16 = 0b111;
    /// Length class bits (3-5).
    pub const LENGTHS: u16 = 0b111 << LENGTH_SHIFT;
    /// Datatype bits (6-10).
    pub const DATATYPES: u16 = 0b11111 << DATATYPE_SHIFT;
    /// Directive bits (11-14).
    pub const DIRECTIVES: u16 = 0b1111 << DIRECTIVE_SHIFT;

    pub const LENGTH_SHIFT: u16 = 3;
    pub const DATATYPE_SHIFT: u16 = 6;
    pub const DIRECTIVE_SHIFT: u16 = 11;
}

use bits::{DATATYPE_SHIFT, DIRECTIVE_SHIFT, FIXED_LENGTH, LENGTH_SHIFT, PREFIXED_LENGTH, SPECIAL};

const fn fixed(length: u16) -> u16 {
    (length << LENGTH_SHIFT) | FIXED_LENGTH
}

const fn datatype(code: u16) -> u16 {
    code << DATATYPE_SHIFT
}

const fn directive(code: u16) -> u16 {
    (code << DIRECTIVE_SHIFT) | SPECIAL
}

/// Wire encoding strategy of one parameter slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParamTag(u16);

impl ParamTag {
    pub const BYTES_1: Self = Self(fixed(1));
    pub const BYTES_2: Self = Self(fixed(2));
    pub const BYTES_4: Self = Self(fixed(3));
    pub const BYTES_8: Self = Self(fixed(4));
    pub const BYTES_16: Self = Self(fixed(5));

    /// Datatype resolved from the value at encode time and carried inline.
    pub const DYNAMIC: Self = Self(datatype(1));
    pub const BOOLEAN: Self = Self(datatype(2) | fixed(3));
    pub const CHAR: Self = Self(datatype(3) | fixed(1));
    pub const SBYTE: Self = Self(datatype(4) | fixed(1));
    pub const BYTE: Self = Self(datatype(5) | fixed(1));
    pub const SHORT: Self = Self(datatype(6) | fixed(2));
    pub const USHORT: Self = Self(datatype(7) | fixed(2));
    pub const INT: Self = Self(datatype(8) | fixed(3));
    pub const UINT: Self = Self(datatype(9) | fixed(3));
    pub const LONG: Self = Self(datatype(10) | fixed(4));
    pub const ULONG: Self = Self(datatype(11) | fixed(4));
    pub const FLOAT: Self = Self(datatype(12) | fixed(3));
    pub const DOUBLE: Self = Self(datatype(13) | fixed(4));
    pub const DECIMAL: Self = Self(datatype(14) | fixed(5));
    pub const DATETIME: Self = Self(datatype(15) | fixed(4));
    pub const GUID: Self = Self(datatype(16) | fixed(5));
    pub const STRING: Self = Self(datatype(17) | PREFIXED_LENGTH);
    pub const RAW: Self = Self(datatype(19) | PREFIXED_LENGTH);

    /// Decode the next slot only if the previous value is `true`.
    pub const IF_TRUE: Self = Self(directive(1));
    /// Decode the next slot only if the previous value is zero.
    pub const IF_ZERO: Self = Self(directive(2));
    /// Decode the next slot only if the previous value is not zero.
    pub const IF_NOT_ZERO: Self = Self(directive(3));
    /// The next slot repeats once per element of a length-prefixed array.
    pub const ARRAY_OF: Self = Self(directive(4));

    /// Every tag a schema may contain.
    pub const ALL: [Self; 27] = [
        Self::BYTES_1,
        Self::BYTES_2,
        Self::BYTES_4,
        Self::BYTES_8,
        Self::BYTES_16,
        Self::DYNAMIC,
        Self::BOOLEAN,
        Self::CHAR,
        Self::SBYTE,
        Self::BYTE,
        Self::SHORT,
        Self::USHORT,
        Self::INT,
        Self::UINT,
        Self::LONG,
        Self::ULONG,
        Self::FLOAT,
        Self::DOUBLE,
        Self::DECIMAL,
        Self::DATETIME,
        Self::GUID,
        Self::STRING,
        Self::RAW,
        Self::IF_TRUE,
        Self::IF_ZERO,
        Self::IF_NOT_ZERO,
        Self::ARRAY_OF,
    ];

    /// Raw tag bits.
    #[inline]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Build a tag from raw bits, accepting only known tags.
    pub fn from_bits(bits: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|tag| tag.0 == bits)
    }

    /// Build a tag received inline in a DYNAMIC slot.
    ///
    /// Only typed datatype tags are accepted: DYNAMIC itself, untyped byte
    /// blocks and directives are rejected.
    pub fn from_wire_datatype(bits: u16) -> Option<Self> {
        Self::from_bits(bits).filter(|tag| tag.datatype().is_some_and(|d| d != Datatype::Dynamic))
    }

    /// Split the tag into its four regions.
    pub fn classify(self) -> Classification {
        Classification {
            kind: self.kind(),
            length_class: self.length_class(),
            datatype: self.datatype(),
            directive: self.directive(),
        }
    }

    /// Kind region.
    pub fn kind(self) -> Option<Kind> {
        match self.0 & bits::KINDS {
            FIXED_LENGTH => Some(Kind::FixedLength),
            PREFIXED_LENGTH => Some(Kind::PrefixedLength),
            SPECIAL => Some(Kind::Special),
            _ => None,
        }
    }

    /// Length class region, meaningful only for fixed-length tags.
    pub fn length_class(self) -> Option<LengthClass> {
        if self.0 & bits::KINDS != FIXED_LENGTH {
            return None;
        }
        LengthClass::from_code((self.0 & bits::LENGTHS) >> LENGTH_SHIFT)
    }

    /// Datatype region.
    pub fn datatype(self) -> Option<Datatype> {
        if self.is_special() {
            return None;
        }
        Datatype::from_code((self.0 & bits::DATATYPES) >> DATATYPE_SHIFT)
    }

    /// Directive region, meaningful only for special tags.
    pub fn directive(self) -> Option<Directive> {
        if !self.is_special() {
            return None;
        }
        Directive::from_code((self.0 & bits::DIRECTIVES) >> DIRECTIVE_SHIFT)
    }

    /// Whether this tag is a control directive.
    #[inline]
    pub fn is_special(self) -> bool {
        self.0 & SPECIAL != 0
    }

    /// Whether this tag is the runtime-typed slot.
    #[inline]
    pub fn is_dynamic(self) -> bool {
        self == Self::DYNAMIC
    }

    /// Fixed payload width in bytes, if any.
    pub fn fixed_width(self) -> Option<usize> {
        self.length_class().map(LengthClass::width)
    }

    /// Encoding strategy used by the reader and writer.
    pub fn slot(self) -> Option<Slot> {
        if let Some(directive) = self.directive() {
            return Some(Slot::Directive(directive));
        }
        if self.is_dynamic() {
            return Some(Slot::Dynamic);
        }
        match self.kind()? {
            Kind::FixedLength => Some(Slot::Fixed(self.fixed_width()?)),
            Kind::PrefixedLength => Some(Slot::Prefixed),
            Kind::Special => None,
        }
    }

    /// Upper-case schema name, e.g. `"INT"`.
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::BYTES_1 => "BYTES_1",
            Self::BYTES_2 => "BYTES_2",
            Self::BYTES_4 => "BYTES_4",
            Self::BYTES_8 => "BYTES_8",
            Self::BYTES_16 => "BYTES_16",
            Self::DYNAMIC => "DYNAMIC",
            Self::BOOLEAN => "BOOLEAN",
            Self::CHAR => "CHAR",
            Self::SBYTE => "SBYTE",
            Self::BYTE => "BYTE",
            Self::SHORT => "SHORT",
            Self::USHORT => "USHORT",
            Self::INT => "INT",
            Self::UINT => "UINT",
            Self::LONG => "LONG",
            Self::ULONG => "ULONG",
            Self::FLOAT => "FLOAT",
            Self::DOUBLE => "DOUBLE",
            Self::DECIMAL => "DECIMAL",
            Self::DATETIME => "DATETIME",
            Self::GUID => "GUID",
            Self::STRING => "STRING",
            Self::RAW => "RAW",
            Self::IF_TRUE => "IF_TRUE",
            Self::IF_ZERO => "IF_ZERO",
            Self::IF_NOT_ZERO => "IF_NOT_ZERO",
            Self::ARRAY_OF => "ARRAY_OF",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Debug for ParamTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "ParamTag(0x{:04x})", self.0),
        }
    }
}

impl fmt::Display for ParamTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl FromStr for ParamTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|tag| tag.name() == Some(s))
            .ok_or_else(|| s.to_string())
    }
}

/// Kind region of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    FixedLength,
    PrefixedLength,
    Special,
}

/// Fixed payload width selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LengthClass {
    Bytes1,
    Bytes2,
    Bytes4,
    Bytes8,
    Bytes16,
}

impl LengthClass {
    fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(Self::Bytes1),
            2 => Some(Self::Bytes2),
            3 => Some(Self::Bytes4),
            4 => Some(Self::Bytes8),
            5 => Some(Self::Bytes16),
            _ => None,
        }
    }

    /// Payload width in bytes.
    pub fn width(self) -> usize {
        match self {
            Self::Bytes1 => 1,
            Self::Bytes2 => 2,
            Self::Bytes4 => 4,
            Self::Bytes8 => 8,
            Self::Bytes16 => 16,
        }
    }
}

/// Logical datatype region of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Datatype {
    Dynamic,
    Boolean,
    Char,
    SByte,
    Byte,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    Float,
    Double,
    Decimal,
    DateTime,
    Guid,
    String,
    Raw,
}

impl Datatype {
    fn from_code(code: u16) -> Option<Self> {
        let datatype = match code {
            1 => Self::Dynamic,
            2 => Self::Boolean,
            3 => Self::Char,
            4 => Self::SByte,
            5 => Self::Byte,
            6 => Self::Short,
            7 => Self::UShort,
            8 => Self::Int,
            9 => Self::UInt,
            10 => Self::Long,
            11 => Self::ULong,
            12 => Self::Float,
            13 => Self::Double,
            14 => Self::Decimal,
            15 => Self::DateTime,
            16 => Self::Guid,
            17 => Self::String,
            19 => Self::Raw,
            _ => return None,
        };
        Some(datatype)
    }

    /// The concrete tag carrying this datatype.
    pub fn tag(self) -> ParamTag {
        match self {
            Self::Dynamic => ParamTag::DYNAMIC,
            Self::Boolean => ParamTag::BOOLEAN,
            Self::Char => ParamTag::CHAR,
            Self::SByte => ParamTag::SBYTE,
            Self::Byte => ParamTag::BYTE,
            Self::Short => ParamTag::SHORT,
            Self::UShort => ParamTag::USHORT,
            Self::Int => ParamTag::INT,
            Self::UInt => ParamTag::UINT,
            Self::Long => ParamTag::LONG,
            Self::ULong => ParamTag::ULONG,
            Self::Float => ParamTag::FLOAT,
            Self::Double => ParamTag::DOUBLE,
            Self::Decimal => ParamTag::DECIMAL,
            Self::DateTime => ParamTag::DATETIME,
            Self::Guid => ParamTag::GUID,
            Self::String => ParamTag::STRING,
            Self::Raw => ParamTag::RAW,
        }
    }

    /// Whether IF_ZERO / IF_NOT_ZERO can test values of this datatype.
    pub fn is_zero_testable(self) -> bool {
        !matches!(self, Self::Guid | Self::String | Self::Raw)
    }
}

/// Control directive region of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    IfTrue,
    IfZero,
    IfNotZero,
    ArrayOf,
}

impl Directive {
    fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(Self::IfTrue),
            2 => Some(Self::IfZero),
            3 => Some(Self::IfNotZero),
            4 => Some(Self::ArrayOf),
            _ => None,
        }
    }
}

/// All four regions of a tag; absent regions are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub kind: Option<Kind>,
    pub length_class: Option<LengthClass>,
    pub datatype: Option<Datatype>,
    pub directive: Option<Directive>,
}

/// How a slot is laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Exactly this many payload bytes.
    Fixed(usize),
    /// `i32` length, definition byte, payload.
    Prefixed,
    /// Inline `u16` tag, definition byte, then fixed or prefixed payload.
    Dynamic,
    /// Alters traversal without consuming payload bytes of its own.
    Directive(Directive),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_layout_matches_wire() {
        assert_eq!(ParamTag::BYTES_1.bits(), 0b0000_1001);
        assert_eq!(ParamTag::DYNAMIC.bits(), 0x0040);
        assert_eq!(ParamTag::INT.bits(), (8 << 6) | (3 << 3) | 1);
        assert_eq!(ParamTag::STRING.bits(), (17 << 6) | 2);
        assert_eq!(ParamTag::ARRAY_OF.bits(), (4 << 11) | 4);
    }

    #[test]
    fn test_classify_fixed() {
        let class = ParamTag::DOUBLE.classify();
        assert_eq!(class.kind, Some(Kind::FixedLength));
        assert_eq!(class.length_class, Some(LengthClass::Bytes8));
        assert_eq!(class.datatype, Some(Datatype::Double));
        assert_eq!(class.directive, None);
    }

    #[test]
    fn test_classify_prefixed_and_directive() {
        let class = ParamTag::RAW.classify();
        assert_eq!(class.kind, Some(Kind::PrefixedLength));
        assert_eq!(class.length_class, None);
        assert_eq!(class.datatype, Some(Datatype::Raw));

        let class = ParamTag::IF_NOT_ZERO.classify();
        assert_eq!(class.kind, Some(Kind::Special));
        assert_eq!(class.datatype, None);
        assert_eq!(class.directive, Some(Directive::IfNotZero));
    }

    #[test]
    fn test_widths() {
        assert_eq!(ParamTag::BOOLEAN.fixed_width(), Some(4));
        assert_eq!(ParamTag::CHAR.fixed_width(), Some(1));
        assert_eq!(ParamTag::USHORT.fixed_width(), Some(2));
        assert_eq!(ParamTag::DATETIME.fixed_width(), Some(8));
        assert_eq!(ParamTag::GUID.fixed_width(), Some(16));
        assert_eq!(ParamTag::DECIMAL.fixed_width(), Some(16));
        assert_eq!(ParamTag::STRING.fixed_width(), None);
    }

    #[test]
    fn test_slot_dispatch() {
        assert_eq!(ParamTag::DYNAMIC.slot(), Some(Slot::Dynamic));
        assert_eq!(ParamTag::BYTES_2.slot(), Some(Slot::Fixed(2)));
        assert_eq!(ParamTag::STRING.slot(), Some(Slot::Prefixed));
        assert_eq!(
            ParamTag::ARRAY_OF.slot(),
            Some(Slot::Directive(Directive::ArrayOf))
        );
    }

    #[test]
    fn test_from_bits_rejects_unknown() {
        assert_eq!(ParamTag::from_bits(ParamTag::UINT.bits()), Some(ParamTag::UINT));
        assert_eq!(ParamTag::from_bits(0), None);
        assert_eq!(ParamTag::from_bits(18 << 6 | 2), None);
    }

    #[test]
    fn test_from_wire_datatype() {
        assert_eq!(
            ParamTag::from_wire_datatype(ParamTag::GUID.bits()),
            Some(ParamTag::GUID)
        );
        assert_eq!(ParamTag::from_wire_datatype(ParamTag::DYNAMIC.bits()), None);
        assert_eq!(ParamTag::from_wire_datatype(ParamTag::BYTES_4.bits()), None);
        assert_eq!(ParamTag::from_wire_datatype(ParamTag::IF_TRUE.bits()), None);
    }

    #[test]
    fn test_names_round_trip() {
        for tag in ParamTag::ALL {
            let name = tag.name().unwrap();
            assert_eq!(name.parse::<ParamTag>().unwrap(), tag);
        }
        assert!("BIGINTEGER".parse::<ParamTag>().is_err());
    }

    #[test]
    fn test_datatype_tag_consistency() {
        for tag in ParamTag::ALL {
            if let Some(datatype) = tag.datatype() {
                assert_eq!(datatype.tag(), tag);
            }
        }
    }
}
