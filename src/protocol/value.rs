//! Argument values carried by a [`Command`](super::Command).
//!
//! [`Value`] is a closed tagged union over the supported primitives, so the
//! datatype of a DYNAMIC slot is a pure function of the variant.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use uuid::Uuid;

use super::param::{Datatype, ParamTag};

/// One argument of a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    /// Single-byte character (Latin-1 range).
    Char(char),
    SByte(i8),
    Byte(u8),
    Short(i16),
    UShort(u16),
    Int(i32),
    UInt(u32),
    Long(i64),
    ULong(u64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    DateTime(DateTime),
    Guid(Uuid),
    String(String),
    Raw(Bytes),
    /// Untyped block for `BYTES_N` slots.
    Fixed(Bytes),
    /// Elements of an `ARRAY_OF` slot.
    Array(Vec<Value>),
}

impl Value {
    /// Variant name used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "Bool",
            Value::Char(_) => "Char",
            Value::SByte(_) => "SByte",
            Value::Byte(_) => "Byte",
            Value::Short(_) => "Short",
            Value::UShort(_) => "UShort",
            Value::Int(_) => "Int",
            Value::UInt(_) => "UInt",
            Value::Long(_) => "Long",
            Value::ULong(_) => "ULong",
            Value::Float(_) => "Float",
            Value::Double(_) => "Double",
            Value::Decimal(_) => "Decimal",
            Value::DateTime(_) => "DateTime",
            Value::Guid(_) => "Guid",
            Value::String(_) => "String",
            Value::Raw(_) => "Raw",
            Value::Fixed(_) => "Fixed",
            Value::Array(_) => "Array",
        }
    }

    /// Datatype written for this value in a DYNAMIC slot.
    ///
    /// `Fixed` blocks and arrays have no inline datatype.
    pub fn datatype(&self) -> Option<Datatype> {
        let datatype = match self {
            Value::Bool(_) => Datatype::Boolean,
            Value::Char(_) => Datatype::Char,
            Value::SByte(_) => Datatype::SByte,
            Value::Byte(_) => Datatype::Byte,
            Value::Short(_) => Datatype::Short,
            Value::UShort(_) => Datatype::UShort,
            Value::Int(_) => Datatype::Int,
            Value::UInt(_) => Datatype::UInt,
            Value::Long(_) => Datatype::Long,
            Value::ULong(_) => Datatype::ULong,
            Value::Float(_) => Datatype::Float,
            Value::Double(_) => Datatype::Double,
            Value::Decimal(_) => Datatype::Decimal,
            Value::DateTime(_) => Datatype::DateTime,
            Value::Guid(_) => Datatype::Guid,
            Value::String(_) => Datatype::String,
            Value::Raw(_) => Datatype::Raw,
            Value::Fixed(_) | Value::Array(_) => return None,
        };
        Some(datatype)
    }

    /// Whether this value can be written to a slot with the given tag.
    pub fn fits(&self, tag: ParamTag) -> bool {
        match self {
            Value::Fixed(block) => tag.datatype().is_none() && tag.fixed_width() == Some(block.len()),
            _ => self.datatype().map(Datatype::tag) == Some(tag),
        }
    }

    /// Zero predicate used by IF_ZERO and IF_NOT_ZERO.
    ///
    /// Returns `None` for values that have no meaningful zero.
    pub fn is_zero(&self) -> Option<bool> {
        let zero = match self {
            Value::Bool(v) => !*v,
            Value::Char(v) => *v == '\0',
            Value::SByte(v) => *v == 0,
            Value::Byte(v) => *v == 0,
            Value::Short(v) => *v == 0,
            Value::UShort(v) => *v == 0,
            Value::Int(v) => *v == 0,
            Value::UInt(v) => *v == 0,
            Value::Long(v) => *v == 0,
            Value::ULong(v) => *v == 0,
            Value::Float(v) => *v == 0.0,
            Value::Double(v) => *v == 0.0,
            Value::Decimal(v) => v.is_zero(),
            Value::DateTime(v) => v.ticks() == 0,
            Value::Guid(_) | Value::String(_) | Value::Raw(_) | Value::Fixed(_) | Value::Array(_) => {
                return None
            }
        };
        Some(zero)
    }

    /// Boolean payload, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Text payload, if this is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    /// Elements, if this is an `Array`.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Char(v) => write!(f, "{v:?}"),
            Value::SByte(v) => write!(f, "{v}"),
            Value::Byte(v) => write!(f, "{v}"),
            Value::Short(v) => write!(f, "{v}"),
            Value::UShort(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::ULong(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::DateTime(v) => write!(f, "{v}"),
            Value::Guid(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "\"{v}\""),
            Value::Raw(v) | Value::Fixed(v) => write!(f, "{:02x?}", &v[..]),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                #[inline]
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    char => Char,
    i8 => SByte,
    u8 => Byte,
    i16 => Short,
    u16 => UShort,
    i32 => Int,
    u32 => UInt,
    i64 => Long,
    u64 => ULong,
    f32 => Float,
    f64 => Double,
    Decimal => Decimal,
    DateTime => DateTime,
    Uuid => Guid,
    String => String,
    Bytes => Raw,
    Vec<Value> => Array,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Raw(Bytes::from(v))
    }
}

/// Largest mantissa a 96-bit decimal can carry.
const DECIMAL_MAX_MANTISSA: u128 = (1u128 << 96) - 1;

/// Largest decimal scale.
pub const DECIMAL_MAX_SCALE: u8 = 28;

const DECIMAL_SIGN: u32 = 0x8000_0000;
const DECIMAL_SCALE_SHIFT: u32 = 16;
const DECIMAL_SCALE_MASK: u32 = 0x00FF_0000;

/// 128-bit decimal: a 96-bit signed mantissa divided by `10^scale`.
///
/// The wire form is four little-endian `u32` words: low, middle and high
/// mantissa words, then a flags word holding the scale (bits 16-23) and the
/// sign (bit 31).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Decimal {
    mantissa: i128,
    scale: u8,
}

impl Decimal {
    /// Create a decimal, or `None` if the mantissa exceeds 96 bits or the
    /// scale exceeds 28.
    pub fn new(mantissa: i128, scale: u8) -> Option<Self> {
        if mantissa.unsigned_abs() > DECIMAL_MAX_MANTISSA || scale > DECIMAL_MAX_SCALE {
            return None;
        }
        Some(Self { mantissa, scale })
    }

    /// Signed mantissa.
    #[inline]
    pub fn mantissa(&self) -> i128 {
        self.mantissa
    }

    /// Number of decimal digits after the point.
    #[inline]
    pub fn scale(&self) -> u8 {
        self.scale
    }

    /// Whether the value is zero, regardless of scale or sign.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.mantissa == 0
    }

    /// Encode to the 16-byte wire form.
    pub fn to_le_bytes(&self) -> [u8; 16] {
        let magnitude = self.mantissa.unsigned_abs();
        let mut flags = u32::from(self.scale) << DECIMAL_SCALE_SHIFT;
        if self.mantissa < 0 {
            flags |= DECIMAL_SIGN;
        }

        let mut buf = [0u8; 16];
        buf[0..4].copy_from_slice(&(magnitude as u32).to_le_bytes());
        buf[4..8].copy_from_slice(&((magnitude >> 32) as u32).to_le_bytes());
        buf[8..12].copy_from_slice(&((magnitude >> 64) as u32).to_le_bytes());
        buf[12..16].copy_from_slice(&flags.to_le_bytes());
        buf
    }

    /// Decode the 16-byte wire form.
    ///
    /// Returns `None` if reserved flag bits are set or the scale exceeds 28.
    pub fn from_le_bytes(buf: [u8; 16]) -> Option<Self> {
        let lo = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let mid = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
        let hi = u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
        let flags = u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]);

        if flags & !(DECIMAL_SIGN | DECIMAL_SCALE_MASK) != 0 {
            return None;
        }
        let scale = ((flags & DECIMAL_SCALE_MASK) >> DECIMAL_SCALE_SHIFT) as u8;
        let magnitude = i128::from(lo) | (i128::from(mid) << 32) | (i128::from(hi) << 64);
        let mantissa = if flags & DECIMAL_SIGN != 0 {
            -magnitude
        } else {
            magnitude
        };
        Self::new(mantissa, scale)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.mantissa.unsigned_abs().to_string();
        let scale = usize::from(self.scale);
        let sign = if self.mantissa < 0 { "-" } else { "" };
        if scale == 0 {
            return write!(f, "{sign}{digits}");
        }
        let padded = format!("{digits:0>width$}", width = scale + 1);
        let (int, frac) = padded.split_at(padded.len() - scale);
        write!(f, "{sign}{int}.{frac}")
    }
}

/// Ticks (100 ns) between 0001-01-01 and the Unix epoch.
pub const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

/// Nanoseconds per tick.
const NANOS_PER_TICK: u128 = 100;

/// Point in time as a signed count of 100 ns ticks since 0001-01-01.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DateTime {
    ticks: i64,
}

impl DateTime {
    /// Create from a raw tick count.
    #[inline]
    pub const fn from_ticks(ticks: i64) -> Self {
        Self { ticks }
    }

    /// Raw tick count.
    #[inline]
    pub const fn ticks(&self) -> i64 {
        self.ticks
    }

    /// Convert from system time, truncating to tick precision.
    ///
    /// Returns `None` if the instant is outside the tick range.
    pub fn from_system_time(time: SystemTime) -> Option<Self> {
        let ticks = match time.duration_since(UNIX_EPOCH) {
            Ok(after) => {
                let ticks = i64::try_from(after.as_nanos() / NANOS_PER_TICK).ok()?;
                UNIX_EPOCH_TICKS.checked_add(ticks)?
            }
            Err(before) => {
                let ticks = i64::try_from(before.duration().as_nanos() / NANOS_PER_TICK).ok()?;
                UNIX_EPOCH_TICKS.checked_sub(ticks)?
            }
        };
        Some(Self { ticks })
    }

    /// Convert to system time.
    ///
    /// Returns `None` if the platform cannot represent the instant.
    pub fn to_system_time(&self) -> Option<SystemTime> {
        let offset = i128::from(self.ticks) - i128::from(UNIX_EPOCH_TICKS);
        let nanos = offset.unsigned_abs() * NANOS_PER_TICK;
        let duration = Duration::new(
            u64::try_from(nanos / 1_000_000_000).ok()?,
            (nanos % 1_000_000_000) as u32,
        );
        if offset >= 0 {
            UNIX_EPOCH.checked_add(duration)
        } else {
            UNIX_EPOCH.checked_sub(duration)
        }
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ticks", self.ticks)
    }
}
