//! Wire format encoding and decoding.
//!
//! Implements the command grammar:
//! ```text
//! command   := START id:u16 param* END
//! param     := [NEXT] payload
//! payload   := dynamic | fixed | prefixed
//! dynamic   := tag:u16 DEFINE (fixed | prefixed)
//! fixed     := N bytes, N ∈ {1, 2, 4, 8, 16}
//! prefixed  := length:i32 DEFINE <length bytes>
//! array-of  := length:i32 ([NEXT] payload){length}
//! ```
//!
//! All multi-byte integers are Little Endian. This module holds the framing
//! constants and the per-datatype payload primitives; the traversal of a
//! command model lives in [`crate::codec`].

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::param::{Datatype, ParamTag};
use super::value::{DateTime, Decimal, Value};
use crate::error::{EncodeError, Result};

/// Default byte opening a command.
pub const DEFAULT_START: u8 = b'[';

/// Default byte between two parameter payloads.
pub const DEFAULT_SEPARATOR: u8 = b';';

/// Default byte introducing a multi-byte payload.
pub const DEFAULT_DEFINITION: u8 = b'>';

/// Default byte closing a command.
pub const DEFAULT_END: u8 = b']';

/// Byte signalling graceful end of stream in place of a START byte.
pub const TERMINATION_SENTINEL: u8 = 0xFF;

/// Size of the command id.
pub const ID_SIZE: usize = 2;

/// Size of the inline tag of a DYNAMIC slot.
pub const DYNAMIC_TAG_SIZE: usize = 2;

/// Size of array and payload length prefixes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Default maximum prefixed payload size (1 GB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: u32 = 1_073_741_824;

/// Default maximum number of array elements.
pub const DEFAULT_MAX_ARRAY_LEN: u32 = 16 * 1024 * 1024;

/// Text encoding used for STRING payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextEncoding {
    #[serde(rename = "utf-8", alias = "utf8")]
    Utf8,
    /// UTF-16 little endian, the protocol default.
    #[default]
    #[serde(rename = "utf-16le", alias = "unicode", alias = "utf16")]
    Utf16Le,
    #[serde(rename = "utf-16be")]
    Utf16Be,
    #[serde(rename = "latin1", alias = "iso-8859-1")]
    Latin1,
}

impl TextEncoding {
    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::Utf16Le => "UTF-16LE",
            Self::Utf16Be => "UTF-16BE",
            Self::Latin1 => "Latin-1",
        }
    }

    /// Encode text into bytes.
    pub fn encode(self, text: &str) -> Result<Vec<u8>> {
        let bytes = match self {
            Self::Utf8 => text.as_bytes().to_vec(),
            Self::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            Self::Utf16Be => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
            Self::Latin1 => text
                .chars()
                .map(|c| u8::try_from(c).map_err(|_| EncodeError::Unencodable(self.name())))
                .collect::<Result<Vec<u8>>>()?,
        };
        Ok(bytes)
    }

    /// Decode bytes into text.
    ///
    /// Returns `None` on malformed input.
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            Self::Utf8 => String::from_utf8(bytes.to_vec()).ok(),
            Self::Utf16Le => decode_utf16(bytes, u16::from_le_bytes),
            Self::Utf16Be => decode_utf16(bytes, u16::from_be_bytes),
            Self::Latin1 => Some(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).ok()
}

/// Encode a fixed-width payload for `tag` into `buf`.
///
/// The caller has already checked that `value` fits `tag`.
pub fn encode_fixed(tag: ParamTag, value: &Value, buf: &mut BytesMut) -> Result<()> {
    match value {
        Value::Bool(v) => buf.put_u32_le(u32::from(*v)),
        Value::Char(c) => buf.put_u8(u8::try_from(*c).map_err(|_| EncodeError::CharOutOfRange(*c))?),
        Value::SByte(v) => buf.put_i8(*v),
        Value::Byte(v) => buf.put_u8(*v),
        Value::Short(v) => buf.put_i16_le(*v),
        Value::UShort(v) => buf.put_u16_le(*v),
        Value::Int(v) => buf.put_i32_le(*v),
        Value::UInt(v) => buf.put_u32_le(*v),
        Value::Long(v) => buf.put_i64_le(*v),
        Value::ULong(v) => buf.put_u64_le(*v),
        Value::Float(v) => buf.put_f32_le(*v),
        Value::Double(v) => buf.put_f64_le(*v),
        Value::Decimal(v) => buf.put_slice(&v.to_le_bytes()),
        Value::DateTime(v) => buf.put_i64_le(v.ticks()),
        Value::Guid(v) => buf.put_slice(&v.to_bytes_le()),
        Value::Fixed(block) => {
            let expected = tag.fixed_width().unwrap_or(0);
            if block.len() != expected {
                return Err(EncodeError::FixedWidth {
                    expected,
                    found: block.len(),
                });
            }
            buf.put_slice(block);
        }
        Value::String(_) | Value::Raw(_) | Value::Array(_) => {
            return Err(EncodeError::TypeMismatch {
                model: 0,
                slot: 0,
                expected: tag,
                found: value.kind_name(),
            })
        }
    }
    Ok(())
}

/// Decode a fixed-width payload for `tag`.
///
/// `raw` must be exactly `tag.fixed_width()` bytes. Returns `None` when the
/// bytes are not a valid value of the datatype.
pub fn decode_fixed(tag: ParamTag, raw: &[u8]) -> Option<Value> {
    let Some(datatype) = tag.datatype() else {
        return Some(Value::Fixed(Bytes::copy_from_slice(raw)));
    };
    let value = match datatype {
        Datatype::Boolean => match u32::from_le_bytes(array(raw)?) {
            0 => Value::Bool(false),
            1 => Value::Bool(true),
            _ => return None,
        },
        Datatype::Char => Value::Char(char::from(*raw.first()?)),
        Datatype::SByte => Value::SByte(i8::from_le_bytes(array(raw)?)),
        Datatype::Byte => Value::Byte(*raw.first()?),
        Datatype::Short => Value::Short(i16::from_le_bytes(array(raw)?)),
        Datatype::UShort => Value::UShort(u16::from_le_bytes(array(raw)?)),
        Datatype::Int => Value::Int(i32::from_le_bytes(array(raw)?)),
        Datatype::UInt => Value::UInt(u32::from_le_bytes(array(raw)?)),
        Datatype::Long => Value::Long(i64::from_le_bytes(array(raw)?)),
        Datatype::ULong => Value::ULong(u64::from_le_bytes(array(raw)?)),
        Datatype::Float => Value::Float(f32::from_le_bytes(array(raw)?)),
        Datatype::Double => Value::Double(f64::from_le_bytes(array(raw)?)),
        Datatype::Decimal => Value::Decimal(Decimal::from_le_bytes(array(raw)?)?),
        Datatype::DateTime => Value::DateTime(DateTime::from_ticks(i64::from_le_bytes(array(raw)?))),
        Datatype::Guid => Value::Guid(Uuid::from_bytes_le(array(raw)?)),
        Datatype::Dynamic | Datatype::String | Datatype::Raw => return None,
    };
    Some(value)
}

/// Payload bytes of a prefixed value.
pub fn encode_prefixed_payload(value: &Value, encoding: TextEncoding) -> Result<Bytes> {
    match value {
        Value::String(text) => Ok(Bytes::from(encoding.encode(text)?)),
        Value::Raw(raw) => Ok(raw.clone()),
        other => Err(EncodeError::UnsupportedDynamic(other.kind_name())),
    }
}

/// Decode a prefixed payload for `tag`.
pub fn decode_prefixed(tag: ParamTag, payload: Bytes, encoding: TextEncoding) -> Option<Value> {
    match tag.datatype()? {
        Datatype::String => encoding.decode(&payload).map(Value::String),
        Datatype::Raw => Some(Value::Raw(payload)),
        _ => None,
    }
}

/// Convert a length to the signed 32-bit wire prefix.
pub fn length_prefix(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| EncodeError::LengthOverflow(len))
}

#[inline]
fn array<const N: usize>(raw: &[u8]) -> Option<[u8; N]> {
    raw.try_into().ok()
}
