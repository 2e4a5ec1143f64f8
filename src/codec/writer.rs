//! Command writer: serialization into a buffer plus a blocking stream driver.
//!
//! A command is fully serialized into a `BytesMut` before anything touches
//! the stream, so a command that violates its model writes nothing. The
//! stream then receives the whole command in one `write_all` followed by a
//! flush.

use std::io::Write;
use std::sync::{Arc, Mutex};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{EncodeError, Result};
use crate::protocol::wire_format::{encode_fixed, encode_prefixed_payload, length_prefix};
use crate::protocol::{
    Command, Directive, ParamTag, ProtocolRules, Slot, Value, TERMINATION_SENTINEL,
};

/// Initial buffer capacity for one command.
const INITIAL_CAPACITY: usize = 64;

/// Serialize `command` into `buf`.
///
/// On error `buf` is left exactly as it was.
pub fn encode_into(rules: &ProtocolRules, command: &Command, buf: &mut BytesMut) -> Result<()> {
    let mark = buf.len();
    let result = write_command(rules, command, buf);
    if result.is_err() {
        buf.truncate(mark);
    }
    result
}

/// Serialize `command` into a fresh buffer.
pub fn encode_to_bytes(rules: &ProtocolRules, command: &Command) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(INITIAL_CAPACITY);
    write_command(rules, command, &mut buf)?;
    Ok(buf.freeze())
}

fn write_command(rules: &ProtocolRules, command: &Command, buf: &mut BytesMut) -> Result<()> {
    let model = command.model();
    let id = model.id();
    if !rules.is_registered(model) {
        return Err(EncodeError::UnregisteredModel(id));
    }

    let args = command.args();
    let mut written = 0;
    let mut index = 0;

    buf.put_u8(rules.start());
    buf.put_u16_le(id);

    while let Some(tag) = model.get(index) {
        let directive = match tag.slot() {
            Some(Slot::Directive(directive)) => directive,
            _ => {
                let arg = args.get(written).ok_or(EncodeError::MissingArgument {
                    model: id,
                    index: written,
                })?;
                if written > 0 {
                    buf.put_u8(rules.separator());
                }
                write_payload(rules, id, index, tag, arg, buf)?;
                written += 1;
                index += 1;
                continue;
            }
        };

        let previous = written.checked_sub(1).and_then(|i| args.get(i));
        let take = match directive {
            Directive::ArrayOf => {
                let arg = args.get(written).ok_or(EncodeError::MissingArgument {
                    model: id,
                    index: written,
                })?;
                let Value::Array(items) = arg else {
                    return Err(EncodeError::ArrayExpected {
                        model: id,
                        slot: index,
                    });
                };
                let element_slot = index + 1;
                let element = model.get(element_slot).ok_or(EncodeError::ArrayExpected {
                    model: id,
                    slot: index,
                })?;
                if element == ParamTag::ARRAY_OF {
                    return Err(EncodeError::ArrayRepeated {
                        model: id,
                        slot: element_slot,
                    });
                }

                buf.put_i32_le(length_prefix(items.len())?);
                for item in items {
                    buf.put_u8(rules.separator());
                    write_payload(rules, id, element_slot, element, item, buf)?;
                }
                written += 1;
                index += 2;
                continue;
            }
            Directive::IfTrue => previous.and_then(Value::as_bool).ok_or(
                EncodeError::DirectiveWithoutValue {
                    model: id,
                    slot: index,
                    directive: tag,
                    requirement: "boolean",
                },
            )?,
            Directive::IfZero | Directive::IfNotZero => {
                let zero = previous.and_then(Value::is_zero).ok_or(
                    EncodeError::DirectiveWithoutValue {
                        model: id,
                        slot: index,
                        directive: tag,
                        requirement: "zero-testable",
                    },
                )?;
                zero == (directive == Directive::IfZero)
            }
        };

        if take {
            index += 1;
        } else {
            index = model.next_non_special(index);
        }
    }

    if written < args.len() {
        return Err(EncodeError::UnusedArguments {
            model: id,
            extra: args.len() - written,
        });
    }

    buf.put_u8(rules.end());
    Ok(())
}

/// Write one payload for `tag`, resolving DYNAMIC from the value.
fn write_payload(
    rules: &ProtocolRules,
    model: u16,
    slot: usize,
    tag: ParamTag,
    value: &Value,
    buf: &mut BytesMut,
) -> Result<()> {
    let mismatch = || EncodeError::TypeMismatch {
        model,
        slot,
        expected: tag,
        found: value.kind_name(),
    };

    match tag.slot() {
        Some(Slot::Fixed(_)) => {
            if !value.fits(tag) {
                return Err(mismatch());
            }
            encode_fixed(tag, value, buf)
        }
        Some(Slot::Prefixed) => {
            if !value.fits(tag) {
                return Err(mismatch());
            }
            let payload = encode_prefixed_payload(value, rules.encoding())?;
            buf.put_i32_le(length_prefix(payload.len())?);
            buf.put_u8(rules.definition());
            buf.put_slice(&payload);
            Ok(())
        }
        Some(Slot::Dynamic) => {
            let runtime = value
                .datatype()
                .map(|datatype| datatype.tag())
                .ok_or(EncodeError::UnsupportedDynamic(value.kind_name()))?;
            buf.put_u16_le(runtime.bits());
            buf.put_u8(rules.definition());
            write_payload(rules, model, slot, runtime, value, buf)
        }
        _ => Err(mismatch()),
    }
}

/// Blocking command encoder over a [`Write`] stream.
///
/// One encode runs at a time per encoder; concurrent callers wait on an
/// internal lock, so commands never interleave on the stream.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use cmdwire::codec::Encoder;
/// use cmdwire::protocol::{CommandModel, ParamTag, ProtocolRules, Value};
///
/// let rules = Arc::new(ProtocolRules::new([CommandModel::new(2, [ParamTag::USHORT])]).unwrap());
/// let command = rules.command(2, [Value::UShort(0x1234)]).unwrap();
///
/// let encoder = Encoder::new(rules, Vec::new());
/// encoder.encode(&command).unwrap();
/// encoder.terminate().unwrap();
///
/// assert_eq!(encoder.into_inner(), [b'[', 2, 0, 0x34, 0x12, b']', 0xFF]);
/// ```
pub struct Encoder<W> {
    rules: Arc<ProtocolRules>,
    writer: Mutex<W>,
}

impl<W: Write> Encoder<W> {
    /// Create an encoder over `writer`.
    pub fn new(rules: Arc<ProtocolRules>, writer: W) -> Self {
        Self {
            rules,
            writer: Mutex::new(writer),
        }
    }

    /// Protocol rules in use.
    pub fn rules(&self) -> &Arc<ProtocolRules> {
        &self.rules
    }

    /// Write one command and flush.
    pub fn encode(&self, command: &Command) -> Result<()> {
        let bytes = encode_to_bytes(&self.rules, command)?;
        let mut writer = self.lock();
        writer.write_all(&bytes)?;
        writer.flush()?;
        tracing::trace!("encoded command {} ({} bytes)", command.id(), bytes.len());
        Ok(())
    }

    /// Write the termination sentinel and flush.
    ///
    /// A peer decoder reports `Terminated` when it reads it.
    pub fn terminate(&self) -> Result<()> {
        let mut writer = self.lock();
        writer.write_all(&[TERMINATION_SENTINEL])?;
        writer.flush()?;
        Ok(())
    }

    /// Consume the encoder, returning the stream.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, W> {
        self.writer.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("encoder lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}
