//! Command reader: a resumable parser plus a blocking stream driver.
//!
//! [`CommandParser`] walks one command model and reports, at every step,
//! exactly how many bytes it needs next. Drivers read that many bytes and
//! feed them back, so the stream is never read past the end of a command.
//!
//! ```text
//! AwaitStart ─► Id ─► ┌─ Separator ─┐
//!                     │             ▼
//!                     ├─► Fixed ─────────────────────────┐
//!                     ├─► PrefixLen ─► PrefixDefine ─► Payload ─┤
//!                     ├─► DynTag ─► DynDefine ─► (Fixed | PrefixLen)
//!                     └─► ArrayLen                        │
//!                                                 ◄───────┘
//!                      ... until the model is exhausted ─► End
//! ```
//!
//! Control directives (`IF_TRUE`, `IF_ZERO`, `IF_NOT_ZERO`) consume no bytes;
//! they are resolved between payloads against the last produced value.

use std::fmt;
use std::io::Read;
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use crate::config::DecoderConfig;
use crate::protocol::wire_format::{
    decode_fixed, decode_prefixed, DYNAMIC_TAG_SIZE, ID_SIZE, LENGTH_PREFIX_SIZE,
};
use crate::protocol::{
    Command, CommandModel, Directive, ParamTag, ProtocolRules, Slot, Value, TERMINATION_SENTINEL,
};

/// Upper bound on the capacity reserved up front for an array.
const ARRAY_PREALLOC_LIMIT: usize = 64;

/// Outcome of one decode call.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A complete command was read.
    Command(Command),
    /// The termination sentinel was read where a command would start.
    Terminated,
    /// The stream ended or failed before the command was complete.
    CantRead,
    /// The bytes do not follow the grammar.
    InvalidData,
    /// The command id is not registered.
    UnknownCommand(u16),
}

impl Decoded {
    /// Plain status code of this outcome.
    pub fn status(&self) -> ReadStatus {
        match self {
            Decoded::Command(_) => ReadStatus::Success,
            Decoded::Terminated => ReadStatus::Terminated,
            Decoded::CantRead => ReadStatus::CantRead,
            Decoded::InvalidData => ReadStatus::InvalidData,
            Decoded::UnknownCommand(_) => ReadStatus::UnknownCommand,
        }
    }

    /// The decoded command, if any.
    pub fn into_command(self) -> Option<Command> {
        match self {
            Decoded::Command(command) => Some(command),
            _ => None,
        }
    }

    /// Whether a command was decoded.
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, Decoded::Command(_))
    }
}

/// Status code of a decode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadStatus {
    Success,
    Terminated,
    CantRead,
    InvalidData,
    UnknownCommand,
}

impl fmt::Display for ReadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReadStatus::Success => "SUCCESS",
            ReadStatus::Terminated => "TERMINATED",
            ReadStatus::CantRead => "CANT_READ",
            ReadStatus::InvalidData => "INVALID_DATA",
            ReadStatus::UnknownCommand => "UNKNOWN_COMMAND",
        };
        f.write_str(name)
    }
}

/// Grammar position of the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Scanning for the start byte, one byte at a time.
    AwaitStart,
    Id,
    /// Separator before the payload of `tag`.
    Separator(ParamTag),
    ArrayLen,
    DynTag,
    /// Definition byte after a DYNAMIC runtime tag.
    DynDefine(ParamTag),
    Fixed(ParamTag, usize),
    PrefixLen(ParamTag),
    PrefixDefine(ParamTag, usize),
    Payload(ParamTag, usize),
    End,
}

impl State {
    fn position(self) -> &'static str {
        match self {
            State::AwaitStart => "start byte",
            State::Id => "command id",
            State::Separator(_) => "separator",
            State::ArrayLen => "array length",
            State::DynTag => "dynamic tag",
            State::DynDefine(_) | State::PrefixDefine(..) => "definition byte",
            State::Fixed(..) => "fixed payload",
            State::PrefixLen(_) => "payload length",
            State::Payload(..) => "payload",
            State::End => "end byte",
        }
    }
}

/// Resumable parser for a single command.
///
/// A parser lives for one decode call. Call [`need`](Self::need), supply
/// exactly that many bytes to [`feed`](Self::feed), and repeat until `feed`
/// returns an outcome. If the input runs dry, finish with
/// [`cant_read`](Self::cant_read).
///
/// # Example
///
/// ```
/// use cmdwire::codec::{CommandParser, Decoded};
/// use cmdwire::config::DecoderConfig;
/// use cmdwire::protocol::{CommandModel, ParamTag, ProtocolRules, Value};
///
/// let rules = ProtocolRules::new([CommandModel::new(1, [ParamTag::BYTE])]).unwrap();
/// let config = DecoderConfig::default();
/// let mut parser = CommandParser::new(&rules, &config);
///
/// let mut input: &[u8] = &[b'[', 1, 0, 7, b']'];
/// let outcome = loop {
///     let (chunk, rest) = input.split_at(parser.need());
///     input = rest;
///     if let Some(outcome) = parser.feed(chunk) {
///         break outcome;
///     }
/// };
/// assert_eq!(outcome.into_command().unwrap().args(), &[Value::Byte(7)]);
/// ```
pub struct CommandParser<'a> {
    rules: &'a ProtocolRules,
    config: &'a DecoderConfig,
    state: State,
    model: Option<Arc<CommandModel>>,
    /// Current index into the model's tags.
    index: usize,
    args: Vec<Value>,
    /// Elements still to read for the open array, if any.
    array_remaining: Option<usize>,
    /// Bytes discarded while scanning for the start byte.
    skipped: usize,
}

impl<'a> CommandParser<'a> {
    /// Create a parser positioned before a command.
    pub fn new(rules: &'a ProtocolRules, config: &'a DecoderConfig) -> Self {
        Self {
            rules,
            config,
            state: State::AwaitStart,
            model: None,
            index: 0,
            args: Vec::new(),
            array_remaining: None,
            skipped: 0,
        }
    }

    /// Number of bytes the next [`feed`](Self::feed) call expects.
    pub fn need(&self) -> usize {
        match self.state {
            State::AwaitStart
            | State::Separator(_)
            | State::DynDefine(_)
            | State::PrefixDefine(..)
            | State::End => 1,
            State::Id => ID_SIZE,
            State::DynTag => DYNAMIC_TAG_SIZE,
            State::ArrayLen | State::PrefixLen(_) => LENGTH_PREFIX_SIZE,
            State::Fixed(_, width) => width,
            State::Payload(_, len) => len,
        }
    }

    /// Bytes discarded so far while looking for the start byte.
    #[inline]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Consume exactly [`need`](Self::need) bytes.
    ///
    /// Returns the outcome once the command is complete or has failed, and
    /// `None` while more input is required.
    pub fn feed(&mut self, input: &[u8]) -> Option<Decoded> {
        if input.len() != self.need() {
            return Some(self.cant_read());
        }

        match self.state {
            State::AwaitStart => self.on_start_byte(input[0]),
            State::Id => {
                let id = u16::from_le_bytes([input[0], input[1]]);
                let Some(model) = self.rules.try_get_model(id) else {
                    tracing::debug!("unknown command id {}", id);
                    return Some(Decoded::UnknownCommand(id));
                };
                self.model = Some(Arc::clone(model));
                self.advance()
            }
            State::Separator(tag) => {
                if input[0] != self.rules.separator() {
                    return Some(self.invalid("separator mismatch"));
                }
                self.begin_payload(tag)
            }
            State::ArrayLen => {
                let len = i32::from_le_bytes([input[0], input[1], input[2], input[3]]);
                let len = match u32::try_from(len) {
                    Ok(len) if len <= self.config.max_array_len => len as usize,
                    _ => return Some(self.invalid("array length out of range")),
                };
                self.args
                    .push(Value::Array(Vec::with_capacity(len.min(ARRAY_PREALLOC_LIMIT))));
                if len == 0 {
                    // skip the element tag too
                    self.index += 2;
                } else {
                    self.array_remaining = Some(len);
                    self.index += 1;
                }
                self.advance()
            }
            State::DynTag => {
                let bits = u16::from_le_bytes([input[0], input[1]]);
                match ParamTag::from_wire_datatype(bits) {
                    Some(tag) => {
                        self.state = State::DynDefine(tag);
                        None
                    }
                    None => Some(self.invalid("unsupported dynamic tag")),
                }
            }
            State::DynDefine(tag) => {
                if input[0] != self.rules.definition() {
                    return Some(self.invalid("definition mismatch"));
                }
                self.begin_payload(tag)
            }
            State::Fixed(tag, _) => match decode_fixed(tag, input) {
                Some(value) => self.produce(value),
                None => Some(self.invalid("malformed fixed payload")),
            },
            State::PrefixLen(tag) => {
                let len = i32::from_le_bytes([input[0], input[1], input[2], input[3]]);
                match u32::try_from(len) {
                    Ok(len) if len <= self.config.max_payload_len => {
                        self.state = State::PrefixDefine(tag, len as usize);
                        None
                    }
                    _ => Some(self.invalid("payload length out of range")),
                }
            }
            State::PrefixDefine(tag, len) => {
                if input[0] != self.rules.definition() {
                    return Some(self.invalid("definition mismatch"));
                }
                if len == 0 {
                    return self.finish_prefixed(tag, Bytes::new());
                }
                self.state = State::Payload(tag, len);
                None
            }
            State::Payload(tag, _) => self.finish_prefixed(tag, Bytes::copy_from_slice(input)),
            State::End => {
                if input[0] != self.rules.end() {
                    return Some(self.invalid("end byte mismatch"));
                }
                let Some(model) = self.model.take() else {
                    return Some(self.invalid("no command model"));
                };
                let args = std::mem::take(&mut self.args);
                tracing::trace!("decoded command {}", model.id());
                Some(Decoded::Command(Command::new(model, args)))
            }
        }
    }

    /// Outcome when the input ended before the parser was satisfied.
    pub fn cant_read(&self) -> Decoded {
        tracing::debug!("cant read: {}", self.state.position());
        Decoded::CantRead
    }

    fn on_start_byte(&mut self, byte: u8) -> Option<Decoded> {
        if byte == self.rules.start() {
            if self.skipped > 0 {
                tracing::debug!("skipped {} bytes before start byte", self.skipped);
            }
            self.state = State::Id;
            return None;
        }
        if byte == TERMINATION_SENTINEL {
            tracing::debug!("termination sentinel received");
            return Some(Decoded::Terminated);
        }
        if !self.config.ignore_garbage && byte != 0x00 {
            return Some(self.invalid("garbage before start byte"));
        }
        self.skipped += 1;
        None
    }

    /// Walk tags from the current index until bytes are needed.
    fn advance(&mut self) -> Option<Decoded> {
        let Some(model) = self.model.clone() else {
            return Some(self.invalid("no command model"));
        };

        loop {
            let Some(tag) = model.get(self.index) else {
                self.state = State::End;
                return None;
            };

            let directive = match tag.slot() {
                Some(Slot::Directive(directive)) => directive,
                Some(_) => {
                    if self.args.is_empty() {
                        return self.begin_payload(tag);
                    }
                    self.state = State::Separator(tag);
                    return None;
                }
                None => return Some(self.invalid("unclassified tag")),
            };

            let take = match directive {
                Directive::ArrayOf => {
                    self.state = State::ArrayLen;
                    return None;
                }
                Directive::IfTrue => match self.args.last().and_then(Value::as_bool) {
                    Some(flag) => flag,
                    None => return Some(self.invalid("IF_TRUE without boolean value")),
                },
                Directive::IfZero | Directive::IfNotZero => {
                    match self.args.last().and_then(Value::is_zero) {
                        Some(zero) => zero == (directive == Directive::IfZero),
                        None => return Some(self.invalid("zero test on untestable value")),
                    }
                }
            };

            if take {
                self.index += 1;
            } else {
                self.index = model.next_non_special(self.index);
            }
        }
    }

    fn begin_payload(&mut self, tag: ParamTag) -> Option<Decoded> {
        self.state = match tag.slot() {
            Some(Slot::Fixed(width)) => State::Fixed(tag, width),
            Some(Slot::Prefixed) => State::PrefixLen(tag),
            Some(Slot::Dynamic) => State::DynTag,
            _ => return Some(self.invalid("tag carries no payload")),
        };
        None
    }

    fn finish_prefixed(&mut self, tag: ParamTag, payload: Bytes) -> Option<Decoded> {
        match decode_prefixed(tag, payload, self.rules.encoding()) {
            Some(value) => self.produce(value),
            None => Some(self.invalid("malformed prefixed payload")),
        }
    }

    /// Record a decoded value and move past its slot.
    fn produce(&mut self, value: Value) -> Option<Decoded> {
        match self.array_remaining {
            Some(remaining) => {
                if let Some(Value::Array(items)) = self.args.last_mut() {
                    items.push(value);
                }
                if remaining > 1 {
                    self.array_remaining = Some(remaining - 1);
                    return self.advance();
                }
                self.array_remaining = None;
            }
            None => self.args.push(value),
        }
        self.index += 1;
        self.advance()
    }

    fn invalid(&self, reason: &str) -> Decoded {
        tracing::debug!("invalid data at {}: {}", self.state.position(), reason);
        Decoded::InvalidData
    }
}

/// Drive a parser over a blocking reader.
///
/// Each step reads through a `take` adapter, so a truncated stream never
/// causes a large up-front allocation.
pub(crate) fn read_command<R: Read>(
    parser: &mut CommandParser<'_>,
    reader: &mut R,
    scratch: &mut Vec<u8>,
) -> Decoded {
    loop {
        let need = parser.need();
        scratch.clear();
        match reader.by_ref().take(need as u64).read_to_end(scratch) {
            Ok(n) if n == need => {}
            Ok(_) => return parser.cant_read(),
            Err(e) => {
                tracing::debug!("read failed: {}", e);
                return parser.cant_read();
            }
        }
        if let Some(outcome) = parser.feed(scratch) {
            return outcome;
        }
    }
}

/// Blocking command decoder over a [`Read`] stream.
///
/// One decode runs at a time per decoder; concurrent callers wait on an
/// internal lock. Every call leaves the stream positioned right after the
/// bytes it consumed, whatever the outcome.
///
/// # Example
///
/// ```
/// use std::io::Cursor;
/// use std::sync::Arc;
///
/// use cmdwire::codec::{Decoder, ReadStatus};
/// use cmdwire::protocol::{CommandModel, ParamTag, ProtocolRules};
///
/// let rules = Arc::new(ProtocolRules::new([CommandModel::new(2, [ParamTag::USHORT])]).unwrap());
/// let decoder = Decoder::new(rules, Cursor::new(vec![b'[', 2, 0, 0x34, 0x12, b']', 0xFF]));
///
/// let command = decoder.decode().into_command().unwrap();
/// assert_eq!(command.id(), 2);
/// assert_eq!(decoder.decode().status(), ReadStatus::Terminated);
/// ```
pub struct Decoder<R> {
    rules: Arc<ProtocolRules>,
    config: DecoderConfig,
    reader: Mutex<R>,
}

impl<R: Read> Decoder<R> {
    /// Create a decoder with default limits.
    pub fn new(rules: Arc<ProtocolRules>, reader: R) -> Self {
        Self::with_config(rules, reader, DecoderConfig::default())
    }

    /// Create a decoder with custom limits.
    pub fn with_config(rules: Arc<ProtocolRules>, reader: R, config: DecoderConfig) -> Self {
        Self {
            rules,
            config,
            reader: Mutex::new(reader),
        }
    }

    /// Protocol rules in use.
    pub fn rules(&self) -> &Arc<ProtocolRules> {
        &self.rules
    }

    /// Decoder limits in use.
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Read one command from the stream.
    pub fn decode(&self) -> Decoded {
        let mut reader = self.reader.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("decoder lock poisoned, recovering");
            poisoned.into_inner()
        });
        let mut parser = CommandParser::new(&self.rules, &self.config);
        let mut scratch = Vec::new();
        read_command(&mut parser, &mut *reader, &mut scratch)
    }

    /// Consume the decoder, returning the stream.
    pub fn into_inner(self) -> R {
        self.reader
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
