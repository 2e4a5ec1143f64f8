//! Protocol module - parameter tags, command schema and wire format.
//!
//! This module holds the data model shared by the reader and the writer:
//! - 16-bit parameter tags and their classification
//! - Command models, command instances and argument values
//! - Protocol rules (framing bytes, text encoding, model registry)
//! - Little-endian payload primitives

mod command;
mod model;
mod param;
mod rules;
mod value;
pub mod wire_format;

pub use command::Command;
pub use model::CommandModel;
pub use param::{bits, Classification, Datatype, Directive, Kind, LengthClass, ParamTag, Slot};
pub use rules::{ProtocolRules, ProtocolRulesBuilder};
pub use value::{DateTime, Decimal, Value, DECIMAL_MAX_SCALE, UNIX_EPOCH_TICKS};
pub use wire_format::{
    TextEncoding, DEFAULT_DEFINITION, DEFAULT_END, DEFAULT_MAX_ARRAY_LEN,
    DEFAULT_MAX_PAYLOAD_SIZE, DEFAULT_SEPARATOR, DEFAULT_START, TERMINATION_SENTINEL,
};
