//! Error types for cmdwire.
//!
//! The decode side never returns these: it reports a
//! [`Decoded`](crate::codec::Decoded) outcome instead. Errors here describe
//! schema authoring mistakes, encoder contract violations and configuration
//! problems.

use thiserror::Error;

use crate::protocol::ParamTag;

/// A command model or framing configuration that cannot be registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Two models share the same command id.
    #[error("Command id {0} is registered more than once")]
    DuplicateId(u16),

    /// A control directive appears where no value can precede it.
    #[error("Model {model}: {directive} at index {index} has no preceding value")]
    DirectiveWithoutValue {
        model: u16,
        index: usize,
        directive: ParamTag,
    },

    /// A guard tests a value whose datatype cannot satisfy it.
    #[error("Model {model}: {directive} at index {index} cannot test a {guarded} value")]
    GuardTypeMismatch {
        model: u16,
        index: usize,
        directive: ParamTag,
        guarded: ParamTag,
    },

    /// `ARRAY_OF` is not followed by exactly one concrete element tag.
    #[error("Model {model}: ARRAY_OF at index {index} must be followed by a concrete element tag")]
    InvalidArrayElement { model: u16, index: usize },

    /// A framing byte collides with the termination sentinel.
    #[error("Framing byte {name} = 0x{value:02x} collides with the termination sentinel")]
    FramingCollision { name: &'static str, value: u8 },
}

/// Failure while encoding a command.
///
/// Everything except [`EncodeError::Io`] is detected before a single byte
/// reaches the stream.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// I/O error while writing to the stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The command's model is not part of the protocol rules.
    #[error("Command model {0} is not registered in the protocol rules")]
    UnregisteredModel(u16),

    /// The model needs more arguments than the command carries.
    #[error("Missing argument {index} for command {model}")]
    MissingArgument { model: u16, index: usize },

    /// The command carries arguments the model never consumed.
    #[error("Command {model} has {extra} unused argument(s)")]
    UnusedArguments { model: u16, extra: usize },

    /// An argument does not match the datatype of its slot.
    #[error("Command {model}: slot {slot} expects {expected}, found {found}")]
    TypeMismatch {
        model: u16,
        slot: usize,
        expected: ParamTag,
        found: &'static str,
    },

    /// A directive found no usable preceding value.
    #[error("Command {model}: {directive} at slot {slot} requires a preceding {requirement} value")]
    DirectiveWithoutValue {
        model: u16,
        slot: usize,
        directive: ParamTag,
        requirement: &'static str,
    },

    /// An `ARRAY_OF` slot did not receive an array argument.
    #[error("Command {model}: ARRAY_OF at slot {slot} requires an array argument")]
    ArrayExpected { model: u16, slot: usize },

    /// `ARRAY_OF` appeared while an array was already being written.
    #[error("Command {model}: ARRAY_OF at slot {slot} cannot be repeated")]
    ArrayRepeated { model: u16, slot: usize },

    /// The value has no datatype a DYNAMIC slot can carry.
    #[error("Value of kind {0} cannot be written to a DYNAMIC slot")]
    UnsupportedDynamic(&'static str),

    /// A character has no single-byte representation.
    #[error("Character {0:?} does not fit in a single CHAR byte")]
    CharOutOfRange(char),

    /// A fixed byte block has the wrong width.
    #[error("Fixed block expects {expected} bytes, found {found}")]
    FixedWidth { expected: usize, found: usize },

    /// The text cannot be represented in the configured encoding.
    #[error("String cannot be represented in {0}")]
    Unencodable(&'static str),

    /// A length does not fit the signed 32-bit prefix.
    #[error("Length {0} exceeds the 32-bit length prefix")]
    LengthOverflow(usize),
}

/// Failure while loading a protocol description.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The JSON document could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A parameter tag name is not recognized.
    #[error("Unknown parameter tag name: {0}")]
    UnknownTagName(String),

    /// A framing value is not a single byte.
    #[error("Framing value for {0} must be a single byte")]
    InvalidFraming(&'static str),

    /// The described models do not form a valid schema.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
}

/// Result type alias used by the encoder.
pub type Result<T> = std::result::Result<T, EncodeError>;
