//! Codec module - reading and writing commands on byte streams.
//!
//! - [`Decoder`] / [`AsyncDecoder`] - read one command per call and report a
//!   [`Decoded`] outcome; they never return errors
//! - [`Encoder`] / [`AsyncEncoder`] - write one command per call, or the
//!   termination sentinel
//! - [`CommandParser`] - the resumable state machine behind both decoders
//!
//! # Design
//!
//! The parser asks for exactly the number of bytes the grammar needs next,
//! so a decoder never reads past the end of a command and can share its
//! stream with other consumers. The encoder serializes into a buffer first,
//! so a command that violates its model never produces partial output.
//!
//! # Example
//!
//! ```
//! use std::io::Cursor;
//! use std::sync::Arc;
//!
//! use cmdwire::codec::{Decoder, Encoder};
//! use cmdwire::protocol::{CommandModel, ParamTag, ProtocolRules, Value};
//!
//! let rules = Arc::new(
//!     ProtocolRules::new([CommandModel::new(1, [ParamTag::INT, ParamTag::STRING])]).unwrap(),
//! );
//! let command = rules.command(1, [Value::Int(42), Value::from("hi")]).unwrap();
//!
//! let encoder = Encoder::new(rules.clone(), Vec::new());
//! encoder.encode(&command).unwrap();
//!
//! let decoder = Decoder::new(rules, Cursor::new(encoder.into_inner()));
//! assert_eq!(decoder.decode().into_command(), Some(command));
//! ```

mod reader;
mod tokio_io;
mod writer;

pub use reader::{CommandParser, Decoded, Decoder, ReadStatus};
pub use tokio_io::{AsyncDecoder, AsyncEncoder};
pub use writer::{encode_into, encode_to_bytes, Encoder};
