//! # cmdwire
//!
//! Schema-driven binary command protocol.
//!
//! Callers register numbered command models, each an ordered list of typed
//! parameter slots. Commands are then written to and read from any byte
//! stream using a small framing grammar of four configurable marker bytes.
//!
//! ## Architecture
//!
//! - **Protocol** ([`protocol`]): parameter tags, models, commands, values
//!   and the immutable [`ProtocolRules`](protocol::ProtocolRules) registry
//! - **Codec** ([`codec`]): blocking and async decoders/encoders sharing one
//!   resumable parser
//! - **Config** ([`config`]): decoder limits and JSON protocol descriptions
//!
//! ## Wire format
//!
//! ```text
//! command   := START id:u16 param* END
//! param     := [NEXT] payload
//! payload   := dynamic | fixed | prefixed
//! dynamic   := tag:u16 DEFINE (fixed | prefixed)
//! prefixed  := length:i32 DEFINE <length bytes>
//! array-of  := length:i32 ([NEXT] payload){length}
//! ```
//!
//! `NEXT` precedes every payload once the command already holds a value.
//! A `0xFF` byte where a command would start ends the stream.
//!
//! ## Example
//!
//! ```
//! use std::io::Cursor;
//! use std::sync::Arc;
//!
//! use cmdwire::codec::{Decoded, Decoder, Encoder};
//! use cmdwire::protocol::{CommandModel, ParamTag, ProtocolRules, Value};
//!
//! let rules = Arc::new(
//!     ProtocolRules::new([
//!         CommandModel::named(1, "Move", [ParamTag::INT, ParamTag::INT]),
//!         CommandModel::named(2, "Say", [ParamTag::BOOLEAN, ParamTag::IF_TRUE, ParamTag::STRING]),
//!     ])
//!     .unwrap(),
//! );
//!
//! let encoder = Encoder::new(rules.clone(), Vec::new());
//! encoder.encode(&rules.command(1, [Value::Int(3), Value::Int(-4)]).unwrap()).unwrap();
//! encoder.encode(&rules.command(2, [Value::Bool(false)]).unwrap()).unwrap();
//! encoder.terminate().unwrap();
//!
//! let decoder = Decoder::new(rules, Cursor::new(encoder.into_inner()));
//! let mut ids = Vec::new();
//! while let Decoded::Command(command) = decoder.decode() {
//!     ids.push(command.id());
//! }
//! assert_eq!(ids, [1, 2]);
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod protocol;

pub use codec::{Decoded, Decoder, Encoder, ReadStatus};
pub use error::{ConfigError, EncodeError, SchemaError};
pub use protocol::{Command, CommandModel, ParamTag, ProtocolRules, Value};
