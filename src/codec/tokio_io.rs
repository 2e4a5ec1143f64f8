//! Async decoder and encoder over tokio streams.
//!
//! These drive the same [`CommandParser`] and serializer as the blocking
//! types, so the bytes on the wire are identical. Suspension points are the
//! stream reads and writes only.
//!
//! # Example
//!
//! ```
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! use std::sync::Arc;
//!
//! use cmdwire::codec::{AsyncDecoder, AsyncEncoder};
//! use cmdwire::protocol::{CommandModel, ParamTag, ProtocolRules, Value};
//! use tokio::io::duplex;
//!
//! let rules = Arc::new(ProtocolRules::new([CommandModel::new(1, [ParamTag::INT])]).unwrap());
//! let (client, server) = duplex(1024);
//! let encoder = AsyncEncoder::new(rules.clone(), client);
//! let decoder = AsyncDecoder::new(rules.clone(), server);
//!
//! let command = rules.command(1, [Value::Int(-3)]).unwrap();
//! encoder.encode(&command).await.unwrap();
//!
//! let decoded = decoder.decode().await.into_command().unwrap();
//! assert_eq!(decoded, command);
//! # }
//! ```

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use super::reader::{CommandParser, Decoded};
use super::writer::encode_to_bytes;
use crate::config::DecoderConfig;
use crate::error::Result;
use crate::protocol::{Command, ProtocolRules, TERMINATION_SENTINEL};

/// Async command decoder over an [`AsyncRead`] stream.
pub struct AsyncDecoder<R> {
    rules: Arc<ProtocolRules>,
    config: DecoderConfig,
    reader: Mutex<R>,
}

impl<R: AsyncRead + Unpin> AsyncDecoder<R> {
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

    /// Read one command from the stream.
    pub async fn decode(&self) -> Decoded {
        let mut reader = self.reader.lock().await;
        let mut parser = CommandParser::new(&self.rules, &self.config);
        let mut scratch = Vec::new();

        loop {
            let need = parser.need();
            scratch.clear();
            match (&mut *reader).take(need as u64).read_to_end(&mut scratch).await {
                Ok(n) if n == need => {}
                Ok(_) => return parser.cant_read(),
                Err(e) => {
                    tracing::debug!("read failed: {}", e);
                    return parser.cant_read();
                }
            }
            if let Some(outcome) = parser.feed(&scratch) {
                return outcome;
            }
        }
    }

    /// Consume the decoder, returning the stream.
    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }
}

/// Async command encoder over an [`AsyncWrite`] stream.
pub struct AsyncEncoder<W> {
    rules: Arc<ProtocolRules>,
    writer: Mutex<W>,
}

impl<W: AsyncWrite + Unpin> AsyncEncoder<W> {
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
    pub async fn encode(&self, command: &Command) -> Result<()> {
        let bytes = encode_to_bytes(&self.rules, command)?;
        let mut writer = self.writer.lock().await;
        writer.write_all(&bytes).await?;
        writer.flush().await?;
        tracing::trace!("encoded command {} ({} bytes)", command.id(), bytes.len());
        Ok(())
    }

    /// Write the termination sentinel and flush.
    pub async fn terminate(&self) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(&[TERMINATION_SENTINEL]).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Consume the encoder, returning the stream.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}
