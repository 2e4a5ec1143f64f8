//! Round trip - one side encodes commands, the other decodes them.
//!
//! This example demonstrates:
//! - Loading protocol rules from a JSON description
//! - Encoding commands with guards, arrays and DYNAMIC slots
//! - Decoding over an in-memory tokio duplex stream until termination
//! - Resynchronizing after garbage bytes
//!
//! # Running
//!
//! ```sh
//! RUST_LOG=cmdwire=trace cargo run --example roundtrip
//! ```

use std::sync::Arc;

use cmdwire::codec::{AsyncDecoder, AsyncEncoder, Decoded};
use cmdwire::protocol::{ProtocolRules, Value};
use tokio::io::{duplex, AsyncWriteExt};
use tracing_subscriber::EnvFilter;

const PROTOCOL: &str = r#"{
    "start": "[",
    "separator": ";",
    "definition": ">",
    "end": "]",
    "encoding": "utf-8",
    "models": [
        { "id": 1, "name": "Login", "params": ["STRING", "BOOLEAN", "IF_TRUE", "RAW"] },
        { "id": 2, "name": "Samples", "params": ["ARRAY_OF", "DOUBLE"] },
        { "id": 3, "name": "Set", "params": ["STRING", "DYNAMIC"] }
    ]
}"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "cmdwire=debug".into()),
        )
        .init();

    let rules = Arc::new(ProtocolRules::from_json(PROTOCOL)?);
    let (client, server) = duplex(4096);
    let encoder = AsyncEncoder::new(rules.clone(), client);
    let decoder = AsyncDecoder::new(rules.clone(), server);

    let commands = [
        rules.command(1, [Value::from("alice"), Value::Bool(true), Value::from(vec![0xC0u8, 0xFF, 0xEE])]),
        rules.command(1, [Value::from("bob"), Value::Bool(false)]),
        rules.command(2, [Value::Array(vec![Value::Double(0.25), Value::Double(-3.5)])]),
        rules.command(3, [Value::from("volume"), Value::Byte(11)]),
        rules.command(3, [Value::from("title"), Value::from("cmdwire")]),
    ];

    let producer = tokio::spawn(async move {
        for command in commands.into_iter().flatten() {
            encoder.encode(&command).await?;
        }
        encoder.terminate().await?;
        Ok::<_, cmdwire::EncodeError>(encoder.into_inner())
    });

    loop {
        match decoder.decode().await {
            Decoded::Command(command) => println!("received {}", command),
            Decoded::Terminated => {
                println!("stream terminated");
                break;
            }
            other => {
                println!("decode stopped: {}", other.status());
                break;
            }
        }
    }

    // Garbage in front of a command is skipped.
    let mut client = producer.await??;
    let (mut tx, rx) = duplex(256);
    let decoder = AsyncDecoder::new(rules.clone(), rx);
    tx.write_all(b"noise").await?;
    let samples = rules
        .command(2, [Value::Array(vec![Value::Double(1.0)])])
        .ok_or("model 2 missing")?;
    tx.write_all(&cmdwire::codec::encode_to_bytes(&rules, &samples)?).await?;
    println!("after garbage: {:?}", decoder.decode().await.status());

    client.shutdown().await?;
    Ok(())
}
