//! Integration tests for cmdwire.
//!
//! These tests drive the public decoder and encoder over in-memory streams.

use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use cmdwire::codec::{encode_to_bytes, Decoded, Decoder, Encoder, ReadStatus};
use cmdwire::config::DecoderConfig;
use cmdwire::protocol::{
    CommandModel, DateTime, Decimal, ParamTag, ProtocolRules, TextEncoding, Value,
};
use uuid::Uuid;

const GREET: u16 = 1;
const SERIES: u16 = 2;
const OPTIONAL: u16 = 3;
const EVERYTHING: u16 = 4;
const ANY: u16 = 5;

fn rules() -> Arc<ProtocolRules> {
    Arc::new(
        ProtocolRules::builder()
            .encoding(TextEncoding::Utf8)
            .model(CommandModel::named(GREET, "Greet", [ParamTag::INT, ParamTag::STRING]))
            .model(CommandModel::named(SERIES, "Series", [ParamTag::ARRAY_OF, ParamTag::INT]))
            .model(CommandModel::named(
                OPTIONAL,
                "Optional",
                [
                    ParamTag::BOOLEAN,
                    ParamTag::IF_TRUE,
                    ParamTag::STRING,
                    ParamTag::UINT,
                    ParamTag::IF_NOT_ZERO,
                    ParamTag::ARRAY_OF,
                    ParamTag::RAW,
                    ParamTag::BYTE,
                ],
            ))
            .model(CommandModel::named(
                EVERYTHING,
                "Everything",
                [
                    ParamTag::BOOLEAN,
                    ParamTag::CHAR,
                    ParamTag::SBYTE,
                    ParamTag::BYTE,
                    ParamTag::SHORT,
                    ParamTag::USHORT,
                    ParamTag::INT,
                    ParamTag::UINT,
                    ParamTag::LONG,
                    ParamTag::ULONG,
                    ParamTag::FLOAT,
                    ParamTag::DOUBLE,
                    ParamTag::DECIMAL,
                    ParamTag::DATETIME,
                    ParamTag::GUID,
                    ParamTag::STRING,
                    ParamTag::RAW,
                    ParamTag::BYTES_8,
                ],
            ))
            .model(CommandModel::named(
                ANY,
                "Any",
                [ParamTag::DYNAMIC, ParamTag::IF_ZERO, ParamTag::DYNAMIC],
            ))
            .build()
            .unwrap(),
    )
}

fn decoder(bytes: Vec<u8>) -> Decoder<Cursor<Vec<u8>>> {
    Decoder::new(rules(), Cursor::new(bytes))
}

fn encode(id: u16, args: Vec<Value>) -> Vec<u8> {
    let rules = rules();
    let command = rules.command(id, args).unwrap();
    encode_to_bytes(&rules, &command).unwrap().to_vec()
}

/// `[INT, STRING]` with `(42, "hi")` round-trips.
#[test]
fn test_int_string_round_trip() {
    let rules = rules();
    let command = rules.command(GREET, [Value::Int(42), Value::from("hi")]).unwrap();

    let encoder = Encoder::new(rules.clone(), Vec::new());
    encoder.encode(&command).unwrap();
    let bytes = encoder.into_inner();

    let decoder = Decoder::new(rules, Cursor::new(bytes));
    match decoder.decode() {
        Decoded::Command(decoded) => {
            assert_eq!(decoded.id(), GREET);
            assert_eq!(decoded.args(), &[Value::Int(42), Value::from("hi")]);
        }
        other => panic!("expected command, got {:?}", other),
    }
}

/// `[ARRAY_OF, INT]` with `[1, 2, 3]` puts a separator before every element.
#[test]
fn test_array_wire_layout() {
    let array = Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    let bytes = encode(SERIES, vec![array.clone()]);

    let expected = [
        b'[', 2, 0, // start, id
        3, 0, 0, 0, // length
        b';', 1, 0, 0, 0, //
        b';', 2, 0, 0, 0, //
        b';', 3, 0, 0, 0, //
        b']',
    ];
    assert_eq!(bytes, expected);

    let decoded = decoder(bytes).decode().into_command().unwrap();
    assert_eq!(decoded.args(), &[array]);
}

/// A leading `0xFF` terminates the stream and consumes exactly one byte.
#[test]
fn test_termination_sentinel() {
    let decoder = decoder(vec![0xFF, b'[', 1, 0]);
    assert_eq!(decoder.decode(), Decoded::Terminated);
    assert_eq!(decoder.into_inner().position(), 1);
}

/// A valid start byte followed by an unregistered id.
#[test]
fn test_unknown_command() {
    let decoder = decoder(vec![b'[', 0x34, 0x12, b']']);
    let outcome = decoder.decode();
    assert_eq!(outcome, Decoded::UnknownCommand(0x1234));
    assert_eq!(outcome.status(), ReadStatus::UnknownCommand);
}

/// A payload cut short by the end of the stream.
#[test]
fn test_truncated_payload() {
    let mut bytes = encode(GREET, vec![Value::Int(1), Value::from("hello")]);
    bytes.truncate(bytes.len() - 3);
    assert_eq!(decoder(bytes).decode(), Decoded::CantRead);
}

/// A separator byte that does not match the rules.
#[test]
fn test_wrong_separator() {
    let mut bytes = encode(GREET, vec![Value::Int(1), Value::from("x")]);
    bytes[7] = b',';
    assert_eq!(decoder(bytes).decode(), Decoded::InvalidData);
}

#[test]
fn test_every_fixed_and_prefixed_type() {
    let args = vec![
        Value::Bool(true),
        Value::Char('z'),
        Value::SByte(-128),
        Value::Byte(255),
        Value::Short(i16::MIN),
        Value::UShort(u16::MAX),
        Value::Int(-123_456),
        Value::UInt(4_000_000_000),
        Value::Long(i64::MIN),
        Value::ULong(u64::MAX),
        Value::Float(3.25),
        Value::Double(-1e300),
        Value::Decimal(Decimal::new(-(1i128 << 95), 28).unwrap()),
        Value::DateTime(DateTime::from_ticks(638_000_000_000_000_000)),
        Value::Guid(Uuid::from_u128(0x0011_2233_4455_6677_8899_aabb_ccdd_eeff)),
        Value::from("grüße"),
        Value::Raw(Bytes::from_static(&[0, b'[', b']', 0xFF])),
        Value::Fixed(Bytes::from_static(b"8 bytes!")),
    ];
    let bytes = encode(EVERYTHING, args.clone());
    let decoded = decoder(bytes).decode().into_command().unwrap();
    assert_eq!(decoded.args(), &args[..]);
}

#[test]
fn test_conditional_omission() {
    let cases = vec![
        // all guards taken
        vec![
            Value::Bool(true),
            Value::from("note"),
            Value::UInt(2),
            Value::Array(vec![Value::from(vec![1u8]), Value::from(vec![2u8, 3])]),
            Value::Byte(9),
        ],
        // IF_TRUE fails: STRING omitted
        vec![
            Value::Bool(false),
            Value::UInt(1),
            Value::Array(vec![Value::from(vec![7u8])]),
            Value::Byte(9),
        ],
        // IF_NOT_ZERO fails: the whole array omitted
        vec![Value::Bool(false), Value::UInt(0), Value::Byte(9)],
    ];

    for args in cases {
        let bytes = encode(OPTIONAL, args.clone());
        let decoded = decoder(bytes).decode().into_command().unwrap();
        assert_eq!(decoded.args(), &args[..]);
    }
}

#[test]
fn test_array_boundaries() {
    for len in [0usize, 1, 5] {
        let items: Vec<Value> = (0..len as i32).map(Value::Int).collect();
        let bytes = encode(SERIES, vec![Value::Array(items.clone())]);
        // start + id + length + (separator + int) per element + end
        assert_eq!(bytes.len(), 1 + 2 + 4 + len * 5 + 1);

        let decoded = decoder(bytes).decode().into_command().unwrap();
        assert_eq!(decoded.args(), &[Value::Array(items)]);
    }
}

#[test]
fn test_dynamic_values_round_trip() {
    let cases = vec![
        vec![Value::Int(0), Value::from("zero")],
        vec![Value::Double(1.5)],
        vec![Value::Char('\0'), Value::Guid(Uuid::nil())],
    ];
    for args in cases {
        let bytes = encode(ANY, args.clone());
        let decoded = decoder(bytes).decode().into_command().unwrap();
        assert_eq!(decoded.args(), &args[..]);
    }
}

#[test]
fn test_resync_after_garbage() {
    let mut bytes = vec![0x00, 0x13, 0x37, b'x'];
    bytes.extend(encode(GREET, vec![Value::Int(5), Value::from("ok")]));

    let decoded = decoder(bytes).decode().into_command().unwrap();
    assert_eq!(decoded.args(), &[Value::Int(5), Value::from("ok")]);
}

#[test]
fn test_decoder_reusable_after_failures() {
    let good = encode(GREET, vec![Value::Int(8), Value::from("again")]);

    let mut bytes = Vec::new();
    // unknown id
    bytes.extend_from_slice(&[b'[', 99, 0]);
    // bad separator; the rest of the broken command holds no start byte
    let mut broken = encode(GREET, vec![Value::Int(1), Value::from("a")]);
    broken[7] = b'?';
    bytes.extend_from_slice(&broken);
    bytes.extend_from_slice(&good);
    bytes.push(0xFF);

    let decoder = decoder(bytes);
    assert_eq!(decoder.decode(), Decoded::UnknownCommand(99));
    assert_eq!(decoder.decode(), Decoded::InvalidData);
    let decoded = decoder.decode().into_command().unwrap();
    assert_eq!(decoded.args(), &[Value::Int(8), Value::from("again")]);
    assert_eq!(decoder.decode(), Decoded::Terminated);
    assert_eq!(decoder.decode(), Decoded::CantRead);
}

#[test]
fn test_stream_cursor_stays_at_command_boundary() {
    let first = encode(GREET, vec![Value::Int(1), Value::from("one")]);
    let second = encode(SERIES, vec![Value::Array(vec![Value::Int(2)])]);
    let mut bytes = first.clone();
    bytes.extend_from_slice(&second);

    let decoder = decoder(bytes);
    assert!(decoder.decode().is_success());
    let cursor = decoder.into_inner();
    assert_eq!(cursor.position(), first.len() as u64);

    let decoder = Decoder::new(rules(), cursor);
    assert_eq!(decoder.decode().into_command().unwrap().id(), SERIES);
}

#[test]
fn test_shared_decoder_across_threads() {
    let rules = rules();
    let encoder = Encoder::new(rules.clone(), Vec::new());
    for i in 0..32 {
        let command = rules.command(GREET, [Value::Int(i), Value::from("t")]).unwrap();
        encoder.encode(&command).unwrap();
    }
    let decoder = Arc::new(Decoder::new(rules, Cursor::new(encoder.into_inner())));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let decoder = Arc::clone(&decoder);
            std::thread::spawn(move || {
                (0..8)
                    .map(|_| decoder.decode().into_command().unwrap().args()[0].clone())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut seen: Vec<i32> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .map(|v| match v {
            Value::Int(i) => i,
            other => panic!("unexpected {:?}", other),
        })
        .collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..32).collect::<Vec<_>>());
}

#[test]
fn test_strict_mode_rejects_garbage() {
    let mut bytes = vec![0x42];
    bytes.extend(encode(GREET, vec![Value::Int(1), Value::from("")]));
    let config = DecoderConfig {
        ignore_garbage: false,
        ..DecoderConfig::default()
    };
    let decoder = Decoder::with_config(rules(), Cursor::new(bytes), config);
    assert_eq!(decoder.decode(), Decoded::InvalidData);
    assert!(decoder.decode().is_success());
}

#[test]
fn test_rules_from_json_drive_codec() {
    let rules = Arc::new(
        ProtocolRules::from_json(
            r#"{
                "start": 2, "separator": 31, "definition": 30, "end": 3,
                "encoding": "utf-16le",
                "models": [{ "id": 10, "name": "Login", "params": ["STRING", "RAW"] }]
            }"#,
        )
        .unwrap(),
    );
    let command = rules
        .command(10, [Value::from("root"), Value::from(vec![1u8, 2, 3])])
        .unwrap();

    let bytes = encode_to_bytes(&rules, &command).unwrap();
    assert_eq!(bytes[0], 2);
    assert_eq!(bytes[bytes.len() - 1], 3);

    let decoder = Decoder::new(rules, Cursor::new(bytes.to_vec()));
    assert_eq!(decoder.decode(), Decoded::Command(command));
}
