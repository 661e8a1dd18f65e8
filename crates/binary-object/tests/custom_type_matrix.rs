use std::sync::Arc;

use binary_object::{
    CodecError, Decoder, Encoder, ProcessorChain, ProcessorEntry, ProcessorResult, TypeProcessor,
    Value,
};

#[derive(Debug, Clone, PartialEq)]
struct User {
    id: u32,
    name: String,
}

impl User {
    fn new(id: u32, name: &str) -> Self {
        Self {
            id,
            name: name.to_owned(),
        }
    }
}

/// Payload: `u32` LE id, `u32` LE name length, UTF-8 name.
struct UserProcessor;

impl TypeProcessor for UserProcessor {
    fn validate(&self, value: &Value) -> bool {
        value.is::<User>()
    }

    fn encode(&self, value: &Value) -> ProcessorResult<Vec<u8>> {
        let user = value.downcast_ref::<User>().ok_or("expected a User")?;
        let name = user.name.as_bytes();
        let mut out = Vec::with_capacity(8 + name.len());
        out.extend_from_slice(&user.id.to_le_bytes());
        out.extend_from_slice(&u32::try_from(name.len())?.to_le_bytes());
        out.extend_from_slice(name);
        Ok(out)
    }

    fn decode(&self, payload: &[u8]) -> ProcessorResult<Value> {
        if payload.len() < 8 {
            return Err("user payload shorter than its header".into());
        }
        let id = u32::from_le_bytes(payload[0..4].try_into()?);
        let len = u32::from_le_bytes(payload[4..8].try_into()?) as usize;
        let name = payload.get(8..8 + len).ok_or("user name truncated")?;
        Ok(Value::custom(User {
            id,
            name: std::str::from_utf8(name)?.to_owned(),
        }))
    }
}

#[derive(Debug, PartialEq)]
struct Point(i32, i32);

fn point_entry(tag: u8) -> ProcessorEntry {
    ProcessorEntry::builder(tag)
        .validate(|v| v.is::<Point>())
        .encode(|v| {
            let p = v.downcast_ref::<Point>().ok_or("expected a Point")?;
            let mut out = p.0.to_le_bytes().to_vec();
            out.extend_from_slice(&p.1.to_le_bytes());
            Ok(out)
        })
        .decode(|payload| {
            let x = i32::from_le_bytes(payload.get(0..4).ok_or("short")?.try_into()?);
            let y = i32::from_le_bytes(payload.get(4..8).ok_or("short")?.try_into()?);
            Ok(Value::custom(Point(x, y)))
        })
        .build()
        .expect("complete entry")
}

fn users_chain() -> ProcessorChain {
    ProcessorChain::new([ProcessorEntry::new(80, UserProcessor)]).expect("valid chain")
}

#[test]
fn objects_with_custom_types() {
    let chain = users_chain();
    let value = Value::object([(
        "users",
        Value::Array(vec![
            Value::custom(User::new(1, "victor")),
            Value::custom(User::new(2, "gallins")),
        ]),
    )]);

    let bytes = Encoder::with_chain(chain.clone()).encode(&value).unwrap();
    let decoded = Decoder::new(&bytes, chain).decode().unwrap();

    let users = decoded.get("users").and_then(Value::as_array).expect("users");
    assert!(users.iter().all(|u| u.is::<User>()));
    assert_eq!(users[1].downcast_ref::<User>(), Some(&User::new(2, "gallins")));
    assert_eq!(decoded, value);
}

#[test]
fn custom_payload_is_framed_with_its_tag() {
    let bytes = Encoder::with_chain(users_chain())
        .encode(&Value::custom(User::new(7, "ab")))
        .unwrap();
    assert_eq!(
        bytes,
        [
            80, 10, 0, 0, 0, // tag + payload length
            7, 0, 0, 0, 2, 0, 0, 0, b'a', b'b',
        ]
    );
}

#[test]
fn first_matching_processor_wins() {
    let tagged = |tag: u8| {
        ProcessorEntry::builder(tag)
            .validate(|v| v.is::<Point>())
            .encode(move |_| Ok(vec![tag]))
            .decode(|p| Ok(Value::bytes(p.to_vec())))
            .build()
            .unwrap()
    };
    let mut encoder = Encoder::with_processors([tagged(50), tagged(40)]).unwrap();
    let bytes = encoder.encode(&Value::custom(Point(0, 0))).unwrap();
    assert_eq!(bytes, [50, 1, 0, 0, 0, 50]);
}

#[test]
fn several_processors_share_one_chain() {
    let chain = ProcessorChain::new([
        ProcessorEntry::from_arc(80, Arc::new(UserProcessor)),
        point_entry(81),
    ])
    .unwrap();
    let value = Value::Array(vec![
        Value::custom(Point(-3, 4)),
        Value::custom(User::new(9, "ana")),
        Value::from("plain"),
    ]);
    let bytes = Encoder::with_chain(chain.clone()).encode(&value).unwrap();
    assert_eq!(bytes[5], 81);
    let decoded = Decoder::new(&bytes, chain).decode().unwrap();
    assert_eq!(decoded, value);
    assert!(decoded.as_array().unwrap()[0].is::<Point>());
}

#[test]
fn unmatched_custom_value_is_unencodable() {
    let mut encoder = Encoder::with_chain(users_chain());
    let err = encoder
        .encode(&Value::object([("p", Value::custom(Point(1, 2)))]))
        .unwrap_err();
    match err {
        CodecError::UnencodableValue(msg) => assert!(msg.contains("Point"), "{msg}"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn invalid_instructions_are_rejected_up_front() {
    // Tag collides with a built-in.
    assert!(matches!(
        Encoder::with_processors([ProcessorEntry::new(9, UserProcessor)]),
        Err(CodecError::InvalidInstructions(_))
    ));
    // Two entries share a tag.
    assert!(matches!(
        Decoder::with_processors(&[], [point_entry(70), ProcessorEntry::new(70, UserProcessor)]),
        Err(CodecError::InvalidInstructions(_))
    ));
    // Missing callbacks.
    for builder in [
        ProcessorEntry::builder(11).encode(|_| Ok(vec![])).decode(|_| Ok(Value::Null)),
        ProcessorEntry::builder(11).validate(|_| true).decode(|_| Ok(Value::Null)),
        ProcessorEntry::builder(11).validate(|_| true).encode(|_| Ok(vec![])),
    ] {
        assert!(matches!(
            builder.build(),
            Err(CodecError::InvalidInstructions(_))
        ));
    }
}

#[test]
fn unregistered_custom_tag_is_unknown() {
    let bytes = Encoder::with_chain(users_chain())
        .encode(&Value::custom(User::new(1, "x")))
        .unwrap();
    assert_eq!(
        Decoder::without_processors(&bytes).decode(),
        Err(CodecError::UnknownTag(80))
    );
}

#[test]
fn processor_failures_surface_as_custom_type_errors() {
    // Frame holds 3 bytes, too short for a user header.
    let bytes = [80u8, 3, 0, 0, 0, 1, 2, 3];
    let err = Decoder::new(&bytes, users_chain()).decode().unwrap_err();
    assert_eq!(
        err,
        CodecError::CustomType {
            tag: 80,
            reason: "user payload shorter than its header".into()
        }
    );

    let failing = ProcessorEntry::builder(12)
        .validate(|_| true)
        .encode(|_| Err("refused".into()))
        .decode(|_| Ok(Value::Null))
        .build()
        .unwrap();
    let err = Encoder::with_processors([failing])
        .unwrap()
        .encode(&Value::custom(Point(1, 1)))
        .unwrap_err();
    assert_eq!(
        err,
        CodecError::CustomType {
            tag: 12,
            reason: "refused".into()
        }
    );
}

#[test]
fn truncated_custom_frame() {
    let bytes = Encoder::with_chain(users_chain())
        .encode(&Value::custom(User::new(1, "victor")))
        .unwrap();
    assert_eq!(
        Decoder::new(&bytes[..bytes.len() - 1], users_chain()).decode(),
        Err(CodecError::UnexpectedEndOfBuffer)
    );
}

#[test]
fn builtins_never_reach_processors() {
    let greedy = ProcessorEntry::builder(99)
        .validate(|_| true)
        .encode(|_| Ok(vec![0xee]))
        .decode(|_| Ok(Value::Null))
        .build()
        .unwrap();
    let mut encoder = Encoder::with_processors([greedy]).unwrap();
    assert_eq!(encoder.encode(&Value::Bool(true)).unwrap(), [3]);
    assert_eq!(encoder.encode(&Value::Null).unwrap(), [1]);
}
