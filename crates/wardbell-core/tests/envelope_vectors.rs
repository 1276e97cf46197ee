//! Envelope vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use serde_json::{json, Value};

use wardbell_core::protocol::{kind, Envelope};

use vector_loader::load;

#[test]
fn envelope_vectors() {
    let files = [
        "appointment_created.json",
        "notification_no_content.json",
        "unknown_field.json",
    ];

    for f in files {
        let v = load(f);
        let res: Result<Envelope, _> = serde_json::from_value(v.envelope.clone());

        if v.expect_error {
            assert!(res.is_err(), "vector={}", v.description);
            continue;
        }

        let env = res.expect("vector should parse");
        let bytes = env.encode().unwrap();
        let back: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back["type"], v.envelope["type"], "vector={}", v.description);
        assert_eq!(
            back["content"],
            v.envelope.get("content").cloned().unwrap_or(Value::Null),
            "vector={}",
            v.description
        );
    }
}

#[test]
fn encode_uses_type_key() {
    let env = Envelope::new(kind::APPOINTMENT_CANCELLED, json!({ "appointmentId": "A-7" }));
    let s = String::from_utf8(env.encode().unwrap().to_vec()).unwrap();
    assert_eq!(s, r#"{"type":"appointmentCancelled","content":{"appointmentId":"A-7"}}"#);
}

#[test]
fn empty_type_is_rejected() {
    let err = Envelope::new("", Value::Null).encode().unwrap_err();
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
}

#[test]
fn from_content_serializes_structs() {
    #[derive(serde::Serialize)]
    struct Notice<'a> {
        message: &'a str,
    }

    let env = Envelope::from_content(kind::NOTIFICATION, &Notice { message: "hi" }).unwrap();
    assert_eq!(env.content, json!({ "message": "hi" }));
}
