//! Fuzz target for header classification and encrypted body decoding
//!
//! Feeds arbitrary bytes to `classify`, `strip_marker` and
//! `decode_encrypted_body`. None of them may panic; undecodable bodies must
//! come back as `MalformedHeader`.

#![no_main]

use latchkey_core::{
    ClassifyError, MessageHeaderTag, classify, decode_encrypted_body, strip_marker,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let tag = classify(data);
    assert_eq!(tag, classify(data), "classify must be deterministic");

    let payload = strip_marker(data);
    assert!(data.ends_with(payload));
    assert_eq!(data.len() - payload.len(), tag.marker().len());

    match decode_encrypted_body(data) {
        Ok(_) => assert_eq!(tag, MessageHeaderTag::Encrypted),
        Err(ClassifyError::MalformedHeader { .. }) => {},
        Err(other) => panic!("unexpected decode error: {other}"),
    }
});
