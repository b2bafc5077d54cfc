//! Fuzz target for the inbound message pipeline
//!
//! Builds batches of raw records from arbitrary input, including bodies that
//! carry the encrypted marker followed by garbage or by real ciphertext, and
//! runs them through `MessageClassifier::process_batch` in every handshake
//! state.
//!
//! # Invariants
//!
//! - The classifier NEVER panics on message content
//! - Every record yields exactly one batch entry, in order
//! - Authentication is started at most once per batch
//! - Sealed SMS bodies decrypt once the handshake is complete
//! - MMS bodies are never treated as encrypted

#![no_main]

use arbitrary::Arbitrary;
use latchkey_core::{
    BatchEntry, ClassifierConfig, DecryptionOutcome, HandshakeController, MessageBox,
    MessageClassifier, MessageId, RawMessage,
};
use latchkey_harness::SimCrypto;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Body {
    Raw(Vec<u8>),
    EncryptedGarbage(Vec<u8>),
    Sealed(Vec<u8>),
    KeyAnnouncement(Vec<u8>),
}

#[derive(Debug, Arbitrary)]
struct Record {
    kind_selector: u8,
    sender: u8,
    status: i32,
    body: Body,
}

#[derive(Debug, Arbitrary)]
struct Scenario {
    seed: u64,
    intent: bool,
    /// 0 = idle, 1 = authenticating, otherwise authenticated
    state: u8,
    records: Vec<Record>,
}

fuzz_target!(|scenario: Scenario| {
    let crypto = SimCrypto::new(scenario.seed);
    let handshake = HandshakeController::new();

    if scenario.state > 0 {
        handshake.set_intent(true);
        assert!(handshake.try_begin());
        if scenario.state > 1 {
            handshake.complete().unwrap();
        }
    }
    handshake.set_intent(scenario.intent);

    let classifier =
        MessageClassifier::new(crypto.clone(), handshake.clone(), ClassifierConfig::default());

    let mut sealed = Vec::new();
    let raws: Vec<RawMessage> = scenario
        .records
        .into_iter()
        .enumerate()
        .map(|(i, record)| {
            let sender = format!("peer-{}", record.sender % 4);
            let kind = match record.kind_selector % 3 {
                0 => "sms",
                1 => "mms",
                _ => "fax",
            };
            let body = match record.body {
                Body::Raw(bytes) => bytes,
                Body::EncryptedGarbage(bytes) => [b"<<ENC>>".as_slice(), &bytes].concat(),
                Body::Sealed(plaintext) => {
                    let body = crypto.seal(&sender, &plaintext);
                    sealed.push((i, kind == "sms", plaintext));
                    body
                },
                Body::KeyAnnouncement(bytes) => [b"<<KEY>>".as_slice(), &bytes].concat(),
            };

            RawMessage {
                id: MessageId(i as u64),
                kind: kind.to_string(),
                box_kind: MessageBox::Inbox,
                sender,
                body,
                status: record.status,
            }
        })
        .collect();

    let count = raws.len();
    let starts_before = crypto.auth_starts();
    let entries = classifier.process_batch(raws);

    assert_eq!(entries.len(), count);
    assert!(crypto.auth_starts() - starts_before <= 1);

    for (i, is_sms, plaintext) in sealed {
        let BatchEntry::Classified { classified: message, .. } = &entries[i] else {
            continue;
        };

        if !is_sms {
            assert_eq!(message.decryption, DecryptionOutcome::NotEncrypted);
        } else if handshake.is_authenticated() {
            assert_eq!(message.decryption, DecryptionOutcome::Decrypted);
            assert_eq!(message.display_body, plaintext);
        }
    }
});
