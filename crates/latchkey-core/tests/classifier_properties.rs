//! Property-based tests for the inbound pipeline
//!
//! These verify:
//! - `classify` is total and deterministic over arbitrary bytes
//! - Sealed bodies classify as encrypted and decrypt once authenticated
//! - Any number of encrypted messages from `Idle` start one handshake
//! - Malformed or tampered payloads never fail processing

use std::{sync::Barrier, thread};

use latchkey_core::{
    ClassifierConfig, DecryptionOutcome, ENCRYPTED_MARKER, HandshakeController, HandshakeState,
    InboundMessage, MessageClassifier, MessageHeaderTag, MessageId, PUBLIC_KEY_MARKER, classify,
};
use latchkey_harness::SimCrypto;
use proptest::prelude::*;

const SENDER: &str = "+15551234567";

fn classifier(seed: u64) -> MessageClassifier<SimCrypto> {
    MessageClassifier::new(
        SimCrypto::new(seed),
        HandshakeController::new(),
        ClassifierConfig::default(),
    )
}

fn authenticate(classifier: &MessageClassifier<SimCrypto>) {
    classifier.handshake().set_intent(true);
    assert!(classifier.handshake().try_begin());
    classifier.handshake().complete().expect("complete failed");
}

fn sms(id: u64, body: &[u8]) -> InboundMessage {
    InboundMessage::sms(MessageId(id), SENDER, body)
}

proptest! {
    /// Property: classify never panics and always gives the same answer
    #[test]
    fn prop_classify_total_and_deterministic(body in prop::collection::vec(any::<u8>(), 0..256)) {
        let first = classify(&body);
        prop_assert_eq!(first, classify(&body));

        let expected = if body.starts_with(ENCRYPTED_MARKER) {
            MessageHeaderTag::Encrypted
        } else if body.starts_with(PUBLIC_KEY_MARKER) {
            MessageHeaderTag::KeyAnnouncement
        } else {
            MessageHeaderTag::Plain
        };
        prop_assert_eq!(first, expected);
    }

    /// Property: bodies without a marker pass through untouched
    #[test]
    fn prop_plain_passes_through(body in "[a-zA-Z0-9 ,.!?]{0,160}") {
        let result = classifier(0).process(&sms(1, body.as_bytes()), None);

        prop_assert_eq!(result.tag, MessageHeaderTag::Plain);
        prop_assert_eq!(result.display_body, body.as_bytes());
        prop_assert_eq!(result.decryption, DecryptionOutcome::NotEncrypted);
    }

    /// Property: seal then process while authenticated yields the plaintext
    #[test]
    fn prop_sealed_roundtrip(
        seed in any::<u64>(),
        plaintext in prop::collection::vec(any::<u8>(), 0..512),
    ) {
        let classifier = classifier(seed);
        authenticate(&classifier);

        let body = classifier.crypto().seal(SENDER, &plaintext);
        prop_assert_eq!(classify(&body), MessageHeaderTag::Encrypted);

        let result = classifier.process(&sms(1, &body), Some(true));
        prop_assert_eq!(result.decryption, DecryptionOutcome::Decrypted);
        prop_assert_eq!(result.display_body, plaintext);
    }

    /// Property: N encrypted messages from Idle with intent start exactly one
    /// handshake
    #[test]
    fn prop_single_flight(count in 1usize..20) {
        let classifier = classifier(1);
        classifier.handshake().set_intent(true);

        let outcomes: Vec<DecryptionOutcome> = (0..count)
            .map(|i| {
                let body = classifier.crypto().seal(SENDER, b"hi");
                classifier.process(&sms(i as u64, &body), None).decryption
            })
            .collect();

        prop_assert_eq!(classifier.crypto().auth_starts(), 1);
        prop_assert_eq!(&outcomes[0], &DecryptionOutcome::HandshakeStarted);
        prop_assert!(outcomes[1..].iter().all(|o| *o == DecryptionOutcome::AwaitingHandshake));
        prop_assert_eq!(classifier.handshake().state(), HandshakeState::Authenticating);
    }

    /// Property: whatever follows the marker, processing shows the raw body on
    /// failure and never panics
    #[test]
    fn prop_arbitrary_payload_never_fatal(payload in prop::collection::vec(any::<u8>(), 0..128)) {
        let classifier = classifier(2);
        authenticate(&classifier);

        let mut body = ENCRYPTED_MARKER.to_vec();
        body.extend_from_slice(&payload);

        let result = classifier.process(&sms(1, &body), None);
        prop_assert_eq!(result.tag, MessageHeaderTag::Encrypted);
        if let DecryptionOutcome::Failed { .. } = result.decryption {
            prop_assert_eq!(result.display_body, body);
        }
    }

    /// Property: flipping any ciphertext byte is detected
    #[test]
    fn prop_tampered_ciphertext_fails(index in any::<prop::sample::Index>()) {
        let classifier = classifier(3);
        authenticate(&classifier);

        let mut ciphertext = classifier.crypto().encrypt(SENDER, b"attack at dawn");
        let i = index.index(ciphertext.len());
        ciphertext[i] ^= 0x01;
        let body = latchkey_core::encode_encrypted_body(&ciphertext);

        let result = classifier.process(&sms(1, &body), None);
        prop_assert!(
            matches!(result.decryption, DecryptionOutcome::Failed { reason: _ }),
            "tampered ciphertext decrypted: {:?}",
            result.decryption
        );
        prop_assert_eq!(result.display_body, body);
    }
}

#[test]
fn scenario_garbage_while_authenticated() {
    let classifier = classifier(4);
    authenticate(&classifier);

    let result = classifier.process(&sms(1, b"<<ENC>>garbage"), None);

    assert_eq!(result.tag, MessageHeaderTag::Encrypted);
    assert!(matches!(result.decryption, DecryptionOutcome::Failed { .. }));
    assert_eq!(result.display_body, b"<<ENC>>garbage");
}

#[test]
fn scenario_message_from_other_peer_fails_authentication() {
    let classifier = classifier(5);
    authenticate(&classifier);

    let body = classifier.crypto().seal("+15550000000", b"not for this sender");
    let result = classifier.process(&sms(1, &body), None);

    assert_eq!(
        result.decryption,
        DecryptionOutcome::Failed { reason: "decryption failed: authentication failed".to_string() }
    );
}

#[test]
fn scenario_handshake_failure_allows_retry() {
    let classifier = classifier(6);
    let body = classifier.crypto().seal(SENDER, b"hi");
    classifier.handshake().set_intent(true);

    let outcome = |id| classifier.process(&sms(id, &body), None).decryption;

    assert_eq!(outcome(1), DecryptionOutcome::HandshakeStarted);
    classifier.handshake().abandon().expect("abandon failed");

    // Intent was consumed by the first start
    assert_eq!(outcome(2), DecryptionOutcome::AwaitingHandshake);

    classifier.handshake().set_intent(true);
    assert_eq!(outcome(3), DecryptionOutcome::HandshakeStarted);
    assert_eq!(classifier.crypto().auth_starts(), 2);

    classifier.handshake().complete().expect("complete failed");
    assert_eq!(outcome(1), DecryptionOutcome::Decrypted);
}

#[test]
fn concurrent_classifiers_start_one_handshake() {
    const THREADS: usize = 8;

    let crypto = SimCrypto::new(7);
    let handshake = HandshakeController::new();
    handshake.set_intent(true);
    let body = crypto.seal(SENDER, b"hi");
    let barrier = Barrier::new(THREADS);

    let started = thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let classifier = MessageClassifier::new(
                    crypto.clone(),
                    handshake.clone(),
                    ClassifierConfig::default(),
                );
                let body = &body;
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    classifier.process(&sms(i as u64, body), None).decryption
                        == DecryptionOutcome::HandshakeStarted
                })
            })
            .collect();

        handles.into_iter().map(|h| h.join().unwrap_or(false)).filter(|won| *won).count()
    });

    assert_eq!(started, 1);
    assert_eq!(crypto.auth_starts(), 1);
}
