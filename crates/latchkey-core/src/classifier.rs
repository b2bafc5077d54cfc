//! Inbound message classifier.
//!
//! Every received body goes through [`MessageClassifier::process`]:
//!
//! ```text
//! body ──classify──┬── Plain ──────────────> shown unchanged
//!                  ├── KeyAnnouncement ────> placeholder shown, key surfaced
//!                  └── Encrypted ──┬─ Authenticated ──> decode + decrypt
//!                                  ├─ Idle ───────────> try_begin handshake
//!                                  └─ Authenticating ─> wait
//! ```
//!
//! Per-message failures are logged and recovered here. Nothing a peer sends
//! can make processing fail.

use crate::{
    crypto::CryptoCapability,
    error::{ClassifyError, MessageError},
    handshake::{HandshakeController, HandshakeState},
    marker::{self, MessageHeaderTag},
    message::{InboundMessage, MessageId, RawMessage, TransportKind},
};

/// Placeholder shown instead of a key announcement body.
pub const DEFAULT_KEY_ANNOUNCEMENT_PLACEHOLDER: &str = "Public key received";

/// Classifier configuration
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Text shown in place of a key announcement body
    pub key_announcement_placeholder: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self { key_announcement_placeholder: DEFAULT_KEY_ANNOUNCEMENT_PLACEHOLDER.to_string() }
    }
}

/// What happened to the encrypted payload of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptionOutcome {
    /// Body carried no encrypted payload
    NotEncrypted,
    /// Payload decrypted; display body is the plaintext
    Decrypted,
    /// Payload could not be decoded or decrypted; display body is the raw body
    Failed {
        /// Why decryption failed
        reason: String,
    },
    /// Not authenticated and no handshake was started by this message
    AwaitingHandshake,
    /// This message started the authentication handshake
    HandshakeStarted,
}

/// Result of processing one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedMessage {
    /// Message id
    pub id: MessageId,
    /// Sender address
    pub sender: String,
    /// Header classification
    pub tag: MessageHeaderTag,
    /// Bytes to show the user
    pub display_body: Vec<u8>,
    /// Fate of the encrypted payload
    pub decryption: DecryptionOutcome,
    /// Key material carried by a key announcement
    pub announced_key: Option<Vec<u8>>,
}

impl ClassifiedMessage {
    /// True if the message is encrypted but could not be shown decrypted
    /// because the handshake had not completed.
    pub fn needs_reclassify(&self) -> bool {
        matches!(
            self.decryption,
            DecryptionOutcome::AwaitingHandshake | DecryptionOutcome::HandshakeStarted
        )
    }
}

/// One entry of a processed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEntry {
    /// Record was valid and classified
    Classified {
        /// Validated message, for callers that hold it for reclassification
        message: InboundMessage,
        /// Classification of `message`
        classified: ClassifiedMessage,
    },
    /// Record could not be turned into a message
    Rejected {
        /// Id of the rejected record
        id: MessageId,
        /// Why the record was rejected
        error: MessageError,
    },
}

/// Classifies inbound messages and drives decryption and the handshake.
pub struct MessageClassifier<C: CryptoCapability> {
    crypto: C,
    handshake: HandshakeController,
    config: ClassifierConfig,
}

impl<C: CryptoCapability> MessageClassifier<C> {
    /// Create a classifier sharing `handshake` with the rest of the process.
    pub fn new(crypto: C, handshake: HandshakeController, config: ClassifierConfig) -> Self {
        Self { crypto, handshake, config }
    }

    /// Handshake controller shared with this classifier.
    pub fn handshake(&self) -> &HandshakeController {
        &self.handshake
    }

    /// Crypto capability.
    pub fn crypto(&self) -> &C {
        &self.crypto
    }

    /// Classify `message` and act on its header.
    ///
    /// `looks_encrypted` is an optional caller-side guess. The marker decides;
    /// a wrong guess is only logged.
    ///
    /// Markers are only honoured on SMS. An MMS body (subject, slideshow text
    /// or content location) is always shown as plain text and never touches
    /// the handshake.
    pub fn process(
        &self,
        message: &InboundMessage,
        looks_encrypted: Option<bool>,
    ) -> ClassifiedMessage {
        let tag = match message.transport() {
            TransportKind::Sms => marker::classify(message.body()),
            TransportKind::Mms => MessageHeaderTag::Plain,
        };

        if let Some(hint) = looks_encrypted
            && hint != (tag == MessageHeaderTag::Encrypted)
        {
            tracing::debug!(id = %message.id(), hint, ?tag, "encryption hint overruled by marker");
        }

        let (display_body, decryption, announced_key) = match tag {
            MessageHeaderTag::Plain => {
                (message.body().to_vec(), DecryptionOutcome::NotEncrypted, None)
            },
            MessageHeaderTag::KeyAnnouncement => (
                self.config.key_announcement_placeholder.as_bytes().to_vec(),
                DecryptionOutcome::NotEncrypted,
                Some(marker::strip_marker(message.body()).to_vec()),
            ),
            MessageHeaderTag::Encrypted => {
                let (display_body, decryption) = self.process_encrypted(message);
                (display_body, decryption, None)
            },
        };

        ClassifiedMessage {
            id: message.id(),
            sender: message.sender().to_string(),
            tag,
            display_body,
            decryption,
            announced_key,
        }
    }

    /// Validate and process every record, continuing past rejected ones.
    pub fn process_batch<I>(&self, raws: I) -> Vec<BatchEntry>
    where
        I: IntoIterator<Item = RawMessage>,
    {
        raws.into_iter()
            .map(|raw| {
                let id = raw.id;
                match InboundMessage::from_raw(raw) {
                    Ok(message) => {
                        let classified = self.process(&message, None);
                        BatchEntry::Classified { message, classified }
                    },
                    Err(error) => {
                        tracing::warn!(%id, %error, "skipping message");
                        BatchEntry::Rejected { id, error }
                    },
                }
            })
            .collect()
    }

    fn process_encrypted(&self, message: &InboundMessage) -> (Vec<u8>, DecryptionOutcome) {
        match self.handshake.state() {
            HandshakeState::Authenticated => match self.decrypt(message) {
                Ok(plaintext) => (plaintext, DecryptionOutcome::Decrypted),
                Err(error) => {
                    tracing::warn!(
                        id = %message.id(),
                        sender = message.sender(),
                        %error,
                        "failed to decrypt message"
                    );
                    let reason = error.to_string();
                    (message.body().to_vec(), DecryptionOutcome::Failed { reason })
                },
            },
            HandshakeState::Idle if self.handshake.try_begin() => {
                self.crypto.start_authentication();
                (message.body().to_vec(), DecryptionOutcome::HandshakeStarted)
            },
            HandshakeState::Idle | HandshakeState::Authenticating => {
                (message.body().to_vec(), DecryptionOutcome::AwaitingHandshake)
            },
        }
    }

    fn decrypt(&self, message: &InboundMessage) -> Result<Vec<u8>, ClassifyError> {
        let ciphertext = marker::decode_encrypted_body(message.body())?;
        Ok(self.crypto.decrypt(message.sender(), &ciphertext)?)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use super::*;
    use crate::{crypto::DecryptError, message::MessageBox};

    /// Reverses ciphertext bytes; rejects empty input.
    #[derive(Default)]
    struct ReverseCrypto {
        starts: Cell<usize>,
        decrypted_for: RefCell<Vec<String>>,
    }

    impl CryptoCapability for ReverseCrypto {
        fn decrypt(&self, peer_address: &str, ciphertext: &[u8]) -> Result<Vec<u8>, DecryptError> {
            self.decrypted_for.borrow_mut().push(peer_address.to_string());
            if ciphertext.is_empty() {
                return Err(DecryptError::new("empty ciphertext"));
            }
            Ok(ciphertext.iter().rev().copied().collect())
        }

        fn start_authentication(&self) {
            self.starts.set(self.starts.get() + 1);
        }
    }

    fn classifier() -> MessageClassifier<ReverseCrypto> {
        MessageClassifier::new(
            ReverseCrypto::default(),
            HandshakeController::new(),
            ClassifierConfig::default(),
        )
    }

    fn authenticated() -> MessageClassifier<ReverseCrypto> {
        let classifier = classifier();
        classifier.handshake().set_intent(true);
        assert!(classifier.handshake().try_begin());
        classifier.handshake().complete().unwrap();
        classifier
    }

    fn message(id: u64, body: &[u8]) -> InboundMessage {
        InboundMessage::sms(MessageId(id), "+15551234567", body)
    }

    #[test]
    fn plain_passes_through() {
        let result = classifier().process(&message(1, b"hello"), None);
        assert_eq!(result.tag, MessageHeaderTag::Plain);
        assert_eq!(result.display_body, b"hello");
        assert_eq!(result.decryption, DecryptionOutcome::NotEncrypted);
    }

    #[test]
    fn key_announcement_shows_placeholder() {
        let result = classifier().process(&message(1, b"<<KEY>>abcdef"), None);
        assert_eq!(result.tag, MessageHeaderTag::KeyAnnouncement);
        assert_eq!(result.display_body, DEFAULT_KEY_ANNOUNCEMENT_PLACEHOLDER.as_bytes());
        assert_eq!(result.announced_key.as_deref(), Some(b"abcdef".as_slice()));
    }

    #[test]
    fn custom_placeholder() {
        let classifier = MessageClassifier::new(
            ReverseCrypto::default(),
            HandshakeController::new(),
            ClassifierConfig { key_announcement_placeholder: "Key!".to_string() },
        );
        let result = classifier.process(&message(1, b"<<KEY>>abc"), None);
        assert_eq!(result.display_body, b"Key!");
    }

    #[test]
    fn encrypted_when_authenticated_decrypts() {
        let classifier = authenticated();
        let body = marker::encode_encrypted_body(b"olleh");

        let result = classifier.process(&message(1, &body), Some(true));

        assert_eq!(result.tag, MessageHeaderTag::Encrypted);
        assert_eq!(result.decryption, DecryptionOutcome::Decrypted);
        assert_eq!(result.display_body, b"hello");
        assert_eq!(*classifier.crypto().decrypted_for.borrow(), vec!["+15551234567"]);
    }

    #[test]
    fn garbage_payload_shows_raw_body() {
        let classifier = authenticated();

        let result = classifier.process(&message(1, b"<<ENC>>garbage"), None);

        assert_eq!(result.tag, MessageHeaderTag::Encrypted);
        assert!(matches!(result.decryption, DecryptionOutcome::Failed { .. }));
        assert_eq!(result.display_body, b"<<ENC>>garbage");
        assert!(classifier.crypto().decrypted_for.borrow().is_empty());
    }

    #[test]
    fn decrypt_error_shows_raw_body() {
        let classifier = authenticated();
        let body = marker::encode_encrypted_body(b"");

        let result = classifier.process(&message(1, &body), None);

        assert_eq!(
            result.decryption,
            DecryptionOutcome::Failed { reason: "decryption failed: empty ciphertext".to_string() }
        );
        assert_eq!(result.display_body, body);
    }

    #[test]
    fn encrypted_without_intent_waits() {
        let classifier = classifier();
        let result = classifier.process(&message(1, b"<<ENC>>aGk="), None);

        assert_eq!(result.decryption, DecryptionOutcome::AwaitingHandshake);
        assert_eq!(classifier.crypto().starts.get(), 0);
        assert_eq!(classifier.handshake().state(), HandshakeState::Idle);
    }

    #[test]
    fn two_encrypted_messages_start_one_handshake() {
        let classifier = classifier();
        classifier.handshake().set_intent(true);

        let first = classifier.process(&message(1, b"<<ENC>>aGk="), None);
        let second = classifier.process(&message(2, b"<<ENC>>aGk="), None);

        assert_eq!(first.decryption, DecryptionOutcome::HandshakeStarted);
        assert_eq!(second.decryption, DecryptionOutcome::AwaitingHandshake);
        assert_eq!(classifier.crypto().starts.get(), 1);
        assert!(!classifier.handshake().intent());
        assert!(first.needs_reclassify() && second.needs_reclassify());
    }

    #[test]
    fn wrong_hint_does_not_change_classification() {
        let classifier = classifier();
        let result = classifier.process(&message(1, b"plain text"), Some(true));
        assert_eq!(result.tag, MessageHeaderTag::Plain);
        assert_eq!(result.display_body, b"plain text");
    }

    #[test]
    fn batch_continues_past_unknown_kind() {
        let raw = |id: u64, kind: &str| RawMessage {
            id: MessageId(id),
            kind: kind.to_string(),
            box_kind: MessageBox::Inbox,
            sender: "+1".to_string(),
            body: b"hi".to_vec(),
            status: -1,
        };

        let entries = classifier().process_batch([raw(1, "sms"), raw(2, "fax"), raw(3, "mms")]);

        assert_eq!(entries.len(), 3);
        assert!(matches!(
            &entries[0],
            BatchEntry::Classified { classified, .. } if classified.id == MessageId(1)
        ));
        assert!(matches!(
            &entries[1],
            BatchEntry::Rejected { id: MessageId(2), error: MessageError::UnknownMessageKind { .. } }
        ));
        assert!(matches!(
            &entries[2],
            BatchEntry::Classified { message, .. } if message.id() == MessageId(3)
        ));
    }

    #[test]
    fn mms_markers_are_not_interpreted() {
        let classifier = classifier();
        classifier.handshake().set_intent(true);

        for body in [b"<<ENC>>aGk=".as_slice(), b"<<KEY>>key".as_slice()] {
            let raw = RawMessage {
                id: MessageId(1),
                kind: "mms".to_string(),
                box_kind: MessageBox::Inbox,
                sender: "+1".to_string(),
                body: body.to_vec(),
                status: -1,
            };
            let result = classifier.process(&InboundMessage::from_raw(raw).unwrap(), Some(true));

            assert_eq!(result.tag, MessageHeaderTag::Plain);
            assert_eq!(result.decryption, DecryptionOutcome::NotEncrypted);
            assert_eq!(result.display_body, body);
            assert_eq!(result.announced_key, None);
        }

        assert_eq!(classifier.crypto().starts.get(), 0);
        assert_eq!(classifier.handshake().state(), HandshakeState::Idle);
        assert!(classifier.handshake().intent());
    }
}
