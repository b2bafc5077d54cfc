//! Header markers.
//!
//! A body carrying a protocol payload starts with a fixed literal prefix. The
//! two prefixes are distinct and neither is a prefix of the other, so a body
//! matches at most one of them. Matching is byte-exact and case-sensitive.
//!
//! Ciphertext travels as standard-alphabet base64 after the encrypted marker.

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::error::ClassifyError;

/// Prefix of a body carrying an encrypted payload.
pub const ENCRYPTED_MARKER: &[u8] = b"<<ENC>>";

/// Prefix of a body announcing a peer's public key.
pub const PUBLIC_KEY_MARKER: &[u8] = b"<<KEY>>";

/// Protocol kind of a message body, derived from its leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageHeaderTag {
    /// No marker; ordinary text.
    Plain,
    /// Starts with [`ENCRYPTED_MARKER`].
    Encrypted,
    /// Starts with [`PUBLIC_KEY_MARKER`].
    KeyAnnouncement,
}

impl MessageHeaderTag {
    /// Marker bytes for this tag. Empty for [`MessageHeaderTag::Plain`].
    pub fn marker(self) -> &'static [u8] {
        match self {
            Self::Plain => &[],
            Self::Encrypted => ENCRYPTED_MARKER,
            Self::KeyAnnouncement => PUBLIC_KEY_MARKER,
        }
    }
}

/// Classify a body by its leading bytes.
///
/// Total and deterministic: every input, including empty and non-UTF-8 bodies,
/// maps to exactly one tag.
pub fn classify(body: &[u8]) -> MessageHeaderTag {
    if body.starts_with(ENCRYPTED_MARKER) {
        MessageHeaderTag::Encrypted
    } else if body.starts_with(PUBLIC_KEY_MARKER) {
        MessageHeaderTag::KeyAnnouncement
    } else {
        MessageHeaderTag::Plain
    }
}

/// Body with its marker removed. Plain bodies are returned unchanged.
pub fn strip_marker(body: &[u8]) -> &[u8] {
    let marker = classify(body).marker();
    &body[marker.len()..]
}

/// Prepend the marker for `tag` to `payload`.
pub fn with_marker(tag: MessageHeaderTag, payload: &[u8]) -> Vec<u8> {
    let marker = tag.marker();
    let mut body = Vec::with_capacity(marker.len() + payload.len());
    body.extend_from_slice(marker);
    body.extend_from_slice(payload);
    body
}

/// Frame `ciphertext` as an encrypted body: marker followed by base64.
pub fn encode_encrypted_body(ciphertext: &[u8]) -> Vec<u8> {
    with_marker(MessageHeaderTag::Encrypted, STANDARD.encode(ciphertext).as_bytes())
}

/// Ciphertext carried by an encrypted body.
///
/// Surrounding ASCII whitespace after the marker is ignored.
///
/// # Errors
///
/// - `ClassifyError::MalformedHeader` if the body lacks the encrypted marker
///   or the payload is not valid base64
pub fn decode_encrypted_body(body: &[u8]) -> Result<Vec<u8>, ClassifyError> {
    let payload = body.strip_prefix(ENCRYPTED_MARKER).ok_or_else(|| {
        ClassifyError::MalformedHeader { reason: "missing encrypted marker".to_string() }
    })?;

    STANDARD
        .decode(payload.trim_ascii())
        .map_err(|e| ClassifyError::MalformedHeader { reason: e.to_string() })
}
