//! Control plane events and actions.

use latchkey_core::{
    ClassifiedMessage, Confirmation, InboundMessage, MessageId, RawMessage, Recipient,
    RecipientPlan,
};
use latchkey_registry::{KeyId, KeyListing};

/// Events the caller feeds into the control plane.
///
/// The caller is responsible for:
/// - Delivering messages received by the transport
/// - Forwarding user decisions (send confirmation, key acceptance)
/// - Reporting the outcome of a handshake started by the crypto capability
#[derive(Debug, Clone)]
pub enum ControlEvent {
    /// Transport delivered a message.
    MessageReceived {
        /// The message.
        message: InboundMessage,
        /// Caller-side guess whether the body is encrypted, if any.
        looks_encrypted: Option<bool>,
    },

    /// Transport delivered a batch of raw records (e.g. on startup).
    BatchReceived {
        /// Records as read from the transport.
        raws: Vec<RawMessage>,
    },

    /// User wants to send to these recipients.
    PrepareSend {
        /// Recipients in the order the user entered them.
        recipients: Vec<Recipient>,
    },

    /// User answered the send confirmation prompt.
    ConfirmSend {
        /// Plan that was presented.
        plan: RecipientPlan,
        /// User's answer.
        confirmation: Confirmation,
    },

    /// User toggled "encrypt outgoing replies when needed".
    SetEncryptIfNeeded(bool),

    /// Crypto capability finished the handshake.
    HandshakeSucceeded,

    /// Crypto capability gave up on the handshake.
    HandshakeFailed {
        /// Reason reported by the capability.
        reason: String,
    },

    /// User accepted an announced key.
    AcceptKey {
        /// Peer that announced the key.
        address: String,
        /// Announced key material.
        key_material: Vec<u8>,
    },

    /// User rejected an announced key.
    RejectKey {
        /// Peer that announced the key.
        address: String,
    },

    /// Key management screen wants the registry contents.
    ListKeys,

    /// User confirmed deletion of a key.
    DeleteKey {
        /// Key to delete.
        id: KeyId,
    },

    /// Messages were deleted or left the conversation view.
    ///
    /// They are no longer held for the handshake and their cached
    /// classification is dropped.
    Forget {
        /// Messages to release.
        ids: Vec<MessageId>,
    },
}

/// How a group of recipients is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryMode {
    /// Encrypt to each recipient's accepted key.
    Encrypted,
    /// Send as plain text.
    Plain,
}

/// Actions the control plane produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlAction {
    /// Show a processed message.
    Display(ClassifiedMessage),

    /// A peer announced a key; ask the user whether to accept it.
    ///
    /// The caller answers with `AcceptKey` or `RejectKey`.
    KeyAnnounced {
        /// Peer that announced the key.
        sender: String,
        /// Announced key material.
        key_material: Vec<u8>,
    },

    /// Show the partitioned recipients with everyone selected.
    PresentPlan(RecipientPlan),

    /// Nobody to send to; the caller must not send.
    NothingToSend,

    /// Send the message to this group in this mode.
    Dispatch {
        /// Delivery mode for the group.
        mode: DeliveryMode,
        /// Recipients in the group, never empty.
        recipients: Vec<Recipient>,
    },

    /// User cancelled the send.
    SendCancelled,

    /// Cached presentation of these messages is stale.
    ///
    /// Emitted after a handshake completes, followed by a `Display` for each
    /// listed message with its new outcome.
    Reclassify {
        /// Affected message ids.
        ids: Vec<MessageId>,
    },

    /// Key stored in the registry.
    KeyStored {
        /// Registry id.
        id: KeyId,
        /// Peer the key belongs to.
        address: String,
    },

    /// Key removed from the registry (or was already absent).
    KeyDeleted {
        /// Registry id.
        id: KeyId,
    },

    /// Registry contents for display.
    KeysListed(KeyListing),

    /// Log message for debugging.
    Log {
        /// Log message.
        message: String,
    },
}
