//! Inbound message model.
//!
//! [`RawMessage`] is what the transport hands over; [`InboundMessage`] is the
//! validated, immutable value the classifier works on. Presentation state
//! derived from a message lives in [`FormattedCache`](crate::FormattedCache),
//! never on the message.

use std::fmt;

use crate::error::MessageError;

/// Transport-assigned message identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transport a message travelled over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Short message service
    Sms,
    /// Multimedia message service
    Mms,
}

impl TransportKind {
    /// Parse the transport's type tag (`"sms"` or `"mms"`).
    ///
    /// # Errors
    ///
    /// - `MessageError::UnknownMessageKind` for any other tag
    pub fn parse(kind: &str) -> Result<Self, MessageError> {
        match kind {
            "sms" => Ok(Self::Sms),
            "mms" => Ok(Self::Mms),
            other => Err(MessageError::UnknownMessageKind { kind: other.to_string() }),
        }
    }
}

/// Folder the transport filed the message in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageBox {
    /// Received
    Inbox,
    /// Sent successfully
    Sent,
    /// Unsent draft
    Draft,
    /// Being sent
    Outbox,
    /// Send failed
    Failed,
    /// Waiting to be sent
    Queued,
}

impl MessageBox {
    /// True for messages this device is sending or tried to send.
    pub fn is_outgoing(self) -> bool {
        matches!(self, Self::Outbox | Self::Failed | Self::Queued)
    }
}

/// Delivery report state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryStatus {
    /// No report requested
    None,
    /// A report exists but carries no delivery verdict
    Info,
    /// Delivery failed
    Failed,
    /// Delivery pending
    Pending,
    /// Delivered
    Received,
}

/// SMS status meaning "no report requested".
const SMS_STATUS_NONE: i32 = -1;

/// SMS status codes at or above this value mean failure.
const SMS_STATUS_FAILED: i32 = 64;

/// SMS status codes at or above this value (and below failure) mean pending.
const SMS_STATUS_PENDING: i32 = 32;

impl DeliveryStatus {
    /// Interpret an SMS status code.
    pub fn from_sms_status(status: i32) -> Self {
        if status == SMS_STATUS_NONE {
            Self::None
        } else if status >= SMS_STATUS_FAILED {
            Self::Failed
        } else if status >= SMS_STATUS_PENDING {
            Self::Pending
        } else {
            Self::Received
        }
    }

    /// Interpret a status code for the given transport.
    ///
    /// MMS reports only say whether a report exists.
    pub fn from_status(transport: TransportKind, status: i32) -> Self {
        match transport {
            TransportKind::Sms => Self::from_sms_status(status),
            TransportKind::Mms if status == SMS_STATUS_NONE => Self::None,
            TransportKind::Mms => Self::Info,
        }
    }
}

/// Message record as handed over by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Transport-assigned id
    pub id: MessageId,
    /// Transport type tag, `"sms"` or `"mms"`
    pub kind: String,
    /// Folder
    pub box_kind: MessageBox,
    /// Sender address
    pub sender: String,
    /// Body bytes, possibly carrying a header marker
    pub body: Vec<u8>,
    /// Transport status code, `-1` when no report was requested
    pub status: i32,
}

/// Validated inbound message. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    id: MessageId,
    transport: TransportKind,
    box_kind: MessageBox,
    sender: String,
    body: Vec<u8>,
    delivery: DeliveryStatus,
}

impl InboundMessage {
    /// Build a received SMS with no delivery report.
    pub fn sms(id: MessageId, sender: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            transport: TransportKind::Sms,
            box_kind: MessageBox::Inbox,
            sender: sender.into(),
            body: body.into(),
            delivery: DeliveryStatus::None,
        }
    }

    /// Validate a transport record.
    ///
    /// # Errors
    ///
    /// - `MessageError::UnknownMessageKind` if the type tag is not recognised
    pub fn from_raw(raw: RawMessage) -> Result<Self, MessageError> {
        let transport = TransportKind::parse(&raw.kind)?;

        Ok(Self {
            id: raw.id,
            transport,
            box_kind: raw.box_kind,
            sender: raw.sender,
            body: raw.body,
            delivery: DeliveryStatus::from_status(transport, raw.status),
        })
    }

    /// Transport-assigned id.
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Transport the message travelled over.
    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    /// Folder.
    pub fn box_kind(&self) -> MessageBox {
        self.box_kind
    }

    /// Sender address.
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Raw body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Delivery report state.
    pub fn delivery(&self) -> DeliveryStatus {
        self.delivery
    }
}

impl TryFrom<RawMessage> for InboundMessage {
    type Error = MessageError;

    fn try_from(raw: RawMessage) -> Result<Self, Self::Error> {
        Self::from_raw(raw)
    }
}
