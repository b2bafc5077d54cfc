//! Control plane state machine.
//!
//! `ControlPlane` owns the registry, the classifier and the handshake
//! controller. Encrypted messages that arrive before the handshake completes
//! are held so they can be shown decrypted once it does.
//!
//! Both the held messages and the formatted cache are bounded. When either is
//! full the lowest message id, the oldest message, is dropped first. A dropped
//! held message stays on screen as awaiting the handshake and is not re-shown.
//! The caller can release messages early with [`ControlEvent::Forget`].

use std::collections::BTreeMap;

use latchkey_core::{
    BatchEntry, ClassifiedMessage, ClassifierConfig, Confirmation, CryptoCapability, Environment,
    FormattedCache, HandshakeController, InboundMessage, MessageClassifier, MessageId, RawMessage,
    Recipient, RecipientPlan, confirm, partition,
};
use latchkey_registry::{IdentityResolver, KeyId, KeyRegistry, KeyStore};

use crate::{
    error::ClientError,
    event::{ControlAction, ControlEvent, DeliveryMode},
};

/// Default cap on encrypted messages held for the handshake.
pub const DEFAULT_MAX_PENDING: usize = 256;

/// Default cap on cached classifications.
pub const DEFAULT_MAX_CACHED: usize = 1024;

/// Control plane configuration
#[derive(Debug, Clone)]
pub struct ControlConfig {
    /// Placeholder text and other classifier settings
    pub classifier: ClassifierConfig,
    /// Encrypted messages held for re-display once the handshake completes
    pub max_pending: usize,
    /// Classifications kept in the formatted cache
    pub max_cached: usize,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierConfig::default(),
            max_pending: DEFAULT_MAX_PENDING,
            max_cached: DEFAULT_MAX_CACHED,
        }
    }
}

/// Control plane for opportunistic message encryption.
///
/// # Invariants
///
/// - At most one handshake is started per `Idle -> Authenticating` transition
/// - Every message shown while not authenticated is re-shown once the
///   handshake completes
/// - A `Dispatch` action never carries an empty recipient list
/// - At most `max_pending` messages are held and `max_cached` classified
pub struct ControlPlane<S, C, R, E>
where
    S: KeyStore,
    C: CryptoCapability,
    R: IdentityResolver,
    E: Environment,
{
    /// Environment for acceptance timestamps.
    env: E,

    /// Accepted peer keys.
    registry: KeyRegistry<S>,

    /// Inbound classifier, sharing the handshake controller.
    classifier: MessageClassifier<C>,

    /// Display names for key listings.
    resolver: R,

    /// Latest classification of every displayed message.
    cache: FormattedCache<ClassifiedMessage>,

    /// Encrypted messages waiting for the handshake, by id.
    pending: BTreeMap<MessageId, InboundMessage>,

    /// Cap on `pending`.
    max_pending: usize,
}

impl<S, C, R, E> ControlPlane<S, C, R, E>
where
    S: KeyStore,
    C: CryptoCapability,
    R: IdentityResolver,
    E: Environment,
{
    /// Create a control plane with a fresh handshake controller.
    pub fn new(
        env: E,
        registry: KeyRegistry<S>,
        crypto: C,
        resolver: R,
        config: ControlConfig,
    ) -> Self {
        let handshake = HandshakeController::new();
        Self {
            env,
            registry,
            classifier: MessageClassifier::new(crypto, handshake, config.classifier),
            resolver,
            cache: FormattedCache::bounded(config.max_cached),
            pending: BTreeMap::new(),
            max_pending: config.max_pending,
        }
    }

    /// Key registry.
    pub fn registry(&self) -> &KeyRegistry<S> {
        &self.registry
    }

    /// Handshake controller. Clones share state with the control plane.
    pub fn handshake(&self) -> &HandshakeController {
        self.classifier.handshake()
    }

    /// Crypto capability.
    pub fn crypto(&self) -> &C {
        self.classifier.crypto()
    }

    /// Handle to the classification cache read by the presentation layer.
    pub fn cache(&self) -> FormattedCache<ClassifiedMessage> {
        self.cache.clone()
    }

    /// Ids of encrypted messages waiting for the handshake.
    pub fn pending_ids(&self) -> Vec<MessageId> {
        self.pending.keys().copied().collect()
    }

    /// Process an event and return resulting actions.
    pub fn handle(&mut self, event: ControlEvent) -> Result<Vec<ControlAction>, ClientError> {
        match event {
            ControlEvent::MessageReceived { message, looks_encrypted } => {
                Ok(self.handle_message(message, looks_encrypted))
            },
            ControlEvent::BatchReceived { raws } => Ok(self.handle_batch(raws)),
            ControlEvent::PrepareSend { recipients } => self.handle_prepare_send(&recipients),
            ControlEvent::ConfirmSend { plan, confirmation } => {
                Ok(Self::handle_confirm_send(&plan, &confirmation))
            },
            ControlEvent::SetEncryptIfNeeded(intent) => {
                self.handshake().set_intent(intent);
                Ok(vec![])
            },
            ControlEvent::HandshakeSucceeded => self.handle_handshake_succeeded(),
            ControlEvent::HandshakeFailed { reason } => self.handle_handshake_failed(&reason),
            ControlEvent::AcceptKey { address, key_material } => {
                self.handle_accept_key(address, &key_material)
            },
            ControlEvent::RejectKey { address } => {
                tracing::info!(peer = %address, "public key rejected");
                let message = format!("rejected public key from {address}");
                Ok(vec![ControlAction::Log { message }])
            },
            ControlEvent::ListKeys => {
                Ok(vec![ControlAction::KeysListed(self.registry.listing(&self.resolver)?)])
            },
            ControlEvent::DeleteKey { id } => self.handle_delete_key(id),
            ControlEvent::Forget { ids } => {
                self.forget(&ids);
                Ok(vec![])
            },
        }
    }

    fn handle_message(
        &mut self,
        message: InboundMessage,
        looks_encrypted: Option<bool>,
    ) -> Vec<ControlAction> {
        let classified = self.classifier.process(&message, looks_encrypted);
        self.show(message, classified)
    }

    fn handle_batch(&mut self, raws: Vec<RawMessage>) -> Vec<ControlAction> {
        let entries = self.classifier.process_batch(raws);
        let mut actions = Vec::with_capacity(entries.len());

        for entry in entries {
            match entry {
                BatchEntry::Classified { message, classified } => {
                    actions.extend(self.show(message, classified));
                },
                BatchEntry::Rejected { id, error } => {
                    let message = format!("skipped message {id}: {error}");
                    actions.push(ControlAction::Log { message });
                },
            }
        }

        actions
    }

    fn forget(&mut self, ids: &[MessageId]) {
        for id in ids {
            self.pending.remove(id);
            self.cache.invalidate(*id);
        }

        tracing::debug!(count = ids.len(), "messages forgotten");
    }

    /// Record the classification and emit display actions.
    fn show(
        &mut self,
        message: InboundMessage,
        classified: ClassifiedMessage,
    ) -> Vec<ControlAction> {
        if classified.needs_reclassify() {
            self.pending.insert(message.id(), message);

            while self.pending.len() > self.max_pending {
                let Some((dropped, _)) = self.pending.pop_first() else {
                    break;
                };
                tracing::warn!(id = %dropped, "pending limit reached, message dropped");
            }
        } else {
            self.pending.remove(&classified.id);
        }

        self.cache.insert(classified.id, classified.clone());

        let announced = classified.announced_key.clone().map(|key_material| {
            tracing::info!(peer = %classified.sender, "public key announced");
            ControlAction::KeyAnnounced { sender: classified.sender.clone(), key_material }
        });

        std::iter::once(ControlAction::Display(classified)).chain(announced).collect()
    }

    fn handle_prepare_send(
        &self,
        recipients: &[Recipient],
    ) -> Result<Vec<ControlAction>, ClientError> {
        let plan = partition(recipients, &self.registry)?;

        if plan.is_empty() {
            return Ok(vec![ControlAction::NothingToSend]);
        }

        Ok(vec![ControlAction::PresentPlan(plan)])
    }

    fn handle_confirm_send(
        plan: &RecipientPlan,
        confirmation: &Confirmation,
    ) -> Vec<ControlAction> {
        let Some(plan) = confirm(plan, confirmation) else {
            tracing::debug!("send cancelled");
            return vec![ControlAction::SendCancelled];
        };

        if plan.is_empty() {
            return vec![ControlAction::NothingToSend];
        }

        let mut actions = Vec::with_capacity(2);

        if !plan.keyed.is_empty() {
            actions.push(ControlAction::Dispatch {
                mode: DeliveryMode::Encrypted,
                recipients: plan.keyed,
            });
        }

        if !plan.unkeyed.is_empty() {
            actions.push(ControlAction::Dispatch {
                mode: DeliveryMode::Plain,
                recipients: plan.unkeyed,
            });
        }

        actions
    }

    fn handle_handshake_succeeded(&mut self) -> Result<Vec<ControlAction>, ClientError> {
        self.handshake().complete()?;

        let pending = std::mem::take(&mut self.pending);
        if pending.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<MessageId> = pending.keys().copied().collect();
        for id in &ids {
            self.cache.invalidate(*id);
        }

        tracing::debug!(count = ids.len(), "reclassifying messages after handshake");

        let mut actions = vec![ControlAction::Reclassify { ids }];
        for message in pending.into_values() {
            actions.extend(self.handle_message(message, Some(true)));
        }

        Ok(actions)
    }

    fn handle_handshake_failed(&self, reason: &str) -> Result<Vec<ControlAction>, ClientError> {
        self.handshake().abandon()?;

        tracing::warn!(reason, pending = self.pending.len(), "handshake failed");

        Ok(vec![ControlAction::Log { message: format!("handshake failed: {reason}") }])
    }

    fn handle_accept_key(
        &self,
        address: String,
        key_material: &[u8],
    ) -> Result<Vec<ControlAction>, ClientError> {
        let id = self.registry.insert(&address, key_material, self.env.wall_clock_secs())?;
        Ok(vec![ControlAction::KeyStored { id, address }])
    }

    fn handle_delete_key(&self, id: KeyId) -> Result<Vec<ControlAction>, ClientError> {
        self.registry.delete(id)?;
        Ok(vec![ControlAction::KeyDeleted { id }])
    }
}
