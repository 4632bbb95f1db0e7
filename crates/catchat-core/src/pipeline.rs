//! Turns one outbound user message into a completed exchange.
//!
//! [`DeliveryPipeline::prepare`] runs the synchronous part (validate, gate,
//! optimistic append, placeholder) and captures the target conversation.
//! [`Delivery::run`] fills the placeholder and finalizes. Frontends spawn
//! `run` so they can keep rendering while the reply streams in.

use futures_util::StreamExt;
use std::sync::Arc;

use crate::ai::{ReplyRequest, Responder};
use crate::error::{DeliveryError, StoreError};
use crate::gate::ContentGate;
use crate::state::{ChatMessage, ConversationId};
use crate::store::ConversationStore;

/// Instruction sent by the "regenerate" action. It is posted as a new turn;
/// earlier messages are left untouched.
pub const REGENERATE_PROMPT: &str = "Please regenerate your last response but be concise.";

/// Written into a reply placeholder that was abandoned before any text arrived
pub const INTERRUPTED_MESSAGE: &str = "The reply was interrupted. Please try again.";

/// Why a send did not start a delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejected {
    /// Input was empty or whitespace only; nothing changed
    Empty,
    /// The content gate refused the message; a notice was posted
    Blocked,
    /// The conversation is still receiving a reply; nothing changed
    Busy,
    /// The conversation disappeared before the send could be recorded
    Unavailable,
}

/// Terminal state of a delivery that was started
#[derive(Debug)]
pub enum Completion {
    /// The reply was filled in
    Complete,
    /// The reply was replaced by the failure notice
    Failed(DeliveryError),
    /// The conversation was deleted while its reply was in flight
    Abandoned,
}

pub struct DeliveryPipeline {
    store: Arc<ConversationStore>,
    gate: ContentGate,
    responder: Arc<dyn Responder>,
}

impl DeliveryPipeline {
    pub fn new(
        store: Arc<ConversationStore>,
        gate: ContentGate,
        responder: Arc<dyn Responder>,
    ) -> Self {
        Self {
            store,
            gate,
            responder,
        }
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    pub fn gate(&self) -> &ContentGate {
        &self.gate
    }

    /// Record an outbound message on the active conversation.
    ///
    /// On success the input buffer is emptied and the returned [`Delivery`]
    /// is bound to the conversation that was active at this moment.
    #[must_use = "dropping the delivery finalizes the reply as interrupted"]
    pub fn prepare(&self, input: &mut String) -> Result<Delivery, Rejected> {
        if input.trim().is_empty() {
            return Err(Rejected::Empty);
        }

        let conversation = self.store.active_id();
        match self.try_prepare(conversation, input) {
            Ok(outcome) => outcome,
            Err(StoreError::UnknownConversation(id)) => {
                tracing::warn!(conversation = %id, "conversation vanished before send");
                Err(Rejected::Unavailable)
            }
        }
    }

    /// Ask for the previous answer again, as a new turn
    #[must_use = "dropping the delivery finalizes the reply as interrupted"]
    pub fn regenerate(&self) -> Result<Delivery, Rejected> {
        let mut instruction = REGENERATE_PROMPT.to_string();
        self.prepare(&mut instruction)
    }

    /// Prepare and run to completion in one call
    pub async fn send(&self, text: &str) -> Result<Completion, Rejected> {
        let mut input = text.to_string();
        let delivery = self.prepare(&mut input)?;
        Ok(delivery.run().await)
    }

    fn try_prepare(
        &self,
        conversation: ConversationId,
        input: &mut String,
    ) -> Result<Result<Delivery, Rejected>, StoreError> {
        // Holding the streaming flag keeps the reply placeholder the last
        // message until this send is finalized.
        if !self.store.try_begin_streaming(conversation)? {
            tracing::debug!(conversation = %conversation, "send ignored while reply is streaming");
            return Ok(Err(Rejected::Busy));
        }

        if self.gate.should_block(input) {
            tracing::debug!(conversation = %conversation, "message blocked by content gate");
            let posted = self.store.append_message(
                conversation,
                ChatMessage::assistant(self.gate.blocked_reason()),
            );
            if let Err(err) = self.store.finish_streaming(conversation) {
                tracing::debug!(conversation = %conversation, error = %err, "could not clear streaming after block");
            }
            posted?;
            return Ok(Err(Rejected::Blocked));
        }

        let text = std::mem::take(input);
        let appended = self
            .store
            .append_message(conversation, ChatMessage::user(text.clone()))
            .and_then(|_| {
                self.store
                    .append_message(conversation, ChatMessage::assistant(""))
            });
        if let Err(err) = appended {
            *input = text;
            if let Err(err) = self.store.finish_streaming(conversation) {
                tracing::debug!(conversation = %conversation, error = %err, "could not clear streaming after failed send");
            }
            return Err(err);
        }

        let session_id = self
            .store
            .conversation(conversation)
            .and_then(|c| c.session_id.clone());

        tracing::info!(conversation = %conversation, chars = text.chars().count(), "message sent");

        Ok(Ok(Delivery {
            store: Arc::clone(&self.store),
            responder: Arc::clone(&self.responder),
            conversation,
            request: ReplyRequest {
                message: text,
                session_id,
            },
            finalized: false,
        }))
    }
}

/// The asynchronous half of one send, bound to a conversation by id.
///
/// Dropping it before [`Delivery::run`] finishes (cancelled task, timeout,
/// never started) clears the streaming flag, and an empty placeholder gets
/// [`INTERRUPTED_MESSAGE`].
#[must_use = "a delivery does nothing unless `run` is awaited"]
pub struct Delivery {
    store: Arc<ConversationStore>,
    responder: Arc<dyn Responder>,
    conversation: ConversationId,
    request: ReplyRequest,
    finalized: bool,
}

impl Delivery {
    pub fn conversation_id(&self) -> ConversationId {
        self.conversation
    }

    pub fn request(&self) -> &ReplyRequest {
        &self.request
    }

    /// Fill the placeholder reply and clear the streaming flag. Every failure
    /// ends up as chat text; nothing is returned as an error.
    pub async fn run(mut self) -> Completion {
        let id = self.conversation;

        let completion = match self.responder.respond(&self.request).await {
            Ok(mut reply) => {
                if let Some(session_id) = reply.session_id.as_deref() {
                    if self.store.set_session_id(id, session_id).is_err() {
                        self.finalized = true;
                        return Completion::Abandoned;
                    }
                }

                let mut completion = Completion::Complete;
                while let Some(chunk) = reply.chunks.next().await {
                    if self.store.update_last_message_content(id, &chunk).is_err() {
                        completion = Completion::Abandoned;
                        break;
                    }
                }
                completion
            }
            Err(err) => {
                tracing::warn!(conversation = %id, error = %err, "reply failed");
                match self.store.update_last_message_content(id, err.chat_message()) {
                    Ok(()) => Completion::Failed(err),
                    Err(_) => Completion::Abandoned,
                }
            }
        };

        self.finalized = true;
        match self.store.finish_streaming(id) {
            Ok(()) => tracing::info!(conversation = %id, ?completion, "reply finished"),
            Err(_) => tracing::debug!(conversation = %id, "conversation deleted during reply"),
        }

        completion
    }
}

impl Drop for Delivery {
    fn drop(&mut self) {
        if self.finalized {
            return;
        }

        let id = self.conversation;
        if self.store.last_message_content(id).as_deref() == Some("") {
            if let Err(err) = self.store.update_last_message_content(id, INTERRUPTED_MESSAGE) {
                tracing::debug!(conversation = %id, error = %err, "could not mark reply interrupted");
            }
        }
        match self.store.finish_streaming(id) {
            Ok(()) => tracing::info!(conversation = %id, "reply interrupted"),
            Err(_) => tracing::debug!(conversation = %id, "conversation deleted before reply finished"),
        }
    }
}
