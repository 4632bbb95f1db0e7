//! Reply producers that fill in the assistant message of a delivery.

use async_trait::async_trait;
use futures_util::stream::Stream;
use std::pin::Pin;

use crate::error::DeliveryError;

pub mod backend;
pub mod simulated;

pub use backend::BackendClient;
pub use simulated::SimulatedResponder;

/// Text chunks applied, in order, to the reply being filled in
pub type ReplyStream = Pin<Box<dyn Stream<Item = String> + Send + 'static>>;

/// What a responder is asked to answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyRequest {
    pub message: String,
    pub session_id: Option<String>,
}

pub struct Reply {
    pub chunks: ReplyStream,
    /// Session handle to remember for the next request in this conversation
    pub session_id: Option<String>,
}

#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, request: &ReplyRequest) -> Result<Reply, DeliveryError>;
}
