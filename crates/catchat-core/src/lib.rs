pub mod ai;
pub mod config;
pub mod error;
pub mod gate;
pub mod links;
pub mod mode;
pub mod pipeline;
pub mod state;
pub mod store;

// Re-export main types for convenience
pub use ai::{BackendClient, Reply, ReplyRequest, ReplyStream, Responder, SimulatedResponder};
pub use config::Config;
pub use error::{ConfigError, DeliveryError, StoreError};
pub use gate::ContentGate;
pub use links::{tokenize, TextToken};
pub use mode::DeliveryMode;
pub use pipeline::{
    Completion, Delivery, DeliveryPipeline, Rejected, INTERRUPTED_MESSAGE, REGENERATE_PROMPT,
};
pub use state::{ChatMessage, ChatRole, Conversation, ConversationId, MessageId};
pub use store::{ConversationStore, StoreSnapshot};
