use crate::state::ConversationId;

/// Chat text shown when the backend could not be reached at all
pub const REQUEST_FAILED_MESSAGE: &str = "Request failed. Please check your connection and try again.";

/// Chat text shown when the backend answered with an error
pub const SERVER_ERROR_MESSAGE: &str = "Unfortunately, an error occurred on the server. Please try again later.";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unknown conversation: {0}")]
    UnknownConversation(ConversationId),
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("server responded with status {status}")]
    Server { status: u16 },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl DeliveryError {
    /// The assistant message that replaces the reply for this failure
    pub fn chat_message(&self) -> &'static str {
        match self {
            DeliveryError::RequestFailed(_) => REQUEST_FAILED_MESSAGE,
            DeliveryError::Server { .. } | DeliveryError::InvalidResponse(_) => {
                SERVER_ERROR_MESSAGE
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid blocked term: {0}")]
    Blocklist(#[from] regex::Error),
    #[error("unknown delivery mode: {0}")]
    UnknownMode(String),
    #[error("chat backend: {0}")]
    Backend(#[from] DeliveryError),
}
