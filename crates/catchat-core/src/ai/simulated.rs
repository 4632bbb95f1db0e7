use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use std::time::Duration;

use super::{Reply, ReplyRequest, Responder};
use crate::error::DeliveryError;

pub const DEMO_REPLY: &str = "Here’s a sample response. This UI is ready for your backend – just replace the demo handlers with API calls. It supports multi-turn chat, quick suggestions, and a settings panel for model and temperature.";

pub const DEFAULT_CHAR_DELAY: Duration = Duration::from_millis(6);

/// Types out a fixed reply one character per tick, without any network
#[derive(Debug, Clone)]
pub struct SimulatedResponder {
    text: String,
    delay: Duration,
}

impl SimulatedResponder {
    pub fn new(text: impl Into<String>, delay: Duration) -> Self {
        Self {
            text: text.into(),
            delay,
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self::new(DEMO_REPLY, delay)
    }
}

impl Default for SimulatedResponder {
    fn default() -> Self {
        Self::new(DEMO_REPLY, DEFAULT_CHAR_DELAY)
    }
}

#[async_trait]
impl Responder for SimulatedResponder {
    async fn respond(&self, _request: &ReplyRequest) -> Result<Reply, DeliveryError> {
        let delay = self.delay;
        let chars: Vec<String> = self.text.chars().map(String::from).collect();
        let chunks = stream::iter(chars).then(move |c| async move {
            tokio::time::sleep(delay).await;
            c
        });

        Ok(Reply {
            chunks: Box::pin(chunks),
            session_id: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn yields_one_character_per_chunk_in_order() {
        let responder = SimulatedResponder::new("héllo", Duration::ZERO);
        let request = ReplyRequest {
            message: "hi".to_string(),
            session_id: None,
        };

        let reply = responder.respond(&request).await.unwrap();
        let chunks: Vec<String> = reply.chunks.collect().await;

        assert_eq!(chunks, vec!["h", "é", "l", "l", "o"]);
        assert!(reply.session_id.is_none());
    }
}
