use async_trait::async_trait;
use futures_util::stream;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Reply, ReplyRequest, Responder};
use crate::error::DeliveryError;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:5000/api/chat";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatResponse {
    response: String,
    #[serde(default)]
    session_id: Option<String>,
}

/// Client for the remote chat endpoint. One request per message; the whole
/// answer arrives as a single chunk.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    endpoint: String,
}

impl BackendClient {
    pub fn new(endpoint: &str, timeout: Option<Duration>) -> Result<Self, DeliveryError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| DeliveryError::RequestFailed(format!("could not build http client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one message, returning the answer text and the session handle
    pub async fn query(
        &self,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<(String, Option<String>), DeliveryError> {
        let request = ChatRequest { message, session_id };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| DeliveryError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DeliveryError::Server {
                status: response.status().as_u16(),
            });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| DeliveryError::InvalidResponse(e.to_string()))?;
        Ok((chat_response.response, chat_response.session_id))
    }
}

#[async_trait]
impl Responder for BackendClient {
    async fn respond(&self, request: &ReplyRequest) -> Result<Reply, DeliveryError> {
        let (text, session_id) = self
            .query(&request.message, request.session_id.as_deref())
            .await?;

        Ok(Reply {
            chunks: Box::pin(stream::once(async move { text })),
            session_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_omits_missing_session() {
        let body = serde_json::to_value(ChatRequest {
            message: "hi",
            session_id: None,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "message": "hi" }));
    }

    #[test]
    fn request_uses_camel_case_session_key() {
        let body = serde_json::to_value(ChatRequest {
            message: "hi",
            session_id: Some("s1"),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "message": "hi", "sessionId": "s1" }));
    }

    #[test]
    fn response_decodes_session() {
        let parsed: ChatResponse =
            serde_json::from_str(r#"{"response":"X","sessionId":"s1"}"#).unwrap();
        assert_eq!(parsed.response, "X");
        assert_eq!(parsed.session_id.as_deref(), Some("s1"));
    }
}
