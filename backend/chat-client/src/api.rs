use reqwest::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use crate::types::{
    ConversationListing, ErrorResponse, Message, QuotationDraft, SendMessageRequest, SentMessage,
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("socket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("reconnect attempts exhausted")]
    ReconnectExhausted,
}

/// Authenticated REST client for the chat service.
#[derive(Clone)]
pub struct ChatApi {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ChatApi {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = match response.json::<ErrorResponse>().await {
            Ok(body) => body.message,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
        };
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    pub async fn list_conversations(&self) -> Result<Vec<ConversationListing>, ClientError> {
        let response = self
            .http
            .get(self.url("/conversations"))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn get_history(&self, other_user_id: Uuid) -> Result<Vec<Message>, ClientError> {
        let response = self
            .http
            .get(self.url(&format!("/history/{other_user_id}")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn send_message(
        &self,
        recipient_id: Uuid,
        content: impl Into<String>,
    ) -> Result<SentMessage, ClientError> {
        let body = SendMessageRequest {
            recipient_id,
            content: Some(content.into()),
            quotation: None,
        };
        let response = self
            .http
            .post(self.url("/send"))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn send_quotation(&self, draft: QuotationDraft) -> Result<SentMessage, ClientError> {
        let response = self
            .http
            .post(self.url("/quotation"))
            .bearer_auth(&self.token)
            .json(&draft)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn mark_read(&self, conversation_id: Uuid) -> Result<(), ClientError> {
        let response = self
            .http
            .patch(self.url(&format!("/mark-read/{conversation_id}")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let response = Self::check(response).await?;
        debug_assert_eq!(response.status(), StatusCode::NO_CONTENT);
        Ok(())
    }
}
