use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TutorError};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8080";

const SESSION_HEADER: &str = "X-Session-Id";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest<'a> {
    message: &'a str,
    session_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest<'a> {
    session_id: &'a str,
}

/// Reply to `/api/chat/send`.
///
/// The opening exchange reads `first_reply` and ordinary turns read `reply`;
/// the backend fills whichever it chooses, so both stay optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_reply: Option<String>,
}

/// Raw reply to `/api/chat/analyze`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub mistakes: Vec<String>,
    pub suggestions: Vec<String>,
    pub vocab_tips: Vec<String>,
}

/// The two calls the tutor backend offers
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send_message(&self, session_id: &str, message: &str) -> Result<SendResponse>;

    async fn analyze(&self, session_id: &str) -> Result<AnalyzeResponse>;
}

#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Client that abandons requests after `timeout`. Without one a stalled
    /// backend keeps the request open indefinitely.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn send_message(&self, session_id: &str, message: &str) -> Result<SendResponse> {
        let url = format!("{}/api/chat/send", self.base_url);

        let response = self
            .client
            .post(&url)
            .header(SESSION_HEADER, session_id)
            .json(&SendRequest { message, session_id })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TutorError::Status(response.status()));
        }

        let send_response: SendResponse = response.json().await?;
        tracing::debug!(?send_response, "chat send response");
        Ok(send_response)
    }

    async fn analyze(&self, session_id: &str) -> Result<AnalyzeResponse> {
        let url = format!("{}/api/chat/analyze", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&AnalyzeRequest { session_id })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TutorError::Status(response.status()));
        }

        Ok(response.json().await?)
    }
}
