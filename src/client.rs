//! HTTP client for the tribe API, used by the follow widget.

use crate::models::{
    AddFollowerResponse, CheckFollowerResponse, ContactRequest, ContactResponse, EmailRequest,
    TribeCountResponse,
};
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server answered {status}: {message}")]
    Server {
        status: reqwest::StatusCode,
        message: String,
    },
}

#[async_trait]
pub trait TribeApi: Send + Sync {
    async fn tribe_count(&self) -> Result<u64, ClientError>;
    async fn is_follower(&self, email: &str) -> Result<bool, ClientError>;
    async fn add_follower(&self, email: &str) -> Result<AddFollowerResponse, ClientError>;
    async fn submit_contact(&self, contact: &ContactRequest) -> Result<ContactResponse, ClientError>;
}

#[derive(Debug, Clone)]
pub struct HttpTribeApi {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

impl HttpTribeApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(ErrorBody { error: Some(error) }) => error,
            _ => status.to_string(),
        };
        Err(ClientError::Server { status, message })
    }
}

#[async_trait]
impl TribeApi for HttpTribeApi {
    async fn tribe_count(&self) -> Result<u64, ClientError> {
        let response = self.client.get(self.url("/api/tribe-count")).send().await?;
        let body: TribeCountResponse = Self::decode(response).await?;
        Ok(body.count)
    }

    async fn is_follower(&self, email: &str) -> Result<bool, ClientError> {
        let response = self
            .client
            .post(self.url("/api/check-follower"))
            .json(&EmailRequest {
                email: email.to_string(),
            })
            .send()
            .await?;
        let body: CheckFollowerResponse = Self::decode(response).await?;
        Ok(body.is_follower)
    }

    async fn add_follower(&self, email: &str) -> Result<AddFollowerResponse, ClientError> {
        let response = self
            .client
            .post(self.url("/api/add-follower"))
            .json(&EmailRequest {
                email: email.to_string(),
            })
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn submit_contact(&self, contact: &ContactRequest) -> Result<ContactResponse, ClientError> {
        let response = self
            .client
            .post(self.url("/api/contact"))
            .json(contact)
            .send()
            .await?;
        Self::decode(response).await
    }
}
