//! Admin API client.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use super::types::*;

const ADMIN_KEY_HEADER: &str = "X-Admin-Key";

/// Errors that can occur when talking to the admin API.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Relay rejected request ({status}): {message}")]
    Rejected {
        status: StatusCode,
        code: Option<String>,
        message: String,
    },
    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl ClientError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Rejected { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }
}

pub struct AdminClient {
    client: Client,
    base_url: String,
    key: String,
}

impl AdminClient {
    pub fn new(base_url: impl Into<String>, key: impl Into<String>) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .connect_timeout(Duration::from_secs(2))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key: key.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/admin/{}", self.base_url, path)
    }

    async fn send<R: DeserializeOwned>(&self, request: RequestBuilder) -> Result<R, ClientError> {
        let response = request
            .header(ADMIN_KEY_HEADER, &self.key)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ClientError::Connection(format!("Cannot connect to {}", self.base_url))
                } else {
                    ClientError::Http(e)
                }
            })?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let (code, message) = match serde_json::from_slice::<ErrorBody>(&body) {
                Ok(err) => (err.code, err.error),
                Err(_) => (None, String::from_utf8_lossy(&body).into_owned()),
            };
            return Err(ClientError::Rejected {
                status,
                code,
                message,
            });
        }

        serde_json::from_slice(&body).map_err(|e| ClientError::Parse(e.to_string()))
    }

    pub async fn status(&self) -> Result<IpStatus, ClientError> {
        self.send(self.client.get(self.url("ip-status"))).await
    }

    pub async fn block(&self, ip: &str) -> Result<Outcome, ClientError> {
        self.send(self.client.post(self.url("block-ip")).json(&IpRequest { ip }))
            .await
    }

    pub async fn allow(&self, ip: &str) -> Result<Outcome, ClientError> {
        self.send(self.client.post(self.url("allow-ip")).json(&IpRequest { ip }))
            .await
    }

    pub async fn remove(&self, ip: &str) -> Result<Outcome, ClientError> {
        self.send(self.client.post(self.url("remove-ip")).json(&IpRequest { ip }))
            .await
    }

    pub async fn set_mode(&self, mode: &str) -> Result<Outcome, ClientError> {
        self.send(self.client.post(self.url("ip-mode")).json(&ModeRequest { mode }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = AdminClient::new("http://127.0.0.1:3000/", "k").unwrap();
        assert_eq!(client.url("ip-status"), "http://127.0.0.1:3000/api/admin/ip-status");
    }
}
