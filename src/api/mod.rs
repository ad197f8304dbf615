//! Bearer-authenticated REST client for the protocol backend.
//!
//! One-shot fetches and mutations only; nothing here retries. Transient
//! failures surface to the caller, which decides whether a retry is a user
//! action (fetches) or forbidden (mutations).

use crate::error::ApiError;
use crate::protocol::{Protocol, ProtocolPage};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use std::time::Duration;

pub struct ApiClient {
    base_url: String,
    /// Pre-computed `"Bearer <token>"` header value (avoids `format!` per request).
    cached_auth_header: String,
    token: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct CreateProtocolRequest<'a> {
    intent: &'a str,
    #[serde(rename = "type")]
    protocol_type: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApproveRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    edited_content: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct RejectRequest<'a> {
    reason: &'a str,
}

impl ApiClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        let base_url = base_url.strip_suffix('/').unwrap_or(base_url).to_string();
        Self {
            base_url,
            cached_auth_header: format!("Bearer {token}"),
            token: token.to_string(),
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .connect_timeout(Duration::from_secs(10))
                .pool_max_idle_per_host(10)
                .pool_idle_timeout(Duration::from_secs(90))
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Reuse the same underlying client for the SSE transport.
    pub fn http(&self) -> Client {
        self.client.clone()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Push endpoint for one protocol. The token rides as a query parameter
    /// because the SSE transport cannot set arbitrary headers.
    pub fn stream_url(&self, protocol_id: &str) -> String {
        let mut url = format!("{}/protocols/{protocol_id}/stream", self.base_url);
        let encoded: String = url::form_urlencoded::byte_serialize(self.token.as_bytes()).collect();
        url.push_str("?token=");
        url.push_str(&encoded);
        url
    }

    // ── Reads ────────────────────────────────────────────────────────────

    pub async fn get_protocol(&self, protocol_id: &str) -> Result<Protocol, ApiError> {
        let url = format!("{}/protocols/{protocol_id}", self.base_url);
        let response = self.send(self.client.get(&url)).await?;
        Self::decode(self.check(response, Some(protocol_id)).await?).await
    }

    pub async fn list_protocols(&self, skip: u64, limit: u64) -> Result<ProtocolPage, ApiError> {
        let url = format!("{}/protocols?skip={skip}&limit={limit}", self.base_url);
        let response = self.send(self.client.get(&url)).await?;
        Self::decode(self.check(response, None).await?).await
    }

    // ── Mutations (never auto-retried) ───────────────────────────────────

    pub async fn create_protocol(
        &self,
        intent: &str,
        protocol_type: &str,
    ) -> Result<Protocol, ApiError> {
        let url = format!("{}/protocols", self.base_url);
        let body = CreateProtocolRequest {
            intent,
            protocol_type,
        };
        let response = self.send(self.client.post(&url).json(&body)).await?;
        Self::decode(self.check(response, None).await?).await
    }

    pub async fn approve(
        &self,
        protocol_id: &str,
        edited_content: Option<&str>,
    ) -> Result<Protocol, ApiError> {
        let url = format!("{}/protocols/{protocol_id}/approve", self.base_url);
        let body = ApproveRequest { edited_content };
        let response = self.send(self.client.post(&url).json(&body)).await?;
        Self::decode(self.check(response, Some(protocol_id)).await?).await
    }

    pub async fn reject(&self, protocol_id: &str, reason: &str) -> Result<Protocol, ApiError> {
        let url = format!("{}/protocols/{protocol_id}/reject", self.base_url);
        let body = RejectRequest { reason };
        let response = self.send(self.client.post(&url).json(&body)).await?;
        Self::decode(self.check(response, Some(protocol_id)).await?).await
    }

    pub async fn halt(&self, protocol_id: &str) -> Result<(), ApiError> {
        let url = format!("{}/protocols/{protocol_id}/halt", self.base_url);
        let response = self.send(self.client.post(&url)).await?;
        self.check(response, Some(protocol_id)).await?;
        Ok(())
    }

    pub async fn resume(&self, protocol_id: &str) -> Result<(), ApiError> {
        let url = format!("{}/protocols/{protocol_id}/resume", self.base_url);
        let response = self.send(self.client.post(&url)).await?;
        self.check(response, Some(protocol_id)).await?;
        Ok(())
    }

    // ── Plumbing ─────────────────────────────────────────────────────────

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        request
            .header("Authorization", &self.cached_auth_header)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))
    }

    /// Map HTTP status onto the error taxonomy. 401/403 is terminal for the
    /// session; 404 is a distinguished "does not exist" condition.
    async fn check(
        &self,
        response: Response,
        resource_id: Option<&str>,
    ) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApiError::SessionExpired),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(
                resource_id.unwrap_or("<unknown>").to_string(),
            )),
            _ => {
                let message = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<failed to read error body>".to_string());
                Err(ApiError::Status {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_trailing_slash() {
        let api = ApiClient::new("http://localhost:8000/api/", "tok");
        assert_eq!(api.base_url(), "http://localhost:8000/api");
    }

    #[test]
    fn no_trailing_slash_unchanged() {
        let api = ApiClient::new("http://localhost:8000/api", "tok");
        assert_eq!(api.base_url(), "http://localhost:8000/api");
    }

    #[test]
    fn caches_bearer_header() {
        let api = ApiClient::new("http://localhost", "secret-token");
        assert_eq!(api.cached_auth_header, "Bearer secret-token");
    }

    #[test]
    fn stream_url_carries_token_as_query_param() {
        let api = ApiClient::new("http://localhost:8000/api", "abc123");
        assert_eq!(
            api.stream_url("p-1"),
            "http://localhost:8000/api/protocols/p-1/stream?token=abc123"
        );
    }

    #[test]
    fn stream_url_encodes_token() {
        let api = ApiClient::new("http://localhost", "a+b/c=");
        let url = api.stream_url("p-1");
        assert!(url.ends_with("?token=a%2Bb%2Fc%3D"));
    }

    #[test]
    fn approve_request_omits_edited_content_when_none() {
        let body = ApproveRequest {
            edited_content: None,
        };
        assert_eq!(serde_json::to_string(&body).unwrap(), "{}");
    }

    #[test]
    fn approve_request_serializes_edited_content_camel_case() {
        let body = ApproveRequest {
            edited_content: Some("new text"),
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"editedContent\":\"new text\""));
    }

    #[test]
    fn create_request_uses_type_key() {
        let body = CreateProtocolRequest {
            intent: "fear of flying",
            protocol_type: "exposure_hierarchy",
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"type\":\"exposure_hierarchy\""));
        assert!(json.contains("\"intent\":\"fear of flying\""));
    }
}
