//! Block transport: one request against one endpoint.
//!
//! The store decides which endpoint to use and what to do on failure; a
//! transport only moves bytes.

use crate::error::{GatewayError, GatewayResult};
use async_trait::async_trait;
use bytes::Bytes;
use canopy_core::Multihash;
use reqwest::Url;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;

/// Response body of `/api/v0/block/put`.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct PutResponse {
    /// Address the endpoint computed for the stored block.
    #[serde(rename = "Key")]
    pub key: String,
    /// Stored block size in bytes.
    #[serde(rename = "Size", default)]
    pub size: u64,
}

/// Raw block access against a single endpoint.
#[async_trait]
pub trait BlockTransport: Send + Sync + 'static {
    /// Fetch the encoded block stored under `address`.
    async fn get_block(&self, endpoint: &str, address: &Multihash) -> GatewayResult<Bytes>;

    /// Store an encoded block.
    async fn put_block(&self, endpoint: &str, block: Bytes) -> GatewayResult<PutResponse>;
}

/// The HTTP block API (`/api/v0/block/get`, `/api/v0/block/put`).
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> GatewayResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("canopy/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http })
    }

    /// Wrap an existing client.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    fn url(endpoint: &str, path: &str) -> GatewayResult<Url> {
        Url::parse(&format!("{}{path}", endpoint.trim_end_matches('/')))
            .map_err(|e| GatewayError::InvalidEndpoint(format!("{endpoint}: {e}")))
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> GatewayResult<Bytes> {
        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.bytes().await?)
    }
}

#[async_trait]
impl BlockTransport for HttpTransport {
    async fn get_block(&self, endpoint: &str, address: &Multihash) -> GatewayResult<Bytes> {
        let mut url = Self::url(endpoint, "/api/v0/block/get")?;
        url.query_pairs_mut()
            .append_pair("arg", &address.to_base58());
        self.send(self.http.get(url)).await
    }

    async fn put_block(&self, endpoint: &str, block: Bytes) -> GatewayResult<PutResponse> {
        let url = Self::url(endpoint, "/api/v0/block/put")?;
        let part = Part::bytes(block.to_vec()).mime_str("application/octet-stream")?;
        let form = Form::new().part("file", part);

        let body = self.send(self.http.post(url).multipart(form)).await?;
        serde_json::from_slice(&body).map_err(|e| {
            GatewayError::InvalidResponse(format!(
                "block/put: {e}: {}",
                String::from_utf8_lossy(&body)
            ))
        })
    }
}
