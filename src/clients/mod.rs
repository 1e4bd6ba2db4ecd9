//! Outbound service clients.
//!
//! # Data Flow
//! ```text
//! Caller
//!     → verification.rs / video.rs (input validation)
//!     → resilience::ResilientCall (timeout, breaker, retries)
//!     → HttpTarget (JSON over HTTP via reqwest)
//!     → Remote service
//! ```
//!
//! # Design Decisions
//! - One `ResilientCall` (and therefore one breaker) per remote service
//! - Non-2xx responses are failures and count against the breaker
//! - Local input validation never touches the breaker

pub mod verification;
pub mod video;

use futures_util::future::BoxFuture;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use url::Url;

pub use verification::VerificationClient;
pub use video::{SignedUpload, UploadRequest, VideoClient};

/// Longest response body kept in a status error.
const MAX_ERROR_BODY: usize = 256;

/// Boxed remote operation, so clients can name their `ResilientCall` type.
pub type BoxedOperation<I, O> =
    Box<dyn Fn(I) -> BoxFuture<'static, Result<O, ClientError>> + Send + Sync>;

/// Errors from a single HTTP attempt.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid base URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Base URL plus a shared HTTP client.
#[derive(Debug, Clone)]
pub struct HttpTarget {
    client: Client,
    base_url: Url,
}

impl HttpTarget {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let invalid = |reason: String| ClientError::InvalidUrl {
            url: base_url.to_string(),
            reason,
        };

        let base_url = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if base_url.scheme() != "http" && base_url.scheme() != "https" {
            return Err(invalid(format!("unsupported scheme \"{}\"", base_url.scheme())));
        }

        Ok(Self {
            client: Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Base URL with `segments` appended, each percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ClientError> {
        let response = self.client.get(self.endpoint(segments)).send().await?;
        decode(response).await
    }

    pub async fn post_json<B, T>(&self, segments: &[&str], body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.endpoint(segments))
            .json(body)
            .send()
            .await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(ClientError::Status {
            status: status.as_u16(),
            body: text.chars().take(MAX_ERROR_BODY).collect(),
        });
    }

    Ok(serde_json::from_str(&text)?)
}
