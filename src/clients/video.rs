//! Video service client.
//!
//! `POST {base_url}/api/v1/uploads/signed-url` with an [`UploadRequest`] body,
//! answered by a [`SignedUpload`].

use futures_util::FutureExt;
use serde::{Deserialize, Serialize};

use crate::clients::{BoxedOperation, ClientError, HttpTarget};
use crate::config::ServiceConfig;
use crate::resilience::{CallPolicy, ResilienceError, ResilienceResult, ResilientCall};

/// File the caller wants to upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRequest {
    pub file_name: String,
    pub content_type: String,
}

impl UploadRequest {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
        }
    }

    fn validate(&self) -> Result<(), ResilienceError> {
        if self.file_name.trim().is_empty() {
            return Err(ResilienceError::InvalidInput("file name must not be empty".into()));
        }
        if self.content_type.trim().is_empty() {
            return Err(ResilienceError::InvalidInput("content type must not be empty".into()));
        }
        Ok(())
    }
}

/// Pre-signed upload location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedUpload {
    pub url: String,
    /// Expiry, seconds since the Unix epoch.
    pub expires_at: u64,
}

/// Obtains signed upload URLs from the video service.
pub struct VideoClient {
    call: ResilientCall<BoxedOperation<UploadRequest, SignedUpload>>,
}

impl VideoClient {
    pub const CALL_NAME: &'static str = "video";

    pub fn new(config: &ServiceConfig) -> Result<Self, ClientError> {
        Self::with_policy(&config.base_url, config.resilience.to_policy())
    }

    pub fn with_policy(base_url: &str, policy: CallPolicy) -> Result<Self, ClientError> {
        let target = HttpTarget::new(base_url)?;
        let operation: BoxedOperation<UploadRequest, SignedUpload> =
            Box::new(move |request: UploadRequest| {
                let target = target.clone();
                async move {
                    let upload: SignedUpload = target
                        .post_json(&["api", "v1", "uploads", "signed-url"], &request)
                        .await?;
                    Ok::<_, ClientError>(upload)
                }
                .boxed()
            });

        Ok(Self {
            call: ResilientCall::new(Self::CALL_NAME, operation, policy),
        })
    }

    /// Request a signed upload URL, through timeout, breaker and retries.
    pub async fn signed_upload_url(
        &self,
        request: UploadRequest,
    ) -> ResilienceResult<SignedUpload> {
        request.validate()?;
        self.call.invoke(request).await
    }

    /// The guarded call, for state inspection and transition subscriptions.
    pub fn call(&self) -> &ResilientCall<BoxedOperation<UploadRequest, SignedUpload>> {
        &self.call
    }
}
