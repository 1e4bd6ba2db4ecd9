//! Email-verification service client.
//!
//! `GET {base_url}/api/v1/users/{user_id}/verification` → `{"verified": bool}`

use futures_util::FutureExt;
use serde::Deserialize;

use crate::clients::{BoxedOperation, ClientError, HttpTarget};
use crate::config::ServiceConfig;
use crate::resilience::{CallPolicy, ResilienceError, ResilienceResult, ResilientCall};

#[derive(Debug, Deserialize)]
struct VerificationResponse {
    verified: bool,
}

/// Asks the verification service whether a user has confirmed their email.
pub struct VerificationClient {
    call: ResilientCall<BoxedOperation<String, bool>>,
}

impl VerificationClient {
    pub const CALL_NAME: &'static str = "verification";

    pub fn new(config: &ServiceConfig) -> Result<Self, ClientError> {
        Self::with_policy(&config.base_url, config.resilience.to_policy())
    }

    pub fn with_policy(base_url: &str, policy: CallPolicy) -> Result<Self, ClientError> {
        let target = HttpTarget::new(base_url)?;
        let operation: BoxedOperation<String, bool> = Box::new(move |user_id: String| {
            let target = target.clone();
            async move {
                let response: VerificationResponse = target
                    .get_json(&["api", "v1", "users", user_id.as_str(), "verification"])
                    .await?;
                Ok::<_, ClientError>(response.verified)
            }
            .boxed()
        });

        Ok(Self {
            call: ResilientCall::new(Self::CALL_NAME, operation, policy),
        })
    }

    /// Whether `user_id` is verified, through timeout, breaker and retries.
    pub async fn is_user_verified(&self, user_id: &str) -> ResilienceResult<bool> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(ResilienceError::InvalidInput("user id must not be empty".into()));
        }
        self.call.invoke(user_id.to_string()).await
    }

    /// The guarded call, for state inspection and transition subscriptions.
    pub fn call(&self) -> &ResilientCall<BoxedOperation<String, bool>> {
        &self.call
    }
}
