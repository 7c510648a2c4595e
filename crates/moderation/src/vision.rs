//! External vision-moderation service client
//!
//! Images and video frames are judged by a third-party classifier over an
//! authenticated HTTP call. The failure policy is deliberate and explicit:
//! by default any transport error, non-2xx status, timeout, or malformed
//! body yields `allowed = true, fallback = true` — availability over
//! strictness. Deployments that prefer blocking on infrastructure failure
//! flip [`FailurePolicy::Closed`] in the config.

use crate::decision::{ModerationDecision, Surface};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use text_filter::Severity;
use thiserror::Error;
use tracing::warn;

/// Errors from the vision service transport
#[derive(Debug, Error)]
pub enum VisionError {
    /// Could not reach the service
    #[error("vision service unreachable: {0}")]
    Network(String),

    /// The request exceeded its time bound
    #[error("vision service timed out")]
    Timeout,

    /// The service answered with a non-success status
    #[error("vision service returned status {0}")]
    Status(u16),

    /// The response body did not match the expected shape
    #[error("malformed vision response: {0}")]
    Malformed(String),
}

/// Image to inspect: a fetchable URL or inline bytes
#[derive(Debug, Clone)]
pub enum ImageRef {
    /// Publicly fetchable URL
    Url(String),
    /// Raw image bytes, sent inline
    Bytes(Vec<u8>),
}

/// Wire request to the vision service
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionRequest {
    /// Image URL, when inspecting by reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Base64-encoded image bytes, when inspecting inline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    /// Submission surface, for the service's policy thresholds
    pub surface: Surface,
    /// Ask the service to also read text embedded in the image
    pub check_text: bool,
}

impl VisionRequest {
    fn from_image(image: &ImageRef, surface: Surface) -> Self {
        let (image_url, image_base64) = match image {
            ImageRef::Url(url) => (Some(url.clone()), None),
            ImageRef::Bytes(bytes) => (None, Some(BASE64.encode(bytes))),
        };
        Self {
            image_url,
            image_base64,
            surface,
            check_text: true,
        }
    }
}

/// Wire response from the vision service
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionResponse {
    /// The service's verdict against its policy threshold
    pub allowed: bool,
    /// Detected categories
    #[serde(default)]
    pub categories: Vec<String>,
    /// Severity of the worst detection
    #[serde(default)]
    pub severity: Option<Severity>,
    /// Service-provided reason
    #[serde(default)]
    pub reason: Option<String>,
}

/// What to do when the vision service cannot be consulted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Allow publishing on infrastructure failure (availability wins)
    #[default]
    Open,
    /// Block publishing on infrastructure failure (strictness wins)
    Closed,
}

/// Configuration for the HTTP transport
#[derive(Debug, Clone)]
pub struct VisionConfig {
    /// Service endpoint URL
    pub endpoint: String,
    /// Bearer token for the authenticated call
    pub api_key: String,
    /// Hard bound on the whole request
    pub timeout: Duration,
    /// Failure policy applied by the client
    pub failure_policy: FailurePolicy,
}

impl VisionConfig {
    /// Create a config for an endpoint and key
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(15),
            failure_policy: FailurePolicy::default(),
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the failure policy
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

/// Transport seam so tests can stub the service without a server
#[async_trait]
pub trait VisionTransport: Send + Sync {
    /// Submit one inspection request
    async fn submit(&self, request: &VisionRequest) -> Result<VisionResponse, VisionError>;
}

/// reqwest-backed transport
pub struct HttpVisionTransport {
    client: reqwest::Client,
    config: VisionConfig,
}

impl HttpVisionTransport {
    /// Build the transport; fails only if the HTTP client cannot be built
    pub fn new(config: VisionConfig) -> Result<Self, VisionError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| VisionError::Network(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl VisionTransport for HttpVisionTransport {
    async fn submit(&self, request: &VisionRequest) -> Result<VisionResponse, VisionError> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    VisionError::Timeout
                } else {
                    VisionError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(VisionError::Status(status.as_u16()));
        }

        response
            .json::<VisionResponse>()
            .await
            .map_err(|e| VisionError::Malformed(e.to_string()))
    }
}

/// Fail-open adapter over the vision transport
pub struct ImageModerationClient {
    transport: Arc<dyn VisionTransport>,
    policy: FailurePolicy,
}

impl ImageModerationClient {
    /// Wrap a transport with the given failure policy
    pub fn new(transport: Arc<dyn VisionTransport>, policy: FailurePolicy) -> Self {
        Self { transport, policy }
    }

    /// Build the production client from config
    pub fn from_config(config: VisionConfig) -> Result<Self, VisionError> {
        let policy = config.failure_policy;
        let transport = HttpVisionTransport::new(config)?;
        Ok(Self::new(Arc::new(transport), policy))
    }

    /// Inspect an image
    ///
    /// Never returns an error: infrastructure failures become fallback
    /// decisions per the configured policy, and well-formed responses pass
    /// through as genuine decisions.
    pub async fn check_image(&self, image: &ImageRef, surface: Surface) -> ModerationDecision {
        let request = VisionRequest::from_image(image, surface);

        match self.transport.submit(&request).await {
            Ok(response) => ModerationDecision {
                allowed: response.allowed,
                reason: response.reason,
                categories: response.categories,
                severity: response.severity,
                fallback: false,
            },
            Err(err) => {
                warn!(surface = surface.as_str(), error = %err, "vision check failed, applying fallback policy");
                match self.policy {
                    FailurePolicy::Open => ModerationDecision::fallback_allowed(),
                    FailurePolicy::Closed => ModerationDecision::fallback_blocked(
                        "We couldn't check this image right now. Please try again.",
                    ),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubTransport {
        result: fn() -> Result<VisionResponse, VisionError>,
    }

    #[async_trait]
    impl VisionTransport for StubTransport {
        async fn submit(&self, _request: &VisionRequest) -> Result<VisionResponse, VisionError> {
            (self.result)()
        }
    }

    fn client_with(
        result: fn() -> Result<VisionResponse, VisionError>,
        policy: FailurePolicy,
    ) -> ImageModerationClient {
        ImageModerationClient::new(Arc::new(StubTransport { result }), policy)
    }

    #[tokio::test]
    async fn test_genuine_allow_passes_through() {
        let client = client_with(
            || {
                Ok(VisionResponse {
                    allowed: true,
                    categories: vec![],
                    severity: None,
                    reason: None,
                })
            },
            FailurePolicy::Open,
        );

        let d = client
            .check_image(&ImageRef::Url("https://x/img.jpg".into()), Surface::Post)
            .await;
        assert!(d.allowed);
        assert!(d.is_genuine());
    }

    #[tokio::test]
    async fn test_genuine_block_passes_through() {
        let client = client_with(
            || {
                Ok(VisionResponse {
                    allowed: false,
                    categories: vec!["nudity".into()],
                    severity: Some(Severity::High),
                    reason: Some("explicit content".into()),
                })
            },
            FailurePolicy::Open,
        );

        let d = client.check_image(&ImageRef::Bytes(vec![1, 2, 3]), Surface::Chat).await;
        assert!(!d.allowed);
        assert!(d.is_genuine());
        assert_eq!(d.categories, vec!["nudity"]);
        assert_eq!(d.severity, Some(Severity::High));
    }

    #[tokio::test]
    async fn test_server_error_fails_open() {
        let client = client_with(|| Err(VisionError::Status(500)), FailurePolicy::Open);

        let d = client
            .check_image(&ImageRef::Url("https://x/img.jpg".into()), Surface::Post)
            .await;
        assert!(d.allowed);
        assert!(d.fallback);
    }

    #[tokio::test]
    async fn test_timeout_fails_open() {
        let client = client_with(|| Err(VisionError::Timeout), FailurePolicy::Open);

        let d = client.check_image(&ImageRef::Bytes(vec![0]), Surface::Comment).await;
        assert!(d.allowed);
        assert!(d.fallback);
    }

    #[tokio::test]
    async fn test_malformed_body_fails_open() {
        let client = client_with(
            || Err(VisionError::Malformed("missing field allowed".into())),
            FailurePolicy::Open,
        );

        let d = client.check_image(&ImageRef::Bytes(vec![0]), Surface::Post).await;
        assert!(d.allowed);
        assert!(d.fallback);
    }

    #[tokio::test]
    async fn test_fail_closed_policy_blocks() {
        let client = client_with(|| Err(VisionError::Status(503)), FailurePolicy::Closed);

        let d = client.check_image(&ImageRef::Bytes(vec![0]), Surface::Post).await;
        assert!(!d.allowed);
        assert!(d.fallback);
        assert!(d.reason.is_some());
    }

    #[test]
    fn test_request_wire_shape() {
        let req = VisionRequest::from_image(&ImageRef::Url("https://x/a.jpg".into()), Surface::Post);
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"imageUrl\":\"https://x/a.jpg\""));
        assert!(json.contains("\"checkText\":true"));
        assert!(!json.contains("imageBase64"));

        let req = VisionRequest::from_image(&ImageRef::Bytes(vec![255, 0, 128]), Surface::Chat);
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("imageBase64"));
        assert!(json.contains("\"surface\":\"chat\""));
    }

    #[test]
    fn test_response_parsing_defaults() {
        let parsed: VisionResponse = serde_json::from_str(r#"{"allowed":true}"#).unwrap();
        assert!(parsed.allowed);
        assert!(parsed.categories.is_empty());
        assert!(parsed.severity.is_none());
    }
}
