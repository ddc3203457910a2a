use std::time::Duration;

use serde_json::json;
use tracing::{debug, info, warn};

use configs::GeneratorConfig;

use super::retry::{GenerateError, RetryPolicy};
use crate::errors::ServiceError;

/// Result of a successful upstream generation call.
#[derive(Clone, Debug)]
pub struct GeneratedImage {
    pub url: String,
    pub content: String,
}

/// Client for the chat/completions-style image generation endpoint.
pub struct GeneratorClient {
    http: reqwest::Client,
    api_key: String,
    api_base_url: String,
    model: String,
    retry: RetryPolicy,
    configured: bool,
}

impl GeneratorClient {
    pub fn from_config(cfg: &GeneratorConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        if !cfg.is_configured() {
            warn!("generator api key not configured; worker will produce mock results");
        }
        Ok(Self {
            http,
            api_key: cfg.api_key.clone(),
            api_base_url: cfg.api_base_url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            retry: RetryPolicy::new(cfg.max_retries, Duration::from_secs(1), Duration::from_secs(16)),
            configured: cfg.is_configured(),
        })
    }

    /// Whether a real upstream key is present. When false the worker writes a
    /// deterministic mock image instead of calling this client.
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Call the upstream API, retrying transient failures with backoff.
    pub async fn generate(
        &self,
        prompt: &str,
        width: i32,
        height: i32,
        style: Option<&str>,
    ) -> Result<GeneratedImage, ServiceError> {
        if !self.configured {
            return Err(ServiceError::Upstream("generator api key not configured".into()));
        }
        info!(size = %format!("{width}x{height}"), "generating image upstream");

        let url = format!("{}/chat/completions", self.api_base_url);
        let mut image_gen = json!({
            "prompt": prompt,
            "width": width,
            "height": height,
        });
        if let Some(style) = style {
            image_gen["style"] = json!(style);
        }
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "stream": false,
            "extra_body": { "image_gen": image_gen },
        });

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            debug!(attempt, "calling generation endpoint");
            match self.attempt(&url, &body).await {
                Ok(image) => {
                    info!(attempt, "upstream generation succeeded");
                    return Ok(image);
                }
                Err(e) if self.retry.should_retry(attempt, &e) => {
                    warn!(attempt, error = %e, "upstream attempt failed; retrying");
                    self.retry.wait_before_retry(attempt).await;
                }
                Err(e) => return Err(ServiceError::Upstream(e.to_string())),
            }
        }
    }

    async fn attempt(&self, url: &str, body: &serde_json::Value) -> Result<GeneratedImage, GenerateError> {
        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(GenerateError::from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let msg = format!("generation endpoint returned {status}: {text}");
            return if status.is_server_error() {
                Err(GenerateError::retryable(msg))
            } else {
                Err(GenerateError::non_retryable(msg))
            };
        }

        let payload: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| GenerateError::non_retryable(format!("invalid response body: {e}")))?;
        Self::parse_response(&payload)
    }

    /// Extract the image URL from a chat/completions-shaped payload:
    /// `choices[0].message.image_url` preferred, content carried alongside.
    fn parse_response(payload: &serde_json::Value) -> Result<GeneratedImage, GenerateError> {
        let message = payload
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .ok_or_else(|| GenerateError::non_retryable("response has no choices".into()))?;
        let content = message
            .get("content")
            .and_then(|c| c.as_str())
            .unwrap_or_default()
            .to_string();
        let url = message
            .get("image_url")
            .and_then(|u| u.as_str())
            .map(str::to_string)
            .or_else(|| {
                // Some deployments return the URL as the whole content field.
                content
                    .starts_with("http")
                    .then(|| content.clone())
            })
            .ok_or_else(|| GenerateError::non_retryable("response carries no image url".into()))?;
        Ok(GeneratedImage { url, content })
    }

    /// Cheap connectivity probe used by the status endpoint.
    pub async fn test_connection(&self) -> bool {
        if !self.configured {
            return false;
        }
        match self.generate("connectivity probe", 128, 128, None).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "generator connectivity probe failed");
                false
            }
        }
    }
}
