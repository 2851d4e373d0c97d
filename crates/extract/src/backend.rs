use thiserror::Error;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Inference backend unreachable: {0}")]
    Unavailable(String),
    #[error("Inference request timed out")]
    Timeout,
    #[error("Inference backend error: {0}")]
    Backend(String),
}

/// Abstraction over a text-generation backend.
/// Implementations accept a prompt and return the model's free-text reply.
/// Every failure mode is recovered by the extraction pipeline as "the
/// generative stage yielded nothing" — callers never see these errors.
pub trait InferenceBackend: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, InferenceError>;
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a pre-set response — useful for unit testing the extraction
/// pipeline without a model runtime on the machine.
pub struct MockBackend {
    pub response: String,
}

impl MockBackend {
    pub fn new(response: impl Into<String>) -> Self {
        Self { response: response.into() }
    }
}

impl InferenceBackend for MockBackend {
    fn generate(&self, _prompt: &str) -> Result<String, InferenceError> {
        Ok(self.response.clone())
    }
}

/// Fails every call — models an unreachable backend in tests.
pub struct UnavailableBackend;

impl InferenceBackend for UnavailableBackend {
    fn generate(&self, _prompt: &str) -> Result<String, InferenceError> {
        Err(InferenceError::Unavailable("no backend configured".into()))
    }
}

// ── Ollama backend (optional, gated behind `ollama` feature) ──────────────────

#[cfg(feature = "ollama")]
pub mod ollama_backend {
    use super::{InferenceBackend, InferenceError};
    use std::time::Duration;

    /// Client for a local Ollama-compatible `/api/generate` endpoint.
    ///
    /// Generation options mirror the deployed model configuration: 256-token
    /// cap, temperature 0.1 and a fixed seed, so field extraction stays
    /// near-deterministic.
    pub struct OllamaBackend {
        client: reqwest::blocking::Client,
        base_url: String,
        model: String,
    }

    impl OllamaBackend {
        pub fn new(
            base_url: &str,
            model: &str,
            timeout: Duration,
        ) -> Result<Self, InferenceError> {
            let client = reqwest::blocking::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| InferenceError::Backend(e.to_string()))?;
            Ok(Self {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
                model: model.to_string(),
            })
        }
    }

    impl InferenceBackend for OllamaBackend {
        fn generate(&self, prompt: &str) -> Result<String, InferenceError> {
            let body = serde_json::json!({
                "model": self.model,
                "prompt": prompt,
                "stream": false,
                "options": {
                    "num_predict": 256,
                    "temperature": 0.1,
                    "seed": 42,
                },
            });

            let response = self
                .client
                .post(format!("{}/api/generate", self.base_url))
                .json(&body)
                .send()
                .map_err(|e| {
                    if e.is_timeout() {
                        InferenceError::Timeout
                    } else if e.is_connect() {
                        InferenceError::Unavailable(e.to_string())
                    } else {
                        InferenceError::Backend(e.to_string())
                    }
                })?;

            let payload: serde_json::Value = response
                .json()
                .map_err(|e| InferenceError::Backend(e.to_string()))?;

            payload
                .get("response")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or_else(|| {
                    InferenceError::Backend("missing 'response' field in reply".to_string())
                })
        }
    }
}
