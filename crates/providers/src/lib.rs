//! LLM Provider implementations for reagent.
//!
//! All providers implement the `reagent_core::Provider` trait.
//! The router selects the correct provider based on configuration.

pub mod anthropic;
pub mod openai_compat;
pub mod router;

use std::time::Duration;

use reagent_core::error::ProviderError;

pub use anthropic::AnthropicProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config, build_router};

/// HTTP client with a request timeout.
fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_default()
}

/// Map a non-success HTTP status to a provider error.
fn status_error(status: u16, body: &str) -> Option<ProviderError> {
    match status {
        200..=299 => None,
        429 => Some(ProviderError::RateLimited {
            retry_after_secs: 5,
        }),
        401 | 403 => Some(ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        )),
        _ => Some(ProviderError::ApiError {
            status_code: status,
            message: body.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(status_error(200, "").is_none());
        assert!(matches!(
            status_error(429, ""),
            Some(ProviderError::RateLimited { .. })
        ));
        assert!(matches!(
            status_error(403, ""),
            Some(ProviderError::AuthenticationFailed(_))
        ));
        assert!(matches!(
            status_error(500, "boom"),
            Some(ProviderError::ApiError { status_code: 500, ref message }) if message == "boom"
        ));
    }
}
