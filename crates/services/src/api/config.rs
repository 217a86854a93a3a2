use std::env;

use thiserror::Error;
use url::Url;

/// Errors raised while building an [`ExamApiConfig`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiConfigError {
    #[error("invalid API base url {raw:?}: {source}")]
    InvalidBaseUrl {
        raw: String,
        source: url::ParseError,
    },

    #[error("API bearer token is empty")]
    EmptyToken,
}

/// Connection settings for the Eduprayas REST backend.
///
/// The bearer credential is passed in explicitly at construction; nothing in
/// the session core reads it from ambient storage.
#[derive(Clone, Debug)]
pub struct ExamApiConfig {
    base_url: String,
    bearer_token: String,
}

impl ExamApiConfig {
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:5002";

    /// Builds a config, validating the base URL and rejecting blank tokens.
    ///
    /// # Errors
    ///
    /// Returns `ApiConfigError::InvalidBaseUrl` when the URL does not parse
    /// and `ApiConfigError::EmptyToken` for a blank credential.
    pub fn new(
        base_url: impl Into<String>,
        bearer_token: impl Into<String>,
    ) -> Result<Self, ApiConfigError> {
        let base_url = base_url.into();
        Url::parse(&base_url).map_err(|source| ApiConfigError::InvalidBaseUrl {
            raw: base_url.clone(),
            source,
        })?;

        let bearer_token = bearer_token.into();
        if bearer_token.trim().is_empty() {
            return Err(ApiConfigError::EmptyToken);
        }

        Ok(Self {
            base_url,
            bearer_token,
        })
    }

    /// Reads `EDUPRAYAS_API_TOKEN` and `EDUPRAYAS_API_BASE_URL`.
    ///
    /// Returns `None` when no usable token is configured; the base URL falls
    /// back to [`Self::DEFAULT_BASE_URL`].
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let token = env::var("EDUPRAYAS_API_TOKEN").ok()?;
        let base_url = env::var("EDUPRAYAS_API_BASE_URL")
            .unwrap_or_else(|_| Self::DEFAULT_BASE_URL.to_string());
        Self::new(base_url, token).ok()
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn bearer_token(&self) -> &str {
        &self.bearer_token
    }

    /// Joins `path` onto the base URL, normalizing slashes.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
