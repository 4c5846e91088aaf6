//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Largest document the upload adapter accepts (5 MB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// Default HTTP request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Minimum age, in whole years, for opening an account.
pub const MINIMUM_AGE_YEARS: u32 = 18;

/// Onboarding client configuration.
#[derive(Debug, Clone)]
pub struct OnboardingConfig {
    /// Backend base URL, e.g. `https://api.example.com`. No trailing slash.
    pub backend_url: String,
    /// Where the user lands after login or OTP verification.
    pub redirect_url: String,
    /// Per-document upload size limit in bytes.
    pub max_upload_bytes: u64,
    /// Timeout applied to every backend request.
    pub http_timeout: Duration,
    /// File holding the user id returned by registration.
    pub user_id_path: PathBuf,
    /// Whether step 1 also collects a password and its confirmation.
    pub collect_credentials: bool,
}

impl OnboardingConfig {
    /// Build a config with defaults for everything except the two URLs.
    pub fn new(backend_url: impl Into<String>, redirect_url: impl Into<String>) -> Self {
        Self {
            backend_url: backend_url.into().trim_end_matches('/').to_string(),
            redirect_url: redirect_url.into(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            user_id_path: default_user_id_path(),
            collect_credentials: false,
        }
    }

    /// Load configuration from `ONBOARDING_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup, e.g. the process env.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &str| lookup(key).ok_or_else(|| ConfigError::MissingEnvVar(key.into()));
        let backend_url = required("ONBOARDING_BACKEND_URL")?;
        let redirect_url = required("ONBOARDING_REDIRECT_URL")?;

        if !backend_url.starts_with("http://") && !backend_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                key: "ONBOARDING_BACKEND_URL".into(),
                message: format!("expected an http(s) URL, got {backend_url:?}"),
            });
        }

        let mut config = Self::new(backend_url, redirect_url);

        if let Some(raw) = lookup("ONBOARDING_MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = parse_number("ONBOARDING_MAX_UPLOAD_BYTES", &raw)?;
        }

        if let Some(raw) = lookup("ONBOARDING_HTTP_TIMEOUT_SECS") {
            config.http_timeout =
                Duration::from_secs(parse_number("ONBOARDING_HTTP_TIMEOUT_SECS", &raw)?);
        }

        if let Some(path) = lookup("ONBOARDING_USER_ID_PATH") {
            config.user_id_path = PathBuf::from(path);
        }

        config.collect_credentials = lookup("ONBOARDING_COLLECT_CREDENTIALS")
            .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(config)
    }

    /// Absolute URL for a backend API path such as `/api/v1/auth/login`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.backend_url, path)
    }
}

fn parse_number(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.into(),
        message: format!("not a non-negative integer: {raw:?}"),
    })
}

fn default_user_id_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".wealth-onboarding/user_id")
}
