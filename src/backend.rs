//! HTTP backend: the onboarding API over reqwest.
//!
//! One client serves every endpoint. It keeps a cookie jar, so the session
//! cookie set by login or OTP verification is sent on later calls such as
//! the auth check.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::config::OnboardingConfig;
use crate::error::{ConfigError, LoginError, OtpError, SubmitError, UploadError};
use crate::login::AuthApi;
use crate::registration::model::{DocumentType, LocalFile};
use crate::registration::submit::{RegisteredUser, RegistrationApi, RegistrationRequest};
use crate::registration::upload::{DocumentUploader, ProgressFn};

pub const UPLOAD_PATH: &str = "/api/v1/documents/upload";
pub const REGISTER_PATH: &str = "/api/v1/auth/register";
pub const VERIFY_OTP_PATH: &str = "/api/v1/auth/verify-otp";
pub const CHECK_AUTH_PATH: &str = "/api/v1/investor/checkAuth";
pub const LOGIN_PATH: &str = "/api/v1/auth/login";

/// Size of each body chunk handed to the transport; progress is reported
/// once per chunk.
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Pull a human-readable message out of an error response body.
///
/// Looks at `message`, then `error`, then `details`, skipping empty ones.
pub fn error_message(body: &str) -> String {
    if body.trim().is_empty() {
        return "An error occurred while processing your request".to_string();
    }
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            ["message", "error", "details"].into_iter().find_map(|key| {
                json.get(key)
                    .and_then(|v| v.as_str())
                    .filter(|m| !m.is_empty())
                    .map(str::to_string)
            })
        })
        .unwrap_or_else(|| "Unknown error occurred".to_string())
}

fn percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    ((sent.min(total) * 100) / total) as u8
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RegisterResponse {
    user: Option<RegisterResponseUser>,
}

#[derive(Debug, Deserialize)]
struct RegisterResponseUser {
    id: serde_json::Value,
}

/// reqwest-backed client for the onboarding backend.
pub struct HttpBackend {
    client: reqwest::Client,
    config: OnboardingConfig,
}

impl HttpBackend {
    pub fn new(config: &OnboardingConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Shared handle usable as every API trait at once.
    pub fn shared(config: &OnboardingConfig) -> Result<Arc<Self>, ConfigError> {
        Self::new(config).map(Arc::new)
    }

    fn url(&self, path: &str) -> String {
        self.config.endpoint(path)
    }
}

#[async_trait]
impl DocumentUploader for HttpBackend {
    async fn upload(
        &self,
        file: &LocalFile,
        document: DocumentType,
        progress: ProgressFn,
    ) -> Result<String, UploadError> {
        let bytes = file.read().await.map_err(|e| UploadError::Read {
            path: file.display_path(),
            reason: e.to_string(),
        })?;
        let total = bytes.len() as u64;
        let chunks: Vec<Vec<u8>> = bytes.chunks(UPLOAD_CHUNK_SIZE).map(<[u8]>::to_vec).collect();

        progress(0);
        let report = Arc::clone(&progress);
        let mut sent = 0u64;
        let body = futures::stream::iter(chunks).map(move |chunk| {
            sent += chunk.len() as u64;
            report(percent(sent, total));
            Ok::<_, std::io::Error>(chunk)
        });

        let part = Part::stream_with_length(reqwest::Body::wrap_stream(body), total)
            .file_name(file.file_name.clone())
            .mime_str(file.content_type())
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        let form = Form::new()
            .text("documentType", document.as_str())
            .part("file", part);

        let resp = self
            .client
            .post(self.url(UPLOAD_PATH))
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                body: error_message(&body),
            });
        }

        let parsed: UploadResponse = resp
            .json()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        parsed
            .url
            .filter(|u| !u.is_empty())
            .ok_or(UploadError::MissingUrl)
    }
}

#[async_trait]
impl RegistrationApi for HttpBackend {
    async fn register(&self, request: &RegistrationRequest) -> Result<RegisteredUser, SubmitError> {
        let resp = self
            .client
            .post(self.url(REGISTER_PATH))
            .json(request)
            .send()
            .await
            .map_err(|e| SubmitError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SubmitError::Rejected {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let parsed: RegisterResponse = resp
            .json()
            .await
            .map_err(|e| SubmitError::InvalidResponse(e.to_string()))?;
        let id = match parsed.user.map(|u| u.id) {
            Some(serde_json::Value::String(s)) if !s.is_empty() => s,
            Some(serde_json::Value::Number(n)) => n.to_string(),
            other => {
                return Err(SubmitError::InvalidResponse(format!(
                    "expected user.id, got {other:?}"
                )));
            }
        };
        Ok(RegisteredUser { id })
    }

    async fn verify_otp(&self, user_id: &str, otp: &str) -> Result<(), OtpError> {
        let body = serde_json::json!({ "userId": user_id, "otp": otp });
        let resp = self
            .client
            .post(self.url(VERIFY_OTP_PATH))
            .json(&body)
            .send()
            .await
            .map_err(|e| OtpError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OtpError::Rejected {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AuthApi for HttpBackend {
    async fn check_auth(&self) -> bool {
        let resp = match self.client.get(self.url(CHECK_AUTH_PATH)).send().await {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                debug!(status = %resp.status(), "Not authenticated");
                return false;
            }
            Err(e) => {
                debug!(error = %e, "Auth check failed; treating as not authenticated");
                return false;
            }
        };
        resp.json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| v.get("authenticated").and_then(|a| a.as_bool()))
            .unwrap_or(false)
    }

    async fn login(&self, email: &str, password: &SecretString) -> Result<(), LoginError> {
        let body = serde_json::json!({
            "email": email,
            "password": password.expose_secret(),
        });
        let resp = self
            .client
            .post(self.url(LOGIN_PATH))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                debug!(error = %e, "Login request did not get a response");
                LoginError::Unreachable
            })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(LoginError::from_status(status.as_u16(), error_message(&body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_message_then_error_then_details() {
        assert_eq!(error_message(r#"{"message":"m","error":"e"}"#), "m");
        assert_eq!(error_message(r#"{"error":"e","details":"d"}"#), "e");
        assert_eq!(error_message(r#"{"details":"d"}"#), "d");
        assert_eq!(error_message(r#"{"other":1}"#), "Unknown error occurred");
        assert_eq!(error_message("<html>oops</html>"), "Unknown error occurred");
        assert_eq!(
            error_message(""),
            "An error occurred while processing your request"
        );
    }

    #[test]
    fn empty_message_falls_through_to_error() {
        assert_eq!(error_message(r#"{"message":"","error":"Email taken"}"#), "Email taken");
        assert_eq!(error_message(r#"{"message":"","error":"","details":"d"}"#), "d");
        assert_eq!(error_message(r#"{"message":""}"#), "Unknown error occurred");
    }

    #[test]
    fn percent_is_clamped() {
        assert_eq!(percent(0, 200), 0);
        assert_eq!(percent(100, 200), 50);
        assert_eq!(percent(200, 200), 100);
        assert_eq!(percent(300, 200), 100);
        assert_eq!(percent(0, 0), 100);
    }
}
