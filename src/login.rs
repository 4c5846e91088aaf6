//! Login screen logic and the entry-time authentication check.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use crate::error::LoginError;
use crate::registration::validation::{EMAIL_RE, MIN_PASSWORD_LEN};

pub const EMAIL_REQUIRED: &str = "Email is required";
pub const EMAIL_INVALID: &str = "Please enter a valid email address (e.g., name@example.com)";
pub const PASSWORD_REQUIRED: &str = "Password is required";
pub const PASSWORD_TOO_SHORT: &str = "Password must be at least 8 characters long";

/// Backend calls made by the login screen.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Whether the current session cookie belongs to a signed-in investor.
    async fn check_auth(&self) -> bool;

    async fn login(&self, email: &str, password: &SecretString) -> Result<(), LoginError>;
}

/// Validate one login field. Unknown names never error.
pub fn validate_login_field(name: &str, value: &str) -> Option<&'static str> {
    match name {
        "email" if value.is_empty() => Some(EMAIL_REQUIRED),
        "email" if !EMAIL_RE.is_match(value) => Some(EMAIL_INVALID),
        "password" if value.is_empty() => Some(PASSWORD_REQUIRED),
        "password" if value.chars().count() < MIN_PASSWORD_LEN => Some(PASSWORD_TOO_SHORT),
        _ => None,
    }
}

/// Email and password as typed.
#[derive(Debug, Clone)]
pub struct LoginForm {
    pub email: String,
    pub password: SecretString,
}

impl LoginForm {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into().trim().to_string(),
            password: SecretString::from(password.into()),
        }
    }

    /// Check the form before sending it. Missing fields take precedence
    /// over format problems.
    pub fn validate(&self) -> Result<(), LoginError> {
        let password = self.password.expose_secret();
        if self.email.is_empty() || password.is_empty() {
            return Err(LoginError::MissingFields);
        }
        for (name, value) in [("email", self.email.as_str()), ("password", password)] {
            if let Some(message) = validate_login_field(name, value) {
                return Err(LoginError::InvalidField(message.to_string()));
            }
        }
        Ok(())
    }
}

/// What to show a visitor arriving at the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryDecision {
    RedirectToDashboard(String),
    ShowLogin,
}

/// Drives the login screen against an [`AuthApi`].
pub struct LoginFlow {
    api: Arc<dyn AuthApi>,
    redirect_url: String,
}

impl LoginFlow {
    pub fn new(api: Arc<dyn AuthApi>, redirect_url: impl Into<String>) -> Self {
        Self {
            api,
            redirect_url: redirect_url.into(),
        }
    }

    /// Already signed in visitors skip straight to the dashboard.
    pub async fn entry(&self) -> EntryDecision {
        if self.api.check_auth().await {
            info!("Visitor already authenticated; redirecting");
            EntryDecision::RedirectToDashboard(self.redirect_url.clone())
        } else {
            EntryDecision::ShowLogin
        }
    }

    /// Validate and submit the form. Returns the redirect URL on success.
    pub async fn login(&self, form: &LoginForm) -> Result<String, LoginError> {
        form.validate()?;
        match self.api.login(&form.email, &form.password).await {
            Ok(()) => {
                info!(email = %form.email, "Login successful");
                Ok(self.redirect_url.clone())
            }
            Err(e) => {
                warn!(email = %form.email, error = %e, "Login failed");
                Err(e)
            }
        }
    }
}
