//! OTP verification: the last hop after a successful registration.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::submit::RegistrationApi;
use crate::error::OtpError;
use crate::session::UserIdStore;

static OTP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{6}$").unwrap());

/// A syntactically valid six-digit code. The backend decides whether it
/// is the right one.
#[derive(Clone, PartialEq, Eq)]
pub struct OtpCode(String);

impl OtpCode {
    pub fn parse(raw: &str) -> Result<Self, OtpError> {
        let code = raw.trim();
        if OTP_RE.is_match(code) {
            Ok(Self(code.to_string()))
        } else {
            Err(OtpError::InvalidCode)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("OtpCode(******)")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpState {
    #[default]
    AwaitingCode,
    Verified,
}

/// Two-state verifier: `AwaitingCode` until the backend accepts a code.
pub struct OtpVerifier {
    state: OtpState,
    api: Arc<dyn RegistrationApi>,
    session: Arc<dyn UserIdStore>,
    /// Id from this process's registration; preferred over the stored one.
    known_user_id: Option<String>,
    redirect_url: String,
}

impl OtpVerifier {
    pub fn new(
        api: Arc<dyn RegistrationApi>,
        session: Arc<dyn UserIdStore>,
        redirect_url: impl Into<String>,
    ) -> Self {
        Self {
            state: OtpState::AwaitingCode,
            api,
            session,
            known_user_id: None,
            redirect_url: redirect_url.into(),
        }
    }

    pub fn state(&self) -> OtpState {
        self.state
    }

    /// Remember the id returned by registration, so verification works
    /// even when it could not be persisted.
    pub fn remember_user(&mut self, user_id: impl Into<String>) {
        self.known_user_id = Some(user_id.into());
    }

    /// Verify a code. On success returns the URL to redirect to.
    ///
    /// Failures leave the verifier in `AwaitingCode` so the user can retry.
    pub async fn verify(&mut self, raw_code: &str) -> Result<String, OtpError> {
        if self.state != OtpState::AwaitingCode {
            return Err(OtpError::NotAwaiting);
        }
        let code = OtpCode::parse(raw_code)?;
        let user_id = match &self.known_user_id {
            Some(id) => id.clone(),
            None => self
                .session
                .load()
                .await?
                .ok_or(OtpError::MissingUserId)?,
        };

        if let Err(e) = self.api.verify_otp(&user_id, code.as_str()).await {
            warn!(user_id = %user_id, error = %e, "OTP verification failed");
            return Err(e);
        }

        self.state = OtpState::Verified;
        info!(user_id = %user_id, "OTP verified");
        Ok(self.redirect_url.clone())
    }
}
