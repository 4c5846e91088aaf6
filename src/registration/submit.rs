//! Registration submission: payload assembly and the single POST.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::model::{DocumentType, RegistrationState};
use super::step::{blocking_reasons, Step};
use super::store::ErrorMap;
use super::validation::parse_date_of_birth;
use crate::error::{OtpError, SubmitError};
use crate::session::UserIdStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressPayload {
    pub line1: String,
    pub line2: String,
    pub city: String,
    pub pincode: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityPayload {
    pub pan_number: String,
    pub aadhar_number: String,
    pub pan_attachment: String,
    pub aadhar_front: String,
    pub aadhar_back: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankPayload {
    pub bank_account_number: String,
    pub ifsc_code: String,
    pub bank_branch_name: String,
    pub bank_proof: String,
}

/// Body of `POST /api/v1/auth/register`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub referral_code: String,
    pub mobile_number: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// ISO-8601 UTC midnight, e.g. `1990-01-15T00:00:00.000Z`.
    pub date_of_birth: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub address: AddressPayload,
    pub bank_details: BankPayload,
    pub identity_details: IdentityPayload,
}

impl std::fmt::Debug for RegistrationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationRequest")
            .field("email", &self.email)
            .field("mobile_number", &self.mobile_number)
            .field("date_of_birth", &self.date_of_birth)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

/// Format a date as the ISO-8601 timestamp of its UTC midnight.
pub fn iso_date_of_birth(dob: NaiveDate) -> String {
    dob.format("%Y-%m-%dT00:00:00.000Z").to_string()
}

fn uploaded_url(
    state: &RegistrationState,
    document: DocumentType,
) -> Result<String, SubmitError> {
    state
        .attachment(document)
        .uploaded_url()
        .map(str::to_string)
        .ok_or_else(|| SubmitError::NotReady {
            reasons: vec![format!("{} has not been uploaded", document.label())],
        })
}

impl RegistrationRequest {
    /// Build the request from a completed record, using uploaded URLs for
    /// every document.
    pub fn from_state(state: &RegistrationState) -> Result<Self, SubmitError> {
        let dob = parse_date_of_birth(&state.date_of_birth)
            .ok_or_else(|| SubmitError::InvalidDateOfBirth(state.date_of_birth.clone()))?;

        Ok(Self {
            referral_code: state.referral_code.trim().to_string(),
            mobile_number: state.mobile_number.clone(),
            email: state.email.trim().to_string(),
            first_name: state.first_name.clone(),
            last_name: state.last_name.clone(),
            date_of_birth: iso_date_of_birth(dob),
            password: state
                .credentials
                .as_ref()
                .map(|c| c.password.expose_secret().to_string()),
            address: AddressPayload {
                line1: state.address.line1.trim().to_string(),
                line2: state.address.line2.trim().to_string(),
                city: state.address.city.trim().to_string(),
                pincode: state.address.pincode.clone(),
            },
            bank_details: BankPayload {
                bank_account_number: state.bank_details.bank_account_number.clone(),
                ifsc_code: state.bank_details.ifsc_code.clone(),
                bank_branch_name: state.bank_details.bank_branch_name.trim().to_string(),
                bank_proof: uploaded_url(state, DocumentType::BankProof)?,
            },
            identity_details: IdentityPayload {
                pan_number: state.identity_details.pan_number.clone(),
                aadhar_number: state.identity_details.aadhar_number.clone(),
                pan_attachment: uploaded_url(state, DocumentType::PanAttachment)?,
                aadhar_front: uploaded_url(state, DocumentType::AadharFront)?,
                aadhar_back: uploaded_url(state, DocumentType::AadharBack)?,
            },
        })
    }
}

/// The user created by a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredUser {
    pub id: String,
}

/// Backend calls made by the registration flow.
#[async_trait]
pub trait RegistrationApi: Send + Sync {
    async fn register(&self, request: &RegistrationRequest) -> Result<RegisteredUser, SubmitError>;

    async fn verify_otp(&self, user_id: &str, otp: &str) -> Result<(), OtpError>;
}

/// Checks preconditions, posts the registration once, stores the user id.
pub struct RegistrationSubmitter {
    api: Arc<dyn RegistrationApi>,
    session: Arc<dyn UserIdStore>,
}

impl RegistrationSubmitter {
    pub fn new(api: Arc<dyn RegistrationApi>, session: Arc<dyn UserIdStore>) -> Self {
        Self { api, session }
    }

    /// Everything that must hold before submitting: every step is complete,
    /// which covers all four documents carrying uploaded URLs. Earlier
    /// steps are re-checked since their fields may have changed since.
    pub fn readiness(
        state: &RegistrationState,
        errors: &ErrorMap,
        today: NaiveDate,
    ) -> Vec<String> {
        Step::ALL
            .into_iter()
            .flat_map(|step| blocking_reasons(step, state, errors, today))
            .collect()
    }

    /// Submit the registration. There is no automatic retry.
    ///
    /// Once the backend accepts the registration the call succeeds even if
    /// the user id cannot be persisted; the caller keeps the returned id.
    pub async fn submit(
        &self,
        state: &RegistrationState,
        errors: &ErrorMap,
        today: NaiveDate,
    ) -> Result<RegisteredUser, SubmitError> {
        let reasons = Self::readiness(state, errors, today);
        if !reasons.is_empty() {
            return Err(SubmitError::NotReady { reasons });
        }

        let request = RegistrationRequest::from_state(state)?;
        let user = match self.api.register(&request).await {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "Registration request failed");
                return Err(e);
            }
        };

        if let Err(e) = self.session.save(&user.id).await {
            warn!(user_id = %user.id, error = %e, "Could not persist user id; keeping it in memory");
        }
        info!(user_id = %user.id, "Registration accepted; awaiting OTP verification");
        Ok(user)
    }
}
