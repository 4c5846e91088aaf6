//! Form state store: the registration record plus its error map.

use std::collections::BTreeMap;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::field::{Field, Section};
use super::model::{
    AddressPatch, Attachment, BankPatch, CredentialsPatch, DocumentType, IdentityPatch, LocalFile,
    ProfilePatch, RegistrationState,
};
use super::validation::{
    normalize_field, parse_date_of_birth, validate_confirm_password, validate_field,
    DATE_OF_BIRTH_MESSAGE,
};

/// Field key → message. Nested fields use dotted keys (`address.pincode`).
/// An absent key or an empty message both mean "no error".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorMap(BTreeMap<String, String>);

impl ErrorMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error; an empty message clears the key.
    pub fn set(&mut self, key: impl Into<String>, message: impl Into<String>) {
        let key = key.into();
        let message = message.into();
        if message.is_empty() {
            self.0.remove(&key);
        } else {
            self.0.insert(key, message);
        }
    }

    /// The non-empty message stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str).filter(|m| !m.is_empty())
    }

    pub fn has_error(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn for_field(&self, field: Field) -> Option<&str> {
        self.get(&field.error_key())
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|m| m.is_empty())
    }
}

/// Holds the registration record and re-validates every field it touches.
#[derive(Debug, Clone)]
pub struct FormStore {
    state: RegistrationState,
    errors: ErrorMap,
}

impl FormStore {
    pub fn new(collect_credentials: bool) -> Self {
        Self {
            state: RegistrationState::new(collect_credentials),
            errors: ErrorMap::new(),
        }
    }

    pub fn state(&self) -> &RegistrationState {
        &self.state
    }

    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    /// Set one field from raw input, normalizing and validating it.
    ///
    /// Returns the field's error message after the update, if any.
    pub fn set_field(&mut self, field: Field, raw: &str) -> Option<&str> {
        let value = normalize_field(field.name(), raw);
        match field.section() {
            Section::Profile => {
                let mut update = ProfilePatch::default();
                let slot = match field {
                    Field::ReferralCode => &mut update.referral_code,
                    Field::MobileNumber => &mut update.mobile_number,
                    Field::Email => &mut update.email,
                    Field::FirstName => &mut update.first_name,
                    Field::LastName => &mut update.last_name,
                    _ => &mut update.date_of_birth,
                };
                *slot = Some(value);
                self.apply_profile(update);
            }
            Section::Credentials => {
                let secret = Some(SecretString::from(value));
                let update = if field == Field::Password {
                    CredentialsPatch {
                        password: secret,
                        confirm_password: None,
                    }
                } else {
                    CredentialsPatch {
                        password: None,
                        confirm_password: secret,
                    }
                };
                self.apply_credentials(update);
            }
            Section::Address => {
                let mut update = AddressPatch::default();
                let slot = match field {
                    Field::AddressLine1 => &mut update.line1,
                    Field::AddressLine2 => &mut update.line2,
                    Field::City => &mut update.city,
                    _ => &mut update.pincode,
                };
                *slot = Some(value);
                self.apply_address(update);
            }
            Section::IdentityDetails => {
                let mut update = IdentityPatch::default();
                if field == Field::PanNumber {
                    update.pan_number = Some(value);
                } else {
                    update.aadhar_number = Some(value);
                }
                self.apply_identity(update);
            }
            Section::BankDetails => {
                let mut update = BankPatch::default();
                let slot = match field {
                    Field::BankAccountNumber => &mut update.bank_account_number,
                    Field::IfscCode => &mut update.ifsc_code,
                    _ => &mut update.bank_branch_name,
                };
                *slot = Some(value);
                self.apply_bank(update);
            }
        }
        self.errors.for_field(field)
    }

    pub fn apply_profile(&mut self, update: ProfilePatch) {
        let touched: Vec<Field> = [
            (Field::ReferralCode, update.referral_code.is_some()),
            (Field::MobileNumber, update.mobile_number.is_some()),
            (Field::Email, update.email.is_some()),
            (Field::FirstName, update.first_name.is_some()),
            (Field::LastName, update.last_name.is_some()),
            (Field::DateOfBirth, update.date_of_birth.is_some()),
        ]
        .into_iter()
        .filter_map(|(f, set)| set.then_some(f))
        .collect();

        self.state = std::mem::take(&mut self.state).with_profile(update);
        self.revalidate(&touched);
    }

    pub fn apply_credentials(&mut self, update: CredentialsPatch) {
        if !self.state.collects_credentials() {
            debug!("Ignoring credential update; this form does not collect a password");
            return;
        }
        let mut touched = Vec::new();
        if update.password.is_some() {
            touched.push(Field::Password);
        }
        // The confirmation is re-checked whenever either side changes.
        touched.push(Field::ConfirmPassword);

        self.state = std::mem::take(&mut self.state).with_credentials(update);
        self.revalidate(&touched);
    }

    pub fn apply_address(&mut self, update: AddressPatch) {
        let touched: Vec<Field> = [
            (Field::AddressLine1, update.line1.is_some()),
            (Field::AddressLine2, update.line2.is_some()),
            (Field::City, update.city.is_some()),
            (Field::Pincode, update.pincode.is_some()),
        ]
        .into_iter()
        .filter_map(|(f, set)| set.then_some(f))
        .collect();

        self.state = std::mem::take(&mut self.state).with_address(update);
        self.revalidate(&touched);
    }

    pub fn apply_identity(&mut self, mut update: IdentityPatch) {
        update.pan_number = update
            .pan_number
            .map(|v| normalize_field(Field::PanNumber.name(), &v));
        let touched: Vec<Field> = [
            (Field::PanNumber, update.pan_number.is_some()),
            (Field::AadharNumber, update.aadhar_number.is_some()),
        ]
        .into_iter()
        .filter_map(|(f, set)| set.then_some(f))
        .collect();

        self.state = std::mem::take(&mut self.state).with_identity(update);
        self.revalidate(&touched);
    }

    pub fn apply_bank(&mut self, mut update: BankPatch) {
        update.ifsc_code = update
            .ifsc_code
            .map(|v| normalize_field(Field::IfscCode.name(), &v));
        let touched: Vec<Field> = [
            (Field::BankAccountNumber, update.bank_account_number.is_some()),
            (Field::IfscCode, update.ifsc_code.is_some()),
            (Field::BankBranchName, update.bank_branch_name.is_some()),
        ]
        .into_iter()
        .filter_map(|(f, set)| set.then_some(f))
        .collect();

        self.state = std::mem::take(&mut self.state).with_bank(update);
        self.revalidate(&touched);
    }

    /// Record a freshly chosen file; any earlier upload URL is dropped.
    pub fn select_attachment(&mut self, document: DocumentType, file: LocalFile) {
        self.set_attachment(document, Attachment::Selected(file));
    }

    /// Record the URL returned by a completed upload.
    pub fn set_uploaded(&mut self, document: DocumentType, url: String) {
        self.set_attachment(document, Attachment::Uploaded(url));
    }

    pub fn set_attachment(&mut self, document: DocumentType, attachment: Attachment) {
        self.state = std::mem::take(&mut self.state).with_attachment(document, attachment);
    }

    fn revalidate(&mut self, fields: &[Field]) {
        for &field in fields {
            let value = self.state.value(field);
            let message = match field {
                Field::DateOfBirth => (parse_date_of_birth(value).is_none())
                    .then_some(DATE_OF_BIRTH_MESSAGE),
                Field::ConfirmPassword => {
                    validate_confirm_password(self.state.value(Field::Password), value)
                }
                _ => validate_field(field.name(), value),
            };
            self.errors
                .set(field.error_key(), message.unwrap_or_default());
        }
    }
}
