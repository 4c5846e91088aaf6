//! Wizard steps and the predicate that gates moving forward.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::field::Field;
use super::model::{DocumentType, RegistrationState};
use super::store::ErrorMap;
use super::validation::{is_underage, parse_date_of_birth, UNDERAGE_MESSAGE};
use crate::error::StepError;

/// The five registration steps.
///
/// Progresses linearly: Contact → Personal → Identity → Address → Bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Contact,
    Personal,
    Identity,
    Address,
    Bank,
}

impl Step {
    pub const ALL: [Step; 5] = [
        Step::Contact,
        Step::Personal,
        Step::Identity,
        Step::Address,
        Step::Bank,
    ];

    /// 1-based step index.
    pub fn number(&self) -> u8 {
        match self {
            Self::Contact => 1,
            Self::Personal => 2,
            Self::Identity => 3,
            Self::Address => 4,
            Self::Bank => 5,
        }
    }

    pub fn from_number(n: u8) -> Option<Step> {
        Self::ALL.into_iter().find(|s| s.number() == n)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Contact => "Initial Registration",
            Self::Personal => "Personal Details",
            Self::Identity => "Identity Documents",
            Self::Address => "Address Details",
            Self::Bank => "Bank Details",
        }
    }

    pub fn next(&self) -> Option<Step> {
        Self::from_number(self.number() + 1)
    }

    pub fn prev(&self) -> Option<Step> {
        self.number().checked_sub(1).and_then(Self::from_number)
    }

    /// Only single steps are allowed, in either direction.
    pub fn can_transition_to(&self, target: Step) -> bool {
        self.next() == Some(target) || self.prev() == Some(target)
    }

    pub fn is_last(&self) -> bool {
        self.next().is_none()
    }

    /// Every field rendered on this step, in display order.
    pub fn fields(&self, collect_credentials: bool) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| f.step() == *self)
            .filter(|f| collect_credentials || !f.is_secret())
            .collect()
    }

    /// Fields that must be non-blank before leaving this step.
    pub fn required_fields(&self, collect_credentials: bool) -> Vec<Field> {
        match self {
            Self::Contact => {
                let mut fields = vec![Field::MobileNumber, Field::Email];
                if collect_credentials {
                    fields.extend([Field::Password, Field::ConfirmPassword]);
                }
                fields
            }
            Self::Personal => vec![Field::FirstName, Field::LastName, Field::DateOfBirth],
            Self::Identity => vec![Field::PanNumber, Field::AadharNumber],
            Self::Address => vec![Field::AddressLine1, Field::City, Field::Pincode],
            Self::Bank => vec![
                Field::BankAccountNumber,
                Field::IfscCode,
                Field::BankBranchName,
            ],
        }
    }

    /// Documents that must be uploaded before leaving this step.
    pub fn documents(&self) -> Vec<DocumentType> {
        DocumentType::ALL
            .into_iter()
            .filter(|d| d.step() == *self)
            .collect()
    }
}

impl Default for Step {
    fn default() -> Self {
        Self::Contact
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Contact => "contact",
            Self::Personal => "personal",
            Self::Identity => "identity",
            Self::Address => "address",
            Self::Bank => "bank",
        };
        write!(f, "{s}")
    }
}

/// Everything currently stopping `step` from being completed. Empty means
/// the step may be left going forward.
pub fn blocking_reasons(
    step: Step,
    state: &RegistrationState,
    errors: &ErrorMap,
    today: NaiveDate,
) -> Vec<String> {
    let collect_credentials = state.collects_credentials();
    let mut reasons = Vec::new();

    for field in step.fields(collect_credentials) {
        if let Some(message) = errors.for_field(field) {
            reasons.push(format!("{}: {message}", field.label()));
        }
    }

    for field in step.required_fields(collect_credentials) {
        if !state.is_populated(field) {
            reasons.push(format!("{} is required", field.label()));
        }
    }

    for document in step.documents() {
        if !state.attachment(document).is_uploaded() {
            reasons.push(format!("{} has not been uploaded", document.label()));
        }
    }

    if step == Step::Personal {
        if let Some(dob) = parse_date_of_birth(&state.date_of_birth) {
            if is_underage(dob, today) {
                reasons.push(UNDERAGE_MESSAGE.to_string());
            }
        }
    }

    reasons
}

/// Whether `step` is complete: no errors on its fields and every required
/// field and document present.
pub fn can_advance(
    step: Step,
    state: &RegistrationState,
    errors: &ErrorMap,
    today: NaiveDate,
) -> bool {
    blocking_reasons(step, state, errors, today).is_empty()
}

/// Tracks the current step. Forward moves are gated, backward moves are not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepController {
    current: Step,
}

impl StepController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Step {
        self.current
    }

    /// Move to the next step if the current one is complete.
    pub fn advance(
        &mut self,
        state: &RegistrationState,
        errors: &ErrorMap,
        today: NaiveDate,
    ) -> Result<Step, StepError> {
        let next = self.current.next().ok_or(StepError::AtLastStep)?;
        let reasons = blocking_reasons(self.current, state, errors, today);
        if !reasons.is_empty() {
            return Err(StepError::Incomplete {
                step: self.current,
                reasons,
            });
        }
        self.current = next;
        Ok(next)
    }

    /// Move back one step.
    pub fn retreat(&mut self) -> Result<Step, StepError> {
        let prev = self.current.prev().ok_or(StepError::AtFirstStep)?;
        self.current = prev;
        Ok(prev)
    }
}
