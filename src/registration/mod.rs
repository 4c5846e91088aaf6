//! Registration wizard: five-step KYC onboarding.
//!
//! The user moves through contact, personal, identity, address and bank
//! details. Each field is validated as it changes, and a step can only be
//! left forward once its required fields are present and error-free.
//! Documents are uploaded individually. The finished record is submitted
//! once, and an emailed OTP confirms the account.

pub mod field;
pub mod model;
pub mod otp;
pub mod step;
pub mod store;
pub mod submit;
pub mod upload;
pub mod validation;
pub mod wizard;

pub use field::{Field, Section};
pub use model::{Attachment, DocumentType, LocalFile, RegistrationState};
pub use otp::{OtpCode, OtpState, OtpVerifier};
pub use step::{blocking_reasons, can_advance, Step, StepController};
pub use store::{ErrorMap, FormStore};
pub use submit::{RegisteredUser, RegistrationApi, RegistrationRequest, RegistrationSubmitter};
pub use upload::{DocumentUploader, UploadAdapter, UploadStatus, UploadTracker};
pub use validation::{validate_field, validate_field_message};
pub use wizard::{RegistrationWizard, WizardPhase};
