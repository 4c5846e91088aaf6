//! Error types for the onboarding flow.

use crate::registration::model::DocumentType;
use crate::registration::step::Step;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Step navigation errors.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("Step {step} is incomplete: {}", reasons.join("; "))]
    Incomplete { step: Step, reasons: Vec<String> },

    #[error("Already at the first step")]
    AtFirstStep,

    #[error("Already at the last step; submit instead")]
    AtLastStep,

    #[error("Registration was already submitted")]
    AlreadySubmitted,
}

/// Document upload errors. The `Display` text is what the user sees next
/// to the document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("File size must be less than {limit_mb}MB.")]
    TooLarge {
        document: DocumentType,
        size: u64,
        limit_mb: u64,
    },

    #[error("Could not read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Upload failed: {0}")]
    Transport(String),

    #[error("Upload rejected ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Upload response did not contain a URL")]
    MissingUrl,

    #[error("Registration was already submitted; documents can no longer change")]
    Locked,
}

/// Registration submission errors.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Registration is not ready: {}", reasons.join("; "))]
    NotReady { reasons: Vec<String> },

    #[error("Invalid date of birth: {0}")]
    InvalidDateOfBirth(String),

    #[error("Unable to reach the registration service: {0}")]
    Transport(String),

    #[error("Registration failed ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Registration response was malformed: {0}")]
    InvalidResponse(String),
}

/// OTP verification errors.
#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    #[error("OTP must be 6 digits.")]
    InvalidCode,

    #[error("No registered user found; complete registration first")]
    MissingUserId,

    #[error("Verification is not pending")]
    NotAwaiting,

    #[error("Unable to reach the verification service: {0}")]
    Transport(String),

    #[error("OTP verification failed ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

impl OtpError {
    /// Whether the user can simply try again with another code.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InvalidCode | Self::Transport(_) | Self::Rejected { .. }
        )
    }
}

/// Login errors. Messages mirror what the login screen shows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoginError {
    #[error("Please fill in all required fields: Email and Password")]
    MissingFields,

    #[error("{0}")]
    InvalidField(String),

    #[error("Unable to connect to the server. Please check your internet connection and try again.")]
    Unreachable,

    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Error ({status}): {message}")]
    Other { status: u16, message: String },
}

impl LoginError {
    /// Map an HTTP status and extracted server message onto a login error.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 => Self::Unauthorized(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            429 => Self::RateLimited(message),
            500 => Self::Server(message),
            _ => Self::Other { status, message },
        }
    }
}

/// Local user-id persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
