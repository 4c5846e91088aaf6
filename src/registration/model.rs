//! Registration record and its sections.
//!
//! The record is treated as immutable: each `with_*` function consumes it
//! and returns a new one with exactly one section patched.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::field::Field;
use super::step::Step;

/// The four KYC documents the wizard collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentType {
    PanAttachment,
    AadharFront,
    AadharBack,
    BankProof,
}

impl DocumentType {
    pub const ALL: [DocumentType; 4] = [
        DocumentType::PanAttachment,
        DocumentType::AadharFront,
        DocumentType::AadharBack,
        DocumentType::BankProof,
    ];

    /// Wire name, sent as the `documentType` form field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PanAttachment => "panAttachment",
            Self::AadharFront => "aadharFront",
            Self::AadharBack => "aadharBack",
            Self::BankProof => "bankProof",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::PanAttachment => "PAN Card Attachment",
            Self::AadharFront => "Aadhar Front",
            Self::AadharBack => "Aadhar Back",
            Self::BankProof => "Bank Proof (Cancelled Cheque/Passbook/Statement)",
        }
    }

    pub fn step(&self) -> Step {
        match self {
            Self::PanAttachment | Self::AadharFront | Self::AadharBack => Step::Identity,
            Self::BankProof => Step::Bank,
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "panAttachment" | "pan" => Ok(Self::PanAttachment),
            "aadharFront" | "aadhar-front" => Ok(Self::AadharFront),
            "aadharBack" | "aadhar-back" => Ok(Self::AadharBack),
            "bankProof" | "bank-proof" => Ok(Self::BankProof),
            other => Err(format!("unknown document type: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FileSource {
    Disk(PathBuf),
    Memory(Arc<Vec<u8>>),
}

/// A file chosen by the user but not yet uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub file_name: String,
    pub size: u64,
    source: FileSource,
}

impl LocalFile {
    /// Reference a file on disk. Only metadata is read here.
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let meta = tokio::fs::metadata(path).await?;
        if !meta.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self {
            file_name,
            size: meta.len(),
            source: FileSource::Disk(path.to_path_buf()),
        })
    }

    /// Wrap bytes already in memory.
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            size: bytes.len() as u64,
            source: FileSource::Memory(Arc::new(bytes)),
        }
    }

    /// Read the full contents.
    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        match &self.source {
            FileSource::Disk(path) => tokio::fs::read(path).await,
            FileSource::Memory(bytes) => Ok(bytes.as_ref().clone()),
        }
    }

    /// Display path (disk path or bare file name).
    pub fn display_path(&self) -> String {
        match &self.source {
            FileSource::Disk(path) => path.display().to_string(),
            FileSource::Memory(_) => self.file_name.clone(),
        }
    }

    /// MIME type guessed from the extension.
    pub fn content_type(&self) -> &'static str {
        let ext = self
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("pdf") => "application/pdf",
            Some("jpg" | "jpeg") => "image/jpeg",
            Some("png") => "image/png",
            _ => "application/octet-stream",
        }
    }
}

/// State of a document slot: nothing chosen, a local file awaiting upload,
/// or the URL the backend returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Attachment {
    #[default]
    Empty,
    Selected(LocalFile),
    Uploaded(String),
}

impl Attachment {
    /// The remote URL, if the upload completed with a non-empty one.
    pub fn uploaded_url(&self) -> Option<&str> {
        match self {
            Self::Uploaded(url) if !url.is_empty() => Some(url),
            _ => None,
        }
    }

    pub fn is_uploaded(&self) -> bool {
        self.uploaded_url().is_some()
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Short status text for display.
    pub fn describe(&self) -> String {
        match self {
            Self::Empty => "no file selected".to_string(),
            Self::Selected(file) => format!("{} (not uploaded)", file.file_name),
            Self::Uploaded(url) => format!("uploaded: {url}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub line1: String,
    pub line2: String,
    pub city: String,
    pub pincode: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityDetails {
    pub pan_number: String,
    pub aadhar_number: String,
    pub pan_attachment: Attachment,
    pub aadhar_front: Attachment,
    pub aadhar_back: Attachment,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BankDetails {
    pub bank_account_number: String,
    pub ifsc_code: String,
    pub bank_branch_name: String,
    pub bank_proof: Attachment,
}

/// Password pair collected by the credential variant of step 1.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub password: SecretString,
    pub confirm_password: SecretString,
}

impl Credentials {
    pub fn empty() -> Self {
        Self {
            password: SecretString::from(""),
            confirm_password: SecretString::from(""),
        }
    }
}

/// Partial update of the top-level profile fields.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub referral_code: Option<String>,
    pub mobile_number: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CredentialsPatch {
    pub password: Option<SecretString>,
    pub confirm_password: Option<SecretString>,
}

#[derive(Debug, Clone, Default)]
pub struct AddressPatch {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub pincode: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct IdentityPatch {
    pub pan_number: Option<String>,
    pub aadhar_number: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BankPatch {
    pub bank_account_number: Option<String>,
    pub ifsc_code: Option<String>,
    pub bank_branch_name: Option<String>,
}

/// The full registration record held while the wizard runs.
#[derive(Debug, Clone, Default)]
pub struct RegistrationState {
    pub referral_code: String,
    pub mobile_number: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Raw `YYYY-MM-DD` input.
    pub date_of_birth: String,
    /// `Some` only when the wizard collects a password.
    pub credentials: Option<Credentials>,
    pub address: Address,
    pub identity_details: IdentityDetails,
    pub bank_details: BankDetails,
}

fn patch(slot: &mut String, value: Option<String>) {
    if let Some(value) = value {
        *slot = value;
    }
}

impl RegistrationState {
    /// Empty record; `collect_credentials` enables the password pair.
    pub fn new(collect_credentials: bool) -> Self {
        Self {
            credentials: collect_credentials.then(Credentials::empty),
            ..Default::default()
        }
    }

    pub fn with_profile(mut self, update: ProfilePatch) -> Self {
        patch(&mut self.referral_code, update.referral_code);
        patch(&mut self.mobile_number, update.mobile_number);
        patch(&mut self.email, update.email);
        patch(&mut self.first_name, update.first_name);
        patch(&mut self.last_name, update.last_name);
        patch(&mut self.date_of_birth, update.date_of_birth);
        self
    }

    /// Patch credentials. Ignored when the record does not collect them.
    pub fn with_credentials(mut self, update: CredentialsPatch) -> Self {
        if let Some(creds) = self.credentials.as_mut() {
            if let Some(password) = update.password {
                creds.password = password;
            }
            if let Some(confirm) = update.confirm_password {
                creds.confirm_password = confirm;
            }
        }
        self
    }

    pub fn with_address(mut self, update: AddressPatch) -> Self {
        patch(&mut self.address.line1, update.line1);
        patch(&mut self.address.line2, update.line2);
        patch(&mut self.address.city, update.city);
        patch(&mut self.address.pincode, update.pincode);
        self
    }

    pub fn with_identity(mut self, update: IdentityPatch) -> Self {
        patch(&mut self.identity_details.pan_number, update.pan_number);
        patch(&mut self.identity_details.aadhar_number, update.aadhar_number);
        self
    }

    pub fn with_bank(mut self, update: BankPatch) -> Self {
        patch(&mut self.bank_details.bank_account_number, update.bank_account_number);
        patch(&mut self.bank_details.ifsc_code, update.ifsc_code);
        patch(&mut self.bank_details.bank_branch_name, update.bank_branch_name);
        self
    }

    pub fn with_attachment(mut self, document: DocumentType, attachment: Attachment) -> Self {
        let slot = match document {
            DocumentType::PanAttachment => &mut self.identity_details.pan_attachment,
            DocumentType::AadharFront => &mut self.identity_details.aadhar_front,
            DocumentType::AadharBack => &mut self.identity_details.aadhar_back,
            DocumentType::BankProof => &mut self.bank_details.bank_proof,
        };
        *slot = attachment;
        self
    }

    pub fn attachment(&self, document: DocumentType) -> &Attachment {
        match document {
            DocumentType::PanAttachment => &self.identity_details.pan_attachment,
            DocumentType::AadharFront => &self.identity_details.aadhar_front,
            DocumentType::AadharBack => &self.identity_details.aadhar_back,
            DocumentType::BankProof => &self.bank_details.bank_proof,
        }
    }

    /// Current text of a field. Credential fields read as empty when the
    /// record does not collect them.
    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::ReferralCode => &self.referral_code,
            Field::MobileNumber => &self.mobile_number,
            Field::Email => &self.email,
            Field::FirstName => &self.first_name,
            Field::LastName => &self.last_name,
            Field::DateOfBirth => &self.date_of_birth,
            Field::Password => self
                .credentials
                .as_ref()
                .map(|c| c.password.expose_secret())
                .unwrap_or(""),
            Field::ConfirmPassword => self
                .credentials
                .as_ref()
                .map(|c| c.confirm_password.expose_secret())
                .unwrap_or(""),
            Field::AddressLine1 => &self.address.line1,
            Field::AddressLine2 => &self.address.line2,
            Field::City => &self.address.city,
            Field::Pincode => &self.address.pincode,
            Field::PanNumber => &self.identity_details.pan_number,
            Field::AadharNumber => &self.identity_details.aadhar_number,
            Field::BankAccountNumber => &self.bank_details.bank_account_number,
            Field::IfscCode => &self.bank_details.ifsc_code,
            Field::BankBranchName => &self.bank_details.bank_branch_name,
        }
    }

    /// Whether the field holds a non-blank value.
    pub fn is_populated(&self, field: Field) -> bool {
        !self.value(field).trim().is_empty()
    }

    pub fn collects_credentials(&self) -> bool {
        self.credentials.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_updates_leave_other_sections_alone() {
        let state = RegistrationState::new(false)
            .with_profile(ProfilePatch {
                email: Some("a@b.co".into()),
                ..Default::default()
            })
            .with_address(AddressPatch {
                city: Some("Pune".into()),
                ..Default::default()
            });

        let updated = state.clone().with_address(AddressPatch {
            pincode: Some("411001".into()),
            ..Default::default()
        });

        assert_eq!(updated.address.city, "Pune");
        assert_eq!(updated.address.pincode, "411001");
        assert_eq!(updated.email, "a@b.co");
        // The original record is untouched.
        assert!(state.address.pincode.is_empty());
    }

    #[test]
    fn attachment_states_are_distinguishable() {
        let file = LocalFile::from_bytes("pan.pdf", vec![1, 2, 3]);
        let empty = Attachment::Empty;
        let selected = Attachment::Selected(file);
        let uploaded = Attachment::Uploaded("https://cdn/pan.pdf".into());

        assert!(empty.is_empty() && !empty.is_uploaded());
        assert!(!selected.is_empty() && !selected.is_uploaded());
        assert_eq!(uploaded.uploaded_url(), Some("https://cdn/pan.pdf"));
        assert!(!Attachment::Uploaded(String::new()).is_uploaded());
    }

    #[test]
    fn with_attachment_targets_the_right_slot() {
        let state = RegistrationState::default()
            .with_attachment(DocumentType::AadharBack, Attachment::Uploaded("u".into()));
        assert!(state.identity_details.aadhar_back.is_uploaded());
        assert!(state.identity_details.aadhar_front.is_empty());
        assert!(state.attachment(DocumentType::AadharBack).is_uploaded());
    }

    #[test]
    fn credentials_only_when_collected() {
        let plain = RegistrationState::new(false).with_credentials(CredentialsPatch {
            password: Some(SecretString::from("hunter2hunter2")),
            confirm_password: None,
        });
        assert!(!plain.collects_credentials());
        assert_eq!(plain.value(Field::Password), "");

        let with_creds = RegistrationState::new(true).with_credentials(CredentialsPatch {
            password: Some(SecretString::from("hunter2hunter2")),
            confirm_password: None,
        });
        assert_eq!(with_creds.value(Field::Password), "hunter2hunter2");
        assert_eq!(with_creds.value(Field::ConfirmPassword), "");
    }

    #[test]
    fn content_type_from_extension() {
        assert_eq!(LocalFile::from_bytes("a.PDF", vec![]).content_type(), "application/pdf");
        assert_eq!(LocalFile::from_bytes("a.jpeg", vec![]).content_type(), "image/jpeg");
        assert_eq!(LocalFile::from_bytes("a.png", vec![]).content_type(), "image/png");
        assert_eq!(
            LocalFile::from_bytes("a", vec![]).content_type(),
            "application/octet-stream"
        );
    }

    #[test]
    fn document_type_parses_aliases() {
        assert_eq!("pan".parse::<DocumentType>(), Ok(DocumentType::PanAttachment));
        assert_eq!("bankProof".parse::<DocumentType>(), Ok(DocumentType::BankProof));
        assert!("selfie".parse::<DocumentType>().is_err());
    }

    #[tokio::test]
    async fn open_reads_metadata_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proof.png");
        tokio::fs::write(&path, vec![0u8; 2048]).await.unwrap();

        let file = LocalFile::open(&path).await.unwrap();
        assert_eq!(file.file_name, "proof.png");
        assert_eq!(file.size, 2048);
        assert_eq!(file.read().await.unwrap().len(), 2048);
    }
}
