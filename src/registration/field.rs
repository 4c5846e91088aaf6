//! Field catalogue: every input the registration form collects.

use serde::{Deserialize, Serialize};

use super::step::Step;

/// Which part of the registration record a field lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    Profile,
    Credentials,
    Address,
    IdentityDetails,
    BankDetails,
}

impl Section {
    /// Prefix used for dotted error keys, if the section is nested.
    pub fn prefix(&self) -> Option<&'static str> {
        match self {
            Self::Profile | Self::Credentials => None,
            Self::Address => Some("address"),
            Self::IdentityDetails => Some("identityDetails"),
            Self::BankDetails => Some("bankDetails"),
        }
    }
}

/// A text field of the registration form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    ReferralCode,
    MobileNumber,
    Email,
    Password,
    ConfirmPassword,
    FirstName,
    LastName,
    DateOfBirth,
    PanNumber,
    AadharNumber,
    #[serde(rename = "line1")]
    AddressLine1,
    #[serde(rename = "line2")]
    AddressLine2,
    City,
    Pincode,
    BankAccountNumber,
    IfscCode,
    BankBranchName,
}

impl Field {
    pub const ALL: [Field; 17] = [
        Field::ReferralCode,
        Field::MobileNumber,
        Field::Email,
        Field::Password,
        Field::ConfirmPassword,
        Field::FirstName,
        Field::LastName,
        Field::DateOfBirth,
        Field::PanNumber,
        Field::AadharNumber,
        Field::AddressLine1,
        Field::AddressLine2,
        Field::City,
        Field::Pincode,
        Field::BankAccountNumber,
        Field::IfscCode,
        Field::BankBranchName,
    ];

    /// Leaf name, as used by the validator and on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ReferralCode => "referralCode",
            Self::MobileNumber => "mobileNumber",
            Self::Email => "email",
            Self::Password => "password",
            Self::ConfirmPassword => "confirmPassword",
            Self::FirstName => "firstName",
            Self::LastName => "lastName",
            Self::DateOfBirth => "dateOfBirth",
            Self::PanNumber => "panNumber",
            Self::AadharNumber => "aadharNumber",
            Self::AddressLine1 => "line1",
            Self::AddressLine2 => "line2",
            Self::City => "city",
            Self::Pincode => "pincode",
            Self::BankAccountNumber => "bankAccountNumber",
            Self::IfscCode => "ifscCode",
            Self::BankBranchName => "bankBranchName",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ReferralCode => "Referral Code (Optional)",
            Self::MobileNumber => "Mobile Number",
            Self::Email => "Email",
            Self::Password => "Password",
            Self::ConfirmPassword => "Confirm Password",
            Self::FirstName => "First Name",
            Self::LastName => "Last Name",
            Self::DateOfBirth => "Date of Birth",
            Self::PanNumber => "PAN Number",
            Self::AadharNumber => "Aadhar Number",
            Self::AddressLine1 => "Address Line 1",
            Self::AddressLine2 => "Address Line 2 (Optional)",
            Self::City => "City",
            Self::Pincode => "Pincode",
            Self::BankAccountNumber => "Bank Account Number",
            Self::IfscCode => "IFSC Code",
            Self::BankBranchName => "Bank Branch Name",
        }
    }

    pub fn section(&self) -> Section {
        match self {
            Self::ReferralCode
            | Self::MobileNumber
            | Self::Email
            | Self::FirstName
            | Self::LastName
            | Self::DateOfBirth => Section::Profile,
            Self::Password | Self::ConfirmPassword => Section::Credentials,
            Self::PanNumber | Self::AadharNumber => Section::IdentityDetails,
            Self::AddressLine1 | Self::AddressLine2 | Self::City | Self::Pincode => {
                Section::Address
            }
            Self::BankAccountNumber | Self::IfscCode | Self::BankBranchName => {
                Section::BankDetails
            }
        }
    }

    /// The wizard step that renders this field.
    pub fn step(&self) -> Step {
        match self {
            Self::ReferralCode
            | Self::MobileNumber
            | Self::Email
            | Self::Password
            | Self::ConfirmPassword => Step::Contact,
            Self::FirstName | Self::LastName | Self::DateOfBirth => Step::Personal,
            Self::PanNumber | Self::AadharNumber => Step::Identity,
            Self::AddressLine1 | Self::AddressLine2 | Self::City | Self::Pincode => Step::Address,
            Self::BankAccountNumber | Self::IfscCode | Self::BankBranchName => Step::Bank,
        }
    }

    /// Key under which this field's error is recorded: dotted for nested
    /// sections (`address.pincode`), bare otherwise (`email`).
    pub fn error_key(&self) -> String {
        match self.section().prefix() {
            Some(prefix) => format!("{prefix}.{}", self.name()),
            None => self.name().to_string(),
        }
    }

    /// Resolve a field from its leaf name or its dotted error key.
    pub fn from_key(key: &str) -> Option<Field> {
        let key = key.trim();
        Self::ALL
            .into_iter()
            .find(|f| f.name() == key || f.error_key() == key)
    }

    /// Whether the value is a secret that must never be echoed or logged.
    pub fn is_secret(&self) -> bool {
        matches!(self, Self::Password | Self::ConfirmPassword)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_keys_are_dotted_for_nested_sections() {
        assert_eq!(Field::Email.error_key(), "email");
        assert_eq!(Field::Pincode.error_key(), "address.pincode");
        assert_eq!(Field::AddressLine1.error_key(), "address.line1");
        assert_eq!(Field::PanNumber.error_key(), "identityDetails.panNumber");
        assert_eq!(Field::IfscCode.error_key(), "bankDetails.ifscCode");
    }

    #[test]
    fn from_key_accepts_leaf_and_dotted_names() {
        assert_eq!(Field::from_key("pincode"), Some(Field::Pincode));
        assert_eq!(Field::from_key("address.pincode"), Some(Field::Pincode));
        assert_eq!(
            Field::from_key("bankDetails.bankBranchName"),
            Some(Field::BankBranchName)
        );
        assert_eq!(Field::from_key("nickname"), None);
    }

    #[test]
    fn every_field_roundtrips_through_its_key() {
        for field in Field::ALL {
            assert_eq!(Field::from_key(&field.error_key()), Some(field));
            assert_eq!(Field::from_key(field.name()), Some(field));
        }
    }

    #[test]
    fn display_matches_serde() {
        for field in Field::ALL {
            let json = serde_json::to_string(&field).unwrap();
            assert_eq!(format!("\"{field}\""), json, "mismatch for {field:?}");
        }
    }
}
