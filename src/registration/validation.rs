//! Field validation rules.
//!
//! `validate_field` is pure: a field name and raw value in, an optional
//! user-facing message out. PAN and IFSC are case-insensitive; the form
//! store uppercases them before storage via [`normalize_field`].

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use crate::config::MINIMUM_AGE_YEARS;

pub const NAME_MESSAGE: &str = "Only alphabets are allowed.";
pub const MOBILE_MESSAGE: &str = "Mobile number must be 10 digits.";
pub const EMAIL_MESSAGE: &str = "Invalid email format.";
pub const PAN_MESSAGE: &str = "Invalid PAN number format (e.g., ABCDE1234F).";
pub const AADHAR_MESSAGE: &str = "Aadhar number must be 12 digits.";
pub const PINCODE_MESSAGE: &str = "Pincode must be 6 digits.";
pub const BANK_ACCOUNT_MESSAGE: &str = "Bank account number must be between 9 to 18 digits.";
pub const IFSC_MESSAGE: &str = "Invalid IFSC code format (e.g., ABCD0123456).";
pub const PASSWORD_MESSAGE: &str = "Password must be at least 8 characters long.";
pub const CONFIRM_PASSWORD_MESSAGE: &str = "Passwords do not match.";
pub const DATE_OF_BIRTH_MESSAGE: &str = "Invalid date of birth.";
pub const UNDERAGE_MESSAGE: &str = "You must be at least 18 years old to register.";

/// Minimum password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z]+$").unwrap());
static MOBILE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{10}$").unwrap());
pub(crate) static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
static PAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").unwrap());
static AADHAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{12}$").unwrap());
static PINCODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{6}$").unwrap());
static BANK_ACCOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{9,18}$").unwrap());
static IFSC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{4}0[A-Z0-9]{6}$").unwrap());

/// Validate a raw value for the named field.
///
/// Returns `None` when the value is acceptable. Unknown field names never
/// produce an error. `confirmPassword` needs the password to compare
/// against, see [`validate_confirm_password`].
pub fn validate_field(name: &str, value: &str) -> Option<&'static str> {
    let ok = match name {
        "firstName" | "lastName" => NAME_RE.is_match(value),
        "mobileNumber" => MOBILE_RE.is_match(value),
        "email" => EMAIL_RE.is_match(value),
        "panNumber" => PAN_RE.is_match(&value.to_ascii_uppercase()),
        "aadharNumber" => AADHAR_RE.is_match(value),
        "pincode" => PINCODE_RE.is_match(value),
        "bankAccountNumber" => BANK_ACCOUNT_RE.is_match(value),
        "ifscCode" => IFSC_RE.is_match(&value.to_ascii_uppercase()),
        "password" => value.chars().count() >= MIN_PASSWORD_LEN,
        _ => true,
    };
    if ok {
        return None;
    }
    Some(match name {
        "firstName" | "lastName" => NAME_MESSAGE,
        "mobileNumber" => MOBILE_MESSAGE,
        "email" => EMAIL_MESSAGE,
        "panNumber" => PAN_MESSAGE,
        "aadharNumber" => AADHAR_MESSAGE,
        "pincode" => PINCODE_MESSAGE,
        "bankAccountNumber" => BANK_ACCOUNT_MESSAGE,
        "ifscCode" => IFSC_MESSAGE,
        _ => PASSWORD_MESSAGE,
    })
}

/// String form of [`validate_field`]: empty when valid.
pub fn validate_field_message(name: &str, value: &str) -> String {
    validate_field(name, value).unwrap_or_default().to_string()
}

/// Check that the confirmation matches the password.
pub fn validate_confirm_password(password: &str, confirm: &str) -> Option<&'static str> {
    (password != confirm).then_some(CONFIRM_PASSWORD_MESSAGE)
}

/// Canonical stored form of a value: PAN and IFSC are uppercased.
pub fn normalize_field(name: &str, value: &str) -> String {
    match name {
        "panNumber" | "ifscCode" => value.trim().to_ascii_uppercase(),
        _ => value.to_string(),
    }
}

/// Parse a `YYYY-MM-DD` date of birth.
pub fn parse_date_of_birth(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Whole years elapsed from `dob` to `today`.
///
/// A 29 February birthday counts as reached on 1 March in non-leap years.
pub fn age_in_years(dob: NaiveDate, today: NaiveDate) -> i32 {
    let mut years = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        years -= 1;
    }
    years
}

/// Whether someone born on `dob` is below the minimum age on `today`.
pub fn is_underage(dob: NaiveDate, today: NaiveDate) -> bool {
    age_in_years(dob, today) < MINIMUM_AGE_YEARS as i32
}
