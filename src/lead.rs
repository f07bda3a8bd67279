//! Lead record and the validation rules for each captured field

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;

const MIN_NAME_CHARS: usize = 2;
const MIN_PHONE_DIGITS: usize = 7;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

/// Field of the lead form, in capture order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadField {
    Name,
    Email,
    Phone,
}

/// Validation failure for a single lead field. The display text is shown to the visitor.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter your full name (at least 2 characters).")]
    NameTooShort,
    #[error("That doesn't look like a valid email. Please try again (e.g., example@domain.com).")]
    MalformedEmail,
    #[error("Please enter a valid phone number (digits only).")]
    MalformedPhone,
}

/// Violation of the capture order
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LeadError {
    #[error("Cannot record {field:?} before {missing:?}")]
    OutOfOrder { field: LeadField, missing: LeadField },
    #[error("{0:?} is already recorded")]
    AlreadyRecorded(LeadField),
    #[error("Lead record is complete and can no longer change")]
    Complete,
}

pub fn validate_name(input: &str) -> Result<String, ValidationError> {
    let name = input.trim();
    if name.chars().count() < MIN_NAME_CHARS {
        return Err(ValidationError::NameTooShort);
    }
    Ok(name.to_string())
}

pub fn validate_email(input: &str) -> Result<String, ValidationError> {
    let email = input.trim();
    if !EMAIL_RE.is_match(email) {
        return Err(ValidationError::MalformedEmail);
    }
    Ok(email.to_string())
}

/// Accepts any formatting as long as at least seven digits remain once the rest is stripped
pub fn validate_phone(input: &str) -> Result<String, ValidationError> {
    let phone = input.trim();
    if phone_digits(phone).len() < MIN_PHONE_DIGITS {
        return Err(ValidationError::MalformedPhone);
    }
    Ok(phone.to_string())
}

pub fn phone_digits(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// Contact details captured from a prospective student
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadRecord {
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
}

impl LeadRecord {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn has_name(&self) -> bool {
        self.name.is_some()
    }

    pub fn is_complete(&self) -> bool {
        self.phone.is_some()
    }

    /// Store a validated value. Fields must arrive name, email, then phone.
    pub fn record(&mut self, field: LeadField, value: String) -> Result<(), LeadError> {
        if self.is_complete() {
            return Err(LeadError::Complete);
        }
        let (slot, prerequisite) = match field {
            LeadField::Name => (&mut self.name, None),
            LeadField::Email => (
                &mut self.email,
                self.name.is_none().then_some(LeadField::Name),
            ),
            LeadField::Phone => (
                &mut self.phone,
                self.email.is_none().then_some(LeadField::Email),
            ),
        };
        if let Some(missing) = prerequisite {
            return Err(LeadError::OutOfOrder { field, missing });
        }
        if slot.is_some() {
            return Err(LeadError::AlreadyRecorded(field));
        }
        *slot = Some(value);
        Ok(())
    }
}
