//! Validated inputs shared by the HTTP handlers and the client widget.

use crate::errors::AppError;
use crate::models::ContactRequest;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static EMAIL_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

pub const EMPTY_EMAIL_MESSAGE: &str = "Please enter your email address";
pub const INVALID_EMAIL_MESSAGE: &str = "Please enter a valid email address";
pub const MISSING_FIELDS_MESSAGE: &str = "All fields are required.";

/// An email address that passed the `local@domain.tld` shape check.
///
/// The address is stored as entered (trimmed); comparisons go through
/// [`SubscriberEmail::match_key`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberEmail(String);

impl SubscriberEmail {
    pub fn parse(input: &str) -> Result<Self, AppError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(AppError::validation(EMPTY_EMAIL_MESSAGE));
        }
        if !EMAIL_SHAPE.is_match(trimmed) {
            return Err(AppError::validation(INVALID_EMAIL_MESSAGE));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn match_key(&self) -> String {
        self.0.to_lowercase()
    }
}

impl AsRef<str> for SubscriberEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriberEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactSubmission {
    pub name: String,
    pub email: SubscriberEmail,
    pub message: String,
}

impl ContactSubmission {
    pub fn parse(request: &ContactRequest) -> Result<Self, AppError> {
        let name = request.name.trim();
        let message = request.message.trim();
        if name.is_empty() || request.email.trim().is_empty() || message.is_empty() {
            return Err(AppError::validation(MISSING_FIELDS_MESSAGE));
        }

        Ok(Self {
            name: name.to_string(),
            email: SubscriberEmail::parse(&request.email)?,
            message: message.to_string(),
        })
    }
}
