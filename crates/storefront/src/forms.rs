//! Client-side form validation.
//!
//! Each form validates every field before anything is sent and reports all
//! offending fields at once, so a caller can show every message together.

use std::fmt;

use rust_decimal::Decimal;
use thiserror::Error;

use loopstore_core::Email;

use crate::api::{ContactMessage, OrderItemInput, OrderRequest};

/// One rejected form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// A form failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid form: {}", join(.fields))]
pub struct ValidationError {
    pub fields: Vec<FieldError>,
}

fn join(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    /// Whether `field` was rejected.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f.field == field)
    }
}

/// Collects field errors while a form is checked.
#[derive(Default)]
struct Checker {
    fields: Vec<FieldError>,
}

impl Checker {
    fn fail(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.push(FieldError {
            field,
            message: message.into(),
        });
    }

    fn min_len(&mut self, field: &'static str, value: &str, min: usize, message: &str) {
        if value.trim().chars().count() < min {
            self.fail(field, message);
        }
    }

    fn email(&mut self, field: &'static str, value: &str) -> Option<Email> {
        match Email::parse(value) {
            Ok(email) => Some(email),
            Err(e) => {
                self.fail(field, e.to_string());
                None
            }
        }
    }

    fn finish<T>(self, value: Option<T>) -> Result<T, ValidationError> {
        match value {
            Some(value) if self.fields.is_empty() => Ok(value),
            _ => Err(ValidationError {
                fields: self.fields,
            }),
        }
    }
}

// =============================================================================
// Shipping
// =============================================================================

/// Shipping details entered at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShippingDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub notes: Option<String>,
}

impl ShippingDetails {
    /// Full name as sent to the API.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }

    /// Check every field without building an order.
    ///
    /// # Errors
    ///
    /// Returns every offending field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.check().map(|_| ())
    }

    fn check(&self) -> Result<Email, ValidationError> {
        let mut check = Checker::default();
        check.min_len("name", &self.full_name(), 2, "Name is required");
        let email = check.email("email", &self.email);
        if let Some(phone) = self.phone.as_deref().filter(|p| !p.trim().is_empty()) {
            check.min_len("phone", phone, 9, "Invalid phone number");
        }
        check.min_len("address", &self.address, 5, "Address is required");
        check.min_len("city", &self.city, 2, "City is required");
        check.min_len("postal_code", &self.postal_code, 1, "Postal code is required");
        check.min_len("country", &self.country, 2, "Country is required");
        check.finish(email)
    }

    /// Validate the details and build the order payload for `items`.
    ///
    /// # Errors
    ///
    /// Returns every offending field.
    pub fn into_order(
        self,
        items: Vec<OrderItemInput>,
        total_amount: Decimal,
    ) -> Result<OrderRequest, ValidationError> {
        let email = self.check()?;
        Ok(OrderRequest {
            name: self.full_name(),
            email,
            phone: self.phone.unwrap_or_default().trim().to_string(),
            address: self.address.trim().to_string(),
            city: self.city.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
            country: self.country.trim().to_string(),
            notes: self.notes.unwrap_or_default().trim().to_string(),
            items,
            total_amount,
        })
    }
}

// =============================================================================
// Newsletter, Contact, Review
// =============================================================================

/// Validate a newsletter signup address.
///
/// # Errors
///
/// Returns a validation error naming the `email` field.
pub fn newsletter_email(input: &str) -> Result<Email, ValidationError> {
    let mut check = Checker::default();
    let email = check.email("email", input);
    check.finish(email)
}

/// Contact form as entered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl ContactForm {
    /// Validate and build the message payload.
    ///
    /// # Errors
    ///
    /// Returns every offending field.
    pub fn validate(&self) -> Result<ContactMessage, ValidationError> {
        let mut check = Checker::default();
        check.min_len("name", &self.name, 1, "Name is required");
        let email = check.email("email", &self.email);
        check.min_len("message", &self.message, 1, "Message is required");
        check.finish(email).map(|email| ContactMessage {
            name: self.name.trim().to_string(),
            email,
            message: self.message.trim().to_string(),
        })
    }
}

/// Product review as entered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewForm {
    pub rating: u8,
    pub comment: String,
}

impl ReviewForm {
    /// # Errors
    ///
    /// Returns every offending field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut check = Checker::default();
        if !(1..=5).contains(&self.rating) {
            check.fail("rating", "Please select a rating");
        }
        check.min_len("comment", &self.comment, 1, "Please enter a review comment");
        check.finish(Some(()))
    }
}
