//! Shop REST API client.
//!
//! # Architecture
//!
//! - JSON over HTTP with `reqwest`; every path ends in a slash
//! - The API is the source of truth for catalog, orders and favorites; the
//!   cart is client-local and reconciled through `Storefront::sync_cart`
//! - Session credentials are cookies held in a shared jar
//! - In-memory caching via `moka` for catalog responses (default 5 minute TTL)
//!
//! # Endpoints
//!
//! ## Catalog
//! - `products/`, `products/{id}/`, `products/search/`, `categories/`
//! - `products/{id}/reviews/`
//!
//! ## Account (cookie session)
//! - `auth/login/`, `auth/register/`, `auth/logout/`, `auth/me/`
//! - `favorites/`, `favorites/{id}/`
//! - `orders/`, `orders/{id}/`
//!
//! ## Marketing
//! - `newsletter/subscribe/`, `contact/`
//!
//! # Example
//!
//! ```rust,ignore
//! use loopstore_storefront::api::{ApiClient, ProductFilter};
//!
//! let client = ApiClient::new(&config.api)?;
//! let page = client.list_products(&ProductFilter::default()).await?;
//! let product = client.get_product(page.results[0].id).await?;
//! ```

mod account;
mod cache;
mod client;
mod marketing;
mod orders;
mod products;
pub mod types;

pub use client::ApiClient;
pub use products::ProductFilter;
pub use types::*;

use thiserror::Error;

/// Errors that can occur when calling the shop API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network failure, timeout, or an unreadable response body.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },

    /// The requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The session is missing or expired (HTTP 401).
    #[error("Not authenticated")]
    Unauthorized,

    /// The session lacks permission, or CSRF validation failed (HTTP 403).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Rate limited by the API.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// An endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// Whether the failure means "no valid session".
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::Forbidden(_))
    }

    /// Whether the request never got an answer from the API.
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_connect() || e.is_timeout() || e.is_request())
    }

    /// HTTP status of the failure, if the API answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::NotFound(_) => Some(404),
            Self::Unauthorized => Some(401),
            Self::Forbidden(_) => Some(403),
            Self::RateLimited(_) => Some(429),
            Self::Http(_) | Self::Parse(_) | Self::InvalidUrl(_) => None,
        }
    }
}

/// Flatten an error body into one readable line.
///
/// Handles `{"detail": "..."}`, DRF field maps (`{"items": ["..."]}`), bare
/// string arrays, and falls back to the (truncated) raw text.
pub(crate) fn error_message(body: &str) -> String {
    let trimmed = body.trim();
    let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) else {
        return trimmed.chars().take(200).collect();
    };

    match value {
        serde_json::Value::Object(map) => {
            if let Some(serde_json::Value::String(detail)) = map.get("detail") {
                return detail.clone();
            }
            map.iter()
                .map(|(field, messages)| {
                    let text = flatten_messages(messages);
                    if field == "non_field_errors" {
                        text
                    } else {
                        format!("{field}: {text}")
                    }
                })
                .collect::<Vec<_>>()
                .join("; ")
        }
        other => flatten_messages(&other),
    }
}

fn flatten_messages(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(flatten_messages)
            .collect::<Vec<_>>()
            .join(", "),
        serde_json::Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{k}: {}", flatten_messages(v)))
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ApiError::NotFound("products/9/".to_string());
        assert_eq!(err.to_string(), "Not found: products/9/");

        let err = ApiError::Status {
            status: 400,
            message: "items: Order must contain at least one item.".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "API error: 400 - items: Order must contain at least one item."
        );
    }

    #[test]
    fn test_rate_limited_error() {
        let err = ApiError::RateLimited(60);
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");
        assert_eq!(err.status(), Some(429));
    }

    #[test]
    fn test_auth_failures() {
        assert!(ApiError::Unauthorized.is_auth_failure());
        assert!(ApiError::Forbidden("CSRF".to_string()).is_auth_failure());
        assert!(!ApiError::NotFound("x".to_string()).is_auth_failure());
    }

    #[test]
    fn test_error_message_detail() {
        assert_eq!(
            error_message(r#"{"detail": "Invalid email or password."}"#),
            "Invalid email or password."
        );
    }

    #[test]
    fn test_error_message_field_map() {
        let body = r#"{"items": ["Not enough stock for product Jacket. Available: 1, requested: 2"], "non_field_errors": ["Try again"]}"#;
        assert_eq!(
            error_message(body),
            "items: Not enough stock for product Jacket. Available: 1, requested: 2; Try again"
        );
    }

    #[test]
    fn test_error_message_nested_items() {
        let body = r#"{"items": [{"quantity": ["Ensure this value is greater than or equal to 1."]}]}"#;
        assert_eq!(
            error_message(body),
            "items: quantity: Ensure this value is greater than or equal to 1."
        );
    }

    #[test]
    fn test_error_message_plain_text() {
        assert_eq!(error_message("  Bad Gateway \n"), "Bad Gateway");
        assert_eq!(error_message(r#"["a", "b"]"#), "a, b");
        assert_eq!(error_message(&"x".repeat(500)).len(), 200);
    }
}
