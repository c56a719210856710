//! Unified error handling with Sentry integration.
//!
//! Provides a unified `StorefrontError` type for front-ends. Call
//! [`StorefrontError::report`] before showing [`StorefrontError::user_message`]
//! so server-side and unexpected failures reach Sentry.

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::forms::ValidationError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::services::favorites::FavoritesError;
use crate::storage::StorageError;

/// Application-level error type for the storefront client.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Client-local storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Shop API call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Favorites operation failed.
    #[error("Favorites error: {0}")]
    Favorites(#[from] FavoritesError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// User input was rejected.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl StorefrontError {
    fn api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(e)
            | Self::Cart(CartError::Api(e))
            | Self::Favorites(FavoritesError::Api(e))
            | Self::Auth(AuthError::Api(e)) => Some(e),
            _ => None,
        }
    }

    /// Whether this failure is worth an error report: the API misbehaved,
    /// answered with something unparseable, or local state broke.
    #[must_use]
    pub fn is_reportable(&self) -> bool {
        if let Some(api) = self.api() {
            return matches!(
                api,
                ApiError::Parse(_) | ApiError::InvalidUrl(_)
            ) || api.status().is_some_and(|status| status >= 500);
        }
        matches!(
            self,
            Self::Storage(_) | Self::Config(_) | Self::Auth(AuthError::Storage(_))
        )
    }

    /// Capture to Sentry if [`is_reportable`](Self::is_reportable).
    pub fn report(&self) {
        if self.is_reportable() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront error"
            );
        }
    }

    /// Message suitable for the customer. Internal detail stays out.
    #[must_use]
    pub fn user_message(&self) -> String {
        if let Some(api) = self.api() {
            return api_message(api);
        }

        match self {
            Self::Config(e) => e.to_string(),
            Self::Storage(_) | Self::Auth(AuthError::Storage(_)) => {
                "Could not save local data".to_string()
            }
            Self::Cart(e) => match e {
                CartError::InsufficientStock {
                    product, available, ..
                } => format!("Only {available} of {product} in stock"),
                CartError::InvalidQuantity => "Quantity must be at least 1".to_string(),
                CartError::EmptyCart => "Your cart is empty".to_string(),
                CartError::CheckoutInProgress => "Your order is already being placed".to_string(),
                CartError::Validation(v) => validation_message(v),
                CartError::Api(_) => generic_message(),
            },
            Self::Favorites(_) => "Sign in to manage favorites".to_string(),
            Self::Auth(e) => match e {
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::InvalidCredentials => "Invalid email or password".to_string(),
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::Api(_) | AuthError::Storage(_) => generic_message(),
            },
            Self::Validation(v) => validation_message(v),
            Self::Api(_) => generic_message(),
        }
    }
}

fn api_message(error: &ApiError) -> String {
    match error {
        ApiError::Http(_) => "Could not reach the shop, check your connection".to_string(),
        ApiError::NotFound(_) => "Not found".to_string(),
        ApiError::Unauthorized => "Please sign in".to_string(),
        ApiError::Forbidden(_) => "You are not allowed to do that".to_string(),
        ApiError::RateLimited(secs) => format!("Too many requests, try again in {secs}s"),
        ApiError::Status { status, message } if *status < 500 && !message.is_empty() => {
            message.clone()
        }
        ApiError::Status { .. } | ApiError::Parse(_) | ApiError::InvalidUrl(_) => {
            "The shop is having trouble, please try again later".to_string()
        }
    }
}

fn generic_message() -> String {
    "Something went wrong".to_string()
}

fn validation_message(error: &ValidationError) -> String {
    error
        .fields
        .iter()
        .map(|f| f.message.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use loopstore_core::ProductId;

    use super::*;

    #[test]
    fn test_storefront_error_display() {
        let err = StorefrontError::from(CartError::EmptyCart);
        assert_eq!(err.to_string(), "Cart error: cart is empty");
    }

    #[test]
    fn test_user_message_hides_server_detail() {
        let err = StorefrontError::from(CartError::Api(ApiError::Status {
            status: 500,
            message: "Traceback (most recent call last)".to_string(),
        }));
        assert_eq!(
            err.user_message(),
            "The shop is having trouble, please try again later"
        );
        assert!(err.is_reportable());
    }

    #[test]
    fn test_user_message_passes_client_errors() {
        let err = StorefrontError::from(CartError::Api(ApiError::Status {
            status: 400,
            message: "items: Not enough stock for product Coat".to_string(),
        }));
        assert_eq!(err.user_message(), "items: Not enough stock for product Coat");
        assert!(!err.is_reportable());
    }

    #[test]
    fn test_stock_warning_is_not_reported() {
        let err = StorefrontError::from(CartError::InsufficientStock {
            product_id: ProductId::new(1),
            product: "Coat".to_string(),
            requested: 3,
            available: 2,
        });
        assert_eq!(err.user_message(), "Only 2 of Coat in stock");
        assert!(!err.is_reportable());
    }

    #[test]
    fn test_auth_messages() {
        let err = StorefrontError::from(AuthError::InvalidCredentials);
        assert_eq!(err.user_message(), "Invalid email or password");
        let err = StorefrontError::from(ApiError::Unauthorized);
        assert_eq!(err.user_message(), "Please sign in");
    }
}
