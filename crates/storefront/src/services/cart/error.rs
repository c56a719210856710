//! Cart error types.

use thiserror::Error;

use loopstore_core::ProductId;

use crate::api::ApiError;
use crate::forms::ValidationError;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The requested quantity exceeds the last-known stock. The cart is unchanged.
    #[error("not enough stock for {product}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        product: String,
        requested: u32,
        available: i64,
    },

    /// A quantity of zero was passed where at least one unit is required.
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    /// Checkout was attempted with nothing in the cart.
    #[error("cart is empty")]
    EmptyCart,

    /// Another checkout is still waiting for the API.
    #[error("checkout already in progress")]
    CheckoutInProgress,

    /// Shipping details failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The API rejected the order or could not be reached.
    #[error("order failed: {0}")]
    Api(#[from] ApiError),
}

impl CartError {
    /// Whether this is a stock warning rather than a failure.
    #[must_use]
    pub const fn is_stock_warning(&self) -> bool {
        matches!(self, Self::InsufficientStock { .. })
    }
}
