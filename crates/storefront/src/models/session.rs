//! Session-related types.
//!
//! Types persisted in client-local storage for authentication state.

use serde::{Deserialize, Serialize};

/// Session cookies captured from the API client's cookie jar.
///
/// Stored so the customer stays signed in across process restarts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    /// `Cookie` header value, e.g. `sessionid=...; csrftoken=...`.
    pub cookies: String,
}

/// Client-local storage keys.
pub mod keys {
    /// Key for the persisted cart items.
    pub const CART: &str = "cart";

    /// Key for the cached profile of the signed-in customer.
    pub const USER: &str = "user";

    /// Key for the persisted session cookies.
    pub const SESSION: &str = "session";
}
