//! Client-side stores.
//!
//! # Services
//!
//! - `auth` - Signed-in customer and session cookies
//! - `cart` - Persisted cart with stock checks and checkout
//! - `favorites` - Mirror of the customer's server-side favorites
//!
//! Each store keeps its state in a `tokio::sync::watch` channel, so callers
//! can read a snapshot synchronously or `subscribe()` to changes.

pub mod auth;
pub mod cart;
pub mod favorites;

pub use auth::{AuthError, AuthStore};
pub use cart::{CartError, CartStore};
pub use favorites::{FavoritesError, FavoritesStore};
