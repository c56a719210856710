//! Client-side state models.
//!
//! Pure data and transition logic; persistence and notification live in
//! [`crate::services`].

pub mod cart;
pub mod session;

pub use cart::{Cart, CartAdjustment, CartItem};
pub use session::StoredSession;
