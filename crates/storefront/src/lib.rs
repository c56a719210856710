//! Loopstore storefront client library.
//!
//! A typed client for the shop REST API plus the client-side state a
//! storefront front-end keeps: a persisted cart with stock checks and
//! checkout, a mirror of the customer's favorites, and the auth session.
//!
//! Open everything at once with [`Storefront::open`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod forms;
pub mod models;
pub mod services;
pub mod state;
pub mod storage;

pub use error::{Result, StorefrontError};
pub use state::Storefront;
