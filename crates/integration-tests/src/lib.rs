//! Integration tests for the Loopstore storefront client.
//!
//! Every test runs a [`Storefront`] against a `wiremock` shop API with a
//! throwaway data directory, so nothing needs to be running.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p loopstore-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `catalog` - Listings, caching, cart persistence and sync
//! - `checkout` - Order placement and failure handling
//! - `session` - Login, session restore, hydrate, logout
//! - `favorites` - Favorites mirror following the session

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::path::Path;

use loopstore_storefront::Storefront;
use loopstore_storefront::api::Product;
use loopstore_storefront::config::StorefrontConfig;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Session cookie the mock API hands out on login.
pub const SESSION_COOKIE: &str = "sessionid=s3ss10n";

/// A mock shop API plus a data directory the storefront persists into.
pub struct TestShop {
    pub server: MockServer,
    pub data_dir: TempDir,
}

impl TestShop {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
            data_dir: tempfile::tempdir().unwrap(),
        }
    }

    /// Base URL of the mock API, `/api` prefix included.
    #[must_use]
    pub fn api_url(&self) -> String {
        format!("{}/api", self.server.uri())
    }

    /// Open a storefront over the mock API. Calling it again simulates an
    /// app restart: state comes back from the data directory only.
    #[must_use]
    pub fn open(&self) -> Storefront {
        open_at(&self.api_url(), self.data_dir.path())
    }

    /// `GET products/{id}/` answers with `product`.
    pub async fn mount_product(&self, product: &Value) {
        let id = &product["id"];
        Mock::given(method("GET"))
            .and(path(format!("/api/products/{id}/")))
            .respond_with(ResponseTemplate::new(200).set_body_json(product))
            .mount(&self.server)
            .await;
    }

    /// `auth/login/` and `auth/me/` accept the session and answer with `user`.
    pub async fn mount_login(&self, user: &Value) {
        Mock::given(method("POST"))
            .and(path("/api/auth/login/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", format!("{SESSION_COOKIE}; Path=/"))
                    .set_body_json(user),
            )
            .mount(&self.server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/auth/me/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user))
            .mount(&self.server)
            .await;
    }
}

/// Open a storefront with the catalog cache disabled.
#[must_use]
pub fn open_at(api_url: &str, data_dir: &Path) -> Storefront {
    let config = StorefrontConfig::new(api_url, data_dir)
        .unwrap()
        .without_cache();
    Storefront::open(config).unwrap()
}

// =============================================================================
// Fixtures
// =============================================================================

#[must_use]
pub fn product_json(id: i64, price: &str, stock: i64) -> Value {
    json!({
        "id": id,
        "name": format!("Item {id}"),
        "slug": format!("item-{id}"),
        "price": price,
        "stock": stock,
        "condition": "good",
        "size": "M",
        "image": format!("/media/products/{id}.jpg")
    })
}

#[must_use]
pub fn product(id: i64, price: &str, stock: i64) -> Product {
    serde_json::from_value(product_json(id, price, stock)).unwrap()
}

#[must_use]
pub fn user_json() -> Value {
    json!({
        "id": 42,
        "email": "anna@example.com",
        "first_name": "Anna",
        "last_name": "Nowak"
    })
}
