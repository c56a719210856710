//! Session and favorites endpoints.
//!
//! The API authenticates with a Django session cookie. Successful `login`
//! and `register` calls leave `sessionid` (and `csrftoken`) in the client's
//! cookie jar; every later call sends them back.

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::instrument;

use loopstore_core::{Email, ProductId};

use super::client::ApiClient;
use super::types::{FavoriteRecord, Listing, Page, Product, User};
use super::ApiError;

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct Registration<'a> {
    email: &'a str,
    password: &'a str,
    first_name: &'a str,
    last_name: &'a str,
}

#[derive(Serialize)]
struct FavoriteInput {
    product_id: ProductId,
}

impl ApiClient {
    // =========================================================================
    // Session
    // =========================================================================

    /// Sign in and return the customer profile.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized`/`Forbidden`/`Status` if the API
    /// rejects the credentials, or an error if the request fails.
    #[instrument(skip(self, email, password), fields(email_domain = %email.domain()))]
    pub async fn login(&self, email: &Email, password: &SecretString) -> Result<User, ApiError> {
        let body = Credentials {
            email: email.as_str(),
            password: password.expose_secret(),
        };
        self.send_json(Method::POST, self.endpoint("auth/login/")?, &body)
            .await
    }

    /// Create an account. The API signs the new customer in.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` if the API rejects the registration (e.g.
    /// email already taken), or an error if the request fails.
    #[instrument(skip_all, fields(email_domain = %email.domain()))]
    pub async fn register(
        &self,
        email: &Email,
        password: &SecretString,
        first_name: &str,
        last_name: &str,
    ) -> Result<User, ApiError> {
        let body = Registration {
            email: email.as_str(),
            password: password.expose_secret(),
            first_name: first_name.trim(),
            last_name: last_name.trim(),
        };
        self.send_json(Method::POST, self.endpoint("auth/register/")?, &body)
            .await
    }

    /// End the server-side session.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), ApiError> {
        self.send_ignoring_body(Method::POST, self.endpoint("auth/logout/")?, None::<&()>)
            .await
    }

    /// The customer the current session belongs to.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` without a valid session, or an error
    /// if the request fails.
    #[instrument(skip(self))]
    pub async fn me(&self) -> Result<User, ApiError> {
        self.get_json(self.endpoint("auth/me/")?).await
    }

    // =========================================================================
    // Favorites
    // =========================================================================

    /// The signed-in customer's favorite products.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` without a session, or an error if the
    /// request fails.
    #[instrument(skip(self))]
    pub async fn list_favorites(&self) -> Result<Vec<Product>, ApiError> {
        let page: Page<FavoriteRecord> = self
            .get_json::<Listing<FavoriteRecord>>(self.endpoint("favorites/")?)
            .await?
            .into();
        Ok(page.results.into_iter().map(Product::from).collect())
    }

    /// Add a product to the customer's favorites.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the call or the request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn add_favorite(&self, id: ProductId) -> Result<(), ApiError> {
        self.send_ignoring_body(
            Method::POST,
            self.endpoint("favorites/")?,
            Some(&FavoriteInput { product_id: id }),
        )
        .await
    }

    /// Remove a product from the customer's favorites.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the call or the request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn remove_favorite(&self, id: ProductId) -> Result<(), ApiError> {
        self.send_ignoring_body(
            Method::DELETE,
            self.endpoint(&format!("favorites/{id}/"))?,
            None::<&()>,
        )
        .await
    }
}
