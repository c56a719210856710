//! Favorites store.
//!
//! A local mirror of the signed-in customer's server-side favorites. Every
//! change is an API round trip first; the mirror only changes on success.
//! The mirror is corrected by a full re-fetch whenever the session changes.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use loopstore_core::ProductId;

use crate::api::{ApiClient, ApiError, Product, User};

/// Errors that can occur during favorites operations.
#[derive(Debug, Error)]
pub enum FavoritesError {
    /// Favorites belong to an account; nobody is signed in.
    #[error("sign in to manage favorites")]
    NotAuthenticated,

    /// The API rejected the change or could not be reached.
    #[error("favorites request failed: {0}")]
    Api(#[from] ApiError),
}

/// Observable mirror of the customer's favorites.
#[derive(Clone)]
pub struct FavoritesStore {
    inner: Arc<FavoritesStoreInner>,
}

struct FavoritesStoreInner {
    state: watch::Sender<Vec<Product>>,
    api: ApiClient,
    auth: watch::Receiver<Option<User>>,
}

impl FavoritesStore {
    /// Create an empty mirror that reads the session from `auth`.
    #[must_use]
    pub fn new(api: ApiClient, auth: watch::Receiver<Option<User>>) -> Self {
        Self {
            inner: Arc::new(FavoritesStoreInner {
                state: watch::Sender::new(Vec::new()),
                api,
                auth,
            }),
        }
    }

    fn is_authenticated(&self) -> bool {
        self.inner.auth.borrow().is_some()
    }

    /// Current favorites.
    #[must_use]
    pub fn favorites(&self) -> Vec<Product> {
        self.inner.state.borrow().clone()
    }

    /// Whether `id` is in the mirror.
    #[must_use]
    pub fn is_favorite(&self, id: ProductId) -> bool {
        self.inner.state.borrow().iter().any(|p| p.id == id)
    }

    /// Receive the mirror after every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<Product>> {
        self.inner.state.subscribe()
    }

    /// Add `product` to the customer's favorites.
    ///
    /// # Errors
    ///
    /// Returns `FavoritesError::NotAuthenticated` without a session, or
    /// `FavoritesError::Api` if the API call fails. The mirror is unchanged
    /// on error.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add(&self, product: Product) -> Result<(), FavoritesError> {
        if !self.is_authenticated() {
            return Err(FavoritesError::NotAuthenticated);
        }
        self.inner.api.add_favorite(product.id).await?;

        self.inner.state.send_if_modified(|favorites| {
            if favorites.iter().any(|p| p.id == product.id) {
                return false;
            }
            favorites.push(product);
            true
        });
        Ok(())
    }

    /// Remove `id` from the customer's favorites.
    ///
    /// # Errors
    ///
    /// Returns `FavoritesError::NotAuthenticated` without a session, or
    /// `FavoritesError::Api` if the API call fails. The mirror is unchanged
    /// on error.
    #[instrument(skip(self))]
    pub async fn remove(&self, id: ProductId) -> Result<(), FavoritesError> {
        if !self.is_authenticated() {
            return Err(FavoritesError::NotAuthenticated);
        }
        self.inner.api.remove_favorite(id).await?;

        self.inner.state.send_if_modified(|favorites| {
            let before = favorites.len();
            favorites.retain(|p| p.id != id);
            favorites.len() != before
        });
        Ok(())
    }

    /// Replace the mirror with the server's list, or clear it when signed out.
    ///
    /// # Errors
    ///
    /// Returns `FavoritesError::Api` if the fetch fails; the mirror is
    /// cleared when the session turns out to be invalid and kept otherwise.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<(), FavoritesError> {
        if !self.is_authenticated() {
            self.clear();
            return Ok(());
        }

        match self.inner.api.list_favorites().await {
            Ok(mut products) => {
                let mut seen = HashSet::new();
                products.retain(|p| seen.insert(p.id));
                debug!(count = products.len(), "Favorites refreshed");
                self.inner.state.send_replace(products);
                Ok(())
            }
            Err(e) => {
                if e.is_auth_failure() {
                    self.clear();
                }
                Err(e.into())
            }
        }
    }

    /// Re-fetch in full whenever the session changes.
    ///
    /// The task ends when the auth store is dropped.
    #[must_use = "dropping the handle detaches the task; keep it to abort"]
    pub fn follow_auth(&self) -> JoinHandle<()> {
        let store = self.clone();
        let mut auth = self.inner.auth.clone();
        tokio::spawn(async move {
            while auth.changed().await.is_ok() {
                if let Err(e) = store.refresh().await {
                    warn!(error = %e, "Failed to refresh favorites after session change");
                }
            }
        })
    }

    fn clear(&self) {
        self.inner.state.send_if_modified(|favorites| {
            let had = !favorites.is_empty();
            favorites.clear();
            had
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::ApiConfig;

    fn api(server: &MockServer) -> ApiClient {
        ApiClient::new(&ApiConfig {
            base_url: url::Url::parse(&format!("{}/api/", server.uri())).unwrap(),
            timeout: Duration::from_secs(5),
            cache_ttl: None,
        })
        .unwrap()
    }

    fn user() -> User {
        serde_json::from_value(json!({"id": 1, "email": "a@example.com"})).unwrap()
    }

    fn product(id: i64) -> Product {
        serde_json::from_value(json!({"id": id, "name": "Hat", "price": "9.00", "stock": 1}))
            .unwrap()
    }

    #[tokio::test]
    async fn test_requires_session() {
        let server = MockServer::start().await;
        let (_tx, rx) = watch::channel(None);
        let store = FavoritesStore::new(api(&server), rx);

        assert!(matches!(
            store.add(product(1)).await,
            Err(FavoritesError::NotAuthenticated)
        ));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_then_remove() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/favorites/"))
            .and(body_json(json!({"product_id": 5})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1, "product": 5})))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/favorites/5/"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let (_tx, rx) = watch::channel(Some(user()));
        let store = FavoritesStore::new(api(&server), rx);

        store.add(product(5)).await.unwrap();
        store.add(product(5)).await.unwrap();
        assert!(store.is_favorite(ProductId::new(5)));
        assert_eq!(store.favorites().len(), 1);

        store.remove(ProductId::new(5)).await.unwrap();
        assert!(!store.is_favorite(ProductId::new(5)));
    }

    #[tokio::test]
    async fn test_failed_add_leaves_mirror() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/favorites/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (_tx, rx) = watch::channel(Some(user()));
        let store = FavoritesStore::new(api(&server), rx);

        assert!(matches!(
            store.add(product(5)).await,
            Err(FavoritesError::Api(ApiError::Status { status: 500, .. }))
        ));
        assert!(!store.is_favorite(ProductId::new(5)));
    }

    #[tokio::test]
    async fn test_follow_auth_refetches_and_clears() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/favorites/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 10, "product": {"id": 3, "name": "Bag", "price": "30.00"}}
            ])))
            .mount(&server)
            .await;

        let (tx, rx) = watch::channel(None);
        let store = FavoritesStore::new(api(&server), rx);
        let mut changes = store.subscribe();
        let task = store.follow_auth();

        tx.send_replace(Some(user()));
        tokio::time::timeout(Duration::from_secs(5), changes.changed())
            .await
            .unwrap()
            .unwrap();
        assert!(store.is_favorite(ProductId::new(3)));

        tx.send_replace(None);
        tokio::time::timeout(Duration::from_secs(5), changes.changed())
            .await
            .unwrap()
            .unwrap();
        assert!(store.favorites().is_empty());

        drop(tx);
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }
}
