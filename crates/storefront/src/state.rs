//! Storefront state shared across a front-end.

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::task::JoinHandle;
use tracing::{info, instrument};

use loopstore_core::Price;

use crate::api::{ApiClient, ApiError, User};
use crate::config::StorefrontConfig;
use crate::error::StorefrontError;
use crate::models::CartAdjustment;
use crate::services::{AuthStore, CartStore, FavoritesStore};
use crate::storage::{FileStorage, Storage};

/// The storefront client: API client, client-local storage and the stores.
///
/// This struct is cheaply cloneable via `Arc`. Dropping the last clone stops
/// the favorites background task.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: StorefrontConfig,
    api: ApiClient,
    cart: CartStore,
    favorites: FavoritesStore,
    auth: AuthStore,
    favorites_task: JoinHandle<()>,
}

impl Drop for StorefrontInner {
    fn drop(&mut self) {
        self.favorites_task.abort();
    }
}

impl Storefront {
    /// Open the storefront over the configured data directory.
    ///
    /// Rehydrates the cart, the cached user and the session cookies. Must be
    /// called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created or the HTTP
    /// client fails to build.
    pub fn open(config: StorefrontConfig) -> Result<Self, StorefrontError> {
        let storage = FileStorage::open(&config.data_dir)?;
        Self::with_storage(config, Arc::new(storage))
    }

    /// Open the storefront over an explicit storage backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn with_storage(
        config: StorefrontConfig,
        storage: Arc<dyn Storage>,
    ) -> Result<Self, StorefrontError> {
        let api = ApiClient::new(&config.api)?;
        let auth = AuthStore::open(Arc::clone(&storage), api.clone());
        let cart = CartStore::open(storage, api.clone());
        let favorites = FavoritesStore::new(api.clone(), auth.subscribe());
        let favorites_task = favorites.follow_auth();

        info!(
            api = %config.api.base_url,
            data_dir = %config.data_dir.display(),
            cart_items = cart.items_count(),
            signed_in = auth.is_authenticated(),
            "Storefront opened"
        );

        Ok(Self {
            inner: Arc::new(StorefrontInner {
                config,
                api,
                cart,
                favorites,
                auth,
                favorites_task,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the shop API client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    #[must_use]
    pub fn favorites(&self) -> &FavoritesStore {
        &self.inner.favorites
    }

    #[must_use]
    pub fn auth(&self) -> &AuthStore {
        &self.inner.auth
    }

    /// An amount in the configured display currency.
    #[must_use]
    pub fn price(&self, amount: Decimal) -> Price {
        Price::new(amount, self.inner.config.currency)
    }

    /// Confirm the cached session with the API.
    ///
    /// The favorites mirror follows the outcome in the background; call
    /// `favorites().refresh()` to wait for it.
    pub async fn hydrate(&self) -> Option<User> {
        self.inner.auth.hydrate().await
    }

    /// Re-fetch every product in the cart and reconcile quantities with the
    /// current stock. Products the API no longer has are removed.
    ///
    /// # Errors
    ///
    /// Returns an error if a product fetch fails for any reason other than
    /// the product being gone. The cart is unchanged in that case.
    #[instrument(skip(self))]
    pub async fn sync_cart(&self) -> Result<Vec<CartAdjustment>, StorefrontError> {
        let mut fresh = Vec::new();
        let mut gone = Vec::new();

        for item in self.inner.cart.items() {
            match self.inner.api.fetch_product(item.product.id).await {
                Ok(detail) => fresh.push(detail.product),
                Err(ApiError::NotFound(_)) => gone.push(item.product),
                Err(e) => return Err(e.into()),
            }
        }

        let mut adjustments = self.inner.cart.reconcile(&fresh);
        for product in gone {
            if self.inner.cart.remove_from_cart(product.id) {
                adjustments.push(CartAdjustment::Removed {
                    product_id: product.id,
                    name: product.name,
                });
            }
        }

        info!(adjustments = adjustments.len(), "Cart synced");
        Ok(adjustments)
    }
}
