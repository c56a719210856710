//! Cart store.
//!
//! Owns the client-local cart: every mutation updates the in-memory state,
//! notifies subscribers and rewrites the persisted copy under the `cart` key.
//! Checkout submits the cart to `orders/` and clears it on success.

mod error;

pub use error::CartError;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use loopstore_core::ProductId;

use crate::api::{ApiClient, Order, Product};
use crate::error::add_breadcrumb;
use crate::forms::ShippingDetails;
use crate::models::session::keys;
use crate::models::{Cart, CartAdjustment, CartItem};
use crate::storage::{Storage, StorageExt};

/// Persisted, observable shopping cart.
///
/// Cheap to clone; clones share the same cart.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    state: watch::Sender<Cart>,
    storage: Arc<dyn Storage>,
    api: ApiClient,
    checking_out: AtomicBool,
}

impl CartStore {
    /// Open the store, rehydrating the persisted cart.
    ///
    /// An unreadable persisted cart is logged and replaced by an empty one.
    /// Zero-quantity entries and duplicate products in the persisted copy are
    /// cleaned up (see [`Cart::normalize`]) and the result written back.
    #[must_use]
    pub fn open(storage: Arc<dyn Storage>, api: ApiClient) -> Self {
        let (cart, repaired) = match storage.load::<Cart>(keys::CART) {
            Ok(Some(mut cart)) => {
                let repaired = cart.normalize();
                (cart, repaired)
            }
            Ok(None) => (Cart::default(), false),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable persisted cart");
                (Cart::default(), false)
            }
        };

        let store = Self {
            inner: Arc::new(CartStoreInner {
                state: watch::Sender::new(cart),
                storage,
                api,
                checking_out: AtomicBool::new(false),
            }),
        };

        if repaired {
            warn!("Repaired persisted cart with empty or duplicate entries");
            store.persist();
        }
        store
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// A copy of the current cart.
    #[must_use]
    pub fn snapshot(&self) -> Cart {
        self.inner.state.borrow().clone()
    }

    /// Current items in insertion order.
    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.inner.state.borrow().items().to_vec()
    }

    /// Σ price × quantity of the current items.
    #[must_use]
    pub fn cart_total(&self) -> Decimal {
        self.inner.state.borrow().total()
    }

    /// Σ quantity of the current items.
    #[must_use]
    pub fn items_count(&self) -> u64 {
        self.inner.state.borrow().items_count()
    }

    /// Whether a checkout is waiting for the API.
    #[must_use]
    pub fn is_processing_checkout(&self) -> bool {
        self.inner.checking_out.load(Ordering::Acquire)
    }

    /// Receive the cart after every mutation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.inner.state.subscribe()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` units of `product`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InsufficientStock` (a warning; the cart is left
    /// unchanged) or `CartError::InvalidQuantity` for zero.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub fn add_to_cart(&self, product: Product, quantity: u32) -> Result<(), CartError> {
        let id = product.id;
        let mut outcome = Ok(());
        self.inner.state.send_if_modified(|cart| {
            outcome = cart.add(product, quantity);
            outcome.is_ok()
        });

        match &outcome {
            Ok(()) => {
                let id = id.to_string();
                add_breadcrumb("cart", "Added to cart", Some(&[("product_id", id.as_str())]));
                self.persist();
            }
            Err(e) => warn!(error = %e, "Add to cart rejected"),
        }
        outcome
    }

    /// Remove the entry for `id`. Returns `false` if there was none.
    #[instrument(skip(self))]
    pub fn remove_from_cart(&self, id: ProductId) -> bool {
        let removed = self.inner.state.send_if_modified(|cart| cart.remove(id));
        if removed {
            let id = id.to_string();
            add_breadcrumb("cart", "Removed from cart", Some(&[("product_id", id.as_str())]));
            self.persist();
        }
        removed
    }

    /// Set the quantity of an entry; zero removes it, a missing id is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InsufficientStock` when `quantity` exceeds the
    /// entry's last-known stock. The cart is unchanged.
    #[instrument(skip(self))]
    pub fn update_quantity(&self, id: ProductId, quantity: u32) -> Result<bool, CartError> {
        let mut outcome = Ok(false);
        self.inner.state.send_if_modified(|cart| {
            outcome = cart.update_quantity(id, quantity);
            matches!(outcome, Ok(true))
        });

        match &outcome {
            Ok(true) => self.persist(),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "Quantity update rejected"),
        }
        outcome
    }

    /// Empty the cart.
    #[instrument(skip(self))]
    pub fn clear_cart(&self) {
        if self.inner.state.send_if_modified(Cart::clear) {
            self.persist();
        }
    }

    /// Apply fresh product data: refresh price and stock, clamp quantities
    /// and drop sold-out entries.
    #[instrument(skip_all, fields(products = products.len()))]
    pub fn reconcile(&self, products: &[Product]) -> Vec<CartAdjustment> {
        let mut adjustments = Vec::new();
        let changed = self.inner.state.send_if_modified(|cart| {
            let before = cart.clone();
            adjustments = cart.reconcile(products);
            *cart != before
        });

        for adjustment in &adjustments {
            match adjustment {
                CartAdjustment::Clamped { product_id, from, to, .. } => {
                    warn!(%product_id, from, to, "Cart quantity clamped to stock");
                }
                CartAdjustment::Removed { product_id, .. } => {
                    warn!(%product_id, "Sold-out product removed from cart");
                }
                CartAdjustment::PriceChanged { product_id, from, to, .. } => {
                    info!(%product_id, %from, %to, "Cart price refreshed");
                }
            }
        }
        if changed {
            self.persist();
        }
        adjustments
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Submit the cart as an order.
    ///
    /// On success the cart is cleared and the created order returned. On
    /// failure the cart is left intact.
    ///
    /// # Errors
    ///
    /// Returns `CartError::CheckoutInProgress` if another checkout is
    /// running, `CartError::EmptyCart`, `CartError::Validation` for bad
    /// shipping details, or `CartError::Api` if the API rejects the order.
    #[instrument(skip_all)]
    pub async fn checkout(&self, details: ShippingDetails) -> Result<Order, CartError> {
        let _guard = CheckoutGuard::acquire(&self.inner.checking_out)?;

        let cart = self.snapshot();
        if cart.is_empty() {
            return Err(CartError::EmptyCart);
        }

        let request = details.into_order(cart.order_items(), cart.total())?;
        add_breadcrumb("checkout", "Submitting order", None);

        let order = self.inner.api.create_order(&request).await.map_err(|e| {
            warn!(error = %e, "Checkout failed, cart kept");
            CartError::Api(e)
        })?;

        info!(order_id = %order.id, "Checkout complete");
        self.clear_cart();
        Ok(order)
    }

    fn persist(&self) {
        let cart = self.snapshot();
        if let Err(e) = self.inner.storage.save(keys::CART, &cart) {
            warn!(error = %e, "Failed to persist cart");
        }
    }
}

/// Holds the checkout flag; released on drop, including when the checkout
/// future is dropped mid-request.
struct CheckoutGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> CheckoutGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, CartError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| CartError::CheckoutInProgress)?;
        Ok(Self { flag })
    }
}

impl Drop for CheckoutGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::ApiConfig;
    use crate::storage::MemoryStorage;

    fn api(base: &str) -> ApiClient {
        ApiClient::new(&ApiConfig {
            base_url: url::Url::parse(base).unwrap(),
            timeout: Duration::from_secs(5),
            cache_ttl: None,
        })
        .unwrap()
    }

    fn product(id: i64, price: &str, stock: i64) -> Product {
        serde_json::from_value(json!({
            "id": id, "name": format!("Item {id}"), "price": price, "stock": stock
        }))
        .unwrap()
    }

    fn shipping() -> ShippingDetails {
        ShippingDetails {
            first_name: "Jan".to_string(),
            last_name: "Nowak".to_string(),
            email: "jan@example.com".to_string(),
            address: "Długa 5/2".to_string(),
            city: "Gdańsk".to_string(),
            postal_code: "80-001".to_string(),
            country: "Poland".to_string(),
            ..ShippingDetails::default()
        }
    }

    #[test]
    fn test_mutations_persist() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let store = CartStore::open(Arc::clone(&storage), api("http://localhost/api/"));

        store.add_to_cart(product(1, "10.00", 5), 2).unwrap();
        let persisted: Cart = storage.load(keys::CART).unwrap().unwrap();
        assert_eq!(persisted.items_count(), 2);

        store.clear_cart();
        let persisted: Cart = storage.load(keys::CART).unwrap().unwrap();
        assert!(persisted.is_empty());
    }

    #[test]
    fn test_rehydrates_and_tolerates_corruption() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        CartStore::open(Arc::clone(&storage), api("http://localhost/api/"))
            .add_to_cart(product(3, "4.00", 9), 3)
            .unwrap();

        let reopened = CartStore::open(Arc::clone(&storage), api("http://localhost/api/"));
        assert_eq!(reopened.items_count(), 3);
        assert_eq!(reopened.cart_total(), Decimal::new(1200, 2));

        storage.set_raw(keys::CART, "{broken").unwrap();
        let reopened = CartStore::open(storage, api("http://localhost/api/"));
        assert!(reopened.snapshot().is_empty());
    }

    #[test]
    fn test_open_repairs_invalid_persisted_entries() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        storage
            .set_raw(
                keys::CART,
                &json!([
                    {"id": 1, "name": "Item 1", "price": "2.00", "stock": 9, "quantity": 2},
                    {"id": 2, "name": "Item 2", "price": "5.00", "stock": 9, "quantity": 0},
                    {"id": 1, "name": "Item 1", "price": "2.50", "stock": 9, "quantity": 1}
                ])
                .to_string(),
            )
            .unwrap();

        let store = CartStore::open(Arc::clone(&storage), api("http://localhost/api/"));
        let items = store.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 3);
        assert_eq!(store.cart_total(), Decimal::new(750, 2));

        let persisted: Cart = storage.load(keys::CART).unwrap().unwrap();
        assert_eq!(persisted, store.snapshot());
    }

    #[test]
    fn test_rejected_add_does_not_notify() {
        let store = CartStore::open(Arc::new(MemoryStorage::new()), api("http://localhost/api/"));
        let mut rx = store.subscribe();

        assert!(store.add_to_cart(product(1, "1.00", 1), 2).is_err());
        assert!(!rx.has_changed().unwrap());

        store.add_to_cart(product(1, "1.00", 1), 1).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().items_count(), 1);

        assert!(!store.remove_from_cart(ProductId::new(77)));
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_checkout_empty_cart() {
        let store = CartStore::open(Arc::new(MemoryStorage::new()), api("http://localhost/api/"));
        assert!(matches!(
            store.checkout(shipping()).await,
            Err(CartError::EmptyCart)
        ));
        assert!(!store.is_processing_checkout());
    }

    #[tokio::test]
    async fn test_checkout_invalid_details_keeps_cart() {
        let store = CartStore::open(Arc::new(MemoryStorage::new()), api("http://localhost/api/"));
        store.add_to_cart(product(1, "10.00", 5), 1).unwrap();

        let err = store.checkout(ShippingDetails::default()).await.unwrap_err();
        assert!(matches!(err, CartError::Validation(_)));
        assert_eq!(store.items_count(), 1);
    }

    #[tokio::test]
    async fn test_checkout_success_clears_cart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/orders/"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 501,
                "name": "Jan Nowak",
                "email": "jan@example.com",
                "items": [{"product_id": 1, "price": "10.00", "quantity": 2}],
                "total_amount": "20.00"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let store = CartStore::open(Arc::clone(&storage), api(&format!("{}/api/", server.uri())));
        store.add_to_cart(product(1, "10.00", 5), 2).unwrap();

        let order = store.checkout(shipping()).await.unwrap();
        assert_eq!(order.id.get(), 501);
        assert!(store.snapshot().is_empty());
        assert!(!store.is_processing_checkout());
        let persisted: Cart = storage.load(keys::CART).unwrap().unwrap();
        assert!(persisted.is_empty());
    }

    #[tokio::test]
    async fn test_checkout_rejection_keeps_cart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/orders/"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "items": ["Not enough stock for product Item 1. Available: 1, requested: 2"]
            })))
            .mount(&server)
            .await;

        let store = CartStore::open(
            Arc::new(MemoryStorage::new()),
            api(&format!("{}/api/", server.uri())),
        );
        store.add_to_cart(product(1, "10.00", 5), 2).unwrap();

        let err = store.checkout(shipping()).await.unwrap_err();
        assert!(matches!(
            err,
            CartError::Api(crate::api::ApiError::Status { status: 400, .. })
        ));
        assert_eq!(store.items_count(), 2);
        assert!(!store.is_processing_checkout());
    }

    #[test]
    fn test_checkout_guard_is_exclusive() {
        let flag = AtomicBool::new(false);
        let guard = CheckoutGuard::acquire(&flag).unwrap();
        assert!(matches!(
            CheckoutGuard::acquire(&flag),
            Err(CartError::CheckoutInProgress)
        ));
        drop(guard);
        assert!(CheckoutGuard::acquire(&flag).is_ok());
    }
}
