//! Domain types for the shop REST API.
//!
//! The API is the source of truth for all of these; the client only holds
//! read-only, possibly stale copies. Fields the API may omit default, so a
//! trimmed-down serializer on the server does not break decoding.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use loopstore_core::{
    CategoryId, Email, OrderId, OrderStatus, PaymentStatus, ProductCondition, ProductId,
    ReviewId, ShippingStatus, Size, TagId, UserId,
};

// =============================================================================
// Catalog Types
// =============================================================================

/// A product as listed by `products/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    /// Unit price. Accepts both `"19.99"` and `19.99` on the wire.
    pub price: Decimal,
    /// Image URL or media-relative path (see [`ApiClient::media_url`](super::ApiClient::media_url)).
    #[serde(default)]
    pub image: String,
    /// Units available at the time the product was fetched.
    #[serde(default)]
    pub stock: i64,
    /// The list endpoint sends the category id, the detail endpoint the
    /// nested category; both decode to the id.
    #[serde(default, deserialize_with = "category_id")]
    pub category: Option<CategoryId>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub condition: ProductCondition,
    #[serde(default)]
    pub size: Option<Size>,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub material: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
}

const fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CategoryRef {
    Id(CategoryId),
    Nested { id: CategoryId },
}

fn category_id<'de, D>(deserializer: D) -> Result<Option<CategoryId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<CategoryRef>::deserialize(deserializer)?.map(|category| match category {
            CategoryRef::Id(id) | CategoryRef::Nested { id } => id,
        }),
    )
}

impl Product {
    /// Whether at least one unit was in stock when fetched.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// A product as returned by `products/{id}/`, with related products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    #[serde(default)]
    pub related_products: Vec<Product>,
}

/// Product tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

/// Product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parent: Option<CategoryId>,
    #[serde(default)]
    pub products_count: u64,
}

/// A customer review of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    #[serde(default, alias = "user", alias = "username")]
    pub user_name: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Average rating of a set of reviews, `None` when there are none.
#[must_use]
pub fn average_rating(reviews: &[Review]) -> Option<Decimal> {
    if reviews.is_empty() {
        return None;
    }
    let sum: Decimal = reviews.iter().map(|r| Decimal::from(r.rating)).sum();
    Some((sum / Decimal::from(reviews.len())).round_dp(1))
}

// =============================================================================
// Pagination
// =============================================================================

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Whether another page follows this one.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

/// List endpoints answer either with a bare array or a paginated object,
/// depending on the server's pagination settings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Listing<T> {
    Paginated(Page<T>),
    Plain(Vec<T>),
}

impl<T> From<Listing<T>> for Page<T> {
    fn from(listing: Listing<T>) -> Self {
        match listing {
            Listing::Paginated(page) => page,
            Listing::Plain(results) => Self {
                count: results.len() as u64,
                next: None,
                previous: None,
                results,
            },
        }
    }
}

// =============================================================================
// Account Types
// =============================================================================

/// The signed-in customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    #[serde(default, alias = "firstName")]
    pub first_name: String,
    #[serde(default, alias = "lastName")]
    pub last_name: String,
}

impl User {
    /// "First Last", or the email when no name is on file.
    #[must_use]
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let name = name.trim();
        if name.is_empty() {
            self.email.to_string()
        } else {
            name.to_string()
        }
    }
}

/// Favorites come back either as bare products or wrapped in an entry
/// object that carries the product.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum FavoriteRecord {
    Wrapped { product: Product },
    Bare(Product),
}

impl From<FavoriteRecord> for Product {
    fn from(record: FavoriteRecord) -> Self {
        match record {
            FavoriteRecord::Wrapped { product } | FavoriteRecord::Bare(product) => product,
        }
    }
}

// =============================================================================
// Order Types
// =============================================================================

/// A line of an order payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemInput {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Decimal,
}

/// Body of `POST orders/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    pub name: String,
    pub email: Email,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub notes: String,
    pub items: Vec<OrderItemInput>,
    pub total_amount: Decimal,
}

/// A line of a stored order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    #[serde(default)]
    pub name: Option<String>,
    pub price: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub image: Option<String>,
}

/// An entry in an order's status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusEntry {
    pub status: OrderStatus,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

/// An order as stored by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default, alias = "customer_name")]
    pub name: String,
    #[serde(default, alias = "customer_email")]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub shipping_status: ShippingStatus,
    #[serde(default)]
    pub total_amount: Option<Decimal>,
    #[serde(default)]
    pub shipping_cost: Decimal,
    #[serde(default)]
    pub tracking_number: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub status_history: Vec<OrderStatusEntry>,
}

impl Order {
    /// Order total; falls back to Σ price × quantity + shipping when the API
    /// did not compute one.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.total_amount.unwrap_or_else(|| {
            self.items
                .iter()
                .map(|item| item.price * Decimal::from(item.quantity))
                .sum::<Decimal>()
                + self.shipping_cost
        })
    }

    /// Display reference: the order number if assigned, else `#id`.
    #[must_use]
    pub fn reference(&self) -> String {
        self.order_number
            .clone()
            .unwrap_or_else(|| format!("#{}", self.id))
    }
}

// =============================================================================
// Marketing Types
// =============================================================================

/// Body of `POST contact/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: Email,
    pub message: String,
}
