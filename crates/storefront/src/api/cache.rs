//! Cache types for catalog responses.

use loopstore_core::ProductId;

use super::types::{Category, Page, Product, ProductDetail};

/// Cache key for catalog responses.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(ProductId),
    /// Product listing, keyed by its encoded query string.
    Products(String),
    Categories,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<ProductDetail>),
    Products(Page<Product>),
    Categories(Vec<Category>),
}
