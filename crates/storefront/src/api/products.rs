//! Catalog endpoints: products, search, categories, reviews.

use reqwest::Method;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use loopstore_core::{ProductCondition, ProductId, Size};

use super::cache::{CacheKey, CacheValue};
use super::client::ApiClient;
use super::types::{Category, Listing, Page, Product, ProductDetail, Review};
use super::ApiError;

/// Filters for `products/`. Unset fields are omitted from the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Category id or slug
    pub category: Option<String>,
    pub size: Option<Size>,
    pub condition: Option<ProductCondition>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    /// 1-based page number
    pub page: Option<u32>,
}

impl ProductFilter {
    fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(category) = &self.category {
            params.push(("category", category.trim().to_string()));
        }
        if let Some(size) = self.size {
            params.push(("size", size.as_str().to_string()));
        }
        if let Some(condition) = self.condition {
            params.push(("condition", condition.as_str().to_string()));
        }
        if let Some(min) = self.min_price {
            params.push(("min_price", min.to_string()));
        }
        if let Some(max) = self.max_price {
            params.push(("max_price", max.to_string()));
        }
        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }
        params
    }
}

#[derive(Serialize)]
struct ReviewInput<'a> {
    rating: u8,
    comment: &'a str,
}

impl ApiClient {
    // =========================================================================
    // Products
    // =========================================================================

    /// List products matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self, filter: &ProductFilter) -> Result<Page<Product>, ApiError> {
        let url = self.endpoint_with_query("products/", &filter.query_params())?;
        let key = CacheKey::Products(url.query().unwrap_or_default().to_string());

        if let Some(CacheValue::Products(page)) = self.cached(&key).await {
            return Ok(page);
        }

        let page: Page<Product> = self.get_json::<Listing<Product>>(url).await?.into();
        self.cache_insert(key, CacheValue::Products(page.clone()))
            .await;
        Ok(page)
    }

    /// Get one product with its related products.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the product does not exist, or an
    /// error if the API request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<ProductDetail, ApiError> {
        if let Some(CacheValue::Product(detail)) = self.cached(&CacheKey::Product(id)).await {
            return Ok(*detail);
        }
        self.fetch_product(id).await
    }

    /// Get one product straight from the API, refreshing the cached copy.
    ///
    /// Used where stale stock matters (cart reconciliation).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the product does not exist, or an
    /// error if the API request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn fetch_product(&self, id: ProductId) -> Result<ProductDetail, ApiError> {
        let detail: ProductDetail = self.get_json(self.endpoint(&format!("products/{id}/"))?).await?;
        self.cache_insert(CacheKey::Product(id), CacheValue::Product(Box::new(detail.clone())))
            .await;
        Ok(detail)
    }

    /// Full-text product search. Not cached.
    ///
    /// A blank query returns an empty page without calling the API.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn search_products(&self, query: &str) -> Result<Page<Product>, ApiError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Page {
                count: 0,
                next: None,
                previous: None,
                results: Vec::new(),
            });
        }
        let url = self.endpoint_with_query("products/search/", &[("q", query.to_string())])?;
        Ok(self.get_json::<Listing<Product>>(url).await?.into())
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// List all categories.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        if let Some(CacheValue::Categories(categories)) = self.cached(&CacheKey::Categories).await {
            return Ok(categories);
        }

        let page: Page<Category> = self
            .get_json::<Listing<Category>>(self.endpoint("categories/")?)
            .await?
            .into();
        self.cache_insert(CacheKey::Categories, CacheValue::Categories(page.results.clone()))
            .await;
        Ok(page.results)
    }

    // =========================================================================
    // Reviews
    // =========================================================================

    /// List the reviews of a product.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn list_reviews(&self, id: ProductId) -> Result<Vec<Review>, ApiError> {
        let url = self.endpoint(&format!("products/{id}/reviews/"))?;
        let page: Page<Review> = self.get_json::<Listing<Review>>(url).await?.into();
        Ok(page.results)
    }

    /// Post a review for a product. Requires a session.
    ///
    /// Input is not validated here; see [`crate::forms::ReviewForm`].
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the review or the request fails.
    #[instrument(skip(self, comment), fields(product_id = %id))]
    pub async fn submit_review(
        &self,
        id: ProductId,
        rating: u8,
        comment: &str,
    ) -> Result<Review, ApiError> {
        let url = self.endpoint(&format!("products/{id}/reviews/"))?;
        self.send_json(Method::POST, url, &ReviewInput { rating, comment })
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::ApiConfig;

    fn client(server: &MockServer, ttl: Option<Duration>) -> ApiClient {
        ApiClient::new(&ApiConfig {
            base_url: url::Url::parse(&format!("{}/api/", server.uri())).unwrap(),
            timeout: Duration::from_secs(5),
            cache_ttl: ttl,
        })
        .unwrap()
    }

    #[test]
    fn test_filter_query_params() {
        assert!(ProductFilter::default().query_params().is_empty());

        let filter = ProductFilter {
            category: Some("jackets".to_string()),
            size: Some(Size::XL),
            condition: Some(ProductCondition::LikeNew),
            min_price: Some(Decimal::new(1000, 2)),
            max_price: None,
            page: Some(2),
        };
        assert_eq!(
            filter.query_params(),
            vec![
                ("category", "jackets".to_string()),
                ("size", "XL".to_string()),
                ("condition", "like_new".to_string()),
                ("min_price", "10.00".to_string()),
                ("page", "2".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_get_product_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/products/7/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": 7, "name": "Coat", "price": "80.00", "stock": 1})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let api = client(&server, Some(Duration::from_secs(60)));
        let first = api.get_product(ProductId::new(7)).await.unwrap();
        let second = api.get_product(ProductId::new(7)).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.product.name, "Coat");
    }

    #[tokio::test]
    async fn test_fetch_product_decodes_detail_serializer_shape() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/products/7/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 7,
                "name": "Coat",
                "price": "80.00",
                "stock": 1,
                "category": {"id": 3, "name": "Jackets", "slug": "jackets"},
                "created_at": "2024-03-01T10:00:00Z",
                "updated_at": "2024-03-02T08:30:00Z",
                "related_products": [{"id": 8, "name": "Belt", "price": "5.00", "category": 3}]
            })))
            .mount(&server)
            .await;

        let api = client(&server, None);
        let detail = api.fetch_product(ProductId::new(7)).await.unwrap();
        assert_eq!(detail.product.category, Some(loopstore_core::CategoryId::new(3)));
        assert_eq!(detail.related_products.len(), 1);
    }

    #[tokio::test]
    async fn test_list_products_sends_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/products/"))
            .and(query_param("size", "M"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "name": "Shirt", "price": "15.00", "size": "M"}
            ])))
            .mount(&server)
            .await;

        let api = client(&server, None);
        let page = api
            .list_products(&ProductFilter {
                size: Some(Size::M),
                ..ProductFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(page.count, 1);
        assert_eq!(page.results[0].name, "Shirt");
    }

    #[tokio::test]
    async fn test_search_blank_query_skips_request() {
        let server = MockServer::start().await;
        let api = client(&server, None);
        let page = api.search_products("   ").await.unwrap();
        assert!(page.results.is_empty());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_product_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/products/404/"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Not found."})))
            .mount(&server)
            .await;

        let api = client(&server, None);
        let err = api.get_product(ProductId::new(404)).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
