//! Integration tests for catalog listings and the persisted cart.

#![allow(clippy::unwrap_used)]

use loopstore_core::ProductId;
use loopstore_integration_tests::{TestShop, product, product_json};
use loopstore_storefront::api::ProductFilter;
use loopstore_storefront::models::CartAdjustment;
use rust_decimal::Decimal;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

// =============================================================================
// Listings
// =============================================================================

#[tokio::test]
async fn test_paginated_listing() {
    let shop = TestShop::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products/"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 25,
            "next": format!("{}/api/products/?page=3", shop.server.uri()),
            "previous": format!("{}/api/products/?page=1", shop.server.uri()),
            "results": [product_json(11, "20.00", 1), product_json(12, "25.00", 0)]
        })))
        .mount(&shop.server)
        .await;

    let store = shop.open();
    let page = store
        .api()
        .list_products(&ProductFilter {
            page: Some(2),
            ..ProductFilter::default()
        })
        .await
        .unwrap();

    assert_eq!(page.count, 25);
    assert!(page.has_next());
    assert_eq!(page.results.len(), 2);
    assert!(!page.results[1].in_stock());
}

#[tokio::test]
async fn test_bare_array_listing() {
    let shop = TestShop::start().await;
    Mock::given(method("GET"))
        .and(path("/api/categories/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "Jackets", "slug": "jackets", "products_count": 4},
            {"id": 2, "name": "Shoes", "slug": "shoes"}
        ])))
        .mount(&shop.server)
        .await;

    let categories = shop.open().api().list_categories().await.unwrap();
    assert_eq!(categories.len(), 2);
    assert_eq!(categories[0].products_count, 4);
    assert_eq!(categories[1].products_count, 0);
}

#[tokio::test]
async fn test_search_sends_query() {
    let shop = TestShop::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products/search/"))
        .and(query_param("q", "denim jacket"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([product_json(3, "49.90", 1)])))
        .expect(1)
        .mount(&shop.server)
        .await;

    let page = shop.open().api().search_products(" denim jacket ").await.unwrap();
    assert_eq!(page.results[0].id, ProductId::new(3));
}

// =============================================================================
// Cart persistence
// =============================================================================

#[tokio::test]
async fn test_cart_survives_restart() {
    let shop = TestShop::start().await;

    let first = shop.open();
    first.cart().add_to_cart(product(1, "10.00", 5), 2).unwrap();
    first.cart().add_to_cart(product(2, "7.50", 1), 1).unwrap();
    drop(first);

    let second = shop.open();
    assert_eq!(second.cart().items_count(), 3);
    assert_eq!(second.cart().cart_total(), Decimal::new(2750, 2));
    assert_eq!(second.cart().items()[0].product.id, ProductId::new(1));
}

#[tokio::test]
async fn test_corrupt_cart_file_starts_empty() {
    let shop = TestShop::start().await;
    std::fs::write(shop.data_dir.path().join("cart.json"), "{not json").unwrap();

    let store = shop.open();
    assert!(store.cart().snapshot().is_empty());

    store.cart().add_to_cart(product(1, "10.00", 5), 1).unwrap();
    assert_eq!(shop.open().cart().items_count(), 1);
}

#[tokio::test]
async fn test_sync_cart_reports_changes() {
    let shop = TestShop::start().await;
    shop.mount_product(&product_json(1, "12.00", 5)).await;
    shop.mount_product(&product_json(2, "5.00", 0)).await;

    let store = shop.open();
    store.cart().add_to_cart(product(1, "10.00", 5), 2).unwrap();
    store.cart().add_to_cart(product(2, "5.00", 3), 1).unwrap();

    let adjustments = store.sync_cart().await.unwrap();
    assert!(adjustments.iter().any(|a| matches!(
        a,
        CartAdjustment::PriceChanged { product_id, .. } if *product_id == ProductId::new(1)
    )));
    assert!(adjustments.iter().any(|a| matches!(
        a,
        CartAdjustment::Removed { product_id, .. } if *product_id == ProductId::new(2)
    )));

    let reopened = shop.open();
    assert_eq!(reopened.cart().items_count(), 2);
    assert_eq!(reopened.cart().cart_total(), Decimal::new(2400, 2));
}
