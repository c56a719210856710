//! Integration tests for checkout.

#![allow(clippy::unwrap_used)]

use loopstore_integration_tests::{TestShop, product};
use loopstore_storefront::forms::ShippingDetails;
use loopstore_storefront::services::CartError;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

fn shipping() -> ShippingDetails {
    ShippingDetails {
        first_name: "Anna".to_string(),
        last_name: "Nowak".to_string(),
        email: "anna@example.com".to_string(),
        phone: Some("+48 600 100 200".to_string()),
        address: "ul. Prosta 12".to_string(),
        city: "Warsaw".to_string(),
        postal_code: "00-001".to_string(),
        country: "Poland".to_string(),
        notes: None,
    }
}

#[tokio::test]
async fn test_checkout_places_order_and_clears_cart() {
    let shop = TestShop::start().await;
    Mock::given(method("POST"))
        .and(path("/api/orders/"))
        .and(body_partial_json(json!({
            "name": "Anna Nowak",
            "email": "anna@example.com",
            "items": [
                {"product_id": 1, "quantity": 2, "price": "10.00"},
                {"product_id": 2, "quantity": 1, "price": "7.50"}
            ],
            "total_amount": "27.50"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 900,
            "order_number": "LS-900",
            "status": "pending",
            "total_amount": "27.50",
            "items": []
        })))
        .expect(1)
        .mount(&shop.server)
        .await;

    let store = shop.open();
    store.cart().add_to_cart(product(1, "10.00", 5), 2).unwrap();
    store.cart().add_to_cart(product(2, "7.50", 1), 1).unwrap();

    let order = store.cart().checkout(shipping()).await.unwrap();
    assert_eq!(order.reference(), "LS-900");
    assert!(store.cart().snapshot().is_empty());
    assert!(!store.cart().is_processing_checkout());
    assert!(shop.open().cart().snapshot().is_empty());
}

#[tokio::test]
async fn test_rejected_checkout_keeps_cart() {
    let shop = TestShop::start().await;
    Mock::given(method("POST"))
        .and(path("/api/orders/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "items": ["Not enough stock for product Item 1"]
        })))
        .mount(&shop.server)
        .await;

    let store = shop.open();
    store.cart().add_to_cart(product(1, "10.00", 5), 2).unwrap();

    let err = store.cart().checkout(shipping()).await.unwrap_err();
    assert!(matches!(err, CartError::Api(_)));
    assert_eq!(store.cart().items_count(), 2);
    assert!(!store.cart().is_processing_checkout());
    assert_eq!(shop.open().cart().items_count(), 2);
}

#[tokio::test]
async fn test_checkout_rejects_bad_details_without_request() {
    let shop = TestShop::start().await;
    let store = shop.open();
    store.cart().add_to_cart(product(1, "10.00", 5), 1).unwrap();

    let details = ShippingDetails {
        email: "not-an-email".to_string(),
        city: String::new(),
        ..shipping()
    };
    let err = store.cart().checkout(details).await.unwrap_err();
    let CartError::Validation(validation) = err else {
        panic!("expected validation error, got {err:?}");
    };
    assert!(validation.has("email"));
    assert!(validation.has("city"));
    assert!(shop.server.received_requests().await.unwrap().is_empty());
    assert_eq!(store.cart().items_count(), 1);
}

#[tokio::test]
async fn test_checkout_empty_cart() {
    let shop = TestShop::start().await;
    let err = shop.open().cart().checkout(shipping()).await.unwrap_err();
    assert!(matches!(err, CartError::EmptyCart));
}
