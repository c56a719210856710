//! Catalog commands: products, categories, reviews.

use loopstore_core::ProductId;
use loopstore_storefront::api::ProductFilter;
use loopstore_storefront::forms::ReviewForm;
use loopstore_storefront::{Storefront, StorefrontError};

use crate::output;

pub async fn list_products(shop: &Storefront, filter: ProductFilter) -> Result<(), StorefrontError> {
    let page = shop.api().list_products(&filter).await?;
    output::products(shop, &page);
    Ok(())
}

pub async fn show_product(shop: &Storefront, id: ProductId) -> Result<(), StorefrontError> {
    let detail = shop.api().get_product(id).await?;
    output::product_detail(shop, &detail);
    Ok(())
}

pub async fn search(shop: &Storefront, query: &str) -> Result<(), StorefrontError> {
    let page = shop.api().search_products(query).await?;
    output::products(shop, &page);
    Ok(())
}

pub async fn categories(shop: &Storefront) -> Result<(), StorefrontError> {
    let categories = shop.api().list_categories().await?;
    output::categories(&categories);
    Ok(())
}

pub async fn reviews(shop: &Storefront, id: ProductId) -> Result<(), StorefrontError> {
    let reviews = shop.api().list_reviews(id).await?;
    output::reviews(&reviews);
    Ok(())
}

/// Post a review. Reviews need a signed-in customer.
pub async fn add_review(
    shop: &Storefront,
    id: ProductId,
    rating: u8,
    comment: String,
) -> Result<(), StorefrontError> {
    let form = ReviewForm { rating, comment };
    form.validate()?;

    let review = shop
        .api()
        .submit_review(id, form.rating, form.comment.trim())
        .await?;
    tracing::info!(product_id = %id, review_id = %review.id, "Review posted");
    output::success("Thanks for your review!");
    Ok(())
}
