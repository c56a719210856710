//! Cart and checkout commands.

use loopstore_core::ProductId;
use loopstore_storefront::forms::ShippingDetails;
use loopstore_storefront::{Storefront, StorefrontError};

use crate::output;

pub fn show(shop: &Storefront) {
    output::cart(shop, &shop.cart().snapshot());
}

/// Fetch the product fresh so the stock check uses current numbers.
pub async fn add(shop: &Storefront, id: ProductId, qty: u32) -> Result<(), StorefrontError> {
    let detail = shop.api().fetch_product(id).await?;
    let name = detail.product.name.clone();
    shop.cart().add_to_cart(detail.product, qty)?;
    output::success(&format!("Added {qty} x {name} to your cart"));
    show(shop);
    Ok(())
}

pub fn remove(shop: &Storefront, id: ProductId) {
    if shop.cart().remove_from_cart(id) {
        output::success("Removed from cart");
    } else {
        output::warning(&format!("Product {id} is not in your cart"));
    }
}

pub fn update(shop: &Storefront, id: ProductId, qty: u32) -> Result<(), StorefrontError> {
    if shop.cart().update_quantity(id, qty)? {
        show(shop);
    } else {
        output::warning(&format!("Product {id} is not in your cart"));
    }
    Ok(())
}

pub fn clear(shop: &Storefront) {
    shop.cart().clear_cart();
    output::success("Cart cleared");
}

pub async fn sync(shop: &Storefront) -> Result<(), StorefrontError> {
    let adjustments = shop.sync_cart().await?;
    output::adjustments(shop, &adjustments);
    show(shop);
    Ok(())
}

/// Reconcile with current stock, then place the order.
///
/// Stops before ordering if the sync changed anything, so the customer can
/// review the new cart first.
pub async fn checkout(shop: &Storefront, details: ShippingDetails) -> Result<(), StorefrontError> {
    details.validate()?;

    let adjustments = shop.sync_cart().await?;
    if !adjustments.is_empty() {
        output::adjustments(shop, &adjustments);
        output::warning("Your cart changed; review it and run checkout again");
        show(shop);
        return Ok(());
    }

    let order = shop.cart().checkout(details).await?;
    output::success(&format!(
        "Order {} placed, total {}",
        order.reference(),
        shop.price(order.total())
    ));
    Ok(())
}
