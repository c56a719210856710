//! Account commands: session, favorites, orders.

use loopstore_core::{OrderId, ProductId};
use loopstore_storefront::api::ApiError;
use loopstore_storefront::{Storefront, StorefrontError};
use secrecy::SecretString;

use crate::output;

pub async fn login(
    shop: &Storefront,
    email: &str,
    password: &SecretString,
) -> Result<(), StorefrontError> {
    let user = shop.auth().login(email, password).await?;
    output::success(&format!("Signed in as {}", user.display_name()));
    Ok(())
}

pub async fn register(
    shop: &Storefront,
    email: &str,
    password: &SecretString,
    first_name: &str,
    last_name: &str,
) -> Result<(), StorefrontError> {
    let user = shop
        .auth()
        .register(email, password, first_name, last_name)
        .await?;
    output::success(&format!("Welcome, {}!", user.display_name()));
    Ok(())
}

pub async fn logout(shop: &Storefront) -> Result<(), StorefrontError> {
    shop.auth().logout().await?;
    output::success("Signed out");
    Ok(())
}

/// Confirm the stored session with the shop and print who is signed in.
pub async fn whoami(shop: &Storefront) {
    match shop.hydrate().await {
        Some(user) => output::user(&user),
        None => output::success("Not signed in"),
    }
}

pub async fn list_favorites(shop: &Storefront) -> Result<(), StorefrontError> {
    require_session(shop).await?;
    shop.favorites().refresh().await?;
    let favorites = shop.favorites().favorites();
    if favorites.is_empty() {
        output::success("No favorites yet.");
    }
    for product in &favorites {
        output::success(&format!(
            "{:>6}  {:<40} {}",
            product.id,
            product.name,
            shop.price(product.price)
        ));
    }
    Ok(())
}

pub async fn add_favorite(shop: &Storefront, id: ProductId) -> Result<(), StorefrontError> {
    require_session(shop).await?;
    let product = shop.api().get_product(id).await?.product;
    let name = product.name.clone();
    shop.favorites().add(product).await?;
    output::success(&format!("Added {name} to favorites"));
    Ok(())
}

pub async fn remove_favorite(shop: &Storefront, id: ProductId) -> Result<(), StorefrontError> {
    require_session(shop).await?;
    shop.favorites().remove(id).await?;
    output::success("Removed from favorites");
    Ok(())
}

pub async fn list_orders(shop: &Storefront) -> Result<(), StorefrontError> {
    require_session(shop).await?;
    let orders = shop.api().list_orders().await?;
    output::orders(shop, &orders);
    Ok(())
}

pub async fn show_order(shop: &Storefront, id: OrderId) -> Result<(), StorefrontError> {
    require_session(shop).await?;
    let order = shop.api().get_order(id).await?;
    output::order(shop, &order);
    Ok(())
}

/// Confirm the cached session before an account call.
async fn require_session(shop: &Storefront) -> Result<(), StorefrontError> {
    if shop.hydrate().await.is_some() {
        Ok(())
    } else {
        Err(ApiError::Unauthorized.into())
    }
}
