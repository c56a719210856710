//! Terminal rendering for command results.
//!
//! Results go to stdout, errors and warnings to stderr; tracing logs also go
//! to stderr so piping stdout stays clean.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use loopstore_storefront::Storefront;
use loopstore_storefront::api::{Category, Order, Page, Product, ProductDetail, Review, User};
use loopstore_storefront::models::{Cart, CartAdjustment};

pub fn error(message: &str) {
    eprintln!("error: {message}");
}

pub fn warning(message: &str) {
    eprintln!("warning: {message}");
}

pub fn success(message: &str) {
    println!("{message}");
}

fn product_line(shop: &Storefront, product: &Product) -> String {
    let size = product.size.map_or("-", |s| s.as_str());
    let stock = if product.in_stock() {
        format!("{} in stock", product.stock)
    } else {
        "sold out".to_string()
    };
    format!(
        "{:>6}  {:<40} {:>4}  {:<9} {:>12}  {}",
        product.id,
        product.name,
        size,
        product.condition.as_str(),
        shop.price(product.price),
        stock
    )
}

pub fn products(shop: &Storefront, page: &Page<Product>) {
    if page.results.is_empty() {
        println!("No products found.");
        return;
    }
    for product in &page.results {
        println!("{}", product_line(shop, product));
    }
    let more = if page.has_next() { ", more available" } else { "" };
    println!("\n{} of {} products{more}", page.results.len(), page.count);
}

pub fn product_detail(shop: &Storefront, detail: &ProductDetail) {
    let product = &detail.product;
    println!("{} (#{})", product.name, product.id);
    println!("  Price:     {}", shop.price(product.price));
    println!("  Condition: {}", product.condition);
    if let Some(size) = product.size {
        println!("  Size:      {size}");
    }
    if !product.brand.is_empty() {
        println!("  Brand:     {}", product.brand);
    }
    if !product.material.is_empty() {
        println!("  Material:  {}", product.material);
    }
    if let Some(category) = &product.category_name {
        println!("  Category:  {category}");
    }
    println!("  Stock:     {}", product.stock);
    if let Some(image) = shop.api().media_url(&product.image) {
        println!("  Image:     {image}");
    }
    if !product.description.is_empty() {
        println!("\n{}", product.description);
    }
    if !detail.related_products.is_empty() {
        println!("\nRelated:");
        for related in &detail.related_products {
            println!("{}", product_line(shop, related));
        }
    }
}

pub fn categories(categories: &[Category]) {
    for category in categories {
        println!(
            "{:>4}  {:<30} {:>5} products",
            category.id, category.name, category.products_count
        );
    }
}

pub fn reviews(reviews: &[Review]) {
    if reviews.is_empty() {
        println!("No reviews yet.");
        return;
    }
    if let Some(average) = loopstore_storefront::api::average_rating(reviews) {
        println!("Average rating: {average} / 5 ({} reviews)\n", reviews.len());
    }
    for review in reviews {
        let date = review
            .created_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        println!("{} {}  {date}", "*".repeat(usize::from(review.rating)), review.user_name);
        println!("  {}", review.comment);
    }
}

pub fn cart(shop: &Storefront, cart: &Cart) {
    if cart.is_empty() {
        println!("Your cart is empty.");
        return;
    }
    for item in cart.items() {
        println!(
            "{:>6}  {:<40} {:>3} x {:>12} = {:>12}",
            item.product.id,
            item.product.name,
            item.quantity,
            shop.price(item.product.price),
            shop.price(item.line_total())
        );
    }
    println!(
        "\n{} items, total {}",
        cart.items_count(),
        shop.price(cart.total())
    );
}

pub fn adjustments(shop: &Storefront, adjustments: &[CartAdjustment]) {
    if adjustments.is_empty() {
        println!("Cart is up to date.");
        return;
    }
    for adjustment in adjustments {
        let message = match adjustment {
            CartAdjustment::Clamped { name, from, to, .. } => {
                format!("{name}: quantity lowered from {from} to {to}")
            }
            CartAdjustment::Removed { name, .. } => format!("{name}: no longer available, removed"),
            CartAdjustment::PriceChanged { name, from, to, .. } => format!(
                "{name}: price changed from {} to {}",
                shop.price(*from),
                shop.price(*to)
            ),
        };
        warning(&message);
    }
}

pub fn user(user: &User) {
    println!("{} <{}> (#{})", user.display_name(), user.email, user.id);
}

pub fn orders(shop: &Storefront, orders: &[Order]) {
    if orders.is_empty() {
        println!("No orders yet.");
        return;
    }
    for order in orders {
        let date = order
            .created_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        println!(
            "{:<14} {date:<10}  {:<10} {:>12}",
            order.reference(),
            order.status,
            shop.price(order.total())
        );
    }
}

pub fn order(shop: &Storefront, order: &Order) {
    println!("Order {} ({})", order.reference(), order.status);
    println!("  Payment:  {}", order.payment_status);
    println!("  Shipping: {}", order.shipping_status);
    if !order.tracking_number.is_empty() {
        println!("  Tracking: {}", order.tracking_number);
    }
    println!(
        "  Ship to:  {}, {}, {} {}, {}",
        order.name, order.address, order.postal_code, order.city, order.country
    );
    println!();
    for item in &order.items {
        let name = item
            .name
            .clone()
            .unwrap_or_else(|| format!("Product #{}", item.product_id));
        println!(
            "  {:<40} {:>3} x {:>12}",
            name,
            item.quantity,
            shop.price(item.price)
        );
    }
    if !order.shipping_cost.is_zero() {
        println!("  Shipping {:>46}", shop.price(order.shipping_cost));
    }
    println!("\n  Total: {}", shop.price(order.total()));
}
