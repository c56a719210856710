//! Cart contents and their transitions.
//!
//! A [`Cart`] is an ordered list of [`CartItem`]s, unique by product id. The
//! stock check uses the stock figure captured with the product; the API does
//! the authoritative check at checkout.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use loopstore_core::ProductId;

use crate::api::{OrderItemInput, Product};
use crate::services::cart::CartError;

/// A product in the cart with the requested quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    /// Last-known product data (price and stock may be stale).
    #[serde(flatten)]
    pub product: Product,
    /// Requested units, at least 1.
    pub quantity: u32,
}

impl CartItem {
    /// Price × quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }
}

/// A change made by [`Cart::reconcile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAdjustment {
    /// Quantity lowered to the available stock.
    Clamped {
        product_id: ProductId,
        name: String,
        from: u32,
        to: u32,
    },
    /// Entry dropped because the product is out of stock or gone.
    Removed { product_id: ProductId, name: String },
    /// Unit price changed since the product was added.
    PriceChanged {
        product_id: ProductId,
        name: String,
        from: Decimal,
        to: Decimal,
    },
}

/// Cart contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The entry for `id`, if present.
    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product.id == id)
    }

    /// Σ price × quantity.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Σ quantity.
    #[must_use]
    pub fn items_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Add `quantity` units of `product`, merging with an existing entry.
    ///
    /// Merging refreshes the entry's product data. The resulting quantity is
    /// checked against the incoming product's stock.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for zero and
    /// `CartError::InsufficientStock` when the stock would be exceeded. The
    /// cart is unchanged on error.
    pub fn add(&mut self, product: Product, quantity: u32) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        let existing = self.items.iter().position(|item| item.product.id == product.id);
        let current = existing
            .and_then(|index| self.items.get(index))
            .map_or(0, |item| item.quantity);
        let requested = current.saturating_add(quantity);
        check_stock(&product, requested)?;

        match existing.and_then(|index| self.items.get_mut(index)) {
            Some(item) => {
                item.product = product;
                item.quantity = requested;
            }
            None => self.items.push(CartItem {
                product,
                quantity: requested,
            }),
        }
        Ok(())
    }

    /// Remove the entry for `id`. Returns whether anything was removed.
    pub fn remove(&mut self, id: ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.product.id != id);
        self.items.len() != before
    }

    /// Set the quantity of an existing entry; zero removes it.
    ///
    /// Returns whether the cart changed. A missing entry is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InsufficientStock` when `quantity` exceeds the
    /// entry's last-known stock. The cart is unchanged on error.
    pub fn update_quantity(&mut self, id: ProductId, quantity: u32) -> Result<bool, CartError> {
        if quantity == 0 {
            return Ok(self.remove(id));
        }
        let Some(item) = self.items.iter_mut().find(|item| item.product.id == id) else {
            return Ok(false);
        };
        check_stock(&item.product, quantity)?;
        let changed = item.quantity != quantity;
        item.quantity = quantity;
        Ok(changed)
    }

    /// Remove every entry. Returns whether the cart had any.
    pub fn clear(&mut self) -> bool {
        let had_items = !self.items.is_empty();
        self.items.clear();
        had_items
    }

    /// Apply freshly fetched product data to matching entries.
    ///
    /// Refreshes price and stock, clamps quantities above stock and drops
    /// entries with no stock left. Entries without fresh data are kept as-is.
    pub fn reconcile(&mut self, fresh: &[Product]) -> Vec<CartAdjustment> {
        let mut adjustments = Vec::new();

        self.items.retain_mut(|item| {
            let Some(product) = fresh.iter().find(|p| p.id == item.product.id) else {
                return true;
            };

            if product.stock <= 0 {
                adjustments.push(CartAdjustment::Removed {
                    product_id: product.id,
                    name: product.name.clone(),
                });
                return false;
            }

            if product.price != item.product.price {
                adjustments.push(CartAdjustment::PriceChanged {
                    product_id: product.id,
                    name: product.name.clone(),
                    from: item.product.price,
                    to: product.price,
                });
            }

            let available = u32::try_from(product.stock).unwrap_or(u32::MAX);
            if item.quantity > available {
                adjustments.push(CartAdjustment::Clamped {
                    product_id: product.id,
                    name: product.name.clone(),
                    from: item.quantity,
                    to: available,
                });
                item.quantity = available;
            }

            item.product = product.clone();
            true
        });

        adjustments
    }

    /// Restore the entry invariants on a cart read back from storage.
    ///
    /// Drops zero-quantity entries and folds duplicate product ids into the
    /// first occurrence, summing quantities and keeping the later product
    /// data. Returns whether anything changed.
    pub fn normalize(&mut self) -> bool {
        let before = self.items.len();
        let mut merged: Vec<CartItem> = Vec::with_capacity(before);
        let mut changed = false;

        for item in self.items.drain(..) {
            if item.quantity == 0 {
                changed = true;
                continue;
            }
            match merged.iter_mut().find(|m| m.product.id == item.product.id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(item.quantity);
                    existing.product = item.product;
                    changed = true;
                }
                None => merged.push(item),
            }
        }

        self.items = merged;
        changed
    }

    /// Order lines for checkout.
    #[must_use]
    pub fn order_items(&self) -> Vec<OrderItemInput> {
        self.items
            .iter()
            .map(|item| OrderItemInput {
                product_id: item.product.id,
                quantity: item.quantity,
                price: item.product.price,
            })
            .collect()
    }
}

fn check_stock(product: &Product, requested: u32) -> Result<(), CartError> {
    if i64::from(requested) > product.stock {
        return Err(CartError::InsufficientStock {
            product_id: product.id,
            product: product.name.clone(),
            requested,
            available: product.stock.max(0),
        });
    }
    Ok(())
}
