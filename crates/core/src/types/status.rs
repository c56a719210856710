//! Status and attribute enums reported by the storefront API.
//!
//! Every enum serializes to the exact wire string the API uses and parses
//! back from it, so they can double as CLI filter values.

use serde::{Deserialize, Serialize};

/// Error returned when a wire string does not name a known variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct UnknownVariant {
    /// Which enum was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Defines a wire enum with `as_str`, `label`, `Display` and `FromStr`.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal, $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $wire)] $variant ),+
        }

        impl $name {
            /// All variants in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The string the API uses for this value.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }

            /// Human-readable label.
            #[must_use]
            pub const fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.label())
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }
    };
}

wire_enum! {
    /// Overall order status.
    OrderStatus, "order status" {
        Pending => "pending", "Pending",
        Processing => "processing", "Processing",
        Completed => "completed", "Completed",
        Cancelled => "cancelled", "Cancelled",
    }
}

wire_enum! {
    /// Payment state of an order.
    PaymentStatus, "payment status" {
        Pending => "pending", "Pending",
        Paid => "paid", "Paid",
        Failed => "failed", "Failed",
        Refunded => "refunded", "Refunded",
    }
}

wire_enum! {
    /// Shipping state of an order.
    ShippingStatus, "shipping status" {
        Pending => "pending", "Pending",
        Shipped => "shipped", "Shipped",
        Delivered => "delivered", "Delivered",
        Returned => "returned", "Returned",
    }
}

wire_enum! {
    /// Condition of a second-hand product.
    ProductCondition, "condition" {
        New => "new", "New",
        LikeNew => "like_new", "Like New",
        Good => "good", "Good",
        Fair => "fair", "Fair",
    }
}

wire_enum! {
    /// Garment size.
    Size, "size" {
        XS => "XS", "Extra Small",
        S => "S", "Small",
        M => "M", "Medium",
        L => "L", "Large",
        XL => "XL", "Extra Large",
        XXL => "XXL", "Double Extra Large",
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl Default for ShippingStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl Default for ProductCondition {
    fn default() -> Self {
        Self::Good
    }
}
