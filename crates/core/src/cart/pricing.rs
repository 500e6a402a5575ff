//! Derived cart totals.

use rust_decimal::Decimal;
use serde::Serialize;

use super::CartState;

/// Shipping and tax rules applied to a cart subtotal.
///
/// The default is the house policy: free shipping from 150, a flat 15
/// otherwise, and 8% tax on the subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPolicy {
    /// Subtotal at or above which shipping is free.
    pub free_shipping_threshold: Decimal,
    /// Fee charged below the threshold.
    pub flat_shipping_fee: Decimal,
    /// Tax rate applied to the subtotal (0.08 = 8%).
    pub tax_rate: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            free_shipping_threshold: Decimal::from(150),
            flat_shipping_fee: Decimal::from(15),
            tax_rate: Decimal::new(8, 2),
        }
    }
}

impl PricingPolicy {
    /// Zero when `subtotal` reaches the free-shipping threshold, otherwise
    /// the flat fee. An empty cart is below the threshold.
    #[must_use]
    pub fn shipping_cost(&self, subtotal: Decimal) -> Decimal {
        if subtotal >= self.free_shipping_threshold {
            Decimal::ZERO
        } else {
            self.flat_shipping_fee
        }
    }

    #[must_use]
    pub fn tax(&self, subtotal: Decimal) -> Decimal {
        subtotal * self.tax_rate
    }

    /// How much more the customer must spend to get free shipping.
    #[must_use]
    pub fn free_shipping_remaining(&self, subtotal: Decimal) -> Decimal {
        (self.free_shipping_threshold - subtotal).max(Decimal::ZERO)
    }

    /// Compute every derived value for a cart in one pass.
    #[must_use]
    pub fn totals(&self, cart: &CartState) -> CartTotals {
        let subtotal = cart.subtotal();
        let shipping = self.shipping_cost(subtotal);
        let tax = self.tax(subtotal);

        CartTotals {
            item_count: cart.item_count(),
            subtotal,
            shipping,
            tax,
            total: subtotal + shipping + tax,
            free_shipping_remaining: self.free_shipping_remaining(subtotal),
        }
    }
}

/// Snapshot of the derived values of a cart. Amounts are unrounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartTotals {
    pub item_count: u32,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub free_shipping_remaining: Decimal,
}
