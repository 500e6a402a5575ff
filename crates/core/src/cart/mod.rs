//! Shopping cart state machine.
//!
//! [`CartState`] holds the ordered cart lines and enforces every cart
//! invariant:
//!
//! - each quantity is in `1..=MAX_QUANTITY_PER_ITEM`
//! - each unit price is in `0..=MAX_UNIT_PRICE`
//! - line ids are unique
//! - at most `MAX_ITEMS_IN_CART` lines
//!
//! State only changes through [`CartState::apply`], a single transition
//! function over the closed [`CartCommand`] set. Out-of-range input is clamped
//! or ignored, never surfaced as an error; the returned [`CartOutcome`] tells
//! the caller what actually happened.

pub mod pricing;
pub mod validate;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::LineId;

pub use pricing::{CartTotals, PricingPolicy};
pub use validate::{
    CorruptRecord, DroppedEntry, InvalidLine, RecordReport, inspect_record, serialize_lines,
    validate_record,
};

/// Maximum quantity of a single line.
pub const MAX_QUANTITY_PER_ITEM: u32 = 10;

/// Minimum quantity of a line that is in the cart.
pub const MIN_QUANTITY_PER_ITEM: u32 = 1;

/// Maximum number of distinct lines in a cart.
pub const MAX_ITEMS_IN_CART: usize = 20;

/// Upper bound for a unit price. Anything above is treated as bad data.
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// A line as submitted by a UI: everything but the quantity.
///
/// Adding a new line always starts it at quantity 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineInput {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub slug: String,
    #[serde(rename = "price")]
    pub unit_price: Decimal,
}

impl CartLineInput {
    /// Validate the candidate and turn it into a line with quantity 1.
    ///
    /// The unit price is rounded to the currency's minor units.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidLine`] if the id is blank or too long, or if the unit
    /// price is outside `0..=MAX_UNIT_PRICE`.
    pub fn into_line(self) -> Result<CartLine, InvalidLine> {
        let id = LineId::parse(&self.id)?;
        let unit_price = validate::check_price(self.unit_price)?;

        Ok(CartLine {
            id,
            name: self.name,
            subtitle: self.subtitle,
            size: self.size,
            image: self.image,
            slug: self.slug,
            unit_price,
            quantity: MIN_QUANTITY_PER_ITEM,
        })
    }
}

/// One purchasable line in the cart.
///
/// The `Serialize` impl is the persisted record format: the unit price is
/// written as a JSON number under `price`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub id: LineId,
    pub name: String,
    pub subtitle: String,
    pub size: String,
    pub image: String,
    pub slug: String,
    #[serde(
        rename = "price",
        serialize_with = "rust_decimal::serde::float::serialize"
    )]
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl CartLine {
    /// `unit_price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// The closed set of cart mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartCommand {
    /// Add a line, or bump its quantity by one if the id is already present.
    Add(CartLineInput),
    /// Set a line's quantity, clamped into `1..=MAX_QUANTITY_PER_ITEM`.
    SetQuantity { id: String, quantity: i64 },
    /// Remove a line.
    Remove { id: String },
    /// Remove every line.
    Clear,
}

/// What a [`CartCommand`] did to the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartOutcome {
    /// The command was applied as requested.
    Applied,
    /// The command was applied with the quantity forced into range.
    ClampedQuantity { requested: i64, applied: u32 },
    /// The cart already holds `MAX_ITEMS_IN_CART` lines; nothing was added.
    CartFull,
    /// No line has the given id; nothing changed.
    NotInCart,
    /// The candidate line failed validation; nothing changed.
    Rejected(InvalidLine),
}

impl CartOutcome {
    /// Whether the command wrote to the cart.
    #[must_use]
    pub const fn mutated(&self) -> bool {
        matches!(self, Self::Applied | Self::ClampedQuantity { .. })
    }

    /// Short machine-readable name of the outcome.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::ClampedQuantity { .. } => "clamped_quantity",
            Self::CartFull => "cart_full",
            Self::NotInCart => "not_in_cart",
            Self::Rejected(_) => "rejected",
        }
    }

    /// Human-readable explanation for outcomes a UI may want to surface.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Applied => None,
            Self::ClampedQuantity { applied, .. } => Some(format!(
                "Quantity limited to {applied} (allowed range is {MIN_QUANTITY_PER_ITEM}-{MAX_QUANTITY_PER_ITEM})"
            )),
            Self::CartFull => Some(format!(
                "Your cart is full ({MAX_ITEMS_IN_CART} items maximum)"
            )),
            Self::NotInCart => Some("That item is no longer in your cart".to_string()),
            Self::Rejected(reason) => Some(format!("Item could not be added: {reason}")),
        }
    }
}

/// Clamp a requested quantity into `1..=MAX_QUANTITY_PER_ITEM`.
#[must_use]
pub fn clamp_quantity(requested: i64) -> u32 {
    let clamped = requested.clamp(
        i64::from(MIN_QUANTITY_PER_ITEM),
        i64::from(MAX_QUANTITY_PER_ITEM),
    );
    u32::try_from(clamped).unwrap_or(MAX_QUANTITY_PER_ITEM)
}

/// In-memory cart contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    lines: Vec<CartLine>,
}

impl CartState {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a cart from lines that already passed [`validate_record`].
    ///
    /// Callers are responsible for uniqueness and the size bound; hydration
    /// enforces both before calling this.
    pub(crate) const fn from_validated(lines: Vec<CartLine>) -> Self {
        Self { lines }
    }

    /// Apply a command and report what happened.
    pub fn apply(&mut self, command: CartCommand) -> CartOutcome {
        match command {
            CartCommand::Add(candidate) => self.add(candidate),
            CartCommand::SetQuantity { id, quantity } => self.set_quantity(&id, quantity),
            CartCommand::Remove { id } => self.remove(&id),
            CartCommand::Clear => {
                self.lines.clear();
                CartOutcome::Applied
            }
        }
    }

    fn add(&mut self, candidate: CartLineInput) -> CartOutcome {
        let line = match candidate.into_line() {
            Ok(line) => line,
            Err(reason) => return CartOutcome::Rejected(reason),
        };

        if let Some(existing) = self.lines.iter_mut().find(|l| l.id == line.id) {
            let requested = existing.quantity.saturating_add(1);
            existing.quantity = requested.min(MAX_QUANTITY_PER_ITEM);

            return if requested > MAX_QUANTITY_PER_ITEM {
                CartOutcome::ClampedQuantity {
                    requested: i64::from(requested),
                    applied: existing.quantity,
                }
            } else {
                CartOutcome::Applied
            };
        }

        if self.lines.len() >= MAX_ITEMS_IN_CART {
            return CartOutcome::CartFull;
        }

        self.lines.push(line);
        CartOutcome::Applied
    }

    fn set_quantity(&mut self, id: &str, requested: i64) -> CartOutcome {
        let Some(line) = self.lines.iter_mut().find(|l| l.id == id) else {
            return CartOutcome::NotInCart;
        };

        let applied = clamp_quantity(requested);
        line.quantity = applied;

        if i64::from(applied) == requested {
            CartOutcome::Applied
        } else {
            CartOutcome::ClampedQuantity { requested, applied }
        }
    }

    fn remove(&mut self, id: &str) -> CartOutcome {
        let before = self.lines.len();
        self.lines.retain(|l| l.id != id);

        if self.lines.len() == before {
            CartOutcome::NotInCart
        } else {
            CartOutcome::Applied
        }
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Look up a line by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.id == id)
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of all quantities.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Sum of `unit_price * quantity` over all lines.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }
}
