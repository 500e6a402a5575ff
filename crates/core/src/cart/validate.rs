//! Schema validation for persisted cart records.
//!
//! A persisted cart is a JSON array of line objects. The array is untrusted:
//! it may be hand-edited, truncated, or written by an older build. Each entry
//! is checked on its own; one bad entry never discards its neighbours.

use std::collections::HashSet;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};

use super::{
    CartLine, MAX_ITEMS_IN_CART, MAX_QUANTITY_PER_ITEM, MAX_UNIT_PRICE, MIN_QUANTITY_PER_ITEM,
};
use crate::types::{LineId, LineIdError, round_to_minor_units};

/// Why a single cart entry was refused.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidLine {
    /// The entry is not a JSON object.
    #[error("entry is not an object")]
    NotAnObject,
    /// A required string field is absent or has another type.
    #[error("`{0}` is missing or not a string")]
    ExpectedString(&'static str),
    /// A required numeric field is absent or has another type.
    #[error("`{0}` is missing or not a number")]
    ExpectedNumber(&'static str),
    /// The id is blank or too long.
    #[error(transparent)]
    Id(#[from] LineIdError),
    /// A number too small or too large to be held as a decimal.
    #[error("`{0}` value {1} cannot be represented as a decimal")]
    Unrepresentable(&'static str, String),
    /// The unit price is negative or above the ceiling.
    #[error("price {0} is outside 0..=10000")]
    PriceOutOfRange(Decimal),
    /// The quantity is fractional or outside the allowed range.
    #[error("quantity {0} is not a whole number in 1..=10")]
    QuantityOutOfRange(String),
    /// An earlier entry already used this id.
    #[error("duplicate line id `{0}`")]
    DuplicateId(String),
}

/// The persisted record as a whole could not be used.
#[derive(thiserror::Error, Debug)]
pub enum CorruptRecord {
    /// Not parseable as JSON.
    #[error("record is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Valid JSON, but not an array.
    #[error("record is not a JSON array")]
    NotAnArray,
}

/// An entry that was dropped during hydration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedEntry {
    /// Position of the entry in the stored array.
    pub index: usize,
    pub reason: InvalidLine,
}

/// Result of reading a persisted record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordReport {
    /// Accepted lines, in stored order, at most `MAX_ITEMS_IN_CART`.
    pub lines: Vec<CartLine>,
    /// Entries refused by validation.
    pub dropped: Vec<DroppedEntry>,
    /// Valid entries cut off by the cart size limit.
    pub truncated: usize,
}

/// Range-check a unit price and round it to the currency's minor units.
///
/// Rounded prices have at most seven significant digits, so they survive the
/// JSON float encoding of the persisted record unchanged.
pub(crate) fn check_price(price: Decimal) -> Result<Decimal, InvalidLine> {
    if price < Decimal::ZERO || price > MAX_UNIT_PRICE {
        return Err(InvalidLine::PriceOutOfRange(price));
    }
    Ok(round_to_minor_units(price))
}

/// Validate one stored entry.
///
/// Required: string `id` (non-blank), string `name`, numeric `price` in
/// `0..=10000`, and a whole-number `quantity` in `1..=10`. The display fields
/// `subtitle`, `size`, `image`, and `slug` default to empty when absent or
/// not strings.
///
/// # Errors
///
/// Returns the first [`InvalidLine`] reason found.
pub fn validate_record(record: &Value) -> Result<CartLine, InvalidLine> {
    let obj = record.as_object().ok_or(InvalidLine::NotAnObject)?;

    let id = LineId::parse(required_str(obj, "id")?)?;
    let name = required_str(obj, "name")?.to_owned();
    let unit_price = check_price(required_decimal(obj, "price")?)?;
    let quantity = required_quantity(obj)?;

    Ok(CartLine {
        id,
        name,
        subtitle: optional_str(obj, "subtitle"),
        size: optional_str(obj, "size"),
        image: optional_str(obj, "image"),
        slug: optional_str(obj, "slug"),
        unit_price,
        quantity,
    })
}

/// Parse a stored record and validate every entry.
///
/// Entries repeating an id that was already accepted are dropped. After
/// filtering, only the first `MAX_ITEMS_IN_CART` lines are kept.
///
/// # Errors
///
/// Returns [`CorruptRecord`] if the text is not JSON or not a JSON array.
pub fn inspect_record(raw: &str) -> Result<RecordReport, CorruptRecord> {
    let value: Value = serde_json::from_str(raw)?;
    let Value::Array(entries) = value else {
        return Err(CorruptRecord::NotAnArray);
    };

    let mut report = RecordReport::default();
    let mut seen = HashSet::new();

    for (index, entry) in entries.iter().enumerate() {
        let line = validate_record(entry).and_then(|line| {
            if seen.insert(line.id.clone()) {
                Ok(line)
            } else {
                Err(InvalidLine::DuplicateId(line.id.into_inner()))
            }
        });

        match line {
            Ok(line) => report.lines.push(line),
            Err(reason) => report.dropped.push(DroppedEntry { index, reason }),
        }
    }

    report.truncated = report.lines.len().saturating_sub(MAX_ITEMS_IN_CART);
    report.lines.truncate(MAX_ITEMS_IN_CART);

    Ok(report)
}

/// Serialize lines into the persisted record format.
///
/// # Errors
///
/// Returns an error if a price cannot be represented as a JSON number.
pub fn serialize_lines(lines: &[CartLine]) -> Result<String, serde_json::Error> {
    serde_json::to_string(lines)
}

// =============================================================================
// Field Helpers
// =============================================================================

fn required_str<'a>(
    obj: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, InvalidLine> {
    obj.get(field)
        .and_then(Value::as_str)
        .ok_or(InvalidLine::ExpectedString(field))
}

fn optional_str(obj: &Map<String, Value>, field: &str) -> String {
    obj.get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

fn required_decimal(
    obj: &Map<String, Value>,
    field: &'static str,
) -> Result<Decimal, InvalidLine> {
    match obj.get(field) {
        Some(Value::Number(n)) => number_to_decimal(n)
            .ok_or_else(|| InvalidLine::Unrepresentable(field, n.to_string())),
        _ => Err(InvalidLine::ExpectedNumber(field)),
    }
}

fn required_quantity(obj: &Map<String, Value>) -> Result<u32, InvalidLine> {
    let Some(Value::Number(n)) = obj.get("quantity") else {
        return Err(InvalidLine::ExpectedNumber("quantity"));
    };

    let whole = n.as_u64().or_else(|| {
        n.as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= f64::from(MAX_QUANTITY_PER_ITEM))
            .and_then(|f| format!("{f:.0}").parse::<u64>().ok())
    });

    whole
        .and_then(|q| u32::try_from(q).ok())
        .filter(|q| (MIN_QUANTITY_PER_ITEM..=MAX_QUANTITY_PER_ITEM).contains(q))
        .ok_or_else(|| InvalidLine::QuantityOutOfRange(n.to_string()))
}

/// Convert a JSON number to a decimal without going through binary floating
/// point arithmetic. `serde_json` prints floats in shortest round-trip form,
/// so parsing that text recovers the value that was written.
fn number_to_decimal(n: &Number) -> Option<Decimal> {
    if let Some(i) = n.as_i64() {
        return Some(Decimal::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(Decimal::from(u));
    }

    let text = n.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}
