//! File-backed cart commands.
//!
//! Each command hydrates a `CartStore<FileStorage>` from `<dir>/<key>.json`,
//! runs one operation, and prints the outcome followed by the cart.

use std::io::Write;
use std::path::PathBuf;

use rust_decimal::Decimal;
use sillage_core::{
    CartLineInput, CartOutcome, CartStorage, CartStore, CurrencyCode, FileStorage, Price,
    PricingPolicy, StorageError, inspect_record,
};
use thiserror::Error;

/// Errors that can occur while running a cart command.
#[derive(Debug, Error)]
pub enum CartCommandError {
    /// The storage directory could not be opened or read.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Writing the report failed.
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),
}

/// The cart a command operates on.
#[derive(Debug, Clone)]
pub struct CartTarget {
    pub dir: PathBuf,
    pub key: String,
    pub currency: CurrencyCode,
}

/// A line to add, as given on the command line.
#[derive(Debug, Clone)]
pub struct NewLine {
    pub id: String,
    pub name: String,
    pub subtitle: String,
    pub size: String,
    pub image: String,
    pub slug: String,
    pub price: Decimal,
}

impl From<NewLine> for CartLineInput {
    fn from(line: NewLine) -> Self {
        Self {
            id: line.id,
            name: line.name,
            subtitle: line.subtitle,
            size: line.size,
            image: line.image,
            slug: line.slug,
            unit_price: line.price,
        }
    }
}

fn open(target: &CartTarget) -> Result<CartStore<FileStorage>, CartCommandError> {
    let storage = FileStorage::open(&target.dir)?;
    Ok(CartStore::hydrate_with_key(
        storage,
        target.key.as_str(),
        PricingPolicy::default(),
    ))
}

/// Print the cart and its totals.
///
/// # Errors
///
/// Returns an error if the storage directory cannot be opened or the output
/// cannot be written.
pub fn show(target: &CartTarget, out: &mut impl Write) -> Result<(), CartCommandError> {
    let store = open(target)?;
    print_cart(&store, target.currency, out)
}

/// Add a line, or bump its quantity by one.
///
/// # Errors
///
/// Returns an error if the storage directory cannot be opened or the output
/// cannot be written.
pub fn add(
    target: &CartTarget,
    line: NewLine,
    out: &mut impl Write,
) -> Result<(), CartCommandError> {
    let mut store = open(target)?;
    let outcome = store.add_line(line.into());
    report(&store, &outcome, target.currency, out)
}

/// Set a line's quantity, clamped into range.
///
/// # Errors
///
/// Returns an error if the storage directory cannot be opened or the output
/// cannot be written.
pub fn set(
    target: &CartTarget,
    id: &str,
    quantity: i64,
    out: &mut impl Write,
) -> Result<(), CartCommandError> {
    let mut store = open(target)?;
    let outcome = store.update_quantity(id, quantity);
    report(&store, &outcome, target.currency, out)
}

/// Remove a line.
///
/// # Errors
///
/// Returns an error if the storage directory cannot be opened or the output
/// cannot be written.
pub fn remove(target: &CartTarget, id: &str, out: &mut impl Write) -> Result<(), CartCommandError> {
    let mut store = open(target)?;
    let outcome = store.remove_line(id);
    report(&store, &outcome, target.currency, out)
}

/// Remove every line.
///
/// # Errors
///
/// Returns an error if the storage directory cannot be opened or the output
/// cannot be written.
pub fn clear(target: &CartTarget, out: &mut impl Write) -> Result<(), CartCommandError> {
    let mut store = open(target)?;
    let outcome = store.clear();
    report(&store, &outcome, target.currency, out)
}

/// Delete the stored record.
///
/// # Errors
///
/// Returns an error if the storage directory cannot be opened or the output
/// cannot be written.
pub fn discard(target: &CartTarget, out: &mut impl Write) -> Result<(), CartCommandError> {
    let storage = open(target)?.discard();
    let path = storage.path_for(&target.key)?;
    if path.exists() {
        writeln!(out, "{}: could not be removed", path.display())?;
    } else {
        writeln!(out, "{}: discarded", path.display())?;
    }
    Ok(())
}

/// Explain what hydration keeps and drops from the stored record.
///
/// Never modifies the record, even when it is corrupt.
///
/// # Errors
///
/// Returns an error if the record cannot be read or the output cannot be
/// written.
pub fn inspect(target: &CartTarget, out: &mut impl Write) -> Result<(), CartCommandError> {
    let storage = FileStorage::open(&target.dir)?;
    let path = storage.path_for(&target.key)?;

    let Some(raw) = storage.read(&target.key)? else {
        writeln!(out, "{}: no stored cart", path.display())?;
        return Ok(());
    };

    let report = match inspect_record(&raw) {
        Ok(report) => report,
        Err(e) => {
            writeln!(out, "{}: corrupt, would be removed ({e})", path.display())?;
            return Ok(());
        }
    };

    writeln!(
        out,
        "{}: {} kept, {} dropped, {} truncated",
        path.display(),
        report.lines.len(),
        report.dropped.len(),
        report.truncated
    )?;
    for line in &report.lines {
        writeln!(out, "  kept    {} x{}", line.id, line.quantity)?;
    }
    for entry in &report.dropped {
        writeln!(out, "  dropped #{}: {}", entry.index, entry.reason)?;
    }

    Ok(())
}

// =============================================================================
// Output
// =============================================================================

fn report(
    store: &CartStore<FileStorage>,
    outcome: &CartOutcome,
    currency: CurrencyCode,
    out: &mut impl Write,
) -> Result<(), CartCommandError> {
    match outcome.message() {
        Some(message) => writeln!(out, "{}: {message}", outcome.as_str())?,
        None => writeln!(out, "{}", outcome.as_str())?,
    }
    print_cart(store, currency, out)
}

fn print_cart(
    store: &CartStore<FileStorage>,
    currency: CurrencyCode,
    out: &mut impl Write,
) -> Result<(), CartCommandError> {
    let money = |amount| Price::new(amount, currency).display();

    if store.lines().is_empty() {
        writeln!(out, "(empty cart)")?;
    }
    for line in store.lines() {
        let size = if line.size.is_empty() {
            String::new()
        } else {
            format!(" ({})", line.size)
        };
        writeln!(
            out,
            "{}  {}{}  x{}  {}  {}",
            line.id,
            line.name,
            size,
            line.quantity,
            money(line.unit_price),
            money(line.line_total())
        )?;
    }

    let totals = store.totals();
    writeln!(out, "items     {}", totals.item_count)?;
    writeln!(out, "subtotal  {}", money(totals.subtotal))?;
    writeln!(out, "shipping  {}", money(totals.shipping))?;
    writeln!(out, "tax       {}", money(totals.tax))?;
    writeln!(out, "total     {}", money(totals.total))?;

    Ok(())
}
