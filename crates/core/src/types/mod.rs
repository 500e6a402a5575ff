//! Core types for Sillage.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod line_id;
pub mod price;

pub use line_id::{LineId, LineIdError};
pub use price::{
    CurrencyCode, MINOR_UNITS, Price, UnknownCurrency, format_amount, round_to_minor_units,
};
