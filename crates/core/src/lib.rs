//! Sillage Core - Cart domain library.
//!
//! This crate provides the shopping cart shared by the Sillage components:
//! - `storefront` - JSON cart API backed by the visitor's session
//! - `cli` - Command-line tool working on file-backed carts
//!
//! # Architecture
//!
//! The core crate holds the cart state machine, its validation and pricing
//! rules, and the storage abstraction it persists through. It has no HTTP or
//! async code, so both the storefront and the CLI drive the same store.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for line ids and prices
//! - [`cart`] - Cart state, commands, validation, and pricing
//! - [`storage`] - Key-value storage trait with memory and file adapters
//! - [`store`] - [`CartStore`], a cart kept in sync with its storage

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod storage;
pub mod store;
pub mod types;

pub use cart::{
    CartCommand, CartLine, CartLineInput, CartOutcome, CartState, CartTotals, CorruptRecord,
    DroppedEntry, InvalidLine, MAX_ITEMS_IN_CART, MAX_QUANTITY_PER_ITEM, MAX_UNIT_PRICE,
    PricingPolicy, RecordReport, inspect_record,
};
pub use storage::{CartStorage, FileStorage, MemoryStorage, StorageError};
pub use store::{CART_STORAGE_KEY, CartStore};
pub use types::*;
