//! Services bridging the cart domain to the HTTP layer.
//!
//! - `cart_session` - cart storage backed by the visitor's session

pub mod cart_session;

pub use cart_session::SessionCartStorage;
