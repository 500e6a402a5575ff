//! Application state shared across handlers.

use std::sync::Arc;

use sillage_core::{CurrencyCode, PricingPolicy};

use crate::config::StorefrontConfig;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Carts themselves live in the visitor's
/// session, so the state only carries configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: StorefrontConfig) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Shipping and tax rules for cart totals.
    #[must_use]
    pub fn pricing(&self) -> PricingPolicy {
        self.inner.config.pricing
    }

    /// Currency used to label cart amounts.
    #[must_use]
    pub fn currency(&self) -> CurrencyCode {
        self.inner.config.currency
    }
}
