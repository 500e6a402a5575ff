//! Integration tests for Sillage.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p sillage-integration-tests
//! ```
//!
//! Each test boots its own storefront on an ephemeral local port via
//! [`TestContext::spawn`], so no external services are needed.

use std::net::SocketAddr;

use reqwest::Client;
use secrecy::SecretString;
use sillage_core::{CurrencyCode, PricingPolicy};
use sillage_storefront::config::{LogFormat, SentryConfig, StorefrontConfig};
use sillage_storefront::{AppState, router};
use tokio::task::JoinHandle;

/// High-entropy secret for test servers only.
const TEST_SESSION_SECRET: &str =
    "q7Vx2LmP9sKd4RtZ8wNc6YbH3jFg1QeA5uTo0iMkXrBvCnDyGhJlEpWzSaUfIx7V";

/// Storefront configuration for a server bound to `addr`.
#[must_use]
pub fn test_config(addr: SocketAddr) -> StorefrontConfig {
    StorefrontConfig {
        host: addr.ip(),
        port: addr.port(),
        base_url: format!("http://{addr}"),
        session_secret: SecretString::from(TEST_SESSION_SECRET),
        currency: CurrencyCode::USD,
        pricing: PricingPolicy::default(),
        log_format: LogFormat::Pretty,
        sentry: SentryConfig::default(),
    }
}

/// A running storefront plus a cookie-keeping client pointed at it.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
    server: JoinHandle<()>,
}

impl TestContext {
    /// Boot a storefront on `127.0.0.1:0`.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound or the router cannot be built.
    pub async fn spawn() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local address");

        let app = router(AppState::new(test_config(addr))).expect("Failed to build router");
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server error");
        });

        Self {
            client: new_client(),
            base_url: format!("http://{addr}"),
            server,
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// A client with its own cookie jar, i.e. a fresh visitor.
///
/// # Panics
///
/// Panics if the HTTP client cannot be built.
#[must_use]
pub fn new_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}
