//! Cart storage backed by the visitor's tower-sessions session.
//!
//! Session access is async while [`CartStorage`] is synchronous, so a request
//! works on a snapshot: [`SessionCartStorage::load`] reads the record once,
//! the cart store reads and writes the snapshot, and
//! [`SessionCartStorage::flush`] pushes the last change back to the session.

use sillage_core::{CART_STORAGE_KEY, CartStorage, StorageError};
use tower_sessions::Session;
use tower_sessions::session::Error as SessionError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pending {
    Write(String),
    Remove,
}

/// Single-key snapshot of the cart record held in a session.
#[derive(Debug, Default)]
pub struct SessionCartStorage {
    snapshot: Option<String>,
    pending: Option<Pending>,
}

impl SessionCartStorage {
    /// Read the cart record from the session.
    ///
    /// A value that is not a string is treated as corrupt and queued for
    /// removal. Store errors are logged and read as an empty cart.
    pub async fn load(session: &Session) -> Self {
        match session.get::<String>(CART_STORAGE_KEY).await {
            Ok(snapshot) => Self {
                snapshot,
                pending: None,
            },
            Err(SessionError::SerdeJson(e)) => {
                tracing::warn!(error = %e, "Discarding undecodable cart session value");
                Self {
                    snapshot: None,
                    pending: Some(Pending::Remove),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read cart from session");
                Self::default()
            }
        }
    }

    /// Whether a write or removal is waiting to be flushed.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.pending.is_some()
    }

    /// Push the pending change, if any, back to the session.
    ///
    /// Failures are logged; the response still reflects the in-memory cart.
    pub async fn flush(self, session: &Session) {
        let result = match self.pending {
            Some(Pending::Write(value)) => session.insert(CART_STORAGE_KEY, value).await,
            Some(Pending::Remove) => session.remove_value(CART_STORAGE_KEY).await.map(|_| ()),
            None => return,
        };

        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to save cart to session");
        }
    }

    fn check_key(key: &str) -> Result<(), StorageError> {
        if key == CART_STORAGE_KEY {
            Ok(())
        } else {
            Err(StorageError::InvalidKey(key.to_owned()))
        }
    }
}

impl CartStorage for SessionCartStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Self::check_key(key)?;
        Ok(self.snapshot.clone())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        Self::check_key(key)?;
        self.snapshot = Some(value.to_owned());
        self.pending = Some(Pending::Write(value.to_owned()));
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        Self::check_key(key)?;
        self.snapshot = None;
        self.pending = Some(Pending::Remove);
        Ok(())
    }
}
