//! Cart line identifier type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`LineId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LineIdError {
    /// The input string is empty or only whitespace.
    #[error("line id cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("line id must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

/// Identifier of a purchasable variant, unique within a cart.
///
/// ## Constraints
///
/// - Not empty (and not only whitespace)
/// - At most 256 bytes
///
/// ## Examples
///
/// ```
/// use sillage_core::LineId;
///
/// assert!(LineId::parse("eau-de-parfum-50ml").is_ok());
/// assert!(LineId::parse("").is_err());
/// assert!(LineId::parse("   ").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct LineId(String);

impl LineId {
    /// Maximum length of a line id in bytes.
    pub const MAX_LENGTH: usize = 256;

    /// Parse a `LineId` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is blank or longer than
    /// [`LineId::MAX_LENGTH`] bytes.
    pub fn parse(s: &str) -> Result<Self, LineIdError> {
        if s.trim().is_empty() {
            return Err(LineIdError::Empty);
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(LineIdError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `LineId` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for LineId {
    type Err = LineIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for LineId {
    type Error = LineIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<LineId> for String {
    fn from(id: LineId) -> Self {
        id.0
    }
}

impl AsRef<str> for LineId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for LineId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for LineId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
