//! Structured admin names.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when building an [`AdminName`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    /// The input has no non-whitespace characters.
    #[error("name cannot be empty")]
    Empty,
    /// The first name is missing.
    #[error("first name cannot be empty")]
    MissingFirst,
    /// The last name is missing.
    #[error("last name cannot be empty")]
    MissingLast,
}

/// An admin's name, split into parts.
///
/// ## Examples
///
/// ```
/// use backroom_core::AdminName;
///
/// let name = AdminName::parse("Ren Höek").unwrap();
/// assert_eq!(name.first, "Ren");
/// assert_eq!(name.last, "Höek");
/// assert_eq!(name.full(), "Ren Höek");
///
/// let name = AdminName::parse("Stimpson J Cat").unwrap();
/// assert_eq!(name.middle, "J");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdminName {
    /// Given name.
    pub first: String,
    /// Middle name(s), empty when absent.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub middle: String,
    /// Family name, empty for single-word names created from free text.
    #[serde(default)]
    pub last: String,
}

impl AdminName {
    /// Build a name from explicit parts, trimming each of them.
    #[must_use]
    pub fn new(first: &str, middle: &str, last: &str) -> Self {
        Self {
            first: first.trim().to_owned(),
            middle: middle.trim().to_owned(),
            last: last.trim().to_owned(),
        }
    }

    /// Split a free-form display name into parts.
    ///
    /// One word becomes the first name, two become first and last, and with
    /// three or more the inner words form the middle name.
    ///
    /// # Errors
    ///
    /// Returns [`NameError::Empty`] if the input is blank.
    pub fn parse(s: &str) -> Result<Self, NameError> {
        let words: Vec<&str> = s.split_whitespace().collect();

        match words.as_slice() {
            [] => Err(NameError::Empty),
            [first] => Ok(Self::new(first, "", "")),
            [first, last] => Ok(Self::new(first, "", last)),
            [first, middle @ .., last] => Ok(Self::new(first, &middle.join(" "), last)),
        }
    }

    /// Check that both first and last name are present.
    ///
    /// # Errors
    ///
    /// Returns the first missing part.
    pub fn validate(&self) -> Result<(), NameError> {
        if self.first.trim().is_empty() {
            return Err(NameError::MissingFirst);
        }
        if self.last.trim().is_empty() {
            return Err(NameError::MissingLast);
        }
        Ok(())
    }

    /// The name as displayed, non-empty parts joined by single spaces.
    #[must_use]
    pub fn full(&self) -> String {
        [&self.first, &self.middle, &self.last]
            .into_iter()
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for AdminName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full())
    }
}

impl std::str::FromStr for AdminName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
