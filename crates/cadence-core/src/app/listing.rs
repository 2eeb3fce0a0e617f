//! Results shared by the lifecycle managers.

use std::str::FromStr;

use tracing::warn;

use crate::domain::IdParseError;

/// Child names decoded into identifiers.
///
/// A child that fails to decode is skipped and recorded in `malformed`, so a
/// single bad node never hides the rest of the listing and the count mismatch
/// stays visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing<T> {
    pub entries: Vec<T>,
    pub malformed: Vec<IdParseError>,
}

impl<T> Default for Listing<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            malformed: Vec::new(),
        }
    }
}

impl<T: FromStr<Err = IdParseError>> Listing<T> {
    pub(crate) fn decode(root: &str, names: Vec<String>) -> Self {
        let mut listing = Listing {
            entries: Vec::with_capacity(names.len()),
            malformed: Vec::new(),
        };
        for name in names {
            match name.parse() {
                Ok(id) => listing.entries.push(id),
                Err(err) => {
                    warn!(root, error = %err, "skipping malformed child node");
                    listing.malformed.push(err);
                }
            }
        }
        listing
    }
}

impl<T> Listing<T> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether every child decoded.
    pub fn is_complete(&self) -> bool {
        self.malformed.is_empty()
    }
}

/// Result of a create-only marker write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerOutcome {
    Created,
    /// Someone (possibly an earlier retry of this call) already created it.
    AlreadyPresent,
}

/// Result of a delete that tolerates absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalOutcome {
    Removed,
    AlreadyAbsent,
}

/// Whether `persist` created or replaced the definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    Created,
    Updated,
}
