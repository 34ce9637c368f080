//! Lifecycle service configuration.

use core::str::FromStr;

use slabtrack_core::DomainError;

/// How multi-record queries report an empty result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmptyListing {
    /// "No rows" is reported as `CardError::NotFound` (the historical behaviour).
    #[default]
    NotFound,
    /// "No rows" is a successful, empty listing.
    EmptyOk,
}

impl FromStr for EmptyListing {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "not_found" | "notfound" => Ok(Self::NotFound),
            "empty" | "empty_ok" => Ok(Self::EmptyOk),
            other => Err(DomainError::validation(format!(
                "empty listing policy must be one of: not_found, empty (got '{other}')"
            ))),
        }
    }
}

/// Settings for `CardLifecycleService`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Applies to `get_cards_by_user` and `list_new_orders`.
    pub empty_listing: EmptyListing,
}
