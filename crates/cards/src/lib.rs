//! Card grading submission domain.
//!
//! Card records, the rules for filtering and ordering them, the storage
//! boundary they are persisted through, and the lifecycle service that
//! registers, tracks, amends and deletes them.

pub mod card;
pub mod config;
pub mod query;
pub mod service;
pub mod store;

pub use card::{CardFields, CardNumber, CardPatch, CardRecord, TrackingStatus};
pub use config::{EmptyListing, ServiceConfig};
pub use query::{CardFilter, CardOrder};
pub use service::{CardError, CardLifecycleService, CardResult};
pub use store::{CardKey, CardStore, InMemoryCardStore, StoreError};
