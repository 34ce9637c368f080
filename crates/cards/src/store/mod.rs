//! Card record persistence boundary.
//!
//! `CardStore` is a generic create/find/update/delete interface with equality
//! filters and a sort specification. Any relational or document store that can
//! honour it (including the uniqueness of card numbers) is substitutable.

pub mod in_memory;

use std::sync::Arc;

use thiserror::Error;

use slabtrack_core::{CardId, UserId};

use crate::card::{CardFields, CardNumber, CardPatch, CardRecord};
use crate::query::{CardFilter, CardOrder};

pub use in_memory::InMemoryCardStore;

/// Key identifying a single card record for update and delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardKey {
    Id(CardId),
    CardNumber(CardNumber),
}

impl CardKey {
    pub fn matches(&self, record: &CardRecord) -> bool {
        match self {
            CardKey::Id(id) => record.card_id() == *id,
            CardKey::CardNumber(number) => record.card_number() == number,
        }
    }
}

impl From<CardId> for CardKey {
    fn from(value: CardId) -> Self {
        CardKey::Id(value)
    }
}

impl From<CardNumber> for CardKey {
    fn from(value: CardNumber) -> Self {
        CardKey::CardNumber(value)
    }
}

impl core::fmt::Display for CardKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CardKey::Id(id) => write!(f, "id={id}"),
            CardKey::CardNumber(number) => write!(f, "cardNumber={number}"),
        }
    }
}

/// Store operation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The write would give two records the same card number.
    #[error("duplicate card number: {0}")]
    DuplicateKey(CardNumber),

    /// Any other persistence failure (connectivity, lock poisoning, bad rows).
    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Persistent card record storage.
///
/// ## Contract
///
/// - `create` assigns `id` and `created_at`, and rejects an existing card
///   number with `StoreError::DuplicateKey` without writing anything. The
///   store is the final authority on uniqueness, so this check must be atomic
///   with the insert.
/// - `update_fields` rejects a renumbering onto another record's card number
///   the same way.
/// - Reads return `None` / an empty `Vec` on absence, never an error.
/// - `update_fields` and `delete` return the number of affected records; a
///   missing key is `Ok(0)`, not an error.
#[async_trait::async_trait]
pub trait CardStore: Send + Sync {
    async fn create(&self, fields: CardFields) -> Result<CardRecord, StoreError>;

    async fn find_by_id(&self, id: CardId) -> Result<Option<CardRecord>, StoreError>;

    /// First record matching `filter`, in store-native order.
    async fn find_one(&self, filter: &CardFilter) -> Result<Option<CardRecord>, StoreError>;

    async fn find_all(
        &self,
        filter: &CardFilter,
        order: CardOrder,
    ) -> Result<Vec<CardRecord>, StoreError>;

    /// Merge `patch` into the keyed record; untouched fields are kept.
    async fn update_fields(&self, key: &CardKey, patch: &CardPatch) -> Result<u64, StoreError>;

    async fn delete(&self, key: &CardKey) -> Result<u64, StoreError>;

    async fn exists(&self, card_number: &CardNumber) -> Result<bool, StoreError> {
        Ok(self.find_by_card_number(card_number).await?.is_some())
    }

    async fn find_by_card_number(
        &self,
        card_number: &CardNumber,
    ) -> Result<Option<CardRecord>, StoreError> {
        self.find_one(&CardFilter::by_card_number(card_number.clone()))
            .await
    }

    async fn find_all_by_user(&self, user_id: UserId) -> Result<Vec<CardRecord>, StoreError> {
        self.find_all(&CardFilter::by_user(user_id), CardOrder::StoreNative)
            .await
    }

    async fn find_by_key(&self, key: &CardKey) -> Result<Option<CardRecord>, StoreError> {
        match key {
            CardKey::Id(id) => self.find_by_id(*id).await,
            CardKey::CardNumber(number) => self.find_by_card_number(number).await,
        }
    }
}

#[async_trait::async_trait]
impl<S> CardStore for Arc<S>
where
    S: CardStore + ?Sized,
{
    async fn create(&self, fields: CardFields) -> Result<CardRecord, StoreError> {
        (**self).create(fields).await
    }

    async fn find_by_id(&self, id: CardId) -> Result<Option<CardRecord>, StoreError> {
        (**self).find_by_id(id).await
    }

    async fn find_one(&self, filter: &CardFilter) -> Result<Option<CardRecord>, StoreError> {
        (**self).find_one(filter).await
    }

    async fn find_all(
        &self,
        filter: &CardFilter,
        order: CardOrder,
    ) -> Result<Vec<CardRecord>, StoreError> {
        (**self).find_all(filter, order).await
    }

    async fn update_fields(&self, key: &CardKey, patch: &CardPatch) -> Result<u64, StoreError> {
        (**self).update_fields(key, patch).await
    }

    async fn delete(&self, key: &CardKey) -> Result<u64, StoreError> {
        (**self).delete(key).await
    }

    async fn exists(&self, card_number: &CardNumber) -> Result<bool, StoreError> {
        (**self).exists(card_number).await
    }
}
