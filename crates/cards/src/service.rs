//! Card lifecycle operations on top of an injected `CardStore`.
//!
//! The service holds no mutable state of its own. Every rule that storage
//! constraints cannot express lives here: duplicate rejection before create,
//! not-found signalling, narrow vs. wide update semantics and the empty
//! listing policy.
//!
//! `register_card` is check-then-create and therefore not atomic. Two
//! concurrent registrations of the same number can both pass `exists`; the
//! loser is stopped by the store's own uniqueness check and its
//! `StoreError::DuplicateKey` is reported as `CardError::DuplicateCardNumber`.

use thiserror::Error;
use tracing::{info, instrument, warn};

use slabtrack_core::{CardId, DomainError, Entity, UserId};

use crate::card::{CardFields, CardNumber, CardPatch, CardRecord, TrackingStatus};
use crate::config::{EmptyListing, ServiceConfig};
use crate::query::{CardFilter, CardOrder};
use crate::store::{CardKey, CardStore, StoreError};

/// Lifecycle operation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CardError {
    /// Another record already holds this card number.
    #[error("card number already exists: {0}")]
    DuplicateCardNumber(CardNumber),

    /// No record matches the key or filter.
    #[error("card not found")]
    NotFound,

    /// Input failed a value check. Service operations take already validated
    /// values, so this is only produced when callers build a `CardNumber`
    /// and convert the failure with `?`.
    #[error(transparent)]
    Invalid(#[from] DomainError),

    /// Unclassified persistence failure.
    #[error("card store failure: {0}")]
    Store(#[source] StoreError),
}

impl CardError {
    /// Stable code for the request layer to map onto its own status scheme.
    pub fn kind(&self) -> &'static str {
        match self {
            CardError::DuplicateCardNumber(_) => "duplicate",
            CardError::NotFound => "not_found",
            CardError::Invalid(_) => "invalid",
            CardError::Store(_) => "store",
        }
    }
}

impl From<StoreError> for CardError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::DuplicateKey(number) => CardError::DuplicateCardNumber(number),
            other => CardError::Store(other),
        }
    }
}

pub type CardResult<T> = Result<T, CardError>;

#[derive(Debug)]
pub struct CardLifecycleService<S> {
    store: S,
    config: ServiceConfig,
}

impl<S> CardLifecycleService<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, ServiceConfig::default())
    }

    pub fn with_config(store: S, config: ServiceConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> ServiceConfig {
        self.config
    }

    fn listing(&self, records: Vec<CardRecord>) -> CardResult<Vec<CardRecord>> {
        if records.is_empty() && self.config.empty_listing == EmptyListing::NotFound {
            return Err(CardError::NotFound);
        }
        Ok(records)
    }
}

impl<S> CardLifecycleService<S>
where
    S: CardStore,
{
    /// Register a new submission after checking the card number is free.
    #[instrument(
        skip(self, submission),
        fields(card_number = %submission.card_number, user_id = %submission.user_id),
        err(level = "warn")
    )]
    pub async fn register_card(&self, submission: CardFields) -> CardResult<CardRecord> {
        if self.store.exists(&submission.card_number).await? {
            warn!("card number already registered");
            return Err(CardError::DuplicateCardNumber(submission.card_number));
        }
        self.create(submission).await
    }

    /// Register without the existence pre-check; uniqueness is left entirely
    /// to the store.
    #[instrument(
        skip(self, submission),
        fields(card_number = %submission.card_number, user_id = %submission.user_id),
        err(level = "warn")
    )]
    pub async fn register_card_direct(&self, submission: CardFields) -> CardResult<CardRecord> {
        self.create(submission).await
    }

    async fn create(&self, submission: CardFields) -> CardResult<CardRecord> {
        match self.store.create(submission).await {
            Ok(record) => {
                info!(card_id = %record.card_id(), "card registered");
                Ok(record)
            }
            Err(StoreError::DuplicateKey(number)) => {
                warn!("store rejected duplicate card number");
                Err(CardError::DuplicateCardNumber(number))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Every record, ascending by card number.
    #[instrument(skip(self), err(level = "warn"))]
    pub async fn get_all_cards(&self) -> CardResult<Vec<CardRecord>> {
        Ok(self
            .store
            .find_all(&CardFilter::all(), CardOrder::CardNumberAsc)
            .await?)
    }

    #[instrument(skip(self), fields(card_number = %card_number), err(level = "warn"))]
    pub async fn get_card_by_card_number(&self, card_number: &CardNumber) -> CardResult<CardRecord> {
        self.store
            .find_by_card_number(card_number)
            .await?
            .ok_or(CardError::NotFound)
    }

    /// Records owned by `user_id`, in store-native order.
    #[instrument(skip(self), fields(user_id = %user_id), err(level = "warn"))]
    pub async fn get_cards_by_user(&self, user_id: UserId) -> CardResult<Vec<CardRecord>> {
        let records = self.store.find_all_by_user(user_id).await?;
        self.listing(records)
    }

    #[instrument(
        skip(self),
        fields(user_id = %user_id, card_number = %card_number),
        err(level = "warn")
    )]
    pub async fn get_card_by_user_and_card_number(
        &self,
        user_id: UserId,
        card_number: &CardNumber,
    ) -> CardResult<CardRecord> {
        let filter = CardFilter::by_user(user_id).and_card_number(card_number.clone());
        self.store.find_one(&filter).await?.ok_or(CardError::NotFound)
    }

    /// Narrow update: writes the tracking status and carrier id only.
    #[instrument(
        skip(self, tracking_id),
        fields(card_number = %card_number, tracking_status = %status),
        err(level = "warn")
    )]
    pub async fn update_tracking_status(
        &self,
        card_number: &CardNumber,
        status: TrackingStatus,
        tracking_id: impl Into<String> + Send,
    ) -> CardResult<CardRecord> {
        if !self.store.exists(card_number).await? {
            warn!("tracking update for unknown card");
            return Err(CardError::NotFound);
        }

        let key = CardKey::CardNumber(card_number.clone());
        let patch = CardPatch::tracking(status, tracking_id);
        if self.store.update_fields(&key, &patch).await? == 0 {
            return Err(CardError::NotFound);
        }

        info!("tracking status updated");
        self.store.find_by_key(&key).await?.ok_or(CardError::NotFound)
    }

    /// Wide update: replaces every attribute of the record with `replacement`.
    ///
    /// A change of card number is re-validated; taking another record's number
    /// fails with `DuplicateCardNumber` before anything is written.
    #[instrument(
        skip(self, replacement),
        fields(card_id = %id, card_number = %replacement.card_number),
        err(level = "warn")
    )]
    pub async fn update_card_full(
        &self,
        id: CardId,
        replacement: CardFields,
    ) -> CardResult<CardRecord> {
        let Some(existing) = self.store.find_by_id(id).await? else {
            warn!("full update for unknown card");
            return Err(CardError::NotFound);
        };

        if existing.card_number() != &replacement.card_number {
            if let Some(holder) = self.store.find_by_card_number(&replacement.card_number).await? {
                if !holder.is_same_as(&existing) {
                    warn!(held_by = %holder.card_id(), "renumbering onto a taken card number");
                    return Err(CardError::DuplicateCardNumber(replacement.card_number));
                }
            }
        }

        let key = CardKey::Id(id);
        if self
            .store
            .update_fields(&key, &CardPatch::replace_all(replacement))
            .await?
            == 0
        {
            return Err(CardError::NotFound);
        }

        info!("card replaced");
        self.store.find_by_id(id).await?.ok_or(CardError::NotFound)
    }

    /// Permanently remove the keyed record.
    #[instrument(skip(self), fields(key = %key), err(level = "warn"))]
    pub async fn delete_card(&self, key: &CardKey) -> CardResult<()> {
        if self.store.find_by_key(key).await?.is_none() {
            warn!("delete for unknown card");
            return Err(CardError::NotFound);
        }

        if self.store.delete(key).await? == 0 {
            return Err(CardError::NotFound);
        }

        info!("card deleted");
        Ok(())
    }

    /// Alias of `delete_card` keyed by card number.
    pub async fn delete_card_by_number(&self, card_number: &CardNumber) -> CardResult<()> {
        self.delete_card(&CardKey::CardNumber(card_number.clone()))
            .await
    }

    /// Alias of `delete_card` keyed by record id.
    pub async fn delete_card_by_id(&self, id: CardId) -> CardResult<()> {
        self.delete_card(&CardKey::Id(id)).await
    }

    /// Submissions with terms not yet agreed, ascending by card number.
    #[instrument(skip(self), err(level = "warn"))]
    pub async fn list_new_orders(&self) -> CardResult<Vec<CardRecord>> {
        let records = self
            .store
            .find_all(&CardFilter::new_orders(), CardOrder::CardNumberAsc)
            .await?;
        self.listing(records)
    }
}
