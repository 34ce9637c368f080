use std::sync::RwLock;

use chrono::Utc;

use slabtrack_core::CardId;

use super::{CardKey, CardStore, StoreError};
use crate::card::{CardFields, CardPatch, CardRecord};
use crate::query::{self, CardFilter, CardOrder};

/// In-memory card store.
///
/// Intended for tests/dev. Records are kept in insertion order, which is the
/// store-native order; lookups are linear scans.
#[derive(Debug, Default)]
pub struct InMemoryCardStore {
    records: RwLock<Vec<CardRecord>>,
}

impl InMemoryCardStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.records.read().map_err(|_| poisoned())?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

fn poisoned() -> StoreError {
    StoreError::backend("card store lock poisoned")
}

#[async_trait::async_trait]
impl CardStore for InMemoryCardStore {
    async fn create(&self, fields: CardFields) -> Result<CardRecord, StoreError> {
        let mut records = self.records.write().map_err(|_| poisoned())?;

        // Checked under the write lock, so concurrent creates cannot both pass.
        if records.iter().any(|r| r.card_number() == &fields.card_number) {
            return Err(StoreError::DuplicateKey(fields.card_number));
        }

        let record = CardRecord::from_parts(CardId::new(), fields, Utc::now());
        records.push(record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: CardId) -> Result<Option<CardRecord>, StoreError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.iter().find(|r| r.card_id() == id).cloned())
    }

    async fn find_one(&self, filter: &CardFilter) -> Result<Option<CardRecord>, StoreError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.iter().find(|r| filter.matches(r)).cloned())
    }

    async fn find_all(
        &self,
        filter: &CardFilter,
        order: CardOrder,
    ) -> Result<Vec<CardRecord>, StoreError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(query::select(records.iter(), filter, order))
    }

    async fn update_fields(&self, key: &CardKey, patch: &CardPatch) -> Result<u64, StoreError> {
        let mut records = self.records.write().map_err(|_| poisoned())?;

        let Some(idx) = records.iter().position(|r| key.matches(r)) else {
            return Ok(0);
        };

        if let Some(number) = &patch.card_number {
            let taken = records
                .iter()
                .enumerate()
                .any(|(i, r)| i != idx && r.card_number() == number);
            if taken {
                return Err(StoreError::DuplicateKey(number.clone()));
            }
        }

        let current = &records[idx];
        let mut fields = current.fields().clone();
        patch.apply_to(&mut fields);
        records[idx] = CardRecord::from_parts(current.card_id(), fields, current.created_at());
        Ok(1)
    }

    async fn delete(&self, key: &CardKey) -> Result<u64, StoreError> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        let before = records.len();
        records.retain(|r| !key.matches(r));
        Ok((before - records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{CardNumber, TrackingStatus};
    use slabtrack_core::UserId;

    fn number(s: &str) -> CardNumber {
        CardNumber::parse(s).unwrap()
    }

    #[tokio::test]
    async fn create_assigns_id_and_rejects_duplicate_number() {
        let store = InMemoryCardStore::new();
        let user = UserId::new();

        let first = store.create(CardFields::new(number("A1"), user)).await.unwrap();
        assert_eq!(first.card_number(), &number("A1"));

        let err = store
            .create(CardFields::new(number("A1"), UserId::new()))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::DuplicateKey(number("A1")));
        assert_eq!(store.len().unwrap(), 1);
        assert!(store.exists(&number("A1")).await.unwrap());
    }

    #[tokio::test]
    async fn reads_return_empty_results_on_absence() {
        let store = InMemoryCardStore::new();

        assert!(store.find_by_id(CardId::new()).await.unwrap().is_none());
        assert!(store.find_by_card_number(&number("X")).await.unwrap().is_none());
        assert!(store.find_all_by_user(UserId::new()).await.unwrap().is_empty());
        assert!(!store.exists(&number("X")).await.unwrap());
    }

    #[tokio::test]
    async fn find_all_by_user_keeps_insertion_order() {
        let store = InMemoryCardStore::new();
        let user = UserId::new();
        for n in ["9", "10", "2"] {
            store.create(CardFields::new(number(n), user)).await.unwrap();
        }
        store.create(CardFields::new(number("1"), UserId::new())).await.unwrap();

        let owned = store.find_all_by_user(user).await.unwrap();
        let numbers: Vec<&str> = owned.iter().map(|r| r.card_number().as_str()).collect();
        assert_eq!(numbers, vec!["9", "10", "2"]);
    }

    #[tokio::test]
    async fn update_fields_by_number_merges_patch() {
        let store = InMemoryCardStore::new();
        let created = store
            .create(CardFields {
                name: Some("Pikachu".to_string()),
                ..CardFields::new(number("A1"), UserId::new())
            })
            .await
            .unwrap();

        let key = CardKey::CardNumber(number("A1"));
        let affected = store
            .update_fields(&key, &CardPatch::tracking(TrackingStatus::new("graded"), "T-1"))
            .await
            .unwrap();
        assert_eq!(affected, 1);

        let updated = store.find_by_id(created.card_id()).await.unwrap().unwrap();
        assert_eq!(updated.fields().name.as_deref(), Some("Pikachu"));
        assert_eq!(updated.tracking_status(), Some(&TrackingStatus::new("graded")));
        assert_eq!(updated.created_at(), created.created_at());
    }

    #[tokio::test]
    async fn update_fields_rejects_renumbering_onto_taken_number() {
        let store = InMemoryCardStore::new();
        let user = UserId::new();
        let a = store.create(CardFields::new(number("A"), user)).await.unwrap();
        store.create(CardFields::new(number("B"), user)).await.unwrap();

        let patch = CardPatch {
            card_number: Some(number("B")),
            ..CardPatch::default()
        };
        let err = store
            .update_fields(&CardKey::Id(a.card_id()), &patch)
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::DuplicateKey(number("B")));

        let unchanged = store.find_by_id(a.card_id()).await.unwrap().unwrap();
        assert_eq!(unchanged.card_number(), &number("A"));
    }

    #[tokio::test]
    async fn missing_keys_affect_nothing() {
        let store = InMemoryCardStore::new();
        let key = CardKey::Id(CardId::new());

        assert_eq!(store.update_fields(&key, &CardPatch::default()).await.unwrap(), 0);
        assert_eq!(store.delete(&key).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_by_either_key_removes_record() {
        let store = InMemoryCardStore::new();
        let user = UserId::new();
        let a = store.create(CardFields::new(number("A"), user)).await.unwrap();
        store.create(CardFields::new(number("B"), user)).await.unwrap();

        assert_eq!(store.delete(&CardKey::Id(a.card_id())).await.unwrap(), 1);
        assert_eq!(store.delete(&CardKey::CardNumber(number("B"))).await.unwrap(), 1);
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn poisoned_lock_surfaces_as_backend_error() {
        let store = std::sync::Arc::new(InMemoryCardStore::new());
        let poisoner = std::sync::Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.records.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();

        assert_eq!(store.len(), Err(poisoned()));
        assert_eq!(store.is_empty(), Err(poisoned()));
    }
}
