//! End-to-end submission scenarios against the in-memory store.

use std::sync::Arc;

use slabtrack_cards::{
    CardError, CardFields, CardKey, CardLifecycleService, CardNumber, CardStore,
    InMemoryCardStore, TrackingStatus,
};
use slabtrack_core::UserId;

fn number(s: &str) -> CardNumber {
    CardNumber::parse(s).unwrap()
}

#[tokio::test]
async fn new_order_is_tracked_through_to_shipment() {
    let svc = CardLifecycleService::new(InMemoryCardStore::new());
    let owner = UserId::new();

    let registered = svc
        .register_card(CardFields {
            name: Some("Mewtwo".to_string()),
            certification_number: Some("CERT-77".to_string()),
            ..CardFields::new(number("A1"), owner)
        })
        .await
        .unwrap();

    let new_orders = svc.list_new_orders().await.unwrap();
    assert!(new_orders.iter().any(|r| r.card_id() == registered.card_id()));

    svc.update_tracking_status(&number("A1"), TrackingStatus::new("shipped"), "TRK123")
        .await
        .unwrap();

    let fetched = svc.get_card_by_card_number(&number("A1")).await.unwrap();
    assert_eq!(fetched.tracking_status().map(|s| s.as_str()), Some("shipped"));
    assert_eq!(fetched.tracking_id(), Some("TRK123"));
    assert_eq!(fetched.fields().name.as_deref(), Some("Mewtwo"));
    assert_eq!(fetched.fields().certification_number.as_deref(), Some("CERT-77"));
    assert_eq!(fetched.user_id(), owner);
    assert!(fetched.is_new_order());
    assert_eq!(fetched.created_at(), registered.created_at());
}

#[tokio::test]
async fn duplicate_registration_keeps_exactly_one_record() {
    let store = Arc::new(InMemoryCardStore::new());
    let svc = CardLifecycleService::new(store.clone());

    svc.register_card(CardFields::new(number("DUP"), UserId::new()))
        .await
        .unwrap();
    let err = svc
        .register_card(CardFields::new(number("DUP"), UserId::new()))
        .await
        .unwrap_err();

    assert!(matches!(err, CardError::DuplicateCardNumber(ref n) if n.as_str() == "DUP"));
    let all = svc.get_all_cards().await.unwrap();
    assert_eq!(all.iter().filter(|r| r.card_number().as_str() == "DUP").count(), 1);
    assert!(store.exists(&number("DUP")).await.unwrap());
}

#[tokio::test]
async fn accepted_terms_leave_the_new_order_listing() {
    let svc = CardLifecycleService::new(InMemoryCardStore::new());
    let owner = UserId::new();
    let record = svc
        .register_card(CardFields::new(number("T1"), owner))
        .await
        .unwrap();

    svc.update_card_full(
        record.card_id(),
        CardFields {
            terms_agreed: true,
            ..record.fields().clone()
        },
    )
    .await
    .unwrap();

    assert!(matches!(svc.list_new_orders().await, Err(CardError::NotFound)));
    let owned = svc.get_cards_by_user(owner).await.unwrap();
    assert_eq!(owned.len(), 1);
    assert!(owned[0].terms_agreed());
}

#[tokio::test]
async fn deleting_by_either_key_is_permanent() {
    let svc = CardLifecycleService::new(InMemoryCardStore::new());
    let owner = UserId::new();
    let by_id = svc
        .register_card(CardFields::new(number("K1"), owner))
        .await
        .unwrap();
    svc.register_card(CardFields::new(number("K2"), owner))
        .await
        .unwrap();

    svc.delete_card(&CardKey::Id(by_id.card_id())).await.unwrap();
    svc.delete_card(&CardKey::CardNumber(number("K2"))).await.unwrap();

    assert!(matches!(
        svc.get_card_by_card_number(&number("K1")).await,
        Err(CardError::NotFound)
    ));
    assert!(matches!(
        svc.delete_card_by_number(&number("K2")).await,
        Err(CardError::NotFound)
    ));
    assert!(matches!(
        svc.get_cards_by_user(owner).await,
        Err(CardError::NotFound)
    ));

    // A deleted number is free to be registered again.
    svc.register_card(CardFields::new(number("K2"), owner))
        .await
        .unwrap();
}
