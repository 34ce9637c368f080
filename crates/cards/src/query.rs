//! Filtering and ordering rules for card listings.
//!
//! Filters are plain equality predicates; orderings are either the store's
//! own order or ascending card number. Nothing else (pagination, secondary
//! keys) exists.

use slabtrack_core::UserId;

use crate::card::{CardNumber, CardRecord};

/// Equality predicates over card records. Unset predicates match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardFilter {
    pub user_id: Option<UserId>,
    pub card_number: Option<CardNumber>,
    pub terms_agreed: Option<bool>,
}

impl CardFilter {
    /// Matches every record.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    pub fn by_card_number(card_number: CardNumber) -> Self {
        Self {
            card_number: Some(card_number),
            ..Self::default()
        }
    }

    /// Submissions whose terms are not yet agreed.
    pub fn new_orders() -> Self {
        Self {
            terms_agreed: Some(false),
            ..Self::default()
        }
    }

    pub fn and_card_number(mut self, card_number: CardNumber) -> Self {
        self.card_number = Some(card_number);
        self
    }

    pub fn matches(&self, record: &CardRecord) -> bool {
        self.user_id.is_none_or(|u| record.user_id() == u)
            && self
                .card_number
                .as_ref()
                .is_none_or(|c| record.card_number() == c)
            && self.terms_agreed.is_none_or(|t| record.terms_agreed() == t)
    }
}

/// Sort specification handed to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CardOrder {
    /// Whatever order the store yields (insertion order for the in-memory store).
    #[default]
    StoreNative,
    /// Ascending by card number, byte-wise lexicographic.
    CardNumberAsc,
}

/// Sort records ascending by card number (`"10" < "2" < "9"`).
///
/// Stable, so records compare equal only on identical numbers, which the
/// uniqueness invariant rules out anyway.
pub fn sort_by_card_number(records: &mut [CardRecord]) {
    records.sort_by(|a, b| a.card_number().cmp(b.card_number()));
}

/// Filter then order an in-memory sequence of records.
pub fn select<'a, I>(records: I, filter: &CardFilter, order: CardOrder) -> Vec<CardRecord>
where
    I: IntoIterator<Item = &'a CardRecord>,
{
    let mut selected: Vec<CardRecord> = records
        .into_iter()
        .filter(|r| filter.matches(r))
        .cloned()
        .collect();

    if order == CardOrder::CardNumberAsc {
        sort_by_card_number(&mut selected);
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardFields;
    use chrono::Utc;
    use slabtrack_core::CardId;

    fn record(number: &str, user_id: UserId, terms_agreed: bool) -> CardRecord {
        let fields = CardFields {
            terms_agreed,
            ..CardFields::new(CardNumber::parse(number).unwrap(), user_id)
        };
        CardRecord::from_parts(CardId::new(), fields, Utc::now())
    }

    fn numbers(records: &[CardRecord]) -> Vec<&str> {
        records.iter().map(|r| r.card_number().as_str()).collect()
    }

    #[test]
    fn orders_card_numbers_as_strings_not_integers() {
        let user = UserId::new();
        let records = vec![
            record("9", user, false),
            record("10", user, false),
            record("2", user, false),
        ];

        let sorted = select(&records, &CardFilter::all(), CardOrder::CardNumberAsc);
        assert_eq!(numbers(&sorted), vec!["10", "2", "9"]);
    }

    #[test]
    fn store_native_order_is_left_untouched() {
        let user = UserId::new();
        let records = vec![record("9", user, false), record("10", user, false)];

        let selected = select(&records, &CardFilter::all(), CardOrder::StoreNative);
        assert_eq!(numbers(&selected), vec!["9", "10"]);
    }

    #[test]
    fn new_orders_filter_keeps_only_pending_terms() {
        let user = UserId::new();
        let records = vec![
            record("A", user, false),
            record("B", user, true),
            record("C", user, false),
        ];

        let pending = select(&records, &CardFilter::new_orders(), CardOrder::CardNumberAsc);
        assert_eq!(numbers(&pending), vec!["A", "C"]);
    }

    #[test]
    fn user_filter_combines_with_card_number() {
        let alice = UserId::new();
        let bob = UserId::new();
        let records = vec![record("A", alice, false), record("B", bob, false)];

        let by_bob = select(&records, &CardFilter::by_user(bob), CardOrder::StoreNative);
        assert_eq!(numbers(&by_bob), vec!["B"]);

        let filter = CardFilter::by_user(alice).and_card_number(CardNumber::parse("B").unwrap());
        assert!(select(&records, &filter, CardOrder::StoreNative).is_empty());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: ascending order agrees with plain string comparison.
            #[test]
            fn card_number_order_is_lexicographic(
                raw in proptest::collection::btree_set("[0-9A-Za-z-]{1,8}", 0..24)
            ) {
                let user = UserId::new();
                let mut shuffled: Vec<String> = raw.iter().cloned().collect();
                shuffled.reverse();
                let records: Vec<CardRecord> =
                    shuffled.iter().map(|n| record(n, user, false)).collect();

                let sorted = select(&records, &CardFilter::all(), CardOrder::CardNumberAsc);

                let mut expected: Vec<String> = raw.into_iter().collect();
                expected.sort();
                prop_assert_eq!(numbers(&sorted), expected.iter().map(String::as_str).collect::<Vec<_>>());
            }

            /// Property: filtering never invents or drops matching records.
            #[test]
            fn new_orders_filter_is_exact(flags in proptest::collection::vec(any::<bool>(), 0..32)) {
                let user = UserId::new();
                let records: Vec<CardRecord> = flags
                    .iter()
                    .enumerate()
                    .map(|(i, agreed)| record(&format!("N{i:03}"), user, *agreed))
                    .collect();

                let pending = select(&records, &CardFilter::new_orders(), CardOrder::StoreNative);

                prop_assert_eq!(pending.len(), flags.iter().filter(|f| !**f).count());
                prop_assert!(pending.iter().all(CardRecord::is_new_order));
            }
        }
    }
}
