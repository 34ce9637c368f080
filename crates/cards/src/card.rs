use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use slabtrack_core::{CardId, DomainError, DomainResult, Entity, UserId, ValueObject};

/// Globally unique, externally visible card number.
///
/// Ordering is byte-wise lexicographic on the underlying string, so `"10"`
/// sorts before `"9"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardNumber(String);

impl CardNumber {
    /// Parse a card number. Empty or whitespace-only input is rejected; the
    /// value is otherwise stored verbatim.
    pub fn parse(value: impl Into<String>) -> DomainResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(DomainError::validation("card number cannot be empty"));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for CardNumber {}

impl core::fmt::Display for CardNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CardNumber {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<&str> for CardNumber {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<CardNumber> for String {
    fn from(value: CardNumber) -> Self {
        value.0
    }
}

/// Shipment/processing phase label.
///
/// Opaque: the vocabulary belongs to the grading workflow, and any label may
/// follow any other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackingStatus(String);

impl TrackingStatus {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for TrackingStatus {}

impl core::fmt::Display for TrackingStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackingStatus {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Every client-supplied attribute of a card submission.
///
/// Used as-is for registration and for the wide (full replace) update: any
/// `None` here is written as empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardFields {
    pub card_number: CardNumber,
    pub user_id: UserId,
    #[serde(default)]
    pub terms_agreed: bool,

    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub set: Option<String>,
    #[serde(default)]
    pub release_year: Option<i32>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub rarity: Option<String>,
    #[serde(default)]
    pub holographic: Option<String>,
    #[serde(default)]
    pub certification_number: Option<String>,
    /// Shipping/contact address captured at submission time.
    #[serde(default)]
    pub address: Option<String>,

    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub image2: Option<String>,

    // Populated once grading completes.
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub subgrade: Option<String>,
    #[serde(default)]
    pub rating: Option<String>,

    #[serde(default)]
    pub tracking_status: Option<TrackingStatus>,
    #[serde(default, rename = "trackingID")]
    pub tracking_id: Option<String>,
}

impl CardFields {
    /// Minimal submission: a card number and its owner, terms not yet agreed.
    pub fn new(card_number: CardNumber, user_id: UserId) -> Self {
        Self {
            card_number,
            user_id,
            terms_agreed: false,
            name: None,
            set: None,
            release_year: None,
            language: None,
            label: None,
            rarity: None,
            holographic: None,
            certification_number: None,
            address: None,
            image: None,
            image2: None,
            grade: None,
            subgrade: None,
            rating: None,
            tracking_status: None,
            tracking_id: None,
        }
    }
}

/// A stored card grading submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    id: CardId,
    #[serde(flatten)]
    fields: CardFields,
    created_at: DateTime<Utc>,
}

impl CardRecord {
    /// Assemble a record. Only stores call this; ids and timestamps are
    /// theirs to assign.
    pub fn from_parts(id: CardId, fields: CardFields, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            fields,
            created_at,
        }
    }

    pub fn card_id(&self) -> CardId {
        self.id
    }

    pub fn card_number(&self) -> &CardNumber {
        &self.fields.card_number
    }

    pub fn user_id(&self) -> UserId {
        self.fields.user_id
    }

    pub fn terms_agreed(&self) -> bool {
        self.fields.terms_agreed
    }

    /// A submission whose terms have not been accepted yet.
    pub fn is_new_order(&self) -> bool {
        !self.fields.terms_agreed
    }

    pub fn tracking_status(&self) -> Option<&TrackingStatus> {
        self.fields.tracking_status.as_ref()
    }

    pub fn tracking_id(&self) -> Option<&str> {
        self.fields.tracking_id.as_deref()
    }

    pub fn fields(&self) -> &CardFields {
        &self.fields
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn into_fields(self) -> CardFields {
        self.fields
    }
}

impl Entity for CardRecord {
    type Id = CardId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Partial field assignment merged into an existing record.
///
/// The outer `Option` says whether the field is touched at all; for nullable
/// attributes the inner `Option` is the value to write (`None` clears it).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardPatch {
    pub card_number: Option<CardNumber>,
    pub user_id: Option<UserId>,
    pub terms_agreed: Option<bool>,
    pub name: Option<Option<String>>,
    pub set: Option<Option<String>>,
    pub release_year: Option<Option<i32>>,
    pub language: Option<Option<String>>,
    pub label: Option<Option<String>>,
    pub rarity: Option<Option<String>>,
    pub holographic: Option<Option<String>>,
    pub certification_number: Option<Option<String>>,
    pub address: Option<Option<String>>,
    pub image: Option<Option<String>>,
    pub image2: Option<Option<String>>,
    pub grade: Option<Option<String>>,
    pub subgrade: Option<Option<String>>,
    pub rating: Option<Option<String>>,
    pub tracking_status: Option<Option<TrackingStatus>>,
    pub tracking_id: Option<Option<String>>,
}

impl CardPatch {
    /// Narrow patch: tracking status and carrier id, nothing else.
    pub fn tracking(status: TrackingStatus, tracking_id: impl Into<String>) -> Self {
        Self {
            tracking_status: Some(Some(status)),
            tracking_id: Some(Some(tracking_id.into())),
            ..Self::default()
        }
    }

    /// Wide patch: every field assigned from `fields`, including empties.
    pub fn replace_all(fields: CardFields) -> Self {
        Self {
            card_number: Some(fields.card_number),
            user_id: Some(fields.user_id),
            terms_agreed: Some(fields.terms_agreed),
            name: Some(fields.name),
            set: Some(fields.set),
            release_year: Some(fields.release_year),
            language: Some(fields.language),
            label: Some(fields.label),
            rarity: Some(fields.rarity),
            holographic: Some(fields.holographic),
            certification_number: Some(fields.certification_number),
            address: Some(fields.address),
            image: Some(fields.image),
            image2: Some(fields.image2),
            grade: Some(fields.grade),
            subgrade: Some(fields.subgrade),
            rating: Some(fields.rating),
            tracking_status: Some(fields.tracking_status),
            tracking_id: Some(fields.tracking_id),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge the touched fields into `target`, leaving the rest alone.
    pub fn apply_to(&self, target: &mut CardFields) {
        fn assign<T: Clone>(slot: &mut T, value: &Option<T>) {
            if let Some(v) = value {
                *slot = v.clone();
            }
        }

        assign(&mut target.card_number, &self.card_number);
        assign(&mut target.user_id, &self.user_id);
        assign(&mut target.terms_agreed, &self.terms_agreed);
        assign(&mut target.name, &self.name);
        assign(&mut target.set, &self.set);
        assign(&mut target.release_year, &self.release_year);
        assign(&mut target.language, &self.language);
        assign(&mut target.label, &self.label);
        assign(&mut target.rarity, &self.rarity);
        assign(&mut target.holographic, &self.holographic);
        assign(&mut target.certification_number, &self.certification_number);
        assign(&mut target.address, &self.address);
        assign(&mut target.image, &self.image);
        assign(&mut target.image2, &self.image2);
        assign(&mut target.grade, &self.grade);
        assign(&mut target.subgrade, &self.subgrade);
        assign(&mut target.rating, &self.rating);
        assign(&mut target.tracking_status, &self.tracking_status);
        assign(&mut target.tracking_id, &self.tracking_id);
    }
}
