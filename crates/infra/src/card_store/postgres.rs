//! Postgres-backed card store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation on `card_number`) | `23505` | `DuplicateKey` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / Io / Tls / other | N/A | `Backend` |
//!
//! ## Ordering
//!
//! Store-native order is insertion order (`seq`). Card number ordering uses
//! the `"C"` collation so that it is byte-wise, matching `CardNumber`'s `Ord`
//! regardless of the database locale.

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::instrument;
use uuid::Uuid;

use slabtrack_cards::{
    CardFields, CardFilter, CardKey, CardNumber, CardOrder, CardPatch, CardRecord, CardStore,
    StoreError, TrackingStatus,
};
use slabtrack_core::{CardId, UserId};

use super::SCHEMA;

const SELECT_CARDS: &str = r#"
    SELECT
        id,
        card_number,
        user_id,
        terms_agreed,
        name,
        card_set,
        release_year,
        language,
        label,
        rarity,
        holographic,
        certification_number,
        address,
        image,
        image2,
        grade,
        subgrade,
        rating,
        tracking_status,
        tracking_id,
        created_at
    FROM cards
"#;

const FILTER_CLAUSE: &str = r#"
    WHERE ($1::uuid IS NULL OR user_id = $1)
        AND ($2::text IS NULL OR card_number = $2)
        AND ($3::boolean IS NULL OR terms_agreed = $3)
"#;

fn order_clause(order: CardOrder) -> &'static str {
    match order {
        CardOrder::StoreNative => " ORDER BY seq ASC",
        CardOrder::CardNumberAsc => r#" ORDER BY card_number COLLATE "C" ASC"#,
    }
}

/// Card store over a shared Postgres pool.
///
/// `PgPool` is internally reference counted, so cloning the store is cheap
/// and every clone shares the same connections.
#[derive(Debug, Clone)]
pub struct PostgresCardStore {
    pool: PgPool,
}

impl PostgresCardStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the `cards` table and its indexes if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl CardStore for PostgresCardStore {
    #[instrument(
        skip(self, fields),
        fields(operation = "create", card_number = %fields.card_number),
        err
    )]
    async fn create(&self, fields: CardFields) -> Result<CardRecord, StoreError> {
        let id = CardId::new();

        let row = sqlx::query(
            r#"
            INSERT INTO cards (
                id,
                card_number,
                user_id,
                terms_agreed,
                name,
                card_set,
                release_year,
                language,
                label,
                rarity,
                holographic,
                certification_number,
                address,
                image,
                image2,
                grade,
                subgrade,
                rating,
                tracking_status,
                tracking_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            RETURNING created_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(fields.card_number.as_str())
        .bind(fields.user_id.as_uuid())
        .bind(fields.terms_agreed)
        .bind(&fields.name)
        .bind(&fields.set)
        .bind(fields.release_year)
        .bind(&fields.language)
        .bind(&fields.label)
        .bind(&fields.rarity)
        .bind(&fields.holographic)
        .bind(&fields.certification_number)
        .bind(&fields.address)
        .bind(&fields.image)
        .bind(&fields.image2)
        .bind(&fields.grade)
        .bind(&fields.subgrade)
        .bind(&fields.rating)
        .bind(fields.tracking_status.as_ref().map(TrackingStatus::as_str))
        .bind(&fields.tracking_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicateKey(fields.card_number.clone())
            } else {
                map_sqlx_error("insert_card", e)
            }
        })?;

        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| map_sqlx_error("insert_card", e))?;

        Ok(CardRecord::from_parts(id, fields, created_at))
    }

    #[instrument(skip(self), fields(operation = "find_by_id"), err)]
    async fn find_by_id(&self, id: CardId) -> Result<Option<CardRecord>, StoreError> {
        let sql = format!("{SELECT_CARDS} WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_by_id", e))?;

        row.as_ref().map(record_from_row).transpose()
    }

    #[instrument(skip(self), fields(operation = "find_one"), err)]
    async fn find_one(&self, filter: &CardFilter) -> Result<Option<CardRecord>, StoreError> {
        let sql = format!(
            "{SELECT_CARDS} {FILTER_CLAUSE} {} LIMIT 1",
            order_clause(CardOrder::StoreNative)
        );
        let row = bind_filter(sqlx::query(&sql), filter)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_one", e))?;

        row.as_ref().map(record_from_row).transpose()
    }

    #[instrument(skip(self), fields(operation = "find_all"), err)]
    async fn find_all(
        &self,
        filter: &CardFilter,
        order: CardOrder,
    ) -> Result<Vec<CardRecord>, StoreError> {
        let sql = format!("{SELECT_CARDS} {FILTER_CLAUSE} {}", order_clause(order));
        let rows = bind_filter(sqlx::query(&sql), filter)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_all", e))?;

        rows.iter().map(record_from_row).collect()
    }

    #[instrument(skip(self, patch), fields(operation = "update_fields", key = %key), err)]
    async fn update_fields(&self, key: &CardKey, patch: &CardPatch) -> Result<u64, StoreError> {
        if patch.is_empty() {
            return Ok(u64::from(self.find_by_key(key).await?.is_some()));
        }

        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new("UPDATE cards SET ");
        push_assignments(&mut qb, patch);
        push_key(&mut qb, key);

        let result = qb.build().execute(&self.pool).await.map_err(|e| {
            match (&patch.card_number, is_unique_violation(&e)) {
                (Some(number), true) => StoreError::DuplicateKey(number.clone()),
                _ => map_sqlx_error("update_fields", e),
            }
        })?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(operation = "delete", key = %key), err)]
    async fn delete(&self, key: &CardKey) -> Result<u64, StoreError> {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new("DELETE FROM cards");
        push_key(&mut qb, key);

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete", e))?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(operation = "exists", card_number = %card_number), err)]
    async fn exists(&self, card_number: &CardNumber) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM cards WHERE card_number = $1) AS found")
            .bind(card_number.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("exists", e))?;

        row.try_get("found").map_err(|e| map_sqlx_error("exists", e))
    }
}

fn bind_filter<'q>(
    query: sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>,
    filter: &CardFilter,
) -> sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments> {
    query
        .bind(filter.user_id.map(Uuid::from))
        .bind(filter.card_number.as_ref().map(|c| c.as_str().to_string()))
        .bind(filter.terms_agreed)
}

fn push_key(qb: &mut QueryBuilder<'_, Postgres>, key: &CardKey) {
    match key {
        CardKey::Id(id) => {
            qb.push(" WHERE id = ").push_bind(Uuid::from(*id));
        }
        CardKey::CardNumber(number) => {
            qb.push(" WHERE card_number = ")
                .push_bind(number.as_str().to_string());
        }
    }
}

/// Append `column = $n` for every field the patch touches, and nothing else.
fn push_assignments(qb: &mut QueryBuilder<'_, Postgres>, patch: &CardPatch) {
    macro_rules! assign {
        ($set:ident, $column:literal, $value:expr) => {
            if let Some(value) = $value {
                $set.push(concat!($column, " = "));
                $set.push_bind_unseparated(value);
            }
        };
    }

    let mut set = qb.separated(", ");
    assign!(set, "card_number", patch.card_number.as_ref().map(|c| c.as_str().to_string()));
    assign!(set, "user_id", patch.user_id.map(Uuid::from));
    assign!(set, "terms_agreed", patch.terms_agreed);
    assign!(set, "name", patch.name.clone());
    assign!(set, "card_set", patch.set.clone());
    assign!(set, "release_year", patch.release_year);
    assign!(set, "language", patch.language.clone());
    assign!(set, "label", patch.label.clone());
    assign!(set, "rarity", patch.rarity.clone());
    assign!(set, "holographic", patch.holographic.clone());
    assign!(set, "certification_number", patch.certification_number.clone());
    assign!(set, "address", patch.address.clone());
    assign!(set, "image", patch.image.clone());
    assign!(set, "image2", patch.image2.clone());
    assign!(set, "grade", patch.grade.clone());
    assign!(set, "subgrade", patch.subgrade.clone());
    assign!(set, "rating", patch.rating.clone());
    assign!(
        set,
        "tracking_status",
        patch
            .tracking_status
            .as_ref()
            .map(|s| s.as_ref().map(|s| s.as_str().to_string()))
    );
    assign!(set, "tracking_id", patch.tracking_id.clone());
}

// SQLx row types

#[derive(Debug)]
struct CardRow {
    id: Uuid,
    card_number: String,
    user_id: Uuid,
    terms_agreed: bool,
    name: Option<String>,
    card_set: Option<String>,
    release_year: Option<i32>,
    language: Option<String>,
    label: Option<String>,
    rarity: Option<String>,
    holographic: Option<String>,
    certification_number: Option<String>,
    address: Option<String>,
    image: Option<String>,
    image2: Option<String>,
    grade: Option<String>,
    subgrade: Option<String>,
    rating: Option<String>,
    tracking_status: Option<String>,
    tracking_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for CardRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CardRow {
            id: row.try_get("id")?,
            card_number: row.try_get("card_number")?,
            user_id: row.try_get("user_id")?,
            terms_agreed: row.try_get("terms_agreed")?,
            name: row.try_get("name")?,
            card_set: row.try_get("card_set")?,
            release_year: row.try_get("release_year")?,
            language: row.try_get("language")?,
            label: row.try_get("label")?,
            rarity: row.try_get("rarity")?,
            holographic: row.try_get("holographic")?,
            certification_number: row.try_get("certification_number")?,
            address: row.try_get("address")?,
            image: row.try_get("image")?,
            image2: row.try_get("image2")?,
            grade: row.try_get("grade")?,
            subgrade: row.try_get("subgrade")?,
            rating: row.try_get("rating")?,
            tracking_status: row.try_get("tracking_status")?,
            tracking_id: row.try_get("tracking_id")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<CardRow> for CardRecord {
    type Error = StoreError;

    fn try_from(row: CardRow) -> Result<Self, Self::Error> {
        let card_number = CardNumber::parse(row.card_number)
            .map_err(|e| StoreError::backend(format!("corrupt card row {}: {e}", row.id)))?;

        let fields = CardFields {
            card_number,
            user_id: UserId::from_uuid(row.user_id),
            terms_agreed: row.terms_agreed,
            name: row.name,
            set: row.card_set,
            release_year: row.release_year,
            language: row.language,
            label: row.label,
            rarity: row.rarity,
            holographic: row.holographic,
            certification_number: row.certification_number,
            address: row.address,
            image: row.image,
            image2: row.image2,
            grade: row.grade,
            subgrade: row.subgrade,
            rating: row.rating,
            tracking_status: row.tracking_status.map(TrackingStatus::new),
            tracking_id: row.tracking_id,
        };

        Ok(CardRecord::from_parts(
            CardId::from_uuid(row.id),
            fields,
            row.created_at,
        ))
    }
}

fn record_from_row(row: &PgRow) -> Result<CardRecord, StoreError> {
    let card_row = <CardRow as sqlx::FromRow<PgRow>>::from_row(row)
        .map_err(|e| StoreError::backend(format!("failed to deserialize card row: {e}")))?;
    card_row.try_into()
}

/// Map SQLx errors to StoreError.
///
/// Unique violations are classified by the caller, which knows which card
/// number was being written.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let code = db_err
                .code()
                .map(|c| c.into_owned())
                .unwrap_or_else(|| "unknown".to_string());
            StoreError::backend(format!(
                "database error in {operation} (code {code}): {}",
                db_err.message()
            ))
        }
        sqlx::Error::PoolClosed => {
            StoreError::backend(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::backend(format!("timed out acquiring a connection in {operation}"))
        }
        _ => StoreError::backend(format!("sqlx error in {operation}: {err}")),
    }
}

/// Check if an error is a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}
