use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{new_subscriber::NewSubscriber, subscriber::Subscriber};
use crate::utils::error_chain_fmt;

// SQLSTATE raised by Postgres on a unique constraint violation
const UNIQUE_VIOLATION: &str = "23505";

#[derive(thiserror::Error)]
pub enum StoreError {
    #[error("{0} is already subscribed.")]
    DuplicateEntry(String),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Gateway over the `subscribers` collection.
#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Stores a new subscriber. A second insert of the same email yields `DuplicateEntry`.
    async fn insert(&self, new_subscriber: &NewSubscriber) -> Result<Subscriber, StoreError>;

    /// Every record, most recent first.
    async fn list_all(&self) -> Result<Vec<Subscriber>, StoreError>;

    /// Records still flagged as subscribed, most recent first.
    async fn list_active(&self) -> Result<Vec<Subscriber>, StoreError>;

    async fn most_recent_active(&self) -> Result<Option<Subscriber>, StoreError>;
}

pub struct PgSubscriberStore {
    db_pool: PgPool,
}

impl PgSubscriberStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[derive(sqlx::FromRow)]
struct SubscriberRow {
    id: Uuid,
    email: String,
    created_at: DateTime<Utc>,
    subscribed: bool,
    source: String,
}

// Rows are returned as stored, other writers share the table
impl From<SubscriberRow> for Subscriber {
    fn from(row: SubscriberRow) -> Self {
        Subscriber {
            id: row.id,
            email: row.email,
            created_at: row.created_at,
            subscribed: row.subscribed,
            source: row.source,
        }
    }
}

fn into_subscribers(rows: Vec<SubscriberRow>) -> Vec<Subscriber> {
    rows.into_iter().map(Subscriber::from).collect()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(UNIQUE_VIOLATION),
        _ => false,
    }
}

#[async_trait]
impl SubscriberStore for PgSubscriberStore {
    #[tracing::instrument(
        name = "Insert a new subscriber into the database",
        skip(self, new_subscriber),
        fields(subscriber_email = %new_subscriber.email)
    )]
    async fn insert(&self, new_subscriber: &NewSubscriber) -> Result<Subscriber, StoreError> {
        let row = sqlx::query_as::<_, SubscriberRow>(
            r#"
            INSERT INTO subscribers (id, email, created_at, subscribed, source)
            VALUES ($1, $2, $3, true, $4)
            RETURNING id, email, created_at, subscribed, source
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_subscriber.email.as_ref())
        .bind(Utc::now())
        .bind(new_subscriber.source.as_ref())
        .fetch_one(&self.db_pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                tracing::info!("{} is already subscribed", new_subscriber.email);
                StoreError::DuplicateEntry(new_subscriber.email.to_string())
            } else {
                tracing::error!("Failed to execute query: {:?}", err);
                StoreError::UnexpectedError(
                    anyhow::Error::new(err).context("Failed to insert a new subscriber."),
                )
            }
        })?;

        Ok(row.into())
    }

    #[tracing::instrument(name = "Fetch every subscriber", skip(self))]
    async fn list_all(&self) -> Result<Vec<Subscriber>, StoreError> {
        let rows = sqlx::query_as::<_, SubscriberRow>(
            r#"
            SELECT id, email, created_at, subscribed, source
            FROM subscribers
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.db_pool)
        .await
        .context("Failed to fetch subscribers from the database.")?;

        Ok(into_subscribers(rows))
    }

    #[tracing::instrument(name = "Fetch active subscribers", skip(self))]
    async fn list_active(&self) -> Result<Vec<Subscriber>, StoreError> {
        let rows = sqlx::query_as::<_, SubscriberRow>(
            r#"
            SELECT id, email, created_at, subscribed, source
            FROM subscribers
            WHERE subscribed = true
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.db_pool)
        .await
        .context("Failed to fetch active subscribers from the database.")?;

        Ok(into_subscribers(rows))
    }

    #[tracing::instrument(name = "Fetch the most recent active subscriber", skip(self))]
    async fn most_recent_active(&self) -> Result<Option<Subscriber>, StoreError> {
        let row = sqlx::query_as::<_, SubscriberRow>(
            r#"
            SELECT id, email, created_at, subscribed, source
            FROM subscribers
            WHERE subscribed = true
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.db_pool)
        .await
        .context("Failed to fetch the most recent subscriber from the database.")?;

        Ok(row.map(Subscriber::from))
    }
}
