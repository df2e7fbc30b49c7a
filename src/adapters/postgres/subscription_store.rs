//! PostgreSQL implementation of SubscriptionStore.
//!
//! Upserts run in one transaction that locks the account's row with
//! `SELECT .. FOR UPDATE`, so concurrent deliveries for the same account
//! serialize while different accounts proceed independently.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::domain::foundation::{AccountId, DomainError, ErrorCode, ProviderCustomerId, Timestamp};
use crate::domain::subscription::{
    CanonicalStatus, Provider, StatusUpdate, SubscriptionRecord, UpsertOutcome, WritePolicy,
};
use crate::ports::SubscriptionStore;

pub struct PostgresSubscriptionStore {
    pool: PgPool,
}

impl PostgresSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    account_id: String,
    status: String,
    provider: String,
    provider_customer_id: String,
    provider_subscription_id: Option<String>,
    updated_at: DateTime<Utc>,
    last_event_at: Option<DateTime<Utc>>,
}

impl TryFrom<SubscriptionRow> for SubscriptionRecord {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let canonical_status = parse_status(&row.status)?;
        let provider = row.provider.parse::<Provider>().map_err(|e| {
            DomainError::new(ErrorCode::InternalError, e.to_string())
                .with_detail("account_id", row.account_id.clone())
        })?;

        Ok(SubscriptionRecord {
            account_id: AccountId::new(row.account_id)?,
            canonical_status,
            provider,
            provider_customer_id: ProviderCustomerId::new(row.provider_customer_id)?,
            provider_subscription_id: row.provider_subscription_id,
            updated_at: Timestamp::from_datetime(row.updated_at),
            last_event_at: row.last_event_at.map(Timestamp::from_datetime),
        })
    }
}

fn parse_status(s: &str) -> Result<CanonicalStatus, DomainError> {
    s.parse::<CanonicalStatus>().map_err(|_| {
        DomainError::new(
            ErrorCode::UnrecognizedStatus,
            format!("Stored status '{}' is not canonical", s),
        )
        .with_detail("status", s)
    })
}

const SELECT_RECORD: &str = r#"
    SELECT account_id, status, provider, provider_customer_id,
           provider_subscription_id, updated_at, last_event_at
    FROM subscriptions
    WHERE account_id = $1
"#;

const UPSERT_RECORD: &str = r#"
    INSERT INTO subscriptions (
        account_id, status, provider, provider_customer_id,
        provider_subscription_id, last_event_at, created_at, updated_at
    ) VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
    ON CONFLICT (account_id) DO UPDATE SET
        status = EXCLUDED.status,
        provider = EXCLUDED.provider,
        provider_customer_id = EXCLUDED.provider_customer_id,
        provider_subscription_id = COALESCE(EXCLUDED.provider_subscription_id, subscriptions.provider_subscription_id),
        last_event_at = COALESCE(EXCLUDED.last_event_at, subscriptions.last_event_at),
        updated_at = NOW()
"#;

/// Same rule as `SubscriptionRecord::is_stale`, evaluated against the row
/// that won a concurrent first insert.
const STALE_GUARD: &str = r#"
    WHERE subscriptions.last_event_at IS NULL
       OR EXCLUDED.last_event_at IS NULL
       OR EXCLUDED.last_event_at >= subscriptions.last_event_at
"#;

fn upsert_statement(policy: WritePolicy) -> String {
    let guard = match policy {
        WritePolicy::LastWriteWins => "",
        WritePolicy::RejectStale => STALE_GUARD,
    };
    format!("{}{}RETURNING status", UPSERT_RECORD, guard)
}

async fn commit(tx: sqlx::Transaction<'_, sqlx::Postgres>) -> Result<(), DomainError> {
    tx.commit()
        .await
        .map_err(|e| DomainError::database(format!("Failed to commit transaction: {}", e)))
}

async fn find_mapping(
    conn: &mut PgConnection,
    provider: Provider,
    customer: &ProviderCustomerId,
) -> Result<Option<String>, DomainError> {
    sqlx::query_scalar::<_, String>(
        "SELECT account_id FROM provider_customers WHERE provider = $1 AND provider_customer_id = $2",
    )
    .bind(provider.as_str())
    .bind(customer.as_str())
    .fetch_optional(conn)
    .await
    .map_err(|e| DomainError::database(format!("Failed to resolve customer: {}", e)))
}

/// Inserts the mapping unless one exists, then returns whichever account is
/// mapped afterwards.
async fn insert_mapping(
    conn: &mut PgConnection,
    provider: Provider,
    customer: &ProviderCustomerId,
    account_id: &AccountId,
) -> Result<String, DomainError> {
    sqlx::query(
        r#"
        INSERT INTO provider_customers (provider, provider_customer_id, account_id, created_at)
        VALUES ($1, $2, $3, NOW())
        ON CONFLICT (provider, provider_customer_id) DO NOTHING
        "#,
    )
    .bind(provider.as_str())
    .bind(customer.as_str())
    .bind(account_id.as_str())
    .execute(&mut *conn)
    .await
    .map_err(|e| DomainError::database(format!("Failed to link customer: {}", e)))?;

    find_mapping(conn, provider, customer).await?.ok_or_else(|| {
        DomainError::new(ErrorCode::InternalError, "customer mapping vanished after insert")
    })
}

#[async_trait]
impl SubscriptionStore for PostgresSubscriptionStore {
    async fn upsert(
        &self,
        update: &StatusUpdate,
        policy: WritePolicy,
    ) -> Result<UpsertOutcome, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database(format!("Failed to start transaction: {}", e)))?;

        let mapped = find_mapping(&mut tx, update.provider, &update.provider_customer_id).await?;
        let account = match (mapped, &update.account_hint) {
            (Some(account), hint) => {
                if let Some(hint) = hint.as_ref().filter(|h| h.as_str() != account) {
                    tracing::warn!(
                        provider = %update.provider,
                        customer_id = %update.provider_customer_id,
                        mapped_account = %account,
                        hinted_account = %hint,
                        "Account hint disagrees with existing customer mapping; keeping mapping"
                    );
                }
                account
            }
            (None, Some(hint)) => {
                insert_mapping(&mut tx, update.provider, &update.provider_customer_id, hint).await?
            }
            (None, None) => {
                return Err(DomainError::new(
                    ErrorCode::NoMatchingAccount,
                    format!(
                        "no account mapped to {} customer {}",
                        update.provider, update.provider_customer_id
                    ),
                ))
            }
        };
        let account_id = AccountId::new(account)?;

        let existing = sqlx::query_as::<_, SubscriptionRow>(&format!("{} FOR UPDATE", SELECT_RECORD))
            .bind(account_id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| DomainError::database(format!("Failed to lock subscription: {}", e)))?
            .map(SubscriptionRecord::try_from)
            .transpose()?;

        if let Some(record) = &existing {
            if policy == WritePolicy::RejectStale && record.is_stale(update.occurred_at) {
                let current = record.canonical_status;
                commit(tx).await?;
                return Ok(UpsertOutcome::Stale {
                    account_id,
                    current,
                });
            }
        }

        // The row lock does not cover a row that does not exist yet; the
        // conflict clause covers a concurrent first insert.
        let written = sqlx::query_scalar::<_, String>(&upsert_statement(policy))
            .bind(account_id.as_str())
            .bind(update.status.as_str())
            .bind(update.provider.as_str())
            .bind(update.provider_customer_id.as_str())
            .bind(update.provider_subscription_id.as_deref())
            .bind(update.occurred_at.map(|t| *t.as_datetime()))
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| DomainError::database(format!("Failed to upsert subscription: {}", e)))?;

        if written.is_none() {
            // A concurrent first insert carried a newer event.
            let current = sqlx::query_as::<_, SubscriptionRow>(SELECT_RECORD)
                .bind(account_id.as_str())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| DomainError::database(format!("Failed to read subscription: {}", e)))
                .and_then(SubscriptionRecord::try_from)?
                .canonical_status;
            commit(tx).await?;
            return Ok(UpsertOutcome::Stale {
                account_id,
                current,
            });
        }

        commit(tx).await?;

        Ok(UpsertOutcome::from_transition(
            account_id,
            existing.map(|r| r.canonical_status),
            update.status,
        ))
    }

    async fn create_pending(
        &self,
        account_id: &AccountId,
        provider: Provider,
        provider_customer_id: &ProviderCustomerId,
    ) -> Result<SubscriptionRecord, DomainError> {
        let result = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            INSERT INTO subscriptions (
                account_id, status, provider, provider_customer_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, NOW(), NOW())
            RETURNING account_id, status, provider, provider_customer_id,
                      provider_subscription_id, updated_at, last_event_at
            "#,
        )
        .bind(account_id.as_str())
        .bind(CanonicalStatus::PendingPayment.as_str())
        .bind(provider.as_str())
        .bind(provider_customer_id.as_str())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => SubscriptionRecord::try_from(row),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(DomainError::new(
                    ErrorCode::SubscriptionExists,
                    format!("account {} already has a subscription record", account_id),
                ))
            }
            Err(e) => Err(DomainError::database(format!(
                "Failed to create pending subscription: {}",
                e
            ))),
        }
    }

    async fn find_by_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        sqlx::query_as::<_, SubscriptionRow>(SELECT_RECORD)
            .bind(account_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to fetch subscription: {}", e)))?
            .map(SubscriptionRecord::try_from)
            .transpose()
    }

    async fn resolve_customer(
        &self,
        provider: Provider,
        provider_customer_id: &ProviderCustomerId,
    ) -> Result<Option<AccountId>, DomainError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| DomainError::database(format!("Failed to acquire connection: {}", e)))?;

        find_mapping(&mut conn, provider, provider_customer_id)
            .await?
            .map(AccountId::new)
            .transpose()
            .map_err(DomainError::from)
    }

    async fn link_customer(
        &self,
        provider: Provider,
        provider_customer_id: &ProviderCustomerId,
        account_id: &AccountId,
    ) -> Result<(), DomainError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| DomainError::database(format!("Failed to acquire connection: {}", e)))?;

        let mapped = insert_mapping(&mut conn, provider, provider_customer_id, account_id).await?;
        if mapped != account_id.as_str() {
            return Err(DomainError::new(
                ErrorCode::CustomerMappingConflict,
                format!(
                    "{} customer {} already mapped to account {}",
                    provider, provider_customer_id, mapped
                ),
            ));
        }
        Ok(())
    }

    async fn customer_ids(
        &self,
        provider: Provider,
    ) -> Result<Vec<ProviderCustomerId>, DomainError> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT provider_customer_id FROM provider_customers WHERE provider = $1 ORDER BY provider_customer_id",
        )
        .bind(provider.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list customer mappings: {}", e)))?;

        ids.into_iter()
            .map(|id| ProviderCustomerId::new(id).map_err(DomainError::from))
            .collect()
    }
}
