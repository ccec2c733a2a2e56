use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgArguments;
use sqlx::query::QueryAs;
use sqlx::{FromRow, PgPool, Postgres};

use lendgate_application::{
    AUDIT_MAX_PAGE_SIZE, AuditExportCursor, AuditLogEntry, AuditLogFilter, AuditLogPage,
    AuditLogQuery, AuditLogRepository,
};
use lendgate_core::{AppError, AppResult, UserId};
use lendgate_domain::AuditEntryId;

/// PostgreSQL-backed repository for audit log read models.
#[derive(Clone)]
pub struct PostgresAuditLogRepository {
    pool: PgPool,
}

impl PostgresAuditLogRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AuditLogRow {
    id: uuid::Uuid,
    occurred_at: DateTime<Utc>,
    action_type: String,
    entity_type: String,
    entity_id: String,
    actor_user_id: uuid::Uuid,
    target_user_id: Option<uuid::Uuid>,
    reason: Option<String>,
    ip_address: Option<String>,
    metadata: serde_json::Value,
}

impl From<AuditLogRow> for AuditLogEntry {
    fn from(row: AuditLogRow) -> Self {
        Self {
            audit_id: AuditEntryId::from_uuid(row.id),
            occurred_at: row.occurred_at,
            action_type: row.action_type,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            actor_user_id: UserId::from_uuid(row.actor_user_id),
            target_user_id: row.target_user_id.map(UserId::from_uuid),
            reason: row.reason,
            ip_address: row.ip_address,
            metadata: row.metadata,
        }
    }
}

const ENTRY_COLUMNS: &str = r#"
    SELECT
        id,
        occurred_at,
        action_type,
        entity_type,
        entity_id,
        actor_user_id,
        target_user_id,
        reason,
        ip_address,
        metadata
    FROM audit_log_entries
"#;

// Binds $1..$7 in `bind_filter` order.
const FILTER_CLAUSE: &str = r#"
    WHERE ($1::TEXT IS NULL OR action_type = $1)
        AND ($2::TEXT IS NULL OR entity_type = $2)
        AND ($3::UUID IS NULL OR actor_user_id = $3)
        AND ($4::UUID IS NULL OR target_user_id = $4)
        AND ($5::TIMESTAMPTZ IS NULL OR occurred_at >= $5)
        AND ($6::TIMESTAMPTZ IS NULL OR occurred_at < $6)
        AND (
            $7::TEXT IS NULL
            OR reason ILIKE $7 ESCAPE '\'
            OR metadata::TEXT ILIKE $7 ESCAPE '\'
        )
"#;

fn bind_filter<'q, O>(
    query: QueryAs<'q, Postgres, O, PgArguments>,
    filter: &AuditLogFilter,
) -> QueryAs<'q, Postgres, O, PgArguments> {
    query
        .bind(filter.action_type.clone())
        .bind(filter.entity_type.clone())
        .bind(filter.actor_user_id.map(|user_id| user_id.as_uuid()))
        .bind(filter.target_user_id.map(|user_id| user_id.as_uuid()))
        .bind(filter.from)
        .bind(filter.to)
        .bind(free_text_pattern(filter.free_text.as_deref()))
}

/// Builds a substring ILIKE pattern with wildcard characters escaped.
fn free_text_pattern(free_text: Option<&str>) -> Option<String> {
    let trimmed = free_text.map(str::trim).filter(|value| !value.is_empty())?;
    let mut pattern = String::with_capacity(trimmed.len() + 2);
    pattern.push('%');
    for character in trimmed.chars() {
        if matches!(character, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(character);
    }
    pattern.push('%');
    Some(pattern)
}

fn to_sql_count(value: usize) -> AppResult<i64> {
    i64::try_from(value)
        .map_err(|error| AppError::Validation(format!("pagination value is out of range: {error}")))
}

#[async_trait]
impl AuditLogRepository for PostgresAuditLogRepository {
    async fn query_entries(&self, query: AuditLogQuery) -> AppResult<AuditLogPage> {
        let limit = to_sql_count(query.limit.clamp(1, AUDIT_MAX_PAGE_SIZE))?;
        let offset = to_sql_count(query.offset)?;

        let total = bind_filter(
            sqlx::query_as::<_, (i64,)>(&format!(
                "SELECT COUNT(*) FROM audit_log_entries {FILTER_CLAUSE}"
            )),
            &query.filter,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to count audit log entries: {error}")))?
        .0;

        let rows = bind_filter(
            sqlx::query_as::<_, AuditLogRow>(&format!(
                "{ENTRY_COLUMNS} {FILTER_CLAUSE} ORDER BY occurred_at DESC, id DESC LIMIT $8 OFFSET $9"
            )),
            &query.filter,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list audit log entries: {error}")))?;

        Ok(AuditLogPage {
            entries: rows.into_iter().map(AuditLogEntry::from).collect(),
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    async fn export_batch(
        &self,
        filter: &AuditLogFilter,
        after: Option<AuditExportCursor>,
        limit: usize,
    ) -> AppResult<Vec<AuditLogEntry>> {
        let limit = to_sql_count(limit.max(1))?;

        let rows = bind_filter(
            sqlx::query_as::<_, AuditLogRow>(&format!(
                r#"{ENTRY_COLUMNS} {FILTER_CLAUSE}
                AND ($8::TIMESTAMPTZ IS NULL OR (occurred_at, id) < ($8, $9::UUID))
                ORDER BY occurred_at DESC, id DESC
                LIMIT $10"#
            )),
            filter,
        )
        .bind(after.map(|cursor| cursor.occurred_at))
        .bind(after.map(|cursor| cursor.audit_id.as_uuid()))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to export audit log entries: {error}"))
        })?;

        Ok(rows.into_iter().map(AuditLogEntry::from).collect())
    }
}
