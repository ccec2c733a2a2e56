//! Transaction helpers shared by PostgreSQL adapters.

use lendgate_application::AuditEvent;
use lendgate_core::{AppError, AppResult};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

pub(crate) async fn begin(pool: &PgPool) -> AppResult<Transaction<'static, Postgres>> {
    pool.begin()
        .await
        .map_err(|error| AppError::Internal(format!("failed to begin transaction: {error}")))
}

pub(crate) async fn commit(transaction: Transaction<'static, Postgres>) -> AppResult<()> {
    transaction
        .commit()
        .await
        .map_err(|error| AppError::Internal(format!("failed to commit transaction: {error}")))
}

/// Appends one audit entry on the caller's connection.
///
/// Callers run this inside the transaction of the mutation it describes, so a
/// failed append rolls the mutation back.
pub(crate) async fn append_audit_event(
    connection: &mut PgConnection,
    event: &AuditEvent,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_log_entries (
            id,
            action_type,
            entity_type,
            entity_id,
            actor_user_id,
            target_user_id,
            reason,
            ip_address,
            metadata
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(event.audit_id.as_uuid())
    .bind(event.action.as_str())
    .bind(event.entity_type.as_str())
    .bind(event.entity_id.as_str())
    .bind(event.actor_user_id.as_uuid())
    .bind(event.target_user_id.map(|user_id| user_id.as_uuid()))
    .bind(event.reason.as_deref())
    .bind(event.ip_address.as_deref())
    .bind(&event.metadata)
    .execute(connection)
    .await
    .map_err(|error| AppError::Internal(format!("failed to append audit event: {error}")))?;

    Ok(())
}

/// Returns whether the error is a PostgreSQL unique violation.
pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Database(database_error) if database_error.code().as_deref() == Some("23505")
    )
}
