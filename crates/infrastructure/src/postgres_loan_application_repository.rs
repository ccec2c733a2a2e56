use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lendgate_application::{AuditEvent, LoanApplicationRepository, TransitionCommit};
use lendgate_core::{AppError, AppResult, UserId};
use lendgate_domain::{
    ApplicationId, ApprovalTerms, BranchId, DepartmentId, LoanApplication, OrgPlacement, TeamId,
    WorkflowState,
};
use sqlx::{FromRow, PgPool};

use crate::postgres_transaction::{append_audit_event, begin, commit, is_unique_violation};

/// PostgreSQL-backed repository for loan applications.
#[derive(Clone)]
pub struct PostgresLoanApplicationRepository {
    pool: PgPool,
}

impl PostgresLoanApplicationRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct LoanApplicationRow {
    id: uuid::Uuid,
    owner_user_id: uuid::Uuid,
    team_id: Option<uuid::Uuid>,
    department_id: Option<uuid::Uuid>,
    branch_id: Option<uuid::Uuid>,
    requested_amount: i64,
    purpose: String,
    state: String,
    account_identifier: Option<String>,
    approved_amount: Option<i64>,
    term_months: Option<i32>,
    interest_rate_bps: Option<i64>,
    rejection_reason: Option<String>,
    created_at: DateTime<Utc>,
    submitted_at: Option<DateTime<Utc>>,
    processing_started_at: Option<DateTime<Utc>>,
    processing_started_by: Option<uuid::Uuid>,
    forwarded_at: Option<DateTime<Utc>>,
    forwarded_by: Option<uuid::Uuid>,
    decided_at: Option<DateTime<Utc>>,
    decided_by: Option<uuid::Uuid>,
    is_active: bool,
    version: i64,
}

impl TryFrom<LoanApplicationRow> for LoanApplication {
    type Error = AppError;

    fn try_from(row: LoanApplicationRow) -> Result<Self, Self::Error> {
        let state = WorkflowState::from_str(&row.state).map_err(|error| {
            AppError::Internal(format!("failed to decode stored workflow state: {error}"))
        })?;
        let approval = match (row.approved_amount, row.term_months, row.interest_rate_bps) {
            (Some(approved_amount), Some(term_months), Some(interest_rate_bps)) => {
                Some(ApprovalTerms {
                    approved_amount,
                    term_months: u16::try_from(term_months).map_err(|error| {
                        AppError::Internal(format!("failed to decode stored term: {error}"))
                    })?,
                    interest_rate_bps: u32::try_from(interest_rate_bps).map_err(|error| {
                        AppError::Internal(format!("failed to decode stored rate: {error}"))
                    })?,
                })
            }
            _ => None,
        };

        Ok(Self {
            application_id: ApplicationId::from_uuid(row.id),
            owner_user_id: UserId::from_uuid(row.owner_user_id),
            placement: OrgPlacement {
                team_id: row.team_id.map(TeamId::from_uuid),
                department_id: row.department_id.map(DepartmentId::from_uuid),
                branch_id: row.branch_id.map(BranchId::from_uuid),
            },
            requested_amount: row.requested_amount,
            purpose: row.purpose,
            state,
            account_identifier: row.account_identifier,
            approval,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
            submitted_at: row.submitted_at,
            processing_started_at: row.processing_started_at,
            processing_started_by: row.processing_started_by.map(UserId::from_uuid),
            forwarded_at: row.forwarded_at,
            forwarded_by: row.forwarded_by.map(UserId::from_uuid),
            decided_at: row.decided_at,
            decided_by: row.decided_by.map(UserId::from_uuid),
            is_active: row.is_active,
            version: row.version,
        })
    }
}

fn duplicate_identifier(application: &LoanApplication) -> AppError {
    AppError::DuplicateAccountIdentifier(
        application
            .account_identifier
            .clone()
            .unwrap_or_default(),
    )
}

#[async_trait]
impl LoanApplicationRepository for PostgresLoanApplicationRepository {
    async fn insert_application(
        &self,
        application: &LoanApplication,
        audit: AuditEvent,
    ) -> AppResult<()> {
        let mut transaction = begin(&self.pool).await?;

        sqlx::query(
            r#"
            INSERT INTO loan_applications (
                id,
                owner_user_id,
                team_id,
                department_id,
                branch_id,
                requested_amount,
                purpose,
                state,
                created_at,
                is_active,
                version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(application.application_id.as_uuid())
        .bind(application.owner_user_id.as_uuid())
        .bind(application.placement.team_id.map(|team_id| team_id.as_uuid()))
        .bind(
            application
                .placement
                .department_id
                .map(|department_id| department_id.as_uuid()),
        )
        .bind(application.placement.branch_id.map(|branch_id| branch_id.as_uuid()))
        .bind(application.requested_amount)
        .bind(application.purpose.as_str())
        .bind(application.state.as_str())
        .bind(application.created_at)
        .bind(application.is_active)
        .bind(application.version)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            if is_unique_violation(&error) {
                return AppError::Conflict(format!(
                    "application '{}' already exists",
                    application.application_id
                ));
            }

            AppError::Internal(format!("failed to insert application: {error}"))
        })?;

        append_audit_event(&mut transaction, &audit).await?;
        commit(transaction).await
    }

    async fn find_application(
        &self,
        application_id: ApplicationId,
    ) -> AppResult<Option<LoanApplication>> {
        sqlx::query_as::<_, LoanApplicationRow>(
            r#"
            SELECT
                id,
                owner_user_id,
                team_id,
                department_id,
                branch_id,
                requested_amount,
                purpose,
                state,
                account_identifier,
                approved_amount,
                term_months,
                interest_rate_bps,
                rejection_reason,
                created_at,
                submitted_at,
                processing_started_at,
                processing_started_by,
                forwarded_at,
                forwarded_by,
                decided_at,
                decided_by,
                is_active,
                version
            FROM loan_applications
            WHERE id = $1
            "#,
        )
        .bind(application_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to find application '{application_id}': {error}"
            ))
        })?
        .map(LoanApplication::try_from)
        .transpose()
    }

    async fn account_identifier_in_use(
        &self,
        account_identifier: &str,
        excluding: ApplicationId,
    ) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM loan_applications
                WHERE account_identifier = $1
                    AND id <> $2
                    AND is_active
            )
            "#,
        )
        .bind(account_identifier)
        .bind(excluding.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to check account identifier: {error}"))
        })
    }

    async fn commit_transition(&self, commit_input: TransitionCommit) -> AppResult<()> {
        let TransitionCommit {
            application,
            expected_version,
            audit,
        } = commit_input;
        let approval = application.approval;
        let term_months = approval.map(|terms| i32::from(terms.term_months));
        let interest_rate_bps = approval.map(|terms| i64::from(terms.interest_rate_bps));

        let mut transaction = begin(&self.pool).await?;

        let updated = sqlx::query(
            r#"
            UPDATE loan_applications
            SET state = $3,
                account_identifier = $4,
                approved_amount = $5,
                term_months = $6,
                interest_rate_bps = $7,
                rejection_reason = $8,
                submitted_at = $9,
                processing_started_at = $10,
                processing_started_by = $11,
                forwarded_at = $12,
                forwarded_by = $13,
                decided_at = $14,
                decided_by = $15,
                is_active = $16,
                version = $17
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(application.application_id.as_uuid())
        .bind(expected_version)
        .bind(application.state.as_str())
        .bind(application.account_identifier.as_deref())
        .bind(approval.map(|terms| terms.approved_amount))
        .bind(term_months)
        .bind(interest_rate_bps)
        .bind(application.rejection_reason.as_deref())
        .bind(application.submitted_at)
        .bind(application.processing_started_at)
        .bind(application.processing_started_by.map(|user_id| user_id.as_uuid()))
        .bind(application.forwarded_at)
        .bind(application.forwarded_by.map(|user_id| user_id.as_uuid()))
        .bind(application.decided_at)
        .bind(application.decided_by.map(|user_id| user_id.as_uuid()))
        .bind(application.is_active)
        .bind(application.version)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            if is_unique_violation(&error) {
                return duplicate_identifier(&application);
            }

            AppError::Internal(format!(
                "failed to transition application '{}': {error}",
                application.application_id
            ))
        })?;

        if updated.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "application '{}' changed since version {expected_version}",
                application.application_id
            )));
        }

        append_audit_event(&mut transaction, &audit).await?;
        commit(transaction).await
    }
}
