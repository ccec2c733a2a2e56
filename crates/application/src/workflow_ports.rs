use async_trait::async_trait;
use lendgate_core::AppResult;
use lendgate_domain::{ApplicationId, LoanApplication};

use crate::AuditEvent;

/// State change produced by one validated transition.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionCommit {
    /// Application after the transition.
    pub application: LoanApplication,
    /// Version read before the transition; the write fails when it changed.
    pub expected_version: i64,
    /// Transition audit record.
    pub audit: AuditEvent,
}

/// Repository port for loan applications.
#[async_trait]
pub trait LoanApplicationRepository: Send + Sync {
    /// Inserts a new application.
    async fn insert_application(
        &self,
        application: &LoanApplication,
        audit: AuditEvent,
    ) -> AppResult<()>;

    /// Finds one application.
    async fn find_application(
        &self,
        application_id: ApplicationId,
    ) -> AppResult<Option<LoanApplication>>;

    /// Returns whether another active application already holds the identifier.
    async fn account_identifier_in_use(
        &self,
        account_identifier: &str,
        excluding: ApplicationId,
    ) -> AppResult<bool>;

    /// Writes the transitioned application and its audit record atomically.
    ///
    /// Fails with `Conflict` when the stored version differs from
    /// `expected_version`, and with `DuplicateAccountIdentifier` when the
    /// identifier was taken concurrently.
    async fn commit_transition(&self, commit: TransitionCommit) -> AppResult<()>;
}
