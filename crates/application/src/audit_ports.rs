use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lendgate_core::{ActorIdentity, AppResult, UserId};
use lendgate_domain::{AuditAction, AuditEntityType, AuditEntryId};
use serde_json::Value;

/// Hard ceiling on audit rows returned by one query page.
pub const AUDIT_MAX_PAGE_SIZE: usize = 200;

/// Rows fetched per round trip while exporting.
pub const AUDIT_EXPORT_BATCH_SIZE: usize = 500;

/// Canonical audit event emitted by application use-cases.
///
/// Every mutating repository method receives one of these and appends it in
/// the same transaction as the mutation it describes.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    /// Identifier assigned before persistence.
    pub audit_id: AuditEntryId,
    /// Stable action identifier.
    pub action: AuditAction,
    /// Entity family targeted by the action.
    pub entity_type: AuditEntityType,
    /// Entity identifier.
    pub entity_id: String,
    /// User that performed the action.
    pub actor_user_id: UserId,
    /// User affected by the action, when different from the entity.
    pub target_user_id: Option<UserId>,
    /// Optional human-supplied reason.
    pub reason: Option<String>,
    /// Caller IP captured at the edge.
    pub ip_address: Option<String>,
    /// Structured action details.
    pub metadata: Value,
}

impl AuditEvent {
    /// Creates an event for `actor` with empty metadata.
    #[must_use]
    pub fn new(
        actor: &ActorIdentity,
        action: AuditAction,
        entity_type: AuditEntityType,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            audit_id: AuditEntryId::new(),
            action,
            entity_type,
            entity_id: entity_id.into(),
            actor_user_id: actor.user_id(),
            target_user_id: None,
            reason: None,
            ip_address: actor.ip_address().map(str::to_owned),
            metadata: Value::Object(serde_json::Map::new()),
        }
    }

    /// Sets the affected user.
    #[must_use]
    pub fn with_target(mut self, target_user_id: UserId) -> Self {
        self.target_user_id = Some(target_user_id);
        self
    }

    /// Sets the reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Sets the structured details.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Persisted audit entry.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditLogEntry {
    /// Stable entry identifier.
    pub audit_id: AuditEntryId,
    /// Commit timestamp.
    pub occurred_at: DateTime<Utc>,
    /// Stable action identifier.
    pub action_type: String,
    /// Entity family.
    pub entity_type: String,
    /// Entity identifier.
    pub entity_id: String,
    /// Acting user.
    pub actor_user_id: UserId,
    /// Affected user.
    pub target_user_id: Option<UserId>,
    /// Optional reason.
    pub reason: Option<String>,
    /// Caller IP.
    pub ip_address: Option<String>,
    /// Structured details.
    pub metadata: Value,
}

/// Filters shared by audit queries and exports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditLogFilter {
    /// Exact action filter.
    pub action_type: Option<String>,
    /// Exact entity family filter.
    pub entity_type: Option<String>,
    /// Acting user filter.
    pub actor_user_id: Option<UserId>,
    /// Affected user filter.
    pub target_user_id: Option<UserId>,
    /// Inclusive lower bound.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound.
    pub to: Option<DateTime<Utc>>,
    /// Case-insensitive substring matched against reason and metadata.
    pub free_text: Option<String>,
}

/// Query parameters for audit log listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLogQuery {
    /// Row filters.
    pub filter: AuditLogFilter,
    /// Maximum rows returned.
    pub limit: usize,
    /// Number of rows skipped for offset pagination.
    pub offset: usize,
}

/// One page of audit entries, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditLogPage {
    /// Entries in this page.
    pub entries: Vec<AuditLogEntry>,
    /// Total rows matching the filter.
    pub total: u64,
}

/// Keyset position of the last exported row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditExportCursor {
    /// Timestamp of the last row.
    pub occurred_at: DateTime<Utc>,
    /// Identifier of the last row.
    pub audit_id: AuditEntryId,
}

impl From<&AuditLogEntry> for AuditExportCursor {
    fn from(value: &AuditLogEntry) -> Self {
        Self {
            occurred_at: value.occurred_at,
            audit_id: value.audit_id,
        }
    }
}

/// Repository port for reading the audit trail.
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Lists one page of matching entries, newest first, with the total match count.
    async fn query_entries(&self, query: AuditLogQuery) -> AppResult<AuditLogPage>;

    /// Lists up to `limit` matching entries strictly older than `after`, newest first.
    async fn export_batch(
        &self,
        filter: &AuditLogFilter,
        after: Option<AuditExportCursor>,
        limit: usize,
    ) -> AppResult<Vec<AuditLogEntry>>;
}
