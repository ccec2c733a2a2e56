use chrono::{DateTime, Utc};
use lendgate_application::{AuditLogEntry, AuditLogFilter, AuditLogPage};
use lendgate_core::{AppError, AppResult, UserId};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::common::parse_optional_id;

const DEFAULT_PAGE_SIZE: usize = 50;

/// Query string shared by audit listing and export.
#[derive(Debug, Default, Deserialize)]
pub struct AuditLogQueryParams {
    pub action_type: Option<String>,
    pub entity_type: Option<String>,
    pub actor: Option<String>,
    pub target: Option<String>,
    /// Inclusive lower bound, RFC 3339.
    pub from: Option<String>,
    /// Exclusive upper bound, RFC 3339.
    pub to: Option<String>,
    /// Free-text search over reason and metadata.
    pub q: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    /// `csv` or `json`; export only.
    pub format: Option<String>,
}

/// API representation of an audit log entry.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/audit-log-entry-response.ts"
)]
pub struct AuditLogEntryResponse {
    pub id: String,
    pub occurred_at: String,
    pub action_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub actor_user_id: String,
    pub target_user_id: Option<String>,
    pub reason: Option<String>,
    pub ip_address: Option<String>,
    #[ts(type = "unknown")]
    pub metadata: serde_json::Value,
}

/// One page of audit entries.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/audit-log-page-response.ts"
)]
pub struct AuditLogPageResponse {
    pub entries: Vec<AuditLogEntryResponse>,
    #[ts(type = "number")]
    pub total: u64,
    pub page: usize,
    pub page_size: usize,
}

impl AuditLogQueryParams {
    pub fn filter(&self) -> AppResult<AuditLogFilter> {
        Ok(AuditLogFilter {
            action_type: non_blank(self.action_type.as_deref()),
            entity_type: non_blank(self.entity_type.as_deref()),
            actor_user_id: parse_optional_id::<UserId>(self.actor.as_deref())?,
            target_user_id: parse_optional_id::<UserId>(self.target.as_deref())?,
            from: parse_timestamp("from", self.from.as_deref())?,
            to: parse_timestamp("to", self.to.as_deref())?,
            free_text: non_blank(self.q.as_deref()),
        })
    }

    pub fn page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> usize {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

fn parse_timestamp(name: &str, value: Option<&str>) -> AppResult<Option<DateTime<Utc>>> {
    non_blank(value)
        .map(|value| {
            DateTime::parse_from_rfc3339(value.as_str())
                .map(|timestamp| timestamp.with_timezone(&Utc))
                .map_err(|error| {
                    AppError::Validation(format!("invalid '{name}' timestamp '{value}': {error}"))
                })
        })
        .transpose()
}

impl From<AuditLogEntry> for AuditLogEntryResponse {
    fn from(value: AuditLogEntry) -> Self {
        Self {
            id: value.audit_id.to_string(),
            occurred_at: value.occurred_at.to_rfc3339(),
            action_type: value.action_type,
            entity_type: value.entity_type,
            entity_id: value.entity_id,
            actor_user_id: value.actor_user_id.to_string(),
            target_user_id: value.target_user_id.map(|user_id| user_id.to_string()),
            reason: value.reason,
            ip_address: value.ip_address,
            metadata: value.metadata,
        }
    }
}

impl AuditLogPageResponse {
    pub fn new(page: AuditLogPage, page_number: usize, page_size: usize) -> Self {
        Self {
            entries: page
                .entries
                .into_iter()
                .map(AuditLogEntryResponse::from)
                .collect(),
            total: page.total,
            page: page_number,
            page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use lendgate_core::{AppError, UserId};

    use super::AuditLogQueryParams;

    #[test]
    fn filter_parses_actor_range_and_search() {
        let actor = UserId::new();
        let params = AuditLogQueryParams {
            action_type: Some("approved".to_owned()),
            entity_type: Some(" ".to_owned()),
            actor: Some(actor.to_string()),
            from: Some("2026-01-01T00:00:00Z".to_owned()),
            to: Some("2026-02-01T00:00:00+02:00".to_owned()),
            q: Some("  income ".to_owned()),
            ..AuditLogQueryParams::default()
        };

        let Ok(filter) = params.filter() else {
            panic!("filter should parse");
        };
        assert_eq!(filter.action_type.as_deref(), Some("approved"));
        assert_eq!(filter.entity_type, None);
        assert_eq!(filter.actor_user_id, Some(actor));
        assert_eq!(filter.free_text.as_deref(), Some("income"));
        assert!(matches!(filter.to, Some(to) if to.to_rfc3339() == "2026-01-31T22:00:00+00:00"));
    }

    #[test]
    fn malformed_timestamps_are_validation_errors() {
        let params = AuditLogQueryParams {
            from: Some("yesterday".to_owned()),
            ..AuditLogQueryParams::default()
        };
        assert!(matches!(params.filter(), Err(AppError::Validation(_))));
    }

    #[test]
    fn paging_defaults_to_first_page() {
        let params = AuditLogQueryParams {
            page: Some(0),
            ..AuditLogQueryParams::default()
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.page_size(), 50);
    }
}
