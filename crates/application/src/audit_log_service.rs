use std::str::FromStr;
use std::sync::Arc;

use futures_util::StreamExt;
use futures_util::stream::{self, BoxStream};
use lendgate_core::{ActorIdentity, AppError, AppResult};
use lendgate_domain::permission::{action, resource_type};
use serde::Serialize;

use crate::AuthorizationService;
use crate::audit_ports::{
    AUDIT_EXPORT_BATCH_SIZE, AUDIT_MAX_PAGE_SIZE, AuditExportCursor, AuditLogEntry,
    AuditLogFilter, AuditLogPage, AuditLogQuery, AuditLogRepository,
};

/// Chunked body of an audit export.
pub type AuditExportStream = BoxStream<'static, AppResult<Vec<u8>>>;

const CSV_COLUMNS: [&str; 10] = [
    "id",
    "occurred_at",
    "action_type",
    "entity_type",
    "entity_id",
    "actor_user_id",
    "target_user_id",
    "reason",
    "ip_address",
    "metadata",
];

/// Serialization format of an audit export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditExportFormat {
    /// Comma-separated rows with a header line.
    Csv,
    /// One JSON array of entry objects.
    Json,
}

impl AuditExportFormat {
    /// Returns the HTTP content type of the format.
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Json => "application/json",
        }
    }

    /// Returns the file extension of the format.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl FromStr for AuditExportFormat {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(AppError::Validation(format!(
                "unknown audit export format '{other}'"
            ))),
        }
    }
}

/// Read side of the audit trail.
#[derive(Clone)]
pub struct AuditLogService {
    authorization_service: AuthorizationService,
    repository: Arc<dyn AuditLogRepository>,
}

impl AuditLogService {
    /// Creates an audit log service.
    #[must_use]
    pub fn new(
        authorization_service: AuthorizationService,
        repository: Arc<dyn AuditLogRepository>,
    ) -> Self {
        Self {
            authorization_service,
            repository,
        }
    }

    /// Returns one page of matching entries, newest first.
    ///
    /// `page` is 1-based; `page_size` is clamped to `1..=AUDIT_MAX_PAGE_SIZE`.
    pub async fn query(
        &self,
        actor: &ActorIdentity,
        filter: AuditLogFilter,
        page: usize,
        page_size: usize,
    ) -> AppResult<AuditLogPage> {
        self.authorization_service
            .require_global(actor, resource_type::AUDIT, action::READ)
            .await?;
        validate_range(&filter)?;

        let limit = page_size.clamp(1, AUDIT_MAX_PAGE_SIZE);
        let offset = page.max(1).saturating_sub(1).saturating_mul(limit);

        self.repository
            .query_entries(AuditLogQuery {
                filter,
                limit,
                offset,
            })
            .await
    }

    /// Streams every matching entry, newest first, in batches.
    ///
    /// Authorization runs before the first chunk; a failing batch ends the
    /// stream with its error.
    pub async fn export(
        &self,
        actor: &ActorIdentity,
        filter: AuditLogFilter,
        format: AuditExportFormat,
    ) -> AppResult<AuditExportStream> {
        self.authorization_service
            .require_global(actor, resource_type::AUDIT, action::READ)
            .await?;
        validate_range(&filter)?;

        let state = ExportState {
            repository: self.repository.clone(),
            filter,
            format,
            cursor: None,
            phase: ExportPhase::Header,
            rows_written: 0,
        };

        Ok(stream::unfold(state, next_chunk).boxed())
    }
}

fn validate_range(filter: &AuditLogFilter) -> AppResult<()> {
    match (filter.from, filter.to) {
        (Some(from), Some(to)) if from >= to => Err(AppError::Validation(
            "audit range 'from' must be earlier than 'to'".to_owned(),
        )),
        _ => Ok(()),
    }
}

enum ExportPhase {
    Header,
    Rows,
    Footer,
    Done,
}

struct ExportState {
    repository: Arc<dyn AuditLogRepository>,
    filter: AuditLogFilter,
    format: AuditExportFormat,
    cursor: Option<AuditExportCursor>,
    phase: ExportPhase,
    rows_written: usize,
}

async fn next_chunk(mut state: ExportState) -> Option<(AppResult<Vec<u8>>, ExportState)> {
    match state.phase {
        ExportPhase::Header => {
            state.phase = ExportPhase::Rows;
            let header = match state.format {
                AuditExportFormat::Csv => encode_csv_header(),
                AuditExportFormat::Json => Ok(b"[".to_vec()),
            };
            Some((header, state))
        }
        ExportPhase::Rows => {
            let batch = match state
                .repository
                .export_batch(&state.filter, state.cursor, AUDIT_EXPORT_BATCH_SIZE)
                .await
            {
                Ok(batch) => batch,
                Err(error) => {
                    state.phase = ExportPhase::Done;
                    return Some((Err(error), state));
                }
            };

            if batch.is_empty() {
                return finish(state);
            }
            if batch.len() < AUDIT_EXPORT_BATCH_SIZE {
                state.phase = ExportPhase::Footer;
            }

            state.cursor = batch.last().map(AuditExportCursor::from);
            let chunk = match state.format {
                AuditExportFormat::Csv => encode_csv_rows(&batch),
                AuditExportFormat::Json => encode_json_rows(&batch, state.rows_written),
            };
            state.rows_written += batch.len();
            Some((chunk, state))
        }
        ExportPhase::Footer => finish(state),
        ExportPhase::Done => None,
    }
}

fn finish(mut state: ExportState) -> Option<(AppResult<Vec<u8>>, ExportState)> {
    state.phase = ExportPhase::Done;
    match state.format {
        AuditExportFormat::Csv => None,
        AuditExportFormat::Json => Some((Ok(b"]".to_vec()), state)),
    }
}

#[derive(Serialize)]
struct ExportRow<'a> {
    id: String,
    occurred_at: String,
    action_type: &'a str,
    entity_type: &'a str,
    entity_id: &'a str,
    actor_user_id: String,
    target_user_id: Option<String>,
    reason: Option<&'a str>,
    ip_address: Option<&'a str>,
    metadata: &'a serde_json::Value,
}

impl<'a> From<&'a AuditLogEntry> for ExportRow<'a> {
    fn from(entry: &'a AuditLogEntry) -> Self {
        Self {
            id: entry.audit_id.to_string(),
            occurred_at: entry.occurred_at.to_rfc3339(),
            action_type: &entry.action_type,
            entity_type: &entry.entity_type,
            entity_id: &entry.entity_id,
            actor_user_id: entry.actor_user_id.to_string(),
            target_user_id: entry.target_user_id.map(|value| value.to_string()),
            reason: entry.reason.as_deref(),
            ip_address: entry.ip_address.as_deref(),
            metadata: &entry.metadata,
        }
    }
}

fn csv_writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new())
}

fn finish_csv(writer: csv::Writer<Vec<u8>>) -> AppResult<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|error| AppError::Internal(format!("failed to flush audit csv: {error}")))
}

fn encode_csv_header() -> AppResult<Vec<u8>> {
    let mut writer = csv_writer();
    writer
        .write_record(CSV_COLUMNS)
        .map_err(|error| AppError::Internal(format!("failed to write audit csv header: {error}")))?;
    finish_csv(writer)
}

fn encode_csv_rows(entries: &[AuditLogEntry]) -> AppResult<Vec<u8>> {
    let mut writer = csv_writer();
    for entry in entries {
        let row = ExportRow::from(entry);
        let metadata = row.metadata.to_string();
        writer
            .write_record([
                row.id.as_str(),
                row.occurred_at.as_str(),
                row.action_type,
                row.entity_type,
                row.entity_id,
                row.actor_user_id.as_str(),
                row.target_user_id.as_deref().unwrap_or(""),
                row.reason.unwrap_or(""),
                row.ip_address.unwrap_or(""),
                metadata.as_str(),
            ])
            .map_err(|error| {
                AppError::Internal(format!("failed to write audit csv row: {error}"))
            })?;
    }
    finish_csv(writer)
}

fn encode_json_rows(entries: &[AuditLogEntry], rows_written: usize) -> AppResult<Vec<u8>> {
    let mut chunk = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        if rows_written + index > 0 {
            chunk.push(b',');
        }
        serde_json::to_writer(&mut chunk, &ExportRow::from(entry)).map_err(|error| {
            AppError::Internal(format!("failed to encode audit entry: {error}"))
        })?;
    }
    Ok(chunk)
}
