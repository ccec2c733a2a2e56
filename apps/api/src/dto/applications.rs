use chrono::{DateTime, Utc};
use lendgate_application::CreateApplicationInput;
use lendgate_core::{AppResult, UserId};
use lendgate_domain::{ApprovalTerms, LoanApplication, TransitionPayload, WorkflowState};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Incoming payload for a new loan application draft.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/create-application-request.ts"
)]
pub struct CreateApplicationRequest {
    /// Minor currency units.
    #[ts(type = "number")]
    pub requested_amount: i64,
    #[serde(default)]
    pub purpose: String,
}

/// Fields a transition may carry; which ones are required depends on the edge.
#[derive(Debug, Default, Deserialize, TS)]
#[serde(default)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/transition-payload-request.ts"
)]
pub struct TransitionPayloadRequest {
    pub account_identifier: Option<String>,
    #[ts(type = "number | null")]
    pub approved_amount: Option<i64>,
    pub term_months: Option<u16>,
    pub interest_rate_bps: Option<u32>,
    pub reason: Option<String>,
}

/// Incoming payload for a workflow transition.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/transition-request.ts"
)]
pub struct TransitionRequest {
    pub to_state: String,
    #[serde(default)]
    pub payload: TransitionPayloadRequest,
}

/// Approval terms recorded on approval.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/approval-terms-response.ts"
)]
pub struct ApprovalTermsResponse {
    #[ts(type = "number")]
    pub approved_amount: i64,
    pub term_months: u16,
    pub interest_rate_bps: u32,
}

/// API representation of a loan application.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/loan-application-response.ts"
)]
pub struct LoanApplicationResponse {
    pub application_id: String,
    pub owner_user_id: String,
    pub team_id: Option<String>,
    pub department_id: Option<String>,
    pub branch_id: Option<String>,
    #[ts(type = "number")]
    pub requested_amount: i64,
    pub purpose: String,
    pub state: String,
    pub account_identifier: Option<String>,
    pub approval: Option<ApprovalTermsResponse>,
    pub rejection_reason: Option<String>,
    pub created_at: String,
    pub submitted_at: Option<String>,
    pub processing_started_at: Option<String>,
    pub processing_started_by: Option<String>,
    pub forwarded_at: Option<String>,
    pub forwarded_by: Option<String>,
    pub decided_at: Option<String>,
    pub decided_by: Option<String>,
    pub is_active: bool,
    #[ts(type = "number")]
    pub version: i64,
}

impl From<CreateApplicationRequest> for CreateApplicationInput {
    fn from(value: CreateApplicationRequest) -> Self {
        Self {
            requested_amount: value.requested_amount,
            purpose: value.purpose,
        }
    }
}

impl From<TransitionPayloadRequest> for TransitionPayload {
    fn from(value: TransitionPayloadRequest) -> Self {
        Self {
            account_identifier: value.account_identifier,
            approved_amount: value.approved_amount,
            term_months: value.term_months,
            interest_rate_bps: value.interest_rate_bps,
            reason: value.reason,
        }
    }
}

impl TransitionRequest {
    pub fn into_parts(self) -> AppResult<(WorkflowState, TransitionPayload)> {
        Ok((self.to_state.parse()?, self.payload.into()))
    }
}

impl From<ApprovalTerms> for ApprovalTermsResponse {
    fn from(value: ApprovalTerms) -> Self {
        Self {
            approved_amount: value.approved_amount,
            term_months: value.term_months,
            interest_rate_bps: value.interest_rate_bps,
        }
    }
}

fn timestamp(value: Option<DateTime<Utc>>) -> Option<String> {
    value.map(|value| value.to_rfc3339())
}

fn user(value: Option<UserId>) -> Option<String> {
    value.map(|value| value.to_string())
}

impl From<LoanApplication> for LoanApplicationResponse {
    fn from(value: LoanApplication) -> Self {
        Self {
            application_id: value.application_id.to_string(),
            owner_user_id: value.owner_user_id.to_string(),
            team_id: value.placement.team_id.map(|id| id.to_string()),
            department_id: value.placement.department_id.map(|id| id.to_string()),
            branch_id: value.placement.branch_id.map(|id| id.to_string()),
            requested_amount: value.requested_amount,
            purpose: value.purpose,
            state: value.state.as_str().to_owned(),
            account_identifier: value.account_identifier,
            approval: value.approval.map(ApprovalTermsResponse::from),
            rejection_reason: value.rejection_reason,
            created_at: value.created_at.to_rfc3339(),
            submitted_at: timestamp(value.submitted_at),
            processing_started_at: timestamp(value.processing_started_at),
            processing_started_by: user(value.processing_started_by),
            forwarded_at: timestamp(value.forwarded_at),
            forwarded_by: user(value.forwarded_by),
            decided_at: timestamp(value.decided_at),
            decided_by: user(value.decided_by),
            is_active: value.is_active,
            version: value.version,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use lendgate_core::{AppError, UserId};
    use lendgate_domain::{ApplicationId, LoanApplication, OrgPlacement, WorkflowState};

    use super::{LoanApplicationResponse, TransitionRequest};

    #[test]
    fn transition_request_parses_state_and_optional_payload() {
        let Ok(request) = serde_json::from_str::<TransitionRequest>(
            r#"{"to_state": "MANAGER_REVIEW", "payload": {"account_identifier": "ACC-9"}}"#,
        ) else {
            panic!("request should deserialize");
        };
        let Ok((state, payload)) = request.into_parts() else {
            panic!("request should convert");
        };
        assert_eq!(state, WorkflowState::ManagerReview);
        assert_eq!(payload.account_identifier.as_deref(), Some("ACC-9"));

        let Ok(bare) = serde_json::from_str::<TransitionRequest>(r#"{"to_state": "LIMBO"}"#)
        else {
            panic!("bare request should deserialize");
        };
        assert!(matches!(bare.into_parts(), Err(AppError::Validation(_))));
    }

    #[test]
    fn draft_response_uses_wire_state_names() {
        let Ok(draft) = LoanApplication::new_draft(
            ApplicationId::new(),
            UserId::new(),
            OrgPlacement::default(),
            10_000,
            "car",
            Utc::now(),
        ) else {
            panic!("valid draft");
        };

        let response = LoanApplicationResponse::from(draft);
        assert_eq!(response.state, "DRAFT");
        assert_eq!(response.version, 0);
        assert!(response.submitted_at.is_none());
    }
}
