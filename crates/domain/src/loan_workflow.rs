use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use lendgate_core::{AppError, AppResult, UserId};
use serde::{Deserialize, Serialize};

use crate::permission::{action, resource_type};
use crate::{ApplicationId, AuditAction, OrgPlacement, ScopeContext};

/// Lifecycle state of a loan application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowState {
    /// Being filled in by the applicant.
    Draft,
    /// Submitted by the applicant, waiting for a teller.
    UserCompleted,
    /// Picked up by a teller.
    TellerProcessing,
    /// Waiting for a manager decision.
    ManagerReview,
    /// Approved; terminal.
    Approved,
    /// Rejected; terminal.
    Rejected,
}

impl WorkflowState {
    /// Returns every state in lifecycle order.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[WorkflowState] = &[
            WorkflowState::Draft,
            WorkflowState::UserCompleted,
            WorkflowState::TellerProcessing,
            WorkflowState::ManagerReview,
            WorkflowState::Approved,
            WorkflowState::Rejected,
        ];

        ALL
    }

    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::UserCompleted => "USER_COMPLETED",
            Self::TellerProcessing => "TELLER_PROCESSING",
            Self::ManagerReview => "MANAGER_REVIEW",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Returns whether no transition leaves this state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl Display for WorkflowState {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for WorkflowState {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(Self::Draft),
            "USER_COMPLETED" => Ok(Self::UserCompleted),
            "TELLER_PROCESSING" => Ok(Self::TellerProcessing),
            "MANAGER_REVIEW" => Ok(Self::ManagerReview),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(AppError::Validation(format!(
                "unknown workflow state '{value}'"
            ))),
        }
    }
}

/// Capability an actor must hold to perform a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredCapability {
    /// Actor must own the application.
    Owner,
    /// Actor must be authorized for the permission at the application's scope.
    Permission {
        /// Required resource type.
        resource_type: &'static str,
        /// Required action.
        action: &'static str,
    },
}

/// Transition payload field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadField {
    /// Core banking account identifier.
    AccountIdentifier,
    /// Approved principal in minor currency units.
    ApprovedAmount,
    /// Approved term in months.
    TermMonths,
    /// Approved interest rate in basis points.
    InterestRateBps,
    /// Rejection reason.
    Reason,
}

impl PayloadField {
    /// Returns the transport field name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccountIdentifier => "account_identifier",
            Self::ApprovedAmount => "approved_amount",
            Self::TermMonths => "term_months",
            Self::InterestRateBps => "interest_rate_bps",
            Self::Reason => "reason",
        }
    }
}

/// One legal edge of the workflow state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    /// Source state.
    pub from: WorkflowState,
    /// Target state.
    pub to: WorkflowState,
    /// Capability the actor must hold.
    pub capability: RequiredCapability,
    /// Payload fields that must be present, checked in order.
    pub required_payload: &'static [PayloadField],
    /// Audit action recorded for the transition.
    pub audit_action: AuditAction,
}

/// Closed transition table; no other transition exists.
pub const TRANSITION_TABLE: &[TransitionRule] = &[
    TransitionRule {
        from: WorkflowState::Draft,
        to: WorkflowState::UserCompleted,
        capability: RequiredCapability::Owner,
        required_payload: &[],
        audit_action: AuditAction::Submitted,
    },
    TransitionRule {
        from: WorkflowState::UserCompleted,
        to: WorkflowState::TellerProcessing,
        capability: RequiredCapability::Permission {
            resource_type: resource_type::APPLICATION,
            action: action::PROCESS,
        },
        required_payload: &[],
        audit_action: AuditAction::ProcessingStarted,
    },
    TransitionRule {
        from: WorkflowState::TellerProcessing,
        to: WorkflowState::ManagerReview,
        capability: RequiredCapability::Permission {
            resource_type: resource_type::APPLICATION,
            action: action::PROCESS,
        },
        required_payload: &[PayloadField::AccountIdentifier],
        audit_action: AuditAction::ForwardedForReview,
    },
    TransitionRule {
        from: WorkflowState::ManagerReview,
        to: WorkflowState::Approved,
        capability: RequiredCapability::Permission {
            resource_type: resource_type::APPLICATION,
            action: action::APPROVE,
        },
        required_payload: &[
            PayloadField::ApprovedAmount,
            PayloadField::TermMonths,
            PayloadField::InterestRateBps,
        ],
        audit_action: AuditAction::Approved,
    },
    TransitionRule {
        from: WorkflowState::ManagerReview,
        to: WorkflowState::Rejected,
        capability: RequiredCapability::Permission {
            resource_type: resource_type::APPLICATION,
            action: action::REJECT,
        },
        required_payload: &[PayloadField::Reason],
        audit_action: AuditAction::Rejected,
    },
];

/// Looks up the table entry for `(from, to)`.
pub fn find_transition(from: WorkflowState, to: WorkflowState) -> AppResult<&'static TransitionRule> {
    TRANSITION_TABLE
        .iter()
        .find(|rule| rule.from == from && rule.to == to)
        .ok_or_else(|| {
            AppError::InvalidTransition(format!(
                "no transition from '{}' to '{}'",
                from.as_str(),
                to.as_str()
            ))
        })
}

/// Transition-specific input supplied by the actor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionPayload {
    /// Account identifier recorded when forwarding for review.
    pub account_identifier: Option<String>,
    /// Approved principal in minor currency units.
    pub approved_amount: Option<i64>,
    /// Approved term in months.
    pub term_months: Option<u16>,
    /// Approved interest rate in basis points.
    pub interest_rate_bps: Option<u32>,
    /// Rejection reason.
    pub reason: Option<String>,
}

impl TransitionPayload {
    /// Fails with `MissingPayload` naming the first absent required field.
    pub fn ensure_complete(&self, required: &[PayloadField]) -> AppResult<()> {
        match required.iter().find(|field| !self.has(**field)) {
            Some(field) => Err(AppError::MissingPayload(field.as_str().to_owned())),
            None => Ok(()),
        }
    }

    /// Returns the trimmed account identifier, when present.
    #[must_use]
    pub fn account_identifier(&self) -> Option<&str> {
        non_blank(self.account_identifier.as_deref())
    }

    /// Returns the trimmed rejection reason, when present.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        non_blank(self.reason.as_deref())
    }

    fn has(&self, field: PayloadField) -> bool {
        match field {
            PayloadField::AccountIdentifier => self.account_identifier().is_some(),
            PayloadField::ApprovedAmount => self.approved_amount.is_some(),
            PayloadField::TermMonths => self.term_months.is_some(),
            PayloadField::InterestRateBps => self.interest_rate_bps.is_some(),
            PayloadField::Reason => self.reason().is_some(),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Terms recorded on approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalTerms {
    /// Approved principal in minor currency units.
    pub approved_amount: i64,
    /// Term in months.
    pub term_months: u16,
    /// Interest rate in basis points.
    pub interest_rate_bps: u32,
}

impl ApprovalTerms {
    /// Validates approval terms.
    pub fn new(approved_amount: i64, term_months: u16, interest_rate_bps: u32) -> AppResult<Self> {
        if approved_amount <= 0 {
            return Err(AppError::Validation(
                "approved_amount must be positive".to_owned(),
            ));
        }
        if term_months == 0 {
            return Err(AppError::Validation(
                "term_months must be positive".to_owned(),
            ));
        }

        Ok(Self {
            approved_amount,
            term_months,
            interest_rate_bps,
        })
    }
}

/// Loan application entity gated by the workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanApplication {
    /// Stable identifier.
    pub application_id: ApplicationId,
    /// Applicant.
    pub owner_user_id: UserId,
    /// Organizational coordinates used for scope checks.
    pub placement: OrgPlacement,
    /// Requested principal in minor currency units.
    pub requested_amount: i64,
    /// Free-text loan purpose.
    pub purpose: String,
    /// Current lifecycle state.
    pub state: WorkflowState,
    /// Account identifier recorded by the teller.
    pub account_identifier: Option<String>,
    /// Approval terms, set on approval.
    pub approval: Option<ApprovalTerms>,
    /// Rejection reason, set on rejection.
    pub rejection_reason: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time the applicant completed the draft.
    pub submitted_at: Option<DateTime<Utc>>,
    /// Time a teller picked up the application.
    pub processing_started_at: Option<DateTime<Utc>>,
    /// Teller who picked up the application.
    pub processing_started_by: Option<UserId>,
    /// Time the application was forwarded for review.
    pub forwarded_at: Option<DateTime<Utc>>,
    /// Teller who forwarded the application.
    pub forwarded_by: Option<UserId>,
    /// Time of the manager decision.
    pub decided_at: Option<DateTime<Utc>>,
    /// Manager who decided.
    pub decided_by: Option<UserId>,
    /// Inactive applications release their account identifier.
    pub is_active: bool,
    /// Optimistic concurrency version, incremented by every transition.
    pub version: i64,
}

impl LoanApplication {
    /// Creates a draft owned by `owner_user_id`.
    pub fn new_draft(
        application_id: ApplicationId,
        owner_user_id: UserId,
        placement: OrgPlacement,
        requested_amount: i64,
        purpose: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        if requested_amount <= 0 {
            return Err(AppError::Validation(
                "requested_amount must be positive".to_owned(),
            ));
        }

        Ok(Self {
            application_id,
            owner_user_id,
            placement,
            requested_amount,
            purpose: purpose.into().trim().to_owned(),
            state: WorkflowState::Draft,
            account_identifier: None,
            approval: None,
            rejection_reason: None,
            created_at,
            submitted_at: None,
            processing_started_at: None,
            processing_started_by: None,
            forwarded_at: None,
            forwarded_by: None,
            decided_at: None,
            decided_by: None,
            is_active: true,
            version: 0,
        })
    }

    /// Returns the scope context used to authorize access to this application.
    #[must_use]
    pub fn scope_context(&self) -> ScopeContext {
        ScopeContext {
            owner_user_id: Some(self.owner_user_id),
            team_id: self.placement.team_id,
            department_id: self.placement.department_id,
            branch_id: self.placement.branch_id,
        }
    }

    /// Returns the application after applying `rule` with `payload`.
    ///
    /// Validates state and payload only; the caller authorizes the actor first.
    pub fn transitioned(
        &self,
        rule: &TransitionRule,
        payload: &TransitionPayload,
        actor: UserId,
        occurred_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        if rule.from != self.state {
            return Err(AppError::InvalidTransition(format!(
                "application '{}' is in state '{}', not '{}'",
                self.application_id,
                self.state.as_str(),
                rule.from.as_str()
            )));
        }
        payload.ensure_complete(rule.required_payload)?;

        let mut next = self.clone();
        next.state = rule.to;
        next.version = self.version + 1;

        match rule.to {
            WorkflowState::UserCompleted => {
                next.submitted_at = Some(occurred_at);
            }
            WorkflowState::TellerProcessing => {
                next.processing_started_at = Some(occurred_at);
                next.processing_started_by = Some(actor);
            }
            WorkflowState::ManagerReview => {
                next.account_identifier = payload.account_identifier().map(str::to_owned);
                next.forwarded_at = Some(occurred_at);
                next.forwarded_by = Some(actor);
            }
            WorkflowState::Approved => {
                next.approval = Some(ApprovalTerms::new(
                    payload.approved_amount.unwrap_or_default(),
                    payload.term_months.unwrap_or_default(),
                    payload.interest_rate_bps.unwrap_or_default(),
                )?);
                next.decided_at = Some(occurred_at);
                next.decided_by = Some(actor);
            }
            WorkflowState::Rejected => {
                next.rejection_reason = payload.reason().map(str::to_owned);
                next.decided_at = Some(occurred_at);
                next.decided_by = Some(actor);
            }
            WorkflowState::Draft => {}
        }

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use lendgate_core::{AppError, UserId};
    use proptest::prelude::*;

    use crate::{ApplicationId, AuditAction, OrgPlacement};

    use super::{
        LoanApplication, TRANSITION_TABLE, TransitionPayload, WorkflowState, find_transition,
    };

    fn draft() -> LoanApplication {
        match LoanApplication::new_draft(
            ApplicationId::new(),
            UserId::new(),
            OrgPlacement::default(),
            500_000,
            "working capital",
            Utc::now(),
        ) {
            Ok(application) => application,
            Err(error) => panic!("invalid draft: {error}"),
        }
    }

    fn in_state(state: WorkflowState) -> LoanApplication {
        let mut application = draft();
        application.state = state;
        application
    }

    #[test]
    fn terminal_states_have_no_outgoing_transitions() {
        assert!(
            TRANSITION_TABLE
                .iter()
                .all(|rule| !rule.from.is_terminal())
        );
    }

    #[test]
    fn each_pair_appears_at_most_once() {
        for rule in TRANSITION_TABLE {
            let count = TRANSITION_TABLE
                .iter()
                .filter(|other| other.from == rule.from && other.to == rule.to)
                .count();
            assert_eq!(count, 1);
        }
    }

    #[test]
    fn reject_without_reason_names_reason() {
        let Ok(rule) = find_transition(WorkflowState::ManagerReview, WorkflowState::Rejected)
        else {
            panic!("rejection transition should exist");
        };

        let result = in_state(WorkflowState::ManagerReview).transitioned(
            rule,
            &TransitionPayload {
                reason: Some("   ".to_owned()),
                ..TransitionPayload::default()
            },
            UserId::new(),
            Utc::now(),
        );

        assert!(matches!(result, Err(AppError::MissingPayload(field)) if field == "reason"));
        assert_eq!(rule.audit_action, AuditAction::Rejected);
    }

    #[test]
    fn approval_reports_first_missing_term() {
        let Ok(rule) = find_transition(WorkflowState::ManagerReview, WorkflowState::Approved)
        else {
            panic!("approval transition should exist");
        };

        let result = in_state(WorkflowState::ManagerReview).transitioned(
            rule,
            &TransitionPayload {
                approved_amount: Some(100),
                ..TransitionPayload::default()
            },
            UserId::new(),
            Utc::now(),
        );

        assert!(matches!(result, Err(AppError::MissingPayload(field)) if field == "term_months"));
    }

    #[test]
    fn forwarding_records_account_and_actor() {
        let Ok(rule) = find_transition(WorkflowState::TellerProcessing, WorkflowState::ManagerReview)
        else {
            panic!("forwarding transition should exist");
        };
        let teller = UserId::new();

        let result = in_state(WorkflowState::TellerProcessing).transitioned(
            rule,
            &TransitionPayload {
                account_identifier: Some(" ACC-001 ".to_owned()),
                ..TransitionPayload::default()
            },
            teller,
            Utc::now(),
        );

        let Ok(next) = result else {
            panic!("forwarding should succeed");
        };
        assert_eq!(next.state, WorkflowState::ManagerReview);
        assert_eq!(next.account_identifier.as_deref(), Some("ACC-001"));
        assert_eq!(next.forwarded_by, Some(teller));
        assert_eq!(next.version, 1);
    }

    #[test]
    fn stale_source_state_is_an_invalid_transition() {
        let Ok(rule) = find_transition(WorkflowState::Draft, WorkflowState::UserCompleted) else {
            panic!("submission transition should exist");
        };

        let result = in_state(WorkflowState::UserCompleted).transitioned(
            rule,
            &TransitionPayload::default(),
            UserId::new(),
            Utc::now(),
        );

        assert!(matches!(result, Err(AppError::InvalidTransition(_))));
    }

    fn state_strategy() -> impl Strategy<Value = WorkflowState> {
        prop::sample::select(WorkflowState::all().to_vec())
    }

    proptest! {
        #[test]
        fn pairs_outside_the_table_are_invalid(from in state_strategy(), to in state_strategy()) {
            let in_table = TRANSITION_TABLE
                .iter()
                .any(|rule| rule.from == from && rule.to == to);
            let result = find_transition(from, to);

            if in_table {
                prop_assert!(result.is_ok());
            } else {
                prop_assert!(matches!(result, Err(AppError::InvalidTransition(_))));
            }
        }
    }
}
