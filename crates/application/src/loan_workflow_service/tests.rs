use std::sync::Arc;

use async_trait::async_trait;
use lendgate_core::{ActorIdentity, AppError, AppResult, UserId};
use lendgate_domain::{
    ApplicationId, BranchId, LoanApplication, OrgPlacement, Scope, TransitionPayload,
    WorkflowState,
};
use tokio::sync::Barrier;

use crate::test_support::{FakeRepository, actor};
use crate::workflow_ports::{LoanApplicationRepository, TransitionCommit};
use crate::{AuditEvent, AuthorizationService};

use super::{CreateApplicationInput, LoanWorkflowService};

struct Fixture {
    repository: Arc<FakeRepository>,
    service: LoanWorkflowService,
    owner: ActorIdentity,
    teller: ActorIdentity,
    manager: ActorIdentity,
}

async fn fixture() -> Fixture {
    let repository = Arc::new(FakeRepository::new());
    let branch = OrgPlacement {
        branch_id: Some(BranchId::new()),
        ..OrgPlacement::default()
    };

    let create = repository
        .add_permission("application", "create", Scope::Own)
        .await;
    let process = repository
        .add_permission("application", "process", Scope::Branch)
        .await;
    let approve = repository
        .add_permission("application", "approve", Scope::Branch)
        .await;
    let reject = repository
        .add_permission("application", "reject", Scope::Branch)
        .await;
    let read = repository
        .add_permission("application", "read", Scope::Branch)
        .await;
    let applicant_role = repository.add_role("applicant", true, vec![create]).await;
    let teller_role = repository.add_role("teller", true, vec![process, read]).await;
    let manager_role = repository
        .add_role("branch_manager", true, vec![approve, reject, read])
        .await;

    let owner = UserId::new();
    let teller = UserId::new();
    let manager = UserId::new();
    for (user_id, role_id) in [
        (owner, applicant_role),
        (teller, teller_role),
        (manager, manager_role),
    ] {
        repository.assign(user_id, role_id).await;
        repository.place(user_id, branch).await;
    }

    let service = LoanWorkflowService::new(
        AuthorizationService::new(repository.clone()),
        repository.clone(),
    );

    Fixture {
        repository,
        service,
        owner: actor(owner),
        teller: actor(teller),
        manager: actor(manager),
    }
}

async fn draft(fixture: &Fixture) -> ApplicationId {
    let Ok(application) = fixture
        .service
        .create_application(
            &fixture.owner,
            CreateApplicationInput {
                requested_amount: 2_500_000,
                purpose: "equipment".to_owned(),
            },
        )
        .await
    else {
        panic!("draft should be created");
    };
    application.application_id
}

fn forward_payload(account_identifier: &str) -> TransitionPayload {
    TransitionPayload {
        account_identifier: Some(account_identifier.to_owned()),
        ..TransitionPayload::default()
    }
}

async fn move_to(
    fixture: &Fixture,
    actor: &ActorIdentity,
    application_id: ApplicationId,
    to_state: WorkflowState,
    payload: TransitionPayload,
) -> AppResult<LoanApplication> {
    fixture
        .service
        .transition(actor, application_id, to_state, payload)
        .await
}

async fn in_review(fixture: &Fixture, account_identifier: &str) -> ApplicationId {
    let application_id = draft(fixture).await;
    let steps = [
        (&fixture.owner, WorkflowState::UserCompleted, TransitionPayload::default()),
        (&fixture.teller, WorkflowState::TellerProcessing, TransitionPayload::default()),
        (&fixture.teller, WorkflowState::ManagerReview, forward_payload(account_identifier)),
    ];
    for (actor, to_state, payload) in steps {
        if move_to(fixture, actor, application_id, to_state, payload)
            .await
            .is_err()
        {
            panic!("step to {to_state} should succeed");
        }
    }
    application_id
}

#[tokio::test]
async fn rejection_requires_a_reason() {
    let fixture = fixture().await;
    let application_id = in_review(&fixture, "ACC-100").await;

    let missing = move_to(
        &fixture,
        &fixture.manager,
        application_id,
        WorkflowState::Rejected,
        TransitionPayload {
            reason: Some("   ".to_owned()),
            ..TransitionPayload::default()
        },
    )
    .await;
    let rejected = move_to(
        &fixture,
        &fixture.manager,
        application_id,
        WorkflowState::Rejected,
        TransitionPayload {
            reason: Some("insufficient collateral".to_owned()),
            ..TransitionPayload::default()
        },
    )
    .await;

    assert!(matches!(missing, Err(AppError::MissingPayload(ref field)) if field == "reason"));
    let Ok(rejected) = rejected else {
        panic!("rejection should succeed");
    };
    assert_eq!(rejected.state, WorkflowState::Rejected);
    assert_eq!(
        rejected.rejection_reason.as_deref(),
        Some("insufficient collateral")
    );
    assert_eq!(rejected.decided_by, Some(fixture.manager.user_id()));

    let actions = fixture.repository.audit_actions().await;
    assert_eq!(
        actions.iter().filter(|action| *action == "rejected").count(),
        1
    );
    let state = fixture.repository.state.lock().await;
    let Some(entry) = state.audit.iter().find(|entry| entry.action_type == "rejected") else {
        panic!("rejection should be audited");
    };
    assert_eq!(entry.reason.as_deref(), Some("insufficient collateral"));
    assert_eq!(entry.ip_address.as_deref(), Some("10.0.0.7"));
}

#[tokio::test]
async fn approval_records_terms() {
    let fixture = fixture().await;
    let application_id = in_review(&fixture, "ACC-200").await;

    let incomplete = move_to(
        &fixture,
        &fixture.manager,
        application_id,
        WorkflowState::Approved,
        TransitionPayload {
            approved_amount: Some(2_000_000),
            ..TransitionPayload::default()
        },
    )
    .await;
    let approved = move_to(
        &fixture,
        &fixture.manager,
        application_id,
        WorkflowState::Approved,
        TransitionPayload {
            approved_amount: Some(2_000_000),
            term_months: Some(36),
            interest_rate_bps: Some(1_150),
            ..TransitionPayload::default()
        },
    )
    .await;

    assert!(
        matches!(incomplete, Err(AppError::MissingPayload(ref field)) if field == "term_months")
    );
    let Ok(approved) = approved else {
        panic!("approval should succeed");
    };
    assert_eq!(approved.state, WorkflowState::Approved);
    assert!(matches!(approved.approval, Some(terms) if terms.term_months == 36));
    assert_eq!(approved.version, 4);
}

#[tokio::test]
async fn transitions_are_not_idempotent() {
    let fixture = fixture().await;
    let application_id = draft(&fixture).await;

    let first = move_to(
        &fixture,
        &fixture.owner,
        application_id,
        WorkflowState::UserCompleted,
        TransitionPayload::default(),
    )
    .await;
    let second = move_to(
        &fixture,
        &fixture.owner,
        application_id,
        WorkflowState::UserCompleted,
        TransitionPayload::default(),
    )
    .await;

    assert!(first.is_ok());
    assert!(matches!(second, Err(AppError::InvalidTransition(_))));
}

#[tokio::test]
async fn skipping_states_is_invalid() {
    let fixture = fixture().await;
    let application_id = draft(&fixture).await;

    let result = move_to(
        &fixture,
        &fixture.manager,
        application_id,
        WorkflowState::Approved,
        TransitionPayload::default(),
    )
    .await;

    assert!(matches!(result, Err(AppError::InvalidTransition(_))));
}

#[tokio::test]
async fn only_the_owner_submits() {
    let fixture = fixture().await;
    let application_id = draft(&fixture).await;

    let result = move_to(
        &fixture,
        &fixture.teller,
        application_id,
        WorkflowState::UserCompleted,
        TransitionPayload::default(),
    )
    .await;

    assert!(matches!(result, Err(AppError::Unauthorized(_))));
}

#[tokio::test]
async fn tellers_of_other_branches_are_denied() {
    let fixture = fixture().await;
    let application_id = draft(&fixture).await;
    let _ = move_to(
        &fixture,
        &fixture.owner,
        application_id,
        WorkflowState::UserCompleted,
        TransitionPayload::default(),
    )
    .await;
    let outsider = UserId::new();
    let Some(teller_role) = fixture
        .repository
        .state
        .lock()
        .await
        .roles
        .iter()
        .find(|role| role.name() == "teller")
        .map(|role| role.role_id())
    else {
        panic!("teller role should exist");
    };
    fixture.repository.assign(outsider, teller_role).await;
    fixture
        .repository
        .place(
            outsider,
            OrgPlacement {
                branch_id: Some(BranchId::new()),
                ..OrgPlacement::default()
            },
        )
        .await;

    let result = move_to(
        &fixture,
        &actor(outsider),
        application_id,
        WorkflowState::TellerProcessing,
        TransitionPayload::default(),
    )
    .await;

    assert!(matches!(result, Err(AppError::Unauthorized(_))));
}

#[tokio::test]
async fn account_identifiers_are_unique_among_active_applications() {
    let fixture = fixture().await;
    in_review(&fixture, "ACC-300").await;
    let second = draft(&fixture).await;
    for (actor, to_state) in [
        (&fixture.owner, WorkflowState::UserCompleted),
        (&fixture.teller, WorkflowState::TellerProcessing),
    ] {
        let _ = move_to(&fixture, actor, second, to_state, TransitionPayload::default()).await;
    }

    let duplicate = move_to(
        &fixture,
        &fixture.teller,
        second,
        WorkflowState::ManagerReview,
        forward_payload(" ACC-300 "),
    )
    .await;
    let differing_case = move_to(
        &fixture,
        &fixture.teller,
        second,
        WorkflowState::ManagerReview,
        forward_payload("acc-300"),
    )
    .await;

    assert!(
        matches!(duplicate, Err(AppError::DuplicateAccountIdentifier(ref value)) if value == "ACC-300")
    );
    assert!(differing_case.is_ok());
}

#[tokio::test]
async fn failed_audit_append_leaves_state_unchanged() {
    let fixture = fixture().await;
    let application_id = draft(&fixture).await;
    fixture.repository.set_fail_audit(true).await;

    let result = move_to(
        &fixture,
        &fixture.owner,
        application_id,
        WorkflowState::UserCompleted,
        TransitionPayload::default(),
    )
    .await;

    assert!(result.is_err());
    let state = fixture.repository.state.lock().await;
    let Some(stored) = state.applications.get(&application_id) else {
        panic!("application should exist");
    };
    assert_eq!(stored.state, WorkflowState::Draft);
    assert_eq!(stored.version, 0);
}

#[tokio::test]
async fn readers_need_scope_unless_they_own_the_application() {
    let fixture = fixture().await;
    let application_id = draft(&fixture).await;

    let by_owner = fixture
        .service
        .get_application(&fixture.owner, application_id)
        .await;
    let by_manager = fixture
        .service
        .get_application(&fixture.manager, application_id)
        .await;
    let by_stranger = fixture
        .service
        .get_application(&actor(UserId::new()), application_id)
        .await;

    assert!(by_owner.is_ok());
    assert!(by_manager.is_ok());
    assert!(matches!(by_stranger, Err(AppError::Unauthorized(_))));
}

/// Holds every reader at a barrier so both transitions see the same version.
struct RacingRepository {
    inner: Arc<FakeRepository>,
    barrier: Barrier,
}

#[async_trait]
impl LoanApplicationRepository for RacingRepository {
    async fn insert_application(
        &self,
        application: &LoanApplication,
        audit: AuditEvent,
    ) -> AppResult<()> {
        self.inner.insert_application(application, audit).await
    }

    async fn find_application(
        &self,
        application_id: ApplicationId,
    ) -> AppResult<Option<LoanApplication>> {
        let application = self.inner.find_application(application_id).await;
        self.barrier.wait().await;
        application
    }

    async fn account_identifier_in_use(
        &self,
        account_identifier: &str,
        excluding: ApplicationId,
    ) -> AppResult<bool> {
        self.inner
            .account_identifier_in_use(account_identifier, excluding)
            .await
    }

    async fn commit_transition(&self, commit: TransitionCommit) -> AppResult<()> {
        self.inner.commit_transition(commit).await
    }
}

#[tokio::test]
async fn concurrent_transitions_produce_one_conflict() {
    let fixture = fixture().await;
    let application_id = draft(&fixture).await;
    let _ = move_to(
        &fixture,
        &fixture.owner,
        application_id,
        WorkflowState::UserCompleted,
        TransitionPayload::default(),
    )
    .await;
    let racing = LoanWorkflowService::new(
        AuthorizationService::new(fixture.repository.clone()),
        Arc::new(RacingRepository {
            inner: fixture.repository.clone(),
            barrier: Barrier::new(2),
        }),
    );

    let (left, right) = tokio::join!(
        racing.transition(
            &fixture.teller,
            application_id,
            WorkflowState::TellerProcessing,
            TransitionPayload::default(),
        ),
        racing.transition(
            &fixture.teller,
            application_id,
            WorkflowState::TellerProcessing,
            TransitionPayload::default(),
        ),
    );

    let outcomes = [left, right];
    assert_eq!(outcomes.iter().filter(|result| result.is_ok()).count(), 1);
    assert_eq!(
        outcomes
            .iter()
            .filter(|result| matches!(result, Err(AppError::Conflict(_))))
            .count(),
        1
    );
    assert_eq!(
        fixture
            .repository
            .audit_actions()
            .await
            .iter()
            .filter(|action| *action == "processing_started")
            .count(),
        1
    );
}
