use std::sync::Arc;

use chrono::Utc;
use lendgate_core::{ActorIdentity, AppError, AppResult};
use lendgate_domain::permission::{action, resource_type};
use lendgate_domain::{
    ApplicationId, AuditAction, AuditEntityType, LoanApplication, RequiredCapability,
    TransitionPayload, TransitionRule, WorkflowState, find_transition,
};
use serde_json::{Value, json};

use crate::workflow_ports::{LoanApplicationRepository, TransitionCommit};
use crate::{AuditEvent, AuthorizationService};

/// Input for a new loan application draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateApplicationInput {
    /// Requested principal in minor currency units.
    pub requested_amount: i64,
    /// Free-text purpose.
    pub purpose: String,
}

/// Gates loan applications through the closed transition table.
#[derive(Clone)]
pub struct LoanWorkflowService {
    authorization_service: AuthorizationService,
    repository: Arc<dyn LoanApplicationRepository>,
}

impl LoanWorkflowService {
    /// Creates a workflow service.
    #[must_use]
    pub fn new(
        authorization_service: AuthorizationService,
        repository: Arc<dyn LoanApplicationRepository>,
    ) -> Self {
        Self {
            authorization_service,
            repository,
        }
    }

    /// Creates a draft owned by the actor, placed where the actor sits.
    pub async fn create_application(
        &self,
        actor: &ActorIdentity,
        input: CreateApplicationInput,
    ) -> AppResult<LoanApplication> {
        let placement = self
            .authorization_service
            .placement_of(actor.user_id())
            .await?;
        let application = LoanApplication::new_draft(
            ApplicationId::new(),
            actor.user_id(),
            placement,
            input.requested_amount,
            input.purpose,
            Utc::now(),
        )?;
        self.authorization_service
            .require(
                actor,
                resource_type::APPLICATION,
                action::CREATE,
                &application.scope_context(),
            )
            .await?;

        let event = AuditEvent::new(
            actor,
            AuditAction::ApplicationCreated,
            AuditEntityType::Application,
            application.application_id.to_string(),
        )
        .with_target(application.owner_user_id)
        .with_metadata(json!({
            "state": application.state,
            "requested_amount": application.requested_amount,
        }));
        self.repository
            .insert_application(&application, event)
            .await?;

        Ok(application)
    }

    /// Returns an application to its owner or to a reader with sufficient scope.
    pub async fn get_application(
        &self,
        actor: &ActorIdentity,
        application_id: ApplicationId,
    ) -> AppResult<LoanApplication> {
        let application = self.load_application(application_id).await?;
        if application.owner_user_id != actor.user_id() {
            self.authorization_service
                .require(
                    actor,
                    resource_type::APPLICATION,
                    action::READ,
                    &application.scope_context(),
                )
                .await?;
        }

        Ok(application)
    }

    /// Moves an application to `to_state`.
    ///
    /// Checks run in a fixed order: table membership, current state, actor
    /// capability, payload, account identifier uniqueness. The write succeeds
    /// only if nobody transitioned the application in between.
    pub async fn transition(
        &self,
        actor: &ActorIdentity,
        application_id: ApplicationId,
        to_state: WorkflowState,
        payload: TransitionPayload,
    ) -> AppResult<LoanApplication> {
        let application = self.load_application(application_id).await?;
        let rule = find_transition(application.state, to_state)?;

        self.ensure_capability(actor, rule, &application).await?;
        let next = application.transitioned(rule, &payload, actor.user_id(), Utc::now())?;

        if let Some(account_identifier) = next.account_identifier.as_deref()
            && rule.to == WorkflowState::ManagerReview
            && self
                .repository
                .account_identifier_in_use(account_identifier, application_id)
                .await?
        {
            return Err(AppError::DuplicateAccountIdentifier(
                account_identifier.to_owned(),
            ));
        }

        let mut event = AuditEvent::new(
            actor,
            rule.audit_action,
            AuditEntityType::Application,
            application_id.to_string(),
        )
        .with_target(next.owner_user_id)
        .with_metadata(transition_metadata(rule, &next));
        if let Some(reason) = next.rejection_reason.as_deref() {
            event = event.with_reason(reason);
        }

        self.repository
            .commit_transition(TransitionCommit {
                application: next.clone(),
                expected_version: application.version,
                audit: event,
            })
            .await?;

        Ok(next)
    }

    async fn ensure_capability(
        &self,
        actor: &ActorIdentity,
        rule: &TransitionRule,
        application: &LoanApplication,
    ) -> AppResult<()> {
        match rule.capability {
            RequiredCapability::Owner if application.owner_user_id == actor.user_id() => Ok(()),
            RequiredCapability::Owner => Err(AppError::Unauthorized(format!(
                "only the owner may move application '{}' to '{}'",
                application.application_id,
                rule.to.as_str()
            ))),
            RequiredCapability::Permission {
                resource_type,
                action,
            } => self
                .authorization_service
                .require(actor, resource_type, action, &application.scope_context())
                .await
                .map(|_| ()),
        }
    }

    async fn load_application(&self, application_id: ApplicationId) -> AppResult<LoanApplication> {
        self.repository
            .find_application(application_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("application '{application_id}' was not found"))
            })
    }
}

fn transition_metadata(rule: &TransitionRule, next: &LoanApplication) -> Value {
    let mut metadata = json!({
        "from": rule.from,
        "to": rule.to,
        "version": next.version,
    });

    match rule.to {
        WorkflowState::ManagerReview => {
            metadata["account_identifier"] = json!(next.account_identifier);
        }
        WorkflowState::Approved => {
            metadata["approval"] = json!(next.approval);
        }
        _ => {}
    }

    metadata
}

#[cfg(test)]
mod tests;
