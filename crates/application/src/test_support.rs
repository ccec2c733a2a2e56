use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use lendgate_core::{ActorIdentity, AppError, AppResult, UserId};
use lendgate_domain::{
    ApplicationId, LoanApplication, OrgPlacement, PermissionDefinition, PermissionId,
    PermissionKey, PermissionTemplate, Position, PositionId, RoleDefinition, RoleId, Scope,
    TemplateId, TemplateKind,
};
use tokio::sync::Mutex;

use crate::{
    ActorGrantSources, AuditEvent, AuditExportCursor, AuditLogEntry, AuditLogFilter,
    AuditLogPage, AuditLogQuery, AuditLogRepository, AuthorizationRepository,
    LoanApplicationRepository, PositionCapabilities, PositionGrant, RoleAssignment,
    RolePermissionCache, RolePermissions, SecurityAdminRepository, TransitionCommit,
};

#[derive(Default)]
pub struct FakeState {
    pub permissions: Vec<PermissionDefinition>,
    pub roles: Vec<RoleDefinition>,
    pub assignments: Vec<RoleAssignment>,
    pub overrides: Vec<(UserId, PermissionId, bool)>,
    pub placements: HashMap<UserId, OrgPlacement>,
    pub templates: Vec<PermissionTemplate>,
    pub positions: Vec<Position>,
    pub position_permissions: Vec<(PositionId, PermissionId)>,
    pub user_positions: Vec<(UserId, PositionId)>,
    pub applications: HashMap<ApplicationId, LoanApplication>,
    pub audit: Vec<AuditLogEntry>,
    pub fail_audit: bool,
    pub role_permission_loads: usize,
}

impl FakeState {
    fn append(&mut self, event: AuditEvent) -> AppResult<()> {
        if self.fail_audit {
            return Err(AppError::Internal("audit store unavailable".to_owned()));
        }

        let occurred_at = Utc::now() + Duration::microseconds(self.audit.len() as i64);
        self.audit.push(AuditLogEntry {
            audit_id: event.audit_id,
            occurred_at,
            action_type: event.action.as_str().to_owned(),
            entity_type: event.entity_type.as_str().to_owned(),
            entity_id: event.entity_id,
            actor_user_id: event.actor_user_id,
            target_user_id: event.target_user_id,
            reason: event.reason,
            ip_address: event.ip_address,
            metadata: event.metadata,
        });
        Ok(())
    }

    fn key_of(&self, permission_id: PermissionId) -> Option<PermissionKey> {
        self.permissions
            .iter()
            .find(|permission| permission.permission_id == permission_id && permission.is_active)
            .map(|permission| permission.key.clone())
    }

    fn keys_of(&self, permission_ids: &[PermissionId]) -> Vec<PermissionKey> {
        permission_ids
            .iter()
            .filter_map(|permission_id| self.key_of(*permission_id))
            .collect()
    }

    fn role_index(&self, role_id: RoleId) -> AppResult<usize> {
        self.roles
            .iter()
            .position(|role| role.role_id() == role_id)
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))
    }
}

/// In-memory implementation of every repository port.
#[derive(Default)]
pub struct FakeRepository {
    pub state: Mutex<FakeState>,
}

impl FakeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_permission(
        &self,
        resource_type: &str,
        action: &str,
        scope: Scope,
    ) -> PermissionId {
        let Ok(key) = PermissionKey::new(resource_type, action, scope) else {
            panic!("invalid permission key in test");
        };
        let permission_id = PermissionId::new();
        self.state.lock().await.permissions.push(PermissionDefinition {
            permission_id,
            key,
            description: None,
            is_active: true,
        });
        permission_id
    }

    pub async fn add_role(
        &self,
        name: &str,
        is_system: bool,
        permissions: Vec<PermissionId>,
    ) -> RoleId {
        let role_id = RoleId::new();
        let Ok(role) =
            RoleDefinition::restore(role_id, name, name, 1, None, is_system, true, permissions)
        else {
            panic!("invalid role in test");
        };
        self.state.lock().await.roles.push(role);
        role_id
    }

    pub async fn add_template(&self, name: &str, permissions: Vec<PermissionId>) -> TemplateId {
        let template_id = TemplateId::new();
        let Ok(template) = PermissionTemplate::restore(
            template_id,
            name,
            "",
            TemplateKind::System,
            true,
            0,
            permissions,
        ) else {
            panic!("invalid template in test");
        };
        self.state.lock().await.templates.push(template);
        template_id
    }

    pub async fn assign(&self, user_id: UserId, role_id: RoleId) {
        let mut state = self.state.lock().await;
        let role_name = state
            .roles
            .iter()
            .find(|role| role.role_id() == role_id)
            .map(|role| role.name().to_owned())
            .unwrap_or_default();
        state.assignments.push(RoleAssignment {
            user_id,
            role_id,
            role_name,
            assigned_by: user_id,
            assigned_at: Utc::now(),
            is_active: true,
        });
    }

    pub async fn place(&self, user_id: UserId, placement: OrgPlacement) {
        self.state.lock().await.placements.insert(user_id, placement);
    }

    pub async fn audit_actions(&self) -> Vec<String> {
        self.state
            .lock()
            .await
            .audit
            .iter()
            .map(|entry| entry.action_type.clone())
            .collect()
    }

    pub async fn set_fail_audit(&self, fail_audit: bool) {
        self.state.lock().await.fail_audit = fail_audit;
    }
}

/// In-memory role cache that counts invalidations.
#[derive(Default)]
pub struct FakeRoleCache {
    entries: Mutex<HashMap<RoleId, Vec<PermissionKey>>>,
    invalidations: AtomicUsize,
}

impl FakeRoleCache {
    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RolePermissionCache for FakeRoleCache {
    async fn get_role_permissions(&self, role_id: RoleId) -> AppResult<Option<Vec<PermissionKey>>> {
        Ok(self.entries.lock().await.get(&role_id).cloned())
    }

    async fn set_role_permissions(
        &self,
        role_id: RoleId,
        permissions: Vec<PermissionKey>,
        _ttl_seconds: u32,
    ) -> AppResult<()> {
        self.entries.lock().await.insert(role_id, permissions);
        Ok(())
    }

    async fn invalidate_all(&self) -> AppResult<()> {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        self.entries.lock().await.clear();
        Ok(())
    }
}

/// Builds an actor with a fixed IP for audit assertions.
pub fn actor(user_id: UserId) -> ActorIdentity {
    ActorIdentity::new(user_id, Some("10.0.0.7".to_owned()))
}

/// Grants `user_id` the all-resources, all-actions global grant through a system role.
pub async fn make_administrator(repository: &FakeRepository, user_id: UserId) {
    let permission_id = repository
        .add_permission(lendgate_domain::WILDCARD, lendgate_domain::WILDCARD, Scope::Global)
        .await;
    let role_id = repository
        .add_role("administrator", true, vec![permission_id])
        .await;
    repository.assign(user_id, role_id).await;
}

#[async_trait]
impl AuthorizationRepository for FakeRepository {
    async fn load_grant_sources(&self, user_id: UserId) -> AppResult<ActorGrantSources> {
        let state = self.state.lock().await;

        let role_ids = state
            .assignments
            .iter()
            .filter(|assignment| assignment.user_id == user_id && assignment.is_active)
            .filter(|assignment| {
                state
                    .roles
                    .iter()
                    .any(|role| role.role_id() == assignment.role_id && role.is_active())
            })
            .map(|assignment| assignment.role_id)
            .collect();

        let overrides = state
            .overrides
            .iter()
            .filter(|(holder, _, is_active)| *holder == user_id && *is_active)
            .filter_map(|(_, permission_id, _)| state.key_of(*permission_id))
            .collect();

        let positions = state
            .user_positions
            .iter()
            .filter(|(holder, _)| *holder == user_id)
            .map(|(_, position_id)| PositionGrant {
                position_id: *position_id,
                permissions: state
                    .position_permissions
                    .iter()
                    .filter(|(mapped, _)| mapped == position_id)
                    .filter_map(|(_, permission_id)| state.key_of(*permission_id))
                    .collect(),
            })
            .collect();

        Ok(ActorGrantSources {
            placement: state.placements.get(&user_id).copied().unwrap_or_default(),
            role_ids,
            overrides,
            positions,
        })
    }

    async fn load_role_permissions(&self, role_ids: &[RoleId]) -> AppResult<Vec<RolePermissions>> {
        let mut state = self.state.lock().await;
        state.role_permission_loads += 1;

        Ok(state
            .roles
            .iter()
            .filter(|role| role_ids.contains(&role.role_id()))
            .map(|role| RolePermissions {
                role_id: role.role_id(),
                permissions: state.keys_of(role.permissions()),
            })
            .collect())
    }

    async fn find_placement(&self, user_id: UserId) -> AppResult<OrgPlacement> {
        Ok(self
            .state
            .lock()
            .await
            .placements
            .get(&user_id)
            .copied()
            .unwrap_or_default())
    }
}

#[async_trait]
impl SecurityAdminRepository for FakeRepository {
    async fn list_permissions(&self) -> AppResult<Vec<PermissionDefinition>> {
        Ok(self.state.lock().await.permissions.clone())
    }

    async fn find_permission(
        &self,
        permission_id: PermissionId,
    ) -> AppResult<Option<PermissionDefinition>> {
        Ok(self
            .state
            .lock()
            .await
            .permissions
            .iter()
            .find(|permission| permission.permission_id == permission_id)
            .cloned())
    }

    async fn find_permissions_by_keys(
        &self,
        keys: &[PermissionKey],
    ) -> AppResult<Vec<PermissionDefinition>> {
        Ok(self
            .state
            .lock()
            .await
            .permissions
            .iter()
            .filter(|permission| permission.is_active && keys.contains(&permission.key))
            .cloned()
            .collect())
    }

    async fn list_roles(&self) -> AppResult<Vec<RoleDefinition>> {
        Ok(self.state.lock().await.roles.clone())
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<RoleDefinition>> {
        Ok(self
            .state
            .lock()
            .await
            .roles
            .iter()
            .find(|role| role.role_id() == role_id)
            .cloned())
    }

    async fn list_role_parents(&self) -> AppResult<Vec<(RoleId, RoleId)>> {
        Ok(self
            .state
            .lock()
            .await
            .roles
            .iter()
            .filter_map(|role| role.parent_role_id().map(|parent| (role.role_id(), parent)))
            .collect())
    }

    async fn insert_role(&self, role: &RoleDefinition, audit: AuditEvent) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state.roles.iter().any(|existing| existing.name() == role.name()) {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                role.name()
            )));
        }
        state.append(audit)?;
        state.roles.push(role.clone());
        Ok(())
    }

    async fn insert_role_from_template(
        &self,
        role: &RoleDefinition,
        template_id: TemplateId,
        audit: AuditEvent,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state.roles.iter().any(|existing| existing.name() == role.name()) {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                role.name()
            )));
        }
        let Some(template_index) = state
            .templates
            .iter()
            .position(|template| template.template_id() == template_id)
        else {
            return Err(AppError::NotFound(format!(
                "template '{template_id}' was not found"
            )));
        };
        let template = &state.templates[template_index];
        template.ensure_usable()?;
        let used = PermissionTemplate::restore(
            template.template_id(),
            template.name(),
            template.description(),
            template.kind(),
            template.is_active(),
            template.usage_count().saturating_add(1),
            template.permissions().to_vec(),
        )?;
        state.append(audit)?;
        state.templates[template_index] = used;
        state.roles.push(role.clone());
        Ok(())
    }

    async fn update_role(&self, role: &RoleDefinition, audit: AuditEvent) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let index = state.role_index(role.role_id())?;
        state.append(audit)?;
        state.roles[index] = role.clone();
        Ok(())
    }

    async fn delete_role(&self, role_id: RoleId, audit: AuditEvent) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let index = state.role_index(role_id)?;
        state.append(audit)?;
        state.roles.remove(index);
        state
            .assignments
            .retain(|assignment| assignment.role_id != role_id);
        Ok(())
    }

    async fn add_role_permissions(
        &self,
        role_id: RoleId,
        permission_ids: &[PermissionId],
        audit: AuditEvent,
    ) -> AppResult<usize> {
        let mut state = self.state.lock().await;
        let index = state.role_index(role_id)?;
        let mut role = state.roles[index].clone();
        let added = role.grant_permissions(permission_ids.iter().copied())?;
        state.append(audit)?;
        state.roles[index] = role;
        Ok(added)
    }

    async fn remove_role_permission(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
        audit: AuditEvent,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let index = state.role_index(role_id)?;
        let mut role = state.roles[index].clone();
        if !role.revoke_permission(permission_id)? {
            return Err(AppError::NotFound(format!(
                "role '{role_id}' does not hold permission '{permission_id}'"
            )));
        }
        state.append(audit)?;
        state.roles[index] = role;
        Ok(())
    }

    async fn list_user_roles(&self, user_id: UserId) -> AppResult<Vec<RoleAssignment>> {
        Ok(self
            .state
            .lock()
            .await
            .assignments
            .iter()
            .filter(|assignment| assignment.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn assign_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
        audit: AuditEvent,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state.assignments.iter().any(|assignment| {
            assignment.user_id == user_id && assignment.role_id == role_id && assignment.is_active
        }) {
            return Err(AppError::Conflict("role already assigned".to_owned()));
        }
        let index = state.role_index(role_id)?;
        let role_name = state.roles[index].name().to_owned();
        let assigned_by = audit.actor_user_id;
        state.append(audit)?;
        state.assignments.push(RoleAssignment {
            user_id,
            role_id,
            role_name,
            assigned_by,
            assigned_at: Utc::now(),
            is_active: true,
        });
        Ok(())
    }

    async fn revoke_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
        audit: AuditEvent,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let Some(index) = state.assignments.iter().position(|assignment| {
            assignment.user_id == user_id && assignment.role_id == role_id && assignment.is_active
        }) else {
            return Err(AppError::NotFound("role assignment not found".to_owned()));
        };
        state.append(audit)?;
        state.assignments[index].is_active = false;
        Ok(())
    }

    async fn grant_permission_overrides(
        &self,
        user_id: UserId,
        permission_ids: &[PermissionId],
        audit: AuditEvent,
    ) -> AppResult<usize> {
        let mut state = self.state.lock().await;
        state.append(audit)?;
        let mut granted = 0;
        for permission_id in permission_ids {
            match state
                .overrides
                .iter_mut()
                .find(|(holder, held, _)| *holder == user_id && held == permission_id)
            {
                Some((_, _, is_active)) if *is_active => {}
                Some((_, _, is_active)) => {
                    *is_active = true;
                    granted += 1;
                }
                None => {
                    state.overrides.push((user_id, *permission_id, true));
                    granted += 1;
                }
            }
        }
        Ok(granted)
    }

    async fn revoke_permission_override(
        &self,
        user_id: UserId,
        permission_id: PermissionId,
        audit: AuditEvent,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let Some(index) = state.overrides.iter().position(|(holder, held, is_active)| {
            *holder == user_id && *held == permission_id && *is_active
        }) else {
            return Err(AppError::NotFound("permission override not found".to_owned()));
        };
        state.append(audit)?;
        state.overrides[index].2 = false;
        Ok(())
    }

    async fn save_user_placement(
        &self,
        user_id: UserId,
        placement: OrgPlacement,
        audit: AuditEvent,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.append(audit)?;
        state.placements.insert(user_id, placement);
        Ok(())
    }

    async fn list_templates(&self) -> AppResult<Vec<PermissionTemplate>> {
        Ok(self.state.lock().await.templates.clone())
    }

    async fn find_template(
        &self,
        template_id: TemplateId,
    ) -> AppResult<Option<PermissionTemplate>> {
        Ok(self
            .state
            .lock()
            .await
            .templates
            .iter()
            .find(|template| template.template_id() == template_id)
            .cloned())
    }

    async fn find_template_by_name(&self, name: &str) -> AppResult<Option<PermissionTemplate>> {
        Ok(self
            .state
            .lock()
            .await
            .templates
            .iter()
            .find(|template| template.name() == name)
            .cloned())
    }

    async fn insert_template(
        &self,
        template: &PermissionTemplate,
        audit: AuditEvent,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state
            .templates
            .iter()
            .any(|existing| existing.name() == template.name())
        {
            return Err(AppError::Conflict(format!(
                "template '{}' already exists",
                template.name()
            )));
        }
        state.append(audit)?;
        state.templates.push(template.clone());
        Ok(())
    }

    async fn replace_template_permissions(
        &self,
        template: &PermissionTemplate,
        audit: AuditEvent,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let Some(index) = state
            .templates
            .iter()
            .position(|existing| existing.template_id() == template.template_id())
        else {
            return Err(AppError::NotFound("template not found".to_owned()));
        };
        state.append(audit)?;
        state.templates[index] = template.clone();
        Ok(())
    }

    async fn list_positions(&self) -> AppResult<Vec<PositionCapabilities>> {
        let state = self.state.lock().await;
        Ok(state
            .positions
            .iter()
            .map(|position| PositionCapabilities {
                position: position.clone(),
                permissions: state
                    .position_permissions
                    .iter()
                    .filter(|(mapped, _)| *mapped == position.position_id)
                    .filter_map(|(_, permission_id)| state.key_of(*permission_id))
                    .collect(),
            })
            .collect())
    }

    async fn find_position(&self, position_id: PositionId) -> AppResult<Option<Position>> {
        Ok(self
            .state
            .lock()
            .await
            .positions
            .iter()
            .find(|position| position.position_id == position_id)
            .cloned())
    }

    async fn insert_position(&self, position: &Position, audit: AuditEvent) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state
            .positions
            .iter()
            .any(|existing| existing.code == position.code)
        {
            return Err(AppError::Conflict(format!(
                "position '{}' already exists",
                position.code
            )));
        }
        state.append(audit)?;
        state.positions.push(position.clone());
        Ok(())
    }

    async fn assign_position(
        &self,
        user_id: UserId,
        position_id: PositionId,
        audit: AuditEvent,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state.user_positions.contains(&(user_id, position_id)) {
            return Err(AppError::Conflict("position already assigned".to_owned()));
        }
        state.append(audit)?;
        state.user_positions.push((user_id, position_id));
        Ok(())
    }

    async fn unassign_position(
        &self,
        user_id: UserId,
        position_id: PositionId,
        audit: AuditEvent,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let Some(index) = state
            .user_positions
            .iter()
            .position(|held| *held == (user_id, position_id))
        else {
            return Err(AppError::NotFound("position assignment not found".to_owned()));
        };
        state.append(audit)?;
        state.user_positions.remove(index);
        Ok(())
    }

    async fn set_position_permission(
        &self,
        position_id: PositionId,
        permission_id: PermissionId,
        granted: bool,
        audit: AuditEvent,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.append(audit)?;
        state
            .position_permissions
            .retain(|mapped| *mapped != (position_id, permission_id));
        if granted {
            state.position_permissions.push((position_id, permission_id));
        }
        Ok(())
    }
}

#[async_trait]
impl LoanApplicationRepository for FakeRepository {
    async fn insert_application(
        &self,
        application: &LoanApplication,
        audit: AuditEvent,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.append(audit)?;
        state
            .applications
            .insert(application.application_id, application.clone());
        Ok(())
    }

    async fn find_application(
        &self,
        application_id: ApplicationId,
    ) -> AppResult<Option<LoanApplication>> {
        Ok(self
            .state
            .lock()
            .await
            .applications
            .get(&application_id)
            .cloned())
    }

    async fn account_identifier_in_use(
        &self,
        account_identifier: &str,
        excluding: ApplicationId,
    ) -> AppResult<bool> {
        Ok(self
            .state
            .lock()
            .await
            .applications
            .values()
            .any(|application| {
                application.application_id != excluding
                    && application.is_active
                    && application.account_identifier.as_deref() == Some(account_identifier)
            }))
    }

    async fn commit_transition(&self, commit: TransitionCommit) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let application_id = commit.application.application_id;
        let Some(stored) = state.applications.get(&application_id) else {
            return Err(AppError::NotFound(format!(
                "application '{application_id}' was not found"
            )));
        };
        if stored.version != commit.expected_version {
            return Err(AppError::Conflict(format!(
                "application '{application_id}' was modified concurrently"
            )));
        }
        state.append(commit.audit)?;
        state.applications.insert(application_id, commit.application);
        Ok(())
    }
}

#[async_trait]
impl AuditLogRepository for FakeRepository {
    async fn query_entries(&self, query: AuditLogQuery) -> AppResult<AuditLogPage> {
        let state = self.state.lock().await;
        let matching = newest_first(&state.audit, &query.filter);
        let total = matching.len() as u64;

        Ok(AuditLogPage {
            entries: matching
                .into_iter()
                .skip(query.offset)
                .take(query.limit)
                .collect(),
            total,
        })
    }

    async fn export_batch(
        &self,
        filter: &AuditLogFilter,
        after: Option<AuditExportCursor>,
        limit: usize,
    ) -> AppResult<Vec<AuditLogEntry>> {
        let state = self.state.lock().await;
        Ok(newest_first(&state.audit, filter)
            .into_iter()
            .filter(|entry| {
                after.is_none_or(|cursor| {
                    (entry.occurred_at, entry.audit_id) < (cursor.occurred_at, cursor.audit_id)
                })
            })
            .take(limit)
            .collect())
    }
}

fn newest_first(entries: &[AuditLogEntry], filter: &AuditLogFilter) -> Vec<AuditLogEntry> {
    let needle = filter.free_text.as_deref().map(str::to_lowercase);
    let mut matching = entries
        .iter()
        .filter(|entry| {
            filter
                .action_type
                .as_deref()
                .is_none_or(|action| entry.action_type == action)
                && filter
                    .entity_type
                    .as_deref()
                    .is_none_or(|entity| entry.entity_type == entity)
                && filter
                    .actor_user_id
                    .is_none_or(|actor| entry.actor_user_id == actor)
                && filter
                    .target_user_id
                    .is_none_or(|target| entry.target_user_id == Some(target))
                && filter.from.is_none_or(|from| entry.occurred_at >= from)
                && filter.to.is_none_or(|to| entry.occurred_at < to)
                && needle.as_deref().is_none_or(|needle| {
                    entry
                        .reason
                        .as_deref()
                        .is_some_and(|reason| reason.to_lowercase().contains(needle))
                        || entry.metadata.to_string().to_lowercase().contains(needle)
                })
        })
        .cloned()
        .collect::<Vec<_>>();
    matching.sort_by(|left, right| {
        (right.occurred_at, right.audit_id).cmp(&(left.occurred_at, left.audit_id))
    });
    matching
}
