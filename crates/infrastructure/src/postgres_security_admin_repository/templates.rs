use super::*;

impl PostgresSecurityAdminRepository {
    pub(super) async fn list_templates_impl(&self) -> AppResult<Vec<PermissionTemplate>> {
        sqlx::query_as::<_, TemplateRow>(&format!(
            "{TEMPLATE_SELECT} GROUP BY templates.id ORDER BY templates.name"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list templates: {error}")))?
        .into_iter()
        .map(PermissionTemplate::try_from)
        .collect()
    }

    pub(super) async fn find_template_impl(
        &self,
        template_id: TemplateId,
    ) -> AppResult<Option<PermissionTemplate>> {
        sqlx::query_as::<_, TemplateRow>(&format!(
            "{TEMPLATE_SELECT} WHERE templates.id = $1 GROUP BY templates.id"
        ))
        .bind(template_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find template '{template_id}': {error}"))
        })?
        .map(PermissionTemplate::try_from)
        .transpose()
    }

    pub(super) async fn find_template_by_name_impl(
        &self,
        name: &str,
    ) -> AppResult<Option<PermissionTemplate>> {
        sqlx::query_as::<_, TemplateRow>(&format!(
            "{TEMPLATE_SELECT} WHERE templates.name = $1 GROUP BY templates.id"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find template '{name}': {error}")))?
        .map(PermissionTemplate::try_from)
        .transpose()
    }

    pub(super) async fn insert_template_impl(
        &self,
        template: &PermissionTemplate,
        audit: AuditEvent,
    ) -> AppResult<()> {
        let usage_count = i32::try_from(template.usage_count()).map_err(|error| {
            AppError::Validation(format!("template usage count is out of range: {error}"))
        })?;
        let mut transaction = begin(&self.pool).await?;

        sqlx::query(
            r#"
            INSERT INTO permission_templates (id, name, description, kind, is_active, usage_count)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(template.template_id().as_uuid())
        .bind(template.name())
        .bind(template.description())
        .bind(template.kind().as_str())
        .bind(template.is_active())
        .bind(usage_count)
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_name_conflict(error, "template", template.name()))?;

        write_template_permissions(&mut transaction, template).await?;

        append_audit_event(&mut transaction, &audit).await?;
        commit(transaction).await
    }

    pub(super) async fn replace_template_permissions_impl(
        &self,
        template: &PermissionTemplate,
        audit: AuditEvent,
    ) -> AppResult<()> {
        let mut transaction = begin(&self.pool).await?;

        let touched = sqlx::query(
            r#"
            UPDATE permission_templates
            SET updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(template.template_id().as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update template: {error}")))?;
        ensure_affected(touched.rows_affected(), || {
            format!("template '{}' was not found", template.template_id())
        })?;

        sqlx::query("DELETE FROM template_permissions WHERE template_id = $1")
            .bind(template.template_id().as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to clear template permissions: {error}"))
            })?;

        write_template_permissions(&mut transaction, template).await?;

        append_audit_event(&mut transaction, &audit).await?;
        commit(transaction).await
    }
}

async fn write_template_permissions(
    connection: &mut PgConnection,
    template: &PermissionTemplate,
) -> AppResult<()> {
    let permission_uuids = template
        .permissions()
        .iter()
        .map(PermissionId::as_uuid)
        .collect::<Vec<_>>();

    sqlx::query(
        r#"
        INSERT INTO template_permissions (template_id, permission_id, position)
        SELECT $1, requested.permission_id, requested.ordinal::INTEGER
        FROM UNNEST($2::UUID[]) WITH ORDINALITY AS requested (permission_id, ordinal)
        ON CONFLICT (template_id, permission_id) DO NOTHING
        "#,
    )
    .bind(template.template_id().as_uuid())
    .bind(permission_uuids)
    .execute(connection)
    .await
    .map_err(|error| {
        AppError::Internal(format!("failed to persist template permissions: {error}"))
    })?;

    Ok(())
}
