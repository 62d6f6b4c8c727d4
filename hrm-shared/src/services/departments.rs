//! Department administration

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::authorization::{authorize, Actor, Operation, Resource, ResourceKind};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{
    department::{Department, DepartmentFilter},
    page::{Page, PageRequest},
    team::double_option,
};
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDepartmentRequest {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub code: String,

    pub description: Option<String>,

    #[serde(rename = "head")]
    pub head_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentPatch {
    pub name: Option<String>,

    pub code: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    #[serde(default, rename = "head", deserialize_with = "double_option")]
    pub head_id: Option<Option<Uuid>>,

    pub is_active: Option<bool>,
}

pub struct DepartmentService {
    store: Arc<dyn Store>,
}

impl DepartmentService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(
        &self,
        filter: &DepartmentFilter,
        page: PageRequest,
    ) -> ServiceResult<Page<Department>> {
        Ok(self.store.list_departments(filter, page).await?)
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<Department> {
        self.store
            .department_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Department not found"))
    }

    pub async fn create(
        &self,
        actor: &Actor,
        request: CreateDepartmentRequest,
    ) -> ServiceResult<Department> {
        authorize(actor, &Resource::Collection(ResourceKind::Department), Operation::Create)?;

        let name = required(&request.name, "Department name")?;
        let code = normalize_code(&request.code)?;
        if let Some(head) = request.head_id {
            self.check_head(head).await?;
        }
        self.check_unique(&name, &code, None).await?;

        let now = Utc::now();
        let department = Department {
            id: Uuid::new_v4(),
            name,
            code,
            description: request
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            head_id: request.head_id,
            is_active: true,
            created_by: Some(actor.id),
            updated_by: None,
            created_at: now,
            updated_at: now,
        };

        let department = self
            .store
            .insert_department(department)
            .await
            .map_err(duplicate)?;

        info!(department_id = %department.id, actor_id = %actor.id, code = %department.code, "Department created");
        Ok(department)
    }

    pub async fn update(
        &self,
        actor: &Actor,
        id: Uuid,
        patch: DepartmentPatch,
    ) -> ServiceResult<Department> {
        let mut department = self.get(id).await?;
        authorize(actor, &Resource::Department, Operation::Update)?;

        if let Some(ref name) = patch.name {
            department.name = required(name, "Department name")?;
        }
        if let Some(ref code) = patch.code {
            department.code = normalize_code(code)?;
        }
        if let Some(description) = patch.description {
            department.description = description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty());
        }
        if let Some(head) = patch.head_id {
            if let Some(head) = head {
                self.check_head(head).await?;
            }
            department.head_id = head;
        }
        if let Some(active) = patch.is_active {
            department.is_active = active;
        }
        self.check_unique(&department.name, &department.code, Some(id))
            .await?;
        department.updated_by = Some(actor.id);

        let department = self
            .store
            .update_department(&department)
            .await
            .map_err(duplicate)?
            .ok_or_else(|| ServiceError::not_found("Department not found"))?;

        info!(department_id = %id, actor_id = %actor.id, "Department updated");
        Ok(department)
    }

    /// Refused while any team still belongs to the department
    pub async fn delete(&self, actor: &Actor, id: Uuid) -> ServiceResult<()> {
        self.get(id).await?;
        authorize(actor, &Resource::Department, Operation::Delete)?;

        let teams = self.store.count_teams_in_department(id).await?;
        if teams > 0 {
            return Err(ServiceError::conflict(format!(
                "Cannot delete department with {teams} existing team(s). Please move or delete them first."
            )));
        }

        if !self.store.delete_department(id).await? {
            return Err(ServiceError::not_found("Department not found"));
        }

        info!(department_id = %id, actor_id = %actor.id, "Department deleted");
        Ok(())
    }

    async fn check_head(&self, user_id: Uuid) -> ServiceResult<()> {
        match self.store.user_by_id(user_id).await? {
            Some(user) if user.is_active => Ok(()),
            _ => Err(ServiceError::validation("Invalid department head selected")),
        }
    }

    async fn check_unique(&self, name: &str, code: &str, exclude: Option<Uuid>) -> ServiceResult<()> {
        match self.store.department_conflict(name, code, exclude).await? {
            Some(existing) if existing.name.eq_ignore_ascii_case(name) => Err(
                ServiceError::conflict("A department with this name already exists"),
            ),
            Some(_) => Err(ServiceError::conflict("A department with this code already exists")),
            None => Ok(()),
        }
    }
}

fn required(value: &str, field: &str) -> ServiceResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ServiceError::validation(format!("{field} is required")));
    }
    if value.chars().count() > 100 {
        return Err(ServiceError::validation(format!(
            "{field} cannot exceed 100 characters"
        )));
    }
    Ok(value.to_string())
}

fn normalize_code(code: &str) -> ServiceResult<String> {
    let code = code.trim().to_uppercase();
    if code.is_empty() {
        return Err(ServiceError::validation("Department code is required"));
    }
    if code.len() > 20 || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ServiceError::validation(
            "Department code must be 1 to 20 letters or digits",
        ));
    }
    Ok(code)
}

fn duplicate(err: StoreError) -> ServiceError {
    match err {
        StoreError::UniqueViolation(ref c) if c == "departments_code_key" => {
            ServiceError::conflict("A department with this code already exists")
        }
        StoreError::UniqueViolation(_) => {
            ServiceError::conflict("A department with this name already exists")
        }
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_normalization() {
        assert_eq!(normalize_code(" eng ").unwrap(), "ENG");
        assert!(normalize_code("R&D").is_err());
        assert!(normalize_code("  ").is_err());
    }

    #[test]
    fn test_patch_head_null_clears() {
        let patch: DepartmentPatch = serde_json::from_str(r#"{"head": null}"#).unwrap();
        assert_eq!(patch.head_id, Some(None));

        let patch: DepartmentPatch = serde_json::from_str(r#"{"isActive": false}"#).unwrap();
        assert!(patch.head_id.is_none());
        assert_eq!(patch.is_active, Some(false));
    }
}
