//! User administration and credential checks
//!
//! Users are never deleted. Deactivation and role changes are refused while
//! any team still references the user, so a roster can never point at an
//! account that lost the role it was assigned for.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::authorization::{authorize, Actor, Operation, Resource, ResourceKind};
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{
    page::{Page, PageRequest},
    role::Role,
    team::double_option,
    user::{User, UserFilter},
};
use crate::store::{Store, StoreError};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub employee_id: Option<String>,
    pub role: Option<Role>,

    #[serde(rename = "department")]
    pub department_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<Role>,

    #[serde(default, rename = "department", deserialize_with = "double_option")]
    pub department_id: Option<Option<Uuid>>,

    pub is_active: Option<bool>,
}

pub struct UserService {
    store: Arc<dyn Store>,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(
        &self,
        actor: &Actor,
        filter: &UserFilter,
        page: PageRequest,
    ) -> ServiceResult<Page<User>> {
        authorize(actor, &Resource::Collection(ResourceKind::User), Operation::List)?;
        Ok(self.store.list_users(filter, page).await?)
    }

    /// Privileged roles see anyone; everyone else only themselves
    pub async fn get(&self, actor: &Actor, id: Uuid) -> ServiceResult<User> {
        let user = self
            .store
            .user_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))?;
        authorize(actor, &Resource::User { id }, Operation::Read)?;
        Ok(user)
    }

    pub async fn create(&self, actor: &Actor, request: CreateUserRequest) -> ServiceResult<User> {
        authorize(actor, &Resource::Collection(ResourceKind::User), Operation::Create)?;
        let user = self.register(request).await?;

        info!(user_id = %user.id, actor_id = %actor.id, role = %user.role, "User created");
        Ok(user)
    }

    pub async fn update(&self, actor: &Actor, id: Uuid, patch: UserPatch) -> ServiceResult<User> {
        let mut user = self
            .store
            .user_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))?;
        authorize(actor, &Resource::User { id }, Operation::Update)?;

        let role_change = patch.role.is_some_and(|r| r != user.role);
        let deactivation = patch.is_active == Some(false) && user.is_active;
        if deactivation && id == actor.id {
            return Err(ServiceError::validation("You cannot deactivate your own account"));
        }
        if role_change || deactivation {
            self.ensure_unreferenced(id).await?;
        }

        if let Some(ref first_name) = patch.first_name {
            user.first_name = required(first_name, "First name")?;
        }
        if let Some(ref last_name) = patch.last_name {
            user.last_name = required(last_name, "Last name")?;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        if let Some(department) = patch.department_id {
            if let Some(department) = department {
                self.check_department(department).await?;
            }
            user.department_id = department;
        }
        if let Some(active) = patch.is_active {
            user.is_active = active;
        }
        user.updated_at = Utc::now();

        let user = self
            .store
            .update_user(&user)
            .await
            .map_err(duplicate)?
            .ok_or_else(|| ServiceError::not_found("User not found"))?;

        info!(user_id = %id, actor_id = %actor.id, role = %user.role, active = user.is_active, "User updated");
        Ok(user)
    }

    pub async fn deactivate(&self, actor: &Actor, id: Uuid) -> ServiceResult<User> {
        let mut user = self
            .store
            .user_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))?;
        authorize(actor, &Resource::User { id }, Operation::Delete)?;

        if id == actor.id {
            return Err(ServiceError::validation("You cannot deactivate your own account"));
        }
        self.ensure_unreferenced(id).await?;

        user.is_active = false;
        user.updated_at = Utc::now();
        let user = self
            .store
            .update_user(&user)
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))?;

        info!(user_id = %id, actor_id = %actor.id, "User deactivated");
        Ok(user)
    }

    /// Checks credentials and stamps `last_login_at`
    pub async fn authenticate(&self, email: &str, password: &str) -> ServiceResult<User> {
        let Some(user) = self.store.user_by_email(email.trim()).await? else {
            warn!("Login attempt for unknown email");
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "Login attempt with wrong password");
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
        if !user.is_active {
            warn!(user_id = %user.id, "Login attempt on deactivated account");
            return Err(ServiceError::Unauthorized(
                "Account is deactivated. Please contact HR.".to_string(),
            ));
        }

        self.store.record_login(user.id).await?;
        info!(user_id = %user.id, role = %user.role, "User logged in");
        Ok(user)
    }

    /// Active user for a refresh-token subject
    pub async fn active_user(&self, id: Uuid) -> ServiceResult<User> {
        self.store
            .user_by_id(id)
            .await?
            .filter(|user| user.is_active)
            .ok_or_else(|| ServiceError::Unauthorized("Invalid token or user account is inactive.".to_string()))
    }

    /// Creates an Admin with these credentials unless the email already exists
    ///
    /// Returns `true` when an account was created.
    pub async fn ensure_bootstrap_admin(&self, email: &str, password: &str) -> ServiceResult<bool> {
        if self.store.user_by_email(email.trim()).await?.is_some() {
            return Ok(false);
        }

        let admin = self
            .register(CreateUserRequest {
                email: email.to_string(),
                password: password.to_string(),
                first_name: "System".to_string(),
                last_name: "Administrator".to_string(),
                employee_id: None,
                role: Some(Role::Admin),
                department_id: None,
            })
            .await?;

        info!(user_id = %admin.id, email = %admin.email, "Bootstrap admin created");
        Ok(true)
    }

    async fn register(&self, request: CreateUserRequest) -> ServiceResult<User> {
        let email = request.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(ServiceError::validation("A valid email is required"));
        }
        validate_password_strength(&request.password).map_err(ServiceError::Validation)?;

        let first_name = required(&request.first_name, "First name")?;
        let last_name = required(&request.last_name, "Last name")?;
        if let Some(department) = request.department_id {
            self.check_department(department).await?;
        }
        if self.store.user_by_email(&email).await?.is_some() {
            return Err(ServiceError::conflict("A user with this email already exists"));
        }

        let mut user = User::new(
            email,
            hash_password(&request.password)?,
            first_name,
            last_name,
            request.role.unwrap_or(Role::Employee),
        );
        user.employee_id = request
            .employee_id
            .map(|id| id.trim().to_uppercase())
            .filter(|id| !id.is_empty());
        user.department_id = request.department_id;

        self.store.insert_user(user).await.map_err(duplicate)
    }

    async fn ensure_unreferenced(&self, id: Uuid) -> ServiceResult<()> {
        if self.store.user_referenced_by_team(id).await? {
            return Err(ServiceError::conflict(
                "User is assigned to a team. Remove them from the team before changing role or deactivating.",
            ));
        }
        Ok(())
    }

    async fn check_department(&self, id: Uuid) -> ServiceResult<()> {
        if self.store.department_by_id(id).await?.is_none() {
            return Err(ServiceError::validation("Invalid department selected"));
        }
        Ok(())
    }
}

fn required(value: &str, field: &str) -> ServiceResult<String> {
    let value = value.trim();
    if value.is_empty() {
        Err(ServiceError::validation(format!("{field} is required")))
    } else {
        Ok(value.to_string())
    }
}

fn duplicate(err: StoreError) -> ServiceError {
    match err {
        StoreError::UniqueViolation(ref c) if c == "users_employee_id_key" => {
            ServiceError::conflict("A user with this employee ID already exists")
        }
        StoreError::UniqueViolation(_) => {
            ServiceError::conflict("A user with this email already exists")
        }
        other => other.into(),
    }
}
