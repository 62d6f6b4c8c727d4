//! Team roster management
//!
//! Every write follows the same shape: load the team, run every check
//! against that snapshot, then save with the version that was read. A save
//! that loses a race returns `None` from the store; the whole sequence is
//! re-run from a fresh read, up to `write_retries` times.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::authorization::{
    authorize, check_team_patch, grant, require_role, team_scope, Actor, AuthzError, Grant,
    Operation, Resource, ResourceKind, TeamScope,
};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{
    page::{Page, PageRequest},
    role::Role,
    team::{Team, TeamFilter, TeamMember, TeamPatch, DEFAULT_MAX_SIZE, DEFAULT_MEMBER_ROLE},
    user::User,
};
use crate::store::{MemberLink, Store, StoreError};

pub const MAX_TEAM_SIZE: i32 = 50;
const MAX_NAME_LEN: usize = 100;
const MAX_CODE_LEN: usize = 20;
const MAX_LABEL_LEN: usize = 50;

#[derive(Debug, Clone, Copy)]
pub struct RosterConfig {
    /// Capacity of teams created without `maxSize`
    pub default_max_size: i32,

    /// Attempts per write before reporting a conflict
    pub write_retries: u32,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            default_max_size: DEFAULT_MAX_SIZE,
            write_retries: 3,
        }
    }
}

/// Request for creating a team
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamRequest {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub code: String,

    pub description: Option<String>,

    #[serde(rename = "department")]
    pub department_id: Option<Uuid>,

    #[serde(rename = "teamManager")]
    pub team_manager_id: Option<Uuid>,

    #[serde(rename = "teamLeader")]
    pub team_leader_id: Option<Uuid>,

    pub max_size: Option<i32>,
}

/// Request for adding a roster entry
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub user_id: Uuid,

    /// Label within the team, "Member" when absent
    pub role: Option<String>,
}

pub struct TeamRoster {
    store: Arc<dyn Store>,
    config: RosterConfig,
}

impl TeamRoster {
    pub fn new(store: Arc<dyn Store>, config: RosterConfig) -> Self {
        Self { store, config }
    }

    fn attempts(&self) -> u32 {
        self.config.write_retries.max(1)
    }

    async fn load(&self, id: Uuid) -> ServiceResult<Team> {
        self.store
            .team_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Team not found"))
    }

    /// Resolves a manager/leader reference, requiring the matching role
    async fn check_lead(&self, user_id: Uuid, role: Role) -> ServiceResult<()> {
        let holds_role = self
            .store
            .user_by_id(user_id)
            .await?
            .is_some_and(|user| user.role == role);

        if holds_role {
            Ok(())
        } else {
            let which = match role {
                Role::TeamManager => "team manager",
                _ => "team leader",
            };
            Err(ServiceError::validation(format!(
                "Invalid {which} selected. User must have {role} role."
            )))
        }
    }

    pub async fn create_team(&self, actor: &Actor, request: CreateTeamRequest) -> ServiceResult<Team> {
        authorize(actor, &Resource::Collection(ResourceKind::Team), Operation::Create)?;

        let name = normalize_name(&request.name)?;
        let code = normalize_code(&request.code)?;
        let max_size = request.max_size.unwrap_or(self.config.default_max_size);
        check_max_size(max_size, 0)?;

        let department_id = request
            .department_id
            .ok_or_else(|| ServiceError::validation("Department is required"))?;
        if self.store.department_by_id(department_id).await?.is_none() {
            return Err(ServiceError::validation("Invalid department selected"));
        }

        if let Some(manager) = request.team_manager_id {
            self.check_lead(manager, Role::TeamManager).await?;
        }
        if let Some(leader) = request.team_leader_id {
            self.check_lead(leader, Role::TeamLeader).await?;
        }

        if let Some(existing) = self
            .store
            .team_conflict(department_id, &name, &code, None)
            .await?
        {
            return Err(duplicate_team(&existing, &name));
        }

        let now = Utc::now();
        let team = Team {
            id: Uuid::new_v4(),
            name,
            code,
            description: clean_optional(request.description),
            department_id,
            team_manager_id: request.team_manager_id,
            team_leader_id: request.team_leader_id,
            members: Vec::new(),
            max_size,
            is_active: true,
            version: 0,
            created_by: Some(actor.id),
            updated_by: None,
            created_at: now,
            updated_at: now,
        };

        let team = self.store.insert_team(team).await.map_err(unique_to_conflict)?;

        info!(team_id = %team.id, actor_id = %actor.id, name = %team.name, "Team created");
        Ok(team)
    }

    pub async fn get_team(&self, actor: &Actor, id: Uuid) -> ServiceResult<Team> {
        let team = self.load(id).await?;
        authorize(actor, &Resource::team(&team), Operation::Read)?;

        debug!(team_id = %id, actor_id = %actor.id, "Team fetched");
        Ok(team)
    }

    /// Role-scoped listing; Employees get an empty page
    pub async fn list_teams(
        &self,
        actor: &Actor,
        mut filter: TeamFilter,
        page: PageRequest,
    ) -> ServiceResult<Page<Team>> {
        match team_scope(actor) {
            TeamScope::All => {}
            TeamScope::ManagedBy(id) => filter.team_manager_id = Some(id),
            TeamScope::LedBy(id) => filter.team_leader_id = Some(id),
            TeamScope::Nothing => return Ok(Page::new(Vec::new(), 0, page)),
        }

        let teams = self.store.list_teams(&filter, page).await?;
        debug!(actor_id = %actor.id, total = teams.total, "Teams listed");
        Ok(teams)
    }

    pub async fn update_team(&self, actor: &Actor, id: Uuid, patch: TeamPatch) -> ServiceResult<Team> {
        if patch.is_empty() {
            return Err(ServiceError::validation("No valid fields provided for update"));
        }

        for attempt in 1..=self.attempts() {
            let current = self.load(id).await?;
            authorize(actor, &Resource::team(&current), Operation::Update)?;
            check_team_patch(actor, &patch)?;

            let mut team = current.clone();

            if let Some(ref name) = patch.name {
                team.name = normalize_name(name)?;
                if !team.name.eq_ignore_ascii_case(&current.name) {
                    if let Some(existing) = self
                        .store
                        .team_conflict(team.department_id, &team.name, &team.code, Some(team.id))
                        .await?
                    {
                        return Err(duplicate_team(&existing, &team.name));
                    }
                }
            }
            if let Some(ref description) = patch.description {
                team.description = clean_optional(description.clone());
            }
            if let Some(manager) = patch.team_manager {
                if let Some(manager) = manager {
                    self.check_lead(manager, Role::TeamManager).await?;
                }
                team.team_manager_id = manager;
            }
            if let Some(leader) = patch.team_leader {
                if let Some(leader) = leader {
                    self.check_lead(leader, Role::TeamLeader).await?;
                }
                team.team_leader_id = leader;
            }
            if let Some(max_size) = patch.max_size {
                check_max_size(max_size, team.member_count())?;
                team.max_size = max_size;
            }
            if let Some(active) = patch.is_active {
                team.is_active = active;
            }
            team.updated_by = Some(actor.id);

            let saved = self
                .store
                .save_team(&team, current.version, None)
                .await
                .map_err(unique_to_conflict)?;

            match saved {
                Some(team) => {
                    info!(team_id = %id, actor_id = %actor.id, version = team.version, "Team updated");
                    return Ok(team);
                }
                None => warn!(team_id = %id, attempt, "Team changed during update, retrying"),
            }
        }

        Err(concurrent_modification())
    }

    /// Appends a roster entry and points the user at the team
    ///
    /// Checks run in order: team exists, actor may manage it, user exists,
    /// user is active, user not already on this roster, user not on another
    /// team, team below capacity.
    pub async fn add_member(
        &self,
        actor: &Actor,
        team_id: Uuid,
        request: AddMemberRequest,
    ) -> ServiceResult<Team> {
        let label = normalize_label(request.role.as_deref())?;

        for attempt in 1..=self.attempts() {
            let current = self.load(team_id).await?;
            authorize(actor, &Resource::team(&current), Operation::ManageMembers)?;

            let user = self
                .store
                .user_by_id(request.user_id)
                .await?
                .ok_or_else(|| ServiceError::validation("User not found"))?;

            if !user.is_active {
                return Err(ServiceError::validation("Cannot add an inactive user to a team"));
            }
            if current.has_member(user.id) {
                return Err(ServiceError::conflict("User is already a member of this team"));
            }
            if user.team_id.is_some_and(|other| other != team_id) {
                return Err(ServiceError::conflict("User is already assigned to another team"));
            }
            if current.is_full() {
                return Err(ServiceError::Capacity);
            }

            let mut team = current.clone();
            team.members.push(TeamMember {
                user_id: user.id,
                role: label.clone(),
                joined_date: Utc::now(),
            });
            team.updated_by = Some(actor.id);

            match self
                .store
                .save_team(&team, current.version, Some(MemberLink::Assign(user.id)))
                .await?
            {
                Some(team) => {
                    info!(
                        team_id = %team_id,
                        user_id = %user.id,
                        actor_id = %actor.id,
                        members = team.member_count(),
                        "Member added"
                    );
                    return Ok(team);
                }
                None => warn!(team_id = %team_id, user_id = %user.id, attempt, "Roster changed, retrying add"),
            }
        }

        Err(concurrent_modification())
    }

    pub async fn remove_member(&self, actor: &Actor, team_id: Uuid, user_id: Uuid) -> ServiceResult<Team> {
        for attempt in 1..=self.attempts() {
            let current = self.load(team_id).await?;
            authorize(actor, &Resource::team(&current), Operation::ManageMembers)?;

            if !current.has_member(user_id) {
                return Err(ServiceError::MemberNotFound);
            }

            let mut team = current.clone();
            team.members.retain(|m| m.user_id != user_id);
            team.updated_by = Some(actor.id);

            match self
                .store
                .save_team(&team, current.version, Some(MemberLink::Unassign(user_id)))
                .await?
            {
                Some(team) => {
                    info!(
                        team_id = %team_id,
                        user_id = %user_id,
                        actor_id = %actor.id,
                        members = team.member_count(),
                        "Member removed"
                    );
                    return Ok(team);
                }
                None => warn!(team_id = %team_id, user_id = %user_id, attempt, "Roster changed, retrying remove"),
            }
        }

        Err(concurrent_modification())
    }

    /// Hard delete of an empty team
    pub async fn delete_team(&self, actor: &Actor, id: Uuid) -> ServiceResult<()> {
        for attempt in 1..=self.attempts() {
            let team = self.load(id).await?;
            authorize(actor, &Resource::team(&team), Operation::Delete)?;

            if !team.members.is_empty() {
                return Err(ServiceError::conflict(
                    "Cannot delete team with existing members. Please remove all members first.",
                ));
            }

            if self.store.delete_team(id, team.version).await? {
                info!(team_id = %id, actor_id = %actor.id, "Team deleted");
                return Ok(());
            }
            warn!(team_id = %id, attempt, "Team changed during delete, retrying");
        }

        Err(concurrent_modification())
    }

    pub async fn managed_teams(&self, actor: &Actor) -> ServiceResult<Vec<Team>> {
        require_role(actor, Role::TeamManager)?;
        Ok(self.store.teams_managed_by(actor.id).await?)
    }

    pub async fn led_team(&self, actor: &Actor) -> ServiceResult<Team> {
        require_role(actor, Role::TeamLeader)?;
        self.store
            .team_led_by(actor.id)
            .await?
            .ok_or_else(|| ServiceError::not_found("No team assigned to you as Team Leader"))
    }

    /// Active Employees not on any roster, for roles that can add members
    pub async fn unassigned_employees(&self, actor: &Actor) -> ServiceResult<Vec<User>> {
        if grant(actor.role, ResourceKind::Team, Operation::ManageMembers) == Grant::Deny {
            return Err(AuthzError::Denied {
                kind: ResourceKind::User,
                operation: Operation::List,
            }
            .into());
        }
        Ok(self.store.unassigned_employees().await?)
    }
}

fn normalize_name(name: &str) -> ServiceResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::validation("Team name is required"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ServiceError::validation(format!(
            "Team name cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

fn normalize_code(code: &str) -> ServiceResult<String> {
    let code = code.trim().to_uppercase();
    if code.is_empty() {
        return Err(ServiceError::validation("Team code is required"));
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ServiceError::validation(
            "Team code must contain only letters and numbers",
        ));
    }
    if code.len() > MAX_CODE_LEN {
        return Err(ServiceError::validation(format!(
            "Team code cannot exceed {MAX_CODE_LEN} characters"
        )));
    }
    Ok(code)
}

fn normalize_label(label: Option<&str>) -> ServiceResult<String> {
    let label = label.map(str::trim).filter(|l| !l.is_empty());
    match label {
        None => Ok(DEFAULT_MEMBER_ROLE.to_string()),
        Some(l) if l.chars().count() > MAX_LABEL_LEN => Err(ServiceError::validation(format!(
            "Member role cannot exceed {MAX_LABEL_LEN} characters"
        ))),
        Some(l) => Ok(l.to_string()),
    }
}

fn check_max_size(max_size: i32, members: usize) -> ServiceResult<()> {
    if !(1..=MAX_TEAM_SIZE).contains(&max_size) {
        return Err(ServiceError::validation(format!(
            "Max team size must be between 1 and {MAX_TEAM_SIZE}"
        )));
    }
    if usize::try_from(max_size).unwrap_or(0) < members {
        return Err(ServiceError::validation(format!(
            "Max team size cannot be less than the current member count ({members})"
        )));
    }
    Ok(())
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn duplicate_team(existing: &Team, name: &str) -> ServiceError {
    if existing.name.eq_ignore_ascii_case(name) {
        ServiceError::conflict("A team with this name already exists in the selected department")
    } else {
        ServiceError::conflict("A team with this code already exists in the selected department")
    }
}

/// Maps a unique index that fired despite the pre-check (a concurrent insert)
fn unique_to_conflict(err: StoreError) -> ServiceError {
    match err {
        StoreError::UniqueViolation(ref constraint) if constraint == "teams_department_code_key" => {
            ServiceError::conflict("A team with this code already exists in the selected department")
        }
        StoreError::UniqueViolation(_) => {
            ServiceError::conflict("A team with this name already exists in the selected department")
        }
        other => other.into(),
    }
}

fn concurrent_modification() -> ServiceError {
    ServiceError::conflict("Team was modified concurrently, please retry")
}
