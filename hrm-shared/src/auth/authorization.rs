/// Authorization resolver
///
/// Every access decision in the system goes through this module. The rules
/// form a closed table keyed by `(role, resource kind, operation)`, see
/// [`grant`]; a [`Grant`] either allows outright, denies, or allows only
/// when the concrete resource points back at the actor.
///
/// # Permission Model
///
/// 1. **Privileged roles** (Admin, Vice President, HR BP, HR Manager,
///    HR Executive): everything on teams, departments, holidays and users.
/// 2. **Team Manager**: read, update and manage members of teams whose
///    `team_manager_id` is the actor; updates are limited to description,
///    capacity and team leader (see [`check_team_patch`]).
/// 3. **Team Leader**: read-only access to the team whose `team_leader_id`
///    is the actor.
/// 4. **Everyone**: read departments and holidays, read their own user
///    record.
/// 5. Anything else is denied.
///
/// A missing resource is reported by the caller as "not found" before this
/// module is consulted, so absence always wins over denial.
///
/// # Example
///
/// ```
/// use hrm_shared::auth::authorization::{can_access, Actor, Operation, Resource};
/// use hrm_shared::models::role::Role;
/// use uuid::Uuid;
///
/// let manager = Actor::new(Uuid::new_v4(), Role::TeamManager);
/// let own_team = Resource::Team { manager: Some(manager.id), leader: None };
/// let other_team = Resource::Team { manager: None, leader: None };
///
/// assert!(can_access(&manager, &own_team, Operation::Update));
/// assert!(!can_access(&manager, &other_team, Operation::Read));
/// assert!(!can_access(&manager, &own_team, Operation::Delete));
/// ```

use std::fmt;
use uuid::Uuid;

use crate::models::{
    role::Role,
    team::{Team, TeamPatch},
    user::User,
};

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// The permission table denies the operation on this resource
    #[error("Access denied. You are not allowed to {operation} this {kind}.")]
    Denied {
        kind: ResourceKind,
        operation: Operation,
    },

    /// A Team Manager touched a field outside their subset
    #[error("Team Managers can only update team description, max team size, and team leader.")]
    RestrictedFields,

    /// Endpoint reserved to a single role
    #[error("Access denied. This endpoint is only for {0}s.")]
    RoleRequired(Role),
}

/// The authenticated user performing an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self::new(user.id, user.role)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Team,
    Department,
    Holiday,
    User,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceKind::Team => "team",
            ResourceKind::Department => "department",
            ResourceKind::Holiday => "holiday",
            ResourceKind::User => "user",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Read,
    Create,
    Update,
    Delete,
    /// Add or remove roster entries
    ManageMembers,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::List => "list",
            Operation::Read => "view",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::ManageMembers => "manage members of",
        })
    }
}

/// The ownership facts of a concrete resource that rules may inspect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Team {
        manager: Option<Uuid>,
        leader: Option<Uuid>,
    },
    /// Departments carry no ownership; also used for create/list checks
    Department,
    Holiday,
    User {
        id: Uuid,
    },
    /// A kind-level check with no concrete instance (create, list)
    Collection(ResourceKind),
}

impl Resource {
    pub fn team(team: &Team) -> Self {
        Resource::Team {
            manager: team.team_manager_id,
            leader: team.team_leader_id,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Team { .. } => ResourceKind::Team,
            Resource::Department => ResourceKind::Department,
            Resource::Holiday => ResourceKind::Holiday,
            Resource::User { .. } => ResourceKind::User,
            Resource::Collection(kind) => *kind,
        }
    }
}

/// Outcome of the permission table for one `(role, kind, operation)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// Allowed on every instance
    Any,
    /// Allowed on teams the actor manages
    ManagedTeam,
    /// Allowed on the team the actor leads
    LedTeam,
    /// Allowed on the actor's own user record
    OwnRecord,
    Deny,
}

/// The permission table
pub fn grant(role: Role, kind: ResourceKind, operation: Operation) -> Grant {
    use Operation::*;
    use ResourceKind as K;

    if role.is_privileged() {
        return Grant::Any;
    }

    match (role, kind, operation) {
        (_, K::Department | K::Holiday, List | Read) => Grant::Any,

        (Role::TeamManager, K::Team, List | Read | Update | ManageMembers) => Grant::ManagedTeam,
        (Role::TeamLeader, K::Team, List | Read) => Grant::LedTeam,

        (_, K::User, Read) => Grant::OwnRecord,

        _ => Grant::Deny,
    }
}

/// Evaluates the table against a concrete resource
pub fn can_access(actor: &Actor, resource: &Resource, operation: Operation) -> bool {
    match grant(actor.role, resource.kind(), operation) {
        Grant::Any => true,
        Grant::ManagedTeam => {
            matches!(resource, Resource::Team { manager: Some(m), .. } if *m == actor.id)
        }
        Grant::LedTeam => {
            matches!(resource, Resource::Team { leader: Some(l), .. } if *l == actor.id)
        }
        Grant::OwnRecord => matches!(resource, Resource::User { id } if *id == actor.id),
        Grant::Deny => false,
    }
}

/// [`can_access`] as a `Result`
pub fn authorize(actor: &Actor, resource: &Resource, operation: Operation) -> Result<(), AuthzError> {
    if can_access(actor, resource, operation) {
        Ok(())
    } else {
        tracing::warn!(
            actor_id = %actor.id,
            role = %actor.role,
            kind = %resource.kind(),
            operation = %operation,
            "Access denied"
        );
        Err(AuthzError::Denied {
            kind: resource.kind(),
            operation,
        })
    }
}

/// Rejects Team Manager patches touching name, manager or active flag
pub fn check_team_patch(actor: &Actor, patch: &TeamPatch) -> Result<(), AuthzError> {
    if actor.role != Role::TeamManager {
        return Ok(());
    }

    if patch.name.is_some() || patch.team_manager.is_some() || patch.is_active.is_some() {
        tracing::warn!(actor_id = %actor.id, "Team Manager attempted a restricted team update");
        return Err(AuthzError::RestrictedFields);
    }

    Ok(())
}

/// Requires the actor to hold exactly `role`
pub fn require_role(actor: &Actor, role: Role) -> Result<(), AuthzError> {
    if actor.role == role {
        Ok(())
    } else {
        Err(AuthzError::RoleRequired(role))
    }
}

/// Which teams a listing may show to an actor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamScope {
    All,
    ManagedBy(Uuid),
    LedBy(Uuid),
    Nothing,
}

/// Derives the listing scope from the `List` grant on teams
pub fn team_scope(actor: &Actor) -> TeamScope {
    match grant(actor.role, ResourceKind::Team, Operation::List) {
        Grant::Any => TeamScope::All,
        Grant::ManagedTeam => TeamScope::ManagedBy(actor.id),
        Grant::LedTeam => TeamScope::LedBy(actor.id),
        Grant::OwnRecord | Grant::Deny => TeamScope::Nothing,
    }
}
