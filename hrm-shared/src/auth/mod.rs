/// Authentication and authorization
///
/// - [`password`]: Argon2id hashing and the password policy
/// - [`jwt`]: HS256 access and refresh tokens
/// - [`middleware`]: bearer-token extraction and user resolution for Axum
/// - [`authorization`]: the role permission table and its evaluation
///
/// # Example
///
/// ```
/// use hrm_shared::auth::authorization::{can_access, Actor, Operation, Resource};
/// use hrm_shared::models::role::Role;
/// use uuid::Uuid;
///
/// let leader = Actor::new(Uuid::new_v4(), Role::TeamLeader);
/// let own_team = Resource::Team { manager: None, leader: Some(leader.id) };
///
/// assert!(can_access(&leader, &own_team, Operation::Read));
/// assert!(!can_access(&leader, &own_team, Operation::Update));
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
