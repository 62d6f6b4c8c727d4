/// Organisational roles
///
/// Every user holds exactly one role from a fixed, closed set. The role
/// decides what the Authorization Resolver in [`crate::auth::authorization`]
/// grants; nothing else in the system compares role strings.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM (
///     'Admin', 'Vice President', 'HR BP', 'HR Manager', 'HR Executive',
///     'Team Manager', 'Team Leader', 'Employee'
/// );
/// ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role")]
pub enum Role {
    #[serde(rename = "Admin")]
    #[sqlx(rename = "Admin")]
    Admin,

    #[serde(rename = "Vice President")]
    #[sqlx(rename = "Vice President")]
    VicePresident,

    #[serde(rename = "HR BP")]
    #[sqlx(rename = "HR BP")]
    HrBp,

    #[serde(rename = "HR Manager")]
    #[sqlx(rename = "HR Manager")]
    HrManager,

    #[serde(rename = "HR Executive")]
    #[sqlx(rename = "HR Executive")]
    HrExecutive,

    #[serde(rename = "Team Manager")]
    #[sqlx(rename = "Team Manager")]
    TeamManager,

    #[serde(rename = "Team Leader")]
    #[sqlx(rename = "Team Leader")]
    TeamLeader,

    #[serde(rename = "Employee")]
    #[sqlx(rename = "Employee")]
    Employee,
}

impl Role {
    /// All roles, most senior first
    pub const ALL: [Role; 8] = [
        Role::Admin,
        Role::VicePresident,
        Role::HrBp,
        Role::HrManager,
        Role::HrExecutive,
        Role::TeamManager,
        Role::TeamLeader,
        Role::Employee,
    ];

    /// Display string, identical to the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::VicePresident => "Vice President",
            Role::HrBp => "HR BP",
            Role::HrManager => "HR Manager",
            Role::HrExecutive => "HR Executive",
            Role::TeamManager => "Team Manager",
            Role::TeamLeader => "Team Leader",
            Role::Employee => "Employee",
        }
    }

    /// Admin, Vice President and the three HR roles
    ///
    /// These roles have unconditional access to teams, departments,
    /// holidays and users.
    pub fn is_privileged(&self) -> bool {
        matches!(
            self,
            Role::Admin | Role::VicePresident | Role::HrBp | Role::HrManager | Role::HrExecutive
        )
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .iter()
            .copied()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_as_str_matches_serde() {
        for role in Role::ALL {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role.as_str()));
        }
    }

    #[test]
    fn test_privileged_roles() {
        assert!(Role::Admin.is_privileged());
        assert!(Role::VicePresident.is_privileged());
        assert!(Role::HrBp.is_privileged());
        assert!(Role::HrManager.is_privileged());
        assert!(Role::HrExecutive.is_privileged());

        assert!(!Role::TeamManager.is_privileged());
        assert!(!Role::TeamLeader.is_privileged());
        assert!(!Role::Employee.is_privileged());
    }

    #[test]
    fn test_parse_role() {
        assert_eq!("Team Manager".parse::<Role>().unwrap(), Role::TeamManager);
        assert_eq!("hr bp".parse::<Role>().unwrap(), Role::HrBp);
        assert!("Intern".parse::<Role>().is_err());
    }
}
