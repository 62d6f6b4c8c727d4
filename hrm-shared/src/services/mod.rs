//! Business operations
//!
//! Each service owns one area and talks to storage only through
//! [`Store`]. Authorization happens inside the services, after the target
//! resource has been loaded, so a missing resource is always reported as
//! not found rather than forbidden.

pub mod departments;
pub mod holidays;
pub mod roster;
pub mod users;

use std::sync::Arc;

use crate::store::Store;

pub use departments::DepartmentService;
pub use holidays::HolidayService;
pub use roster::{RosterConfig, TeamRoster};
pub use users::UserService;

/// All services over one shared store
pub struct Services {
    pub roster: TeamRoster,
    pub holidays: HolidayService,
    pub departments: DepartmentService,
    pub users: UserService,
}

impl Services {
    pub fn new(store: Arc<dyn Store>, roster: RosterConfig) -> Self {
        Self {
            roster: TeamRoster::new(store.clone(), roster),
            holidays: HolidayService::new(store.clone()),
            departments: DepartmentService::new(store.clone()),
            users: UserService::new(store),
        }
    }
}
