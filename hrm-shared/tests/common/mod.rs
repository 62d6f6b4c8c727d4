//! Shared fixtures for service tests
//!
//! Everything runs against `MemoryStore`; users are inserted straight into
//! the store with an empty password hash.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use hrm_shared::auth::authorization::Actor;
use hrm_shared::models::{department::Department, role::Role, user::User};
use hrm_shared::services::{RosterConfig, Services};
use hrm_shared::store::{DepartmentStore, MemoryStore, Store, UserStore};
use uuid::Uuid;

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub services: Services,
    pub admin: Actor,
    pub department: Department,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_config(RosterConfig::default()).await
    }

    pub async fn with_config(config: RosterConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let services = Services::new(store.clone() as Arc<dyn Store>, config);

        let admin = store
            .insert_user(User::new("admin@company.com", "", "Ada", "Admin", Role::Admin))
            .await
            .unwrap();
        let department = store.insert_department(department("Engineering", "ENG")).await.unwrap();

        Self {
            store,
            services,
            admin: Actor::from(&admin),
            department,
        }
    }

    /// Inserts an active user with the given role
    pub async fn user(&self, role: Role) -> User {
        let id = Uuid::new_v4();
        let user = User::new(format!("{id}@company.com"), "", "Test", role.as_str(), role);
        self.store.insert_user(user).await.unwrap()
    }

    pub async fn actor(&self, role: Role) -> Actor {
        Actor::from(&self.user(role).await)
    }

    pub async fn user_by_id(&self, id: Uuid) -> User {
        self.store.user_by_id(id).await.unwrap().unwrap()
    }

    pub async fn second_department(&self) -> Department {
        self.store
            .insert_department(department("Operations", "OPS"))
            .await
            .unwrap()
    }
}

pub fn department(name: &str, code: &str) -> Department {
    let now = Utc::now();
    Department {
        id: Uuid::new_v4(),
        name: name.to_string(),
        code: code.to_string(),
        description: None,
        head_id: None,
        is_active: true,
        created_by: None,
        updated_by: None,
        created_at: now,
        updated_at: now,
    }
}
