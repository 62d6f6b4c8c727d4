/// Team roster behaviour against the in-memory store

mod common;

use std::sync::Arc;

use common::Fixture;
use hrm_shared::auth::authorization::Actor;
use hrm_shared::error::ServiceError;
use hrm_shared::models::{
    page::PageRequest,
    role::Role,
    team::{Team, TeamFilter, TeamMember, TeamPatch},
};
use hrm_shared::services::roster::{AddMemberRequest, CreateTeamRequest};
use hrm_shared::services::RosterConfig;
use hrm_shared::store::{MemberLink, TeamStore};
use uuid::Uuid;

fn create_request(fixture: &Fixture, name: &str, code: &str) -> CreateTeamRequest {
    CreateTeamRequest {
        name: name.to_string(),
        code: code.to_string(),
        department_id: Some(fixture.department.id),
        ..Default::default()
    }
}

fn add(user_id: Uuid) -> AddMemberRequest {
    AddMemberRequest { user_id, role: None }
}

async fn alpha(fixture: &Fixture, max_size: i32) -> Team {
    let request = CreateTeamRequest {
        max_size: Some(max_size),
        ..create_request(fixture, "Alpha", "a1")
    };
    fixture
        .services
        .roster
        .create_team(&fixture.admin, request)
        .await
        .unwrap()
}

fn member_ids(team: &Team) -> Vec<Uuid> {
    team.members.iter().map(|m| m.user_id).collect()
}

#[tokio::test]
async fn test_create_team_normalizes_and_defaults() {
    let fixture = Fixture::new().await;
    let team = fixture
        .services
        .roster
        .create_team(&fixture.admin, create_request(&fixture, "  Platform ", "plat1"))
        .await
        .unwrap();

    assert_eq!(team.name, "Platform");
    assert_eq!(team.code, "PLAT1");
    assert_eq!(team.max_size, 10);
    assert!(team.members.is_empty());
    assert!(team.is_active);
    assert_eq!(team.created_by, Some(fixture.admin.id));
}

#[tokio::test]
async fn test_duplicate_name_or_code_conflicts_within_department_only() {
    let fixture = Fixture::new().await;
    let roster = &fixture.services.roster;
    alpha(&fixture, 5).await;

    let same_name = roster
        .create_team(&fixture.admin, create_request(&fixture, "ALPHA", "B2"))
        .await;
    assert!(matches!(same_name, Err(ServiceError::Conflict(ref m)) if m.contains("name")));

    let same_code = roster
        .create_team(&fixture.admin, create_request(&fixture, "Beta", "A1"))
        .await;
    assert!(matches!(same_code, Err(ServiceError::Conflict(ref m)) if m.contains("code")));

    let other = fixture.second_department().await;
    let elsewhere = CreateTeamRequest {
        department_id: Some(other.id),
        ..create_request(&fixture, "Alpha", "A1")
    };
    assert!(roster.create_team(&fixture.admin, elsewhere).await.is_ok());
}

#[tokio::test]
async fn test_create_validates_references() {
    let fixture = Fixture::new().await;
    let roster = &fixture.services.roster;

    let unknown_department = CreateTeamRequest {
        department_id: Some(Uuid::new_v4()),
        ..create_request(&fixture, "Alpha", "A1")
    };
    let err = roster.create_team(&fixture.admin, unknown_department).await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid department selected");

    let leader = fixture.user(Role::TeamLeader).await;
    let wrong_manager = CreateTeamRequest {
        team_manager_id: Some(leader.id),
        ..create_request(&fixture, "Alpha", "A1")
    };
    let err = roster.create_team(&fixture.admin, wrong_manager).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid team manager selected. User must have Team Manager role."
    );

    let manager = fixture.user(Role::TeamManager).await;
    let ok = CreateTeamRequest {
        team_manager_id: Some(manager.id),
        team_leader_id: Some(leader.id),
        ..create_request(&fixture, "Alpha", "A1")
    };
    let team = roster.create_team(&fixture.admin, ok).await.unwrap();
    assert_eq!(team.team_manager_id, Some(manager.id));
    assert_eq!(team.team_leader_id, Some(leader.id));
}

#[tokio::test]
async fn test_only_privileged_roles_create_teams() {
    let fixture = Fixture::new().await;
    let manager = fixture.actor(Role::TeamManager).await;

    let result = fixture
        .services
        .roster
        .create_team(&manager, create_request(&fixture, "Alpha", "A1"))
        .await;
    assert!(matches!(result, Err(ServiceError::Forbidden(_))));
}

#[tokio::test]
async fn test_capacity_example() {
    let fixture = Fixture::new().await;
    let roster = &fixture.services.roster;
    let team = alpha(&fixture, 2).await;

    let u1 = fixture.user(Role::Employee).await;
    let u2 = fixture.user(Role::Employee).await;
    let u3 = fixture.user(Role::Employee).await;

    let team_after_1 = roster.add_member(&fixture.admin, team.id, add(u1.id)).await.unwrap();
    assert_eq!(member_ids(&team_after_1), vec![u1.id]);

    let team_after_2 = roster.add_member(&fixture.admin, team.id, add(u2.id)).await.unwrap();
    assert_eq!(member_ids(&team_after_2), vec![u1.id, u2.id]);

    let full = roster.add_member(&fixture.admin, team.id, add(u3.id)).await;
    assert!(matches!(full, Err(ServiceError::Capacity)));

    let stored = roster.get_team(&fixture.admin, team.id).await.unwrap();
    assert_eq!(member_ids(&stored), vec![u1.id, u2.id]);
    assert_eq!(fixture.user_by_id(u3.id).await.team_id, None);
}

#[tokio::test]
async fn test_add_member_syncs_user_and_defaults_label() {
    let fixture = Fixture::new().await;
    let team = alpha(&fixture, 5).await;
    let user = fixture.user(Role::Employee).await;

    let team = fixture
        .services
        .roster
        .add_member(&fixture.admin, team.id, add(user.id))
        .await
        .unwrap();

    assert_eq!(team.members[0].role, "Member");
    assert_eq!(fixture.user_by_id(user.id).await.team_id, Some(team.id));
}

#[tokio::test]
async fn test_add_member_check_order() {
    let fixture = Fixture::new().await;
    let roster = &fixture.services.roster;
    let team = alpha(&fixture, 1).await;

    let missing_team = roster.add_member(&fixture.admin, Uuid::new_v4(), add(Uuid::new_v4())).await;
    assert!(matches!(missing_team, Err(ServiceError::NotFound(_))));

    let missing_user = roster.add_member(&fixture.admin, team.id, add(Uuid::new_v4())).await;
    assert!(matches!(missing_user, Err(ServiceError::Validation(ref m)) if m == "User not found"));

    let member = fixture.user(Role::Employee).await;
    roster.add_member(&fixture.admin, team.id, add(member.id)).await.unwrap();

    // Team is full, but the duplicate check comes first
    let duplicate = roster.add_member(&fixture.admin, team.id, add(member.id)).await;
    assert!(matches!(
        duplicate,
        Err(ServiceError::Conflict(ref m)) if m == "User is already a member of this team"
    ));
}

#[tokio::test]
async fn test_user_cannot_join_two_teams() {
    let fixture = Fixture::new().await;
    let roster = &fixture.services.roster;
    let first = alpha(&fixture, 5).await;
    let second = roster
        .create_team(&fixture.admin, create_request(&fixture, "Beta", "B1"))
        .await
        .unwrap();

    let user = fixture.user(Role::Employee).await;
    roster.add_member(&fixture.admin, first.id, add(user.id)).await.unwrap();

    let result = roster.add_member(&fixture.admin, second.id, add(user.id)).await;
    assert!(matches!(result, Err(ServiceError::Conflict(_))));

    let second = roster.get_team(&fixture.admin, second.id).await.unwrap();
    assert!(second.members.is_empty());
}

#[tokio::test]
async fn test_inactive_user_rejected() {
    let fixture = Fixture::new().await;
    let team = alpha(&fixture, 5).await;
    let user = fixture.user(Role::Employee).await;

    fixture
        .services
        .users
        .deactivate(&fixture.admin, user.id)
        .await
        .unwrap();

    let result = fixture
        .services
        .roster
        .add_member(&fixture.admin, team.id, add(user.id))
        .await;
    assert!(matches!(result, Err(ServiceError::Validation(_))));
}

#[tokio::test]
async fn test_remove_member() {
    let fixture = Fixture::new().await;
    let roster = &fixture.services.roster;
    let team = alpha(&fixture, 5).await;
    let u1 = fixture.user(Role::Employee).await;
    let u2 = fixture.user(Role::Employee).await;
    roster.add_member(&fixture.admin, team.id, add(u1.id)).await.unwrap();
    roster.add_member(&fixture.admin, team.id, add(u2.id)).await.unwrap();

    let stranger = fixture.user(Role::Employee).await;
    let missing = roster.remove_member(&fixture.admin, team.id, stranger.id).await;
    assert!(matches!(missing, Err(ServiceError::MemberNotFound)));
    assert_eq!(roster.get_team(&fixture.admin, team.id).await.unwrap().member_count(), 2);

    let team = roster.remove_member(&fixture.admin, team.id, u1.id).await.unwrap();
    assert_eq!(member_ids(&team), vec![u2.id]);
    assert_eq!(fixture.user_by_id(u1.id).await.team_id, None);
    assert_eq!(fixture.user_by_id(u2.id).await.team_id, Some(team.id));
}

#[tokio::test]
async fn test_delete_team_requires_empty_roster() {
    let fixture = Fixture::new().await;
    let roster = &fixture.services.roster;
    let team = alpha(&fixture, 5).await;
    let user = fixture.user(Role::Employee).await;
    roster.add_member(&fixture.admin, team.id, add(user.id)).await.unwrap();

    let blocked = roster.delete_team(&fixture.admin, team.id).await;
    assert!(matches!(blocked, Err(ServiceError::Conflict(_))));

    roster.remove_member(&fixture.admin, team.id, user.id).await.unwrap();
    roster.delete_team(&fixture.admin, team.id).await.unwrap();

    let gone = roster.get_team(&fixture.admin, team.id).await;
    assert!(matches!(gone, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn test_team_manager_field_subset() {
    let fixture = Fixture::new().await;
    let roster = &fixture.services.roster;
    let manager = fixture.user(Role::TeamManager).await;
    let team = roster
        .create_team(
            &fixture.admin,
            CreateTeamRequest {
                team_manager_id: Some(manager.id),
                ..create_request(&fixture, "Alpha", "A1")
            },
        )
        .await
        .unwrap();
    let manager = Actor::from(&manager);

    let rename = TeamPatch {
        name: Some("Renamed".to_string()),
        ..Default::default()
    };
    let denied = roster.update_team(&manager, team.id, rename).await;
    assert!(matches!(denied, Err(ServiceError::Forbidden(_))));

    let describe = TeamPatch {
        description: Some(Some("Payments platform".to_string())),
        max_size: Some(4),
        ..Default::default()
    };
    let updated = roster.update_team(&manager, team.id, describe).await.unwrap();
    assert_eq!(updated.description.as_deref(), Some("Payments platform"));
    assert_eq!(updated.max_size, 4);
    assert_eq!(updated.name, "Alpha");
    assert_eq!(updated.version, team.version + 1);
}

#[tokio::test]
async fn test_team_manager_cannot_touch_foreign_team() {
    let fixture = Fixture::new().await;
    let team = alpha(&fixture, 5).await;
    let manager = fixture.actor(Role::TeamManager).await;
    let user = fixture.user(Role::Employee).await;

    let read = fixture.services.roster.get_team(&manager, team.id).await;
    assert!(matches!(read, Err(ServiceError::Forbidden(_))));

    let add_result = fixture.services.roster.add_member(&manager, team.id, add(user.id)).await;
    assert!(matches!(add_result, Err(ServiceError::Forbidden(_))));

    // Absence wins over denial
    let missing = fixture.services.roster.get_team(&manager, Uuid::new_v4()).await;
    assert!(matches!(missing, Err(ServiceError::NotFound(_))));
}

#[tokio::test]
async fn test_rename_rechecks_uniqueness_excluding_self() {
    let fixture = Fixture::new().await;
    let roster = &fixture.services.roster;
    let team = alpha(&fixture, 5).await;
    roster
        .create_team(&fixture.admin, create_request(&fixture, "Beta", "B1"))
        .await
        .unwrap();

    let same = TeamPatch {
        name: Some("ALPHA".to_string()),
        ..Default::default()
    };
    assert!(roster.update_team(&fixture.admin, team.id, same).await.is_ok());

    let taken = TeamPatch {
        name: Some("beta".to_string()),
        ..Default::default()
    };
    let result = roster.update_team(&fixture.admin, team.id, taken).await;
    assert!(matches!(result, Err(ServiceError::Conflict(_))));
}

#[tokio::test]
async fn test_max_size_cannot_drop_below_members() {
    let fixture = Fixture::new().await;
    let roster = &fixture.services.roster;
    let team = alpha(&fixture, 5).await;
    for _ in 0..3 {
        let user = fixture.user(Role::Employee).await;
        roster.add_member(&fixture.admin, team.id, add(user.id)).await.unwrap();
    }

    let shrink = TeamPatch {
        max_size: Some(2),
        ..Default::default()
    };
    let result = roster.update_team(&fixture.admin, team.id, shrink).await;
    assert!(matches!(result, Err(ServiceError::Validation(_))));
}

#[tokio::test]
async fn test_listing_is_scoped_by_role() {
    let fixture = Fixture::new().await;
    let roster = &fixture.services.roster;
    let manager = fixture.user(Role::TeamManager).await;
    let leader = fixture.user(Role::TeamLeader).await;

    roster
        .create_team(
            &fixture.admin,
            CreateTeamRequest {
                team_manager_id: Some(manager.id),
                ..create_request(&fixture, "Alpha", "A1")
            },
        )
        .await
        .unwrap();
    roster
        .create_team(
            &fixture.admin,
            CreateTeamRequest {
                team_leader_id: Some(leader.id),
                ..create_request(&fixture, "Beta", "B1")
            },
        )
        .await
        .unwrap();

    let page = PageRequest::default();
    let all = roster.list_teams(&fixture.admin, TeamFilter::default(), page).await.unwrap();
    assert_eq!(all.total, 2);
    assert_eq!(all.items[0].name, "Beta");

    let managed = roster
        .list_teams(&Actor::from(&manager), TeamFilter::default(), page)
        .await
        .unwrap();
    assert_eq!(managed.items.len(), 1);
    assert_eq!(managed.items[0].name, "Alpha");

    let led = roster
        .list_teams(&Actor::from(&leader), TeamFilter::default(), page)
        .await
        .unwrap();
    assert_eq!(led.items.len(), 1);
    assert_eq!(led.items[0].name, "Beta");

    let employee = fixture.actor(Role::Employee).await;
    let none = roster.list_teams(&employee, TeamFilter::default(), page).await.unwrap();
    assert_eq!(none.total, 0);

    let search = TeamFilter {
        search: Some("alp".to_string()),
        ..Default::default()
    };
    let found = roster.list_teams(&fixture.admin, search, page).await.unwrap();
    assert_eq!(found.total, 1);
}

#[tokio::test]
async fn test_my_teams_endpoints_require_role() {
    let fixture = Fixture::new().await;
    let roster = &fixture.services.roster;
    let leader = fixture.user(Role::TeamLeader).await;
    let leader_actor = Actor::from(&leader);

    let none = roster.led_team(&leader_actor).await;
    assert!(matches!(
        none,
        Err(ServiceError::NotFound(ref m)) if m == "No team assigned to you as Team Leader"
    ));

    roster
        .create_team(
            &fixture.admin,
            CreateTeamRequest {
                team_leader_id: Some(leader.id),
                ..create_request(&fixture, "Alpha", "A1")
            },
        )
        .await
        .unwrap();
    assert_eq!(roster.led_team(&leader_actor).await.unwrap().name, "Alpha");

    let wrong_role = roster.managed_teams(&leader_actor).await;
    assert!(matches!(wrong_role, Err(ServiceError::Forbidden(_))));
}

#[tokio::test]
async fn test_unassigned_employees() {
    let fixture = Fixture::new().await;
    let roster = &fixture.services.roster;
    let team = alpha(&fixture, 5).await;
    let placed = fixture.user(Role::Employee).await;
    let free = fixture.user(Role::Employee).await;
    fixture.user(Role::TeamLeader).await;
    roster.add_member(&fixture.admin, team.id, add(placed.id)).await.unwrap();

    let unassigned = roster.unassigned_employees(&fixture.admin).await.unwrap();
    let ids: Vec<Uuid> = unassigned.iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![free.id]);

    let leader = fixture.actor(Role::TeamLeader).await;
    assert!(matches!(
        roster.unassigned_employees(&leader).await,
        Err(ServiceError::Forbidden(_))
    ));
}

#[tokio::test]
async fn test_stale_version_is_rejected_by_store() {
    let fixture = Fixture::new().await;
    let team = alpha(&fixture, 5).await;

    let mut stale = team.clone();
    stale.description = Some("first".to_string());
    assert!(fixture.store.save_team(&stale, team.version, None).await.unwrap().is_some());

    stale.description = Some("second".to_string());
    assert!(fixture.store.save_team(&stale, team.version, None).await.unwrap().is_none());
}

#[tokio::test]
async fn test_store_refuses_to_assign_deactivated_user() {
    let fixture = Fixture::new().await;
    let team = alpha(&fixture, 5).await;
    let user = fixture.user(Role::Employee).await;

    // Deactivated between the roster's checks and its write
    fixture
        .services
        .users
        .deactivate(&fixture.admin, user.id)
        .await
        .unwrap();

    let mut roster = team.clone();
    roster.members.push(TeamMember {
        user_id: user.id,
        role: "Member".to_string(),
        joined_date: chrono::Utc::now(),
    });
    let saved = fixture
        .store
        .save_team(&roster, team.version, Some(MemberLink::Assign(user.id)))
        .await
        .unwrap();
    assert!(saved.is_none());

    let stored = fixture.store.team_by_id(team.id).await.unwrap().unwrap();
    assert!(stored.members.is_empty());
    assert_eq!(stored.version, team.version);
    assert_eq!(fixture.user_by_id(user.id).await.team_id, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_never_exceed_capacity() {
    let fixture = Arc::new(
        Fixture::with_config(RosterConfig {
            default_max_size: 10,
            write_retries: 20,
        })
        .await,
    );
    let team = alpha(&fixture, 3).await;

    let mut users = Vec::new();
    for _ in 0..12 {
        users.push(fixture.user(Role::Employee).await);
    }

    let mut handles = Vec::new();
    for user in users {
        let fixture = fixture.clone();
        handles.push(tokio::spawn(async move {
            fixture
                .services
                .roster
                .add_member(&fixture.admin, team.id, add(user.id))
                .await
        }));
    }

    let mut added = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => added += 1,
            Err(ServiceError::Capacity) | Err(ServiceError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    let stored = fixture.services.roster.get_team(&fixture.admin, team.id).await.unwrap();
    assert_eq!(added, 3);
    assert_eq!(stored.member_count(), 3);

    let mut ids = member_ids(&stored);
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);
}
