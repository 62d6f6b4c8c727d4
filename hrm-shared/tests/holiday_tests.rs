/// Holiday calendar behaviour against the in-memory store

mod common;

use chrono::{Datelike, Duration, Utc};
use common::Fixture;
use hrm_shared::error::ServiceError;
use hrm_shared::models::holiday::{HolidayFilter, HolidayType};
use hrm_shared::models::page::PageRequest;
use hrm_shared::models::role::Role;
use hrm_shared::services::holidays::{HolidayInput, HolidayPatch};

fn input(name: &str, date: &str, holiday_type: &str) -> HolidayInput {
    HolidayInput {
        holiday_name: Some(name.to_string()),
        date: Some(date.to_string()),
        holiday_type: Some(holiday_type.to_string()),
        description: None,
    }
}

#[tokio::test]
async fn test_christmas_example() {
    let fixture = Fixture::new().await;
    let holidays = &fixture.services.holidays;

    let first = holidays
        .create(&fixture.admin, input("Christmas", "2024-12-25", "National"))
        .await
        .unwrap();
    assert_eq!(first.day, "Wednesday");
    assert_eq!(first.year, 2024);

    let blocked = holidays
        .create(&fixture.admin, input("Xmas", "2024-12-25", "Company"))
        .await;
    assert!(matches!(
        blocked,
        Err(ServiceError::Conflict(ref m)) if m == "A holiday already exists on this date"
    ));

    holidays.delete(&fixture.admin, first.id).await.unwrap();

    let second = holidays
        .create(&fixture.admin, input("Xmas", "2024-12-25", "Company"))
        .await
        .unwrap();
    assert_ne!(second.id, first.id);
}

#[tokio::test]
async fn test_timestamp_input_collides_with_same_calendar_day() {
    let fixture = Fixture::new().await;
    let holidays = &fixture.services.holidays;

    holidays
        .create(&fixture.admin, input("New Year", "2025-01-01", "National"))
        .await
        .unwrap();

    let result = holidays
        .create(&fixture.admin, input("New Year Eve party", "2025-01-01T18:30:00Z", "Company"))
        .await;
    assert!(matches!(result, Err(ServiceError::Conflict(_))));
}

#[tokio::test]
async fn test_create_requires_fields_and_known_type() {
    let fixture = Fixture::new().await;
    let holidays = &fixture.services.holidays;

    let missing = HolidayInput {
        holiday_type: None,
        ..input("Diwali", "2024-11-01", "Religious")
    };
    let err = holidays.create(&fixture.admin, missing).await.unwrap_err();
    assert_eq!(err.to_string(), "Holiday name, date, and type are required");

    let bad_type = holidays
        .create(&fixture.admin, input("Diwali", "2024-11-01", "Bank"))
        .await;
    assert!(matches!(bad_type, Err(ServiceError::Validation(_))));

    let bad_date = holidays
        .create(&fixture.admin, input("Diwali", "first of november", "Religious"))
        .await;
    assert!(matches!(bad_date, Err(ServiceError::Validation(_))));
}

#[tokio::test]
async fn test_writes_are_privileged_reads_are_open() {
    let fixture = Fixture::new().await;
    let holidays = &fixture.services.holidays;
    let employee = fixture.actor(Role::Employee).await;

    let denied = holidays
        .create(&employee, input("Founders Day", "2024-03-01", "Company"))
        .await;
    assert!(matches!(denied, Err(ServiceError::Forbidden(_))));

    let hr = fixture.actor(Role::HrExecutive).await;
    let created = holidays
        .create(&hr, input("Founders Day", "2024-03-01", "Company"))
        .await
        .unwrap();

    let update = holidays
        .update(&employee, created.id, HolidayPatch::default())
        .await;
    assert!(matches!(update, Err(ServiceError::Forbidden(_))));

    assert_eq!(holidays.get(created.id).await.unwrap().holiday_name, "Founders Day");
}

#[tokio::test]
async fn test_update_moves_date_and_rederives_day() {
    let fixture = Fixture::new().await;
    let holidays = &fixture.services.holidays;

    let a = holidays
        .create(&fixture.admin, input("Holi", "2024-03-25", "Religious"))
        .await
        .unwrap();
    holidays
        .create(&fixture.admin, input("Good Friday", "2024-03-29", "Religious"))
        .await
        .unwrap();

    let clash = HolidayPatch {
        date: Some("2024-03-29".to_string()),
        ..Default::default()
    };
    let result = holidays.update(&fixture.admin, a.id, clash).await;
    assert!(matches!(
        result,
        Err(ServiceError::Conflict(ref m)) if m == "Another holiday already exists on this date"
    ));

    let moved = HolidayPatch {
        date: Some("2024-03-26".to_string()),
        description: Some(Some("  Festival of colours ".to_string())),
        ..Default::default()
    };
    let updated = holidays.update(&fixture.admin, a.id, moved).await.unwrap();
    assert_eq!(updated.day, "Tuesday");
    assert_eq!(updated.description.as_deref(), Some("Festival of colours"));
    assert_eq!(updated.updated_by, Some(fixture.admin.id));
}

#[tokio::test]
async fn test_inactive_holiday_can_move_onto_taken_date() {
    let fixture = Fixture::new().await;
    let holidays = &fixture.services.holidays;

    let old = holidays
        .create(&fixture.admin, input("Old", "2024-12-24", "Company"))
        .await
        .unwrap();
    holidays.delete(&fixture.admin, old.id).await.unwrap();
    holidays
        .create(&fixture.admin, input("Xmas", "2024-12-25", "National"))
        .await
        .unwrap();

    let patch = HolidayPatch {
        date: Some("2024-12-25".to_string()),
        ..Default::default()
    };
    let moved = holidays.update(&fixture.admin, old.id, patch).await.unwrap();
    assert_eq!(moved.date.to_string(), "2024-12-25");
    assert!(!moved.is_active);

    let listed = holidays
        .list(&HolidayFilter { year: Some(2024), ..Default::default() }, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(listed.items.len(), 1);
    assert_eq!(listed.items[0].holiday_name, "Xmas");
}

#[tokio::test]
async fn test_offset_less_datetime_input_is_accepted() {
    let fixture = Fixture::new().await;
    let holidays = &fixture.services.holidays;

    let created = holidays
        .create(&fixture.admin, input("Christmas", "2024-12-25T00:00:00.000", "National"))
        .await
        .unwrap();
    assert_eq!(created.date.to_string(), "2024-12-25");

    let clash = holidays
        .create(&fixture.admin, input("Xmas", "2024-12-25", "Company"))
        .await;
    assert!(matches!(clash, Err(ServiceError::Conflict(_))));
}

#[tokio::test]
async fn test_missing_holiday_is_not_found() {
    let fixture = Fixture::new().await;
    let holidays = &fixture.services.holidays;
    let id = uuid::Uuid::new_v4();

    assert!(matches!(holidays.get(id).await, Err(ServiceError::NotFound(_))));
    assert!(matches!(
        holidays.delete(&fixture.admin, id).await,
        Err(ServiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_bulk_create_collects_errors() {
    let fixture = Fixture::new().await;
    let holidays = &fixture.services.holidays;

    let empty = holidays.bulk_create(&fixture.admin, Vec::new()).await;
    assert!(matches!(
        empty,
        Err(ServiceError::Validation(ref m)) if m == "Holidays array is required and cannot be empty"
    ));

    let outcome = holidays
        .bulk_create(
            &fixture.admin,
            vec![
                input("Republic Day", "2024-01-26", "National"),
                HolidayInput::default(),
                input("Duplicate", "2024-01-26", "Company"),
                input("Independence Day", "2024-08-15", "National"),
            ],
        )
        .await
        .unwrap();

    assert_eq!(outcome.created_count, 2);
    assert_eq!(outcome.error_count, 2);
    assert_eq!(outcome.errors[0].index, 1);
    assert_eq!(outcome.errors[1].index, 2);
    assert_eq!(outcome.errors[1].error, "Holiday already exists on 2024-01-26");
}

#[tokio::test]
async fn test_list_filters_and_excludes_inactive() {
    let fixture = Fixture::new().await;
    let holidays = &fixture.services.holidays;

    for (name, date, kind) in [
        ("Independence Day", "2024-08-15", "National"),
        ("Republic Day", "2024-01-26", "National"),
        ("Company Offsite", "2024-08-30", "Company"),
        ("Next Republic Day", "2025-01-26", "National"),
    ] {
        holidays.create(&fixture.admin, input(name, date, kind)).await.unwrap();
    }
    let removed = holidays
        .create(&fixture.admin, input("Cancelled", "2024-08-01", "Optional"))
        .await
        .unwrap();
    holidays.delete(&fixture.admin, removed.id).await.unwrap();

    let year = HolidayFilter {
        year: Some(2024),
        ..Default::default()
    };
    let page = holidays.list(&year, PageRequest::default()).await.unwrap();
    let names: Vec<&str> = page.items.iter().map(|h| h.holiday_name.as_str()).collect();
    assert_eq!(names, vec!["Republic Day", "Independence Day", "Company Offsite"]);

    let august_national = HolidayFilter {
        year: Some(2024),
        month: Some(8),
        holiday_type: Some(HolidayType::National),
    };
    let page = holidays.list(&august_national, PageRequest::default()).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].holiday_name, "Independence Day");
}

#[tokio::test]
async fn test_upcoming_and_stats() {
    let fixture = Fixture::new().await;
    let holidays = &fixture.services.holidays;
    let today = Utc::now().date_naive();

    let past = today - Duration::days(10);
    holidays
        .create(&fixture.admin, input("Past", &past.to_string(), "Company"))
        .await
        .unwrap();
    for offset in [30, 10, 20, 40] {
        let date = today + Duration::days(offset);
        holidays
            .create(&fixture.admin, input(&format!("In {offset} days"), &date.to_string(), "National"))
            .await
            .unwrap();
    }

    let upcoming = holidays.upcoming(2).await.unwrap();
    let names: Vec<&str> = upcoming.iter().map(|h| h.holiday_name.as_str()).collect();
    assert_eq!(names, vec!["In 10 days", "In 20 days"]);

    let stats = holidays.stats(today.year()).await.unwrap();
    assert_eq!(stats.year, today.year());
    assert_eq!(stats.upcoming_holidays.len(), 3);
    assert_eq!(
        stats.total_holidays,
        stats.holidays_by_type.iter().map(|t| t.count).sum::<usize>()
    );

    let empty = holidays.stats(1990).await.unwrap();
    assert_eq!(empty.total_holidays, 0);
    assert!(empty.holidays_by_type.is_empty());
}
