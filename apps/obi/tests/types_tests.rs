//! Unit tests for API types serialization/deserialization.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::StatusCode;
use chrono::NaiveDate;
use obi::api::{
    CreateGraduationRequest, ErrorResponse, HealthResponse, HistoryQuery, RuleRequest, status_for,
};
use obi_core::{
    AcademyId, ClassId, ErrorKind, GraduationStatus, MemberId, ObiError, Rank,
};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// =============================================================================
// HEALTH / ERROR TESTS
// =============================================================================

#[test]
fn test_health_response_default() {
    let health = HealthResponse::default();
    assert_eq!(health.status, "ok");
    assert!(!health.version.is_empty());
}

#[test]
fn test_error_response_serialization() {
    let json = serde_json::to_string(&ErrorResponse::new("Member not found: 3")).unwrap();
    assert!(json.contains("\"success\":false"));
    assert!(json.contains("\"error\":\"Member not found: 3\""));
}

#[test]
fn test_status_mapping() {
    assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
    assert_eq!(status_for(ErrorKind::BadRequest), StatusCode::BAD_REQUEST);
    assert_eq!(status_for(ErrorKind::Conflict), StatusCode::CONFLICT);
    assert_eq!(
        status_for(ErrorKind::Internal),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
        status_for(ObiError::Conflict("slot taken".into()).kind()),
        StatusCode::CONFLICT
    );
}

// =============================================================================
// RULE REQUEST TESTS
// =============================================================================

#[test]
fn test_rule_request_optional_frequency() {
    let request: RuleRequest = serde_json::from_str(
        r#"{"min_classes":120,"min_months":12,"classes_per_degree":30}"#,
    )
    .unwrap();
    let rule = request.to_rule();
    assert_eq!(rule.min_classes, 120);
    assert_eq!(rule.min_weekly_frequency_tenths, None);

    let request: RuleRequest = serde_json::from_str(
        r#"{"min_classes":1,"min_months":2,"classes_per_degree":3,"min_weekly_frequency_tenths":25}"#,
    )
    .unwrap();
    assert_eq!(request.to_rule().min_weekly_frequency_tenths, Some(25));
}

// =============================================================================
// GRADUATION REQUEST TESTS
// =============================================================================

#[test]
fn test_create_graduation_defaults() {
    let request: CreateGraduationRequest = serde_json::from_str(
        r#"{"member":7,"belt":"blue","degree":0,"granted_by":1}"#,
    )
    .unwrap();
    let input = request
        .to_new_graduation(AcademyId(2), day(2026, 3, 1))
        .unwrap();

    assert_eq!(input.member, MemberId(7));
    assert_eq!(input.academy, AcademyId(2));
    assert_eq!(input.target, Rank::new("blue", 0));
    assert_eq!(input.decided_on, day(2026, 3, 1));
    assert_eq!(input.previous, None);
    assert!(!input.pending);
    assert!(!input.manual);
}

#[test]
fn test_create_graduation_full() {
    let request: CreateGraduationRequest = serde_json::from_str(
        r#"{
            "member": 7, "belt": "blue", "degree": 1, "granted_by": 1,
            "previous_belt": "blue", "previous_degree": 0,
            "decided_on": "2026-02-14", "class": 55, "notes": "open mat",
            "pending": true, "manual": true, "justification": "competition result"
        }"#,
    )
    .unwrap();
    let input = request
        .to_new_graduation(AcademyId(2), day(2026, 3, 1))
        .unwrap();

    assert_eq!(input.previous, Some(Rank::new("blue", 0)));
    assert_eq!(input.decided_on, day(2026, 2, 14));
    assert_eq!(input.class, Some(ClassId(55)));
    assert!(input.pending);
    assert_eq!(input.justification.as_deref(), Some("competition result"));
}

#[test]
fn test_create_graduation_half_previous_rejected() {
    let request: CreateGraduationRequest = serde_json::from_str(
        r#"{"member":7,"belt":"blue","degree":1,"granted_by":1,"previous_degree":0}"#,
    )
    .unwrap();
    assert!(matches!(
        request.to_new_graduation(AcademyId(2), day(2026, 3, 1)),
        Err(ObiError::InvalidInput(_))
    ));
}

// =============================================================================
// HISTORY QUERY TESTS
// =============================================================================

#[test]
fn test_history_query_to_filter() {
    let query = HistoryQuery {
        member: Some(4),
        from: Some(day(2026, 1, 1)),
        to: None,
        status: Some("confirmed".to_string()),
    };
    let filter = query.to_filter().unwrap();
    assert_eq!(filter.member, Some(MemberId(4)));
    assert_eq!(filter.from, Some(day(2026, 1, 1)));
    assert_eq!(filter.status, Some(GraduationStatus::Confirmed));
}

#[test]
fn test_history_query_unknown_status() {
    let query = HistoryQuery {
        status: Some("approved".to_string()),
        ..HistoryQuery::default()
    };
    assert!(query.to_filter().is_err());
}
