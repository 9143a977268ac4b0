//! # Property-Based Tests
//!
//! Scoring invariants and roster scan ordering, checked with proptest.

use chrono::{Days, NaiveDate};
use obi_core::scoring::{belt_progress_bp, classify, degree_progress_bp, percent};
use obi_core::{
    AcademyId, AttendanceEvent, BeltSlug, ClassId, Engine, Enrollment, EnrollmentStatus,
    GraduationRule, MemberId, MemberProfile, Rank, RankSeed, ReadinessStatus, Snapshot,
};
use proptest::collection::vec;
use proptest::prelude::*;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or(NaiveDate::MIN)
}

// =============================================================================
// SCORING PROPERTIES
// =============================================================================

proptest! {
    /// Meeting the per-degree target always means READY at 100%.
    #[test]
    fn degree_target_met_is_ready(per_degree in 1u32..500, extra in 0u32..500) {
        let bp = degree_progress_bp(per_degree + extra, per_degree);
        prop_assert_eq!(classify(bp), ReadinessStatus::Ready);
        prop_assert_eq!(percent(bp), 100);
    }

    /// Zero classes against a non-zero target is zero progress.
    #[test]
    fn zero_classes_is_zero_progress(per_degree in 1u32..500) {
        let bp = degree_progress_bp(0, per_degree);
        prop_assert_eq!(percent(bp), 0);
        prop_assert_eq!(classify(bp), ReadinessStatus::Blocked);
    }

    /// Progress never exceeds 100% and grows with attendance.
    #[test]
    fn belt_progress_bounded_and_monotonic(
        classes in 0u32..1000,
        min_classes in 0u32..500,
        months in 0u32..60,
        min_months in 0u32..36,
    ) {
        let bp = belt_progress_bp(classes, min_classes, months, min_months);
        let more = belt_progress_bp(classes + 1, min_classes, months, min_months);
        prop_assert!(bp <= 10_000);
        prop_assert!(more >= bp);
        prop_assert!(percent(bp) <= 100);
    }

    /// The reported percent is the band's progress rounded to the nearest whole.
    #[test]
    fn percent_agrees_with_band(bp in 0u64..=10_000) {
        let p = percent(bp);
        prop_assert_eq!(u64::from(p), (bp + 50) / 100);
        match classify(bp) {
            ReadinessStatus::Ready => prop_assert_eq!(p, 100),
            ReadinessStatus::Approaching => prop_assert!((80..=100).contains(&p)),
            _ => prop_assert!(p <= 80),
        }
    }
}

// =============================================================================
// SCAN PROPERTIES
// =============================================================================

fn roster_engine(classes: &[u32]) -> Engine {
    let mut engine = Engine::default();
    engine
        .set_template_rule(&BeltSlug::new("white"), GraduationRule::new(120, 12, 20))
        .expect("template");

    let mut snapshot = Snapshot::default();
    for (i, count) in classes.iter().enumerate() {
        let member = MemberId(i as u64 + 1);
        snapshot.members.push(MemberProfile {
            id: member,
            name: format!("m{}", member),
        });
        snapshot.enrollments.push(Enrollment {
            member,
            academy: AcademyId(1),
            status: EnrollmentStatus::Active,
            started_on: Some(start()),
        });
        snapshot.ranks.push(RankSeed {
            member,
            rank: Rank::new("white", 0),
        });
        for c in 0..*count {
            snapshot.attendance.push(AttendanceEvent {
                member,
                class: ClassId(u64::from(c)),
                class_date: start() + Days::new(u64::from(c) + 1),
                confirmed: true,
            });
        }
    }
    engine.ingest(&snapshot).expect("ingest");
    engine
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// The scan never surfaces BLOCKED members and keeps its ordering.
    #[test]
    fn scan_filters_and_orders(classes in vec(0u32..30, 1..20)) {
        let engine = roster_engine(&classes);
        let as_of = start() + Days::new(365);
        let results = engine.scan_roster_at(AcademyId(1), as_of).expect("scan");

        prop_assert!(results.iter().all(|r| r.status.is_actionable()));

        let expected = classes.iter().filter(|&&c| c * 100 / 20 >= 80).count();
        prop_assert_eq!(results.len(), expected);

        for pair in results.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if a.status == b.status {
                prop_assert!(a.progress_percent >= b.progress_percent);
            } else {
                prop_assert_eq!(a.status, ReadinessStatus::Ready);
                prop_assert_eq!(b.status, ReadinessStatus::Approaching);
            }
        }
    }
}
