//! # Eligibility Evaluator
//!
//! Produces a readiness verdict for one member at one academy.
//!
//! Evaluation order:
//! 1. Member must be known to the roster (`MemberNotFound`)
//! 2. Member must hold a rank (`Unranked`)
//! 3. A rule must be configured for the current belt (`NoRuleConfigured`)
//! 4. Reference dates come from confirmed history, then enrollment start,
//!    then the sentinel
//! 5. Attendance is counted since each reference date and scored
//!
//! The single-member path never substitutes the fallback rule.

use crate::attendance::AttendanceLedger;
use crate::belt::BeltLadder;
use crate::directory::{EnrollmentStatus, MemberProfile, Roster};
use crate::primitives::epoch_sentinel;
use crate::record::{GraduationRecord, GraduationStatus};
use crate::rules::{ResolvedRule, RuleResolver, RuleSource};
use crate::scoring::{
    self, Assessment, EligibilityMetrics, Observation, ReadinessStatus, TargetKind,
};
use crate::store::GraduationStore;
use crate::{AcademyId, MemberId, ObiError, Rank};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Verdict for one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityResult {
    pub member: MemberId,
    pub member_name: String,
    pub academy: AcademyId,
    /// `None` when the member has no enrollment at this academy.
    pub enrollment_status: Option<EnrollmentStatus>,
    pub current: Rank,
    pub target_kind: TargetKind,
    pub target: Rank,
    pub status: ReadinessStatus,
    pub progress_percent: u8,
    pub reasons: Vec<String>,
    pub metrics: EligibilityMetrics,
    pub rule_source: RuleSource,
}

impl EligibilityResult {
    pub(crate) fn build(
        profile: &MemberProfile,
        academy: AcademyId,
        enrollment_status: Option<EnrollmentStatus>,
        current: Rank,
        resolved: &ResolvedRule,
        assessment: Assessment,
    ) -> Self {
        Self {
            member: profile.id,
            member_name: profile.name.clone(),
            academy,
            enrollment_status,
            current,
            target_kind: assessment.target_kind,
            target: assessment.target,
            status: assessment.status,
            progress_percent: scoring::percent(assessment.progress_bp),
            reasons: assessment.reasons,
            metrics: assessment.metrics,
            rule_source: resolved.source,
        }
    }
}

// =============================================================================
// REFERENCE DATES
// =============================================================================

/// The two dates attendance is counted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceDates {
    /// Last confirmed grant of the current belt and degree.
    pub since_degree: NaiveDate,
    /// Last confirmed grant of the current belt at degree 0.
    pub since_belt: NaiveDate,
}

impl ReferenceDates {
    /// Derive reference dates from a member's history (all academies).
    #[must_use]
    pub fn from_history(
        history: &[GraduationRecord],
        current: &Rank,
        enrollment_start: Option<NaiveDate>,
    ) -> Self {
        let fallback = enrollment_start.unwrap_or_else(epoch_sentinel);
        let latest = |wanted: &Rank| {
            history
                .iter()
                .filter(|r| r.status == GraduationStatus::Confirmed && &r.target == wanted)
                .map(|r| r.decided_on)
                .max()
        };
        let belt_entry = Rank {
            belt: current.belt.clone(),
            degree: 0,
        };

        Self {
            since_degree: latest(current).unwrap_or(fallback),
            since_belt: latest(&belt_entry).unwrap_or(fallback),
        }
    }
}

// =============================================================================
// EVALUATOR
// =============================================================================

/// Single-member eligibility evaluation.
pub struct Evaluator;

impl Evaluator {
    /// Evaluate `member` at `academy` as of `as_of`.
    pub fn evaluate<S, R, A>(
        store: &S,
        roster: &R,
        ledger: &A,
        ladder: &BeltLadder,
        member: MemberId,
        academy: AcademyId,
        as_of: NaiveDate,
    ) -> Result<EligibilityResult, ObiError>
    where
        S: GraduationStore + ?Sized,
        R: Roster + ?Sized,
        A: AttendanceLedger + ?Sized,
    {
        let profile = roster
            .member(member)?
            .ok_or(ObiError::MemberNotFound(member))?;
        let current = store
            .current_rank(member)?
            .ok_or(ObiError::Unranked(member))?;
        let resolved = RuleResolver::resolve(store, academy, &current.belt)?;

        let enrollment = roster.enrollment(member, academy)?;
        let history = store.graduations_for_member(member)?;
        let refs = ReferenceDates::from_history(
            &history,
            &current,
            enrollment.as_ref().and_then(|e| e.started_on),
        );

        let classes_since_degree = ledger.count_confirmed_attendance(member, refs.since_degree)?;
        let classes_since_belt = ledger.count_confirmed_attendance(member, refs.since_belt)?;

        let assessment = scoring::assess(
            ladder,
            Observation {
                current: &current,
                rule: &resolved.rule,
                classes_since_degree,
                classes_since_belt,
                belt_entry: refs.since_belt,
                as_of,
            },
        )?;

        Ok(EligibilityResult::build(
            &profile,
            academy,
            enrollment.map(|e| e.status),
            current,
            &resolved,
            assessment,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClassId, GraduationId};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn record(id: u64, target: Rank, on: NaiveDate, status: GraduationStatus) -> GraduationRecord {
        GraduationRecord {
            id: GraduationId(id),
            member: MemberId(1),
            academy: AcademyId(1),
            previous: None,
            target,
            decided_on: on,
            granted_by: MemberId(9),
            class: Some(ClassId(1)),
            notes: None,
            manual: false,
            justification: None,
            status,
        }
    }

    #[test]
    fn reference_dates_use_latest_confirmed() {
        let current = Rank::new("blue", 2);
        let history = vec![
            record(1, Rank::new("blue", 0), date(2024, 1, 1), GraduationStatus::Confirmed),
            record(2, Rank::new("blue", 2), date(2025, 1, 1), GraduationStatus::Confirmed),
            record(3, Rank::new("blue", 2), date(2025, 6, 1), GraduationStatus::Cancelled),
            record(4, Rank::new("blue", 2), date(2025, 3, 1), GraduationStatus::Confirmed),
        ];
        let refs = ReferenceDates::from_history(&history, &current, None);
        assert_eq!(refs.since_degree, date(2025, 3, 1));
        assert_eq!(refs.since_belt, date(2024, 1, 1));
    }

    #[test]
    fn reference_dates_fall_back_to_enrollment_then_sentinel() {
        let current = Rank::new("white", 0);
        let refs = ReferenceDates::from_history(&[], &current, Some(date(2025, 5, 5)));
        assert_eq!(refs.since_degree, date(2025, 5, 5));
        assert_eq!(refs.since_belt, date(2025, 5, 5));

        let refs = ReferenceDates::from_history(&[], &current, None);
        assert_eq!(refs.since_belt, epoch_sentinel());
    }

    #[test]
    fn pending_grant_is_not_a_reference() {
        let current = Rank::new("white", 1);
        let history = vec![record(
            1,
            Rank::new("white", 1),
            date(2025, 1, 1),
            GraduationStatus::Pending,
        )];
        let refs = ReferenceDates::from_history(&history, &current, None);
        assert_eq!(refs.since_degree, epoch_sentinel());
    }
}
