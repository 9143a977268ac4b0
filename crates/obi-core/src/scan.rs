//! # Roster Scanner
//!
//! Evaluates every active, ranked member of an academy in one pass and
//! keeps only the members worth a staff member's attention.
//!
//! Reads are batched: one roster read, one rank read, one history read and
//! one attendance read per academy. Scoring goes through the same
//! [`crate::scoring::assess`] as the single-member evaluator.
//!
//! Unlike the evaluator, a belt without any configured rule falls back to
//! the hard constants, and a member that cannot be scored is skipped with a
//! log line instead of failing the scan.

use crate::attendance::AttendanceLedger;
use crate::belt::BeltLadder;
use crate::directory::Roster;
use crate::evaluator::{EligibilityResult, ReferenceDates};
use crate::rules::{ResolvedRule, RuleResolver, RuleSource};
use crate::scoring::{self, Observation, ReadinessStatus};
use crate::store::GraduationStore;
use crate::{AcademyId, BeltSlug, MemberId, ObiError};
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Batched roster evaluation.
pub struct RosterScanner;

impl RosterScanner {
    /// Scan `academy` as of `as_of`.
    ///
    /// Returns READY and APPROACHING members only, READY first, then by
    /// descending progress, then by member id.
    pub fn scan<S, R, A>(
        store: &S,
        roster: &R,
        ledger: &A,
        ladder: &BeltLadder,
        academy: AcademyId,
        as_of: NaiveDate,
    ) -> Result<Vec<EligibilityResult>, ObiError>
    where
        S: GraduationStore + ?Sized,
        R: Roster + ?Sized,
        A: AttendanceLedger + ?Sized,
    {
        let entries = roster.active_members(academy)?;
        let ids: Vec<MemberId> = entries.iter().map(|e| e.profile.id).collect();
        let ranks = store.current_ranks(&ids)?;
        let ranked: Vec<MemberId> = ids.into_iter().filter(|id| ranks.contains_key(id)).collect();
        let histories = store.graduations_for_members(&ranked)?;

        let mut rules: BTreeMap<BeltSlug, ResolvedRule> = BTreeMap::new();
        let mut pending = Vec::new();
        let mut queries = Vec::new();

        for entry in &entries {
            let member = entry.profile.id;
            let Some(current) = ranks.get(&member) else {
                continue;
            };
            if ladder.get(&current.belt).is_none() {
                tracing::warn!(
                    member = %member,
                    belt = %current.belt,
                    "skipping member whose belt is not in the ladder"
                );
                continue;
            }

            let resolved = match rules.get(&current.belt) {
                Some(resolved) => *resolved,
                None => {
                    let resolved =
                        RuleResolver::resolve_or_fallback(store, academy, &current.belt)?;
                    if resolved.source == RuleSource::Fallback {
                        tracing::debug!(
                            academy = %academy,
                            belt = %current.belt,
                            "no rule configured, using fallback constants"
                        );
                    }
                    rules.insert(current.belt.clone(), resolved);
                    resolved
                }
            };

            let history = histories.get(&member).map(Vec::as_slice).unwrap_or(&[]);
            let refs = ReferenceDates::from_history(history, current, entry.enrollment.started_on);
            queries.push((member, refs.since_degree));
            queries.push((member, refs.since_belt));
            pending.push((entry, current, resolved, refs));
        }

        let counts = ledger.count_confirmed_attendance_batch(&queries)?;
        if counts.len() != queries.len() {
            return Err(ObiError::IoError(format!(
                "attendance ledger answered {} of {} queries",
                counts.len(),
                queries.len()
            )));
        }

        let mut results = Vec::new();
        for ((entry, current, resolved, refs), pair) in pending.into_iter().zip(counts.chunks(2)) {
            let &[classes_since_degree, classes_since_belt] = pair else {
                continue;
            };
            let assessment = match scoring::assess(
                ladder,
                Observation {
                    current,
                    rule: &resolved.rule,
                    classes_since_degree,
                    classes_since_belt,
                    belt_entry: refs.since_belt,
                    as_of,
                },
            ) {
                Ok(assessment) => assessment,
                Err(e) => {
                    tracing::warn!(
                        member = %entry.profile.id,
                        error = %e,
                        "skipping unevaluable member"
                    );
                    continue;
                }
            };
            if !assessment.status.is_actionable() {
                continue;
            }
            results.push(EligibilityResult::build(
                &entry.profile,
                academy,
                Some(entry.enrollment.status),
                current.clone(),
                &resolved,
                assessment,
            ));
        }

        results.sort_by(compare_results);
        tracing::debug!(academy = %academy, surfaced = results.len(), "roster scan complete");
        Ok(results)
    }
}

fn status_rank(status: ReadinessStatus) -> u8 {
    match status {
        ReadinessStatus::Ready => 0,
        ReadinessStatus::Approaching => 1,
        ReadinessStatus::Blocked => 2,
        ReadinessStatus::MaxRank => 3,
    }
}

/// READY first, then descending progress, then ascending member id.
fn compare_results(a: &EligibilityResult, b: &EligibilityResult) -> Ordering {
    status_rank(a.status)
        .cmp(&status_rank(b.status))
        .then_with(|| b.progress_percent.cmp(&a.progress_percent))
        .then_with(|| a.member.cmp(&b.member))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::AttendanceEvent;
    use crate::directory::{Enrollment, EnrollmentStatus, MemberProfile};
    use crate::ingestor::{RankSeed, Snapshot};
    use crate::rules::GraduationRule;
    use crate::store::MemoryStore;
    use crate::{ClassId, Rank};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    /// Members 1..=n at white/0, enrolled 2026-01-01, member i with `classes[i]`
    /// confirmed classes.
    fn roster(classes: &[u32]) -> MemoryStore {
        let mut store = MemoryStore::new();
        let mut snapshot = Snapshot::default();
        for (i, count) in classes.iter().enumerate() {
            let member = MemberId(i as u64 + 1);
            snapshot.members.push(MemberProfile {
                id: member,
                name: format!("member-{}", member),
            });
            snapshot.enrollments.push(Enrollment {
                member,
                academy: AcademyId(1),
                status: EnrollmentStatus::Active,
                started_on: Some(date(2026, 1, 1)),
            });
            snapshot.ranks.push(RankSeed {
                member,
                rank: Rank::new("white", 0),
            });
            for c in 0..*count {
                snapshot.attendance.push(AttendanceEvent {
                    member,
                    class: ClassId(u64::from(c)),
                    class_date: date(2026, 2, 1) + chrono::Days::new(u64::from(c)),
                    confirmed: true,
                });
            }
        }
        store.ingest_snapshot(&snapshot);
        store
    }

    #[test]
    fn blocked_members_are_dropped_and_order_holds() {
        let mut store = roster(&[10, 30, 24, 27, 5]);
        store
            .put_template_rule(&BeltSlug::new("white"), GraduationRule::new(100, 12, 30))
            .expect("template");

        let results = RosterScanner::scan(
            &store,
            &store,
            &store,
            &BeltLadder::standard(),
            AcademyId(1),
            date(2026, 6, 1),
        )
        .expect("scan");

        let members: Vec<u64> = results.iter().map(|r| r.member.0).collect();
        // 30/30 ready, 27/30 = 90%, 24/30 = 80%; 10 and 5 are blocked.
        assert_eq!(members, vec![2, 4, 3]);
        assert_eq!(results[0].status, ReadinessStatus::Ready);
        assert!(results.iter().all(|r| r.status.is_actionable()));
    }

    #[test]
    fn missing_rule_uses_fallback() {
        let store = roster(&[25]);
        let results = RosterScanner::scan(
            &store,
            &store,
            &store,
            &BeltLadder::standard(),
            AcademyId(1),
            date(2026, 6, 1),
        )
        .expect("scan");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].rule_source, RuleSource::Fallback);
        assert_eq!(results[0].progress_percent, 100);
    }

    #[test]
    fn unknown_belt_is_skipped() {
        let mut store = roster(&[30, 30]);
        store.assign_rank(MemberId(1), Rank::new("custom-slug", 0));
        let results = RosterScanner::scan(
            &store,
            &store,
            &store,
            &BeltLadder::standard(),
            AcademyId(1),
            date(2026, 6, 1),
        )
        .expect("scan");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].member, MemberId(2));
    }
}
