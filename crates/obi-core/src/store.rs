//! # Graduation Store
//!
//! The `GraduationStore` trait defines everything the engine persists:
//! rule rows, member rank state and graduation history.
//!
//! Two implementations share the same semantics:
//! - [`MemoryStore`]: `BTreeMap`s, volatile
//! - [`crate::storage::RedbStore`]: redb, ACID and persistent
//!
//! Both also mirror collaborator data (roster and attendance) so a
//! standalone deployment can serve the `Roster` and `AttendanceLedger`
//! traits from the same store.

use crate::attendance::{AttendanceEvent, AttendanceLedger};
use crate::directory::{Enrollment, MemberProfile, Roster, RosterEntry};
use crate::ingestor::{IngestSummary, Snapshot};
use crate::record::{GraduationDraft, GraduationRecord, GraduationStatus};
use crate::rules::GraduationRule;
use crate::{AcademyId, BeltSlug, ClassId, GraduationId, MemberId, ObiError, Rank};
use chrono::NaiveDate;
use std::collections::BTreeMap;

// =============================================================================
// GRADUATIONSTORE TRAIT
// =============================================================================

/// Persistence for rules, ranks and graduation records.
///
/// Invariants every implementation upholds:
/// - at most one non-cancelled record per (member, target rank); a second
///   insert fails with `ObiError::Conflict` inside the write
/// - a record becoming CONFIRMED and the member's rank update are one
///   atomic write
/// - cancelling never touches rank state
pub trait GraduationStore {
    /// Academy-scoped rule row.
    fn academy_rule(
        &self,
        academy: AcademyId,
        belt: &BeltSlug,
    ) -> Result<Option<GraduationRule>, ObiError>;

    /// Global default template row.
    fn template_rule(&self, belt: &BeltSlug) -> Result<Option<GraduationRule>, ObiError>;

    /// Insert or replace an academy-scoped rule.
    fn put_academy_rule(
        &mut self,
        academy: AcademyId,
        belt: &BeltSlug,
        rule: GraduationRule,
    ) -> Result<(), ObiError>;

    /// Insert or replace a template rule.
    fn put_template_rule(&mut self, belt: &BeltSlug, rule: GraduationRule)
    -> Result<(), ObiError>;

    /// Drop every academy rule and copy every template row into the
    /// academy. Returns the number of rows copied.
    fn reset_academy_rules(&mut self, academy: AcademyId) -> Result<usize, ObiError>;

    /// The member's current rank, `None` when unranked.
    fn current_rank(&self, member: MemberId) -> Result<Option<Rank>, ObiError>;

    /// Current ranks for many members at once. Unranked members are absent.
    fn current_ranks(&self, members: &[MemberId]) -> Result<BTreeMap<MemberId, Rank>, ObiError> {
        let mut out = BTreeMap::new();
        for member in members {
            if let Some(rank) = self.current_rank(*member)? {
                out.insert(*member, rank);
            }
        }
        Ok(out)
    }

    /// Allocate an id and insert the record. If the draft is CONFIRMED the
    /// member's rank is set to its target in the same write.
    fn insert_graduation(&mut self, draft: GraduationDraft) -> Result<GraduationRecord, ObiError>;

    /// Move a record to `to`, checking the status machine. Confirming
    /// applies the rank in the same write; cancelling releases the
    /// unique-target slot.
    fn transition_graduation(
        &mut self,
        id: GraduationId,
        to: GraduationStatus,
    ) -> Result<GraduationRecord, ObiError>;

    fn graduation(&self, id: GraduationId) -> Result<Option<GraduationRecord>, ObiError>;

    /// The non-cancelled record holding the (member, rank) slot, if any.
    fn active_graduation_for(
        &self,
        member: MemberId,
        rank: &Rank,
    ) -> Result<Option<GraduationId>, ObiError>;

    /// Full history of a member across academies, ordered by id.
    fn graduations_for_member(&self, member: MemberId)
    -> Result<Vec<GraduationRecord>, ObiError>;

    /// Histories for many members at once.
    fn graduations_for_members(
        &self,
        members: &[MemberId],
    ) -> Result<BTreeMap<MemberId, Vec<GraduationRecord>>, ObiError> {
        let mut out = BTreeMap::new();
        for member in members {
            out.insert(*member, self.graduations_for_member(*member)?);
        }
        Ok(out)
    }

    /// Every record granted by an academy, ordered by id.
    fn graduations_for_academy(
        &self,
        academy: AcademyId,
    ) -> Result<Vec<GraduationRecord>, ObiError>;
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// In-memory store. Uses `BTreeMap` exclusively for deterministic ordering.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    academy_rules: BTreeMap<(AcademyId, BeltSlug), GraduationRule>,
    template_rules: BTreeMap<BeltSlug, GraduationRule>,
    ranks: BTreeMap<MemberId, Rank>,
    records: BTreeMap<GraduationId, GraduationRecord>,
    /// Unique (member, target) slot for non-cancelled records.
    targets: BTreeMap<(MemberId, Rank), GraduationId>,
    /// Ids start at 1.
    last_graduation_id: u64,

    members: BTreeMap<MemberId, MemberProfile>,
    enrollments: BTreeMap<(AcademyId, MemberId), Enrollment>,
    /// (member, class date, class) -> confirmed
    attendance: BTreeMap<(MemberId, NaiveDate, ClassId), bool>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a member's rank directly. Used for provisioning only; graduations
    /// go through [`GraduationStore::insert_graduation`].
    pub fn assign_rank(&mut self, member: MemberId, rank: Rank) {
        self.ranks.insert(member, rank);
    }

    /// Mirror a validated collaborator snapshot.
    pub fn ingest_snapshot(&mut self, snapshot: &Snapshot) -> IngestSummary {
        let mut summary = IngestSummary::default();

        for member in &snapshot.members {
            self.members.insert(member.id, member.clone());
            summary.members += 1;
        }
        for enrollment in &snapshot.enrollments {
            self.enrollments
                .insert((enrollment.academy, enrollment.member), enrollment.clone());
            summary.enrollments += 1;
        }
        for event in &snapshot.attendance {
            self.record_attendance(event);
            summary.attendance += 1;
        }
        for seed in &snapshot.ranks {
            if self.ranks.contains_key(&seed.member) {
                summary.ranks_skipped += 1;
            } else {
                self.ranks.insert(seed.member, seed.rank.clone());
                summary.ranks_seeded += 1;
            }
        }

        summary
    }

    fn record_attendance(&mut self, event: &AttendanceEvent) {
        self.attendance
            .insert((event.member, event.class_date, event.class), event.confirmed);
    }
}

impl GraduationStore for MemoryStore {
    fn academy_rule(
        &self,
        academy: AcademyId,
        belt: &BeltSlug,
    ) -> Result<Option<GraduationRule>, ObiError> {
        Ok(self.academy_rules.get(&(academy, belt.clone())).copied())
    }

    fn template_rule(&self, belt: &BeltSlug) -> Result<Option<GraduationRule>, ObiError> {
        Ok(self.template_rules.get(belt).copied())
    }

    fn put_academy_rule(
        &mut self,
        academy: AcademyId,
        belt: &BeltSlug,
        rule: GraduationRule,
    ) -> Result<(), ObiError> {
        self.academy_rules.insert((academy, belt.clone()), rule);
        Ok(())
    }

    fn put_template_rule(
        &mut self,
        belt: &BeltSlug,
        rule: GraduationRule,
    ) -> Result<(), ObiError> {
        self.template_rules.insert(belt.clone(), rule);
        Ok(())
    }

    fn reset_academy_rules(&mut self, academy: AcademyId) -> Result<usize, ObiError> {
        self.academy_rules.retain(|(a, _), _| *a != academy);
        for (belt, rule) in &self.template_rules {
            self.academy_rules.insert((academy, belt.clone()), *rule);
        }
        Ok(self.template_rules.len())
    }

    fn current_rank(&self, member: MemberId) -> Result<Option<Rank>, ObiError> {
        Ok(self.ranks.get(&member).cloned())
    }

    fn insert_graduation(&mut self, draft: GraduationDraft) -> Result<GraduationRecord, ObiError> {
        let slot = (draft.member(), draft.target().clone());
        if self.targets.contains_key(&slot) {
            return Err(ObiError::Conflict(format!(
                "member {} already holds a graduation to {}",
                slot.0, slot.1
            )));
        }

        self.last_graduation_id = self.last_graduation_id.saturating_add(1);
        let id = GraduationId(self.last_graduation_id);
        let record = draft.into_record(id);

        if record.status == GraduationStatus::Confirmed {
            self.ranks.insert(record.member, record.target.clone());
        }
        self.targets.insert(slot, id);
        self.records.insert(id, record.clone());
        Ok(record)
    }

    fn transition_graduation(
        &mut self,
        id: GraduationId,
        to: GraduationStatus,
    ) -> Result<GraduationRecord, ObiError> {
        let record = self
            .records
            .get_mut(&id)
            .ok_or(ObiError::GraduationNotFound(id))?;
        record.status.check_transition(id, to)?;
        record.status = to;

        match to {
            GraduationStatus::Confirmed => {
                self.ranks.insert(record.member, record.target.clone());
            }
            GraduationStatus::Cancelled => {
                self.targets.remove(&(record.member, record.target.clone()));
            }
            GraduationStatus::Pending => {}
        }
        Ok(record.clone())
    }

    fn graduation(&self, id: GraduationId) -> Result<Option<GraduationRecord>, ObiError> {
        Ok(self.records.get(&id).cloned())
    }

    fn active_graduation_for(
        &self,
        member: MemberId,
        rank: &Rank,
    ) -> Result<Option<GraduationId>, ObiError> {
        Ok(self.targets.get(&(member, rank.clone())).copied())
    }

    fn graduations_for_member(
        &self,
        member: MemberId,
    ) -> Result<Vec<GraduationRecord>, ObiError> {
        Ok(self
            .records
            .values()
            .filter(|r| r.member == member)
            .cloned()
            .collect())
    }

    fn graduations_for_academy(
        &self,
        academy: AcademyId,
    ) -> Result<Vec<GraduationRecord>, ObiError> {
        Ok(self
            .records
            .values()
            .filter(|r| r.academy == academy)
            .cloned()
            .collect())
    }
}

impl Roster for MemoryStore {
    fn member(&self, member: MemberId) -> Result<Option<MemberProfile>, ObiError> {
        Ok(self.members.get(&member).cloned())
    }

    fn enrollment(
        &self,
        member: MemberId,
        academy: AcademyId,
    ) -> Result<Option<Enrollment>, ObiError> {
        Ok(self.enrollments.get(&(academy, member)).cloned())
    }

    fn active_members(&self, academy: AcademyId) -> Result<Vec<RosterEntry>, ObiError> {
        Ok(self
            .enrollments
            .range((academy, MemberId(0))..=(academy, MemberId(u64::MAX)))
            .filter(|(_, e)| e.is_active())
            .filter_map(|((_, member), enrollment)| {
                self.members.get(member).map(|profile| RosterEntry {
                    profile: profile.clone(),
                    enrollment: enrollment.clone(),
                })
            })
            .collect())
    }
}

impl AttendanceLedger for MemoryStore {
    fn count_confirmed_attendance(
        &self,
        member: MemberId,
        since: NaiveDate,
    ) -> Result<u32, ObiError> {
        let Some(start) = since.succ_opt() else {
            return Ok(0);
        };
        let count = self
            .attendance
            .range((member, start, ClassId(0))..=(member, NaiveDate::MAX, ClassId(u64::MAX)))
            .filter(|(_, confirmed)| **confirmed)
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}

// =============================================================================
// TESTS
// =============================================================================
