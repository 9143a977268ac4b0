//! # Engine
//!
//! The operation surface of Obi, combining a storage backend with the belt
//! ladder.
//!
//! ## Storage Backends
//!
//! The engine supports two storage backends:
//! - `InMemory`: Uses [`MemoryStore`] (fast, volatile)
//! - `Persistent`: Uses [`RedbStore`] for disk-backed ACID storage
//!
//! Both backends also serve the collaborator traits (`Roster`,
//! `AttendanceLedger`) from mirrored snapshot data.

use crate::attendance::AttendanceLedger;
use crate::belt::{Belt, BeltLadder};
use crate::directory::{Enrollment, MemberProfile, Roster, RosterEntry};
use crate::evaluator::{EligibilityResult, Evaluator};
use crate::ingestor::{IngestSummary, Ingestor, Snapshot};
use crate::lifecycle::Lifecycle;
use crate::record::{
    GraduationDraft, GraduationFilter, GraduationRecord, GraduationStatus, NewGraduation,
};
use crate::rules::{GraduationRule, RuleResolver, RuleView};
use crate::scan::RosterScanner;
use crate::storage::RedbStore;
use crate::store::{GraduationStore, MemoryStore};
use crate::{AcademyId, BeltSlug, GraduationId, MemberId, ObiError, Rank};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::Path;

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// Storage backend for an Engine.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory store (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed store using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

// NOTE: StorageBackend does NOT implement Clone.
// RedbStore (database handle) cannot be safely cloned.

macro_rules! dispatch {
    ($backend:expr, $store:ident => $body:expr) => {
        match $backend {
            StorageBackend::InMemory($store) => $body,
            StorageBackend::Persistent($store) => $body,
        }
    };
}

impl StorageBackend {
    fn ingest_snapshot(&mut self, snapshot: &Snapshot) -> Result<IngestSummary, ObiError> {
        match self {
            Self::InMemory(store) => Ok(store.ingest_snapshot(snapshot)),
            Self::Persistent(store) => store.ingest_snapshot(snapshot),
        }
    }
}

impl GraduationStore for StorageBackend {
    fn academy_rule(
        &self,
        academy: AcademyId,
        belt: &BeltSlug,
    ) -> Result<Option<GraduationRule>, ObiError> {
        dispatch!(self, s => s.academy_rule(academy, belt))
    }

    fn template_rule(&self, belt: &BeltSlug) -> Result<Option<GraduationRule>, ObiError> {
        dispatch!(self, s => s.template_rule(belt))
    }

    fn put_academy_rule(
        &mut self,
        academy: AcademyId,
        belt: &BeltSlug,
        rule: GraduationRule,
    ) -> Result<(), ObiError> {
        dispatch!(self, s => s.put_academy_rule(academy, belt, rule))
    }

    fn put_template_rule(
        &mut self,
        belt: &BeltSlug,
        rule: GraduationRule,
    ) -> Result<(), ObiError> {
        dispatch!(self, s => s.put_template_rule(belt, rule))
    }

    fn reset_academy_rules(&mut self, academy: AcademyId) -> Result<usize, ObiError> {
        dispatch!(self, s => s.reset_academy_rules(academy))
    }

    fn current_rank(&self, member: MemberId) -> Result<Option<Rank>, ObiError> {
        dispatch!(self, s => s.current_rank(member))
    }

    fn current_ranks(&self, members: &[MemberId]) -> Result<BTreeMap<MemberId, Rank>, ObiError> {
        dispatch!(self, s => s.current_ranks(members))
    }

    fn insert_graduation(&mut self, draft: GraduationDraft) -> Result<GraduationRecord, ObiError> {
        dispatch!(self, s => s.insert_graduation(draft))
    }

    fn transition_graduation(
        &mut self,
        id: GraduationId,
        to: GraduationStatus,
    ) -> Result<GraduationRecord, ObiError> {
        dispatch!(self, s => s.transition_graduation(id, to))
    }

    fn graduation(&self, id: GraduationId) -> Result<Option<GraduationRecord>, ObiError> {
        dispatch!(self, s => s.graduation(id))
    }

    fn active_graduation_for(
        &self,
        member: MemberId,
        rank: &Rank,
    ) -> Result<Option<GraduationId>, ObiError> {
        dispatch!(self, s => s.active_graduation_for(member, rank))
    }

    fn graduations_for_member(
        &self,
        member: MemberId,
    ) -> Result<Vec<GraduationRecord>, ObiError> {
        dispatch!(self, s => s.graduations_for_member(member))
    }

    fn graduations_for_members(
        &self,
        members: &[MemberId],
    ) -> Result<BTreeMap<MemberId, Vec<GraduationRecord>>, ObiError> {
        dispatch!(self, s => s.graduations_for_members(members))
    }

    fn graduations_for_academy(
        &self,
        academy: AcademyId,
    ) -> Result<Vec<GraduationRecord>, ObiError> {
        dispatch!(self, s => s.graduations_for_academy(academy))
    }
}

impl Roster for StorageBackend {
    fn member(&self, member: MemberId) -> Result<Option<MemberProfile>, ObiError> {
        dispatch!(self, s => s.member(member))
    }

    fn enrollment(
        &self,
        member: MemberId,
        academy: AcademyId,
    ) -> Result<Option<Enrollment>, ObiError> {
        dispatch!(self, s => s.enrollment(member, academy))
    }

    fn active_members(&self, academy: AcademyId) -> Result<Vec<RosterEntry>, ObiError> {
        dispatch!(self, s => s.active_members(academy))
    }
}

impl AttendanceLedger for StorageBackend {
    fn count_confirmed_attendance(
        &self,
        member: MemberId,
        since: NaiveDate,
    ) -> Result<u32, ObiError> {
        dispatch!(self, s => s.count_confirmed_attendance(member, since))
    }

    fn count_confirmed_attendance_batch(
        &self,
        queries: &[(MemberId, NaiveDate)],
    ) -> Result<Vec<u32>, ObiError> {
        dispatch!(self, s => s.count_confirmed_attendance_batch(queries))
    }
}

// =============================================================================
// ENGINE
// =============================================================================

/// Today's date in UTC, used when no explicit evaluation date is given.
#[must_use]
pub fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

/// The graduation engine.
///
/// Note: Engine does NOT implement Clone (see `StorageBackend`).
#[derive(Debug, Default)]
pub struct Engine {
    backend: StorageBackend,
    ladder: BeltLadder,
}

impl Engine {
    /// Create an engine with in-memory storage.
    #[must_use]
    pub fn in_memory(ladder: BeltLadder) -> Self {
        Self {
            backend: StorageBackend::InMemory(MemoryStore::new()),
            ladder,
        }
    }

    /// Create an engine over an existing in-memory store.
    #[must_use]
    pub fn with_store(store: MemoryStore, ladder: BeltLadder) -> Self {
        Self {
            backend: StorageBackend::InMemory(store),
            ladder,
        }
    }

    /// Create an engine with persistent redb storage.
    ///
    /// Opens or creates a redb database at the given path.
    pub fn with_redb(path: impl AsRef<Path>, ladder: BeltLadder) -> Result<Self, ObiError> {
        Ok(Self {
            backend: StorageBackend::Persistent(RedbStore::open(path)?),
            ladder,
        })
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    #[must_use]
    pub fn ladder(&self) -> &BeltLadder {
        &self.ladder
    }

    // -------------------------------------------------------------------------
    // Evaluation
    // -------------------------------------------------------------------------

    /// Evaluate one member as of today.
    pub fn evaluate_member(
        &self,
        member: MemberId,
        academy: AcademyId,
    ) -> Result<EligibilityResult, ObiError> {
        self.evaluate_member_at(member, academy, today())
    }

    pub fn evaluate_member_at(
        &self,
        member: MemberId,
        academy: AcademyId,
        as_of: NaiveDate,
    ) -> Result<EligibilityResult, ObiError> {
        Evaluator::evaluate(
            &self.backend,
            &self.backend,
            &self.backend,
            &self.ladder,
            member,
            academy,
            as_of,
        )
    }

    /// Scan an academy's roster as of today.
    pub fn scan_roster(&self, academy: AcademyId) -> Result<Vec<EligibilityResult>, ObiError> {
        self.scan_roster_at(academy, today())
    }

    pub fn scan_roster_at(
        &self,
        academy: AcademyId,
        as_of: NaiveDate,
    ) -> Result<Vec<EligibilityResult>, ObiError> {
        RosterScanner::scan(
            &self.backend,
            &self.backend,
            &self.backend,
            &self.ladder,
            academy,
            as_of,
        )
    }

    // -------------------------------------------------------------------------
    // Graduation records
    // -------------------------------------------------------------------------

    pub fn create_graduation(&mut self, input: NewGraduation) -> Result<GraduationRecord, ObiError> {
        Lifecycle::create(&mut self.backend, &self.ladder, input)
    }

    pub fn confirm_graduation(&mut self, id: GraduationId) -> Result<GraduationRecord, ObiError> {
        Lifecycle::confirm(&mut self.backend, id)
    }

    pub fn cancel_graduation(&mut self, id: GraduationId) -> Result<(), ObiError> {
        Lifecycle::cancel(&mut self.backend, id)
    }

    pub fn graduation(&self, id: GraduationId) -> Result<GraduationRecord, ObiError> {
        Lifecycle::get(&self.backend, id)
    }

    pub fn list_graduations(
        &self,
        academy: AcademyId,
        filter: &GraduationFilter,
    ) -> Result<Vec<GraduationRecord>, ObiError> {
        Lifecycle::list(&self.backend, academy, filter)
    }

    /// The member's current rank, `None` when unranked.
    pub fn current_rank(&self, member: MemberId) -> Result<Option<Rank>, ObiError> {
        self.backend.current_rank(member)
    }

    // -------------------------------------------------------------------------
    // Rules
    // -------------------------------------------------------------------------

    /// Effective rule for every belt, in ladder order.
    pub fn list_rules(&self, academy: AcademyId) -> Result<Vec<RuleView>, ObiError> {
        RuleResolver::list(&self.backend, &self.ladder, academy)
    }

    /// Set an academy-scoped rule. The belt must be in the ladder.
    pub fn upsert_rule(
        &mut self,
        academy: AcademyId,
        belt: &BeltSlug,
        rule: GraduationRule,
    ) -> Result<(), ObiError> {
        self.ladder.belt_by_slug(belt)?;
        self.backend.put_academy_rule(academy, belt, rule)?;
        tracing::info!(academy = %academy, belt = %belt, "academy rule updated");
        Ok(())
    }

    /// Replace an academy's rules with copies of the default templates.
    pub fn reset_rules(&mut self, academy: AcademyId) -> Result<usize, ObiError> {
        let copied = self.backend.reset_academy_rules(academy)?;
        tracing::info!(academy = %academy, copied, "academy rules reset to templates");
        Ok(copied)
    }

    /// Set a default template rule. The belt must be in the ladder.
    pub fn set_template_rule(
        &mut self,
        belt: &BeltSlug,
        rule: GraduationRule,
    ) -> Result<(), ObiError> {
        self.ladder.belt_by_slug(belt)?;
        self.backend.put_template_rule(belt, rule)
    }

    // -------------------------------------------------------------------------
    // Belts and ingestion
    // -------------------------------------------------------------------------

    pub fn belts(&self) -> Vec<&Belt> {
        self.ladder.belts().collect()
    }

    pub fn regular_belts(&self) -> Vec<&Belt> {
        self.ladder.regular().collect()
    }

    /// Validate and mirror a collaborator snapshot. All-or-nothing.
    pub fn ingest(&mut self, snapshot: &Snapshot) -> Result<IngestSummary, ObiError> {
        Ingestor::validate(snapshot, &self.ladder)?;
        let summary = self.backend.ingest_snapshot(snapshot)?;
        tracing::info!(
            members = summary.members,
            enrollments = summary.enrollments,
            attendance = summary.attendance,
            ranks_seeded = summary.ranks_seeded,
            "snapshot ingested"
        );
        Ok(summary)
    }
}
