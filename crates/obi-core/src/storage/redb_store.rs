//! # redb-backed Graduation Storage
//!
//! A disk-backed store using the redb embedded database, providing:
//! - ACID transactions (a confirmation and its rank update commit together)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Records, ranks and collaborator mirrors are postcard-encoded. Secondary
//! indexes are plain composite keys so per-member and per-academy scans are
//! range queries.

use crate::attendance::AttendanceLedger;
use crate::directory::{Enrollment, MemberProfile, Roster, RosterEntry};
use crate::ingestor::{IngestSummary, Snapshot};
use crate::record::{GraduationDraft, GraduationRecord, GraduationStatus};
use crate::rules::GraduationRule;
use crate::store::GraduationStore;
use crate::{AcademyId, BeltSlug, GraduationId, MemberId, ObiError, Rank};
use chrono::{Datelike, NaiveDate};
use redb::{Database, ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition};
use std::collections::BTreeMap;
use std::path::Path;

/// Academy rules: (academy, belt slug) -> serialized GraduationRule
const RULES: TableDefinition<(u64, &str), &[u8]> = TableDefinition::new("rules");

/// Default templates: belt slug -> serialized GraduationRule
const TEMPLATES: TableDefinition<&str, &[u8]> = TableDefinition::new("templates");

/// Graduation records: GraduationId(u64) -> serialized GraduationRecord
const RECORDS: TableDefinition<u64, &[u8]> = TableDefinition::new("records");

/// (member, graduation id) -> ()
const MEMBER_INDEX: TableDefinition<(u64, u64), ()> = TableDefinition::new("member_index");

/// (academy, graduation id) -> ()
const ACADEMY_INDEX: TableDefinition<(u64, u64), ()> = TableDefinition::new("academy_index");

/// Unique slot for non-cancelled records: (member, belt, degree) -> graduation id
const TARGET_INDEX: TableDefinition<(u64, &str, u8), u64> = TableDefinition::new("target_index");

/// Current rank: MemberId(u64) -> serialized Rank
const RANKS: TableDefinition<u64, &[u8]> = TableDefinition::new("ranks");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

/// Roster mirror: MemberId(u64) -> serialized MemberProfile
const MEMBERS: TableDefinition<u64, &[u8]> = TableDefinition::new("members");

/// Roster mirror: (academy, member) -> serialized Enrollment
const ENROLLMENTS: TableDefinition<(u64, u64), &[u8]> = TableDefinition::new("enrollments");

/// Attendance mirror: (member, days from CE, class) -> confirmed (0/1)
const ATTENDANCE: TableDefinition<(u64, i32, u64), u8> = TableDefinition::new("attendance");

const LAST_GRADUATION_ID: &str = "last_graduation_id";

/// A disk-backed graduation store using redb.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, ObiError> {
    postcard::to_allocvec(value).map_err(|e| ObiError::SerializationError(e.to_string()))
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, ObiError> {
    postcard::from_bytes(bytes).map_err(|e| ObiError::SerializationError(e.to_string()))
}

fn day_key(date: NaiveDate) -> i32 {
    date.num_days_from_ce()
}

impl RedbStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ObiError> {
        let db = Database::create(path.as_ref()).map_err(|e| ObiError::IoError(e.to_string()))?;

        // Initialize tables if they don't exist
        {
            let write_txn = db
                .begin_write()
                .map_err(|e| ObiError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(RULES)
                .map_err(|e| ObiError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(TEMPLATES)
                .map_err(|e| ObiError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(RECORDS)
                .map_err(|e| ObiError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(MEMBER_INDEX)
                .map_err(|e| ObiError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(ACADEMY_INDEX)
                .map_err(|e| ObiError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(TARGET_INDEX)
                .map_err(|e| ObiError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(RANKS)
                .map_err(|e| ObiError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(METADATA)
                .map_err(|e| ObiError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(MEMBERS)
                .map_err(|e| ObiError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(ENROLLMENTS)
                .map_err(|e| ObiError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(ATTENDANCE)
                .map_err(|e| ObiError::IoError(e.to_string()))?;
            write_txn
                .commit()
                .map_err(|e| ObiError::IoError(e.to_string()))?;
        }

        tracing::debug!(path = %path.as_ref().display(), "redb store opened");
        Ok(Self { db })
    }

    fn read(&self) -> Result<ReadTransaction, ObiError> {
        self.db
            .begin_read()
            .map_err(|e| ObiError::IoError(e.to_string()))
    }

    /// Mirror a validated collaborator snapshot in a single write
    /// transaction. Existing ranks are never overwritten.
    pub fn ingest_snapshot(&mut self, snapshot: &Snapshot) -> Result<IngestSummary, ObiError> {
        let mut summary = IngestSummary::default();

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| ObiError::IoError(e.to_string()))?;
        {
            let mut members = write_txn
                .open_table(MEMBERS)
                .map_err(|e| ObiError::IoError(e.to_string()))?;
            for member in &snapshot.members {
                members
                    .insert(member.id.0, encode(member)?.as_slice())
                    .map_err(|e| ObiError::IoError(e.to_string()))?;
                summary.members += 1;
            }

            let mut enrollments = write_txn
                .open_table(ENROLLMENTS)
                .map_err(|e| ObiError::IoError(e.to_string()))?;
            for enrollment in &snapshot.enrollments {
                enrollments
                    .insert(
                        (enrollment.academy.0, enrollment.member.0),
                        encode(enrollment)?.as_slice(),
                    )
                    .map_err(|e| ObiError::IoError(e.to_string()))?;
                summary.enrollments += 1;
            }

            let mut attendance = write_txn
                .open_table(ATTENDANCE)
                .map_err(|e| ObiError::IoError(e.to_string()))?;
            for event in &snapshot.attendance {
                attendance
                    .insert(
                        (event.member.0, day_key(event.class_date), event.class.0),
                        u8::from(event.confirmed),
                    )
                    .map_err(|e| ObiError::IoError(e.to_string()))?;
                summary.attendance += 1;
            }

            let mut ranks = write_txn
                .open_table(RANKS)
                .map_err(|e| ObiError::IoError(e.to_string()))?;
            for seed in &snapshot.ranks {
                let exists = ranks
                    .get(seed.member.0)
                    .map_err(|e| ObiError::IoError(e.to_string()))?
                    .is_some();
                if exists {
                    summary.ranks_skipped += 1;
                } else {
                    ranks
                        .insert(seed.member.0, encode(&seed.rank)?.as_slice())
                        .map_err(|e| ObiError::IoError(e.to_string()))?;
                    summary.ranks_seeded += 1;
                }
            }
        }
        write_txn
            .commit()
            .map_err(|e| ObiError::IoError(e.to_string()))?;

        Ok(summary)
    }

    fn records_in_index(
        read_txn: &ReadTransaction,
        index: TableDefinition<(u64, u64), ()>,
        key: u64,
    ) -> Result<Vec<GraduationRecord>, ObiError> {
        let index_table = read_txn
            .open_table(index)
            .map_err(|e| ObiError::IoError(e.to_string()))?;
        let records_table = read_txn
            .open_table(RECORDS)
            .map_err(|e| ObiError::IoError(e.to_string()))?;

        let mut out = Vec::new();
        for entry in index_table
            .range((key, 0u64)..=(key, u64::MAX))
            .map_err(|e| ObiError::IoError(e.to_string()))?
        {
            let (k, _) = entry.map_err(|e| ObiError::IoError(e.to_string()))?;
            let (_, id) = k.value();
            if let Some(data) = records_table
                .get(id)
                .map_err(|e| ObiError::IoError(e.to_string()))?
            {
                out.push(decode(data.value())?);
            }
        }
        Ok(out)
    }

    fn rank_in(read_txn: &ReadTransaction, member: MemberId) -> Result<Option<Rank>, ObiError> {
        let table = read_txn
            .open_table(RANKS)
            .map_err(|e| ObiError::IoError(e.to_string()))?;
        table
            .get(member.0)
            .map_err(|e| ObiError::IoError(e.to_string()))?
            .map(|data| decode(data.value()))
            .transpose()
    }

    fn attendance_in(
        read_txn: &ReadTransaction,
        member: MemberId,
        since: NaiveDate,
    ) -> Result<u32, ObiError> {
        let table = read_txn
            .open_table(ATTENDANCE)
            .map_err(|e| ObiError::IoError(e.to_string()))?;
        let start = day_key(since).saturating_add(1);

        let mut count: u32 = 0;
        for entry in table
            .range((member.0, start, 0u64)..=(member.0, i32::MAX, u64::MAX))
            .map_err(|e| ObiError::IoError(e.to_string()))?
        {
            let (_, confirmed) = entry.map_err(|e| ObiError::IoError(e.to_string()))?;
            if confirmed.value() != 0 {
                count = count.saturating_add(1);
            }
        }
        Ok(count)
    }
}

// =============================================================================
// GRADUATIONSTORE TRAIT IMPLEMENTATION
// =============================================================================

impl GraduationStore for RedbStore {
    fn academy_rule(
        &self,
        academy: AcademyId,
        belt: &BeltSlug,
    ) -> Result<Option<GraduationRule>, ObiError> {
        let read_txn = self.read()?;
        let table = read_txn
            .open_table(RULES)
            .map_err(|e| ObiError::IoError(e.to_string()))?;
        table
            .get((academy.0, belt.as_str()))
            .map_err(|e| ObiError::IoError(e.to_string()))?
            .map(|data| decode(data.value()))
            .transpose()
    }

    fn template_rule(&self, belt: &BeltSlug) -> Result<Option<GraduationRule>, ObiError> {
        let read_txn = self.read()?;
        let table = read_txn
            .open_table(TEMPLATES)
            .map_err(|e| ObiError::IoError(e.to_string()))?;
        table
            .get(belt.as_str())
            .map_err(|e| ObiError::IoError(e.to_string()))?
            .map(|data| decode(data.value()))
            .transpose()
    }

    fn put_academy_rule(
        &mut self,
        academy: AcademyId,
        belt: &BeltSlug,
        rule: GraduationRule,
    ) -> Result<(), ObiError> {
        let bytes = encode(&rule)?;
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| ObiError::IoError(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(RULES)
                .map_err(|e| ObiError::IoError(e.to_string()))?;
            table
                .insert((academy.0, belt.as_str()), bytes.as_slice())
                .map_err(|e| ObiError::IoError(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| ObiError::IoError(e.to_string()))?;
        Ok(())
    }

    fn put_template_rule(
        &mut self,
        belt: &BeltSlug,
        rule: GraduationRule,
    ) -> Result<(), ObiError> {
        let bytes = encode(&rule)?;
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| ObiError::IoError(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(TEMPLATES)
                .map_err(|e| ObiError::IoError(e.to_string()))?;
            table
                .insert(belt.as_str(), bytes.as_slice())
                .map_err(|e| ObiError::IoError(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| ObiError::IoError(e.to_string()))?;
        Ok(())
    }

    fn reset_academy_rules(&mut self, academy: AcademyId) -> Result<usize, ObiError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| ObiError::IoError(e.to_string()))?;
        let copied;
        {
            let mut rules = write_txn
                .open_table(RULES)
                .map_err(|e| ObiError::IoError(e.to_string()))?;

            let mut existing = Vec::new();
            for entry in rules
                .range((academy.0, "")..)
                .map_err(|e| ObiError::IoError(e.to_string()))?
            {
                let (key, _) = entry.map_err(|e| ObiError::IoError(e.to_string()))?;
                let (owner, slug) = key.value();
                if owner != academy.0 {
                    break;
                }
                existing.push(slug.to_string());
            }
            for slug in &existing {
                rules
                    .remove((academy.0, slug.as_str()))
                    .map_err(|e| ObiError::IoError(e.to_string()))?;
            }

            let templates = write_txn
                .open_table(TEMPLATES)
                .map_err(|e| ObiError::IoError(e.to_string()))?;
            let mut count = 0usize;
            for entry in templates
                .iter()
                .map_err(|e| ObiError::IoError(e.to_string()))?
            {
                let (key, value) = entry.map_err(|e| ObiError::IoError(e.to_string()))?;
                rules
                    .insert((academy.0, key.value()), value.value())
                    .map_err(|e| ObiError::IoError(e.to_string()))?;
                count += 1;
            }
            copied = count;
        }
        write_txn
            .commit()
            .map_err(|e| ObiError::IoError(e.to_string()))?;
        Ok(copied)
    }

    fn current_rank(&self, member: MemberId) -> Result<Option<Rank>, ObiError> {
        Self::rank_in(&self.read()?, member)
    }

    fn current_ranks(&self, members: &[MemberId]) -> Result<BTreeMap<MemberId, Rank>, ObiError> {
        let read_txn = self.read()?;
        let mut out = BTreeMap::new();
        for member in members {
            if let Some(rank) = Self::rank_in(&read_txn, *member)? {
                out.insert(*member, rank);
            }
        }
        Ok(out)
    }

    fn insert_graduation(&mut self, draft: GraduationDraft) -> Result<GraduationRecord, ObiError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| ObiError::IoError(e.to_string()))?;
        let record;
        {
            let mut targets = write_txn
                .open_table(TARGET_INDEX)
                .map_err(|e| ObiError::IoError(e.to_string()))?;
            let slot = (
                draft.member().0,
                draft.target().belt.as_str(),
                draft.target().degree,
            );
            let taken = targets
                .get(slot)
                .map_err(|e| ObiError::IoError(e.to_string()))?
                .is_some();
            if taken {
                // Dropping the uncommitted transaction aborts it.
                return Err(ObiError::Conflict(format!(
                    "member {} already holds a graduation to {}",
                    draft.member(),
                    draft.target()
                )));
            }

            let mut meta = write_txn
                .open_table(METADATA)
                .map_err(|e| ObiError::IoError(e.to_string()))?;
            let last = meta
                .get(LAST_GRADUATION_ID)
                .map_err(|e| ObiError::IoError(e.to_string()))?
                .map(|v| v.value())
                .unwrap_or(0);
            let id = last.saturating_add(1);
            meta.insert(LAST_GRADUATION_ID, id)
                .map_err(|e| ObiError::IoError(e.to_string()))?;

            record = draft.into_record(GraduationId(id));

            let mut records = write_txn
                .open_table(RECORDS)
                .map_err(|e| ObiError::IoError(e.to_string()))?;
            records
                .insert(id, encode(&record)?.as_slice())
                .map_err(|e| ObiError::IoError(e.to_string()))?;
            targets
                .insert(
                    (record.member.0, record.target.belt.as_str(), record.target.degree),
                    id,
                )
                .map_err(|e| ObiError::IoError(e.to_string()))?;

            let mut by_member = write_txn
                .open_table(MEMBER_INDEX)
                .map_err(|e| ObiError::IoError(e.to_string()))?;
            by_member
                .insert((record.member.0, id), ())
                .map_err(|e| ObiError::IoError(e.to_string()))?;
            let mut by_academy = write_txn
                .open_table(ACADEMY_INDEX)
                .map_err(|e| ObiError::IoError(e.to_string()))?;
            by_academy
                .insert((record.academy.0, id), ())
                .map_err(|e| ObiError::IoError(e.to_string()))?;

            if record.status == GraduationStatus::Confirmed {
                let mut ranks = write_txn
                    .open_table(RANKS)
                    .map_err(|e| ObiError::IoError(e.to_string()))?;
                ranks
                    .insert(record.member.0, encode(&record.target)?.as_slice())
                    .map_err(|e| ObiError::IoError(e.to_string()))?;
            }
        }
        write_txn
            .commit()
            .map_err(|e| ObiError::IoError(e.to_string()))?;
        Ok(record)
    }

    fn transition_graduation(
        &mut self,
        id: GraduationId,
        to: GraduationStatus,
    ) -> Result<GraduationRecord, ObiError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| ObiError::IoError(e.to_string()))?;
        let record;
        {
            let mut records = write_txn
                .open_table(RECORDS)
                .map_err(|e| ObiError::IoError(e.to_string()))?;
            let mut current: GraduationRecord = {
                let data = records
                    .get(id.0)
                    .map_err(|e| ObiError::IoError(e.to_string()))?
                    .ok_or(ObiError::GraduationNotFound(id))?;
                decode(data.value())?
            };
            current.status.check_transition(id, to)?;
            current.status = to;
            records
                .insert(id.0, encode(&current)?.as_slice())
                .map_err(|e| ObiError::IoError(e.to_string()))?;

            match to {
                GraduationStatus::Confirmed => {
                    let mut ranks = write_txn
                        .open_table(RANKS)
                        .map_err(|e| ObiError::IoError(e.to_string()))?;
                    ranks
                        .insert(current.member.0, encode(&current.target)?.as_slice())
                        .map_err(|e| ObiError::IoError(e.to_string()))?;
                }
                GraduationStatus::Cancelled => {
                    let mut targets = write_txn
                        .open_table(TARGET_INDEX)
                        .map_err(|e| ObiError::IoError(e.to_string()))?;
                    targets
                        .remove((
                            current.member.0,
                            current.target.belt.as_str(),
                            current.target.degree,
                        ))
                        .map_err(|e| ObiError::IoError(e.to_string()))?;
                }
                GraduationStatus::Pending => {}
            }
            record = current;
        }
        write_txn
            .commit()
            .map_err(|e| ObiError::IoError(e.to_string()))?;
        Ok(record)
    }

    fn graduation(&self, id: GraduationId) -> Result<Option<GraduationRecord>, ObiError> {
        let read_txn = self.read()?;
        let table = read_txn
            .open_table(RECORDS)
            .map_err(|e| ObiError::IoError(e.to_string()))?;
        table
            .get(id.0)
            .map_err(|e| ObiError::IoError(e.to_string()))?
            .map(|data| decode(data.value()))
            .transpose()
    }

    fn active_graduation_for(
        &self,
        member: MemberId,
        rank: &Rank,
    ) -> Result<Option<GraduationId>, ObiError> {
        let read_txn = self.read()?;
        let table = read_txn
            .open_table(TARGET_INDEX)
            .map_err(|e| ObiError::IoError(e.to_string()))?;
        Ok(table
            .get((member.0, rank.belt.as_str(), rank.degree))
            .map_err(|e| ObiError::IoError(e.to_string()))?
            .map(|v| GraduationId(v.value())))
    }

    fn graduations_for_member(
        &self,
        member: MemberId,
    ) -> Result<Vec<GraduationRecord>, ObiError> {
        Self::records_in_index(&self.read()?, MEMBER_INDEX, member.0)
    }

    fn graduations_for_members(
        &self,
        members: &[MemberId],
    ) -> Result<BTreeMap<MemberId, Vec<GraduationRecord>>, ObiError> {
        let read_txn = self.read()?;
        let mut out = BTreeMap::new();
        for member in members {
            out.insert(
                *member,
                Self::records_in_index(&read_txn, MEMBER_INDEX, member.0)?,
            );
        }
        Ok(out)
    }

    fn graduations_for_academy(
        &self,
        academy: AcademyId,
    ) -> Result<Vec<GraduationRecord>, ObiError> {
        Self::records_in_index(&self.read()?, ACADEMY_INDEX, academy.0)
    }
}

// =============================================================================
// COLLABORATOR MIRRORS
// =============================================================================

impl Roster for RedbStore {
    fn member(&self, member: MemberId) -> Result<Option<MemberProfile>, ObiError> {
        let read_txn = self.read()?;
        let table = read_txn
            .open_table(MEMBERS)
            .map_err(|e| ObiError::IoError(e.to_string()))?;
        table
            .get(member.0)
            .map_err(|e| ObiError::IoError(e.to_string()))?
            .map(|data| decode(data.value()))
            .transpose()
    }

    fn enrollment(
        &self,
        member: MemberId,
        academy: AcademyId,
    ) -> Result<Option<Enrollment>, ObiError> {
        let read_txn = self.read()?;
        let table = read_txn
            .open_table(ENROLLMENTS)
            .map_err(|e| ObiError::IoError(e.to_string()))?;
        table
            .get((academy.0, member.0))
            .map_err(|e| ObiError::IoError(e.to_string()))?
            .map(|data| decode(data.value()))
            .transpose()
    }

    fn active_members(&self, academy: AcademyId) -> Result<Vec<RosterEntry>, ObiError> {
        let read_txn = self.read()?;
        let enrollments = read_txn
            .open_table(ENROLLMENTS)
            .map_err(|e| ObiError::IoError(e.to_string()))?;
        let members = read_txn
            .open_table(MEMBERS)
            .map_err(|e| ObiError::IoError(e.to_string()))?;

        let mut out = Vec::new();
        for entry in enrollments
            .range((academy.0, 0u64)..=(academy.0, u64::MAX))
            .map_err(|e| ObiError::IoError(e.to_string()))?
        {
            let (key, value) = entry.map_err(|e| ObiError::IoError(e.to_string()))?;
            let enrollment: Enrollment = decode(value.value())?;
            if !enrollment.is_active() {
                continue;
            }
            let (_, member) = key.value();
            let Some(data) = members
                .get(member)
                .map_err(|e| ObiError::IoError(e.to_string()))?
            else {
                continue;
            };
            out.push(RosterEntry {
                profile: decode(data.value())?,
                enrollment,
            });
        }
        Ok(out)
    }
}

impl AttendanceLedger for RedbStore {
    fn count_confirmed_attendance(
        &self,
        member: MemberId,
        since: NaiveDate,
    ) -> Result<u32, ObiError> {
        Self::attendance_in(&self.read()?, member, since)
    }

    fn count_confirmed_attendance_batch(
        &self,
        queries: &[(MemberId, NaiveDate)],
    ) -> Result<Vec<u32>, ObiError> {
        let read_txn = self.read()?;
        queries
            .iter()
            .map(|(member, since)| Self::attendance_in(&read_txn, *member, *since))
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::AttendanceEvent;
    use crate::belt::BeltLadder;
    use crate::directory::EnrollmentStatus;
    use crate::ingestor::RankSeed;
    use crate::record::NewGraduation;
    use crate::ClassId;
    use tempfile::tempdir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn draft(member: u64, target: Rank, pending: bool) -> GraduationDraft {
        GraduationDraft::validate(
            NewGraduation {
                member: MemberId(member),
                academy: AcademyId(1),
                previous: None,
                target,
                decided_on: date(2026, 2, 1),
                granted_by: MemberId(90),
                class: Some(ClassId(5)),
                notes: Some("promoted after open mat".into()),
                pending,
                manual: false,
                justification: None,
            },
            &BeltLadder::standard(),
            None,
        )
        .expect("valid draft")
    }

    #[test]
    fn rules_roundtrip_and_reset() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");
        let white = BeltSlug::new("white");
        let blue = BeltSlug::new("blue");

        store
            .put_template_rule(&white, GraduationRule::new(80, 8, 20))
            .expect("template");
        store
            .put_academy_rule(AcademyId(1), &blue, GraduationRule::new(120, 12, 30))
            .expect("rule");
        store
            .put_academy_rule(AcademyId(2), &blue, GraduationRule::new(1, 1, 1))
            .expect("rule");

        assert_eq!(
            store.academy_rule(AcademyId(1), &blue).expect("get"),
            Some(GraduationRule::new(120, 12, 30))
        );

        let copied = store.reset_academy_rules(AcademyId(1)).expect("reset");
        assert_eq!(copied, 1);
        assert!(store.academy_rule(AcademyId(1), &blue).expect("get").is_none());
        assert_eq!(
            store.academy_rule(AcademyId(1), &white).expect("get"),
            Some(GraduationRule::new(80, 8, 20))
        );
        // Other academies are untouched.
        assert_eq!(
            store.academy_rule(AcademyId(2), &blue).expect("get"),
            Some(GraduationRule::new(1, 1, 1))
        );
    }

    #[test]
    fn confirmed_insert_updates_rank_atomically() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");

        let record = store
            .insert_graduation(draft(7, Rank::new("blue", 0), false))
            .expect("insert");
        assert_eq!(record.id, GraduationId(1));
        assert_eq!(
            store.current_rank(MemberId(7)).expect("rank"),
            Some(Rank::new("blue", 0))
        );
        assert_eq!(
            store.graduation(record.id).expect("get"),
            Some(record.clone())
        );
        assert_eq!(
            store.graduations_for_academy(AcademyId(1)).expect("list"),
            vec![record]
        );
    }

    #[test]
    fn duplicate_insert_conflicts_and_leaves_no_trace() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");

        store
            .insert_graduation(draft(7, Rank::new("white", 1), true))
            .expect("insert");
        let second = store.insert_graduation(draft(7, Rank::new("white", 1), false));
        assert!(matches!(second, Err(ObiError::Conflict(_))));
        assert_eq!(store.graduations_for_member(MemberId(7)).expect("list").len(), 1);
        assert!(store.current_rank(MemberId(7)).expect("rank").is_none());
    }

    #[test]
    fn confirm_and_cancel_transitions() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");

        let pending = store
            .insert_graduation(draft(3, Rank::new("white", 2), true))
            .expect("insert");
        assert!(store.current_rank(MemberId(3)).expect("rank").is_none());

        let confirmed = store
            .transition_graduation(pending.id, GraduationStatus::Confirmed)
            .expect("confirm");
        assert_eq!(confirmed.status, GraduationStatus::Confirmed);
        assert_eq!(
            store.current_rank(MemberId(3)).expect("rank"),
            Some(Rank::new("white", 2))
        );

        let cancelled = store
            .transition_graduation(pending.id, GraduationStatus::Cancelled)
            .expect("cancel");
        assert_eq!(cancelled.status, GraduationStatus::Cancelled);
        // Rank is never rolled back.
        assert_eq!(
            store.current_rank(MemberId(3)).expect("rank"),
            Some(Rank::new("white", 2))
        );
        assert!(
            store
                .active_graduation_for(MemberId(3), &Rank::new("white", 2))
                .expect("slot")
                .is_none()
        );

        let again = store.transition_graduation(pending.id, GraduationStatus::Cancelled);
        assert!(matches!(again, Err(ObiError::InvalidTransition { .. })));
    }

    #[test]
    fn recovery_records_and_ids_persist() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");

        // Phase 1: insert
        {
            let mut store = RedbStore::open(&db_path).expect("open db");
            store
                .insert_graduation(draft(1, Rank::new("white", 1), false))
                .expect("insert");
        }

        // Phase 2: reopen, ids keep increasing
        {
            let mut store = RedbStore::open(&db_path).expect("reopen db");
            assert_eq!(
                store.current_rank(MemberId(1)).expect("rank"),
                Some(Rank::new("white", 1))
            );
            let next = store
                .insert_graduation(draft(1, Rank::new("white", 2), false))
                .expect("insert");
            assert_eq!(next.id, GraduationId(2));
        }
    }

    #[test]
    fn snapshot_mirror_serves_roster_and_attendance() {
        let temp = tempdir().expect("temp dir");
        let mut store = RedbStore::open(temp.path().join("test.redb")).expect("open db");

        let summary = store
            .ingest_snapshot(&Snapshot {
                members: vec![
                    MemberProfile {
                        id: MemberId(1),
                        name: "Ana".into(),
                    },
                    MemberProfile {
                        id: MemberId(2),
                        name: "Bruno".into(),
                    },
                ],
                enrollments: vec![
                    Enrollment {
                        member: MemberId(1),
                        academy: AcademyId(9),
                        status: EnrollmentStatus::Active,
                        started_on: Some(date(2025, 1, 1)),
                    },
                    Enrollment {
                        member: MemberId(2),
                        academy: AcademyId(9),
                        status: EnrollmentStatus::Cancelled,
                        started_on: None,
                    },
                ],
                attendance: vec![
                    AttendanceEvent {
                        member: MemberId(1),
                        class: ClassId(1),
                        class_date: date(2025, 3, 1),
                        confirmed: true,
                    },
                    AttendanceEvent {
                        member: MemberId(1),
                        class: ClassId(2),
                        class_date: date(2025, 3, 2),
                        confirmed: false,
                    },
                ],
                ranks: vec![RankSeed {
                    member: MemberId(1),
                    rank: Rank::new("white", 0),
                }],
            })
            .expect("ingest");
        assert_eq!(summary.members, 2);
        assert_eq!(summary.ranks_seeded, 1);

        let active = store.active_members(AcademyId(9)).expect("active");
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].profile.name, "Ana");
        assert_eq!(
            store
                .enrollment_start_date(MemberId(1), AcademyId(9))
                .expect("start"),
            Some(date(2025, 1, 1))
        );
        assert_eq!(
            store
                .count_confirmed_attendance(MemberId(1), date(2025, 1, 1))
                .expect("count"),
            1
        );
        assert_eq!(
            store
                .count_confirmed_attendance(MemberId(1), date(2025, 3, 1))
                .expect("count"),
            0
        );
    }
}
