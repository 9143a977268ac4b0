//! # Ingestor Module
//!
//! Validation of collaborator snapshots before they are mirrored into a store.
//!
//! - Validate every entry before any write
//! - Reject the whole batch on the first invalid entry
//! - Never overwrite an existing member rank (ranks move only by graduation)

use crate::attendance::AttendanceEvent;
use crate::belt::BeltLadder;
use crate::directory::{Enrollment, MemberProfile};
use crate::primitives::{MAX_INGEST_BATCH, MAX_NOTES_LENGTH};
use crate::{MemberId, ObiError, Rank};
use serde::{Deserialize, Serialize};

/// Initial rank for a member being provisioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankSeed {
    pub member: MemberId,
    pub rank: Rank,
}

/// A batch of collaborator data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub members: Vec<MemberProfile>,
    #[serde(default)]
    pub enrollments: Vec<Enrollment>,
    #[serde(default)]
    pub attendance: Vec<AttendanceEvent>,
    #[serde(default)]
    pub ranks: Vec<RankSeed>,
}

impl Snapshot {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
            && self.enrollments.is_empty()
            && self.attendance.is_empty()
            && self.ranks.is_empty()
    }
}

/// What an ingestion wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub members: usize,
    pub enrollments: usize,
    pub attendance: usize,
    pub ranks_seeded: usize,
    /// Rank seeds ignored because the member already had a rank.
    pub ranks_skipped: usize,
}

/// The Ingestor validates snapshots.
pub struct Ingestor;

impl Ingestor {
    /// Validate a snapshot against the ladder.
    ///
    /// A snapshot is valid if:
    /// - it holds at most `MAX_INGEST_BATCH` entries in total
    /// - every member name is non-empty and within length limits
    /// - every seeded rank names a known belt and a reachable degree
    pub fn validate(snapshot: &Snapshot, ladder: &BeltLadder) -> Result<(), ObiError> {
        let total = snapshot.members.len()
            + snapshot.enrollments.len()
            + snapshot.attendance.len()
            + snapshot.ranks.len();
        if total > MAX_INGEST_BATCH {
            return Err(ObiError::InvalidInput(format!(
                "snapshot holds {} entries, maximum is {}",
                total, MAX_INGEST_BATCH
            )));
        }

        for member in &snapshot.members {
            let name = member.name.trim();
            if name.is_empty() || name.len() > MAX_NOTES_LENGTH {
                return Err(ObiError::InvalidInput(format!(
                    "member {} has an empty or oversized name",
                    member.id
                )));
            }
        }

        for seed in &snapshot.ranks {
            ladder.validate_rank(&seed.rank)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_is_valid() {
        let snapshot = Snapshot::default();
        assert!(snapshot.is_empty());
        assert!(Ingestor::validate(&snapshot, &BeltLadder::standard()).is_ok());
    }

    #[test]
    fn blank_name_rejected() {
        let snapshot = Snapshot {
            members: vec![MemberProfile {
                id: MemberId(1),
                name: "  ".into(),
            }],
            ..Snapshot::default()
        };
        assert!(matches!(
            Ingestor::validate(&snapshot, &BeltLadder::standard()),
            Err(ObiError::InvalidInput(_))
        ));
    }

    #[test]
    fn unknown_belt_seed_rejected() {
        let snapshot = Snapshot {
            ranks: vec![RankSeed {
                member: MemberId(1),
                rank: Rank::new("custom-slug", 0),
            }],
            ..Snapshot::default()
        };
        assert!(matches!(
            Ingestor::validate(&snapshot, &BeltLadder::standard()),
            Err(ObiError::BeltNotFound(_))
        ));
    }
}
