//! # Graduation Records
//!
//! Append-only history of graduation decisions. Records are never deleted;
//! they only move through the status machine:
//!
//! ```text
//! PENDING ──confirm──▶ CONFIRMED   (applies rank)
//! PENDING ──cancel───▶ CANCELLED   (no rank effect)
//! CONFIRMED ─cancel──▶ CANCELLED   (no rank effect, rank is NOT rolled back)
//! ```

use crate::belt::BeltLadder;
use crate::primitives::MAX_NOTES_LENGTH;
use crate::{AcademyId, ClassId, GraduationId, MemberId, ObiError, Rank};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// STATUS
// =============================================================================

/// Status of a graduation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GraduationStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl GraduationStatus {
    /// Whether the record still counts towards the unique-target constraint.
    #[must_use]
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Cancelled)
    }

    /// Check a transition against the status machine.
    pub fn check_transition(
        self,
        id: GraduationId,
        to: GraduationStatus,
    ) -> Result<(), ObiError> {
        let allowed = matches!(
            (self, to),
            (Self::Pending, Self::Confirmed)
                | (Self::Pending, Self::Cancelled)
                | (Self::Confirmed, Self::Cancelled)
        );
        if allowed {
            Ok(())
        } else {
            Err(ObiError::InvalidTransition {
                id,
                from: self,
                action: match to {
                    Self::Confirmed => "confirmed",
                    Self::Cancelled => "cancelled",
                    Self::Pending => "reopened",
                },
            })
        }
    }

    /// Parse the wire form (`PENDING`, `CONFIRMED`, `CANCELLED`), case-insensitive.
    pub fn parse(s: &str) -> Result<Self, ObiError> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "CONFIRMED" => Ok(Self::Confirmed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(ObiError::InvalidInput(format!(
                "unknown graduation status '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for GraduationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Cancelled => "CANCELLED",
        })
    }
}

// =============================================================================
// RECORD
// =============================================================================

/// A persisted graduation decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraduationRecord {
    pub id: GraduationId,
    pub member: MemberId,
    pub academy: AcademyId,
    /// Rank held before the grant, if the member had one.
    pub previous: Option<Rank>,
    /// Rank granted by this record.
    pub target: Rank,
    pub decided_on: NaiveDate,
    pub granted_by: MemberId,
    pub class: Option<ClassId>,
    pub notes: Option<String>,
    /// Granted outside the automatic rules.
    pub manual: bool,
    pub justification: Option<String>,
    pub status: GraduationStatus,
}

/// A validated record that has not been assigned an id yet.
///
/// Only [`GraduationDraft::validate`] builds one, so stores can rely on the
/// invariants below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraduationDraft {
    pub(crate) member: MemberId,
    pub(crate) academy: AcademyId,
    pub(crate) previous: Option<Rank>,
    pub(crate) target: Rank,
    pub(crate) decided_on: NaiveDate,
    pub(crate) granted_by: MemberId,
    pub(crate) class: Option<ClassId>,
    pub(crate) notes: Option<String>,
    pub(crate) manual: bool,
    pub(crate) justification: Option<String>,
    pub(crate) status: GraduationStatus,
}

/// Caller input for creating a graduation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGraduation {
    pub member: MemberId,
    pub academy: AcademyId,
    /// Defaults to the member's current rank.
    #[serde(default)]
    pub previous: Option<Rank>,
    pub target: Rank,
    pub decided_on: NaiveDate,
    pub granted_by: MemberId,
    #[serde(default)]
    pub class: Option<ClassId>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Create as PENDING instead of granting directly.
    #[serde(default)]
    pub pending: bool,
    #[serde(default)]
    pub manual: bool,
    #[serde(default)]
    pub justification: Option<String>,
}

impl GraduationDraft {
    /// Validate caller input against the ladder.
    ///
    /// `current` is the member's rank at creation time and fills in a
    /// missing `previous`.
    pub fn validate(
        input: NewGraduation,
        ladder: &BeltLadder,
        current: Option<Rank>,
    ) -> Result<Self, ObiError> {
        ladder.validate_rank(&input.target)?;
        if let Some(previous) = &input.previous {
            ladder.validate_rank(previous)?;
        }

        let notes = normalize_text(input.notes, "notes")?;
        let justification = normalize_text(input.justification, "justification")?;
        if input.manual && justification.is_none() {
            return Err(ObiError::InvalidInput(
                "a manual graduation requires a justification".to_string(),
            ));
        }

        Ok(Self {
            member: input.member,
            academy: input.academy,
            previous: input.previous.or(current),
            target: input.target,
            decided_on: input.decided_on,
            granted_by: input.granted_by,
            class: input.class,
            notes,
            manual: input.manual,
            justification,
            status: if input.pending {
                GraduationStatus::Pending
            } else {
                GraduationStatus::Confirmed
            },
        })
    }

    #[must_use]
    pub fn member(&self) -> MemberId {
        self.member
    }

    #[must_use]
    pub fn target(&self) -> &Rank {
        &self.target
    }

    #[must_use]
    pub fn status(&self) -> GraduationStatus {
        self.status
    }

    /// Attach the id allocated by the store.
    #[must_use]
    pub fn into_record(self, id: GraduationId) -> GraduationRecord {
        GraduationRecord {
            id,
            member: self.member,
            academy: self.academy,
            previous: self.previous,
            target: self.target,
            decided_on: self.decided_on,
            granted_by: self.granted_by,
            class: self.class,
            notes: self.notes,
            manual: self.manual,
            justification: self.justification,
            status: self.status,
        }
    }
}

/// Trim, drop empty strings and enforce the length limit.
fn normalize_text(value: Option<String>, field: &str) -> Result<Option<String>, ObiError> {
    let Some(text) = value else {
        return Ok(None);
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.len() > MAX_NOTES_LENGTH {
        return Err(ObiError::InvalidInput(format!(
            "{} length {} exceeds maximum {} bytes",
            field,
            trimmed.len(),
            MAX_NOTES_LENGTH
        )));
    }
    Ok(Some(trimmed.to_string()))
}

// =============================================================================
// FILTER
// =============================================================================

/// Filters for listing an academy's graduation history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraduationFilter {
    #[serde(default)]
    pub member: Option<MemberId>,
    /// Inclusive lower bound on the decision date.
    #[serde(default)]
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound on the decision date.
    #[serde(default)]
    pub to: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<GraduationStatus>,
}

impl GraduationFilter {
    #[must_use]
    pub fn matches(&self, record: &GraduationRecord) -> bool {
        self.member.is_none_or(|m| record.member == m)
            && self.from.is_none_or(|d| record.decided_on >= d)
            && self.to.is_none_or(|d| record.decided_on <= d)
            && self.status.is_none_or(|s| record.status == s)
    }

    /// Apply the filter and order newest decision first (ties by id, newest first).
    #[must_use]
    pub fn apply(&self, records: Vec<GraduationRecord>) -> Vec<GraduationRecord> {
        let mut out: Vec<_> = records.into_iter().filter(|r| self.matches(r)).collect();
        out.sort_by(|a, b| {
            b.decided_on
                .cmp(&a.decided_on)
                .then_with(|| b.id.cmp(&a.id))
        });
        out
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn input() -> NewGraduation {
        NewGraduation {
            member: MemberId(1),
            academy: AcademyId(7),
            previous: None,
            target: Rank::new("white", 1),
            decided_on: date(2026, 3, 1),
            granted_by: MemberId(99),
            class: None,
            notes: None,
            pending: false,
            manual: false,
            justification: None,
        }
    }

    #[test]
    fn transitions_follow_state_machine() {
        let id = GraduationId(1);
        use GraduationStatus::*;
        assert!(Pending.check_transition(id, Confirmed).is_ok());
        assert!(Pending.check_transition(id, Cancelled).is_ok());
        assert!(Confirmed.check_transition(id, Cancelled).is_ok());
        assert!(Confirmed.check_transition(id, Confirmed).is_err());
        assert!(Cancelled.check_transition(id, Confirmed).is_err());
        assert!(Cancelled.check_transition(id, Cancelled).is_err());
        assert!(Confirmed.check_transition(id, Pending).is_err());
    }

    #[test]
    fn status_parse_roundtrips_display() {
        for status in [
            GraduationStatus::Pending,
            GraduationStatus::Confirmed,
            GraduationStatus::Cancelled,
        ] {
            assert_eq!(GraduationStatus::parse(&status.to_string()).expect("parse"), status);
        }
        assert_eq!(
            GraduationStatus::parse("pending").expect("parse"),
            GraduationStatus::Pending
        );
        assert!(GraduationStatus::parse("DONE").is_err());
    }

    #[test]
    fn draft_defaults_previous_to_current_rank() {
        let ladder = BeltLadder::standard();
        let draft = GraduationDraft::validate(input(), &ladder, Some(Rank::new("white", 0)))
            .expect("valid");
        assert_eq!(draft.previous, Some(Rank::new("white", 0)));
        assert_eq!(draft.status(), GraduationStatus::Confirmed);
    }

    #[test]
    fn draft_pending_flag() {
        let ladder = BeltLadder::standard();
        let draft = GraduationDraft::validate(
            NewGraduation {
                pending: true,
                ..input()
            },
            &ladder,
            None,
        )
        .expect("valid");
        assert_eq!(draft.status(), GraduationStatus::Pending);
    }

    #[test]
    fn draft_rejects_degree_above_max() {
        let ladder = BeltLadder::standard();
        let result = GraduationDraft::validate(
            NewGraduation {
                target: Rank::new("white", 9),
                ..input()
            },
            &ladder,
            None,
        );
        assert!(matches!(result, Err(ObiError::InvalidInput(_))));
    }

    #[test]
    fn draft_rejects_unknown_belt() {
        let ladder = BeltLadder::standard();
        let result = GraduationDraft::validate(
            NewGraduation {
                target: Rank::new("custom-slug", 0),
                ..input()
            },
            &ladder,
            None,
        );
        assert!(matches!(result, Err(ObiError::BeltNotFound(_))));
    }

    #[test]
    fn manual_requires_justification() {
        let ladder = BeltLadder::standard();
        let result = GraduationDraft::validate(
            NewGraduation {
                manual: true,
                justification: Some("   ".into()),
                ..input()
            },
            &ladder,
            None,
        );
        assert!(matches!(result, Err(ObiError::InvalidInput(_))));

        let ok = GraduationDraft::validate(
            NewGraduation {
                manual: true,
                justification: Some("competition result".into()),
                ..input()
            },
            &ladder,
            None,
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn filter_orders_newest_first() {
        let ladder = BeltLadder::standard();
        let older = GraduationDraft::validate(input(), &ladder, None)
            .expect("valid")
            .into_record(GraduationId(1));
        let newer = GraduationDraft::validate(
            NewGraduation {
                decided_on: date(2026, 6, 1),
                target: Rank::new("white", 2),
                ..input()
            },
            &ladder,
            None,
        )
        .expect("valid")
        .into_record(GraduationId(2));

        let filter = GraduationFilter::default();
        let out = filter.apply(vec![older.clone(), newer.clone()]);
        assert_eq!(out, vec![newer.clone(), older.clone()]);

        let filter = GraduationFilter {
            from: Some(date(2026, 4, 1)),
            ..GraduationFilter::default()
        };
        assert_eq!(filter.apply(vec![older, newer.clone()]), vec![newer]);
    }
}
