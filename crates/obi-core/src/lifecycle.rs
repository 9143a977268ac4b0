//! # Graduation Record Lifecycle
//!
//! The write path: create, confirm and cancel graduation records.
//!
//! - `create` validates the input, pre-checks the unique target slot and
//!   hands a [`GraduationDraft`] to the store, which re-checks the slot inside
//!   its write transaction
//! - `confirm` moves PENDING to CONFIRMED and applies the rank atomically
//! - `cancel` moves PENDING or CONFIRMED to CANCELLED and never touches rank

use crate::belt::BeltLadder;
use crate::directory::Roster;
use crate::record::{
    GraduationDraft, GraduationFilter, GraduationRecord, GraduationStatus, NewGraduation,
};
use crate::store::GraduationStore;
use crate::{AcademyId, GraduationId, ObiError};

/// Graduation record operations over a store.
pub struct Lifecycle;

impl Lifecycle {
    /// Create a record, CONFIRMED by default or PENDING on request.
    ///
    /// A duplicate non-cancelled target fails with `DuplicateGraduation`;
    /// a concurrent writer winning the same slot surfaces as `Conflict`.
    pub fn create<S>(
        store: &mut S,
        ladder: &BeltLadder,
        input: NewGraduation,
    ) -> Result<GraduationRecord, ObiError>
    where
        S: GraduationStore + Roster + ?Sized,
    {
        if store.member(input.member)?.is_none() {
            return Err(ObiError::MemberNotFound(input.member));
        }

        let current = store.current_rank(input.member)?;
        let draft = GraduationDraft::validate(input, ladder, current)?;

        if store
            .active_graduation_for(draft.member(), draft.target())?
            .is_some()
        {
            return Err(ObiError::DuplicateGraduation {
                member: draft.member(),
                rank: draft.target().clone(),
            });
        }

        let record = store.insert_graduation(draft)?;
        tracing::info!(
            id = %record.id,
            member = %record.member,
            target = %record.target,
            status = %record.status,
            "graduation created"
        );
        Ok(record)
    }

    /// PENDING → CONFIRMED. Applies the record's rank to the member.
    pub fn confirm<S>(store: &mut S, id: GraduationId) -> Result<GraduationRecord, ObiError>
    where
        S: GraduationStore + ?Sized,
    {
        let record = store.transition_graduation(id, GraduationStatus::Confirmed)?;
        tracing::info!(
            id = %record.id,
            member = %record.member,
            rank = %record.target,
            "graduation confirmed"
        );
        Ok(record)
    }

    /// PENDING or CONFIRMED → CANCELLED. Member rank is left as is.
    pub fn cancel<S>(store: &mut S, id: GraduationId) -> Result<(), ObiError>
    where
        S: GraduationStore + ?Sized,
    {
        let record = store.transition_graduation(id, GraduationStatus::Cancelled)?;
        tracing::info!(id = %record.id, member = %record.member, "graduation cancelled");
        Ok(())
    }

    /// Look up a record, failing with `GraduationNotFound`.
    pub fn get<S>(store: &S, id: GraduationId) -> Result<GraduationRecord, ObiError>
    where
        S: GraduationStore + ?Sized,
    {
        store
            .graduation(id)?
            .ok_or(ObiError::GraduationNotFound(id))
    }

    /// An academy's history, filtered, newest decision first.
    pub fn list<S>(
        store: &S,
        academy: AcademyId,
        filter: &GraduationFilter,
    ) -> Result<Vec<GraduationRecord>, ObiError>
    where
        S: GraduationStore + ?Sized,
    {
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if from > to {
                return Err(ObiError::InvalidInput(format!(
                    "date range is empty: {} is after {}",
                    from, to
                )));
            }
        }
        Ok(filter.apply(store.graduations_for_academy(academy)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemberProfile;
    use crate::ingestor::Snapshot;
    use crate::store::MemoryStore;
    use crate::{MemberId, Rank};
    use chrono::NaiveDate;

    fn setup() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.ingest_snapshot(&Snapshot {
            members: vec![MemberProfile {
                id: MemberId(1),
                name: "Ana".into(),
            }],
            ..Snapshot::default()
        });
        store.assign_rank(MemberId(1), Rank::new("white", 3));
        store
    }

    fn input(target: Rank, pending: bool) -> NewGraduation {
        NewGraduation {
            member: MemberId(1),
            academy: AcademyId(1),
            previous: None,
            target,
            decided_on: NaiveDate::from_ymd_opt(2026, 4, 1).expect("date"),
            granted_by: MemberId(77),
            class: None,
            notes: None,
            pending,
            manual: false,
            justification: None,
        }
    }

    #[test]
    fn create_records_previous_rank() {
        let mut store = setup();
        let ladder = BeltLadder::standard();
        let record =
            Lifecycle::create(&mut store, &ladder, input(Rank::new("white", 4), false))
                .expect("create");
        assert_eq!(record.previous, Some(Rank::new("white", 3)));
        assert_eq!(
            store.current_rank(MemberId(1)).expect("rank"),
            Some(Rank::new("white", 4))
        );
    }

    #[test]
    fn unknown_member_not_found() {
        let mut store = setup();
        let ladder = BeltLadder::standard();
        let mut bad = input(Rank::new("white", 4), false);
        bad.member = MemberId(2);
        let result = Lifecycle::create(&mut store, &ladder, bad);
        assert!(matches!(result, Err(ObiError::MemberNotFound(_))));
    }

    #[test]
    fn duplicate_is_bad_request() {
        let mut store = setup();
        let ladder = BeltLadder::standard();
        Lifecycle::create(&mut store, &ladder, input(Rank::new("white", 4), true))
            .expect("create");
        let second =
            Lifecycle::create(&mut store, &ladder, input(Rank::new("white", 4), true));
        assert!(matches!(second, Err(ObiError::DuplicateGraduation { .. })));
    }

    #[test]
    fn confirm_terminal_is_invalid_transition() {
        let mut store = setup();
        let ladder = BeltLadder::standard();
        let record =
            Lifecycle::create(&mut store, &ladder, input(Rank::new("white", 4), false))
                .expect("create");
        let again = Lifecycle::confirm(&mut store, record.id);
        assert!(matches!(again, Err(ObiError::InvalidTransition { .. })));
        assert!(matches!(
            Lifecycle::confirm(&mut store, GraduationId(999)),
            Err(ObiError::GraduationNotFound(_))
        ));
    }

    #[test]
    fn list_rejects_inverted_range() {
        let store = setup();
        let filter = GraduationFilter {
            from: NaiveDate::from_ymd_opt(2026, 5, 1),
            to: NaiveDate::from_ymd_opt(2026, 1, 1),
            ..GraduationFilter::default()
        };
        assert!(matches!(
            Lifecycle::list(&store, AcademyId(1), &filter),
            Err(ObiError::InvalidInput(_))
        ));
    }
}
