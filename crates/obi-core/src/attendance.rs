//! # Attendance Aggregator
//!
//! The interface the engine consumes from the attendance subsystem. Only
//! confirmed attendance counts, and only for classes dated strictly after
//! the reference date.

use crate::{ClassId, MemberId, ObiError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One attendance event as reported by the attendance collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEvent {
    pub member: MemberId,
    pub class: ClassId,
    pub class_date: NaiveDate,
    /// Present and approved. Pending or rejected check-ins are `false`.
    pub confirmed: bool,
}

impl AttendanceEvent {
    /// Whether this event counts for a reference date.
    #[must_use]
    pub fn counts_since(&self, since: NaiveDate) -> bool {
        self.confirmed && self.class_date > since
    }
}

/// Read access to confirmed attendance.
pub trait AttendanceLedger {
    /// Confirmed classes attended by `member` dated strictly after `since`.
    fn count_confirmed_attendance(&self, member: MemberId, since: NaiveDate)
    -> Result<u32, ObiError>;

    /// Answer many `(member, since)` queries at once, in input order.
    ///
    /// Implementations backed by a store should override this to use a
    /// single read transaction.
    fn count_confirmed_attendance_batch(
        &self,
        queries: &[(MemberId, NaiveDate)],
    ) -> Result<Vec<u32>, ObiError> {
        queries
            .iter()
            .map(|(member, since)| self.count_confirmed_attendance(*member, *since))
            .collect()
    }
}
