//! # Roster Collaborator
//!
//! The engine does not manage members or enrollments. It only asks the
//! roster who a member is, whether they are actively enrolled at an academy
//! and since when.

use crate::{AcademyId, MemberId, ObiError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Display data for a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberProfile {
    pub id: MemberId,
    pub name: String,
}

/// Enrollment status at an academy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    Active,
    Pending,
    Suspended,
    Cancelled,
}

/// A member's enrollment at one academy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub member: MemberId,
    pub academy: AcademyId,
    pub status: EnrollmentStatus,
    #[serde(default)]
    pub started_on: Option<NaiveDate>,
}

impl Enrollment {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == EnrollmentStatus::Active
    }
}

/// An active member together with their enrollment, as returned by
/// [`Roster::active_members`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub profile: MemberProfile,
    pub enrollment: Enrollment,
}

/// Read access to the member/enrollment collaborator.
pub trait Roster {
    /// Look up a member. `None` means the member is unknown.
    fn member(&self, member: MemberId) -> Result<Option<MemberProfile>, ObiError>;

    /// The member's enrollment at an academy, if any.
    fn enrollment(
        &self,
        member: MemberId,
        academy: AcademyId,
    ) -> Result<Option<Enrollment>, ObiError>;

    /// Every actively enrolled member of an academy, ordered by member id.
    fn active_members(&self, academy: AcademyId) -> Result<Vec<RosterEntry>, ObiError>;

    fn is_active_enrollee(&self, member: MemberId, academy: AcademyId) -> Result<bool, ObiError> {
        Ok(self
            .enrollment(member, academy)?
            .is_some_and(|e| e.is_active()))
    }

    fn enrollment_start_date(
        &self,
        member: MemberId,
        academy: AcademyId,
    ) -> Result<Option<NaiveDate>, ObiError> {
        Ok(self.enrollment(member, academy)?.and_then(|e| e.started_on))
    }
}
