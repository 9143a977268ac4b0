//! # Core Type Definitions
//!
//! This module contains the identifiers and shared value types of the
//! graduation engine:
//! - Identifiers (`MemberId`, `AcademyId`, `GraduationId`, `ClassId`)
//! - Rank state (`BeltSlug`, `Rank`)
//! - Error types (`ObiError`, `ErrorKind`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` for deterministic ordering in `BTreeMap`/`BTreeSet`

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of a member (student) as known by the roster collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MemberId(pub u64);

/// Identifier of an academy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AcademyId(pub u64);

/// Identifier of a graduation record. Allocated by the store, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GraduationId(pub u64);

/// Identifier of a scheduled class, owned by the scheduling collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClassId(pub u64);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for AcademyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for GraduationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// RANK
// =============================================================================

/// Unique key of a belt in the ladder (e.g. `"white"`, `"blue"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BeltSlug(pub String);

impl BeltSlug {
    /// Create a new slug from a string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BeltSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BeltSlug {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A member's position on the ladder: a belt plus a 0-based degree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rank {
    pub belt: BeltSlug,
    pub degree: u8,
}

impl Rank {
    /// Create a new rank.
    #[must_use]
    pub fn new(belt: impl Into<BeltSlug>, degree: u8) -> Self {
        Self {
            belt: belt.into(),
            degree,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.belt, self.degree)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Coarse classification of an [`ObiError`], used by callers to pick a
/// transport status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    BadRequest,
    Conflict,
    Internal,
}

/// Errors that can occur in the Obi engine.
///
/// - No silent failures: missing rule configuration is an error, never a default
/// - Use `Result<T, ObiError>` for fallible operations
/// - The engine should never panic; all errors must be recoverable
#[derive(Debug, Error)]
pub enum ObiError {
    /// The member is unknown to the roster.
    #[error("Member not found: {0}")]
    MemberNotFound(MemberId),

    /// The belt slug is not part of the ladder.
    #[error("Belt not found: {0}")]
    BeltNotFound(BeltSlug),

    /// No graduation record with this id exists.
    #[error("Graduation not found: {0}")]
    GraduationNotFound(GraduationId),

    /// The member has no belt assigned and cannot be evaluated.
    #[error("Member {0} has no belt assigned")]
    Unranked(MemberId),

    /// Neither an academy rule nor a template rule exists for the belt.
    #[error("No graduation rule configured for belt {belt} (academy {academy}) and no default template")]
    NoRuleConfigured { academy: AcademyId, belt: BeltSlug },

    /// A non-cancelled record already targets the same rank for the member.
    #[error("A graduation to {rank} is already registered for member {member}")]
    DuplicateGraduation { member: MemberId, rank: Rank },

    /// The requested status transition is not allowed.
    #[error("Graduation {id} cannot be {action} from status {from}")]
    InvalidTransition {
        id: GraduationId,
        from: crate::record::GraduationStatus,
        action: &'static str,
    },

    /// Input failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A uniqueness constraint was violated inside a storage transaction.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O or storage error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl ObiError {
    /// Classify the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MemberNotFound(_) | Self::BeltNotFound(_) | Self::GraduationNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::Unranked(_)
            | Self::NoRuleConfigured { .. }
            | Self::DuplicateGraduation { .. }
            | Self::InvalidTransition { .. }
            | Self::InvalidInput(_) => ErrorKind::BadRequest,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::SerializationError(_) | Self::IoError(_) => ErrorKind::Internal,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
