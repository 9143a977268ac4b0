//! # obi-core
//!
//! The graduation eligibility and progression engine for Obi.
//!
//! This crate decides, from attendance history and per-academy rules,
//! whether a martial-arts member is ready for the next degree or belt, and
//! keeps the append-only history of graduation decisions that move a
//! member's rank.
//!
//! ## Architectural Constraints
//!
//! - Has NO async, NO network dependencies
//! - Integer arithmetic only (progress in basis points)
//! - Collaborators (roster, attendance) are consumed through traits
//! - Every failure is an explicit `ObiError`; nothing silently defaults

// =============================================================================
// MODULES
// =============================================================================

pub mod attendance;
pub mod belt;
pub mod directory;
pub mod engine;
pub mod evaluator;
pub mod ingestor;
pub mod lifecycle;
pub mod primitives;
pub mod record;
pub mod rules;
pub mod scan;
pub mod scoring;
pub mod storage;
pub mod store;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{AcademyId, BeltSlug, ClassId, ErrorKind, GraduationId, MemberId, ObiError, Rank};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use attendance::{AttendanceEvent, AttendanceLedger};
pub use belt::{Belt, BeltCategory, BeltLadder};
pub use directory::{Enrollment, EnrollmentStatus, MemberProfile, Roster, RosterEntry};
pub use engine::{Engine, StorageBackend, today};
pub use evaluator::{EligibilityResult, Evaluator, ReferenceDates};
pub use ingestor::{IngestSummary, Ingestor, RankSeed, Snapshot};
pub use lifecycle::Lifecycle;
pub use record::{
    GraduationDraft, GraduationFilter, GraduationRecord, GraduationStatus, NewGraduation,
};
pub use rules::{GraduationRule, ResolvedRule, RuleResolver, RuleSource, RuleView};
pub use scan::RosterScanner;
pub use scoring::{EligibilityMetrics, ReadinessStatus, TargetKind};
pub use storage::RedbStore;
pub use store::{GraduationStore, MemoryStore};
