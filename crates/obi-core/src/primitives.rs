//! # Engine Primitives
//!
//! Hardcoded constants for the Obi engine.
//!
//! These values are compiled into the binary and are immutable at runtime.
//! Per-academy configuration lives in graduation rules; nothing here is
//! meant to be tuned per deployment.

use chrono::NaiveDate;

// =============================================================================
// FALLBACK RULE
// =============================================================================

/// Minimum total classes at a belt when no rule row exists (bulk scans only).
pub const FALLBACK_MIN_CLASSES: u32 = 100;

/// Minimum months at a belt when no rule row exists (bulk scans only).
pub const FALLBACK_MIN_MONTHS: u32 = 12;

/// Classes per degree when no rule row exists (bulk scans only).
pub const FALLBACK_CLASSES_PER_DEGREE: u32 = 25;

// =============================================================================
// SCORING
// =============================================================================

/// Progress is computed in hundredths of a percent to stay integer-only.
/// `10_000` basis points == 100%.
pub const FULL_PROGRESS_BP: u64 = 10_000;

/// Lower bound (inclusive) of the APPROACHING band, in basis points.
pub const APPROACHING_THRESHOLD_BP: u64 = 8_000;

/// Average month length used for months-in-belt, in hundredths of a day
/// (30.44 days).
pub const MONTH_LENGTH_CENTIDAYS: i64 = 3_044;

/// Days per week for the weekly frequency metric.
pub const DAYS_PER_WEEK: i64 = 7;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length for graduation notes and manual justifications.
pub const MAX_NOTES_LENGTH: usize = 2_000;

/// Maximum length for a belt slug.
pub const MAX_SLUG_LENGTH: usize = 64;

/// Maximum number of attendance events accepted in a single ingestion batch.
pub const MAX_INGEST_BATCH: usize = 100_000;

/// Beginning-of-time sentinel used when a member has neither a prior
/// graduation nor a known enrollment start.
#[must_use]
pub fn epoch_sentinel() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN)
}
