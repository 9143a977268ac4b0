//! # Scoring
//!
//! Progress scoring and readiness classification. Shared verbatim by the
//! single-member evaluator and the roster scan so both paths produce
//! identical results for the same inputs.
//!
//! ## Integer arithmetic
//!
//! Progress is carried in basis points (`10_000` == 100%). Months use an
//! average month of 30.44 days expressed in centidays. Weekly frequency is
//! carried in tenths of a class per week.

use crate::belt::BeltLadder;
use crate::primitives::{
    APPROACHING_THRESHOLD_BP, DAYS_PER_WEEK, FULL_PROGRESS_BP, MONTH_LENGTH_CENTIDAYS,
};
use crate::rules::GraduationRule;
use crate::{ObiError, Rank};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// =============================================================================
// VERDICT TYPES
// =============================================================================

/// What the member is working towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetKind {
    Degree,
    Belt,
}

/// Readiness classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReadinessStatus {
    /// Progress at 100%.
    Ready,
    /// Progress in `[80%, 100%)`.
    Approaching,
    /// Progress below 80%.
    Blocked,
    /// Last belt of the ladder at its maximum degree.
    MaxRank,
}

impl ReadinessStatus {
    /// Whether the roster scan surfaces this status.
    #[must_use]
    pub fn is_actionable(self) -> bool {
        matches!(self, Self::Ready | Self::Approaching)
    }
}

/// Raw numbers behind a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityMetrics {
    /// Classes counted for the current target (degree or belt period).
    pub classes_in_period: u32,
    /// Classes required for the current target.
    pub target_classes: u32,
    pub classes_since_degree: u32,
    pub classes_per_degree: u32,
    pub classes_since_belt: u32,
    pub min_classes: u32,
    pub months_in_belt: u32,
    pub target_months: u32,
    /// Classes per week since belt entry, in tenths.
    pub weekly_frequency_tenths: u32,
    pub target_weekly_frequency_tenths: Option<u32>,
}

/// Outcome of scoring one member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    pub target_kind: TargetKind,
    pub target: Rank,
    pub status: ReadinessStatus,
    pub progress_bp: u64,
    pub reasons: Vec<String>,
    pub metrics: EligibilityMetrics,
}

/// Everything the scorer needs about one member.
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    pub current: &'a Rank,
    pub rule: &'a GraduationRule,
    pub classes_since_degree: u32,
    pub classes_since_belt: u32,
    pub belt_entry: NaiveDate,
    pub as_of: NaiveDate,
}

// =============================================================================
// METRICS
// =============================================================================

/// Whole months between two dates (30.44-day months, floored). Zero when
/// `to` is not after `from`.
#[must_use]
pub fn months_between(from: NaiveDate, to: NaiveDate) -> u32 {
    let days = to.signed_duration_since(from).num_days();
    if days <= 0 {
        return 0;
    }
    let months = days.saturating_mul(100) / MONTH_LENGTH_CENTIDAYS;
    u32::try_from(months).unwrap_or(u32::MAX)
}

/// Elapsed weeks, rounded up, never less than one.
#[must_use]
pub fn elapsed_weeks(from: NaiveDate, to: NaiveDate) -> u64 {
    let days = to.signed_duration_since(from).num_days();
    if days <= 0 {
        return 1;
    }
    let weeks = days.saturating_add(DAYS_PER_WEEK - 1) / DAYS_PER_WEEK;
    u64::try_from(weeks).unwrap_or(u64::MAX).max(1)
}

/// Classes per week in tenths, rounded half up.
#[must_use]
pub fn weekly_frequency_tenths(classes: u32, from: NaiveDate, to: NaiveDate) -> u32 {
    let weeks = elapsed_weeks(from, to);
    let numerator = u64::from(classes) * 20 + weeks;
    u32::try_from(numerator / (2 * weeks)).unwrap_or(u32::MAX)
}

// =============================================================================
// PROGRESS
// =============================================================================

/// `min(100%, classes / per_degree)`. A zero requirement is satisfied.
#[must_use]
pub fn degree_progress_bp(classes: u32, per_degree: u32) -> u64 {
    if per_degree == 0 {
        return FULL_PROGRESS_BP;
    }
    (u64::from(classes) * FULL_PROGRESS_BP / u64::from(per_degree)).min(FULL_PROGRESS_BP)
}

/// `min(100%, (classes/min_classes + months/min_months) / 2)`.
///
/// Each term is left uncapped before averaging, so a surplus in one
/// requirement can offset a shortfall in the other. A zero requirement
/// contributes 100%.
#[must_use]
pub fn belt_progress_bp(classes: u32, min_classes: u32, months: u32, min_months: u32) -> u64 {
    let (n1, d1) = ratio(classes, min_classes);
    let (n2, d2) = ratio(months, min_months);
    let numerator = (n1 * d2 + n2 * d1) * u128::from(FULL_PROGRESS_BP);
    let denominator = 2 * d1 * d2;
    let bp = numerator / denominator;
    u64::try_from(bp)
        .unwrap_or(FULL_PROGRESS_BP)
        .min(FULL_PROGRESS_BP)
}

fn ratio(value: u32, requirement: u32) -> (u128, u128) {
    if requirement == 0 {
        (1, 1)
    } else {
        (u128::from(value), u128::from(requirement))
    }
}

/// Map basis points onto a readiness band.
#[must_use]
pub fn classify(progress_bp: u64) -> ReadinessStatus {
    if progress_bp >= FULL_PROGRESS_BP {
        ReadinessStatus::Ready
    } else if progress_bp >= APPROACHING_THRESHOLD_BP {
        ReadinessStatus::Approaching
    } else {
        ReadinessStatus::Blocked
    }
}

/// Whole percent, rounded half up and capped at 100.
///
/// Display only. The band is always taken from the exact basis points, so
/// 99.5% reports 100 while still APPROACHING.
#[must_use]
pub fn percent(progress_bp: u64) -> u8 {
    u8::try_from((progress_bp.min(FULL_PROGRESS_BP) + 50) / 100).unwrap_or(100)
}

// =============================================================================
// ASSESSMENT
// =============================================================================

/// Score one member against their rule.
///
/// Fails with `BeltNotFound` when the member's belt is not in the ladder.
pub fn assess(ladder: &BeltLadder, obs: Observation<'_>) -> Result<Assessment, ObiError> {
    let belt = ladder.belt_by_slug(&obs.current.belt)?;
    let rule = obs.rule;
    let months_in_belt = months_between(obs.belt_entry, obs.as_of);

    let mut metrics = EligibilityMetrics {
        classes_in_period: obs.classes_since_degree,
        target_classes: rule.classes_per_degree,
        classes_since_degree: obs.classes_since_degree,
        classes_per_degree: rule.classes_per_degree,
        classes_since_belt: obs.classes_since_belt,
        min_classes: rule.min_classes,
        months_in_belt,
        target_months: rule.min_months,
        weekly_frequency_tenths: weekly_frequency_tenths(
            obs.classes_since_belt,
            obs.belt_entry,
            obs.as_of,
        ),
        target_weekly_frequency_tenths: rule.min_weekly_frequency_tenths,
    };

    if obs.current.degree < belt.max_degree {
        let progress_bp = degree_progress_bp(obs.classes_since_degree, rule.classes_per_degree);
        let mut reasons = Vec::new();
        push_shortfall(
            &mut reasons,
            rule.classes_per_degree,
            obs.classes_since_degree,
            "classes",
        );
        return Ok(Assessment {
            target_kind: TargetKind::Degree,
            target: Rank {
                belt: belt.slug.clone(),
                degree: obs.current.degree.saturating_add(1),
            },
            status: classify(progress_bp),
            progress_bp,
            reasons,
            metrics,
        });
    }

    metrics.classes_in_period = obs.classes_since_belt;
    metrics.target_classes = rule.min_classes;

    let Some(next) = ladder.next_belt(&belt.slug)? else {
        return Ok(Assessment {
            target_kind: TargetKind::Belt,
            target: obs.current.clone(),
            status: ReadinessStatus::MaxRank,
            progress_bp: FULL_PROGRESS_BP,
            reasons: vec!["maximum rank reached".to_string()],
            metrics,
        });
    };

    let progress_bp = belt_progress_bp(
        obs.classes_since_belt,
        rule.min_classes,
        months_in_belt,
        rule.min_months,
    );
    let mut reasons = Vec::new();
    push_shortfall(&mut reasons, rule.min_classes, obs.classes_since_belt, "classes");
    push_shortfall(&mut reasons, rule.min_months, months_in_belt, "months");

    Ok(Assessment {
        target_kind: TargetKind::Belt,
        target: Rank {
            belt: next.slug.clone(),
            degree: 0,
        },
        status: classify(progress_bp),
        progress_bp,
        reasons,
        metrics,
    })
}

fn push_shortfall(reasons: &mut Vec<String>, required: u32, actual: u32, unit: &str) {
    if actual < required {
        reasons.push(format!("{} {} remaining", required - actual, unit));
    }
}

// =============================================================================
// TESTS
// =============================================================================
