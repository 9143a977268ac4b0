//! # Rule Resolver
//!
//! Resolves the effective graduation rule for an (academy, belt) pair:
//!
//! 1. the academy-specific rule row,
//! 2. the global default template row for the belt,
//! 3. the hard fallback constants.
//!
//! Single-member evaluation stops at step 2 and fails with
//! `NoRuleConfigured`. Only the bulk roster scan and the rule listing go on
//! to step 3.

use crate::belt::{BeltCategory, BeltLadder};
use crate::primitives::{FALLBACK_CLASSES_PER_DEGREE, FALLBACK_MIN_CLASSES, FALLBACK_MIN_MONTHS};
use crate::store::GraduationStore;
use crate::{AcademyId, BeltSlug, ObiError};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// How much attendance and time a belt requires before advancing.
///
/// All fields are unsigned, so the non-negative invariant holds by
/// construction. A zero field means "already satisfied".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraduationRule {
    /// Minimum confirmed classes while holding the belt.
    pub min_classes: u32,
    /// Minimum months holding the belt.
    pub min_months: u32,
    /// Confirmed classes needed for each degree.
    pub classes_per_degree: u32,
    /// Advisory minimum weekly frequency, in tenths of a class per week.
    #[serde(default)]
    pub min_weekly_frequency_tenths: Option<u32>,
}

impl GraduationRule {
    #[must_use]
    pub const fn new(min_classes: u32, min_months: u32, classes_per_degree: u32) -> Self {
        Self {
            min_classes,
            min_months,
            classes_per_degree,
            min_weekly_frequency_tenths: None,
        }
    }

    /// The process-wide fallback rule (100 classes, 12 months, 25 per degree).
    #[must_use]
    pub fn fallback() -> &'static GraduationRule {
        static FALLBACK: OnceLock<GraduationRule> = OnceLock::new();
        FALLBACK.get_or_init(|| {
            GraduationRule::new(
                FALLBACK_MIN_CLASSES,
                FALLBACK_MIN_MONTHS,
                FALLBACK_CLASSES_PER_DEGREE,
            )
        })
    }
}

/// Where an effective rule came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSource {
    Academy,
    Template,
    Fallback,
}

/// An effective rule with its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRule {
    pub rule: GraduationRule,
    pub source: RuleSource,
}

/// One row of the per-academy rule listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleView {
    pub belt: BeltSlug,
    pub belt_name: String,
    pub category: BeltCategory,
    pub max_degree: u8,
    pub display_all_degrees: bool,
    pub rule: GraduationRule,
    pub source: RuleSource,
}

/// Pure rule resolution over a store.
pub struct RuleResolver;

impl RuleResolver {
    /// Academy rule, then template rule. Fails when neither exists.
    pub fn resolve<S: GraduationStore + ?Sized>(
        store: &S,
        academy: AcademyId,
        belt: &BeltSlug,
    ) -> Result<ResolvedRule, ObiError> {
        Self::lookup(store, academy, belt)?.ok_or_else(|| ObiError::NoRuleConfigured {
            academy,
            belt: belt.clone(),
        })
    }

    /// Like [`RuleResolver::resolve`], but substitutes the fallback constants
    /// instead of failing. Storage errors still propagate.
    pub fn resolve_or_fallback<S: GraduationStore + ?Sized>(
        store: &S,
        academy: AcademyId,
        belt: &BeltSlug,
    ) -> Result<ResolvedRule, ObiError> {
        Ok(Self::lookup(store, academy, belt)?.unwrap_or(ResolvedRule {
            rule: *GraduationRule::fallback(),
            source: RuleSource::Fallback,
        }))
    }

    fn lookup<S: GraduationStore + ?Sized>(
        store: &S,
        academy: AcademyId,
        belt: &BeltSlug,
    ) -> Result<Option<ResolvedRule>, ObiError> {
        if let Some(rule) = store.academy_rule(academy, belt)? {
            return Ok(Some(ResolvedRule {
                rule,
                source: RuleSource::Academy,
            }));
        }
        Ok(store.template_rule(belt)?.map(|rule| ResolvedRule {
            rule,
            source: RuleSource::Template,
        }))
    }

    /// Effective rule for every belt of the ladder, in ladder order.
    pub fn list<S: GraduationStore + ?Sized>(
        store: &S,
        ladder: &BeltLadder,
        academy: AcademyId,
    ) -> Result<Vec<RuleView>, ObiError> {
        ladder
            .belts()
            .map(|belt| {
                let resolved = Self::resolve_or_fallback(store, academy, &belt.slug)?;
                Ok(RuleView {
                    belt: belt.slug.clone(),
                    belt_name: belt.name.clone(),
                    category: belt.category,
                    max_degree: belt.max_degree,
                    display_all_degrees: belt.display_all_degrees(),
                    rule: resolved.rule,
                    source: resolved.source,
                })
            })
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
