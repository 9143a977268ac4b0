//! # Belt Ladder
//!
//! The ordered catalog of belts. Belts are immutable reference data: a slug,
//! a display name, a category, a position in the total ordering and the
//! number of degrees a member can earn before moving to the next belt.

use crate::primitives::MAX_SLUG_LENGTH;
use crate::{BeltSlug, ObiError, Rank};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Category of a belt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeltCategory {
    Regular,
    Juvenile,
    Honorific,
}

/// A single belt in the ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Belt {
    pub slug: BeltSlug,
    pub name: String,
    pub category: BeltCategory,
    /// Position in the total ordering. Higher is more senior.
    pub order: u32,
    /// Highest degree reachable at this belt (degrees are 0-based).
    pub max_degree: u8,
}

impl Belt {
    #[must_use]
    pub fn new(
        slug: &str,
        name: &str,
        category: BeltCategory,
        order: u32,
        max_degree: u8,
    ) -> Self {
        Self {
            slug: BeltSlug::new(slug),
            name: name.to_string(),
            category,
            order,
            max_degree,
        }
    }

    /// Honorific belts are always rendered with every degree filled.
    #[must_use]
    pub fn display_all_degrees(&self) -> bool {
        self.category == BeltCategory::Honorific
    }
}

/// The full ladder, indexed by order and by slug.
#[derive(Debug, Clone)]
pub struct BeltLadder {
    by_order: BTreeMap<u32, Belt>,
    order_of: BTreeMap<BeltSlug, u32>,
}

impl BeltLadder {
    /// Build a ladder, rejecting empty or oversized slugs, duplicate slugs
    /// and duplicate order values.
    pub fn new(belts: Vec<Belt>) -> Result<Self, ObiError> {
        let mut by_order = BTreeMap::new();
        let mut order_of = BTreeMap::new();

        for belt in belts {
            let slug = belt.slug.as_str();
            if slug.is_empty() || slug.len() > MAX_SLUG_LENGTH {
                return Err(ObiError::InvalidInput(format!(
                    "belt slug must be 1..={} bytes",
                    MAX_SLUG_LENGTH
                )));
            }
            if order_of.contains_key(&belt.slug) {
                return Err(ObiError::InvalidInput(format!(
                    "duplicate belt slug '{}'",
                    belt.slug
                )));
            }
            if by_order.contains_key(&belt.order) {
                return Err(ObiError::InvalidInput(format!(
                    "duplicate belt order {} ('{}')",
                    belt.order, belt.slug
                )));
            }
            order_of.insert(belt.slug.clone(), belt.order);
            by_order.insert(belt.order, belt);
        }

        Ok(Self { by_order, order_of })
    }

    /// The built-in adult ladder with the honorific belts on top.
    #[must_use]
    pub fn standard() -> Self {
        let belts = [
            Belt::new("white", "White", BeltCategory::Regular, 1, 4),
            Belt::new("blue", "Blue", BeltCategory::Regular, 2, 4),
            Belt::new("purple", "Purple", BeltCategory::Regular, 3, 4),
            Belt::new("brown", "Brown", BeltCategory::Regular, 4, 4),
            Belt::new("black", "Black", BeltCategory::Regular, 5, 6),
            Belt::new("coral", "Coral (red and black)", BeltCategory::Honorific, 6, 1),
            Belt::new("red-white", "Red and white", BeltCategory::Honorific, 7, 0),
            Belt::new("red", "Red", BeltCategory::Honorific, 8, 1),
        ];
        let mut by_order = BTreeMap::new();
        let mut order_of = BTreeMap::new();
        for belt in belts {
            order_of.insert(belt.slug.clone(), belt.order);
            by_order.insert(belt.order, belt);
        }
        Self { by_order, order_of }
    }

    /// Look up a belt without failing.
    #[must_use]
    pub fn get(&self, slug: &BeltSlug) -> Option<&Belt> {
        self.order_of
            .get(slug)
            .and_then(|order| self.by_order.get(order))
    }

    /// Look up a belt, failing with `BeltNotFound`.
    pub fn belt_by_slug(&self, slug: &BeltSlug) -> Result<&Belt, ObiError> {
        self.get(slug)
            .ok_or_else(|| ObiError::BeltNotFound(slug.clone()))
    }

    /// The belt with the next-higher order value, or `None` at the top.
    pub fn next_belt(&self, slug: &BeltSlug) -> Result<Option<&Belt>, ObiError> {
        let current = self.belt_by_slug(slug)?;
        Ok(self
            .by_order
            .range(current.order.saturating_add(1)..)
            .next()
            .map(|(_, belt)| belt))
    }

    /// Check that a rank names a known belt and a reachable degree.
    pub fn validate_rank(&self, rank: &Rank) -> Result<&Belt, ObiError> {
        let belt = self.belt_by_slug(&rank.belt)?;
        if rank.degree > belt.max_degree {
            return Err(ObiError::InvalidInput(format!(
                "degree {} exceeds the maximum of {} for belt '{}'",
                rank.degree, belt.max_degree, belt.slug
            )));
        }
        Ok(belt)
    }

    /// All belts in ladder order.
    pub fn belts(&self) -> impl Iterator<Item = &Belt> {
        self.by_order.values()
    }

    /// Regular (adult) belts in ladder order.
    pub fn regular(&self) -> impl Iterator<Item = &Belt> {
        self.belts()
            .filter(|b| b.category == BeltCategory::Regular)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_order.is_empty()
    }
}

impl Default for BeltLadder {
    fn default() -> Self {
        Self::standard()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_ladder_is_ordered() {
        let ladder = BeltLadder::standard();
        let slugs: Vec<_> = ladder.belts().map(|b| b.slug.as_str()).collect();
        assert_eq!(
            slugs,
            vec!["white", "blue", "purple", "brown", "black", "coral", "red-white", "red"]
        );
    }

    #[test]
    fn next_belt_follows_order() {
        let ladder = BeltLadder::standard();
        let next = ladder.next_belt(&"white".into()).expect("known");
        assert_eq!(next.map(|b| b.slug.as_str()), Some("blue"));
    }

    #[test]
    fn next_belt_skips_gaps_in_order() {
        let ladder = BeltLadder::new(vec![
            Belt::new("a", "A", BeltCategory::Regular, 10, 2),
            Belt::new("b", "B", BeltCategory::Regular, 30, 2),
        ])
        .expect("ladder");
        let next = ladder.next_belt(&"a".into()).expect("known");
        assert_eq!(next.map(|b| b.slug.as_str()), Some("b"));
    }

    #[test]
    fn next_belt_at_top_is_none() {
        let ladder = BeltLadder::standard();
        assert!(ladder.next_belt(&"red".into()).expect("known").is_none());
    }

    #[test]
    fn next_belt_unknown_slug_fails() {
        let ladder = BeltLadder::standard();
        let result = ladder.next_belt(&"custom-slug".into());
        assert!(matches!(result, Err(ObiError::BeltNotFound(_))));
    }

    #[test]
    fn duplicate_slug_rejected() {
        let result = BeltLadder::new(vec![
            Belt::new("a", "A", BeltCategory::Regular, 1, 2),
            Belt::new("a", "A2", BeltCategory::Regular, 2, 2),
        ]);
        assert!(matches!(result, Err(ObiError::InvalidInput(_))));
    }

    #[test]
    fn duplicate_order_rejected() {
        let result = BeltLadder::new(vec![
            Belt::new("a", "A", BeltCategory::Regular, 1, 2),
            Belt::new("b", "B", BeltCategory::Regular, 1, 2),
        ]);
        assert!(matches!(result, Err(ObiError::InvalidInput(_))));
    }

    #[test]
    fn validate_rank_checks_degree() {
        let ladder = BeltLadder::standard();
        assert!(ladder.validate_rank(&Rank::new("blue", 4)).is_ok());
        assert!(matches!(
            ladder.validate_rank(&Rank::new("blue", 5)),
            Err(ObiError::InvalidInput(_))
        ));
    }

    #[test]
    fn honorific_belts_display_all_degrees() {
        let ladder = BeltLadder::standard();
        assert!(ladder.belt_by_slug(&"red".into()).expect("red").display_all_degrees());
        assert!(!ladder.belt_by_slug(&"black".into()).expect("black").display_all_degrees());
    }

    #[test]
    fn regular_filters_honorific() {
        let ladder = BeltLadder::standard();
        assert_eq!(ladder.regular().count(), 5);
    }
}
