//! # Configuration
//!
//! TOML description of the belt ladder and the default rule templates.
//!
//! ```toml
//! [[belts]]
//! slug = "white"
//! name = "White"
//! category = "regular"
//! order = 1
//! max_degree = 4
//!
//! [[templates]]
//! belt = "white"
//! min_classes = 120
//! min_months = 12
//! classes_per_degree = 30
//! ```
//!
//! With no `[[belts]]` the built-in ladder is used. Templates are optional.

use obi_core::{Belt, BeltCategory, BeltLadder, BeltSlug, Engine, GraduationRule, ObiError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Maximum configuration file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// One belt entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeltConfig {
    pub slug: String,
    pub name: String,
    pub category: BeltCategory,
    pub order: u32,
    pub max_degree: u8,
}

/// One default rule template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub belt: String,
    pub min_classes: u32,
    pub min_months: u32,
    pub classes_per_degree: u32,
    #[serde(default)]
    pub min_weekly_frequency_tenths: Option<u32>,
}

impl TemplateConfig {
    fn rule(&self) -> GraduationRule {
        GraduationRule {
            min_weekly_frequency_tenths: self.min_weekly_frequency_tenths,
            ..GraduationRule::new(self.min_classes, self.min_months, self.classes_per_degree)
        }
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObiConfig {
    #[serde(default)]
    pub belts: Vec<BeltConfig>,
    #[serde(default)]
    pub templates: Vec<TemplateConfig>,
}

impl ObiConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ObiError> {
        toml::from_str(content)
            .map_err(|e| ObiError::InvalidInput(format!("failed to parse TOML config: {}", e)))
    }

    /// Load a configuration file, or the defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ObiError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let metadata = std::fs::metadata(path)
            .map_err(|e| ObiError::IoError(format!("Cannot read config '{}': {}", path.display(), e)))?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ObiError::InvalidInput(format!(
                "config file size {} bytes exceeds maximum {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ObiError::IoError(format!("Read config: {}", e)))?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(
            path = %path.display(),
            belts = config.belts.len(),
            templates = config.templates.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Build the belt ladder. An empty belt list means the built-in ladder.
    pub fn ladder(&self) -> Result<BeltLadder, ObiError> {
        if self.belts.is_empty() {
            return Ok(BeltLadder::standard());
        }
        BeltLadder::new(
            self.belts
                .iter()
                .map(|b| Belt::new(&b.slug, &b.name, b.category, b.order, b.max_degree))
                .collect(),
        )
    }

    /// Write every template into the engine. Returns how many were written.
    pub fn apply_templates(&self, engine: &mut Engine) -> Result<usize, ObiError> {
        for template in &self.templates {
            engine.set_template_rule(&BeltSlug::new(template.belt.as_str()), template.rule())?;
        }
        Ok(self.templates.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obi_core::AcademyId;

    const SAMPLE: &str = r#"
[[belts]]
slug = "white"
name = "White"
category = "regular"
order = 1
max_degree = 4

[[belts]]
slug = "blue"
name = "Blue"
category = "regular"
order = 2
max_degree = 4

[[templates]]
belt = "white"
min_classes = 120
min_months = 12
classes_per_degree = 30
min_weekly_frequency_tenths = 20
"#;

    #[test]
    fn empty_config_uses_standard_ladder() {
        let config = ObiConfig::from_toml_str("").expect("parse");
        assert_eq!(config.ladder().expect("ladder").len(), 8);
    }

    #[test]
    fn custom_ladder_and_templates() {
        let config = ObiConfig::from_toml_str(SAMPLE).expect("parse");
        let ladder = config.ladder().expect("ladder");
        assert_eq!(ladder.len(), 2);

        let mut engine = Engine::in_memory(ladder);
        assert_eq!(config.apply_templates(&mut engine).expect("apply"), 1);
        let rules = engine.list_rules(AcademyId(1)).expect("rules");
        assert_eq!(rules[0].rule.min_classes, 120);
        assert_eq!(rules[0].rule.min_weekly_frequency_tenths, Some(20));
    }

    #[test]
    fn template_for_unknown_belt_fails() {
        let config = ObiConfig::from_toml_str(
            "[[templates]]\nbelt = \"green\"\nmin_classes = 1\nmin_months = 1\nclasses_per_degree = 1\n",
        )
        .expect("parse");
        let mut engine = Engine::default();
        assert!(matches!(
            config.apply_templates(&mut engine),
            Err(ObiError::BeltNotFound(_))
        ));
    }

    #[test]
    fn malformed_toml_is_invalid_input() {
        assert!(matches!(
            ObiConfig::from_toml_str("belts = 3"),
            Err(ObiError::InvalidInput(_))
        ));
    }
}
