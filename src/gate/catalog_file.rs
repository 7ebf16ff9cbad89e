//! Catalog seed file.
//!
//! ```toml
//! [[modules]]
//! slug = "counting"
//! title = "Counting"
//! order = 1
//!
//! [[modules.sections]]
//! slug = "one-to-ten"
//! order = 1
//!
//! [[modules.sections]]
//! slug = "skip-counting"
//! order = 2
//! active = false
//! ```

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::errors::GateError;

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionEntry {
    pub slug: String,
    #[serde(default)]
    pub title: Option<String>,
    pub order: i64,
    #[serde(default = "default_active")]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleEntry {
    pub slug: String,
    #[serde(default)]
    pub title: Option<String>,
    pub order: i64,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub sections: Vec<SectionEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub modules: Vec<ModuleEntry>,
}

impl CatalogFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;
        Ok(Self::parse(&content)?)
    }

    pub fn parse(content: &str) -> Result<Self, GateError> {
        let file: Self =
            toml::from_str(content).map_err(|e| GateError::InvalidCatalog(e.to_string()))?;
        file.validate()?;
        Ok(file)
    }

    /// Slugs must be URL-safe and unique in their scope; order ranks must be
    /// unique among active entries in their scope.
    pub fn validate(&self) -> Result<(), GateError> {
        let mut module_slugs = HashSet::new();
        let mut module_orders = HashSet::new();

        for module in &self.modules {
            check_slug(&module.slug)?;
            if !module_slugs.insert(module.slug.as_str()) {
                return Err(invalid(format!("duplicate module slug '{}'", module.slug)));
            }
            if module.active && !module_orders.insert(module.order) {
                return Err(invalid(format!(
                    "duplicate module order {} at '{}'",
                    module.order, module.slug
                )));
            }

            let mut section_slugs = HashSet::new();
            let mut section_orders = HashSet::new();
            for section in &module.sections {
                check_slug(&section.slug)?;
                if !section_slugs.insert(section.slug.as_str()) {
                    return Err(invalid(format!(
                        "duplicate section slug '{}' in module '{}'",
                        section.slug, module.slug
                    )));
                }
                if section.active && !section_orders.insert(section.order) {
                    return Err(invalid(format!(
                        "duplicate section order {} at '{}/{}'",
                        section.order, module.slug, section.slug
                    )));
                }
            }
        }
        Ok(())
    }
}

fn invalid(message: String) -> GateError {
    GateError::InvalidCatalog(message)
}

fn check_slug(slug: &str) -> Result<(), GateError> {
    let valid = !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(invalid(format!(
            "slug '{}' must be non-empty lowercase ascii letters, digits, '-' or '_'",
            slug
        )))
    }
}
