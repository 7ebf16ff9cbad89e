use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// An ordered sub-unit of a module (a "scene").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: i64,
    pub slug: String,
    pub title: Option<String>,
    pub order: i64,
}

/// A top-level ordered content unit (an "activity").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: i64,
    pub slug: String,
    pub title: Option<String>,
    pub order: i64,
    pub sections: Vec<Section>,
}

/// A place in the catalog a learner can be sent to. `section == None` is the
/// module's intro page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub module: String,
    pub section: Option<String>,
}

impl Location {
    pub fn module_intro(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            section: None,
        }
    }

    pub fn section(module: impl Into<String>, section: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            section: Some(section.into()),
        }
    }

    /// Render as a URL path under `prefix` (e.g. `/learn/fractions/halves`).
    pub fn to_path(&self, prefix: &str) -> String {
        let prefix = prefix.trim_end_matches('/');
        match &self.section {
            Some(section) => format!("{}/{}/{}", prefix, self.module, section),
            None => format!("{}/{}", prefix, self.module),
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.section {
            Some(section) => write!(f, "{}/{}", self.module, section),
            None => write!(f, "{}", self.module),
        }
    }
}

/// A requested location resolved to catalog positions and store ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedContent {
    pub module_index: usize,
    pub module_id: i64,
    pub section_index: Option<usize>,
    pub section_id: Option<i64>,
}

/// Read-only, totally ordered view of the active content.
///
/// Modules are kept sorted by order rank and each module's sections sorted by
/// their own order rank, so positions (indices) and ranks agree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    modules: Vec<Module>,
}

impl Catalog {
    pub fn new(mut modules: Vec<Module>) -> Self {
        modules.sort_by_key(|m| m.order);
        for module in &mut modules {
            module.sections.sort_by_key(|s| s.order);
        }
        Self { modules }
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn module(&self, index: usize) -> Option<&Module> {
        self.modules.get(index)
    }

    /// Every (module, section) pair in catalog order, with their positions.
    /// Modules without sections contribute nothing.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize, &Module, &Section)> {
        self.modules.iter().enumerate().flat_map(|(mi, module)| {
            module
                .sections
                .iter()
                .enumerate()
                .map(move |(si, section)| (mi, si, module, section))
        })
    }

    /// Position of the first module that has at least one section.
    pub fn first_module_index(&self) -> Result<usize, EngineError> {
        self.modules
            .iter()
            .position(|m| !m.sections.is_empty())
            .ok_or(EngineError::CatalogEmpty)
    }

    /// Location of the pair at the given positions. Callers pass positions
    /// obtained from this catalog.
    pub fn location_at(&self, module_index: usize, section_index: usize) -> Location {
        let module = &self.modules[module_index];
        Location::section(&module.slug, &module.sections[section_index].slug)
    }

    /// Resolve slugs to positions. An unknown slug is `ContentNotFound`; a
    /// module with no sections is `EmptyModule`.
    pub fn resolve(
        &self,
        module_slug: &str,
        section_slug: Option<&str>,
    ) -> Result<ResolvedContent, EngineError> {
        let not_found = || EngineError::ContentNotFound {
            module: module_slug.to_string(),
            section: section_slug.map(str::to_string),
        };

        let (module_index, module) = self
            .modules
            .iter()
            .enumerate()
            .find(|(_, m)| m.slug == module_slug)
            .ok_or_else(not_found)?;

        if module.sections.is_empty() {
            return Err(EngineError::EmptyModule {
                slug: module.slug.clone(),
            });
        }

        let Some(section_slug) = section_slug else {
            return Ok(ResolvedContent {
                module_index,
                module_id: module.id,
                section_index: None,
                section_id: None,
            });
        };

        let (section_index, section) = module
            .sections
            .iter()
            .enumerate()
            .find(|(_, s)| s.slug == section_slug)
            .ok_or_else(not_found)?;

        Ok(ResolvedContent {
            module_index,
            module_id: module.id,
            section_index: Some(section_index),
            section_id: Some(section.id),
        })
    }
}
