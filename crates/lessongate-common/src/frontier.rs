//! Frontier Resolver.
//!
//! The frontier is the furthest (module, section) pair a learner's recorded
//! progress entitles them to reach. It is recomputed from scratch on every
//! check by replaying the catalog in order against a progress snapshot, so
//! writes for different sections may land in any order.

use std::collections::HashMap;

use serde::Serialize;

use crate::catalog::{Catalog, Location};
use crate::error::EngineError;
use crate::status::ProgressStatus;

/// Status of every section a learner has a record for, keyed by
/// `(module_id, section_id)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    statuses: HashMap<(i64, i64), ProgressStatus>,
}

impl ProgressSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, module_id: i64, section_id: i64, status: ProgressStatus) {
        self.statuses.insert((module_id, section_id), status);
    }

    pub fn status(&self, module_id: i64, section_id: i64) -> Option<ProgressStatus> {
        self.statuses.get(&(module_id, section_id)).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }
}

impl FromIterator<(i64, i64, ProgressStatus)> for ProgressSnapshot {
    fn from_iter<I: IntoIterator<Item = (i64, i64, ProgressStatus)>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for (module_id, section_id, status) in iter {
            snapshot.insert(module_id, section_id, status);
        }
        snapshot
    }
}

/// Output of [`resolve_frontier`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Frontier {
    pub location: Location,
    pub module_index: usize,
    pub section_index: usize,
    /// Every section of the frontier's module is `completed`.
    pub module_fully_completed: bool,
    /// Last `completed` pair seen before the scan stopped.
    pub last_completed: Option<Location>,
    /// The learner has at least one progress record.
    pub has_progress: bool,
}

impl Frontier {
    /// Catalog position; compares in catalog order.
    pub fn position(&self) -> (usize, usize) {
        (self.module_index, self.section_index)
    }
}

/// Compute the learner's frontier.
///
/// - No records at all: first section of the first module.
/// - Otherwise the first pair that is `in_progress`, `not_started` or has no
///   record. `completed` and `skipped` pairs are walked past.
/// - Every pair walked past: the final pair of the catalog.
pub fn resolve_frontier(
    catalog: &Catalog,
    snapshot: &ProgressSnapshot,
) -> Result<Frontier, EngineError> {
    let first_module = catalog.first_module_index()?;

    if snapshot.is_empty() {
        return Ok(build(catalog, snapshot, first_module, 0, None));
    }

    let mut last_completed = None;
    let mut last_pair = (first_module, 0);

    for (mi, si, module, section) in catalog.pairs() {
        last_pair = (mi, si);
        match snapshot.status(module.id, section.id) {
            Some(status) if status.is_passed() => {
                if status == ProgressStatus::Completed {
                    last_completed = Some((mi, si));
                }
            }
            _ => return Ok(build(catalog, snapshot, mi, si, last_completed)),
        }
    }

    Ok(build(catalog, snapshot, last_pair.0, last_pair.1, last_completed))
}

fn build(
    catalog: &Catalog,
    snapshot: &ProgressSnapshot,
    module_index: usize,
    section_index: usize,
    last_completed: Option<(usize, usize)>,
) -> Frontier {
    Frontier {
        location: catalog.location_at(module_index, section_index),
        module_index,
        section_index,
        module_fully_completed: module_completed(catalog, snapshot, module_index),
        last_completed: last_completed.map(|(mi, si)| catalog.location_at(mi, si)),
        has_progress: !snapshot.is_empty(),
    }
}

fn module_completed(catalog: &Catalog, snapshot: &ProgressSnapshot, module_index: usize) -> bool {
    catalog.module(module_index).is_some_and(|module| {
        !module.sections.is_empty()
            && module
                .sections
                .iter()
                .all(|s| snapshot.status(module.id, s.id) == Some(ProgressStatus::Completed))
    })
}
