//! Redirect Advisor: the single best place to send a learner at login or
//! after a denial.

use crate::access::Target;
use crate::catalog::Catalog;
use crate::error::EngineError;
use crate::frontier::ProgressSnapshot;
use crate::status::ProgressStatus;

/// First pair in catalog order that is not `completed`; the landing page once
/// everything is completed. A learner with no records starts at the first
/// section.
pub fn next_destination(
    catalog: &Catalog,
    snapshot: &ProgressSnapshot,
) -> Result<Target, EngineError> {
    let first_module = catalog.first_module_index()?;

    if snapshot.is_empty() {
        return Ok(Target::Location(catalog.location_at(first_module, 0)));
    }

    let pending = catalog
        .pairs()
        .find(|(_, _, module, section)| {
            snapshot.status(module.id, section.id) != Some(ProgressStatus::Completed)
        });

    Ok(match pending {
        Some((mi, si, _, _)) => Target::Location(catalog.location_at(mi, si)),
        None => Target::Landing,
    })
}
