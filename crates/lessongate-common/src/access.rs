use serde::Serialize;

use crate::catalog::{Catalog, Location, ResolvedContent};
use crate::error::EngineError;
use crate::frontier::{Frontier, ProgressSnapshot, resolve_frontier};

/// Where a learner should be sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "location")]
pub enum Target {
    /// The platform's landing page (outside the gated catalog).
    Landing,
    Location(Location),
}

impl Target {
    pub fn to_path(&self, landing_path: &str, location_prefix: &str) -> String {
        match self {
            Target::Landing => landing_path.to_string(),
            Target::Location(location) => location.to_path(location_prefix),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRequest<'a> {
    pub module: &'a str,
    pub section: Option<&'a str>,
}

impl<'a> AccessRequest<'a> {
    pub fn new(module: &'a str, section: Option<&'a str>) -> Self {
        Self { module, section }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    pub allowed: bool,
    pub redirect_to: Option<Target>,
}

impl AccessDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            redirect_to: None,
        }
    }

    pub fn deny(target: Target) -> Self {
        Self {
            allowed: false,
            redirect_to: Some(target),
        }
    }

    pub fn deny_to_landing() -> Self {
        Self::deny(Target::Landing)
    }
}

/// Decide whether `requested` is reachable from `frontier`.
///
/// Allowed:
/// - any module before the frontier's, and the frontier module's intro;
/// - the frontier section itself and anything before it in the frontier
///   module; a learner with recorded progress may also go one step past it;
/// - the next module's intro once the frontier's module is fully completed.
///
/// Everything else is denied with a redirect to the frontier.
pub fn decide_access(frontier: &Frontier, requested: &ResolvedContent) -> AccessDecision {
    let fm = frontier.module_index;
    let fs = frontier.section_index;
    let mi = requested.module_index;

    let allowed = match requested.section_index {
        None => mi <= fm || (mi == fm + 1 && frontier.module_fully_completed),
        Some(si) => {
            let reach = if frontier.has_progress { fs + 1 } else { fs };
            mi < fm || (mi == fm && si <= reach)
        }
    };

    if allowed {
        AccessDecision::allow()
    } else {
        AccessDecision::deny(Target::Location(frontier.location.clone()))
    }
}

/// Resolve, compute the frontier and decide in one step.
///
/// Resolution failures (`ContentNotFound`, `EmptyModule`) and integrity faults
/// (`CatalogEmpty`) are returned to the caller, which decides how to degrade.
pub fn evaluate(
    catalog: &Catalog,
    snapshot: &ProgressSnapshot,
    request: AccessRequest<'_>,
) -> Result<(AccessDecision, Frontier), EngineError> {
    let requested = catalog.resolve(request.module, request.section)?;
    let frontier = resolve_frontier(catalog, snapshot)?;
    Ok((decide_access(&frontier, &requested), frontier))
}
