//! Collaborator seams: who is calling, and may they touch this learner's data.
//!
//! Session issuance lives outside this service. The default
//! [`HeaderIdentity`] trusts a header set by the upstream session layer; the
//! default [`SelfOnly`] policy lets a caller act only on their own progress.

use axum::http::{HeaderMap, HeaderName};
use tracing::warn;

use crate::errors::GateError;

/// Yields the stable learner id for a request.
pub trait IdentityProvider: Send + Sync {
    fn identify(&self, headers: &HeaderMap) -> Result<String, GateError>;
}

/// "Can this caller act on this learner's data". An `Err` means the check
/// itself failed and is treated as a denial.
pub trait PermissionPolicy: Send + Sync {
    fn can_act_on(&self, caller: &str, learner_id: &str) -> anyhow::Result<bool>;
}

pub struct HeaderIdentity {
    header: HeaderName,
}

impl HeaderIdentity {
    pub fn new(header: &str) -> anyhow::Result<Self> {
        let header = HeaderName::from_bytes(header.as_bytes())
            .map_err(|e| anyhow::anyhow!("Invalid identity header '{}': {}", header, e))?;
        Ok(Self { header })
    }
}

impl IdentityProvider for HeaderIdentity {
    fn identify(&self, headers: &HeaderMap) -> Result<String, GateError> {
        headers
            .get(&self.header)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or(GateError::Unauthenticated)
    }
}

/// Callers may only act on themselves.
pub struct SelfOnly;

impl PermissionPolicy for SelfOnly {
    fn can_act_on(&self, caller: &str, learner_id: &str) -> anyhow::Result<bool> {
        Ok(caller == learner_id)
    }
}

/// Local operator access (CLI). Every caller may act on every learner.
pub struct Unrestricted;

impl PermissionPolicy for Unrestricted {
    fn can_act_on(&self, _caller: &str, _learner_id: &str) -> anyhow::Result<bool> {
        Ok(true)
    }
}

/// Run the permission check, failing closed.
pub fn authorize(
    policy: &dyn PermissionPolicy,
    caller: &str,
    learner_id: &str,
) -> Result<(), GateError> {
    let forbidden = || GateError::Forbidden {
        caller: caller.to_string(),
        learner_id: learner_id.to_string(),
    };
    match policy.can_act_on(caller, learner_id) {
        Ok(true) => Ok(()),
        Ok(false) => Err(forbidden()),
        Err(e) => {
            warn!(caller, learner_id, error = %e, "permission check failed, denying");
            Err(forbidden())
        }
    }
}
