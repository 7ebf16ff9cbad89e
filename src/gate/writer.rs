//! Progress Writer: the only component that mutates progress records.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use lessongate_common::{Catalog, EngineError, ProgressStatus};
use tracing::{debug, info};

use super::db::DbHandle;
use super::identity::{PermissionPolicy, authorize};
use super::models::{ProgressRecord, ProgressWrite};
use crate::errors::GateError;

/// One learner action, as received at the boundary. `status` stays a string
/// until validated so an unknown value surfaces as `InvalidStatus`.
#[derive(Debug, Clone)]
pub struct RecordProgress {
    pub module_slug: String,
    pub section_slug: String,
    pub status: String,
    pub completion_percentage: Option<f64>,
    pub payload: Option<serde_json::Value>,
}

#[derive(Clone)]
pub struct ProgressWriter {
    db: DbHandle,
    catalog: Arc<Catalog>,
    policy: Arc<dyn PermissionPolicy>,
    clear_completed_on_regress: bool,
}

impl ProgressWriter {
    pub fn new(
        db: DbHandle,
        catalog: Arc<Catalog>,
        policy: Arc<dyn PermissionPolicy>,
        clear_completed_on_regress: bool,
    ) -> Self {
        Self {
            db,
            catalog,
            policy,
            clear_completed_on_regress,
        }
    }

    pub async fn record_progress(
        &self,
        caller: &str,
        learner_id: &str,
        request: RecordProgress,
    ) -> Result<ProgressRecord, GateError> {
        self.record_progress_at(caller, learner_id, request, Utc::now())
            .await
    }

    /// Validate and upsert one progress record as of `at`.
    ///
    /// Validation order: permission, status, percentage, content, profile.
    /// Store failures propagate as `StoreUnavailable` so the caller can retry.
    pub async fn record_progress_at(
        &self,
        caller: &str,
        learner_id: &str,
        request: RecordProgress,
        at: DateTime<Utc>,
    ) -> Result<ProgressRecord, GateError> {
        authorize(self.policy.as_ref(), caller, learner_id)?;

        let status: ProgressStatus = request.status.parse()?;
        let completion_percentage = match request.completion_percentage {
            Some(p) if !p.is_finite() || !(0.0..=100.0).contains(&p) => {
                return Err(GateError::InvalidPercentage(p));
            }
            Some(p) => Some(p),
            None if status == ProgressStatus::Completed => Some(100.0),
            None => None,
        };

        let resolved = self
            .catalog
            .resolve(&request.module_slug, Some(request.section_slug.as_str()))
            .map_err(|e| match e {
                // A module with no sections has nothing to record against.
                EngineError::EmptyModule { slug } => GateError::ContentNotFound {
                    module: slug,
                    section: Some(request.section_slug.clone()),
                },
                other => other.into(),
            })?;
        let section_id = resolved
            .section_id
            .ok_or_else(|| GateError::ContentNotFound {
                module: request.module_slug.clone(),
                section: Some(request.section_slug.clone()),
            })?;

        let learner = learner_id.to_string();
        let clear_completed_on_regress = self.clear_completed_on_regress;
        let RecordProgress {
            module_slug,
            section_slug,
            payload,
            ..
        } = request;

        let outcome = self
            .db
            .call(move |db| {
                let Some(profile) = db.find_profile(&learner)? else {
                    return Ok(None);
                };
                let record = db.upsert_progress(&ProgressWrite {
                    profile_id: profile.id,
                    module_id: resolved.module_id,
                    module_slug,
                    section_id,
                    section_slug,
                    status,
                    completion_percentage,
                    payload,
                    at,
                    clear_completed_on_regress,
                })?;
                Ok(Some(record))
            })
            .await
            .map_err(GateError::StoreUnavailable)?;

        let record = outcome.ok_or_else(|| GateError::ProfileNotFound {
            learner_id: learner_id.to_string(),
        })?;

        if record.status == ProgressStatus::Completed && record.attempts == 1 {
            info!(
                learner_id,
                module = %record.module_slug,
                section = %record.section_slug,
                "section completed on first attempt"
            );
        }
        debug!(
            learner_id,
            module = %record.module_slug,
            section = %record.section_slug,
            status = %record.status,
            attempts = record.attempts,
            "progress recorded"
        );
        Ok(record)
    }

    /// The learner's records in catalog order.
    pub async fn list_progress(
        &self,
        caller: &str,
        learner_id: &str,
    ) -> Result<Vec<ProgressRecord>, GateError> {
        authorize(self.policy.as_ref(), caller, learner_id)?;

        let learner = learner_id.to_string();
        self.db
            .call(move |db| match db.find_profile(&learner)? {
                Some(profile) => Ok(Some(db.list_progress(profile.id)?)),
                None => Ok(None),
            })
            .await
            .map_err(GateError::StoreUnavailable)?
            .ok_or_else(|| GateError::ProfileNotFound {
                learner_id: learner_id.to_string(),
            })
    }
}
