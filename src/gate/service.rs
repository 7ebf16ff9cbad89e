//! Read paths: the Access Gate and the Redirect Advisor.
//!
//! Both compute the learner's frontier from a fresh snapshot on every call and
//! never write. Their public entry points cannot fail: any error degrades to
//! a landing-page redirect. The `try_` variants expose the underlying error
//! for the CLI and tests.

use std::sync::Arc;

use lessongate_common::{
    AccessDecision, AccessRequest, Catalog, ProgressSnapshot, Target, evaluate,
};
use tracing::{debug, warn};

use super::db::DbHandle;
use super::identity::{PermissionPolicy, authorize};
use super::writer::ProgressWriter;
use crate::errors::GateError;

/// Load the learner's progress snapshot, or `ProfileNotFound`.
async fn load_snapshot(db: &DbHandle, learner_id: &str) -> Result<ProgressSnapshot, GateError> {
    let learner = learner_id.to_string();
    db.call(move |db| match db.find_profile(&learner)? {
        Some(profile) => Ok(Some(db.progress_snapshot(profile.id)?)),
        None => Ok(None),
    })
    .await
    .map_err(GateError::StoreUnavailable)?
    .ok_or_else(|| GateError::ProfileNotFound {
        learner_id: learner_id.to_string(),
    })
}

fn log_degraded(operation: &str, learner_id: &str, err: &GateError) {
    match err {
        // Bad links are ordinary traffic.
        GateError::ContentNotFound { .. } => {
            debug!(operation, learner_id, error = %err, "unresolvable content, sending to landing")
        }
        _ => warn!(
            operation,
            learner_id,
            kind = err.kind(),
            error = %err,
            "degrading to landing page"
        ),
    }
}

#[derive(Clone)]
pub struct AccessGate {
    db: DbHandle,
    catalog: Arc<Catalog>,
    policy: Arc<dyn PermissionPolicy>,
}

impl AccessGate {
    pub fn new(db: DbHandle, catalog: Arc<Catalog>, policy: Arc<dyn PermissionPolicy>) -> Self {
        Self {
            db,
            catalog,
            policy,
        }
    }

    /// Decide whether the learner may open the requested content. Never fails:
    /// every error becomes a deny with a redirect to the landing page.
    pub async fn check_access(
        &self,
        caller: &str,
        learner_id: &str,
        module_slug: &str,
        section_slug: Option<&str>,
    ) -> AccessDecision {
        match self
            .try_check_access(caller, learner_id, module_slug, section_slug)
            .await
        {
            Ok(decision) => decision,
            Err(err) => {
                log_degraded("check_access", learner_id, &err);
                AccessDecision::deny_to_landing()
            }
        }
    }

    pub async fn try_check_access(
        &self,
        caller: &str,
        learner_id: &str,
        module_slug: &str,
        section_slug: Option<&str>,
    ) -> Result<AccessDecision, GateError> {
        authorize(self.policy.as_ref(), caller, learner_id)?;
        let snapshot = load_snapshot(&self.db, learner_id).await?;
        let (decision, frontier) = evaluate(
            &self.catalog,
            &snapshot,
            AccessRequest::new(module_slug, section_slug),
        )?;

        debug!(
            learner_id,
            module = module_slug,
            section = section_slug.unwrap_or(""),
            frontier = %frontier.location,
            allowed = decision.allowed,
            "access decided"
        );
        Ok(decision)
    }
}

#[derive(Clone)]
pub struct RedirectAdvisor {
    db: DbHandle,
    catalog: Arc<Catalog>,
    policy: Arc<dyn PermissionPolicy>,
}

impl RedirectAdvisor {
    pub fn new(db: DbHandle, catalog: Arc<Catalog>, policy: Arc<dyn PermissionPolicy>) -> Self {
        Self {
            db,
            catalog,
            policy,
        }
    }

    /// Where to send the learner next. Failures degrade to the landing page.
    pub async fn next_destination(&self, caller: &str, learner_id: &str) -> Target {
        match self.try_next_destination(caller, learner_id).await {
            Ok(target) => target,
            Err(err) => {
                log_degraded("next_destination", learner_id, &err);
                Target::Landing
            }
        }
    }

    pub async fn try_next_destination(
        &self,
        caller: &str,
        learner_id: &str,
    ) -> Result<Target, GateError> {
        authorize(self.policy.as_ref(), caller, learner_id)?;
        let snapshot = load_snapshot(&self.db, learner_id).await?;
        let target = lessongate_common::next_destination(&self.catalog, &snapshot)?;
        debug!(learner_id, target = ?target, "next destination");
        Ok(target)
    }
}

/// The three components wired to one store, catalog and policy.
#[derive(Clone)]
pub struct Services {
    pub writer: ProgressWriter,
    pub gate: AccessGate,
    pub advisor: RedirectAdvisor,
}

impl Services {
    pub fn new(
        db: DbHandle,
        catalog: Arc<Catalog>,
        policy: Arc<dyn PermissionPolicy>,
        clear_completed_on_regress: bool,
    ) -> Self {
        Self {
            writer: ProgressWriter::new(
                db.clone(),
                catalog.clone(),
                policy.clone(),
                clear_completed_on_regress,
            ),
            gate: AccessGate::new(db.clone(), catalog.clone(), policy.clone()),
            advisor: RedirectAdvisor::new(db, catalog, policy),
        }
    }

    /// Load the active catalog from the store and wire the components.
    pub fn from_store(
        db: DbHandle,
        policy: Arc<dyn PermissionPolicy>,
        clear_completed_on_regress: bool,
    ) -> anyhow::Result<Self> {
        let catalog = db.lock_sync()?.load_catalog()?;
        Ok(Self::new(
            db,
            Arc::new(catalog),
            policy,
            clear_completed_on_regress,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::catalog_file::CatalogFile;
    use crate::gate::db::GateDb;
    use crate::gate::identity::tests::Broken;
    use crate::gate::identity::{SelfOnly, Unrestricted};
    use crate::gate::writer::RecordProgress;
    use lessongate_common::Location;

    const CATALOG: &str = r#"
        [[modules]]
        slug = "a"
        order = 1
        [[modules.sections]]
        slug = "a1"
        order = 1
        [[modules.sections]]
        slug = "a2"
        order = 2

        [[modules]]
        slug = "b"
        order = 2
        [[modules.sections]]
        slug = "b1"
        order = 1
    "#;

    fn services_with(policy: Arc<dyn PermissionPolicy>, catalog: &str) -> Services {
        let db = GateDb::new_in_memory().unwrap();
        db.seed_catalog(&CatalogFile::parse(catalog).unwrap()).unwrap();
        db.enroll("ada").unwrap();
        Services::from_store(DbHandle::new(db), policy, false).unwrap()
    }

    fn services() -> Services {
        services_with(Arc::new(SelfOnly), CATALOG)
    }

    async fn complete(services: &Services, module: &str, section: &str) {
        services
            .writer
            .record_progress(
                "ada",
                "ada",
                RecordProgress {
                    module_slug: module.to_string(),
                    section_slug: section.to_string(),
                    status: "completed".to_string(),
                    completion_percentage: None,
                    payload: None,
                },
            )
            .await
            .unwrap();
    }

    async fn check(services: &Services, module: &str, section: Option<&str>) -> AccessDecision {
        services.gate.check_access("ada", "ada", module, section).await
    }

    fn to(module: &str, section: &str) -> Option<Target> {
        Some(Target::Location(Location::section(module, section)))
    }

    #[tokio::test]
    async fn new_learner_is_held_at_first_section() {
        let s = services();
        assert!(check(&s, "a", Some("a1")).await.allowed);
        assert!(check(&s, "a", None).await.allowed);

        let a2 = check(&s, "a", Some("a2")).await;
        assert!(!a2.allowed);
        assert_eq!(a2.redirect_to, to("a", "a1"));

        let b = check(&s, "b", None).await;
        assert!(!b.allowed);
        assert_eq!(b.redirect_to, to("a", "a1"));
    }

    #[tokio::test]
    async fn completing_a_section_unlocks_the_next() {
        let s = services();
        complete(&s, "a", "a1").await;
        assert!(check(&s, "a", Some("a2")).await.allowed);
        assert!(!check(&s, "b", Some("b1")).await.allowed);
    }

    #[tokio::test]
    async fn completing_a_module_unlocks_next_intro() {
        let s = services();
        complete(&s, "a", "a1").await;
        complete(&s, "a", "a2").await;
        assert!(check(&s, "b", None).await.allowed);
    }

    #[tokio::test]
    async fn completed_content_can_be_replayed() {
        let s = services();
        complete(&s, "a", "a1").await;
        complete(&s, "a", "a2").await;
        complete(&s, "b", "b1").await;
        assert!(check(&s, "a", Some("a1")).await.allowed);
        assert!(check(&s, "b", Some("b1")).await.allowed);
    }

    #[tokio::test]
    async fn unknown_slug_redirects_to_landing() {
        let s = services();
        let decision = check(&s, "does-not-exist", Some("x")).await;
        assert_eq!(decision, AccessDecision::deny_to_landing());

        let err = s
            .gate
            .try_check_access("ada", "ada", "a", Some("zz"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "ContentNotFound");
    }

    #[tokio::test]
    async fn unprovisioned_learner_is_sent_to_landing() {
        let s = services_with(Arc::new(Unrestricted), CATALOG);
        let decision = s.gate.check_access("grace", "grace", "a", Some("a1")).await;
        assert_eq!(decision, AccessDecision::deny_to_landing());
        assert_eq!(
            s.advisor.next_destination("grace", "grace").await,
            Target::Landing
        );
    }

    #[tokio::test]
    async fn permission_failures_fail_closed() {
        let s = services();
        assert_eq!(
            s.gate.check_access("grace", "ada", "a", Some("a1")).await,
            AccessDecision::deny_to_landing()
        );

        let broken = services_with(Arc::new(Broken), CATALOG);
        assert_eq!(
            broken.gate.check_access("ada", "ada", "a", Some("a1")).await,
            AccessDecision::deny_to_landing()
        );
        assert_eq!(
            broken.advisor.next_destination("ada", "ada").await,
            Target::Landing
        );
    }

    #[tokio::test]
    async fn empty_catalog_degrades_to_landing() {
        let s = services_with(Arc::new(SelfOnly), "");
        let err = s.advisor.try_next_destination("ada", "ada").await.unwrap_err();
        assert_eq!(err.kind(), "CatalogEmpty");
        assert_eq!(s.advisor.next_destination("ada", "ada").await, Target::Landing);
    }

    #[tokio::test]
    async fn advisor_follows_first_incomplete_pair() {
        let s = services();
        assert_eq!(s.advisor.next_destination("ada", "ada").await, to("a", "a1").unwrap());

        complete(&s, "a", "a1").await;
        assert_eq!(s.advisor.next_destination("ada", "ada").await, to("a", "a2").unwrap());

        complete(&s, "a", "a2").await;
        complete(&s, "b", "b1").await;
        assert_eq!(s.advisor.next_destination("ada", "ada").await, Target::Landing);
    }
}
