//! Per-learner commands: `lessongate enroll|check|next|progress|record`.
//!
//! These run as the local operator, so the permission policy is
//! [`Unrestricted`].

use std::sync::Arc;

use anyhow::Result;
use lessongate::config::GateConfig;
use lessongate::gate::identity::Unrestricted;
use lessongate::gate::{RecordProgress, Services};
use lessongate_common::{AccessDecision, Target};
use tracing::info;

use super::{open_handle, open_store};

const OPERATOR: &str = "cli";

fn services(config: &GateConfig) -> Result<Services> {
    Services::from_store(
        open_handle(config)?,
        Arc::new(Unrestricted),
        config.progress.clear_completed_on_regress,
    )
}

fn render(config: &GateConfig, target: &Target) -> String {
    target.to_path(&config.routing.landing_path, &config.routing.location_prefix)
}

pub fn cmd_enroll(config: &GateConfig, learner: &str) -> Result<()> {
    let profile = open_store(config)?.enroll(learner)?;
    info!(learner_id = learner, profile_id = profile.id, "learner enrolled");
    println!("Enrolled {} (profile {})", profile.learner_id, profile.id);
    Ok(())
}

pub async fn cmd_check(
    config: &GateConfig,
    learner: &str,
    module: &str,
    section: Option<&str>,
) -> Result<()> {
    let services = services(config)?;
    match services
        .gate
        .try_check_access(OPERATOR, learner, module, section)
        .await
    {
        Ok(AccessDecision { allowed: true, .. }) => println!("allowed"),
        Ok(AccessDecision {
            redirect_to: Some(target),
            ..
        }) => println!("denied, redirect to {}", render(config, &target)),
        Ok(AccessDecision { .. }) => println!("denied"),
        Err(e) => println!(
            "denied, redirect to {} ({}: {})",
            render(config, &Target::Landing),
            e.kind(),
            e
        ),
    }
    Ok(())
}

pub async fn cmd_next(config: &GateConfig, learner: &str) -> Result<()> {
    let services = services(config)?;
    let target = services.advisor.try_next_destination(OPERATOR, learner).await?;
    println!("{}", render(config, &target));
    Ok(())
}

pub async fn cmd_progress(config: &GateConfig, learner: &str, json: bool) -> Result<()> {
    let services = services(config)?;
    let records = services.writer.list_progress(OPERATOR, learner).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }
    if records.is_empty() {
        println!("No progress recorded for {}", learner);
        return Ok(());
    }
    for record in &records {
        println!(
            "{:<32} {:<12} {:>5.1}%  attempts={:<3} completed_at={}",
            format!("{}/{}", record.module_slug, record.section_slug),
            record.status,
            record.completion_percentage,
            record.attempts,
            record.completed_at.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

pub async fn cmd_record(
    config: &GateConfig,
    learner: &str,
    module: String,
    section: String,
    status: String,
    percentage: Option<f64>,
) -> Result<()> {
    let services = services(config)?;
    let record = services
        .writer
        .record_progress(
            OPERATOR,
            learner,
            RecordProgress {
                module_slug: module,
                section_slug: section,
                status,
                completion_percentage: percentage,
                payload: None,
            },
        )
        .await?;
    println!(
        "Recorded {}/{} as {} for {} (attempts={})",
        record.module_slug, record.section_slug, record.status, learner, record.attempts
    );
    Ok(())
}
