//! Store setup and catalog seeding: `lessongate init`, `lessongate seed`.

use std::path::Path;

use anyhow::Result;
use lessongate::config::GateConfig;
use lessongate::gate::CatalogFile;
use tracing::info;

use super::open_store;

pub fn cmd_init(config: &GateConfig) -> Result<()> {
    open_store(config)?;
    println!(
        "Progress database initialized at {}",
        config.database.path.display()
    );
    Ok(())
}

pub fn cmd_seed(config: &GateConfig, file: &Path) -> Result<()> {
    let catalog = CatalogFile::load(file)?;
    let db = open_store(config)?;
    let summary = db.seed_catalog(&catalog)?;

    info!(
        file = %file.display(),
        modules = summary.modules,
        sections = summary.sections,
        deactivated_modules = summary.deactivated_modules,
        deactivated_sections = summary.deactivated_sections,
        "catalog seeded"
    );
    println!(
        "Seeded {} modules and {} sections from {}",
        summary.modules,
        summary.sections,
        file.display()
    );
    if summary.deactivated_modules + summary.deactivated_sections > 0 {
        println!(
            "Deactivated {} modules and {} sections missing from the file",
            summary.deactivated_modules, summary.deactivated_sections
        );
    }
    Ok(())
}
