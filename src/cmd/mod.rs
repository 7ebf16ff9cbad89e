//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module    | Commands handled                                   |
//! |-----------|----------------------------------------------------|
//! | `serve`   | `Serve`                                            |
//! | `catalog` | `Init`, `Seed`                                     |
//! | `learner` | `Enroll`, `Check`, `Next`, `Progress`, `Record`    |
//! | `config`  | `Config`                                           |

pub mod catalog;
pub mod config;
pub mod learner;
pub mod serve;

pub use catalog::{cmd_init, cmd_seed};
pub use config::cmd_config;
pub use learner::{cmd_check, cmd_enroll, cmd_next, cmd_progress, cmd_record};
pub use serve::cmd_serve;

use anyhow::{Context, Result};
use lessongate::config::GateConfig;
use lessongate::gate::{DbHandle, GateDb};

/// Open (creating if needed) the progress store named by `config`.
pub(crate) fn open_store(config: &GateConfig) -> Result<GateDb> {
    let path = &config.database.path;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create database directory")?;
    }
    GateDb::new(path).with_context(|| format!("Failed to open progress store {}", path.display()))
}

pub(crate) fn open_handle(config: &GateConfig) -> Result<DbHandle> {
    Ok(DbHandle::new(open_store(config)?))
}
