//! Configuration for lessongate, read from `lessongate.toml`.
//!
//! Layering is file → environment (`LESSONGATE_*`) → CLI flags. Every field
//! has a default, so an empty or missing file is a valid configuration.
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 3142
//! dev_mode = false
//!
//! [database]
//! path = ".lessongate/progress.db"
//!
//! [routing]
//! landing_path = "/home"
//! location_prefix = "/learn"
//!
//! [identity]
//! learner_header = "x-learner-id"
//!
//! [progress]
//! clear_completed_on_regress = false
//!
//! [logging]
//! level = "info"
//! json = false
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "lessongate.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Permissive CORS for a local front-end dev server
    #[serde(default)]
    pub dev_mode: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3142
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            dev_mode: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSection {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from(".lessongate/progress.db")
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// How decisions are rendered into redirect paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingSection {
    /// Where denied or finished learners are sent
    #[serde(default = "default_landing_path")]
    pub landing_path: String,
    /// Prefix for module/section paths, e.g. `/learn/fractions/halves`
    #[serde(default = "default_location_prefix")]
    pub location_prefix: String,
}

fn default_landing_path() -> String {
    "/home".to_string()
}

fn default_location_prefix() -> String {
    "/learn".to_string()
}

impl Default for RoutingSection {
    fn default() -> Self {
        Self {
            landing_path: default_landing_path(),
            location_prefix: default_location_prefix(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentitySection {
    /// Header the upstream session layer sets to the authenticated learner id
    #[serde(default = "default_learner_header")]
    pub learner_header: String,
}

fn default_learner_header() -> String {
    "x-learner-id".to_string()
}

impl Default for IdentitySection {
    fn default() -> Self {
        Self {
            learner_header: default_learner_header(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSection {
    /// Clear `completed_at` when a completed record is rewritten with another
    /// status. Off by default: the first completion is permanent.
    #[serde(default)]
    pub clear_completed_on_regress: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// The complete lessongate.toml structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub routing: RoutingSection,
    #[serde(default)]
    pub identity: IdentitySection,
    #[serde(default)]
    pub progress: ProgressSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl GateConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse lessongate.toml")?;
        config.validate()?;
        Ok(config)
    }

    /// Load the config file at `config_path`, or defaults if there is none.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            Self::load(config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize lessongate.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Apply `LESSONGATE_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (the process environment in
    /// production, a map in tests).
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("LESSONGATE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("LESSONGATE_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("Invalid LESSONGATE_PORT '{}'", port))?;
        }
        if let Some(path) = lookup("LESSONGATE_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(landing) = lookup("LESSONGATE_LANDING_PATH") {
            self.routing.landing_path = landing;
        }
        if let Some(header) = lookup("LESSONGATE_LEARNER_HEADER") {
            self.identity.learner_header = header;
        }
        if let Some(level) = lookup("LESSONGATE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = lookup("LESSONGATE_LOG_JSON") {
            self.logging.json = json != "false" && json != "0";
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if !self.routing.landing_path.starts_with('/') {
            anyhow::bail!(
                "routing.landing_path must start with '/', got '{}'",
                self.routing.landing_path
            );
        }
        if !self.routing.location_prefix.is_empty() && !self.routing.location_prefix.starts_with('/')
        {
            anyhow::bail!(
                "routing.location_prefix must be empty or start with '/', got '{}'",
                self.routing.location_prefix
            );
        }
        axum::http::HeaderName::from_bytes(self.identity.learner_header.as_bytes()).with_context(
            || {
                format!(
                    "identity.learner_header '{}' is not a valid header name",
                    self.identity.learner_header
                )
            },
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn empty_file_yields_defaults() {
        let config = GateConfig::parse("").unwrap();
        assert_eq!(config, GateConfig::default());
        assert_eq!(config.server.port, 3142);
        assert_eq!(config.routing.landing_path, "/home");
        assert_eq!(config.routing.location_prefix, "/learn");
        assert_eq!(config.identity.learner_header, "x-learner-id");
        assert!(!config.progress.clear_completed_on_regress);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = GateConfig::parse(
            r#"
            [server]
            port = 8080

            [progress]
            clear_completed_on_regress = true
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.progress.clear_completed_on_regress);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn rejects_relative_landing_path() {
        let err = GateConfig::parse(
            r#"
            [routing]
            landing_path = "home"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("landing_path"));
    }

    #[test]
    fn rejects_invalid_header_name() {
        let result = GateConfig::parse(
            r#"
            [identity]
            learner_header = "bad header"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("LESSONGATE_PORT", "9000"),
            ("LESSONGATE_DB_PATH", "/tmp/progress.db"),
            ("LESSONGATE_LOG_JSON", "true"),
        ]);
        let mut config = GateConfig::default();
        config
            .apply_env_from(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.path, PathBuf::from("/tmp/progress.db"));
        assert!(config.logging.json);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn env_rejects_bad_port() {
        let mut config = GateConfig::default();
        let err = config
            .apply_env_from(|k| (k == "LESSONGATE_PORT").then(|| "not-a-port".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("LESSONGATE_PORT"));
    }

    #[test]
    fn save_then_load_or_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        assert_eq!(
            GateConfig::load_or_default(&path).unwrap(),
            GateConfig::default()
        );

        let mut config = GateConfig::default();
        config.routing.landing_path = "/start".to_string();
        config.save(&path).unwrap();

        let loaded = GateConfig::load_or_default(&path).unwrap();
        assert_eq!(loaded.routing.landing_path, "/start");
    }
}
