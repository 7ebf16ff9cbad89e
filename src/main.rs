use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use lessongate::config::{CONFIG_FILE_NAME, GateConfig};

mod cmd;

#[derive(Parser)]
#[command(name = "lessongate")]
#[command(version, about = "Progress-gated access control for sequential lessons")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding lessongate.toml (defaults to the current directory)
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Explicit config file path. Overrides --project-dir lookup.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Progress database path. Overrides lessongate.toml and LESSONGATE_DB_PATH.
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP gate service
    Serve {
        /// Port to serve on
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Enable dev mode (CORS permissive for a local front-end dev server)
        #[arg(long)]
        dev: bool,
    },
    /// Create the progress database
    Init,
    /// Load a catalog file into the store (upsert by slug)
    Seed {
        /// Path to a catalog TOML file
        file: PathBuf,
    },
    /// Create a learner's enrollment profile
    Enroll { learner: String },
    /// Ask the gate whether a learner may open a module or section
    Check {
        learner: String,
        module: String,
        section: Option<String>,
    },
    /// Show where a learner should go next
    Next { learner: String },
    /// List a learner's progress records
    Progress {
        learner: String,

        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record a progress event for a learner
    Record {
        learner: String,
        module: String,
        section: String,
        /// not_started, in_progress, completed or skipped
        status: String,

        /// Completion percentage (0-100)
        #[arg(long)]
        percentage: Option<f64>,
    },
    /// View, validate or create lessongate.toml
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    Show,
    Validate,
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| project_dir.join(CONFIG_FILE_NAME));

    let mut config = GateConfig::load_or_default(&config_path)?;
    config.apply_env()?;
    if let Some(db_path) = &cli.db_path {
        config.database.path = db_path.clone();
    }

    lessongate::logging::init(&config.logging, cli.verbose);

    match cli.command {
        Commands::Serve { port, host, dev } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(host) = host {
                config.server.host = host;
            }
            config.server.dev_mode |= dev;
            cmd::cmd_serve(&config).await?;
        }
        Commands::Init => cmd::cmd_init(&config)?,
        Commands::Seed { file } => cmd::cmd_seed(&config, &file)?,
        Commands::Enroll { learner } => cmd::cmd_enroll(&config, &learner)?,
        Commands::Check {
            learner,
            module,
            section,
        } => cmd::cmd_check(&config, &learner, &module, section.as_deref()).await?,
        Commands::Next { learner } => cmd::cmd_next(&config, &learner).await?,
        Commands::Progress { learner, json } => {
            cmd::cmd_progress(&config, &learner, json).await?
        }
        Commands::Record {
            learner,
            module,
            section,
            status,
            percentage,
        } => cmd::cmd_record(&config, &learner, module, section, status, percentage).await?,
        Commands::Config { command } => cmd::cmd_config(&config_path, &config, command)?,
    }

    Ok(())
}
