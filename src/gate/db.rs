use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use lessongate_common::{Catalog, Module, ProgressSnapshot, ProgressStatus, Section};
use rusqlite::{Connection, OptionalExtension, params};

use super::catalog_file::CatalogFile;
use super::models::*;

/// Async-safe handle to the progress store.
///
/// Wraps `GateDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, so synchronous SQLite I/O never
/// ties up async worker threads.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<GateDb>>,
}

impl DbHandle {
    pub fn new(db: GateDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&GateDb) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
            f(&guard)
        })
        .await
        .context("DB task panicked")?
    }

    /// Acquire the database mutex synchronously. Only for startup, CLI
    /// commands and tests; never from a request handler.
    pub fn lock_sync(&self) -> Result<std::sync::MutexGuard<'_, GateDb>> {
        self.inner
            .lock()
            .map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))
    }
}

pub struct GateDb {
    conn: Connection,
}

impl GateDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        self.conn
            .busy_timeout(std::time::Duration::from_secs(5))
            .context("Failed to set busy timeout")?;
        self.run_migrations().context("Failed to run migrations")?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS enrollment_profiles (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    learner_id TEXT NOT NULL UNIQUE,
                    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                );

                CREATE TABLE IF NOT EXISTS modules (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    slug TEXT NOT NULL UNIQUE,
                    title TEXT,
                    order_rank INTEGER NOT NULL,
                    active INTEGER NOT NULL DEFAULT 1
                );

                CREATE TABLE IF NOT EXISTS sections (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    module_id INTEGER NOT NULL REFERENCES modules(id),
                    slug TEXT NOT NULL,
                    title TEXT,
                    order_rank INTEGER NOT NULL,
                    active INTEGER NOT NULL DEFAULT 1,
                    UNIQUE(module_id, slug)
                );

                CREATE TABLE IF NOT EXISTS progress (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    profile_id INTEGER NOT NULL REFERENCES enrollment_profiles(id),
                    module_id INTEGER NOT NULL REFERENCES modules(id),
                    section_id INTEGER NOT NULL REFERENCES sections(id),
                    status TEXT NOT NULL DEFAULT 'not_started',
                    completion_percentage REAL NOT NULL DEFAULT 0,
                    attempts INTEGER NOT NULL DEFAULT 0,
                    started_at TEXT,
                    completed_at TEXT,
                    last_accessed_at TEXT NOT NULL,
                    payload TEXT,
                    UNIQUE(profile_id, module_id, section_id)
                );

                CREATE INDEX IF NOT EXISTS idx_sections_module ON sections(module_id);
                CREATE INDEX IF NOT EXISTS idx_progress_profile ON progress(profile_id);
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    // ── Enrollment ────────────────────────────────────────────────────

    /// Create the learner's profile if missing; return the one profile either way.
    pub fn enroll(&self, learner_id: &str) -> Result<EnrollmentProfile> {
        self.conn
            .execute(
                "INSERT INTO enrollment_profiles (learner_id) VALUES (?1)
                 ON CONFLICT(learner_id) DO NOTHING",
                params![learner_id],
            )
            .context("Failed to insert enrollment profile")?;
        self.find_profile(learner_id)?
            .context("Enrollment profile not found after insert")
    }

    pub fn find_profile(&self, learner_id: &str) -> Result<Option<EnrollmentProfile>> {
        self.conn
            .query_row(
                "SELECT id, learner_id, created_at FROM enrollment_profiles WHERE learner_id = ?1",
                params![learner_id],
                |row| {
                    Ok(EnrollmentProfile {
                        id: row.get(0)?,
                        learner_id: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()
            .context("Failed to query enrollment profile")
    }

    // ── Catalog ───────────────────────────────────────────────────────

    /// Upsert every module and section in `file` by slug, in one transaction.
    /// Store entries missing from the file are deactivated, never deleted,
    /// since progress rows reference them.
    pub fn seed_catalog(&self, file: &CatalogFile) -> Result<SeedSummary> {
        file.validate()?;

        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;
        let mut summary = SeedSummary::default();

        for module in &file.modules {
            let module_id: i64 = tx
                .query_row(
                    "INSERT INTO modules (slug, title, order_rank, active) VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(slug) DO UPDATE SET
                        title = excluded.title,
                        order_rank = excluded.order_rank,
                        active = excluded.active
                     RETURNING id",
                    params![module.slug, module.title, module.order, module.active],
                    |row| row.get(0),
                )
                .with_context(|| format!("Failed to upsert module '{}'", module.slug))?;
            summary.modules += 1;

            let mut section_slugs = Vec::with_capacity(module.sections.len());
            for section in &module.sections {
                tx.execute(
                    "INSERT INTO sections (module_id, slug, title, order_rank, active)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(module_id, slug) DO UPDATE SET
                        title = excluded.title,
                        order_rank = excluded.order_rank,
                        active = excluded.active",
                    params![module_id, section.slug, section.title, section.order, section.active],
                )
                .with_context(|| {
                    format!("Failed to upsert section '{}/{}'", module.slug, section.slug)
                })?;
                section_slugs.push(section.slug.clone());
                summary.sections += 1;
            }

            summary.deactivated_sections += deactivate_missing(
                &tx,
                "SELECT slug FROM sections WHERE module_id = ?1 AND active = 1",
                "UPDATE sections SET active = 0 WHERE module_id = ?1 AND slug = ?2",
                &[&module_id],
                &section_slugs,
            )?;
        }

        let module_slugs: Vec<String> = file.modules.iter().map(|m| m.slug.clone()).collect();
        summary.deactivated_modules += deactivate_missing(
            &tx,
            "SELECT slug FROM modules WHERE active = 1",
            "UPDATE modules SET active = 0 WHERE slug = ?1",
            &[],
            &module_slugs,
        )?;

        tx.commit().context("Failed to commit catalog seed")?;
        Ok(summary)
    }

    /// Load the active catalog. Inactive modules and sections are invisible.
    pub fn load_catalog(&self) -> Result<Catalog> {
        let mut module_stmt = self
            .conn
            .prepare(
                "SELECT id, slug, title, order_rank FROM modules
                 WHERE active = 1 ORDER BY order_rank ASC",
            )
            .context("Failed to prepare load_catalog modules")?;
        let mut modules = module_stmt
            .query_map([], |row| {
                Ok(Module {
                    id: row.get(0)?,
                    slug: row.get(1)?,
                    title: row.get(2)?,
                    order: row.get(3)?,
                    sections: Vec::new(),
                })
            })
            .context("Failed to query modules")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read module row")?;

        let mut section_stmt = self
            .conn
            .prepare(
                "SELECT id, slug, title, order_rank FROM sections
                 WHERE module_id = ?1 AND active = 1 ORDER BY order_rank ASC",
            )
            .context("Failed to prepare load_catalog sections")?;
        for module in &mut modules {
            module.sections = section_stmt
                .query_map(params![module.id], |row| {
                    Ok(Section {
                        id: row.get(0)?,
                        slug: row.get(1)?,
                        title: row.get(2)?,
                        order: row.get(3)?,
                    })
                })
                .context("Failed to query sections")?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("Failed to read section row")?;
        }

        Ok(Catalog::new(modules))
    }

    // ── Progress ──────────────────────────────────────────────────────

    /// Status of every record the profile owns. Unparseable statuses are
    /// treated as `not_started`, which can only hold the frontier back.
    pub fn progress_snapshot(&self, profile_id: i64) -> Result<ProgressSnapshot> {
        let mut stmt = self
            .conn
            .prepare("SELECT module_id, section_id, status FROM progress WHERE profile_id = ?1")
            .context("Failed to prepare progress_snapshot")?;
        let rows = stmt
            .query_map(params![profile_id], |row| {
                let status: String = row.get(2)?;
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    ProgressStatus::from_str(&status).unwrap_or(ProgressStatus::NotStarted),
                ))
            })
            .context("Failed to query progress snapshot")?;

        let mut snapshot = ProgressSnapshot::new();
        for row in rows {
            let (module_id, section_id, status) = row.context("Failed to read progress row")?;
            snapshot.insert(module_id, section_id, status);
        }
        Ok(snapshot)
    }

    /// Insert or update one progress row in a single statement.
    ///
    /// The first-writer-wins fields (`started_at`, `completed_at`) are only
    /// filled when NULL, inside the same `ON CONFLICT DO UPDATE`, so two
    /// concurrent writers can never both set them.
    pub fn upsert_progress(&self, write: &ProgressWrite) -> Result<ProgressRecord> {
        let at = format_timestamp(write.at);
        let payload = write
            .payload
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("Failed to serialize progress payload")?;

        let row = self
            .conn
            .query_row(
                "INSERT INTO progress (
                    profile_id, module_id, section_id, status, completion_percentage,
                    attempts, started_at, completed_at, last_accessed_at, payload
                 )
                 VALUES (
                    ?1, ?2, ?3, ?4, COALESCE(?5, 0), 1,
                    CASE WHEN ?4 <> 'not_started' THEN ?6 END,
                    CASE WHEN ?4 = 'completed' THEN ?6 END,
                    ?6, ?7
                 )
                 ON CONFLICT(profile_id, module_id, section_id) DO UPDATE SET
                    status = excluded.status,
                    completion_percentage = COALESCE(?5, progress.completion_percentage),
                    attempts = progress.attempts + 1,
                    started_at = COALESCE(progress.started_at, excluded.started_at),
                    completed_at = CASE
                        WHEN excluded.status = 'completed'
                            THEN COALESCE(progress.completed_at, excluded.completed_at)
                        WHEN ?8 THEN NULL
                        ELSE progress.completed_at
                    END,
                    last_accessed_at = MAX(progress.last_accessed_at, excluded.last_accessed_at),
                    payload = COALESCE(excluded.payload, progress.payload)
                 RETURNING id, status, completion_percentage, attempts,
                           started_at, completed_at, last_accessed_at, payload",
                params![
                    write.profile_id,
                    write.module_id,
                    write.section_id,
                    write.status.as_str(),
                    write.completion_percentage,
                    at,
                    payload,
                    write.clear_completed_on_regress,
                ],
                |row| {
                    Ok(ProgressRow {
                        id: row.get(0)?,
                        profile_id: write.profile_id,
                        module_slug: write.module_slug.clone(),
                        section_slug: write.section_slug.clone(),
                        status: row.get(1)?,
                        completion_percentage: row.get(2)?,
                        attempts: row.get(3)?,
                        started_at: row.get(4)?,
                        completed_at: row.get(5)?,
                        last_accessed_at: row.get(6)?,
                        payload: row.get(7)?,
                    })
                },
            )
            .context("Failed to upsert progress")?;

        row.into_progress_record()
    }

    /// Every record the profile owns, in catalog order.
    pub fn list_progress(&self, profile_id: i64) -> Result<Vec<ProgressRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT p.id, p.profile_id, m.slug, s.slug, p.status, p.completion_percentage,
                        p.attempts, p.started_at, p.completed_at, p.last_accessed_at, p.payload
                 FROM progress p
                 JOIN modules m ON m.id = p.module_id
                 JOIN sections s ON s.id = p.section_id
                 WHERE p.profile_id = ?1
                 ORDER BY m.order_rank ASC, s.order_rank ASC",
            )
            .context("Failed to prepare list_progress")?;
        let rows = stmt
            .query_map(params![profile_id], |row| {
                Ok(ProgressRow {
                    id: row.get(0)?,
                    profile_id: row.get(1)?,
                    module_slug: row.get(2)?,
                    section_slug: row.get(3)?,
                    status: row.get(4)?,
                    completion_percentage: row.get(5)?,
                    attempts: row.get(6)?,
                    started_at: row.get(7)?,
                    completed_at: row.get(8)?,
                    last_accessed_at: row.get(9)?,
                    payload: row.get(10)?,
                })
            })
            .context("Failed to query progress")?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.context("Failed to read progress row")?.into_progress_record()?);
        }
        Ok(records)
    }
}

/// Deactivate every active slug selected by `select_active` that is not in
/// `keep`. `scope` binds the leading parameters of both statements; the slug
/// is bound last. Returns how many entries were deactivated.
fn deactivate_missing(
    conn: &Connection,
    select_active: &str,
    deactivate: &str,
    scope: &[&dyn rusqlite::ToSql],
    keep: &[String],
) -> Result<usize> {
    let active: Vec<String> = conn
        .prepare(select_active)
        .context("Failed to prepare active slug query")?
        .query_map(scope, |row| row.get(0))
        .context("Failed to query active slugs")?
        .collect::<rusqlite::Result<_>>()
        .context("Failed to read active slug")?;

    let mut deactivated = 0;
    for slug in active.iter().filter(|slug| !keep.contains(slug)) {
        let mut args = scope.to_vec();
        args.push(slug);
        deactivated += conn
            .execute(deactivate, args.as_slice())
            .with_context(|| format!("Failed to deactivate '{}'", slug))?;
    }
    Ok(deactivated)
}

/// Intermediate row struct for progress.
struct ProgressRow {
    id: i64,
    profile_id: i64,
    module_slug: String,
    section_slug: String,
    status: String,
    completion_percentage: f64,
    attempts: i64,
    started_at: Option<String>,
    completed_at: Option<String>,
    last_accessed_at: String,
    payload: Option<String>,
}

impl ProgressRow {
    fn into_progress_record(self) -> Result<ProgressRecord> {
        let status = ProgressStatus::from_str(&self.status)
            .map_err(|e| anyhow::anyhow!(e))
            .context("Failed to parse progress status")?;
        let payload = self
            .payload
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .context("Failed to parse progress payload")?;
        Ok(ProgressRecord {
            id: self.id,
            profile_id: self.profile_id,
            module_slug: self.module_slug,
            section_slug: self.section_slug,
            status,
            completion_percentage: self.completion_percentage,
            attempts: self.attempts,
            started_at: self.started_at,
            completed_at: self.completed_at,
            last_accessed_at: self.last_accessed_at,
            payload,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
