//! Running migrations and recording their runs.
//!
//! A run goes through three gates in order (script present, still pending unless a rerun
//! is allowed, runnable extension), then either executes through an engine or is only
//! logged. Only a success writes history, so a failed script stays pending.

use code_runner::{EngineKind, Engines};
use db::models::{migration, migration_history, RunMeta};
use db::registry;
use sea_orm::DbConn;

use crate::console::Console;
use crate::error::{MigratronError, MigratronResult};
use crate::scripts::ScriptRepository;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Record the run without executing the script.
    pub log_only: bool,
    /// Allow a migration with history to run again.
    pub allow_rerun: bool,
    /// Keep going after a failed script instead of aborting.
    pub continue_on_error: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Logged(migration_history::Model),
    Skipped,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub logged: Vec<String>,
    pub skipped: Vec<String>,
}

pub struct Runner<'a> {
    db: &'a DbConn,
    scripts: &'a ScriptRepository,
    engines: &'a Engines,
    operator: &'a str,
}

impl<'a> Runner<'a> {
    pub fn new(
        db: &'a DbConn,
        scripts: &'a ScriptRepository,
        engines: &'a Engines,
        operator: &'a str,
    ) -> Self {
        Self {
            db,
            scripts,
            engines,
            operator,
        }
    }

    pub async fn run(
        &self,
        target: &migration::Model,
        options: RunOptions,
        console: &mut dyn Console,
    ) -> MigratronResult<RunOutcome> {
        let filename = &target.filename;
        let path = self.scripts.full_path(filename);

        if !path.exists() {
            return Err(MigratronError::ScriptNotFound(filename.clone()));
        }
        if !options.allow_rerun && !registry::is_pending(self.db, target).await? {
            if target.is_deleted {
                return Err(MigratronError::Deleted(filename.clone()));
            }
            return Err(MigratronError::AlreadyRun(filename.clone()));
        }
        let Some(kind) = EngineKind::from_path(&path) else {
            let ext = path
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default();
            return Err(MigratronError::UnsupportedType {
                filename: filename.clone(),
                ext,
            });
        };

        if options.log_only {
            console.say(&format!("Logging {filename}"));
            log::info!("Logging {} without running it", filename);
        } else {
            console.say(&format!("Running {filename}"));
            log::info!("Running {} with the {:?} engine", filename, kind);

            let outcome = self.engines.for_kind(kind).execute(&path).await;
            if !outcome.output.is_empty() {
                console.say(&outcome.output);
            }
            if !outcome.success {
                log::warn!("Migration {} failed", filename);
                if !options.continue_on_error {
                    return Err(MigratronError::Aborted(filename.clone()));
                }
                console.say("Skipping migration...");
                return Ok(RunOutcome::Skipped);
            }
        }

        let run =
            migration_history::Model::create(self.db, target.id, &RunMeta::for_runner(self.operator))
                .await?;
        Ok(RunOutcome::Logged(run))
    }

    /// Runs the pending set of the bucket, as computed before the first script starts.
    pub async fn run_all(
        &self,
        options: RunOptions,
        console: &mut dyn Console,
    ) -> MigratronResult<BatchReport> {
        let pending = registry::pending(self.db, self.scripts.bucket()).await?;
        let mut report = BatchReport::default();

        for target in &pending {
            match self.run(target, options, console).await? {
                RunOutcome::Logged(_) => report.logged.push(target.filename.clone()),
                RunOutcome::Skipped => report.skipped.push(target.filename.clone()),
            }
        }

        log::info!(
            "Batch finished: {} logged, {} skipped",
            report.logged.len(),
            report.skipped.len()
        );
        Ok(report)
    }
}
