//! Command dispatch.
//!
//! Every command is checked against the type allow-list first. All of them except
//! `create` and `clear` then sync the bucket before doing their own work.

use chrono::Utc;
use code_runner::Engines;
use common::config::Config;
use db::models::migration;
use sea_orm::DbConn;
use std::path::Path;

use crate::admin;
use crate::collaborators::{AuthorLink, Confirm, Editor};
use crate::console::Console;
use crate::error::{MigratronError, MigratronResult};
use crate::listing::{parse_timezone, ListView};
use crate::runner::{RunOptions, Runner};
use crate::scaffold::{self, TemplateKind};
use crate::scripts::ScriptRepository;
use crate::sync::sync;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create { name: String, template: String },
    Run { target: String, options: RunOptions },
    RunAll { options: RunOptions },
    List,
    History,
    Info { target: String },
    Flag { target: String, message: Option<String> },
    Note { target: String },
    DeleteLog { target: String },
    IsPending,
    Clear,
}

impl Command {
    /// Read-only views that may go through a pager.
    pub fn is_listing(&self) -> bool {
        matches!(self, Command::List | Command::History | Command::Info { .. })
    }

    fn syncs_first(&self) -> bool {
        !matches!(self, Command::Create { .. } | Command::Clear)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub bucket: Option<String>,
    pub verbose: bool,
    pub command: Command,
}

/// Everything a command may touch.
pub struct Context<'a> {
    pub db: &'a DbConn,
    pub config: &'a Config,
    pub engines: &'a Engines,
    pub console: &'a mut dyn Console,
    pub confirm: &'a dyn Confirm,
    pub editor: &'a dyn Editor,
    pub author_link: &'a dyn AuthorLink,
}

pub fn check_bucket(config: &Config, bucket: Option<&str>) -> MigratronResult<()> {
    if config.type_allowed(bucket) {
        return Ok(());
    }
    let allowed = config.allowed_types.clone().unwrap_or_default().join(",");
    match bucket {
        None => Err(MigratronError::TypeRequired),
        Some(bucket) => Err(MigratronError::TypeNotAllowed {
            bucket: bucket.to_string(),
            allowed,
        }),
    }
}

/// Finds a migration by name. A path is accepted and reduced to its file name.
pub async fn resolve(
    db: &DbConn,
    bucket: Option<&str>,
    target: &str,
) -> MigratronResult<migration::Model> {
    let filename = Path::new(target)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(target);
    migration::Model::find_by_name(db, bucket, filename)
        .await?
        .ok_or_else(|| MigratronError::UnknownMigration(target.to_string()))
}

pub async fn dispatch(ctx: &mut Context<'_>, invocation: Invocation) -> MigratronResult<()> {
    let bucket = invocation.bucket.as_deref();
    check_bucket(ctx.config, bucket)?;

    let scripts = ScriptRepository::new(&ctx.config.migrations_dir, bucket);
    log::debug!(
        "{:?} on bucket {}",
        invocation.command,
        bucket.unwrap_or("<untyped>")
    );

    if invocation.command.syncs_first() {
        sync(ctx.db, &scripts, ctx.author_link, &mut *ctx.console).await?;
    }

    match invocation.command {
        Command::Create { name, template } => {
            let kind: TemplateKind = template.parse()?;
            let tz = parse_timezone(&ctx.config.timezone)?;
            scaffold::create(
                &scripts,
                &name,
                kind,
                &ctx.config.operator,
                Utc::now(),
                tz,
                &mut *ctx.console,
            )?;
        }
        Command::Run { target, options } => {
            let target = resolve(ctx.db, bucket, &target).await?;
            let runner = Runner::new(ctx.db, &scripts, ctx.engines, &ctx.config.operator);
            runner.run(&target, options, &mut *ctx.console).await?;
        }
        Command::RunAll { options } => {
            let runner = Runner::new(ctx.db, &scripts, ctx.engines, &ctx.config.operator);
            runner.run_all(options, &mut *ctx.console).await?;
        }
        Command::List => {
            let tz = parse_timezone(&ctx.config.timezone)?;
            ListView::new(&mut *ctx.console, tz, invocation.verbose)
                .list(ctx.db, bucket)
                .await?;
        }
        Command::History => {
            let tz = parse_timezone(&ctx.config.timezone)?;
            ListView::new(&mut *ctx.console, tz, invocation.verbose)
                .history(ctx.db, bucket)
                .await?;
        }
        Command::Info { target } => {
            let target = resolve(ctx.db, bucket, &target).await?;
            let tz = parse_timezone(&ctx.config.timezone)?;
            ListView::new(&mut *ctx.console, tz, true)
                .info(ctx.db, &target)
                .await?;
        }
        Command::Flag { target, message } => {
            let target = resolve(ctx.db, bucket, &target).await?;
            admin::flag(ctx.db, &target, message.as_deref(), &mut *ctx.console).await?;
        }
        Command::Note { target } => {
            let target = resolve(ctx.db, bucket, &target).await?;
            admin::add_note(ctx.db, &target, ctx.editor).await?;
        }
        Command::DeleteLog { target } => {
            let target = resolve(ctx.db, bucket, &target).await?;
            admin::delete_log(ctx.db, &target, &mut *ctx.console).await?;
        }
        Command::IsPending => {
            admin::is_pending(ctx.db, bucket, &mut *ctx.console).await?;
        }
        Command::Clear => {
            admin::clear(ctx.db, ctx.confirm, &mut *ctx.console).await?;
        }
    }

    Ok(())
}

/// Runs a command to the end and always finishes the console, error or not.
/// Listings stop quietly on Ctrl-C.
pub async fn execute(ctx: &mut Context<'_>, invocation: Invocation) -> MigratronResult<()> {
    let result = if invocation.command.is_listing() {
        tokio::select! {
            result = dispatch(ctx, invocation) => result,
            _ = tokio::signal::ctrl_c() => {
                log::info!("Listing interrupted");
                Ok(())
            }
        }
    } else {
        dispatch(ctx, invocation).await
    };

    if let Err(e) = ctx.console.finish() {
        log::debug!("Console did not finish cleanly: {e}");
    }
    result
}
