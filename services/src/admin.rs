use db::models::{migration, migration_history};
use db::registry;
use sea_orm::DbConn;

use crate::collaborators::{Confirm, Editor};
use crate::console::Console;
use crate::error::{MigratronError, MigratronResult};

pub const CLEAR_PROMPT: &str =
    "Are you SURE you want to delete all migration history of ALL TYPES? [y/n] ";

/// Forgets every run of a migration so it becomes pending again.
pub async fn delete_log(
    db: &DbConn,
    target: &migration::Model,
    console: &mut dyn Console,
) -> MigratronResult<u64> {
    let removed = migration_history::Model::delete_for_migration(db, target.id).await?;
    if removed == 0 {
        return Err(MigratronError::NoHistory(target.filename.clone()));
    }
    console.say(&format!(
        "Removed migration log(s) for \"{}\".",
        target.filename
    ));
    log::info!("Removed {} run(s) of {}", removed, target.filename);
    Ok(removed)
}

/// Toggles the flag. Setting stores the optional message, clearing drops it.
pub async fn flag(
    db: &DbConn,
    target: &migration::Model,
    message: Option<&str>,
    console: &mut dyn Console,
) -> MigratronResult<migration::Model> {
    let mut meta = target.script_meta();
    let flagged = !target.flagged;
    if flagged {
        meta.flag_message = message.map(str::trim).filter(|m| !m.is_empty()).map(String::from);
    } else {
        meta.flag_message = None;
    }

    let updated = migration::Model::set_flag(db, target.id, flagged, &meta).await?;
    console.say(if flagged { "Flag SET" } else { "Flag UNSET" });
    log::info!("Flag on {} is now {}", target.filename, flagged);
    Ok(updated)
}

/// Edits the notes of the most recent run.
pub async fn add_note(
    db: &DbConn,
    target: &migration::Model,
    editor: &dyn Editor,
) -> MigratronResult<migration_history::Model> {
    let last = migration_history::Model::last_run(db, target.id)
        .await?
        .ok_or_else(|| MigratronError::NoHistory(target.filename.clone()))?;

    let mut meta = last.run_meta();
    let edited = editor.edit(meta.notes.as_deref().unwrap_or_default())?;
    meta.notes = Some(edited).filter(|n| !n.is_empty());

    let updated = migration_history::Model::update_meta(db, last.id, &meta).await?;
    log::info!("Updated notes on run {} of {}", last.id, target.filename);
    Ok(updated)
}

/// Wipes the registry of every bucket once the operator confirms.
/// Returns whether anything was deleted.
pub async fn clear(
    db: &DbConn,
    confirm: &dyn Confirm,
    console: &mut dyn Console,
) -> MigratronResult<bool> {
    if !confirm.confirm(CLEAR_PROMPT)? {
        console.say("Nothing deleted.");
        return Ok(false);
    }

    let runs = migration_history::Model::delete_all(db).await?;
    let migrations = migration::Model::delete_all(db).await?;
    log::warn!(
        "Cleared the registry: {} migrations, {} runs",
        migrations,
        runs
    );
    Ok(true)
}

/// Fails when the bucket still has pending migrations.
pub async fn is_pending(
    db: &DbConn,
    bucket: Option<&str>,
    console: &mut dyn Console,
) -> MigratronResult<()> {
    let count = registry::pending_count(db, bucket).await?;
    if count > 0 {
        return Err(MigratronError::PendingMigrations(count));
    }
    console.say("There are no pending migrations");
    Ok(())
}
