use db::models::migration;
use sea_orm::DbConn;

use crate::collaborators::AuthorLink;
use crate::console::Console;
use crate::error::MigratronResult;
use crate::metadata;
use crate::scripts::ScriptRepository;

/// What a sync pass changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub marked_deleted: Vec<String>,
    pub discovered: Vec<String>,
}

impl SyncReport {
    pub fn is_noop(&self) -> bool {
        self.marked_deleted.is_empty() && self.discovered.is_empty()
    }
}

/// Aligns the registry of one bucket with its scripts directory.
///
/// Rows whose file disappeared are soft-deleted; files with no row are registered with
/// the metadata of their header. A deleted row is never revived, even if its file comes
/// back.
pub async fn sync(
    db: &DbConn,
    scripts: &ScriptRepository,
    author_link: &dyn AuthorLink,
    console: &mut dyn Console,
) -> MigratronResult<SyncReport> {
    let bucket = scripts.bucket();
    let mut report = SyncReport::default();

    for known in migration::Model::find_by_bucket(db, bucket).await? {
        if !known.is_deleted && !scripts.exists(&known.filename) {
            migration::Model::mark_deleted(db, known.id).await?;
            report.marked_deleted.push(known.filename);
        }
    }

    // Registering in name order keeps insertion order aligned with the timestamps.
    let mut on_disk = scripts.list()?;
    on_disk.sort();
    for filename in on_disk {
        if migration::Model::find_by_name(db, bucket, &filename)
            .await?
            .is_some()
        {
            continue;
        }
        console.say(&format!("Getting initial meta-data for {filename}"));
        let meta = metadata::extract(&scripts.full_path(&filename), author_link);
        migration::Model::create(db, bucket, &filename, &meta).await?;
        report.discovered.push(filename);
    }

    log::info!(
        "Synced bucket {}: {} discovered, {} marked deleted",
        bucket.unwrap_or("<untyped>"),
        report.discovered.len(),
        report.marked_deleted.len()
    );
    Ok(report)
}
