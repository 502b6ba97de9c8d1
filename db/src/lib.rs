pub mod models;
pub mod registry;
pub mod test_utils;

use schema::Migrator;
use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use std::path::Path;

/// Opens the registry and brings its schema up to date.
///
/// Accepts either a DSN or a plain SQLite file path. For a file path the parent
/// directory is created and the file is created on first use.
pub async fn connect(path_or_url: &str) -> Result<DatabaseConnection, DbErr> {
    let url = if path_or_url.starts_with("sqlite:")
        || path_or_url.starts_with("postgres://")
        || path_or_url.starts_with("mysql://")
    {
        path_or_url.to_string()
    } else {
        // SQLite won't create intermediate dirs.
        if let Some(parent) = Path::new(path_or_url).parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        format!("sqlite://{path_or_url}?mode=rwc")
    };

    let db = Database::connect(&url).await?;
    Migrator::up(&db, None).await?;
    log::debug!("Connected to registry at {url}");

    Ok(db)
}
