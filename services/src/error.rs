use sea_orm::DbErr;
use thiserror::Error;

/// Every condition that ends a migratron command.
///
/// Script failures are not in here: engines report them as failed outcomes and the
/// batch policy decides what happens next.
#[derive(Debug, Error)]
pub enum MigratronError {
    #[error(
        "Your MIGRATIONS_ALLOWED_TYPES setting requires that you pass a --type for every migratron command."
    )]
    TypeRequired,

    #[error("Type {bucket} is not allowed by your MIGRATIONS_ALLOWED_TYPES setting of {allowed}")]
    TypeNotAllowed { bucket: String, allowed: String },

    #[error("Unknown migration \"{0}\".")]
    UnknownMigration(String),

    #[error("Cannot locate script \"{0}\".")]
    ScriptNotFound(String),

    #[error("That script has already been run. ({0})")]
    AlreadyRun(String),

    #[error("Migration \"{0}\" is marked deleted.")]
    Deleted(String),

    #[error("Cannot run scripts of type: \"{ext}\" ({filename})")]
    UnsupportedType { filename: String, ext: String },

    #[error("Aborting the rest of the migrations. ({0} failed)")]
    Aborted(String),

    #[error("There are {0} pending migrations")]
    PendingMigrations(u64),

    #[error("No migration history found for \"{0}\".")]
    NoHistory(String),

    #[error("Unknown timezone \"{0}\"")]
    InvalidTimezone(String),

    #[error("Invalid template \"{0}\", expected python or sql")]
    InvalidTemplate(String),

    #[error("Migration already exists: {0}")]
    MigrationExists(String),

    #[error("Editor failed: {0}")]
    Editor(String),

    #[error("Registry error: {0}")]
    Database(#[from] DbErr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type MigratronResult<T> = Result<T, MigratronError>;
