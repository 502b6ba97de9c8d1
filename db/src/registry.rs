//! Pending / already-run classification.
//!
//! Nothing here is cached on the migration row: a migration is pending exactly when no
//! history row points at it, so deleting history by hand can never leave the two views
//! out of step.

use sea_orm::sea_query::{Query, SelectStatement};
use sea_orm::{
    ColumnTrait, DbConn, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};

use crate::models::{migration, migration_history};

fn migrations_with_history() -> SelectStatement {
    Query::select()
        .column(migration_history::Column::MigrationId)
        .from(migration_history::Entity)
        .to_owned()
}

/// Non-deleted migrations of the bucket without any recorded run, newest registry entry first.
pub async fn pending(db: &DbConn, bucket: Option<&str>) -> Result<Vec<migration::Model>, DbErr> {
    migration::Entity::find()
        .filter(migration::bucket_condition(bucket))
        .filter(migration::Column::IsDeleted.eq(false))
        .filter(migration::Column::Id.not_in_subquery(migrations_with_history()))
        .order_by_desc(migration::Column::Id)
        .all(db)
        .await
}

pub async fn pending_count(db: &DbConn, bucket: Option<&str>) -> Result<u64, DbErr> {
    migration::Entity::find()
        .filter(migration::bucket_condition(bucket))
        .filter(migration::Column::IsDeleted.eq(false))
        .filter(migration::Column::Id.not_in_subquery(migrations_with_history()))
        .count(db)
        .await
}

/// Non-deleted migrations of the bucket with at least one run, each paired with its
/// most recent run and ordered by that run's date, oldest first.
pub async fn already_run(
    db: &DbConn,
    bucket: Option<&str>,
) -> Result<Vec<(migration::Model, migration_history::Model)>, DbErr> {
    let migrations = migration::Entity::find()
        .filter(migration::bucket_condition(bucket))
        .filter(migration::Column::IsDeleted.eq(false))
        .filter(migration::Column::Id.in_subquery(migrations_with_history()))
        .all(db)
        .await?;

    let mut runs = Vec::with_capacity(migrations.len());
    for migration in migrations {
        if let Some(last) = migration_history::Model::last_run(db, migration.id).await? {
            runs.push((migration, last));
        }
    }
    runs.sort_by(|(_, a), (_, b)| (a.create_date, a.id).cmp(&(b.create_date, b.id)));

    Ok(runs)
}

/// Whether the migration is currently in the pending set of its bucket.
pub async fn is_pending(db: &DbConn, migration: &migration::Model) -> Result<bool, DbErr> {
    if migration.is_deleted {
        return Ok(false);
    }
    let runs = migration_history::Entity::find()
        .filter(migration_history::Column::MigrationId.eq(migration.id))
        .count(db)
        .await?;
    Ok(runs == 0)
}
