use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use sea_orm::{QueryFilter, QueryOrder};

use super::meta::RunMeta;
use super::migration;

/// One successful run of a migration. Failed runs never produce a row.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "migration_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub migration_id: i64,
    #[sea_orm(column_type = "Json")]
    pub meta: Json,
    pub create_date: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::migration::Entity",
        from = "Column::MigrationId",
        to = "super::migration::Column::Id",
        on_delete = "Restrict"
    )]
    Migration,
}

impl Related<super::migration::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Migration.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn create(db: &DbConn, migration_id: i64, meta: &RunMeta) -> Result<Model, DbErr> {
        Self::create_at(db, migration_id, meta, Utc::now()).await
    }

    pub async fn create_at(
        db: &DbConn,
        migration_id: i64,
        meta: &RunMeta,
        create_date: DateTime<Utc>,
    ) -> Result<Model, DbErr> {
        let active_model = ActiveModel {
            migration_id: Set(migration_id),
            meta: Set(meta.to_json()),
            create_date: Set(create_date),
            ..Default::default()
        };

        active_model.insert(db).await
    }

    pub async fn last_run(db: &DbConn, migration_id: i64) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(Column::MigrationId.eq(migration_id))
            .order_by_desc(Column::CreateDate)
            .order_by_desc(Column::Id)
            .one(db)
            .await
    }

    /// Every run recorded for a bucket paired with its migration, most recent first.
    pub async fn find_for_bucket(
        db: &DbConn,
        bucket: Option<&str>,
    ) -> Result<Vec<(Model, migration::Model)>, DbErr> {
        let rows = Entity::find()
            .find_also_related(migration::Entity)
            .filter(migration::bucket_condition(bucket))
            .order_by_desc(Column::CreateDate)
            .order_by_desc(Column::Id)
            .all(db)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(run, migration)| migration.map(|m| (run, m)))
            .collect())
    }

    pub async fn update_meta(db: &DbConn, id: i64, meta: &RunMeta) -> Result<Model, DbErr> {
        let active_model = ActiveModel {
            id: Set(id),
            meta: Set(meta.to_json()),
            ..Default::default()
        };

        active_model.update(db).await
    }

    /// Removes every run of a migration, returning how many were dropped.
    pub async fn delete_for_migration(db: &DbConn, migration_id: i64) -> Result<u64, DbErr> {
        let res = Entity::delete_many()
            .filter(Column::MigrationId.eq(migration_id))
            .exec(db)
            .await?;
        Ok(res.rows_affected)
    }

    pub async fn delete_all(db: &DbConn) -> Result<u64, DbErr> {
        let res = Entity::delete_many().exec(db).await?;
        Ok(res.rows_affected)
    }

    pub fn run_meta(&self) -> RunMeta {
        RunMeta::from_json(&self.meta)
    }
}
