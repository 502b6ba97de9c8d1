use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::SimpleExpr;
use sea_orm::{QueryFilter, QueryOrder};

use super::meta::ScriptMeta;

/// A migration script the registry knows about.
///
/// Rows are never removed when their file disappears; `is_deleted` is set instead so
/// history stays attributable. `(type, filename)` is unique, with the untyped bucket
/// stored as NULL.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "migrations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub filename: String,
    /// Bucket the script lives in. `None` is the default bucket.
    #[sea_orm(column_name = "type")]
    pub bucket: Option<String>,
    #[sea_orm(column_type = "Json")]
    pub meta: Json,
    pub is_deleted: bool,
    pub flagged: bool,
    pub create_date: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::migration_history::Entity")]
    History,
}

impl Related<super::migration_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::History.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Filter selecting the rows of one bucket.
pub fn bucket_condition(bucket: Option<&str>) -> SimpleExpr {
    match bucket {
        Some(name) => Column::Bucket.eq(name),
        None => Column::Bucket.is_null(),
    }
}

impl Model {
    pub async fn create(
        db: &DbConn,
        bucket: Option<&str>,
        filename: &str,
        meta: &ScriptMeta,
    ) -> Result<Model, DbErr> {
        let active_model = ActiveModel {
            filename: Set(filename.to_owned()),
            bucket: Set(bucket.map(str::to_owned)),
            meta: Set(meta.to_json()),
            is_deleted: Set(false),
            flagged: Set(false),
            create_date: Set(Utc::now()),
            ..Default::default()
        };

        active_model.insert(db).await
    }

    pub async fn find_by_name(
        db: &DbConn,
        bucket: Option<&str>,
        filename: &str,
    ) -> Result<Option<Model>, DbErr> {
        Entity::find()
            .filter(bucket_condition(bucket))
            .filter(Column::Filename.eq(filename))
            .one(db)
            .await
    }

    /// Every row of the bucket, deleted ones included, oldest first.
    pub async fn find_by_bucket(db: &DbConn, bucket: Option<&str>) -> Result<Vec<Model>, DbErr> {
        Entity::find()
            .filter(bucket_condition(bucket))
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }

    pub async fn mark_deleted(db: &DbConn, id: i64) -> Result<Model, DbErr> {
        let active_model = ActiveModel {
            id: Set(id),
            is_deleted: Set(true),
            ..Default::default()
        };

        active_model.update(db).await
    }

    /// Writes the flag bit and metadata together so a toggle is a single row update.
    pub async fn set_flag(
        db: &DbConn,
        id: i64,
        flagged: bool,
        meta: &ScriptMeta,
    ) -> Result<Model, DbErr> {
        let active_model = ActiveModel {
            id: Set(id),
            flagged: Set(flagged),
            meta: Set(meta.to_json()),
            ..Default::default()
        };

        active_model.update(db).await
    }

    pub async fn delete_all(db: &DbConn) -> Result<u64, DbErr> {
        let res = Entity::delete_many().exec(db).await?;
        Ok(res.rows_affected)
    }

    pub fn script_meta(&self) -> ScriptMeta {
        ScriptMeta::from_json(&self.meta)
    }
}
