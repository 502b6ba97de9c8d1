use sea_orm_migration::prelude::*;

use crate::migrations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(migrations::m202610180001_create_migrations::Migration),
            Box::new(migrations::m202610180002_create_migration_history::Migration),
        ]
    }
}
