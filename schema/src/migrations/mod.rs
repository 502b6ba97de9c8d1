pub mod m202610180001_create_migrations;
pub mod m202610180002_create_migration_history;
