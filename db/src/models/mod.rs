pub mod meta;
pub mod migration;
pub mod migration_history;

pub use meta::{RunMeta, ScriptMeta};
pub use migration::Entity as Migration;
pub use migration_history::Entity as MigrationHistory;
