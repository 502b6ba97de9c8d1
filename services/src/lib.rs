//! Migratron: tracks and runs unordered migration scripts grouped in buckets.
//!
//! The registry lives in the `db` crate; this crate holds the behavior around it:
//! syncing the registry with the scripts directory, running scripts, the list views and
//! the administrative actions, all reached through [`commands::dispatch`].

pub mod admin;
pub mod collaborators;
pub mod commands;
pub mod console;
pub mod error;
pub mod listing;
pub mod metadata;
pub mod runner;
pub mod scaffold;
pub mod scripts;
pub mod sync;

pub use commands::{dispatch, execute, Command, Context, Invocation};
pub use error::{MigratronError, MigratronResult};
