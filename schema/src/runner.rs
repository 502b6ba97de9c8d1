use colored::*;
use futures::FutureExt;
use sea_orm::DatabaseConnection;
use sea_orm_migration::prelude::*;
use std::io::{self, Write};
use std::time::Instant;

use crate::Migrator;

const STATUS_COLUMN: usize = 80;

/// Applies every pending registry schema step, one at a time, with a status line per step.
pub async fn run_pending_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    let pending = Migrator::get_pending_migrations(db).await?;
    if pending.is_empty() {
        println!("Registry schema is up to date.");
        return Ok(());
    }

    println!("Applying registry schema...");
    for migration in pending {
        let name_str = format!("Applying {}", migration.name().bold());
        let dots = ".".repeat(STATUS_COLUMN.saturating_sub(name_str.len()));
        print!("{}{} ", name_str, dots);
        io::stdout().flush().ok();

        let start = Instant::now();
        let result = std::panic::AssertUnwindSafe(Migrator::up(db, Some(1)))
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(())) => {
                let time_str = format!("({:.2?})", start.elapsed()).dimmed();
                println!("{} {}", "done".green(), time_str);
            }
            Ok(Err(err)) => {
                println!("{}", "failed".red());
                return Err(err);
            }
            Err(_) => {
                println!("{}", "failed".red());
                return Err(DbErr::Custom(format!(
                    "schema step {} panicked",
                    migration.name()
                )));
            }
        }
    }

    Ok(())
}
