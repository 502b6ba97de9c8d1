mod support;

use chrono::{TimeZone, Utc};
use db::models::{migration, migration_history, RunMeta};
use sea_orm::{ActiveModelTrait, Set};
use serde_json::json;
use services::runner::RunOptions;
use services::{Command, MigratronError};
use support::Fixture;

const FOO: &str = "20121025000000_foo.sql";
const BAR: &str = "20121026000000_bar.py";

async fn find(fx: &Fixture, bucket: Option<&str>, name: &str) -> migration::Model {
    migration::Model::find_by_name(&fx.db, bucket, name)
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn test_list_shows_pending_then_logged_run_in_timezone() {
    let mut fx = Fixture::new().await;
    fx.script(None, FOO, "select 1;");
    fx.exec(None, false, Command::List).await.unwrap();

    let out = fx.output(None, false, Command::List).await.unwrap();
    assert!(out.starts_with("Migrations:\n"));
    assert!(!out.contains("There are no pending migrations"));
    assert!(out.contains(&format!("{} ( ) {FOO}\n", " ".repeat(16))));

    let foo = find(&fx, None, FOO).await;
    let at = Utc.with_ymd_and_hms(2012, 10, 25, 10, 42, 0).unwrap();
    migration_history::Model::create_at(&fx.db, foo.id, &RunMeta::for_runner("ops"), at)
        .await
        .unwrap();

    let out = fx.output(None, false, Command::List).await.unwrap();
    let run_lines: Vec<_> = out.lines().filter(|l| l.contains("(*)")).collect();
    assert_eq!(run_lines, vec![format!("2012-10-25 10:42 (*) {FOO}")]);
    assert!(out.contains("There are no pending migrations"));

    fx.config.timezone = "US/Pacific".into();
    let out = fx.output(None, false, Command::List).await.unwrap();
    assert!(out.contains(&format!("2012-10-25 03:42 (*) {FOO}")));
}

#[tokio::test]
async fn test_list_orders_runs_by_last_run_date() {
    let mut fx = Fixture::new().await;
    fx.script(None, FOO, "");
    fx.script(None, BAR, "");
    fx.exec(None, false, Command::List).await.unwrap();

    let foo = find(&fx, None, FOO).await;
    let bar = find(&fx, None, BAR).await;
    let meta = RunMeta::for_runner("ops");
    let early = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let late = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
    migration_history::Model::create_at(&fx.db, foo.id, &meta, late).await.unwrap();
    migration_history::Model::create_at(&fx.db, bar.id, &meta, early).await.unwrap();

    let out = fx.output(None, false, Command::List).await.unwrap();
    let names: Vec<_> = out
        .lines()
        .filter(|l| l.contains("(*)"))
        .map(|l| l.rsplit(' ').next().unwrap())
        .collect();
    assert_eq!(names, vec![BAR, FOO]);
}

#[tokio::test]
async fn test_flag_toggles_and_shows_message() {
    let mut fx = Fixture::new().await;
    fx.script(Some("data"), FOO, "");

    let out = fx
        .output(
            Some("data"),
            false,
            Command::Flag {
                target: FOO.into(),
                message: Some("check with DBA first".into()),
            },
        )
        .await
        .unwrap();
    assert!(out.contains("Flag SET"));
    let flagged = find(&fx, Some("data"), FOO).await;
    assert!(flagged.flagged);
    assert_eq!(
        flagged.script_meta().flag_message.as_deref(),
        Some("check with DBA first")
    );

    let out = fx.output(Some("data"), false, Command::List).await.unwrap();
    assert!(out.contains(&format!("{FOO} <--- check with DBA first")));

    let out = fx.output(Some("data"), true, Command::List).await.unwrap();
    assert!(!out.contains("<---"));
    assert!(out.contains("     Flagged: True\n     check with DBA first\n"));

    let out = fx
        .output(
            Some("data"),
            false,
            Command::Flag {
                target: FOO.into(),
                message: None,
            },
        )
        .await
        .unwrap();
    assert!(out.contains("Flag UNSET"));
    let cleared = find(&fx, Some("data"), FOO).await;
    assert!(!cleared.flagged);
    assert_eq!(cleared.script_meta().flag_message, None);
}

#[tokio::test]
async fn test_verbose_list_shows_header_and_run() {
    let mut fx = Fixture::new().await;
    fx.script(
        None,
        BAR,
        "\"\"\"\nAuthor: alice\nDescription: Backfill emails\n\"\"\"\nprint('x')\n",
    );
    fx.exec(None, false, Command::Run { target: BAR.into(), options: RunOptions::default() })
        .await
        .unwrap();

    let out = fx.output(None, true, Command::List).await.unwrap();
    assert!(out.contains(&format!(" (*) {BAR}\n\n     Author: alice\n     Description: Backfill emails\n\n     Runner: tester\n     Date: ")));
    assert!(out.ends_with("\n\n"));
}

#[tokio::test]
async fn test_info_prints_one_migration() {
    let mut fx = Fixture::new().await;
    fx.script(None, FOO, "/*\nAuthor: bob\n*/\nselect 1;");
    fx.script(None, BAR, "");
    fx.exec(None, false, Command::List).await.unwrap();

    let out = fx
        .output(None, false, Command::Info { target: FOO.into() })
        .await
        .unwrap();
    assert!(out.contains(&format!(" ( ) {FOO}")));
    assert!(out.contains("     Author: bob"));
    assert!(!out.contains(BAR));
    assert!(!out.contains("Migrations:"));
}

#[tokio::test]
async fn test_history_lists_every_run_oldest_first() {
    let mut fx = Fixture::new().await;
    fx.script(None, FOO, "");
    fx.script(None, BAR, "");
    fx.exec(None, false, Command::List).await.unwrap();

    let foo = find(&fx, None, FOO).await;
    let bar = find(&fx, None, BAR).await;
    let meta = RunMeta::for_runner("ops");
    let at = |day| Utc.with_ymd_and_hms(2022, 5, day, 12, 0, 0).unwrap();
    migration_history::Model::create_at(&fx.db, foo.id, &meta, at(1)).await.unwrap();
    migration_history::Model::create_at(&fx.db, bar.id, &meta, at(2)).await.unwrap();
    migration_history::Model::create_at(&fx.db, foo.id, &meta, at(3)).await.unwrap();

    let out = fx.output(None, false, Command::History).await.unwrap();
    assert_eq!(out.lines().collect::<Vec<_>>(), vec![FOO, BAR, FOO]);

    let out = fx.output(None, true, Command::History).await.unwrap();
    assert!(out.starts_with("Migrations:\n"));
    assert!(!out.contains("There are no pending migrations"));
    let dates: Vec<_> = out.lines().filter(|l| l.starts_with("     Date: ")).collect();
    assert_eq!(
        dates,
        vec![
            "     Date: 2022-05-01 12:00",
            "     Date: 2022-05-02 12:00",
            "     Date: 2022-05-03 12:00"
        ]
    );
}

#[tokio::test]
async fn test_note_edits_last_run() {
    let mut fx = Fixture::new().await;
    fx.script(None, FOO, "select 1;");

    fx.note_text = "ran during the maintenance window".into();
    let err = fx
        .exec(None, false, Command::Note { target: FOO.into() })
        .await
        .unwrap_err();
    assert!(matches!(err, MigratronError::NoHistory(_)));

    fx.exec(None, false, Command::Run { target: FOO.into(), options: RunOptions::default() })
        .await
        .unwrap();
    fx.exec(None, false, Command::Note { target: FOO.into() })
        .await
        .unwrap();

    let foo = find(&fx, None, FOO).await;
    let last = migration_history::Model::last_run(&fx.db, foo.id)
        .await
        .unwrap()
        .unwrap();
    let meta = last.run_meta();
    assert_eq!(meta.notes.as_deref(), Some("ran during the maintenance window"));
    assert_eq!(meta.runner.as_deref(), Some("tester"));
}

#[tokio::test]
async fn test_clear_needs_confirmation() {
    let mut fx = Fixture::new().await;
    fx.script(None, FOO, "");
    fx.script(Some("data"), BAR, "");
    fx.exec(None, false, Command::RunAll { options: RunOptions::default() })
        .await
        .unwrap();
    fx.exec(Some("data"), false, Command::List).await.unwrap();

    fx.confirm_answer = false;
    fx.exec(None, false, Command::Clear).await.unwrap();
    assert_eq!(migration::Model::find_by_bucket(&fx.db, None).await.unwrap().len(), 1);

    fx.confirm_answer = true;
    fx.exec(None, false, Command::Clear).await.unwrap();
    assert!(migration::Model::find_by_bucket(&fx.db, None).await.unwrap().is_empty());
    assert!(migration::Model::find_by_bucket(&fx.db, Some("data")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_scaffolds_without_syncing() {
    let mut fx = Fixture::new().await;
    let out = fx
        .output(
            Some("schema"),
            false,
            Command::Create {
                name: "Add user index".into(),
                template: "sql".into(),
            },
        )
        .await
        .unwrap();
    assert!(out.starts_with("Created "));
    assert!(!out.contains("Getting initial meta-data"));

    let files: Vec<_> = std::fs::read_dir(fx.bucket_dir(Some("schema")))
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("_add-user-index.sql"));

    let out = fx.output(Some("schema"), true, Command::List).await.unwrap();
    assert!(out.contains("     Author: tester"));
    assert!(out.contains("     Description: Add user index"));

    let err = fx
        .exec(
            Some("schema"),
            false,
            Command::Create {
                name: "x".into(),
                template: "ruby".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, MigratronError::InvalidTemplate(_)));
}

#[tokio::test]
async fn test_flag_keeps_metadata_written_elsewhere() {
    let mut fx = Fixture::new().await;
    fx.script(None, FOO, "");
    fx.exec(None, false, Command::List).await.unwrap();

    let mut row: migration::ActiveModel = find(&fx, None, FOO).await.into();
    row.meta = Set(json!({"author": 7, "ticket": "OPS-1"}));
    row.update(&fx.db).await.unwrap();

    fx.exec(
        None,
        false,
        Command::Flag {
            target: FOO.into(),
            message: Some("hold".into()),
        },
    )
    .await
    .unwrap();

    let updated = find(&fx, None, FOO).await;
    assert_eq!(updated.meta.get("ticket"), Some(&json!("OPS-1")));
    assert_eq!(updated.meta.get("author"), Some(&json!("7")));
    assert_eq!(updated.meta.get("flag_message"), Some(&json!("hold")));
}

#[tokio::test]
async fn test_console_is_finished_even_when_the_command_fails() {
    let mut fx = Fixture::new().await;
    fx.script(None, FOO, "select 1;");
    assert!(!fx.console.is_finished());

    let err = fx.exec(None, false, Command::IsPending).await.unwrap_err();
    assert!(matches!(err, MigratronError::PendingMigrations(1)));
    assert!(fx.console.is_finished());
}

#[tokio::test]
async fn test_console_is_finished_after_a_listing() {
    let mut fx = Fixture::new().await;
    fx.script(None, FOO, "select 1;");

    let out = fx.output(None, false, Command::List).await.unwrap();
    assert!(out.contains("Migrations:"));
    assert!(fx.console.is_finished());
}
