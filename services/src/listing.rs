//! The list, history and info views.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use colored::Color;
use db::models::{migration, migration_history};
use db::registry;
use sea_orm::DbConn;

use crate::console::Console;
use crate::error::{MigratronError, MigratronResult};

pub const LEAD: &str = "     ";
pub const WRAP_WIDTH: usize = 80;
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

pub fn parse_timezone(name: &str) -> MigratronResult<Tz> {
    name.parse::<Tz>()
        .map_err(|_| MigratronError::InvalidTimezone(name.to_string()))
}

/// `YYYY-MM-DD HH:MM` in the display timezone. Always 16 characters wide.
pub fn local_datetime(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format(DATE_FORMAT).to_string()
}

/// Fills `text` into lines of at most `width` columns, each starting with `indent`.
/// Whitespace runs collapse to single spaces and words longer than a line are split.
pub fn wrap(text: &str, width: usize, indent: &str) -> String {
    let room = width.saturating_sub(indent.chars().count()).max(1);
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        loop {
            let used = current.chars().count();
            if used == 0 {
                if word.len() <= room {
                    current = word.iter().collect();
                    break;
                }
                let rest = word.split_off(room);
                lines.push(word.iter().collect());
                word = rest;
            } else if used + 1 + word.len() <= room {
                current.push(' ');
                current.extend(word.iter());
                break;
            } else {
                lines.push(std::mem::take(&mut current));
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines
        .iter()
        .map(|line| format!("{indent}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct ListView<'a> {
    console: &'a mut dyn Console,
    tz: Tz,
    verbose: bool,
}

impl<'a> ListView<'a> {
    pub fn new(console: &'a mut dyn Console, tz: Tz, verbose: bool) -> Self {
        Self {
            console,
            tz,
            verbose,
        }
    }

    /// Pending migrations first, then the already-run ones by last run date.
    pub async fn list(&mut self, db: &DbConn, bucket: Option<&str>) -> MigratronResult<()> {
        let pending = registry::pending(db, bucket).await?;
        let runs = registry::already_run(db, bucket).await?;
        self.render(Some(&pending), &runs);
        Ok(())
    }

    /// Every recorded run of the bucket, oldest first.
    pub async fn history(&mut self, db: &DbConn, bucket: Option<&str>) -> MigratronResult<()> {
        let mut runs: Vec<_> = migration_history::Model::find_for_bucket(db, bucket)
            .await?
            .into_iter()
            .map(|(run, migration)| (migration, run))
            .collect();
        runs.reverse();

        if self.verbose {
            self.render(None, &runs);
        } else {
            for (migration, _) in &runs {
                self.console.say(&migration.filename);
            }
        }
        Ok(())
    }

    /// One migration in full, whatever the verbosity.
    pub async fn info(&mut self, db: &DbConn, target: &migration::Model) -> MigratronResult<()> {
        let last_run = migration_history::Model::last_run(db, target.id).await?;
        self.verbose = true;
        self.entry(target, last_run.as_ref());
        Ok(())
    }

    /// Writes the listing. `runs` is printed in the order given.
    pub fn render(
        &mut self,
        pending: Option<&[migration::Model]>,
        runs: &[(migration::Model, migration_history::Model)],
    ) {
        self.console.say("Migrations:");

        if let Some(pending) = pending {
            if pending.is_empty() {
                self.console.say("There are no pending migrations");
            }
            for migration in pending {
                self.entry(migration, None);
            }
        }

        for (migration, run) in runs {
            self.entry(migration, Some(run));
        }
    }

    fn entry(&mut self, migration: &migration::Model, run: Option<&migration_history::Model>) {
        if !self.verbose {
            match run {
                Some(run) => {
                    let date = local_datetime(run.create_date, self.tz);
                    self.console.write(&date, None);
                }
                None => self.console.write(&" ".repeat(16), None),
            }
        }

        let symbol = if run.is_some() { '*' } else { ' ' };
        self.console.write(&format!(" ({symbol}) "), None);

        let color = if self.verbose {
            Some(Color::Yellow)
        } else if migration.flagged {
            Some(Color::Red)
        } else {
            None
        };
        let name = self.display_name(migration);
        self.console.line(&name, color);

        if self.verbose {
            self.details(migration, run);
        }
    }

    fn display_name(&self, migration: &migration::Model) -> String {
        let meta = migration.script_meta();
        match meta.flag_message.as_deref() {
            Some(message) if migration.flagged && !message.is_empty() && !self.verbose => {
                format!("{} <--- {}", migration.filename, message)
            }
            _ => migration.filename.clone(),
        }
    }

    fn details(&mut self, migration: &migration::Model, run: Option<&migration_history::Model>) {
        let meta = migration.script_meta();
        let has_meta = !meta.is_empty() || migration.flagged;

        if has_meta {
            self.console.blank();
            let fields = [
                ("Author", &meta.author),
                ("Link", &meta.link),
                ("Description", &meta.description),
            ];
            for (label, value) in fields {
                if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                    self.console.say(&format!("{LEAD}{label}: {value}"));
                }
            }
            if migration.flagged {
                self.console.blank();
                self.console.line(&format!("{LEAD}Flagged: True"), Some(Color::Red));
                if let Some(message) = meta.flag_message.as_deref().filter(|m| !m.is_empty()) {
                    self.console.say(&wrap(message, WRAP_WIDTH, LEAD));
                }
            }
        }

        if let Some(run) = run {
            let run_meta = run.run_meta();
            self.console.blank();
            if let Some(runner) = run_meta.runner.as_deref().filter(|r| !r.is_empty()) {
                self.console.say(&format!("{LEAD}Runner: {runner}"));
            }
            let date = local_datetime(run.create_date, self.tz);
            self.console.say(&format!("{LEAD}Date: {date}"));
            if let Some(notes) = run_meta.notes.as_deref().filter(|n| !n.is_empty()) {
                self.console.say(&wrap(notes, WRAP_WIDTH, LEAD));
            }
        }

        if has_meta || run.is_some() {
            self.console.blank();
        }
    }
}
