//! `create`: new script files from built-in templates.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use crate::console::Console;
use crate::error::{MigratronError, MigratronResult};
use crate::scripts::ScriptRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Python,
    Sql,
}

impl TemplateKind {
    pub fn extension(self) -> &'static str {
        match self {
            TemplateKind::Python => "py",
            TemplateKind::Sql => "sql",
        }
    }

    fn render(self, header: &str) -> String {
        match self {
            TemplateKind::Python => format!(
                "\"\"\"\n{header}\"\"\"\n\n\ndef main():\n    pass\n\n\nif __name__ == '__main__':\n    main()\n"
            ),
            TemplateKind::Sql => format!("/*\n{header}*/\n\n"),
        }
    }
}

impl FromStr for TemplateKind {
    type Err = MigratronError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" | "py" | ".py" => Ok(TemplateKind::Python),
            "sql" | ".sql" => Ok(TemplateKind::Sql),
            _ => Err(MigratronError::InvalidTemplate(s.to_string())),
        }
    }
}

#[derive(Serialize)]
struct Header<'a> {
    #[serde(rename = "Author")]
    author: &'a str,
    #[serde(rename = "Created")]
    created: String,
    #[serde(rename = "Description")]
    description: &'a str,
}

/// Lowercase, keeps `[a-z0-9_]`, turns whitespace and hyphen runs into one `-`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::new();
    let mut pending_dash = false;
    for c in name.trim().to_lowercase().chars() {
        if c.is_whitespace() || c == '-' {
            pending_dash = true;
        } else if c.is_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        }
    }
    slug
}

pub fn file_name(now: DateTime<Tz>, name: &str, kind: TemplateKind) -> String {
    format!(
        "{}_{}.{}",
        now.format("%Y%m%d%H%M%S"),
        slugify(name),
        kind.extension()
    )
}

/// Writes the script skeleton with its metadata header.
pub fn render(kind: TemplateKind, author: &str, created: DateTime<Tz>, description: &str) -> String {
    let header = Header {
        author,
        created: created.format("%Y-%m-%d %H:%M").to_string(),
        description,
    };
    let header = serde_yaml::to_string(&header).unwrap_or_default();
    kind.render(&header)
}

pub fn create(
    scripts: &ScriptRepository,
    name: &str,
    kind: TemplateKind,
    author: &str,
    now: DateTime<Utc>,
    tz: Tz,
    console: &mut dyn Console,
) -> MigratronResult<PathBuf> {
    let now = now.with_timezone(&tz);
    let path = scripts.full_path(&file_name(now, name, kind));
    if path.exists() {
        return Err(MigratronError::MigrationExists(path.display().to_string()));
    }

    fs::create_dir_all(scripts.dir())?;
    fs::write(&path, render(kind, author, now, name))?;

    console.say(&format!("Created {}", path.display()));
    log::info!("Created migration script {}", path.display());
    Ok(path)
}
