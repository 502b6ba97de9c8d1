//! Interactive and environmental helpers the commands depend on.
//!
//! Each sits behind a small trait so commands can be exercised without a terminal,
//! an editor or a git checkout.

use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::Command;

use crate::error::{MigratronError, MigratronResult};

/// Yes/no question put to the operator.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> io::Result<bool>;
}

/// Lets the operator edit a piece of text.
pub trait Editor {
    fn edit(&self, initial: &str) -> MigratronResult<String>;
}

/// Looks up a link describing who last changed a script.
pub trait AuthorLink {
    fn link(&self, script: &Path) -> Result<Option<String>, String>;
}

#[derive(Debug, Default)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> io::Result<bool> {
        let mut stdout = io::stdout();
        stdout.write_all(prompt.as_bytes())?;
        stdout.flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(answer.trim().eq_ignore_ascii_case("y"))
    }
}

/// Runs `$VISUAL`, then `$EDITOR`, then `vi` on a temporary file.
#[derive(Debug, Clone)]
pub struct ExternalEditor {
    command: String,
}

impl ExternalEditor {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn from_env() -> Self {
        let command = ["VISUAL", "EDITOR"]
            .iter()
            .filter_map(|var| env::var(var).ok())
            .find(|value| !value.trim().is_empty())
            .unwrap_or_else(|| "vi".to_string());
        Self::new(command)
    }
}

impl Editor for ExternalEditor {
    fn edit(&self, initial: &str) -> MigratronResult<String> {
        let file = tempfile::Builder::new()
            .prefix("migratron-note-")
            .suffix(".txt")
            .tempfile()?;
        fs::write(file.path(), initial)?;

        let mut words = self.command.split_whitespace();
        let program = words
            .next()
            .ok_or_else(|| MigratronError::Editor("no editor configured".into()))?;

        let status = Command::new(program)
            .args(words)
            .arg(file.path())
            .status()
            .map_err(|e| MigratronError::Editor(format!("{program}: {e}")))?;
        if !status.success() {
            return Err(MigratronError::Editor(format!("{program} {status}")));
        }

        Ok(fs::read_to_string(file.path())?.trim().to_string())
    }
}

/// Substitutes the last commit hash touching the script into a link template.
#[derive(Debug, Clone)]
pub struct GitAuthorLink {
    template: String,
}

impl GitAuthorLink {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn render(&self, hash: &str) -> String {
        self.template.replace("{hash}", hash)
    }
}

impl AuthorLink for GitAuthorLink {
    fn link(&self, script: &Path) -> Result<Option<String>, String> {
        let dir = script.parent().unwrap_or_else(|| Path::new("."));
        let output = Command::new("git")
            .args(["log", "-1", "--pretty=format:%H", "--"])
            .arg(script)
            .current_dir(dir)
            .output()
            .map_err(|e| e.to_string())?;
        if !output.status.success() {
            return Err(String::from_utf8_lossy(&output.stderr).trim().to_string());
        }

        let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if hash.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.render(&hash)))
    }
}

#[derive(Debug, Default)]
pub struct NoAuthorLink;

impl AuthorLink for NoAuthorLink {
    fn link(&self, _script: &Path) -> Result<Option<String>, String> {
        Ok(None)
    }
}

/// Picks the author-link lookup for an optional template.
pub fn author_link_for(template: Option<&str>) -> Box<dyn AuthorLink> {
    match template {
        Some(template) => Box::new(GitAuthorLink::new(template)),
        None => Box::new(NoAuthorLink),
    }
}
