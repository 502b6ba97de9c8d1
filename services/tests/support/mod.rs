#![allow(dead_code)]

use async_trait::async_trait;
use code_runner::{Engines, ExecutionOutcome, ScriptEngine};
use common::config::Config;
use db::test_utils::setup_test_db;
use sea_orm::DatabaseConnection;
use services::collaborators::{Confirm, Editor, NoAuthorLink};
use services::console::CaptureConsole;
use services::{execute, Command, Context, Invocation, MigratronResult};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Engine that records what it was asked to run and fails the scripts it was told to.
#[derive(Clone, Default)]
pub struct ScriptedEngine {
    failing: Vec<String>,
    calls: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ScriptEngine for ScriptedEngine {
    async fn execute(&self, script: &Path) -> ExecutionOutcome {
        let name = script
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.calls.lock().unwrap().push(name.clone());

        if self.failing.contains(&name) {
            ExecutionOutcome::failed(format!(
                "Error running {}\nStack trace: boom",
                script.display()
            ))
        } else {
            ExecutionOutcome::succeeded(format!("ran {name}"))
        }
    }
}

pub struct FixedConfirm(pub bool);

impl Confirm for FixedConfirm {
    fn confirm(&self, _prompt: &str) -> io::Result<bool> {
        Ok(self.0)
    }
}

pub struct FixedEditor(pub String);

impl Editor for FixedEditor {
    fn edit(&self, _initial: &str) -> MigratronResult<String> {
        Ok(self.0.trim().to_string())
    }
}

pub struct Fixture {
    pub dir: TempDir,
    pub db: DatabaseConnection,
    pub config: Config,
    pub engines: Engines,
    pub calls: Arc<Mutex<Vec<String>>>,
    pub console: CaptureConsole,
    pub confirm_answer: bool,
    pub note_text: String,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::failing(&[]).await
    }

    pub async fn failing(scripts: &[&str]) -> Self {
        let dir = TempDir::new().unwrap();
        let engine = ScriptedEngine {
            failing: scripts.iter().map(|s| s.to_string()).collect(),
            calls: Arc::default(),
        };
        let calls = engine.calls.clone();
        let config = Config {
            migrations_dir: dir.path().to_string_lossy().into_owned(),
            operator: "tester".into(),
            ..Config::default()
        };

        Self {
            dir,
            db: setup_test_db().await,
            config,
            engines: Engines::new(Box::new(engine.clone()), Box::new(engine)),
            calls,
            console: CaptureConsole::new(),
            confirm_answer: true,
            note_text: String::new(),
        }
    }

    pub fn bucket_dir(&self, bucket: Option<&str>) -> PathBuf {
        match bucket {
            Some(bucket) => self.dir.path().join(bucket),
            None => self.dir.path().to_path_buf(),
        }
    }

    pub fn script(&self, bucket: Option<&str>, name: &str, body: &str) {
        let dir = self.bucket_dir(bucket);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(name), body).unwrap();
    }

    pub fn remove(&self, bucket: Option<&str>, name: &str) {
        fs::remove_file(self.bucket_dir(bucket).join(name)).unwrap();
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub async fn exec(
        &mut self,
        bucket: Option<&str>,
        verbose: bool,
        command: Command,
    ) -> MigratronResult<()> {
        let confirm = FixedConfirm(self.confirm_answer);
        let editor = FixedEditor(self.note_text.clone());
        let mut ctx = Context {
            db: &self.db,
            config: &self.config,
            engines: &self.engines,
            console: &mut self.console,
            confirm: &confirm,
            editor: &editor,
            author_link: &NoAuthorLink,
        };
        let invocation = Invocation {
            bucket: bucket.map(str::to_owned),
            verbose,
            command,
        };
        execute(&mut ctx, invocation).await
    }

    /// Runs a command and returns only what it printed.
    pub async fn output(
        &mut self,
        bucket: Option<&str>,
        verbose: bool,
        command: Command,
    ) -> MigratronResult<String> {
        self.console.clear();
        self.exec(bucket, verbose, command).await?;
        Ok(self.console.output().to_string())
    }
}
