//! Script execution engines.
//!
//! A migration script is run by one of two engines, picked from its file extension:
//! `.py` scripts go to an interpreter that runs the file as a top-level program, `.sql`
//! scripts are piped whole into a database shell. Both report a uniform
//! [`ExecutionOutcome`]; engine problems (missing binary, timeout, non-zero exit) become
//! failed outcomes and never errors, so one bad script cannot take the runner down.

use async_trait::async_trait;
use std::path::Path;
use std::process::Output;
use std::time::Duration;
use tokio::process::Child;
use tokio::time::timeout;

pub mod execution_config;
mod interpreter;
mod shell;

pub use execution_config::EngineConfig;
pub use interpreter::InterpreterEngine;
pub use shell::ShellEngine;

/// Result of running one script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub success: bool,
    /// Everything worth showing the operator: script output and, on failure, the trace.
    pub output: String,
}

impl ExecutionOutcome {
    pub fn succeeded(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }
}

#[async_trait]
pub trait ScriptEngine: Send + Sync {
    async fn execute(&self, script: &Path) -> ExecutionOutcome;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Interpreter,
    Shell,
}

impl EngineKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("py") => Some(EngineKind::Interpreter),
            Some("sql") => Some(EngineKind::Shell),
            _ => None,
        }
    }
}

/// The two engines, selected by extension.
pub struct Engines {
    interpreter: Box<dyn ScriptEngine>,
    shell: Box<dyn ScriptEngine>,
}

impl Engines {
    pub fn new(interpreter: Box<dyn ScriptEngine>, shell: Box<dyn ScriptEngine>) -> Self {
        Self { interpreter, shell }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            Box::new(InterpreterEngine::new(config)),
            Box::new(ShellEngine::new(config)),
        )
    }

    pub fn for_kind(&self, kind: EngineKind) -> &dyn ScriptEngine {
        match kind {
            EngineKind::Interpreter => self.interpreter.as_ref(),
            EngineKind::Shell => self.shell.as_ref(),
        }
    }
}

/// Waits for a spawned child, killing it if the optional limit runs out.
pub(crate) async fn wait_for(child: Child, limit: Option<Duration>) -> Result<Output, String> {
    let waiting = child.wait_with_output();
    match limit {
        Some(limit) => match timeout(limit, waiting).await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(_) => Err(format!("timed out after {}s", limit.as_secs())),
        },
        None => waiting.await.map_err(|e| e.to_string()),
    }
}

/// Joins the non-empty output streams, stdout first.
pub(crate) fn join_streams(stdout: &[u8], stderr: &[u8]) -> String {
    [stdout, stderr]
        .iter()
        .map(|s| String::from_utf8_lossy(s).trim_end().to_string())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
