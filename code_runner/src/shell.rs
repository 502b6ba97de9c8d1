use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::{EngineConfig, ExecutionOutcome, ScriptEngine, join_streams, wait_for};

/// Pipes a whole script into one database shell process.
///
/// One process per script rather than per statement, so scripts holding several
/// statements behave exactly as they would typed into the shell.
pub struct ShellEngine {
    config: EngineConfig,
}

impl ShellEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

#[async_trait]
impl ScriptEngine for ShellEngine {
    async fn execute(&self, script: &Path) -> ExecutionOutcome {
        let payload = match tokio::fs::read(script).await {
            Ok(bytes) => bytes,
            Err(e) => return ExecutionOutcome::failed(format!("Cannot read {}: {}", script.display(), e)),
        };

        let Some((program, args)) = self.config.command_line(&self.config.dbshell_cmd) else {
            return ExecutionOutcome::failed("No database shell command configured");
        };
        log::debug!("Piping {} into {}", script.display(), program.display());

        let mut child = match Command::new(&program)
            .args(&args)
            .current_dir(&self.config.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                log::warn!("Could not start {}: {}", program.display(), e);
                return ExecutionOutcome::failed(format!(
                    "Could not start {}: {}",
                    program.display(),
                    e
                ));
            }
        };

        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                // The shell may exit before reading everything; its exit code decides.
                if let Err(e) = stdin.write_all(&payload).await {
                    log::debug!("Database shell closed its input early: {e}");
                }
            }
        };

        let (_, result) = tokio::join!(feed, wait_for(child, self.config.timeout()));

        match result {
            Ok(output) => {
                let streams = join_streams(&output.stdout, &output.stderr);
                if output.status.success() {
                    ExecutionOutcome::succeeded(streams)
                } else {
                    log::warn!("{} failed: {}", script.display(), output.status);
                    ExecutionOutcome::failed(streams)
                }
            }
            Err(e) => {
                log::warn!("{} did not finish: {}", script.display(), e);
                ExecutionOutcome::failed(format!("{} did not finish: {}", script.display(), e))
            }
        }
    }
}
