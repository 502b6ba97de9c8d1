use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::{EngineConfig, ExecutionOutcome, ScriptEngine, join_streams, wait_for};

/// Runs a script file as the top-level program of an interpreter.
pub struct InterpreterEngine {
    config: EngineConfig,
}

impl InterpreterEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    fn failure(script: &Path, stdout: &str, trace: &str) -> ExecutionOutcome {
        let report = format!("Error running {}\nStack trace: {}", script.display(), trace);
        if stdout.is_empty() {
            ExecutionOutcome::failed(report)
        } else {
            ExecutionOutcome::failed(format!("{stdout}\n{report}"))
        }
    }
}

#[async_trait]
impl ScriptEngine for InterpreterEngine {
    async fn execute(&self, script: &Path) -> ExecutionOutcome {
        let Some((program, args)) = self.config.command_line(&self.config.interpreter_cmd) else {
            return Self::failure(script, "", "no interpreter command configured");
        };
        log::debug!("Interpreting {} with {}", script.display(), program.display());

        let child = Command::new(&program)
            .args(&args)
            .arg(script)
            .current_dir(&self.config.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                log::warn!("Could not start {}: {}", program.display(), e);
                let trace = format!("could not start {}: {}", program.display(), e);
                return Self::failure(script, "", &trace);
            }
        };

        match wait_for(child, self.config.timeout()).await {
            Ok(output) if output.status.success() => {
                ExecutionOutcome::succeeded(join_streams(&output.stdout, &output.stderr))
            }
            Ok(output) => {
                let stdout = join_streams(&output.stdout, b"");
                let stderr = join_streams(b"", &output.stderr);
                let trace = if stderr.is_empty() {
                    format!("exited with {}", output.status)
                } else {
                    stderr
                };
                log::warn!("{} failed: {}", script.display(), output.status);
                Self::failure(script, &stdout, &trace)
            }
            Err(e) => {
                log::warn!("{} did not finish: {}", script.display(), e);
                Self::failure(script, "", &e)
            }
        }
    }
}
