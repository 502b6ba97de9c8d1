use std::path::PathBuf;
use std::time::Duration;

/// How the engines start their subprocesses.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Interpreter command line for `.py` scripts; the script path is appended.
    pub interpreter_cmd: String,
    /// Database shell command line for `.sql` scripts; the script is written to its stdin.
    pub dbshell_cmd: String,
    pub timeout_secs: Option<u64>,
    /// Directory the subprocesses run in.
    pub working_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interpreter_cmd: "python3".into(),
            dbshell_cmd: "psql".into(),
            timeout_secs: None,
            working_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}

impl EngineConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Splits a command line on whitespace. A leading program that exists as a file in
    /// the working directory is resolved there (e.g. `manage.py dbshell`), anything
    /// else is left for `PATH` lookup.
    pub fn command_line(&self, raw: &str) -> Option<(PathBuf, Vec<String>)> {
        let mut parts = raw.split_whitespace();
        let program = parts.next()?;
        let args = parts.map(String::from).collect();

        let local = self.working_dir.join(program);
        let program = if local.is_file() {
            local
        } else {
            PathBuf::from(program)
        };

        Some((program, args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_command_line_resolves_local_program() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("manage.py"), "").unwrap();
        let config = EngineConfig {
            working_dir: dir.path().to_path_buf(),
            ..EngineConfig::default()
        };

        let (program, args) = config.command_line("manage.py dbshell").unwrap();
        assert_eq!(program, dir.path().join("manage.py"));
        assert_eq!(args, vec!["dbshell"]);
    }

    #[test]
    fn test_command_line_leaves_path_programs() {
        let dir = tempdir().unwrap();
        let config = EngineConfig {
            working_dir: dir.path().to_path_buf(),
            ..EngineConfig::default()
        };

        let (program, args) = config.command_line("psql -d app  -q").unwrap();
        assert_eq!(program, PathBuf::from("psql"));
        assert_eq!(args, vec!["-d", "app", "-q"]);
        assert!(config.command_line("   ").is_none());
    }
}
