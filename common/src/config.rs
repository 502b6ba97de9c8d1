use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::{env, fs};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub log_level: String,
    pub log_file: String,
    pub log_to_stderr: bool,
    pub database_path: String,
    /// Root directory holding the migration scripts, one sub-directory per type.
    pub migrations_dir: String,
    /// IANA timezone used when printing run dates.
    pub timezone: String,
    /// When set, every command must pass one of these types.
    pub allowed_types: Option<Vec<String>>,
    pub dbshell_cmd: String,
    pub interpreter_cmd: String,
    pub script_timeout_secs: Option<u64>,
    /// Template for the author link, `{hash}` is replaced with the last commit touching the script.
    pub author_link: Option<String>,
    pub operator: String,
}

static CONFIG: OnceCell<Config> = OnceCell::new();

impl Default for Config {
    fn default() -> Self {
        Config {
            log_level: "info".into(),
            log_file: "logs/migratron.log".into(),
            log_to_stderr: false,
            database_path: "data/migratron.db".into(),
            migrations_dir: "migrations".into(),
            timezone: "UTC".into(),
            allowed_types: None,
            dbshell_cmd: "psql".into(),
            interpreter_cmd: "python3".into(),
            script_timeout_secs: None,
            author_link: None,
            operator: String::new(),
        }
    }
}

impl Config {
    pub fn init(env_path: &str) -> &'static Self {
        dotenvy::from_filename(env_path).ok();

        CONFIG.get_or_init(|| {
            let config = Config::from_env();

            if let Some(parent) = std::path::Path::new(&config.log_file).parent() {
                fs::create_dir_all(parent).ok();
            }

            config
        })
    }

    /// Builds a config from the process environment, falling back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        let log_level = env::var("LOG_LEVEL").unwrap_or(defaults.log_level);
        let log_file = env::var("LOG_FILE").unwrap_or(defaults.log_file);
        let log_to_stderr = env::var("LOG_TO_STDERR")
            .map(|v| v == "true")
            .unwrap_or(defaults.log_to_stderr);
        let database_path = env::var("DATABASE_PATH").unwrap_or(defaults.database_path);
        let migrations_dir = env::var("MIGRATIONS_DIR").unwrap_or(defaults.migrations_dir);
        let timezone = env::var("MIGRATIONS_TIMEZONE").unwrap_or(defaults.timezone);
        let allowed_types = env::var("MIGRATIONS_ALLOWED_TYPES")
            .ok()
            .map(|raw| parse_list(&raw))
            .filter(|types| !types.is_empty());
        let dbshell_cmd = env::var("MIGRATIONS_DBSHELL_CMD").unwrap_or(defaults.dbshell_cmd);
        let interpreter_cmd =
            env::var("MIGRATIONS_INTERPRETER_CMD").unwrap_or(defaults.interpreter_cmd);
        let script_timeout_secs = env::var("MIGRATIONS_SCRIPT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok());
        let author_link = env::var("MIGRATIONS_AUTHOR_LINK")
            .ok()
            .filter(|s| !s.trim().is_empty());
        let operator = env::var("USER").unwrap_or_default();

        Config {
            log_level,
            log_file,
            log_to_stderr,
            database_path,
            migrations_dir,
            timezone,
            allowed_types,
            dbshell_cmd,
            interpreter_cmd,
            script_timeout_secs,
            author_link,
            operator,
        }
    }

    pub fn type_allowed(&self, bucket: Option<&str>) -> bool {
        match &self.allowed_types {
            Some(types) => bucket.map(|b| types.iter().any(|t| t == b)).unwrap_or(false),
            None => true,
        }
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
