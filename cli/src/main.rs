use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use code_runner::{EngineConfig, Engines};
use common::{config::Config, logger};
use services::collaborators::{author_link_for, ExternalEditor, StdinConfirm};
use services::console::{Console, PagerConsole, StdoutConsole};
use services::runner::RunOptions;
use services::{execute, Command, Context, Invocation};
use std::io::IsTerminal;

/// Create and run different buckets of unordered schema and data migrations.
#[derive(Parser, Debug)]
#[command(name = "migratron", version, about)]
struct Cli {
    /// Bucket (sub-directory of the scripts root) to work on
    #[arg(long = "type", short = 't', global = true)]
    bucket: Option<String>,
    /// Show metadata and run details in listings
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
    /// Pager for list and history, "none" to disable
    #[arg(long, global = true, default_value = "less")]
    pager: String,
    /// Environment file loaded before reading the configuration
    #[arg(long, global = true, default_value = ".env")]
    env_file: String,
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Args, Debug, Clone, Copy)]
struct BatchFlags {
    /// Record the run without executing the script
    #[arg(long)]
    log_only: bool,
    /// Skip failing scripts instead of aborting
    #[arg(long = "continue", alias = "continue-on-errors")]
    continue_on_error: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Create a new migration script from a template
    Create {
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
        /// python or sql
        #[arg(long, default_value = "python")]
        template: String,
    },
    /// Run one migration
    Run {
        target: String,
        #[command(flatten)]
        flags: BatchFlags,
        /// Run even if it has already been run
        #[arg(long)]
        again: bool,
    },
    /// Run every pending migration
    RunAll {
        #[command(flatten)]
        flags: BatchFlags,
    },
    /// List pending and already-run migrations
    List,
    /// List every recorded run
    History,
    /// Show the details of one migration
    Info { target: String },
    /// Toggle the flag on a migration, with an optional message when setting it
    Flag { target: String, message: Option<String> },
    /// Edit the notes of the last run of a migration
    Note { target: String },
    /// Delete the run history of a migration so it becomes pending again
    DeleteLog { target: String },
    /// Exit with an error when migrations are pending
    IsPending,
    /// Delete all migration history of all types
    Clear,
}

impl Cmd {
    fn into_command(self) -> Command {
        match self {
            Cmd::Create { name, template } => Command::Create {
                name: name.join(" "),
                template,
            },
            Cmd::Run {
                target,
                flags,
                again,
            } => Command::Run {
                target,
                options: RunOptions {
                    log_only: flags.log_only,
                    allow_rerun: again,
                    continue_on_error: flags.continue_on_error,
                },
            },
            Cmd::RunAll { flags } => Command::RunAll {
                options: RunOptions {
                    log_only: flags.log_only,
                    allow_rerun: false,
                    continue_on_error: flags.continue_on_error,
                },
            },
            Cmd::List => Command::List,
            Cmd::History => Command::History,
            Cmd::Info { target } => Command::Info { target },
            Cmd::Flag { target, message } => Command::Flag { target, message },
            Cmd::Note { target } => Command::Note { target },
            Cmd::DeleteLog { target } => Command::DeleteLog { target },
            Cmd::IsPending => Command::IsPending,
            Cmd::Clear => Command::Clear,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::init(&cli.env_file);
    if let Err(e) = logger::init_logger(&config.log_level, &config.log_file, config.log_to_stderr)
    {
        eprintln!("Logging disabled: {e}");
    }

    let db = db::connect(&config.database_path)
        .await
        .with_context(|| format!("Cannot open the migration registry at {}", config.database_path))?;

    let engine_config = EngineConfig {
        interpreter_cmd: config.interpreter_cmd.clone(),
        dbshell_cmd: config.dbshell_cmd.clone(),
        timeout_secs: config.script_timeout_secs,
        ..EngineConfig::default()
    };
    let engines = Engines::from_config(&engine_config);
    let author_link = author_link_for(config.author_link.as_deref());
    let editor = ExternalEditor::from_env();
    let confirm = StdinConfirm;

    let command = cli.command.into_command();
    let mut console = open_console(command.is_listing(), &cli.pager);
    let invocation = Invocation {
        bucket: cli.bucket,
        verbose: cli.verbose,
        command,
    };

    let mut ctx = Context {
        db: &db,
        config,
        engines: &engines,
        console: console.as_mut(),
        confirm: &confirm,
        editor: &editor,
        author_link: author_link.as_ref(),
    };
    execute(&mut ctx, invocation).await?;
    Ok(())
}

fn open_console(listing: bool, pager: &str) -> Box<dyn Console> {
    if listing && pager == "less" && std::io::stdout().is_terminal() {
        match PagerConsole::spawn(pager) {
            Ok(console) => return Box::new(console),
            Err(e) => log::warn!("Cannot start {pager}: {e}"),
        }
    }
    Box::new(StdoutConsole)
}
