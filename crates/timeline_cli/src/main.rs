//! Command-line front end for the timeline.
//!
//! # Responsibility
//! - Map one user action to one store operation per invocation.
//! - Resolve configuration from flags and `TIMELINE_*` environment variables.
//! - Print every notice the store emitted, then the resulting timeline.

mod render;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::warn;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use timeline_core::db::open_db;
use timeline_core::{
    default_log_level, init_logging, parse_timestamp, LogConfig, LogNotifier, NewTask, Notice,
    Notifier, RecordingNotifier, SeedPolicy, SqliteBlobStorage, StoreError, SystemClock, TaskId,
    TimelinePersistence, TimelineStore,
};

const DB_FILE_NAME: &str = "timeline.sqlite3";

#[derive(Debug, Parser)]
#[command(name = "timeline", version, about = "Record completed tasks on a timeline")]
struct Cli {
    /// SQLite file holding the timeline.
    #[arg(long, env = "TIMELINE_DB_PATH", global = true)]
    db: Option<PathBuf>,

    /// Directory for rolling log files; logging is off when unset.
    #[arg(long, env = "TIMELINE_LOG_DIR", global = true)]
    log_dir: Option<PathBuf>,

    /// trace|debug|info|warn|error
    #[arg(long, env = "TIMELINE_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    /// Start from an empty timeline instead of sample entries.
    #[arg(long, global = true)]
    empty_seed: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the timeline, newest first.
    List,
    /// Add an accomplishment (or a to-do with --todo).
    Add {
        title: String,
        #[arg(long, short)]
        description: Option<String>,
        #[arg(long)]
        todo: bool,
    },
    /// Mark a pending to-do as done.
    Complete { id: TaskId },
    /// Remove an entry.
    Delete { id: TaskId },
    /// Change the date of an entry (YYYY-MM-DD or RFC 3339).
    Reschedule { id: TaskId, date: String },
    /// Write the timeline as CSV.
    Export {
        /// Target file; defaults to timeline-<today>.csv in the current directory.
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Merge entries from a Title,Date CSV file.
    Import { file: PathBuf },
}

/// Logs every notice and keeps it for printing.
#[derive(Default)]
struct CliNotifier {
    log: LogNotifier,
    recorded: RecordingNotifier,
}

impl Notifier for CliNotifier {
    fn notify(&self, notice: Notice) {
        self.log.notify(notice.clone());
        self.recorded.notify(notice);
    }
}

/// How a command ended. Soft failures leave the timeline untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Applied,
    Declined,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    start_logging(&cli)?;

    let db_path = resolve_db_path(cli.db.as_deref());
    let conn = open_db(&db_path)
        .with_context(|| format!("failed to open timeline database `{}`", db_path.display()))?;
    let seed_policy = if cli.empty_seed {
        SeedPolicy::Empty
    } else {
        SeedPolicy::Samples
    };
    let persistence = TimelinePersistence::new(SqliteBlobStorage::new(&conn), seed_policy);
    let mut store = TimelineStore::open(persistence, CliNotifier::default(), SystemClock);

    let outcome = run(&mut store, cli.command.unwrap_or(Command::List));
    for notice in store.notifier().recorded.drain() {
        if notice.is_error() {
            eprintln!("{notice}");
        } else {
            println!("{notice}");
        }
    }

    match outcome? {
        Status::Applied if !store.has_unsaved_changes() => Ok(ExitCode::SUCCESS),
        _ => Ok(ExitCode::FAILURE),
    }
}

/// Runs one command against the store.
///
/// Rejected input (blank title, unknown id, bad date, unreadable import)
/// ends as `Status::Declined`; only database and export I/O failures are
/// returned as errors.
fn run(
    store: &mut TimelineStore<SqliteBlobStorage<'_>, CliNotifier, SystemClock>,
    command: Command,
) -> Result<Status> {
    let applied = match command {
        Command::List => {
            print!("{}", render::render_view(&store.view()));
            Ok(())
        }
        Command::Add {
            title,
            description,
            todo,
        } => {
            let request = if todo {
                NewTask::todo(title)
            } else {
                NewTask::accomplishment(title)
            };
            store
                .add(request.with_description(description.unwrap_or_default()))
                .map(|id| println!("{id}"))
        }
        Command::Complete { id } => store.complete(id),
        Command::Delete { id } => store.delete(id).map(drop),
        Command::Reschedule { id, date } => match parse_timestamp(&date) {
            Ok(date) => store.reschedule(id, date),
            Err(err) => return Ok(declined(&err.to_string())),
        },
        Command::Export { out } => {
            let export = store.export_csv();
            let path = out.unwrap_or_else(|| PathBuf::from(&export.file_name));
            std::fs::write(&path, export.contents)
                .with_context(|| format!("failed to write `{}`", path.display()))?;
            Ok(())
        }
        Command::Import { file } => match std::fs::read_to_string(&file) {
            Ok(text) => store.import_csv(&text).map(drop),
            Err(err) => {
                store.report_import_failure(format!("cannot read `{}`: {err}", file.display()));
                return Ok(Status::Declined);
            }
        },
    };

    Ok(match applied {
        Ok(()) => Status::Applied,
        // Import failures already surface as an ImportFailed notice.
        Err(StoreError::Import(err)) => {
            warn!("event=cli_command module=cli status=declined error={err}");
            Status::Declined
        }
        Err(err) => declined(&err.to_string()),
    })
}

fn declined(reason: &str) -> Status {
    warn!("event=cli_command module=cli status=declined");
    eprintln!("{reason}");
    Status::Declined
}

fn start_logging(cli: &Cli) -> Result<()> {
    let Some(log_dir) = cli.log_dir.as_deref() else {
        return Ok(());
    };
    let log_dir = if log_dir.is_absolute() {
        log_dir.to_path_buf()
    } else {
        std::env::current_dir()
            .context("failed to resolve current directory")?
            .join(log_dir)
    };
    let level = cli.log_level.as_deref().unwrap_or(default_log_level());

    let config = LogConfig::new(level, log_dir)?;
    init_logging(&config)?;
    Ok(())
}

fn resolve_db_path(flag: Option<&Path>) -> PathBuf {
    match flag {
        Some(path) if !path.as_os_str().is_empty() => path.to_path_buf(),
        _ => std::env::temp_dir().join(DB_FILE_NAME),
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve_db_path, run, Cli, CliNotifier, Command, Status, DB_FILE_NAME};
    use clap::Parser;
    use std::path::{Path, PathBuf};
    use timeline_core::db::open_db_in_memory;
    use timeline_core::{
        Notice, SeedPolicy, SqliteBlobStorage, SystemClock, TaskId, TimelinePersistence,
        TimelineStore,
    };

    #[test]
    fn db_path_defaults_to_temp_dir() {
        assert_eq!(
            resolve_db_path(None),
            std::env::temp_dir().join(DB_FILE_NAME)
        );
        assert_eq!(
            resolve_db_path(Some(Path::new(""))),
            std::env::temp_dir().join(DB_FILE_NAME)
        );
        assert_eq!(
            resolve_db_path(Some(Path::new("/data/t.sqlite3"))),
            PathBuf::from("/data/t.sqlite3")
        );
    }

    #[test]
    fn parses_add_todo_with_description() {
        let cli = Cli::try_parse_from([
            "timeline",
            "add",
            "Learn macros",
            "--todo",
            "-d",
            "declarative first",
        ])
        .unwrap();
        match cli.command {
            Some(Command::Add {
                title,
                description,
                todo,
            }) => {
                assert_eq!(title, "Learn macros");
                assert_eq!(description.as_deref(), Some("declarative first"));
                assert!(todo);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(Cli::try_parse_from(["timeline", "complete", "not-a-uuid"]).is_err());
    }

    #[test]
    fn every_soft_failure_is_declined() {
        let conn = open_db_in_memory().unwrap();
        let persistence = TimelinePersistence::new(SqliteBlobStorage::new(&conn), SeedPolicy::Empty);
        let mut store = TimelineStore::open(persistence, CliNotifier::default(), SystemClock);
        let missing = TaskId::new_v4();
        let dir = tempfile::tempdir().unwrap();
        let bad_csv = dir.path().join("bad.csv");
        std::fs::write(&bad_csv, "Title,Date\n\"x\",\"someday\"\n").unwrap();

        let commands = vec![
            Command::Add {
                title: "  ".to_string(),
                description: None,
                todo: false,
            },
            Command::Complete { id: missing },
            Command::Delete { id: missing },
            Command::Reschedule {
                id: missing,
                date: "2024-01-15".to_string(),
            },
            Command::Import {
                file: dir.path().join("absent.csv"),
            },
            Command::Import { file: bad_csv },
        ];
        for command in commands {
            let label = format!("{command:?}");
            assert_eq!(run(&mut store, command).unwrap(), Status::Declined, "{label}");
        }
        assert!(store.is_empty());

        let failures = store.notifier().recorded.drain();
        assert_eq!(failures.len(), 2);
        assert!(failures
            .iter()
            .all(|notice| matches!(notice, Notice::ImportFailed { .. })));
    }

    #[test]
    fn applied_commands_report_applied() {
        let conn = open_db_in_memory().unwrap();
        let persistence = TimelinePersistence::new(SqliteBlobStorage::new(&conn), SeedPolicy::Empty);
        let mut store = TimelineStore::open(persistence, CliNotifier::default(), SystemClock);

        let add = Command::Add {
            title: "Ship it".to_string(),
            description: None,
            todo: true,
        };
        assert_eq!(run(&mut store, add).unwrap(), Status::Applied);
        let id = store.records()[0].id;
        assert_eq!(run(&mut store, Command::Complete { id }).unwrap(), Status::Applied);
        assert_eq!(run(&mut store, Command::List).unwrap(), Status::Applied);
    }
}
