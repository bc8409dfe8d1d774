//! Command-line interface for sluice, built on clap.
//!
//! Defines the [`Cli`] struct with the `jobs`, `run`, `run-all`, and `queue`
//! subcommands plus global flags overriding the environment configuration.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use sluice_db::models::WorkItemStatus;

/// Sluice — chained job execution over a durable parallel work queue.
#[derive(Debug, Parser)]
#[command(name = "sluice", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// SQLite database URL (overrides `DATABASE_URL`).
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Directory for processed output files (overrides `OUTPUT_DIR`).
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the chain's steps in execution order.
    Jobs,

    /// Run the chain once over a single input.
    Run {
        /// Input for the starting step: a file path, or a batch id when
        /// starting from the finalize step.
        input: String,

        /// Step name to start from (default: first step).
        #[arg(long)]
        start_from: Option<String>,

        /// Step name to stop after (default: last step).
        #[arg(long)]
        stop_after: Option<String>,
    },

    /// Run the chain over many inputs in parallel.
    RunAll {
        /// Input files to process.
        files: Vec<String>,

        /// Take inputs from the work queue instead of the command line.
        #[arg(long)]
        from_queue: bool,

        /// Maximum queue items to claim (only with --from-queue).
        #[arg(long)]
        limit: Option<i64>,

        /// Worker count (default: all available parallelism).
        #[arg(long)]
        max_workers: Option<usize>,
    },

    /// Manage the work queue.
    #[command(subcommand)]
    Queue(QueueCommand),
}

#[derive(Debug, Subcommand)]
pub enum QueueCommand {
    /// Enqueue one or more input files.
    Add {
        #[arg(required = true)]
        files: Vec<String>,

        /// Priority (higher is processed first).
        #[arg(long, default_value_t = 0)]
        priority: i64,
    },

    /// List queue items, newest first.
    List {
        /// Filter by status.
        #[arg(long, value_enum)]
        status: Option<StatusArg>,

        /// Maximum number of items to show.
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },

    /// Delete queue items with the given status, or all of them.
    Clear {
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
    },

    /// Reset failed items back to pending.
    RetryFailed,
}

/// Status filter accepted by the CLI, mapped to [`WorkItemStatus`].
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl From<StatusArg> for WorkItemStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Pending => WorkItemStatus::Pending,
            StatusArg::Processing => WorkItemStatus::Processing,
            StatusArg::Completed => WorkItemStatus::Completed,
            StatusArg::Failed => WorkItemStatus::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_range_flags() {
        let cli = Cli::parse_from([
            "sluice",
            "run",
            "input.txt",
            "--start-from",
            "persist",
            "--stop-after",
            "persist",
        ]);
        match cli.command {
            Command::Run {
                input,
                start_from,
                stop_after,
            } => {
                assert_eq!(input, "input.txt");
                assert_eq!(start_from.as_deref(), Some("persist"));
                assert_eq!(stop_after.as_deref(), Some("persist"));
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn parses_run_all_from_queue() {
        let cli = Cli::parse_from([
            "sluice",
            "run-all",
            "--from-queue",
            "--limit",
            "10",
            "--max-workers",
            "2",
        ]);
        match cli.command {
            Command::RunAll {
                files,
                from_queue,
                limit,
                max_workers,
            } => {
                assert!(files.is_empty());
                assert!(from_queue);
                assert_eq!(limit, Some(10));
                assert_eq!(max_workers, Some(2));
            }
            _ => panic!("expected run-all command"),
        }
    }

    #[test]
    fn parses_queue_add_with_priority() {
        let cli = Cli::parse_from(["sluice", "queue", "add", "a.txt", "b.txt", "--priority", "5"]);
        match cli.command {
            Command::Queue(QueueCommand::Add { files, priority }) => {
                assert_eq!(files, ["a.txt", "b.txt"]);
                assert_eq!(priority, 5);
            }
            _ => panic!("expected queue add command"),
        }
    }

    #[test]
    fn queue_add_requires_at_least_one_file() {
        assert!(Cli::try_parse_from(["sluice", "queue", "add"]).is_err());
    }

    #[test]
    fn parses_global_flags() {
        let cli = Cli::parse_from([
            "sluice",
            "--database-url",
            "sqlite:custom.db",
            "--output-dir",
            "/tmp/out",
            "jobs",
        ]);
        assert_eq!(cli.database_url.as_deref(), Some("sqlite:custom.db"));
        assert_eq!(cli.output_dir, Some(PathBuf::from("/tmp/out")));
    }
}
