//! DockaShell CLI - Main entry point

mod cli;

use clap::{Parser, Subcommand};
use dockashell_foundation::{NoteType, TraceFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// DockaShell - sandboxed command execution in per-project Docker containers
#[derive(Parser, Debug)]
#[command(name = "dockashell")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start (creating if needed) a project's container
    Start { project: String },

    /// Stop a project's container
    Stop { project: String },

    /// Show container status
    Status { project: String },

    /// Run a shell command in the project's container
    Run {
        project: String,

        /// Timeout in seconds (defaults to the project's max_execution_time)
        #[arg(short, long)]
        timeout: Option<f64>,

        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Apply a patch (`*** Begin Patch` ... `*** End Patch`) read from a file or stdin
    Patch {
        project: String,

        /// Patch file; stdin when omitted
        #[arg(short, long)]
        file: Option<std::path::PathBuf>,

        #[arg(short, long)]
        timeout: Option<f64>,
    },

    /// Write a file inside the container
    Write {
        project: String,

        /// Target path, relative to the working directory
        path: String,

        /// Content; stdin when omitted
        #[arg(short, long)]
        content: Option<String>,

        /// Replace an existing file
        #[arg(long)]
        overwrite: bool,

        #[arg(short, long)]
        timeout: Option<f64>,
    },

    /// Read trace entries, most recent first
    Traces {
        project: String,

        /// command, apply_patch, write_file, note, user, agent or summary
        #[arg(short = 't', long = "type")]
        kind: Option<TraceFilter>,

        /// Case-insensitive text search
        #[arg(short, long)]
        search: Option<String>,

        #[arg(long, default_value = "0")]
        skip: usize,

        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Append a note to the trace log
    Note {
        project: String,

        /// user, agent or summary
        note_type: NoteType,

        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },

    /// List configured projects
    Projects,
}

fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let json = args.json;
    let exit_code = match cli::run(args.command, json).await {
        Ok(code) => code,
        Err(e) => cli::report_error(&e, json),
    };
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}
