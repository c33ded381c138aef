//! procsched v0.1 — entry point
//!
//! Drives external commands under FCFS, Round-Robin, offline MLFQ, or
//! online SJF/MLFQ. Logs go to stderr; the CSV report goes to `--out`.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use procsched::clock::Clock;
use procsched::engine::{fcfs, mlfq_offline, mlfq_online, round_robin, sjf_online};
use procsched::report::write_report;

#[derive(Debug, Parser)]
#[command(name = "procsched")]
#[command(about = "A process scheduler for external commands", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v, -vv); logs go to stderr.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run commands to completion, one at a time, in input order.
    Fcfs {
        /// File of commands, one per line, or `-` for stdin.
        #[arg(long, default_value = "-")]
        input: String,

        /// Report CSV path.
        #[arg(long)]
        out: PathBuf,
    },

    /// Round-Robin over a fixed command list.
    Rr {
        #[arg(long, default_value = "-")]
        input: String,

        #[arg(long)]
        out: PathBuf,

        /// Time slice per dispatch, in milliseconds.
        #[arg(long)]
        quantum_ms: u64,
    },

    /// Offline three-level feedback queue with periodic priority boost.
    Mlfq {
        #[arg(long, default_value = "-")]
        input: String,

        #[arg(long)]
        out: PathBuf,

        #[arg(long)]
        quantum0: u64,

        #[arg(long)]
        quantum1: u64,

        #[arg(long)]
        quantum2: u64,

        #[arg(long)]
        boost_ms: u64,
    },

    /// Online shortest-job-first over commands arriving on stdin.
    #[command(name = "sjf-online")]
    SjfOnline {
        #[arg(long)]
        out: PathBuf,

        /// Samples used to estimate a command's next burst; 0 uses all.
        #[arg(long, default_value = "5")]
        k: u32,
    },

    /// Online feedback queue over commands arriving on stdin.
    #[command(name = "mlfq-online")]
    MlfqOnline {
        #[arg(long)]
        out: PathBuf,

        #[arg(long)]
        quantum0: u64,

        #[arg(long)]
        quantum1: u64,

        #[arg(long)]
        quantum2: u64,

        #[arg(long)]
        boost_ms: u64,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let clock = Clock::new();

    match cli.command {
        Command::Fcfs { input, out } => {
            let commands = read_commands(&input)?;
            let table = fcfs::run(&commands, &clock)?;
            write_report(&out, &table, false);
        }

        Command::Rr { input, out, quantum_ms } => {
            let commands = read_commands(&input)?;
            let table = round_robin::run(&commands, quantum_ms, &clock)?;
            write_report(&out, &table, false);
        }

        Command::Mlfq {
            input,
            out,
            quantum0,
            quantum1,
            quantum2,
            boost_ms,
        } => {
            let commands = read_commands(&input)?;
            let table =
                mlfq_offline::run(&commands, [quantum0, quantum1, quantum2], boost_ms, &clock)?;
            write_report(&out, &table, false);
        }

        Command::SjfOnline { out, k } => {
            sjf_online::run(&out, k, &clock)?;
        }

        Command::MlfqOnline {
            out,
            quantum0,
            quantum1,
            quantum2,
            boost_ms,
        } => {
            mlfq_online::run(&out, [quantum0, quantum1, quantum2], boost_ms, &clock)?;
        }
    }

    Ok(())
}

/// Read one command per line from `path`, or from stdin if `path == "-"`.
/// Blank lines are skipped.
fn read_commands(path: &str) -> Result<Vec<String>> {
    let text = if path == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read command list from stdin")?;
        buf
    } else {
        fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?
    };

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}
