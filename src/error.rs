//! Scheduler error taxonomy.
//!
//! Most of these are recorded onto a `ProcessRecord` rather than propagated —
//! a single misbehaving child must never abort a discipline's run. Only a
//! failure to signal a child at all (the scheduler itself losing control,
//! e.g. `EPERM` rather than `ESRCH`) escapes as an `anyhow::Error`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("failed to spawn command {command:?}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command {command:?} exited with non-zero status {code}")]
    NonZeroExit { command: String, code: i32 },

    #[error("child for command {command:?} vanished before expected completion")]
    LostChild { command: String },

    #[error("input channel closed")]
    InputClosed,

    #[error("failed to write report to {path}: {source}")]
    Reporting {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("command line is empty")]
    EmptyCommand,

    #[error("failed to signal pid {pid}: {source}")]
    Signal {
        pid: i32,
        #[source]
        source: std::io::Error,
    },
}
