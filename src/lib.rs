//! A user-space scheduler that drives external command-line programs as
//! schedulable tasks under FCFS, Round-Robin, offline MLFQ, and online
//! SJF/MLFQ disciplines, using stop/continue/reap signals as the
//! preemption primitive.

pub mod child;
pub mod clock;
pub mod command;
pub mod engine;
pub mod error;
pub mod history;
pub mod ingest;
pub mod process_table;
pub mod queues;
pub mod report;

pub use clock::Clock;
pub use error::SchedulerError;
pub use process_table::{ProcessRecord, ProcessTable};
