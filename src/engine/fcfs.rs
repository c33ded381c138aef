//! Non-preemptive first-come-first-served.
//!
//! For each process in input order: spawn and run to completion with a
//! blocking wait, then compute metrics. Since nothing else runs
//! concurrently, `total_cpu_time` is the full turnaround and
//! `waiting_time = turnaround_time - total_cpu_time` collapses to 0.

use anyhow::Result;
use tracing::{info, info_span};

use crate::child::{ChildController, ReapOutcome};
use crate::clock::Clock;
use crate::engine::{is_clean_exit, sleep_ms, spawn_or_mark_failed};
use crate::process_table::{ProcessRecord, ProcessTable};

const POLL_MS: u64 = 1;

/// Run every command in `commands` to completion, in order, before starting
/// the next. Every record's `arrival_time` is the scheduler start: the
/// same instant for the whole batch.
pub fn run(commands: &[String], clock: &Clock) -> Result<ProcessTable> {
    let _span = info_span!("fcfs", n = commands.len()).entered();
    let mut table = ProcessTable::new();
    let mut ctrl = ChildController::new();
    let scheduler_start = clock.now_ms();

    for command in commands {
        let idx = table.push(ProcessRecord::new(command.clone(), scheduler_start));
        run_one(&mut ctrl, &mut table, idx, clock)?;
    }

    Ok(table)
}

fn run_one(
    ctrl: &mut ChildController,
    table: &mut ProcessTable,
    idx: usize,
    clock: &Clock,
) -> Result<()> {
    let now = clock.now_ms();
    spawn_or_mark_failed(ctrl, table, idx, now, false);
    if table.get(idx).finished {
        return Ok(()); // spawn failed, already recorded as an error.
    }

    let pid = table
        .get(idx)
        .child_handle
        .expect("just spawned, handle must be set");

    ctrl.cont(pid)?;

    let outcome = loop {
        match ctrl.try_reap(pid) {
            ReapOutcome::StillRunning => sleep_ms(POLL_MS),
            other => break other,
        }
    };

    let now = clock.now_ms();
    let error = !is_clean_exit(outcome);
    let record = table.get_mut(idx);
    record.mark_finished(now, error);
    // Since no other task runs concurrently, total_cpu_time is treated as
    // the full turnaround, making waiting_time collapse to 0.
    record.total_cpu_time = record.turnaround_time();
    info!(command = %record.command, error, "fcfs completion");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_fast_commands_finish_in_order() {
        let clock = Clock::new();
        let table = run(
            &["/bin/echo A".to_string(), "/bin/echo B".to_string()],
            &clock,
        )
        .unwrap();

        assert_eq!(table.len(), 2);
        let a = table.get(0);
        let b = table.get(1);
        assert!(a.finished && !a.error);
        assert!(b.finished && !b.error);
        assert!(b.completion_time.unwrap() >= a.completion_time.unwrap());
    }

    #[test]
    fn empty_input_produces_empty_table() {
        let clock = Clock::new();
        let table = run(&[], &clock).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn failing_command_is_marked_error() {
        let clock = Clock::new();
        let table = run(&["/bin/false".to_string()], &clock).unwrap();
        let p = table.get(0);
        assert!(p.finished);
        assert!(p.error);
    }

    #[test]
    fn waiting_time_is_zero_since_nothing_else_runs() {
        let clock = Clock::new();
        let table = run(&["/bin/echo A".to_string()], &clock).unwrap();
        let p = table.get(0);
        assert_eq!(p.waiting_time(), 0);
        assert!(p.response_time() <= p.turnaround_time());
    }
}
