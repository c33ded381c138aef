//! Preemptive Round-Robin with a single ready queue.
//!
//! Every arrival is enqueued once at construction. The loop pops the front
//! index, spawns it (first dispatch) or continues it (subsequent slices),
//! sleeps the quantum while polling for an early exit, then either finishes
//! the record or stops the child and requeues it at the back.

use std::collections::VecDeque;

use anyhow::Result;
use tracing::{info, info_span};

use crate::child::{ChildController, ReapOutcome};
use crate::clock::Clock;
use crate::engine::{finish_process, sleep_ms, spawn_or_mark_failed};
use crate::process_table::{ProcessRecord, ProcessTable};

const POLL_MS: u64 = 1;

pub fn run(commands: &[String], quantum_ms: u64, clock: &Clock) -> Result<ProcessTable> {
    let _span = info_span!("round_robin", n = commands.len(), quantum_ms).entered();
    let mut table = ProcessTable::new();
    let mut ctrl = ChildController::new();
    let scheduler_start = clock.now_ms();
    let mut ready: VecDeque<usize> = VecDeque::new();

    for command in commands {
        let idx = table.push(ProcessRecord::new(command.clone(), scheduler_start));
        ready.push_back(idx);
    }

    while let Some(idx) = ready.pop_front() {
        if table.get(idx).finished {
            continue; // defensive: shouldn't happen, but never re-run a finished task.
        }
        run_slice(&mut ctrl, &mut table, idx, quantum_ms, clock, &mut ready)?;
    }

    Ok(table)
}

fn run_slice(
    ctrl: &mut ChildController,
    table: &mut ProcessTable,
    idx: usize,
    quantum_ms: u64,
    clock: &Clock,
    ready: &mut VecDeque<usize>,
) -> Result<()> {
    let now = clock.now_ms();
    let already_started = table.get(idx).started;

    if already_started {
        let pid = table
            .get(idx)
            .child_handle
            .expect("started task must have a handle");
        ctrl.cont(pid)?;
    } else {
        spawn_or_mark_failed(ctrl, table, idx, now, false);
        if table.get(idx).finished {
            return Ok(()); // spawn failed, already recorded as an error.
        }
        let pid = table
            .get(idx)
            .child_handle
            .expect("just spawned, handle must be set");
        ctrl.cont(pid)?;
    }

    let pid = table
        .get(idx)
        .child_handle
        .expect("just spawned or continued, handle must be set");

    let slice_start = clock.now_ms();
    let outcome = loop {
        match ctrl.try_reap(pid) {
            ReapOutcome::StillRunning => {
                if clock.now_ms().saturating_sub(slice_start) >= quantum_ms {
                    break None;
                }
                sleep_ms(POLL_MS);
            }
            terminal => break Some(terminal),
        }
    };

    let slice_ms = clock.now_ms().saturating_sub(slice_start);

    match outcome {
        None => {
            // Quantum exhausted, still running: stop and requeue at the back.
            ctrl.stop(pid)?;
            table.get_mut(idx).add_slice(slice_ms);
            ready.push_back(idx);
            info!(command = %table.get(idx).command, "quantum expired, requeued");
        }
        Some(ReapOutcome::Gone) => {
            // A `Gone` reap outcome is treated as finished, never requeued
            // — there is nothing left to continue.
            let now = clock.now_ms();
            let record = table.get_mut(idx);
            record.add_slice(slice_ms);
            record.mark_finished(now, true);
            info!(command = %record.command, "child vanished mid-run, marked finished");
        }
        Some(terminal) => {
            let now = clock.now_ms();
            finish_process(table, idx, now, terminal, slice_ms, None);
            info!(command = %table.get(idx).command, "round-robin completion");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_commands_interleave_and_both_finish() {
        let clock = Clock::new();
        let table = run(
            &["/bin/sleep 0.05".to_string(), "/bin/echo B".to_string()],
            10,
            &clock,
        )
        .unwrap();
        assert!(table.all_finished());
        assert!(!table.get(0).error);
        assert!(!table.get(1).error);
    }

    #[test]
    fn empty_input_produces_empty_table() {
        let clock = Clock::new();
        let table = run(&[], 50, &clock).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn failing_command_is_marked_error_without_requeue() {
        let clock = Clock::new();
        let table = run(&["/bin/false".to_string()], 50, &clock).unwrap();
        let p = table.get(0);
        assert!(p.finished);
        assert!(p.error);
    }

    #[test]
    fn long_quantum_finishes_fast_command_in_one_slice() {
        let clock = Clock::new();
        let table = run(&["/bin/echo A".to_string()], 1000, &clock).unwrap();
        let p = table.get(0);
        assert!(p.finished && !p.error);
    }
}
