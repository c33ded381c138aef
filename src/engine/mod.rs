//! Discipline-specific dispatch loops.

pub mod fcfs;
pub mod mlfq_offline;
pub mod mlfq_online;
pub mod round_robin;
pub mod sjf_online;

use std::thread::sleep;
use std::time::Duration;

use tracing::warn;

use crate::child::{ChildController, ReapOutcome};
use crate::clock::Clock;
use crate::command::parse_offline;
use crate::process_table::{ProcessRecord, ProcessTable};

/// MLFQ online poll granularity: also used as the offline MLFQ's
/// idle-retry interval.
pub const MLFQ_POLL_GRANULARITY_MS: u64 = 20;

/// SJF online poll granularity.
pub const SJF_POLL_GRANULARITY_MS: u64 = 50;

/// Default burst estimate for a command with no history.
pub const DEFAULT_BURST_ESTIMATE_MS: f64 = 1000.0;

pub(crate) fn sleep_ms(ms: u64) {
    sleep(Duration::from_millis(ms));
}

/// Spawn a freshly-arrived process suspended, recording a spawn failure
/// onto its record rather than propagating it.
pub(crate) fn spawn_or_mark_failed(
    ctrl: &mut ChildController,
    table: &mut ProcessTable,
    idx: usize,
    now: u64,
    online: bool,
) {
    let command = table.get(idx).command.clone();
    let argv = if online {
        Ok(crate::command::command_for_online(&command))
    } else {
        parse_offline(&command)
    };

    let argv = match argv {
        Ok(argv) => argv,
        Err(e) => {
            warn!(command = %command, error = %e, "command parse failed");
            table.get_mut(idx).mark_finished(now, true);
            return;
        }
    };

    match ctrl.spawn_suspended(&argv) {
        Ok(pid) => {
            table.get_mut(idx).mark_started(now, pid);
        }
        Err(e) => {
            warn!(command = %command, error = %e, "spawn failed");
            table.get_mut(idx).mark_finished(now, true);
        }
    }
}

/// Classify a terminal [`ReapOutcome`]. Only `Exited(0)` is a clean
/// success; everything else (non-zero exit, signal, vanished child) is an
/// error.
pub(crate) fn is_clean_exit(outcome: ReapOutcome) -> bool {
    matches!(outcome, ReapOutcome::Exited(0))
}

/// Finalize a process record on a terminal reap outcome, recording a
/// successful burst sample into `history` only on clean exit, so erroneous
/// runs never pollute the estimator.
pub(crate) fn finish_process(
    table: &mut ProcessTable,
    idx: usize,
    now: u64,
    outcome: ReapOutcome,
    slice_ms: u64,
    history: Option<&mut crate::history::BurstHistory>,
) {
    let error = !is_clean_exit(outcome);
    let record = table.get_mut(idx);
    record.add_slice(slice_ms);
    record.mark_finished(now, error);
    if !error {
        if let Some(history) = history {
            history.record(&record.command.clone(), slice_ms as f64);
        }
    }
}

/// Push a newly-arrived command into `table`, returning its index.
pub(crate) fn enqueue_arrival(table: &mut ProcessTable, command: String, now: u64) -> usize {
    table.push(ProcessRecord::new(command, now))
}

pub(crate) fn clock_now(clock: &Clock) -> u64 {
    clock.now_ms()
}
