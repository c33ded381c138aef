//! Offline multi-level feedback queue with periodic priority boost.
//!
//! All processes start in `q0`. Each iteration first checks whether a boost
//! is due (this happens *before* selection, so a boost never interrupts a
//! slice already in progress, only the choice of the next one); then the
//! highest non-empty level is selected and run for at most its quantum,
//! polling once per millisecond. Finishing within the quantum always wins
//! over demotion, even if both become true on the same poll.

use anyhow::Result;
use crate::child::{ChildController, ReapOutcome};
use crate::clock::Clock;
use crate::engine::{finish_process, sleep_ms, spawn_or_mark_failed};
use crate::process_table::{ProcessRecord, ProcessTable};
use crate::queues::{Level, Mlfq};
use tracing::{info, info_span};

const POLL_MS: u64 = 1;

pub fn run(
    commands: &[String],
    quanta: [u64; 3],
    boost_ms: u64,
    clock: &Clock,
) -> Result<ProcessTable> {
    let _span = info_span!("mlfq_offline", n = commands.len(), boost_ms).entered();
    let mut table = ProcessTable::new();
    let mut ctrl = ChildController::new();
    let scheduler_start = clock.now_ms();
    let mut mlfq = Mlfq::new();

    for command in commands {
        let idx = table.push(ProcessRecord::new(command.clone(), scheduler_start));
        table.get_mut(idx).current_level = Some(0);
        mlfq.push(0, idx);
    }

    let mut last_boost = clock.now_ms();

    while !table.all_finished() {
        if clock.now_ms().saturating_sub(last_boost) >= boost_ms {
            mlfq.boost();
            for idx in mlfq.q0.iter() {
                table.get_mut(*idx).current_level = Some(0);
            }
            last_boost = clock.now_ms();
            info!("priority boost");
        }

        let Some((level, idx)) = mlfq.pop_highest() else {
            sleep_ms(1);
            continue;
        };

        run_slice(
            &mut ctrl,
            &mut table,
            idx,
            level,
            quanta[level as usize],
            clock,
            &mut mlfq,
        )?;
    }

    Ok(table)
}

fn run_slice(
    ctrl: &mut ChildController,
    table: &mut ProcessTable,
    idx: usize,
    level: Level,
    quantum_ms: u64,
    clock: &Clock,
    mlfq: &mut Mlfq,
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
            // Quantum exhausted without finishing: demote, or recycle at the
            // bottom level if already there.
            ctrl.stop(pid)?;
            table.get_mut(idx).add_slice(slice_ms);
            let next_level = if level < 2 { level + 1 } else { 2 };
            table.get_mut(idx).current_level = Some(next_level);
            mlfq.push(next_level, idx);
            info!(command = %table.get(idx).command, level = next_level, "quantum expired, demoted");
        }
        Some(ReapOutcome::Gone) => {
            let now = clock.now_ms();
            let record = table.get_mut(idx);
            record.add_slice(slice_ms);
            record.mark_finished(now, true);
            info!(command = %record.command, "child vanished mid-run, marked finished");
        }
        Some(terminal) => {
            let now = clock.now_ms();
            finish_process(table, idx, now, terminal, slice_ms, None);
            info!(command = %table.get(idx).command, level, "mlfq completion");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_command_finishes_at_level_zero() {
        let clock = Clock::new();
        let table = run(&["/bin/echo Q".to_string()], [50, 100, 200], 10_000, &clock).unwrap();
        let p = table.get(0);
        assert!(p.finished && !p.error);
        assert_eq!(p.current_level, Some(0));
    }

    #[test]
    fn long_command_is_demoted_below_level_zero() {
        let clock = Clock::new();
        let table = run(
            &["/bin/sleep 0.3".to_string()],
            [10, 20, 1000],
            100_000, // boost never fires during the run
            &clock,
        )
        .unwrap();
        let p = table.get(0);
        assert!(p.finished && !p.error);
        assert!(p.current_level.unwrap() >= 1);
    }

    #[test]
    fn empty_input_produces_empty_table() {
        let clock = Clock::new();
        let table = run(&[], [10, 20, 30], 1000, &clock).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn failing_command_is_marked_error() {
        let clock = Clock::new();
        let table = run(&["/bin/false".to_string()], [50, 100, 200], 10_000, &clock).unwrap();
        let p = table.get(0);
        assert!(p.finished);
        assert!(p.error);
    }
}
