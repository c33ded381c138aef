//! Online multi-level feedback queue: the three-level feedback structure
//! combined with stdin ingestion and the per-command burst estimator.
//!
//! New arrivals are placed by estimated burst relative to the level quanta
//! (default `Q1` with no history). A running slice is shortened to the
//! task's remaining estimated work when history exists, and is polled every
//! `MLFQ_POLL_GRANULARITY_MS` both for its own completion and for
//! higher-priority arrivals, which preempt without demotion.

use std::path::Path;

use anyhow::Result;
use tracing::{info, info_span};

use crate::child::{ChildController, ReapOutcome};
use crate::clock::Clock;
use crate::engine::{
    clock_now, enqueue_arrival, finish_process, sleep_ms, spawn_or_mark_failed,
    MLFQ_POLL_GRANULARITY_MS,
};
use crate::history::BurstHistory;
use crate::ingest::Ingester;
use crate::process_table::ProcessTable;
use crate::queues::{Level, Mlfq};
use crate::report::write_report;

enum SliceOutcome {
    Finished(ReapOutcome),
    QuantumExpired,
    Preempted,
}

pub fn run(
    out_path: &Path,
    quanta: [u64; 3],
    boost_ms: u64,
    clock: &Clock,
) -> Result<ProcessTable> {
    let _span = info_span!("mlfq_online", boost_ms).entered();
    let mut table = ProcessTable::new();
    let mut ctrl = ChildController::new();
    let mut ingester = Ingester::new();
    let mut history = BurstHistory::new();
    let mut mlfq = Mlfq::new();
    let mut last_boost = clock_now(clock);

    loop {
        for line in ingester.drain() {
            place_arrival(&mut table, &mut mlfq, &history, line, clock_now(clock), quanta);
        }

        if clock_now(clock).saturating_sub(last_boost) >= boost_ms {
            mlfq.boost();
            for idx in mlfq.q0.iter() {
                table.get_mut(*idx).current_level = Some(0);
            }
            last_boost = clock_now(clock);
            info!("priority boost");
        }

        let Some((level, idx)) = mlfq.pop_highest() else {
            if ingester.is_closed() {
                break;
            }
            for line in ingester.block_until_input() {
                place_arrival(&mut table, &mut mlfq, &history, line, clock_now(clock), quanta);
            }
            continue;
        };

        let completed = run_slice(
            &mut ctrl,
            &mut table,
            idx,
            level,
            quanta,
            clock,
            &mut mlfq,
            &mut ingester,
            &mut history,
        )?;
        if completed {
            write_report(out_path, &table, true);
        }
    }

    Ok(table)
}

fn place_arrival(
    table: &mut ProcessTable,
    mlfq: &mut Mlfq,
    history: &BurstHistory,
    command: String,
    now: u64,
    quanta: [u64; 3],
) -> usize {
    let idx = enqueue_arrival(table, command, now);
    let est = history.mean_last_k(&table.get(idx).command, 0);
    let level: Level = match est {
        Some(est) if est <= quanta[0] as f64 => 0,
        Some(est) if est <= quanta[1] as f64 => 1,
        Some(_) => 2,
        None => 1,
    };
    table.get_mut(idx).current_level = Some(level);
    mlfq.push(level, idx);
    info!(idx, level, "mlfq arrival placed");
    idx
}

/// Run one slice of `idx` at `level`. Returns whether it completed.
#[allow(clippy::too_many_arguments)]
fn run_slice(
    ctrl: &mut ChildController,
    table: &mut ProcessTable,
    idx: usize,
    level: Level,
    quanta: [u64; 3],
    clock: &Clock,
    mlfq: &mut Mlfq,
    ingester: &mut Ingester,
    history: &mut BurstHistory,
) -> Result<bool> {
    let now = clock_now(clock);
    if table.get(idx).started {
        let pid = table
            .get(idx)
            .child_handle
            .expect("started task must have a handle");
        ctrl.cont(pid)?;
    } else {
        spawn_or_mark_failed(ctrl, table, idx, now, true);
        if table.get(idx).finished {
            return Ok(true); // spawn failed, already recorded as an error/completion.
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

    let nominal = quanta[level as usize];
    let est = history.mean_last_k(&table.get(idx).command, 0);
    let slice_limit = match est {
        Some(est) => {
            let remaining = (est - table.get(idx).total_cpu_time as f64).max(0.0) as u64;
            MLFQ_POLL_GRANULARITY_MS.max(remaining.min(nominal))
        }
        None => nominal,
    };

    let slice_start = clock_now(clock);
    let outcome = loop {
        match ctrl.try_reap(pid) {
            ReapOutcome::StillRunning => {
                if clock_now(clock).saturating_sub(slice_start) >= slice_limit {
                    break SliceOutcome::QuantumExpired;
                }
                let mut preempted = false;
                for line in ingester.drain() {
                    let arrival = place_arrival(table, mlfq, history, line, clock_now(clock), quanta);
                    if table.get(arrival).current_level.expect("just placed") < level {
                        preempted = true;
                    }
                }
                if preempted {
                    break SliceOutcome::Preempted;
                }
                sleep_ms(MLFQ_POLL_GRANULARITY_MS);
            }
            terminal => break SliceOutcome::Finished(terminal),
        }
    };

    let slice_ms = clock_now(clock).saturating_sub(slice_start);

    match outcome {
        SliceOutcome::Finished(ReapOutcome::Gone) => {
            let now = clock_now(clock);
            let record = table.get_mut(idx);
            record.add_slice(slice_ms);
            record.mark_finished(now, true);
            Ok(true)
        }
        SliceOutcome::Finished(terminal) => {
            let now = clock_now(clock);
            finish_process(table, idx, now, terminal, slice_ms, Some(history));
            info!(command = %table.get(idx).command, level, "mlfq-online completion");
            Ok(true)
        }
        SliceOutcome::QuantumExpired => {
            ctrl.stop(pid)?;
            table.get_mut(idx).add_slice(slice_ms);
            let next_level = if level < 2 { level + 1 } else { 2 };
            table.get_mut(idx).current_level = Some(next_level);
            mlfq.push(next_level, idx);
            Ok(false)
        }
        SliceOutcome::Preempted => {
            ctrl.stop(pid)?;
            table.get_mut(idx).add_slice(slice_ms);
            // No demotion on a higher-priority preemption.
            mlfq.push(level, idx);
            info!(command = %table.get(idx).command, level, "preempted by higher-priority arrival");
            Ok(false)
        }
    }
}
