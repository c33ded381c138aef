//! Child controller: spawn-suspended, continue, stop, non-blocking reap.
//!
//! Every spawn uses the self-stop-then-exec idiom: the child places itself
//! in its own process group and raises `SIGSTOP` on itself *before* `exec`,
//! so the same code path is correct for both offline and online modes and
//! no child can run before the scheduler observes and continues it.
//!
//! This is implemented with a raw `fork`/`execvp`, not
//! `std::process::Command`: `Command::spawn` keeps an exec-status pipe open
//! in the child until it reaches `exec` (so the parent can report `exec`
//! failures), and a child that stops itself before `exec` would never close
//! that pipe — the parent's `spawn()` would block forever waiting for it.
//! Forking directly avoids that pipe entirely. Only async-signal-safe calls
//! (`setsid`, `kill`, `execvp`) run in the child between `fork` and `exec`.

use std::collections::HashSet;
use std::ffi::CString;

use tracing::{debug, warn};

use crate::error::SchedulerError;

/// Outcome of a non-blocking reap attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReapOutcome {
    Exited(i32),
    Signaled,
    StillRunning,
    /// Already reaped, or no such child was ever tracked.
    Gone,
}

/// Tracks which PIDs this scheduler has spawned and is responsible for
/// signalling and reaping.
#[derive(Default)]
pub struct ChildController {
    known: HashSet<u32>,
}

impl ChildController {
    pub fn new() -> Self {
        ChildController {
            known: HashSet::new(),
        }
    }

    /// Spawn `argv` suspended: the child stops itself before `exec`, so it
    /// performs no work until the first [`ChildController::cont`].
    pub fn spawn_suspended(&mut self, argv: &[String]) -> Result<u32, SchedulerError> {
        let command_line = argv.join(" ");
        if argv.is_empty() || argv[0].is_empty() {
            return Err(SchedulerError::EmptyCommand);
        }

        let c_args: Vec<CString> = argv
            .iter()
            .map(|s| CString::new(s.as_bytes()).unwrap_or_default())
            .collect();
        let mut c_argv: Vec<*const libc::c_char> = c_args.iter().map(|s| s.as_ptr()).collect();
        c_argv.push(std::ptr::null());

        // SAFETY: single-threaded scheduler; only async-signal-safe libc
        // calls run in the child between fork and exec.
        let pid = unsafe { libc::fork() };
        if pid < 0 {
            return Err(SchedulerError::Spawn {
                command: command_line,
                source: std::io::Error::last_os_error(),
            });
        }
        if pid == 0 {
            // Child: new process group, self-stop, then exec.
            unsafe {
                libc::setsid();
                libc::kill(libc::getpid(), libc::SIGSTOP);
                libc::execvp(c_argv[0], c_argv.as_ptr());
                // execvp only returns on failure.
                libc::_exit(127);
            }
        }

        let pid = pid as u32;
        debug!(pid, command = %command_line, "spawned suspended");
        self.known.insert(pid);
        Ok(pid)
    }

    /// Resume a stopped child, delivered to its process group.
    pub fn cont(&self, pid: u32) -> Result<(), SchedulerError> {
        self.signal_group(pid, libc::SIGCONT)
    }

    /// Suspend a running child, delivered to its process group.
    pub fn stop(&self, pid: u32) -> Result<(), SchedulerError> {
        self.signal_group(pid, libc::SIGSTOP)
    }

    fn signal_group(&self, pid: u32, signal: libc::c_int) -> Result<(), SchedulerError> {
        // Negative PID targets the whole process group (setsid'd at spawn),
        // so shell-invoked grandchildren are reached too.
        let ret = unsafe { libc::kill(-(pid as libc::pid_t), signal) };
        if ret != 0 {
            let err = std::io::Error::last_os_error();
            // ESRCH: the group is already gone — proceed as if delivered;
            // signalling an already-exited process is not an error here.
            if err.raw_os_error() != Some(libc::ESRCH) {
                return Err(SchedulerError::Signal {
                    pid: pid as i32,
                    source: err,
                });
            }
        }
        Ok(())
    }

    /// Non-blocking status check. `Gone` covers both "already reaped" and
    /// "no such child was ever tracked".
    pub fn try_reap(&mut self, pid: u32) -> ReapOutcome {
        if !self.known.contains(&pid) {
            return ReapOutcome::Gone;
        }

        let mut status: libc::c_int = 0;
        // SAFETY: pid is a PID this controller forked and has not yet reaped.
        let ret = unsafe { libc::waitpid(pid as libc::pid_t, &mut status, libc::WNOHANG) };

        if ret == 0 {
            return ReapOutcome::StillRunning;
        }
        if ret == pid as libc::pid_t {
            self.known.remove(&pid);
            if libc::WIFEXITED(status) {
                return ReapOutcome::Exited(libc::WEXITSTATUS(status));
            }
            if libc::WIFSIGNALED(status) {
                warn!(pid, signal = libc::WTERMSIG(status), "child terminated by signal");
                return ReapOutcome::Signaled;
            }
            // WIFSTOPPED/WIFCONTINUED can't appear here since WNOHANG was
            // passed without WUNTRACED/WCONTINUED; treat defensively.
            return ReapOutcome::StillRunning;
        }

        // ret == -1: typically ECHILD (already reaped elsewhere, or raced).
        warn!(pid, "waitpid failed, treating child as gone");
        self.known.remove(&pid);
        ReapOutcome::Gone
    }
}
