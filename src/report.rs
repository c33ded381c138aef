//! Reporting sink.
//!
//! Hand-formats CSV directly — no `csv` crate, since the record shape is
//! fixed and small. Offline engines call [`write_report`] once at
//! completion; online engines call it after every completion so partial
//! progress is observable on disk.

use std::io::Write;
use std::path::Path;

use tracing::warn;

use crate::error::SchedulerError;
use crate::process_table::ProcessTable;

/// Write the process table to `path` as CSV. `include_total_cpu` adds the
/// `TotalCPU` column used by the online variants.
///
/// Errors are logged and swallowed — a report failure must never abort a
/// discipline's run.
pub fn write_report(path: &Path, table: &ProcessTable, include_total_cpu: bool) {
    if let Err(e) = try_write_report(path, table, include_total_cpu) {
        warn!(error = %e, "failed to write report");
    }
}

fn try_write_report(
    path: &Path,
    table: &ProcessTable,
    include_total_cpu: bool,
) -> Result<(), SchedulerError> {
    let mut file = std::fs::File::create(path).map_err(|source| SchedulerError::Reporting {
        path: path.display().to_string(),
        source,
    })?;

    let mut header = String::from("Command,Finished,Error,CompletionTime,Turnaround,Waiting,Response");
    if include_total_cpu {
        header.push_str(",TotalCPU");
    }
    writeln!(file, "{header}").map_err(|source| SchedulerError::Reporting {
        path: path.display().to_string(),
        source,
    })?;

    for proc in table.iter() {
        let mut line = format!(
            "{},{},{},{},{},{},{}",
            quote_csv(&proc.command),
            yes_no(proc.finished),
            yes_no(proc.error),
            proc.completion_time.unwrap_or(0),
            proc.turnaround_time(),
            proc.waiting_time(),
            proc.response_time(),
        );
        if include_total_cpu {
            line.push(',');
            line.push_str(&proc.total_cpu_time.to_string());
        }
        writeln!(file, "{line}").map_err(|source| SchedulerError::Reporting {
            path: path.display().to_string(),
            source,
        })?;
    }

    Ok(())
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "Yes"
    } else {
        "No"
    }
}

/// Quote a field per RFC 4180: wrap in `"`, doubling any embedded `"`.
fn quote_csv(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process_table::ProcessRecord;

    #[test]
    fn quotes_and_escapes_embedded_quotes() {
        assert_eq!(quote_csv("echo hi"), "\"echo hi\"");
        assert_eq!(quote_csv("echo \"hi\""), "\"echo \"\"hi\"\"\"");
    }

    #[test]
    fn writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut table = ProcessTable::new();
        let mut p = ProcessRecord::new("/bin/echo A", 0);
        p.mark_started(5, 111);
        p.add_slice(10);
        p.mark_finished(20, false);
        table.push(p);

        write_report(&path, &table, false);

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Command,Finished,Error,CompletionTime,Turnaround,Waiting,Response"
        );
        assert_eq!(lines.next().unwrap(), "\"/bin/echo A\",Yes,No,20,20,10,5");
        assert!(lines.next().is_none());
    }

    #[test]
    fn includes_total_cpu_column_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut table = ProcessTable::new();
        let mut p = ProcessRecord::new("/bin/echo A", 0);
        p.mark_started(0, 1);
        p.add_slice(7);
        p.mark_finished(7, false);
        table.push(p);

        write_report(&path, &table, true);
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.lines().next().unwrap().ends_with(",TotalCPU"));
        assert!(contents.lines().nth(1).unwrap().ends_with(",7"));
    }

    #[test]
    fn empty_table_produces_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_report(&path, &ProcessTable::new(), false);
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }

    #[test]
    fn unfinished_process_reports_zero_completion() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut table = ProcessTable::new();
        table.push(ProcessRecord::new("/bin/sleep 5", 0));
        write_report(&path, &table, false);
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents.lines().nth(1).unwrap(),
            "\"/bin/sleep 5\",No,No,0,0,0,0"
        );
    }
}
