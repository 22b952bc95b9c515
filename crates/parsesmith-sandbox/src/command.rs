//! `CommandRunner`: executes script candidates as child processes.
//!
//! The candidate is written to a fresh temporary file and invoked as
//! `<interpreter> <candidate-file> <document>`. The script prints CSV on
//! stdout, header row first.
//!
//! One deadline covers the whole invocation: waiting for the interpreter and
//! collecting its output. On unix the interpreter leads its own process
//! group, and the group is killed once the interpreter exits or the deadline
//! passes, so background processes never outlive the attempt.

use std::io::{Read, Write};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use parsesmith_contracts::{
    candidate::ProgramDialect,
    execution::CapturedFailure,
    table::{CellValue, Column, ColumnKind, TabularResult},
};
use parsesmith_core::traits::{Execution, SandboxRunner};

use crate::runner::DEFAULT_EXECUTION_TIMEOUT;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Extra time to read pipes that close right at the deadline.
const DRAIN_GRACE: Duration = Duration::from_millis(100);

/// Stderr kept in a failure message, in bytes from the end.
const STDERR_TAIL: usize = 2000;

/// Runs candidates through an external interpreter.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    interpreter: String,
    extension: String,
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(interpreter: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
            extension: extension.into(),
            timeout: DEFAULT_EXECUTION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn dialect_name(&self) -> String {
        Path::new(&self.interpreter)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("script")
            .to_string()
    }

    fn spawn(&self, script: &Path, sample: &Path) -> Result<Child, CapturedFailure> {
        let mut command = Command::new(&self.interpreter);
        command
            .arg(script)
            .arg(sample)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        command.spawn().map_err(|e| {
            CapturedFailure::new(format!("failed to start '{}': {}", self.interpreter, e))
        })
    }

    /// Poll the child until it exits (`Some`) or `deadline` passes (`None`).
    fn wait_until(
        &self,
        child: &mut Child,
        deadline: Instant,
    ) -> Result<Option<ExitStatus>, CapturedFailure> {
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(Some(status)),
                Ok(None) if Instant::now() >= deadline => return Ok(None),
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    return Err(CapturedFailure::new(format!(
                        "failed to wait for candidate: {e}"
                    )))
                }
            }
        }
    }

    fn timed_out(&self, detail: &str) -> CapturedFailure {
        warn!(
            interpreter = %self.interpreter,
            timeout_secs = self.timeout.as_secs_f64(),
            detail,
            "candidate stopped after timeout"
        );
        CapturedFailure::new(format!(
            "execution timed out after {:.1}s ({detail})",
            self.timeout.as_secs_f64()
        ))
    }
}

impl SandboxRunner for CommandRunner {
    fn dialect(&self) -> ProgramDialect {
        ProgramDialect {
            name: self.dialect_name(),
            extension: self.extension.clone(),
            instructions: format!(
                "Write a complete {name} program. It is run as `{interp} <program file> <document path>`.\n\
                 The document may be a PDF; extract its text yourself.\n\
                 Print the result to stdout as CSV: one header row with exactly the schema columns, \
                 then one line per data row. Leave a field empty when the value is absent.\n\
                 Print nothing else to stdout. Exit with a non-zero status on failure.",
                name = self.dialect_name(),
                interp = self.interpreter,
            ),
        }
    }

    fn execute(&self, source: &str, sample: &Path) -> Execution {
        let mut script = tempfile::Builder::new()
            .prefix("candidate-")
            .suffix(&format!(".{}", self.extension))
            .tempfile()
            .map_err(|e| CapturedFailure::new(format!("failed to create candidate file: {e}")))?;
        script
            .write_all(source.as_bytes())
            .and_then(|_| script.flush())
            .map_err(|e| CapturedFailure::new(format!("failed to write candidate file: {e}")))?;

        debug!(
            interpreter = %self.interpreter,
            script = %script.path().display(),
            sample = %sample.display(),
            "spawning candidate"
        );
        let deadline = Instant::now() + self.timeout;
        let mut child = self.spawn(script.path(), sample)?;

        // Drain both pipes concurrently so a chatty child cannot block on a full pipe.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let waited = self.wait_until(&mut child, deadline);
        kill_group(&mut child);
        let status = match waited {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.wait();
                return Err(self.timed_out("process killed"));
            }
            Err(failure) => {
                let _ = child.wait();
                return Err(failure);
            }
        };

        let (Some(stdout), Some(stderr)) = (collect(&stdout, deadline), collect(&stderr, deadline))
        else {
            return Err(self.timed_out("output pipe held open after exit"));
        };

        if !status.success() {
            return Err(CapturedFailure::new(format!(
                "candidate exited with {}: {}",
                status,
                tail(stderr.trim(), STDERR_TAIL)
            )));
        }
        if stdout.trim().is_empty() {
            return Err(CapturedFailure::new("candidate produced no output"));
        }

        text_table_from_csv(&stdout)
            .map_err(|e| CapturedFailure::new(format!("candidate output is not valid CSV: {e}")))
    }
}

/// Kill every process left in the candidate's group.
#[cfg(unix)]
fn kill_group(child: &mut Child) {
    let Ok(pgid) = libc::pid_t::try_from(child.id()) else {
        let _ = child.kill();
        return;
    };
    // SAFETY: killpg takes plain integers and touches no memory. The child
    // was spawned with `process_group(0)`, so its pid is its group id.
    unsafe {
        libc::killpg(pgid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(child: &mut Child) {
    let _ = child.kill();
}

/// Read `pipe` to the end on a helper thread; the text arrives on the channel.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    match pipe {
        Some(mut p) => {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = p.read_to_end(&mut buf);
                let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
            });
        }
        None => {
            let _ = tx.send(String::new());
        }
    }
    rx
}

/// The drained text, or `None` when the pipe is still open at `deadline`.
fn collect(rx: &Receiver<String>, deadline: Instant) -> Option<String> {
    let wait = deadline
        .saturating_duration_since(Instant::now())
        .max(DRAIN_GRACE);
    match rx.recv_timeout(wait) {
        Ok(text) => Some(text),
        Err(RecvTimeoutError::Disconnected) => Some(String::new()),
        Err(RecvTimeoutError::Timeout) => None,
    }
}

fn tail(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut start = s.len() - max_bytes;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

/// Read CSV text into an all-text table. The validator coerces each cell to
/// the reference column's kind.
fn text_table_from_csv(input: &str) -> Result<TabularResult, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(input.as_bytes());

    let columns: Vec<Column> = reader
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .map(|name| Column::new(name, ColumnKind::Text))
        .collect();

    let mut table = TabularResult::new(columns);
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| format!("row {i}: {e}"))?;
        let row = record
            .iter()
            .map(|raw| CellValue::parse(raw, ColumnKind::Text).unwrap_or(CellValue::Empty))
            .collect();
        table.push_row(row).map_err(|e| e.to_string())?;
    }
    Ok(table)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh() -> CommandRunner {
        CommandRunner::new("sh", "sh").with_timeout(Duration::from_secs(5))
    }

    fn sample() -> tempfile::NamedTempFile {
        tempfile::NamedTempFile::new().unwrap()
    }

    #[test]
    fn csv_stdout_becomes_text_table() {
        let file = sample();
        let script = "printf 'Date,Amount\\n05-01-2024,\"1,000.00\"\\n06-01-2024,\\n'";
        let table = sh().execute(script, file.path()).unwrap();

        assert_eq!(table.column_names(), vec!["Date", "Amount"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.get(0, "Amount"), Some(&CellValue::Text("1,000.00".into())));
        assert_eq!(table.get(1, "Amount"), Some(&CellValue::Empty));
    }

    #[test]
    fn script_receives_document_path() {
        let file = sample();
        std::fs::write(file.path(), "x,y\n1,2\n").unwrap();
        let table = sh().execute("cat \"$1\"", file.path()).unwrap();
        assert_eq!(table.get(0, "y"), Some(&CellValue::Text("2".into())));
    }

    #[test]
    fn non_zero_exit_is_captured_with_stderr() {
        let file = sample();
        let failure = sh()
            .execute("echo 'IndexError: list index out of range' >&2; exit 3", file.path())
            .unwrap_err();
        assert!(failure.message.contains("IndexError"), "{failure}");
    }

    #[test]
    fn empty_output_is_captured() {
        let file = sample();
        let failure = sh().execute("true", file.path()).unwrap_err();
        assert_eq!(failure.message, "candidate produced no output");
    }

    #[test]
    fn ragged_csv_is_captured() {
        let file = sample();
        let failure = sh()
            .execute("printf 'a,b\\n1\\n'", file.path())
            .unwrap_err();
        assert!(failure.message.contains("not valid CSV"), "{failure}");
    }

    #[test]
    fn runaway_process_is_killed() {
        let file = sample();
        let started = Instant::now();
        let failure = sh()
            .with_timeout(Duration::from_millis(200))
            .execute("sleep 10", file.path())
            .unwrap_err();
        assert!(failure.message.contains("timed out"), "{failure}");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn background_process_does_not_hold_the_run_open() {
        let file = sample();
        let started = Instant::now();
        let table = sh()
            .with_timeout(Duration::from_secs(1))
            .execute("sleep 6 &\nprintf 'a,b\\n1,2\\n'\n", file.path())
            .unwrap();

        assert_eq!(table.get(0, "b"), Some(&CellValue::Text("2".into())));
        assert!(started.elapsed() < Duration::from_secs(3), "{:?}", started.elapsed());
    }

    #[test]
    fn timeout_kills_background_processes_too() {
        let file = sample();
        let marker = format!("{}.late", file.path().display());
        let script = "sh -c 'sleep 1; touch \"$1.late\"' _ \"$1\" &\nsleep 10\n";

        let started = Instant::now();
        let failure = sh()
            .with_timeout(Duration::from_millis(200))
            .execute(script, file.path())
            .unwrap_err();
        assert!(failure.message.contains("timed out"), "{failure}");
        assert!(started.elapsed() < Duration::from_secs(3));

        std::thread::sleep(Duration::from_millis(1500));
        assert!(!Path::new(&marker).exists(), "background process survived the timeout");
    }

    #[test]
    fn dialect_is_named_after_interpreter() {
        let d = CommandRunner::new("/usr/bin/python3", "py").dialect();
        assert_eq!(d.name, "python3");
        assert_eq!(d.extension, "py");
        assert!(d.instructions.contains("CSV"));
    }

    #[test]
    fn tail_respects_char_boundaries() {
        assert_eq!(tail("abc", 10), "abc");
        assert_eq!(tail("₹₹", 4), "₹");
    }
}
