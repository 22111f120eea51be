use std::cell::RefCell;
use std::io::{self, Write};
use std::time::Instant;

/// Sink for the diagnostics the extraction and injection code emits.
///
/// Callers pick the sink; the core never logs to global state.
pub trait Diagnostics {
    fn info(&self, msg: &str);
    fn debug(&self, msg: &str);
    fn error(&self, msg: &str);
    fn progress(&self, _label: &str, _current: usize, _total: usize) {}
}

pub struct ConsoleProgress {
    enabled: bool,
    verbose: bool,
    t0: Instant,
}

impl ConsoleProgress {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            verbose: false,
            t0: Instant::now(),
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn line(&self, level: &str, msg: &str) {
        let ts = fmt_elapsed(self.t0.elapsed().as_secs_f64());
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "[{ts}] {level} {msg}");
    }
}

impl Diagnostics for ConsoleProgress {
    fn info(&self, msg: &str) {
        if self.enabled {
            self.line("INFO ", msg);
        }
    }

    fn debug(&self, msg: &str) {
        if self.enabled && self.verbose {
            self.line("DEBUG", msg);
        }
    }

    // Errors are printed even when progress output is disabled.
    fn error(&self, msg: &str) {
        self.line("ERROR", msg);
    }

    fn progress(&self, label: &str, current: usize, total: usize) {
        if !self.enabled {
            return;
        }
        let total = total.max(1);
        let current = current.min(total);
        let pct = (current as f64 / total as f64) * 100.0;
        let ts = fmt_elapsed(self.t0.elapsed().as_secs_f64());
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "[{ts}] {label} {current}/{total} ({pct:5.1}%)");
    }
}

/// Keeps every message in memory, prefixed with its level.
#[derive(Default)]
pub struct MemoryDiagnostics {
    lines: RefCell<Vec<String>>,
}

impl MemoryDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.borrow().iter().any(|l| l.contains(needle))
    }

    fn push(&self, level: &str, msg: &str) {
        self.lines.borrow_mut().push(format!("{level}: {msg}"));
    }
}

impl Diagnostics for MemoryDiagnostics {
    fn info(&self, msg: &str) {
        self.push("info", msg);
    }

    fn debug(&self, msg: &str) {
        self.push("debug", msg);
    }

    fn error(&self, msg: &str) {
        self.push("error", msg);
    }
}

pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    fn info(&self, _msg: &str) {}
    fn debug(&self, _msg: &str) {}
    fn error(&self, _msg: &str) {}
}

fn fmt_elapsed(seconds: f64) -> String {
    let seconds = seconds.max(0.0) as u64;
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    if h > 0 {
        format!("{h:02}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::{fmt_elapsed, Diagnostics, MemoryDiagnostics};

    #[test]
    fn elapsed_format() {
        assert_eq!(fmt_elapsed(65.4), "01:05");
        assert_eq!(fmt_elapsed(3725.0), "01:02:05");
        assert_eq!(fmt_elapsed(-3.0), "00:00");
    }

    #[test]
    fn memory_sink_records_levels() {
        let diag = MemoryDiagnostics::new();
        diag.debug("found 2 switch elements");
        diag.error("boom");
        assert_eq!(diag.lines(), vec!["debug: found 2 switch elements", "error: boom"]);
        assert!(diag.contains("boom"));
    }
}
