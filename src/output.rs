//! What the depthframe CLI tells the user.
//!
//! Status lines go to stderr with a right-aligned verb, coloured when stderr
//! is a terminal. Query results, stats and `--json` reports go to stdout as
//! pretty JSON so they can be piped.

use std::io::{self, IsTerminal, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::{FrameError, Result};
use crate::ingest::IngestReport;
use crate::service::Health;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const VERB_WIDTH: usize = 12;

/// How a status line is coloured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Work started or finished.
    Progress,
    /// Informational summary.
    Note,
    /// Something was skipped or altered.
    Warn,
}

impl Tone {
    fn ansi(self) -> &'static str {
        match self {
            Tone::Progress => "\x1b[32m",
            Tone::Note => "\x1b[36m",
            Tone::Warn => "\x1b[33m",
        }
    }
}

/// One status line, before styling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub tone: Tone,
    pub verb: &'static str,
    pub message: String,
    /// Trailing detail shown dimmed, e.g. timings.
    pub detail: Option<String>,
}

impl StatusLine {
    fn new(tone: Tone, verb: &'static str, message: String) -> Self {
        Self {
            tone,
            verb,
            message,
            detail: None,
        }
    }

    fn with_detail(mut self, detail: String) -> Self {
        self.detail = Some(detail);
        self
    }

    fn render(&self, color: bool) -> String {
        let detail = match (&self.detail, color) {
            (Some(d), true) => format!(" {DIM}({d}){RESET}"),
            (Some(d), false) => format!(" ({d})"),
            (None, _) => String::new(),
        };
        let verb = self.verb;
        if color {
            let tone = self.tone.ansi();
            format!("{BOLD}{tone}{verb:>VERB_WIDTH$}{RESET} {}{detail}", self.message)
        } else {
            format!("{verb:>VERB_WIDTH$} {}{detail}", self.message)
        }
    }
}

/// Lines summarising one ingested file.
pub fn ingest_lines(report: &IngestReport) -> Vec<StatusLine> {
    let mut lines = vec![StatusLine::new(
        Tone::Note,
        "Encoded",
        format!(
            "{} in {}",
            plural(report.frames_upserted, "frame", "frames"),
            plural(report.chunks_processed, "chunk", "chunks")
        ),
    )
    .with_detail(format!(
        "{}, {:.0} rows/s",
        seconds(report.duration_seconds),
        report.rows_per_second
    ))];

    if report.rows_failed > 0 {
        lines.push(StatusLine::new(
            Tone::Warn,
            "Skipped",
            format!("{} that could not be processed", plural(report.rows_failed, "row", "rows")),
        ));
    }
    if report.clamped_samples > 0 {
        lines.push(StatusLine::new(
            Tone::Warn,
            "Clamped",
            format!("{} outside 0-255", plural(report.clamped_samples, "sample", "samples")),
        ));
    }
    lines
}

/// One-line description of a store's contents.
pub fn store_line(health: &Health, store: &Path) -> StatusLine {
    let range = match (health.depth_min, health.depth_max) {
        (Some(lo), Some(hi)) => format!("depth {} to {}", lo, hi),
        _ => "empty".to_string(),
    };
    StatusLine::new(
        Tone::Note,
        "Store",
        format!(
            "{} ({}) in {}",
            plural(health.frame_count, "frame", "frames"),
            range,
            display_path(store)
        ),
    )
}

/// Writes CLI output.
pub struct Printer {
    color: bool,
}

impl Printer {
    pub fn new() -> Self {
        Self {
            color: io::stderr().is_terminal(),
        }
    }

    pub fn ingesting(&self, file: &Path) {
        self.emit(&StatusLine::new(Tone::Progress, "Ingesting", display_path(file)));
    }

    pub fn ingest_report(&self, report: &IngestReport) {
        for line in ingest_lines(report) {
            self.emit(&line);
        }
    }

    pub fn ingest_finished(&self, frames: usize, store: &Path) {
        self.emit(&StatusLine::new(
            Tone::Progress,
            "Finished",
            format!("{} into {}", plural(frames, "frame", "frames"), display_path(store)),
        ));
    }

    pub fn no_input(&self) {
        self.emit(&StatusLine::new(Tone::Warn, "Skipped", "no CSV files found".to_string()));
    }

    pub fn missing_frame(&self, depth: f64) {
        self.emit(&StatusLine::new(
            Tone::Warn,
            "Missing",
            format!("no frame at depth {}", depth),
        ));
    }

    pub fn extracted(&self, frames: usize, dir: &Path) {
        self.emit(&StatusLine::new(
            Tone::Progress,
            "Extracted",
            format!("{} to {}", plural(frames, "frame", "frames"), display_path(dir)),
        ));
    }

    pub fn store_summary(&self, health: &Health, store: &Path) {
        self.emit(&store_line(health, store));
    }

    pub fn colormap_rendered(&self, stops: usize, output: &Path) {
        self.emit(&StatusLine::new(
            Tone::Progress,
            "Rendered",
            format!("{} ramp to {}", plural(stops, "stop", "stops"), display_path(output)),
        ));
    }

    /// Pretty JSON on stdout.
    pub fn json<T: Serialize>(&self, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(|e| FrameError::Store {
            message: format!("Failed to serialize output: {}", e),
        })?;
        println!("{}", json);
        Ok(())
    }

    fn emit(&self, line: &StatusLine) {
        let _ = writeln!(io::stderr().lock(), "{}", line.render(self.color));
    }
}

impl Default for Printer {
    fn default() -> Self {
        Self::new()
    }
}

/// Pluralize a count: `plural(1, "frame", "frames")` gives "1 frame".
pub fn plural(n: usize, singular: &str, pluralized: &str) -> String {
    if n == 1 {
        format!("{} {}", n, singular)
    } else {
        format!("{} {}", n, pluralized)
    }
}

/// Elapsed seconds with two decimals: `0.42s`.
pub fn seconds(secs: f64) -> String {
    format!("{:.2}s", secs)
}

/// Path relative to the working directory when it lies inside it.
pub fn display_path(path: &Path) -> String {
    if let Ok(cwd) = std::env::current_dir() {
        if let Ok(relative) = path.strip_prefix(&cwd) {
            let s = relative.display().to_string();
            if s.is_empty() {
                return ".".to_string();
            }
            return s;
        }
    }
    path.display().to_string()
}
