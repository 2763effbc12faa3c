//! User-facing progress reporting.
//!
//! The exporter and the command-line front end talk to a [`Reporter`]
//! instead of printing directly. [`TerminalReporter`] renders for people,
//! [`JsonReporter`] emits one JSON object per line for wrapping tools.

use crate::ply::ConversionSummary;
use crate::utils::format_bytes;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::io::{self, Write};
use std::sync::Mutex;
use std::time::Duration;

/// Source video and camera model, shown before a run starts.
#[derive(Clone, Debug)]
pub struct VideoSummary {
    pub input_file: String,
    pub resolution: String,
    pub frame_count: u64,
    pub fps: f64,
    pub duration: String,
    pub focal_length_px: f64,
    /// Where the focal length came from (`--focal`, estimated from FOV, ...).
    pub focal_source: String,
}

#[derive(Clone, Debug)]
pub struct SessionStart {
    pub session_dir: String,
    pub start: u64,
    pub end: u64,
    pub processing_resolution: u32,
    pub predictor: String,
    pub downconvert: bool,
}

/// Emitted after every frame, successful or not.
#[derive(Clone, Debug)]
pub struct FrameOutcome {
    pub index: u64,
    /// 1-based position within the requested range.
    pub position: u64,
    pub total: u64,
    pub success: bool,
    pub message: String,
}

/// High-level warning/error message.
#[derive(Clone, Debug)]
pub struct ReporterError {
    pub title: String,
    pub message: String,
    pub context: Option<String>,
    pub suggestion: Option<String>,
}

#[derive(Clone, Debug)]
pub struct SessionSummary {
    pub session_dir: String,
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<(u64, String)>,
    pub bytes_written: u64,
    pub elapsed: Duration,
    pub cancelled: bool,
}

/// Reporter interface implemented by both human-readable and JSON reporters.
pub trait Reporter: Send + Sync {
    fn video_summary(&self, _summary: &VideoSummary) {}
    fn session_started(&self, _start: &SessionStart) {}
    fn frame_complete(&self, _outcome: &FrameOutcome) {}
    fn warning(&self, _message: &str) {}
    fn error(&self, _error: &ReporterError) {}
    fn session_complete(&self, _summary: &SessionSummary) {}
    fn conversion_complete(&self, _summary: &ConversionSummary) {}
}

/// No-op reporter that discards all updates.
pub struct NullReporter;

impl Reporter for NullReporter {}

/// Human-friendly reporter that prints concise text output.
pub struct TerminalReporter {
    progress: Mutex<Option<ProgressBar>>,
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalReporter {
    pub fn new() -> Self {
        Self {
            progress: Mutex::new(None),
        }
    }

    fn finish_progress(&self) {
        if let Ok(mut guard) = self.progress.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }

    /// Prints a line above the progress bar, or plainly when there is none.
    fn println(&self, line: String) {
        match self.progress.lock() {
            Ok(guard) if guard.is_some() => {
                if let Some(pb) = guard.as_ref() {
                    pb.println(line);
                }
            }
            _ => println!("{line}"),
        }
    }
}

impl Reporter for TerminalReporter {
    fn video_summary(&self, summary: &VideoSummary) {
        println!("\n{}", style("VIDEO").bold().cyan());
        println!("  {:<12} {}", style("File:").bold(), summary.input_file);
        println!("  {:<12} {}", style("Resolution:").bold(), summary.resolution);
        println!(
            "  {:<12} {} at {:.2} fps ({})",
            style("Frames:").bold(),
            summary.frame_count,
            summary.fps,
            summary.duration
        );
        println!(
            "  {:<12} {:.2}px ({})",
            style("Focal:").bold(),
            summary.focal_length_px,
            summary.focal_source
        );
    }

    fn session_started(&self, start: &SessionStart) {
        self.finish_progress();
        println!("\n{}", style("EXPORT").bold().cyan());
        println!("  {:<12} {}", style("Output:").bold(), start.session_dir);
        println!(
            "  {:<12} {}..={}",
            style("Frames:").bold(),
            start.start,
            start.end
        );
        println!(
            "  {:<12} {} at {}x{}",
            style("Predictor:").bold(),
            start.predictor,
            start.processing_resolution,
            start.processing_resolution
        );
        println!(
            "  {:<12} {}",
            style("Format:").bold(),
            if start.downconvert {
                "standard (vertex only)"
            } else {
                "extended"
            }
        );

        let total = start.end - start.start + 1;
        let pb = ProgressBar::new(total);
        let bar_style = ProgressStyle::default_bar()
            .template("Exporting [{bar:40}] {pos}/{len} | {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        pb.set_style(bar_style);
        pb.enable_steady_tick(Duration::from_millis(120));
        if let Ok(mut guard) = self.progress.lock() {
            *guard = Some(pb);
        }
    }

    fn frame_complete(&self, outcome: &FrameOutcome) {
        if let Ok(guard) = self.progress.lock() {
            if let Some(pb) = guard.as_ref() {
                pb.set_position(outcome.position);
                pb.set_message(format!("frame {}", outcome.index));
                if !outcome.success {
                    pb.println(format!(
                        "  {} frame {}: {}",
                        style("✗").red().bold(),
                        outcome.index,
                        outcome.message
                    ));
                }
                return;
            }
        }
        if !outcome.success {
            eprintln!("  frame {} failed: {}", outcome.index, outcome.message);
        }
    }

    fn warning(&self, message: &str) {
        self.println(format!(
            "{}",
            style(format!("WARN: {message}")).yellow().bold()
        ));
    }

    fn error(&self, error: &ReporterError) {
        self.finish_progress();
        eprintln!(
            "\n{} {}",
            style("ERROR").red().bold(),
            style(&error.title).red().bold()
        );
        eprintln!("  {}", error.message);
        if let Some(ctx) = &error.context {
            eprintln!("  Context: {ctx}");
        }
        if let Some(suggestion) = &error.suggestion {
            eprintln!("  Suggestion: {suggestion}");
        }
    }

    fn session_complete(&self, summary: &SessionSummary) {
        self.finish_progress();
        println!("\n{}", style("RESULTS").bold().cyan());
        let counts = format!(
            "{} of {} frames exported",
            summary.succeeded, summary.attempted
        );
        if summary.failures.is_empty() {
            println!("  {}", style(counts).green().bold());
        } else {
            println!("  {}", style(counts).yellow().bold());
            for (index, message) in &summary.failures {
                println!("  - frame {index}: {message}");
            }
        }
        if summary.cancelled {
            println!("  {}", style("Cancelled before the end of the range").yellow());
        }
        println!(
            "  Written: {} in {}",
            format_bytes(summary.bytes_written),
            format_elapsed(&summary.elapsed)
        );
        println!(
            "  {} {}",
            style("Saved to").bold(),
            style(&summary.session_dir).green()
        );
    }

    fn conversion_complete(&self, summary: &ConversionSummary) {
        println!(
            "{} {}",
            style("✓").green().bold(),
            style(summary.destination.display()).bold()
        );
        println!("  File size: {}", format_bytes(summary.bytes_written));
        println!("  Number of Gaussian elements: {}", summary.vertex_count);
    }
}

/// Line-delimited JSON reporter for machine consumers.
pub struct JsonReporter {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonReporter {
    pub fn new() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Seconds since the UNIX epoch.
    fn timestamp() -> i64 {
        chrono::Utc::now().timestamp()
    }

    fn write_value(&self, value: serde_json::Value) {
        if let Ok(mut writer) = self.writer.lock() {
            // Reporting must never fail the run.
            let _ = writeln!(writer, "{value}");
            let _ = writer.flush();
        }
    }
}

impl Reporter for JsonReporter {
    fn video_summary(&self, summary: &VideoSummary) {
        self.write_value(json!({
            "type": "video_summary",
            "input_file": summary.input_file,
            "resolution": summary.resolution,
            "frame_count": summary.frame_count,
            "fps": summary.fps,
            "duration": summary.duration,
            "focal_length_px": summary.focal_length_px,
            "focal_source": summary.focal_source,
            "timestamp": Self::timestamp(),
        }));
    }

    fn session_started(&self, start: &SessionStart) {
        self.write_value(json!({
            "type": "session_started",
            "session_dir": start.session_dir,
            "start": start.start,
            "end": start.end,
            "processing_resolution": start.processing_resolution,
            "predictor": start.predictor,
            "downconvert": start.downconvert,
            "timestamp": Self::timestamp(),
        }));
    }

    fn frame_complete(&self, outcome: &FrameOutcome) {
        self.write_value(json!({
            "type": "frame_complete",
            "index": outcome.index,
            "position": outcome.position,
            "total": outcome.total,
            "success": outcome.success,
            "message": outcome.message,
            "timestamp": Self::timestamp(),
        }));
    }

    fn warning(&self, message: &str) {
        self.write_value(json!({
            "type": "warning",
            "message": message,
            "timestamp": Self::timestamp(),
        }));
    }

    fn error(&self, error: &ReporterError) {
        self.write_value(json!({
            "type": "error",
            "title": error.title,
            "message": error.message,
            "context": error.context,
            "suggestion": error.suggestion,
            "timestamp": Self::timestamp(),
        }));
    }

    fn session_complete(&self, summary: &SessionSummary) {
        let failures: Vec<_> = summary
            .failures
            .iter()
            .map(|(index, message)| json!({ "index": index, "message": message }))
            .collect();
        self.write_value(json!({
            "type": "session_complete",
            "session_dir": summary.session_dir,
            "attempted": summary.attempted,
            "succeeded": summary.succeeded,
            "failures": failures,
            "bytes_written": summary.bytes_written,
            "elapsed_seconds": summary.elapsed.as_secs_f64(),
            "cancelled": summary.cancelled,
            "timestamp": Self::timestamp(),
        }));
    }

    fn conversion_complete(&self, summary: &ConversionSummary) {
        self.write_value(json!({
            "type": "conversion_complete",
            "source": summary.source.display().to_string(),
            "destination": summary.destination.display().to_string(),
            "vertex_count": summary.vertex_count,
            "bytes_written": summary.bytes_written,
            "dropped_elements": summary.dropped_elements,
            "timestamp": Self::timestamp(),
        }));
    }
}

fn format_elapsed(duration: &Duration) -> String {
    let secs = duration.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}
