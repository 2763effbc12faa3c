//! Utility functions for formatting and file naming.
//!
//! General-purpose helpers used throughout splatseq-core: human-readable
//! durations and byte counts, run timestamps, video extension checks and the
//! deterministic per-frame output file names.

use std::path::Path;

/// Container extensions accepted as video input (compared case-insensitively).
pub const SUPPORTED_VIDEO_EXTENSIONS: &[&str] =
    &["mp4", "avi", "mov", "mkv", "webm", "m4v", "flv", "wmv"];

/// Checks whether the path carries a supported video container extension.
#[must_use]
pub fn is_supported_video(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_VIDEO_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// Formats seconds as `12.3s`, `4m 5.0s` or `1h 2m 3.0s`. Returns "??" for invalid inputs.
#[must_use]
pub fn format_duration(seconds: f64) -> String {
    if seconds < 0.0 || !seconds.is_finite() {
        return "??".to_string();
    }

    if seconds < 60.0 {
        format!("{seconds:.1}s")
    } else if seconds < 3600.0 {
        let minutes = (seconds / 60.0).floor() as u64;
        let secs = seconds % 60.0;
        format!("{minutes}m {secs:.1}s")
    } else {
        let hours = (seconds / 3600.0).floor() as u64;
        let minutes = ((seconds % 3600.0) / 60.0).floor() as u64;
        let secs = seconds % 60.0;
        format!("{hours}h {minutes}m {secs:.1}s")
    }
}

/// Formats bytes with appropriate binary units (B, KiB, MiB, GiB).
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;

    let bytes_f64 = bytes as f64;
    if bytes_f64 >= GIB {
        format!("{:.2} GiB", bytes_f64 / GIB)
    } else if bytes_f64 >= MIB {
        format!("{:.2} MiB", bytes_f64 / MIB)
    } else if bytes_f64 >= KIB {
        format!("{:.2} KiB", bytes_f64 / KIB)
    } else {
        format!("{bytes} B")
    }
}

/// Returns the current local timestamp formatted as "YYYYMMDD_HHMMSS".
///
/// Used for session directory names and log file names.
#[must_use]
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// File name of the extended PLY written for a frame, e.g. `frame_000042.ply`.
#[must_use]
pub fn extended_frame_filename(index: u64) -> String {
    format!("frame_{index:06}.ply")
}

/// File name of the standard PLY written for a frame, e.g. `frame_000042_standard.ply`.
#[must_use]
pub fn standard_frame_filename(index: u64) -> String {
    format!("frame_{index:06}_standard.ply")
}

/// Default output path for a converted file: `<stem>_standard.ply` next to the input.
#[must_use]
pub fn default_standard_path(input: &Path) -> std::path::PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{stem}_standard.ply"))
}
