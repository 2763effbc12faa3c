use anyhow::{Context, Result};
use log::LevelFilter;
use log4rs::{
    append::file::FileAppender,
    config::{Appender, Config, Logger, Root},
    encode::pattern::PatternEncoder,
};
use std::path::Path;

/// Routes all `log` output for this process into `log_file`.
///
/// Chatty dependency targets are capped at Warn so that Debug runs stay
/// focused on per-frame export activity.
pub fn setup_file_logging(log_file: &Path, log_level: LevelFilter) -> Result<()> {
    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }

    let file_appender = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} [{l}] {m}{n}",
        )))
        .build(log_file)
        .with_context(|| format!("opening log file {}", log_file.display()))?;

    let config = Config::builder()
        .appender(Appender::builder().build("file", Box::new(file_appender)))
        .logger(Logger::builder().build("ffmpeg_sidecar", LevelFilter::Warn))
        .build(Root::builder().appender("file").build(log_level))?;

    log4rs::init_config(config)?;

    Ok(())
}
