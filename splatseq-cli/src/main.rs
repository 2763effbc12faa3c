//! Main entry point for the splatseq CLI application.
//!
//! Parses arguments, sets up the per-run log file for `generate`, picks a
//! reporter and dispatches to the command handlers.

use splatseq::commands::generate::resolve_output_dir;
use splatseq::error::suggestion_for;
use splatseq::logging::{log_level, start_run_log};
use splatseq::{Commands, parse_cli, run_convert, run_generate, run_info, run_settings};
use splatseq_core::reporting::{JsonReporter, Reporter, ReporterError, TerminalReporter};
use splatseq_core::{CoreResult, Settings};
use std::path::PathBuf;
use std::process;

fn main() {
    let cli_args = parse_cli();
    let level = log_level(cli_args.verbose);

    let reporter: Box<dyn Reporter> = match &cli_args.command {
        Commands::Generate(args) if args.progress_json => Box::new(JsonReporter::new()),
        _ => Box::new(TerminalReporter::new()),
    };

    let result: CoreResult<()> = match &cli_args.command {
        Commands::Info(args) => run_info(args, reporter.as_ref()),
        Commands::Convert(args) => run_convert(args, reporter.as_ref()).map(|_| ()),
        Commands::Settings(args) => run_settings(args, reporter.as_ref()).map(|_| ()),
        Commands::Generate(args) => {
            let log_setup = if args.no_log {
                Ok(None)
            } else {
                let settings = args
                    .settings
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(splatseq::cli::DEFAULT_SETTINGS_FILE));
                let settings = Settings::load(&settings)
                    .map(|loaded| loaded.settings)
                    .unwrap_or_default();
                let log_dir = args
                    .log_dir
                    .clone()
                    .unwrap_or_else(|| resolve_output_dir(args, &settings).join("logs"));
                start_run_log(&log_dir, "generate", level).map(Some)
            };
            log_setup.and_then(|_| run_generate(args, reporter.as_ref()).map(|_| ()))
        }
    };

    if let Err(error) = result {
        log::error!("{error}");
        reporter.error(&ReporterError {
            title: "splatseq failed".to_string(),
            message: error.to_string(),
            context: None,
            suggestion: suggestion_for(&error),
        });
        process::exit(1);
    }
}
