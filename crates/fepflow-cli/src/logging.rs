use crate::error::Result;
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self},
    prelude::*,
};

fn level_from_flags(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::OFF;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Installs the global tracing subscriber: a compact stderr layer, plus a
/// verbose file layer when `--log-file` was given.
pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<PathBuf>) -> Result<()> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .compact();

    let subscriber = tracing_subscriber::registry()
        .with(level_from_flags(verbosity, quiet))
        .with(stderr_layer);

    match log_file {
        Some(path) => {
            let file = File::create(&path)?;
            let file_layer = fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_thread_ids(true)
                .with_target(true);
            subscriber.with(file_layer).init();
        }
        None => subscriber.init(),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use serial_test::serial;
    use std::sync::Once;
    use tracing::{debug, info, warn};

    static INIT: Once = Once::new();

    fn ensure_global_logger_is_set() {
        INIT.call_once(|| {
            setup_logging(3, false, None).expect("Failed to set up global logger for tests");
        });
    }

    #[test]
    fn quiet_wins_over_any_verbosity() {
        assert_eq!(level_from_flags(3, true), LevelFilter::OFF);
    }

    #[test]
    fn verbosity_steps_through_the_levels() {
        assert_eq!(level_from_flags(0, false), LevelFilter::WARN);
        assert_eq!(level_from_flags(1, false), LevelFilter::INFO);
        assert_eq!(level_from_flags(2, false), LevelFilter::DEBUG);
        assert_eq!(level_from_flags(5, false), LevelFilter::TRACE);
    }

    #[test]
    #[serial]
    fn logging_macros_work_once_installed() {
        ensure_global_logger_is_set();
        warn!("warning from the logging test");
        info!("info from the logging test");
        debug!("debug from the logging test");
    }

    #[test]
    #[serial]
    fn file_layer_captures_messages() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("run.log");

        let file = File::create(&log_path).unwrap();
        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_thread_ids(true);
        let subscriber = tracing_subscriber::registry().with(file_layer);

        tracing::subscriber::with_default(subscriber, || {
            debug!("message for the file layer test");
        });

        let content = std::fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("message for the file layer test"));
        assert!(content.contains("DEBUG"));
    }

    #[test]
    #[serial]
    fn unwritable_log_file_path_propagates_the_error() {
        let invalid_path = PathBuf::from("/");
        if cfg!(unix) && invalid_path.is_dir() {
            let result = setup_logging(0, false, Some(invalid_path));
            assert!(matches!(result, Err(CliError::Io(_))));
        }
    }
}
