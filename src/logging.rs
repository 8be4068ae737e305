use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "ANNOTATION_FINDER_LOG";

/// Installs the stderr subscriber. `ANNOTATION_FINDER_LOG` takes precedence;
/// otherwise `verbose` picks the level (0 = warn, 1 = debug, 2+ = trace).
pub fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
