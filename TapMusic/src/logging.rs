use tapconfig::Config;
use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber.
///
/// `RUST_LOG` wins over the configured `host.logger.min_level`. With the
/// console disabled only errors are printed.
pub fn init_logging(config: &Config) {
    let enable_console = config.get_log_enable_console().unwrap_or(true);
    let level = if enable_console {
        config
            .get_log_min_level()
            .unwrap_or_else(|_| "INFO".to_string())
            .to_lowercase()
    } else {
        "error".to_string()
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .try_init();
}
