use crate::models::config::LoggingConfig;
use tracing::Level;

/// Install the global tracing subscriber.
///
/// Returns false when a subscriber was already installed, which is harmless
/// (tests and embedders may set their own).
pub fn init(config: &LoggingConfig) -> bool {
    let level = config.level.parse::<Level>().unwrap_or(Level::INFO);

    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.is_ok()
}
