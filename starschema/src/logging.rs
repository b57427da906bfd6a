use common::config::LoggingConfig;
use common::{Error, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

/// Installs the global subscriber. `RUST_LOG` takes precedence over `logging.level`.
pub fn init_subscriber(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let installed = if config.json {
        let subscriber = Registry::default().with(filter).with(fmt::layer().json());
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = Registry::default().with(filter).with(fmt::layer().with_target(false));
        tracing::subscriber::set_global_default(subscriber)
    };

    installed.map_err(|e| Error::Other(format!("Failed to set global default subscriber: {}", e)))
}
