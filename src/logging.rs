//! Tracing subscriber setup shared by the binaries

use crate::config::LoggingConfig;
use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Initialize logging.
///
/// `RUST_LOG` takes precedence; otherwise the configured level applies to
/// this crate and `default_directive` to the binary.
pub fn init(config: &LoggingConfig, default_directive: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(&config.level)
            .add_directive(format!("claim_fraud_worker={}", config.level).parse()?)
            .add_directive(default_directive.parse()?),
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match config.format.as_str() {
        "json" => builder.json().try_init(),
        _ => builder.compact().try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}
