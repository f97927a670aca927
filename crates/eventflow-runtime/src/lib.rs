//! Configuration and logging for applications built on EventFlow.
//!
//! | Piece | Built on |
//! |-------|----------|
//! | [`ConfigLoader`]: defaults, files, `EVENTFLOW_*` env, overrides | figment |
//! | [`BrokerConfig::to_options`]: broker options from configuration | eventflow-core |
//! | [`LoggingBuilder`]: the global subscriber | tracing-subscriber, tracing-appender |
//!
//! [`bootstrap`] runs all three in order:
//!
//! ```rust,ignore
//! use eventflow_core::create_event_broker;
//! use eventflow_runtime::{ConfigLoader, bootstrap};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = bootstrap(ConfigLoader::new())?;
//!     let broker = create_event_broker::<AppEvents>(config.broker.to_options());
//!     // ...
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;

use tracing::info;

pub use config::{
    BrokerConfig, ConfigError, ConfigLoader, ConfigResult, EventFlowConfig, LoggingConfig,
    validate_config,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};

/// Loads and validates configuration, then installs the global subscriber.
pub fn bootstrap(loader: ConfigLoader) -> RuntimeResult<EventFlowConfig> {
    let config = loader.load()?;
    validate_config(&config)?;
    LoggingBuilder::from_config(&config.logging).try_init()?;

    info!(
        logger = config.broker.logger,
        max_listeners = config.broker.max_listeners,
        "EventFlow runtime initialized"
    );
    Ok(config)
}
