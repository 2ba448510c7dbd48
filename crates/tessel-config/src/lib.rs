//! Configuration for the Tessel inference engine and its logging.
//!
//! ```toml
//! [inference]
//! implicit_receivers = ["it"]
//! property_access = true
//! diagnostics = true
//!
//! [logging]
//! level = "info"
//! json = false
//! ```

use std::path::Path;
use std::sync::Once;

use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TesselConfig {
    pub inference: InferenceConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InferenceConfig {
    /// Locals whose members are reachable from a feature call without a receiver.
    pub implicit_receivers: Vec<String>,
    /// `obj.name` may bind to `getName()` / `isName()`, and `obj.name = x` to `setName(x)`.
    pub property_access: bool,
    /// Drain unresolved references and incompatible types into the diagnostic sink.
    pub diagnostics: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            implicit_receivers: vec!["it".to_owned()],
            property_access: true,
            diagnostics: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// A level for the `tessel.*` targets (`info`, `debug`, ...) or a full `EnvFilter`
    /// directive string.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
        }
    }
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    /// Filter directives for `level`, followed by `rust_log`. A bare level applies to the
    /// `tessel.*` targets and leaves everything else at `warn`; anything else is an
    /// `EnvFilter` directive string used as written.
    fn directives(&self, rust_log: Option<&str>) -> String {
        let level = match self.level.trim() {
            "" => Self::default_level(),
            level => level.to_owned(),
        };
        let mut directives = match level.parse::<LevelFilter>() {
            Ok(level) => format!("warn,tessel={level}"),
            Err(_) => level,
        };
        if let Some(extra) = rust_log.map(str::trim).filter(|extra| !extra.is_empty()) {
            directives.push(',');
            directives.push_str(extra);
        }
        directives
    }

    /// The configured filter. Directives from `RUST_LOG` come last, so they win for the
    /// targets they name.
    pub fn env_filter(&self) -> Result<EnvFilter, ConfigError> {
        let rust_log = std::env::var("RUST_LOG").ok();
        let directives = self.directives(rust_log.as_deref());
        EnvFilter::try_new(&directives).map_err(|err| ConfigError::Filter {
            directives,
            message: err.to_string(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
    #[error("invalid log filter `{directives}`: {message}")]
    Filter { directives: String, message: String },
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        ConfigError::Toml(value.message().to_owned())
    }
}

impl TesselConfig {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&text)
    }

    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

static TRACING_INIT: Once = Once::new();

/// Installs the global `tracing` subscriber.
///
/// Safe to call more than once; only the first call installs a subscriber. An invalid filter
/// falls back to `info` for the `tessel.*` targets and is logged once the subscriber is up.
pub fn init_tracing(config: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let (filter, rejected) = match config.env_filter() {
            Ok(filter) => (filter, None),
            Err(err) => (EnvFilter::new("warn,tessel=info"), Some(err)),
        };
        let layer: Box<dyn tracing_subscriber::Layer<_> + Send + Sync> = if config.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .boxed()
        };

        let subscriber = tracing_subscriber::registry().with(filter).with(layer);
        if tracing::subscriber::set_global_default(subscriber).is_ok() {
            tracing::debug!(target: "tessel.config", json = config.json, "tracing initialized");
            if let Some(err) = rejected {
                tracing::warn!(target: "tessel.config", error = %err, "ignoring log filter");
            }
        }
    });
}
