//! Tracing subscriber setup.

use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::config::{FileAppenderConfig, LogFormat, LoggerConfig, Rotation};

static FILE_APPENDER_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Default directives applied to third-party crates when only a level is given.
const QUIET_DEPENDENCIES: &[&str] = &["hyper=warn", "reqwest=warn", "opendal=warn", "html5ever=warn"];

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Builds the filter directive string for `config`.
#[must_use]
pub fn filter_directives(config: &LoggerConfig) -> String {
    if let Some(filter) = &config.override_filter {
        return filter.clone();
    }
    let mut directives = vec![config.level.as_str().to_string()];
    directives.extend(QUIET_DEPENDENCIES.iter().map(ToString::to_string));
    directives.join(",")
}

/// Installs the global subscriber. `RUST_LOG` takes precedence over the
/// configured level.
///
/// Calling it again after a subscriber is installed does nothing.
pub fn init(config: &LoggerConfig) {
    if !config.enable {
        return;
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(config)));

    let mut layers: Vec<BoxedLayer> = vec![stdout_layer(config.format)];
    if let Some(appender) = config.file_appender.as_ref().filter(|appender| appender.enable) {
        layers.push(file_layer(appender, config.format));
    }

    let installed = tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init();
    if installed.is_err() {
        tracing::debug!("a tracing subscriber is already installed");
    }
}

fn stdout_layer(format: LogFormat) -> BoxedLayer {
    let layer = fmt::layer().with_target(true);
    match format {
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

fn file_layer(config: &FileAppenderConfig, format: LogFormat) -> BoxedLayer {
    let rotation = match config.rotation {
        Rotation::Minutely => tracing_appender::rolling::Rotation::MINUTELY,
        Rotation::Hourly => tracing_appender::rolling::Rotation::HOURLY,
        Rotation::Daily => tracing_appender::rolling::Rotation::DAILY,
        Rotation::Never => tracing_appender::rolling::Rotation::NEVER,
    };
    let appender = tracing_appender::rolling::RollingFileAppender::new(
        rotation,
        &config.dir,
        &config.filename_prefix,
    );
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = FILE_APPENDER_GUARD.set(guard);
    let layer = fmt::layer().with_ansi(false).with_writer(writer);
    match format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Pretty | LogFormat::Compact => layer.compact().boxed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn level_quiets_dependencies() {
        let config = LoggerConfig {
            level: LogLevel::Debug,
            ..LoggerConfig::default()
        };
        assert_eq!(
            filter_directives(&config),
            "debug,hyper=warn,reqwest=warn,opendal=warn,html5ever=warn"
        );
    }

    #[test]
    fn override_filter_wins() {
        let config = LoggerConfig {
            override_filter: Some("ontoforge=trace".to_string()),
            ..LoggerConfig::default()
        };
        assert_eq!(filter_directives(&config), "ontoforge=trace");
    }
}
