use std::sync::Once;

/// Filter used when neither the config nor `RUST_LOG` names one.
const DEFAULT_FILTER: &str = "info";

/// Logger configuration.
///
/// The engine logs under the `reproj_engine` target:
/// - `error`: a mesh calculation or buffer upload failed; the mesh is invalid.
/// - `warn`: a projection could not be probed for wrap checking.
/// - `debug`: mesh state changes, cache entries created or evicted, cancelled
///   calculation jobs.
/// - `trace`: every antimeridian correction, and the triangles it skips.
///
/// `env_filter` takes `env_logger` syntax, e.g. `"info,reproj_engine=debug"`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

impl LoggingConfig {
    /// Config with an explicit filter, overriding `RUST_LOG`.
    pub fn with_filter(filter: impl Into<String>) -> Self {
        Self {
            env_filter: Some(filter.into()),
            ..Self::default()
        }
    }

    /// The explicit filter, else `rust_log`, else `info`.
    fn resolve_filter(&self, rust_log: Option<String>) -> String {
        self.env_filter
            .clone()
            .or(rust_log)
            .unwrap_or_else(|| DEFAULT_FILTER.to_string())
    }
}

static INIT: Once = Once::new();

/// Installs `env_logger` as the global logger, once per process.
///
/// Later calls are ignored, so every test harness may call this. A logger
/// already installed by the host application is kept.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = config.resolve_filter(std::env::var("RUST_LOG").ok());

        let mut builder = env_logger::Builder::new();
        builder.parse_filters(&filter);
        builder.write_style(config.write_style);

        if builder.try_init().is_err() {
            log::debug!("global logger already installed; keeping it");
            return;
        }

        log::debug!("logging initialized with filter '{filter}'");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_filter_wins_over_rust_log() {
        let config = LoggingConfig::with_filter("reproj_engine=trace");
        assert_eq!(config.resolve_filter(Some("warn".into())), "reproj_engine=trace");
    }

    #[test]
    fn rust_log_then_info() {
        let config = LoggingConfig::default();
        assert_eq!(config.resolve_filter(Some("warn".into())), "warn");
        assert_eq!(config.resolve_filter(None), "info");
    }

    #[test]
    fn repeated_init_is_ignored() {
        init_logging(LoggingConfig::with_filter("debug"));
        init_logging(LoggingConfig::default());
        log::debug!("still logging");
    }
}
