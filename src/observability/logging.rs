//! Logging configuration.
//!
//! Resolved from the environment:
//!
//! | Variable | Effect | Default |
//! |----------|--------|---------|
//! | `CADENCE_LOG` | `EnvFilter` directives | `RUST_LOG`, then `info` (`debug` with `--verbose`) |
//! | `CADENCE_LOG_FORMAT` | `json` or `pretty` | `pretty` |
//! | `CADENCE_LOG_FILE` | append logs to this file instead of stderr | unset |

use std::path::PathBuf;

/// Filter directives variable.
pub const LOG_FILTER_ENV: &str = "CADENCE_LOG";
/// Output format variable.
pub const LOG_FORMAT_ENV: &str = "CADENCE_LOG_FORMAT";
/// Log file variable.
pub const LOG_FILE_ENV: &str = "CADENCE_LOG_FILE";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Logging settings applied by [`super::init`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// `EnvFilter` directives.
    pub filter: String,
    /// Optional log file.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: "info".to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Builds the config from process environment variables.
    #[must_use]
    pub fn from_env(verbose: bool) -> Self {
        Self::from_lookup(verbose, |key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(verbose: bool, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let default_filter = if verbose { "debug" } else { "info" };
        let filter = non_empty(LOG_FILTER_ENV)
            .or_else(|| non_empty("RUST_LOG"))
            .unwrap_or_else(|| default_filter.to_string());

        let format = non_empty(LOG_FORMAT_ENV)
            .and_then(|v| LogFormat::parse(&v))
            .unwrap_or_default();

        Self {
            format,
            filter,
            file: non_empty(LOG_FILE_ENV).map(PathBuf::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use test_case::test_case;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = LoggingConfig::from_lookup(false, lookup(&[]));
        assert_eq!(config, LoggingConfig::default());
    }

    #[test]
    fn test_verbose_lowers_default_filter() {
        let config = LoggingConfig::from_lookup(true, lookup(&[]));
        assert_eq!(config.filter, "debug");
    }

    #[test]
    fn test_cadence_log_wins_over_rust_log() {
        let config = LoggingConfig::from_lookup(
            true,
            lookup(&[(LOG_FILTER_ENV, "cadence=trace"), ("RUST_LOG", "warn")]),
        );
        assert_eq!(config.filter, "cadence=trace");

        let config = LoggingConfig::from_lookup(false, lookup(&[("RUST_LOG", "warn")]));
        assert_eq!(config.filter, "warn");
    }

    #[test]
    fn test_file_and_format() {
        let config = LoggingConfig::from_lookup(
            false,
            lookup(&[(LOG_FORMAT_ENV, "JSON"), (LOG_FILE_ENV, "/tmp/cadence.log")]),
        );
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.file, Some(PathBuf::from("/tmp/cadence.log")));
    }

    #[test_case("json" => Some(LogFormat::Json))]
    #[test_case("Pretty" => Some(LogFormat::Pretty))]
    #[test_case("text" => Some(LogFormat::Pretty))]
    #[test_case("xml" => None)]
    fn test_parse_format(input: &str) -> Option<LogFormat> {
        LogFormat::parse(input)
    }
}
