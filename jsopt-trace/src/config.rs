//! Logger configuration.
//!
//! Settings are read once at startup, either from the environment or from
//! command-line flags layered on top of it. The logger is enabled iff an
//! output path is present.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_LOG: &str = "JSOPT_TRACE_LOG";
pub const ENV_FORMAT: &str = "JSOPT_TRACE_FORMAT";
pub const ENV_CLOCK: &str = "JSOPT_TRACE_CLOCK";
pub const ENV_PAUSES: &str = "JSOPT_TRACE_PAUSES";
pub const ENV_OVERHEAD: &str = "JSOPT_TRACE_OVERHEAD";
pub const ENV_QUIET: &str = "JSOPT_TRACE_QUIET";
pub const ENV_FLUSH_MS: &str = "JSOPT_TRACE_FLUSH_MS";

pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(10);

/// Layout of the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Records wrapped in an HTML document a trace viewer can open directly.
    #[default]
    Html,
    /// Only the newline-delimited records.
    Raw,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "html" => Ok(OutputFormat::Html),
            "raw" => Ok(OutputFormat::Raw),
            other => Err(format!("unknown trace format '{other}' (expected html or raw)")),
        }
    }
}

/// Which clock event timestamps are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockSource {
    /// Monotonic wall time.
    #[default]
    Wall,
    /// CPU time summed over every thread of the process; can outrun wall time.
    ProcessCpu,
    /// CPU time of the calling thread, re-based at every root event.
    ThreadCpu,
}

impl ClockSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ClockSource::Wall => "wall",
            ClockSource::ProcessCpu => "process-cpu",
            ClockSource::ThreadCpu => "thread-cpu",
        }
    }
}

impl FromStr for ClockSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wall" => Ok(ClockSource::Wall),
            "process-cpu" | "process" => Ok(ClockSource::ProcessCpu),
            "thread-cpu" | "thread" => Ok(ClockSource::ThreadCpu),
            other => Err(format!(
                "unknown trace clock '{other}' (expected wall, process-cpu or thread-cpu)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceConfig {
    /// Sink path. `None` disables the logger.
    pub output: Option<PathBuf>,
    pub format: OutputFormat,
    pub clock: ClockSource,
    /// Append host pause time as synthetic `GC` children.
    pub record_pauses: bool,
    /// Append the logger's own cost as synthetic `OVERHEAD` children.
    pub record_overhead: bool,
    /// Drop events whose category is flagged high volume.
    pub quiet_high_volume: bool,
    pub flush_interval: Duration,
}

impl Default for TraceConfig {
    fn default() -> Self {
        TraceConfig {
            output: None,
            format: OutputFormat::default(),
            clock: ClockSource::default(),
            record_pauses: false,
            record_overhead: false,
            quiet_high_volume: false,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }
}

impl TraceConfig {
    /// Configuration enabled and writing to `path`, everything else default.
    pub fn to_path(path: impl Into<PathBuf>) -> Self {
        TraceConfig {
            output: Some(path.into()),
            ..TraceConfig::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.output.is_some()
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from any key lookup.
    ///
    /// Boolean switches are on when the key is present at all. Unparseable
    /// format or clock values fall back to the default with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = TraceConfig {
            output: lookup(ENV_LOG).filter(|p| !p.is_empty()).map(PathBuf::from),
            record_pauses: lookup(ENV_PAUSES).is_some(),
            record_overhead: lookup(ENV_OVERHEAD).is_some(),
            quiet_high_volume: lookup(ENV_QUIET).is_some(),
            ..TraceConfig::default()
        };

        if let Some(value) = lookup(ENV_FORMAT) {
            match value.parse() {
                Ok(format) => config.format = format,
                Err(message) => tracing::warn!("{ENV_FORMAT}: {message}"),
            }
        }
        if let Some(value) = lookup(ENV_CLOCK) {
            match value.parse() {
                Ok(clock) => config.clock = clock,
                Err(message) => tracing::warn!("{ENV_CLOCK}: {message}"),
            }
        }
        if let Some(value) = lookup(ENV_FLUSH_MS) {
            match value.parse::<u64>() {
                Ok(ms) if ms > 0 => config.flush_interval = Duration::from_millis(ms),
                _ => tracing::warn!("{ENV_FLUSH_MS}: ignoring invalid interval '{value}'"),
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_disables_logging() {
        let config = TraceConfig::from_lookup(lookup_from(&[]));
        assert!(!config.is_enabled());
        assert_eq!(config, TraceConfig::default());
    }

    #[test]
    fn reads_all_options() {
        let config = TraceConfig::from_lookup(lookup_from(&[
            (ENV_LOG, "/tmp/trace.html"),
            (ENV_FORMAT, "RAW"),
            (ENV_CLOCK, "thread-cpu"),
            (ENV_PAUSES, ""),
            (ENV_OVERHEAD, "1"),
            (ENV_QUIET, "yes"),
            (ENV_FLUSH_MS, "250"),
        ]));
        assert_eq!(config.output, Some(PathBuf::from("/tmp/trace.html")));
        assert_eq!(config.format, OutputFormat::Raw);
        assert_eq!(config.clock, ClockSource::ThreadCpu);
        assert!(config.record_pauses);
        assert!(config.record_overhead);
        assert!(config.quiet_high_volume);
        assert_eq!(config.flush_interval, Duration::from_millis(250));
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = TraceConfig::from_lookup(lookup_from(&[
            (ENV_LOG, "out.json"),
            (ENV_FORMAT, "xml"),
            (ENV_CLOCK, "sundial"),
            (ENV_FLUSH_MS, "0"),
        ]));
        assert_eq!(config.format, OutputFormat::Html);
        assert_eq!(config.clock, ClockSource::Wall);
        assert_eq!(config.flush_interval, DEFAULT_FLUSH_INTERVAL);
    }

    #[rstest]
    #[case("wall", ClockSource::Wall)]
    #[case("process-cpu", ClockSource::ProcessCpu)]
    #[case("Thread-CPU", ClockSource::ThreadCpu)]
    fn parses_clock_names(#[case] text: &str, #[case] expected: ClockSource) {
        assert_eq!(text.parse::<ClockSource>(), Ok(expected));
    }
}
