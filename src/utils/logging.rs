use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use anyhow::{anyhow, Result};
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::{
    fmt::{format::FmtSpan, writer::MakeWriterExt},
    EnvFilter,
};

pub const CLI_PREFIX: &str = "cli";

const MAX_LOG_FILES: usize = 5;
const DEFAULT_LEVEL: LevelFilter = LevelFilter::INFO;

/// Where and how much a `daybudget` invocation logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// File name prefix of the rolling log files.
    pub prefix: &'static str,
    /// Directory that receives the daily log files.
    pub log_dir: PathBuf,
    /// `--log`: trace everything and mirror it to stdout.
    pub verbose: bool,
}

impl LogSettings {
    pub fn for_cli(application_dir: &Path, verbose: bool) -> Self {
        Self {
            prefix: CLI_PREFIX,
            log_dir: application_dir.join("logs"),
            verbose,
        }
    }

    /// Filter directive for this crate. `--log` wins over `RUST_LOG`. A bare level in `RUST_LOG`
    /// is scoped to the crate, a full directive is taken as is.
    fn directive(&self, rust_log: Option<&str>) -> String {
        let target = env!("CARGO_PKG_NAME").replace('-', "_");
        if self.verbose {
            return format!("{target}={}", LevelFilter::TRACE);
        }
        match rust_log.map(str::trim) {
            Some(value) if value.contains('=') => value.to_string(),
            Some(value) if value.parse::<LevelFilter>().is_ok() => format!("{target}={value}"),
            _ => format!("{target}={DEFAULT_LEVEL}"),
        }
    }
}

/// Installs the global subscriber. Logs always go to a daily rotating file; stdout only gets them
/// in verbose mode so command output stays clean.
pub fn enable_logging(settings: &LogSettings) -> Result<()> {
    let appender = tracing_appender::rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(MAX_LOG_FILES)
        .filename_prefix(settings.prefix)
        .build(&settings.log_dir)?;

    let verbose = settings.verbose;
    let stdout = std::io::stdout.with_filter(move |_| verbose);

    let rust_log = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(settings.directive(rust_log.as_deref())))
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(stdout.and(appender))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("Couldn't install logging: {e}"))
}

pub static TEST_LOGGING: LazyLock<()> = LazyLock::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_test_writer()
        .pretty()
        .try_init();
});

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::LogSettings;

    fn settings(verbose: bool) -> LogSettings {
        LogSettings::for_cli(Path::new("/tmp/daybudget"), verbose)
    }

    #[test]
    fn test_log_dir_is_inside_application_dir() {
        let settings = settings(false);
        assert_eq!(settings.log_dir, Path::new("/tmp/daybudget/logs"));
        assert_eq!(settings.prefix, "cli");
    }

    #[test]
    fn test_directive_defaults_to_info() {
        assert_eq!(settings(false).directive(None), "daybudget=info");
        assert_eq!(settings(false).directive(Some("loud")), "daybudget=info");
    }

    #[test]
    fn test_directive_from_rust_log() {
        assert_eq!(settings(false).directive(Some("warn")), "daybudget=warn");
        assert_eq!(
            settings(false).directive(Some("daybudget=debug,tokio=warn")),
            "daybudget=debug,tokio=warn"
        );
    }

    #[test]
    fn test_verbose_overrides_rust_log() {
        assert_eq!(settings(true).directive(Some("error")), "daybudget=trace");
    }
}
