use std::sync::Once;

use env_logger::Env;
use log::{warn, LevelFilter};

static LOG_ONCE: Once = Once::new();

fn env_level() -> LevelFilter {
    std::env::var("SHIMMER_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok()
        .as_deref()
        .and_then(parse_level)
        .unwrap_or(LevelFilter::Info)
}

fn parse_level(input: &str) -> Option<LevelFilter> {
    input.trim().parse::<LevelFilter>().ok()
}

fn level_to_str(level: LevelFilter) -> &'static str {
    match level {
        LevelFilter::Off => "off",
        LevelFilter::Error => "error",
        LevelFilter::Warn => "warn",
        LevelFilter::Info => "info",
        LevelFilter::Debug => "debug",
        LevelFilter::Trace => "trace",
    }
}

/// Initialize stderr logging from `SHIMMER_LOG`/`RUST_LOG`, or from
/// `override_level` when given (e.g. a `--log-level` flag).
/// Safe to call multiple times; only the first call installs the logger.
pub fn init_logging(override_level: Option<&str>) {
    let (forced, rejected) = resolve_override(override_level);
    let level = forced.unwrap_or_else(env_level);
    LOG_ONCE.call_once(|| {
        let env = Env::default().default_filter_or(level_to_str(level));
        let mut builder = env_logger::Builder::from_env(env);
        // Only a valid override replaces the env directives.
        if let Some(forced) = forced {
            builder.filter_level(forced);
        }
        builder
            .format_timestamp_millis()
            .format_module_path(true)
            .format_target(false)
            .init();
    });
    if let Some(bad) = rejected {
        warn!(
            "ignoring invalid log level {:?}, using {}",
            bad,
            level_to_str(level)
        );
    }
}

/// Split an override into the level to force and the input to warn about.
fn resolve_override(input: Option<&str>) -> (Option<LevelFilter>, Option<&str>) {
    match input {
        None => (None, None),
        Some(raw) => match parse_level(raw) {
            Some(level) => (Some(level), None),
            None => (None, Some(raw)),
        },
    }
}
