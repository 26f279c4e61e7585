use crate::config::TelemetrySection;
use time::UtcOffset;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Clone, Debug)]
pub struct LogConfig {
    pub level: String,  // info|debug
    pub format: String, // text|json
    pub no_ansi: bool,
}

impl From<&TelemetrySection> for LogConfig {
    fn from(section: &TelemetrySection) -> Self {
        Self {
            level: section.log_level.clone(),
            format: section.log_format.clone(),
            no_ansi: section.no_ansi,
        }
    }
}

/// 使用提供的配置初始化 tracing
pub fn init_tracing_with(cfg: &LogConfig) {
    let level = match cfg.level.to_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    };

    let filter = EnvFilter::new(level);
    let base = fmt::layer().with_target(true).with_ansi(!cfg.no_ansi);
    let fmt_layer = if cfg.format.eq_ignore_ascii_case("json") {
        base.json().boxed()
    } else {
        let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
        base.with_timer(fmt::time::OffsetTime::new(
            offset,
            time::format_description::well_known::Rfc3339,
        ))
        .boxed()
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
