use log::{debug, info, trace, warn, LevelFilter};
use std::time::{Duration, Instant};

/// Environment variable selecting the log level
pub const LOG_LEVEL_ENV: &str = "QPLAY_LOG_LEVEL";

/// Initialize logging, reading the level from `QPLAY_LOG_LEVEL` and falling
/// back to `default_level`
pub fn init(default_level: LevelFilter) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = std::env::var(LOG_LEVEL_ENV).ok();
    let level = log_level
        .as_deref()
        .and_then(parse_level)
        .unwrap_or(default_level);

    let mut builder = env_logger::Builder::new();

    builder.format(|buf, record| {
        use std::io::Write;
        writeln!(
            buf,
            "{} [{}] [{}:{}] {}",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.file().unwrap_or("unknown"),
            record.line().unwrap_or(0),
            record.args()
        )
    });
    builder.filter_level(level);
    builder.try_init()?;

    info!("Queue player logging initialized with level: {}", level);
    Ok(())
}

/// Parse a level name; unknown names yield `None`
pub fn parse_level(name: &str) -> Option<LevelFilter> {
    match name.trim().to_lowercase().as_str() {
        "off" => Some(LevelFilter::Off),
        "trace" => Some(LevelFilter::Trace),
        "debug" => Some(LevelFilter::Debug),
        "info" => Some(LevelFilter::Info),
        "warn" | "warning" => Some(LevelFilter::Warn),
        "error" => Some(LevelFilter::Error),
        _ => None,
    }
}

/// Wall-clock timer for snapshot loads and saves
pub struct OperationTimer {
    started: Instant,
    label: String,
}

impl OperationTimer {
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        trace!("{}: started", label);
        Self {
            started: Instant::now(),
            label,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn finish(self) -> Duration {
        let elapsed = self.elapsed();
        trace!("{}: {}ms", self.label, elapsed.as_millis());
        elapsed
    }

    /// Like `finish`, but a run slower than `threshold` is logged as a warning
    pub fn finish_with_threshold(self, threshold: Duration) -> Duration {
        let elapsed = self.elapsed();
        if elapsed > threshold {
            warn!(
                "{} was slow: {}ms (limit {}ms)",
                self.label,
                elapsed.as_millis(),
                threshold.as_millis()
            );
        } else {
            debug!("{}: {}ms", self.label, elapsed.as_millis());
        }
        elapsed
    }
}

/// Evaluate a block under an `OperationTimer`, yielding the block's value
#[macro_export]
macro_rules! time_operation {
    ($label:expr, $code:block) => {{
        let timer = $crate::logging::OperationTimer::new($label);
        let value = $code;
        timer.finish();
        value
    }};
}

/// `time_operation!` that warns when the block runs past `$threshold`
#[macro_export]
macro_rules! time_operation_with_threshold {
    ($label:expr, $threshold:expr, $code:block) => {{
        let timer = $crate::logging::OperationTimer::new($label);
        let value = $code;
        timer.finish_with_threshold($threshold);
        value
    }};
}
