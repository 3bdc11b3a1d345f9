use chrono::Local;
use once_cell::sync::Lazy;
use std::fs::{create_dir_all, File, OpenOptions};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::utils::file_ops::porter_subdir;

// 程序启动时间
static START_TIME: Lazy<Instant> = Lazy::new(Instant::now);

// 自定义启动时间计时器
struct UptimeTimer;

impl FormatTime for UptimeTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> Result<(), std::fmt::Error> {
        write!(w, "{}", format_uptime(START_TIME.elapsed()))
    }
}

fn format_uptime(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    let seconds = millis / 1000;
    let minutes = seconds / 60;
    let hours = minutes / 60;

    format!(
        "{:02}:{:02}:{:02}.{:03}",
        hours % 24,
        minutes % 60,
        seconds % 60,
        millis % 1000
    )
}

fn open_log(path: &Path, truncate: bool) -> Option<File> {
    let mut opts = OpenOptions::new();
    opts.create(true);
    if truncate {
        opts.write(true).truncate(true);
    } else {
        opts.append(true);
    }
    match opts.open(path) {
        Ok(f) => Some(f),
        Err(e) => {
            eprintln!("Failed to open log file {}: {}", path.display(), e);
            None
        }
    }
}

// 初始化日志系统：控制台 + 按日期日志 + latest.log
pub fn init_logging(debug_enabled: bool) {
    Lazy::force(&START_TIME);

    let logs_dir = porter_subdir("logs");
    let log_level = if debug_enabled { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    // 控制台层
    let console_layer = tracing_subscriber::fmt::layer()
        .with_timer(UptimeTimer)
        .with_ansi(true)
        .with_target(true);

    let (dated, latest) = match create_dir_all(&logs_dir) {
        Ok(()) => (
            open_log(
                &logs_dir.join(format!("{}.log", Local::now().format("%Y-%m-%d"))),
                false,
            ),
            open_log(&logs_dir.join("latest.log"), true),
        ),
        Err(e) => {
            eprintln!("Failed to create logs directory: {}", e);
            (None, None)
        }
    };

    // 文件层无 ANSI 转义；打不开文件时只保留控制台
    let file_layer = dated.map(|f| {
        tracing_subscriber::fmt::layer()
            .with_timer(UptimeTimer)
            .with_ansi(false)
            .with_target(true)
            .with_writer(f)
    });
    let latest_log_layer = latest.map(|f| {
        tracing_subscriber::fmt::layer()
            .with_timer(UptimeTimer)
            .with_ansi(false)
            .with_target(true)
            .with_writer(f)
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .with(latest_log_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(Duration::from_millis(0)), "00:00:00.000");
        assert_eq!(format_uptime(Duration::from_millis(3_723_045)), "01:02:03.045");
    }
}
