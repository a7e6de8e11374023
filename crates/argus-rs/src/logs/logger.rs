//! Logger configuration and structured output formatting.
//!
//! Sets up `env_logger` with an aligned column layout and per-level colours.
//! Colour is disabled when `NO_COLOR` is set; level filtering follows
//! `RUST_LOG`.

use chrono::Local;
use env_logger::Builder;
use log::LevelFilter;
use std::env;
use std::io::Write;

/// Visible width of the `[LEVEL]` column including padding.
const LEVEL_COLUMN: usize = 8;

/// Visible width of the `module` column including padding.
const TARGET_COLUMN: usize = 24;

fn pad_to(column: usize, visible: usize) -> usize {
    if visible >= column {
        1
    } else {
        column - visible
    }
}

fn level_colour(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "\x1b[31m",
        log::Level::Warn => "\x1b[33m",
        log::Level::Info => "\x1b[32m",
        log::Level::Debug => "\x1b[34m",
        log::Level::Trace => "\x1b[35m",
    }
}

/// Configure and initialize the application's logging system.
///
/// Should be called once during startup, before anything logs. Output lines
/// look like:
///
/// ```text
/// 2024-03-15 10:30:45.120 | [INFO ] | argus_rs::services::health | health supervisor stopped
/// ```
///
/// # Environment
///
/// - `RUST_LOG`: level filtering (falls back to `info` when unset)
/// - `NO_COLOR`: disables colour and bolding for log shippers
pub fn configure_logger() {
    let no_color = env::var("NO_COLOR").is_ok();

    let mut builder = Builder::new();
    builder.format(move |buf, record| {
        let level_plain = format!("[{}]", record.level());
        // Padding is computed from the plain text so colour codes never
        // shift the columns.
        let level_pad = pad_to(LEVEL_COLUMN, level_plain.len());

        let level_display = if no_color {
            level_plain
        } else {
            format!(
                "\x1b[1m{}[{}]\x1b[0m",
                level_colour(record.level()),
                record.level()
            )
        };

        let target = record.target();
        let target_pad = pad_to(TARGET_COLUMN, target.len());

        writeln!(
            buf,
            "{} | {}{}| {}{}| {}",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            level_display,
            " ".repeat(level_pad),
            target,
            " ".repeat(target_pad),
            record.args(),
        )
    });

    if let Ok(filters) = env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    } else {
        builder.filter_level(LevelFilter::Info);
    }

    // Ignore double-init errors so tests can call this repeatedly.
    let _ = builder.try_init();
}
