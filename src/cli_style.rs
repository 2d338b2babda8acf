/*!
 * CLI styling helpers: themed messages, human-readable sizes and durations,
 * and the end-of-run summary table.
 */

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use console::{style, StyledObject};

use crate::stats::CombineStats;

/// Brand colors for consistent styling
pub struct Theme;

impl Theme {
    pub fn success<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).green()
    }

    pub fn warning<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).yellow()
    }

    pub fn error<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).red()
    }

    pub fn muted<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).dim()
    }
}

/// Unicode icons for visual feedback
pub struct Icons;

impl Icons {
    pub const SUCCESS: &'static str = "✓";
    pub const ERROR: &'static str = "✗";
    pub const WARNING: &'static str = "⚠";
    pub const ARROW_RIGHT: &'static str = "→";
}

/// Create a standard table with UTF-8 borders
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Summary of a finished run
pub fn combine_summary_table(stats: &CombineStats) -> Table {
    let mut table = create_table();
    table.set_header(vec![
        Cell::new("Combine Summary")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(""),
    ]);

    table.add_row(vec![
        Cell::new("Output Size"),
        Cell::new(format_bytes(stats.bytes_written))
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
    ]);

    if stats.truncated() {
        table.add_row(vec![
            Cell::new("Inputs"),
            Cell::new(format!(
                "{} / {} (truncated to {})",
                format_bytes(stats.first_len),
                format_bytes(stats.second_len),
                format_bytes(stats.combined_len)
            ))
            .fg(Color::Yellow),
        ]);
    }

    table.add_row(vec![
        Cell::new("Chunks"),
        Cell::new(format!(
            "{} x {}",
            stats.chunk_count,
            format_bytes(stats.chunk_size)
        )),
    ]);

    table.add_row(vec![
        Cell::new("Workers"),
        Cell::new(stats.workers.to_string()),
    ]);

    table.add_row(vec![
        Cell::new("Duration"),
        Cell::new(format_duration(stats.duration.as_secs_f64())).fg(Color::White),
    ]);

    table.add_row(vec![
        Cell::new("Speed"),
        Cell::new(format!("{}/s", format_bytes(stats.throughput_bps() as u64)))
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
    ]);

    table
}

/// Format bytes into human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let base = 1024.0_f64;
    let exp = (bytes_f.ln() / base.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);

    let value = bytes_f / base.powi(exp as i32);

    if exp == 0 {
        format!("{} {}", bytes, UNITS[exp])
    } else {
        format!("{:.2} {}", value, UNITS[exp])
    }
}

/// Format duration into human-readable string
pub fn format_duration(secs: f64) -> String {
    if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else if secs < 3600.0 {
        let mins = (secs / 60.0).floor();
        let remaining = secs % 60.0;
        format!("{}m {:.0}s", mins, remaining)
    } else {
        let hours = (secs / 3600.0).floor();
        let mins = ((secs % 3600.0) / 60.0).floor();
        format!("{}h {}m", hours, mins)
    }
}

/// Print a styled error message with optional suggestion
pub fn print_error(message: &str, suggestion: Option<&str>) {
    eprintln!(
        "\n{} {}",
        Theme::error(format!("{} Error:", Icons::ERROR)),
        message
    );

    if let Some(hint) = suggestion {
        eprintln!(
            "  {} {}",
            Theme::muted(Icons::ARROW_RIGHT),
            Theme::muted(hint)
        );
    }
    eprintln!();
}

/// Print a styled warning message
pub fn print_warning(message: &str) {
    eprintln!(
        "{} {}",
        Theme::warning(Icons::WARNING.to_string()),
        Theme::warning(message)
    );
}

/// Print a styled success message
pub fn print_success(message: &str) {
    println!(
        "{} {}",
        Theme::success(Icons::SUCCESS.to_string()),
        Theme::success(message)
    );
}
