pub mod rounding;

use anyhow::Result;
use colored::*;
use console::style;
use humansize::{format_size, BINARY};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use glistener_core::{DeviceSummary, RunSummary};

use self::rounding::format_half_up;

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "GPU")]
    id: String,
    #[tabled(rename = "Avg Util")]
    avg_utilization: String,
    #[tabled(rename = "Max Util")]
    max_utilization: String,
    #[tabled(rename = "Min Util")]
    min_utilization: String,
    #[tabled(rename = "Median Util")]
    median_utilization: String,
    #[tabled(rename = "Mode Util")]
    mode_utilization: String,
    #[tabled(rename = "Avg Mem Used")]
    avg_memory_used: String,
    #[tabled(rename = "Mem Total")]
    memory_total: String,
    #[tabled(rename = "Avg Temp")]
    avg_temperature: String,
}

impl From<&DeviceSummary> for DeviceRow {
    fn from(d: &DeviceSummary) -> Self {
        Self {
            id: d.device_id.to_string(),
            avg_utilization: format_percent(d.avg_utilization),
            max_utilization: format_percent(d.max_utilization),
            min_utilization: format_percent(d.min_utilization),
            median_utilization: format_percent(d.median_utilization),
            mode_utilization: format_percent(d.mode_utilization),
            avg_memory_used: format_mb(d.avg_memory_used),
            memory_total: format_memory_total(d.memory_total),
            avg_temperature: format_temperature(d.avg_temperature),
        }
    }
}

/// JSON form of a report
#[derive(Serialize)]
struct JsonReport<'a> {
    host: String,
    #[serde(flatten)]
    summary: &'a RunSummary,
}

/// A fraction shown as a percentage with two decimals
pub fn format_percent(fraction: f64) -> String {
    if fraction.is_nan() {
        return "N/A".to_string();
    }
    format!("{}%", format_half_up(fraction * 100.0, 2))
}

pub fn format_mb(mb: f64) -> String {
    if mb.is_nan() {
        return "N/A".to_string();
    }
    format!("{} MB", format_half_up(mb, 2))
}

fn format_memory_total(mb: f64) -> String {
    if !mb.is_finite() || mb < 0.0 {
        return "N/A".to_string();
    }
    let bytes = (mb * 1024.0 * 1024.0) as u64;
    format!("{} MB ({})", mb, format_size(bytes, BINARY))
}

fn format_temperature(celsius: f64) -> String {
    if celsius.is_nan() {
        return "N/A".to_string();
    }
    format!("{}°C", format_half_up(celsius, 1))
}

fn hostname() -> String {
    gethostname::gethostname().to_string_lossy().to_string()
}

pub fn to_json(summary: &RunSummary) -> Result<String> {
    let report = JsonReport {
        host: hostname(),
        summary,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

fn divider() -> ColoredString {
    "═".repeat(60).bright_black()
}

/// Print the human readable report to stdout
pub fn print_report(summary: &RunSummary) {
    println!("{}", divider());
    println!(
        "{} {} | {}",
        "glistener".bold().cyan(),
        style(env!("CARGO_PKG_VERSION")).dim(),
        hostname().yellow()
    );
    println!(
        "  {} {}s, every {}s ({} samples, started {})",
        "Sampled:".bold(),
        summary.duration.as_secs_f64(),
        summary.delay.as_secs_f64(),
        summary.tick_count,
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("  {} {}", "GPU Numbers:".bold(), summary.device_count);
    println!("  {} {}", "Device:".bold(), summary.device_name);
    println!("  {} {}", "Driver Version:".bold(), summary.driver_version);
    println!();

    let rows: Vec<DeviceRow> = summary.devices.iter().map(DeviceRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
    println!("{}", divider());
}
