//! Output formatting module
//!
//! Provides JSON and table output formatting with colored terminal support.
//! Used across all CLI commands for consistent output.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Display;
use std::time::Duration;
use tabled::{settings::Style, Table, Tabled};

use pipdb_common::timestamps::format_unix;
use pipdb_core::StandardPlaceResult;

use crate::config::OutputFormat;

/// Format and print a success message
pub fn success(message: impl Display) {
    println!("{} {}", "✓".green(), message);
}

/// Format and print an error message
pub fn error(message: impl Display) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Format and print a warning message
pub fn warning(message: impl Display) {
    eprintln!("{} {}", "!".yellow(), message);
}

/// Format and print an info message
pub fn info(message: impl Display) {
    println!("{} {}", "ℹ".blue(), message);
}

/// Format and print data based on output format
pub fn print_data<T: Serialize + Tabled>(data: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(data),
        OutputFormat::Table => print_table(data),
        OutputFormat::Plain => print_plain(data),
    }
}

/// Print data as JSON
pub fn print_json<T: Serialize + ?Sized>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => error(format!("Failed to serialize to JSON: {}", e)),
    }
}

/// Print data as a formatted table
pub fn print_table<T: Tabled>(data: &[T]) {
    if data.is_empty() {
        info("No data to display");
        return;
    }

    let table = Table::new(data).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print data as plain text (one item per line)
pub fn print_plain<T: Tabled>(data: &[T]) {
    if data.is_empty() {
        return;
    }

    let table = Table::new(data).with(Style::blank()).to_string();
    println!("{}", table);
}

/// Print a single key-value pair
pub fn kv(key: impl Display, value: impl Display) {
    println!("{}: {}", key.to_string().bold(), value);
}

/// Print a section header
pub fn section(title: impl Display) {
    println!("\n{}", title.to_string().bold().underline());
}

/// Format a duration with millisecond precision
pub fn format_elapsed(elapsed: Duration) -> String {
    let ms = elapsed.as_millis();
    if ms >= 60_000 {
        format!("{}m {}s", ms / 60_000, (ms % 60_000) / 1000)
    } else if ms >= 1000 {
        format!("{:.2}s", elapsed.as_secs_f64())
    } else {
        format!("{}ms", ms)
    }
}

/// One place per table row
#[derive(Debug, Serialize, Tabled)]
pub struct PlaceRow {
    #[tabled(rename = "ID")]
    pub id: i64,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Placetype")]
    pub placetype: String,
    #[tabled(rename = "Country")]
    pub country: String,
    #[tabled(rename = "Current")]
    pub is_current: i8,
    #[tabled(rename = "Modified")]
    pub modified: String,
    #[tabled(rename = "Path")]
    pub path: String,
}

impl From<&StandardPlaceResult> for PlaceRow {
    fn from(place: &StandardPlaceResult) -> Self {
        Self {
            id: place.id,
            name: place.name.clone(),
            placetype: place.placetype.clone(),
            country: place.country.clone(),
            is_current: place.is_current.as_i8(),
            modified: format_unix(place.last_modified)
                .filter(|_| place.last_modified >= 0)
                .unwrap_or_else(|| "-".to_string()),
            path: place.path.clone(),
        }
    }
}

/// Print places; JSON output keeps every standard place field.
pub fn print_places(places: &[StandardPlaceResult], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(places),
        _ => {
            let rows: Vec<PlaceRow> = places.iter().map(PlaceRow::from).collect();
            print_data(&rows, format);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(250)), "250ms");
        assert_eq!(format_elapsed(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format_elapsed(Duration::from_secs(90)), "1m 30s");
    }
}
