//! Output formatting: table, JSON, plain.
//!
//! Backend entities are flat string maps with no fixed schema, so tables
//! are built column-by-column from the union of record keys rather than
//! from a `Tabled` derive.

use std::collections::BTreeSet;
use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::builder::Builder;
use tabled::settings::Style;

use pushlink_api::Record;
use pushlink_core::RegistrationStatus;

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Status label, colored by state when enabled.
pub fn paint_status(status: &RegistrationStatus, color: bool) -> String {
    let label = status.to_string();
    if !color {
        return label;
    }
    match status {
        RegistrationStatus::Registered => label.green().to_string(),
        RegistrationStatus::Error(_) => label.red().to_string(),
        RegistrationStatus::Unregistered | RegistrationStatus::Invalid => {
            label.dimmed().to_string()
        }
        _ => label.yellow().to_string(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of records. `plain` prints one key per line, read from
/// `key_field`.
pub fn render_records(
    format: OutputFormat,
    records: &[Record],
    key_field: &str,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => Ok(records_table(records)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(records)?),
        OutputFormat::JsonCompact => Ok(serde_json::to_string(records)?),
        OutputFormat::Plain => Ok(records
            .iter()
            .filter_map(|r| r.get(key_field))
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

/// Render a single record as a field/value table or JSON object.
pub fn render_record(
    format: OutputFormat,
    record: &Record,
    key_field: &str,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => Ok(pairs_table(record.iter())),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(record)?),
        OutputFormat::JsonCompact => Ok(serde_json::to_string(record)?),
        OutputFormat::Plain => Ok(record.get(key_field).unwrap_or_default().to_owned()),
    }
}

/// Render field/value pairs; `plain_value` is what `plain` prints.
pub fn render_pairs(
    format: OutputFormat,
    pairs: &[(&str, String)],
    plain_value: &str,
) -> Result<String, CliError> {
    let object = || {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), serde_json::Value::String(v.clone())))
            .collect::<serde_json::Map<_, _>>()
    };
    match format {
        OutputFormat::Table => Ok(pairs_table(pairs.iter().map(|(k, v)| (*k, v.as_str())))),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&object())?),
        OutputFormat::JsonCompact => Ok(serde_json::to_string(&object())?),
        OutputFormat::Plain => Ok(plain_value.to_owned()),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Table builders ───────────────────────────────────────────────────

fn records_table(records: &[Record]) -> String {
    let columns: BTreeSet<&str> = records.iter().flat_map(Record::keys).collect();
    if columns.is_empty() {
        return String::new();
    }

    let mut builder = Builder::default();
    builder.push_record(columns.iter().copied());
    for record in records {
        builder.push_record(columns.iter().map(|c| record.get(c).unwrap_or_default()));
    }
    builder.build().with(Style::rounded()).to_string()
}

fn pairs_table<'a>(pairs: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    let mut builder = Builder::default();
    for (field, value) in pairs {
        builder.push_record([field, value]);
    }
    builder.build().with(Style::rounded()).to_string()
}
