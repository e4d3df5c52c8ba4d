//! Terminal output: pretty JSON and aligned tables of threads.

use lifecycle_core::dispatch::DispatchOutcome;
use lifecycle_core::engine::DispatchRecord;
use lifecycle_core::lifecycle::Channel;
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// One line of a thread table.
pub trait TableRow {
    const HEADERS: &'static [&'static str];

    fn cells(&self) -> Vec<String>;
}

impl TableRow for DispatchRecord {
    const HEADERS: &'static [&'static str] = &["THREAD", "CHANNELS", "OUTCOME"];

    fn cells(&self) -> Vec<String> {
        let outcome = match self.outcome {
            DispatchOutcome::Delivered { mode } => format!("delivered ({})", mode.as_str()),
            DispatchOutcome::Unchanged => "unchanged".to_string(),
            DispatchOutcome::Stale => "stale".to_string(),
            DispatchOutcome::NoChannels => "no channels".to_string(),
        };
        vec![self.thread.to_string(), channel_names(&self.channels), outcome]
    }
}

/// Comma-separated channel names, `-` when there are none.
pub fn channel_names(channels: &[Channel]) -> String {
    if channels.is_empty() {
        return "-".to_string();
    }
    channels
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// Column-aligned table; widths count characters, not bytes.
pub fn format_table<R: TableRow>(rows: &[R]) -> String {
    let cells: Vec<Vec<String>> = rows.iter().map(TableRow::cells).collect();
    let mut widths: Vec<usize> = R::HEADERS.iter().map(|h| h.chars().count()).collect();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = vec![
        aligned(R::HEADERS, &widths),
        widths.iter().map(|&w| "-".repeat(w)).collect::<Vec<_>>().join("  "),
    ];
    out.extend(cells.iter().map(|row| aligned(row, &widths)));
    out.join("\n")
}

fn aligned<S: AsRef<str>>(row: &[S], widths: &[usize]) -> String {
    row.iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{:width$}", cell.as_ref()))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

pub fn print_table<R: TableRow>(rows: &[R], skipped: usize) {
    println!("{}", format_table(rows));
    if skipped > 0 {
        println!("\n{skipped} incomplete root(s) skipped");
    }
}
