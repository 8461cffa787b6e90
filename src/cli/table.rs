//! Table formatting for CLI list commands
//!
//! Rows are built once from typed cells and rendered in whichever output
//! format was requested: aligned columns for the terminal, CSV through the
//! `csv` writer, Markdown through `tabled`, or bare ids.

use chrono::{DateTime, Local, Utc};
use console::style;
use miette::{IntoDiagnostic, Result};
use std::io;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{format_short_id_str, truncate_str, SHORT_ID_LEN};
use crate::cli::OutputFormat;

/// Configuration for table output
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// Show summary line after table (e.g., "5 recipe(s) found")
    pub show_summary: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self { show_summary: true }
    }
}

impl TableConfig {
    /// Config for piping (no summary)
    pub fn for_pipe() -> Self {
        Self {
            show_summary: false,
        }
    }
}

/// A typed cell value with semantic meaning for formatting
#[derive(Debug, Clone)]
pub enum CellValue {
    /// Recipe ID (shortened and cyan in the terminal)
    Id(String),
    /// Plain text, truncated to the column
    Text(String),
    /// Optional grouping label
    Category(Option<String>),
    /// Numeric value
    Number(i64),
    /// DateTime displayed as date only
    Date(DateTime<Utc>),
}

impl CellValue {
    /// Format for terminal output
    pub fn format_tsv(&self, width: usize) -> String {
        match self {
            CellValue::Id(id) => {
                let display = short(id);
                format!("{:<width$}", style(display).cyan(), width = width)
            }
            CellValue::Text(s) => {
                format!("{:<width$}", truncate_str(s, width.saturating_sub(2)), width = width)
            }
            CellValue::Category(Some(c)) => {
                let truncated = truncate_str(c, width.saturating_sub(2));
                format!("{:<width$}", style(truncated).yellow(), width = width)
            }
            CellValue::Category(None) => {
                format!("{:<width$}", style("-").dim(), width = width)
            }
            CellValue::Number(n) => format!("{:>width$}", n, width = width),
            CellValue::Date(dt) => {
                let local: DateTime<Local> = dt.with_timezone(&Local);
                format!("{:<width$}", local.format("%Y-%m-%d"), width = width)
            }
        }
    }

    /// Get raw string value (no formatting, for CSV and Markdown)
    pub fn raw(&self) -> String {
        match self {
            CellValue::Id(id) => id.clone(),
            CellValue::Text(s) => s.clone(),
            CellValue::Category(c) => c.clone().unwrap_or_default(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Date(dt) => {
                let local: DateTime<Local> = dt.with_timezone(&Local);
                local.format("%Y-%m-%d").to_string()
            }
        }
    }

    /// Display width of this cell's content (for dynamic column sizing)
    pub fn display_width(&self) -> usize {
        match self {
            CellValue::Id(id) => short(id).chars().count(),
            CellValue::Text(s) => s.chars().count(),
            CellValue::Category(c) => c.as_deref().map_or(1, |c| c.chars().count()),
            CellValue::Number(n) => n.to_string().len(),
            CellValue::Date(_) => 10, // "YYYY-MM-DD"
        }
    }
}

fn short(id: &str) -> String {
    if uuid::Uuid::parse_str(id).is_ok() {
        id.chars().take(SHORT_ID_LEN).collect()
    } else {
        format_short_id_str(id)
    }
}

/// Column definition with header label and maximum width
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub key: &'static str,
    pub header: &'static str,
    pub width: usize,
}

impl ColumnDef {
    pub const fn new(key: &'static str, header: &'static str, width: usize) -> Self {
        Self { key, header, width }
    }
}

/// A row of cell values for table output
pub struct TableRow {
    pub full_id: String,
    pub cells: Vec<(&'static str, CellValue)>,
}

impl TableRow {
    pub fn new(full_id: impl Into<String>) -> Self {
        Self {
            full_id: full_id.into(),
            cells: Vec::new(),
        }
    }

    pub fn cell(mut self, key: &'static str, value: CellValue) -> Self {
        self.cells.push((key, value));
        self
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.cells.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }
}

/// Table formatter that outputs rows in various formats
pub struct TableFormatter<'a> {
    columns: &'a [ColumnDef],
    entity_name: &'static str,
    config: TableConfig,
}

impl<'a> TableFormatter<'a> {
    pub fn new(columns: &'a [ColumnDef], entity_name: &'static str) -> Self {
        Self {
            columns,
            entity_name,
            config: TableConfig::default(),
        }
    }

    /// Configure the formatter with custom settings
    pub fn with_config(mut self, config: TableConfig) -> Self {
        self.config = config;
        self
    }

    /// Output rows in the specified format
    pub fn output(&self, rows: &[TableRow], format: OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Csv => self.output_csv(rows),
            OutputFormat::Md => {
                print!("{}", self.render_md(rows));
                Ok(())
            }
            OutputFormat::Id => {
                for row in rows {
                    println!("{}", row.full_id);
                }
                Ok(())
            }
            _ => {
                self.output_tsv(rows);
                Ok(())
            }
        }
    }

    /// Calculate column widths from the actual content, capped per column
    fn calculate_widths(&self, rows: &[TableRow]) -> Vec<usize> {
        self.columns
            .iter()
            .map(|col| {
                let max_content = rows
                    .iter()
                    .filter_map(|r| r.get(col.key))
                    .map(CellValue::display_width)
                    .max()
                    .unwrap_or(0);
                col.header
                    .len()
                    .max(max_content.saturating_add(2))
                    .min(col.width)
            })
            .collect()
    }

    fn output_tsv(&self, rows: &[TableRow]) {
        let widths = self.calculate_widths(rows);

        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(col, w)| format!("{:<width$}", style(col.header).bold(), width = *w))
            .collect();
        println!("{}", header.join(" "));

        let total_width: usize = widths.iter().sum::<usize>() + widths.len().saturating_sub(1);
        println!("{}", "-".repeat(total_width));

        for row in rows {
            let parts: Vec<String> = self
                .columns
                .iter()
                .zip(&widths)
                .map(|(col, w)| match row.get(col.key) {
                    Some(value) => value.format_tsv(*w),
                    None => format!("{:<width$}", "-", width = *w),
                })
                .collect();
            println!("{}", parts.join(" "));
        }

        if self.config.show_summary {
            println!();
            println!("{} {}(s) found", style(rows.len()).cyan(), self.entity_name);
        }
    }

    fn output_csv(&self, rows: &[TableRow]) -> Result<()> {
        let mut writer = csv::Writer::from_writer(io::stdout());
        writer
            .write_record(self.columns.iter().map(|c| c.key))
            .into_diagnostic()?;
        for row in rows {
            writer
                .write_record(self.columns.iter().map(|c| {
                    row.get(c.key).map(CellValue::raw).unwrap_or_default()
                }))
                .into_diagnostic()?;
        }
        writer.flush().into_diagnostic()
    }

    /// Render rows as a Markdown table
    pub fn render_md(&self, rows: &[TableRow]) -> String {
        let mut builder = Builder::default();
        builder.push_record(self.columns.iter().map(|c| c.header.to_string()));
        for row in rows {
            builder.push_record(self.columns.iter().map(|c| {
                row.get(c.key)
                    .map(CellValue::raw)
                    .unwrap_or_else(|| "-".to_string())
                    .replace('|', "\\|")
            }));
        }
        let mut out = builder.build().with(Style::markdown()).to_string();
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: &[ColumnDef] = &[
        ColumnDef::new("id", "ID", 12),
        ColumnDef::new("title", "TITLE", 30),
        ColumnDef::new("servings", "SERVES", 8),
    ];

    fn rows() -> Vec<TableRow> {
        vec![
            TableRow::new("b9b4c1f2-4c35-4d7e-9a55-0b8f6a1d2e3f")
                .cell("id", CellValue::Id("b9b4c1f2-4c35-4d7e-9a55-0b8f6a1d2e3f".into()))
                .cell("title", CellValue::Text("Tarte | tatin".into()))
                .cell("servings", CellValue::Number(6)),
            TableRow::new("1712345678901")
                .cell("id", CellValue::Id("1712345678901".into()))
                .cell("title", CellValue::Text("Omelette".into())),
        ]
    }

    #[test]
    fn test_widths_fit_content_and_cap() {
        let formatter = TableFormatter::new(COLUMNS, "recipe");
        let widths = formatter.calculate_widths(&rows());
        assert_eq!(widths[0], 12); // "1712345678901" + 2, capped
        assert_eq!(widths[1], 15);
        assert_eq!(widths[2], 6);
    }

    #[test]
    fn test_render_md_escapes_pipes() {
        let md = TableFormatter::new(COLUMNS, "recipe").render_md(&rows());
        assert!(md.contains("TITLE"));
        assert!(md.contains("Tarte \\| tatin"));
        assert!(md.contains("b9b4c1f2-4c35-4d7e-9a55-0b8f6a1d2e3f"));
        assert!(md.lines().any(|l| l.contains("Omelette") && l.contains('-')));
    }

    #[test]
    fn test_cell_display_width() {
        assert_eq!(CellValue::Id("b9b4c1f2-4c35-4d7e-9a55-0b8f6a1d2e3f".into()).display_width(), 8);
        assert_eq!(CellValue::Text("crème".into()).display_width(), 5);
        assert_eq!(CellValue::Category(None).display_width(), 1);
    }
}
