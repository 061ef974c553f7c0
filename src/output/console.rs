//! Console rendering of query results.
//!
//! Draws the Result Table as a box-drawn text table and prints the run's
//! banner, success and failure lines. Meant for operators, not for parsing.

use crate::error::ReportError;
use crate::pipeline::PipelineConfig;
use crate::warehouse::{QueryResult, Value};
use std::io::{self, Write};
use std::path::Path;

/// Maximum width for any column.
const MAX_COLUMN_WIDTH: usize = 60;

/// Minimum width for any column.
const MIN_COLUMN_WIDTH: usize = 4;

/// Plain-text table for a query result.
pub struct ConsoleTable<'a> {
    result: &'a QueryResult,
}

impl<'a> ConsoleTable<'a> {
    /// Creates a new console table.
    pub fn new(result: &'a QueryResult) -> Self {
        Self { result }
    }

    /// Calculates the width of each column from its header and cells.
    fn calculate_column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self
            .result
            .columns
            .iter()
            .map(|col| col.name.chars().count().max(MIN_COLUMN_WIDTH))
            .collect();

        for row in &self.result.rows {
            for (i, value) in row.iter().enumerate() {
                if let Some(width) = widths.get_mut(i) {
                    *width = (*width).max(value.to_display_string().chars().count());
                }
            }
        }

        widths.iter().map(|&w| w.min(MAX_COLUMN_WIDTH)).collect()
    }

    /// Truncates a string to `max_width` characters, adding ellipsis if needed.
    fn truncate(s: &str, max_width: usize) -> String {
        if s.chars().count() <= max_width {
            s.to_string()
        } else if max_width <= 3 {
            s.chars().take(max_width).collect()
        } else {
            let head: String = s.chars().take(max_width - 3).collect();
            format!("{head}...")
        }
    }

    /// Renders the table to lines, without trailing newlines.
    pub fn render_lines(&self) -> Vec<String> {
        if self.result.columns.is_empty() {
            return vec!["(empty result)".to_string()];
        }

        let widths = self.calculate_column_widths();
        let mut lines = Vec::with_capacity(self.result.rows.len() + 5);

        lines.push(Self::render_border(&widths, '┌', '┬', '┐'));
        let header: Vec<String> = self.result.columns.iter().map(|c| c.name.clone()).collect();
        lines.push(Self::render_cells(&header, &widths));
        lines.push(Self::render_border(&widths, '├', '┼', '┤'));

        for row in &self.result.rows {
            let cells: Vec<String> = (0..widths.len())
                .map(|i| row.get(i).unwrap_or(&Value::Null).to_display_string())
                .collect();
            lines.push(Self::render_cells(&cells, &widths));
        }

        lines.push(Self::render_border(&widths, '└', '┴', '┘'));

        let count = self.result.row_count;
        lines.push(format!(
            "{} row{} returned ({}ms)",
            count,
            if count == 1 { "" } else { "s" },
            self.result.execution_time.as_millis()
        ));

        lines
    }

    /// Renders the whole table as a single string.
    pub fn render(&self) -> String {
        let mut out = self.render_lines().join("\n");
        out.push('\n');
        out
    }

    fn render_border(widths: &[usize], left: char, mid: char, right: char) -> String {
        let segments: Vec<String> = widths.iter().map(|&w| "─".repeat(w + 2)).collect();
        format!("{left}{}{right}", segments.join(&mid.to_string()))
    }

    fn render_cells(cells: &[String], widths: &[usize]) -> String {
        let mut line = String::from("│");
        for (cell, &width) in cells.iter().zip(widths) {
            let text = Self::truncate(cell, width);
            let pad = width - text.chars().count();
            line.push(' ');
            line.push_str(&text);
            line.push_str(&" ".repeat(pad));
            line.push_str(" │");
        }
        line
    }
}

/// Writes the operator-facing console report.
pub struct ConsoleReport<W: Write> {
    out: W,
}

impl<W: Write> ConsoleReport<W> {
    /// Creates a report that writes to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Prints the banner shown before the run starts.
    pub fn banner(&mut self, config: &PipelineConfig) -> io::Result<()> {
        writeln!(
            self.out,
            "--- Running {} on BigQuery project {} ---",
            config.sql_path.display(),
            config.project_id
        )
    }

    /// Prints the result table.
    pub fn result(&mut self, result: &QueryResult) -> io::Result<()> {
        writeln!(self.out, "\n---- Query Result ---")?;
        write!(self.out, "{}", ConsoleTable::new(result).render())
    }

    /// Prints the success confirmation.
    pub fn saved(&mut self, output_path: &Path) -> io::Result<()> {
        writeln!(
            self.out,
            "\n✅ Results saved successfully at: {}",
            output_path.display()
        )?;
        self.out.flush()
    }

    /// Prints the failure message.
    pub fn failure(&mut self, error: &ReportError) -> io::Result<()> {
        writeln!(self.out, "An error occurred while running the query: {error}")?;
        self.out.flush()
    }

    /// Consumes the report, returning the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}
