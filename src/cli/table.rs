//! # ASCII Table Formatter
//!
//! Renders `SELECT *` results in the familiar MySQL box style:
//!
//! ```text
//! +------+------------------+
//! | key  | value            |
//! +------+------------------+
//! | 1997 | Titanic          |
//! | 1999 | The Matrix       |
//! +------+------------------+
//! ```
//!
//! Column widths are the maximum of the header and every cell, capped so
//! a single oversized value cannot blow up the layout. Numeric columns
//! are right-aligned, text is left-aligned.

use std::fmt::Write;

const MAX_COLUMN_WIDTH: usize = 60;

pub struct TableFormatter {
    headers: Vec<String>,
    widths: Vec<usize>,
    rows: Vec<Vec<String>>,
    numeric: Vec<bool>,
}

impl TableFormatter {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let mut widths: Vec<usize> = headers.iter().map(|h| h.len().max(1)).collect();
        let mut numeric = vec![true; headers.len()];

        for row in &rows {
            for (i, cell) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(cell.len()).min(MAX_COLUMN_WIDTH);
                    numeric[i] &= cell.parse::<i64>().is_ok();
                }
            }
        }

        Self {
            headers,
            widths,
            rows,
            numeric,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.write_separator(&mut out);
        self.write_row(&mut out, &self.headers, &vec![false; self.headers.len()]);
        self.write_separator(&mut out);
        for row in &self.rows {
            self.write_row(&mut out, row, &self.numeric);
        }
        self.write_separator(&mut out);
        out
    }

    fn write_separator(&self, out: &mut String) {
        for width in &self.widths {
            let _ = write!(out, "+{}", "-".repeat(width + 2));
        }
        out.push_str("+\n");
    }

    fn write_row(&self, out: &mut String, cells: &[String], numeric: &[bool]) {
        for (i, width) in self.widths.iter().enumerate() {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            let cell = truncate(cell, *width);
            if numeric.get(i).copied().unwrap_or(false) {
                let _ = write!(out, "| {:>width$} ", cell, width = width);
            } else {
                let _ = write!(out, "| {:<width$} ", cell, width = width);
            }
        }
        out.push_str("|\n");
    }
}

fn truncate(cell: &str, width: usize) -> String {
    if cell.len() <= width {
        return cell.to_string();
    }
    let cut = cell
        .char_indices()
        .take_while(|(i, c)| i + c.len_utf8() + 3 <= width)
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    format!("{}...", &cell[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_aligned_table() {
        let formatter = TableFormatter::new(
            vec!["key".to_string(), "value".to_string()],
            vec![
                vec!["1".to_string(), "short".to_string()],
                vec!["100".to_string(), "a longer value".to_string()],
            ],
        );

        let rendered = formatter.render();
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "+-----+----------------+");
        assert_eq!(lines[1], "| key | value          |");
        assert_eq!(lines[3], "|   1 | short          |");
        assert_eq!(lines[4], "| 100 | a longer value |");
    }

    #[test]
    fn empty_result_renders_header_only() {
        let formatter =
            TableFormatter::new(vec!["key".to_string(), "value".to_string()], vec![]);
        let rendered = formatter.render();
        assert_eq!(rendered.lines().count(), 4);
    }

    #[test]
    fn oversized_cells_are_truncated() {
        let long = "x".repeat(200);
        let formatter =
            TableFormatter::new(vec!["value".to_string()], vec![vec![long]]);
        let rendered = formatter.render();
        for line in rendered.lines() {
            assert!(line.len() <= MAX_COLUMN_WIDTH + 4);
        }
        assert!(rendered.contains("..."));
    }
}
