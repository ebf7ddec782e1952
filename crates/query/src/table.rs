//! Flattening query results into a printable table.

use crate::FilterResponse;
use serde_json::Value;

/// Placeholder for null or missing cells.
pub const MISSING_CELL: &str = "N/A";

/// Compositions laid out as rows under title-cased headers.
///
/// Columns follow the keys of the first composition; later records that lack a column get
/// [`MISSING_CELL`] and extra keys they carry are not shown.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ResultTable {
    pub fn from_response(response: &FilterResponse) -> Self {
        let Some(first) = response.compositions.first() else {
            return Self::default();
        };

        let columns: Vec<String> = first.keys().cloned().collect();
        let headers = columns.iter().map(|c| title_case(c)).collect();
        let rows = response
            .compositions
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|column| render_cell(record.get(column)))
                    .collect()
            })
            .collect();

        Self {
            columns,
            headers,
            rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Renders the table as aligned plain text, one line per row.
    pub fn to_text(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let line = |cells: &[String]| -> String {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, &width)| format!("{cell:<width$}"))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut out = vec![line(&self.headers)];
        out.extend(self.rows.iter().map(|row| line(row)));
        out.join("\n")
    }
}

/// `startDate` → `Start Date`. A space goes before every upper-case letter, then the first
/// character is upper-cased.
pub fn title_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for ch in key.chars() {
        if ch.is_uppercase() {
            out.push(' ');
        }
        out.push(ch);
    }

    let mut chars = out.trim_start().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn render_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => MISSING_CELL.to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}
