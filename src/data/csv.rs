use std::collections::HashMap;
use std::io::BufRead;

use crate::error::{Error, Result};

/// Reads comma-separated numeric rows from `reader`.
///
/// `skip_header_lines` lines are dropped from the top of the input, and
/// `skip_columns` drops cells by their position in the raw row. A cell
/// exactly matching a key in `conversion_rules` takes the mapped value
/// instead of being parsed; everything else must parse as a number. Rows
/// left without any cells are dropped.
///
/// # Arguments
/// - `reader`: line-oriented input, typically a `BufReader` over a file
/// - `skip_header_lines`: number of leading lines to ignore
/// - `skip_columns`: zero-based column indices to drop from every row
/// - `conversion_rules`: literal cell values mapped to numeric codes
pub fn parse_csv<R: BufRead>(
    reader: R,
    skip_header_lines: usize,
    skip_columns: &[usize],
    conversion_rules: &HashMap<String, f64>,
) -> Result<Vec<Vec<f64>>> {
    let mut rows = Vec::new();

    for (line_index, line) in reader.lines().enumerate() {
        let line = line.map_err(|err| Error::Data(format!("row {}: {err}", line_index + 1)))?;
        if line_index < skip_header_lines {
            continue;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut row = Vec::new();
        for (column, cell) in line.split(',').enumerate() {
            if skip_columns.contains(&column) {
                continue;
            }
            if let Some(&value) = conversion_rules.get(cell) {
                row.push(value);
                continue;
            }
            let value: f64 = cell.trim().parse().map_err(|_| {
                Error::Data(format!(
                    "row {}: '{}' is not a number and has no conversion rule",
                    line_index + 1,
                    cell
                ))
            })?;
            row.push(value);
        }

        if !row.is_empty() {
            rows.push(row);
        }
    }

    Ok(rows)
}
