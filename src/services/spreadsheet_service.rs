use std::path::Path;

use calamine::{open_workbook, Data, Range, Reader, Xls};
use chrono::NaiveDateTime;
use tracing::debug;

use crate::error::DecodeError;
use crate::models::content::DecodedContent;
use crate::services::format_reader::TRUNCATION_MARKER;

const CELL_SEPARATOR: &str = "\t";
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One spreadsheet cell, already classified. A formula carries its cached
/// result as another `CellValue` so the same renderer handles both.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CellValue {
    Text(String),
    Numeric {
        value: f64,
        as_date: Option<NaiveDateTime>,
    },
    Boolean(bool),
    Formula {
        expression: String,
        cached: Box<CellValue>,
    },
    Error(String),
    Blank,
}

impl CellValue {
    pub(crate) fn from_cell(data: &Data, formula: Option<&str>) -> Self {
        let value = match data {
            Data::String(s) => Self::Text(s.clone()),
            Data::Float(f) => Self::Numeric {
                value: *f,
                as_date: None,
            },
            Data::Int(i) => Self::Numeric {
                value: *i as f64,
                as_date: None,
            },
            Data::Bool(b) => Self::Boolean(*b),
            Data::DateTime(dt) => Self::Numeric {
                value: dt.as_f64(),
                as_date: dt.as_datetime(),
            },
            Data::DateTimeIso(s) | Data::DurationIso(s) => Self::Text(s.clone()),
            Data::Error(e) => Self::Error(e.to_string()),
            Data::Empty => Self::Blank,
        };

        match formula.filter(|f| !f.is_empty()) {
            Some(expression) => Self::Formula {
                expression: expression.to_string(),
                cached: Box::new(value),
            },
            None => value,
        }
    }

    /// `None` for blank cells.
    pub(crate) fn render(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Numeric {
                as_date: Some(date),
                ..
            } => Some(date.format(DATE_FORMAT).to_string()),
            // Debug keeps the trailing ".0" on integral values.
            Self::Numeric { value, .. } => Some(format!("{value:?}")),
            Self::Boolean(b) => Some(b.to_string()),
            Self::Formula { expression, cached } => match cached.as_ref() {
                Self::Blank => Some(format!("[Formula: {expression}]")),
                Self::Error(code) => Some(format!("[Formula Error: {code}]")),
                other => other.render(),
            },
            Self::Error(code) => Some(format!("[Cell Error: {code}]")),
            Self::Blank => None,
        }
    }
}

/// Renders at most `max_rows` rows of `values`, tab-separated. A row with no
/// rendered cells still counts toward the cap but emits nothing. Reaching the
/// cap appends the marker.
pub(crate) fn render_rows(
    values: &Range<Data>,
    formulas: Option<&Range<String>>,
    max_rows: usize,
) -> Result<DecodedContent, DecodeError> {
    let mut out = String::new();
    let Some((start_row, start_col)) = values.start() else {
        return Ok(DecodedContent::complete(out));
    };

    let mut counted = 0usize;
    for (row_offset, row) in values.rows().enumerate() {
        if counted >= max_rows {
            break;
        }
        counted += 1;
        let abs_row = start_row + row_offset as u32;

        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(col_offset, data)| {
                let formula = formulas
                    .and_then(|f| f.get_value((abs_row, start_col + col_offset as u32)))
                    .map(String::as_str);
                CellValue::from_cell(data, formula)
                    .render()
                    .unwrap_or_default()
            })
            .collect();

        let Some(last) = cells.iter().rposition(|c| !c.is_empty()) else {
            continue;
        };
        let line = cells[..=last].join(CELL_SEPARATOR);
        out.try_reserve(line.len() + 1)?;
        out.push_str(&line);
        out.push('\n');
    }

    if counted >= max_rows {
        out.try_reserve(TRUNCATION_MARKER.len())?;
        out.push_str(TRUNCATION_MARKER);
        return Ok(DecodedContent::truncated(out));
    }
    Ok(DecodedContent::complete(out))
}

/// First sheet only. The workbook and its file handle are released when this
/// returns, on every path.
pub fn extract_text(path: &Path, max_rows: usize) -> Result<DecodedContent, DecodeError> {
    let mut workbook = open_workbook::<Xls<_>, _>(path)
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let Some(sheet_name) = workbook.sheet_names().first().cloned() else {
        return Err(DecodeError::NoSheets);
    };

    let values = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;
    let formulas = match workbook.worksheet_formula(&sheet_name) {
        Ok(range) => Some(range),
        Err(e) => {
            debug!(sheet = %sheet_name, error = %e, "formulas unavailable, using cached values");
            None
        }
    };

    render_rows(&values, formulas.as_ref(), max_rows)
}
