use thiserror::Error;

/// Opaque OAuth access token. A fresh one is fetched for every pipeline run.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken([redacted])")
    }
}

/// A database-ready cell after coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    Null,
    Int(i64),
    Text(String),
}

/// Coerce one raw CSV cell.
///
/// - `""` becomes [`CellValue::Null`]
/// - a non-empty string of ASCII digits becomes [`CellValue::Int`]
/// - anything else is kept as [`CellValue::Text`]
///
/// Digit strings too large for `i64` stay text rather than failing the load.
#[must_use]
pub fn coerce_cell(raw: &str) -> CellValue {
    if raw.is_empty() {
        return CellValue::Null;
    }
    if raw.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(n) = raw.parse::<i64>() {
            return CellValue::Int(n);
        }
    }
    CellValue::Text(raw.to_string())
}

/// Turn a CSV header into a quoted MySQL identifier.
///
/// Spaces become underscores and the result is wrapped in backticks, with any
/// embedded backtick doubled. Already-quoted input passes through unchanged.
#[must_use]
pub fn sanitize_identifier(header: &str) -> String {
    if is_quoted_identifier(header) {
        return header.to_string();
    }
    let body = header.replace(' ', "_").replace('`', "``");
    format!("`{body}`")
}

/// True when `s` is a single backtick-quoted identifier whose inner backticks
/// are all doubled and which contains no spaces.
fn is_quoted_identifier(s: &str) -> bool {
    let Some(inner) = s
        .strip_prefix('`')
        .and_then(|rest| rest.strip_suffix('`'))
    else {
        return false;
    };
    if inner.is_empty() || inner.contains(' ') {
        return false;
    }
    inner.replace("``", "").find('`').is_none()
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShapeError {
    #[error("report has {headers} columns but the table schema expects {expected}")]
    ColumnCount { headers: usize, expected: usize },

    #[error("row {row} has {found} cells, expected {expected}")]
    RowWidth {
        row: usize,
        found: usize,
        expected: usize,
    },
}

/// Header names plus data rows, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedReport {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ParsedReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sanitized column identifiers in header order.
    #[must_use]
    pub fn column_identifiers(&self) -> Vec<String> {
        self.headers.iter().map(|h| sanitize_identifier(h)).collect()
    }

    /// Rows with every cell coerced for insertion.
    #[must_use]
    pub fn coerced_rows(&self) -> Vec<Vec<CellValue>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|cell| coerce_cell(cell)).collect())
            .collect()
    }

    /// Check that the report fits a positional schema of `expected_columns`.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::ColumnCount`] when the header count differs from
    /// the schema, or [`ShapeError::RowWidth`] for the first row (1-based)
    /// whose width differs from the header count.
    pub fn check_shape(&self, expected_columns: usize) -> Result<(), ShapeError> {
        if self.headers.len() != expected_columns {
            return Err(ShapeError::ColumnCount {
                headers: self.headers.len(),
                expected: expected_columns,
            });
        }
        if let Some((idx, row)) = self
            .rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != self.headers.len())
        {
            return Err(ShapeError::RowWidth {
                row: idx + 1,
                found: row.len(),
                expected: self.headers.len(),
            });
        }
        Ok(())
    }
}
