//! CSV decoding for report exports.

use thiserror::Error;

use crate::types::ParsedReport;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("report body is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("report body has no header row")]
    MissingHeader,
}

/// Decode a CSV export into headers and rows.
///
/// The first record is the header. Rows are kept in source order and, when
/// `row_limit` is set, truncated to the first `row_limit` records. Rows whose
/// width differs from the header are accepted here; the load stage rejects
/// them against the table schema.
///
/// # Errors
///
/// Returns [`ParseError::Utf8`] for non-UTF-8 input, [`ParseError::Csv`] for
/// unreadable records, and [`ParseError::MissingHeader`] for empty input.
pub fn parse_report(bytes: &[u8], row_limit: Option<usize>) -> Result<ParsedReport, ParseError> {
    let text = std::str::from_utf8(bytes)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = rdr.records();
    let headers: Vec<String> = match records.next() {
        Some(record) => record?.iter().map(str::to_owned).collect(),
        None => return Err(ParseError::MissingHeader),
    };

    let limit = row_limit.unwrap_or(usize::MAX);
    let mut rows = Vec::new();
    for record in records.take(limit) {
        let record = record?;
        rows.push(record.iter().map(str::to_owned).collect());
    }

    Ok(ParsedReport { headers, rows })
}
