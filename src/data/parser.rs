use std::collections::HashMap;

use crate::data::columns;
use crate::data::preamble::Preamble;
use crate::error::NormalizeError;

/// Number of leading lines sampled for delimiter and header detection.
pub const HEADER_SCAN_LINES: usize = 50;

const DELIMITERS: &[u8] = &[b',', b';', b'\t'];

/// One data row of the uploaded file, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    pub fields: Vec<String>,
}

impl RawSample {
    pub fn get(&self, idx: usize) -> Option<&str> {
        self.fields.get(idx).map(|s| s.as_str())
    }
}

/// A tokenized file: metadata preamble, optional header and units rows, and
/// the remaining data rows.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub delimiter: u8,
    pub preamble: Preamble,
    pub headers: Option<Vec<String>>,
    pub units: Option<Vec<String>>,
    pub rows: Vec<RawSample>,
}

impl RawTable {
    /// Semicolon-separated files may write numbers with a decimal comma.
    pub fn decimal_comma(&self) -> bool {
        self.delimiter == b';'
    }
}

/// Parse a cell as a finite number.
pub fn parse_number(cell: &str, decimal_comma: bool) -> Option<f64> {
    let trimmed = cell.trim();
    let value = match trimmed.parse::<f64>() {
        Ok(v) => v,
        Err(_) if decimal_comma && trimmed.matches(',').count() == 1 && !trimmed.contains('.') => {
            trimmed.replace(',', ".").parse::<f64>().ok()?
        }
        Err(_) => return None,
    };
    value.is_finite().then_some(value)
}

/// Pick the delimiter whose most common field count covers the most lines.
pub fn detect_delimiter(text: &str) -> u8 {
    let sample: Vec<&str> = text
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .take(HEADER_SCAN_LINES)
        .collect();

    let mut best = (b',', 0usize);
    for &delim in DELIMITERS {
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for line in &sample {
            let fields = line.split(delim as char).count();
            if fields > 1 {
                *counts.entry(fields).or_insert(0) += 1;
            }
        }
        // Highest coverage; ties go to the wider split so the result is stable.
        let score = counts
            .into_iter()
            .max_by_key(|&(width, c)| (c, width))
            .map(|(_, c)| c)
            .unwrap_or(0);
        if score > best.1 {
            best = (delim, score);
        }
    }
    best.0
}

fn has_number(fields: &[String], decimal_comma: bool) -> bool {
    fields.iter().any(|f| parse_number(f, decimal_comma).is_some())
}

fn is_units_row(fields: &[String]) -> bool {
    let mut cells = fields.iter().map(|f| f.trim()).filter(|f| !f.is_empty()).peekable();
    cells.peek().is_some() && cells.all(columns::is_known_unit)
}

/// Pick the header among the text rows above the first data row.
///
/// The header is the nearest row as wide as the data. When that row is a
/// units row (`Second,Volt`) and the row above it is just as wide, the upper
/// row is the header instead. Anything higher up is a title line.
fn find_header(candidates: &[Vec<String>], data_width: Option<usize>) -> (usize, Option<usize>) {
    let last = candidates.len() - 1;
    let Some(nearest) = candidates
        .iter()
        .rposition(|row| Some(row.len()) == data_width)
    else {
        return (last, None);
    };

    if nearest > 0
        && is_units_row(&candidates[nearest])
        && candidates[nearest - 1].len() == candidates[nearest].len()
    {
        return (nearest - 1, Some(nearest));
    }
    (nearest, None)
}

/// Tokenize delimited text into a [`RawTable`].
pub fn parse_table(text: &str) -> Result<RawTable, NormalizeError> {
    let delimiter = detect_delimiter(text);
    let decimal_comma = delimiter == b';';

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut preamble = Preamble::default();
    let mut body: Vec<Vec<String>> = Vec::new();
    let mut seen_data = false;

    for result in reader.records() {
        let record = result?;
        let fields: Vec<String> = record.iter().map(|s| s.trim().to_string()).collect();
        if fields.iter().all(|f| f.is_empty()) {
            continue;
        }

        if !seen_data {
            let refs: Vec<&str> = fields.iter().map(|s| s.as_str()).collect();
            if let Some((key, value)) = Preamble::metadata_entry(&refs) {
                preamble.push(key, value);
                continue;
            }
            seen_data = has_number(&fields, decimal_comma);
        }
        body.push(fields);
    }

    if body.is_empty() {
        return Err(NormalizeError::Parse("no tabular rows found".to_string()));
    }

    // Rows above the first numeric row are header candidates. Without any
    // numeric row in the scan window the first row is taken as the header.
    let scan = body.len().min(HEADER_SCAN_LINES);
    let first_data = body[..scan]
        .iter()
        .position(|row| has_number(row, decimal_comma))
        .unwrap_or(1);

    let (header_idx, units_idx) = match first_data {
        0 => (None, None),
        n => {
            let (header, units) = find_header(&body[..n], body.get(n).map(|row| row.len()));
            (Some(header), units)
        }
    };

    if let Some(skipped) = header_idx.filter(|&h| h > 0) {
        tracing::debug!("Skipped {} title line(s) above the header", skipped);
    }

    let headers = header_idx.map(|h| body[h].clone());
    let units = units_idx.map(|u| body[u].clone());
    let data_start = units_idx.or(header_idx).map_or(0, |i| i + 1);

    let rows = body
        .split_off(data_start)
        .into_iter()
        .map(|fields| RawSample { fields })
        .collect();

    Ok(RawTable {
        delimiter,
        preamble,
        headers,
        units,
        rows,
    })
}
