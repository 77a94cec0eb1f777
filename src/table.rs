// 📋 Table - in-memory tabular data
// Column-name addressable, row iterable. Decoded from CSV or XLSX bytes.

use anyhow::{anyhow, Context, Result};
use calamine::{Data, Reader, Xlsx};
use csv::ReaderBuilder;
use std::io::Cursor;
use tracing::debug;

/// A decoded source table. Missing cells are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn new(name: &str, headers: Vec<String>) -> Self {
        Table {
            name: name.to_string(),
            headers,
            rows: Vec::new(),
        }
    }

    /// Build a table from string literals (missing cells as `None`)
    pub fn from_rows(name: &str, headers: &[&str], rows: Vec<Vec<Option<&str>>>) -> Self {
        let mut table = Table::new(name, headers.iter().map(|h| h.to_string()).collect());
        for row in rows {
            table.push_row(row.into_iter().map(|c| c.map(str::to_string)).collect());
        }
        table
    }

    /// Append a row, padding or truncating it to the header width.
    /// Blank cells and missing-value markers become `None`.
    pub fn push_row(&mut self, row: Vec<Option<String>>) {
        let mut row: Vec<Option<String>> = row
            .into_iter()
            .map(|c| c.and_then(|s| cell_text(&s)))
            .collect();
        row.resize(self.headers.len(), None);
        self.rows.push(row);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Option<String>]> {
        self.rows.iter().map(|r| r.as_slice())
    }

    /// Cell values of one column, by index
    pub fn column(&self, index: usize) -> impl Iterator<Item = Option<&str>> {
        self.rows
            .iter()
            .map(move |r| r.get(index).and_then(|c| c.as_deref()))
    }

    // ========================================================================
    // DECODING
    // ========================================================================

    /// Decode delimited text. Invalid UTF-8 is decoded lossily so that
    /// Latin-1 sources still load (the normalizer knows the U+FFFD forms).
    pub fn from_csv_bytes(name: &str, bytes: &[u8]) -> Result<Self> {
        let delimiter = sniff_delimiter(bytes);
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .byte_headers()
            .with_context(|| format!("Failed to read CSV header of {}", name))?
            .iter()
            .enumerate()
            .map(|(i, h)| header_text(&String::from_utf8_lossy(h), i))
            .collect();

        if headers.is_empty() {
            return Err(anyhow!("CSV source {} has no columns", name));
        }

        let mut table = Table::new(name, headers);

        for (line_num, result) in reader.byte_records().enumerate() {
            let record = result.with_context(|| {
                format!("Failed to parse CSV line {} in {}", line_num + 2, name)
            })?;
            let row = record
                .iter()
                .map(|field| Some(String::from_utf8_lossy(field).into_owned()))
                .collect();
            table.push_row(row);
        }

        debug!(
            source = name,
            delimiter = %(delimiter as char),
            rows = table.len(),
            columns = table.headers.len(),
            "decoded CSV"
        );
        Ok(table)
    }

    /// Decode the first worksheet of an XLSX workbook, first row as header
    pub fn from_xlsx_bytes(name: &str, bytes: &[u8]) -> Result<Self> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes.to_vec()))
            .with_context(|| format!("Failed to open spreadsheet {}", name))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| anyhow!("Spreadsheet {} has no worksheet", name))?
            .with_context(|| format!("Failed to read first worksheet of {}", name))?;

        let mut rows = range.rows();
        let headers: Vec<String> = rows
            .next()
            .ok_or_else(|| anyhow!("Spreadsheet {} is empty", name))?
            .iter()
            .enumerate()
            .map(|(i, cell)| header_text(&data_text(cell).unwrap_or_default(), i))
            .collect();

        let mut table = Table::new(name, headers);
        for row in rows {
            table.push_row(row.iter().map(data_text).collect());
        }

        debug!(source = name, rows = table.len(), "decoded spreadsheet");
        Ok(table)
    }
}

fn header_text(raw: &str, index: usize) -> String {
    let header = raw.trim_start_matches('\u{feff}');
    if header.trim().is_empty() {
        format!("Unnamed: {}", index)
    } else {
        header.to_string()
    }
}

/// Cell contents read as missing (the usual CSV/spreadsheet NA spellings)
pub const MISSING_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_missing_marker(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty() || MISSING_MARKERS.contains(&trimmed)
}

fn cell_text(raw: &str) -> Option<String> {
    if is_missing_marker(raw) {
        None
    } else {
        Some(raw.to_string())
    }
}

fn data_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => cell_text(s),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some(format!("{}", *f as i64)),
        Data::Float(f) => Some(f.to_string()),
        other => Some(other.to_string()),
    }
}

/// Pick ';' over ',' when the header line carries more semicolons
fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let first_line = bytes.split(|b| *b == b'\n').next().unwrap_or(&[]);
    let commas = first_line.iter().filter(|b| **b == b',').count();
    let semicolons = first_line.iter().filter(|b| **b == b';').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

/// Parse a numeric cell. Missing, unparseable or non-finite → None.
pub fn parse_number(cell: Option<&str>) -> Option<f64> {
    cell.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|n| n.is_finite())
}

// ============================================================================
// TESTS
// ============================================================================
