//! Sales extract acquisition.
//!
//! Provides the `RowSource` trait and its two implementations: a local file
//! and a remote URL. Both accept spreadsheets (read with calamine) and CSV,
//! and both hand back well-formed `SaleRecord`s or an `AcquisitionError`.
//! Row validation happens here so the report core can assume clean input.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde::{Deserialize, Serialize};
use skugap_model::SaleRecord;
use std::future::Future;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from acquiring and parsing a sales extract.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("No data source configured (set a file or a URL)")]
    NoSource,

    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Request failed: {0}")]
    Connection(String),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("Workbook has no worksheets")]
    NoWorksheet,

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("Missing header row")]
    NoHeader,

    #[error("Missing column '{0}'")]
    MissingColumn(String),

    #[error("Row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },
}

/// Trait for sales extract sources (local file, remote URL).
pub trait RowSource {
    /// Fetch and parse every row of the extract.
    fn load(&self) -> impl Future<Output = Result<Vec<SaleRecord>, AcquisitionError>> + Send;

    /// Human-readable location for logging.
    fn describe(&self) -> String;
}

/// Header names of the required columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub product: String,
    pub category: String,
    pub representative: String,
    pub year: String,
    pub month: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            product: "PRODUTO".to_string(),
            category: "CATEGORIA".to_string(),
            representative: "FUNCIONÁRIO".to_string(),
            year: "ANO".to_string(),
            month: "MÊS".to_string(),
        }
    }
}

/// Where the extract comes from. A file takes precedence over a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub file: Option<PathBuf>,
    pub url: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            file: None,
            url: None,
            timeout_secs: 30,
        }
    }
}

/// Tabular encodings the sources understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// xlsx, xlsm, xlsb, xls, ods
    Workbook,
    Csv,
}

impl Format {
    fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(Self::Workbook),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }

    /// Format of a local file, by extension.
    pub fn from_path(path: &Path) -> Result<Self, AcquisitionError> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| AcquisitionError::UnsupportedFormat(path.display().to_string()))
    }

    /// Format of a remote file. URLs without a known extension are
    /// assumed to serve a workbook (spreadsheet exports usually do).
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        path.rsplit('/')
            .next()
            .and_then(|name| name.rsplit_once('.'))
            .and_then(|(_, ext)| Self::from_extension(ext))
            .unwrap_or(Self::Workbook)
    }
}

/// Rewrite share links into direct download links.
///
/// Google Sheets `/spreadsheets/d/<id>/edit` links become an xlsx export and
/// Google Drive `/file/d/<id>/view` links become a direct download. Other
/// URLs are returned unchanged.
pub fn download_url(url: &str) -> String {
    const SHEETS: &str = "docs.google.com/spreadsheets/d/";
    const DRIVE: &str = "drive.google.com/file/d/";

    if let Some((base, id)) = split_document_id(url, SHEETS) {
        return format!("{base}{id}/export?format=xlsx");
    }
    if let Some((_, id)) = split_document_id(url, DRIVE) {
        return format!("https://drive.google.com/uc?export=download&id={id}");
    }
    url.to_string()
}

fn split_document_id<'a>(url: &'a str, marker: &str) -> Option<(&'a str, &'a str)> {
    let start = url.find(marker)? + marker.len();
    let id = url[start..].split(['/', '?', '#']).next()?;
    if id.is_empty() {
        return None;
    }
    Some((&url[..start], id))
}

/// A sales extract on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    columns: ColumnMap,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>, columns: ColumnMap) -> Self {
        Self {
            path: path.into(),
            columns,
        }
    }
}

impl RowSource for FileSource {
    async fn load(&self) -> Result<Vec<SaleRecord>, AcquisitionError> {
        let format = Format::from_path(&self.path)?;

        tracing::info!(path = %self.path.display(), ?format, "Reading sales extract");

        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| AcquisitionError::Io {
                path: self.path.display().to_string(),
                source,
            })?;

        parse_bytes(bytes, format, &self.columns)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// A sales extract served over HTTP(S).
#[derive(Debug, Clone)]
pub struct UrlSource {
    url: String,
    format: Format,
    columns: ColumnMap,
    client: reqwest::Client,
}

impl UrlSource {
    pub fn new(
        url: &str,
        columns: ColumnMap,
        timeout_secs: u64,
    ) -> Result<Self, AcquisitionError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AcquisitionError::Connection(e.to_string()))?;

        let url = download_url(url);
        let format = Format::from_url(&url);

        Ok(Self {
            url,
            format,
            columns,
            client,
        })
    }

    /// The URL actually requested, after share-link rewriting.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl RowSource for UrlSource {
    async fn load(&self) -> Result<Vec<SaleRecord>, AcquisitionError> {
        tracing::info!(url = %self.url, format = ?self.format, "Downloading sales extract");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AcquisitionError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AcquisitionError::HttpStatus {
                status: response.status().as_u16(),
                url: self.url.clone(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AcquisitionError::Connection(e.to_string()))?;

        tracing::debug!(bytes = bytes.len(), "Download complete");

        parse_bytes(bytes.to_vec(), self.format, &self.columns)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Any configured source.
#[derive(Debug, Clone)]
pub enum Source {
    File(FileSource),
    Url(UrlSource),
}

impl Source {
    pub fn from_config(config: &SourceConfig, columns: ColumnMap) -> Result<Self, AcquisitionError> {
        if let Some(path) = &config.file {
            return Ok(Self::File(FileSource::new(path, columns)));
        }
        if let Some(url) = &config.url {
            return Ok(Self::Url(UrlSource::new(url, columns, config.timeout_secs)?));
        }
        Err(AcquisitionError::NoSource)
    }
}

impl RowSource for Source {
    async fn load(&self) -> Result<Vec<SaleRecord>, AcquisitionError> {
        match self {
            Self::File(source) => source.load().await,
            Self::Url(source) => source.load().await,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::File(source) => source.describe(),
            Self::Url(source) => source.describe(),
        }
    }
}

/// A single cell, reduced to what row parsing needs.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

impl Cell {
    fn text(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() {
            Self::Empty
        } else {
            Self::Text(value.to_string())
        }
    }

    fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    fn as_text(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Number(n) if n.fract() == 0.0 && n.is_finite() => Some(format!("{}", *n as i64)),
            Self::Number(n) => Some(n.to_string()),
            Self::Empty => None,
        }
    }

    fn as_year(&self) -> Option<i32> {
        let value = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.parse::<f64>().ok()?,
            Self::Empty => return None,
        };
        if value.fract() != 0.0 || value < i32::MIN as f64 || value > i32::MAX as f64 {
            return None;
        }
        Some(value as i32)
    }
}

/// Header row plus data rows, each tagged with its 1-based sheet row (or
/// file line, for CSV).
#[derive(Debug)]
struct Table {
    headers: Vec<String>,
    rows: Vec<(usize, Vec<Cell>)>,
}

/// Parse an extract already held in memory.
pub fn parse_bytes(
    bytes: Vec<u8>,
    format: Format,
    columns: &ColumnMap,
) -> Result<Vec<SaleRecord>, AcquisitionError> {
    let table = match format {
        Format::Workbook => read_workbook(bytes)?,
        Format::Csv => read_csv(&bytes)?,
    };
    let records = records_from_table(&table, columns)?;

    tracing::debug!(rows = records.len(), "Parsed sales extract");

    Ok(records)
}

fn read_workbook(bytes: Vec<u8>) -> Result<Table, AcquisitionError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| AcquisitionError::Workbook(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(AcquisitionError::NoWorksheet)?
        .map_err(|e| AcquisitionError::Workbook(e.to_string()))?;

    let first_row = range.start().map_or(1, |(row, _)| row as usize + 1);
    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .ok_or(AcquisitionError::NoHeader)?
        .iter()
        .map(|cell| workbook_cell(cell).as_text().unwrap_or_default())
        .collect();
    let rows: Vec<(usize, Vec<Cell>)> = rows
        .enumerate()
        .map(|(offset, row)| (first_row + offset + 1, row.iter().map(workbook_cell).collect()))
        .collect();

    Ok(Table { headers, rows })
}

fn workbook_cell(data: &Data) -> Cell {
    match data {
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        _ => Cell::Empty,
    }
}

fn read_csv(bytes: &[u8]) -> Result<Table, AcquisitionError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AcquisitionError::Csv(e.to_string()))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    // Blank lines and quoted line breaks make record order differ from line numbers
    let mut rows = Vec::new();
    for (offset, result) in reader.records().enumerate() {
        let record = result.map_err(|e| AcquisitionError::Csv(e.to_string()))?;
        let line = record
            .position()
            .map_or(offset + 2, |position| position.line() as usize);
        rows.push((line, record.iter().map(Cell::text).collect()));
    }

    Ok(Table { headers, rows })
}

fn header_key(name: &str) -> String {
    name.trim().to_uppercase()
}

fn column_index(headers: &[String], name: &str) -> Result<usize, AcquisitionError> {
    let wanted = header_key(name);
    headers
        .iter()
        .position(|h| header_key(h) == wanted)
        .ok_or_else(|| AcquisitionError::MissingColumn(name.to_string()))
}

fn records_from_table(table: &Table, columns: &ColumnMap) -> Result<Vec<SaleRecord>, AcquisitionError> {
    if table.headers.iter().all(|h| h.trim().is_empty()) {
        return Err(AcquisitionError::NoHeader);
    }

    let product = column_index(&table.headers, &columns.product)?;
    let category = column_index(&table.headers, &columns.category)?;
    let representative = column_index(&table.headers, &columns.representative)?;
    let year = column_index(&table.headers, &columns.year)?;
    let month = column_index(&table.headers, &columns.month)?;

    let mut records = Vec::with_capacity(table.rows.len());
    let mut blank = 0usize;

    for (row_number, row) in &table.rows {
        let row_number = *row_number;
        if row.iter().all(Cell::is_empty) {
            blank += 1;
            continue;
        }

        let cell = |index: usize| row.get(index).unwrap_or(&Cell::Empty);
        let malformed = |reason: String| AcquisitionError::MalformedRow {
            row: row_number,
            reason,
        };
        let required_text = |index: usize, name: &str| {
            cell(index)
                .as_text()
                .ok_or_else(|| malformed(format!("missing {}", name)))
        };

        let year_value = cell(year)
            .as_year()
            .ok_or_else(|| malformed(format!("invalid {} {:?}", columns.year, cell(year))))?;

        records.push(SaleRecord {
            product_label: required_text(product, &columns.product)?,
            category: cell(category).as_text().unwrap_or_default(),
            representative: required_text(representative, &columns.representative)?,
            year: year_value,
            month_code: required_text(month, &columns.month)?,
        });
    }

    if blank > 0 {
        tracing::warn!(blank, "Skipped blank rows");
    }

    Ok(records)
}
