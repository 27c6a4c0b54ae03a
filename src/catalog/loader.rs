//! CSV item source.
//!
//! Columns are located by header name. The name column and every feature
//! column are required; metadata columns are optional. Header lookup is exact
//! first, then case-insensitive.

use crate::config::DatasetConfig;
use crate::models::{ItemMetadata, RawItem};
use crate::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read};

/// Column indices resolved from the CSV headers.
#[derive(Debug)]
struct ColumnMap {
    name: usize,
    features: Vec<usize>,
    released_date: Option<usize>,
    singer: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord, config: &DatasetConfig) -> Result<Self> {
        let find = |wanted: &str| {
            headers
                .iter()
                .position(|h| h.trim() == wanted)
                .or_else(|| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(wanted)))
        };

        let name = find(&config.name_column).ok_or_else(|| {
            Error::Data(format!(
                "dataset has no '{}' column",
                config.name_column
            ))
        })?;

        let features = config
            .feature_columns
            .iter()
            .map(|column| {
                find(column)
                    .ok_or_else(|| Error::Data(format!("dataset has no feature column '{column}'")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name,
            features,
            released_date: find(&config.released_date_column),
            singer: find(&config.singer_column),
        })
    }
}

/// Loads items from the CSV file named by `config.path`.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be opened or read and
/// [`Error::Data`] if a required column is missing.
pub fn load_items(config: &DatasetConfig) -> Result<Vec<RawItem>> {
    let file = File::open(&config.path)
        .map_err(|e| Error::io("open_dataset", format!("{}: {e}", config.path.display())))?;
    let items = read_items(BufReader::new(file), config)?;
    tracing::info!(
        path = %config.path.display(),
        rows = items.len(),
        "Loaded song dataset"
    );
    Ok(items)
}

/// Reads items from any CSV reader.
///
/// Rows with an empty name are skipped. Feature cells that are empty, `NaN`
/// or not numeric are recorded as missing.
///
/// # Errors
///
/// Returns [`Error::Io`] on malformed CSV and [`Error::Data`] if a required
/// column is missing.
pub fn read_items<R: Read>(reader: R, config: &DatasetConfig) -> Result<Vec<RawItem>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| Error::io("read_csv_headers", e))?
        .clone();
    let columns = ColumnMap::from_headers(&headers, config)?;

    let mut items = Vec::new();
    let mut skipped = 0usize;
    for record in csv_reader.records() {
        let record = record.map_err(|e| Error::io("read_csv", e))?;

        let Some(name) = text_field(&record, Some(columns.name)) else {
            skipped += 1;
            continue;
        };

        let features = columns
            .features
            .iter()
            .map(|&i| record.get(i).and_then(parse_feature))
            .collect();

        items.push(RawItem {
            name,
            features,
            metadata: ItemMetadata {
                released_date: text_field(&record, columns.released_date),
                singer: text_field(&record, columns.singer),
            },
        });
    }

    if skipped > 0 {
        tracing::warn!(skipped, "Skipped dataset rows without a song name");
    }

    Ok(items)
}

fn text_field(record: &csv::StringRecord, index: Option<usize>) -> Option<String> {
    index
        .and_then(|i| record.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn parse_feature(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
