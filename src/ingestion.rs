use crate::classifier::Classifier;
use crate::error::{Result, SplitterError};
use crate::schema::{Record, SplitterConfig};
use log::{debug, info, warn};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Parsed prospect file: header row plus classified records.
#[derive(Debug, Clone, PartialEq)]
pub struct ProspectTable {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
}

impl ProspectTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub fn read_prospects<R: Read>(reader: R, config: &SplitterConfig) -> Result<ProspectTable> {
    read_prospects_with(reader, &config.title_field, &Classifier::default())
}

pub fn load_prospects(path: impl AsRef<Path>, config: &SplitterConfig) -> Result<ProspectTable> {
    let path = path.as_ref();
    info!("Reading prospects from {}", path.display());
    let file = File::open(path)?;
    read_prospects(file, config)
}

pub fn read_prospects_with<R: Read>(
    reader: R,
    title_field: &str,
    classifier: &Classifier,
) -> Result<ProspectTable> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let title_idx = headers
        .iter()
        .position(|h| h == title_field)
        .ok_or_else(|| SplitterError::MissingColumn(title_field.to_string()))?;

    let mut records = Vec::new();
    for (idx, row) in csv_reader.records().enumerate() {
        let row = row?;

        if row.len() > headers.len() {
            // 1-based file line, so the header is line 1.
            let line = row
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(idx + 2);
            return Err(SplitterError::ValidationError {
                record: line,
                details: format!(
                    "line {} has {} fields but the header has {}",
                    line,
                    row.len(),
                    headers.len()
                ),
            });
        }

        let fields: Vec<(String, String)> = headers
            .iter()
            .enumerate()
            .map(|(col, name)| (name.clone(), row.get(col).unwrap_or("").to_string()))
            .collect();

        let category = classifier.classify(&fields[title_idx].1);
        records.push(Record::new(fields).with_category(category));
    }

    if records.is_empty() {
        warn!("Prospect file has a header but no data rows");
    }

    info!(
        "Read {} prospects with {} columns",
        records.len(),
        headers.len()
    );
    debug!("Title column '{}' at index {}", title_field, title_idx);

    Ok(ProspectTable { headers, records })
}
