use crate::error::{Result, SplitterError};
use crate::partitioner::Partition;
use crate::schema::{Category, Record, FORBIDDEN_NAME_CHARS};
use log::{debug, info};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Records of one (category, bucket) pair, ready to be written as a file.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputUnit<'a> {
    pub name: String,
    pub category: Category,
    pub bucket: &'a str,
    pub records: Vec<&'a Record>,
}

impl<'a> OutputUnit<'a> {
    pub fn file_name(&self) -> String {
        format!("{}.csv", sanitize_file_component(&self.name))
    }

    /// The original columns in input order; the derived category is not written.
    pub fn to_csv_bytes(&self, headers: &[String]) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(headers)?;

        for record in &self.records {
            writer.write_record(record.values())?;
        }

        writer
            .into_inner()
            .map_err(|e| SplitterError::IoError(e.into_error()))
    }
}

pub fn unit_name(base_name: &str, category: Category, bucket: &str) -> String {
    format!("{} - {} - {}", base_name, category.file_label(), bucket)
}

/// One unit per non-empty (category, bucket) pair, by category then bucket order.
pub fn output_units<'a>(partition: &'a Partition, base_name: &str) -> Vec<OutputUnit<'a>> {
    let mut units = Vec::new();

    for category in Category::ALL {
        for slot in &partition.assignment {
            let records: Vec<&Record> = slot
                .records
                .iter()
                .filter(|r| r.category == Some(category))
                .collect();

            if records.is_empty() {
                continue;
            }

            units.push(OutputUnit {
                name: unit_name(base_name, category, &slot.bucket),
                category,
                bucket: slot.bucket.as_str(),
                records,
            });
        }
    }

    units
}

pub fn write_output_units(
    units: &[OutputUnit<'_>],
    headers: &[String],
    dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();

    let rendered = units
        .iter()
        .map(|unit| -> Result<(String, Vec<u8>)> {
            Ok((unit.file_name(), unit.to_csv_bytes(headers)?))
        })
        .collect::<Result<Vec<_>>>()?;

    fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(rendered.len());
    for (file_name, bytes) in rendered {
        let path = dir.join(&file_name);
        fs::write(&path, bytes)?;
        debug!("Wrote {}", path.display());
        written.push(path);
    }

    info!("Wrote {} files to {}", written.len(), dir.display());
    Ok(written)
}

pub fn build_archive(units: &[OutputUnit<'_>], headers: &[String]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for unit in units {
        let bytes = unit.to_csv_bytes(headers)?;
        zip.start_file(unit.file_name(), options)?;
        zip.write_all(&bytes)?;
    }

    Ok(zip.finish()?.into_inner())
}

pub fn archive_file_name(base_name: &str) -> String {
    format!("{}.zip", sanitize_file_component(base_name))
}

pub fn write_archive(
    units: &[OutputUnit<'_>],
    headers: &[String],
    dir: impl AsRef<Path>,
    base_name: &str,
) -> Result<PathBuf> {
    let dir = dir.as_ref();
    let bytes = build_archive(units, headers)?;

    fs::create_dir_all(dir)?;
    let path = dir.join(archive_file_name(base_name));
    fs::write(&path, bytes)?;

    info!("Wrote archive {} with {} files", path.display(), units.len());
    Ok(path)
}

/// Path separators would escape the output directory. Bucket names are rejected
/// upstream, so this only rewrites the base name.
fn sanitize_file_component(name: &str) -> String {
    name.chars()
        .map(|c| if FORBIDDEN_NAME_CHARS.contains(&c) { '_' } else { c })
        .collect()
}
