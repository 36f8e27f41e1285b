use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::store::{Listing, RawReading, StoreError, VolumeValue};

pub const CSV_HEADER: [&str; 2] = ["date", "volume"];

#[derive(Clone)]
pub struct FileReadingStore {
    path: PathBuf,
}

impl FileReadingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn list_readings(&self) -> Result<Listing, StoreError> {
        debug!("Reading CSV file");
        let content = match tokio::fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("Readings file does not exist yet, treating as empty");
                return Ok(Listing::default());
            }
            Err(e) => {
                return Err(StoreError::SourceUnavailable(format!(
                    "cannot read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };
        debug!("Read {} bytes", content.len());

        let listing = parse_csv(&content)?;
        if listing.dropped > 0 {
            warn!(
                "Dropped {} records missing date or volume out of {}",
                listing.dropped,
                listing.dropped + listing.readings.len()
            );
        }
        debug!("Parsed {} readings", listing.readings.len());
        Ok(listing)
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn append_reading(&self, date: NaiveDate, volume: f64) -> Result<(), StoreError> {
        let reject = |e: &dyn std::fmt::Display| {
            StoreError::WriteRejected(format!("cannot append to {}: {}", self.path.display(), e))
        };

        let existing = match tokio::fs::read(&self.path).await {
            Ok(content) => Some(content),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(reject(&e)),
        };

        let mut bytes = Vec::new();
        match existing.as_deref() {
            None | Some([]) => {
                debug!("Writing CSV header to new file");
                bytes = csv_line(&CSV_HEADER).map_err(|e| reject(&e))?;
            }
            Some(content) if !content.ends_with(b"\n") => bytes.push(b'\n'),
            Some(_) => {}
        }
        let row = [date.format("%Y-%m-%d").to_string(), volume.to_string()];
        bytes.extend(csv_line(&row).map_err(|e| reject(&e))?);

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| reject(&e))?;
        file.write_all(&bytes).await.map_err(|e| reject(&e))?;
        file.flush().await.map_err(|e| reject(&e))?;

        info!("Appended reading for {} ({} m³)", date, volume);
        Ok(())
    }
}

fn csv_line<T: AsRef<[u8]>>(fields: &[T]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(fields)?;
    writer.into_inner().map_err(|e| e.into_error().into())
}

/// Parse a `date,volume` CSV document, keeping blank-or-missing cells out
pub(crate) fn parse_csv(content: &[u8]) -> Result<Listing, StoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content);

    let headers = reader
        .headers()
        .map_err(|e| StoreError::SourceUnavailable(format!("unreadable CSV header: {}", e)))?
        .clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|header| header.eq_ignore_ascii_case(name))
    };
    let date_column = column("date");
    let volume_column = column("volume");
    if date_column.is_none() || volume_column.is_none() {
        warn!("CSV header {:?} lacks a date or volume column", headers);
    }

    let mut listing = Listing::default();
    for (row, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping unreadable CSV row {}: {}", row + 1, e);
                listing.dropped += 1;
                continue;
            }
        };

        let cell = |index: Option<usize>| {
            index
                .and_then(|i| record.get(i))
                .filter(|value| !value.is_empty())
        };
        match (cell(date_column), cell(volume_column)) {
            (Some(date), Some(volume)) => listing.readings.push(RawReading::new(
                date,
                VolumeValue::Text(volume.to_string()),
            )),
            _ => {
                debug!("Row {} is missing date or volume: {:?}", row + 1, record);
                listing.dropped += 1;
            }
        }
    }

    Ok(listing)
}
