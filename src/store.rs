pub mod error;
pub mod file_store;
pub mod models;
pub mod table_store;

pub use error::StoreError;
pub use file_store::FileReadingStore;
pub use models::*;
pub use table_store::TableReadingStore;

use chrono::NaiveDate;

use crate::config::DataSource;

/// Source of truth for readings, selected by configuration
#[derive(Clone)]
pub enum ReadingStore {
    File(FileReadingStore),
    Table(TableReadingStore),
}

impl ReadingStore {
    pub fn from_source(source: &DataSource) -> Self {
        match source {
            DataSource::File { path } => Self::File(FileReadingStore::new(path.clone())),
            DataSource::Table { url, api_key } => {
                Self::Table(TableReadingStore::new(url.clone(), api_key.clone()))
            }
        }
    }

    /// List every reading the backend holds, dropping records missing a field
    pub async fn list_readings(&self) -> Result<Listing, StoreError> {
        match self {
            Self::File(store) => store.list_readings().await,
            Self::Table(store) => store.list_readings().await,
        }
    }

    pub async fn append_reading(&self, date: NaiveDate, volume: f64) -> Result<(), StoreError> {
        match self {
            Self::File(store) => store.append_reading(date, volume).await,
            Self::Table(store) => store.append_reading(date, volume).await,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::File(store) => format!("CSV file {}", store.path().display()),
            Self::Table(store) => format!("hosted table {}", store.url()),
        }
    }
}
