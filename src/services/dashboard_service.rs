use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::export::{self, ExportError};
use crate::store::{Reading, ReadingStore, StoreError};
use crate::summary::{self, PipelineError, SummaryOutcome};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Everything the dashboard shows for one load
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    #[serde(flatten)]
    pub outcome: SummaryOutcome,
    pub dropped: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadingList {
    pub readings: Vec<Reading>,
    pub dropped: usize,
}

#[derive(Clone)]
pub struct DashboardService {
    store: ReadingStore,
}

impl DashboardService {
    pub fn new(store: ReadingStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ReadingStore {
        &self.store
    }

    /// Full read of the backend, coerced and sorted by date
    #[instrument(skip(self))]
    pub async fn readings(&self) -> Result<ReadingList, ServiceError> {
        let listing = self.store.list_readings().await?;
        let readings = summary::prepare(&listing.readings)?;
        debug!(
            "Loaded {} readings ({} dropped)",
            readings.len(),
            listing.dropped
        );
        Ok(ReadingList {
            readings,
            dropped: listing.dropped,
        })
    }

    /// Recompute the summary from scratch
    #[instrument(skip(self))]
    pub async fn load_dashboard(&self) -> Result<Dashboard, ServiceError> {
        let list = self.readings().await?;
        let outcome = summary::outcome_for(&list.readings);
        match &outcome {
            SummaryOutcome::Ok { summary, .. } => info!(
                "Summary over {} readings: total {:.3} m³, mean {:.3} m³",
                summary.reading_count, summary.total, summary.mean
            ),
            SummaryOutcome::Empty => info!("No readings yet"),
        }
        Ok(Dashboard {
            outcome,
            dropped: list.dropped,
        })
    }

    #[instrument(skip(self))]
    pub async fn add_reading(&self, date: NaiveDate, volume: f64) -> Result<Reading, ServiceError> {
        self.store.append_reading(date, volume).await?;
        Ok(Reading { date, volume })
    }

    #[instrument(skip(self))]
    pub async fn export_csv(&self) -> Result<String, ServiceError> {
        let list = self.readings().await?;
        let body = export::to_csv(&list.readings)?;
        debug!("Exported {} readings ({} bytes)", list.readings.len(), body.len());
        Ok(body)
    }
}
