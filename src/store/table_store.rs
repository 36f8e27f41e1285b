use chrono::NaiveDate;
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument, warn};

use crate::store::{Listing, RawReading, StoreError, VolumeValue};

/// Client for a hosted spreadsheet-style table exposing rows as JSON
///
/// `GET` on the table URL returns an array of row objects and `POST` with a
/// single object appends a row. Row values are loosely typed: numbers often
/// arrive as strings.
#[derive(Clone)]
pub struct TableReadingStore {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl TableReadingStore {
    pub fn new(url: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            api_key,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn list_readings(&self) -> Result<Listing, StoreError> {
        debug!("Sending HTTP request to table backend");
        let response = self
            .authorize(self.client.get(&self.url))
            .send()
            .await
            .map_err(|e| {
                error!("Table backend unreachable: {}", e);
                StoreError::SourceUnavailable(format!("request failed: {}", e))
            })?;
        let status = response.status();
        debug!("Received HTTP response with status: {}", status);
        if !status.is_success() {
            return Err(StoreError::SourceUnavailable(format!(
                "table backend returned {}",
                status
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| StoreError::SourceUnavailable(format!("invalid JSON body: {}", e)))?;
        let rows = body.as_array().ok_or_else(|| {
            StoreError::SourceUnavailable("expected a JSON array of rows".to_string())
        })?;

        let listing = parse_rows(rows);
        if listing.dropped > 0 {
            warn!(
                "Dropped {} rows missing date or volume out of {}",
                listing.dropped,
                rows.len()
            );
        }
        debug!("Parsed {} readings from {} rows", listing.readings.len(), rows.len());
        Ok(listing)
    }

    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn append_reading(&self, date: NaiveDate, volume: f64) -> Result<(), StoreError> {
        let row = json!({
            "date": date.format("%Y-%m-%d").to_string(),
            "volume": volume,
        });

        let response = self
            .authorize(self.client.post(&self.url))
            .json(&row)
            .send()
            .await
            .map_err(|e| {
                error!("Append request failed: {}", e);
                StoreError::WriteRejected(format!("request failed: {}", e))
            })?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!("Table backend rejected append with {}: {}", status, detail);
            return Err(StoreError::WriteRejected(format!(
                "table backend returned {}",
                status
            )));
        }

        info!("Appended reading for {} ({} m³)", date, volume);
        Ok(())
    }
}

/// Keep rows that carry both fields, counting the rest
pub(crate) fn parse_rows(rows: &[Value]) -> Listing {
    let mut listing = Listing::default();

    for (index, row) in rows.iter().enumerate() {
        let date = match row.get("date") {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        let volume = match row.get("volume") {
            Some(Value::Number(n)) => n.as_f64().map(VolumeValue::Number),
            Some(Value::String(s)) if !s.trim().is_empty() => Some(VolumeValue::Text(s.clone())),
            _ => None,
        };

        match (date, volume) {
            (Some(date), Some(volume)) => listing.readings.push(RawReading::new(date, volume)),
            _ => {
                debug!("Row {} is missing date or volume: {}", index, row);
                listing.dropped += 1;
            }
        }
    }

    listing
}
