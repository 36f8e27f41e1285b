use crate::store::file_store::CSV_HEADER;
use crate::store::Reading;

pub const EXPORT_FILENAME: &str = "water_consumption.csv";
pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV output is not UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Serialize readings as `date,volume` CSV in the order given
pub fn to_csv(readings: &[Reading]) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for reading in readings {
        writer.write_record([
            reading.date.format("%Y-%m-%d").to_string(),
            reading.volume.to_string(),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

pub fn content_disposition() -> String {
    format!("attachment; filename=\"{}\"", EXPORT_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_empty_export_is_header_only() {
        assert_eq!(to_csv(&[]).unwrap(), "date,volume\n");
    }

    #[test]
    fn test_export_rows() {
        let readings = vec![
            Reading {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                volume: 10.0,
            },
            Reading {
                date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
                volume: 12.345,
            },
        ];

        assert_eq!(
            to_csv(&readings).unwrap(),
            "date,volume\n2024-01-01,10\n2024-01-15,12.345\n"
        );
    }

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            content_disposition(),
            "attachment; filename=\"water_consumption.csv\""
        );
    }
}
