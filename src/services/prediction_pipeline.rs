use chrono::Timelike;

use crate::error::AppError;
use crate::models::forecast::{FeatureVector, HourlyForecastRecord, PredictionRecord};
use crate::services::model_loader::GenerationModel;

fn require(value: Option<f64>, record: &HourlyForecastRecord, field: &'static str) -> Result<f64, AppError> {
    value.ok_or_else(|| AppError::FeatureIncomplete {
        time: record.time.format("%Y-%m-%dT%H:%M").to_string(),
        field,
    })
}

/// Hour of the local timestamp, always in `0..=23`.
pub fn hour_of_day(record: &HourlyForecastRecord) -> u32 {
    record.time.hour()
}

/// Build the ten-column model input for one row.
/// A missing measurement fails with [`AppError::FeatureIncomplete`].
pub fn feature_vector(record: &HourlyForecastRecord, lat: f64, lon: f64) -> Result<FeatureVector, AppError> {
    Ok(FeatureVector([
        require(record.temperature, record, "temperature_2m")?,
        require(record.relative_humidity, record, "relative_humidity_2m")?,
        require(record.rain, record, "rain")?,
        require(record.cloud_cover, record, "cloud_cover")?,
        require(record.wind_speed_10m, record, "wind_speed_10m")?,
        require(record.wind_speed_100m, record, "wind_speed_100m")?,
        require(record.direct_radiation, record, "direct_radiation")?,
        f64::from(hour_of_day(record)),
        lat,
        lon,
    ]))
}

/// Attach a generation estimate to every hourly row.
///
/// All-or-nothing: one incomplete row fails the whole batch, and the model is
/// called exactly once with every row.
pub fn enrich(
    records: Vec<HourlyForecastRecord>,
    lat: f64,
    lon: f64,
    model: &dyn GenerationModel,
) -> Result<Vec<PredictionRecord>, AppError> {
    let features = records
        .iter()
        .map(|r| feature_vector(r, lat, lon))
        .collect::<Result<Vec<_>, _>>()?;

    let predictions = model.predict(&features);
    if predictions.len() != records.len() {
        return Err(AppError::PredictionMismatch {
            expected: records.len(),
            actual: predictions.len(),
        });
    }

    Ok(records
        .into_iter()
        .zip(predictions)
        .map(|(forecast, predicted_generation)| PredictionRecord { forecast, predicted_generation })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::forecast::{feature_index, FEATURE_NAMES};
    use crate::services::model_loader::ModelMetadata;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::sync::Mutex;

    /// Predicts `100 * hour + wind_100m` and records every batch it receives.
    struct Recording {
        metadata: ModelMetadata,
        batches: Mutex<Vec<Vec<FeatureVector>>>,
    }

    impl Recording {
        fn new() -> Self {
            Self {
                metadata: ModelMetadata {
                    model_id: "recording".into(),
                    version: None,
                    trained_at: None,
                    feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
                    target: None,
                },
                batches: Mutex::new(Vec::new()),
            }
        }
    }

    impl GenerationModel for Recording {
        fn predict(&self, rows: &[FeatureVector]) -> Vec<f64> {
            self.batches.lock().unwrap().push(rows.to_vec());
            rows.iter()
                .map(|r| 100.0 * r.get(feature_index::HOUR) + r.get(feature_index::WIND_100M))
                .collect()
        }

        fn metadata(&self) -> &ModelMetadata {
            &self.metadata
        }
    }

    struct Truncating(ModelMetadata);

    impl GenerationModel for Truncating {
        fn predict(&self, rows: &[FeatureVector]) -> Vec<f64> {
            vec![0.0; rows.len().saturating_sub(1)]
        }

        fn metadata(&self) -> &ModelMetadata {
            &self.0
        }
    }

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap().and_hms_opt(hour, 0, 0).unwrap()
    }

    fn record(hour: u32, wind_100m: f64) -> HourlyForecastRecord {
        HourlyForecastRecord {
            time: at(hour),
            temperature: Some(15.0),
            relative_humidity: Some(70.0),
            rain: Some(0.0),
            cloud_cover: Some(40.0),
            wind_speed_10m: Some(wind_100m * 0.6),
            wind_speed_100m: Some(wind_100m),
            direct_radiation: Some(120.0),
        }
    }

    #[test]
    fn test_feature_order_matches_contract() {
        let x = feature_vector(&record(13, 9.0), -33.45, -70.66).unwrap();
        assert_eq!(
            x.values(),
            &[15.0, 70.0, 0.0, 40.0, 9.0 * 0.6, 9.0, 120.0, 13.0, -33.45, -70.66]
        );
    }

    #[test]
    fn test_hour_of_day_tracks_local_hour() {
        for h in 0..24 {
            let hour = hour_of_day(&record(h, 1.0));
            assert_eq!(hour, h);
            assert!(hour <= 23);
        }
    }

    #[test]
    fn test_enrich_is_one_to_one_and_ordered() {
        let model = Recording::new();
        let records: Vec<_> = (0..24).map(|h| record(h, h as f64 * 0.5)).collect();
        let out = enrich(records.clone(), -33.45, -70.66, &model).unwrap();

        assert_eq!(out.len(), 24);
        for (h, (pred, input)) in out.iter().zip(&records).enumerate() {
            assert_eq!(&pred.forecast, input);
            assert_eq!(pred.predicted_generation, 100.0 * h as f64 + h as f64 * 0.5);
        }
        let batches = model.batches.lock().unwrap();
        assert_eq!(batches.len(), 1, "model must be called once per run");
        assert_eq!(batches[0].len(), 24);
    }

    #[test]
    fn test_missing_measurement_fails_whole_batch() {
        let model = Recording::new();
        let mut records: Vec<_> = (0..5).map(|h| record(h, 5.0)).collect();
        records[3].cloud_cover = None;

        let err = enrich(records, 0.0, 0.0, &model).unwrap_err();
        match err {
            AppError::FeatureIncomplete { time, field } => {
                assert_eq!(time, "2025-03-01T03:00");
                assert_eq!(field, "cloud_cover");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(model.batches.lock().unwrap().is_empty(), "no partial prediction");
    }

    #[test]
    fn test_empty_forecast_yields_empty_predictions() {
        let out = enrich(Vec::new(), 0.0, 0.0, &Recording::new()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_short_model_output_is_rejected() {
        let model = Truncating(Recording::new().metadata);
        let err = enrich(vec![record(0, 1.0), record(1, 1.0)], 0.0, 0.0, &model).unwrap_err();
        assert!(matches!(err, AppError::PredictionMismatch { expected: 2, actual: 1 }));
    }
}
