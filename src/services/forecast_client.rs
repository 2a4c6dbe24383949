use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use crate::config::ForecastConfig;
use crate::error::AppError;
use crate::models::forecast::{ForecastResponse, HourlyBlock, HourlyForecastRecord, HOURLY_VARIABLES};

const FORECAST_PATH: &str = "/v1/forecast";

/// Open-Meteo hourly forecast client. Every call hits the network; nothing is cached.
#[derive(Debug, Clone)]
pub struct ForecastClient {
    client: Client,
    base_url: String,
    max_retries: u32,
    retry_backoff: Duration,
}

/// Outcome of a single HTTP attempt.
enum Attempt {
    Done(Vec<HourlyForecastRecord>),
    Retryable(String),
}

impl ForecastClient {
    pub fn new(cfg: &ForecastConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_seconds))
            .build()
            .map_err(|e| AppError::ForecastUnavailable(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            max_retries: cfg.max_retries,
            retry_backoff: Duration::from_millis(cfg.retry_backoff_ms),
        })
    }

    /// Hourly forecast for `(lat, lon)` over `[start, end]`, in the location's local time.
    pub async fn fetch(
        &self,
        lat: f64,
        lon: f64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<HourlyForecastRecord>, AppError> {
        let mut last_error = String::new();
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, error = %last_error, "retrying forecast request");
                tokio::time::sleep(self.retry_backoff).await;
            }
            match self.attempt(lat, lon, start, end).await? {
                Attempt::Done(records) => {
                    info!(lat, lon, %start, %end, hours = records.len(), "forecast fetched");
                    return Ok(records);
                }
                Attempt::Retryable(reason) => last_error = reason,
            }
        }
        Err(AppError::ForecastUnavailable(last_error))
    }

    async fn attempt(
        &self,
        lat: f64,
        lon: f64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Attempt, AppError> {
        let url = format!("{}{}", self.base_url, FORECAST_PATH);
        debug!(%url, lat, lon, %start, %end, "requesting forecast");

        let request = self.client.get(&url).query(&[
            ("latitude", lat.to_string()),
            ("longitude", lon.to_string()),
            ("hourly", HOURLY_VARIABLES.join(",")),
            ("start_date", start.to_string()),
            ("end_date", end.to_string()),
            ("timezone", "auto".to_string()),
        ]);

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => return Ok(Attempt::Retryable(format!("request timed out: {}", e))),
            Err(e) => return Ok(Attempt::Retryable(format!("request failed: {}", e))),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = format!("HTTP {}{}", status.as_u16(), api_reason(&body));
            if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                return Ok(Attempt::Retryable(reason));
            }
            return Err(AppError::ForecastUnavailable(reason));
        }

        // reqwest reports a cut-off body as a decode error, so read and parse separately.
        let bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) => return Ok(Attempt::Retryable(format!("reading forecast body failed: {}", e))),
        };
        let payload: ForecastResponse = serde_json::from_slice(&bytes)
            .map_err(|e| AppError::ForecastUnavailable(format!("malformed forecast payload: {}", e)))?;

        if let Some(tz) = &payload.timezone {
            debug!(timezone = %tz, utc_offset_seconds = ?payload.utc_offset_seconds, "forecast timezone");
        }

        let hourly = payload
            .hourly
            .ok_or_else(|| AppError::ForecastUnavailable("response has no hourly block".into()))?;
        parse_hourly(hourly).map(Attempt::Done)
    }
}

/// Open-Meteo reports request errors as `{"error": true, "reason": "..."}`.
fn api_reason(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("reason").and_then(|r| r.as_str()).map(|r| format!(": {}", r)))
        .unwrap_or_default()
}

fn parse_time(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

/// Turn the column-oriented payload into rows. Columns must all have the same length.
pub fn parse_hourly(block: HourlyBlock) -> Result<Vec<HourlyForecastRecord>, AppError> {
    let n = block.time.len();
    let columns = [
        ("temperature_2m", block.temperature_2m.len()),
        ("relative_humidity_2m", block.relative_humidity_2m.len()),
        ("rain", block.rain.len()),
        ("cloud_cover", block.cloud_cover.len()),
        ("wind_speed_10m", block.wind_speed_10m.len()),
        ("wind_speed_100m", block.wind_speed_100m.len()),
        ("direct_radiation", block.direct_radiation.len()),
    ];
    if let Some((name, len)) = columns.iter().find(|(_, len)| *len != n) {
        return Err(AppError::ForecastUnavailable(format!(
            "hourly column `{}` has {} values, expected {}",
            name, len, n
        )));
    }

    block
        .time
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let time = parse_time(raw).ok_or_else(|| {
                AppError::ForecastUnavailable(format!("unparseable timestamp `{}`", raw))
            })?;
            Ok(HourlyForecastRecord {
                time,
                temperature: block.temperature_2m[i],
                relative_humidity: block.relative_humidity_2m[i],
                rain: block.rain[i],
                cloud_cover: block.cloud_cover[i],
                wind_speed_10m: block.wind_speed_10m[i],
                wind_speed_100m: block.wind_speed_100m[i],
                direct_radiation: block.direct_radiation[i],
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use chrono::Timelike;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn block(json: serde_json::Value) -> HourlyBlock {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_parse_hourly_rows() {
        let rows = parse_hourly(block(serde_json::json!({
            "time": ["2025-03-01T00:00", "2025-03-01T01:00"],
            "temperature_2m": [14.2, 13.8],
            "relative_humidity_2m": [80.0, 82.0],
            "rain": [0.0, 0.1],
            "cloud_cover": [20.0, 35.0],
            "wind_speed_10m": [3.1, 3.4],
            "wind_speed_100m": [7.9, null],
            "direct_radiation": [0.0, 0.0]
        })))
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].time.hour(), 1);
        assert_eq!(rows[0].wind_speed_100m, Some(7.9));
        assert_eq!(rows[1].wind_speed_100m, None);
        assert_eq!(rows[1].rain, Some(0.1));
    }

    #[test]
    fn test_unequal_columns_are_malformed() {
        let err = parse_hourly(block(serde_json::json!({
            "time": ["2025-03-01T00:00", "2025-03-01T01:00"],
            "temperature_2m": [14.2, 13.8],
            "relative_humidity_2m": [80.0, 82.0],
            "rain": [0.0],
            "cloud_cover": [20.0, 35.0],
            "wind_speed_10m": [3.1, 3.4],
            "wind_speed_100m": [7.9, 8.0],
            "direct_radiation": [0.0, 0.0]
        })))
        .unwrap_err();
        assert!(matches!(err, AppError::ForecastUnavailable(_)));
        assert!(err.to_string().contains("`rain` has 1 values"));
    }

    #[test]
    fn test_bad_timestamp_is_malformed() {
        let err = parse_hourly(block(serde_json::json!({
            "time": ["yesterday"],
            "temperature_2m": [1.0], "relative_humidity_2m": [1.0], "rain": [1.0],
            "cloud_cover": [1.0], "wind_speed_10m": [1.0], "wind_speed_100m": [1.0],
            "direct_radiation": [1.0]
        })))
        .unwrap_err();
        assert!(err.to_string().contains("unparseable timestamp"));
    }

    #[test]
    fn test_api_reason_extraction() {
        assert_eq!(
            api_reason(r#"{"error": true, "reason": "Parameter 'end_date' is out of range"}"#),
            ": Parameter 'end_date' is out of range"
        );
        assert_eq!(api_reason("<html>oops</html>"), "");
    }

    /// Serves a 200 whose body is cut off before `Content-Length` is reached.
    async fn truncating_server(hits: Arc<AtomicUsize>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else { break };
                hits.fetch_add(1, Ordering::SeqCst);
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(
                        b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 500\r\n\r\n{\"hourly\": {",
                    )
                    .await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{}", addr)
    }

    fn client_for(base_url: String, max_retries: u32) -> ForecastClient {
        ForecastClient::new(&ForecastConfig {
            base_url,
            timeout_seconds: 5,
            max_retries,
            retry_backoff_ms: 0,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_interrupted_body_is_retried() {
        let hits = Arc::new(AtomicUsize::new(0));
        let client = client_for(truncating_server(hits.clone()).await, 1);
        let day = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();

        let err = client.fetch(-33.45, -70.66, day, day).await.unwrap_err();
        assert!(err.to_string().contains("reading forecast body failed"), "{}", err);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_seconds_precision_timestamps() {
        assert_eq!(parse_time("2025-03-01T05:00:00").map(|t| t.hour()), Some(5));
    }
}
