use std::time::Duration;

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use serde_json::Value;

use crate::http;

/// Date keyed documents of one device.
#[async_trait::async_trait]
pub trait TripSource: Send + Sync {
  /// The trip table of a day.
  async fn trips(&self, date: NaiveDate) -> Result<Value>;

  /// Recorded points and map matching of a day, as a feature collection.
  async fn trace(&self, date: NaiveDate) -> Result<Value>;

  /// Predicted positions from now on, as a feature collection.
  async fn predictions(&self) -> Result<Value>;
}

/// Reads documents from the trip server.
pub struct HttpTripSource {
  base_url: String,
  device_id: Option<u32>,
  client: surf::Client,
}

impl HttpTripSource {
  pub fn new(base_url: String, device_id: Option<u32>, timeout: Duration) -> Result<Self> {
    Ok(Self {
      base_url: base_url.trim_end_matches('/').to_string(),
      device_id,
      client: http::client(timeout, None)?,
    })
  }

  fn device(&self) -> Result<u32> {
    self
      .device_id
      .ok_or_else(|| anyhow!("No device id configured, set TRIPTRACE_DEVICE_ID."))
  }

  fn trips_url(&self, date: NaiveDate) -> String {
    format!("{}/trips_json?date={}", self.base_url, date.format("%Y-%m-%d"))
  }

  fn trace_url(&self, date: NaiveDate) -> Result<String> {
    Ok(format!(
      "{}/visualize/{}/geojson?date={}",
      self.base_url,
      self.device()?,
      date.format("%Y-%m-%d")
    ))
  }

  fn predictions_url(&self) -> Result<String> {
    Ok(format!("{}/predictgeojson/{}", self.base_url, self.device()?))
  }

  async fn get_json(&self, url: &str) -> Result<Value> {
    log::debug!("Fetching {url}");
    self
      .client
      .get(url)
      .header("User-Agent", http::USER_AGENT)
      .recv_json::<Value>()
      .await
      .map_err(|e| anyhow!("Request to {url} failed: {e}"))
  }
}

#[async_trait::async_trait]
impl TripSource for HttpTripSource {
  async fn trips(&self, date: NaiveDate) -> Result<Value> {
    self.get_json(&self.trips_url(date)).await
  }

  async fn trace(&self, date: NaiveDate) -> Result<Value> {
    self.get_json(&self.trace_url(date)?).await
  }

  async fn predictions(&self) -> Result<Value> {
    self.get_json(&self.predictions_url()?).await
  }
}

/// Serves one document for every request, for files read from disk.
#[derive(Debug, Clone)]
pub struct StaticSource {
  document: Value,
}

impl StaticSource {
  #[must_use]
  pub fn new(document: Value) -> Self {
    Self { document }
  }
}

#[async_trait::async_trait]
impl TripSource for StaticSource {
  async fn trips(&self, _date: NaiveDate) -> Result<Value> {
    Ok(self.document.clone())
  }

  async fn trace(&self, _date: NaiveDate) -> Result<Value> {
    Ok(self.document.clone())
  }

  async fn predictions(&self) -> Result<Value> {
    Ok(self.document.clone())
  }
}
