use super::ReverseGeocoder;
use crate::{coordinates::WGS84Coordinate, http};
use anyhow::{Result, anyhow};
use serde_json::Value;
use std::{collections::HashMap, time::Duration};

pub const DEFAULT_PHOTON_URL: &str = "https://photon.komoot.io";

/// Photon reverse geocoding, which answers with a GeoJSON feature collection.
pub struct PhotonGeocoder {
  base_url: String,
  client: surf::Client,
}

impl PhotonGeocoder {
  pub fn new(base_url: Option<String>, timeout: Duration, per_second: Option<u32>) -> Result<Self> {
    Ok(Self {
      base_url: base_url.unwrap_or_else(|| DEFAULT_PHOTON_URL.to_string()),
      client: http::client(timeout, per_second)?,
    })
  }

  fn reverse_url(&self, coord: WGS84Coordinate) -> String {
    format!(
      "{}/reverse?lat={}&lon={}",
      self.base_url.trim_end_matches('/'),
      coord.lat,
      coord.lon
    )
  }
}

#[async_trait::async_trait]
impl ReverseGeocoder for PhotonGeocoder {
  fn name(&self) -> &'static str {
    "Photon"
  }

  async fn reverse(&self, coord: WGS84Coordinate) -> Result<Value> {
    self
      .client
      .get(self.reverse_url(coord))
      .header("User-Agent", http::USER_AGENT)
      .recv_json::<Value>()
      .await
      .map_err(|e| anyhow!("Photon reverse API request failed: {}", e))
  }
}

/// Any service answering in the same shape, addressed by a url template with `{lat}` and
/// `{lon}` placeholders.
pub struct CustomGeocoder {
  name: String,
  url_template: String,
  headers: HashMap<String, String>,
  client: surf::Client,
}

impl CustomGeocoder {
  pub fn new(
    name: String,
    url_template: String,
    headers: Option<HashMap<String, String>>,
    timeout: Duration,
    per_second: Option<u32>,
  ) -> Result<Self> {
    Ok(Self {
      name,
      url_template,
      headers: headers.unwrap_or_default(),
      client: http::client(timeout, per_second)?,
    })
  }

  fn reverse_url(&self, coord: WGS84Coordinate) -> String {
    self
      .url_template
      .replace("{lat}", &urlencoding::encode(&coord.lat.to_string()))
      .replace("{lon}", &urlencoding::encode(&coord.lon.to_string()))
  }
}

#[async_trait::async_trait]
impl ReverseGeocoder for CustomGeocoder {
  fn name(&self) -> &str {
    &self.name
  }

  async fn reverse(&self, coord: WGS84Coordinate) -> Result<Value> {
    let mut request = self.client.get(self.reverse_url(coord));
    for (key, value) in &self.headers {
      request = request.header(key.as_str(), value.as_str());
    }
    request
      .recv_json::<Value>()
      .await
      .map_err(|e| anyhow!("{} reverse request failed: {}", self.name, e))
  }
}
