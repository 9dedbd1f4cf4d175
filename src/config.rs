use std::{collections::HashMap, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use dirs::home_dir;
use log::error;
use serde::{Deserialize, Serialize};

use crate::{
  enrichment::{
    ReverseGeocoder,
    providers::{CustomGeocoder, PhotonGeocoder},
  },
  source::HttpTripSource,
};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";
pub const DEFAULT_RATE_LIMIT: u32 = 5;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Which reverse geocoding service names coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GeocoderConfig {
  /// Photon, the public instance unless a base url is given.
  Photon { base_url: Option<String> },
  /// Any service answering like Photon. The template carries `{lat}` and `{lon}`.
  Custom {
    name: String,
    url_template: String,
    headers: Option<HashMap<String, String>>,
  },
}

impl Default for GeocoderConfig {
  fn default() -> Self {
    Self::Photon { base_url: None }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
  pub config_path: Option<PathBuf>,
  pub server_url: Option<String>,
  pub device_id: Option<u32>,
  pub geocoder: Option<GeocoderConfig>,
  pub geocoder_rate_limit: Option<u32>,
  pub request_timeout_secs: Option<u64>,
}

impl Config {
  /// Environment first, then the config file, then defaults. A missing config file is
  /// written from the merged result.
  #[must_use]
  pub fn new() -> Self {
    let from_env = Self::from_vars(|key| std::env::var(key).ok());
    let from_file = from_env
      .config_path
      .clone()
      .or_else(default_config_path)
      .and_then(|path| Self::from_file(&path));

    let mut merged = from_env;
    if let Some(from_file) = &from_file {
      merged = merged.merge(from_file);
    }
    merged = merged.merge(&Self::defaults());

    if merged.config_path.is_some() && from_file.is_none() {
      merged.init_cfg_file();
    }

    merged
  }

  fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
    let device_id = var("TRIPTRACE_DEVICE_ID").and_then(|v| {
      v.trim()
        .parse()
        .inspect_err(|e| error!("Ignoring TRIPTRACE_DEVICE_ID '{v}': {e}"))
        .ok()
    });
    Self {
      config_path: var("TRIPTRACE_CONFIG").map(PathBuf::from),
      server_url: var("TRIPTRACE_SERVER_URL"),
      device_id,
      ..Self::default()
    }
  }

  fn defaults() -> Self {
    Self {
      config_path: default_config_path(),
      server_url: Some(DEFAULT_SERVER_URL.to_string()),
      device_id: None,
      geocoder: Some(GeocoderConfig::default()),
      geocoder_rate_limit: Some(DEFAULT_RATE_LIMIT),
      request_timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
    }
  }

  fn merge(mut self, other: &Self) -> Self {
    self.config_path = self.config_path.or(other.config_path.clone());
    self.server_url = self.server_url.or(other.server_url.clone());
    self.device_id = self.device_id.or(other.device_id);
    self.geocoder = self.geocoder.or(other.geocoder.clone());
    self.geocoder_rate_limit = self.geocoder_rate_limit.or(other.geocoder_rate_limit);
    self.request_timeout_secs = self.request_timeout_secs.or(other.request_timeout_secs);
    self
  }

  fn from_file(dir: &std::path::Path) -> Option<Self> {
    let path = dir.join("config.json");
    serde_json::from_str(&std::fs::read_to_string(&path).ok()?)
      .inspect_err(|e| error!("Failed to read config file {}: {e}", path.display()))
      .ok()
  }

  fn init_cfg_file(&self) {
    let Some(path) = &self.config_path else {
      return;
    };
    if !path.exists() {
      let _ = std::fs::create_dir_all(path).inspect_err(|e| {
        error!("Failed to create config directory: {e}");
      });
    }
    let path = path.join("config.json");
    if path.exists() {
      return;
    }
    match serde_json::to_string_pretty(self) {
      Ok(config) => {
        let _ = std::fs::write(path, config).inspect_err(|e| {
          error!("Failed to write config file: {e}");
        });
      }
      Err(e) => error!("Failed to serialize config: {e}"),
    }
  }

  #[must_use]
  pub fn server_url(&self) -> &str {
    self.server_url.as_deref().unwrap_or(DEFAULT_SERVER_URL)
  }

  #[must_use]
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
  }

  pub fn trip_source(&self) -> Result<HttpTripSource> {
    HttpTripSource::new(self.server_url().to_string(), self.device_id, self.timeout())
  }

  pub fn geocoder(&self) -> Result<Arc<dyn ReverseGeocoder>> {
    let per_second = Some(self.geocoder_rate_limit.unwrap_or(DEFAULT_RATE_LIMIT));
    let geocoder: Arc<dyn ReverseGeocoder> = match self.geocoder.clone().unwrap_or_default() {
      GeocoderConfig::Photon { base_url } => {
        Arc::new(PhotonGeocoder::new(base_url, self.timeout(), per_second)?)
      }
      GeocoderConfig::Custom {
        name,
        url_template,
        headers,
      } => Arc::new(CustomGeocoder::new(
        name,
        url_template,
        headers,
        self.timeout(),
        per_second,
      )?),
    };
    Ok(geocoder)
  }
}

fn default_config_path() -> Option<PathBuf> {
  home_dir().map(|p| p.join(".config").join("triptrace"))
}
