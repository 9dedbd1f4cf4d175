pub mod providers;

use std::sync::Arc;

use anyhow::Result;
use itertools::Itertools;
use serde_json::Value;

use crate::{
  coordinates::WGS84Coordinate,
  label::SEPARATOR,
  task_tracker::{TaskCategory, TaskGuard},
  timeline::{EnrichmentRequest, EnrichmentResult},
};

/// Trait for reverse geocoding services.
#[async_trait::async_trait]
pub trait ReverseGeocoder: Send + Sync {
  /// Human-readable name of the service.
  fn name(&self) -> &str;

  /// Looks up a coordinate. The answer is a feature collection whose feature
  /// properties may hold `street` and `name`.
  async fn reverse(&self, coord: WGS84Coordinate) -> Result<Value>;
}

/// Properties read from the response, in priority order.
pub const CANDIDATE_KEYS: [&str; 2] = ["street", "name"];

/// At most this many candidates end up in a place name.
const MAX_NAMES: usize = 2;

/// Collects distinct place names from a reverse geocoding response.
///
/// All `street` values come before all `name` values. Everything after the first comma
/// is administrative detail and dropped. The first occurrence of a name wins.
#[must_use]
pub fn place_candidates(response: &Value) -> Vec<String> {
  let features = response
    .get("features")
    .and_then(Value::as_array)
    .map(Vec::as_slice)
    .unwrap_or_default();
  CANDIDATE_KEYS
    .iter()
    .flat_map(move |key| {
      features
        .iter()
        .filter_map(move |f| f.get("properties")?.get(*key)?.as_str())
    })
    .filter_map(|value| value.split(',').next())
    .filter(|name| !name.is_empty())
    .unique()
    .map(str::to_string)
    .collect()
}

/// The display name of a response: the first candidate, or the first two joined.
#[must_use]
pub fn compose_place_name(response: &Value) -> Option<String> {
  let candidates = place_candidates(response);
  if candidates.is_empty() {
    return None;
  }
  Some(candidates.iter().take(MAX_NAMES).join(SEPARATOR))
}

/// Names coordinates for place cells.
#[derive(Clone)]
pub struct PlaceResolver {
  geocoder: Arc<dyn ReverseGeocoder>,
}

impl PlaceResolver {
  #[must_use]
  pub fn new(geocoder: Arc<dyn ReverseGeocoder>) -> Self {
    Self { geocoder }
  }

  /// One lookup, no retries. Failures and empty answers give `None`.
  pub async fn resolve_place(&self, coord: WGS84Coordinate) -> Option<String> {
    let _guard = TaskGuard::new(
      TaskCategory::Enrichment,
      format!("{:.5}, {:.5}", coord.lat, coord.lon),
    );
    match self.geocoder.reverse(coord).await {
      Ok(response) => {
        let name = compose_place_name(&response);
        log::debug!(
          "{} named {:.5}, {:.5} as {name:?}",
          self.geocoder.name(),
          coord.lat,
          coord.lon
        );
        name
      }
      Err(e) => {
        log::warn!("Reverse lookup with '{}' failed: {e}", self.geocoder.name());
        None
      }
    }
  }

  /// Answers a request of a grid, addressed back to the same cell and generation.
  pub async fn resolve(&self, request: EnrichmentRequest) -> EnrichmentResult {
    EnrichmentResult {
      generation: request.generation,
      cell: request.cell,
      name: self.resolve_place(request.coordinate).await,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn response(properties: &[Value]) -> Value {
    json!({
      "type": "FeatureCollection",
      "features": properties
        .iter()
        .map(|p| json!({"type": "Feature", "properties": p}))
        .collect::<Vec<_>>()
    })
  }

  #[test]
  fn test_duplicate_streets_are_merged() {
    let response = response(&[
      json!({"street": "Main St"}),
      json!({"street": "Main St"}),
      json!({"street": "2nd Ave"}),
    ]);
    assert_eq!(
      compose_place_name(&response).as_deref(),
      Some("Main St / 2nd Ave")
    );
  }

  #[test]
  fn test_single_name_has_no_separator() {
    let response = response(&[json!({"name": "Kamppi"}), json!({"name": "Kamppi"})]);
    assert_eq!(compose_place_name(&response).as_deref(), Some("Kamppi"));
  }

  #[test]
  fn test_streets_before_names_and_commas_cut() {
    let response = response(&[
      json!({"name": "Aalto University, Espoo", "street": "Otakaari"}),
      json!({"name": "Otaniemi"}),
      json!({"street": "Otakaari, 02150 Espoo"}),
    ]);
    assert_eq!(
      place_candidates(&response),
      vec!["Otakaari", "Aalto University", "Otaniemi"]
    );
    assert_eq!(
      compose_place_name(&response).as_deref(),
      Some("Otakaari / Aalto University")
    );
  }

  #[test]
  fn test_dedup_is_case_sensitive() {
    let response = response(&[json!({"street": "Main St"}), json!({"name": "main st"})]);
    assert_eq!(
      compose_place_name(&response).as_deref(),
      Some("Main St / main st")
    );
  }

  #[test]
  fn test_empty_response_has_no_name() {
    assert_eq!(compose_place_name(&response(&[])), None);
    assert_eq!(compose_place_name(&json!({"error": "rate limited"})), None);
    assert_eq!(
      compose_place_name(&response(&[json!({"city": "Espoo"}), json!({"name": ""})])),
      None
    );
  }
}
