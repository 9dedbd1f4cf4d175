/// A coordinate in degrees. GeoJSON orders positions `[lon, lat]`, this struct names them.
#[derive(Debug, Default, PartialEq, Copy, Clone)]
pub struct WGS84Coordinate {
  pub lat: f32,
  pub lon: f32,
}

impl WGS84Coordinate {
  #[must_use]
  pub fn new(lat: f32, lon: f32) -> Self {
    Self { lat, lon }
  }

  #[must_use]
  pub fn is_valid(&self) -> bool {
    (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
  }

  /// Reads a GeoJSON position `[lon, lat, ...]`.
  #[allow(clippy::cast_possible_truncation)]
  #[must_use]
  pub fn from_position(position: &serde_json::Value) -> Option<Self> {
    let array = position.as_array()?;
    if array.len() < 2 {
      return None;
    }
    let lon = array[0].as_f64()? as f32;
    let lat = array[1].as_f64()? as f32;
    Some(Self::new(lat, lon))
  }

  #[must_use]
  pub fn to_position(&self) -> serde_json::Value {
    serde_json::json!([self.lon, self.lat])
  }
}

impl Eq for WGS84Coordinate {}

/// Axis aligned box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
  min_lat: f32,
  max_lat: f32,
  min_lon: f32,
  max_lon: f32,
}

impl Default for BoundingBox {
  fn default() -> Self {
    Self::new()
  }
}

impl BoundingBox {
  #[must_use]
  pub fn new() -> Self {
    Self::get_invalid()
  }

  #[must_use]
  pub fn get_invalid() -> Self {
    Self {
      min_lat: f32::MAX,
      max_lat: f32::MIN,
      min_lon: f32::MAX,
      max_lon: f32::MIN,
    }
  }

  pub fn from_iterator<I: IntoIterator<Item = WGS84Coordinate>>(coordinates: I) -> Self {
    let mut bb = Self::get_invalid();
    coordinates
      .into_iter()
      .for_each(|coord| bb.add_coordinate(coord));
    bb
  }

  pub fn add_coordinate(&mut self, coord: WGS84Coordinate) {
    self.min_lat = self.min_lat.min(coord.lat);
    self.max_lat = self.max_lat.max(coord.lat);
    self.min_lon = self.min_lon.min(coord.lon);
    self.max_lon = self.max_lon.max(coord.lon);
  }

  #[must_use]
  pub fn is_valid(&self) -> bool {
    self.min_lat <= self.max_lat && self.min_lon <= self.max_lon
  }

  #[must_use]
  pub fn south_west(&self) -> WGS84Coordinate {
    WGS84Coordinate::new(self.min_lat, self.min_lon)
  }

  #[must_use]
  pub fn north_east(&self) -> WGS84Coordinate {
    WGS84Coordinate::new(self.max_lat, self.max_lon)
  }

  /// `[west, south, east, north]` as used by the GeoJSON `bbox` member.
  #[must_use]
  pub fn to_bbox(&self) -> [f32; 4] {
    [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
  }
}
