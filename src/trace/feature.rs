use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::coordinates::{BoundingBox, WGS84Coordinate};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeatureError {
  #[error("GeoJSON must be an object.")]
  NotAnObject,
  #[error("Missing 'type' field for GeoJSON.")]
  MissingType,
  #[error("Unknown GeoJSON type: {0}")]
  UnknownType(String),
  #[error("Feature has no readable geometry.")]
  Geometry,
}

/// GeoJSON geometry with positions read as [`WGS84Coordinate`]s.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
  Point(WGS84Coordinate),
  MultiPoint(Vec<WGS84Coordinate>),
  LineString(Vec<WGS84Coordinate>),
  MultiLineString(Vec<Vec<WGS84Coordinate>>),
  Polygon(Vec<Vec<WGS84Coordinate>>),
  MultiPolygon(Vec<Vec<Vec<WGS84Coordinate>>>),
  GeometryCollection(Vec<Geometry>),
}

fn positions(value: &Value) -> Option<Vec<WGS84Coordinate>> {
  value
    .as_array()?
    .iter()
    .map(WGS84Coordinate::from_position)
    .collect()
}

fn nested<T>(value: &Value, inner: impl Fn(&Value) -> Option<T>) -> Option<Vec<T>> {
  value.as_array()?.iter().map(inner).collect()
}

fn to_positions(coords: &[WGS84Coordinate]) -> Value {
  Value::Array(coords.iter().map(WGS84Coordinate::to_position).collect())
}

impl Geometry {
  /// Reads a geometry object. Any unreadable position fails the whole geometry.
  #[must_use]
  pub fn from_value(value: &Value) -> Option<Self> {
    let obj = value.as_object()?;
    let geom_type = obj.get("type")?.as_str()?;
    if geom_type == "GeometryCollection" {
      let geometries = nested(obj.get("geometries")?, Self::from_value)?;
      return Some(Geometry::GeometryCollection(geometries));
    }
    let coordinates = obj.get("coordinates")?;
    match geom_type {
      "Point" => WGS84Coordinate::from_position(coordinates).map(Geometry::Point),
      "MultiPoint" => positions(coordinates).map(Geometry::MultiPoint),
      "LineString" => positions(coordinates)
        .filter(|c| c.len() >= 2)
        .map(Geometry::LineString),
      "MultiLineString" => nested(coordinates, positions).map(Geometry::MultiLineString),
      "Polygon" => nested(coordinates, positions).map(Geometry::Polygon),
      "MultiPolygon" => {
        nested(coordinates, |p| nested(p, positions)).map(Geometry::MultiPolygon)
      }
      _ => None,
    }
  }

  #[must_use]
  pub fn to_value(&self) -> Value {
    match self {
      Geometry::Point(c) => json!({"type": "Point", "coordinates": c.to_position()}),
      Geometry::MultiPoint(cs) => json!({"type": "MultiPoint", "coordinates": to_positions(cs)}),
      Geometry::LineString(cs) => json!({"type": "LineString", "coordinates": to_positions(cs)}),
      Geometry::MultiLineString(lines) => json!({
        "type": "MultiLineString",
        "coordinates": lines.iter().map(|l| to_positions(l)).collect::<Vec<_>>()
      }),
      Geometry::Polygon(rings) => json!({
        "type": "Polygon",
        "coordinates": rings.iter().map(|r| to_positions(r)).collect::<Vec<_>>()
      }),
      Geometry::MultiPolygon(polygons) => json!({
        "type": "MultiPolygon",
        "coordinates": polygons
          .iter()
          .map(|p| p.iter().map(|r| to_positions(r)).collect::<Vec<_>>())
          .collect::<Vec<_>>()
      }),
      Geometry::GeometryCollection(geometries) => json!({
        "type": "GeometryCollection",
        "geometries": geometries.iter().map(Geometry::to_value).collect::<Vec<_>>()
      }),
    }
  }

  /// Every position of the geometry, in document order.
  #[must_use]
  pub fn coordinates(&self) -> Vec<WGS84Coordinate> {
    match self {
      Geometry::Point(c) => vec![*c],
      Geometry::MultiPoint(cs) | Geometry::LineString(cs) => cs.clone(),
      Geometry::MultiLineString(rings) | Geometry::Polygon(rings) => {
        rings.iter().flatten().copied().collect()
      }
      Geometry::MultiPolygon(polygons) => polygons.iter().flatten().flatten().copied().collect(),
      Geometry::GeometryCollection(geometries) => {
        geometries.iter().flat_map(Geometry::coordinates).collect()
      }
    }
  }
}

/// One item of an overlay. `type_tag` is the `type` property, which decides the style.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
  pub type_tag: String,
  pub properties: Map<String, Value>,
  pub geometry: Geometry,
}

impl Feature {
  #[must_use]
  pub fn new(properties: Map<String, Value>, geometry: Geometry) -> Self {
    let type_tag = properties
      .get("type")
      .and_then(Value::as_str)
      .unwrap_or_default()
      .to_string();
    Self {
      type_tag,
      properties,
      geometry,
    }
  }

  #[must_use]
  pub fn title(&self) -> Option<&str> {
    self.properties.get("title").and_then(Value::as_str)
  }

  fn from_value(value: &Value) -> Result<Self, FeatureError> {
    let obj = value.as_object().ok_or(FeatureError::NotAnObject)?;
    let properties = match obj.get("properties") {
      Some(Value::Object(props)) => props.clone(),
      _ => Map::new(),
    };
    let geometry = obj
      .get("geometry")
      .and_then(Geometry::from_value)
      .ok_or(FeatureError::Geometry)?;
    Ok(Self::new(properties, geometry))
  }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureCollection {
  pub features: Vec<Feature>,
}

impl FeatureCollection {
  /// The area to show once the overlay is loaded. A single feature keeps the current
  /// view, so there is nothing to fit.
  #[must_use]
  pub fn fit_bounds(&self) -> Option<BoundingBox> {
    if self.features.len() <= 1 {
      return None;
    }
    let bounds = BoundingBox::from_iterator(
      self
        .features
        .iter()
        .flat_map(|f| f.geometry.coordinates()),
    );
    bounds.is_valid().then_some(bounds)
  }
}

/// Reads a `FeatureCollection` or a single `Feature`.
///
/// Features that cannot be read are logged and skipped.
pub fn parse_feature_collection(value: &Value) -> Result<FeatureCollection, FeatureError> {
  let obj = value.as_object().ok_or(FeatureError::NotAnObject)?;
  let geotype = obj
    .get("type")
    .and_then(Value::as_str)
    .ok_or(FeatureError::MissingType)?;
  match geotype {
    "FeatureCollection" => {
      let features = obj
        .get("features")
        .and_then(Value::as_array)
        .map(|features| {
          features
            .iter()
            .filter_map(|f| {
              Feature::from_value(f)
                .inspect_err(|e| log::warn!("Error parsing feature: {e}"))
                .ok()
            })
            .collect()
        })
        .unwrap_or_default();
      Ok(FeatureCollection { features })
    }
    "Feature" => Ok(FeatureCollection {
      features: vec![Feature::from_value(value)?],
    }),
    other => Err(FeatureError::UnknownType(other.to_string())),
  }
}
