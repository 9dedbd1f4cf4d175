use serde_json::{Map, Value, json};

use crate::{
  coordinates::BoundingBox,
  registry::{Shape, StyleDescriptor},
  trace::Feature,
};

/// What an overlay needs from a map.
pub trait MapSurface {
  /// Removes every feature.
  fn clear(&mut self);
  /// Appends features, unstyled until [`MapSurface::set_style`] is called.
  fn add_features(&mut self, features: &[Feature]);
  /// Styles the feature at `index` in insertion order. `None` hides it.
  fn set_style(&mut self, index: usize, style: Option<StyleDescriptor>);
  fn fit_bounds(&mut self, bounds: BoundingBox);
}

/// Collects the overlay as a GeoJSON document using simplestyle properties, so any
/// viewer understanding `stroke` and `fill` can draw it.
#[derive(Debug, Default, Clone)]
pub struct StyledGeoJsonSurface {
  features: Vec<(Feature, Option<StyleDescriptor>)>,
  bounds: Option<BoundingBox>,
}

impl StyledGeoJsonSurface {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  /// Features with a style, in insertion order.
  pub fn drawn(&self) -> impl Iterator<Item = (&Feature, &StyleDescriptor)> {
    self
      .features
      .iter()
      .filter_map(|(feature, style)| style.as_ref().map(|s| (feature, s)))
  }

  #[must_use]
  pub fn bounds(&self) -> Option<BoundingBox> {
    self.bounds
  }

  #[must_use]
  pub fn to_geojson(&self) -> Value {
    let features: Vec<Value> = self
      .drawn()
      .map(|(feature, style)| {
        json!({
          "type": "Feature",
          "geometry": feature.geometry.to_value(),
          "properties": styled_properties(&feature.properties, style),
        })
      })
      .collect();
    let mut collection = json!({
      "type": "FeatureCollection",
      "features": features,
    });
    if let Some(bounds) = self.bounds {
      collection["bbox"] = json!(bounds.to_bbox());
    }
    collection
  }
}

/// simplestyle only knows three marker sizes.
fn marker_size(scale: f32) -> &'static str {
  if scale < 4.0 {
    "small"
  } else if scale < 6.0 {
    "medium"
  } else {
    "large"
  }
}

fn styled_properties(properties: &Map<String, Value>, style: &StyleDescriptor) -> Value {
  let mut props = properties.clone();
  let mut set = |key: &str, value: Value| {
    props.insert(key.to_string(), value);
  };
  if let Some(color) = style.stroke_color {
    set("stroke", json!(color.to_hex()));
  }
  if let Some(opacity) = style.stroke_opacity {
    set("stroke-opacity", json!(opacity));
  }
  if let Some(weight) = style.stroke_weight {
    set("stroke-width", json!(weight));
  }
  if let Some(color) = style.fill_color {
    set("fill", json!(color.to_hex()));
  }
  if let Some(opacity) = style.fill_opacity {
    set("fill-opacity", json!(opacity));
  }
  if let Some(color) = style.primary_color() {
    set("marker-color", json!(color.to_hex()));
  }
  match style.shape {
    Shape::Circle => set("marker-symbol", json!("circle")),
    Shape::Arrow => set("marker-symbol", json!("arrow")),
    Shape::Line => {}
  }
  if let Some(scale) = style.scale {
    set("marker-size", json!(marker_size(scale)));
  }
  if let Some(title) = &style.title {
    set("title", json!(title));
  }
  Value::Object(props)
}

impl MapSurface for StyledGeoJsonSurface {
  fn clear(&mut self) {
    self.features.clear();
    self.bounds = None;
  }

  fn add_features(&mut self, features: &[Feature]) {
    self
      .features
      .extend(features.iter().map(|f| (f.clone(), None)));
  }

  fn set_style(&mut self, index: usize, style: Option<StyleDescriptor>) {
    match self.features.get_mut(index) {
      Some((_, slot)) => *slot = style,
      None => log::warn!("No feature {index} to style"),
    }
  }

  fn fit_bounds(&mut self, bounds: BoundingBox) {
    self.bounds = Some(bounds);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    coordinates::WGS84Coordinate,
    registry::{Color, Shape},
    trace::Geometry,
  };

  fn point(type_tag: &str) -> Feature {
    let mut props = Map::new();
    props.insert("type".to_string(), json!(type_tag));
    Feature::new(props, Geometry::Point(WGS84Coordinate::new(60.0, 24.0)))
  }

  #[test]
  fn test_unstyled_features_are_not_drawn() {
    let mut surface = StyledGeoJsonSurface::new();
    surface.add_features(&[point("raw-point"), point("mystery")]);
    surface.set_style(
      0,
      Some(
        StyleDescriptor::new(Shape::Circle)
          .with_stroke(Color::Red)
          .with_scale(3.),
      ),
    );
    surface.set_style(1, None);

    let doc = surface.to_geojson();
    let features = doc["features"].as_array().unwrap();
    assert_eq!(features.len(), 1);
    let props = &features[0]["properties"];
    assert_eq!(props["type"], "raw-point");
    assert_eq!(props["stroke"], "#ff0000");
    assert_eq!(props["marker-symbol"], "circle");
    assert_eq!(props["marker-size"], "small");
    assert!(doc.get("bbox").is_none());
  }

  #[test]
  fn test_marker_sizes() {
    assert_eq!(marker_size(2.), "small");
    assert_eq!(marker_size(3.), "small");
    assert_eq!(marker_size(5.), "medium");
    assert_eq!(marker_size(7.), "large");
    assert_eq!(marker_size(10.), "large");
  }

  #[test]
  fn test_clear_and_bounds() {
    let mut surface = StyledGeoJsonSurface::new();
    surface.add_features(&[point("raw-point")]);
    surface.fit_bounds(BoundingBox::from_iterator([
      WGS84Coordinate::new(60.0, 24.0),
      WGS84Coordinate::new(61.0, 25.0),
    ]));
    assert_eq!(
      surface.to_geojson()["bbox"],
      json!([24.0, 60.0, 25.0, 61.0])
    );
    surface.clear();
    assert_eq!(surface.drawn().count(), 0);
    assert!(surface.bounds().is_none());
  }
}
