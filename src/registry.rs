use std::{fmt::Display, str::FromStr};

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// A pictograph shown in front of an activity cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph(&'static str);

impl Glyph {
  #[must_use]
  pub fn as_str(&self) -> &'static str {
    self.0
  }
}

impl Display for Glyph {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.0)
  }
}

/// Activity mode to glyph. The trailing U+FE0E asks for text presentation of the emoji.
pub const GLYPHS: &[(&str, Glyph)] = &[
  ("ON_BICYCLE", Glyph("\u{1F6B4}\u{FE0E}")),
  ("WALKING", Glyph("\u{1F6B6}\u{FE0E}")),
  ("ON_FOOT", Glyph("\u{1F6B6}\u{FE0E}")),
  ("RUNNING", Glyph("\u{1F3C3}\u{FE0E}")),
  ("IN_VEHICLE", Glyph("\u{1F698}\u{FE0E}")),
  ("TRAIN", Glyph("\u{1F682}\u{FE0E}")),
  ("SUBWAY", Glyph("\u{1F687}\u{FE0E}")),
  ("TRAM", Glyph("\u{1F68B}\u{FE0E}")),
  ("FERRY", Glyph("\u{26F4}\u{FE0E}")),
  ("BUS", Glyph("\u{1F68D}\u{FE0E}")),
  ("TILTING", Glyph("/")),
  ("STILL", Glyph("\u{a0}")),
  ("UNKNOWN", Glyph("?")),
];

/// Looks up the glyph of an activity mode. Unknown modes have none.
#[must_use]
pub fn glyph_for(mode: &str) -> Option<Glyph> {
  GLYPHS
    .iter()
    .find(|(m, _)| *m == mode)
    .map(|(_, glyph)| *glyph)
}

static ALL_COLORS: [Color; 12] = [
  Color::Black,
  Color::White,
  Color::Gray,
  Color::Red,
  Color::Green,
  Color::Blue,
  Color::LimeGreen,
  Color::GreenYellow,
  Color::DeepPink,
  Color::Fuchsia,
  Color::FireBrick,
  Color::Gold,
];

/// The named CSS colors used by the style tables.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Color {
  #[default]
  Black,
  White,
  Gray,
  Red,
  Green,
  Blue,
  LimeGreen,
  GreenYellow,
  DeepPink,
  Fuchsia,
  FireBrick,
  Gold,
}

impl Color {
  /// The CSS name.
  #[must_use]
  pub fn name(self) -> &'static str {
    match self {
      Color::Black => "black",
      Color::White => "white",
      Color::Gray => "gray",
      Color::Red => "red",
      Color::Green => "green",
      Color::Blue => "blue",
      Color::LimeGreen => "limegreen",
      Color::GreenYellow => "greenyellow",
      Color::DeepPink => "DeepPink",
      Color::Fuchsia => "Fuchsia",
      Color::FireBrick => "FireBrick",
      Color::Gold => "gold",
    }
  }

  #[must_use]
  pub fn to_rgb(self) -> (u8, u8, u8) {
    match self {
      Color::Black => (0, 0, 0),
      Color::White => (255, 255, 255),
      Color::Gray => (128, 128, 128),
      Color::Red => (255, 0, 0),
      Color::Green => (0, 128, 0),
      Color::Blue => (0, 0, 255),
      Color::LimeGreen => (50, 205, 50),
      Color::GreenYellow => (173, 255, 47),
      Color::DeepPink => (255, 20, 147),
      Color::Fuchsia => (255, 0, 255),
      Color::FireBrick => (178, 34, 34),
      Color::Gold => (255, 215, 0),
    }
  }

  #[must_use]
  pub fn to_hex(self) -> String {
    let (r, g, b) = self.to_rgb();
    format!("#{r:02x}{g:02x}{b:02x}")
  }

  #[must_use]
  pub fn all() -> &'static [Color] {
    &ALL_COLORS
  }
}

impl Display for Color {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for Color {
  type Err = ();
  fn from_str(input: &str) -> Result<Color, Self::Err> {
    let lowercase = input.to_lowercase();
    Color::all()
      .iter()
      .find(|c| c.name().to_lowercase() == lowercase)
      .copied()
      .ok_or(())
  }
}

impl Serialize for Color {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(self.name())
  }
}

/// The marker drawn for a feature.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
  Circle,
  /// A closed arrow pointing backwards along the track.
  Arrow,
  Line,
}

/// Paint parameters for one feature on the map layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleDescriptor {
  pub shape: Shape,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub stroke_color: Option<Color>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub fill_color: Option<Color>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub scale: Option<f32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub fill_opacity: Option<f32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub stroke_opacity: Option<f32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub stroke_weight: Option<f32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
}

impl StyleDescriptor {
  #[must_use]
  pub fn new(shape: Shape) -> Self {
    Self {
      shape,
      stroke_color: None,
      fill_color: None,
      scale: None,
      fill_opacity: None,
      stroke_opacity: None,
      stroke_weight: None,
      title: None,
    }
  }

  #[must_use]
  pub fn with_stroke(mut self, color: Color) -> Self {
    self.stroke_color = Some(color);
    self
  }

  #[must_use]
  pub fn with_fill(mut self, color: Color, opacity: f32) -> Self {
    self.fill_color = Some(color);
    self.fill_opacity = Some(opacity);
    self
  }

  #[must_use]
  pub fn with_scale(mut self, scale: f32) -> Self {
    self.scale = Some(scale);
    self
  }

  #[must_use]
  pub fn with_stroke_opacity(mut self, opacity: f32) -> Self {
    self.stroke_opacity = Some(opacity);
    self
  }

  #[must_use]
  pub fn with_stroke_weight(mut self, weight: f32) -> Self {
    self.stroke_weight = Some(weight);
    self
  }

  #[must_use]
  pub fn with_title(mut self, title: Option<String>) -> Self {
    self.title = title;
    self
  }

  /// The color a viewer would pick if it could only draw one.
  #[must_use]
  pub fn primary_color(&self) -> Option<Color> {
    self.fill_color.or(self.stroke_color)
  }
}

/// Activity to raw point color.
pub const ACTIVITY_COLORS: &[(&str, Color)] = &[
  ("ON_BICYCLE", Color::Green),
  ("WALKING", Color::LimeGreen),
  ("ON_FOOT", Color::LimeGreen),
  ("RUNNING", Color::GreenYellow),
  ("IN_VEHICLE", Color::Red),
  ("TILTING", Color::Blue),
  ("STILL", Color::White),
  ("UNKNOWN", Color::Gray),
];

pub const DEFAULT_ACTIVITY_COLOR: Color = Color::Black;

#[must_use]
pub fn activity_color(activity: Option<&str>) -> Color {
  activity
    .and_then(|a| ACTIVITY_COLORS.iter().find(|(m, _)| *m == a))
    .map_or(DEFAULT_ACTIVITY_COLOR, |(_, color)| *color)
}

/// Prediction horizon in minutes to marker color and scale.
pub const PREDICTION_STYLES: &[(i64, Color, f32)] = &[
  (5, Color::DeepPink, 3.),
  (15, Color::Fuchsia, 5.),
  (30, Color::FireBrick, 7.),
];

pub const DEFAULT_PREDICTION: (Color, f32) = (Color::Black, 10.);

#[must_use]
pub fn prediction_color_scale(minutes: Option<i64>) -> (Color, f32) {
  minutes
    .and_then(|m| PREDICTION_STYLES.iter().find(|(k, _, _)| *k == m))
    .map_or(DEFAULT_PREDICTION, |(_, color, scale)| (*color, *scale))
}

/// Which page a feature type belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StyleFamily {
  /// Predicted positions around the current one.
  Prediction,
  /// Recorded points and their map matching.
  Trace,
}

type StyleBuilder = fn(&Map<String, Value>) -> StyleDescriptor;

/// Feature type to family and style builder.
pub const FEATURE_STYLES: &[(&str, StyleFamily, StyleBuilder)] = &[
  ("Prediction", StyleFamily::Prediction, prediction_style),
  ("Position", StyleFamily::Prediction, position_style),
  ("raw-point", StyleFamily::Trace, raw_point_style),
  ("route-point", StyleFamily::Trace, route_point_style),
  ("snap-line", StyleFamily::Trace, snap_line_style),
  ("route-line", StyleFamily::Trace, route_line_style),
  ("link-line", StyleFamily::Trace, link_line_style),
  ("link-point", StyleFamily::Trace, link_point_style),
];

/// The family a feature type belongs to, if any.
#[must_use]
pub fn family_of(type_tag: &str) -> Option<StyleFamily> {
  FEATURE_STYLES
    .iter()
    .find(|(tag, _, _)| *tag == type_tag)
    .map(|(_, family, _)| *family)
}

/// Style for a feature type with its attributes. Unknown types are not drawn.
#[must_use]
pub fn style_for(type_tag: &str, attrs: &Map<String, Value>) -> Option<StyleDescriptor> {
  FEATURE_STYLES
    .iter()
    .find(|(tag, _, _)| *tag == type_tag)
    .map(|(_, _, build)| build(attrs))
}

/// Reads an integral number, accepting `5.0` where `5` is meant.
#[allow(clippy::cast_possible_truncation)]
fn integer_attr(attrs: &Map<String, Value>, key: &str) -> Option<i64> {
  let value = attrs.get(key)?;
  value.as_i64().or_else(|| {
    value
      .as_f64()
      .filter(|f| f.fract() == 0.0)
      .map(|f| f as i64)
  })
}

fn prediction_style(attrs: &Map<String, Value>) -> StyleDescriptor {
  let (color, scale) = prediction_color_scale(integer_attr(attrs, "minutes"));
  StyleDescriptor::new(Shape::Circle)
    .with_scale(scale)
    .with_stroke(color)
    .with_stroke_opacity(1.0)
    .with_stroke_weight(2.0)
}

fn position_style(_: &Map<String, Value>) -> StyleDescriptor {
  StyleDescriptor::new(Shape::Arrow)
    .with_scale(5.)
    .with_fill(Color::Gold, 1.0)
    .with_stroke(Color::Black)
    .with_stroke_weight(1.0)
}

fn raw_point_style(attrs: &Map<String, Value>) -> StyleDescriptor {
  let color = activity_color(attrs.get("activity").and_then(Value::as_str));
  StyleDescriptor::new(Shape::Circle)
    .with_scale(3.)
    .with_stroke(color)
    .with_stroke_opacity(0.5)
}

fn route_point_style(_: &Map<String, Value>) -> StyleDescriptor {
  StyleDescriptor::new(Shape::Arrow)
    .with_scale(3.)
    .with_fill(Color::Red, 1.0)
    .with_stroke(Color::Black)
}

fn snap_line_style(_: &Map<String, Value>) -> StyleDescriptor {
  StyleDescriptor::new(Shape::Line).with_stroke(Color::Blue)
}

fn route_line_style(_: &Map<String, Value>) -> StyleDescriptor {
  StyleDescriptor::new(Shape::Line).with_stroke(Color::Red)
}

fn link_line_style(_: &Map<String, Value>) -> StyleDescriptor {
  StyleDescriptor::new(Shape::Line).with_stroke(Color::Green)
}

fn link_point_style(_: &Map<String, Value>) -> StyleDescriptor {
  StyleDescriptor::new(Shape::Circle)
    .with_scale(2.)
    .with_stroke(Color::Green)
}

#[cfg(test)]
mod tests {
  use super::*;
  use rstest::rstest;
  use serde_json::json;

  fn attrs(value: Value) -> Map<String, Value> {
    match value {
      Value::Object(map) => map,
      _ => panic!("attributes must be an object"),
    }
  }

  #[rstest]
  #[case("ON_BICYCLE", "\u{1F6B4}\u{FE0E}")]
  #[case("WALKING", "\u{1F6B6}\u{FE0E}")]
  #[case("ON_FOOT", "\u{1F6B6}\u{FE0E}")]
  #[case("RUNNING", "\u{1F3C3}\u{FE0E}")]
  #[case("IN_VEHICLE", "\u{1F698}\u{FE0E}")]
  #[case("TRAIN", "\u{1F682}\u{FE0E}")]
  #[case("SUBWAY", "\u{1F687}\u{FE0E}")]
  #[case("TRAM", "\u{1F68B}\u{FE0E}")]
  #[case("FERRY", "\u{26F4}\u{FE0E}")]
  #[case("BUS", "\u{1F68D}\u{FE0E}")]
  #[case("TILTING", "/")]
  #[case("STILL", "\u{a0}")]
  #[case("UNKNOWN", "?")]
  fn test_glyph_table(#[case] mode: &str, #[case] glyph: &str) {
    assert_eq!(glyph_for(mode).map(|g| g.as_str()), Some(glyph));
  }

  #[rstest]
  #[case("")]
  #[case("walking")]
  #[case("SKATEBOARD")]
  #[case("ON_BICYCLE ")]
  fn test_unknown_mode_has_no_glyph(#[case] mode: &str) {
    assert_eq!(glyph_for(mode), None);
  }

  #[test]
  fn test_glyph_table_has_unique_modes() {
    for (i, (mode, _)) in GLYPHS.iter().enumerate() {
      assert!(
        GLYPHS[i + 1..].iter().all(|(m, _)| m != mode),
        "Mode {mode} listed twice"
      );
    }
  }

  #[rstest]
  #[case(Some("ON_BICYCLE"), Color::Green)]
  #[case(Some("WALKING"), Color::LimeGreen)]
  #[case(Some("ON_FOOT"), Color::LimeGreen)]
  #[case(Some("RUNNING"), Color::GreenYellow)]
  #[case(Some("IN_VEHICLE"), Color::Red)]
  #[case(Some("TILTING"), Color::Blue)]
  #[case(Some("STILL"), Color::White)]
  #[case(Some("UNKNOWN"), Color::Gray)]
  #[case(Some("TRAIN"), Color::Black)]
  #[case(None, Color::Black)]
  fn test_activity_colors(#[case] activity: Option<&str>, #[case] expected: Color) {
    assert_eq!(activity_color(activity), expected);
  }

  #[rstest]
  #[case(json!(5), Color::DeepPink, 3.)]
  #[case(json!(15), Color::Fuchsia, 5.)]
  #[case(json!(30), Color::FireBrick, 7.)]
  #[case(json!(15.0), Color::Fuchsia, 5.)]
  #[case(json!(60), Color::Black, 10.)]
  #[case(json!("15"), Color::Black, 10.)]
  fn test_prediction_styles(#[case] minutes: Value, #[case] color: Color, #[case] scale: f32) {
    let style = style_for("Prediction", &attrs(json!({ "minutes": minutes }))).unwrap();
    assert_eq!(style.shape, Shape::Circle);
    assert_eq!(style.stroke_color, Some(color));
    assert_eq!(style.scale, Some(scale));
    assert_eq!(style.stroke_opacity, Some(1.0));
    assert_eq!(style.stroke_weight, Some(2.0));
  }

  #[test]
  fn test_prediction_without_minutes_uses_default() {
    let style = style_for("Prediction", &Map::new()).unwrap();
    assert_eq!(style.stroke_color, Some(DEFAULT_PREDICTION.0));
    assert_eq!(style.scale, Some(DEFAULT_PREDICTION.1));
  }

  #[test]
  fn test_position_is_gold_arrow() {
    let style = style_for("Position", &Map::new()).unwrap();
    assert_eq!(style.shape, Shape::Arrow);
    assert_eq!(style.fill_color, Some(Color::Gold));
    assert_eq!(style.fill_opacity, Some(1.0));
    assert_eq!(style.stroke_color, Some(Color::Black));
    assert_eq!(style.scale, Some(5.));
  }

  #[rstest]
  #[case("snap-line", Color::Blue)]
  #[case("route-line", Color::Red)]
  #[case("link-line", Color::Green)]
  fn test_line_styles(#[case] tag: &str, #[case] color: Color) {
    let style = style_for(tag, &Map::new()).unwrap();
    assert_eq!(style.shape, Shape::Line);
    assert_eq!(style.stroke_color, Some(color));
  }

  #[test]
  fn test_point_styles() {
    let raw = style_for("raw-point", &attrs(json!({ "activity": "IN_VEHICLE" }))).unwrap();
    assert_eq!(raw.shape, Shape::Circle);
    assert_eq!(raw.stroke_color, Some(Color::Red));
    assert_eq!(raw.stroke_opacity, Some(0.5));
    assert_eq!(raw.scale, Some(3.));

    let route = style_for("route-point", &Map::new()).unwrap();
    assert_eq!(route.shape, Shape::Arrow);
    assert_eq!(route.fill_color, Some(Color::Red));

    let link = style_for("link-point", &Map::new()).unwrap();
    assert_eq!(link.shape, Shape::Circle);
    assert_eq!(link.stroke_color, Some(Color::Green));
    assert_eq!(link.scale, Some(2.));
  }

  #[test]
  fn test_unknown_feature_type_has_no_style() {
    assert_eq!(style_for("Feature", &Map::new()), None);
    assert_eq!(style_for("prediction", &Map::new()), None);
    assert_eq!(family_of("waypoint"), None);
  }

  #[test]
  fn test_every_feature_type_has_a_family_and_style() {
    for (tag, family, _) in FEATURE_STYLES {
      assert_eq!(family_of(tag), Some(*family));
      assert!(style_for(tag, &Map::new()).is_some(), "{tag} has no style");
    }
  }

  #[test]
  fn test_color_names_round_trip() {
    for color in Color::all() {
      assert_eq!(color.name().parse::<Color>(), Ok(*color));
    }
    assert_eq!(Color::DeepPink.to_hex(), "#ff1493");
    assert_eq!("fuchsia".parse::<Color>(), Ok(Color::Fuchsia));
    assert!("chartreuse".parse::<Color>().is_err());
  }

  #[test]
  fn test_colors_have_distinct_hex() {
    let hexes: std::collections::HashSet<_> = Color::all().iter().map(|c| c.to_hex()).collect();
    assert_eq!(hexes.len(), Color::all().len());
  }

  #[test]
  fn test_style_serializes_like_map_symbols() {
    let style = style_for("Position", &Map::new())
      .unwrap()
      .with_title(Some("now".to_string()));
    let value = serde_json::to_value(style).unwrap();
    assert_eq!(
      value,
      json!({
        "shape": "arrow",
        "strokeColor": "black",
        "fillColor": "gold",
        "scale": 5.0,
        "fillOpacity": 1.0,
        "strokeWeight": 1.0,
        "title": "now"
      })
    );
  }
}
