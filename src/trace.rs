mod feature;

pub use feature::{Feature, FeatureCollection, FeatureError, Geometry, parse_feature_collection};

use crate::registry::{StyleDescriptor, StyleFamily, family_of, style_for};

/// Style of a feature, decided by its `type` property alone.
///
/// The `title` property is carried along as the marker tooltip. Features of unknown
/// type get no style and are not drawn.
#[must_use]
pub fn style_feature(feature: &Feature) -> Option<StyleDescriptor> {
  let style = style_for(&feature.type_tag, &feature.properties);
  if style.is_none() {
    log::debug!("No style for feature type '{}'", feature.type_tag);
  }
  style.map(|s| s.with_title(feature.title().map(str::to_string)))
}

/// Like [`style_feature`] but only for the types of one page.
#[must_use]
pub fn style_feature_in(family: StyleFamily, feature: &Feature) -> Option<StyleDescriptor> {
  if family_of(&feature.type_tag) == Some(family) {
    style_feature(feature)
  } else {
    None
  }
}
