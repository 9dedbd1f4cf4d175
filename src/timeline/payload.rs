use std::{fmt::Display, str::FromStr};

use serde_json::Value;
use thiserror::Error;

use crate::{
  coordinates::WGS84Coordinate,
  label::{wrap_label, wrap_label_pair},
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PayloadError {
  #[error("Timeline document must be an array of rows.")]
  NotAnArray,
  #[error("Row must be a [class, cells] pair.")]
  RowShape,
  #[error("Unknown row class '{0}'.")]
  UnknownRowClass(String),
  #[error("Cell {index} must be a [value, span] pair.")]
  CellShape { index: usize },
  #[error("Cell {index} has invalid span {span}.")]
  InvalidSpan { index: usize, span: String },
  #[error("Cell {index} has an unreadable {class} value: {reason}.")]
  CellValue {
    index: usize,
    class: RowClass,
    reason: &'static str,
  },
}

/// What a row of the table shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowClass {
  Time,
  Activity,
  Place,
}

impl RowClass {
  #[must_use]
  pub fn name(self) -> &'static str {
    match self {
      RowClass::Time => "time",
      RowClass::Activity => "activity",
      RowClass::Place => "place",
    }
  }
}

impl Display for RowClass {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for RowClass {
  type Err = PayloadError;
  fn from_str(input: &str) -> Result<RowClass, Self::Err> {
    match input {
      "time" => Ok(RowClass::Time),
      "activity" => Ok(RowClass::Activity),
      "place" => Ok(RowClass::Place),
      other => Err(PayloadError::UnknownRowClass(other.to_string())),
    }
  }
}

/// Which edge of the cell a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
  Start,
  Both,
  End,
  #[default]
  None,
}

impl Alignment {
  /// Unknown alignment tags are treated as no alignment.
  fn from_value(value: Option<&Value>) -> Self {
    match value.and_then(Value::as_str) {
      Some("start") => Alignment::Start,
      Some("both") => Alignment::Both,
      Some("end") => Alignment::End,
      _ => Alignment::None,
    }
  }

  #[must_use]
  pub fn classes(self) -> &'static [&'static str] {
    match self {
      Alignment::Start => &["left"],
      Alignment::Both => &["left", "both"],
      Alignment::End => &["right"],
      Alignment::None => &[],
    }
  }
}

/// The two document layouts the server produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadShape {
  /// Values are `[data, alignment]` pairs and places come pre-resolved.
  #[default]
  Rich,
  /// Places may carry `{"coordinates": [lon, lat]}` to be named by reverse geocoding.
  Flat,
}

impl PayloadShape {
  /// Wraps a place label the way this layout always has: the rich layout keeps every
  /// alternate name, the flat layout never shows more than two.
  #[must_use]
  pub fn wrap(self, label: &str) -> String {
    match self {
      PayloadShape::Rich => wrap_label(label),
      PayloadShape::Flat => wrap_label_pair(label),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaceValue {
  Label(String),
  /// Moving between places, there is no stop to name.
  Transit,
  /// Still to be named.
  Coordinate(WGS84Coordinate),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
  Time {
    label: String,
    alignment: Alignment,
  },
  Activity {
    label: String,
    duration: String,
  },
  Place {
    place: PlaceValue,
    alignment: Alignment,
  },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
  /// `None` marks a gap that only keeps the columns aligned.
  pub value: Option<CellValue>,
  pub span: u32,
}

impl Cell {
  #[must_use]
  pub fn gap(span: u32) -> Self {
    Self { value: None, span }
  }

  #[must_use]
  pub fn new(value: CellValue, span: u32) -> Self {
    Self {
      value: Some(value),
      span,
    }
  }
}

/// One row of the table as sent by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
  pub row_class: RowClass,
  pub cells: Vec<Cell>,
}

impl Segment {
  #[must_use]
  pub fn new(row_class: RowClass, cells: Vec<Cell>) -> Self {
    Self { row_class, cells }
  }

  #[must_use]
  pub fn span(&self) -> u32 {
    self.cells.iter().map(|c| c.span).sum()
  }
}

/// A decoded timeline document. Rows that failed to decode keep their error so they can
/// be shown in place instead of dropping the whole table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimelineDocument {
  pub shape: PayloadShape,
  pub rows: Vec<Result<Segment, PayloadError>>,
}

impl TimelineDocument {
  pub fn segments(&self) -> impl Iterator<Item = &Segment> {
    self.rows.iter().filter_map(|r| r.as_ref().ok())
  }
}

/// Decodes `[[class, [[value, span], ...]], ...]`.
///
/// Only a top level that is not an array fails as a whole, everything else fails per row.
pub fn parse_document(value: &Value) -> Result<TimelineDocument, PayloadError> {
  let rows = value.as_array().ok_or(PayloadError::NotAnArray)?;
  let shape = detect_shape(rows);
  log::debug!("Timeline document with {} rows, {shape:?} layout", rows.len());

  let rows = rows
    .iter()
    .map(|row| {
      parse_row(row).inspect_err(|e| log::warn!("Skipping malformed timeline row: {e}"))
    })
    .collect();
  Ok(TimelineDocument { shape, rows })
}

/// A document is flat as soon as one place cell carries raw coordinates.
fn detect_shape(rows: &[Value]) -> PayloadShape {
  let has_coordinates = rows
    .iter()
    .filter(|row| row.get(0).and_then(Value::as_str) == Some("place"))
    .filter_map(|row| row.get(1).and_then(Value::as_array))
    .flatten()
    .filter_map(|cell| cell.get(0))
    .any(|value| place_coordinates(value).is_some());
  if has_coordinates {
    PayloadShape::Flat
  } else {
    PayloadShape::Rich
  }
}

fn parse_row(row: &Value) -> Result<Segment, PayloadError> {
  let row = row.as_array().ok_or(PayloadError::RowShape)?;
  let (Some(class), Some(cells), 2) = (
    row.first().and_then(Value::as_str),
    row.get(1).and_then(Value::as_array),
    row.len(),
  ) else {
    return Err(PayloadError::RowShape);
  };
  let row_class: RowClass = class.parse()?;
  let cells = cells
    .iter()
    .enumerate()
    .map(|(index, cell)| parse_cell(row_class, index, cell))
    .collect::<Result<Vec<_>, _>>()?;
  Ok(Segment::new(row_class, cells))
}

fn parse_cell(row_class: RowClass, index: usize, cell: &Value) -> Result<Cell, PayloadError> {
  let pair = cell
    .as_array()
    .filter(|pair| pair.len() == 2)
    .ok_or(PayloadError::CellShape { index })?;

  let span = pair[1]
    .as_u64()
    .and_then(|s| u32::try_from(s).ok())
    .filter(|s| *s > 0)
    .ok_or_else(|| PayloadError::InvalidSpan {
      index,
      span: pair[1].to_string(),
    })?;

  let value = &pair[0];
  if value.is_null() {
    return Ok(Cell::gap(span));
  }

  let error = |reason| PayloadError::CellValue {
    index,
    class: row_class,
    reason,
  };
  let value = match row_class {
    RowClass::Time => parse_time(value).ok_or_else(|| error("expected [label, alignment]"))?,
    RowClass::Activity => {
      parse_activity(value).ok_or_else(|| error("expected [label, duration]"))?
    }
    RowClass::Place => {
      parse_place(value).ok_or_else(|| error("expected a label, false or coordinates"))?
    }
  };
  Ok(Cell::new(value, span))
}

fn parse_time(value: &Value) -> Option<CellValue> {
  match value {
    Value::String(label) => Some(CellValue::Time {
      label: label.clone(),
      alignment: Alignment::None,
    }),
    Value::Array(pair) => Some(CellValue::Time {
      label: pair.first()?.as_str()?.to_string(),
      alignment: Alignment::from_value(pair.get(1)),
    }),
    _ => None,
  }
}

fn parse_activity(value: &Value) -> Option<CellValue> {
  let pair = value.as_array()?;
  let label = pair.first()?.as_str()?.to_string();
  let duration = match pair.get(1) {
    None | Some(Value::Null) => String::new(),
    Some(duration) => duration.as_str()?.to_string(),
  };
  Some(CellValue::Activity { label, duration })
}

fn parse_place(value: &Value) -> Option<CellValue> {
  let (data, alignment) = match value {
    Value::Array(pair) if (1..=2).contains(&pair.len()) => {
      (&pair[0], Alignment::from_value(pair.get(1)))
    }
    other => (other, Alignment::None),
  };
  let place = match data {
    Value::String(label) => PlaceValue::Label(label.clone()),
    Value::Bool(false) => PlaceValue::Transit,
    other => PlaceValue::Coordinate(place_coordinates(other)?),
  };
  Some(CellValue::Place { place, alignment })
}

fn place_coordinates(value: &Value) -> Option<WGS84Coordinate> {
  let data = match value {
    Value::Array(pair) => pair.first()?,
    other => other,
  };
  WGS84Coordinate::from_position(data.get("coordinates")?).filter(WGS84Coordinate::is_valid)
}
