use crate::{
  coordinates::WGS84Coordinate,
  registry::{Glyph, glyph_for},
  session::Generation,
};

use super::payload::{
  CellValue, PayloadError, PayloadShape, PlaceValue, RowClass, Segment, TimelineDocument,
};

/// Text of the row shown instead of an empty table.
pub const NO_DATA_TEXT: &str = "No trips.";

/// Reverse geocoding progress of a place cell. A cell moves strictly forward through
/// these states, so it is never looked up twice.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PlaceSlot {
  /// Nothing to look up.
  #[default]
  Fixed,
  Pending(WGS84Coordinate),
  InFlight(WGS84Coordinate),
  /// A lookup landed, named or not.
  Resolved,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderCell {
  pub span: u32,
  pub classes: Vec<String>,
  pub text: String,
  /// Drawn between `text` and `detail`.
  pub glyph: Option<Glyph>,
  pub detail: Option<String>,
  pub slot: PlaceSlot,
}

impl RenderCell {
  fn new(row_class: RowClass, span: u32) -> Self {
    Self {
      span,
      classes: vec![row_class.name().to_string()],
      ..Default::default()
    }
  }

  #[must_use]
  pub fn has_class(&self, class: &str) -> bool {
    self.classes.iter().any(|c| c == class)
  }

  #[must_use]
  pub fn is_gap(&self) -> bool {
    self.has_class("gap")
  }

  #[must_use]
  pub fn is_transit_gap(&self) -> bool {
    self.has_class("transit-gap")
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowKind {
  Segment(RowClass),
  /// Stands in for an empty table.
  Placeholder,
  /// A row the server sent but that could not be read.
  Error(PayloadError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderRow {
  pub kind: RowKind,
  pub cells: Vec<RenderCell>,
}

impl RenderRow {
  #[must_use]
  pub fn span(&self) -> u32 {
    self.cells.iter().map(|c| c.span).sum()
  }

  #[must_use]
  pub fn class(&self) -> &'static str {
    match &self.kind {
      RowKind::Segment(class) => class.name(),
      RowKind::Placeholder => "empty",
      RowKind::Error(_) => "error",
    }
  }
}

/// Position of a cell in a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
  pub row: usize,
  pub column: usize,
}

/// A place cell waiting for a name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnrichmentRequest {
  pub generation: Generation,
  pub cell: CellRef,
  pub coordinate: WGS84Coordinate,
}

/// The outcome of a lookup. `name` is `None` when the lookup failed or found nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentResult {
  pub generation: Generation,
  pub cell: CellRef,
  pub name: Option<String>,
}

/// The laid out table of one day.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderGrid {
  pub generation: Generation,
  pub shape: PayloadShape,
  pub rows: Vec<RenderRow>,
}

/// Lays out segments of the rich layout.
#[must_use]
pub fn build_grid(segments: &[Segment]) -> RenderGrid {
  GridBuilder::new(PayloadShape::Rich, Generation::default()).build(segments.iter().map(Ok))
}

/// Lays out a decoded document, keeping its malformed rows as error rows.
#[must_use]
pub fn build_document(document: &TimelineDocument, generation: Generation) -> RenderGrid {
  GridBuilder::new(document.shape, generation).build(document.rows.iter().map(Result::as_ref))
}

struct GridBuilder {
  shape: PayloadShape,
  generation: Generation,
}

impl GridBuilder {
  fn new(shape: PayloadShape, generation: Generation) -> Self {
    Self { shape, generation }
  }

  fn build<'a, I>(&self, rows: I) -> RenderGrid
  where
    I: IntoIterator<Item = Result<&'a Segment, &'a PayloadError>>,
  {
    let mut rows: Vec<RenderRow> = rows
      .into_iter()
      .map(|row| match row {
        Ok(segment) => self.segment_row(segment),
        Err(error) => RenderRow {
          kind: RowKind::Error(error.clone()),
          cells: Vec::new(),
        },
      })
      .collect();

    if rows.is_empty() {
      rows.push(RenderRow {
        kind: RowKind::Placeholder,
        cells: vec![RenderCell {
          span: 1,
          text: NO_DATA_TEXT.to_string(),
          ..Default::default()
        }],
      });
    }

    let mut grid = RenderGrid {
      generation: self.generation,
      shape: self.shape,
      rows,
    };
    grid.fill_error_rows();

    let misaligned = grid.misaligned_rows();
    if !misaligned.is_empty() {
      log::warn!(
        "Timeline rows {misaligned:?} do not cover all {} columns",
        grid.columns()
      );
    }
    grid
  }

  fn segment_row(&self, segment: &Segment) -> RenderRow {
    let cells = segment
      .cells
      .iter()
      .map(|cell| {
        let mut out = RenderCell::new(segment.row_class, cell.span);
        match &cell.value {
          None => out.classes.push("gap".to_string()),
          Some(value) => self.fill_cell(&mut out, value),
        }
        out
      })
      .collect();
    RenderRow {
      kind: RowKind::Segment(segment.row_class),
      cells,
    }
  }

  fn fill_cell(&self, out: &mut RenderCell, value: &CellValue) {
    match value {
      CellValue::Time { label, alignment } => {
        out.text.clone_from(label);
        add_classes(out, alignment.classes());
      }
      CellValue::Activity { label, duration } => {
        out.text.clone_from(label);
        let mode = label.split(' ').next().unwrap_or_default();
        if !mode.is_empty() {
          out.classes.push(mode.to_string());
        }
        out.glyph = glyph_for(mode);
        out.detail = Some(duration.clone());
      }
      CellValue::Place { place, alignment } => {
        add_classes(out, alignment.classes());
        match place {
          PlaceValue::Transit => out.classes.push("transit-gap".to_string()),
          PlaceValue::Label(label) => out.text = self.shape.wrap(label),
          PlaceValue::Coordinate(coordinate) => out.slot = PlaceSlot::Pending(*coordinate),
        }
      }
    }
  }
}

fn add_classes(cell: &mut RenderCell, classes: &[&str]) {
  cell
    .classes
    .extend(classes.iter().map(|class| (*class).to_string()));
}

impl RenderGrid {
  /// Width of the table, the widest row decides.
  #[must_use]
  pub fn columns(&self) -> u32 {
    self
      .rows
      .iter()
      .filter(|r| matches!(r.kind, RowKind::Segment(_)))
      .map(RenderRow::span)
      .max()
      .unwrap_or(1)
      .max(1)
  }

  /// Indices of segment rows not covering every column.
  #[must_use]
  pub fn misaligned_rows(&self) -> Vec<usize> {
    let columns = self.columns();
    self
      .rows
      .iter()
      .enumerate()
      .filter(|(_, r)| matches!(r.kind, RowKind::Segment(_)) && r.span() != columns)
      .map(|(i, _)| i)
      .collect()
  }

  #[must_use]
  pub fn is_placeholder(&self) -> bool {
    matches!(
      self.rows.as_slice(),
      [RenderRow {
        kind: RowKind::Placeholder,
        ..
      }]
    )
  }

  #[must_use]
  pub fn cell(&self, cell: CellRef) -> Option<&RenderCell> {
    self.rows.get(cell.row)?.cells.get(cell.column)
  }

  /// Error rows get one cell spanning the table and showing what went wrong.
  fn fill_error_rows(&mut self) {
    let columns = self.columns();
    for row in &mut self.rows {
      if let RowKind::Error(error) = &row.kind {
        row.cells = vec![RenderCell {
          span: columns,
          classes: vec!["error".to_string()],
          text: error.to_string(),
          ..Default::default()
        }];
      }
    }
  }

  /// Hands out every cell still waiting for a name and marks it in flight.
  pub fn take_enrichment_requests(&mut self) -> Vec<EnrichmentRequest> {
    let generation = self.generation;
    let mut requests = Vec::new();
    for (row_index, row) in self.rows.iter_mut().enumerate() {
      for (column, cell) in row.cells.iter_mut().enumerate() {
        if let PlaceSlot::Pending(coordinate) = cell.slot {
          cell.slot = PlaceSlot::InFlight(coordinate);
          requests.push(EnrichmentRequest {
            generation,
            cell: CellRef {
              row: row_index,
              column,
            },
            coordinate,
          });
        }
      }
    }
    requests
  }

  /// Writes a lookup result into its cell.
  ///
  /// Results of another generation, for unknown cells or for cells not in flight are
  /// ignored. Returns whether the grid changed.
  pub fn apply_enrichment(&mut self, result: &EnrichmentResult) -> bool {
    if result.generation != self.generation {
      log::debug!(
        "Dropping place name for {:?} of stale generation {:?}",
        result.cell,
        result.generation
      );
      return false;
    }
    let shape = self.shape;
    let Some(cell) = self
      .rows
      .get_mut(result.cell.row)
      .and_then(|r| r.cells.get_mut(result.cell.column))
    else {
      return false;
    };
    if !matches!(cell.slot, PlaceSlot::InFlight(_)) {
      return false;
    }
    cell.slot = PlaceSlot::Resolved;
    if let Some(name) = &result.name {
      cell.text = shape.wrap(name);
    }
    true
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::timeline::payload::{Alignment, Cell};

  fn time(label: &str, alignment: Alignment, span: u32) -> Cell {
    Cell::new(
      CellValue::Time {
        label: label.to_string(),
        alignment,
      },
      span,
    )
  }

  fn activity(label: &str, duration: &str, span: u32) -> Cell {
    Cell::new(
      CellValue::Activity {
        label: label.to_string(),
        duration: duration.to_string(),
      },
      span,
    )
  }

  fn place(place: PlaceValue, span: u32) -> Cell {
    Cell::new(
      CellValue::Place {
        place,
        alignment: Alignment::None,
      },
      span,
    )
  }

  #[test]
  fn test_empty_input_gives_placeholder_row() {
    let grid = build_grid(&[]);
    assert_eq!(grid.rows.len(), 1);
    assert!(grid.is_placeholder());
    assert_eq!(grid.rows[0].cells[0].text, NO_DATA_TEXT);
  }

  #[test]
  fn test_time_alignment_classes() {
    let grid = build_grid(&[Segment::new(
      RowClass::Time,
      vec![
        time("08:00", Alignment::Start, 1),
        time("09:00", Alignment::Both, 1),
        time("10:00", Alignment::End, 1),
        time("11:00", Alignment::None, 1),
        Cell::gap(2),
      ],
    )]);
    let cells = &grid.rows[0].cells;
    assert_eq!(cells[0].classes, vec!["time", "left"]);
    assert_eq!(cells[1].classes, vec!["time", "left", "both"]);
    assert_eq!(cells[2].classes, vec!["time", "right"]);
    assert_eq!(cells[3].classes, vec!["time"]);
    assert_eq!(cells[3].text, "11:00");
    assert!(cells[4].is_gap());
    assert_eq!(cells[4].span, 2);
    assert!(cells[4].text.is_empty());
  }

  #[test]
  fn test_activity_cell_gets_mode_and_glyph() {
    let grid = build_grid(&[Segment::new(
      RowClass::Activity,
      vec![
        activity("ON_BICYCLE 4.2 km", "0:21", 2),
        activity("HOVERBOARD", "0:01", 1),
      ],
    )]);
    let bike = &grid.rows[0].cells[0];
    assert_eq!(bike.text, "ON_BICYCLE 4.2 km");
    assert_eq!(bike.classes, vec!["activity", "ON_BICYCLE"]);
    assert_eq!(bike.glyph, glyph_for("ON_BICYCLE"));
    assert_eq!(bike.detail.as_deref(), Some("0:21"));

    let unknown = &grid.rows[0].cells[1];
    assert_eq!(unknown.glyph, None);
    assert_eq!(unknown.classes, vec!["activity", "HOVERBOARD"]);
    assert_eq!(unknown.text, "HOVERBOARD");
  }

  #[test]
  fn test_transit_gap_differs_from_alignment_gap() {
    let grid = build_grid(&[Segment::new(
      RowClass::Place,
      vec![place(PlaceValue::Transit, 1), Cell::gap(1)],
    )]);
    let cells = &grid.rows[0].cells;
    assert!(cells[0].is_transit_gap());
    assert!(!cells[0].is_gap());
    assert!(cells[1].is_gap());
    assert!(!cells[1].is_transit_gap());
  }

  #[test]
  fn test_place_label_is_wrapped() {
    let grid = build_grid(&[Segment::new(
      RowClass::Place,
      vec![place(PlaceValue::Label("Otaniemi / TKK".to_string()), 1)],
    )]);
    assert_eq!(grid.rows[0].cells[0].text, "Otaniemi /\u{a0}TKK");
  }

  #[test]
  fn test_rows_span_all_columns() {
    let grid = build_grid(&[
      Segment::new(
        RowClass::Time,
        vec![time("08:00", Alignment::Start, 2), Cell::gap(1)],
      ),
      Segment::new(RowClass::Activity, vec![activity("BUS", "0:30", 3)]),
    ]);
    assert_eq!(grid.columns(), 3);
    assert!(grid.misaligned_rows().is_empty());
    assert!(grid.rows.iter().all(|r| r.span() == grid.columns()));
  }

  #[test]
  fn test_misaligned_rows_are_reported() {
    let grid = build_grid(&[
      Segment::new(RowClass::Activity, vec![activity("BUS", "0:30", 3)]),
      Segment::new(RowClass::Activity, vec![activity("TRAM", "0:10", 2)]),
    ]);
    assert_eq!(grid.misaligned_rows(), vec![1]);
  }

  #[test]
  fn test_error_rows_span_table() {
    let document = TimelineDocument {
      shape: PayloadShape::Rich,
      rows: vec![
        Ok(Segment::new(RowClass::Activity, vec![activity("BUS", "0:30", 4)])),
        Err(PayloadError::RowShape),
      ],
    };
    let grid = build_document(&document, Generation::default());
    assert_eq!(grid.rows[1].class(), "error");
    assert_eq!(grid.rows[1].cells.len(), 1);
    assert_eq!(grid.rows[1].cells[0].span, 4);
    assert_eq!(grid.rows[1].cells[0].text, PayloadError::RowShape.to_string());
    assert!(!grid.is_placeholder());
  }

  #[test]
  fn test_enrichment_is_requested_once_and_applied() {
    let coordinate = WGS84Coordinate::new(60.18, 24.83);
    let document = TimelineDocument {
      shape: PayloadShape::Flat,
      rows: vec![Ok(Segment::new(
        RowClass::Place,
        vec![place(PlaceValue::Coordinate(coordinate), 1)],
      ))],
    };
    let generation = Generation::default().next();
    let mut grid = build_document(&document, generation);
    assert!(grid.rows[0].cells[0].text.is_empty());

    let requests = grid.take_enrichment_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].coordinate, coordinate);
    assert!(grid.take_enrichment_requests().is_empty());

    let result = EnrichmentResult {
      generation,
      cell: requests[0].cell,
      name: Some("Otakaari / Otaniementie / Espoo".to_string()),
    };
    assert!(grid.apply_enrichment(&result));
    assert_eq!(grid.rows[0].cells[0].text, "Otakaari /\u{a0}Otaniementie");
    assert_eq!(grid.rows[0].cells[0].slot, PlaceSlot::Resolved);

    // A second landing for the same cell changes nothing.
    let again = EnrichmentResult {
      name: Some("Elsewhere".to_string()),
      ..result
    };
    assert!(!grid.apply_enrichment(&again));
    assert_eq!(grid.rows[0].cells[0].text, "Otakaari /\u{a0}Otaniementie");
  }

  #[test]
  fn test_stale_enrichment_is_ignored() {
    let coordinate = WGS84Coordinate::new(60.18, 24.83);
    let document = TimelineDocument {
      shape: PayloadShape::Flat,
      rows: vec![Ok(Segment::new(
        RowClass::Place,
        vec![place(PlaceValue::Coordinate(coordinate), 1)],
      ))],
    };
    let old = Generation::default().next();
    let mut grid = build_document(&document, old.next());
    let requests = grid.take_enrichment_requests();

    let stale = EnrichmentResult {
      generation: old,
      cell: requests[0].cell,
      name: Some("Kamppi".to_string()),
    };
    assert!(!grid.apply_enrichment(&stale));
    assert!(grid.rows[0].cells[0].text.is_empty());

    let missing = EnrichmentResult {
      generation: grid.generation,
      cell: CellRef { row: 3, column: 0 },
      name: Some("Kamppi".to_string()),
    };
    assert!(!grid.apply_enrichment(&missing));
  }

  #[test]
  fn test_empty_lookup_leaves_cell_blank() {
    let coordinate = WGS84Coordinate::new(60.18, 24.83);
    let document = TimelineDocument {
      shape: PayloadShape::Flat,
      rows: vec![Ok(Segment::new(
        RowClass::Place,
        vec![place(PlaceValue::Coordinate(coordinate), 1)],
      ))],
    };
    let mut grid = build_document(&document, Generation::default());
    let request = grid.take_enrichment_requests()[0];
    assert!(grid.apply_enrichment(&EnrichmentResult {
      generation: request.generation,
      cell: request.cell,
      name: None,
    }));
    assert!(grid.rows[0].cells[0].text.is_empty());
    assert_eq!(grid.rows[0].cells[0].slot, PlaceSlot::Resolved);
  }
}
