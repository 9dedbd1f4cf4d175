mod grid;
pub mod html;
mod payload;

pub use grid::{
  CellRef, EnrichmentRequest, EnrichmentResult, PlaceSlot, RenderCell, RenderGrid, RenderRow,
  RowKind, build_document, build_grid,
};
pub use payload::{
  Alignment, Cell, CellValue, PayloadError, PayloadShape, PlaceValue, RowClass, Segment,
  TimelineDocument, parse_document,
};
