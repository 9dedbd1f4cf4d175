use std::fmt::Write;

use itertools::Itertools;

use super::grid::{RenderCell, RenderGrid, RenderRow};

fn html_escape(s: &str) -> String {
  s.replace('&', "&amp;")
    .replace('<', "&lt;")
    .replace('>', "&gt;")
    .replace('"', "&quot;")
}

/// One line per row, cells in order.
#[must_use]
pub fn render_table(grid: &RenderGrid) -> String {
  grid.rows.iter().map(render_row).join("\n")
}

fn render_row(row: &RenderRow) -> String {
  let mut out = format!("<tr class=\"{}\">", row.class());
  for cell in &row.cells {
    render_cell(&mut out, cell);
  }
  out.push_str("</tr>");
  out
}

fn render_cell(out: &mut String, cell: &RenderCell) {
  out.push_str("<td");
  if !cell.classes.is_empty() {
    let _ = write!(
      out,
      " class=\"{}\"",
      html_escape(&cell.classes.iter().join(" "))
    );
  }
  if cell.span != 1 {
    let _ = write!(out, " colspan=\"{}\"", cell.span);
  }
  out.push('>');

  out.push_str(&html_escape(&cell.text));
  if cell.is_transit_gap() {
    out.push_str("<div></div>");
  }
  if let Some(glyph) = cell.glyph {
    let _ = write!(out, "<div>{}</div>", html_escape(glyph.as_str()));
  }
  if let Some(detail) = &cell.detail {
    out.push_str(&html_escape(detail));
  }
  out.push_str("</td>");
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::timeline::{Alignment, Cell, CellValue, PlaceValue, RowClass, Segment, build_grid};

  #[test]
  fn test_renders_placeholder() {
    assert_eq!(
      render_table(&build_grid(&[])),
      "<tr class=\"empty\"><td>No trips.</td></tr>"
    );
  }

  #[test]
  fn test_renders_cells() {
    let grid = build_grid(&[
      Segment::new(
        RowClass::Time,
        vec![
          Cell::new(
            CellValue::Time {
              label: "08:05".to_string(),
              alignment: Alignment::Both,
            },
            2,
          ),
          Cell::gap(1),
        ],
      ),
      Segment::new(
        RowClass::Activity,
        vec![Cell::new(
          CellValue::Activity {
            label: "TILTING".to_string(),
            duration: "0:02".to_string(),
          },
          3,
        )],
      ),
      Segment::new(
        RowClass::Place,
        vec![
          Cell::new(
            CellValue::Place {
              place: PlaceValue::Label("A & B".to_string()),
              alignment: Alignment::None,
            },
            2,
          ),
          Cell::new(
            CellValue::Place {
              place: PlaceValue::Transit,
              alignment: Alignment::None,
            },
            1,
          ),
        ],
      ),
    ]);

    let html = render_table(&grid);
    let lines: Vec<_> = html.lines().collect();
    assert_eq!(
      lines[0],
      "<tr class=\"time\"><td class=\"time left both\" colspan=\"2\">08:05</td><td class=\"time gap\"></td></tr>"
    );
    assert_eq!(
      lines[1],
      "<tr class=\"activity\"><td class=\"activity TILTING\" colspan=\"3\">TILTING<div>/</div>0:02</td></tr>"
    );
    assert_eq!(
      lines[2],
      "<tr class=\"place\"><td class=\"place\" colspan=\"2\">A &amp; B</td><td class=\"place transit-gap\"><div></div></td></tr>"
    );
  }
}
