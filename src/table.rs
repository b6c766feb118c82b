use crate::markup::MarkupNode;
use crate::model::{Block, ParagraphBlock, TableBlock, TableCell, TableRow};
use crate::walker::{collect_inline, ListContext};
use tracing::debug;

pub const CELL_WIDTH_PCT: u32 = 50;

fn extract_cell(cell: &MarkupNode, ctx: &ListContext) -> TableCell {
    let (runs, nested) = collect_inline(cell.children(), ctx);
    let mut blocks = Vec::with_capacity(nested.len() + 1);
    if !runs.is_empty() {
        blocks.push(Block::Paragraph(ParagraphBlock::new(runs)));
    }
    blocks.extend(nested);
    TableCell {
        blocks,
        width_pct: CELL_WIDTH_PCT,
    }
}

/// Build a table block from a `table` node.
///
/// Rows come from the first direct `tbody` when there is one, otherwise from
/// the table's own children. Rows without `td`/`th` cells are dropped, and a
/// table whose cells are all empty yields nothing.
pub fn extract_table(table: &MarkupNode, ctx: &ListContext) -> Option<TableBlock> {
    let candidates = table
        .children()
        .iter()
        .find(|c| c.is_tag("tbody"))
        .map_or(table.children(), |tbody| tbody.children());

    let mut rows: Vec<TableRow> = Vec::new();
    for tr in candidates.iter().filter(|c| c.is_tag("tr")) {
        let cells: Vec<TableCell> = tr
            .children()
            .iter()
            .filter(|c| c.is_tag("td") || c.is_tag("th"))
            .map(|c| extract_cell(c, ctx))
            .collect();
        if !cells.is_empty() {
            rows.push(TableRow { cells });
        }
    }

    let has_content = rows
        .iter()
        .any(|r| r.cells.iter().any(|c| !c.blocks.is_empty()));
    if !has_content {
        return None;
    }
    debug!(rows = rows.len(), "extracted table");
    Some(TableBlock { rows })
}
