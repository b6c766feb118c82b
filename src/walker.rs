//! Recursive walk from markup nodes to document blocks.
//!
//! The walk runs in one of two modes, chosen by the [`Sink`] it is handed:
//! block mode appends whole blocks, inline mode appends runs to the
//! paragraph or list item currently being collected. Blocks produced while
//! collecting inline content (a nested list inside an item, a table inside
//! a paragraph) are kept aside and emitted right after their parent.

use crate::inline::format_inline;
use crate::markup::MarkupNode;
use crate::model::{Block, ListItemBlock, ListKind, ParagraphBlock, StyledRun, BULLET};
use crate::table::extract_table;
use tracing::{debug, trace};

/// Stack of enclosing list kinds. Copied on push so each level of the
/// recursion owns its own view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListContext {
    stack: Vec<ListKind>,
}

impl ListContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nested(&self, kind: ListKind) -> Self {
        let mut stack = self.stack.clone();
        stack.push(kind);
        Self { stack }
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.stack.len().saturating_sub(1)
    }

    /// Kind of the innermost list; an item outside any list is unordered.
    pub fn kind(&self) -> ListKind {
        self.stack.last().copied().unwrap_or(ListKind::Unordered)
    }
}

pub struct Sink<'a> {
    pub blocks: &'a mut Vec<Block>,
    pub runs: Option<&'a mut Vec<StyledRun>>,
}

impl<'a> Sink<'a> {
    pub fn blocks(blocks: &'a mut Vec<Block>) -> Self {
        Self { blocks, runs: None }
    }

    pub fn inline(blocks: &'a mut Vec<Block>, runs: &'a mut Vec<StyledRun>) -> Self {
        Self {
            blocks,
            runs: Some(runs),
        }
    }
}

/// Walk the top-level nodes of a document.
pub fn walk_document(nodes: &[MarkupNode]) -> Vec<Block> {
    let mut blocks = Vec::new();
    let ctx = ListContext::new();
    let mut sink = Sink::blocks(&mut blocks);
    walk_nodes(nodes, &mut sink, &ctx);
    debug!(blocks = blocks.len(), "walked markup tree");
    blocks
}

pub fn walk_nodes(nodes: &[MarkupNode], sink: &mut Sink<'_>, ctx: &ListContext) {
    for node in nodes {
        walk_node(node, sink, ctx);
    }
}

pub fn walk_node(node: &MarkupNode, sink: &mut Sink<'_>, ctx: &ListContext) {
    let (name, children) = match node {
        MarkupNode::Text { content } => {
            emit_text(content, sink);
            return;
        }
        MarkupNode::Tag { name, children, .. } => (name.as_str(), children.as_slice()),
    };

    match name {
        "p" => {
            let (runs, nested) = collect_inline(children, ctx);
            if !runs.is_empty() {
                sink.blocks.push(Block::Paragraph(ParagraphBlock::new(runs)));
            }
            sink.blocks.extend(nested);
        }
        "a" if node.attr("href").is_some_and(|h| !h.trim().is_empty()) => emit_link(node, sink),
        "table" => {
            if let Some(table) = extract_table(node, ctx) {
                sink.blocks.push(Block::Table(table));
            }
        }
        "ol" => walk_nodes(children, sink, &ctx.nested(ListKind::Ordered)),
        "ul" => walk_nodes(children, sink, &ctx.nested(ListKind::Unordered)),
        "li" => {
            let (mut runs, nested) = collect_inline(children, ctx);
            if !runs.is_empty() {
                let kind = ctx.kind();
                if kind == ListKind::Unordered {
                    runs.insert(0, StyledRun::plain(BULLET));
                }
                sink.blocks.push(Block::ListItem(ListItemBlock {
                    runs,
                    depth: ctx.depth(),
                    kind,
                }));
            }
            sink.blocks.extend(nested);
        }
        "script" | "style" | "template" => {}
        other => {
            trace!(tag = other, "passing through");
            walk_nodes(children, sink, ctx);
        }
    }
}

/// Walk `children` in inline mode. Returns the collected runs and any
/// blocks that surfaced underneath them.
pub fn collect_inline(children: &[MarkupNode], ctx: &ListContext) -> (Vec<StyledRun>, Vec<Block>) {
    let mut runs = Vec::new();
    let mut nested = Vec::new();
    let mut sink = Sink::inline(&mut nested, &mut runs);
    walk_nodes(children, &mut sink, ctx);
    (runs, nested)
}

/// Whitespace-only text nodes are formatting between tags and never become runs.
fn emit_text(content: &str, sink: &mut Sink<'_>) {
    if content.trim().is_empty() {
        return;
    }
    let runs = format_inline(content);
    match sink.runs.as_deref_mut() {
        Some(sink_runs) => sink_runs.extend(runs),
        None => sink.blocks.push(Block::Paragraph(ParagraphBlock::new(runs))),
    }
}

fn emit_link(node: &MarkupNode, sink: &mut Sink<'_>) {
    let Some(url) = node.attr("href") else { return };
    let text = node.flattened_text();
    if text.trim().is_empty() {
        return;
    }
    let run = StyledRun::link(text, url);
    match sink.runs.as_deref_mut() {
        Some(runs) => runs.push(run),
        None => sink
            .blocks
            .push(Block::Paragraph(ParagraphBlock::unspaced(vec![run]))),
    }
}
