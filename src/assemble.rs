use crate::model::{
    Block, DocumentModel, NumberingDefinition, PageMargins, ParagraphSpacing, RunDefaults,
};
use tracing::debug;

/// Attach the fixed page and numbering setup to a block sequence.
pub fn assemble(blocks: Vec<Block>) -> DocumentModel {
    debug!(blocks = blocks.len(), "assembling document");
    DocumentModel {
        blocks,
        numbering: NumberingDefinition::decimal(),
        margins: PageMargins::FIXED,
        run_defaults: RunDefaults::FIXED,
        spacing: ParagraphSpacing::FIXED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ParagraphBlock, StyledRun};

    #[test]
    fn keeps_blocks_in_order_and_adds_constants() {
        let blocks = vec![
            Block::Paragraph(ParagraphBlock::new(vec![StyledRun::plain("a")])),
            Block::Paragraph(ParagraphBlock::new(vec![StyledRun::plain("b")])),
        ];
        let doc = assemble(blocks.clone());
        assert_eq!(doc.blocks, blocks);
        assert_eq!(doc.margins, PageMargins::FIXED);
        assert_eq!(doc.margins.left, 640);
        assert_eq!(doc.run_defaults.font, "Calibri");
        assert_eq!(doc.run_defaults.size, 19);
        assert_eq!(doc.numbering.levels.len(), 3);
    }

    #[test]
    fn empty_document_is_valid() {
        assert!(assemble(Vec::new()).blocks.is_empty());
    }
}
