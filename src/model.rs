//! Document model produced by the tree walker and consumed by the DOCX encoder.

pub const DEFAULT_COLOR: &str = "000000";
pub const RED: &str = "FF0000";
pub const BULLET: &str = "\u{2022} ";

/// One contiguous span of text sharing a single formatting treatment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledRun {
    pub text: String,
    pub bold: bool,
    /// `None` lets the character style decide (hyperlinks).
    pub color: Option<String>,
    pub link: Option<String>,
}

impl StyledRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            color: Some(DEFAULT_COLOR.to_string()),
            link: None,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            bold: true,
            ..Self::plain(text)
        }
    }

    pub fn colored(text: impl Into<String>, hex: &str) -> Self {
        Self {
            color: Some(hex.to_string()),
            ..Self::plain(text)
        }
    }

    pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            color: None,
            link: Some(url.into()),
        }
    }

    pub fn is_link(&self) -> bool {
        self.link.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Ordered,
    Unordered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParagraphBlock {
    pub runs: Vec<StyledRun>,
    /// Body paragraphs get the fixed spacing; a bare hyperlink paragraph does not.
    pub spaced: bool,
}

impl ParagraphBlock {
    pub fn new(runs: Vec<StyledRun>) -> Self {
        Self { runs, spaced: true }
    }

    pub fn unspaced(runs: Vec<StyledRun>) -> Self {
        Self {
            runs,
            spaced: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItemBlock {
    pub runs: Vec<StyledRun>,
    pub depth: usize,
    pub kind: ListKind,
}

impl ListItemBlock {
    /// Numbering level for ordered items; nesting past the last defined
    /// level keeps using the deepest one.
    pub fn numbering_level(&self) -> usize {
        self.depth.min(NumberingDefinition::MAX_LEVEL)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCell {
    pub blocks: Vec<Block>,
    pub width_pct: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableBlock {
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(ParagraphBlock),
    ListItem(ListItemBlock),
    Table(TableBlock),
}

impl Block {
    pub fn runs(&self) -> &[StyledRun] {
        match self {
            Block::Paragraph(p) => &p.runs,
            Block::ListItem(li) => &li.runs,
            Block::Table(_) => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberingLevel {
    pub level: usize,
    /// Level text, e.g. `%1.`.
    pub text: String,
    pub left: u32,
    pub hanging: u32,
}

/// The single decimal numbering shared by every ordered list item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberingDefinition {
    pub reference: String,
    pub num_id: u32,
    pub levels: Vec<NumberingLevel>,
}

impl NumberingDefinition {
    pub const MAX_LEVEL: usize = 2;

    pub fn decimal() -> Self {
        let levels = (0..=Self::MAX_LEVEL)
            .map(|level| NumberingLevel {
                level,
                text: format!("%{}.", level + 1),
                left: 720 * level as u32,
                hanging: 360,
            })
            .collect();
        Self {
            reference: "numbered-list".to_string(),
            num_id: 1,
            levels,
        }
    }

    pub fn has_level(&self, level: usize) -> bool {
        self.levels.iter().any(|l| l.level == level)
    }
}

/// Page margins in twips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMargins {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl PageMargins {
    pub const FIXED: PageMargins = PageMargins {
        top: 640,
        right: 640,
        bottom: 640,
        left: 640,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunDefaults {
    pub font: &'static str,
    /// Half-points.
    pub size: u32,
}

impl RunDefaults {
    pub const FIXED: RunDefaults = RunDefaults {
        font: "Calibri",
        size: 19,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParagraphSpacing {
    pub before: u32,
    pub after: u32,
    pub line: u32,
    /// Left indent added per list nesting level, in twips.
    pub list_indent: u32,
}

impl ParagraphSpacing {
    pub const FIXED: ParagraphSpacing = ParagraphSpacing {
        before: 0,
        after: 100,
        line: 276,
        list_indent: 720,
    };
}

/// Encoder-ready document: ordered blocks plus the constant page setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentModel {
    pub blocks: Vec<Block>,
    pub numbering: NumberingDefinition,
    pub margins: PageMargins,
    pub run_defaults: RunDefaults,
    pub spacing: ParagraphSpacing,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_numbering_defines_three_levels() {
        let n = NumberingDefinition::decimal();
        assert_eq!(n.levels.len(), 3);
        assert_eq!(n.levels[0].text, "%1.");
        assert_eq!(n.levels[2].text, "%3.");
        assert_eq!(n.levels[1].left, 720);
        assert_eq!(n.levels[2].left, 1440);
        assert!(n.levels.iter().all(|l| l.hanging == 360));
        assert!(!n.has_level(3));
    }

    #[test]
    fn deep_items_reuse_last_numbering_level() {
        let item = ListItemBlock {
            runs: vec![StyledRun::plain("x")],
            depth: 5,
            kind: ListKind::Ordered,
        };
        assert_eq!(item.numbering_level(), 2);
    }

    #[test]
    fn link_runs_have_no_explicit_color() {
        let run = StyledRun::link("docs", "http://x.test");
        assert!(run.is_link());
        assert_eq!(run.color, None);
        assert!(!StyledRun::plain("a").is_link());
    }
}
