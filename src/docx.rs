//! WordprocessingML writer for [`DocumentModel`].

use crate::error::{Error, Result};
use crate::model::{
    Block, DocumentModel, ListItemBlock, ListKind, NumberingDefinition, StyledRun, TableBlock,
};
use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_CT: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const REL_HYPERLINK: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";

const STYLES_RID: &str = "rId1";
const NUMBERING_RID: &str = "rId2";
const FIRST_LINK_RID: u32 = 10;

/// Full table width and cell widths are expressed in fiftieths of a percent.
const PCT_SCALE: u32 = 50;

/// Characters outside the XML 1.0 `Char` production; no escape makes them legal.
fn is_xml_illegal(ch: char) -> bool {
    match ch {
        '\t' | '\n' | '\r' => false,
        '\u{FFFE}' | '\u{FFFF}' => true,
        c => c < '\u{20}',
    }
}

fn xml_escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars().filter(|c| !is_xml_illegal(*c)) {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

fn visit_blocks<'a>(blocks: &'a [Block], f: &mut dyn FnMut(&'a Block)) {
    for b in blocks {
        f(b);
        if let Block::Table(t) = b {
            for row in &t.rows {
                for cell in &row.cells {
                    visit_blocks(&cell.blocks, f);
                }
            }
        }
    }
}

/// Reject models the writer would otherwise turn into a broken package.
fn validate(doc: &DocumentModel) -> Result<()> {
    let mut problem: Option<String> = None;
    visit_blocks(&doc.blocks, &mut |b| {
        if problem.is_some() {
            return;
        }
        match b {
            Block::ListItem(li) if li.kind == ListKind::Ordered => {
                if !doc.numbering.has_level(li.numbering_level()) {
                    problem = Some(format!("no numbering level {}", li.numbering_level()));
                }
            }
            Block::Table(t) => {
                for cell in t.rows.iter().flat_map(|r| r.cells.iter()) {
                    if cell.width_pct == 0 || cell.width_pct > 100 {
                        problem = Some(format!("cell width {}% out of range", cell.width_pct));
                    }
                }
            }
            _ => {}
        }
        for run in b.runs() {
            if run.link.as_deref().is_some_and(|u| u.trim().is_empty()) {
                problem = Some(format!("hyperlink {:?} has no target", run.text));
            }
        }
    });
    match problem {
        Some(msg) => Err(Error::Encoding(msg)),
        None => Ok(()),
    }
}

struct Writer<'a> {
    doc: &'a DocumentModel,
    link_to_rid: BTreeMap<String, String>,
}

impl<'a> Writer<'a> {
    fn new(doc: &'a DocumentModel) -> Self {
        let mut link_to_rid = BTreeMap::new();
        let mut rid_counter = FIRST_LINK_RID;
        visit_blocks(&doc.blocks, &mut |b| {
            for run in b.runs() {
                if let Some(href) = &run.link {
                    if !link_to_rid.contains_key(href) {
                        link_to_rid.insert(href.clone(), format!("rId{}", rid_counter));
                        rid_counter += 1;
                    }
                }
            }
        });
        Self { doc, link_to_rid }
    }

    fn run_xml(&self, run: &StyledRun) -> String {
        if run.text.is_empty() {
            return String::new();
        }
        let defaults = self.doc.run_defaults;
        let mut out = String::new();
        out.push_str("<w:r><w:rPr>");
        if run.is_link() {
            out.push_str("<w:rStyle w:val=\"Hyperlink\"/>");
        }
        out.push_str(&format!(
            "<w:rFonts w:ascii=\"{f}\" w:hAnsi=\"{f}\" w:cs=\"{f}\"/>",
            f = defaults.font
        ));
        if run.bold {
            out.push_str("<w:b/>");
        }
        if let Some(color) = &run.color {
            out.push_str(&format!("<w:color w:val=\"{}\"/>", xml_escape_text(color)));
        }
        out.push_str(&format!(
            "<w:sz w:val=\"{s}\"/><w:szCs w:val=\"{s}\"/>",
            s = defaults.size
        ));
        out.push_str("</w:rPr><w:t xml:space=\"preserve\">");
        out.push_str(&xml_escape_text(&run.text));
        out.push_str("</w:t></w:r>");
        out
    }

    fn runs_xml(&self, runs: &[StyledRun]) -> String {
        let mut out = String::new();
        for run in runs {
            match run.link.as_ref().and_then(|href| self.link_to_rid.get(href)) {
                Some(rid) => {
                    out.push_str(&format!("<w:hyperlink r:id=\"{}\" w:history=\"1\">", rid));
                    out.push_str(&self.run_xml(run));
                    out.push_str("</w:hyperlink>");
                }
                None => out.push_str(&self.run_xml(run)),
            }
        }
        out
    }

    fn spacing_xml(&self) -> String {
        let s = self.doc.spacing;
        format!(
            "<w:spacing w:before=\"{}\" w:after=\"{}\" w:line=\"{}\" w:lineRule=\"auto\"/>",
            s.before, s.after, s.line
        )
    }

    fn paragraph_xml(&self, runs: &[StyledRun], spaced: bool) -> String {
        let mut out = String::from("<w:p>");
        if spaced {
            out.push_str("<w:pPr>");
            out.push_str(&self.spacing_xml());
            out.push_str("</w:pPr>");
        }
        out.push_str(&self.runs_xml(runs));
        out.push_str("</w:p>");
        out
    }

    fn list_item_xml(&self, li: &ListItemBlock) -> String {
        let mut out = String::from("<w:p><w:pPr>");
        if li.kind == ListKind::Ordered {
            out.push_str("<w:numPr>");
            out.push_str(&format!("<w:ilvl w:val=\"{}\"/>", li.numbering_level()));
            out.push_str(&format!("<w:numId w:val=\"{}\"/>", self.doc.numbering.num_id));
            out.push_str("</w:numPr>");
        }
        out.push_str(&self.spacing_xml());
        out.push_str(&format!(
            "<w:ind w:left=\"{}\"/>",
            self.doc.spacing.list_indent as usize * li.depth
        ));
        out.push_str("</w:pPr>");
        out.push_str(&self.runs_xml(&li.runs));
        out.push_str("</w:p>");
        out
    }

    fn table_xml(&self, t: &TableBlock) -> String {
        let mut out = String::from("<w:tbl><w:tblPr>");
        out.push_str(&format!("<w:tblW w:w=\"{}\" w:type=\"pct\"/>", 100 * PCT_SCALE));
        out.push_str(
            r#"<w:tblBorders>
<w:top w:val="single" w:sz="4" w:space="0" w:color="auto"/>
<w:left w:val="single" w:sz="4" w:space="0" w:color="auto"/>
<w:bottom w:val="single" w:sz="4" w:space="0" w:color="auto"/>
<w:right w:val="single" w:sz="4" w:space="0" w:color="auto"/>
<w:insideH w:val="single" w:sz="4" w:space="0" w:color="auto"/>
<w:insideV w:val="single" w:sz="4" w:space="0" w:color="auto"/>
</w:tblBorders>"#,
        );
        out.push_str("</w:tblPr>");

        for row in &t.rows {
            out.push_str("<w:tr>");
            for cell in &row.cells {
                out.push_str("<w:tc>");
                out.push_str(&format!(
                    "<w:tcPr><w:tcW w:w=\"{}\" w:type=\"pct\"/></w:tcPr>",
                    cell.width_pct * PCT_SCALE
                ));
                // A cell must end with a paragraph.
                out.push_str(&self.blocks_xml(&cell.blocks, false));
                if !matches!(cell.blocks.last(), Some(Block::Paragraph(_) | Block::ListItem(_))) {
                    out.push_str("<w:p/>");
                }
                out.push_str("</w:tc>");
            }
            out.push_str("</w:tr>");
        }
        out.push_str("</w:tbl>");
        out
    }

    fn blocks_xml(&self, blocks: &[Block], spaced: bool) -> String {
        let mut out = String::new();
        for b in blocks {
            match b {
                Block::Paragraph(p) => {
                    out.push_str(&self.paragraph_xml(&p.runs, spaced && p.spaced))
                }
                Block::ListItem(li) => out.push_str(&self.list_item_xml(li)),
                Block::Table(t) => out.push_str(&self.table_xml(t)),
            }
        }
        out
    }

    fn document_xml(&self) -> String {
        let m = self.doc.margins;
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{NS_W}" xmlns:r="{NS_R}">
  <w:body>
    {body}
    <w:sectPr>
      <w:pgSz w:w="12240" w:h="15840"/>
      <w:pgMar w:top="{top}" w:right="{right}" w:bottom="{bottom}" w:left="{left}" w:header="708" w:footer="708" w:gutter="0"/>
      <w:cols w:space="708"/>
      <w:docGrid w:linePitch="360"/>
    </w:sectPr>
  </w:body>
</w:document>"#,
            body = self.blocks_xml(&self.doc.blocks, true),
            top = m.top,
            right = m.right,
            bottom = m.bottom,
            left = m.left,
        )
    }

    fn document_rels_xml(&self, has_numbering: bool) -> String {
        let mut out = String::new();
        out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        out.push('\n');
        out.push_str(&format!(r#"<Relationships xmlns="{NS_RELS}">"#));
        out.push('\n');
        out.push_str(&format!(
            r#"  <Relationship Id="{STYLES_RID}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#
        ));
        out.push('\n');
        if has_numbering {
            out.push_str(&format!(
                r#"  <Relationship Id="{NUMBERING_RID}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering" Target="numbering.xml"/>"#
            ));
            out.push('\n');
        }
        for (href, rid) in &self.link_to_rid {
            out.push_str(&format!(
                r#"  <Relationship Id="{rid}" Type="{REL_HYPERLINK}" Target="{href}" TargetMode="External"/>"#,
                href = xml_escape_text(href),
            ));
            out.push('\n');
        }
        out.push_str("</Relationships>");
        out
    }
}

fn content_types_xml(has_numbering: bool) -> String {
    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push('\n');
    out.push_str(&format!(r#"<Types xmlns="{NS_CT}">"#));
    out.push('\n');
    out.push_str(
        r#"  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    );
    out.push('\n');
    out.push_str(r#"  <Default Extension="xml" ContentType="application/xml"/>"#);
    out.push('\n');
    out.push_str(r#"  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#);
    out.push('\n');
    out.push_str(r#"  <Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>"#);
    out.push('\n');
    if has_numbering {
        out.push_str(r#"  <Override PartName="/word/numbering.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml"/>"#);
        out.push('\n');
    }
    out.push_str("</Types>");
    out
}

fn rels_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{NS_RELS}">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#
    )
}

fn styles_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="{NS_W}">
  <w:style w:type="paragraph" w:default="1" w:styleId="Normal">
    <w:name w:val="Normal"/>
    <w:qFormat/>
  </w:style>
  <w:style w:type="character" w:default="1" w:styleId="DefaultParagraphFont">
    <w:name w:val="Default Paragraph Font"/>
    <w:uiPriority w:val="1"/>
    <w:semiHidden/>
  </w:style>
  <w:style w:type="character" w:styleId="Hyperlink">
    <w:name w:val="Hyperlink"/>
    <w:basedOn w:val="DefaultParagraphFont"/>
    <w:uiPriority w:val="99"/>
    <w:unhideWhenUsed/>
    <w:rPr>
      <w:color w:val="0563C1"/>
      <w:u w:val="single"/>
    </w:rPr>
  </w:style>
</w:styles>"#
    )
}

fn numbering_xml(numbering: &NumberingDefinition) -> String {
    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push('\n');
    out.push_str(&format!(r#"<w:numbering xmlns:w="{NS_W}">"#));
    out.push('\n');
    out.push_str("  <w:abstractNum w:abstractNumId=\"0\">\n");
    out.push_str("    <w:multiLevelType w:val=\"hybridMultilevel\"/>\n");
    for lvl in &numbering.levels {
        out.push_str(&format!(
            "    <w:lvl w:ilvl=\"{}\"><w:start w:val=\"1\"/><w:numFmt w:val=\"decimal\"/><w:lvlText w:val=\"{}\"/><w:lvlJc w:val=\"left\"/><w:pPr><w:ind w:left=\"{}\" w:hanging=\"{}\"/></w:pPr></w:lvl>\n",
            lvl.level,
            xml_escape_text(&lvl.text),
            lvl.left,
            lvl.hanging
        ));
    }
    out.push_str("  </w:abstractNum>\n");
    out.push_str(&format!(
        "  <w:num w:numId=\"{}\"><w:abstractNumId w:val=\"0\"/></w:num>\n",
        numbering.num_id
    ));
    out.push_str("</w:numbering>");
    out
}

fn needs_numbering(blocks: &[Block]) -> bool {
    let mut found = false;
    visit_blocks(blocks, &mut |b| {
        if matches!(b, Block::ListItem(li) if li.kind == ListKind::Ordered) {
            found = true;
        }
    });
    found
}

/// Serialize a document model into `.docx` bytes.
pub fn encode(doc: &DocumentModel) -> Result<Vec<u8>> {
    validate(doc)?;

    let writer = Writer::new(doc);
    let has_numbering = needs_numbering(&doc.blocks);
    let document = writer.document_xml();
    let document_rels = writer.document_rels_xml(has_numbering);

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("[Content_Types].xml", opts)?;
    zip.write_all(content_types_xml(has_numbering).as_bytes())?;

    zip.start_file("_rels/.rels", opts)?;
    zip.write_all(rels_xml().as_bytes())?;

    zip.start_file("word/document.xml", opts)?;
    zip.write_all(document.as_bytes())?;

    zip.start_file("word/styles.xml", opts)?;
    zip.write_all(styles_xml().as_bytes())?;

    if has_numbering {
        zip.start_file("word/numbering.xml", opts)?;
        zip.write_all(numbering_xml(&doc.numbering).as_bytes())?;
    }

    zip.start_file("word/_rels/document.xml.rels", opts)?;
    zip.write_all(document_rels.as_bytes())?;

    let bytes = zip.finish()?.into_inner();
    debug!(
        bytes = bytes.len(),
        links = writer.link_to_rid.len(),
        has_numbering,
        "encoded docx"
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::assemble;
    use crate::model::{ParagraphBlock, TableCell, TableRow};
    use crate::{markup_to_docx, markup_to_document};
    use std::io::Read;
    use zip::ZipArchive;

    fn read_part(bytes: &[u8], name: &str) -> Option<String> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).ok()?;
        let mut out = String::new();
        file.read_to_string(&mut out).unwrap();
        Some(out)
    }

    #[test]
    fn package_has_core_parts() {
        let bytes = markup_to_docx("<p>hello</p>").unwrap();
        for part in [
            "[Content_Types].xml",
            "_rels/.rels",
            "word/document.xml",
            "word/styles.xml",
            "word/_rels/document.xml.rels",
        ] {
            assert!(read_part(&bytes, part).is_some(), "missing {part}");
        }
        assert!(read_part(&bytes, "word/numbering.xml").is_none());
    }

    #[test]
    fn runs_carry_font_size_and_color() {
        let bytes = markup_to_docx("**b** {red}r{/red} & <p>x</p>").unwrap();
        let doc = read_part(&bytes, "word/document.xml").unwrap();
        assert!(doc.contains("<w:rFonts w:ascii=\"Calibri\""));
        assert!(doc.contains("<w:b/>"));
        assert!(doc.contains("<w:color w:val=\"FF0000\"/>"));
        assert!(doc.contains("<w:sz w:val=\"19\"/>"));
        assert!(doc.contains("&amp;"));
        assert!(doc.contains("w:after=\"100\""));
        assert!(doc.contains("w:top=\"640\""));
    }

    #[test]
    fn hyperlinks_get_relationships() {
        let bytes =
            markup_to_docx("<p>[a](http://x.test?a=1&b=2) [b](http://x.test?a=1&b=2)</p>").unwrap();
        let doc = read_part(&bytes, "word/document.xml").unwrap();
        let rels = read_part(&bytes, "word/_rels/document.xml.rels").unwrap();
        assert_eq!(doc.matches("<w:hyperlink r:id=\"rId10\"").count(), 2);
        assert!(doc.contains("<w:rStyle w:val=\"Hyperlink\"/>"));
        assert!(rels.contains("Target=\"http://x.test?a=1&amp;b=2\" TargetMode=\"External\""));
        assert!(rels.contains("Target=\"styles.xml\""));
    }

    #[test]
    fn ordered_items_use_numbering() {
        let bytes = markup_to_docx("<ol><li>x<ol><li>y</li></ol></li></ol>").unwrap();
        let doc = read_part(&bytes, "word/document.xml").unwrap();
        let numbering = read_part(&bytes, "word/numbering.xml").unwrap();
        let types = read_part(&bytes, "[Content_Types].xml").unwrap();
        assert!(doc.contains("<w:ilvl w:val=\"0\"/><w:numId w:val=\"1\"/>"));
        assert!(doc.contains("<w:ilvl w:val=\"1\"/><w:numId w:val=\"1\"/>"));
        assert!(doc.contains("<w:ind w:left=\"720\"/>"));
        assert!(numbering.contains("<w:lvlText w:val=\"%3.\"/>"));
        assert!(numbering.contains("<w:ind w:left=\"1440\" w:hanging=\"360\"/>"));
        assert!(types.contains("/word/numbering.xml"));
    }

    #[test]
    fn bullet_items_have_no_numbering() {
        let bytes = markup_to_docx("<ul><li>a</li></ul>").unwrap();
        let doc = read_part(&bytes, "word/document.xml").unwrap();
        assert!(!doc.contains("<w:numPr>"));
        assert!(doc.contains("\u{2022} "));
    }

    #[test]
    fn tables_use_percentage_widths() {
        let bytes = markup_to_docx("<table><tr><td>1</td><td></td></tr></table>").unwrap();
        let doc = read_part(&bytes, "word/document.xml").unwrap();
        assert!(doc.contains("<w:tblW w:w=\"5000\" w:type=\"pct\"/>"));
        assert_eq!(doc.matches("<w:tcW w:w=\"2500\" w:type=\"pct\"/>").count(), 2);
        assert!(doc.contains("<w:p/>"));
    }

    #[test]
    fn empty_document_still_encodes() {
        let bytes = encode(&markup_to_document("   ")).unwrap();
        let doc = read_part(&bytes, "word/document.xml").unwrap();
        assert!(!doc.contains("<w:p>"));
    }

    #[test]
    fn link_without_target_is_rejected() {
        let doc = assemble(vec![Block::Paragraph(ParagraphBlock::new(vec![StyledRun::link(
            "x", " ",
        )]))]);
        assert!(matches!(encode(&doc), Err(Error::Encoding(_))));
    }

    #[test]
    fn blank_link_targets_encode_as_plain_text() {
        for input in ["see [a]( ) here", r#"<p>see <a href=" ">x</a> here</p>"#] {
            let bytes = markup_to_docx(input).unwrap();
            let doc = read_part(&bytes, "word/document.xml").unwrap();
            assert!(!doc.contains("<w:hyperlink"), "{input}");
        }
    }

    #[test]
    fn control_characters_are_stripped() {
        let bytes = markup_to_docx("<p>a\u{1}b\u{b}c\u{FFFF}</p>").unwrap();
        let doc = read_part(&bytes, "word/document.xml").unwrap();
        assert!(doc.contains(">abc</w:t>"));
        assert!(!doc.contains('\u{1}'));
        assert!(!doc.contains('\u{b}'));
        assert!(!doc.contains('\u{FFFF}'));
    }

    #[test]
    fn bare_anchor_paragraph_has_no_spacing() {
        let bytes = markup_to_docx(r#"<a href="http://x.test">x</a>"#).unwrap();
        let doc = read_part(&bytes, "word/document.xml").unwrap();
        assert!(doc.contains("<w:p><w:hyperlink"));
        assert!(!doc.contains("<w:spacing"));
    }

    #[test]
    fn undefined_numbering_level_is_rejected() {
        let mut doc = markup_to_document("<ol><li>x</li></ol>");
        doc.numbering.levels.clear();
        assert!(matches!(encode(&doc), Err(Error::Encoding(_))));
    }

    #[test]
    fn bad_cell_width_is_rejected() {
        let doc = assemble(vec![Block::Table(TableBlock {
            rows: vec![TableRow {
                cells: vec![TableCell { blocks: Vec::new(), width_pct: 0 }],
            }],
        })]);
        assert!(matches!(encode(&doc), Err(Error::Encoding(_))));
    }
}
