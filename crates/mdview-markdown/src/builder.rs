//! Turns a parsed [`Document`] into a [`Layout`] tree.
//!
//! Inline formatting is tracked on a [`TextStyle`] stack: each emphasis, code span or link
//! enters one attribute and restores the previous value on exit, so sibling content never
//! inherits styles from a closed element. Adjacent text with an identical style is coalesced
//! into a single run.

use std::path::Path;
use std::sync::Arc;

use unicode_width::UnicodeWidthStr;

use crate::ast::Block;
use crate::ast::Document;
use crate::ast::Inline;
use crate::ast::List;
use crate::ast::Table;
use crate::ast::TableRow;
use crate::images::ImageCache;
use crate::layout::BlockKind;
use crate::layout::Layout;
use crate::layout::LayoutNode;
use crate::layout::LayoutOptions;
use crate::layout::NodeKind;
use crate::style::StyleAttr;
use crate::style::TextStyle;

const BULLETS: [&str; 3] = ["• ", "◦ ", "▪ "];

pub struct LayoutBuilder<'a> {
    document: &'a Path,
    images: &'a mut ImageCache,
    options: LayoutOptions,
    style: TextStyle,
    list_depth: usize,
}

impl<'a> LayoutBuilder<'a> {
    /// `document` is the path image sources resolve against.
    pub fn new(document: &'a Path, images: &'a mut ImageCache, options: LayoutOptions) -> Self {
        Self {
            document,
            images,
            options,
            style: TextStyle::default(),
            list_depth: 0,
        }
    }

    /// The style in effect for the next text run. Default again after [`Self::build`].
    pub fn style(&self) -> &TextStyle {
        &self.style
    }

    /// Builds an unarranged layout. Image requests are issued as images are encountered.
    pub fn build(&mut self, document: &Document) -> Layout {
        let children = self.blocks(&document.blocks);
        tracing::debug!(
            blocks = document.blocks.len(),
            path = %self.document.display(),
            "layout built"
        );
        Layout::new(
            LayoutNode::container(BlockKind::Document, children),
            self.options.clone(),
        )
    }

    fn blocks(&mut self, blocks: &[Block]) -> Vec<LayoutNode> {
        let mut out = Vec::with_capacity(blocks.len());
        for block in blocks {
            out.push(self.block(block));
        }
        out
    }

    fn block(&mut self, block: &Block) -> LayoutNode {
        match block {
            Block::Paragraph(inlines) => {
                LayoutNode::container(BlockKind::Paragraph, self.inlines(inlines))
            }
            Block::Heading {
                level,
                id,
                children,
            } => LayoutNode::container(BlockKind::Heading(*level), self.inlines(children))
                .with_id(id.clone()),
            Block::List(list) => self.list(list),
            Block::Quote(blocks) => LayoutNode::container(BlockKind::Quote, self.blocks(blocks)),
            Block::CodeBlock { language, text } => LayoutNode::code(language.clone(), text, false),
            Block::ThematicBreak => LayoutNode::container(BlockKind::Rule, Vec::new()),
            Block::Table(table) => self.table(table),
            Block::Html(raw) => LayoutNode::code(None, raw, true),
            Block::Unknown { raw } => {
                let mut children = Vec::new();
                self.push_text(&mut children, raw);
                LayoutNode::container(BlockKind::Paragraph, children)
            }
        }
    }

    fn list(&mut self, list: &List) -> LayoutNode {
        let markers = list
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| match (item.task, list.start) {
                (Some(true), _) => "[x] ".to_string(),
                (Some(false), _) => "[ ] ".to_string(),
                (None, Some(start)) => format!("{}. ", start.saturating_add(i as u64)),
                (None, None) => BULLETS[self.list_depth % BULLETS.len()].to_string(),
            })
            .collect::<Vec<_>>();
        let indent = markers
            .iter()
            .map(|m| m.width() as u16)
            .max()
            .unwrap_or(0)
            .max(self.options.list_indent);

        self.list_depth += 1;
        let mut items = Vec::with_capacity(list.items.len());
        for (item, marker) in list.items.iter().zip(markers) {
            let children = self.blocks(&item.blocks);
            items.push(LayoutNode::container(
                BlockKind::ListItem { marker, indent },
                children,
            ));
        }
        self.list_depth -= 1;
        LayoutNode::list(list.start, list.tight, items)
    }

    fn table(&mut self, table: &Table) -> LayoutNode {
        let columns = table
            .rows
            .iter()
            .chain(std::iter::once(&table.header))
            .map(|row| row.cells.len())
            .max()
            .unwrap_or(0)
            .max(table.alignments.len());
        let header_rows = usize::from(!table.header.cells.is_empty());

        let mut cells = Vec::with_capacity(columns * (table.rows.len() + header_rows));
        if header_rows > 0 {
            let prev = self.style.enter(StyleAttr::Bold(true));
            self.table_row(table, &table.header, columns, &mut cells);
            self.style.restore(prev);
        }
        for row in &table.rows {
            self.table_row(table, row, columns, &mut cells);
        }
        LayoutNode::table(table.alignments.clone(), columns, header_rows, cells)
    }

    /// Short rows are padded with empty cells so every row has `columns` cells.
    fn table_row(
        &mut self,
        table: &Table,
        row: &TableRow,
        columns: usize,
        out: &mut Vec<LayoutNode>,
    ) {
        for c in 0..columns {
            let align = table.alignments.get(c).copied().unwrap_or_default();
            let children = match row.cells.get(c) {
                Some(cell) => self.inlines(&cell.children),
                None => Vec::new(),
            };
            out.push(LayoutNode::container(BlockKind::TableCell(align), children));
        }
    }

    fn inlines(&mut self, inlines: &[Inline]) -> Vec<LayoutNode> {
        let mut out = Vec::new();
        self.visit_inlines(inlines, &mut out);
        out
    }

    fn visit_inlines(&mut self, inlines: &[Inline], out: &mut Vec<LayoutNode>) {
        for inline in inlines {
            self.visit_inline(inline, out);
        }
    }

    fn visit_inline(&mut self, inline: &Inline, out: &mut Vec<LayoutNode>) {
        match inline {
            Inline::Text(text) => self.push_text(out, text),
            Inline::Emphasis { double, children } => {
                let attr = if *double {
                    StyleAttr::Bold(true)
                } else {
                    StyleAttr::Italic(true)
                };
                let prev = self.style.enter(attr);
                self.visit_inlines(children, out);
                self.style.restore(prev);
            }
            Inline::Code(code) => {
                let prev = self.style.enter(StyleAttr::Code(true));
                self.push_text(out, code);
                self.style.restore(prev);
            }
            Inline::Link {
                target, children, ..
            } => {
                let prev = self.style.enter(StyleAttr::Link(Some(Arc::from(target.as_str()))));
                self.visit_inlines(children, out);
                self.style.restore(prev);
            }
            Inline::AutoLink { target, text } => {
                let prev = self.style.enter(StyleAttr::Link(Some(Arc::from(target.as_str()))));
                self.push_text(out, text);
                self.style.restore(prev);
            }
            Inline::Image { src, alt, .. } => {
                let handle = self.images.request_source(self.document, src);
                out.push(LayoutNode::image(handle, alt.clone(), self.style.link.clone()));
            }
            Inline::LineBreak { hard } => self.push_text(out, if *hard { "\n" } else { " " }),
            Inline::Html(raw) | Inline::Unknown { raw } => self.push_text(out, raw),
        }
    }

    fn push_text(&mut self, out: &mut Vec<LayoutNode>, text: &str) {
        if text.is_empty() {
            return;
        }
        let text = text.replace('\t', "    ");
        if let Some(NodeKind::Text(run)) = out.last_mut().map(LayoutNode::kind_mut) {
            if run.style() == &self.style {
                run.push_str(&text);
                return;
            }
        }
        out.push(LayoutNode::text(text, self.style.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssets;
    use crate::ast::ParseOptions;
    use crate::ast::parse;

    fn build(source: &str) -> Layout {
        let mut cache = ImageCache::new(Arc::new(MemoryAssets::new()));
        let document = parse(source, &ParseOptions::default());
        let mut builder =
            LayoutBuilder::new(Path::new("/docs/a.md"), &mut cache, LayoutOptions::default());
        let layout = builder.build(&document);
        assert_eq!(builder.style(), &TextStyle::default());
        layout
    }

    fn runs(node: &LayoutNode) -> Vec<(String, TextStyle)> {
        node.children()
            .iter()
            .filter_map(|child| match child.kind() {
                NodeKind::Text(run) => Some((run.text().to_string(), run.style().clone())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn styles_are_restored_after_each_element() {
        let layout = build("a *b **c** d* `e` [f](g.md) h");
        let runs = runs(&layout.root().children()[0]);
        let texts = runs.iter().map(|(t, _)| t.as_str()).collect::<Vec<_>>();
        assert_eq!(texts, vec!["a ", "b ", "c", " d", " ", "e", " ", "f", " h"]);

        assert_eq!(runs[0].1, TextStyle::default());
        assert!(runs[1].1.italic && !runs[1].1.bold);
        assert!(runs[2].1.italic && runs[2].1.bold);
        assert!(runs[3].1.italic && !runs[3].1.bold);
        assert!(runs[5].1.code);
        assert_eq!(runs[7].1.link.as_deref(), Some("g.md"));
        assert_eq!(runs[8].1, TextStyle::default());
    }

    #[test]
    fn soft_breaks_join_runs() {
        let layout = build("one\ntwo");
        assert_eq!(
            runs(&layout.root().children()[0]),
            vec![("one two".to_string(), TextStyle::default())]
        );
    }

    #[test]
    fn list_markers_follow_kind_and_depth() {
        let layout = build("- a\n  - b\n\n3. x\n4. y\n\n- [x] done\n");
        let markers = |node: &LayoutNode| {
            node.children()
                .iter()
                .filter_map(|item| match item.kind() {
                    NodeKind::Container(BlockKind::ListItem { marker, .. }) => Some(marker.clone()),
                    _ => None,
                })
                .collect::<Vec<_>>()
        };
        let blocks = layout.root().children();
        assert_eq!(markers(&blocks[0]), vec!["• "]);
        let nested = &blocks[0].children()[0].children()[1];
        assert_eq!(markers(nested), vec!["◦ "]);
        assert_eq!(markers(&blocks[1]), vec!["3. ", "4. "]);
        assert_eq!(markers(&blocks[2]), vec!["[x] "]);
    }

    #[test]
    fn tables_are_padded_to_full_rows() {
        let layout = build("| a | b |\n|---|--:|\n| 1 |\n");
        let table = &layout.root().children()[0];
        let NodeKind::Table(grid) = table.kind() else {
            panic!("expected table");
        };
        assert_eq!(grid.columns(), 2);
        assert_eq!(table.children().len(), 4);
        let header = runs(&table.children()[0]);
        assert!(header[0].1.bold);
        assert!(runs(&table.children()[3]).is_empty());
    }

    #[test]
    fn images_request_through_the_cache() {
        let mut cache = ImageCache::new(Arc::new(MemoryAssets::new()));
        let document = parse("![one](img.png) ![two](img.png)", &ParseOptions::default());
        let layout = LayoutBuilder::new(Path::new("/docs/a.md"), &mut cache, LayoutOptions::default())
            .build(&document);
        let images = layout.root().children()[0]
            .children()
            .iter()
            .filter_map(|child| match child.kind() {
                NodeKind::Image(image) => Some(image.handle().clone()),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(images.len(), 2);
        assert!(images[0].ptr_eq(&images[1]));
        assert_eq!(images[0].path(), Path::new("/docs/img.png"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn html_blocks_become_verbatim_code() {
        let layout = build("<div>\nhi\n</div>\n");
        assert!(matches!(
            layout.root().children()[0].kind(),
            NodeKind::CodeBlock(code) if code.html && code.lines.len() == 3
        ));
    }
}
