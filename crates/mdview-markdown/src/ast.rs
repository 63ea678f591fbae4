//! An owned Markdown tree over a fixed set of block and inline kinds.
//!
//! [`parse`] adapts the `pulldown-cmark` event stream. Constructs outside the supported set
//! (strikethrough, footnotes, math, metadata blocks, ...) are kept as [`Block::Unknown`] or
//! [`Inline::Unknown`] with their raw source text, so nothing in a document is silently dropped.

use std::collections::HashMap;
use std::iter::Peekable;
use std::ops::Range;
use std::sync::OnceLock;

use pulldown_cmark::CodeBlockKind;
use pulldown_cmark::Event;
use pulldown_cmark::LinkType;
use pulldown_cmark::Options;
use pulldown_cmark::Parser;
use pulldown_cmark::Tag;
use regex::Regex;

#[derive(Clone, Debug)]
pub struct ParseOptions {
    /// Turn bare `https://…` and `www.…` text into links.
    pub autolinks: bool,
    /// When set, issue keys such as `ABC-123` link to `{base}/browse/ABC-123`.
    pub jira_base_url: Option<String>,
    /// Derive GitHub-style ids for headings that have no explicit `{#id}`.
    pub auto_heading_ids: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            autolinks: true,
            jira_base_url: None,
            auto_heading_ids: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    Paragraph(Vec<Inline>),
    Heading {
        level: u8,
        id: Option<String>,
        children: Vec<Inline>,
    },
    List(List),
    Quote(Vec<Block>),
    CodeBlock {
        language: Option<String>,
        text: String,
    },
    ThematicBreak,
    Table(Table),
    Html(String),
    Unknown {
        raw: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct List {
    /// First ordinal for ordered lists, `None` for bullets.
    pub start: Option<u64>,
    /// No blank lines between items.
    pub tight: bool,
    pub items: Vec<ListItem>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListItem {
    /// Task list checkbox state, if the item has one.
    pub task: Option<bool>,
    pub blocks: Vec<Block>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Alignment {
    #[default]
    None,
    Left,
    Center,
    Right,
}

impl From<&pulldown_cmark::Alignment> for Alignment {
    fn from(value: &pulldown_cmark::Alignment) -> Self {
        match value {
            pulldown_cmark::Alignment::None => Self::None,
            pulldown_cmark::Alignment::Left => Self::Left,
            pulldown_cmark::Alignment::Center => Self::Center,
            pulldown_cmark::Alignment::Right => Self::Right,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Table {
    pub alignments: Vec<Alignment>,
    pub header: TableRow,
    pub rows: Vec<TableRow>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableCell {
    pub children: Vec<Inline>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    /// `double` is set for strong emphasis (`**x**`), clear for `*x*`.
    Emphasis {
        double: bool,
        children: Vec<Inline>,
    },
    Code(String),
    Link {
        target: String,
        title: String,
        children: Vec<Inline>,
    },
    Image {
        src: String,
        title: String,
        alt: String,
    },
    LineBreak {
        hard: bool,
    },
    AutoLink {
        target: String,
        text: String,
    },
    Html(String),
    Unknown {
        raw: String,
    },
}

pub fn parse(source: &str, options: &ParseOptions) -> Document {
    let mut md = Options::empty();
    md.insert(Options::ENABLE_TABLES);
    md.insert(Options::ENABLE_TASKLISTS);
    md.insert(Options::ENABLE_FOOTNOTES);
    md.insert(Options::ENABLE_STRIKETHROUGH);
    md.insert(Options::ENABLE_HEADING_ATTRIBUTES);
    let events = Parser::new_ext(source, md)
        .into_offset_iter()
        .collect::<Vec<_>>();

    let mut reader = Reader {
        source,
        events: events.into_iter().peekable(),
        options,
        slugs: HashMap::new(),
        link_depth: 0,
        task: None,
    };
    Document {
        blocks: reader.blocks(),
    }
}

/// Concatenated text content of `inlines`, as a screen reader would speak it.
pub fn plain_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    push_plain(inlines, &mut out);
    out
}

fn push_plain(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text(t) | Inline::Code(t) | Inline::Html(t) => out.push_str(t),
            Inline::Emphasis { children, .. } | Inline::Link { children, .. } => {
                push_plain(children, out)
            }
            Inline::Image { alt, .. } => out.push_str(alt),
            Inline::LineBreak { .. } => out.push(' '),
            Inline::AutoLink { text, .. } => out.push_str(text),
            Inline::Unknown { raw } => out.push_str(raw),
        }
    }
}

type Spanned<'a> = (Event<'a>, Range<usize>);

#[derive(Clone, Copy)]
enum Peeked {
    End,
    Inline,
    Paragraph,
    Block,
}

struct Reader<'a> {
    source: &'a str,
    events: Peekable<std::vec::IntoIter<Spanned<'a>>>,
    options: &'a ParseOptions,
    slugs: HashMap<String, usize>,
    link_depth: usize,
    task: Option<bool>,
}

impl<'a> Reader<'a> {
    fn blocks(&mut self) -> Vec<Block> {
        self.container().0
    }

    /// Reads blocks up to and including the end of the enclosing container.
    ///
    /// Inline content directly inside a container (tight list items) becomes an implicit
    /// paragraph. The flag reports whether an explicit paragraph was seen.
    fn container(&mut self) -> (Vec<Block>, bool) {
        let mut blocks = Vec::new();
        let mut explicit_paragraph = false;
        loop {
            let peeked = match self.events.peek() {
                None => break,
                Some((Event::End(_), _)) => Peeked::End,
                Some((Event::Start(Tag::Paragraph), _)) => Peeked::Paragraph,
                Some((event, _)) if is_inline(event) => Peeked::Inline,
                Some(_) => Peeked::Block,
            };
            match peeked {
                Peeked::End => {
                    self.events.next();
                    break;
                }
                Peeked::Inline => blocks.push(Block::Paragraph(self.inline_run())),
                Peeked::Paragraph | Peeked::Block => {
                    explicit_paragraph |= matches!(peeked, Peeked::Paragraph);
                    let Some((event, range)) = self.events.next() else {
                        break;
                    };
                    blocks.push(self.block(event, range));
                }
            }
        }
        (blocks, explicit_paragraph)
    }

    fn block(&mut self, event: Event<'a>, range: Range<usize>) -> Block {
        match event {
            Event::Start(tag) => self.block_tag(tag, range),
            Event::Rule => Block::ThematicBreak,
            Event::Html(html) => Block::Html(html.to_string()),
            _ => Block::Unknown {
                raw: self.raw(range),
            },
        }
    }

    fn block_tag(&mut self, tag: Tag<'a>, range: Range<usize>) -> Block {
        match tag {
            Tag::Paragraph => Block::Paragraph(self.inlines()),
            Tag::Heading { level, id, .. } => {
                let children = self.inlines();
                let id = match id {
                    Some(id) => Some(id.to_string()),
                    None if self.options.auto_heading_ids => Some(self.slug(&plain_text(&children))),
                    None => None,
                };
                Block::Heading {
                    level: level as u8,
                    id,
                    children,
                }
            }
            Tag::BlockQuote(_) => Block::Quote(self.blocks()),
            Tag::CodeBlock(kind) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info.split_whitespace().next().map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                Block::CodeBlock {
                    language,
                    text: self.text_until_end(),
                }
            }
            Tag::HtmlBlock => Block::Html(self.text_until_end()),
            Tag::List(start) => self.list(start),
            Tag::Table(aligns) => self.table(aligns.iter().map(Alignment::from).collect()),
            _ => {
                self.skip_to_end();
                Block::Unknown {
                    raw: self.raw(range),
                }
            }
        }
    }

    fn list(&mut self, start: Option<u64>) -> Block {
        let mut items = Vec::new();
        let mut tight = true;
        loop {
            match self.events.next() {
                Some((Event::Start(Tag::Item), _)) => {
                    // Nested items must not clobber a marker already seen for this one.
                    let outer = self.task.take();
                    let (blocks, explicit_paragraph) = self.container();
                    tight &= !explicit_paragraph;
                    let task = std::mem::replace(&mut self.task, outer);
                    items.push(ListItem { task, blocks });
                }
                Some((Event::End(_), _)) | None => break,
                Some(_) => {}
            }
        }
        Block::List(List {
            start,
            tight,
            items,
        })
    }

    fn table(&mut self, alignments: Vec<Alignment>) -> Block {
        let mut table = Table {
            alignments,
            ..Table::default()
        };
        loop {
            match self.events.next() {
                Some((Event::Start(Tag::TableHead), _)) => table.header = self.table_row(),
                Some((Event::Start(Tag::TableRow), _)) => table.rows.push(self.table_row()),
                Some((Event::End(_), _)) | None => break,
                Some(_) => {}
            }
        }
        Block::Table(table)
    }

    fn table_row(&mut self) -> TableRow {
        let mut row = TableRow::default();
        loop {
            match self.events.next() {
                Some((Event::Start(Tag::TableCell), _)) => row.cells.push(TableCell {
                    children: self.inlines(),
                }),
                Some((Event::End(_), _)) | None => break,
                Some(_) => {}
            }
        }
        row
    }

    /// Reads inline content up to and including the end of the enclosing tag.
    fn inlines(&mut self) -> Vec<Inline> {
        let mut out = Vec::new();
        let mut text = String::new();
        while let Some((event, range)) = self.events.next() {
            if matches!(event, Event::End(_)) {
                break;
            }
            self.inline(event, range, &mut out, &mut text);
        }
        self.flush_text(&mut out, &mut text);
        out
    }

    /// Reads consecutive inline events without consuming the following block event.
    fn inline_run(&mut self) -> Vec<Inline> {
        let mut out = Vec::new();
        let mut text = String::new();
        while self
            .events
            .peek()
            .is_some_and(|(event, _)| is_inline(event))
        {
            let Some((event, range)) = self.events.next() else {
                break;
            };
            self.inline(event, range, &mut out, &mut text);
        }
        self.flush_text(&mut out, &mut text);
        out
    }

    fn inline(
        &mut self,
        event: Event<'a>,
        range: Range<usize>,
        out: &mut Vec<Inline>,
        text: &mut String,
    ) {
        // The parser may split one run of text into several events.
        if let Event::Text(t) = &event {
            text.push_str(t);
            return;
        }
        self.flush_text(out, text);

        match event {
            Event::Code(code) => out.push(Inline::Code(code.to_string())),
            Event::SoftBreak => out.push(Inline::LineBreak { hard: false }),
            Event::HardBreak => out.push(Inline::LineBreak { hard: true }),
            Event::InlineHtml(html) | Event::Html(html) => out.push(Inline::Html(html.to_string())),
            Event::TaskListMarker(checked) => self.task = Some(checked),
            Event::Start(Tag::Emphasis) => out.push(Inline::Emphasis {
                double: false,
                children: self.inlines(),
            }),
            Event::Start(Tag::Strong) => out.push(Inline::Emphasis {
                double: true,
                children: self.inlines(),
            }),
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                ..
            }) => {
                self.link_depth += 1;
                let children = self.inlines();
                self.link_depth -= 1;
                out.push(match link_type {
                    LinkType::Autolink => Inline::AutoLink {
                        target: dest_url.to_string(),
                        text: plain_text(&children),
                    },
                    LinkType::Email => Inline::AutoLink {
                        target: format!("mailto:{dest_url}"),
                        text: plain_text(&children),
                    },
                    _ => Inline::Link {
                        target: dest_url.to_string(),
                        title: title.to_string(),
                        children,
                    },
                });
            }
            Event::Start(Tag::Image {
                dest_url, title, ..
            }) => {
                let children = self.inlines();
                out.push(Inline::Image {
                    src: dest_url.to_string(),
                    title: title.to_string(),
                    alt: plain_text(&children),
                });
            }
            Event::Start(_) => {
                self.skip_to_end();
                out.push(Inline::Unknown {
                    raw: self.raw(range),
                });
            }
            Event::End(_) => {}
            _ => out.push(Inline::Unknown {
                raw: self.raw(range),
            }),
        }
    }

    fn flush_text(&mut self, out: &mut Vec<Inline>, text: &mut String) {
        if text.is_empty() {
            return;
        }
        let text = std::mem::take(text);
        let linkify = self.link_depth == 0
            && (self.options.autolinks || self.options.jira_base_url.is_some());
        if !linkify {
            out.push(Inline::Text(text));
            return;
        }

        let mut last = 0;
        for caps in autolink_regex().captures_iter(&text) {
            let (range, inline) = if let Some(m) = caps.name("url") {
                if !self.options.autolinks {
                    continue;
                }
                let url = m.as_str().trim_end_matches(URL_TRAILING);
                if url.is_empty() {
                    continue;
                }
                let target = if url.starts_with("www.") {
                    format!("http://{url}")
                } else {
                    url.to_string()
                };
                (
                    m.start()..m.start() + url.len(),
                    Inline::AutoLink {
                        target,
                        text: url.to_string(),
                    },
                )
            } else if let Some(m) = caps.name("key") {
                let Some(base) = self.options.jira_base_url.as_deref() else {
                    continue;
                };
                let key = m.as_str();
                (
                    m.range(),
                    Inline::Link {
                        target: format!("{}/browse/{key}", base.trim_end_matches('/')),
                        title: String::new(),
                        children: vec![Inline::Text(key.to_string())],
                    },
                )
            } else {
                continue;
            };
            if range.start > last {
                out.push(Inline::Text(text[last..range.start].to_string()));
            }
            out.push(inline);
            last = range.end;
        }
        if last < text.len() {
            out.push(Inline::Text(text[last..].to_string()));
        }
    }

    fn text_until_end(&mut self) -> String {
        let mut text = String::new();
        while let Some((event, _)) = self.events.next() {
            match event {
                Event::End(_) => break,
                Event::Text(t) | Event::Html(t) | Event::Code(t) => text.push_str(&t),
                _ => {}
            }
        }
        text
    }

    fn skip_to_end(&mut self) {
        let mut depth = 0usize;
        while let Some((event, _)) = self.events.next() {
            match event {
                Event::Start(_) => depth += 1,
                Event::End(_) if depth == 0 => break,
                Event::End(_) => depth -= 1,
                _ => {}
            }
        }
    }

    fn raw(&self, range: Range<usize>) -> String {
        self.source
            .get(range)
            .unwrap_or_default()
            .trim_end_matches(['\n', '\r'])
            .to_string()
    }

    fn slug(&mut self, text: &str) -> String {
        let mut slug = String::new();
        for ch in text.trim().chars().flat_map(char::to_lowercase) {
            if ch.is_alphanumeric() || ch == '-' || ch == '_' {
                slug.push(ch);
            } else if ch.is_whitespace() {
                slug.push('-');
            }
        }
        let seen = self.slugs.entry(slug.clone()).or_insert(0);
        let id = if *seen == 0 {
            slug
        } else {
            format!("{slug}-{seen}")
        };
        *seen += 1;
        id
    }
}

const URL_TRAILING: &[char] = &['.', ',', ':', ';', '!', '?', ')', '\'', '"'];

fn autolink_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?P<url>\b(?:https?://|www\.)[^\s<>]+)|(?P<key>\b[A-Z][A-Z0-9]+-[0-9]+\b)")
            .expect("autolink regex")
    })
}

fn is_inline(event: &Event<'_>) -> bool {
    matches!(
        event,
        Event::Text(_)
            | Event::Code(_)
            | Event::InlineHtml(_)
            | Event::SoftBreak
            | Event::HardBreak
            | Event::FootnoteReference(_)
            | Event::TaskListMarker(_)
            | Event::Start(
                Tag::Emphasis
                    | Tag::Strong
                    | Tag::Strikethrough
                    | Tag::Link { .. }
                    | Tag::Image { .. }
            )
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(md: &str) -> Vec<Block> {
        parse(md, &ParseOptions::default()).blocks
    }

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    #[test]
    fn parses_emphasis_with_double_flag() {
        let blocks = doc("Hello **world** and *you*!");
        assert_eq!(
            blocks,
            vec![Block::Paragraph(vec![
                text("Hello "),
                Inline::Emphasis {
                    double: true,
                    children: vec![text("world")],
                },
                text(" and "),
                Inline::Emphasis {
                    double: false,
                    children: vec![text("you")],
                },
                text("!"),
            ])]
        );
    }

    #[test]
    fn headings_have_no_id_unless_requested() {
        let blocks = doc("# Title\n\n## Custom {#here}\n");
        assert!(matches!(&blocks[0], Block::Heading { level: 1, id: None, .. }));
        assert!(matches!(&blocks[1], Block::Heading { level: 2, id: Some(id), .. } if id == "here"));

        let options = ParseOptions {
            auto_heading_ids: true,
            ..ParseOptions::default()
        };
        let blocks = parse("# Hello, World!\n\n# Hello World\n", &options).blocks;
        assert!(matches!(&blocks[0], Block::Heading { id: Some(id), .. } if id == "hello-world"));
        assert!(matches!(&blocks[1], Block::Heading { id: Some(id), .. } if id == "hello-world-1"));
    }

    #[test]
    fn tight_list_items_get_implicit_paragraphs() {
        let blocks = doc("- one\n- [x] two\n  - nested\n");
        let Block::List(list) = &blocks[0] else {
            panic!("expected list, got {blocks:?}");
        };
        assert!(list.tight);
        assert_eq!(list.start, None);
        assert_eq!(list.items.len(), 2);
        assert_eq!(list.items[0].blocks, vec![Block::Paragraph(vec![text("one")])]);
        assert_eq!(list.items[1].task, Some(true));
        assert!(matches!(list.items[1].blocks[1], Block::List(_)));
    }

    #[test]
    fn loose_ordered_list_is_not_tight() {
        let blocks = doc("3. a\n\n4. b\n");
        let Block::List(list) = &blocks[0] else {
            panic!("expected list");
        };
        assert!(!list.tight);
        assert_eq!(list.start, Some(3));
    }

    #[test]
    fn code_blocks_keep_raw_text() {
        let blocks = doc("```rust title\nlet *x* = 1;\n```\n");
        assert_eq!(
            blocks,
            vec![Block::CodeBlock {
                language: Some("rust".to_string()),
                text: "let *x* = 1;\n".to_string(),
            }]
        );
    }

    #[test]
    fn tables_collect_header_and_rows() {
        let blocks = doc("| a | b |\n|:--|--:|\n| 1 | 2 |\n");
        let Block::Table(table) = &blocks[0] else {
            panic!("expected table");
        };
        assert_eq!(table.alignments, vec![Alignment::Left, Alignment::Right]);
        assert_eq!(table.header.cells.len(), 2);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].cells[1].children, vec![text("2")]);
    }

    #[test]
    fn unsupported_markup_falls_back_to_raw_text() {
        let blocks = doc("a ~~gone~~ b\n\n[^1]: note\n");
        assert_eq!(
            blocks[0],
            Block::Paragraph(vec![
                text("a "),
                Inline::Unknown {
                    raw: "~~gone~~".to_string()
                },
                text(" b"),
            ])
        );
        assert_eq!(
            blocks[1],
            Block::Unknown {
                raw: "[^1]: note".to_string()
            }
        );
    }

    #[test]
    fn autolinks_bare_urls_and_brackets() {
        let blocks = doc("see https://example.com/a. or <me@example.com>");
        assert_eq!(
            blocks[0],
            Block::Paragraph(vec![
                text("see "),
                Inline::AutoLink {
                    target: "https://example.com/a".to_string(),
                    text: "https://example.com/a".to_string(),
                },
                text(". or "),
                Inline::AutoLink {
                    target: "mailto:me@example.com".to_string(),
                    text: "me@example.com".to_string(),
                },
            ])
        );
    }

    #[test]
    fn jira_keys_link_only_when_configured() {
        assert_eq!(doc("fixes ABC-12")[0], Block::Paragraph(vec![text("fixes ABC-12")]));

        let options = ParseOptions {
            jira_base_url: Some("https://jira.example.com/".to_string()),
            ..ParseOptions::default()
        };
        let blocks = parse("fixes ABC-12", &options).blocks;
        assert_eq!(
            blocks[0],
            Block::Paragraph(vec![
                text("fixes "),
                Inline::Link {
                    target: "https://jira.example.com/browse/ABC-12".to_string(),
                    title: String::new(),
                    children: vec![text("ABC-12")],
                },
            ])
        );
    }

    #[test]
    fn links_and_images_keep_targets() {
        let blocks = doc("[go](other.md#top) ![logo](img/logo.png \"Logo\")");
        let Block::Paragraph(inlines) = &blocks[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(
            inlines[0],
            Inline::Link {
                target: "other.md#top".to_string(),
                title: String::new(),
                children: vec![text("go")],
            }
        );
        assert_eq!(
            inlines[2],
            Inline::Image {
                src: "img/logo.png".to_string(),
                title: "Logo".to_string(),
                alt: "logo".to_string(),
            }
        );
    }
}
