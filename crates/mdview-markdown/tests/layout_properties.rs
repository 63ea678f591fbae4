use std::path::Path;
use std::sync::Arc;

use mdview_core::surface::BufferSurface;
use mdview_core::theme::Theme;
use mdview_markdown::assets::MemoryAssets;
use mdview_markdown::ast::Block;
use mdview_markdown::ast::Document;
use mdview_markdown::ast::Inline;
use mdview_markdown::ast::ParseOptions;
use mdview_markdown::ast::parse;
use mdview_markdown::builder::LayoutBuilder;
use mdview_markdown::history::History;
use mdview_markdown::images::ImageCache;
use mdview_markdown::layout::BlockKind;
use mdview_markdown::layout::Layout;
use mdview_markdown::layout::LayoutOptions;
use mdview_markdown::layout::LayoutNode;
use mdview_markdown::layout::NodeKind;
use mdview_markdown::layout::Viewport;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;

const SAMPLE: &str = "\
# Sample

A paragraph with *emphasis*, **strong**, ***both***, `code` and a [link](other.md).
It keeps going long enough to wrap at narrow widths, twice or more.

> A quote with **bold** text
> and a second line.

1. first
2. second
   - nested *item*

| Name | Value |
|:-----|------:|
| foo  | 123   |
| a much longer name | 4 |

```rust
fn main() {}
```

---

Footnote reference[^1] and ~~strike~~.

[^1]: The note.
";

fn build(document: &Document) -> Layout {
    let mut cache = ImageCache::new(Arc::new(MemoryAssets::new()));
    LayoutBuilder::new(Path::new("/docs/sample.md"), &mut cache, LayoutOptions::default())
        .build(document)
}

fn text_runs(node: &LayoutNode) -> Vec<&LayoutNode> {
    node.children()
        .iter()
        .filter(|child| matches!(child.kind(), NodeKind::Text(_)))
        .collect()
}

fn collect_styles(node: &LayoutNode, out: &mut Vec<(bool, bool)>) {
    if let NodeKind::Text(run) = node.kind() {
        out.push((run.style().bold, run.style().italic));
    }
    for child in node.children() {
        collect_styles(child, out);
    }
}

#[test]
fn arrange_is_deterministic_for_a_width() {
    let mut layout = build(&parse(SAMPLE, &ParseOptions::default()));
    for width in [1u16, 7, 20, 80] {
        layout.arrange(width);
        let first = layout.height();
        layout.arrange(width);
        assert_eq!(layout.height(), first, "width {width}");
    }
}

#[test]
fn arrange_round_trips_between_widths() {
    let mut layout = build(&parse(SAMPLE, &ParseOptions::default()));
    layout.arrange(24);
    let narrow = layout.height();
    let tops = layout
        .root()
        .children()
        .iter()
        .map(|c| c.rect())
        .collect::<Vec<_>>();

    layout.arrange(100);
    assert!(layout.height() < narrow);

    layout.arrange(24);
    assert_eq!(layout.height(), narrow);
    let again = layout
        .root()
        .children()
        .iter()
        .map(|c| c.rect())
        .collect::<Vec<_>>();
    assert_eq!(again, tops);
}

#[test]
fn balanced_emphasis_leaves_no_style_behind() {
    let mut cache = ImageCache::new(Arc::new(MemoryAssets::new()));
    let document = parse(
        "***a*** **b *c **d** e* f** plain\n\nnext *x* paragraph",
        &ParseOptions::default(),
    );
    let mut builder =
        LayoutBuilder::new(Path::new("/docs/a.md"), &mut cache, LayoutOptions::default());
    let layout = builder.build(&document);
    assert!(!builder.style().bold);
    assert!(!builder.style().italic);

    let mut styles = Vec::new();
    collect_styles(layout.root(), &mut styles);
    assert!(styles.contains(&(true, true)));
    assert!(styles.contains(&(true, false)));
    let paragraphs = layout.root().children();
    let last_first = text_runs(&paragraphs[0]).last().copied();
    let NodeKind::Text(run) = last_first.map(LayoutNode::kind).unwrap() else {
        panic!("expected text run");
    };
    assert_eq!(run.text(), " plain");
    assert_eq!((run.style().bold, run.style().italic), (false, false));

    let NodeKind::Text(first_second) = text_runs(&paragraphs[1])[0].kind() else {
        panic!("expected text run");
    };
    assert_eq!(first_second.text(), "next ");
    assert!(!first_second.style().bold && !first_second.style().italic);
}

#[test]
fn hello_world_is_three_runs_on_one_line() {
    let document = Document {
        blocks: vec![Block::Paragraph(vec![
            Inline::Text("Hello ".to_string()),
            Inline::Emphasis {
                double: true,
                children: vec![Inline::Text("world".to_string())],
            },
            Inline::Text("!".to_string()),
        ])],
    };
    let mut layout = build(&document);
    layout.arrange(80);

    let root = layout.root();
    assert_eq!(root.children().len(), 1);
    let paragraph = &root.children()[0];
    assert!(matches!(
        paragraph.kind(),
        NodeKind::Container(BlockKind::Paragraph)
    ));
    let runs = text_runs(paragraph);
    assert_eq!(runs.len(), 3);
    let NodeKind::Text(middle) = runs[1].kind() else {
        panic!("expected text run");
    };
    assert_eq!(middle.text(), "world");
    assert!(middle.style().bold);
    assert_eq!(layout.height(), 1);
}

#[test]
fn paragraph_follows_heading_margin() {
    let document = Document {
        blocks: vec![
            Block::Heading {
                level: 1,
                id: None,
                children: vec![Inline::Text("Title".to_string())],
            },
            Block::Paragraph(vec![Inline::Text("text".to_string())]),
        ],
    };
    let mut layout = build(&document);
    layout.arrange(40);

    let children = layout.root().children();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].id(), None);
    let heading = children[0].rect();
    let margin = LayoutOptions::default().heading_margin.bottom as u32;
    assert_eq!(children[1].rect().y, heading.bottom() + margin);
}

#[test]
fn explicit_heading_ids_are_anchors() {
    let mut layout = build(&parse(
        "# Intro {#intro}\n\ntext\n\n## Usage {#usage}\n",
        &ParseOptions::default(),
    ));
    layout.arrange(40);
    assert_eq!(layout.anchor_offset("intro"), Some(0));
    assert_eq!(layout.anchor_offset("usage"), Some(4));
}

#[test]
fn unknown_syntax_falls_back_to_raw_text() {
    let mut layout = build(&parse("a ~~b~~ c", &ParseOptions::default()));
    layout.arrange(40);
    let area = Rect::new(0, 0, 20, 1);
    let mut buf = Buffer::empty(area);
    let mut surface = BufferSurface::new(&mut buf, area);
    layout.draw(&mut surface, Viewport::new(area, 0), &Theme::default());
    let line = (0..20)
        .map(|x| buf.cell((x, 0)).map(|c| c.symbol().to_string()).unwrap_or_default())
        .collect::<String>();
    assert_eq!(line.trim_end(), "a ~~b~~ c");
}

#[test]
fn history_truncates_forward_entries() {
    let mut history = History::new();
    history.on_open("a");
    history.on_open("b");
    assert_eq!(history.back(), Some(Path::new("a")));
    assert_eq!(history.current(), Some(Path::new("a")));
    assert!(history.can_forward());

    history.on_open("c");
    assert!(!history.can_forward());
    assert_eq!(history.forward(), None);
    assert_eq!(history.current(), Some(Path::new("c")));
    assert_eq!(history.entries(), [Path::new("a"), Path::new("c")]);
}
