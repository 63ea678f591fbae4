//! The positioned layout tree.
//!
//! A [`Layout`] is built once per document (see [`crate::builder`]) and then arranged for a
//! width and drawn every frame. Coordinates are terminal cells in content space: columns are
//! `u16`, rows are `u32` measured from the top of the document. [`Viewport`] maps content rows
//! onto the screen.
//!
//! Arranging is a pure function of the width and the image cache state: arranging twice with the
//! same width produces the same positions, and arranging at another width and back restores them.
//! Drawing never mutates the tree and assumes the last [`Layout::arrange`] used the current width.

use std::ops::Range;
use std::sync::Arc;

use mdview_core::surface::ImagePlacement;
use mdview_core::surface::Surface;
use mdview_core::theme::Theme;
use ratatui::layout::Rect;
use ratatui::style::Style;
use unicode_width::UnicodeWidthChar;
use unicode_width::UnicodeWidthStr;

use crate::ast::Alignment;
use crate::images::ImageHandle;
use crate::images::ImageState;
use crate::style::TextStyle;

/// Narrowest a table column is squeezed to before the table overflows instead.
pub const MIN_COLUMN_WIDTH: u16 = 3;
const SEPARATOR_COLS: u16 = 3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Margins {
    pub top: u16,
    pub bottom: u16,
}

impl Margins {
    pub const fn new(top: u16, bottom: u16) -> Self {
        Self { top, bottom }
    }
}

#[derive(Clone, Debug)]
pub struct LayoutOptions {
    /// Paragraphs, lists, quotes, code blocks, tables and rules.
    pub block_margin: Margins,
    pub heading_margin: Margins,
    pub quote_indent: u16,
    /// Minimum indent of list item content; wider markers widen it.
    pub list_indent: u16,
    pub code_indent: u16,
    /// Pixel size of one terminal cell, used to size decoded images.
    pub cell_px: (u16, u16),
    pub max_image_rows: u16,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            block_margin: Margins::new(1, 1),
            heading_margin: Margins::new(1, 1),
            quote_indent: 2,
            list_indent: 2,
            code_indent: 2,
            cell_px: (8, 16),
            max_image_rows: 12,
        }
    }
}

/// A rectangle in content space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContentRect {
    pub x: u16,
    pub y: u32,
    pub width: u16,
    pub height: u32,
}

impl ContentRect {
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    pub fn right(&self) -> u16 {
        self.x.saturating_add(self.width)
    }

    pub fn contains(&self, x: u16, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }
}

/// The window of content currently on screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    /// Screen area the content is drawn into. Content column 0 maps to `area.x`.
    pub area: Rect,
    /// First visible content row.
    pub scroll_y: u32,
}

impl Viewport {
    pub fn new(area: Rect, scroll_y: u32) -> Self {
        Self { area, scroll_y }
    }

    fn bottom(&self) -> u32 {
        self.scroll_y.saturating_add(self.area.height as u32)
    }

    /// Screen row of content row `y`, if visible.
    pub fn row(&self, y: u32) -> Option<u16> {
        (y >= self.scroll_y && y < self.bottom()).then(|| self.area.y + (y - self.scroll_y) as u16)
    }

    pub fn col(&self, x: u16) -> u16 {
        self.area.x.saturating_add(x)
    }

    pub fn intersects(&self, rect: &ContentRect) -> bool {
        rect.height > 0 && rect.y < self.bottom() && rect.bottom() > self.scroll_y
    }

    /// The visible part of `rect`, in screen coordinates.
    pub fn screen_rect(&self, rect: &ContentRect) -> Option<Rect> {
        if !self.intersects(rect) {
            return None;
        }
        let top = rect.y.max(self.scroll_y);
        let bottom = rect.bottom().min(self.bottom());
        let screen = Rect::new(
            self.col(rect.x),
            self.area.y + (top - self.scroll_y) as u16,
            rect.width,
            (bottom - top) as u16,
        );
        Some(screen.intersection(self.area))
    }

    fn cols_until_right(&self, screen_x: u16) -> u16 {
        self.area.right().saturating_sub(screen_x)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockKind {
    Document,
    Paragraph,
    Heading(u8),
    Quote,
    /// Item of a [`NodeKind::List`]. Content is indented by `indent` columns.
    ListItem {
        marker: String,
        indent: u16,
    },
    TableCell(Alignment),
    /// A thematic break, one row tall.
    Rule,
}

#[derive(Debug)]
pub enum NodeKind {
    Container(BlockKind),
    Text(TextRun),
    Image(ImageNode),
    Table(TableGrid),
    List(ListBlock),
    CodeBlock(CodeBlock),
}

/// One wrapped piece of a [`TextRun`], placed on a single row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fragment {
    pub x: u16,
    pub y: u32,
    /// Byte range into the run's text.
    pub range: Range<usize>,
    pub cols: u16,
}

impl Fragment {
    pub fn contains(&self, x: u16, y: u32) -> bool {
        y == self.y && x >= self.x && x < self.x.saturating_add(self.cols)
    }
}

#[derive(Debug)]
pub struct TextRun {
    text: String,
    style: TextStyle,
    fragments: Vec<Fragment>,
}

impl TextRun {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn style(&self) -> &TextStyle {
        &self.style
    }

    /// Wrapped pieces from the last arrange pass.
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Appends text. Fragments are stale until the next arrange.
    pub fn push_str(&mut self, text: &str) {
        self.text.push_str(text);
    }
}

#[derive(Debug)]
pub struct ImageNode {
    handle: ImageHandle,
    alt: String,
    link: Option<Arc<str>>,
    cols: u16,
    rows: u32,
}

impl ImageNode {
    pub fn handle(&self) -> &ImageHandle {
        &self.handle
    }

    pub fn alt(&self) -> &str {
        &self.alt
    }

    pub fn link(&self) -> Option<&str> {
        self.link.as_deref()
    }

    /// Text drawn in place of the image while it is pending or after it failed.
    pub fn placeholder(&self) -> Option<String> {
        let label = if self.alt.is_empty() {
            self.handle
                .path()
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        } else {
            self.alt.clone()
        };
        match self.handle.state() {
            ImageState::Loaded(_) => None,
            ImageState::Pending => Some(format!("[image: {label}]")),
            ImageState::Failed(_) => Some(format!("[missing image: {label}]")),
        }
    }

    fn size(&self, avail: u16, options: &LayoutOptions) -> (u16, u32) {
        let avail = avail.max(1);
        match self.handle.state() {
            ImageState::Loaded(data) => {
                let (px_w, px_h) = data.size();
                let cell_w = options.cell_px.0.max(1) as u64;
                let cell_h = options.cell_px.1.max(1) as u64;
                let mut cols = (px_w as u64).div_ceil(cell_w).max(1);
                let mut rows = (px_h as u64).div_ceil(cell_h).max(1);
                if cols > avail as u64 {
                    rows = (rows * avail as u64 / cols).max(1);
                    cols = avail as u64;
                }
                let max_rows = options.max_image_rows.max(1) as u64;
                if rows > max_rows {
                    cols = (cols * max_rows / rows).max(1);
                    rows = max_rows;
                }
                (cols as u16, rows as u32)
            }
            _ => {
                let cols = self
                    .placeholder()
                    .map(|p| p.width())
                    .unwrap_or(1)
                    .min(avail as usize);
                (cols.max(1) as u16, 1)
            }
        }
    }
}

#[derive(Debug)]
pub struct ListBlock {
    pub start: Option<u64>,
    pub tight: bool,
}

/// A grid of [`BlockKind::TableCell`] children stored row-major, `columns` per row.
#[derive(Debug)]
pub struct TableGrid {
    alignments: Vec<Alignment>,
    columns: usize,
    header_rows: usize,
    col_widths: Vec<u16>,
    rows: Vec<(u32, u32)>,
    rule_y: Option<u32>,
}

impl TableGrid {
    pub fn alignments(&self) -> &[Alignment] {
        &self.alignments
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Column widths from the last arrange pass.
    pub fn col_widths(&self) -> &[u16] {
        &self.col_widths
    }

    /// `(y, height)` of each row from the last arrange pass.
    pub fn rows(&self) -> &[(u32, u32)] {
        &self.rows
    }
}

#[derive(Debug)]
pub struct CodeBlock {
    pub language: Option<String>,
    pub lines: Vec<String>,
    /// Raw HTML shown verbatim rather than source code.
    pub html: bool,
}

#[derive(Debug)]
pub struct LayoutNode {
    kind: NodeKind,
    id: Option<String>,
    rect: ContentRect,
    children: Vec<LayoutNode>,
}

impl LayoutNode {
    fn new(kind: NodeKind, children: Vec<LayoutNode>) -> Self {
        Self {
            kind,
            id: None,
            rect: ContentRect::default(),
            children,
        }
    }

    pub fn container(kind: BlockKind, children: Vec<LayoutNode>) -> Self {
        Self::new(NodeKind::Container(kind), children)
    }

    pub fn text(text: impl Into<String>, style: TextStyle) -> Self {
        Self::new(
            NodeKind::Text(TextRun {
                text: text.into(),
                style,
                fragments: Vec::new(),
            }),
            Vec::new(),
        )
    }

    pub fn image(handle: ImageHandle, alt: impl Into<String>, link: Option<Arc<str>>) -> Self {
        Self::new(
            NodeKind::Image(ImageNode {
                handle,
                alt: alt.into(),
                link,
                cols: 0,
                rows: 0,
            }),
            Vec::new(),
        )
    }

    pub fn list(start: Option<u64>, tight: bool, items: Vec<LayoutNode>) -> Self {
        Self::new(NodeKind::List(ListBlock { start, tight }), items)
    }

    /// `cells` are row-major with `columns` cells per row; the first `header_rows` rows are
    /// followed by a rule.
    pub fn table(
        alignments: Vec<Alignment>,
        columns: usize,
        header_rows: usize,
        cells: Vec<LayoutNode>,
    ) -> Self {
        Self::new(
            NodeKind::Table(TableGrid {
                alignments,
                columns,
                header_rows,
                col_widths: Vec::new(),
                rows: Vec::new(),
                rule_y: None,
            }),
            cells,
        )
    }

    pub fn code(language: Option<String>, text: &str, html: bool) -> Self {
        Self::new(
            NodeKind::CodeBlock(CodeBlock {
                language,
                lines: text.lines().map(str::to_string).collect(),
                html,
            }),
            Vec::new(),
        )
    }

    pub fn with_id(mut self, id: Option<String>) -> Self {
        self.id = id;
        self
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Mutable access for hosts that post-process a built tree. Call [`Layout::arrange`] after.
    pub fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    /// Anchor id, for headings that carry one.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Bounds from the last arrange pass. Text runs report the bounding box of their fragments.
    pub fn rect(&self) -> ContentRect {
        self.rect
    }

    pub fn children(&self) -> &[LayoutNode] {
        &self.children
    }

    pub fn is_inline(&self) -> bool {
        matches!(self.kind, NodeKind::Text(_) | NodeKind::Image(_))
    }

    fn margins(&self, options: &LayoutOptions) -> Margins {
        match &self.kind {
            NodeKind::Container(BlockKind::Heading(_)) => options.heading_margin,
            NodeKind::Container(BlockKind::Document | BlockKind::TableCell(_))
            | NodeKind::Text(_)
            | NodeKind::Image(_) => Margins::default(),
            _ => options.block_margin,
        }
    }

    /// Positions this node and its subtree at `(x, y)` within `width` columns. Returns the height.
    fn arrange(&mut self, x: u16, y: u32, width: u16, options: &LayoutOptions) -> u32 {
        if self.is_inline() {
            flow(std::slice::from_mut(self), x, y, width, Alignment::None, options);
            return self.rect.height;
        }
        let Self { kind, children, .. } = self;
        let height = match kind {
            NodeKind::Container(BlockKind::Document) => stack(children, x, y, width, false, options),
            NodeKind::Container(BlockKind::Paragraph | BlockKind::Heading(_)) => {
                flow(children, x, y, width, Alignment::None, options)
            }
            NodeKind::Container(BlockKind::TableCell(align)) => {
                flow(children, x, y, width, *align, options)
            }
            NodeKind::Container(BlockKind::Quote) => {
                let indent = options.quote_indent.min(width);
                stack(children, x + indent, y, width - indent, false, options)
            }
            NodeKind::Container(BlockKind::ListItem { indent, .. }) => {
                // Outside a list there is nothing to make the item tight.
                arrange_item(children, x, y, width, *indent, false, options)
            }
            NodeKind::Container(BlockKind::Rule) => 1,
            NodeKind::List(list) => {
                let tight = list.tight;
                let mut cursor = y;
                for (i, item) in children.iter_mut().enumerate() {
                    if i > 0 && !tight {
                        cursor += options.block_margin.bottom.max(options.block_margin.top) as u32;
                    }
                    cursor += item.arrange_list_item(x, cursor, width, tight, options);
                }
                cursor - y
            }
            NodeKind::Table(grid) => arrange_table(grid, children, x, y, width, options),
            NodeKind::CodeBlock(code) => code.lines.len() as u32,
            NodeKind::Text(_) | NodeKind::Image(_) => 0,
        };
        self.rect = ContentRect {
            x,
            y,
            width,
            height,
        };
        height
    }

    fn arrange_list_item(
        &mut self,
        x: u16,
        y: u32,
        width: u16,
        tight: bool,
        options: &LayoutOptions,
    ) -> u32 {
        let indent = match &self.kind {
            NodeKind::Container(BlockKind::ListItem { indent, .. }) => *indent,
            _ => 0,
        };
        let height = arrange_item(&mut self.children, x, y, width, indent, tight, options);
        self.rect = ContentRect {
            x,
            y,
            width,
            height,
        };
        height
    }

    fn find(&self, id: &str) -> Option<&LayoutNode> {
        if self.id.as_deref() == Some(id) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    fn hit(&self, x: u16, y: u32) -> Option<&LayoutNode> {
        if let NodeKind::Text(run) = &self.kind {
            return run
                .fragments
                .iter()
                .any(|f| f.contains(x, y))
                .then_some(self);
        }
        if !self.rect.contains(x, y) {
            return None;
        }
        self.children
            .iter()
            .find_map(|child| child.hit(x, y))
            .or(Some(self))
    }

    fn draw(&self, surface: &mut dyn Surface, ctx: &DrawCtx<'_>, base: Style) {
        if !ctx.viewport.intersects(&self.rect) {
            return;
        }
        let theme = ctx.theme;
        match &self.kind {
            NodeKind::Container(kind) => match kind {
                BlockKind::Heading(level) => {
                    self.draw_children(surface, ctx, base.patch(theme.heading(*level)))
                }
                BlockKind::Quote => {
                    for y in self.rect.y..self.rect.bottom() {
                        if let Some(sy) = ctx.viewport.row(y) {
                            let sx = ctx.viewport.col(self.rect.x);
                            surface.draw_text(sx, sy, "│", 1, theme.quote);
                        }
                    }
                    self.draw_children(surface, ctx, base.patch(theme.quote));
                }
                BlockKind::ListItem { marker, .. } => {
                    if let Some(sy) = ctx.viewport.row(self.rect.y) {
                        let sx = ctx.viewport.col(self.rect.x);
                        let max = (marker.width() as u16).min(ctx.viewport.cols_until_right(sx));
                        surface.draw_text(sx, sy, marker, max, base.patch(theme.accent));
                    }
                    self.draw_children(surface, ctx, base);
                }
                BlockKind::Rule => {
                    if let Some(sy) = ctx.viewport.row(self.rect.y) {
                        let sx = ctx.viewport.col(self.rect.x);
                        let line = "─".repeat(self.rect.width as usize);
                        surface.draw_text(sx, sy, &line, self.rect.width, theme.rule);
                    }
                }
                BlockKind::Document | BlockKind::Paragraph | BlockKind::TableCell(_) => {
                    self.draw_children(surface, ctx, base)
                }
            },
            NodeKind::Text(run) => {
                let style = run.style.to_style(base, theme);
                for fragment in &run.fragments {
                    let Some(sy) = ctx.viewport.row(fragment.y) else {
                        continue;
                    };
                    let Some(text) = run.text.get(fragment.range.clone()) else {
                        continue;
                    };
                    let sx = ctx.viewport.col(fragment.x);
                    let max = fragment.cols.min(ctx.viewport.cols_until_right(sx));
                    surface.draw_text(sx, sy, text, max, style);
                }
            }
            NodeKind::Image(image) => match image.handle.state() {
                ImageState::Loaded(data) => {
                    if let Some(area) = ctx.viewport.screen_rect(&self.rect) {
                        surface.draw_image(
                            data,
                            ImagePlacement {
                                area,
                                full_rows: image.rows,
                                first_row: ctx.viewport.scroll_y.saturating_sub(self.rect.y),
                            },
                        );
                    }
                }
                _ => {
                    if let (Some(sy), Some(text)) =
                        (ctx.viewport.row(self.rect.y), image.placeholder())
                    {
                        let mut style = base.patch(theme.image_placeholder);
                        if image.link.is_some() {
                            style = style.patch(theme.link);
                        }
                        let sx = ctx.viewport.col(self.rect.x);
                        let max = self.rect.width.min(ctx.viewport.cols_until_right(sx));
                        surface.draw_text(sx, sy, &text, max, style);
                    }
                }
            },
            NodeKind::List(_) => self.draw_children(surface, ctx, base),
            NodeKind::Table(grid) => {
                self.draw_children(surface, ctx, base);
                draw_table_lines(grid, &self.rect, surface, ctx);
            }
            NodeKind::CodeBlock(code) => {
                let style = if code.html {
                    theme.text_muted
                } else {
                    theme.code_block
                };
                if let Some(area) = ctx.viewport.screen_rect(&self.rect) {
                    surface.fill(area, style);
                }
                let indent = ctx.options.code_indent.min(self.rect.width);
                let sx = ctx.viewport.col(self.rect.x + indent);
                let max = (self.rect.width - indent).min(ctx.viewport.cols_until_right(sx));
                for (i, line) in code.lines.iter().enumerate() {
                    if let Some(sy) = ctx.viewport.row(self.rect.y + i as u32) {
                        surface.draw_text(sx, sy, line, max, style);
                    }
                }
            }
        }
    }

    fn draw_children(&self, surface: &mut dyn Surface, ctx: &DrawCtx<'_>, base: Style) {
        for child in &self.children {
            child.draw(surface, ctx, base);
        }
    }
}

struct DrawCtx<'a> {
    viewport: Viewport,
    theme: &'a Theme,
    options: &'a LayoutOptions,
}

/// An arranged document.
#[derive(Debug)]
pub struct Layout {
    root: LayoutNode,
    options: LayoutOptions,
    width: Option<u16>,
    height: u32,
}

impl Layout {
    pub fn new(root: LayoutNode, options: LayoutOptions) -> Self {
        Self {
            root,
            options,
            width: None,
            height: 0,
        }
    }

    /// Wraps and positions every node for `width` columns.
    pub fn arrange(&mut self, width: u16) {
        self.height = self.root.arrange(0, 0, width, &self.options);
        self.width = Some(width);
        tracing::trace!(width, height = self.height, "layout arranged");
    }

    /// Total height in rows. Only meaningful after [`Self::arrange`].
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Width used by the last arrange pass.
    pub fn width(&self) -> Option<u16> {
        self.width
    }

    pub fn options(&self) -> &LayoutOptions {
        &self.options
    }

    pub fn root(&self) -> &LayoutNode {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut LayoutNode {
        &mut self.root
    }

    /// Draws the visible slice of the last arrangement.
    pub fn draw(&self, surface: &mut dyn Surface, viewport: Viewport, theme: &Theme) {
        let ctx = DrawCtx {
            viewport,
            theme,
            options: &self.options,
        };
        self.root.draw(surface, &ctx, theme.text_primary);
    }

    /// The first node (depth-first) carrying anchor `id`.
    pub fn find(&self, id: &str) -> Option<&LayoutNode> {
        self.root.find(id)
    }

    /// Content row of the node carrying anchor `id`.
    pub fn anchor_offset(&self, id: &str) -> Option<u32> {
        self.find(id).map(|node| node.rect.y)
    }

    /// The deepest node at content position `(x, y)`.
    pub fn hit_test(&self, x: u16, y: u32) -> Option<&LayoutNode> {
        self.root.hit(x, y)
    }

    /// Link target of the run or image at content position `(x, y)`.
    pub fn link_at(&self, x: u16, y: u32) -> Option<&str> {
        match &self.hit_test(x, y)?.kind {
            NodeKind::Text(run) => run.style.link.as_deref(),
            NodeKind::Image(image) => image.link.as_deref(),
            _ => None,
        }
    }
}

/// Stacks block children vertically with collapsing margins. Tight stacks use no gaps.
fn stack(
    children: &mut [LayoutNode],
    x: u16,
    y: u32,
    width: u16,
    tight: bool,
    options: &LayoutOptions,
) -> u32 {
    let mut cursor = y;
    let mut prev_bottom = None;
    for child in children.iter_mut() {
        let margins = if tight {
            Margins::default()
        } else {
            child.margins(options)
        };
        if let Some(bottom) = prev_bottom {
            cursor += margins.top.max(bottom) as u32;
        }
        cursor += child.arrange(x, cursor, width, options);
        prev_bottom = Some(margins.bottom);
    }
    cursor - y
}

fn arrange_item(
    children: &mut [LayoutNode],
    x: u16,
    y: u32,
    width: u16,
    indent: u16,
    tight: bool,
    options: &LayoutOptions,
) -> u32 {
    let indent = indent.min(width);
    // The marker needs a row even when the item is empty.
    stack(children, x + indent, y, width - indent, tight, options).max(1)
}

#[derive(Debug)]
struct Placed {
    child: usize,
    range: Range<usize>,
    x: u16,
    cols: u16,
}

#[derive(Debug, Default)]
struct LineBox {
    items: Vec<Placed>,
    cols: u16,
    height: u32,
}

/// Greedy line breaking across the inline children of one block.
struct LineBreaker {
    width: u16,
    lines: Vec<LineBox>,
    current: LineBox,
    pending_space: u16,
}

impl LineBreaker {
    fn new(width: u16) -> Self {
        Self {
            width: width.max(1),
            lines: Vec::new(),
            current: LineBox::default(),
            pending_space: 0,
        }
    }

    fn push_text(&mut self, child: usize, text: &str) {
        let mut chars = text.char_indices().peekable();
        while let Some(&(start, ch)) = chars.peek() {
            if ch == '\n' {
                chars.next();
                self.commit();
                continue;
            }
            let space = ch.is_whitespace();
            let mut end = start;
            let mut cols = 0u16;
            while let Some(&(i, c)) = chars.peek() {
                if c == '\n' || c.is_whitespace() != space {
                    break;
                }
                end = i + c.len_utf8();
                cols = cols.saturating_add(char_cols(c));
                chars.next();
            }
            if space {
                if !self.current.items.is_empty() {
                    self.pending_space = self.pending_space.saturating_add(cols);
                }
            } else {
                self.push_word(child, text, start..end, cols);
            }
        }
    }

    fn push_word(&mut self, child: usize, text: &str, range: Range<usize>, cols: u16) {
        if !self.fits(cols) {
            self.commit();
        }
        if cols <= self.width {
            self.place(child, range, cols, 1);
            return;
        }

        // Longer than a whole line: hard split at column boundaries.
        let mut chunk_start = range.start;
        let mut chunk_cols = 0u16;
        for (i, c) in text[range.clone()].char_indices() {
            let w = char_cols(c);
            if chunk_cols > 0 && chunk_cols + w > self.width {
                self.place(child, chunk_start..range.start + i, chunk_cols, 1);
                self.commit();
                chunk_start = range.start + i;
                chunk_cols = 0;
            }
            chunk_cols += w;
        }
        self.place(child, chunk_start..range.end, chunk_cols, 1);
    }

    fn push_box(&mut self, child: usize, cols: u16, rows: u32) {
        if !self.fits(cols) {
            self.commit();
        }
        self.place(child, 0..0, cols, rows);
    }

    fn fits(&self, cols: u16) -> bool {
        self.current.items.is_empty()
            || self.current.cols as u32 + self.pending_space as u32 + cols as u32
                <= self.width as u32
    }

    fn place(&mut self, child: usize, range: Range<usize>, cols: u16, rows: u32) {
        let x = self.current.cols.saturating_add(self.pending_space);
        let merged = match self.current.items.last_mut() {
            Some(last) if last.child == child && !range.is_empty() && last.range.end <= range.start => {
                last.range.end = range.end;
                last.cols = x + cols - last.x;
                true
            }
            _ => false,
        };
        if !merged {
            self.current.items.push(Placed {
                child,
                range,
                x,
                cols,
            });
        }
        self.current.cols = x.saturating_add(cols);
        self.current.height = self.current.height.max(rows.max(1));
        self.pending_space = 0;
    }

    fn commit(&mut self) {
        let mut line = std::mem::take(&mut self.current);
        line.height = line.height.max(1);
        self.lines.push(line);
        self.pending_space = 0;
    }

    fn finish(mut self) -> Vec<LineBox> {
        if !self.current.items.is_empty() {
            self.commit();
        }
        self.lines
    }
}

/// Lays out inline children into wrapped lines. Returns the height.
fn flow(
    children: &mut [LayoutNode],
    x: u16,
    y: u32,
    width: u16,
    align: Alignment,
    options: &LayoutOptions,
) -> u32 {
    let mut breaker = LineBreaker::new(width);
    for (idx, child) in children.iter_mut().enumerate() {
        match &mut child.kind {
            NodeKind::Text(run) => {
                run.fragments.clear();
                breaker.push_text(idx, &run.text);
            }
            NodeKind::Image(image) => {
                let (cols, rows) = image.size(width, options);
                image.cols = cols;
                image.rows = rows;
                breaker.push_box(idx, cols, rows);
            }
            _ => {}
        }
    }

    let mut line_y = y;
    for line in breaker.finish() {
        let slack = width.saturating_sub(line.cols);
        let shift = match align {
            Alignment::Right => slack,
            Alignment::Center => slack / 2,
            Alignment::None | Alignment::Left => 0,
        };
        for placed in line.items {
            let child = &mut children[placed.child];
            let px = x + shift + placed.x;
            match &mut child.kind {
                NodeKind::Text(run) => run.fragments.push(Fragment {
                    x: px,
                    y: line_y,
                    range: placed.range,
                    cols: placed.cols,
                }),
                NodeKind::Image(image) => {
                    child.rect = ContentRect {
                        x: px,
                        y: line_y,
                        width: placed.cols,
                        height: image.rows,
                    }
                }
                _ => {}
            }
        }
        line_y += line.height;
    }

    for child in children.iter_mut() {
        if let NodeKind::Text(run) = &child.kind {
            child.rect = fragments_bounds(&run.fragments, x, y);
        }
    }
    line_y - y
}

fn fragments_bounds(fragments: &[Fragment], x: u16, y: u32) -> ContentRect {
    let Some(first) = fragments.first() else {
        return ContentRect {
            x,
            y,
            width: 0,
            height: 0,
        };
    };
    let left = fragments.iter().map(|f| f.x).min().unwrap_or(first.x);
    let right = fragments
        .iter()
        .map(|f| f.x.saturating_add(f.cols))
        .max()
        .unwrap_or(first.x);
    let bottom = fragments.iter().map(|f| f.y + 1).max().unwrap_or(first.y + 1);
    ContentRect {
        x: left,
        y: first.y,
        width: right - left,
        height: bottom - first.y,
    }
}

/// Two passes: column widths across all rows first, then each row's height at those widths.
fn arrange_table(
    grid: &mut TableGrid,
    cells: &mut [LayoutNode],
    x: u16,
    y: u32,
    width: u16,
    options: &LayoutOptions,
) -> u32 {
    grid.rows.clear();
    grid.rule_y = None;
    let columns = grid.columns;
    if columns == 0 {
        grid.col_widths.clear();
        return 0;
    }

    let mut natural = vec![MIN_COLUMN_WIDTH; columns];
    for (i, cell) in cells.iter().enumerate() {
        let col = i % columns;
        natural[col] = natural[col].max(natural_width(&cell.children, options));
    }
    let separators = SEPARATOR_COLS.saturating_mul(columns as u16 - 1);
    grid.col_widths = fit_columns(&natural, width.saturating_sub(separators));

    let mut cursor = y;
    for (r, row) in cells.chunks_mut(columns).enumerate() {
        let mut cx = x;
        let mut height = 1;
        for (c, cell) in row.iter_mut().enumerate() {
            let w = grid.col_widths[c];
            height = height.max(cell.arrange(cx, cursor, w, options));
            cx = cx.saturating_add(w).saturating_add(SEPARATOR_COLS);
        }
        for cell in row.iter_mut() {
            cell.rect.height = height;
        }
        grid.rows.push((cursor, height));
        cursor += height;
        if r + 1 == grid.header_rows {
            grid.rule_y = Some(cursor);
            cursor += 1;
        }
    }
    cursor - y
}

/// Single-line width of inline content, ignoring wrapping.
fn natural_width(children: &[LayoutNode], options: &LayoutOptions) -> u16 {
    let mut best = 0usize;
    let mut line = 0usize;
    for child in children {
        match &child.kind {
            NodeKind::Text(run) => {
                for (i, piece) in run.text.split('\n').enumerate() {
                    if i > 0 {
                        best = best.max(line);
                        line = 0;
                    }
                    line += piece.width();
                }
            }
            NodeKind::Image(image) => line += image.size(u16::MAX, options).0 as usize,
            _ => {}
        }
    }
    best.max(line).min(u16::MAX as usize) as u16
}

fn fit_columns(natural: &[u16], avail: u16) -> Vec<u16> {
    let total: u32 = natural.iter().map(|&w| w as u32).sum();
    if total <= avail as u32 {
        return natural.to_vec();
    }
    let min_total = MIN_COLUMN_WIDTH as u32 * natural.len() as u32;
    if (avail as u32) <= min_total {
        return vec![MIN_COLUMN_WIDTH; natural.len()];
    }

    let mut widths = natural
        .iter()
        .map(|&w| ((w as u32 * avail as u32) / total).max(MIN_COLUMN_WIDTH as u32) as u16)
        .collect::<Vec<_>>();
    let mut sum: u32 = widths.iter().map(|&w| w as u32).sum();
    while sum > avail as u32 {
        let Some((i, _)) = widths.iter().enumerate().max_by_key(|(_, w)| **w) else {
            break;
        };
        if widths[i] <= MIN_COLUMN_WIDTH {
            break;
        }
        widths[i] -= 1;
        sum -= 1;
    }
    let mut grown = true;
    while sum < avail as u32 && grown {
        grown = false;
        for (w, &n) in widths.iter_mut().zip(natural) {
            if sum < avail as u32 && *w < n {
                *w += 1;
                sum += 1;
                grown = true;
            }
        }
    }
    widths
}

fn draw_table_lines(grid: &TableGrid, rect: &ContentRect, surface: &mut dyn Surface, ctx: &DrawCtx<'_>) {
    let style = ctx.theme.table_border;
    let mut separator_xs = Vec::new();
    let mut cx = rect.x;
    for w in grid.col_widths.iter().take(grid.columns.saturating_sub(1)) {
        cx = cx.saturating_add(*w);
        separator_xs.push(cx.saturating_add(1));
        cx = cx.saturating_add(SEPARATOR_COLS);
    }

    for &(row_y, height) in &grid.rows {
        for y in row_y..row_y + height {
            let Some(sy) = ctx.viewport.row(y) else {
                continue;
            };
            for &sep_x in &separator_xs {
                let sx = ctx.viewport.col(sep_x);
                if ctx.viewport.cols_until_right(sx) > 0 {
                    surface.draw_text(sx, sy, "│", 1, style);
                }
            }
        }
    }

    if let Some(sy) = grid.rule_y.and_then(|y| ctx.viewport.row(y)) {
        let rule = grid
            .col_widths
            .iter()
            .map(|w| "─".repeat(*w as usize))
            .collect::<Vec<_>>()
            .join("─┼─");
        let sx = ctx.viewport.col(rect.x);
        surface.draw_text(sx, sy, &rule, ctx.viewport.cols_until_right(sx), style);
    }
}

fn char_cols(c: char) -> u16 {
    UnicodeWidthChar::width(c).unwrap_or(0) as u16
}
