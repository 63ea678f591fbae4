//! An interactive Markdown document view.
//!
//! [`MarkdownViewer`] owns the currently open document, its layout tree and scroll state, and
//! implements [`NavigationHost`] so link clicks and history keys go through the shared
//! [`NavigationHandler`]. Drive it from your event loop:
//!
//! ```ignore
//! viewer.open("README.md")?;
//! loop {
//!     if viewer.update() { /* schedule a frame */ }
//!     terminal.draw(|f| viewer.render(f.area(), f.buffer_mut(), &theme))?;
//!     match viewer.handle_event(next_event()) { /* ... */ }
//! }
//! ```

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use mdview_core::input::InputEvent;
use mdview_core::input::KeyCode;
use mdview_core::input::KeyEvent;
use mdview_core::input::MouseButton;
use mdview_core::input::MouseEventKind;
use mdview_core::keymap;
use mdview_core::render;
use mdview_core::scroll::ScrollBindings;
use mdview_core::surface::BufferSurface;
use mdview_core::theme::Theme;
use mdview_core::viewport::ViewportState;
use mdview_core::wrapping::WrapCache;
use ratatui::buffer::Buffer;
use ratatui::layout::Position;
use ratatui::layout::Rect;

use crate::assets;
use crate::assets::AssetSource;
use crate::ast;
use crate::ast::ParseOptions;
use crate::builder::LayoutBuilder;
use crate::error::ViewerError;
use crate::history::SharedHistory;
use crate::images::ImageCache;
use crate::layout::Layout;
use crate::layout::LayoutOptions;
use crate::layout::Viewport;
use crate::navigate::Navigation;
use crate::navigate::NavigationHandler;
use crate::navigate::NavigationHost;

/// Width used to arrange a document that has not been rendered yet.
const DEFAULT_WIDTH: u16 = 80;
const BUTTON_COLS: u16 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavAction {
    Back,
    Forward,
    ToggleRaw,
}

#[derive(Clone, Debug)]
pub struct NavBindings {
    pub back: Vec<KeyEvent>,
    pub forward: Vec<KeyEvent>,
    pub toggle_raw: Vec<KeyEvent>,
}

impl Default for NavBindings {
    fn default() -> Self {
        Self {
            back: vec![keymap::key_char('b'), keymap::key(KeyCode::Backspace)],
            forward: vec![keymap::key_char('f')],
            toggle_raw: vec![keymap::key_char('r')],
        }
    }
}

impl NavBindings {
    pub fn action_for(&self, key: &KeyEvent) -> Option<NavAction> {
        [
            (&self.back, NavAction::Back),
            (&self.forward, NavAction::Forward),
            (&self.toggle_raw, NavAction::ToggleRaw),
        ]
        .into_iter()
        .find(|(keys, _)| keymap::any_matches(keys, key))
        .map(|(_, action)| action)
    }
}

#[derive(Clone, Debug)]
pub struct MarkdownViewerOptions {
    pub padding_left: u16,
    pub padding_right: u16,
    pub show_scrollbar: bool,
    pub show_toolbar: bool,
    /// File extensions (without the dot, case-insensitive) rendered as Markdown. Anything else is
    /// shown as raw text.
    pub markdown_extensions: Vec<String>,
    pub scroll: ScrollBindings,
    pub nav: NavBindings,
    pub layout: LayoutOptions,
    pub parse: ParseOptions,
}

impl Default for MarkdownViewerOptions {
    fn default() -> Self {
        Self {
            padding_left: 1,
            padding_right: 1,
            show_scrollbar: true,
            show_toolbar: true,
            markdown_extensions: vec!["md".to_string(), "markdown".to_string()],
            scroll: ScrollBindings::default(),
            nav: NavBindings::default(),
            layout: LayoutOptions::default(),
            parse: ParseOptions::default(),
        }
    }
}

/// What the host should do after [`MarkdownViewer::handle_event`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewerAction {
    None,
    Redraw,
    /// Open this URL outside the viewer.
    OpenExternal(String),
    /// Something failed; the view is unchanged. Suitable for a status line.
    Error(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolbarButton {
    Back,
    Forward,
    ToggleRaw,
}

impl ToolbarButton {
    fn label(self) -> &'static str {
        match self {
            Self::Back => " ◀ ",
            Self::Forward => " ▶ ",
            Self::ToggleRaw => " ≡ ",
        }
    }
}

pub struct MarkdownViewer {
    options: MarkdownViewerOptions,
    assets: Arc<dyn AssetSource>,
    navigation: NavigationHandler,
    images: ImageCache,
    path: Option<PathBuf>,
    text: String,
    markdown: bool,
    raw: bool,
    layout: Option<Layout>,
    layout_generation: u64,
    seen_generation: u64,
    wrap: WrapCache,
    pub state: ViewportState,
    last_width: Option<u16>,
    content_area: Rect,
    toolbar: Vec<(Rect, ToolbarButton)>,
}

impl MarkdownViewer {
    /// A viewer with no document. `history` may be shared with other viewers.
    pub fn new(
        history: SharedHistory,
        assets: Arc<dyn AssetSource>,
        options: MarkdownViewerOptions,
    ) -> Self {
        Self {
            options,
            navigation: NavigationHandler::new(history, Arc::clone(&assets)),
            images: ImageCache::new(Arc::clone(&assets)),
            assets,
            path: None,
            text: String::new(),
            markdown: false,
            raw: false,
            layout: None,
            layout_generation: 0,
            seen_generation: 0,
            wrap: WrapCache::new(),
            state: ViewportState::default(),
            last_width: None,
            content_area: Rect::default(),
            toolbar: Vec::new(),
        }
    }

    /// Opens `path` and records it in history.
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<(), ViewerError> {
        let path = assets::normalize(path.as_ref());
        self.load_document(&path)?;
        self.navigation.history().borrow_mut().on_open(path);
        Ok(())
    }

    pub fn options(&self) -> &MarkdownViewerOptions {
        &self.options
    }

    pub fn history(&self) -> &SharedHistory {
        self.navigation.history()
    }

    pub fn images(&self) -> &ImageCache {
        &self.images
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    pub fn is_markdown(&self) -> bool {
        self.markdown
    }

    /// `true` while the source text is shown instead of the rendered document.
    pub fn is_raw(&self) -> bool {
        self.raw || !self.markdown
    }

    pub fn scroll_y(&self) -> u32 {
        self.state.y
    }

    /// Screen rects of the toolbar buttons drawn by the last render.
    pub fn toolbar_buttons(&self) -> &[(Rect, ToolbarButton)] {
        &self.toolbar
    }

    /// Publishes finished image loads. Returns `true` when another frame is needed: while loads
    /// are pending, and once after any of them completed.
    pub fn update(&mut self) -> bool {
        let pending = self.images.poll();
        let generation = self.images.generation();
        let changed = generation != self.seen_generation;
        self.seen_generation = generation;
        pending || changed
    }

    pub fn toggle_raw(&mut self) -> bool {
        if !self.markdown {
            return false;
        }
        self.raw = !self.raw;
        self.state.to_top();
        true
    }

    pub fn back(&mut self) -> ViewerAction {
        let navigation = self.navigation.clone();
        navigation_result(navigation.back(self))
    }

    pub fn forward(&mut self) -> ViewerAction {
        let navigation = self.navigation.clone();
        navigation_result(navigation.forward(self))
    }

    /// Follows a link target as if it had been clicked in the current document.
    pub fn follow_link(&mut self, target: &str) -> ViewerAction {
        let navigation = self.navigation.clone();
        navigation_result(navigation.follow(target, self))
    }

    pub fn handle_event(&mut self, event: InputEvent) -> ViewerAction {
        match event {
            InputEvent::Resize(..) => ViewerAction::Redraw,
            InputEvent::Key(key) => {
                if let Some(action) = self.options.nav.action_for(&key) {
                    return self.nav_action(action);
                }
                let Some(action) = self.options.scroll.action_for(&key) else {
                    return ViewerAction::None;
                };
                self.options.scroll.apply(&mut self.state, action);
                ViewerAction::Redraw
            }
            InputEvent::Mouse(m) => match m.kind {
                MouseEventKind::ScrollUp => {
                    self.state.scroll_y_by(-self.options.scroll.wheel_step);
                    ViewerAction::Redraw
                }
                MouseEventKind::ScrollDown => {
                    self.state.scroll_y_by(self.options.scroll.wheel_step);
                    ViewerAction::Redraw
                }
                MouseEventKind::Down(MouseButton::Left) => self.click(m.x, m.y),
                _ => ViewerAction::None,
            },
        }
    }

    fn nav_action(&mut self, action: NavAction) -> ViewerAction {
        match action {
            NavAction::Back => self.back(),
            NavAction::Forward => self.forward(),
            NavAction::ToggleRaw => {
                if self.toggle_raw() {
                    ViewerAction::Redraw
                } else {
                    ViewerAction::None
                }
            }
        }
    }

    fn click(&mut self, x: u16, y: u16) -> ViewerAction {
        let pos = Position::new(x, y);
        let button = self
            .toolbar
            .iter()
            .find(|(rect, _)| rect.contains(pos))
            .map(|(_, button)| *button);
        if let Some(button) = button {
            return self.nav_action(match button {
                ToolbarButton::Back => NavAction::Back,
                ToolbarButton::Forward => NavAction::Forward,
                ToolbarButton::ToggleRaw => NavAction::ToggleRaw,
            });
        }

        if self.is_raw() || !self.content_area.contains(pos) {
            return ViewerAction::None;
        }
        let cx = x - self.content_area.x;
        let cy = self.state.y + (y - self.content_area.y) as u32;
        let target = self
            .layout
            .as_ref()
            .and_then(|layout| layout.link_at(cx, cy))
            .map(str::to_string);
        match target {
            Some(target) => self.follow_link(&target),
            None => ViewerAction::None,
        }
    }

    /// Content height at `width`. Arranges only if the width changed or images finished loading
    /// since the last pass; the scroll state is not touched.
    fn measure(&mut self, width: u16) -> u32 {
        if self.is_raw() {
            self.wrap.set_width(width);
            return self.wrap.content_height();
        }
        let generation = self.images.generation();
        let Some(layout) = &mut self.layout else {
            return 0;
        };
        if layout.width() != Some(width) || self.layout_generation != generation {
            layout.arrange(width);
            self.layout_generation = generation;
        }
        layout.height()
    }

    fn arranged_width(&self) -> Option<u16> {
        if self.is_raw() {
            self.wrap.width()
        } else {
            self.layout.as_ref().and_then(Layout::width)
        }
    }

    /// Arranges for `width` if needed and clamps the scroll offset to the resulting height.
    fn ensure_layout(&mut self, width: u16) {
        let height = self.measure(width);
        self.last_width = Some(width);
        self.state.set_content(height);
    }

    /// Chooses the content rect inside `body` and the scrollbar column, if any.
    ///
    /// The scrollbar is shown when the document overflows at the narrowed width. A layout that
    /// already fits at full width is kept without measuring the narrow one.
    fn fit_content(&mut self, body: Rect) -> (Rect, Option<u16>) {
        let (left, right) = (self.options.padding_left, self.options.padding_right);
        let full = inset_h(body, left, right);
        if !self.options.show_scrollbar || body.width < 2 {
            return (full, None);
        }
        let narrow = inset_h(
            Rect::new(body.x, body.y, body.width - 1, body.height),
            left,
            right,
        );
        let rows = body.height as u32;
        if self.arranged_width() == Some(full.width) && self.measure(full.width) <= rows {
            return (full, None);
        }
        if self.measure(narrow.width) > rows {
            (narrow, Some(body.right() - 1))
        } else {
            (full, None)
        }
    }

    pub fn render(&mut self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        self.toolbar.clear();
        if area.width == 0 || area.height == 0 {
            return;
        }

        let mut body = area;
        if self.options.show_toolbar && area.height >= 2 {
            self.render_toolbar(Rect::new(area.x, area.y, area.width, 1), buf, theme);
            body = Rect::new(area.x, area.y + 1, area.width, area.height - 1);
        }

        self.state.set_viewport(body.height);
        let (content, scrollbar_x) = self.fit_content(body);
        self.ensure_layout(content.width);
        self.content_area = content;

        buf.set_style(body, theme.text_primary);
        if self.is_raw() {
            let lines = self.wrap.wrapped_lines();
            for row in 0..content.height {
                let idx = self.state.y as usize + row as usize;
                let Some(line) = lines.get(idx) else {
                    break;
                };
                render::render_str_clipped(
                    content.x,
                    content.y + row,
                    content.width,
                    buf,
                    line,
                    theme.text_primary,
                );
            }
        } else if let Some(layout) = &self.layout {
            let mut surface = BufferSurface::new(buf, content);
            layout.draw(&mut surface, Viewport::new(content, self.state.y), theme);
        }

        if let Some(x) = scrollbar_x {
            render::render_scrollbar(
                Rect::new(x, body.y, 1, body.height),
                buf,
                &self.state,
                theme.text_muted,
            );
        }
    }

    fn render_toolbar(&mut self, area: Rect, buf: &mut Buffer, theme: &Theme) {
        buf.set_style(area, theme.toolbar);
        let (can_back, can_forward) = {
            let history = self.navigation.history().borrow();
            (history.can_back(), history.can_forward())
        };

        let mut buttons = Vec::new();
        if !self.is_raw() {
            if can_back {
                buttons.push(ToolbarButton::Back);
            }
            if can_forward {
                buttons.push(ToolbarButton::Forward);
            }
        }
        if self.markdown {
            buttons.push(ToolbarButton::ToggleRaw);
        }

        let mut x = area.x;
        for button in buttons {
            if x.saturating_add(BUTTON_COLS) > area.right() {
                break;
            }
            render::render_str_clipped(x, area.y, BUTTON_COLS, buf, button.label(), theme.toolbar);
            self.toolbar.push((Rect::new(x, area.y, BUTTON_COLS, 1), button));
            x += BUTTON_COLS;
        }

        if let Some(name) = self.path.as_deref().and_then(Path::file_name) {
            let x = x.saturating_add(1);
            let max = area.right().saturating_sub(x);
            render::render_str_clipped(
                x,
                area.y,
                max,
                buf,
                &name.to_string_lossy(),
                theme.toolbar.patch(theme.text_muted),
            );
        }
    }

    fn is_markdown_path(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| {
                self.options
                    .markdown_extensions
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(&ext))
            })
    }
}

impl NavigationHost for MarkdownViewer {
    fn document_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn find_anchor(&mut self, id: &str) -> Option<u32> {
        if self.is_raw() {
            return None;
        }
        self.ensure_layout(self.last_width.unwrap_or(DEFAULT_WIDTH));
        self.layout.as_ref()?.anchor_offset(id)
    }

    fn scroll_to(&mut self, y: u32) {
        self.state.scroll_to(y);
    }

    fn load_document(&mut self, path: &Path) -> Result<(), ViewerError> {
        let bytes = self.assets.read(path).map_err(|source| {
            tracing::warn!(path = %path.display(), error = %source, "document read failed");
            ViewerError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let markdown = self.is_markdown_path(path);

        self.layout = if markdown {
            let document = ast::parse(&text, &self.options.parse);
            let mut builder =
                LayoutBuilder::new(path, &mut self.images, self.options.layout.clone());
            Some(builder.build(&document))
        } else {
            None
        };
        self.wrap.set_source(&text);
        self.text = text;
        self.markdown = markdown;
        self.raw = false;
        self.path = Some(path.to_path_buf());
        self.state.to_top();
        tracing::debug!(path = %path.display(), markdown, "document loaded");
        Ok(())
    }
}

fn navigation_result(result: Result<Navigation, ViewerError>) -> ViewerAction {
    match result {
        Ok(Navigation::External(url)) => ViewerAction::OpenExternal(url),
        Ok(Navigation::AnchorMissing(id)) => ViewerAction::Error(format!("no anchor `#{id}`")),
        Ok(Navigation::Scrolled(_) | Navigation::Opened(_)) => ViewerAction::Redraw,
        Err(err) => {
            tracing::warn!(error = %err, "navigation failed");
            ViewerAction::Error(err.to_string())
        }
    }
}

fn inset_h(area: Rect, left: u16, right: u16) -> Rect {
    let left = left.min(area.width);
    let right = right.min(area.width.saturating_sub(left));
    Rect::new(
        area.x.saturating_add(left),
        area.y,
        area.width.saturating_sub(left).saturating_sub(right),
        area.height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::MemoryAssets;
    use crate::history::History;
    use image::DynamicImage;
    use image::ImageFormat;
    use mdview_core::input::MouseEvent;
    use std::io::Cursor;
    use std::thread;
    use std::time::Duration;
    use std::time::Instant;

    fn viewer(assets: MemoryAssets) -> MarkdownViewer {
        MarkdownViewer::new(
            History::new().shared(),
            Arc::new(assets),
            MarkdownViewerOptions::default(),
        )
    }

    fn rows(buf: &Buffer) -> Vec<String> {
        let area = buf.area;
        (area.y..area.bottom())
            .map(|y| {
                (area.x..area.right())
                    .map(|x| buf.cell((x, y)).map(|c| c.symbol().to_string()).unwrap_or_default())
                    .collect::<String>()
                    .trim_end()
                    .to_string()
            })
            .collect()
    }

    fn draw(viewer: &mut MarkdownViewer, w: u16, h: u16) -> Vec<String> {
        let area = Rect::new(0, 0, w, h);
        let mut buf = Buffer::empty(area);
        viewer.render(area, &mut buf, &Theme::default());
        rows(&buf)
    }

    fn docs() -> MemoryAssets {
        MemoryAssets::new()
            .with_file("/docs/a.md", "# A\n\nSee [next](b.md).\n")
            .with_file("/docs/b.md", "# B\n\nback to [a](a.md#top)\n")
            .with_file("/docs/notes.txt", "*not* markdown\n")
    }

    #[test]
    fn renders_toolbar_and_document() {
        let mut viewer = viewer(docs());
        viewer.open("/docs/a.md").unwrap();
        let lines = draw(&mut viewer, 30, 6);
        assert_eq!(lines[0], " ≡  a.md");
        assert_eq!(lines[1], " A");
        assert_eq!(lines[3], " See next.");
        assert_eq!(viewer.toolbar_buttons().len(), 1);
    }

    #[test]
    fn clicking_a_link_opens_it_and_back_returns() {
        let mut viewer = viewer(docs());
        viewer.open("/docs/a.md").unwrap();
        draw(&mut viewer, 30, 6);

        let action = viewer.handle_event(InputEvent::Mouse(MouseEvent::click(6, 3)));
        assert_eq!(action, ViewerAction::Redraw);
        assert_eq!(viewer.path(), Some(Path::new("/docs/b.md")));

        let lines = draw(&mut viewer, 30, 6);
        assert!(lines[0].starts_with(" ◀ "));

        let back = viewer.handle_event(InputEvent::Key(keymap::key_char('b')));
        assert_eq!(back, ViewerAction::Redraw);
        assert_eq!(viewer.path(), Some(Path::new("/docs/a.md")));
        assert!(viewer.history().borrow().can_forward());
    }

    #[test]
    fn missing_documents_leave_the_view_unchanged() {
        let mut viewer = viewer(docs());
        viewer.open("/docs/a.md").unwrap();
        let action = viewer.follow_link("missing.md");
        assert!(matches!(action, ViewerAction::Error(_)));
        assert_eq!(viewer.path(), Some(Path::new("/docs/a.md")));
        assert_eq!(viewer.history().borrow().len(), 1);
    }

    #[test]
    fn external_links_are_handed_to_the_host() {
        let mut viewer = viewer(docs());
        viewer.open("/docs/a.md").unwrap();
        assert_eq!(
            viewer.follow_link("https://example.com"),
            ViewerAction::OpenExternal("https://example.com".to_string())
        );
    }

    #[test]
    fn non_markdown_files_show_raw_text() {
        let mut viewer = viewer(docs());
        viewer.open("/docs/notes.txt").unwrap();
        assert!(!viewer.is_markdown());
        assert!(viewer.is_raw());
        assert!(!viewer.toggle_raw());
        let lines = draw(&mut viewer, 30, 4);
        assert_eq!(lines[1], " *not* markdown");
    }

    #[test]
    fn raw_toggle_switches_views() {
        let mut viewer = viewer(docs());
        viewer.open("/docs/a.md").unwrap();
        let action = viewer.handle_event(InputEvent::Key(keymap::key_char('r')));
        assert_eq!(action, ViewerAction::Redraw);
        let lines = draw(&mut viewer, 30, 6);
        assert_eq!(lines[1], " # A");
    }

    #[test]
    fn scrollbar_appears_only_when_overflowing() {
        let long = (1..=20).map(|i| format!("line {i}\n\n")).collect::<String>();
        let mut viewer = viewer(MemoryAssets::new().with_file("/long.md", long));
        viewer.open("/long.md").unwrap();
        draw(&mut viewer, 20, 5);
        assert!(viewer.state.is_overflowing());

        viewer.handle_event(InputEvent::Key(keymap::key(KeyCode::End)));
        assert_eq!(viewer.scroll_y(), viewer.state.max_y());
        let lines = draw(&mut viewer, 20, 5);
        assert_eq!(lines[4].trim_end_matches(|c: char| !c.is_alphanumeric()), " line 20");
    }

    #[test]
    fn end_reaches_the_last_line_when_the_scrollbar_changes_wrapping() {
        // Each line fills 18 columns exactly and wraps once the scrollbar takes a column.
        let mut text = "aaaaaaaa bbbbbbbbb ".repeat(20);
        text.push_str("\n\nEND\n");
        let mut viewer = viewer(MemoryAssets::new().with_file("/wrap.md", text));
        viewer.open("/wrap.md").unwrap();
        draw(&mut viewer, 20, 6);
        assert_eq!(viewer.layout().and_then(Layout::width), Some(17));

        viewer.handle_event(InputEvent::Key(keymap::key(KeyCode::End)));
        let wanted = viewer.scroll_y();
        let lines = draw(&mut viewer, 20, 6);
        assert_eq!(viewer.scroll_y(), wanted);
        assert_eq!(viewer.scroll_y(), viewer.state.max_y());
        assert_eq!(
            viewer.state.content_h,
            viewer.layout().map_or(0, Layout::height)
        );
        assert!(lines.iter().any(|line| line.contains("END")), "{lines:?}");
    }

    #[test]
    fn short_documents_keep_the_full_width() {
        let mut viewer = viewer(docs());
        viewer.open("/docs/a.md").unwrap();
        draw(&mut viewer, 30, 6);
        assert_eq!(viewer.layout().and_then(Layout::width), Some(28));
        assert!(!viewer.state.is_overflowing());
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::new_rgb8(width, height)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn finished_image_loads_request_a_frame_and_rearrange() {
        let assets = MemoryAssets::new()
            .with_file("/docs/pic.md", "![pic](pic.png)\n\nafter\n")
            .with_file("/docs/pic.png", png(32, 48));
        let mut viewer = viewer(assets);
        viewer.open("/docs/pic.md").unwrap();
        let before = draw(&mut viewer, 30, 20);
        assert_eq!(before[1], " [image: pic]");
        let height_before = viewer.layout().map_or(0, Layout::height);

        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let redraw = viewer.update();
            assert!(redraw);
            if viewer.images().pending_count() == 0 {
                break;
            }
            assert!(Instant::now() < deadline, "image load did not finish");
            thread::sleep(Duration::from_millis(10));
        }
        assert!(!viewer.update());

        let after = draw(&mut viewer, 30, 20);
        assert_eq!(viewer.layout().map_or(0, Layout::height), height_before + 2);
        assert!(after[1].starts_with(" ▀▀▀▀"));
        assert!(after.iter().any(|line| line == " after"));
    }

    #[test]
    fn raw_view_hides_history_buttons() {
        let mut viewer = viewer(docs());
        viewer.open("/docs/a.md").unwrap();
        viewer.follow_link("b.md");
        draw(&mut viewer, 30, 6);
        assert_eq!(viewer.toolbar_buttons().len(), 2);

        assert!(viewer.toggle_raw());
        let lines = draw(&mut viewer, 30, 6);
        assert_eq!(lines[0], " ≡  b.md");
        assert_eq!(
            viewer
                .toolbar_buttons()
                .iter()
                .map(|(_, button)| *button)
                .collect::<Vec<_>>(),
            vec![ToolbarButton::ToggleRaw]
        );
    }
}
