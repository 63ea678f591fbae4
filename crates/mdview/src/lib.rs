//! `mdview` renders Markdown documents in the terminal on top of ratatui.
//!
//! This is a facade over the workspace crates:
//!
//! - [`core`] (always available): theme, input events and key bindings, viewport and scroll
//!   state, the [`core::surface::Surface`] drawing trait, and plain-text wrapping.
//! - [`markdown`] (feature `markdown`): the layout engine, image cache, history, navigation and
//!   the interactive [`markdown::viewer::MarkdownViewer`].
//!
//! Enable `crossterm` to convert crossterm events into [`core::input::InputEvent`].
pub use mdview_core as core;

pub use mdview_core::input;
pub use mdview_core::keymap;
pub use mdview_core::theme;

#[cfg(feature = "markdown")]
pub use mdview_markdown as markdown;

#[cfg(feature = "markdown")]
pub use mdview_markdown::viewer::MarkdownViewer;
#[cfg(feature = "markdown")]
pub use mdview_markdown::viewer::MarkdownViewerOptions;
#[cfg(feature = "markdown")]
pub use mdview_markdown::viewer::ViewerAction;
