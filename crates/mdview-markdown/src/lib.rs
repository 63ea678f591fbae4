//! Markdown layout engine for `mdview`.
//!
//! The pipeline is split into small layers that can be used independently:
//!
//! - [`ast`]: parse Markdown (via `pulldown-cmark`) into an owned, fixed set of block and inline
//!   kinds. Anything outside that set survives as raw text.
//! - [`builder`]: walk the AST and build a [`layout::Layout`] tree of styled runs, images,
//!   lists, tables and code blocks.
//! - [`layout`]: arrange the tree for a width, draw it through a
//!   [`mdview_core::surface::Surface`], and look up anchors and links by position.
//! - [`images`]: background image decoding with a poll-based completion signal.
//! - [`history`] and [`navigate`]: back/forward history and link following.
//! - [`viewer::MarkdownViewer`]: an interactive document controller that ties it together.
//!
//! Everything except image decoding runs on the caller's thread. Drive it from your own event
//! loop: call [`viewer::MarkdownViewer::update`] once per tick and redraw while it returns `true`.
pub mod assets;
pub mod ast;
pub mod builder;
pub mod error;
pub mod history;
pub mod images;
pub mod layout;
pub mod navigate;
pub mod style;
pub mod viewer;
