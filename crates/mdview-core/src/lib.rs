//! `mdview-core` provides the host-side building blocks used by the `mdview` Markdown viewer.
//!
//! The Markdown layout engine never talks to a terminal directly. It emits drawing primitives
//! through the [`surface::Surface`] trait and reads scroll/viewport state from
//! [`viewport::ViewportState`]. This crate ships those seams plus a ratatui-backed
//! implementation, so the layout engine stays toolkit-agnostic.
//!
//! ## Design goals
//!
//! - Event-loop agnostic: you drive input + rendering from your app.
//! - Single-threaded rendering: every component here runs on the render thread.
//! - Minimal primitive set: text, image, border, fill.
//!
//! Useful entry points:
//! - [`surface::BufferSurface`]: draw layout primitives into a ratatui [`ratatui::buffer::Buffer`].
//! - [`viewport::ViewportState`]: clamped scroll offsets for a content/viewport pair.
//! - [`wrapping::WrapCache`]: word wrapping for plain text (used by the raw source view).
pub mod theme;

#[cfg(feature = "crossterm")]
pub mod crossterm_input;

pub mod input;
pub mod keymap;
pub mod render;
pub mod scroll;
pub mod surface;
pub mod viewport;
pub mod wrapping;
