//! The inline style cursor used while walking the AST.
//!
//! There is no stack collection: a node that changes one attribute calls [`TextStyle::enter`],
//! keeps the returned previous value on its own call frame, and hands it back to
//! [`TextStyle::restore`] when its subtree is done.

use std::sync::Arc;

use mdview_core::theme::Theme;
use ratatui::style::Color;
use ratatui::style::Modifier;
use ratatui::style::Style;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextStyle {
    pub bold: bool,
    pub italic: bool,
    /// Inline code span.
    pub code: bool,
    pub fg: Option<Color>,
    /// Link target exactly as written in the source.
    pub link: Option<Arc<str>>,
}

/// One attribute of [`TextStyle`] together with a value for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StyleAttr {
    Bold(bool),
    Italic(bool),
    Code(bool),
    Fg(Option<Color>),
    Link(Option<Arc<str>>),
}

impl TextStyle {
    /// Sets `attr` and returns the value it replaced, wrapped in the same attribute.
    pub fn enter(&mut self, attr: StyleAttr) -> StyleAttr {
        match attr {
            StyleAttr::Bold(v) => StyleAttr::Bold(std::mem::replace(&mut self.bold, v)),
            StyleAttr::Italic(v) => StyleAttr::Italic(std::mem::replace(&mut self.italic, v)),
            StyleAttr::Code(v) => StyleAttr::Code(std::mem::replace(&mut self.code, v)),
            StyleAttr::Fg(v) => StyleAttr::Fg(std::mem::replace(&mut self.fg, v)),
            StyleAttr::Link(v) => StyleAttr::Link(std::mem::replace(&mut self.link, v)),
        }
    }

    pub fn restore(&mut self, previous: StyleAttr) {
        self.enter(previous);
    }

    pub fn is_link(&self) -> bool {
        self.link.is_some()
    }

    /// Resolves this style against the theme, on top of the enclosing block's `base` style.
    pub fn to_style(&self, base: Style, theme: &Theme) -> Style {
        let mut style = base;
        if self.code {
            style = style.patch(theme.code_inline);
        }
        if self.link.is_some() {
            style = style.patch(theme.link);
        }
        if let Some(fg) = self.fg {
            style = style.fg(fg);
        }
        if self.bold {
            style = style.add_modifier(Modifier::BOLD);
        }
        if self.italic {
            style = style.add_modifier(Modifier::ITALIC);
        }
        style
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_returns_previous_value() {
        let mut style = TextStyle::default();
        let prev = style.enter(StyleAttr::Bold(true));
        assert_eq!(prev, StyleAttr::Bold(false));
        assert!(style.bold);

        let inner = style.enter(StyleAttr::Bold(true));
        style.restore(inner);
        assert!(style.bold);

        style.restore(prev);
        assert_eq!(style, TextStyle::default());
    }

    #[test]
    fn nested_links_restore_outer_target() {
        let mut style = TextStyle::default();
        let outer = style.enter(StyleAttr::Link(Some(Arc::from("a.md"))));
        let inner = style.enter(StyleAttr::Link(Some(Arc::from("#top"))));
        assert_eq!(style.link.as_deref(), Some("#top"));
        style.restore(inner);
        assert_eq!(style.link.as_deref(), Some("a.md"));
        style.restore(outer);
        assert!(!style.is_link());
    }

    #[test]
    fn resolves_modifiers_on_top_of_base() {
        let theme = Theme::default();
        let style = TextStyle {
            bold: true,
            italic: true,
            ..TextStyle::default()
        };
        let resolved = style.to_style(Style::default().fg(Color::Red), &theme);
        assert_eq!(resolved.fg, Some(Color::Red));
        assert!(resolved.add_modifier.contains(Modifier::BOLD | Modifier::ITALIC));
    }
}
