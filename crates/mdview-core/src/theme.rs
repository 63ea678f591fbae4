use ratatui::style::Modifier;
use ratatui::style::Style;

/// Colors and modifiers used when drawing an arranged layout.
///
/// Text runs carry only semantic attributes (bold, italic, link, ...). The theme decides how each
/// block kind looks, and run attributes are patched on top.
#[derive(Clone, Debug)]
pub struct Theme {
    pub text_primary: Style,
    pub text_muted: Style,
    pub accent: Style,
    pub danger: Style,
    pub heading: [Style; 6],
    pub link: Style,
    pub code_inline: Style,
    pub code_block: Style,
    pub quote: Style,
    pub rule: Style,
    pub table_border: Style,
    pub image_placeholder: Style,
    pub toolbar: Style,
}

impl Theme {
    /// Base style for a heading of `level` (1-based, clamped to 1..=6).
    pub fn heading(&self, level: u8) -> Style {
        let idx = level.clamp(1, 6) as usize - 1;
        self.heading[idx]
    }
}

impl Default for Theme {
    fn default() -> Self {
        use ratatui::style::Stylize;

        let heading = Style::default().add_modifier(Modifier::BOLD);
        Self {
            text_primary: Style::default(),
            text_muted: Style::default().dark_gray(),
            accent: Style::default().cyan(),
            danger: Style::default().red(),
            heading: [
                heading.magenta().add_modifier(Modifier::UNDERLINED),
                heading.magenta(),
                heading.blue(),
                heading,
                heading,
                heading.dark_gray(),
            ],
            link: Style::default().cyan().add_modifier(Modifier::UNDERLINED),
            code_inline: Style::default().yellow(),
            code_block: Style::default().yellow(),
            quote: Style::default().dark_gray().add_modifier(Modifier::ITALIC),
            rule: Style::default().dark_gray(),
            table_border: Style::default().dark_gray(),
            image_placeholder: Style::default().dark_gray(),
            toolbar: Style::default().black().on_gray(),
        }
    }
}
