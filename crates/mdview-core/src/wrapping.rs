use unicode_width::UnicodeWidthChar;
use unicode_width::UnicodeWidthStr;

/// Word-wrapped plain text, cached per width.
///
/// Used for the raw source view: the text is split into source lines once and re-wrapped only
/// when the width changes.
#[derive(Clone, Debug, Default)]
pub struct WrapCache {
    raw: Vec<String>,
    wrapped: Vec<String>,
    wrap_cols: Option<u16>,
}

impl WrapCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_source(&mut self, text: &str) {
        self.raw = text
            .replace("\r\n", "\n")
            .split('\n')
            .map(normalize_tabs)
            .collect();
        if text.ends_with('\n') {
            self.raw.pop();
        }
        self.wrapped.clear();
        self.wrap_cols = None;
    }

    pub fn set_width(&mut self, width: u16) {
        if self.wrap_cols == Some(width) {
            return;
        }
        self.wrap_cols = Some(width);
        self.wrapped = self
            .raw
            .iter()
            .flat_map(|line| wrap_line(line, width))
            .collect();
    }

    /// The width the lines were last wrapped to.
    pub fn width(&self) -> Option<u16> {
        self.wrap_cols
    }

    pub fn wrapped_lines(&self) -> &[String] {
        &self.wrapped
    }

    pub fn content_height(&self) -> u32 {
        self.wrapped.len() as u32
    }
}

fn wrap_line(raw: &str, width: u16) -> Vec<String> {
    if width == 0 || UnicodeWidthStr::width(raw) <= width as usize {
        return vec![raw.to_string()];
    }

    let max_cols = width as usize;
    let mut out: Vec<String> = Vec::new();
    let mut line = String::new();
    let mut line_cols = 0usize;
    let mut last_soft_idx: Option<usize> = None;

    for ch in raw.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if line_cols.saturating_add(w) > max_cols {
            if let Some(split) = last_soft_idx {
                let (prefix, rest) = line.split_at(split);
                out.push(prefix.trim_end().to_string());
                line = rest.trim_start().to_string();
            } else if !line.is_empty() {
                out.push(std::mem::take(&mut line));
            }
            last_soft_idx = None;
        }

        if line.is_empty() && ch.is_whitespace() {
            continue;
        }

        if ch.is_whitespace() || matches!(ch, ',' | ';' | '.' | ':' | ')' | ']' | '|' | '/' | '-') {
            last_soft_idx = Some(line.len() + ch.len_utf8());
        }

        line.push(ch);
        line_cols = UnicodeWidthStr::width(line.as_str());
    }

    if !line.is_empty() {
        out.push(line);
    }
    out
}

fn normalize_tabs(s: &str) -> String {
    if s.contains('\t') {
        s.replace('\t', "    ")
    } else {
        s.to_string()
    }
}
