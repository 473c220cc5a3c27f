//! Per-tag templates for the supported bar styles.
//!
//! Example polybar output for `CpuPercent` with overline, background and
//! highlight:
//!
//! ```text
//! %{o#c0392b}%{+o}%{B#7fcc0000} %{F#c0392b}L%{F-}  92% %{B-}%{-o}
//! ```

use super::options::{Border, Style, WidgetOptions};
use crate::status::Content;
use crate::theme::Color;

/// Marker replaced by the tag's content at render time.
pub const CONTENT_MARKER: &str = "[CONTENT]";

/// Everything needed to render one tag, computed once per widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagTemplate {
    format: String,
    color: Color,
}

impl TagTemplate {
    pub fn new(opts: &WidgetOptions, color: &Color) -> Self {
        let pad = opts.pad();
        let body = format!("{pad}{CONTENT_MARKER}{pad}");
        let format = match opts.style {
            Style::Polybar => polybar_format(opts, color, body),
            Style::Tmux => tmux_format(opts, color, body),
        };
        Self {
            format,
            color: color.clone(),
        }
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    /// Fill the template with `content`.
    pub fn render(&self, opts: &WidgetOptions, content: &Content) -> String {
        let raw = self.raw_content(opts, content);
        self.format.replacen(CONTENT_MARKER, &raw, 1)
    }

    fn raw_content(&self, opts: &WidgetOptions, content: &Content) -> String {
        if opts.text_only || content.label.is_empty() {
            return content.text.clone();
        }
        match opts.style {
            Style::Polybar if opts.highlight => format!(
                "%{{F{}}}{}%{{F-}} {}",
                self.color.highlight, content.label, content.text
            ),
            _ => format!("{}{}", content.label, content.text),
        }
    }
}

fn polybar_format(opts: &WidgetOptions, color: &Color, body: String) -> String {
    let mut format = body;
    if opts.background {
        format = format!("%{{B{}}}{format}%{{B-}}", color.background);
    }
    match opts.border {
        Border::Overline => format!("%{{o{}}}%{{+o}}{format}%{{-o}}", color.highlight),
        Border::Underline => format!("%{{u{}}}%{{+u}}{format}%{{-u}}", color.highlight),
        Border::None => format,
    }
}

fn tmux_format(opts: &WidgetOptions, color: &Color, body: String) -> String {
    let rgb = color.rgb();
    let fg = if opts.highlight {
        rgb.highlight.as_str()
    } else {
        "default"
    };
    let bg = if opts.background {
        rgb.background.as_str()
    } else {
        "default"
    };
    format!("#[fg={fg},bg={bg}]{body}#[fg=default,bg=default]")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn color() -> Color {
        Color::new("#7fcc0000", "#c0392b")
    }

    fn opts(style: Style) -> WidgetOptions {
        WidgetOptions {
            style,
            ..WidgetOptions::default()
        }
    }

    #[test]
    fn polybar_plain() {
        let t = TagTemplate::new(&opts(Style::Polybar), &color());
        assert_eq!(t.format(), " [CONTENT] ");
    }

    #[test]
    fn polybar_full_decoration() {
        let o = WidgetOptions {
            border: Border::Overline,
            background: true,
            highlight: true,
            ..opts(Style::Polybar)
        };
        let t = TagTemplate::new(&o, &color());
        assert_eq!(
            t.format(),
            "%{o#c0392b}%{+o}%{B#7fcc0000} [CONTENT] %{B-}%{-o}"
        );
        assert_eq!(
            t.render(&o, &Content::new("L", " 92%")),
            "%{o#c0392b}%{+o}%{B#7fcc0000} %{F#c0392b}L%{F-}  92% %{B-}%{-o}"
        );
    }

    #[test]
    fn polybar_underline() {
        let o = WidgetOptions {
            border: Border::Underline,
            padding: 0,
            ..opts(Style::Polybar)
        };
        let t = TagTemplate::new(&o, &color());
        assert_eq!(t.format(), "%{u#c0392b}%{+u}[CONTENT]%{-u}");
    }

    #[test]
    fn tmux_colors_are_rgb() {
        let o = WidgetOptions {
            highlight: true,
            background: true,
            border: Border::Overline,
            ..opts(Style::Tmux)
        };
        let t = TagTemplate::new(&o, &color());
        assert_eq!(
            t.format(),
            "#[fg=#c0392b,bg=#cc0000] [CONTENT] #[fg=default,bg=default]"
        );
        // Highlight does not split label and text in tmux.
        assert_eq!(
            t.render(&o, &Content::new("V", "50%")),
            "#[fg=#c0392b,bg=#cc0000] V50% #[fg=default,bg=default]"
        );
    }

    #[test]
    fn tmux_defaults() {
        let t = TagTemplate::new(&opts(Style::Tmux), &color());
        assert_eq!(
            t.format(),
            "#[fg=default,bg=default] [CONTENT] #[fg=default,bg=default]"
        );
    }

    #[test]
    fn text_only_and_empty_label_skip_label() {
        let o = WidgetOptions {
            text_only: true,
            ..opts(Style::Polybar)
        };
        let t = TagTemplate::new(&o, &color());
        assert_eq!(t.render(&o, &Content::new("L", "x")), " x ");

        let o = opts(Style::Polybar);
        assert_eq!(t.render(&o, &Content::new("", "x")), " x ");
        assert_eq!(t.render(&o, &Content::new("L", "x")), " Lx ");
    }

    #[test]
    fn marker_in_content_is_not_expanded_twice() {
        let o = opts(Style::Polybar);
        let t = TagTemplate::new(&o, &color());
        assert_eq!(
            t.render(&o, &Content::new("", "[CONTENT]")),
            " [CONTENT] "
        );
    }
}
