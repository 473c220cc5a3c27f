//! Icon sets and widget colors. Built once and handed to whoever needs it;
//! nothing here is mutated after construction.

use std::collections::HashMap;

/// Glyphs shown for the media status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaIcons {
    pub playing: String,
    pub paused: String,
    pub stopped: String,
    /// Shown for an unknown playback state.
    pub none: String,
    /// Appended to now-playing text when it is cut.
    pub truncate: String,
}

impl Default for MediaIcons {
    fn default() -> Self {
        Self {
            playing: "\u{f04b} ".into(),
            paused: "\u{f04c} ".into(),
            stopped: "\u{f04d}".into(),
            none: "\u{f04d}".into(),
            truncate: "…".into(),
        }
    }
}

/// Glyphs shown for the output volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeIcons {
    pub muted: String,
    pub low: String,
    pub medium: String,
    pub high: String,
}

impl Default for VolumeIcons {
    fn default() -> Self {
        Self {
            muted: "\u{f6a9} ".into(),
            low: "\u{f026} ".into(),
            medium: "\u{f027} ".into(),
            high: "\u{f028} ".into(),
        }
    }
}

/// Per-tag widget colors, `#AARRGGBB` or `#RRGGBB`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Color {
    pub background: String,
    pub highlight: String,
}

impl Color {
    pub fn new(background: impl Into<String>, highlight: impl Into<String>) -> Self {
        Self {
            background: background.into(),
            highlight: highlight.into(),
        }
    }

    /// Drop the alpha channel of `#AARRGGBB` values (tmux only knows RGB).
    pub fn rgb(&self) -> Color {
        Color {
            background: strip_alpha(&self.background),
            highlight: strip_alpha(&self.highlight),
        }
    }
}

fn strip_alpha(color: &str) -> String {
    let is_argb = color.len() == 9
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if is_argb {
        format!("#{}", &color[3..])
    } else {
        color.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub media: MediaIcons,
    pub volume: VolumeIcons,
    pub palette: HashMap<String, Color>,
}

impl Theme {
    pub fn color(&self, tag: &str) -> Option<&Color> {
        self.palette.get(tag)
    }
}

impl Default for Theme {
    fn default() -> Self {
        let red = Color::new("#7fcc0000", "#c0392b");
        let pink = Color::new("#5fff79c6", "#f012be");
        let green = Color::new("#5f4e9a06", "#1cdc9a");
        let orange = Color::new("#5fffb86c", "#ff851b");
        let yellow = Color::new("#5fc4a000", "#fce947");

        let palette = [
            ("CpuPercent", &red),
            ("CpuFreq", &red),
            ("LoadAvg", &red),
            ("MemPercent", &pink),
            ("SwapUsed", &pink),
            ("NetDevice", &green),
            ("DownSpeed", &orange),
            ("DownTotal", &orange),
            ("UpSpeed", &yellow),
            ("UpTotal", &yellow),
            ("Volume", &green),
            ("Mpris", &green),
        ]
        .into_iter()
        .map(|(tag, color)| (tag.to_string(), color.clone()))
        .collect();

        Self {
            media: MediaIcons::default(),
            volume: VolumeIcons::default(),
            palette,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_strips_alpha_only_from_argb() {
        let c = Color::new("#7fcc0000", "#c0392b").rgb();
        assert_eq!(c.background, "#cc0000");
        assert_eq!(c.highlight, "#c0392b");
    }

    #[test]
    fn rgb_ignores_non_hex() {
        let c = Color::new("#zzcc0000", "default").rgb();
        assert_eq!(c.background, "#zzcc0000");
        assert_eq!(c.highlight, "default");
    }

    #[test]
    fn default_palette_covers_published_tags() {
        let theme = Theme::default();
        for tag in ["Volume", "Mpris", "LoadAvg", "MemPercent", "SwapUsed"] {
            assert!(theme.color(tag).is_some(), "{tag} has no color");
        }
    }
}
