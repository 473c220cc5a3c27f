use std::fmt;
use std::str::FromStr;

use crate::error::StatusError;

/// Upper bound for padding and spacing.
pub const MAX_GAP: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Style {
    #[default]
    Polybar,
    Tmux,
}

impl Style {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Polybar => "polybar",
            Self::Tmux => "tmux",
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Style {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "polybar" => Ok(Self::Polybar),
            "tmux" => Ok(Self::Tmux),
            _ => Err(StatusError::UnknownStyle(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Border {
    #[default]
    None,
    Overline,
    Underline,
}

impl FromStr for Border {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "overline" => Ok(Self::Overline),
            "underline" => Ok(Self::Underline),
            _ => Err(StatusError::UnknownBorder(s.to_string())),
        }
    }
}

/// How a widget lays out its tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetOptions {
    pub style: Style,
    pub border: Border,
    pub highlight: bool,
    pub background: bool,
    /// Suppress labels, show values only.
    pub text_only: bool,
    pub padding: usize,
    pub spacing: usize,
    pub separator: String,
}

impl Default for WidgetOptions {
    fn default() -> Self {
        Self {
            style: Style::default(),
            border: Border::default(),
            highlight: false,
            background: false,
            text_only: false,
            padding: 1,
            spacing: 1,
            separator: " ".to_string(),
        }
    }
}

impl WidgetOptions {
    pub fn validate(&self) -> Result<(), StatusError> {
        for (option, value) in [("padding", self.padding), ("spacing", self.spacing)] {
            if value > MAX_GAP {
                return Err(StatusError::OutOfRange {
                    option,
                    value,
                    max: MAX_GAP,
                });
            }
        }
        Ok(())
    }

    /// Spaces around each tag.
    pub fn pad(&self) -> String {
        " ".repeat(self.padding)
    }

    /// Glue between two tags.
    pub fn gap(&self) -> String {
        self.separator.repeat(self.spacing)
    }
}
