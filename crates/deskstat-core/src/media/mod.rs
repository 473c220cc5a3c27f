//! Media sessions: registry, arbitration and the displayed status.

pub mod arbitration;
pub mod now_playing;
pub mod registry;
pub mod signal;

use std::collections::HashMap;
use std::fmt;

use crate::status::StatusValue;
use crate::theme::MediaIcons;

pub use arbitration::{WeightedCandidate, select_current};
pub use now_playing::{MAX_NOW_PLAYING, now_playing, truncate};
pub use registry::{MediaSession, OwnerChange, SessionRegistry};
pub use signal::InboundSignal;

pub const MEDIA_TAG: &str = "Mpris";

/// Well-known bus name prefix of media players.
pub const PLAYER_NAME_PREFIX: &str = "org.mpris.MediaPlayer2";
/// Interface whose property changes are worth a refresh.
pub const PLAYER_INTERFACE: &str = "org.mpris.MediaPlayer2.Player";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PlaybackState {
    Playing,
    Paused,
    Stopped,
    #[default]
    Unknown,
}

impl PlaybackState {
    /// Parse the player's `PlaybackStatus` property value.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Playing" => Self::Playing,
            "Paused" => Self::Paused,
            "Stopped" => Self::Stopped,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Playing => "Playing",
            Self::Paused => "Paused",
            Self::Stopped => "Stopped",
            Self::Unknown => "Unknown",
        }
    }

    pub fn weight(self) -> u8 {
        match self {
            Self::Playing => 2,
            Self::Paused => 1,
            Self::Stopped | Self::Unknown => 0,
        }
    }

    pub fn icon(self, icons: &MediaIcons) -> &str {
        match self {
            Self::Playing => &icons.playing,
            Self::Paused => &icons.paused,
            Self::Stopped => &icons.stopped,
            Self::Unknown => &icons.none,
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A loosely typed metadata entry, reduced to what display needs.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    Text(String),
    List(Vec<String>),
    Other,
}

impl MetaValue {
    /// The value as a string: the text itself, or the first list element.
    pub fn first_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::List(items) => items.first().map(String::as_str),
            Self::Other => None,
        }
    }
}

pub type Metadata = HashMap<String, MetaValue>;

/// What a player reports about itself at refresh time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionProperties {
    pub playback: PlaybackState,
    pub metadata: Metadata,
}

pub fn default_media_status(icons: &MediaIcons) -> StatusValue {
    StatusValue::new(MEDIA_TAG)
        .with_label(icons.stopped.clone())
        .with_value("")
}

/// Display status of the current session. A session whose icon is the
/// stopped icon shows no text.
pub fn session_status(icons: &MediaIcons, props: &SessionProperties) -> StatusValue {
    let icon = props.playback.icon(icons);
    if icon == icons.stopped {
        return default_media_status(icons).with_label(icon);
    }
    let text = truncate(&now_playing(&props.metadata), MAX_NOW_PLAYING, &icons.truncate);
    default_media_status(icons).with_label(icon).with_value(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Value;

    fn props(playback: PlaybackState, title: &str) -> SessionProperties {
        let mut metadata = Metadata::new();
        metadata.insert("xesam:title".into(), MetaValue::Text(title.into()));
        SessionProperties { playback, metadata }
    }

    #[test]
    fn playing_session_shows_title() {
        let icons = MediaIcons::default();
        let s = session_status(&icons, &props(PlaybackState::Playing, "Song"));
        assert_eq!(s.label, icons.playing);
        assert_eq!(s.value, Value::from("Song"));
    }

    #[test]
    fn stopped_session_shows_only_icon() {
        let icons = MediaIcons::default();
        let s = session_status(&icons, &props(PlaybackState::Stopped, "Song"));
        assert_eq!(s.label, icons.stopped);
        assert_eq!(s.value, Value::from(""));
    }

    #[test]
    fn unknown_state_with_default_icons_shows_only_icon() {
        let icons = MediaIcons::default();
        let s = session_status(&icons, &props(PlaybackState::Unknown, "Song"));
        assert_eq!(s.label, icons.none);
        assert_eq!(s.value, Value::from(""));
    }

    #[test]
    fn distinct_none_icon_keeps_text() {
        let icons = MediaIcons {
            none: "?".into(),
            ..MediaIcons::default()
        };
        let s = session_status(&icons, &props(PlaybackState::Unknown, "Song"));
        assert_eq!(s.label, "?");
        assert_eq!(s.value, Value::from("Song"));
    }

    #[test]
    fn parse_playback_status() {
        assert_eq!(PlaybackState::parse("Playing"), PlaybackState::Playing);
        assert_eq!(PlaybackState::parse("Paused"), PlaybackState::Paused);
        assert_eq!(PlaybackState::parse("Stopped"), PlaybackState::Stopped);
        assert_eq!(PlaybackState::parse("Buffering"), PlaybackState::Unknown);
    }
}
