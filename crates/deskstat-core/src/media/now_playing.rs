use super::Metadata;

/// Longest now-playing text, in characters, before the truncation marker.
pub const MAX_NOW_PLAYING: usize = 96;

/// Fields some players fill with a ready-made "now playing" line. An empty
/// field counts as absent, so the next key is tried.
const STREAM_TITLE_KEYS: [&str; 2] = ["cmus:stream_title", "vlc:nowplaying"];
const ARTIST_KEYS: [&str; 2] = ["xesam:artist", "xesam:albumArtist"];
const TITLE_KEY: &str = "xesam:title";
const URL_KEY: &str = "xesam:url";
const COMMENT_KEY: &str = "xesam:comment";

fn field<'a>(metadata: &'a Metadata, key: &str) -> Option<&'a str> {
    metadata
        .get(key)
        .and_then(|v| v.first_text())
        .filter(|s| !s.is_empty())
}

fn first_field<'a>(metadata: &'a Metadata, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| field(metadata, key))
}

/// Build the display line from player metadata.
///
/// Precedence: stream title, then `artist - title` (no artist prefix when the
/// URL is an http stream, which names itself), then the URL, then the
/// comment.
pub fn now_playing(metadata: &Metadata) -> String {
    if let Some(stream) = first_field(metadata, &STREAM_TITLE_KEYS) {
        return stream.to_string();
    }

    let url = field(metadata, URL_KEY);
    if let Some(title) = field(metadata, TITLE_KEY) {
        let is_stream = url.is_some_and(|u| u.starts_with("http"));
        return match first_field(metadata, &ARTIST_KEYS) {
            Some(artist) if !is_stream => format!("{artist} - {title}"),
            _ => title.to_string(),
        };
    }

    url.or_else(|| field(metadata, COMMENT_KEY))
        .unwrap_or_default()
        .to_string()
}

/// Cut `text` to `max` characters and append `marker` when anything was cut.
pub fn truncate(text: &str, max: usize, marker: &str) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}{marker}", &text[..cut]),
        None => text.to_string(),
    }
}
