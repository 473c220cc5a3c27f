use super::{PLAYER_INTERFACE, PLAYER_NAME_PREFIX};

/// Player properties whose change alters what is displayed.
const WATCHED_PROPERTIES: [&str; 3] = ["PlaybackStatus", "Volume", "Metadata"];

/// Bus signal, decoded once where it enters the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundSignal {
    /// `org.freedesktop.DBus.Properties.PropertiesChanged`
    PropertiesChanged {
        sender: String,
        interface: String,
        changed: Vec<String>,
    },
    /// `org.freedesktop.DBus.NameOwnerChanged`
    OwnerChanged {
        name: String,
        old_owner: String,
        new_owner: String,
    },
}

pub fn is_player_name(name: &str) -> bool {
    name.starts_with(PLAYER_NAME_PREFIX)
}

/// True when a property change concerns the player interface and touches a
/// displayed property.
pub fn is_relevant_change(interface: &str, changed: &[String]) -> bool {
    interface == PLAYER_INTERFACE
        && changed
            .iter()
            .any(|key| WATCHED_PROPERTIES.contains(&key.as_str()))
}
