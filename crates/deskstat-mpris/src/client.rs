use std::collections::HashMap;
use std::pin::Pin;

use deskstat_core::media::signal::is_player_name;
use deskstat_core::media::{InboundSignal, MediaSession, PlaybackState, SessionProperties};
use futures_util::stream::{self, Stream, StreamExt};
use tracing::debug;
use zbus::fdo::DBusProxy;
use zbus::message::Type as MessageType;
use zbus::names::BusName;
use zbus::proxy::CacheProperties;
use zbus::zvariant::OwnedValue;
use zbus::{Connection, MatchRule, MessageStream};

use crate::decode::{decode_signal, metadata};
use crate::error::MprisError;
use crate::probe::SessionProbe;

const PLAYER_PATH: &str = "/org/mpris/MediaPlayer2";
/// Signals buffered per match rule before the bus starts dropping them.
const SIGNAL_QUEUE: usize = 64;

#[zbus::proxy(
    interface = "org.mpris.MediaPlayer2.Player",
    default_path = "/org/mpris/MediaPlayer2",
    gen_blocking = false
)]
trait Player {
    #[zbus(property)]
    fn playback_status(&self) -> zbus::Result<String>;

    #[zbus(property)]
    fn metadata(&self) -> zbus::Result<HashMap<String, OwnedValue>>;
}

pub type SignalStream = Pin<Box<dyn Stream<Item = InboundSignal> + Send>>;

/// Session bus connection used for discovery, signals and property reads.
#[derive(Clone)]
pub struct MprisClient {
    conn: Connection,
}

impl MprisClient {
    pub async fn connect() -> Result<Self, MprisError> {
        let conn = Connection::session().await?;
        debug!(unique_name = ?conn.unique_name(), "connected to session bus");
        Ok(Self { conn })
    }

    /// Every media player currently on the bus as `(bus_name, owner)`.
    /// A name whose owner cannot be resolved is skipped.
    pub async fn running_players(&self) -> Result<Vec<(String, String)>, MprisError> {
        let dbus = DBusProxy::new(&self.conn).await?;
        let names = dbus.list_names().await?;

        let mut players = Vec::new();
        for name in names {
            let name = name.as_str();
            if !is_player_name(name) {
                continue;
            }
            let Ok(bus_name) = BusName::try_from(name) else {
                continue;
            };
            match dbus.get_name_owner(bus_name).await {
                Ok(owner) => players.push((name.to_string(), owner.to_string())),
                Err(e) => debug!(name, error = %e, "no owner for media player"),
            }
        }
        Ok(players)
    }

    /// Property and ownership changes of media players, decoded. Malformed
    /// messages are dropped.
    pub async fn signals(&self) -> Result<SignalStream, MprisError> {
        let properties = MatchRule::builder()
            .msg_type(MessageType::Signal)
            .interface("org.freedesktop.DBus.Properties")?
            .member("PropertiesChanged")?
            .path(PLAYER_PATH)?
            .build();
        let owners = MatchRule::builder()
            .msg_type(MessageType::Signal)
            .sender("org.freedesktop.DBus")?
            .interface("org.freedesktop.DBus")?
            .member("NameOwnerChanged")?
            .build();

        let properties =
            MessageStream::for_match_rule(properties, &self.conn, Some(SIGNAL_QUEUE)).await?;
        let owners = MessageStream::for_match_rule(owners, &self.conn, Some(SIGNAL_QUEUE)).await?;

        let decoded = stream::select(properties, owners).filter_map(|msg| async move {
            match msg {
                Ok(msg) => decode_signal(&msg),
                Err(e) => {
                    debug!(error = %e, "dropping unreadable bus message");
                    None
                }
            }
        });
        Ok(Box::pin(decoded))
    }

    /// Proxy addressed at the session's unique owner, not its well-known name.
    async fn player(&self, session: &MediaSession) -> Result<PlayerProxy<'static>, MprisError> {
        let proxy = PlayerProxy::builder(&self.conn)
            .destination(session.owner.clone())?
            .cache_properties(CacheProperties::No)
            .build()
            .await?;
        Ok(proxy)
    }
}

impl SessionProbe for MprisClient {
    async fn playback_status(&self, session: &MediaSession) -> Result<PlaybackState, MprisError> {
        let player = self.player(session).await?;
        let raw = player.playback_status().await?;
        Ok(PlaybackState::parse(&raw))
    }

    async fn properties(&self, session: &MediaSession) -> Result<SessionProperties, MprisError> {
        let player = self.player(session).await?;
        let playback = PlaybackState::parse(&player.playback_status().await?);
        let raw = player.metadata().await?;
        Ok(SessionProperties {
            playback,
            metadata: metadata(&raw),
        })
    }
}
