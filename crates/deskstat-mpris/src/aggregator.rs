//! Media session tracking and arbitration.
//!
//! Two halves, each owned by one task:
//!
//! * [`MediaAggregator`] owns the session registry and routes inbound signals.
//!   Every registry change or relevant property change publishes a fresh
//!   snapshot on a `watch` channel.
//! * [`StatusRefresher`] waits on that channel, probes the sessions, picks the
//!   current one and yields a status only when it differs from the last one.
//!
//! The `watch` channel keeps only the latest snapshot, so requests that pile
//! up during a slow refresh collapse into a single follow-up run.

use std::time::Duration;

use deskstat_core::StatusValue;
use deskstat_core::media::signal::{is_player_name, is_relevant_change};
use deskstat_core::media::{
    InboundSignal, MediaSession, OwnerChange, SessionRegistry, WeightedCandidate,
    default_media_status, select_current, session_status,
};
use deskstat_core::theme::MediaIcons;
use tokio::sync::watch;
use tracing::debug;

use crate::error::MprisError;
use crate::probe::SessionProbe;

pub type SessionSnapshot = Vec<MediaSession>;

/// Deadline for one call to one player. A frozen player is skipped instead
/// of stalling the refresher.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

// ─── Router ───────────────────────────────────────────────────────

#[derive(Debug)]
pub struct MediaAggregator {
    registry: SessionRegistry,
    refresh_tx: watch::Sender<SessionSnapshot>,
}

impl MediaAggregator {
    /// Create the router and the receiving end for its refresher.
    pub fn new() -> (Self, watch::Receiver<SessionSnapshot>) {
        let (refresh_tx, refresh_rx) = watch::channel(Vec::new());
        (
            Self {
                registry: SessionRegistry::new(),
                refresh_tx,
            },
            refresh_rx,
        )
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Register a session. Re-announcing a known owner is a no-op that still
    /// reports success.
    pub fn handle_session_announced(&mut self, bus_name: &str, owner: &str) -> bool {
        if self.registry.contains(owner) {
            return true;
        }
        let added = self.registry.announce(bus_name, owner);
        if added {
            debug!(bus_name, owner, "media session announced");
        }
        added
    }

    /// Forget a session. Returns whether one was removed.
    pub fn handle_session_withdrawn(&mut self, bus_name: &str, owner: &str) -> bool {
        let removed = self.registry.withdraw(bus_name, owner);
        if removed {
            debug!(bus_name, owner, "media session withdrawn");
        }
        removed
    }

    pub fn handle_owner_changed(
        &mut self,
        bus_name: &str,
        old_owner: &str,
        new_owner: &str,
    ) -> OwnerChange {
        let change = self.registry.change_owner(bus_name, old_owner, new_owner);
        debug!(
            bus_name,
            old_owner,
            new_owner,
            withdrawn = change.withdrawn,
            announced = change.announced,
            "media owner changed"
        );
        change
    }

    /// Dispatch one decoded signal. Returns true when it led to a refresh
    /// request; everything else is dropped without a trace.
    pub fn route_signal(&mut self, signal: InboundSignal) -> bool {
        match signal {
            InboundSignal::PropertiesChanged {
                sender,
                interface,
                changed,
            } => {
                if !is_relevant_change(&interface, &changed) || !self.registry.contains(&sender) {
                    return false;
                }
            }
            InboundSignal::OwnerChanged {
                name,
                old_owner,
                new_owner,
            } => {
                if !is_player_name(&name) {
                    return false;
                }
                if !self.handle_owner_changed(&name, &old_owner, &new_owner).any() {
                    return false;
                }
            }
        }
        self.request_refresh();
        true
    }

    /// Hand the current registry to the refresher. Never waits; a pending
    /// snapshot that was not picked up yet is replaced.
    pub fn request_refresh(&self) {
        self.refresh_tx.send_replace(self.registry.snapshot());
    }
}

// ─── Refresher ────────────────────────────────────────────────────

/// Recomputes the displayed media status and remembers what was last
/// published.
pub struct StatusRefresher<P> {
    probe: P,
    icons: MediaIcons,
    last: StatusValue,
    timeout: Duration,
}

impl<P: SessionProbe> StatusRefresher<P> {
    pub fn new(probe: P, icons: MediaIcons) -> Self {
        let last = default_media_status(&icons);
        Self {
            probe,
            icons,
            last,
            timeout: PROBE_TIMEOUT,
        }
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    async fn bounded<T>(
        &self,
        session: &MediaSession,
        call: impl Future<Output = Result<T, MprisError>>,
    ) -> Result<T, MprisError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .unwrap_or_else(|_| Err(MprisError::Timeout(session.owner.clone())))
    }

    /// Arbitrate over `sessions` and build the status to display.
    pub async fn current_status(&self, sessions: &[MediaSession]) -> StatusValue {
        let mut candidates = Vec::with_capacity(sessions.len());
        for session in sessions {
            match self.bounded(session, self.probe.playback_status(session)).await {
                Ok(playback) => candidates.push(WeightedCandidate::new(session, playback)),
                Err(e) => debug!(owner = %session.owner, error = %e, "skipping media session"),
            }
        }

        let Some(winner) = select_current(&candidates) else {
            return default_media_status(&self.icons);
        };
        let Some(session) = sessions.iter().find(|s| s.owner == winner.owner) else {
            return default_media_status(&self.icons);
        };

        match self.bounded(session, self.probe.properties(session)).await {
            Ok(props) => session_status(&self.icons, &props),
            Err(e) => {
                debug!(owner = %session.owner, error = %e, "media properties unavailable");
                default_media_status(&self.icons)
            }
        }
    }

    /// Recompute and return the new status only when label or value changed.
    pub async fn refresh_status(&mut self, sessions: &[MediaSession]) -> Option<StatusValue> {
        let status = self.current_status(sessions).await;
        if !status.differs_from(&self.last) {
            return None;
        }
        self.last = status.clone();
        Some(status)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use deskstat_core::Value;
    use deskstat_core::media::{MetaValue, Metadata, PLAYER_INTERFACE, PlaybackState, SessionProperties};

    use super::*;

    const VLC: &str = "org.mpris.MediaPlayer2.vlc";
    const MPV: &str = "org.mpris.MediaPlayer2.mpv";

    #[derive(Default)]
    struct FakeProbe {
        players: Mutex<HashMap<String, (PlaybackState, String)>>,
        broken: Mutex<Vec<String>>,
        hung: Mutex<Vec<String>>,
        calls: Mutex<usize>,
    }

    impl FakeProbe {
        fn set(&self, owner: &str, playback: PlaybackState, title: &str) {
            self.players
                .lock()
                .unwrap()
                .insert(owner.to_string(), (playback, title.to_string()));
        }

        fn break_owner(&self, owner: &str) {
            self.broken.lock().unwrap().push(owner.to_string());
        }

        fn hang_owner(&self, owner: &str) {
            self.hung.lock().unwrap().push(owner.to_string());
        }

        fn is_hung(&self, owner: &str) -> bool {
            self.hung.lock().unwrap().iter().any(|o| o == owner)
        }

        fn lookup(&self, owner: &str) -> Result<(PlaybackState, String), MprisError> {
            *self.calls.lock().unwrap() += 1;
            if self.broken.lock().unwrap().iter().any(|o| o == owner) {
                return Err(MprisError::Unreachable(owner.to_string()));
            }
            self.players
                .lock()
                .unwrap()
                .get(owner)
                .cloned()
                .ok_or_else(|| MprisError::Unreachable(owner.to_string()))
        }
    }

    impl SessionProbe for FakeProbe {
        async fn playback_status(&self, session: &MediaSession) -> Result<PlaybackState, MprisError> {
            if self.is_hung(&session.owner) {
                std::future::pending::<()>().await;
            }
            self.lookup(&session.owner).map(|(playback, _)| playback)
        }

        async fn properties(&self, session: &MediaSession) -> Result<SessionProperties, MprisError> {
            let (playback, title) = self.lookup(&session.owner)?;
            let mut metadata = Metadata::new();
            metadata.insert("xesam:title".into(), MetaValue::Text(title));
            Ok(SessionProperties { playback, metadata })
        }
    }

    fn sessions(list: &[(&str, &str)]) -> Vec<MediaSession> {
        list.iter()
            .map(|(bus, owner)| MediaSession::new(*bus, *owner))
            .collect()
    }

    fn props_changed(sender: &str, interface: &str, keys: &[&str]) -> InboundSignal {
        InboundSignal::PropertiesChanged {
            sender: sender.to_string(),
            interface: interface.to_string(),
            changed: keys.iter().map(|k| k.to_string()).collect(),
        }
    }

    fn owner_changed(name: &str, old: &str, new: &str) -> InboundSignal {
        InboundSignal::OwnerChanged {
            name: name.to_string(),
            old_owner: old.to_string(),
            new_owner: new.to_string(),
        }
    }

    // ─── Router ───────────────────────────────────────────────────

    #[test]
    fn announce_is_idempotent() {
        let (mut agg, _rx) = MediaAggregator::new();
        assert!(agg.handle_session_announced(VLC, ":1.5"));
        assert!(agg.handle_session_announced(VLC, ":1.5"));
        assert_eq!(agg.registry().len(), 1);
    }

    #[test]
    fn withdraw_reports_removal() {
        let (mut agg, _rx) = MediaAggregator::new();
        agg.handle_session_announced(VLC, ":1.5");
        assert!(agg.handle_session_withdrawn(VLC, ":1.5"));
        assert!(!agg.handle_session_withdrawn(VLC, ":1.5"));
        assert!(agg.registry().is_empty());
    }

    #[test]
    fn owner_change_swaps_atomically() {
        let (mut agg, _rx) = MediaAggregator::new();
        agg.handle_session_announced(VLC, ":1.5");
        let change = agg.handle_owner_changed(VLC, ":1.5", ":1.9");
        assert!(change.withdrawn && change.announced);
        assert!(!agg.registry().contains(":1.5"));
        assert!(agg.registry().contains(":1.9"));
    }

    #[test]
    fn relevant_property_change_requests_refresh() {
        let (mut agg, mut rx) = MediaAggregator::new();
        agg.handle_session_announced(VLC, ":1.5");
        assert!(agg.route_signal(props_changed(":1.5", PLAYER_INTERFACE, &["Metadata"])));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);
    }

    #[test]
    fn irrelevant_signals_are_dropped() {
        let (mut agg, rx) = MediaAggregator::new();
        agg.handle_session_announced(VLC, ":1.5");
        assert!(!agg.route_signal(props_changed(":1.5", PLAYER_INTERFACE, &["Position"])));
        assert!(!agg.route_signal(props_changed(":1.5", "org.mpris.MediaPlayer2", &["Metadata"])));
        assert!(!agg.route_signal(props_changed(":1.77", PLAYER_INTERFACE, &["Metadata"])));
        assert!(!agg.route_signal(owner_changed("org.freedesktop.Notifications", "", ":1.3")));
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn player_owner_change_updates_registry_and_refreshes() {
        let (mut agg, mut rx) = MediaAggregator::new();
        assert!(agg.route_signal(owner_changed(MPV, "", ":1.8")));
        assert_eq!(rx.borrow_and_update().clone(), sessions(&[(MPV, ":1.8")]));
        assert!(agg.route_signal(owner_changed(MPV, ":1.8", "")));
        assert!(rx.borrow_and_update().is_empty());
    }

    #[test]
    fn owner_change_without_registry_effect_is_dropped() {
        let (mut agg, rx) = MediaAggregator::new();
        assert!(!agg.route_signal(owner_changed(MPV, ":1.44", "")));
        assert!(!agg.route_signal(owner_changed(MPV, "", "")));
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn pending_requests_coalesce() {
        let (mut agg, mut rx) = MediaAggregator::new();
        agg.route_signal(owner_changed(VLC, "", ":1.5"));
        agg.route_signal(owner_changed(MPV, "", ":1.8"));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 2);
        assert!(!rx.has_changed().unwrap());
    }

    // ─── Refresher ────────────────────────────────────────────────

    #[tokio::test]
    async fn empty_registry_yields_default() {
        let icons = MediaIcons::default();
        let refresher = StatusRefresher::new(FakeProbe::default(), icons.clone());
        assert_eq!(refresher.current_status(&[]).await, default_media_status(&icons));
    }

    #[tokio::test]
    async fn playing_beats_paused_regardless_of_id() {
        let probe = FakeProbe::default();
        probe.set(":1.9", PlaybackState::Paused, "paused one");
        probe.set(":1.2", PlaybackState::Playing, "playing one");
        let icons = MediaIcons::default();
        let refresher = StatusRefresher::new(probe, icons.clone());

        let status = refresher
            .current_status(&sessions(&[(VLC, ":1.9"), (MPV, ":1.2")]))
            .await;
        assert_eq!(status.label, icons.playing);
        assert_eq!(status.value, Value::from("playing one"));
    }

    #[tokio::test]
    async fn equal_weight_picks_larger_id() {
        let probe = FakeProbe::default();
        probe.set(":1.3", PlaybackState::Playing, "older");
        probe.set(":1.11", PlaybackState::Playing, "newer");
        let refresher = StatusRefresher::new(probe, MediaIcons::default());

        let status = refresher
            .current_status(&sessions(&[(VLC, ":1.11"), (MPV, ":1.3")]))
            .await;
        assert_eq!(status.value, Value::from("newer"));
    }

    #[tokio::test]
    async fn failing_session_is_excluded() {
        let probe = FakeProbe::default();
        probe.set(":1.2", PlaybackState::Paused, "fallback");
        probe.set(":1.9", PlaybackState::Playing, "unreachable");
        probe.break_owner(":1.9");
        let icons = MediaIcons::default();
        let refresher = StatusRefresher::new(probe, icons.clone());

        let status = refresher
            .current_status(&sessions(&[(VLC, ":1.9"), (MPV, ":1.2")]))
            .await;
        assert_eq!(status.label, icons.paused);
        assert_eq!(status.value, Value::from("fallback"));
    }

    #[tokio::test]
    async fn frozen_session_is_skipped() {
        let probe = FakeProbe::default();
        probe.set(":1.9", PlaybackState::Playing, "frozen");
        probe.set(":1.2", PlaybackState::Playing, "alive");
        probe.hang_owner(":1.9");
        let mut refresher = StatusRefresher::new(probe, MediaIcons::default());
        refresher.timeout = Duration::from_millis(20);

        let status = tokio::time::timeout(
            Duration::from_secs(3),
            refresher.current_status(&sessions(&[(VLC, ":1.9"), (MPV, ":1.2")])),
        )
        .await
        .expect("refresh must finish while one player hangs");
        assert_eq!(status.value, Value::from("alive"));
    }

    #[tokio::test]
    async fn refresh_is_edge_triggered() {
        let probe = FakeProbe::default();
        probe.set(":1.5", PlaybackState::Playing, "song");
        let mut refresher = StatusRefresher::new(probe, MediaIcons::default());
        let current = sessions(&[(VLC, ":1.5")]);

        let first = refresher.refresh_status(&current).await;
        assert_eq!(first.map(|s| s.value), Some(Value::from("song")));
        assert!(refresher.refresh_status(&current).await.is_none());

        refresher.probe().set(":1.5", PlaybackState::Paused, "song");
        assert!(refresher.refresh_status(&current).await.is_some());
    }

    #[tokio::test]
    async fn nothing_playing_at_startup_emits_nothing() {
        let mut refresher = StatusRefresher::new(FakeProbe::default(), MediaIcons::default());
        assert!(refresher.refresh_status(&[]).await.is_none());
    }

    #[tokio::test]
    async fn only_winner_properties_are_fetched() {
        let probe = FakeProbe::default();
        probe.set(":1.2", PlaybackState::Paused, "a");
        probe.set(":1.3", PlaybackState::Stopped, "b");
        let refresher = StatusRefresher::new(probe, MediaIcons::default());
        refresher
            .current_status(&sessions(&[(VLC, ":1.2"), (MPV, ":1.3")]))
            .await;
        // Two status probes plus one property fetch.
        assert_eq!(*refresher.probe().calls.lock().unwrap(), 3);
    }
}
