//! Media status producers: a router task that owns the session registry and
//! a refresher task that probes players and emits the displayed status.

use deskstat_core::StatusValue;
use deskstat_core::media::{InboundSignal, default_media_status};
use deskstat_core::theme::MediaIcons;
use deskstat_mpris::aggregator::SessionSnapshot;
use deskstat_mpris::client::SignalStream;
use deskstat_mpris::{MediaAggregator, MprisClient, MprisError, SessionProbe, StatusRefresher};
use futures_util::{Stream, StreamExt};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::orchestrator::{Emitter, FanIn};

/// Everything the media producers need from the session bus, acquired at
/// startup. Any failure here is fatal for the publisher.
pub struct MediaConnection {
    pub client: MprisClient,
    pub signals: SignalStream,
    pub players: Vec<(String, String)>,
}

pub async fn connect() -> Result<MediaConnection, MprisError> {
    let client = MprisClient::connect().await?;
    // Subscribe first so no owner change between listing and subscribing is
    // missed.
    let signals = client.signals().await?;
    let players = client.running_players().await?;
    tracing::info!(players = players.len(), "media players discovered");
    Ok(MediaConnection {
        client,
        signals,
        players,
    })
}

/// The value registered on the bus before the producers start.
pub fn initial_status(icons: &MediaIcons) -> StatusValue {
    default_media_status(icons)
}

/// Start the router and refresher tasks.
pub fn spawn<P, S>(
    fanin: &FanIn,
    probe: P,
    signals: S,
    players: Vec<(String, String)>,
    icons: MediaIcons,
) where
    P: SessionProbe + 'static,
    S: Stream<Item = InboundSignal> + Send + 'static,
{
    let (mut aggregator, refresh_rx) = MediaAggregator::new();
    for (bus_name, owner) in &players {
        aggregator.handle_session_announced(bus_name, owner);
    }
    aggregator.request_refresh();

    fanin.spawn("media-router", move |_emitter, cancel| {
        route_signals(aggregator, signals, cancel)
    });
    let refresher = StatusRefresher::new(probe, icons);
    fanin.spawn("media-refresher", move |emitter, cancel| {
        refresh_on_change(refresher, refresh_rx, emitter, cancel)
    });
}

async fn route_signals<S>(mut aggregator: MediaAggregator, signals: S, cancel: CancellationToken)
where
    S: Stream<Item = InboundSignal> + Send,
{
    let mut signals = Box::pin(signals);
    loop {
        let signal = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            signal = signals.next() => signal,
        };
        let Some(signal) = signal else {
            tracing::warn!("media signal stream ended");
            break;
        };
        aggregator.route_signal(signal);
    }
}

async fn refresh_on_change<P: SessionProbe>(
    mut refresher: StatusRefresher<P>,
    mut refresh_rx: watch::Receiver<SessionSnapshot>,
    emitter: Emitter,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            changed = refresh_rx.changed() => {
                // The router is gone; nothing will change any more.
                if changed.is_err() {
                    return;
                }
            }
        }
        let sessions = refresh_rx.borrow_and_update().clone();
        let status = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            status = refresher.refresh_status(&sessions) => status,
        };
        if let Some(status) = status {
            if !emitter.emit(status).await {
                return;
            }
        }
    }
}
