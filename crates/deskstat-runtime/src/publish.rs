//! `deskstat publish`: the publisher process.
//!
//! Startup order: bind the socket, acquire the collaborators (session bus,
//! mixer), register initial values, then start the server, the publisher
//! task and the producers. Shutdown runs the other way round.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use deskstat_core::Theme;
use deskstat_core::volume::initial_volume_status;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::audio::{AudioMonitor, PactlMixer};
use crate::cli::PublishOpts;
use crate::media;
use crate::orchestrator::FanIn;
use crate::publisher::{PropertyBus, drain_outbound};
use crate::resources::{ProcResources, ResourceProvider, ResourceSet, run_ticker};
use crate::server;

#[derive(Debug, Clone)]
pub struct PublishConfig {
    pub socket_path: PathBuf,
    pub resources: ResourceSet,
    pub audio: bool,
    pub media: bool,
    pub tick: Duration,
}

impl PublishConfig {
    pub fn from_opts(socket_path: PathBuf, opts: &PublishOpts) -> Self {
        Self {
            socket_path,
            resources: opts.resources(),
            audio: !opts.no_audio,
            media: !opts.no_media,
            tick: Duration::from_millis(opts.tick_ms.max(1)),
        }
    }
}

pub async fn run_publisher(config: PublishConfig, theme: Theme) -> anyhow::Result<()> {
    let listener = server::bind(&config.socket_path)
        .await
        .context("cannot open status bus")?;

    let result = publish(listener, &config, theme).await;

    if let Err(e) = std::fs::remove_file(&config.socket_path) {
        tracing::debug!(error = %e, "socket already removed");
    }
    tracing::info!("publisher stopped");
    result
}

async fn publish(
    listener: tokio::net::UnixListener,
    config: &PublishConfig,
    theme: Theme,
) -> anyhow::Result<()> {
    let media_conn = if config.media {
        Some(
            media::connect()
                .await
                .context("cannot connect to the session bus")?,
        )
    } else {
        None
    };
    let mixer = PactlMixer::new();
    let audio_events = if config.audio {
        Some(mixer.events().context("cannot monitor the audio mixer")?)
    } else {
        None
    };
    let resources = ProcResources::new(config.resources, config.tick);

    let bus = PropertyBus::new();
    for status in resources.initial_statuses() {
        bus.register(&status).await;
    }
    if audio_events.is_some() {
        bus.register(&initial_volume_status(&theme.volume)).await;
    }
    if media_conn.is_some() {
        bus.register(&media::initial_status(&theme.media)).await;
    }

    let server_cancel = CancellationToken::new();
    let server = tokio::spawn(server::serve(listener, bus.clone(), server_cancel.clone()));

    let (fanin, outbound) = FanIn::new();
    let publisher = tokio::spawn(drain_outbound(bus, outbound));

    if !resources.is_empty() {
        let tick = config.tick;
        fanin.spawn("resources", move |emitter, cancel| {
            run_ticker(resources, tick, emitter, cancel)
        });
    }

    if let Some(events) = audio_events {
        let (wake_tx, wake_rx) = mpsc::channel(1);
        fanin.spawn("audio-events", move |_emitter, cancel| events.forward(wake_tx, cancel));
        let monitor = AudioMonitor::new(Arc::new(mixer), theme.volume.clone());
        fanin.spawn("audio", move |emitter, cancel| monitor.run(wake_rx, emitter, cancel));
    }

    let media_client = media_conn.map(|conn| {
        media::spawn(
            &fanin,
            conn.client.clone(),
            conn.signals,
            conn.players,
            theme.media.clone(),
        );
        conn.client
    });

    let outcome = wait_for_shutdown().await;

    fanin.shutdown().await;
    if let Err(e) = publisher.await {
        tracing::warn!(error = %e, "publisher task failed");
    }
    server_cancel.cancel();
    if let Err(e) = server.await {
        tracing::warn!(error = %e, "server task failed");
    }
    drop(media_client);
    outcome
}

/// Block until SIGINT or SIGTERM. SIGHUP is logged and ignored.
async fn wait_for_shutdown() -> anyhow::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt()).context("cannot install SIGINT handler")?;
    let mut sigterm = signal(SignalKind::terminate()).context("cannot install SIGTERM handler")?;
    let mut sighup = signal(SignalKind::hangup()).context("cannot install SIGHUP handler")?;

    loop {
        tokio::select! {
            _ = sigint.recv() => {
                tracing::info!("received SIGINT, shutting down");
                break;
            }
            _ = sigterm.recv() => {
                tracing::info!("received SIGTERM, shutting down");
                break;
            }
            _ = sighup.recv() => tracing::info!("received SIGHUP, ignoring"),
        }
    }
    Ok(())
}
