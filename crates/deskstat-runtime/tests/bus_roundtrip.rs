//! Publisher and widget talking over a real Unix socket.

use std::path::PathBuf;
use std::time::Duration;

use deskstat_core::widget::{WidgetOptions, WidgetRenderer};
use deskstat_core::{Content, StatusValue, Theme};
use deskstat_runtime::client::BusClient;
use deskstat_runtime::error::BusError;
use deskstat_runtime::orchestrator::FanIn;
use deskstat_runtime::protocol::INVALID_PARAMS;
use deskstat_runtime::publisher::{PropertyBus, drain_outbound};
use deskstat_runtime::{server, widget};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct Harness {
    _dir: tempfile::TempDir,
    socket: PathBuf,
    bus: PropertyBus,
    cancel: CancellationToken,
    server: JoinHandle<()>,
}

impl Harness {
    async fn start(initial: &[StatusValue]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("deskstat.sock");
        let listener = server::bind(&socket).await.unwrap();
        let bus = PropertyBus::new();
        for status in initial {
            bus.register(status).await;
        }
        let cancel = CancellationToken::new();
        let server = tokio::spawn(server::serve(listener, bus.clone(), cancel.clone()));
        Self {
            _dir: dir,
            socket,
            bus,
            cancel,
            server,
        }
    }

    async fn stop(self) {
        self.cancel.cancel();
        self.server.await.unwrap();
    }
}

fn volume(label: &str, percent: i64) -> StatusValue {
    deskstat_core::volume::initial_volume_status(&Default::default())
        .with_label(label)
        .with_value(percent)
}

fn media(label: &str, text: &str) -> StatusValue {
    StatusValue::new("Mpris").with_label(label).with_value(text)
}

fn plain_renderer(tags: &[&str]) -> WidgetRenderer {
    let tags: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
    let opts = WidgetOptions {
        padding: 0,
        ..WidgetOptions::default()
    };
    WidgetRenderer::new(&tags, opts, &Theme::default()).unwrap().0
}

#[tokio::test]
async fn get_and_list_properties() {
    let h = Harness::start(&[volume("V", 40), media("S", "")]).await;
    let mut client = BusClient::connect(&h.socket).await.unwrap();

    let entry = client.get_property("Volume").await.unwrap();
    assert_eq!(entry.content(), Content::new("V", " 40%"));

    let all = client.list_properties().await.unwrap();
    assert_eq!(all.keys().collect::<Vec<_>>(), vec!["Mpris", "Volume"]);

    match client.get_property("Nope").await {
        Err(BusError::Rpc { code, .. }) => assert_eq!(code, INVALID_PARAMS),
        other => panic!("expected rpc error, got {other:?}"),
    }

    // The connection is still usable after an error.
    assert!(client.get_property("Mpris").await.is_ok());
    h.stop().await;
}

#[tokio::test]
async fn producers_reach_subscribed_widget() {
    let h = Harness::start(&[volume("V", 40), media("S", "")]).await;

    let mut subscription = BusClient::connect(&h.socket)
        .await
        .unwrap()
        .subscribe()
        .await
        .unwrap();

    let mut renderer = plain_renderer(&["Mpris", "Volume"]);
    let mut client = BusClient::connect(&h.socket).await.unwrap();
    widget::initialize(&mut renderer, &mut client).await.unwrap();
    assert_eq!(renderer.render(), "S V 40%");

    let (fanin, outbound) = FanIn::new();
    let publisher = tokio::spawn(drain_outbound(h.bus.clone(), outbound));
    fanin.spawn("media", |emitter, _cancel| async move {
        emitter.emit(media("P", "song")).await;
    });

    let batch = tokio::time::timeout(Duration::from_secs(2), subscription.next_batch())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let mut draws = Vec::new();
    assert!(renderer.process_batch(batch, |text| draws.push(text.to_string())));
    assert_eq!(draws, vec!["Psong V 40%".to_string()]);

    fanin.shutdown().await;
    publisher.await.unwrap();
    assert_eq!(h.bus.get("Mpris").await.unwrap().text, "song");
    h.stop().await;
}

#[tokio::test]
async fn unchanged_batch_does_not_redraw() {
    let h = Harness::start(&[volume("V", 40)]).await;
    let mut subscription = BusClient::connect(&h.socket)
        .await
        .unwrap()
        .subscribe()
        .await
        .unwrap();
    let mut renderer = plain_renderer(&["Volume"]);
    let mut client = BusClient::connect(&h.socket).await.unwrap();
    widget::initialize(&mut renderer, &mut client).await.unwrap();

    h.bus.publish(vec![volume("V", 40)]).await;
    h.bus.publish(vec![volume("M", 40)]).await;

    let first = subscription.next_batch().await.unwrap().unwrap();
    assert!(!renderer.process_batch(first, |_| panic!("no redraw expected")));
    let second = subscription.next_batch().await.unwrap().unwrap();
    let mut draws = 0;
    assert!(renderer.process_batch(second, |_| draws += 1));
    assert_eq!(draws, 1);
    h.stop().await;
}

#[tokio::test]
async fn initialize_fails_on_missing_tag() {
    let h = Harness::start(&[volume("V", 40)]).await;
    let mut renderer = plain_renderer(&["Volume", "Mpris"]);
    let mut client = BusClient::connect(&h.socket).await.unwrap();
    assert!(widget::initialize(&mut renderer, &mut client).await.is_err());
    h.stop().await;
}

#[tokio::test]
async fn subscription_ends_when_server_stops() {
    let h = Harness::start(&[volume("V", 40)]).await;
    let mut subscription = BusClient::connect(&h.socket)
        .await
        .unwrap()
        .subscribe()
        .await
        .unwrap();
    h.stop().await;
    let next = tokio::time::timeout(Duration::from_secs(2), subscription.next_batch())
        .await
        .unwrap()
        .unwrap();
    assert!(next.is_none());
}
