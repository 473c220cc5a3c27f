//! `deskstat widget`: print subscribed properties, then one line per change.

use std::path::Path;

use anyhow::Context;
use deskstat_core::Theme;
use deskstat_core::widget::{WidgetOptions, WidgetRenderer};

use crate::client::{BusClient, Subscription};
use crate::error::BusError;

/// Fill the renderer from the bus. Any tag that cannot be read fails the
/// whole widget.
pub async fn initialize(renderer: &mut WidgetRenderer, client: &mut BusClient) -> Result<(), BusError> {
    for tag in renderer.tags().to_vec() {
        let entry = client.get_property(&tag).await?;
        renderer.apply_change(&tag, entry.content());
    }
    Ok(())
}

/// Apply batches until the publisher goes away, calling `draw` at most once
/// per batch. Returns the number of redraws.
pub async fn follow<F>(
    renderer: &mut WidgetRenderer,
    subscription: &mut Subscription,
    mut draw: F,
) -> Result<usize, BusError>
where
    F: FnMut(&str),
{
    let mut redraws = 0;
    while let Some(batch) = subscription.next_batch().await? {
        if renderer.process_batch(batch, &mut draw) {
            redraws += 1;
        }
    }
    Ok(redraws)
}

pub async fn run_widget(
    socket_path: &Path,
    tags: &[String],
    opts: WidgetOptions,
    once: bool,
    theme: &Theme,
) -> anyhow::Result<()> {
    let (mut renderer, skipped) = WidgetRenderer::new(tags, opts, theme)?;
    for tag in &skipped {
        tracing::warn!(tag = %tag, "no color for tag, skipping");
    }

    let connect = || async {
        BusClient::connect(socket_path)
            .await
            .with_context(|| format!("cannot connect to status bus at {}", socket_path.display()))
    };

    // Subscribe before the initial read so no change falls in between.
    let mut subscription = if once {
        None
    } else {
        Some(connect().await?.subscribe().await.context("subscribe failed")?)
    };

    let mut client = connect().await?;
    initialize(&mut renderer, &mut client)
        .await
        .context("cannot read initial properties")?;
    drop(client);
    println!("{}", renderer.render());

    let Some(subscription) = subscription.as_mut() else {
        return Ok(());
    };
    let redraws = follow(&mut renderer, subscription, |text| println!("{text}")).await?;
    tracing::info!(redraws, "publisher went away");
    Ok(())
}
