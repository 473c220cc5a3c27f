//! Unix socket server for the status bus.
//!
//! Connections are long-lived: any number of requests, newline-delimited.
//! A `subscribe` request turns the connection into a notification stream.

use std::path::Path;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::error::BusError;
use crate::protocol::{
    self, GET_PROPERTY, GetPropertyParams, GetPropertyResult, INVALID_PARAMS, LIST_PROPERTIES,
    ListPropertiesResult, METHOD_NOT_FOUND, PARSE_ERROR, PropertyBatch, Request, SUBSCRIBE,
};
use crate::publisher::PropertyBus;

/// Create the socket directory (mode 0700), clear a stale socket and bind.
pub async fn bind(socket_path: &Path) -> Result<UnixListener, BusError> {
    let socket_dir = socket_path
        .parent()
        .ok_or_else(|| BusError::InvalidSocketPath(socket_path.display().to_string()))?;
    std::fs::create_dir_all(socket_dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_dir, std::fs::Permissions::from_mode(0o700))?;
    }

    if socket_path.exists() {
        if UnixStream::connect(socket_path).await.is_ok() {
            return Err(BusError::AlreadyRunning(socket_path.display().to_string()));
        }
        std::fs::remove_file(socket_path)?;
        tracing::info!(path = %socket_path.display(), "removed stale socket");
    }

    let listener = UnixListener::bind(socket_path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
    }

    tracing::info!(path = %socket_path.display(), "status bus listening");
    Ok(listener)
}

/// Accept connections until cancelled, then wait for open connections to
/// wind down.
pub async fn serve(listener: UnixListener, bus: PropertyBus, cancel: CancellationToken) {
    let connections = TaskTracker::new();
    loop {
        let accepted = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            accepted = listener.accept() => accepted,
        };
        match accepted {
            Ok((stream, _)) => {
                let bus = bus.clone();
                let cancel = cancel.clone();
                connections.spawn(async move {
                    if let Err(e) = handle_connection(stream, bus, cancel).await {
                        tracing::debug!(error = %e, "connection error");
                    }
                });
            }
            Err(e) => tracing::warn!(error = %e, "accept failed"),
        }
    }
    connections.close();
    connections.wait().await;
    tracing::debug!("status bus closed");
}

async fn handle_connection(
    stream: UnixStream,
    bus: PropertyBus,
    cancel: CancellationToken,
) -> Result<(), BusError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        let line = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }

        let request: Request = match serde_json::from_str(line.trim()) {
            Ok(request) => request,
            Err(e) => {
                let reply = protocol::error_response(
                    serde_json::Value::Null,
                    PARSE_ERROR,
                    &format!("parse error: {e}"),
                );
                write_message(&mut writer, &reply).await?;
                continue;
            }
        };
        let id = request.id.clone();

        let reply = match request.method.as_str() {
            GET_PROPERTY => get_property(&bus, id, request.params).await?,
            LIST_PROPERTIES => {
                let result = ListPropertiesResult {
                    properties: bus.list().await,
                };
                protocol::response(id, serde_json::to_value(result)?)
            }
            SUBSCRIBE => {
                // Subscribe before acknowledging so no batch falls in between.
                let changes = bus.subscribe();
                let ack = protocol::response(id, serde_json::json!({"subscribed": true}));
                write_message(&mut writer, &ack).await?;
                return stream_changes(lines, writer, changes, &bus, &cancel).await;
            }
            other => protocol::error_response(
                id,
                METHOD_NOT_FOUND,
                &format!("method not found: {other}"),
            ),
        };
        write_message(&mut writer, &reply).await?;
    }
}

async fn get_property(
    bus: &PropertyBus,
    id: serde_json::Value,
    params: serde_json::Value,
) -> Result<serde_json::Value, BusError> {
    let params: GetPropertyParams = match serde_json::from_value(params) {
        Ok(params) => params,
        Err(e) => {
            return Ok(protocol::error_response(
                id,
                INVALID_PARAMS,
                &format!("invalid params: {e}"),
            ));
        }
    };
    let reply = match bus.get(&params.tag).await {
        Some(entry) => {
            let result = GetPropertyResult {
                tag: params.tag,
                entry,
            };
            protocol::response(id, serde_json::to_value(result)?)
        }
        None => protocol::error_response(
            id,
            INVALID_PARAMS,
            &format!("unknown property: {}", params.tag),
        ),
    };
    Ok(reply)
}

async fn stream_changes(
    mut lines: Lines<BufReader<OwnedReadHalf>>,
    mut writer: OwnedWriteHalf,
    mut changes: tokio::sync::broadcast::Receiver<PropertyBatch>,
    bus: &PropertyBus,
    cancel: &CancellationToken,
) -> Result<(), BusError> {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            line = lines.next_line() => {
                // Subscribers send nothing more; EOF means they left.
                if line?.is_none() {
                    return Ok(());
                }
            }
            batch = changes.recv() => match batch {
                Ok(batch) => write_message(&mut writer, &protocol::notification(&batch)).await?,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "subscriber lagged, resending all properties");
                    let snapshot = bus.snapshot().await;
                    write_message(&mut writer, &protocol::notification(&snapshot)).await?;
                }
                Err(RecvError::Closed) => return Ok(()),
            },
        }
    }
}

async fn write_message(writer: &mut OwnedWriteHalf, message: &serde_json::Value) -> Result<(), BusError> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bind_refuses_a_live_socket_and_clears_a_stale_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bus").join("deskstat.sock");

        let listener = bind(&path).await.unwrap();
        assert!(matches!(bind(&path).await, Err(BusError::AlreadyRunning(_))));

        drop(listener);
        // The file outlives the listener; a second bind treats it as stale.
        assert!(path.exists());
        assert!(bind(&path).await.is_ok());
    }
}
