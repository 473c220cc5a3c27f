//! Consumer side of the status bus.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};

use crate::error::BusError;
use crate::protocol::{
    self, GET_PROPERTY, GetPropertyResult, LIST_PROPERTIES, ListPropertiesResult,
    PROPERTIES_CHANGED, PropertiesChangedParams, PropertyBatch, PropertyEntry, SUBSCRIBE,
};

/// Print every property of a running publisher as JSON.
pub async fn cmd_props(socket_path: &Path) -> anyhow::Result<()> {
    let mut client = BusClient::connect(socket_path)
        .await
        .with_context(|| format!("cannot connect to status bus at {}", socket_path.display()))?;
    let properties = client.list_properties().await?;
    println!("{}", serde_json::to_string_pretty(&properties)?);
    Ok(())
}

pub struct BusClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
    next_id: u64,
}

impl BusClient {
    pub async fn connect(socket_path: &Path) -> Result<Self, BusError> {
        let stream = UnixStream::connect(socket_path).await?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            lines: BufReader::new(reader).lines(),
            writer,
            next_id: 1,
        })
    }

    /// One request, one reply. Notifications are not expected on a
    /// connection that has not subscribed, and are skipped.
    async fn call(
        &mut self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, BusError> {
        let id = self.next_id;
        self.next_id += 1;

        let mut line = serde_json::to_string(&protocol::request(id, method, params))?;
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;

        loop {
            let line = self.lines.next_line().await?.ok_or(BusError::Closed)?;
            let mut reply: serde_json::Value = serde_json::from_str(line.trim())?;
            if reply["id"] != id {
                continue;
            }
            if let Some(error) = reply.get("error") {
                return Err(BusError::Rpc {
                    code: error["code"].as_i64().unwrap_or(0),
                    message: error["message"].as_str().unwrap_or("unknown").to_string(),
                });
            }
            return Ok(reply
                .get_mut("result")
                .map(serde_json::Value::take)
                .unwrap_or_default());
        }
    }

    pub async fn get_property(&mut self, tag: &str) -> Result<PropertyEntry, BusError> {
        let result = self
            .call(GET_PROPERTY, serde_json::json!({ "tag": tag }))
            .await?;
        let result: GetPropertyResult = serde_json::from_value(result)?;
        Ok(result.entry)
    }

    pub async fn list_properties(&mut self) -> Result<BTreeMap<String, PropertyEntry>, BusError> {
        let result = self.call(LIST_PROPERTIES, serde_json::json!({})).await?;
        let result: ListPropertiesResult = serde_json::from_value(result)?;
        Ok(result.properties)
    }

    /// Switch this connection to change notifications.
    pub async fn subscribe(mut self) -> Result<Subscription, BusError> {
        self.call(SUBSCRIBE, serde_json::json!({})).await?;
        Ok(Subscription {
            lines: self.lines,
            _writer: self.writer,
        })
    }
}

/// Stream of `properties_changed` batches.
pub struct Subscription {
    lines: Lines<BufReader<OwnedReadHalf>>,
    // Dropping the write half would tell the server we left.
    _writer: OwnedWriteHalf,
}

impl Subscription {
    /// Next batch, or `None` once the publisher has gone away.
    pub async fn next_batch(&mut self) -> Result<Option<PropertyBatch>, BusError> {
        loop {
            let Some(line) = self.lines.next_line().await? else {
                return Ok(None);
            };
            let mut message: serde_json::Value = serde_json::from_str(line.trim())?;
            if message["method"] != PROPERTIES_CHANGED {
                continue;
            }
            let params = message
                .get_mut("params")
                .map(serde_json::Value::take)
                .unwrap_or_default();
            let params: PropertiesChangedParams = serde_json::from_value(params)?;
            return Ok(Some(params.changed));
        }
    }
}
