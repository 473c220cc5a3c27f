//! Conversion of raw bus messages and variants into core types.
//!
//! Anything that does not have the expected shape becomes `None` and is
//! dropped by the caller.

use std::collections::HashMap;

use deskstat_core::media::{InboundSignal, MetaValue, Metadata};
use zbus::Message;
use zbus::zvariant::{OwnedValue, Value};

/// Body of `org.freedesktop.DBus.Properties.PropertiesChanged`.
type PropertiesChangedBody = (String, HashMap<String, OwnedValue>, Vec<String>);
/// Body of `org.freedesktop.DBus.NameOwnerChanged`.
type NameOwnerChangedBody = (String, String, String);

pub fn decode_signal(msg: &Message) -> Option<InboundSignal> {
    let header = msg.header();
    let member = header.member()?;
    match member.as_str() {
        "PropertiesChanged" => {
            let sender = header.sender()?.to_string();
            let body = msg.body();
            let (interface, changed, _invalidated): PropertiesChangedBody =
                body.deserialize().ok()?;
            Some(InboundSignal::PropertiesChanged {
                sender,
                interface,
                changed: changed.into_keys().collect(),
            })
        }
        "NameOwnerChanged" => {
            let body = msg.body();
            let (name, old_owner, new_owner): NameOwnerChangedBody = body.deserialize().ok()?;
            Some(InboundSignal::OwnerChanged {
                name,
                old_owner,
                new_owner,
            })
        }
        _ => None,
    }
}

/// Reduce a metadata entry to text, a string list, or nothing useful.
pub fn meta_value(value: &Value<'_>) -> MetaValue {
    match value {
        Value::Value(inner) => meta_value(inner),
        Value::Str(s) => MetaValue::Text(s.as_str().to_string()),
        Value::Array(_) => value
            .try_clone()
            .ok()
            .and_then(|v| Vec::<String>::try_from(v).ok())
            .map_or(MetaValue::Other, MetaValue::List),
        _ => MetaValue::Other,
    }
}

pub fn metadata(raw: &HashMap<String, OwnedValue>) -> Metadata {
    raw.iter()
        .map(|(key, value)| (key.clone(), meta_value(value)))
        .collect()
}
