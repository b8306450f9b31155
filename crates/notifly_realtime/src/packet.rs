// --- File: crates/notifly_realtime/src/packet.rs ---
//! Engine.IO v4 and Socket.IO v5 packet codec.
//!
//! Engine.IO frames carry a one-digit type prefix followed by data. Over
//! HTTP long-polling several frames share one body, separated by the ASCII
//! record separator. Socket.IO packets ride inside Engine.IO `message`
//! frames.

use crate::error::{RealtimeError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Separator between frames in a polling payload.
pub const RECORD_SEPARATOR: char = '\u{1e}';

/// Body of the Engine.IO `open` packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenHandshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

impl OpenHandshake {
    pub fn offers_websocket(&self) -> bool {
        self.upgrades.iter().any(|u| u == "websocket")
    }

    /// Longest silence tolerated before the connection counts as dead.
    pub fn heartbeat_deadline(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.ping_interval + self.ping_timeout)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(OpenHandshake),
    Close,
    Ping(String),
    Pong(String),
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn encode(&self) -> String {
        match self {
            EnginePacket::Open(handshake) => {
                // OpenHandshake only holds strings and integers
                format!("0{}", serde_json::to_string(handshake).unwrap_or_default())
            }
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping(data) => format!("2{data}"),
            EnginePacket::Pong(data) => format!("3{data}"),
            EnginePacket::Message(data) => format!("4{data}"),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        }
    }

    pub fn decode(raw: &str) -> Result<Self> {
        let mut chars = raw.chars();
        let kind = chars
            .next()
            .ok_or_else(|| RealtimeError::Protocol("empty engine packet".to_string()))?;
        let data = chars.as_str();

        match kind {
            '0' => Ok(EnginePacket::Open(serde_json::from_str(data)?)),
            '1' => Ok(EnginePacket::Close),
            '2' => Ok(EnginePacket::Ping(data.to_string())),
            '3' => Ok(EnginePacket::Pong(data.to_string())),
            '4' => Ok(EnginePacket::Message(data.to_string())),
            '5' => Ok(EnginePacket::Upgrade),
            '6' => Ok(EnginePacket::Noop),
            other => Err(RealtimeError::Protocol(format!(
                "unknown engine packet type '{other}'"
            ))),
        }
    }
}

/// Splits a polling body into frames.
pub fn decode_payload(body: &str) -> Result<Vec<EnginePacket>> {
    body.split(RECORD_SEPARATOR)
        .filter(|frame| !frame.is_empty())
        .map(EnginePacket::decode)
        .collect()
}

pub fn encode_payload(packets: &[EnginePacket]) -> String {
    let mut body = String::new();
    for (i, packet) in packets.iter().enumerate() {
        if i > 0 {
            body.push(RECORD_SEPARATOR);
        }
        body.push_str(&packet.encode());
    }
    body
}

/// Socket.IO packet on the default namespace.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect(Option<Value>),
    Disconnect,
    Event { name: String, args: Vec<Value> },
    ConnectError(Value),
    /// Acks and binary packets, which this client never requests.
    Unsupported(u8),
}

impl SocketPacket {
    pub fn encode(&self) -> String {
        match self {
            SocketPacket::Connect(None) => "0".to_string(),
            SocketPacket::Connect(Some(data)) => format!("0{data}"),
            SocketPacket::Disconnect => "1".to_string(),
            SocketPacket::Event { name, args } => {
                let mut items = Vec::with_capacity(args.len() + 1);
                items.push(Value::String(name.clone()));
                items.extend(args.iter().cloned());
                format!("2{}", Value::Array(items))
            }
            SocketPacket::ConnectError(data) => format!("4{data}"),
            SocketPacket::Unsupported(kind) => kind.to_string(),
        }
    }

    pub fn decode(raw: &str) -> Result<Self> {
        let kind = raw
            .as_bytes()
            .first()
            .copied()
            .filter(u8::is_ascii_digit)
            .ok_or_else(|| RealtimeError::Protocol(format!("bad socket packet: {raw:?}")))?
            - b'0';
        let rest = skip_namespace(&raw[1..]);

        match kind {
            0 => {
                if rest.is_empty() {
                    Ok(SocketPacket::Connect(None))
                } else {
                    Ok(SocketPacket::Connect(Some(serde_json::from_str(rest)?)))
                }
            }
            1 => Ok(SocketPacket::Disconnect),
            2 => {
                let body = rest.trim_start_matches(|c: char| c.is_ascii_digit());
                let mut items: Vec<Value> = serde_json::from_str(body)?;
                if items.is_empty() {
                    return Err(RealtimeError::Protocol("event without a name".to_string()));
                }
                let name = match items.remove(0) {
                    Value::String(name) => name,
                    other => {
                        return Err(RealtimeError::Protocol(format!(
                            "event name is not a string: {other}"
                        )))
                    }
                };
                Ok(SocketPacket::Event { name, args: items })
            }
            4 => Ok(SocketPacket::ConnectError(if rest.is_empty() {
                Value::Null
            } else {
                serde_json::from_str(rest)?
            })),
            other => Ok(SocketPacket::Unsupported(other)),
        }
    }

    pub fn event(name: &str, args: Vec<Value>) -> Self {
        SocketPacket::Event {
            name: name.to_string(),
            args,
        }
    }
}

// A namespace prefix looks like "/admin," and only appears for
// non-default namespaces.
fn skip_namespace(rest: &str) -> &str {
    if rest.starts_with('/') {
        match rest.find(',') {
            Some(idx) => &rest[idx + 1..],
            None => "",
        }
    } else {
        rest
    }
}

/// Human-readable reason carried by a `connect_error` packet.
pub fn connect_error_message(data: &Value) -> String {
    data.get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| data.to_string())
}
