// --- File: crates/notifly_realtime/src/transport.rs ---
//! Polling and websocket transports, and the handshake that yields a live
//! [`Session`].

use crate::error::{RealtimeError, Result};
use crate::packet::{
    connect_error_message, decode_payload, encode_payload, EnginePacket, OpenHandshake,
    SocketPacket,
};
use futures_util::{SinkExt, StreamExt};
use notifly_config::{RealtimeConfig, TransportKind};
use reqwest::{Client, Url};
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

const UPGRADE_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct HandshakeQuery<'a> {
    #[serde(rename = "EIO")]
    eio: &'static str,
    transport: &'static str,
    token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sid: Option<&'a str>,
    // cache buster, polling only
    #[serde(skip_serializing_if = "Option::is_none")]
    t: Option<String>,
}

/// Where the channel lives and which token authenticates it.
#[derive(Debug, Clone)]
pub struct Endpoint {
    base: Url,
    token: String,
}

impl Endpoint {
    pub fn new(base_url: &str, path: &str, token: &str) -> Result<Self> {
        let base = Url::parse(base_url)
            .and_then(|url| url.join(path))
            .map_err(|e| RealtimeError::Endpoint(format!("{base_url}{path}: {e}")))?;
        match base.scheme() {
            "http" | "https" => Ok(Self {
                base,
                token: token.to_string(),
            }),
            other => Err(RealtimeError::Endpoint(format!(
                "unsupported scheme '{other}'"
            ))),
        }
    }

    pub fn polling_url(&self, sid: Option<&str>) -> Url {
        let t = chrono::Utc::now().timestamp_millis().to_string();
        self.with_query("polling", sid, Some(t))
    }

    pub fn websocket_url(&self, sid: Option<&str>) -> Url {
        let mut url = self.with_query("websocket", sid, None);
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        // both are special schemes, so the switch cannot be refused
        let _ = url.set_scheme(scheme);
        url
    }

    fn with_query(&self, transport: &'static str, sid: Option<&str>, t: Option<String>) -> Url {
        let query = HandshakeQuery {
            eio: "4",
            transport,
            token: &self.token,
            sid,
            t,
        };
        let mut url = self.base.clone();
        url.set_query(serde_urlencoded::to_string(&query).ok().as_deref());
        url
    }
}

/// HTTP long-polling transport bound to one Engine.IO session.
pub struct PollingTransport {
    http: Client,
    endpoint: Endpoint,
    sid: String,
    poll_timeout: Duration,
}

impl PollingTransport {
    /// Opens an Engine.IO session over polling.
    pub async fn open(http: Client, endpoint: Endpoint) -> Result<(Self, OpenHandshake, Vec<EnginePacket>)> {
        let response = http
            .get(endpoint.polling_url(None))
            .send()
            .await?
            .error_for_status()?;
        let mut packets = decode_payload(&response.text().await?)?;
        if packets.is_empty() {
            return Err(RealtimeError::Handshake("empty open payload".to_string()));
        }
        let EnginePacket::Open(handshake) = packets.remove(0) else {
            return Err(RealtimeError::Handshake("expected open packet".to_string()));
        };
        debug!(sid = %handshake.sid, upgrades = ?handshake.upgrades, "polling session opened");

        let transport = Self {
            http,
            endpoint,
            sid: handshake.sid.clone(),
            poll_timeout: handshake.heartbeat_deadline(),
        };
        Ok((transport, handshake, packets))
    }

    pub async fn send(&self, packets: &[EnginePacket]) -> Result<()> {
        self.http
            .post(self.endpoint.polling_url(Some(&self.sid)))
            .header(reqwest::header::CONTENT_TYPE, "text/plain;charset=UTF-8")
            .body(encode_payload(packets))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// One long-poll round trip.
    pub async fn poll(&self) -> Result<Vec<EnginePacket>> {
        let response = self
            .http
            .get(self.endpoint.polling_url(Some(&self.sid)))
            .timeout(self.poll_timeout)
            .send()
            .await?
            .error_for_status()?;
        decode_payload(&response.text().await?)
    }

    pub fn sid(&self) -> &str {
        &self.sid
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct WebSocketTransport {
    stream: WsStream,
}

impl WebSocketTransport {
    pub async fn connect(url: &Url) -> Result<Self> {
        let (stream, _response) = tokio_tungstenite::connect_async(url.as_str()).await?;
        Ok(Self { stream })
    }

    pub async fn send(&mut self, packet: &EnginePacket) -> Result<()> {
        self.stream.send(Message::Text(packet.encode().into())).await?;
        Ok(())
    }

    /// Next Engine.IO packet. Websocket control frames are skipped; a close
    /// frame or end of stream is [`RealtimeError::Closed`].
    pub async fn recv(&mut self) -> Result<EnginePacket> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return EnginePacket::decode(text.as_str()),
                Some(Ok(Message::Close(_))) | None => return Err(RealtimeError::Closed),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    pub async fn close(&mut self) {
        let _ = self.stream.close(None).await;
    }
}

pub enum Transport {
    Polling(PollingTransport),
    WebSocket(Box<WebSocketTransport>),
}

impl Transport {
    pub fn kind(&self) -> TransportKind {
        match self {
            Transport::Polling(_) => TransportKind::Polling,
            Transport::WebSocket(_) => TransportKind::Websocket,
        }
    }

    pub async fn send(&mut self, packet: EnginePacket) -> Result<()> {
        match self {
            Transport::Polling(polling) => polling.send(&[packet]).await,
            Transport::WebSocket(ws) => ws.send(&packet).await,
        }
    }

    pub async fn recv(&mut self) -> Result<Vec<EnginePacket>> {
        match self {
            Transport::Polling(polling) => polling.poll().await,
            Transport::WebSocket(ws) => ws.recv().await.map(|packet| vec![packet]),
        }
    }

    /// Best-effort goodbye: namespace disconnect then transport close.
    pub async fn shutdown(&mut self) {
        let goodbye = EnginePacket::Message(SocketPacket::Disconnect.encode());
        match self {
            Transport::Polling(polling) => {
                let _ = polling.send(&[goodbye, EnginePacket::Close]).await;
            }
            Transport::WebSocket(ws) => {
                let _ = ws.send(&goodbye).await;
                let _ = ws.send(&EnginePacket::Close).await;
                ws.close().await;
            }
        }
    }
}

/// A connected Socket.IO session.
pub struct Session {
    pub transport: Transport,
    pub handshake: OpenHandshake,
    /// Packets that arrived during the handshake and still need handling.
    pub pending: VecDeque<EnginePacket>,
}

/// Runs the Engine.IO handshake, joins the default namespace and, when
/// polling, tries the websocket upgrade.
pub async fn establish(http: &Client, endpoint: &Endpoint, config: &RealtimeConfig) -> Result<Session> {
    let first = config
        .transports
        .first()
        .copied()
        .unwrap_or(TransportKind::Polling);

    let (mut transport, handshake, mut pending) = match first {
        TransportKind::Polling => {
            let (polling, handshake, rest) =
                PollingTransport::open(http.clone(), endpoint.clone()).await?;
            (Transport::Polling(polling), handshake, VecDeque::from(rest))
        }
        TransportKind::Websocket => {
            let mut ws = WebSocketTransport::connect(&endpoint.websocket_url(None)).await?;
            let EnginePacket::Open(handshake) = ws.recv().await? else {
                return Err(RealtimeError::Handshake("expected open packet".to_string()));
            };
            (Transport::WebSocket(Box::new(ws)), handshake, VecDeque::new())
        }
    };

    transport
        .send(EnginePacket::Message(SocketPacket::Connect(None).encode()))
        .await?;
    let mut after_connect = VecDeque::new();

    'joined: loop {
        if pending.is_empty() {
            pending.extend(transport.recv().await?);
        }
        while let Some(packet) = pending.pop_front() {
            match packet {
                EnginePacket::Message(data) => match SocketPacket::decode(&data)? {
                    SocketPacket::Connect(_) => break 'joined,
                    SocketPacket::ConnectError(reason) => {
                        return Err(RealtimeError::ServerRejected(connect_error_message(&reason)))
                    }
                    _ => after_connect.push_back(EnginePacket::Message(data)),
                },
                EnginePacket::Ping(data) => transport.send(EnginePacket::Pong(data)).await?,
                EnginePacket::Close => {
                    return Err(RealtimeError::Handshake(
                        "transport closed before namespace connect".to_string(),
                    ))
                }
                _ => {}
            }
        }
    }
    after_connect.extend(pending);

    if let Transport::Polling(ref polling) = transport {
        let wants_websocket = config.transports.contains(&TransportKind::Websocket);
        if wants_websocket && handshake.offers_websocket() {
            match upgrade(endpoint, polling.sid()).await {
                Ok(ws) => {
                    info!(sid = %handshake.sid, "upgraded to websocket");
                    transport = Transport::WebSocket(Box::new(ws));
                }
                Err(e) => warn!(error = %e, "websocket upgrade failed, staying on polling"),
            }
        }
    }

    Ok(Session {
        transport,
        handshake,
        pending: after_connect,
    })
}

async fn upgrade(endpoint: &Endpoint, sid: &str) -> Result<WebSocketTransport> {
    let mut ws = WebSocketTransport::connect(&endpoint.websocket_url(Some(sid))).await?;
    ws.send(&EnginePacket::Ping("probe".to_string())).await?;
    match tokio::time::timeout(UPGRADE_PROBE_TIMEOUT, ws.recv()).await {
        Ok(Ok(EnginePacket::Pong(data))) if data == "probe" => {}
        Ok(Ok(other)) => {
            return Err(RealtimeError::Handshake(format!(
                "unexpected probe answer: {}",
                other.encode()
            )))
        }
        Ok(Err(e)) => return Err(e),
        Err(_) => return Err(RealtimeError::Handshake("probe timed out".to_string())),
    }
    ws.send(&EnginePacket::Upgrade).await?;
    Ok(ws)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const OPEN: &str = r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;

    #[test]
    fn test_endpoint_urls() {
        let endpoint = Endpoint::new("https://social.example.com", "/socket.io/", "tok en").unwrap();

        let polling = endpoint.polling_url(None);
        assert_eq!(polling.scheme(), "https");
        assert_eq!(polling.path(), "/socket.io/");
        let query = polling.query().unwrap();
        assert!(query.starts_with("EIO=4&transport=polling&token=tok+en&t="));

        let ws = endpoint.websocket_url(Some("abc"));
        assert_eq!(ws.scheme(), "wss");
        assert_eq!(ws.query(), Some("EIO=4&transport=websocket&token=tok+en&sid=abc"));
    }

    #[test]
    fn test_endpoint_rejects_non_http_base() {
        assert!(Endpoint::new("ftp://example.com", "/socket.io/", "t").is_err());
        assert!(Endpoint::new("not a url", "/socket.io/", "t").is_err());
    }

    #[tokio::test]
    async fn test_polling_handshake_joins_namespace() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/socket.io/"))
            .and(query_param("transport", "polling"))
            .and(query_param("token", "secret"))
            .and(query_param_is_missing("sid"))
            .respond_with(ResponseTemplate::new(200).set_body_string(OPEN))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/socket.io/"))
            .and(query_param("sid", "abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/socket.io/"))
            .and(query_param("sid", "abc"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("40{\"sid\":\"ns1\"}\u{1e}42[\"connected\",{\"message\":\"hi\"}]"),
            )
            .mount(&server)
            .await;

        let endpoint = Endpoint::new(&server.uri(), "/socket.io/", "secret").unwrap();
        let session = establish(&Client::new(), &endpoint, &RealtimeConfig::default())
            .await
            .unwrap();

        assert_eq!(session.transport.kind(), TransportKind::Polling);
        assert_eq!(session.handshake.sid, "abc");
        // the event that followed the connect ack is kept for the run loop
        assert_eq!(session.pending.len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_namespace_connect() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param_is_missing("sid"))
            .respond_with(ResponseTemplate::new(200).set_body_string(OPEN))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("sid", "abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"44{"message":"Invalid token"}"#))
            .mount(&server)
            .await;

        let endpoint = Endpoint::new(&server.uri(), "/socket.io/", "expired").unwrap();
        let err = establish(&Client::new(), &endpoint, &RealtimeConfig::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, RealtimeError::ServerRejected(ref m) if m == "Invalid token"));
    }

    #[tokio::test]
    async fn test_missing_endpoint_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let endpoint = Endpoint::new(&server.uri(), "/socket.io/", "t").unwrap();
        let err = establish(&Client::new(), &endpoint, &RealtimeConfig::default())
            .await
            .err()
            .unwrap();
        assert!(err.is_endpoint_missing());
    }
}
