//! WebSocket signaling client.
//!
//! Opens one WebSocket per session and performs a two-message handshake:
//!
//! ```text
//! bridge → host   {"id": "<ms>", "op": "connect",
//!                  "data": {"token", "game", "width", "height"}}
//! host → bridge   {"op": "offer", "data": {"sdp": "<remote sdp>"}}
//!                 {"op": "error", "data": {"message": "..."}}
//! ```
//!
//! After the offer the socket is split: the write half becomes the
//! session's [`MessageChannel`], the read half is drained by a background
//! task that only logs what the host sends.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use cgbridge_core::{
    BridgeError, Credential, MessageChannel, SessionParams, SignalingClient, SignalingSession,
};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct WsSignalingClient {
    url: String,
    timeout: Duration,
}

impl WsSignalingClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }

    async fn handshake(
        &self,
        credential: &Credential,
        params: &SessionParams,
    ) -> Result<SignalingSession, BridgeError> {
        let (mut socket, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| BridgeError::Signaling(format!("connect {}: {e}", self.url)))?;
        debug!(url = %self.url, "signaling socket open");

        let hello = connect_message(credential, params);
        socket
            .send(Message::Text(hello.to_string()))
            .await
            .map_err(|e| BridgeError::Signaling(e.to_string()))?;

        let offer = wait_for_offer(&mut socket).await?;
        let (sink, stream) = socket.split();
        tokio::spawn(drain(stream));

        Ok(SignalingSession {
            offer,
            channel: Box::new(WsChannel { sink }),
        })
    }
}

#[async_trait]
impl SignalingClient for WsSignalingClient {
    async fn connect(
        &self,
        credential: &Credential,
        params: &SessionParams,
    ) -> Result<SignalingSession, BridgeError> {
        let session = tokio::time::timeout(self.timeout, self.handshake(credential, params))
            .await
            .map_err(|_| BridgeError::Timeout(self.timeout))??;
        info!(game = %params.game_id, "signaling handshake complete");
        Ok(session)
    }
}

fn connect_message(credential: &Credential, params: &SessionParams) -> Value {
    let id = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    json!({
        "id": id.to_string(),
        "op": "connect",
        "data": {
            "token": credential.expose(),
            "game": params.game_id,
            "width": params.width,
            "height": params.height,
        },
    })
}

/// Interpret one handshake reply: `Some(sdp)` for an offer, an error for
/// an explicit rejection, `None` for anything else.
fn parse_reply(text: &str) -> Result<Option<String>, BridgeError> {
    let Ok(v) = serde_json::from_str::<Value>(text) else {
        return Ok(None);
    };
    match v["op"].as_str() {
        Some("offer") => v["data"]["sdp"]
            .as_str()
            .map(|sdp| Some(sdp.to_string()))
            .ok_or_else(|| BridgeError::Signaling("offer without sdp".into())),
        Some("error") => Err(BridgeError::Signaling(
            v["data"]["message"]
                .as_str()
                .unwrap_or("rejected by host")
                .to_string(),
        )),
        _ => Ok(None),
    }
}

async fn wait_for_offer(socket: &mut Socket) -> Result<String, BridgeError> {
    while let Some(msg) = socket.next().await {
        match msg.map_err(|e| BridgeError::Signaling(e.to_string()))? {
            Message::Text(text) => {
                if let Some(sdp) = parse_reply(&text)? {
                    return Ok(sdp);
                }
                debug!("ignoring pre-offer message");
            }
            Message::Close(frame) => {
                return Err(BridgeError::Signaling(format!(
                    "closed before offer: {frame:?}"
                )));
            }
            _ => {}
        }
    }
    Err(BridgeError::Signaling("socket ended before offer".into()))
}

async fn drain(mut stream: SplitStream<Socket>) {
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => debug!(len = text.len(), "signaling message from host"),
            Ok(Message::Close(frame)) => {
                info!("signaling closed by host: {frame:?}");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("signaling read error: {e}");
                break;
            }
        }
    }
}

// ── WsChannel ────────────────────────────────────────────────────

struct WsChannel {
    sink: SplitSink<Socket, Message>,
}

#[async_trait]
impl MessageChannel for WsChannel {
    async fn send(&mut self, message: String) -> Result<(), BridgeError> {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match self.sink.send(Message::Text(message)).await {
            Ok(()) => Ok(()),
            Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => {
                Err(BridgeError::ChannelClosed)
            }
            Err(e) => Err(BridgeError::Channel(e.to_string())),
        }
    }

    async fn close(&mut self) -> Result<(), BridgeError> {
        self.sink
            .close()
            .await
            .map_err(|e| BridgeError::Channel(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn connect_message_shape() {
        let params = SessionParams {
            game_id: "mrfz".into(),
            width: 1280,
            height: 720,
        };
        let v = connect_message(&Credential::new("tok"), &params);
        assert_eq!(v["op"], "connect");
        assert_eq!(v["data"]["token"], "tok");
        assert_eq!(v["data"]["game"], "mrfz");
        assert_eq!(v["data"]["width"], 1280);
        assert!(v["id"].as_str().unwrap().parse::<u64>().is_ok());
    }

    #[test]
    fn reply_parsing() {
        assert_eq!(
            parse_reply(r#"{"op":"offer","data":{"sdp":"v=0"}}"#).unwrap(),
            Some("v=0".to_string())
        );
        assert_eq!(parse_reply(r#"{"op":"ping"}"#).unwrap(), None);
        assert_eq!(parse_reply("not json").unwrap(), None);
        assert!(parse_reply(r#"{"op":"error","data":{"message":"bad token"}}"#).is_err());
        assert!(parse_reply(r#"{"op":"offer","data":{}}"#).is_err());
    }

    #[tokio::test]
    async fn handshake_against_local_host() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let host = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            let hello = ws.next().await.unwrap().unwrap().into_text().unwrap();
            let hello: Value = serde_json::from_str(&hello).unwrap();
            assert_eq!(hello["data"]["token"], "tok");
            ws.send(Message::Text(r#"{"op":"offer","data":{"sdp":"v=0"}}"#.into()))
                .await
                .unwrap();
            let answer = ws.next().await.unwrap().unwrap().into_text().unwrap();
            answer
        });

        let client = WsSignalingClient::new(format!("ws://{addr}"), Duration::from_secs(5));
        let params = SessionParams {
            game_id: "mrfz".into(),
            width: 1280,
            height: 720,
        };
        let mut session = client
            .connect(&Credential::new("tok"), &params)
            .await
            .unwrap();
        assert_eq!(session.offer, "v=0");
        session.channel.send("hello".into()).await.unwrap();
        assert_eq!(host.await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn unreachable_host_is_a_signaling_error() {
        let client = WsSignalingClient::new("ws://127.0.0.1:1", Duration::from_secs(2));
        let params = SessionParams {
            game_id: "mrfz".into(),
            width: 1,
            height: 1,
        };
        let err = client
            .connect(&Credential::new("tok"), &params)
            .await
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, BridgeError::Signaling(_) | BridgeError::Timeout(_)));
    }
}
