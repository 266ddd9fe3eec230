use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use uuid::Uuid;

use crate::api::ClientError;
use crate::types::PushEvent;

/// Bounded exponential backoff for socket reconnection. Independent of any
/// in-flight REST call; when attempts run out the session falls back to
/// REST polling until restarted.
#[derive(Debug)]
pub struct Backoff {
    attempt: u32,
    max_attempts: u32,
    base: Duration,
    cap: Duration,
}

impl Backoff {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempt: 0,
            max_attempts,
            base: Duration::from_millis(500),
            cap: Duration::from_secs(30),
        }
    }

    /// Delay before the next attempt, or `None` when attempts are exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        let exp = self.base.saturating_mul(1u32 << self.attempt.min(16));
        self.attempt += 1;
        Some(exp.min(self.cap))
    }

    /// A healthy connection resets the schedule.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

/// Websocket half of the client session: connects, announces its room, and
/// forwards decoded pushes to the session owner.
pub struct ChatSocket {
    ws_url: String,
    token: String,
    user_id: Uuid,
}

impl ChatSocket {
    /// `ws_url` is the full socket endpoint, e.g. `ws://host:5000/api/v1/ws`.
    pub fn new(ws_url: impl Into<String>, token: impl Into<String>, user_id: Uuid) -> Self {
        Self {
            ws_url: ws_url.into(),
            token: token.into(),
            user_id,
        }
    }

    fn join_frame(&self) -> String {
        serde_json::json!({ "type": "join_room", "user_id": self.user_id }).to_string()
    }

    /// Run one connection until the server closes or the transport fails.
    async fn connect_once(&self, events: &UnboundedSender<PushEvent>) -> Result<(), ClientError> {
        let url = format!("{}?token={}", self.ws_url, self.token);
        let (mut ws, _) = connect_async(url.as_str()).await?;

        // Announce own room immediately after the handshake; the server
        // delivers nothing until the announce arrives.
        ws.send(Message::text(self.join_frame())).await?;
        tracing::debug!(user_id = %self.user_id, "joined own room");

        while let Some(frame) = ws.next().await {
            match frame? {
                Message::Text(txt) => match serde_json::from_str::<PushEvent>(&txt) {
                    Ok(event) => {
                        if events.send(event).is_err() {
                            // Session owner is gone; stop listening.
                            return Ok(());
                        }
                    }
                    Err(err) => tracing::warn!(error = %err, "undecodable push frame"),
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
        Ok(())
    }

    /// Listen forever, reconnecting with bounded exponential backoff. Errors
    /// only when the backoff schedule is exhausted.
    pub async fn run(self, events: UnboundedSender<PushEvent>) -> Result<(), ClientError> {
        let mut backoff = Backoff::new(8);
        loop {
            match self.connect_once(&events).await {
                Ok(()) => {
                    if events.is_closed() {
                        return Ok(());
                    }
                    backoff.reset();
                }
                Err(err) => tracing::warn!(error = %err, "socket connection failed"),
            }
            match backoff.next_delay() {
                Some(delay) => tokio::time::sleep(delay).await,
                None => return Err(ClientError::ReconnectExhausted),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_and_exhausts() {
        let mut backoff = Backoff::new(3);
        let d1 = backoff.next_delay().unwrap();
        let d2 = backoff.next_delay().unwrap();
        let d3 = backoff.next_delay().unwrap();
        assert!(d1 < d2 && d2 < d3);
        assert!(backoff.next_delay().is_none());
    }

    #[test]
    fn test_backoff_is_capped() {
        let mut backoff = Backoff::new(32);
        let last = std::iter::from_fn(|| backoff.next_delay()).last().unwrap();
        assert!(last <= Duration::from_secs(30));
    }

    #[test]
    fn test_backoff_reset_restarts_schedule() {
        let mut backoff = Backoff::new(2);
        backoff.next_delay().unwrap();
        backoff.next_delay().unwrap();
        assert!(backoff.next_delay().is_none());
        backoff.reset();
        assert!(backoff.next_delay().is_some());
    }

    #[test]
    fn test_join_frame_shape() {
        let user_id = Uuid::new_v4();
        let socket = ChatSocket::new("ws://localhost:5000/api/v1/ws", "t", user_id);
        let frame: serde_json::Value = serde_json::from_str(&socket.join_frame()).unwrap();
        assert_eq!(frame["type"], "join_room");
        assert_eq!(frame["user_id"], user_id.to_string());
    }
}
