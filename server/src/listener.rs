//
// Copyright 2025-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! The framed-event transport adapter.
//!
//! Frames are newline-delimited JSON events over TCP. The core consumes one
//! client event (`message_to_server` carrying `{content}`) and produces one
//! (`message` carrying the payload); a bare text line is accepted as
//! shorthand for the former. Everything transport-specific stays in this
//! module.

use crate::commands;
use crate::context::AppContext;
use crate::service::{Delivery, Outbound};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tinymud_common::{Payload, SessionId, MESSAGE_IN, MESSAGE_OUT};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::RwLock;

#[derive(Debug, Serialize, Deserialize)]
struct Frame {
    event: String,
    #[serde(default)]
    payload: Value,
}

/// Outbound connection registry: session id -> payload channel.
#[derive(Clone, Default)]
pub struct Gateway {
    senders: Arc<RwLock<HashMap<String, UnboundedSender<Payload>>>>,
}

impl Gateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, sid: &str) -> UnboundedReceiver<Payload> {
        let (tx, rx) = unbounded_channel();
        self.senders.write().await.insert(sid.to_string(), tx);
        rx
    }

    pub async fn unregister(&self, sid: &str) {
        self.senders.write().await.remove(sid);
    }

    pub async fn send(&self, sid: &str, payload: Payload) {
        let senders = self.senders.read().await;
        if let Some(sender) = senders.get(sid) {
            let _ = sender.send(payload);
        }
    }

    /// Close a session's channel, ending its writer task.
    pub async fn close(&self, sid: &str) {
        self.senders.write().await.remove(sid);
    }

    /// Deliver to everyone in a room, minus the excluded session.
    pub async fn broadcast_room(
        &self,
        ctx: &AppContext,
        room_id: &str,
        exclude: Option<&str>,
        payload: Payload,
    ) {
        let recipients: Vec<String> = {
            let world = ctx.world.read().await;
            world
                .rooms
                .get(room_id)
                .map(|room| {
                    room.players
                        .iter()
                        .filter(|sid| Some(sid.as_str()) != exclude)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        };
        for sid in recipients {
            self.send(&sid, payload.clone()).await;
        }
    }

    /// Fan out dispatcher output, preserving order.
    pub async fn fan_out(&self, ctx: &AppContext, outbound: Vec<Outbound>) {
        for item in outbound {
            match item.delivery {
                Delivery::To(sid) => self.send(&sid, item.payload).await,
                Delivery::Room { room_id, exclude } => {
                    self.broadcast_room(ctx, &room_id, exclude.as_deref(), item.payload)
                        .await
                }
            }
        }
    }
}

/// Accept connections forever.
pub async fn run_listener(
    ctx: AppContext,
    gateway: Gateway,
    listener: TcpListener,
) -> std::io::Result<()> {
    loop {
        let (stream, peer_addr) = listener.accept().await?;
        tracing::info!("New connection from {}", peer_addr);
        let ctx = ctx.clone();
        let gateway = gateway.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(ctx, gateway, stream).await {
                tracing::debug!("Connection from {} ended: {}", peer_addr, e);
            }
        });
    }
}

async fn handle_connection(
    ctx: AppContext,
    gateway: Gateway,
    stream: TcpStream,
) -> std::io::Result<()> {
    let sid = SessionId::generate().to_string();
    let (read_half, mut write_half) = stream.into_split();
    let mut rx = gateway.register(&sid).await;
    ctx.sessions.write().await.connect(&sid);

    // Writer: payloads out as framed events, one per line.
    let writer = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            let frame = Frame {
                event: MESSAGE_OUT.to_string(),
                payload: serde_json::to_value(&payload).unwrap_or(Value::Null),
            };
            let mut line = match serde_json::to_string(&frame) {
                Ok(line) => line,
                Err(_) => continue,
            };
            line.push('\n');
            if write_half.write_all(line.as_bytes()).await.is_err() {
                break;
            }
        }
        let _ = write_half.shutdown().await;
    });

    gateway
        .send(&sid, commands::auth::welcome_prompt())
        .await;

    let mut lines = BufReader::new(read_half).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let content = match extract_content(&line) {
            Some(content) => content,
            None => continue,
        };
        if content.len() > ctx.game.max_message_len {
            gateway
                .send(&sid, Payload::error("Message too long."))
                .await;
            continue;
        }

        let outcome = commands::handle_input(&ctx, &sid, &content).await;
        gateway.fan_out(&ctx, outcome.outbound).await;
        let closing_self = outcome.close_sids.iter().any(|s| s == &sid);
        for close_sid in outcome.close_sids {
            if close_sid != sid {
                teardown_session(&ctx, &gateway, &close_sid).await;
            }
        }
        if closing_self {
            break;
        }
    }

    teardown_session(&ctx, &gateway, &sid).await;
    writer.abort();
    Ok(())
}

/// Pull the content out of a client frame; bare text lines pass through.
fn extract_content(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<Frame>(trimmed) {
        Ok(frame) if frame.event == MESSAGE_IN => frame
            .payload
            .get("content")
            .and_then(Value::as_str)
            .map(String::from),
        Ok(_) => None,
        Err(_) => Some(trimmed.to_string()),
    }
}

/// Unbind a session: announce departure, free the player binding, cancel
/// trades, drop rate-limit state, and flush saves (logout is a critical
/// moment).
pub async fn teardown_session(ctx: &AppContext, gateway: &Gateway, sid: &str) {
    let departure = {
        let mut world = ctx.world.write().await;
        let name_and_room = world
            .players
            .get(sid)
            .map(|p| p.room_id.clone())
            .and_then(|room_id| {
                world
                    .display_name_for_sid(sid)
                    .map(|name| (room_id, name))
            });
        world.remove_player(sid);
        ctx.persistence.save_world(&world, true);
        name_and_room
    };
    if let Some((room_id, name)) = departure {
        gateway
            .broadcast_room(
                ctx,
                &room_id,
                Some(sid),
                Payload::system(format!("{} fades away.", name)),
            )
            .await;
    }

    let cancelled_partners = {
        let mut sessions = ctx.sessions.write().await;
        sessions.disconnect(sid)
    };
    for partner in cancelled_partners {
        gateway
            .send(&partner, Payload::system("Your pending trade was cancelled."))
            .await;
    }

    ctx.limiter.forget_session(sid);
    ctx.persistence.flush_all_saves();
    gateway.close(sid).await;
    tracing::info!("Session {} torn down", sid);
}

/// Consume tick broadcasts and fan them out to rooms.
pub fn spawn_broadcast_pump(
    ctx: AppContext,
    gateway: Gateway,
    mut rx: UnboundedReceiver<(String, Payload)>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some((room_id, payload)) = rx.recv().await {
            gateway.broadcast_room(&ctx, &room_id, None, payload).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_content_framed() {
        let line = r#"{"event": "message_to_server", "payload": {"content": "look"}}"#;
        assert_eq!(extract_content(line).as_deref(), Some("look"));
    }

    #[test]
    fn test_extract_content_wrong_event() {
        let line = r#"{"event": "ping", "payload": {}}"#;
        assert_eq!(extract_content(line), None);
    }

    #[test]
    fn test_extract_content_bare_text() {
        assert_eq!(extract_content("look\n").as_deref(), Some("look"));
        assert_eq!(extract_content("   "), None);
    }

    #[tokio::test]
    async fn test_gateway_send_and_close() {
        let gateway = Gateway::new();
        let mut rx = gateway.register("s1").await;
        gateway.send("s1", Payload::system("hi")).await;
        assert_eq!(rx.recv().await.unwrap().content, "hi");
        gateway.close("s1").await;
        gateway.send("s1", Payload::system("gone")).await;
        assert!(rx.recv().await.is_none());
    }
}
