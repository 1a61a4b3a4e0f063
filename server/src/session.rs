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

//! Per-connection session state.
//!
//! Each coroutine-style flow from the command surface (the auth wizard, the
//! interaction menu, trade confirmation) is modeled as an explicit state
//! machine bound to the session. Disconnecting tears the session down and
//! cancels any in-flight confirmation flows.

use std::collections::HashMap;
use uuid::Uuid;

/// Step of the authentication wizard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStep {
    /// Waiting for `create` or `login` (or a one-line pipe form).
    ChooseMode,
    CreateName,
    CreatePassword { name: String },
    CreateDescription { name: String, password: String },
    LoginName,
    LoginPassword { name: String },
}

/// An open interaction menu for one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionMenu {
    pub obj_uuid: Uuid,
    pub obj_name: String,
    pub actions: Vec<String>,
}

/// Session state for routing input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Not authenticated; inside the auth wizard.
    Auth(AuthStep),
    /// Authenticated and playing.
    Playing,
    /// Choosing from an interaction menu.
    Interacting(InteractionMenu),
}

/// One live connection.
#[derive(Debug, Clone)]
pub struct Session {
    pub sid: String,
    pub state: SessionState,
}

impl Session {
    pub fn new(sid: impl Into<String>) -> Self {
        Self {
            sid: sid.into(),
            state: SessionState::Auth(AuthStep::ChooseMode),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self.state, SessionState::Auth(_))
    }
}

/// Trade confirmation phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradePhase {
    /// Offer created, not yet validated against both inventories.
    Initiated,
    /// Validated and shown to the counterparty; awaiting accept/reject.
    Proposed,
}

/// A pending two-party trade. `offer` are the initiator's object UUIDs,
/// `want` the counterparty's. The swap is atomic: any constraint failure
/// aborts the whole trade with rollback.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeOffer {
    pub from_sid: String,
    pub to_sid: String,
    pub offer: Vec<Uuid>,
    pub want: Vec<Uuid>,
    pub phase: TradePhase,
}

/// All live sessions plus in-flight trades.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, Session>,
    trades: Vec<TradeOffer>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&mut self, sid: &str) -> &mut Session {
        self.sessions
            .entry(sid.to_string())
            .or_insert_with(|| Session::new(sid))
    }

    pub fn get(&self, sid: &str) -> Option<&Session> {
        self.sessions.get(sid)
    }

    pub fn get_mut(&mut self, sid: &str) -> Option<&mut Session> {
        self.sessions.get_mut(sid)
    }

    /// Remove a session and cancel any trades it is party to. Returns the
    /// sids of counterparties whose trades were cancelled.
    pub fn disconnect(&mut self, sid: &str) -> Vec<String> {
        self.sessions.remove(sid);
        let mut notified = Vec::new();
        self.trades.retain(|t| {
            if t.from_sid == sid || t.to_sid == sid {
                let other = if t.from_sid == sid {
                    t.to_sid.clone()
                } else {
                    t.from_sid.clone()
                };
                notified.push(other);
                false
            } else {
                true
            }
        });
        notified
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn sids(&self) -> impl Iterator<Item = &String> {
        self.sessions.keys()
    }

    // --- Trades ---

    /// Register a proposed trade. A session may be party to at most one
    /// trade at a time.
    pub fn propose_trade(&mut self, trade: TradeOffer) -> Result<(), String> {
        for existing in &self.trades {
            for sid in [&trade.from_sid, &trade.to_sid] {
                if &existing.from_sid == sid || &existing.to_sid == sid {
                    return Err("A trade involving that party is already pending.".to_string());
                }
            }
        }
        self.trades.push(trade);
        Ok(())
    }

    /// The pending trade addressed TO this session, if any.
    pub fn incoming_trade(&self, sid: &str) -> Option<&TradeOffer> {
        self.trades.iter().find(|t| t.to_sid == sid)
    }

    /// Any pending trade this session is party to.
    pub fn trade_for(&self, sid: &str) -> Option<&TradeOffer> {
        self.trades
            .iter()
            .find(|t| t.from_sid == sid || t.to_sid == sid)
    }

    /// Remove and return the pending trade this session is party to.
    pub fn take_trade(&mut self, sid: &str) -> Option<TradeOffer> {
        let idx = self
            .trades
            .iter()
            .position(|t| t.from_sid == sid || t.to_sid == sid)?;
        Some(self.trades.remove(idx))
    }
}
