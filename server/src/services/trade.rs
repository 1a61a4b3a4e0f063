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

//! Two-party trade with a confirmation state machine.
//!
//! A trade moves initiated -> proposed -> accepted/rejected/cancelled. Both
//! parties confirm the exact object set before the swap; the swap itself is
//! atomic: any constraint failure (an item gone, an inventory full) aborts
//! the whole trade and restores both inventories.

use crate::resolve::resolve_or_err;
use crate::service::ServiceResult;
use crate::session::{SessionRegistry, TradeOffer, TradePhase};
use crate::world::object::Object;
use crate::world::World;
use tinymud_common::Payload;
use uuid::Uuid;

/// Messages for sessions other than the actor, delivered directly.
pub type DirectMessages = Vec<(String, Payload)>;

fn resolve_items_in_inventory(
    world: &World,
    sid: &str,
    typed_names: &str,
) -> Result<Vec<Uuid>, String> {
    let sheet = world
        .sheet_for_sid(sid)
        .ok_or_else(|| "No character sheet.".to_string())?;
    let mut uuids = Vec::new();
    for typed in typed_names.split(',') {
        let typed = typed.trim();
        if typed.is_empty() {
            continue;
        }
        let names: Vec<String> = sheet
            .inventory
            .items()
            .filter(|(_, o)| !uuids.contains(&o.uuid))
            .map(|(_, o)| o.display_name.clone())
            .collect();
        let resolved = resolve_or_err(typed, names)?;
        let uuid = sheet
            .inventory
            .items()
            .find(|(_, o)| o.display_name == resolved && !uuids.contains(&o.uuid))
            .map(|(_, o)| o.uuid)
            .ok_or_else(|| format!("'{}' is not in the inventory.", typed))?;
        uuids.push(uuid);
    }
    if uuids.is_empty() {
        return Err("Name at least one item.".to_string());
    }
    Ok(uuids)
}

/// Propose a trade: `offer_names` from the initiator's inventory for
/// `want_names` from the counterparty's. Validates both sides, then parks
/// the offer awaiting the counterparty's accept.
pub fn propose(
    world: &World,
    sessions: &mut SessionRegistry,
    from_sid: &str,
    target_token: &str,
    offer_names: &str,
    want_names: &str,
) -> (ServiceResult, DirectMessages) {
    let Some(player) = world.players.get(from_sid) else {
        return (ServiceResult::error("Please authenticate first."), vec![]);
    };
    let Some(room) = world.rooms.get(&player.room_id) else {
        return (ServiceResult::error("You are nowhere."), vec![]);
    };

    // Counterparty must be a live player in the same room.
    let mut partner_names: Vec<(String, String)> = Vec::new();
    for other_sid in &room.players {
        if other_sid == from_sid {
            continue;
        }
        if let Some(name) = world.display_name_for_sid(other_sid) {
            partner_names.push((name, other_sid.clone()));
        }
    }
    let resolved = match resolve_or_err(target_token, partner_names.iter().map(|(n, _)| n.clone()))
    {
        Ok(name) => name,
        Err(e) => return (ServiceResult::error(e), vec![]),
    };
    let to_sid = partner_names
        .iter()
        .find(|(n, _)| n == &resolved)
        .map(|(_, sid)| sid.clone())
        .expect("resolved partner present");

    let offer = match resolve_items_in_inventory(world, from_sid, offer_names) {
        Ok(items) => items,
        Err(e) => return (ServiceResult::error(format!("Your side: {}", e)), vec![]),
    };
    let want = match resolve_items_in_inventory(world, &to_sid, want_names) {
        Ok(items) => items,
        Err(e) => return (ServiceResult::error(format!("Their side: {}", e)), vec![]),
    };

    let trade = TradeOffer {
        from_sid: from_sid.to_string(),
        to_sid: to_sid.clone(),
        offer,
        want,
        phase: TradePhase::Proposed,
    };
    if let Err(e) = sessions.propose_trade(trade) {
        return (ServiceResult::error(e), vec![]);
    }

    let from_name = world
        .display_name_for_sid(from_sid)
        .unwrap_or_else(|| "Someone".to_string());
    let direct = vec![(
        to_sid,
        Payload::system(format!(
            "[b]{}[/b] proposes a trade: their [{}] for your [{}]. Reply /trade accept or /trade reject.",
            from_name, offer_names, want_names
        )),
    )];
    (
        ServiceResult::success(vec![Payload::system(format!(
            "You propose a trade to [b]{}[/b]. Awaiting their answer.",
            resolved
        ))]),
        direct,
    )
}

/// Accept or reject the incoming trade. Accepting performs the atomic swap.
pub fn respond(
    world: &mut World,
    sessions: &mut SessionRegistry,
    sid: &str,
    accept: bool,
) -> (ServiceResult, DirectMessages) {
    let Some(trade) = sessions.incoming_trade(sid).cloned() else {
        return (
            ServiceResult::error("No one has proposed a trade to you."),
            vec![],
        );
    };
    sessions.take_trade(sid);

    let from_name = world
        .display_name_for_sid(&trade.from_sid)
        .unwrap_or_else(|| "The other party".to_string());
    let to_name = world
        .display_name_for_sid(sid)
        .unwrap_or_else(|| "The other party".to_string());

    if !accept {
        return (
            ServiceResult::success(vec![Payload::system("You reject the trade.")]),
            vec![(
                trade.from_sid.clone(),
                Payload::system(format!("[b]{}[/b] rejects your trade.", to_name)),
            )],
        );
    }

    match swap(world, &trade) {
        Ok(()) => (
            ServiceResult::success(vec![Payload::system(format!(
                "Trade with [b]{}[/b] complete.",
                from_name
            ))]),
            vec![(
                trade.from_sid.clone(),
                Payload::system(format!("[b]{}[/b] accepts your trade. Done.", to_name)),
            )],
        ),
        Err(reason) => (
            ServiceResult::error(format!("Trade failed: {}", reason)),
            vec![(
                trade.from_sid.clone(),
                Payload::system(format!("Trade with [b]{}[/b] failed: {}", to_name, reason)),
            )],
        ),
    }
}

/// Cancel any trade the session is party to.
pub fn cancel(
    world: &World,
    sessions: &mut SessionRegistry,
    sid: &str,
) -> (ServiceResult, DirectMessages) {
    let Some(trade) = sessions.take_trade(sid) else {
        return (ServiceResult::error("You have no pending trade."), vec![]);
    };
    let other = if trade.from_sid == sid {
        trade.to_sid.clone()
    } else {
        trade.from_sid.clone()
    };
    let name = world
        .display_name_for_sid(sid)
        .unwrap_or_else(|| "The other party".to_string());
    (
        ServiceResult::success(vec![Payload::system("Trade cancelled.")]),
        vec![(
            other,
            Payload::system(format!("[b]{}[/b] cancelled the trade.", name)),
        )],
    )
}

/// Remove every traded object from both inventories, then place each side's
/// items into the other's inventory. Any failure restores the exact
/// pre-trade slots.
fn swap(world: &mut World, trade: &TradeOffer) -> Result<(), String> {
    // Phase 1: take everything out, remembering original slots.
    let mut taken: Vec<(String, usize, Object)> = Vec::new();
    let mut take = |world: &mut World, sid: &str, uuids: &[Uuid]| -> Result<(), String> {
        for uuid in uuids {
            let sheet = world
                .sheet_for_sid_mut(sid)
                .ok_or_else(|| "a party is gone".to_string())?;
            let slot = sheet
                .inventory
                .find_by_uuid(uuid)
                .ok_or_else(|| "an item is no longer held".to_string())?;
            let obj = sheet.inventory.remove(slot).expect("slot occupied");
            taken.push((sid.to_string(), slot, obj));
        }
        Ok(())
    };

    let mut take_result = take(world, &trade.from_sid, &trade.offer);
    if take_result.is_ok() {
        take_result = take(world, &trade.to_sid, &trade.want);
    }

    if let Err(reason) = take_result {
        restore(world, taken);
        return Err(reason);
    }

    // Phase 2: place each item into the counterparty's inventory.
    let mut placed: Vec<(String, Uuid)> = Vec::new();
    let mut failure: Option<String> = None;
    for (owner_sid, _, obj) in &taken {
        let recipient = if owner_sid == &trade.from_sid {
            &trade.to_sid
        } else {
            &trade.from_sid
        };
        let uuid = obj.uuid;
        let Some(sheet) = world.sheet_for_sid_mut(recipient) else {
            failure = Some("a party is gone".to_string());
            break;
        };
        match sheet.inventory.auto_place(obj.clone()) {
            Ok(_) => placed.push((recipient.clone(), uuid)),
            Err(_) => {
                failure = Some(format!(
                    "no room for the {} on the other side",
                    obj.display_name
                ));
                break;
            }
        }
    }

    match failure {
        None => Ok(()),
        Some(reason) => {
            // Roll back: pull out anything placed, then restore originals.
            for (sid, uuid) in placed {
                if let Some(sheet) = world.sheet_for_sid_mut(&sid) {
                    if let Some(slot) = sheet.inventory.find_by_uuid(&uuid) {
                        sheet.inventory.remove(slot);
                    }
                }
            }
            restore(world, taken);
            Err(reason)
        }
    }
}

fn restore(world: &mut World, taken: Vec<(String, usize, Object)>) {
    for (sid, slot, obj) in taken {
        if let Some(sheet) = world.sheet_for_sid_mut(&sid) {
            if sheet.inventory.place(slot, obj.clone()).is_err() {
                // Exact slot unavailable; best-effort anywhere.
                let _ = sheet.inventory.auto_place(obj);
            }
        }
    }
}
