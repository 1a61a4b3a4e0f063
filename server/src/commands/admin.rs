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

//! Miscellaneous admin commands: kick, purge, safety level, GOAP mode,
//! world audit and save statistics.

use crate::context::AppContext;
use crate::goap::tick::set_goap_mode;
use crate::resolve::resolve_or_err;
use crate::service::{deliver, Outbound, ServiceResult};
use crate::validate::{audit_world, cleanup_world};
use crate::world::SafetyLevel;
use tinymud_common::Payload;

/// Session ids the dispatcher must close after delivering output.
pub struct AdminOutcome {
    pub outbound: Vec<Outbound>,
    pub kick_sids: Vec<String>,
}

/// Handle an admin verb; requires admin (checked by the dispatcher).
pub async fn handle(ctx: &AppContext, sid: &str, verb: &str, rest: &str) -> Option<AdminOutcome> {
    match verb {
        "kick" => Some(kick(ctx, sid, rest).await),
        "purge" => Some(purge(ctx, sid).await),
        "safety" => {
            let result = match rest.trim().parse::<SafetyLevel>() {
                Ok(level) => {
                    let mut world = ctx.world.write().await;
                    world.safety_level = level;
                    ctx.persistence.save_world(&world, true);
                    ServiceResult::success(vec![Payload::system(format!(
                        "Safety level set to {}.",
                        level
                    ))])
                }
                Err(e) => ServiceResult::error(e),
            };
            Some(AdminOutcome {
                outbound: deliver(sid, &result),
                kick_sids: Vec::new(),
            })
        }
        "goap" => {
            let enabled = matches!(rest.trim().to_lowercase().as_str(), "on" | "true" | "1");
            let mut world = ctx.world.write().await;
            let notes = set_goap_mode(&mut world, enabled);
            ctx.persistence.save_world(&world, true);
            let result =
                ServiceResult::success(vec![Payload::system(notes.join("\n"))]);
            Some(AdminOutcome {
                outbound: deliver(sid, &result),
                kick_sids: Vec::new(),
            })
        }
        "audit" => {
            let report = {
                let world = ctx.world.read().await;
                audit_world(&world)
            };
            let mut lines = vec![format!(
                "Audit: {} checks, health {:.1}%",
                report.checks, report.health_score
            )];
            lines.extend(report.issues.iter().take(20).cloned());
            let result = ServiceResult::success(vec![Payload::system(lines.join("\n"))]);
            Some(AdminOutcome {
                outbound: deliver(sid, &result),
                kick_sids: Vec::new(),
            })
        }
        "savestats" => {
            let stats = ctx.persistence.stats();
            let result = ServiceResult::success(vec![Payload::system(format!(
                "Saves: immediate {}, debounced {}, errors {}",
                stats.immediate, stats.debounced, stats.errors
            ))]);
            Some(AdminOutcome {
                outbound: deliver(sid, &result),
                kick_sids: Vec::new(),
            })
        }
        _ => None,
    }
}

async fn kick(ctx: &AppContext, sid: &str, rest: &str) -> AdminOutcome {
    let world = ctx.world.read().await;
    let candidates: Vec<(String, String)> = world
        .players
        .keys()
        .filter_map(|other| {
            world
                .display_name_for_sid(other)
                .map(|name| (name, other.clone()))
        })
        .collect();
    let name = match resolve_or_err(rest, candidates.iter().map(|(n, _)| n.clone())) {
        Err(e) => {
            return AdminOutcome {
                outbound: deliver(sid, &ServiceResult::error(e)),
                kick_sids: Vec::new(),
            }
        }
        Ok(name) => name,
    };
    let target_sid = candidates
        .iter()
        .find(|(n, _)| n == &name)
        .map(|(_, s)| s.clone())
        .expect("resolved name present");
    if target_sid == sid {
        return AdminOutcome {
            outbound: deliver(sid, &ServiceResult::error("You cannot kick yourself.")),
            kick_sids: Vec::new(),
        };
    }
    AdminOutcome {
        outbound: vec![
            Outbound::to(sid, Payload::system(format!("{} kicked.", name))),
            Outbound::to(
                &target_sid,
                Payload::system("You have been disconnected by an admin."),
            ),
        ],
        kick_sids: vec![target_sid],
    }
}

/// Purge: reset all NPC plan queues and run cleanup; a critical moment, so
/// the save is immediate.
async fn purge(ctx: &AppContext, sid: &str) -> AdminOutcome {
    let mut world = ctx.world.write().await;
    for sheet in world.npc_sheets.values_mut() {
        sheet.plan_queue.clear();
    }
    let notes = cleanup_world(&mut world);
    ctx.persistence.save_world(&world, false);
    let mut lines = vec!["World purged: plan queues cleared.".to_string()];
    lines.extend(notes.into_iter().take(10));
    AdminOutcome {
        outbound: deliver(
            sid,
            &ServiceResult::success(vec![Payload::system(lines.join("\n"))]),
        ),
        kick_sids: Vec::new(),
    }
}
