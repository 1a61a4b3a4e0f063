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

//! Authentication: the interactive wizard and the `/auth` command family.
//!
//! A connection starts in the wizard (`create` or `login`, stepwise), and
//! the pipe-delimited one-line forms are accepted at any wizard step.
//! Password hashing and verification run outside the world lock.

use crate::context::AppContext;
use crate::ratelimit::Operation;
use crate::resolve::parse_pipe_parts;
use crate::service::{deliver, Outbound, ServiceResult};
use crate::session::{AuthStep, SessionState};
use crate::services::look::describe_room_for;
use crate::world::WorldError;
use tinymud_common::{bold, Payload};

/// Greeting sent when a connection first opens.
pub fn welcome_prompt() -> Payload {
    Payload::system(
        "Welcome to TinyMUD. Type [b]create[/b] to make an account or [b]login[/b] \
         to continue with one. One-line forms also work: \
         [code]/auth create <name> | <password> | <description>[/code] or \
         [code]/auth login <name> | <password>[/code]",
    )
}

/// Drive one input through the auth wizard. Returns the messages to send
/// and mutates the session state machine.
pub async fn handle_wizard_input(ctx: &AppContext, sid: &str, text: &str) -> Vec<Outbound> {
    let text = text.trim();
    if let Err(hint) = ctx.limiter.check_and_consume(sid, Operation::Auth) {
        return vec![Outbound::to(sid, Payload::error(hint))];
    }

    // One-line forms work from any wizard step.
    if let Some(rest) = text.strip_prefix("/auth ") {
        let rest = rest.trim();
        if let Some(args) = rest.strip_prefix("create") {
            let parts = parse_pipe_parts(args, Some(3));
            return create_account(ctx, sid, &parts[0], &parts[1], &parts[2]).await;
        }
        if let Some(args) = rest.strip_prefix("login") {
            let parts = parse_pipe_parts(args, Some(2));
            return login(ctx, sid, &parts[0], &parts[1]).await;
        }
        return vec![Outbound::to(
            sid,
            Payload::error("Authenticate first: /auth create or /auth login."),
        )];
    }

    let step = {
        let sessions = ctx.sessions.read().await;
        match sessions.get(sid).map(|s| s.state.clone()) {
            Some(SessionState::Auth(step)) => step,
            _ => return Vec::new(),
        }
    };

    match step {
        AuthStep::ChooseMode => match text.to_lowercase().as_str() {
            "create" => {
                set_step(ctx, sid, AuthStep::CreateName).await;
                vec![Outbound::to(sid, Payload::system("Choose a name (2-32 characters):"))]
            }
            "login" => {
                set_step(ctx, sid, AuthStep::LoginName).await;
                vec![Outbound::to(sid, Payload::system("Name:"))]
            }
            _ => vec![
                Outbound::to(sid, welcome_prompt()),
            ],
        },
        AuthStep::CreateName => {
            let name = text.to_string();
            let taken = {
                let world = ctx.world.read().await;
                world.get_user_by_display_name(&name).is_some()
            };
            if name.len() < 2 || name.len() > 32 {
                return vec![Outbound::to(
                    sid,
                    Payload::error("Names are 2-32 characters. Try again:"),
                )];
            }
            if taken {
                return vec![Outbound::to(
                    sid,
                    Payload::error("That name is taken. Choose another:"),
                )];
            }
            set_step(ctx, sid, AuthStep::CreatePassword { name }).await;
            vec![Outbound::to(sid, Payload::system("Choose a password:"))]
        }
        AuthStep::CreatePassword { name } => {
            if text.is_empty() {
                return vec![Outbound::to(sid, Payload::error("Password required:"))];
            }
            set_step(
                ctx,
                sid,
                AuthStep::CreateDescription {
                    name,
                    password: text.to_string(),
                },
            )
            .await;
            vec![Outbound::to(
                sid,
                Payload::system("Describe your character in a sentence:"),
            )]
        }
        AuthStep::CreateDescription { name, password } => {
            create_account(ctx, sid, &name, &password, text).await
        }
        AuthStep::LoginName => {
            set_step(
                ctx,
                sid,
                AuthStep::LoginPassword {
                    name: text.to_string(),
                },
            )
            .await;
            vec![Outbound::to(sid, Payload::system("Password:"))]
        }
        AuthStep::LoginPassword { name } => login(ctx, sid, &name, text).await,
    }
}

async fn set_step(ctx: &AppContext, sid: &str, step: AuthStep) {
    let mut sessions = ctx.sessions.write().await;
    if let Some(session) = sessions.get_mut(sid) {
        session.state = SessionState::Auth(step);
    }
}

/// Create an account, bind the session, and announce arrival. Account
/// creation is a critical moment: the save is immediate.
pub async fn create_account(
    ctx: &AppContext,
    sid: &str,
    name: &str,
    password: &str,
    description: &str,
) -> Vec<Outbound> {
    let (name, password, description) = (name.trim(), password.trim(), description.trim());
    if name.is_empty() || password.is_empty() {
        return vec![Outbound::to(
            sid,
            Payload::error("Usage: /auth create <name> | <password> | <description>"),
        )];
    }
    // Hashing is slow on purpose; do it before touching the world lock.
    let hash = match bcrypt::hash(password, bcrypt::DEFAULT_COST) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!("Password hashing failed: {}", e);
            return vec![Outbound::to(
                sid,
                Payload::error("Account creation failed. Try again."),
            )];
        }
    };

    let mut out = Vec::new();
    {
        let mut world = ctx.world.write().await;
        let user_id = match world.create_user(name, &hash, description) {
            Ok(uid) => uid,
            Err(WorldError::NameTaken) => {
                return vec![Outbound::to(sid, Payload::error("That name is taken."))]
            }
            Err(WorldError::InvalidName) => {
                return vec![Outbound::to(
                    sid,
                    Payload::error("Names are 2-32 characters."),
                )]
            }
            Err(e) => {
                tracing::error!("Account creation failed: {}", e);
                return vec![Outbound::to(
                    sid,
                    Payload::error("Account creation failed. Try again."),
                )];
            }
        };
        let is_admin = world.users[&user_id].is_admin;
        world.add_player(sid, user_id, None);
        let room_id = world.players[sid].room_id.clone();

        out.push(Outbound::to(
            sid,
            Payload::system(format!("Welcome, {}!", bold(name))),
        ));
        let mut confirmation = format!("Account created for {}.", bold(name));
        if is_admin {
            confirmation.push_str(" As the first account, you are an admin.");
        }
        out.push(Outbound::to(sid, Payload::system(confirmation)));
        out.push(Outbound::to(
            sid,
            Payload::system(describe_room_for(&world, sid)),
        ));
        out.push(Outbound::room(
            room_id,
            Some(sid.to_string()),
            Payload::system(format!("{} appears.", name)),
        ));

        ctx.persistence.save_world(&world, false);
    }

    let mut sessions = ctx.sessions.write().await;
    if let Some(session) = sessions.get_mut(sid) {
        session.state = SessionState::Playing;
    }
    tracing::info!("Account '{}' created on session {}", name, sid);
    out
}

/// Verify credentials and bind the session.
pub async fn login(ctx: &AppContext, sid: &str, name: &str, password: &str) -> Vec<Outbound> {
    let (name, password) = (name.trim(), password.trim());
    let stored = {
        let world = ctx.world.read().await;
        world
            .get_user_by_display_name(name)
            .map(|u| (u.user_id, u.password_hash.clone(), u.display_name.clone()))
    };
    let Some((user_id, hash, display_name)) = stored else {
        // Back to the top of the wizard.
        set_step(ctx, sid, AuthStep::ChooseMode).await;
        return vec![Outbound::to(
            sid,
            Payload::error("Unknown name or wrong password."),
        )];
    };
    // Verification runs outside any world guard.
    if !bcrypt::verify(password, &hash).unwrap_or(false) {
        set_step(ctx, sid, AuthStep::ChooseMode).await;
        return vec![Outbound::to(
            sid,
            Payload::error("Unknown name or wrong password."),
        )];
    }

    let already_connected = {
        let world = ctx.world.read().await;
        world.players.values().any(|p| p.user_id == user_id)
    };
    if already_connected {
        return vec![Outbound::to(
            sid,
            Payload::error("That account is already connected."),
        )];
    }

    let mut out = Vec::new();
    {
        let mut world = ctx.world.write().await;
        world.add_player(sid, user_id, None);
        let room_id = world.players[sid].room_id.clone();
        out.push(Outbound::to(
            sid,
            Payload::system(format!("Welcome back, {}!", bold(&display_name))),
        ));
        out.push(Outbound::to(
            sid,
            Payload::system(describe_room_for(&world, sid)),
        ));
        out.push(Outbound::room(
            room_id,
            Some(sid.to_string()),
            Payload::system(format!("{} appears.", display_name)),
        ));
    }
    let mut sessions = ctx.sessions.write().await;
    if let Some(session) = sessions.get_mut(sid) {
        session.state = SessionState::Playing;
    }
    tracing::info!("User '{}' logged in on session {}", display_name, sid);
    out
}

/// The `/auth` admin subcommands available while playing:
/// promote/demote/list_admins.
pub async fn handle_auth_command(ctx: &AppContext, sid: &str, rest: &str) -> Option<Vec<Outbound>> {
    let rest = rest.trim();
    let (sub, args) = match rest.split_once(char::is_whitespace) {
        Some((sub, args)) => (sub, args.trim()),
        None => (rest, ""),
    };

    match sub {
        "list_admins" => {
            let world = ctx.world.read().await;
            let mut admins: Vec<String> = world
                .users
                .values()
                .filter(|u| u.is_admin)
                .map(|u| u.display_name.clone())
                .collect();
            admins.sort();
            let result = ServiceResult::success(vec![Payload::system(format!(
                "Admins: {}",
                admins.join(", ")
            ))]);
            Some(deliver(sid, &result))
        }
        "promote" | "demote" => {
            let promote = sub == "promote";
            let mut world = ctx.world.write().await;
            let is_admin = world.user_for_sid(sid).map(|u| u.is_admin).unwrap_or(false);
            if !is_admin {
                return Some(deliver(
                    sid,
                    &ServiceResult::error("Only admins can change admin status."),
                ));
            }
            let result = match crate::resolve::resolve_or_err(
                args,
                world.users.values().map(|u| u.display_name.clone()),
            ) {
                Err(e) => ServiceResult::error(e),
                Ok(name) => {
                    let target_id = world.get_user_by_display_name(&name).map(|u| u.user_id);
                    match target_id {
                        None => ServiceResult::error(format!("No user named '{}'.", name)),
                        Some(uid) => {
                            world.users.get_mut(&uid).expect("looked up").is_admin = promote;
                            ServiceResult::success(vec![Payload::system(format!(
                                "{} is {} an admin.",
                                bold(&name),
                                if promote { "now" } else { "no longer" }
                            ))])
                        }
                    }
                }
            };
            if result.is_success() {
                ctx.persistence.save_world(&world, true);
            }
            Some(deliver(sid, &result))
        }
        // create/login while already playing fall through as unknown.
        _ => None,
    }
}
