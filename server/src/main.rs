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

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tinymud_server::config::{Arguments, Configuration};
use tinymud_server::context::AppContext;
use tinymud_server::goap::tick::spawn_tick_task;
use tinymud_server::listener::{run_listener, spawn_broadcast_pump, Gateway};
use tinymud_server::llm::LlmManager;
use tinymud_server::persistence::PersistenceManager;
use tinymud_server::validate::{audit_world, cleanup_world};
use tinymud_server::world::World;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load arguments from the command line
    let arguments: Arguments = Parser::parse();

    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .with_ansi(true)
        .init();

    // Load environment variables from .env file if specified
    if let Some(ref env_file) = arguments.env_file {
        if std::path::Path::new(env_file).exists() {
            tracing::debug!("Loading environment variables from file: {}", env_file);
            dotenv::from_filename(env_file).ok();
        }
    } else {
        tracing::debug!("Loading environment variables from default file");
        dotenv::dotenv().ok();
    }

    // Load configuration with environment variable substitution
    let config: Configuration =
        Configuration::load(&arguments.config_file).unwrap_or_else(|e| {
            tracing::warn!("Using default configuration ({})", e);
            Configuration::default()
        });
    tracing::debug!("Configuration loaded: {:?}", config);
    tracing::info!("Starting TinyMUD World Server...");

    // Load the world, applying all pending schema migrations. A corrupted
    // store that migrations cannot salvage is fatal: refuse to serve.
    let state_path = PathBuf::from(config.world.state_path.as_str());
    let mut world = match World::load(&state_path) {
        Ok(world) => world,
        Err(e) => {
            tracing::error!("Failed to load world from {}: {}", state_path.display(), e);
            return Err(format!("Failed to load world: {}", e).into());
        }
    };

    // Audit and repair integrity before serving.
    let notes = cleanup_world(&mut world);
    for note in &notes {
        tracing::info!("cleanup: {}", note);
    }
    let report = audit_world(&world);
    tracing::info!(
        "World audit: {} checks, health {:.1}%",
        report.checks,
        report.health_score
    );
    for issue in &report.issues {
        tracing::warn!("integrity: {}", issue);
    }

    // Assemble the application context.
    let persistence = PersistenceManager::new(&state_path, config.game.save_debounce_ms);
    let llm = LlmManager::from_config(&config.ai);
    if llm.is_configured() {
        tracing::info!("AI adapter configured");
    } else {
        tracing::info!("No AI adapter; deterministic fallback in use");
    }
    let ctx = AppContext::new(world, persistence, llm, config.game.clone());
    // Rate-limit state never survives a world load.
    ctx.limiter.reset_all();

    let gateway = Gateway::new();

    // World tick, gated by configuration.
    if ctx.game.tick_enable {
        let (tick_tx, tick_rx) = tokio::sync::mpsc::unbounded_channel();
        spawn_broadcast_pump(ctx.clone(), gateway.clone(), tick_rx);
        spawn_tick_task(ctx.clone(), tick_tx);
    } else {
        tracing::info!("World tick disabled");
    }

    // Flush pending saves on shutdown.
    {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutting down; flushing saves");
                {
                    let world = ctx.world.read().await;
                    ctx.persistence.save_world(&world, true);
                }
                ctx.persistence.flush_all_saves();
                std::process::exit(0);
            }
        });
    }

    // Serve.
    let listen_addr: SocketAddr = config.listener.addr.to_addr();
    tracing::info!("Binding listener to {}", listen_addr);
    let listener = TcpListener::bind(listen_addr).await?;
    tracing::info!("Listening on {}", listen_addr);
    run_listener(ctx, gateway, listener).await?;
    Ok(())
}
