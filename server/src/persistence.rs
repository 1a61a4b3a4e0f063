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

//! Persistence manager: the only authorized path to durable state.
//!
//! `save_world` serializes a snapshot synchronously (callers hold the world
//! guard for exactly that long) and performs the disk write outside any
//! critical section. Debounced saves coalesce per path: repeated calls
//! within the window reschedule the pending write and refresh its snapshot.
//! `flush_all_saves` drains everything pending, used on shutdown and at
//! critical moments (account creation, logout, purge). Failures are logged
//! and counted, never surfaced to players.

use crate::world::World;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Counters exposed for observability.
#[derive(Debug, Default)]
pub struct SaveStats {
    immediate: AtomicU64,
    debounced: AtomicU64,
    errors: AtomicU64,
}

/// Point-in-time view of the save counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveStatsSnapshot {
    pub immediate: u64,
    pub debounced: u64,
    pub errors: u64,
}

#[derive(Debug)]
struct PendingSave {
    snapshot: String,
    deadline: Instant,
}

#[derive(Debug)]
struct Shared {
    pending: Mutex<HashMap<PathBuf, PendingSave>>,
    stats: SaveStats,
}

/// Debounced + immediate world saves with per-path coalescing.
#[derive(Debug, Clone)]
pub struct PersistenceManager {
    default_path: PathBuf,
    debounce: Duration,
    shared: Arc<Shared>,
}

impl PersistenceManager {
    pub fn new(default_path: impl Into<PathBuf>, debounce_ms: u64) -> Self {
        Self {
            default_path: default_path.into(),
            debounce: Duration::from_millis(debounce_ms),
            shared: Arc::new(Shared {
                pending: Mutex::new(HashMap::new()),
                stats: SaveStats::default(),
            }),
        }
    }

    pub fn default_path(&self) -> &Path {
        &self.default_path
    }

    /// Request a save of `world` to the default path. The snapshot is taken
    /// before this returns; the write happens off the caller's critical
    /// section. `debounced = false` forces an immediate write.
    pub fn save_world(&self, world: &World, debounced: bool) {
        let path = self.default_path.clone();
        self.save_world_at(world, path, debounced)
    }

    /// As `save_world`, to an explicit path.
    pub fn save_world_at(&self, world: &World, path: PathBuf, debounced: bool) {
        let snapshot = world.to_json_string();
        if !debounced {
            self.shared.stats.immediate.fetch_add(1, Ordering::Relaxed);
            // Cancel any pending debounce for this path; the immediate write
            // supersedes it.
            {
                let mut pending = self.lock_pending();
                pending.remove(&path);
            }
            let shared = self.shared.clone();
            tokio::spawn(async move {
                shared.write_now(&path, &snapshot);
            });
            return;
        }

        self.shared.stats.debounced.fetch_add(1, Ordering::Relaxed);
        let deadline = Instant::now() + self.debounce;
        let arm_task = {
            let mut pending = self.lock_pending();
            let was_pending = pending.contains_key(&path);
            pending.insert(path.clone(), PendingSave { snapshot, deadline });
            !was_pending
        };
        if arm_task {
            let shared = self.shared.clone();
            tokio::spawn(async move {
                loop {
                    let wait = {
                        let pending = shared.lock_pending();
                        match pending.get(&path) {
                            // Flushed or superseded while we slept.
                            None => return,
                            Some(save) => save.deadline.saturating_duration_since(Instant::now()),
                        }
                    };
                    if wait.is_zero() {
                        break;
                    }
                    tokio::time::sleep(wait).await;
                }
                let taken = {
                    let mut pending = shared.lock_pending();
                    pending.remove(&path)
                };
                if let Some(save) = taken {
                    shared.write_now(&path, &save.snapshot);
                }
            });
        }
    }

    /// Write every pending snapshot immediately. Blocks briefly; used on
    /// shutdown and at critical moments.
    pub fn flush_all_saves(&self) {
        let drained: Vec<(PathBuf, PendingSave)> = {
            let mut pending = self.lock_pending();
            pending.drain().collect()
        };
        for (path, save) in drained {
            self.shared.write_now(&path, &save.snapshot);
        }
    }

    pub fn pending_count(&self) -> usize {
        self.lock_pending().len()
    }

    pub fn stats(&self) -> SaveStatsSnapshot {
        SaveStatsSnapshot {
            immediate: self.shared.stats.immediate.load(Ordering::Relaxed),
            debounced: self.shared.stats.debounced.load(Ordering::Relaxed),
            errors: self.shared.stats.errors.load(Ordering::Relaxed),
        }
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, PendingSave>> {
        self.shared.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Shared {
    fn lock_pending(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, PendingSave>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Atomic write: temp file in the target directory, then rename.
    fn write_now(&self, path: &Path, data: &str) {
        match write_atomic(path, data) {
            Ok(()) => {
                tracing::debug!("World saved to {}", path.display());
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                tracing::error!("Failed to save world to {}: {}", path.display(), e);
            }
        }
    }
}

fn write_atomic(path: &Path, data: &str) -> std::io::Result<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = dir {
        std::fs::create_dir_all(dir)?;
    }
    let dir = dir.unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
