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

//! TinyMUD World Server
//!
//! A multiplayer text-adventure server: clients connect over a framed-event
//! transport, authenticate, inhabit a shared in-memory world, and observe
//! each other's actions. NPCs run on a needs-driven planner under a
//! periodic world tick. State persists as a single JSON document behind a
//! debounced persistence facade.

pub mod commands;
pub mod config;
pub mod context;
pub mod goap;
pub mod listener;
pub mod llm;
pub mod permissions;
pub mod persistence;
pub mod ratelimit;
pub mod resolve;
pub mod service;
pub mod session;
pub mod services;
pub mod validate;
pub mod world;
