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

//! World-mutation services.
//!
//! Each service enforces the invariants of its entity family and returns
//! the uniform `ServiceResult`. Services never touch the transport or the
//! disk; routers deliver their results and request persistence through the
//! facade.

pub mod combat;
pub mod interaction;
pub mod look;
pub mod movement;
pub mod npc;
pub mod object;
pub mod room;
pub mod trade;
