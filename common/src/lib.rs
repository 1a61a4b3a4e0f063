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

//! TinyMUD Common Types and Wire Contract
//!
//! This crate defines the types shared between the world server and any
//! client or transport front-end:
//! - Message payloads (`message`): the `{type, content, name?}` shape and
//!   the `[b]`/`[i]`/`[color]`/`[code]` markup conventions
//! - Session identifiers (`session`)

pub mod message;
pub mod session;

pub use message::{bold, code, color, italic, MessageType, Payload, MESSAGE_IN, MESSAGE_OUT};
pub use session::SessionId;

#[cfg(test)]
mod tests {

    #[test]
    fn it_works() {
        assert_eq!(2 + 2, 4);
    }
}
