// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The streaming state machine.
//!
//! Every asset record carries a *current* and a *pending* [`LoadState`](primus_data::LoadState).
//! [`StreamingStateMachine::change_bundle_state`] computes the bundle set each
//! identifier should end up with, reuses or supersedes what is already requested,
//! and asks the streaming engine for the rest. Completions are delivered back to
//! the owner thread as messages and applied by
//! [`StreamingStateMachine::process_completions`], which ignores completions of
//! handles that have been superseded in the meantime.

mod state_machine;

pub use state_machine::*;
