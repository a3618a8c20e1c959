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

//! Notifications published by the asset manager for tools and UI listeners.

use crate::asset::{AssetPath, BundleName, PrimaryAssetId};

/// A notification about the state of primary assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetManagerEvent {
    /// Two distinct paths claimed the same identifier.
    DuplicateIdentifier {
        /// The contested identifier.
        id: PrimaryAssetId,
        /// The path registered first.
        existing_path: AssetPath,
        /// The path registered second.
        new_path: AssetPath,
        /// Whether the second registration replaced the first.
        accepted: bool,
    },
    /// A bundle state was committed as the current state of an identifier.
    BundleStateChanged {
        /// The identifier.
        id: PrimaryAssetId,
        /// The committed bundle names, sorted.
        bundles: Vec<BundleName>,
    },
    /// An identifier's current and pending states were cleared.
    Unloaded {
        /// The identifier.
        id: PrimaryAssetId,
    },
    /// A scan added or refreshed records.
    ScanCompleted {
        /// The scanned type.
        asset_type: String,
        /// The number of records added or updated.
        count: usize,
    },
}

/// Events kept by an [`EventBus`] created with [`EventBus::new`].
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// A thread-safe, bounded queue of events of type `T`.
///
/// The owner publishes and listeners [`drain`](Self::drain) everything published
/// so far. When nobody drains, the oldest events are dropped once the queue is
/// full. Clones share the same queue.
#[derive(Debug, Clone)]
pub struct EventBus<T: Send + 'static> {
    sender: flume::Sender<T>,
    receiver: flume::Receiver<T>,
    capacity: usize,
}

impl<T: Send + 'static> EventBus<T> {
    /// Creates a bus holding up to [`DEFAULT_EVENT_CAPACITY`] events.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Creates a bus holding up to `capacity` events (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = flume::bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Publishes `event`, dropping the oldest queued events to make room.
    pub fn publish(&self, mut event: T) {
        loop {
            match self.sender.try_send(event) {
                Ok(()) => return,
                Err(flume::TrySendError::Full(rejected)) => {
                    if self.receiver.try_recv().is_ok() {
                        log::trace!("EventBus: queue full, dropped the oldest event");
                    }
                    event = rejected;
                }
                Err(flume::TrySendError::Disconnected(_)) => {
                    log::error!("EventBus: failed to publish, the queue is closed");
                    return;
                }
            }
        }
    }

    /// Returns the maximum number of queued events.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of queued events.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Returns `true` if no event is queued.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Returns the receiving end.
    pub fn receiver(&self) -> &flume::Receiver<T> {
        &self.receiver
    }

    /// Removes and returns every event published so far, oldest first.
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }
}

impl<T: Send + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}
