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

use super::{AssetLoaderRegistry, AssetSource};
use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use primus_core::asset::{AssetPath, LoadedAsset, WeakLoadedAsset};
use primus_core::streaming::{
    HandleId, LoadPriority, LoadRequest, StreamableHandle, StreamingEngine,
};
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// One path of one request, waiting for a worker.
struct Job {
    handle: StreamableHandle,
    path: AssetPath,
    priority: LoadPriority,
    sequence: u64,
}

impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Job {}

impl PartialOrd for Job {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Job {
    // Highest priority first, then oldest first.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

#[derive(Default)]
struct QueueState {
    jobs: BinaryHeap<Job>,
    shutdown: bool,
}

#[derive(Default)]
struct JobQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl JobQueue {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, job: Job) {
        self.lock().jobs.push(job);
        self.available.notify_one();
    }

    /// Blocks until a job is available. `None` once the queue shuts down.
    fn pop(&self) -> Option<Job> {
        let mut state = self.lock();
        loop {
            if state.shutdown {
                return None;
            }
            if let Some(job) = state.jobs.pop() {
                return Some(job);
            }
            state = self
                .available
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn shutdown(&self) {
        let mut state = self.lock();
        state.shutdown = true;
        state.jobs.clear();
        self.available.notify_all();
    }
}

/// A decoded path, sent from a worker back to the owner thread.
struct JobResult {
    handle: HandleId,
    path: AssetPath,
    object: Option<LoadedAsset>,
}

struct InFlight {
    handle: StreamableHandle,
    remaining: usize,
    loaded: HashMap<AssetPath, LoadedAsset>,
}

/// A streaming engine decoding payloads on a pool of worker threads.
///
/// Workers read bytes from an [`AssetSource`], decode them with the loader
/// registered for the asset class, and send the results back over a channel.
/// Handles are only ever completed by the thread calling
/// [`pump`](Self::pump) or [`wait`](Self::wait), so completion callbacks never
/// run on a worker. Synchronous requests wait inside
/// [`request_load`](StreamingEngine::request_load).
///
/// Queued paths are served highest priority first. Objects stay resident while
/// anything holds them, and a resident object satisfies later requests for its
/// path without touching a worker. A path that fails to load is logged and
/// left out of the handle's loaded objects; the handle still completes.
pub struct ThreadedStreamingEngine {
    queue: Arc<JobQueue>,
    results: Receiver<JobResult>,
    workers: Vec<JoinHandle<()>>,
    in_flight: Mutex<HashMap<HandleId, InFlight>>,
    resident: Mutex<HashMap<AssetPath, WeakLoadedAsset>>,
    sequence: AtomicU64,
}

impl std::fmt::Debug for ThreadedStreamingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadedStreamingEngine")
            .field("workers", &self.workers.len())
            .field("in_flight", &self.in_flight_count())
            .finish_non_exhaustive()
    }
}

impl ThreadedStreamingEngine {
    /// Starts `worker_count` workers (at least one) reading from `source`.
    pub fn new(
        source: Arc<dyn AssetSource>,
        loaders: AssetLoaderRegistry,
        worker_count: usize,
    ) -> Result<Self> {
        let queue = Arc::new(JobQueue::default());
        let loaders = Arc::new(loaders);
        let (result_tx, results) = crossbeam_channel::unbounded();

        let worker_count = worker_count.max(1);
        let mut workers = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let queue = Arc::clone(&queue);
            let source = Arc::clone(&source);
            let loaders = Arc::clone(&loaders);
            let result_tx = result_tx.clone();
            let worker = thread::Builder::new()
                .name(format!("primus-streaming-{index}"))
                .spawn(move || worker_loop(&queue, source.as_ref(), &loaders, &result_tx))
                .with_context(|| format!("Failed to spawn streaming worker {index}"))?;
            workers.push(worker);
        }

        log::info!("ThreadedStreamingEngine: started {worker_count} worker(s)");
        Ok(Self {
            queue,
            results,
            workers,
            in_flight: Mutex::new(HashMap::new()),
            resident: Mutex::new(HashMap::new()),
            sequence: AtomicU64::new(0),
        })
    }

    /// Returns the number of requests still waiting for a worker result.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns the number of paths in the resident cache, live or not yet pruned.
    pub fn resident_count(&self) -> usize {
        self.resident
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Completes every handle whose last path has been decoded.
    ///
    /// Returns the number of handles completed.
    pub fn pump(&self) -> usize {
        let mut completed = 0;
        while let Ok(result) = self.results.try_recv() {
            if self.apply(result) {
                completed += 1;
            }
        }
        completed
    }

    /// Pumps until `handle` is no longer loading.
    pub fn wait(&self, handle: &StreamableHandle) -> Result<()> {
        while handle.is_loading() {
            let result = self
                .results
                .recv()
                .map_err(|_| anyhow!("Every streaming worker has stopped"))?;
            self.apply(result);
        }
        Ok(())
    }

    /// Pumps until `handle` is no longer loading or `timeout` elapses.
    ///
    /// Returns `true` if the handle stopped loading in time.
    pub fn wait_timeout(&self, handle: &StreamableHandle, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while handle.is_loading() {
            match self.results.recv_deadline(deadline) {
                Ok(result) => {
                    self.apply(result);
                }
                Err(RecvTimeoutError::Timeout) => return false,
                Err(RecvTimeoutError::Disconnected) => {
                    log::error!("ThreadedStreamingEngine: every worker has stopped");
                    return false;
                }
            }
        }
        true
    }

    fn resident_object(&self, path: &AssetPath) -> Option<LoadedAsset> {
        let mut resident = self.resident.lock().unwrap_or_else(PoisonError::into_inner);
        match resident.get(path).and_then(WeakLoadedAsset::upgrade) {
            Some(object) => Some(object),
            None => {
                resident.remove(path);
                None
            }
        }
    }

    fn apply(&self, result: JobResult) -> bool {
        let finished = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            let Some(entry) = in_flight.get_mut(&result.handle) else {
                return false;
            };
            if let Some(object) = result.object {
                let mut resident = self.resident.lock().unwrap_or_else(PoisonError::into_inner);
                resident.retain(|_, weak| weak.is_alive());
                resident.insert(result.path.clone(), object.downgrade());
                entry.loaded.insert(result.path, object);
            }
            entry.remaining = entry.remaining.saturating_sub(1);
            if entry.remaining > 0 {
                return false;
            }
            in_flight.remove(&result.handle)
        };

        let Some(entry) = finished else {
            return false;
        };
        if !entry.handle.is_loading() {
            log::trace!(
                "ThreadedStreamingEngine: dropping results of canceled {}",
                entry.handle.debug_name()
            );
            return false;
        }
        log::trace!(
            "ThreadedStreamingEngine: {} loaded {} object(s)",
            entry.handle.debug_name(),
            entry.loaded.len()
        );
        entry.handle.complete(entry.loaded)
    }
}

impl StreamingEngine for ThreadedStreamingEngine {
    fn request_load(&self, request: LoadRequest) -> StreamableHandle {
        let handle = StreamableHandle::new(
            request.debug_name.clone(),
            request.paths.clone(),
            request.priority,
        );

        let mut seen = HashSet::new();
        let mut loaded = HashMap::new();
        let mut queued = Vec::new();
        for path in request.paths.iter().filter(|path| seen.insert(*path)) {
            match self.resident_object(path) {
                Some(object) => {
                    loaded.insert(path.clone(), object);
                }
                None => queued.push(path.clone()),
            }
        }

        log::debug!(
            "ThreadedStreamingEngine: {} queues {} path(s), {} resident",
            request.debug_name,
            queued.len(),
            loaded.len()
        );

        if queued.is_empty() {
            handle.complete(loaded);
            return handle;
        }

        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                handle.id(),
                InFlight {
                    handle: handle.clone(),
                    remaining: queued.len(),
                    loaded,
                },
            );
        for path in queued {
            self.queue.push(Job {
                handle: handle.clone(),
                path,
                priority: request.priority,
                sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
            });
        }

        if request.synchronous {
            if let Err(e) = self.wait(&handle) {
                log::error!("ThreadedStreamingEngine: {} never completed: {e}", request.debug_name);
            }
        }
        handle
    }

    fn find_object(&self, path: &AssetPath) -> Option<LoadedAsset> {
        self.resident_object(path)
    }
}

impl Drop for ThreadedStreamingEngine {
    fn drop(&mut self) {
        self.queue.shutdown();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("ThreadedStreamingEngine: a worker panicked");
            }
        }
    }
}

fn worker_loop(
    queue: &JobQueue,
    source: &dyn AssetSource,
    loaders: &AssetLoaderRegistry,
    results: &Sender<JobResult>,
) {
    while let Some(Job { handle, path, .. }) = queue.pop() {
        // The owner drops results of canceled handles anyway.
        let object = if handle.is_loading() {
            match load_path(source, loaders, &path) {
                Ok(object) => Some(object),
                Err(e) => {
                    log::warn!("ThreadedStreamingEngine: failed to load '{path}': {e:#}");
                    None
                }
            }
        } else {
            None
        };

        // Released before sending so the owner holds the last reference.
        let result = JobResult {
            handle: handle.id(),
            path,
            object,
        };
        drop(handle);
        if results.send(result).is_err() {
            break;
        }
    }
}

fn load_path(
    source: &dyn AssetSource,
    loaders: &AssetLoaderRegistry,
    path: &AssetPath,
) -> Result<LoadedAsset> {
    let class_name = source
        .class_name(path)
        .ok_or_else(|| anyhow!("No asset indexed at '{path}'"))?;
    let bytes = source.read(path)?;
    loaders.load(&class_name, &bytes)
}
