/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 *
 * Unless you explicitly state otherwise, any contribution intentionally
 * submitted for inclusion in the work by you, as defined in the Apache-2.0
 * license, shall be dual licensed as above, without any additional terms or
 * conditions.
 */

//! Runtime primitives for the call core: a cancellable one-shot timer and
//! task spawning, both on tokio.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::transport::TimerHandle;

/// A one-shot timer that runs a callback after a delay unless cleared first.
///
/// **Important:** A tokio runtime must be active when this is created.
pub struct TimeoutHandle {
    cleared: Arc<AtomicBool>,
    handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl TimeoutHandle {
    pub fn new<F: FnOnce() + Send + 'static>(delay: Duration, callback: F) -> Self {
        let cleared = Arc::new(AtomicBool::new(false));
        let cleared_task = cleared.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !cleared_task.load(Ordering::Acquire) {
                callback();
            }
        });
        Self {
            cleared,
            handle: Mutex::new(Some(handle)),
        }
    }

    pub fn is_cleared(&self) -> bool {
        self.cleared.load(Ordering::Acquire)
    }
}

impl TimerHandle for TimeoutHandle {
    fn clear(&self) {
        self.cleared.store(true, Ordering::Release);
        let handle = match self.handle.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

impl Drop for TimeoutHandle {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Spawn an async task on the tokio runtime.
pub fn spawn<F: Future<Output = ()> + Send + 'static>(future: F) {
    tokio::spawn(future);
}
