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

//! Registry of every live media resource, with a single "stop everything"
//! pass used on leave, unmount and error paths.
//!
//! The registry is owned by whoever creates call sessions and handed to each
//! [`CallSessionController`](crate::CallSessionController) by clone. Every
//! clone shares the same sets, so a reclamation pass started from any of them
//! terminates resources created by all of them.
//!
//! Reclamation never fails. Each release step is isolated: an `Err` or a panic
//! from one handle is logged and the pass moves on to the next step.

use futures::FutureExt;
use log::{debug, info, warn};
use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::transport::{
    HardwareStream, LocalTrack, PlaybackSurface, SessionClient, TimerHandle, TransportError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    AudioProducer,
    VideoProducer,
    SessionClient,
    HardwareStream,
    Timer,
}

/// Opaque identity of a registered handle (its allocation address).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ResourceKey(usize);

impl ResourceKey {
    pub fn of<T: ?Sized>(handle: &Arc<T>) -> Self {
        ResourceKey(Arc::as_ptr(handle).cast::<()>() as usize)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:x}", self.0)
    }
}

/// A handle to register, tagged with its kind.
#[derive(Clone)]
pub enum MediaResource {
    AudioProducer(Arc<dyn LocalTrack>),
    VideoProducer(Arc<dyn LocalTrack>),
    SessionClient(Arc<dyn SessionClient>),
    HardwareStream(Arc<dyn HardwareStream>),
    Timer(Arc<dyn TimerHandle>),
}

impl MediaResource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            MediaResource::AudioProducer(_) => ResourceKind::AudioProducer,
            MediaResource::VideoProducer(_) => ResourceKind::VideoProducer,
            MediaResource::SessionClient(_) => ResourceKind::SessionClient,
            MediaResource::HardwareStream(_) => ResourceKind::HardwareStream,
            MediaResource::Timer(_) => ResourceKind::Timer,
        }
    }

    pub fn key(&self) -> ResourceKey {
        match self {
            MediaResource::AudioProducer(h) | MediaResource::VideoProducer(h) => ResourceKey::of(h),
            MediaResource::SessionClient(h) => ResourceKey::of(h),
            MediaResource::HardwareStream(h) => ResourceKey::of(h),
            MediaResource::Timer(h) => ResourceKey::of(h),
        }
    }
}

impl fmt::Debug for MediaResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self.kind(), self.key())
    }
}

#[derive(Default)]
struct Registry {
    audio_producers: HashMap<ResourceKey, Arc<dyn LocalTrack>>,
    video_producers: HashMap<ResourceKey, Arc<dyn LocalTrack>>,
    session_clients: HashMap<ResourceKey, Arc<dyn SessionClient>>,
    hardware_streams: HashMap<ResourceKey, Arc<dyn HardwareStream>>,
    timers: HashMap<ResourceKey, Arc<dyn TimerHandle>>,
}

impl Registry {
    fn is_empty(&self) -> bool {
        self.audio_producers.is_empty()
            && self.video_producers.is_empty()
            && self.session_clients.is_empty()
            && self.hardware_streams.is_empty()
            && self.timers.is_empty()
    }
}

fn sorted_keys<V>(map: &HashMap<ResourceKey, V>) -> Vec<ResourceKey> {
    let mut keys: Vec<ResourceKey> = map.keys().copied().collect();
    keys.sort();
    keys
}

/// Detached copy of the registry contents. Mutating it has no effect on the
/// reclaimer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceStatus {
    pub audio_producers: Vec<ResourceKey>,
    pub video_producers: Vec<ResourceKey>,
    pub session_clients: Vec<ResourceKey>,
    pub hardware_streams: Vec<ResourceKey>,
    pub timers: Vec<ResourceKey>,
}

impl ResourceStatus {
    pub fn count(&self, kind: ResourceKind) -> usize {
        match kind {
            ResourceKind::AudioProducer => self.audio_producers.len(),
            ResourceKind::VideoProducer => self.video_producers.len(),
            ResourceKind::SessionClient => self.session_clients.len(),
            ResourceKind::HardwareStream => self.hardware_streams.len(),
            ResourceKind::Timer => self.timers.len(),
        }
    }

    pub fn total(&self) -> usize {
        self.audio_producers.len()
            + self.video_producers.len()
            + self.session_clients.len()
            + self.hardware_streams.len()
            + self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Outcome counters of one reclamation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReclaimReport {
    /// Release steps attempted.
    pub attempted: usize,
    /// Steps that returned an error or panicked.
    pub failed: usize,
}

impl ReclaimReport {
    fn record(&mut self, ok: bool) {
        self.attempted += 1;
        if !ok {
            self.failed += 1;
        }
    }

    fn merge(&mut self, other: ReclaimReport) {
        self.attempted += other.attempted;
        self.failed += other.failed;
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run one synchronous release step, swallowing errors and panics.
pub(crate) fn guard<F>(step: &str, key: ResourceKey, f: F) -> bool
where
    F: FnOnce() -> Result<(), TransportError>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => {
            debug!("{step} {key} ok");
            true
        }
        Ok(Err(e)) => {
            warn!("{step} {key} failed: {e}");
            false
        }
        Err(payload) => {
            warn!("{step} {key} panicked: {}", panic_message(payload));
            false
        }
    }
}

/// Async variant of [`guard`]: rejected futures and panics while polling are
/// both swallowed.
pub(crate) async fn guard_async<Fut>(step: &str, key: ResourceKey, fut: Fut) -> bool
where
    Fut: Future<Output = Result<(), TransportError>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(Ok(())) => {
            debug!("{step} {key} ok");
            true
        }
        Ok(Err(e)) => {
            warn!("{step} {key} failed: {e}");
            false
        }
        Err(payload) => {
            warn!("{step} {key} panicked: {}", panic_message(payload));
            false
        }
    }
}

/// Shared registry of media resources. See the module docs.
#[derive(Clone, Default)]
pub struct ResourceReclaimer {
    registry: Arc<Mutex<Registry>>,
    surface: Option<Arc<dyn PlaybackSurface>>,
}

impl ResourceReclaimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A reclaimer whose last phase silences the elements of `surface`.
    pub fn with_playback_surface(surface: Arc<dyn PlaybackSurface>) -> Self {
        Self {
            registry: Arc::default(),
            surface: Some(surface),
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a resource to the set for its kind. Returns `false` if the same
    /// handle was already registered; that is not an error.
    pub fn register(&self, resource: MediaResource) -> bool {
        let key = resource.key();
        let kind = resource.kind();
        let mut registry = self.registry();
        let inserted = match resource {
            MediaResource::AudioProducer(h) => registry.audio_producers.insert(key, h).is_none(),
            MediaResource::VideoProducer(h) => registry.video_producers.insert(key, h).is_none(),
            MediaResource::SessionClient(h) => registry.session_clients.insert(key, h).is_none(),
            MediaResource::HardwareStream(h) => {
                registry.hardware_streams.insert(key, h).is_none()
            }
            MediaResource::Timer(h) => registry.timers.insert(key, h).is_none(),
        };
        if inserted {
            debug!("registered {kind:?} {key}");
        }
        inserted
    }

    pub fn is_registered(&self, resource: &MediaResource) -> bool {
        let key = resource.key();
        let registry = self.registry();
        match resource.kind() {
            ResourceKind::AudioProducer => registry.audio_producers.contains_key(&key),
            ResourceKind::VideoProducer => registry.video_producers.contains_key(&key),
            ResourceKind::SessionClient => registry.session_clients.contains_key(&key),
            ResourceKind::HardwareStream => registry.hardware_streams.contains_key(&key),
            ResourceKind::Timer => registry.timers.contains_key(&key),
        }
    }

    /// Take a resource out of the registry without releasing it.
    ///
    /// Returns `true` if it was registered, in which case the caller now owns
    /// its release. `false` means a pass already drained it (or it was never
    /// registered) and the caller must not release it again.
    pub fn forget(&self, resource: &MediaResource) -> bool {
        let key = resource.key();
        let mut registry = self.registry();
        let removed = match resource.kind() {
            ResourceKind::AudioProducer => registry.audio_producers.remove(&key).is_some(),
            ResourceKind::VideoProducer => registry.video_producers.remove(&key).is_some(),
            ResourceKind::SessionClient => registry.session_clients.remove(&key).is_some(),
            ResourceKind::HardwareStream => registry.hardware_streams.remove(&key).is_some(),
            ResourceKind::Timer => registry.timers.remove(&key).is_some(),
        };
        if removed {
            debug!("forgot {:?} {key}", resource.kind());
        }
        removed
    }

    pub fn status(&self) -> ResourceStatus {
        let registry = self.registry();
        ResourceStatus {
            audio_producers: sorted_keys(&registry.audio_producers),
            video_producers: sorted_keys(&registry.video_producers),
            session_clients: sorted_keys(&registry.session_clients),
            hardware_streams: sorted_keys(&registry.hardware_streams),
            timers: sorted_keys(&registry.timers),
        }
    }

    /// Stop and release every registered resource.
    ///
    /// The sets are drained up front, so a resource is released at most once
    /// even when passes overlap. The registry is empty on return only with
    /// respect to what was registered when the pass started: resources
    /// registered while it runs (for example from inside a session client's
    /// `leave`) are left for the next pass. Use
    /// [`clear_all_resources`](Self::clear_all_resources) to pick those up too.
    pub async fn force_stop_all(&self) -> ReclaimReport {
        let drained = std::mem::take(&mut *self.registry());
        let mut report = ReclaimReport::default();
        info!(
            "reclaiming resources: {} audio, {} video, {} clients, {} streams, {} timers",
            drained.audio_producers.len(),
            drained.video_producers.len(),
            drained.session_clients.len(),
            drained.hardware_streams.len(),
            drained.timers.len()
        );

        // 1. audio producers
        for (key, track) in &drained.audio_producers {
            report.record(guard("stop audio producer", *key, || track.stop()));
            report.record(guard("close audio producer", *key, || track.close()));
        }

        // 2. video producers
        for (key, track) in &drained.video_producers {
            report.record(guard("stop video producer", *key, || track.stop()));
            report.record(guard("close video producer", *key, || track.close()));
        }

        // 3. Disable the hardware tracks directly. Must come after stop/close
        //    and must not go through LocalTrack::set_enabled.
        for (key, track) in drained
            .audio_producers
            .iter()
            .chain(drained.video_producers.iter())
        {
            report.record(guard("disable underlying track", *key, || {
                if let Some(hw) = track.try_get_underlying_track() {
                    hw.set_enabled(false);
                }
                Ok(())
            }));
        }

        // 3b. raw hardware streams
        for (key, stream) in &drained.hardware_streams {
            let tracks = match panic::catch_unwind(AssertUnwindSafe(|| stream.tracks())) {
                Ok(tracks) => tracks,
                Err(payload) => {
                    warn!(
                        "reclaim: list stream tracks {key} panicked: {}",
                        panic_message(payload)
                    );
                    report.record(false);
                    continue;
                }
            };
            for hw in tracks {
                report.record(guard("stop stream track", *key, || {
                    hw.set_enabled(false);
                    hw.stop();
                    Ok(())
                }));
            }
        }

        // 4. session clients
        for (key, client) in &drained.session_clients {
            report.record(guard("remove listeners", *key, || {
                client.remove_all_listeners();
                Ok(())
            }));
            report.record(guard_async("leave session", *key, client.leave()).await);
        }

        // 5. timers
        for (key, timer) in &drained.timers {
            report.record(guard("clear timer", *key, || {
                timer.clear();
                Ok(())
            }));
        }

        // 6. playback elements
        if let Some(surface) = &self.surface {
            match panic::catch_unwind(AssertUnwindSafe(|| surface.playback_elements())) {
                Ok(elements) => {
                    for element in elements {
                        let key = ResourceKey::of(&element);
                        report.record(guard("silence playback element", key, || {
                            element.mute();
                            element.pause();
                            element.reset_position();
                            Ok(())
                        }));
                    }
                }
                Err(payload) => {
                    warn!(
                        "reclaim: list playback elements panicked: {}",
                        panic_message(payload)
                    );
                    report.record(false);
                }
            }
        }

        if report.failed > 0 {
            warn!(
                "reclamation finished with {}/{} failed steps",
                report.failed, report.attempted
            );
        } else {
            debug!("reclamation finished, {} steps", report.attempted);
        }
        report
    }

    /// [`force_stop_all`](Self::force_stop_all), then a second pass for
    /// anything registered while the first one was running.
    pub async fn clear_all_resources(&self) -> ReclaimReport {
        let mut report = self.force_stop_all().await;
        if !self.registry().is_empty() {
            info!("resources registered during reclamation, running a second pass");
            report.merge(self.force_stop_all().await);
        }
        report
    }
}

impl fmt::Debug for ResourceReclaimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceReclaimer")
            .field("status", &self.status())
            .field("has_playback_surface", &self.surface.is_some())
            .finish()
    }
}
