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

use futures::StreamExt;
use huddle_token_client::{with_retry, ApiError};
use huddle_types::RtcTokenRequest;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::credential::{CredentialIssuer, JoinCredential};
use super::remote::{RemoteParticipant, RemoteParticipantInfo};
use super::state::CallState;
use crate::config::CallSessionOptions;
use crate::error::CallError;
use crate::event_bus::EventBus;
use crate::events::{ClientEvent, RemoteParticipantChange};
use crate::identity::normalize_identity;
use crate::media_devices::{DeviceEnumerator, MediaDeviceList};
use crate::platform::{self, TimeoutHandle};
use crate::reclaimer::{
    guard, guard_async, MediaResource, ReclaimReport, ResourceKey, ResourceReclaimer,
};
use crate::transport::{
    LocalTrack, MediaKind, MediaTransport, ParticipantEvent, ParticipantStream, RemoteTrack,
    SessionClient, TimerHandle, TransportError,
};

/// Local producers acquired by
/// [`create_local_tracks`](CallSessionController::create_local_tracks).
/// A missing handle means that device could not be opened.
#[derive(Clone, Default)]
pub struct LocalTracks {
    pub audio: Option<Arc<dyn LocalTrack>>,
    pub video: Option<Arc<dyn LocalTrack>>,
}

impl LocalTracks {
    pub fn is_empty(&self) -> bool {
        self.audio.is_none() && self.video.is_none()
    }
}

impl fmt::Debug for LocalTracks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTracks")
            .field("audio", &self.audio.is_some())
            .field("video", &self.video.is_some())
            .finish()
    }
}

/// Enabled flag of a local producer, as reported by the toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalMediaState {
    /// There is no producer for this media.
    Unavailable,
    Enabled,
    Disabled,
}

impl LocalMediaState {
    fn of(track: Option<&Arc<dyn LocalTrack>>) -> Self {
        match track {
            None => LocalMediaState::Unavailable,
            Some(track) if track.is_enabled() => LocalMediaState::Enabled,
            Some(_) => LocalMediaState::Disabled,
        }
    }
}

/// Serializable view of a session, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub room_id: String,
    pub local_identity: String,
    pub state: CallState,
    pub has_credential: bool,
    pub local_audio: LocalMediaState,
    pub local_video: LocalMediaState,
    /// Sorted by identity.
    pub remote_participants: Vec<RemoteParticipantInfo>,
}

#[derive(Default)]
struct SessionState {
    state: CallState,
    credential: Option<JoinCredential>,
    local_audio: Option<Arc<dyn LocalTrack>>,
    local_video: Option<Arc<dyn LocalTrack>>,
    session_client: Option<Arc<dyn SessionClient>>,
    remote_participants: HashMap<String, RemoteParticipant>,
    expiry_timer: Option<Arc<TimeoutHandle>>,
}

struct Inner {
    session_id: String,
    local_identity: String,
    options: CallSessionOptions,
    transport: Arc<dyn MediaTransport>,
    devices: Arc<dyn DeviceEnumerator>,
    issuer: Arc<dyn CredentialIssuer>,
    reclaimer: ResourceReclaimer,
    events: EventBus,
    state: Mutex<SessionState>,
    // Serializes acquire, join and leave.
    op_gate: tokio::sync::Mutex<()>,
    participants: tokio::sync::Mutex<Option<ParticipantStream>>,
    cancel: CancellationToken,
    leave_requested: AtomicBool,
}

/// One call attempt: local media, join credential, room membership and remote
/// participants.
///
/// Construct it with [`new`](Self::new), then typically call
/// [`create_local_tracks`](Self::create_local_tracks), [`join`](Self::join)
/// and [`publish`](Self::publish), and finally [`leave`](Self::leave). Every
/// resource the controller creates is registered with the shared
/// [`ResourceReclaimer`] as soon as it exists, so a reclamation pass started
/// anywhere terminates it even if this controller is gone.
///
/// The controller is cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct CallSessionController {
    inner: Arc<Inner>,
}

impl CallSessionController {
    /// Constructor for the controller.
    ///
    /// See [`CallSessionOptions`] for the options. The identity is normalized
    /// here, once, and used for both the token request and the SDK join.
    pub fn new(
        options: CallSessionOptions,
        transport: Arc<dyn MediaTransport>,
        devices: Arc<dyn DeviceEnumerator>,
        issuer: Arc<dyn CredentialIssuer>,
        reclaimer: ResourceReclaimer,
        events: EventBus,
    ) -> Self {
        let local_identity = normalize_identity(options.identity.as_ref());
        let session_id = Uuid::new_v4().to_string();
        debug!(
            "created call session {session_id} for room '{}' as {local_identity}",
            options.room_id
        );
        Self {
            inner: Arc::new(Inner {
                session_id,
                local_identity,
                options,
                transport,
                devices,
                issuer,
                reclaimer,
                events,
                state: Mutex::new(SessionState::default()),
                op_gate: tokio::sync::Mutex::new(()),
                participants: tokio::sync::Mutex::new(None),
                cancel: CancellationToken::new(),
                leave_requested: AtomicBool::new(false),
            }),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    pub fn room_id(&self) -> &str {
        &self.inner.options.room_id
    }

    pub fn local_identity(&self) -> &str {
        &self.inner.local_identity
    }

    pub fn state(&self) -> CallState {
        self.inner.lock_state().state
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn reclaimer(&self) -> &ResourceReclaimer {
        &self.inner.reclaimer
    }

    pub fn local_tracks(&self) -> LocalTracks {
        let s = self.inner.lock_state();
        LocalTracks {
            audio: s.local_audio.clone(),
            video: s.local_video.clone(),
        }
    }

    /// The cached credential, if one was fetched and not reset.
    pub fn credential(&self) -> Option<JoinCredential> {
        self.inner.lock_state().credential.clone()
    }

    /// Acquire the microphone, then the camera.
    ///
    /// Each device is tried independently; a device that cannot be opened is
    /// reported as a missing handle (and an
    /// [`AcquisitionFailed`](ClientEvent::AcquisitionFailed) event), not as an
    /// error. If the default camera fails, the video inputs are enumerated
    /// and the first one is tried. When neither handle can be acquired the
    /// session moves to FAILED.
    ///
    /// Handles kept from an earlier attempt are reused, so calling this again
    /// from FAILED only retries the missing device.
    pub async fn create_local_tracks(&self) -> Result<LocalTracks, CallError> {
        self.ensure_not_leaving()?;
        {
            let mut s = self.inner.lock_state();
            self.inner
                .transition(&mut s, CallState::Acquiring, "acquire local tracks")?;
        }
        let _gate = self.inner.op_gate.lock().await;

        let existing = self.local_tracks();
        let audio = match existing.audio {
            Some(track) => Some(track),
            None => self.acquire_audio().await,
        };
        let video = if self.inner.cancel.is_cancelled() {
            existing.video
        } else {
            match existing.video {
                Some(track) => Some(track),
                None => self.acquire_video().await,
            }
        };

        let mut s = self.inner.lock_state();
        // Stored even when cancelled, so leave() stops them.
        s.local_audio = audio.clone();
        s.local_video = video.clone();
        if self.inner.cancel.is_cancelled() {
            return Err(CallError::Cancelled);
        }

        let tracks = LocalTracks { audio, video };
        let next = if tracks.is_empty() {
            CallState::Failed
        } else {
            CallState::ReadyToJoin
        };
        self.inner
            .transition(&mut s, next, "finish local track acquisition")?;
        drop(s);

        self.inner.events.emit(ClientEvent::LocalTracksCreated {
            audio: tracks.audio.is_some(),
            video: tracks.video.is_some(),
        });
        Ok(tracks)
    }

    async fn acquire_audio(&self) -> Option<Arc<dyn LocalTrack>> {
        match self.inner.transport.create_audio_producer().await {
            Ok(track) => {
                self.inner
                    .reclaimer
                    .register(MediaResource::AudioProducer(track.clone()));
                debug!("microphone acquired");
                Some(track)
            }
            Err(e) => {
                warn!("microphone unavailable: {e}");
                self.acquisition_failed(MediaKind::Audio, &e);
                None
            }
        }
    }

    async fn acquire_video(&self) -> Option<Arc<dyn LocalTrack>> {
        let result = match self.inner.transport.create_video_producer(None).await {
            Ok(track) => Ok(track),
            Err(e) => {
                warn!("default camera unavailable ({e}), trying enumerated video inputs");
                self.open_first_video_input().await
            }
        };
        match result {
            Ok(track) => {
                self.inner
                    .reclaimer
                    .register(MediaResource::VideoProducer(track.clone()));
                debug!("camera acquired");
                Some(track)
            }
            Err(e) => {
                warn!("camera unavailable: {e}");
                self.acquisition_failed(MediaKind::Video, &e);
                None
            }
        }
    }

    async fn open_first_video_input(&self) -> Result<Arc<dyn LocalTrack>, TransportError> {
        let devices = MediaDeviceList::load(self.inner.devices.as_ref()).await?;
        let device_id = devices.video_inputs.selected().ok_or_else(|| {
            TransportError::DeviceUnavailable("no video input found".to_string())
        })?;
        debug!("retrying camera with device {device_id}");
        self.inner
            .transport
            .create_video_producer(Some(device_id))
            .await
    }

    fn acquisition_failed(&self, media: MediaKind, e: &TransportError) {
        self.inner.events.emit(ClientEvent::AcquisitionFailed {
            media,
            reason: e.to_string(),
        });
    }

    /// Get a join credential for this session's room.
    ///
    /// A cached credential is returned as long as it is for the same room and
    /// not expired. Otherwise the issuer is called with the configured retry
    /// policy: network failures and 5xx responses are retried, 4xx responses
    /// are not.
    pub async fn fetch_join_credential(&self) -> Result<JoinCredential, CallError> {
        self.ensure_not_leaving()?;
        let room_id = &self.inner.options.room_id;
        if let Some(cached) = self
            .inner
            .lock_state()
            .credential
            .as_ref()
            .filter(|c| c.is_valid_for(room_id))
        {
            debug!("using cached credential for room '{room_id}'");
            return Ok(cached.clone());
        }

        let request = RtcTokenRequest {
            room_name: room_id.clone(),
            account: self.inner.local_identity.clone(),
            role: self.inner.options.token_role,
        };
        let request = &request;
        let issuer = self.inner.issuer.as_ref();
        let fetch = with_retry(
            &self.inner.options.retry,
            move |_| issuer.issue(request),
            ApiError::is_retryable,
        );
        let response = tokio::select! {
            biased;
            _ = self.inner.cancel.cancelled() => return Err(CallError::Cancelled),
            result = fetch => result.map_err(|e| {
                error!("credential fetch for room '{room_id}' failed: {e}");
                e
            })?,
        };

        let credential = JoinCredential::new(room_id.clone(), response);
        let mut s = self.inner.lock_state();
        if self.inner.cancel.is_cancelled() {
            return Err(CallError::Cancelled);
        }
        s.credential = Some(credential.clone());
        info!(
            "credential for room '{room_id}' fetched, expires in {}s",
            credential.expires_in_seconds
        );
        Ok(credential)
    }

    /// Drop the cached credential; the next join fetches a new one.
    pub fn reset_credential(&self) {
        self.inner.lock_state().credential = None;
    }

    /// Join the room.
    ///
    /// A no-op while the session is already JOINING, JOINED or ACTIVE. On
    /// failure the session moves to FAILED and the local tracks are kept, so
    /// `join()` can be retried.
    pub async fn join(&self) -> Result<(), CallError> {
        self.ensure_not_leaving()?;
        {
            let mut s = self.inner.lock_state();
            if s.state.is_in_room() {
                debug!("join ignored, session is {}", s.state);
                return Ok(());
            }
            self.inner.transition(&mut s, CallState::Joining, "join")?;
        }
        let _gate = self.inner.op_gate.lock().await;
        if self.inner.cancel.is_cancelled() {
            debug!("join of room '{}' cancelled before it started", self.room_id());
            return Err(CallError::Cancelled);
        }

        match self.join_room().await {
            Ok(()) => Ok(()),
            // leave() raced the join; it owns the teardown.
            Err(_) if self.inner.cancel.is_cancelled() => Err(CallError::Cancelled),
            Err(e) => {
                if !matches!(e, CallError::Cancelled) {
                    error!("join of room '{}' failed: {e}", self.room_id());
                    self.inner.fail();
                    self.inner.events.emit(ClientEvent::JoinFailed(e.to_string()));
                }
                Err(e)
            }
        }
    }

    async fn join_room(&self) -> Result<(), CallError> {
        let existing = self.inner.lock_state().session_client.clone();
        let client = match existing {
            Some(client) => client,
            None => {
                let client = self.inner.transport.create_session_client();
                self.inner
                    .reclaimer
                    .register(MediaResource::SessionClient(client.clone()));
                self.inner.lock_state().session_client = Some(client.clone());
                client
            }
        };

        let credential = self.fetch_join_credential().await?;
        let app_id = if self.inner.options.app_id.is_empty() {
            credential.app_id.as_str()
        } else {
            self.inner.options.app_id.as_str()
        };

        let stream = tokio::select! {
            biased;
            _ = self.inner.cancel.cancelled() => return Err(CallError::Cancelled),
            result = client.join(app_id, self.room_id(), &credential.token, self.local_identity()) => result?,
        };

        {
            let mut s = self.inner.lock_state();
            if self.inner.cancel.is_cancelled() {
                return Err(CallError::Cancelled);
            }
            self.inner.transition(&mut s, CallState::Joined, "join")?;
        }
        *self.inner.participants.lock().await = Some(stream);
        self.schedule_expiry_warning(&credential);

        info!(
            "joined room '{}' as {}",
            self.room_id(),
            self.local_identity()
        );
        self.inner.events.emit(ClientEvent::Joined {
            room_id: self.room_id().to_string(),
            identity: self.local_identity().to_string(),
        });
        Ok(())
    }

    fn schedule_expiry_warning(&self, credential: &JoinCredential) {
        let Some(expires_at) = credential.expires_at() else {
            return;
        };
        let margin = self.inner.options.expiry_margin;
        let delay = expires_at
            .saturating_duration_since(Instant::now())
            .saturating_sub(margin);
        let expires_in_seconds = margin.as_secs().min(credential.expires_in_seconds);
        let events = self.inner.events.clone();
        let room_id = credential.room_id.clone();
        let timer = Arc::new(TimeoutHandle::new(delay, move || {
            warn!("credential for room '{room_id}' expires in {expires_in_seconds}s");
            events.emit(ClientEvent::CredentialExpiring {
                room_id,
                expires_in_seconds,
            });
        }));
        self.inner
            .reclaimer
            .register(MediaResource::Timer(timer.clone()));
        debug!("credential expiry warning in {}s", delay.as_secs());

        let previous = self.inner.lock_state().expiry_timer.replace(timer);
        if let Some(previous) = previous {
            if self
                .inner
                .reclaimer
                .forget(&MediaResource::Timer(previous.clone()))
            {
                previous.clear();
            }
        }
    }

    /// Publish whichever local tracks exist. Publishing zero tracks is valid.
    pub async fn publish(&self) -> Result<(), CallError> {
        self.ensure_not_leaving()?;
        let (client, tracks) = {
            let s = self.inner.lock_state();
            let client = match (s.state, &s.session_client) {
                (CallState::Joined | CallState::Active, Some(client)) => client.clone(),
                (state, _) => {
                    return Err(CallError::InvalidState {
                        operation: "publish",
                        state,
                    })
                }
            };
            let tracks: Vec<Arc<dyn LocalTrack>> = s
                .local_audio
                .iter()
                .chain(s.local_video.iter())
                .cloned()
                .collect();
            (client, tracks)
        };

        if let Err(e) = client.publish(&tracks).await {
            error!("publish failed: {e}");
            self.inner.fail();
            self.inner.events.emit(ClientEvent::PublishFailed(e.to_string()));
            return Err(e.into());
        }

        let (audio, video) = {
            let mut s = self.inner.lock_state();
            if s.state == CallState::Joined {
                self.inner.transition(&mut s, CallState::Active, "publish")?;
            }
            (s.local_audio.is_some(), s.local_video.is_some())
        };
        info!("published {} local track(s)", tracks.len());
        self.inner
            .events
            .emit(ClientEvent::Published { audio, video });
        Ok(())
    }

    /// Mute (`Some(true)`), unmute (`Some(false)`) or flip (`None`) the
    /// microphone. Returns once the producer reports the new flag;
    /// [`LocalMediaState::Unavailable`] if there is no microphone.
    pub async fn toggle_mute(&self, muted: Option<bool>) -> Result<LocalMediaState, CallError> {
        self.ensure_not_leaving()?;
        let track = self.inner.lock_state().local_audio.clone();
        let Some(track) = track else {
            debug!("toggle_mute ignored, no microphone");
            return Ok(LocalMediaState::Unavailable);
        };
        let muted = muted.unwrap_or_else(|| track.is_enabled());
        track.set_enabled(!muted).await?;
        self.inner.events.emit(ClientEvent::MuteChanged { muted });
        Ok(LocalMediaState::of(Some(&track)))
    }

    /// Turn the camera off (`Some(true)`), on (`Some(false)`) or flip it
    /// (`None`). [`LocalMediaState::Unavailable`] if there is no camera.
    pub async fn toggle_camera(
        &self,
        camera_off: Option<bool>,
    ) -> Result<LocalMediaState, CallError> {
        self.ensure_not_leaving()?;
        let track = self.inner.lock_state().local_video.clone();
        let Some(track) = track else {
            debug!("toggle_camera ignored, no camera");
            return Ok(LocalMediaState::Unavailable);
        };
        let camera_off = camera_off.unwrap_or_else(|| track.is_enabled());
        track.set_enabled(!camera_off).await?;
        self.inner
            .events
            .emit(ClientEvent::CameraChanged { camera_off });
        Ok(LocalMediaState::of(Some(&track)))
    }

    /// Returns the identities of the remote participants, sorted.
    pub fn remote_participants(&self) -> Vec<RemoteParticipantInfo> {
        let s = self.inner.lock_state();
        let mut participants: Vec<_> = s
            .remote_participants
            .iter()
            .map(|(identity, p)| RemoteParticipantInfo::new(identity, p))
            .collect();
        participants.sort_by(|a, b| a.identity.cmp(&b.identity));
        participants
    }

    /// Wait for the next participant event and apply it.
    ///
    /// Published producers are subscribed through the session client. Returns
    /// `None` once the participant stream ends, the session leaves, or there is
    /// no stream (not joined).
    pub async fn next_remote_event(&self) -> Option<RemoteParticipantChange> {
        let mut participants = self.inner.participants.lock().await;
        if participants.is_none() {
            *participants = self.resubscribe();
        }
        loop {
            let stream = participants.as_mut()?;
            let event = tokio::select! {
                biased;
                _ = self.inner.cancel.cancelled() => return None,
                event = stream.next() => event,
            };
            let Some(event) = event else {
                debug!("participant stream ended");
                *participants = None;
                return None;
            };
            if let Some(change) = self.apply_participant_event(event).await {
                self.inner
                    .events
                    .emit(ClientEvent::RemoteParticipant(change.clone()));
                return Some(change);
            }
        }
    }

    fn resubscribe(&self) -> Option<ParticipantStream> {
        let s = self.inner.lock_state();
        match (s.state, &s.session_client) {
            (CallState::Joined | CallState::Active, Some(client)) => client.resubscribe(),
            _ => None,
        }
    }

    async fn apply_participant_event(
        &self,
        event: ParticipantEvent,
    ) -> Option<RemoteParticipantChange> {
        match event {
            ParticipantEvent::Published { identity, media } => {
                let client = self.inner.lock_state().session_client.clone()?;
                let track = match client.subscribe(&identity, media).await {
                    Ok(track) => track,
                    Err(e) => {
                        warn!("subscribing to {media} of {identity} failed: {e}");
                        return None;
                    }
                };
                let replaced = {
                    let mut s = self.inner.lock_state();
                    if s.state == CallState::Left {
                        Some(track)
                    } else {
                        s.remote_participants
                            .entry(identity.clone())
                            .or_default()
                            .set(media, track)
                    }
                };
                if let Some(stale) = replaced {
                    stop_remote(&stale);
                }
                debug!("subscribed to {media} of {identity}");
                Some(RemoteParticipantChange::Published { identity, media })
            }
            ParticipantEvent::Unpublished { identity, media } => {
                let track = self
                    .inner
                    .lock_state()
                    .remote_participants
                    .get_mut(&identity)
                    .and_then(|p| p.take(media))?;
                stop_remote(&track);
                Some(RemoteParticipantChange::Unpublished { identity, media })
            }
            ParticipantEvent::Left { identity } => {
                let participant = self
                    .inner
                    .lock_state()
                    .remote_participants
                    .remove(&identity)?;
                participant.into_tracks().for_each(|t| stop_remote(&t));
                info!("participant {identity} left");
                Some(RemoteParticipantChange::Left { identity })
            }
        }
    }

    /// Apply participant events until the stream ends or the session leaves.
    pub async fn run_remote_updates(&self) {
        while self.next_remote_event().await.is_some() {}
        debug!("remote participant updates stopped");
    }

    /// [`run_remote_updates`](Self::run_remote_updates) on a spawned task.
    pub fn spawn_remote_updates(&self) {
        let this = self.clone();
        platform::spawn(async move { this.run_remote_updates().await });
    }

    /// Leave the call and release everything.
    ///
    /// Idempotent. Cancels an in-flight acquisition or join and waits for it
    /// to settle, then, each step best-effort: stops and closes the local
    /// audio and video, leaves the room, drops the remote participants and
    /// the credential, and moves to LEFT. Unless disabled in the options, a
    /// full [`ResourceReclaimer::force_stop_all`] pass runs afterwards.
    ///
    /// Handles released here are first removed from the reclaimer, so each
    /// one is released exactly once; a handle some other pass already drained
    /// is skipped.
    pub async fn leave(&self) {
        if self.inner.leave_requested.swap(true, Ordering::AcqRel) {
            // Wait for the first leave() to finish.
            let _gate = self.inner.op_gate.lock().await;
            debug!("leave ignored, session {} already left", self.session_id());
            return;
        }
        info!("leaving room '{}'", self.room_id());
        self.inner.cancel.cancel();
        let _gate = self.inner.op_gate.lock().await;

        let (audio, video, client, timer) = {
            let mut s = self.inner.lock_state();
            (
                s.local_audio.take(),
                s.local_video.take(),
                s.session_client.take(),
                s.expiry_timer.take(),
            )
        };

        // Handles are taken out of the reclaimer before they are released
        // here, so the pass below (or one running concurrently) skips them.
        let reclaimer = &self.inner.reclaimer;
        let audio = audio.filter(|t| reclaimer.forget(&MediaResource::AudioProducer(t.clone())));
        let video = video.filter(|t| reclaimer.forget(&MediaResource::VideoProducer(t.clone())));
        let client = client.filter(|c| reclaimer.forget(&MediaResource::SessionClient(c.clone())));

        if let Some(track) = &audio {
            release_local_track("audio", track);
        }
        if let Some(track) = &video {
            release_local_track("video", track);
        }
        for (label, track) in [("audio", &audio), ("video", &video)] {
            if let Some(track) = track {
                disable_underlying_track(label, track);
            }
        }
        if let Some(client) = client {
            let key = ResourceKey::of(&client);
            guard("leave: remove listeners", key, || {
                client.remove_all_listeners();
                Ok(())
            });
            guard_async("leave: leave session", key, client.leave()).await;
        }
        if let Some(timer) = timer {
            if reclaimer.forget(&MediaResource::Timer(timer.clone())) {
                timer.clear();
            }
        }
        *self.inner.participants.lock().await = None;

        let remote = {
            let mut s = self.inner.lock_state();
            s.credential = None;
            let remote = std::mem::take(&mut s.remote_participants);
            if let Err(e) = self.inner.transition(&mut s, CallState::Left, "leave") {
                warn!("{e}");
            }
            remote
        };
        for participant in remote.into_values() {
            participant.into_tracks().for_each(|t| stop_remote(&t));
        }
        self.inner.events.emit(ClientEvent::Left {
            room_id: self.room_id().to_string(),
        });

        if self.inner.options.reclaim_on_leave {
            let report: ReclaimReport = self.inner.reclaimer.force_stop_all().await;
            self.inner
                .events
                .emit(ClientEvent::ResourcesReclaimed(report));
        }
        info!("left room '{}'", self.room_id());
    }

    /// Serializable view of the session.
    pub fn snapshot(&self) -> SessionSnapshot {
        let remote_participants = self.remote_participants();
        let s = self.inner.lock_state();
        SessionSnapshot {
            session_id: self.inner.session_id.clone(),
            room_id: self.inner.options.room_id.clone(),
            local_identity: self.inner.local_identity.clone(),
            state: s.state,
            has_credential: s.credential.is_some(),
            local_audio: LocalMediaState::of(s.local_audio.as_ref()),
            local_video: LocalMediaState::of(s.local_video.as_ref()),
            remote_participants,
        }
    }

    fn ensure_not_leaving(&self) -> Result<(), CallError> {
        if self.inner.leave_requested.load(Ordering::Acquire) {
            Err(CallError::SessionLeft)
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for CallSessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallSessionController")
            .field("session_id", &self.inner.session_id)
            .field("room_id", &self.inner.options.room_id)
            .field("state", &self.state())
            .finish()
    }
}

fn release_local_track(label: &str, track: &Arc<dyn LocalTrack>) {
    let key = ResourceKey::of(track);
    guard(&format!("leave: stop local {label}"), key, || track.stop());
    guard(&format!("leave: close local {label}"), key, || track.close());
}

/// Switch the hardware track off directly, not through the producer.
fn disable_underlying_track(label: &str, track: &Arc<dyn LocalTrack>) {
    let key = ResourceKey::of(track);
    guard(&format!("leave: disable underlying {label}"), key, || {
        if let Some(hw) = track.try_get_underlying_track() {
            hw.set_enabled(false);
        }
        Ok(())
    });
}

fn stop_remote(track: &Arc<dyn RemoteTrack>) {
    guard("stop remote track", ResourceKey::of(track), || {
        track.stop();
        Ok(())
    });
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(
        &self,
        s: &mut SessionState,
        to: CallState,
        operation: &'static str,
    ) -> Result<(), CallError> {
        let from = s.state;
        if from == to {
            return Ok(());
        }
        if !from.can_transition_to(to) {
            return Err(match from {
                CallState::Left => CallError::SessionLeft,
                state => CallError::InvalidState { operation, state },
            });
        }
        s.state = to;
        info!("call session {}: {from} -> {to}", self.session_id);
        self.events.emit(ClientEvent::StateChanged {
            session_id: self.session_id.clone(),
            from,
            to,
        });
        Ok(())
    }

    /// Move to FAILED unless the session already left.
    fn fail(&self) {
        let mut s = self.lock_state();
        if s.state != CallState::Left {
            let _ = self.transition(&mut s, CallState::Failed, "fail");
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .state;
        if !matches!(state, CallState::Idle | CallState::Left) {
            warn!(
                "call session {} dropped while {state} without leave(); its resources stay registered with the reclaimer",
                self.session_id
            );
        }
        self.cancel.cancel();
    }
}
