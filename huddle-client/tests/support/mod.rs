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

//! Counting mocks of the media SDK, the token issuer and the platform seams.
//!
//! Every mock appends to a shared [`Journal`] so tests can assert on the
//! order of calls across handles.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::StreamExt;
use huddle_client::session::CallSessionController;
use huddle_client::transport::{
    HardwareStream, HardwareTrack, HardwareTrackAccessor, LocalTrack, MediaTransport,
    ParticipantEvent, ParticipantStream, PlaybackElement, PlaybackSurface, RemoteTrack,
    SessionClient, TimerHandle,
};
use huddle_client::{
    ApiError, CallSessionOptions, CredentialIssuer, DeviceEnumerator, DeviceKind, EventBus,
    MediaDeviceInfo, MediaKind, ResourceReclaimer, RetryPolicy, TransportError,
};
use huddle_types::{RtcTokenRequest, RtcTokenResponse};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Ordered record of mock calls, shared by every mock of one test.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| *e == entry).count()
    }
}

/// How a mock call behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fault {
    #[default]
    None,
    Error,
    Panic,
}

impl Fault {
    fn apply(self, what: &str) -> Result<(), TransportError> {
        match self {
            Fault::None => Ok(()),
            Fault::Error => Err(TransportError::Rejected(format!("{what} failed"))),
            Fault::Panic => panic!("{what} panicked"),
        }
    }
}

// ---------------------------------------------------------------------------
// Hardware
// ---------------------------------------------------------------------------

pub struct MockHardwareTrack {
    pub name: String,
    kind: MediaKind,
    enabled: AtomicBool,
    pub stopped: AtomicBool,
    journal: Journal,
}

impl MockHardwareTrack {
    pub fn new(name: &str, kind: MediaKind, journal: &Journal) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            kind,
            enabled: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
            journal: journal.clone(),
        })
    }

    pub fn is_enabled_flag(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

impl HardwareTrack for MockHardwareTrack {
    fn kind(&self) -> MediaKind {
        self.kind
    }

    fn set_enabled(&self, enabled: bool) {
        self.journal
            .record(format!("{}.hw.set_enabled({enabled})", self.name));
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.journal.record(format!("{}.hw.stop", self.name));
        self.stopped.store(true, Ordering::SeqCst);
    }
}

pub struct MockHardwareStream {
    pub tracks: Vec<Arc<MockHardwareTrack>>,
}

impl HardwareStream for MockHardwareStream {
    fn tracks(&self) -> Vec<Arc<dyn HardwareTrack>> {
        self.tracks
            .iter()
            .map(|t| t.clone() as Arc<dyn HardwareTrack>)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Local producers
// ---------------------------------------------------------------------------

pub struct MockLocalTrack {
    pub name: String,
    kind: MediaKind,
    pub hardware: Arc<MockHardwareTrack>,
    enabled: AtomicBool,
    pub stop_calls: AtomicUsize,
    pub close_calls: AtomicUsize,
    pub set_enabled_calls: AtomicUsize,
    stop_fault: Fault,
    close_fault: Fault,
    journal: Journal,
}

impl MockLocalTrack {
    pub fn new(name: &str, kind: MediaKind, journal: &Journal) -> Arc<Self> {
        Self::with_faults(name, kind, journal, Fault::None, Fault::None)
    }

    pub fn with_faults(
        name: &str,
        kind: MediaKind,
        journal: &Journal,
        stop_fault: Fault,
        close_fault: Fault,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            kind,
            hardware: MockHardwareTrack::new(name, kind, journal),
            enabled: AtomicBool::new(true),
            stop_calls: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
            set_enabled_calls: AtomicUsize::new(0),
            stop_fault,
            close_fault,
            journal: journal.clone(),
        })
    }

    pub fn stops(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn set_enabled_count(&self) -> usize {
        self.set_enabled_calls.load(Ordering::SeqCst)
    }
}

impl HardwareTrackAccessor for MockLocalTrack {
    fn try_get_underlying_track(&self) -> Option<Arc<dyn HardwareTrack>> {
        Some(self.hardware.clone())
    }
}

#[async_trait]
impl LocalTrack for MockLocalTrack {
    fn kind(&self) -> MediaKind {
        self.kind
    }

    fn stop(&self) -> Result<(), TransportError> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.journal.record(format!("{}.stop", self.name));
        self.stop_fault.apply("stop")
    }

    fn close(&self) -> Result<(), TransportError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.journal.record(format!("{}.close", self.name));
        self.close_fault.apply("close")
    }

    async fn set_enabled(&self, enabled: bool) -> Result<(), TransportError> {
        self.set_enabled_calls.fetch_add(1, Ordering::SeqCst);
        self.journal
            .record(format!("{}.set_enabled({enabled})", self.name));
        self.enabled.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Session client
// ---------------------------------------------------------------------------

pub struct MockRemoteTrack {
    kind: MediaKind,
    pub stopped: AtomicBool,
}

impl RemoteTrack for MockRemoteTrack {
    fn kind(&self) -> MediaKind {
        self.kind
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct SessionClientFaults {
    pub join: Fault,
    pub publish: Fault,
    pub leave: Fault,
    pub subscribe: Fault,
}

pub struct MockSessionClient {
    pub name: String,
    pub join_calls: AtomicUsize,
    pub leave_calls: AtomicUsize,
    pub publish_calls: AtomicUsize,
    pub remove_listener_calls: AtomicUsize,
    pub published_track_counts: Mutex<Vec<usize>>,
    pub join_args: Mutex<Vec<(String, String, String, String)>>,
    pub subscribed: Mutex<Vec<(String, MediaKind)>>,
    pub remote_tracks: Mutex<Vec<Arc<MockRemoteTrack>>>,
    faults: SessionClientFaults,
    participant_tx: mpsc::UnboundedSender<ParticipantEvent>,
    participant_rx: Mutex<Option<mpsc::UnboundedReceiver<ParticipantEvent>>>,
    journal: Journal,
}

impl MockSessionClient {
    pub fn new(name: &str, journal: &Journal, faults: SessionClientFaults) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded();
        Arc::new(Self {
            name: name.to_string(),
            join_calls: AtomicUsize::new(0),
            leave_calls: AtomicUsize::new(0),
            publish_calls: AtomicUsize::new(0),
            remove_listener_calls: AtomicUsize::new(0),
            published_track_counts: Mutex::new(Vec::new()),
            join_args: Mutex::new(Vec::new()),
            subscribed: Mutex::new(Vec::new()),
            remote_tracks: Mutex::new(Vec::new()),
            faults,
            participant_tx: tx,
            participant_rx: Mutex::new(Some(rx)),
            journal: journal.clone(),
        })
    }

    /// Push a participant event into the stream returned by `join`.
    pub fn push_event(&self, event: ParticipantEvent) {
        self.participant_tx.unbounded_send(event).unwrap();
    }

    /// End the participant stream.
    pub fn close_events(&self) {
        self.participant_tx.close_channel();
    }

    pub fn joins(&self) -> usize {
        self.join_calls.load(Ordering::SeqCst)
    }

    pub fn leaves(&self) -> usize {
        self.leave_calls.load(Ordering::SeqCst)
    }

    pub fn publishes(&self) -> usize {
        self.publish_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionClient for MockSessionClient {
    async fn join(
        &self,
        app_id: &str,
        room_id: &str,
        token: &str,
        identity: &str,
    ) -> Result<ParticipantStream, TransportError> {
        self.join_calls.fetch_add(1, Ordering::SeqCst);
        self.journal.record(format!("{}.join", self.name));
        self.join_args.lock().unwrap().push((
            app_id.to_string(),
            room_id.to_string(),
            token.to_string(),
            identity.to_string(),
        ));
        self.faults.join.apply("join")?;
        let rx = self.participant_rx.lock().unwrap().take();
        match rx {
            Some(rx) => Ok(rx.boxed()),
            None => Ok(futures::stream::empty().boxed()),
        }
    }

    fn resubscribe(&self) -> Option<ParticipantStream> {
        None
    }

    async fn publish(&self, tracks: &[Arc<dyn LocalTrack>]) -> Result<(), TransportError> {
        self.publish_calls.fetch_add(1, Ordering::SeqCst);
        self.journal.record(format!("{}.publish", self.name));
        self.published_track_counts
            .lock()
            .unwrap()
            .push(tracks.len());
        self.faults.publish.apply("publish")
    }

    async fn subscribe(
        &self,
        identity: &str,
        media: MediaKind,
    ) -> Result<Arc<dyn RemoteTrack>, TransportError> {
        self.faults.subscribe.apply("subscribe")?;
        self.subscribed
            .lock()
            .unwrap()
            .push((identity.to_string(), media));
        let track = Arc::new(MockRemoteTrack {
            kind: media,
            stopped: AtomicBool::new(false),
        });
        self.remote_tracks.lock().unwrap().push(track.clone());
        Ok(track)
    }

    async fn leave(&self) -> Result<(), TransportError> {
        self.leave_calls.fetch_add(1, Ordering::SeqCst);
        self.journal.record(format!("{}.leave", self.name));
        self.faults.leave.apply("leave")
    }

    fn remove_all_listeners(&self) {
        self.remove_listener_calls.fetch_add(1, Ordering::SeqCst);
        self.journal
            .record(format!("{}.remove_all_listeners", self.name));
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct TransportFaults {
    pub microphone: bool,
    /// Opening the microphone takes this long.
    pub microphone_delay: Option<Duration>,
    pub default_camera: bool,
    pub device_camera: bool,
}

pub struct MockTransport {
    journal: Journal,
    faults: TransportFaults,
    pub session_client: Arc<MockSessionClient>,
    pub audio_tracks: Mutex<Vec<Arc<MockLocalTrack>>>,
    pub video_tracks: Mutex<Vec<Arc<MockLocalTrack>>>,
    pub video_requests: Mutex<Vec<Option<String>>>,
    pub session_clients_created: AtomicUsize,
}

impl MockTransport {
    pub fn new(
        journal: &Journal,
        faults: TransportFaults,
        client: SessionClientFaults,
    ) -> Arc<Self> {
        Arc::new(Self {
            journal: journal.clone(),
            faults,
            session_client: MockSessionClient::new("client", journal, client),
            audio_tracks: Mutex::new(Vec::new()),
            video_tracks: Mutex::new(Vec::new()),
            video_requests: Mutex::new(Vec::new()),
            session_clients_created: AtomicUsize::new(0),
        })
    }

    pub fn audio(&self) -> Option<Arc<MockLocalTrack>> {
        self.audio_tracks.lock().unwrap().last().cloned()
    }

    pub fn video(&self) -> Option<Arc<MockLocalTrack>> {
        self.video_tracks.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl MediaTransport for MockTransport {
    async fn create_audio_producer(&self) -> Result<Arc<dyn LocalTrack>, TransportError> {
        if let Some(delay) = self.faults.microphone_delay {
            tokio::time::sleep(delay).await;
        }
        if self.faults.microphone {
            return Err(TransportError::PermissionDenied("microphone".into()));
        }
        let track = MockLocalTrack::new("audio", MediaKind::Audio, &self.journal);
        self.audio_tracks.lock().unwrap().push(track.clone());
        Ok(track)
    }

    async fn create_video_producer(
        &self,
        device_id: Option<&str>,
    ) -> Result<Arc<dyn LocalTrack>, TransportError> {
        self.video_requests
            .lock()
            .unwrap()
            .push(device_id.map(str::to_string));
        let failed = match device_id {
            None => self.faults.default_camera,
            Some(_) => self.faults.device_camera,
        };
        if failed {
            return Err(TransportError::DeviceUnavailable("camera busy".into()));
        }
        let track = MockLocalTrack::new("video", MediaKind::Video, &self.journal);
        self.video_tracks.lock().unwrap().push(track.clone());
        Ok(track)
    }

    fn create_session_client(&self) -> Arc<dyn SessionClient> {
        self.session_clients_created.fetch_add(1, Ordering::SeqCst);
        self.session_client.clone()
    }
}

// ---------------------------------------------------------------------------
// Token issuer
// ---------------------------------------------------------------------------

pub struct MockIssuer {
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<RtcTokenRequest>>,
    script: Mutex<VecDeque<Result<RtcTokenResponse, ApiError>>>,
    delay: Duration,
    expires_in: u64,
}

impl MockIssuer {
    /// Always succeeds with a one hour token.
    pub fn ok() -> Arc<Self> {
        Self::scripted(Vec::new())
    }

    /// Replays `script`, then succeeds.
    pub fn scripted(script: Vec<Result<RtcTokenResponse, ApiError>>) -> Arc<Self> {
        Self::build(script, Duration::ZERO, 3600)
    }

    /// Succeeds after `delay`.
    pub fn slow(delay: Duration) -> Arc<Self> {
        Self::build(Vec::new(), delay, 3600)
    }

    pub fn expiring_in(expires_in: u64) -> Arc<Self> {
        Self::build(Vec::new(), Duration::ZERO, expires_in)
    }

    fn build(
        script: Vec<Result<RtcTokenResponse, ApiError>>,
        delay: Duration,
        expires_in: u64,
    ) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            script: Mutex::new(script.into()),
            delay,
            expires_in,
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn token(token: &str) -> RtcTokenResponse {
    RtcTokenResponse {
        token: token.to_string(),
        app_id: "issuer-app".to_string(),
        expires_in: 3600,
    }
}

pub fn server_error(status: u16) -> ApiError {
    ApiError::ServerError {
        status,
        body: "unavailable".to_string(),
    }
}

pub fn bad_request() -> ApiError {
    ApiError::BadRequest {
        status: 400,
        body: "roomName is required".to_string(),
    }
}

#[async_trait]
impl CredentialIssuer for MockIssuer {
    async fn issue(&self, request: &RtcTokenRequest) -> Result<RtcTokenResponse, ApiError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(RtcTokenResponse {
                token: format!("token-{n}"),
                app_id: "issuer-app".to_string(),
                expires_in: self.expires_in,
            })
        })
    }
}

// ---------------------------------------------------------------------------
// Devices and playback
// ---------------------------------------------------------------------------

pub struct MockDevices {
    pub devices: Vec<MediaDeviceInfo>,
    pub calls: AtomicUsize,
}

impl MockDevices {
    pub fn with_cameras(ids: &[&str]) -> Arc<Self> {
        let mut devices = vec![MediaDeviceInfo {
            device_id: "mic-1".to_string(),
            kind: DeviceKind::AudioInput,
            label: "Built-in Microphone".to_string(),
        }];
        devices.extend(ids.iter().map(|id| MediaDeviceInfo {
            device_id: id.to_string(),
            kind: DeviceKind::VideoInput,
            label: format!("Camera {id}"),
        }));
        Arc::new(Self {
            devices,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl DeviceEnumerator for MockDevices {
    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.devices.clone())
    }
}

pub struct MockTimer {
    pub cleared: AtomicUsize,
    pub fault: Fault,
}

impl MockTimer {
    pub fn new(fault: Fault) -> Arc<Self> {
        Arc::new(Self {
            cleared: AtomicUsize::new(0),
            fault,
        })
    }
}

impl TimerHandle for MockTimer {
    fn clear(&self) {
        self.cleared.fetch_add(1, Ordering::SeqCst);
        if self.fault == Fault::Panic {
            panic!("clear panicked");
        }
    }
}

#[derive(Default)]
pub struct MockElement {
    pub muted: AtomicBool,
    pub paused: AtomicBool,
    pub rewound: AtomicBool,
}

impl PlaybackElement for MockElement {
    fn mute(&self) {
        self.muted.store(true, Ordering::SeqCst);
    }

    fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    fn reset_position(&self) {
        self.rewound.store(true, Ordering::SeqCst);
    }
}

pub struct MockSurface {
    pub elements: Vec<Arc<MockElement>>,
}

impl PlaybackSurface for MockSurface {
    fn playback_elements(&self) -> Vec<Arc<dyn PlaybackElement>> {
        self.elements
            .iter()
            .map(|e| e.clone() as Arc<dyn PlaybackElement>)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Controller harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub journal: Journal,
    pub transport: Arc<MockTransport>,
    pub issuer: Arc<MockIssuer>,
    pub devices: Arc<MockDevices>,
    pub reclaimer: ResourceReclaimer,
    pub events: EventBus,
    pub controller: CallSessionController,
}

impl Harness {
    pub fn client(&self) -> &Arc<MockSessionClient> {
        &self.transport.session_client
    }
}

pub fn options() -> CallSessionOptions {
    let mut options =
        CallSessionOptions::new("app-1", "standup").with_identity("Jane.Doe@Example.com");
    options.retry = RetryPolicy::default();
    options
}

pub struct HarnessBuilder {
    options: CallSessionOptions,
    transport: TransportFaults,
    client: SessionClientFaults,
    issuer: Arc<MockIssuer>,
    cameras: Vec<String>,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            options: options(),
            transport: TransportFaults::default(),
            client: SessionClientFaults::default(),
            issuer: MockIssuer::ok(),
            cameras: vec!["cam-1".to_string(), "cam-2".to_string()],
        }
    }

    pub fn options(mut self, f: impl FnOnce(&mut CallSessionOptions)) -> Self {
        f(&mut self.options);
        self
    }

    pub fn transport(mut self, faults: TransportFaults) -> Self {
        self.transport = faults;
        self
    }

    pub fn client(mut self, faults: SessionClientFaults) -> Self {
        self.client = faults;
        self
    }

    pub fn issuer(mut self, issuer: Arc<MockIssuer>) -> Self {
        self.issuer = issuer;
        self
    }

    pub fn cameras(mut self, ids: &[&str]) -> Self {
        self.cameras = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn build(self) -> Harness {
        let journal = Journal::default();
        let transport = MockTransport::new(&journal, self.transport, self.client);
        let cameras: Vec<&str> = self.cameras.iter().map(String::as_str).collect();
        let devices = MockDevices::with_cameras(&cameras);
        let reclaimer = ResourceReclaimer::new();
        let events = EventBus::new();
        let controller = CallSessionController::new(
            self.options,
            transport.clone(),
            devices.clone(),
            self.issuer.clone(),
            reclaimer.clone(),
            events.clone(),
        );
        Harness {
            journal,
            transport,
            issuer: self.issuer,
            devices,
            reclaimer,
            events,
            controller,
        }
    }
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self::new()
    }
}
