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

//! Seams to the real-time media SDK.
//!
//! The call core never talks to a concrete SDK. Each binding (browser SDK via
//! wasm-bindgen, a native SFU client, the test mocks) implements these traits,
//! and the controller and reclaimer only see trait objects.
//!
//! Handle identity is the `Arc` allocation: registering the same `Arc` twice
//! refers to the same resource.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors reported by an SDK binding.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No such device, or the device is busy.
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The user or the platform denied access to the device.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The remote side rejected the operation (bad token, room full, ...).
    #[error("Rejected: {0}")]
    Rejected(String),

    /// The handle was already closed or the client already left.
    #[error("Handle closed")]
    Closed,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Audio,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// The raw hardware track underneath a producer (a `MediaStreamTrack` in the
/// browser). Operations here are plain flag flips and must not fail.
pub trait HardwareTrack: Send + Sync {
    fn kind(&self) -> MediaKind;
    fn set_enabled(&self, enabled: bool);
    fn is_enabled(&self) -> bool;
    fn stop(&self);
}

/// Access to the hardware track a producer wraps, without going through the
/// producer's own enable/disable path.
pub trait HardwareTrackAccessor {
    fn try_get_underlying_track(&self) -> Option<Arc<dyn HardwareTrack>>;
}

/// A local audio or video producer created by the SDK.
#[async_trait]
pub trait LocalTrack: HardwareTrackAccessor + Send + Sync {
    fn kind(&self) -> MediaKind;

    /// Stop capturing. Safe to call on a stopped track.
    fn stop(&self) -> Result<(), TransportError>;

    /// Release the producer. The handle is unusable afterwards.
    fn close(&self) -> Result<(), TransportError>;

    /// High-level enable/disable. Some SDKs reject this on a closed producer
    /// from inside their own async continuation, which is why reclamation
    /// never calls it.
    async fn set_enabled(&self, enabled: bool) -> Result<(), TransportError>;

    fn is_enabled(&self) -> bool;
}

/// A bundle of raw hardware tracks obtained outside any producer wrapper
/// (e.g. a `getUserMedia` stream used for device probing).
pub trait HardwareStream: Send + Sync {
    fn tracks(&self) -> Vec<Arc<dyn HardwareTrack>>;
}

/// A pending timer or interval.
pub trait TimerHandle: Send + Sync {
    fn clear(&self);
}

/// A remote producer the local client subscribed to.
pub trait RemoteTrack: Send + Sync {
    fn kind(&self) -> MediaKind;
    fn stop(&self);
}

/// Participant change reported by the session client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantEvent {
    Published { identity: String, media: MediaKind },
    Unpublished { identity: String, media: MediaKind },
    Left { identity: String },
}

impl ParticipantEvent {
    pub fn identity(&self) -> &str {
        match self {
            ParticipantEvent::Published { identity, .. }
            | ParticipantEvent::Unpublished { identity, .. }
            | ParticipantEvent::Left { identity } => identity,
        }
    }
}

/// Participant events for one joined session. The stream ends when the
/// session client leaves or drops its listeners.
pub type ParticipantStream = BoxStream<'static, ParticipantEvent>;

/// Membership in one room.
#[async_trait]
pub trait SessionClient: Send + Sync {
    /// Join the room and return a fresh subscription to participant events.
    async fn join(
        &self,
        app_id: &str,
        room_id: &str,
        token: &str,
        identity: &str,
    ) -> Result<ParticipantStream, TransportError>;

    /// A new subscription to the same participant events. Used to restart the
    /// update loop after the previous stream was dropped.
    fn resubscribe(&self) -> Option<ParticipantStream>;

    async fn publish(&self, tracks: &[Arc<dyn LocalTrack>]) -> Result<(), TransportError>;

    async fn subscribe(
        &self,
        identity: &str,
        media: MediaKind,
    ) -> Result<Arc<dyn RemoteTrack>, TransportError>;

    async fn leave(&self) -> Result<(), TransportError>;

    /// Detach every event listener registered on this client.
    fn remove_all_listeners(&self);
}

/// Factory side of the SDK.
#[async_trait]
pub trait MediaTransport: Send + Sync {
    async fn create_audio_producer(&self) -> Result<Arc<dyn LocalTrack>, TransportError>;

    /// `device_id == None` lets the SDK pick the default camera.
    async fn create_video_producer(
        &self,
        device_id: Option<&str>,
    ) -> Result<Arc<dyn LocalTrack>, TransportError>;

    fn create_session_client(&self) -> Arc<dyn SessionClient>;
}

/// An `<audio>`/`<video>` element (or native equivalent) currently playing
/// something.
pub trait PlaybackElement: Send + Sync {
    fn mute(&self);
    fn pause(&self);
    fn reset_position(&self);
}

/// Whatever hosts playback elements: the document in a browser, a renderer
/// registry natively.
pub trait PlaybackSurface: Send + Sync {
    fn playback_elements(&self) -> Vec<Arc<dyn PlaybackElement>>;
}
