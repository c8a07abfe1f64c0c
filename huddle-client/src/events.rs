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

//! Framework-agnostic event types for the call client.
//!
//! These events are emitted via the [`EventBus`](crate::EventBus) and can be
//! subscribed to by any frontend (Yew, Dioxus, Leptos, React via wasm-bindgen,
//! etc.)

use crate::reclaimer::ReclaimReport;
use crate::session::CallState;
use crate::transport::MediaKind;

/// What changed for a remote participant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteParticipantChange {
    /// The participant started publishing `media` and we subscribed to it.
    Published { identity: String, media: MediaKind },
    /// The participant stopped publishing `media`.
    Unpublished { identity: String, media: MediaKind },
    /// The participant left the room.
    Left { identity: String },
}

/// Events emitted by a [`CallSessionController`](crate::CallSessionController).
#[derive(Clone, Debug)]
pub enum ClientEvent {
    // === Lifecycle ===
    /// The session moved between two states.
    StateChanged {
        session_id: String,
        from: CallState,
        to: CallState,
    },

    // === Local media ===
    /// Local track acquisition finished. `false` means that handle is missing.
    LocalTracksCreated { audio: bool, video: bool },

    /// One local track could not be acquired.
    AcquisitionFailed { media: MediaKind, reason: String },

    /// The microphone enabled flag changed.
    MuteChanged { muted: bool },

    /// The camera enabled flag changed.
    CameraChanged { camera_off: bool },

    // === Room ===
    /// Joined the room as `identity`.
    Joined { room_id: String, identity: String },

    /// Joining failed; local tracks are kept for a retry.
    JoinFailed(String),

    /// Local tracks were published.
    Published { audio: bool, video: bool },

    /// Publishing failed.
    PublishFailed(String),

    /// A remote participant changed.
    RemoteParticipant(RemoteParticipantChange),

    /// The join credential expires in `expires_in_seconds`.
    CredentialExpiring {
        room_id: String,
        expires_in_seconds: u64,
    },

    /// The session left the room.
    Left { room_id: String },

    // === Cleanup ===
    /// A reclamation pass finished.
    ResourcesReclaimed(ReclaimReport),
}
