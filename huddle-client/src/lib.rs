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

//! This crate provides the client-side call core for huddle: the lifecycle of one video call
//! (local media, join credential, room membership, remote participants, leave) and the
//! registry that forcibly releases every media resource when a call ends.
//!
//! The crate makes no assumptions about the UI or about the real-time media SDK. The SDK is
//! reached only through the traits in [`transport`]; a browser binding, a native SFU client or
//! a test mock can sit behind them.
//!
//! # Outline of usage
//!
//! For more detailed documentation see the doc for each struct.
//!
//! ## Controller creation and joining:
//! ```ignore
//! let config = ClientConfig::from_env()?;
//! let issuer = Arc::new(TokenApiClient::new(&config.token_api_url, AuthMode::Cookie));
//! let reclaimer = ResourceReclaimer::new();
//! let events = EventBus::new();
//!
//! let call = CallSessionController::new(
//!     config.session_options("standup", Some("jane.doe@example.com".into())),
//!     transport,  // Arc<dyn MediaTransport>
//!     devices,    // Arc<dyn DeviceEnumerator>
//!     issuer,
//!     reclaimer.clone(),
//!     events.clone(),
//! );
//!
//! call.create_local_tracks().await?;
//! call.join().await?;
//! call.publish().await?;
//! call.spawn_remote_updates();
//! ```
//!
//! ## Local media:
//! ```ignore
//! call.toggle_mute(None).await?;          // flip
//! call.toggle_camera(Some(true)).await?;  // camera off
//! ```
//!
//! ## Leaving and cleanup:
//! ```ignore
//! call.leave().await;
//!
//! // On unmount or an error path, regardless of which controllers are still around:
//! reclaimer.force_stop_all().await;
//! ```
//!
//! ### Events:
//! ```ignore
//! let mut rx = events.subscribe();
//! while let Ok(event) = rx.recv().await {
//!     if let ClientEvent::CredentialExpiring { room_id, .. } = event {
//!         // fetch a new credential before rejoining
//!     }
//! }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod event_bus;
pub mod events;
pub mod identity;
pub mod media_devices;
pub mod platform;
pub mod reclaimer;
pub mod session;
pub mod transport;

pub use config::{CallSessionOptions, ClientConfig};
pub use error::CallError;
pub use event_bus::EventBus;
pub use events::{ClientEvent, RemoteParticipantChange};
pub use identity::{normalize_identity, IdentitySource};
pub use media_devices::{
    DeviceEnumerator, DeviceKind, MediaDeviceInfo, MediaDeviceList, SelectableDevices,
};
pub use reclaimer::{
    MediaResource, ReclaimReport, ResourceKey, ResourceKind, ResourceReclaimer, ResourceStatus,
};
pub use session::{
    CallSessionController, CallState, CredentialIssuer, JoinCredential, LocalMediaState,
    LocalTracks, RemoteParticipantInfo, SessionSnapshot,
};
pub use transport::{MediaKind, TransportError};

pub use huddle_token_client::{ApiError, AuthMode, RetryPolicy, TokenApiClient};
pub use huddle_types::RtcRole;
