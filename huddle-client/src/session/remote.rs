use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::transport::{MediaKind, RemoteTrack};

/// Subscribed tracks of one remote participant.
#[derive(Clone, Default)]
pub struct RemoteParticipant {
    pub audio: Option<Arc<dyn RemoteTrack>>,
    pub video: Option<Arc<dyn RemoteTrack>>,
}

impl RemoteParticipant {
    /// Store `track` for `media`, returning the track it replaces.
    pub(crate) fn set(
        &mut self,
        media: MediaKind,
        track: Arc<dyn RemoteTrack>,
    ) -> Option<Arc<dyn RemoteTrack>> {
        self.slot(media).replace(track)
    }

    pub(crate) fn take(&mut self, media: MediaKind) -> Option<Arc<dyn RemoteTrack>> {
        self.slot(media).take()
    }

    pub(crate) fn into_tracks(self) -> impl Iterator<Item = Arc<dyn RemoteTrack>> {
        self.audio.into_iter().chain(self.video)
    }

    fn slot(&mut self, media: MediaKind) -> &mut Option<Arc<dyn RemoteTrack>> {
        match media {
            MediaKind::Audio => &mut self.audio,
            MediaKind::Video => &mut self.video,
        }
    }
}

impl fmt::Debug for RemoteParticipant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteParticipant")
            .field("audio", &self.audio.is_some())
            .field("video", &self.video.is_some())
            .finish()
    }
}

/// Serializable view of a [`RemoteParticipant`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteParticipantInfo {
    pub identity: String,
    pub audio: bool,
    pub video: bool,
}

impl RemoteParticipantInfo {
    pub(crate) fn new(identity: &str, participant: &RemoteParticipant) -> Self {
        Self {
            identity: identity.to_string(),
            audio: participant.audio.is_some(),
            video: participant.video.is_some(),
        }
    }
}
