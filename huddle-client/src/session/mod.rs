//! The call session: state machine, join credential and the controller that
//! drives one call attempt.

mod controller;
mod credential;
mod remote;
mod state;

pub use controller::{CallSessionController, LocalMediaState, LocalTracks, SessionSnapshot};
pub use credential::{CredentialIssuer, JoinCredential};
pub use remote::{RemoteParticipant, RemoteParticipantInfo};
pub use state::CallState;
