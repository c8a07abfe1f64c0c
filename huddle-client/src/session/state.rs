use serde::Serialize;
use std::fmt;

/// Lifecycle state of one call session.
///
/// ```text
/// IDLE --create_local_tracks--> ACQUIRING --ok--> READY_TO_JOIN
///                                         \--none acquired--> FAILED
/// IDLE | READY_TO_JOIN | FAILED --join--> JOINING --ok--> JOINED --publish--> ACTIVE
///                                                 \--err--> FAILED
/// FAILED --create_local_tracks--> ACQUIRING
/// any --leave--> LEFT
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallState {
    #[default]
    Idle,
    Acquiring,
    ReadyToJoin,
    Joining,
    Joined,
    Active,
    Failed,
    Left,
}

impl CallState {
    pub fn can_transition_to(self, next: CallState) -> bool {
        use CallState::*;
        match (self, next) {
            (Left, _) => false,
            (_, Left) => true,
            (Idle | Failed, Acquiring) => true,
            (Acquiring, ReadyToJoin | Failed) => true,
            (Idle | ReadyToJoin | Failed, Joining) => true,
            (Joining, Joined | Failed) => true,
            (Joined, Active) => true,
            // publish failure
            (Joined | Active, Failed) => true,
            _ => false,
        }
    }

    /// JOINING, JOINED or ACTIVE.
    pub fn is_in_room(self) -> bool {
        matches!(self, CallState::Joining | CallState::Joined | CallState::Active)
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallState::Idle => "IDLE",
            CallState::Acquiring => "ACQUIRING",
            CallState::ReadyToJoin => "READY_TO_JOIN",
            CallState::Joining => "JOINING",
            CallState::Joined => "JOINED",
            CallState::Active => "ACTIVE",
            CallState::Failed => "FAILED",
            CallState::Left => "LEFT",
        };
        f.write_str(name)
    }
}
