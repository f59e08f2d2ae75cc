use super::session::{PlaybackSnapshot, PlaybackStateKind};

/// What the reconciliation loop should do about an observed state.
/// Pure output, carries no state of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectiveAction {
    None,
    Resume,
    Launch,
}

/// The decision table that maps an observation to a corrective action.
pub struct PlaybackPolicy;

impl PlaybackPolicy {
    /// Pure function: (Observed snapshot) -> Action.
    ///
    /// States indicating active progress or a benign in-flight transition
    /// need no intervention; everything else is treated as stuck and gets
    /// a resume attempt, which the target accepts as a no-op when it is
    /// already playing.
    pub fn decide(snapshot: Option<&PlaybackSnapshot>) -> CorrectiveAction {
        use PlaybackStateKind::*;

        match snapshot {
            None => CorrectiveAction::Launch,
            Some(snap) => match snap.state {
                Playing | Connecting | Transitioning => CorrectiveAction::None,
                Paused | Stopped | NoState | Buffering | Error | Unknown => {
                    CorrectiveAction::Resume
                }
            },
        }
    }
}
