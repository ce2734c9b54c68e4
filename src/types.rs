// src/types.rs
//
// Common shared types for the arena episode controller.

use serde::{Deserialize, Serialize};

use crate::config::ActionTimings;

/// Fixed action vocabulary the controller can issue to the host.
///
/// Each action maps to a continuous command string, a matching stop
/// command, and a configured hold duration between the two. The numeric
/// ordering is a stable external contract for policies that index actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Attack,
    MoveForward,
    MoveBackward,
    StrafeLeft,
    StrafeRight,
    TurnLeft,
    TurnRight,
}

impl Action {
    /// All actions in contract order.
    pub const ALL: [Action; 7] = [
        Action::Attack,
        Action::MoveForward,
        Action::MoveBackward,
        Action::StrafeLeft,
        Action::StrafeRight,
        Action::TurnLeft,
        Action::TurnRight,
    ];

    /// Stable index of this action within [`Action::ALL`].
    pub fn index(&self) -> usize {
        Action::ALL.iter().position(|a| a == self).unwrap_or(0)
    }

    /// Look an action up by its stable index.
    pub fn from_index(index: usize) -> Option<Action> {
        Action::ALL.get(index).copied()
    }

    /// The command string sent to start this action.
    pub fn command(&self, timings: &ActionTimings) -> String {
        match self {
            Action::Attack => "attack 1".to_string(),
            Action::MoveForward => "move 1".to_string(),
            Action::MoveBackward => "move -1".to_string(),
            Action::StrafeLeft => "strafe 1".to_string(),
            Action::StrafeRight => "strafe -1".to_string(),
            Action::TurnLeft => format!("turn {}", timings.turn_rate),
            Action::TurnRight => format!("turn -{}", timings.turn_rate),
        }
    }

    /// The command string that stops this action.
    pub fn stop_command(&self) -> &'static str {
        match self {
            Action::Attack => "attack 0",
            Action::MoveForward | Action::MoveBackward => "move 0",
            Action::StrafeLeft | Action::StrafeRight => "strafe 0",
            Action::TurnLeft | Action::TurnRight => "turn 0",
        }
    }

    /// How long the command is held before the stop command is issued.
    pub fn hold_ms(&self, timings: &ActionTimings) -> u64 {
        match self {
            Action::Attack => timings.attack_hold_ms,
            Action::MoveForward | Action::MoveBackward => timings.move_hold_ms,
            Action::StrafeLeft | Action::StrafeRight => timings.strafe_hold_ms,
            Action::TurnLeft | Action::TurnRight => timings.turn_hold_ms,
        }
    }
}

/// Raycast line-of-sight classification derived from one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineOfSight {
    /// The ray did not hit a target entity.
    None,
    /// A target entity is on the ray but outside interaction range.
    OutOfRange,
    /// A target entity is on the ray and within interaction range.
    InRange,
}

impl LineOfSight {
    /// Stable lowercase name for logs and telemetry.
    pub fn as_str(&self) -> &'static str {
        match self {
            LineOfSight::None => "none",
            LineOfSight::OutOfRange => "out_of_range",
            LineOfSight::InRange => "in_range",
        }
    }
}

/// Why an episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// Every target entity disappeared from the snapshots (the win sense).
    TargetsExtinct,
    /// The agent liveness counter expired without extinction.
    AgentUnresponsive,
}
