// src/host.rs
//
// Boundary to the simulation host: an opaque RPC-like peer that accepts
// fire-and-forget text commands and hands back state snapshots on demand.
// The controller only ever talks to this trait; real transports and the
// deterministic sim host both implement it.

use serde::{Deserialize, Serialize};

use crate::scene::SceneDescriptor;

/// Classification of a rejected start-session call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartErrorClass {
    /// The host is still warming up; retry without consuming an attempt.
    WarmingUp,
    /// Not enough peer instances are available yet.
    InsufficientPeers,
    /// The peer hosting the mission was not found.
    PeerNotFound,
    /// Anything else. Never retried.
    Other(String),
}

/// Error returned by [`MissionHost::start_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartSessionError {
    pub class: StartErrorClass,
}

impl StartSessionError {
    pub fn new(class: StartErrorClass) -> Self {
        Self { class }
    }
}

impl std::fmt::Display for StartSessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.class {
            StartErrorClass::WarmingUp => write!(f, "host warming up"),
            StartErrorClass::InsufficientPeers => write!(f, "insufficient peers available"),
            StartErrorClass::PeerNotFound => write!(f, "mission peer not found"),
            StartErrorClass::Other(msg) => write!(f, "start rejected: {msg}"),
        }
    }
}

impl std::error::Error for StartSessionError {}

/// Recording specification passed through to the host on start.
/// Opaque at this boundary; the default records nothing.
#[derive(Debug, Clone, Default)]
pub struct RecordSpec {
    pub destination: Option<String>,
}

/// Result of a cheap peek at mission state while waiting for begin.
#[derive(Debug, Clone, Default)]
pub struct PeekState {
    pub has_begun: bool,
    pub errors: Vec<String>,
}

/// Full world state delivered on each poll.
///
/// `observations` carries raw snapshot text, oldest first; the controller
/// decodes only the most recent entry. `rewards_since_last` is the host's
/// native reward stream accumulated since the previous poll.
#[derive(Debug, Clone, Default)]
pub struct WorldState {
    pub is_running: bool,
    pub observations: Vec<String>,
    pub rewards_since_last: Vec<f64>,
    pub observation_count_since_last: usize,
}

/// The control channel to the simulation host.
pub trait MissionHost {
    /// Request a new mission session. Fire-and-forget on success; rejection
    /// carries an error class the handshake retry loop dispatches on.
    fn start_session(
        &mut self,
        descriptor: &SceneDescriptor,
        record: &RecordSpec,
        role: u32,
        session_id: &str,
    ) -> Result<(), StartSessionError>;

    /// Cheap peek for the has-begun flag and protocol errors.
    fn peek_state(&mut self) -> PeekState;

    /// Consume pending observations and rewards.
    fn get_state(&mut self) -> WorldState;

    /// Fire-and-forget text command. No acknowledgement exists.
    fn send_command(&mut self, command: &str);
}

// ---------------------------------------------------------------------------
// Snapshot schema
// ---------------------------------------------------------------------------

/// One observed entity within a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityObs {
    pub name: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default)]
    pub yaw: f64,
}

/// Raycast result the host attaches when something is on the crosshair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineOfSightObs {
    #[serde(rename = "hitType")]
    pub hit_type: String,
    #[serde(rename = "inRange", default)]
    pub in_range: bool,
    #[serde(rename = "type", default)]
    pub entity_type: String,
}

/// One decoded observation payload.
///
/// Field names mirror the host's wire schema, hence the renames.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub entities: Vec<EntityObs>,
    #[serde(rename = "LineOfSight")]
    pub line_of_sight: Option<LineOfSightObs>,
    #[serde(rename = "Life")]
    pub life: Option<f64>,
    #[serde(rename = "MobsKilled")]
    pub mobs_killed: Option<u32>,
    #[serde(rename = "XPos")]
    pub x_pos: Option<f64>,
    #[serde(rename = "ZPos")]
    pub z_pos: Option<f64>,
    #[serde(rename = "TimeAlive")]
    pub time_alive: Option<f64>,
}

impl Snapshot {
    /// Decode one raw observation payload.
    pub fn decode(text: &str) -> Result<Snapshot, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Number of entities in this snapshot carrying `name`.
    pub fn count_named(&self, name: &str) -> usize {
        self.entities.iter().filter(|e| e.name == name).count()
    }
}
