//! arena-env core library.
//!
//! Episode lifecycle plumbing for a reinforcement-learning agent driving
//! a remote, real-time arena simulation host. The host is an opaque peer
//! behind the [`host::MissionHost`] trait: it accepts fire-and-forget
//! text commands and hands back irregular state snapshots on demand.
//!
//! # Architecture
//!
//! - **Session** (`session`): the lifecycle state machine: handshake
//!   with retry/backoff, begin and spawn waits, the liveness-gated tick
//!   loop, and the blocking mission-end drain.
//! - **Liveness** (`liveness`): decrementing counters that detect silent
//!   connection death and stalled spawn preconditions.
//! - **Observation** (`observation`): reduction of one raw snapshot into
//!   the fixed 15-feature agent state plus derived discrete events.
//! - **Reward** (`reward`): shaped tick/episode/lifetime reward totals
//!   from host-native and self-computed terms.
//! - **Recorder** (`recorder`): append-only per-episode history.
//! - **Telemetry** (`telemetry`): JSONL sinks for ticks and episode
//!   boundaries.
//! - **Sim host** (`sim_host`): deterministic in-process host for the
//!   harness binary and lifecycle tests.
//!
//! Everything runs on a single logical thread; waits are blocking sleeps
//! yielding a fixed quantum to the host.

pub mod config;
pub mod host;
pub mod liveness;
pub mod observation;
pub mod recorder;
pub mod reward;
pub mod scene;
pub mod session;
pub mod sim_host;
pub mod telemetry;
pub mod types;

// --- Re-exports for ergonomic external use ---------------------------------

pub use config::{ActionTimings, Config, HandshakeConfig, LivenessConfig};
pub use host::{
    EntityObs, LineOfSightObs, MissionHost, PeekState, RecordSpec, Snapshot, StartErrorClass,
    StartSessionError, WorldState,
};
pub use liveness::LivenessCounter;
pub use observation::{AgentState, ObservationReducer, TickEvents, STATE_LEN, TARGET_SLOTS};
pub use recorder::{EpisodeRecorder, EpisodeRow};
pub use reward::{RewardComponents, RewardShaper};
pub use scene::{SceneDescriptor, SceneSource, StaticScene};
pub use session::{
    Episode, SessionController, SessionError, SessionPhase, TickReport,
};
pub use sim_host::{SimHost, SimHostConfig};
pub use telemetry::{EpisodeEndRecord, EpisodeSink, FileSink, NoopSink, TickRecord};
pub use types::{Action, LineOfSight, TerminationReason};
