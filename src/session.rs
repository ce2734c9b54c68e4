// src/session.rs
//
// The episode lifecycle controller: one session at a time against the
// mission host, driven as a single-threaded, liveness-gated control loop.
//
// Phase order: Idle -> Requesting -> AwaitingBegin -> AwaitingSpawn ->
// Running -> Terminating -> Idle. The handshake classifies and retries
// transient start failures, the spawn precondition wait can restart the
// whole handshake a bounded number of times, and fatal conditions are
// returned as typed errors for the driver to act on; the controller
// never exits the process itself.

use std::thread;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::config::Config;
use crate::host::{MissionHost, RecordSpec, Snapshot, StartErrorClass, WorldState};
use crate::liveness::LivenessCounter;
use crate::observation::{ObservationReducer, TickEvents, STATE_LEN};
use crate::recorder::EpisodeRecorder;
use crate::reward::{RewardComponents, RewardShaper};
use crate::scene::{SceneDescriptor, SceneSource};
use crate::telemetry::{EpisodeEndRecord, EpisodeSink, TickRecord};
use crate::types::{Action, TerminationReason};

/// Where the controller currently sits in the session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Requesting,
    AwaitingBegin,
    AwaitingSpawn,
    Running,
    Terminating,
}

/// Fatal session failures. Every variant aborts the session; the driver
/// decides what aborting the process looks like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Start rejected with a class that retrying cannot help.
    StartRejected { reason: String },
    /// The shared transient-retry attempt budget ran out.
    StartAttemptsExhausted { attempts: u32 },
    /// The host reported protocol errors while we waited for begin.
    BeginFailed { errors: Vec<String> },
    /// The has-begun flag never came up within the hard timeout.
    BeginTimeout { waited_ms: u64 },
    /// The spawn precondition kept failing across the restart bound.
    SpawnRestartsExhausted { restarts: u32 },
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::StartRejected { reason } => {
                write!(f, "mission start rejected: {reason}")
            }
            SessionError::StartAttemptsExhausted { attempts } => {
                write!(f, "mission start failed after {attempts} attempts")
            }
            SessionError::BeginFailed { errors } => {
                write!(f, "errors while waiting for mission begin: {}", errors.join("; "))
            }
            SessionError::BeginTimeout { waited_ms } => {
                write!(f, "mission did not begin within {waited_ms}ms")
            }
            SessionError::SpawnRestartsExhausted { restarts } => {
                write!(f, "spawn precondition failed across {restarts} restarts")
            }
        }
    }
}

impl std::error::Error for SessionError {}

/// The active episode's identity and progress. Reward totals live in the
/// shaper, histories in the recorder.
#[derive(Debug, Clone, Default)]
pub struct Episode {
    pub index: u64,
    pub session_id: String,
    pub ticks: u64,
}

/// What one tick produced, for the driver and for tests.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub tick: u64,
    pub observed: bool,
    pub events: TickEvents,
    pub components: RewardComponents,
    pub tick_reward: f64,
    pub state: [f64; STATE_LEN],
    pub running: bool,
}

/// Episode lifecycle controller.
///
/// Owns the episode identity and the agent liveness counter; composes the
/// reducer, shaper, and recorder and threads each tick's outcome through
/// them. Single-threaded; every wait is a blocking sleep.
pub struct SessionController<H, C, S>
where
    H: MissionHost,
    C: SceneSource,
    S: EpisodeSink,
{
    cfg: Config,
    host: H,
    scene: C,
    sink: S,
    phase: SessionPhase,
    episode: Episode,
    first_episode: bool,
    role: u32,
    agent_liveness: LivenessCounter,
    reducer: ObservationReducer,
    shaper: RewardShaper,
    recorder: EpisodeRecorder,
}

impl<H, C, S> SessionController<H, C, S>
where
    H: MissionHost,
    C: SceneSource,
    S: EpisodeSink,
{
    pub fn new(cfg: Config, host: H, scene: C, sink: S) -> Self {
        let agent_liveness = LivenessCounter::new(cfg.agent_liveness_ceiling());
        let reducer = ObservationReducer::new(&cfg);
        Self {
            cfg,
            host,
            scene,
            sink,
            phase: SessionPhase::Idle,
            episode: Episode::default(),
            first_episode: true,
            role: 0,
            agent_liveness,
            reducer,
            shaper: RewardShaper::new(),
            recorder: EpisodeRecorder::new(),
        }
    }

    /// Drive the full handshake for a new episode: request the session,
    /// wait for begin, wait for the spawn precondition. A failed spawn
    /// wait quits, pauses for the grace period, and re-enters Requesting;
    /// the restart counter bounds that loop.
    pub fn start_episode(&mut self) -> Result<(), SessionError> {
        let hs = self.cfg.handshake;
        let mut restarts: u32 = 0;
        loop {
            let descriptor = self.scene.descriptor(self.first_episode);
            self.first_episode = false;
            self.episode.session_id = Uuid::new_v4().to_string();

            self.phase = SessionPhase::Requesting;
            if let Err(err) = self.request_start(&descriptor) {
                self.phase = SessionPhase::Idle;
                return Err(err);
            }

            self.phase = SessionPhase::AwaitingBegin;
            if let Err(err) = self.await_begin() {
                self.phase = SessionPhase::Idle;
                return Err(err);
            }

            self.phase = SessionPhase::AwaitingSpawn;
            if self.await_spawn() {
                break;
            }

            self.host.send_command("quit");
            restarts += 1;
            if restarts >= hs.max_spawn_restarts {
                self.phase = SessionPhase::Idle;
                return Err(SessionError::SpawnRestartsExhausted { restarts });
            }
            eprintln!(
                "WARN: [session] spawn precondition not met; restarting handshake ({restarts}/{})",
                hs.max_spawn_restarts
            );
            pause(hs.spawn_grace_ms);
        }

        pause(hs.post_spawn_settle_ms);
        for command in self.scene.setup_commands() {
            self.host.send_command(command);
        }
        pause(hs.post_setup_settle_ms);

        self.agent_liveness.reset();
        self.reducer.clear_extinction();
        self.episode.index += 1;
        self.episode.ticks = 0;
        self.phase = SessionPhase::Running;
        self.sink
            .log_episode_start(self.episode.index, &self.episode.session_id);
        Ok(())
    }

    /// The episode continues while the agent liveness counter is alive and
    /// no extinction snapshot has been seen.
    pub fn is_episode_running(&self) -> bool {
        self.agent_liveness.is_alive() && !self.reducer.target_extinct()
    }

    /// Issue one action: command, hold, stop command. Fire-and-forget on
    /// both ends; the host never acknowledges.
    pub fn apply_action(&mut self, action: Action) {
        let timings = self.cfg.actions;
        self.host.send_command(&action.command(&timings));
        pause(action.hold_ms(&timings));
        self.host.send_command(action.stop_command());
    }

    /// One tick of the run phase: poll, reduce, shape, observe liveness.
    ///
    /// Only the most recent buffered snapshot is decoded; anything older
    /// is dropped. An empty poll performs no reduction and decrements the
    /// agent counter instead.
    pub fn observe(&mut self) -> TickReport {
        self.episode.ticks += 1;
        let world = self.host.get_state();
        let native_sum: f64 = world.rewards_since_last.iter().sum();
        let observed = world.observation_count_since_last > 0;

        let mut events = TickEvents::default();
        if observed {
            self.agent_liveness.reset();
            if let Some(snap) = decode_latest(&world) {
                events = self.reducer.reduce(&snap);
            }
        } else {
            self.agent_liveness.decrement();
        }

        let terminal_now = !self.agent_liveness.is_alive() && !self.reducer.target_extinct();
        let components = self
            .shaper
            .apply(native_sum, observed, &events, terminal_now);

        let state = self.reducer.state().to_vector();
        self.sink.log_tick(&TickRecord {
            episode: self.episode.index,
            tick: self.episode.ticks,
            observed,
            tick_reward: self.shaper.tick_reward(),
            episode_reward: self.shaper.episode_reward(),
            lifetime_reward: self.shaper.lifetime_reward(),
            kills: events.kills,
            life_lost: events.life_lost,
            line_of_sight: events.line_of_sight,
            targets_alive: self.reducer.targets_alive(),
            liveness: self.agent_liveness.value(),
            state,
        });

        TickReport {
            tick: self.episode.ticks,
            observed,
            events,
            components,
            tick_reward: self.shaper.tick_reward(),
            state,
            running: self.is_episode_running(),
        }
    }

    /// End the episode: fold it into history, quit the mission, drain
    /// until the host confirms the mission over, then reset per-episode
    /// state. The drain has no timeout; a host that never confirms hangs
    /// the controller here.
    pub fn finish_episode(&mut self) -> EpisodeEndRecord {
        self.phase = SessionPhase::Terminating;
        let reason = if self.reducer.target_extinct() {
            TerminationReason::TargetsExtinct
        } else {
            TerminationReason::AgentUnresponsive
        };
        let final_life = self.reducer.state().life;
        let survival_time = self.reducer.survival_time();
        let episode_reward = self.shaper.end_episode();
        let row = self.recorder.record(
            survival_time,
            final_life,
            self.reducer.kill_score(),
            episode_reward,
        );

        self.host.send_command("quit");
        loop {
            if !self.host.get_state().is_running {
                break;
            }
            pause(self.cfg.handshake.drain_poll_ms);
        }

        self.reducer.reset_episode();
        self.agent_liveness.reset();

        let record = EpisodeEndRecord {
            episode: self.episode.index,
            ticks: self.episode.ticks,
            reason,
            episode_reward,
            final_life,
            kill_delta: row.kill_delta,
            survival_time,
        };
        self.sink.log_episode_end(&record);
        self.sink.flush();
        self.phase = SessionPhase::Idle;
        record
    }

    fn request_start(&mut self, descriptor: &SceneDescriptor) -> Result<(), SessionError> {
        let hs = self.cfg.handshake;
        let record = RecordSpec::default();
        let mut attempts_used: u32 = 0;
        loop {
            let result = self.host.start_session(
                descriptor,
                &record,
                self.role,
                &self.episode.session_id,
            );
            let err = match result {
                Ok(()) => return Ok(()),
                Err(err) => err,
            };
            match &err.class {
                StartErrorClass::WarmingUp => {
                    // Does not consume an attempt.
                    eprintln!(
                        "INFO: [session] host warming up; retrying in {}ms",
                        hs.retry_backoff_ms
                    );
                    pause(hs.retry_backoff_ms);
                }
                StartErrorClass::InsufficientPeers | StartErrorClass::PeerNotFound => {
                    attempts_used += 1;
                    if attempts_used >= hs.max_start_attempts {
                        return Err(SessionError::StartAttemptsExhausted {
                            attempts: attempts_used,
                        });
                    }
                    eprintln!(
                        "WARN: [session] {err}; {} attempts left",
                        hs.max_start_attempts - attempts_used
                    );
                    pause(hs.retry_backoff_ms);
                }
                StartErrorClass::Other(reason) => {
                    return Err(SessionError::StartRejected {
                        reason: reason.clone(),
                    });
                }
            }
        }
    }

    fn await_begin(&mut self) -> Result<(), SessionError> {
        let hs = self.cfg.handshake;
        let started = Instant::now();
        let timeout = Duration::from_millis(hs.begin_timeout_ms);
        loop {
            let peek = self.host.peek_state();
            if !peek.errors.is_empty() {
                return Err(SessionError::BeginFailed {
                    errors: peek.errors,
                });
            }
            if peek.has_begun {
                return Ok(());
            }
            if started.elapsed() >= timeout {
                return Err(SessionError::BeginTimeout {
                    waited_ms: hs.begin_timeout_ms,
                });
            }
            pause(hs.begin_poll_ms);
        }
    }

    /// Wait for the spawn precondition: a snapshot carrying at least one
    /// target entity and the full expected entity count. Returns false
    /// once the spawn counter exhausts.
    fn await_spawn(&mut self) -> bool {
        let mut counter = LivenessCounter::new(self.cfg.spawn_liveness_ceiling());
        loop {
            let world = self.host.get_state();
            if let Some(snap) = decode_latest(&world) {
                if snap.count_named(&self.cfg.target_name) >= 1
                    && snap.entities.len() == self.cfg.expected_entity_count()
                {
                    return true;
                }
            }
            counter.decrement();
            if !counter.is_alive() {
                return false;
            }
            pause(self.cfg.tick_ms);
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn episode(&self) -> &Episode {
        &self.episode
    }

    pub fn recorder(&self) -> &EpisodeRecorder {
        &self.recorder
    }

    pub fn lifetime_reward(&self) -> f64 {
        self.shaper.lifetime_reward()
    }

    pub fn agent_liveness(&self) -> &LivenessCounter {
        &self.agent_liveness
    }

    pub fn reducer(&self) -> &ObservationReducer {
        &self.reducer
    }

    /// Host access for tests and drivers that inspect the peer.
    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}

/// Decode the most recent buffered snapshot; older entries are dropped.
/// Undecodable payloads reduce nothing (the poll still counted as
/// observed for liveness purposes).
fn decode_latest(world: &WorldState) -> Option<Snapshot> {
    let text = world.observations.last()?;
    match Snapshot::decode(text) {
        Ok(snap) => Some(snap),
        Err(err) => {
            eprintln!("WARN: [session] dropping undecodable snapshot: {err}");
            None
        }
    }
}

fn pause(ms: u64) {
    if ms > 0 {
        thread::sleep(Duration::from_millis(ms));
    }
}
