// src/config.rs
//
// Central configuration for the arena episode controller.
// Everything here is construct-time: the controller never mutates its
// config, and nothing below is runtime-tunable. A handful of timing
// knobs accept environment overrides for research runs.

/// Top-level configuration for one agent session.
#[derive(Debug, Clone)]
pub struct Config {
    /// Human-readable config / release version.
    pub version: &'static str,
    /// Host tick duration in milliseconds. Every poll cadence and hold
    /// duration below is derived from this.
    pub tick_ms: u64,
    /// Number of agents the mission expects (this controller drives one).
    pub agent_count: usize,
    /// Number of target entities the scene spawns.
    pub target_count: usize,
    /// Entity name the reward terms are defined around.
    pub target_name: String,
    /// Full life value the agent starts an episode with.
    pub full_life: f64,
    /// Liveness budgets for the two unresponsiveness counters.
    pub liveness: LivenessConfig,
    /// Handshake retry / wait / drain timing.
    pub handshake: HandshakeConfig,
    /// Per-action command hold durations.
    pub actions: ActionTimings,
}

/// Budgets (in wall milliseconds) tolerated before a wait is declared dead.
/// Counter ceilings are these budgets divided by the tick duration.
#[derive(Debug, Clone, Copy)]
pub struct LivenessConfig {
    /// Consecutive-empty-poll budget for the running agent.
    pub agent_budget_ms: u64,
    /// Budget for the spawn precondition wait after mission start.
    pub spawn_budget_ms: u64,
}

/// Timing for the mission handshake protocol.
#[derive(Debug, Clone, Copy)]
pub struct HandshakeConfig {
    /// Sleep between start-session retries.
    pub retry_backoff_ms: u64,
    /// Shared attempt budget for the consuming transient error classes.
    pub max_start_attempts: u32,
    /// Poll cadence while waiting for the has-begun flag.
    pub begin_poll_ms: u64,
    /// Hard timeout on the begin wait. Non-retryable.
    pub begin_timeout_ms: u64,
    /// Grace period after sending quit when the spawn wait exhausts.
    pub spawn_grace_ms: u64,
    /// Bound on spawn-failure restarts of the whole handshake.
    pub max_spawn_restarts: u32,
    /// Poll cadence for the mission-end drain after quit.
    pub drain_poll_ms: u64,
    /// Settle sleep between the spawn wait and the setup commands.
    pub post_spawn_settle_ms: u64,
    /// Settle sleep after the setup commands, before the first tick.
    pub post_setup_settle_ms: u64,
}

/// Hold duration per action class before the matching stop command is sent,
/// plus the turn-rate magnitude used by the turn commands.
#[derive(Debug, Clone, Copy)]
pub struct ActionTimings {
    pub attack_hold_ms: u64,
    pub move_hold_ms: u64,
    pub strafe_hold_ms: u64,
    pub turn_hold_ms: u64,
    /// Magnitude of the continuous turn command (signed per direction).
    pub turn_rate: f64,
}

impl ActionTimings {
    /// Derive hold durations from the host tick duration.
    pub fn from_tick(tick_ms: u64) -> Self {
        let t = tick_ms as f64;
        Self {
            attack_hold_ms: (t * 15.0) as u64,
            move_hold_ms: (t * 2.5) as u64,
            strafe_hold_ms: (t * 3.2) as u64,
            turn_hold_ms: (t * 1.6) as u64,
            turn_rate: 0.3,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let tick_ms = 10;
        Self {
            version: "arena-env-0.3",
            tick_ms,
            agent_count: 1,
            target_count: 3,
            target_name: "Zombie".to_string(),
            full_life: 20.0,
            liveness: LivenessConfig {
                agent_budget_ms: 100,
                spawn_budget_ms: 500,
            },
            handshake: HandshakeConfig {
                retry_backoff_ms: 2_000,
                max_start_attempts: 5,
                begin_poll_ms: 100,
                begin_timeout_ms: 120_000,
                spawn_grace_ms: 3_000,
                max_spawn_restarts: 8,
                drain_poll_ms: 100,
                post_spawn_settle_ms: tick_ms * 2,
                post_setup_settle_ms: tick_ms,
            },
            actions: ActionTimings::from_tick(tick_ms),
        }
    }
}

impl Config {
    /// Default config with the handful of env overrides applied.
    pub fn from_env() -> Self {
        let mut cfg = Config::default();
        if let Some(v) = env_u64("ARENA_TICK_MS") {
            cfg.tick_ms = v.max(1);
            cfg.actions = ActionTimings::from_tick(cfg.tick_ms);
            cfg.handshake.post_spawn_settle_ms = cfg.tick_ms * 2;
            cfg.handshake.post_setup_settle_ms = cfg.tick_ms;
        }
        if let Some(v) = env_u64("ARENA_TARGET_COUNT") {
            cfg.target_count = v as usize;
        }
        if let Some(v) = env_u64("ARENA_BEGIN_TIMEOUT_MS") {
            cfg.handshake.begin_timeout_ms = v;
        }
        cfg
    }

    /// Ceiling for the agent unresponsiveness counter.
    pub fn agent_liveness_ceiling(&self) -> u32 {
        ceiling(self.liveness.agent_budget_ms, self.tick_ms)
    }

    /// Ceiling for the spawn-precondition unresponsiveness counter.
    pub fn spawn_liveness_ceiling(&self) -> u32 {
        ceiling(self.liveness.spawn_budget_ms, self.tick_ms)
    }

    /// Entity count the spawn precondition requires in a snapshot.
    pub fn expected_entity_count(&self) -> usize {
        self.agent_count + self.target_count
    }
}

fn ceiling(budget_ms: u64, tick_ms: u64) -> u32 {
    ((budget_ms / tick_ms.max(1)) as u32).max(1)
}

fn env_u64(key: &str) -> Option<u64> {
    let raw = std::env::var(key).ok()?;
    if raw.is_empty() {
        return None;
    }
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            eprintln!("WARN: [config] invalid {key}={raw:?}; ignoring");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ceilings_follow_tick_duration() {
        let cfg = Config::default();
        assert_eq!(cfg.agent_liveness_ceiling(), 10);
        assert_eq!(cfg.spawn_liveness_ceiling(), 50);
        assert_eq!(cfg.expected_entity_count(), 4);
    }

    #[test]
    fn ceiling_never_zero() {
        let mut cfg = Config::default();
        cfg.liveness.agent_budget_ms = 1;
        cfg.tick_ms = 50;
        assert_eq!(cfg.agent_liveness_ceiling(), 1);
    }

    #[test]
    fn action_holds_scale_with_tick() {
        let timings = ActionTimings::from_tick(10);
        assert_eq!(timings.attack_hold_ms, 150);
        assert_eq!(timings.move_hold_ms, 25);
        assert_eq!(timings.strafe_hold_ms, 32);
        assert_eq!(timings.turn_hold_ms, 16);
    }
}
