// src/reward.rs
//
// Shaped reward bookkeeping: folds the host's native reward stream and
// the reducer's derived events into tick / episode / lifetime totals.
// This module is the exclusive owner of all reward accumulators.

use serde::{Deserialize, Serialize};

use crate::observation::TickEvents;

/// Flat cost charged on every tick that carried an observation.
pub const TICK_COST: f64 = 0.1;
/// Bonus per net target-count decrease.
pub const KILL_BONUS: f64 = 100.0;
/// Penalty when the agent's life decreased this tick.
pub const DAMAGE_PENALTY: f64 = 5.0;
/// One-shot penalty when agent liveness expires without extinction.
pub const TERMINAL_PENALTY: f64 = 100.0;

/// Per-tick reward term breakdown, logged alongside the scalar total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardComponents {
    /// Sum of reward values the host reported as new this tick.
    pub native: f64,
    /// −0.1 on observed ticks, 0 otherwise.
    pub tick_cost: f64,
    /// +100 per net target-count decrease.
    pub kill_bonus: f64,
    /// −5 when life decreased.
    pub damage_penalty: f64,
    /// −100 at most once per episode, on liveness expiry without a win.
    pub terminal_penalty: f64,
}

impl RewardComponents {
    pub fn total(&self) -> f64 {
        self.native + self.tick_cost + self.kill_bonus + self.damage_penalty
            + self.terminal_penalty
    }
}

/// Tick / episode / lifetime reward accumulators.
#[derive(Debug, Clone, Default)]
pub struct RewardShaper {
    tick_reward: f64,
    episode_reward: f64,
    lifetime_reward: f64,
    terminal_charged: bool,
}

impl RewardShaper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one tick into the totals.
    ///
    /// `terminal_now` is true on ticks where the agent liveness counter is
    /// expired while the extinction flag is still false; the −100 penalty
    /// it triggers is charged at most once per episode regardless of how
    /// many such ticks follow.
    pub fn apply(
        &mut self,
        native_sum: f64,
        observed: bool,
        events: &TickEvents,
        terminal_now: bool,
    ) -> RewardComponents {
        let terminal_penalty = if terminal_now && !self.terminal_charged {
            self.terminal_charged = true;
            -TERMINAL_PENALTY
        } else {
            0.0
        };

        let components = RewardComponents {
            native: native_sum,
            tick_cost: if observed { -TICK_COST } else { 0.0 },
            kill_bonus: KILL_BONUS * f64::from(events.kills),
            damage_penalty: if events.life_lost { -DAMAGE_PENALTY } else { 0.0 },
            terminal_penalty,
        };

        self.tick_reward = components.total();
        self.episode_reward += self.tick_reward;
        self.lifetime_reward += self.tick_reward;
        components
    }

    /// Close the episode: returns its reward and resets the per-episode
    /// accumulators. The lifetime total is explicitly preserved.
    pub fn end_episode(&mut self) -> f64 {
        let finished = self.episode_reward;
        self.episode_reward = 0.0;
        self.tick_reward = 0.0;
        self.terminal_charged = false;
        finished
    }

    /// Reward of the most recent tick.
    pub fn tick_reward(&self) -> f64 {
        self.tick_reward
    }

    pub fn episode_reward(&self) -> f64 {
        self.episode_reward
    }

    /// Monotonic total over the whole session. Never reset.
    pub fn lifetime_reward(&self) -> f64 {
        self.lifetime_reward
    }
}
