// src/sim_host.rs
//
// Deterministic in-process mission host for harness runs and lifecycle
// tests. Implements the full control-channel boundary: scripted start
// rejections, a begin delay, a spawn delay, then a toy arena that moves
// targets, applies damage, and emits snapshot JSON each poll. All
// randomness comes from a seeded ChaCha8 stream.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::json;

use crate::host::{
    MissionHost, PeekState, RecordSpec, StartErrorClass, StartSessionError, WorldState,
};
use crate::scene::SceneDescriptor;

/// Configuration for the simulated host.
#[derive(Debug, Clone)]
pub struct SimHostConfig {
    pub seed: u64,
    /// Start rejections with the warming-up class before the first accept.
    pub warming_up_rejections: u32,
    /// Start rejections with the insufficient-peers class before accept.
    pub insufficient_rejections: u32,
    /// Peek polls before the has-begun flag comes up.
    pub begin_delay_polls: u32,
    /// State polls before the full entity set materialises.
    pub spawn_delay_polls: u32,
    /// After this many run-phase polls the host goes silent (simulated
    /// connection death). None keeps it responsive forever.
    pub silent_after_polls: Option<u32>,
    pub target_count: usize,
    pub target_name: String,
    pub agent_name: String,
    /// Targets spawn uniformly in [-half_extent, half_extent]^2.
    pub half_extent: f64,
    pub target_life: f64,
    pub agent_life: f64,
    /// Native reward the host reports per landed hit.
    pub hit_reward: f64,
}

impl Default for SimHostConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            warming_up_rejections: 0,
            insufficient_rejections: 0,
            begin_delay_polls: 2,
            spawn_delay_polls: 2,
            silent_after_polls: None,
            target_count: 3,
            target_name: "Zombie".to_string(),
            agent_name: "Robot".to_string(),
            half_extent: 15.0,
            target_life: 10.0,
            agent_life: 20.0,
            hit_reward: 30.0,
        }
    }
}

#[derive(Debug, Clone)]
struct SimTarget {
    x: f64,
    z: f64,
    yaw: f64,
    life: f64,
}

/// Deterministic simulated mission host.
pub struct SimHost {
    cfg: SimHostConfig,
    rng: ChaCha8Rng,
    started: bool,
    running: bool,
    begin_polls_left: u32,
    spawn_polls_left: u32,
    run_polls: u32,
    targets: Vec<SimTarget>,
    agent_x: f64,
    agent_z: f64,
    agent_yaw: f64,
    agent_life: f64,
    kills_total: u32,
    // Command impulses latched until the next poll consumes them. The
    // controller's stop commands often land before the poll; the impulse
    // model keeps the action's effect regardless.
    attack_armed: bool,
    move_impulse: f64,
    strafe_impulse: f64,
    turn_impulse: f64,
    pending_rewards: Vec<f64>,
    commands: Vec<String>,
}

impl SimHost {
    pub fn new(cfg: SimHostConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(cfg.seed);
        Self {
            cfg,
            rng,
            started: false,
            running: false,
            begin_polls_left: 0,
            spawn_polls_left: 0,
            run_polls: 0,
            targets: Vec::new(),
            agent_x: 0.0,
            agent_z: 0.0,
            agent_yaw: 0.0,
            agent_life: 0.0,
            kills_total: 0,
            attack_armed: false,
            move_impulse: 0.0,
            strafe_impulse: 0.0,
            turn_impulse: 0.0,
            pending_rewards: Vec::new(),
            commands: Vec::new(),
        }
    }

    /// Every command the controller has sent, in order.
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn targets_alive(&self) -> usize {
        self.targets.len()
    }

    fn spawn_arena(&mut self) {
        self.targets.clear();
        for _ in 0..self.cfg.target_count {
            let x = self
                .rng
                .gen_range(-self.cfg.half_extent..=self.cfg.half_extent)
                .round();
            let z = self
                .rng
                .gen_range(-self.cfg.half_extent..=self.cfg.half_extent)
                .round();
            let yaw = self.rng.gen_range(0.0..360.0);
            self.targets.push(SimTarget {
                x,
                z,
                yaw,
                life: self.cfg.target_life,
            });
        }
        self.agent_x = 0.0;
        self.agent_z = 0.0;
        self.agent_yaw = 0.0;
        self.agent_life = self.cfg.agent_life;
        self.attack_armed = false;
        self.move_impulse = 0.0;
        self.strafe_impulse = 0.0;
        self.turn_impulse = 0.0;
    }

    /// Advance the toy arena by one poll quantum.
    fn step_world(&mut self) {
        // Agent motion from the latched command impulses.
        let yaw_rad = self.agent_yaw.to_radians();
        self.agent_x += self.move_impulse * yaw_rad.cos() * 0.5 + self.strafe_impulse * 0.3;
        self.agent_z += self.move_impulse * yaw_rad.sin() * 0.5;
        self.agent_yaw = (self.agent_yaw + self.turn_impulse * 30.0).rem_euclid(360.0);
        self.move_impulse = 0.0;
        self.strafe_impulse = 0.0;
        self.turn_impulse = 0.0;

        // Targets shamble toward the agent with a little jitter.
        for t in &mut self.targets {
            let dx = self.agent_x - t.x;
            let dz = self.agent_z - t.z;
            let dist = (dx * dx + dz * dz).sqrt().max(1e-6);
            let jitter_x: f64 = self.rng.gen_range(-0.3..0.3);
            let jitter_z: f64 = self.rng.gen_range(-0.3..0.3);
            t.x += dx / dist * 0.4 + jitter_x;
            t.z += dz / dist * 0.4 + jitter_z;
            t.yaw = dz.atan2(dx).to_degrees().rem_euclid(360.0);
        }

        // An armed attack lands on the nearest in-range target.
        if self.attack_armed {
            self.attack_armed = false;
            if let Some(idx) = self.nearest_target_within(3.0) {
                self.targets[idx].life -= 4.0;
                self.pending_rewards.push(self.cfg.hit_reward);
                if self.targets[idx].life <= 0.0 {
                    self.targets.remove(idx);
                    self.kills_total += 1;
                }
            }
        }

        // Adjacent targets bite.
        let adjacent = self
            .targets
            .iter()
            .filter(|t| {
                let dx = t.x - self.agent_x;
                let dz = t.z - self.agent_z;
                (dx * dx + dz * dz).sqrt() < 2.0
            })
            .count();
        if adjacent > 0 && self.rng.gen_bool(0.5) {
            self.agent_life = (self.agent_life - 2.0).max(0.0);
        }
    }

    fn nearest_target_within(&self, range: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, t) in self.targets.iter().enumerate() {
            let dx = t.x - self.agent_x;
            let dz = t.z - self.agent_z;
            let dist = (dx * dx + dz * dz).sqrt();
            if dist <= range && best.map_or(true, |(_, d)| dist < d) {
                best = Some((i, dist));
            }
        }
        best.map(|(i, _)| i)
    }

    fn snapshot_json(&self, spawned: bool) -> String {
        let mut entities = vec![json!({
            "name": self.cfg.agent_name,
            "x": self.agent_x,
            "z": self.agent_z,
            "yaw": self.agent_yaw,
        })];
        if spawned {
            for t in &self.targets {
                entities.push(json!({
                    "name": self.cfg.target_name,
                    "x": t.x,
                    "z": t.z,
                    "yaw": t.yaw,
                }));
            }
        }

        let mut snapshot = json!({
            "entities": entities,
            "Life": self.agent_life,
            "MobsKilled": self.kills_total,
            "XPos": self.agent_x,
            "ZPos": self.agent_z,
            "TimeAlive": self.run_polls,
        });

        if let Some(idx) = self.nearest_target_within(10.0) {
            let t = &self.targets[idx];
            let dx = t.x - self.agent_x;
            let dz = t.z - self.agent_z;
            let dist = (dx * dx + dz * dz).sqrt();
            snapshot["LineOfSight"] = json!({
                "hitType": "entity",
                "inRange": dist <= 3.0,
                "type": self.cfg.target_name,
            });
        }

        snapshot.to_string()
    }
}

impl MissionHost for SimHost {
    fn start_session(
        &mut self,
        _descriptor: &SceneDescriptor,
        _record: &RecordSpec,
        _role: u32,
        _session_id: &str,
    ) -> Result<(), StartSessionError> {
        if self.cfg.warming_up_rejections > 0 {
            self.cfg.warming_up_rejections -= 1;
            return Err(StartSessionError::new(StartErrorClass::WarmingUp));
        }
        if self.cfg.insufficient_rejections > 0 {
            self.cfg.insufficient_rejections -= 1;
            return Err(StartSessionError::new(StartErrorClass::InsufficientPeers));
        }
        self.started = true;
        self.running = true;
        self.begin_polls_left = self.cfg.begin_delay_polls;
        self.spawn_polls_left = self.cfg.spawn_delay_polls;
        self.run_polls = 0;
        self.pending_rewards.clear();
        self.spawn_arena();
        Ok(())
    }

    fn peek_state(&mut self) -> PeekState {
        if !self.started {
            return PeekState::default();
        }
        if self.begin_polls_left > 0 {
            self.begin_polls_left -= 1;
            return PeekState {
                has_begun: false,
                errors: Vec::new(),
            };
        }
        PeekState {
            has_begun: true,
            errors: Vec::new(),
        }
    }

    fn get_state(&mut self) -> WorldState {
        if !self.started || !self.running {
            return WorldState::default();
        }

        if self.spawn_polls_left > 0 {
            self.spawn_polls_left -= 1;
            // Entities have not materialised yet; only the agent shows up.
            return WorldState {
                is_running: true,
                observations: vec![self.snapshot_json(false)],
                rewards_since_last: Vec::new(),
                observation_count_since_last: 1,
            };
        }

        self.run_polls += 1;
        if let Some(limit) = self.cfg.silent_after_polls {
            if self.run_polls > limit {
                // Connection death: the mission nominally runs but no
                // observations flow any more.
                return WorldState {
                    is_running: true,
                    observations: Vec::new(),
                    rewards_since_last: Vec::new(),
                    observation_count_since_last: 0,
                };
            }
        }

        self.step_world();
        WorldState {
            is_running: true,
            observations: vec![self.snapshot_json(true)],
            rewards_since_last: std::mem::take(&mut self.pending_rewards),
            observation_count_since_last: 1,
        }
    }

    fn send_command(&mut self, command: &str) {
        self.commands.push(command.to_string());
        match command {
            "quit" => {
                self.running = false;
            }
            "attack 1" => self.attack_armed = true,
            "move 1" => self.move_impulse = 1.0,
            "move -1" => self.move_impulse = -1.0,
            "strafe 1" => self.strafe_impulse = 1.0,
            "strafe -1" => self.strafe_impulse = -1.0,
            other => {
                if let Some(rate) = other.strip_prefix("turn ") {
                    if let Ok(rate) = rate.parse::<f64>() {
                        if rate != 0.0 {
                            self.turn_impulse = rate;
                        }
                    }
                }
                // Stop commands and setup / chat commands are accepted
                // and otherwise ignored.
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Snapshot;

    fn started_host(cfg: SimHostConfig) -> SimHost {
        let mut host = SimHost::new(cfg);
        let descriptor = SceneDescriptor::new("arena", true);
        host.start_session(&descriptor, &RecordSpec::default(), 0, "s")
            .unwrap();
        host
    }

    #[test]
    fn scripted_rejections_then_accept() {
        let mut host = SimHost::new(SimHostConfig {
            warming_up_rejections: 1,
            insufficient_rejections: 2,
            ..SimHostConfig::default()
        });
        let descriptor = SceneDescriptor::new("arena", true);
        let record = RecordSpec::default();

        let err = host
            .start_session(&descriptor, &record, 0, "s")
            .unwrap_err();
        assert_eq!(err.class, StartErrorClass::WarmingUp);
        for _ in 0..2 {
            let err = host
                .start_session(&descriptor, &record, 0, "s")
                .unwrap_err();
            assert_eq!(err.class, StartErrorClass::InsufficientPeers);
        }
        assert!(host.start_session(&descriptor, &record, 0, "s").is_ok());
    }

    #[test]
    fn begin_flag_comes_up_after_the_delay() {
        let mut host = started_host(SimHostConfig {
            begin_delay_polls: 2,
            ..SimHostConfig::default()
        });
        assert!(!host.peek_state().has_begun);
        assert!(!host.peek_state().has_begun);
        assert!(host.peek_state().has_begun);
    }

    #[test]
    fn spawn_delay_snapshots_lack_targets() {
        let mut host = started_host(SimHostConfig {
            begin_delay_polls: 0,
            spawn_delay_polls: 1,
            ..SimHostConfig::default()
        });
        let world = host.get_state();
        let snap = Snapshot::decode(world.observations.last().unwrap()).unwrap();
        assert_eq!(snap.count_named("Zombie"), 0);

        let world = host.get_state();
        let snap = Snapshot::decode(world.observations.last().unwrap()).unwrap();
        assert_eq!(snap.count_named("Zombie"), 3);
        assert_eq!(snap.entities.len(), 4);
    }

    #[test]
    fn quit_stops_the_mission() {
        let mut host = started_host(SimHostConfig::default());
        assert!(host.get_state().is_running);
        host.send_command("quit");
        assert!(!host.get_state().is_running);
    }

    #[test]
    fn same_seed_same_world() {
        let make = || {
            let mut host = started_host(SimHostConfig {
                begin_delay_polls: 0,
                spawn_delay_polls: 0,
                seed: 9,
                ..SimHostConfig::default()
            });
            (0..20)
                .map(|_| host.get_state().observations.pop().unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(make(), make());
    }

    #[test]
    fn silence_kicks_in_after_the_limit() {
        let mut host = started_host(SimHostConfig {
            begin_delay_polls: 0,
            spawn_delay_polls: 0,
            silent_after_polls: Some(2),
            ..SimHostConfig::default()
        });
        assert_eq!(host.get_state().observation_count_since_last, 1);
        assert_eq!(host.get_state().observation_count_since_last, 1);
        assert_eq!(host.get_state().observation_count_since_last, 0);
        assert!(host.get_state().is_running);
    }
}
