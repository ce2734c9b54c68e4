// src/observation.rs
//
// Reduction of one raw host snapshot into the fixed-shape agent state
// vector plus the discrete events the reward terms are defined around
// (kills, damage, line-of-sight class, target extinction).

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::host::Snapshot;
use crate::types::LineOfSight;

/// Length of the feature vector. An external contract: downstream policy
/// code depends on positional meaning, so the ordering in
/// [`AgentState::to_vector`] must never change.
pub const STATE_LEN: usize = 15;

/// Number of fixed target slots in the state vector.
pub const TARGET_SLOTS: usize = 3;

/// Fixed-shape agent state, one labelled field per feature.
///
/// Slot assignment note: target slots are filled in snapshot scan order,
/// not by stable entity identity. A target occupying slot 1 one tick may
/// occupy slot 0 the next if the host reorders its entity list. Unseen
/// targets keep their stale coordinates rather than being cleared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    /// 1.0 when a target entity is on the crosshair within range.
    pub los_in_range: f64,
    /// 1.0 when a target entity is on the crosshair out of range.
    pub los: f64,
    /// Rounded agent x position.
    pub pos_x: f64,
    /// Rounded agent z position.
    pub pos_z: f64,
    /// Last reported agent life.
    pub life: f64,
    /// Agent yaw, normalised to [0, 360).
    pub yaw: f64,
    pub target0_yaw: f64,
    pub target1_yaw: f64,
    pub target2_yaw: f64,
    pub target0_x: f64,
    pub target0_z: f64,
    pub target1_x: f64,
    pub target1_z: f64,
    pub target2_x: f64,
    pub target2_z: f64,
}

impl AgentState {
    /// Episode-start state: everything zero except life at full.
    pub fn fresh(full_life: f64) -> Self {
        Self {
            los_in_range: 0.0,
            los: 0.0,
            pos_x: 0.0,
            pos_z: 0.0,
            life: full_life,
            yaw: 0.0,
            target0_yaw: 0.0,
            target1_yaw: 0.0,
            target2_yaw: 0.0,
            target0_x: 0.0,
            target0_z: 0.0,
            target1_x: 0.0,
            target1_z: 0.0,
            target2_x: 0.0,
            target2_z: 0.0,
        }
    }

    /// The feature vector in contract order.
    pub fn to_vector(&self) -> [f64; STATE_LEN] {
        [
            self.los_in_range,
            self.los,
            self.pos_x,
            self.pos_z,
            self.life,
            self.yaw,
            self.target0_yaw,
            self.target1_yaw,
            self.target2_yaw,
            self.target0_x,
            self.target0_z,
            self.target1_x,
            self.target1_z,
            self.target2_x,
            self.target2_z,
        ]
    }

    fn set_target_slot(&mut self, slot: usize, x: f64, z: f64, yaw: f64) {
        match slot {
            0 => {
                self.target0_x = x;
                self.target0_z = z;
                self.target0_yaw = yaw;
            }
            1 => {
                self.target1_x = x;
                self.target1_z = z;
                self.target1_yaw = yaw;
            }
            2 => {
                self.target2_x = x;
                self.target2_z = z;
                self.target2_yaw = yaw;
            }
            _ => {}
        }
    }
}

/// Discrete events derived from one snapshot reduction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Net decrease in visible target count this tick.
    pub kills: u32,
    /// Reported life differs from the stored value.
    pub life_changed: bool,
    /// The change was a decrease (the reward-relevant direction).
    pub life_lost: bool,
    /// Raycast classification for this tick.
    pub line_of_sight: LineOfSight,
    /// No target-named entity appeared in this snapshot.
    pub extinct: bool,
}

impl Default for TickEvents {
    fn default() -> Self {
        Self {
            kills: 0,
            life_changed: false,
            life_lost: false,
            line_of_sight: LineOfSight::None,
            extinct: false,
        }
    }
}

/// Converts raw snapshots into [`AgentState`] updates and [`TickEvents`].
///
/// Owns the state vector and the target bookkeeping, nothing else; reward
/// totals live in the shaper and liveness in the session controller.
#[derive(Debug, Clone)]
pub struct ObservationReducer {
    target_name: String,
    target_count: usize,
    full_life: f64,
    state: AgentState,
    targets_alive: usize,
    target_extinct: bool,
    kill_score: u32,
    survival_time: f64,
}

impl ObservationReducer {
    pub fn new(cfg: &Config) -> Self {
        Self {
            target_name: cfg.target_name.clone(),
            target_count: cfg.target_count,
            full_life: cfg.full_life,
            state: AgentState::fresh(cfg.full_life),
            targets_alive: cfg.target_count,
            target_extinct: false,
            kill_score: 0,
            survival_time: 0.0,
        }
    }

    /// Reduce one snapshot. Call only when a poll yielded an observation;
    /// an empty poll performs no reduction at all.
    pub fn reduce(&mut self, snap: &Snapshot) -> TickEvents {
        let mut events = TickEvents::default();

        // Yaw comes from the first listed entity, but a single-entity
        // snapshot (self only) leaves it unchanged.
        if snap.entities.len() >= 2 {
            self.state.yaw = snap.entities[0].yaw.rem_euclid(360.0);
        }

        let visible = snap.count_named(&self.target_name);
        if visible == 0 {
            self.target_extinct = true;
            events.extinct = true;
        } else {
            // Slot assignment by encounter order within this snapshot.
            let mut slot = 0;
            for entity in &snap.entities {
                if entity.name == self.target_name && slot < TARGET_SLOTS {
                    self.state.set_target_slot(
                        slot,
                        entity.x.round(),
                        entity.z.round(),
                        entity.yaw.rem_euclid(360.0),
                    );
                    slot += 1;
                }
            }
        }

        // Net count decrease fires that many kill events, independent of
        // the host's own cumulative kill stat.
        if visible < self.targets_alive {
            events.kills = (self.targets_alive - visible) as u32;
        }
        self.targets_alive = visible;

        self.state.los = 0.0;
        self.state.los_in_range = 0.0;
        if let Some(los) = &snap.line_of_sight {
            if los.hit_type == "entity" && los.entity_type == self.target_name {
                if los.in_range {
                    self.state.los_in_range = 1.0;
                    events.line_of_sight = LineOfSight::InRange;
                } else {
                    self.state.los = 1.0;
                    events.line_of_sight = LineOfSight::OutOfRange;
                }
            }
        }

        if let Some(life) = snap.life {
            if life != self.state.life {
                events.life_changed = true;
                events.life_lost = life < self.state.life;
                self.state.life = life;
            }
        }

        if let (Some(x), Some(z)) = (snap.x_pos, snap.z_pos) {
            self.state.pos_x = x.round();
            self.state.pos_z = z.round();
        }

        if let Some(score) = snap.mobs_killed {
            self.kill_score = score;
        }
        if let Some(time) = snap.time_alive {
            if time != 0.0 {
                self.survival_time = time;
            }
        }

        events
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    pub fn target_extinct(&self) -> bool {
        self.target_extinct
    }

    pub fn targets_alive(&self) -> usize {
        self.targets_alive
    }

    /// Host-reported cumulative kill score (latched, survives episodes).
    pub fn kill_score(&self) -> u32 {
        self.kill_score
    }

    /// Last known survival-time stat, 0 if the host never reported one.
    pub fn survival_time(&self) -> f64 {
        self.survival_time
    }

    /// Clear the extinction flag at episode start.
    pub fn clear_extinction(&mut self) {
        self.target_extinct = false;
    }

    /// Reset per-episode state to episode-start defaults. The latched
    /// kill score and survival time persist across episodes.
    pub fn reset_episode(&mut self) {
        self.state = AgentState::fresh(self.full_life);
        self.targets_alive = self.target_count;
        self.target_extinct = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{EntityObs, LineOfSightObs};

    fn cfg() -> Config {
        Config::default()
    }

    fn entity(name: &str, x: f64, z: f64, yaw: f64) -> EntityObs {
        EntityObs {
            name: name.to_string(),
            x,
            z,
            yaw,
        }
    }

    #[test]
    fn vector_is_always_fifteen_wide() {
        let reducer = ObservationReducer::new(&cfg());
        assert_eq!(reducer.state().to_vector().len(), STATE_LEN);

        let fresh = AgentState::fresh(20.0);
        assert_eq!(fresh.to_vector()[4], 20.0); // life sits at index 4
    }

    #[test]
    fn hit_and_damage_scenario() {
        // One target at (3,4) yaw 10, life drops 20 -> 18.
        let mut reducer = ObservationReducer::new(&cfg());
        // Previous visible count is 1, not the spawn default of 3.
        let warmup = Snapshot {
            entities: vec![
                entity("Robot", 0.0, 0.0, 0.0),
                entity("Zombie", 9.0, 9.0, 0.0),
            ],
            ..Snapshot::default()
        };
        // 3 -> 1 visible counts as kills on the warmup tick.
        let warmup_events = reducer.reduce(&warmup);
        assert_eq!(warmup_events.kills, 2);

        let snap = Snapshot {
            entities: vec![
                entity("Robot", 0.0, 0.0, 5.0),
                entity("Zombie", 3.0, 4.0, 10.0),
            ],
            life: Some(18.0),
            ..Snapshot::default()
        };
        let events = reducer.reduce(&snap);

        assert_eq!(events.kills, 0);
        assert!(events.life_changed);
        assert!(events.life_lost);
        assert!(!events.extinct);
        let state = reducer.state();
        assert_eq!(state.target0_x, 3.0);
        assert_eq!(state.target0_z, 4.0);
        assert_eq!(state.target0_yaw, 10.0);
        assert_eq!(state.life, 18.0);
        assert_eq!(state.yaw, 5.0);
    }

    #[test]
    fn extinction_fires_when_no_target_is_visible() {
        let mut reducer = ObservationReducer::new(&cfg());
        let snap = Snapshot {
            entities: vec![entity("Robot", 0.0, 0.0, 0.0)],
            ..Snapshot::default()
        };
        let events = reducer.reduce(&snap);
        assert!(events.extinct);
        assert!(reducer.target_extinct());
        // All three spawn-default targets disappeared at once.
        assert_eq!(events.kills, 3);
        // Single-entity snapshot leaves yaw untouched.
        assert_eq!(reducer.state().yaw, 0.0);
    }

    #[test]
    fn life_increase_overwrites_but_is_not_a_loss() {
        let mut reducer = ObservationReducer::new(&cfg());
        let mut snap = Snapshot {
            entities: vec![
                entity("Robot", 0.0, 0.0, 0.0),
                entity("Zombie", 1.0, 1.0, 0.0),
            ],
            life: Some(12.0),
            ..Snapshot::default()
        };
        let events = reducer.reduce(&snap);
        assert!(events.life_lost);

        snap.life = Some(16.0);
        let events = reducer.reduce(&snap);
        assert!(events.life_changed);
        assert!(!events.life_lost);
        assert_eq!(reducer.state().life, 16.0);
    }

    #[test]
    fn slots_follow_scan_order_not_identity() {
        let mut reducer = ObservationReducer::new(&cfg());
        let snap = Snapshot {
            entities: vec![
                entity("Robot", 0.0, 0.0, 0.0),
                entity("Zombie", 1.0, 1.0, 90.0),
                entity("Zombie", 2.0, 2.0, 180.0),
            ],
            ..Snapshot::default()
        };
        reducer.reduce(&snap);
        assert_eq!(reducer.state().target0_x, 1.0);
        assert_eq!(reducer.state().target1_x, 2.0);

        // Host reorders its entity list: the same targets swap slots.
        let swapped = Snapshot {
            entities: vec![
                entity("Robot", 0.0, 0.0, 0.0),
                entity("Zombie", 2.0, 2.0, 180.0),
                entity("Zombie", 1.0, 1.0, 90.0),
            ],
            ..Snapshot::default()
        };
        reducer.reduce(&swapped);
        assert_eq!(reducer.state().target0_x, 2.0);
        assert_eq!(reducer.state().target1_x, 1.0);
    }

    #[test]
    fn unseen_target_slots_keep_stale_coordinates() {
        let mut reducer = ObservationReducer::new(&cfg());
        let three = Snapshot {
            entities: vec![
                entity("Robot", 0.0, 0.0, 0.0),
                entity("Zombie", 1.0, 1.0, 0.0),
                entity("Zombie", 2.0, 2.0, 0.0),
                entity("Zombie", 3.0, 3.0, 0.0),
            ],
            ..Snapshot::default()
        };
        reducer.reduce(&three);
        assert_eq!(reducer.state().target2_x, 3.0);

        let one = Snapshot {
            entities: vec![
                entity("Robot", 0.0, 0.0, 0.0),
                entity("Zombie", 5.0, 5.0, 0.0),
            ],
            ..Snapshot::default()
        };
        let events = reducer.reduce(&one);
        assert_eq!(events.kills, 2);
        // Slots 1 and 2 hold their last-seen values.
        assert_eq!(reducer.state().target0_x, 5.0);
        assert_eq!(reducer.state().target1_x, 2.0);
        assert_eq!(reducer.state().target2_x, 3.0);
    }

    #[test]
    fn yaw_wraps_into_0_360() {
        let mut reducer = ObservationReducer::new(&cfg());
        let snap = Snapshot {
            entities: vec![
                entity("Robot", 0.0, 0.0, -30.0),
                entity("Zombie", 1.0, 1.0, 370.0),
            ],
            ..Snapshot::default()
        };
        reducer.reduce(&snap);
        assert_eq!(reducer.state().yaw, 330.0);
        assert_eq!(reducer.state().target0_yaw, 10.0);
    }

    #[test]
    fn raycast_classes() {
        let mut reducer = ObservationReducer::new(&cfg());
        let mut snap = Snapshot {
            entities: vec![
                entity("Robot", 0.0, 0.0, 0.0),
                entity("Zombie", 1.0, 1.0, 0.0),
            ],
            line_of_sight: Some(LineOfSightObs {
                hit_type: "entity".to_string(),
                in_range: true,
                entity_type: "Zombie".to_string(),
            }),
            ..Snapshot::default()
        };
        let events = reducer.reduce(&snap);
        assert_eq!(events.line_of_sight, LineOfSight::InRange);
        assert_eq!(reducer.state().los_in_range, 1.0);
        assert_eq!(reducer.state().los, 0.0);

        snap.line_of_sight.as_mut().unwrap().in_range = false;
        let events = reducer.reduce(&snap);
        assert_eq!(events.line_of_sight, LineOfSight::OutOfRange);
        assert_eq!(reducer.state().los, 1.0);
        assert_eq!(reducer.state().los_in_range, 0.0);

        // A block hit is not a target line of sight.
        snap.line_of_sight.as_mut().unwrap().hit_type = "block".to_string();
        let events = reducer.reduce(&snap);
        assert_eq!(events.line_of_sight, LineOfSight::None);
        assert_eq!(reducer.state().los, 0.0);
    }

    #[test]
    fn reset_restores_episode_start_defaults() {
        let mut reducer = ObservationReducer::new(&cfg());
        let snap = Snapshot {
            entities: vec![entity("Robot", 0.0, 0.0, 0.0)],
            life: Some(3.0),
            x_pos: Some(7.2),
            z_pos: Some(-2.8),
            mobs_killed: Some(4),
            ..Snapshot::default()
        };
        reducer.reduce(&snap);
        assert!(reducer.target_extinct());

        reducer.reset_episode();
        assert_eq!(reducer.state(), &AgentState::fresh(20.0));
        assert_eq!(reducer.targets_alive(), 3);
        assert!(!reducer.target_extinct());
        // The host's cumulative kill stat survives the reset.
        assert_eq!(reducer.kill_score(), 4);
    }
}
