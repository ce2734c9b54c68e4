// src/telemetry.rs
//
// Telemetry sinks for the episode controller.
// - EpisodeSink: trait the session controller logs through
// - NoopSink:    discards everything
// - FileSink:    one JSON object per line, for offline analysis / replay

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::observation::STATE_LEN;
use crate::types::{LineOfSight, TerminationReason};

/// Per-tick telemetry payload.
#[derive(Debug, Clone, Serialize)]
pub struct TickRecord {
    pub episode: u64,
    pub tick: u64,
    /// Whether this poll carried at least one observation.
    pub observed: bool,
    pub tick_reward: f64,
    pub episode_reward: f64,
    pub lifetime_reward: f64,
    pub kills: u32,
    pub life_lost: bool,
    pub line_of_sight: LineOfSight,
    pub targets_alive: usize,
    /// Remaining agent liveness budget after this tick.
    pub liveness: i64,
    /// The feature vector in contract order.
    pub state: [f64; STATE_LEN],
}

/// Episode boundary payload written on finish.
#[derive(Debug, Clone, Serialize)]
pub struct EpisodeEndRecord {
    pub episode: u64,
    pub ticks: u64,
    pub reason: TerminationReason,
    pub episode_reward: f64,
    pub final_life: f64,
    pub kill_delta: u32,
    pub survival_time: f64,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Record<'a> {
    EpisodeStart { episode: u64, session_id: &'a str },
    Tick(&'a TickRecord),
    EpisodeEnd(&'a EpisodeEndRecord),
}

/// Abstract sink for lifecycle telemetry.
pub trait EpisodeSink {
    fn log_episode_start(&mut self, episode: u64, session_id: &str);
    fn log_tick(&mut self, record: &TickRecord);
    fn log_episode_end(&mut self, record: &EpisodeEndRecord);
    fn flush(&mut self) {}
}

/// Sink that discards all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl EpisodeSink for NoopSink {
    fn log_episode_start(&mut self, _episode: u64, _session_id: &str) {}
    fn log_tick(&mut self, _record: &TickRecord) {}
    fn log_episode_end(&mut self, _record: &EpisodeEndRecord) {}
}

impl EpisodeSink for Box<dyn EpisodeSink> {
    fn log_episode_start(&mut self, episode: u64, session_id: &str) {
        (**self).log_episode_start(episode, session_id);
    }

    fn log_tick(&mut self, record: &TickRecord) {
        (**self).log_tick(record);
    }

    fn log_episode_end(&mut self, record: &EpisodeEndRecord) {
        (**self).log_episode_end(record);
    }

    fn flush(&mut self) {
        (**self).flush();
    }
}

/// JSONL file sink. Each record is one JSON object on its own line with a
/// `kind` discriminator.
pub struct FileSink {
    writer: BufWriter<File>,
}

impl FileSink {
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    fn write(&mut self, record: &Record<'_>) {
        match serde_json::to_string(record) {
            Ok(line) => {
                if let Err(err) = writeln!(self.writer, "{line}") {
                    eprintln!("WARN: [telemetry] write failed: {err}");
                }
            }
            Err(err) => eprintln!("WARN: [telemetry] serialize failed: {err}"),
        }
    }
}

impl EpisodeSink for FileSink {
    fn log_episode_start(&mut self, episode: u64, session_id: &str) {
        self.write(&Record::EpisodeStart {
            episode,
            session_id,
        });
    }

    fn log_tick(&mut self, record: &TickRecord) {
        self.write(&Record::Tick(record));
    }

    fn log_episode_end(&mut self, record: &EpisodeEndRecord) {
        self.write(&Record::EpisodeEnd(record));
    }

    fn flush(&mut self) {
        if let Err(err) = self.writer.flush() {
            eprintln!("WARN: [telemetry] flush failed: {err}");
        }
    }
}
