// src/main.rs
//
// Research-harness CLI for arena-env.
//
// Runs N episodes of the lifecycle controller against the deterministic
// in-process sim host, picking actions uniformly at random from the
// fixed vocabulary. The point is exercising the session plumbing, not
// learning anything: plug a real policy in by driving the library
// directly.

use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Parser};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use arena_env::{
    Action, Config, EpisodeSink, FileSink, NoopSink, SessionController, SimHost, SimHostConfig,
    StaticScene,
};

#[derive(Debug, Parser)]
#[command(
    name = "arena-env",
    about = "Arena episode lifecycle harness (deterministic sim host)",
    version
)]
struct Args {
    /// Number of episodes to run.
    #[arg(long, default_value_t = 3)]
    episodes: u64,

    /// Deterministic seed for the sim host and the action stream.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Safety cap on ticks per episode.
    #[arg(long, default_value_t = 10_000)]
    max_ticks: u64,

    /// Write JSONL telemetry to this path.
    #[arg(long)]
    log: Option<PathBuf>,

    /// Verbosity: -v, -vv
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("ERROR: {err:#}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let cfg = Config::from_env();
    println!(
        "arena-env | cfg={} | episodes={} | seed={} | tick_ms={}",
        cfg.version, args.episodes, args.seed, cfg.tick_ms
    );

    let sink: Box<dyn EpisodeSink> = match &args.log {
        Some(path) => Box::new(
            FileSink::create(path)
                .with_context(|| format!("creating telemetry log at {}", path.display()))?,
        ),
        None => Box::new(NoopSink),
    };

    let host = SimHost::new(SimHostConfig {
        seed: args.seed,
        target_count: cfg.target_count,
        target_name: cfg.target_name.clone(),
        agent_life: cfg.full_life,
        ..SimHostConfig::default()
    });
    let scene = StaticScene::new("arena-flat-v1").with_setup_commands(vec![
        "chat /gamerule naturalRegeneration false".to_string(),
        "chat /gamerule doMobLoot false".to_string(),
        "chat /difficulty 1".to_string(),
    ]);

    let mut controller = SessionController::new(cfg, host, scene, sink);
    let mut actions = ChaCha8Rng::seed_from_u64(args.seed.wrapping_add(1));

    for _ in 0..args.episodes {
        controller.start_episode()?;

        let mut capped = false;
        while controller.is_episode_running() {
            let action = Action::from_index(actions.gen_range(0..Action::ALL.len()))
                .expect("action index in range");
            controller.apply_action(action);
            let report = controller.observe();

            if args.verbose >= 2 {
                println!(
                    "tick {}: reward={:.1} kills={} life_lost={} liveness={}",
                    report.tick,
                    report.tick_reward,
                    report.events.kills,
                    report.events.life_lost,
                    controller.agent_liveness().value()
                );
            }
            if report.tick >= args.max_ticks {
                eprintln!("WARN: episode hit the {}-tick safety cap", args.max_ticks);
                capped = true;
                break;
            }
        }

        let record = controller.finish_episode();
        println!();
        println!("=== Episode Summary ===");
        println!("Episode: {}", record.episode);
        println!("Ticks: {}{}", record.ticks, if capped { " (capped)" } else { "" });
        println!("Termination: {:?}", record.reason);
        println!("Episode reward: {:+.1}", record.episode_reward);
        println!("Final life: {:.1}", record.final_life);
        println!("Kill delta: {}", record.kill_delta);
        if args.verbose >= 1 {
            println!("Lifetime reward: {:+.1}", controller.lifetime_reward());
        }
    }

    Ok(())
}
