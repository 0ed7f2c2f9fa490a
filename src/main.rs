use std::collections::VecDeque;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use raftsim::repl::Repl;
use raftsim::sim::Engine;
use raftsim::summary::{summarize_or_fallback, ClusterDigest, TemplateSummarizer};
use raftsim::SimConfig;

#[derive(Parser)]
#[command(name = "raftsim")]
#[command(about = "A tick-driven Raft consensus simulator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a headless simulation for a fixed number of ticks
    Run {
        /// Number of nodes in the cluster
        #[arg(short, long, default_value_t = 5)]
        nodes: usize,

        /// Number of ticks to simulate
        #[arg(short, long, default_value_t = 2000)]
        ticks: u64,

        /// Fixed RNG seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,

        /// Wall-clock milliseconds between ticks (0 = as fast as possible)
        #[arg(long, default_value_t = 0)]
        interval_ms: u64,

        /// Commands to propose once a leader has been elected (repeatable)
        #[arg(long)]
        propose: Vec<String>,

        /// Print a cluster summary every N ticks (0 = only at the end)
        #[arg(long, default_value_t = 0)]
        summary_every: u64,
    },

    /// Drive the simulation interactively
    Repl {
        /// Number of nodes in the cluster
        #[arg(short, long, default_value_t = 5)]
        nodes: usize,

        /// Fixed RNG seed for a reproducible session
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

fn config_for(nodes: usize, seed: Option<u64>) -> SimConfig {
    SimConfig {
        cluster_size: nodes,
        rng_seed: seed,
        ..SimConfig::default()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            nodes,
            ticks,
            seed,
            interval_ms,
            propose,
            summary_every,
        } => {
            run_headless(
                config_for(nodes, seed),
                ticks,
                interval_ms,
                propose,
                summary_every,
            )
            .await?;
        }
        Command::Repl { nodes, seed } => {
            let engine = Engine::new(config_for(nodes, seed))?;
            Repl::new(engine).run();
        }
    }

    Ok(())
}

async fn run_headless(
    config: SimConfig,
    ticks: u64,
    interval_ms: u64,
    propose: Vec<String>,
    summary_every: u64,
) -> Result<()> {
    let mut engine = Engine::new(config)?;
    let summarizer = TemplateSummarizer;
    let mut pending: VecDeque<String> = propose.into();
    let mut cadence = (interval_ms > 0)
        .then(|| tokio::time::interval(Duration::from_millis(interval_ms)));
    let mut last_leader = None;

    info!(
        "Simulating {} nodes for {} ticks",
        engine.nodes().len(),
        ticks
    );

    for _ in 0..ticks {
        if let Some(cadence) = cadence.as_mut() {
            cadence.tick().await;
        }

        engine.tick();

        let leader = engine.leader();
        if leader != last_leader {
            match leader {
                Some(id) => info!(
                    "tick {}: node {} is now leader (term {})",
                    engine.tick_count(),
                    id,
                    engine.nodes()[id].current_term
                ),
                None => info!("tick {}: cluster has no leader", engine.tick_count()),
            }
            last_leader = leader;
        }

        // Queued client commands go in as soon as someone is in charge.
        if leader.is_some() {
            while let Some(command) = pending.pop_front() {
                match engine.propose_entry(command) {
                    Ok((id, index)) => {
                        info!("proposed entry {} via leader {}", index, id);
                    }
                    Err(e) => {
                        info!("proposal failed: {e}");
                        break;
                    }
                }
            }
        }

        if summary_every > 0 && engine.tick_count() % summary_every == 0 {
            let digest = ClusterDigest::from_snapshot(&engine.snapshot());
            println!(
                "[tick {}] {}",
                engine.tick_count(),
                summarize_or_fallback(&summarizer, &digest)
            );
        }
    }

    let digest = ClusterDigest::from_snapshot(&engine.snapshot());
    println!("{}", summarize_or_fallback(&summarizer, &digest));

    Ok(())
}
