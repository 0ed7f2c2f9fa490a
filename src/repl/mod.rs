use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::sim::Engine;
use crate::summary::{summarize_or_fallback, ClusterDigest, TemplateSummarizer};

/// Interactive driver for the simulation engine. Every command maps onto the
/// engine's public surface: tick, the two control operations, the run-state
/// setters, and snapshot reads.
pub struct Repl {
    engine: Engine,
    rl: DefaultEditor,
    summarizer: TemplateSummarizer,
}

impl Repl {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            rl: DefaultEditor::new().expect("Failed to create line editor"),
            summarizer: TemplateSummarizer,
        }
    }

    pub fn run(&mut self) {
        println!("Welcome to raftsim");
        println!(
            "Simulating a {}-node Raft cluster; type 'help' for commands, 'exit' to quit",
            self.engine.nodes().len()
        );

        loop {
            let readline = self.rl.readline("raftsim> ");
            match readline {
                Ok(line) => {
                    let line = line.trim().to_string();
                    if line.is_empty() {
                        continue;
                    }

                    let _ = self.rl.add_history_entry(line.as_str());

                    if line.eq_ignore_ascii_case("exit") {
                        println!("Goodbye!");
                        break;
                    }

                    self.dispatch(&line);
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {err}");
                    break;
                }
            }
        }
    }

    fn dispatch(&mut self, line: &str) {
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or_default().to_ascii_lowercase();
        let rest: Vec<&str> = words.collect();

        match command.as_str() {
            "help" => print_help(),
            "tick" | "t" => self.cmd_tick(&rest),
            "status" | "s" => self.print_status(),
            "propose" | "p" => self.cmd_propose(&rest),
            "crash" => self.cmd_set_live(&rest, false),
            "revive" => self.cmd_set_live(&rest, true),
            "speed" => self.cmd_speed(&rest),
            "pause" => {
                self.engine.set_paused(true);
                println!("Paused; ticks are skipped until 'resume'");
            }
            "resume" => {
                self.engine.set_paused(false);
                println!("Resumed");
            }
            "summary" => {
                let digest = ClusterDigest::from_snapshot(&self.engine.snapshot());
                println!("{}", summarize_or_fallback(&self.summarizer, &digest));
            }
            "snapshot" => match serde_json::to_string_pretty(&self.engine.snapshot()) {
                Ok(json) => println!("{json}"),
                Err(e) => eprintln!("Error: {e}"),
            },
            other => eprintln!("Unknown command: {other} (try 'help')"),
        }
    }

    fn cmd_tick(&mut self, args: &[&str]) {
        if self.engine.paused() {
            println!("Simulation is paused; 'resume' first");
            return;
        }
        let count: u64 = match args.first() {
            None => 1,
            Some(raw) => match raw.parse() {
                Ok(n) => n,
                Err(_) => {
                    eprintln!("Error: tick count must be a number");
                    return;
                }
            },
        };
        for _ in 0..count {
            self.engine.tick();
        }
        println!(
            "Advanced to tick {} ({} packet(s) in flight)",
            self.engine.tick_count(),
            self.engine.in_flight().len()
        );
    }

    fn cmd_propose(&mut self, args: &[&str]) {
        if args.is_empty() {
            eprintln!("Usage: propose <command text>");
            return;
        }
        let command = args.join(" ");
        match self.engine.propose_entry(command) {
            Ok((leader, index)) => {
                println!("Entry appended at index {index} on leader node {leader}");
            }
            Err(e) => eprintln!("Error: {e}"),
        }
    }

    fn cmd_set_live(&mut self, args: &[&str], live: bool) {
        let verb = if live { "revive" } else { "crash" };
        let Some(raw) = args.first() else {
            eprintln!("Usage: {verb} <node id>");
            return;
        };
        let id: usize = match raw.parse() {
            Ok(n) => n,
            Err(_) => {
                eprintln!("Error: node id must be a number");
                return;
            }
        };
        match self.engine.set_node_live(id, live) {
            Ok(()) => println!("Node {id} {}", if live { "revived" } else { "crashed" }),
            Err(e) => eprintln!("Error: {e}"),
        }
    }

    fn cmd_speed(&mut self, args: &[&str]) {
        let Some(raw) = args.first() else {
            println!("Speed multiplier: {}", self.engine.speed_multiplier());
            return;
        };
        match raw.parse::<f64>() {
            Ok(multiplier) if multiplier > 0.0 => {
                self.engine.set_speed_multiplier(multiplier);
                println!("Speed multiplier set to {multiplier}");
            }
            _ => eprintln!("Error: speed must be a positive number"),
        }
    }

    fn print_status(&self) {
        let snapshot = self.engine.snapshot();

        println!(
            "tick {}  paused={}  speed x{}  packets in flight: {}",
            snapshot.tick,
            snapshot.paused,
            snapshot.speed_multiplier,
            snapshot.packets.len()
        );
        println!(
            "{:<4}{:<11}{:<6}{:<7}{:<5}{:<8}{}",
            "id", "role", "term", "voted", "log", "commit", "timer"
        );
        for node in &snapshot.cluster {
            let voted = node
                .voted_for
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{:<4}{:<11}{:<6}{:<7}{:<5}{:<8}{}/{}",
                node.id,
                format!("{:?}", node.role),
                node.current_term,
                voted,
                node.log.len(),
                node.commit_index,
                node.election_timeout,
                node.timeout_duration
            );
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  tick [n]        advance the simulation by n ticks (default 1)");
    println!("  status          per-node roles, terms, logs and timers");
    println!("  propose <cmd>   append a client command via the current leader");
    println!("  crash <id>      crash a node");
    println!("  revive <id>     revive a crashed node");
    println!("  speed [x]       show or set the playback speed multiplier");
    println!("  pause / resume  stop or restart ticking");
    println!("  summary         one-paragraph cluster narration");
    println!("  snapshot        dump the full cluster snapshot as JSON");
    println!("  exit            quit");
}
