use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use srd_engine::api::{simulate_encounter, simulate_many, EncounterConfig, EncounterReport};
use srd_engine::{CheckInput, Dice, DiceExpr, DiceSource, EngineConfig};
use tracing_subscriber::EnvFilter;

#[derive(Args)]
struct EncounterArgs {
    /// Built-in encounter id
    #[arg(long, default_value = "goblin_ambush", conflicts_with = "file")]
    encounter: String,
    /// Encounter file (JSON or YAML) instead of a built-in
    #[arg(long)]
    file: Option<PathBuf>,
    /// Rules data file to use instead of the embedded SRD content
    #[arg(long)]
    rules: Option<PathBuf>,
    /// RNG seed for determinism
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Rounds before the fight is called unresolved
    #[arg(long, default_value_t = EngineConfig::default().max_rounds)]
    max_rounds: u32,
    /// Lost spells keep their slot
    #[arg(long, default_value_t = false)]
    keep_lost_slots: bool,
}

impl EncounterArgs {
    fn config(&self) -> EncounterConfig {
        EncounterConfig {
            encounter: Some(self.encounter.clone()),
            encounter_path: self.file.clone(),
            rules_path: self.rules.clone(),
            seed: self.seed,
            engine: EngineConfig {
                max_rounds: self.max_rounds,
                lost_spell_consumes_slot: !self.keep_lost_slots,
                ..EngineConfig::default()
            },
        }
    }
}

#[derive(Subcommand)]
enum Cmd {
    /// Roll dice notation such as 2d6+3
    Roll {
        /// Dice expression
        #[arg(long, default_value = "1d20")]
        expr: String,
        /// RNG seed for determinism
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Number of rolls
        #[arg(long, default_value_t = 1)]
        times: u32,
    },
    /// Perform a d20 check against a DC
    Check {
        /// RNG seed for determinism
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Difficulty Class to meet or beat
        #[arg(long)]
        dc: i32,
        /// Modifier added to the d20
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        modifier: i32,
    },
    /// Play one encounter with the tactical AI on both sides
    Simulate {
        #[command(flatten)]
        encounter: EncounterArgs,
        /// Print the report as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Play many seeded runs of an encounter and summarize the outcomes
    SimulateMany {
        #[command(flatten)]
        encounter: EncounterArgs,
        /// Number of runs; run i uses seed + i
        #[arg(long, default_value_t = 100)]
        samples: u32,
        /// Print the summary as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Parser)]
#[command(name = "srd-cli")]
#[command(about = "D&D 3.5 SRD rules and combat engine harness")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_report(report: &EncounterReport) {
    for line in &report.log {
        println!("{line}");
    }
    println!(
        "{}: {} after {} round(s) (seed {})",
        report.encounter, report.status, report.rounds, report.seed
    );
    for s in &report.survivors {
        println!("  {} [{}] {}/{} hp", s.name, s.id, s.hp, s.max_hp);
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Roll { expr, seed, times } => {
            let expr: DiceExpr = expr.parse().with_context(|| format!("bad dice expression '{expr}'"))?;
            let mut dice = Dice::from_seed(seed);
            for _ in 0..times {
                let roll = dice.roll(&expr);
                println!("{expr}: {:?} {:+} = {}", roll.rolls, roll.modifier, roll.total);
            }
        }
        Cmd::Check { seed, dc, modifier } => {
            let mut dice = Dice::from_seed(seed);
            let res = srd_engine::check(&mut dice, CheckInput { dc, modifier });
            println!(
                "roll={} mod={:+} total={} dc={} => {}",
                res.roll,
                modifier,
                res.total,
                res.dc,
                if res.passed { "SUCCESS" } else { "FAIL" }
            );
        }
        Cmd::Simulate { encounter, json } => {
            tracing::debug!(encounter = %encounter.encounter, seed = encounter.seed, "simulating");
            let report = simulate_encounter(encounter.config())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Cmd::SimulateMany {
            encounter,
            samples,
            json,
        } => {
            tracing::debug!(encounter = %encounter.encounter, seed = encounter.seed, samples, "simulating");
            let stats = simulate_many(encounter.config(), samples)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!(
                    "samples={} victories={} defeats={} unresolved={} victory_rate={:.3} avg_rounds={:.2}",
                    stats.samples,
                    stats.victories,
                    stats.defeats,
                    stats.unresolved,
                    stats.victory_rate(),
                    stats.average_rounds
                );
            }
        }
    }
    Ok(())
}
