use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::ai::TacticalAi;
use crate::character::CharacterSheet;
use crate::combat::{CombatContext, CombatEncounter, CombatEvent, EncounterStatus, Environment};
use crate::combatant::{Combatant, CombatantId, Faction};
use crate::config::{EngineConfig, Ruleset};
use crate::content::builtin_encounters;
use crate::rules::{is_yaml, RulesData};
use crate::spells::RulesSpellcaster;
use crate::Dice;

/// Where to find the encounter and rules, and how to run it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterConfig {
    /// Built-in encounter id, used when `encounter_path` is unset.
    pub encounter: Option<String>,
    pub encounter_path: Option<PathBuf>,
    /// Rules data to use instead of the embedded SRD content.
    pub rules_path: Option<PathBuf>,
    pub seed: u64,
    pub engine: EngineConfig,
}

impl EncounterConfig {
    pub fn builtin(name: &str, seed: u64) -> Self {
        Self {
            encounter: Some(name.to_string()),
            seed,
            ..Self::default()
        }
    }
}

/// A combatant listed in an encounter file: either a character sheet built
/// from the rules data or a fully specified stat block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CombatantSpec {
    Sheet(Box<CharacterSheet>),
    Stats(Box<Combatant>),
}

impl CombatantSpec {
    fn build(&self, rules: &RulesData, faction: Faction) -> Result<Combatant> {
        match self {
            CombatantSpec::Sheet(sheet) => Ok(sheet.build(rules, faction)?),
            CombatantSpec::Stats(combatant) => Ok((**combatant).clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncounterFile {
    pub name: String,
    #[serde(default)]
    pub environment: Environment,
    pub party: Vec<CombatantSpec>,
    pub enemies: Vec<CombatantSpec>,
}

impl EncounterFile {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("failed to parse encounter JSON")
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("failed to parse encounter YAML")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read encounter: {}", path.display()))?;
        let file = if is_yaml(path) {
            Self::from_yaml_str(&text)
        } else {
            Self::from_json_str(&text)
        };
        file.with_context(|| format!("in {}", path.display()))
    }

    pub fn builtin(name: &str) -> Result<Self> {
        let encounters = builtin_encounters();
        let Some(text) = encounters.get(name) else {
            let mut known: Vec<_> = encounters.keys().copied().collect();
            known.sort_unstable();
            bail!("unknown built-in encounter '{name}' (known: {})", known.join(", "));
        };
        Self::from_json_str(text).with_context(|| format!("in built-in encounter '{name}'"))
    }

    /// Party members default to `pc`, enemies to `npc`.
    pub fn combatants(&self, rules: &RulesData) -> Result<(Vec<Combatant>, Vec<Combatant>)> {
        let party = self
            .party
            .iter()
            .map(|spec| spec.build(rules, Faction::Pc))
            .collect::<Result<Vec<_>>>()?;
        let enemies = self
            .enemies
            .iter()
            .map(|spec| spec.build(rules, Faction::Npc))
            .collect::<Result<Vec<_>>>()?;
        Ok((party, enemies))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Survivor {
    pub id: CombatantId,
    pub name: String,
    pub faction: Faction,
    pub hp: i32,
    pub max_hp: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct EncounterReport {
    pub encounter: String,
    pub seed: u64,
    pub status: EncounterStatus,
    pub rounds: u32,
    pub survivors: Vec<Survivor>,
    pub log: Vec<String>,
    #[serde(skip)]
    pub events: Vec<CombatEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationStats {
    pub samples: u32,
    pub victories: u32,
    pub defeats: u32,
    pub unresolved: u32,
    pub average_rounds: f64,
}

impl SimulationStats {
    pub fn victory_rate(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            f64::from(self.victories) / f64::from(self.samples)
        }
    }
}

fn load_ruleset(cfg: &EncounterConfig) -> Result<Ruleset> {
    match &cfg.rules_path {
        Some(path) => Ruleset::load(path, cfg.engine),
        None => Ok(Ruleset::srd()?.with_config(cfg.engine)),
    }
}

fn load_encounter(cfg: &EncounterConfig) -> Result<EncounterFile> {
    match (&cfg.encounter_path, &cfg.encounter) {
        (Some(path), _) => EncounterFile::load(path),
        (None, Some(name)) => EncounterFile::builtin(name),
        (None, None) => bail!("no encounter given: set a built-in id or a file path"),
    }
}

fn run_once(rules: &Ruleset, file: &EncounterFile, seed: u64) -> Result<EncounterReport> {
    let (party, enemies) = file.combatants(&rules.data)?;
    let mut dice = Dice::from_seed(seed);
    let mut spells = RulesSpellcaster;
    let mut ai = TacticalAi;

    let mut encounter = CombatEncounter::initialize_combat(party, enemies, file.environment.clone(), rules, &mut dice)?;
    let mut ctx = CombatContext::new(rules, &mut dice, &mut spells);
    let status = encounter.run(&mut ctx, &mut ai, rules.config.max_rounds)?;
    tracing::info!(encounter = %file.name, seed, %status, rounds = encounter.round(), "simulation finished");

    let survivors = encounter
        .combatants()
        .iter()
        .filter(|c| !c.is_defeated())
        .map(|c| Survivor {
            id: c.id.clone(),
            name: c.name.clone(),
            faction: c.faction,
            hp: c.hp.current,
            max_hp: c.hp.max,
        })
        .collect();

    Ok(EncounterReport {
        encounter: file.name.clone(),
        seed,
        status,
        rounds: encounter.round().min(rules.config.max_rounds),
        survivors,
        log: encounter.log().iter().map(CombatEvent::describe).collect(),
        events: encounter.log().to_vec(),
    })
}

/// Play one encounter to the end with the tactical AI on both sides.
pub fn simulate_encounter(cfg: EncounterConfig) -> Result<EncounterReport> {
    let rules = load_ruleset(&cfg)?;
    let file = load_encounter(&cfg)?;
    run_once(&rules, &file, cfg.seed)
}

/// Play `samples` runs with seeds `seed, seed + 1, ...` and tally the outcomes.
pub fn simulate_many(cfg: EncounterConfig, samples: u32) -> Result<SimulationStats> {
    let rules = load_ruleset(&cfg)?;
    let file = load_encounter(&cfg)?;

    let mut stats = SimulationStats {
        samples,
        victories: 0,
        defeats: 0,
        unresolved: 0,
        average_rounds: 0.0,
    };
    let mut total_rounds = 0u64;
    for i in 0..samples {
        let report = run_once(&rules, &file, cfg.seed.wrapping_add(u64::from(i)))?;
        total_rounds += u64::from(report.rounds);
        match report.status {
            EncounterStatus::Victory => stats.victories += 1,
            EncounterStatus::Defeat => stats.defeats += 1,
            _ => stats.unresolved += 1,
        }
    }
    if samples > 0 {
        stats.average_rounds = total_rounds as f64 / f64::from(samples);
    }
    Ok(stats)
}
