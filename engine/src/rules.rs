//! Read-only SRD records.
//!
//! Loaded once (JSON or YAML) before any encounter starts and only ever
//! borrowed afterwards. Lookups are case-insensitive and treat spaces,
//! hyphens and underscores alike.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::combat::ActionCost;
use crate::combatant::{DamageType, FeatBonuses, Size, Weapon};
use crate::conditions::ConditionDef;
use crate::dice::DiceExpr;
use crate::{Ability, SaveKind};

/// Canonical lookup key: lowercase with `_` for spaces and hyphens.
pub fn normalize_key(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

pub trait RulesProvider {
    fn race(&self, name: &str) -> Option<&Race>;
    fn class(&self, name: &str) -> Option<&Class>;
    fn feat(&self, name: &str) -> Option<&Feat>;
    fn equipment(&self, name: &str) -> Option<&Equipment>;
    fn spell(&self, name: &str) -> Option<&Spell>;

    fn ability_modifier(&self, score: i32) -> i32 {
        crate::ability_mod(score)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Race {
    pub name: String,
    #[serde(default)]
    pub size: Size,
    pub speed: u32,
    #[serde(default)]
    pub ability_adjustments: BTreeMap<Ability, i32>,
    #[serde(default)]
    pub natural_armor: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BabProgression {
    Good,
    Average,
    Poor,
}

impl BabProgression {
    pub fn at_level(self, level: u32) -> i32 {
        let level = level as i32;
        match self {
            BabProgression::Good => level,
            BabProgression::Average => level * 3 / 4,
            BabProgression::Poor => level / 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveProgression {
    Good,
    Poor,
}

impl SaveProgression {
    pub fn at_level(self, level: u32) -> i32 {
        let level = level as i32;
        match self {
            SaveProgression::Good => 2 + level / 2,
            SaveProgression::Poor => level / 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSpellcasting {
    pub ability: Ability,
    /// `slots[class_level - 1][spell_level]`.
    pub slots: Vec<Vec<u32>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub name: String,
    pub hit_die: u32,
    pub bab: BabProgression,
    pub fortitude: SaveProgression,
    pub reflex: SaveProgression,
    pub will: SaveProgression,
    #[serde(default)]
    pub spellcasting: Option<ClassSpellcasting>,
}

impl Class {
    pub fn save_progression(&self, save: SaveKind) -> SaveProgression {
        match save {
            SaveKind::Fortitude => self.fortitude,
            SaveKind::Reflex => self.reflex,
            SaveKind::Will => self.will,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feat {
    pub name: String,
    #[serde(default)]
    pub bonuses: FeatBonuses,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Armor {
    pub name: String,
    pub bonus: i32,
    #[serde(default)]
    pub max_dex: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "lowercase")]
pub enum Equipment {
    Weapon(Weapon),
    Armor(Armor),
    Shield(Armor),
}

impl Equipment {
    pub fn name(&self) -> &str {
        match self {
            Equipment::Weapon(w) => &w.name,
            Equipment::Armor(a) | Equipment::Shield(a) => &a.name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveEffect {
    Half,
    Negates,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellSave {
    pub kind: SaveKind,
    pub effect: SaveEffect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellDamage {
    pub dice: DiceExpr,
    /// Roll `dice` once per caster level, up to `max_multiplier` times.
    #[serde(default)]
    pub per_caster_level: bool,
    #[serde(default)]
    pub max_multiplier: Option<u32>,
    pub damage_type: DamageType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellHealing {
    pub dice: DiceExpr,
    /// Adds caster level, capped at this value.
    #[serde(default)]
    pub max_level_bonus: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellCondition {
    pub name: String,
    #[serde(default)]
    pub rounds: u32,
    #[serde(default)]
    pub rounds_per_level: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spell {
    pub name: String,
    pub level: u8,
    #[serde(default)]
    pub school: String,
    #[serde(default = "standard_casting_time")]
    pub casting_time: ActionCost,
    #[serde(default)]
    pub damage: Option<SpellDamage>,
    #[serde(default)]
    pub healing: Option<SpellHealing>,
    #[serde(default)]
    pub save: Option<SpellSave>,
    #[serde(default)]
    pub condition: Option<SpellCondition>,
}

fn standard_casting_time() -> ActionCost {
    ActionCost::Standard
}

/// The on-disk shape: plain lists of records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesDocument {
    pub races: Vec<Race>,
    pub classes: Vec<Class>,
    pub feats: Vec<Feat>,
    pub equipment: Vec<Equipment>,
    pub spells: Vec<Spell>,
    pub conditions: Vec<ConditionDef>,
}

#[derive(Debug, Clone, Default)]
pub struct RulesData {
    races: IndexMap<String, Race>,
    classes: IndexMap<String, Class>,
    feats: IndexMap<String, Feat>,
    equipment: IndexMap<String, Equipment>,
    spells: IndexMap<String, Spell>,
    conditions: Vec<ConditionDef>,
}

impl From<RulesDocument> for RulesData {
    fn from(doc: RulesDocument) -> Self {
        let mut data = RulesData::default();
        doc.races.into_iter().for_each(|r| data.add_race(r));
        doc.classes.into_iter().for_each(|c| data.add_class(c));
        doc.feats.into_iter().for_each(|f| data.add_feat(f));
        doc.equipment.into_iter().for_each(|e| data.add_equipment(e));
        doc.spells.into_iter().for_each(|s| data.add_spell(s));
        data.conditions = doc.conditions;
        data
    }
}

impl RulesData {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let doc: RulesDocument = serde_json::from_str(text).context("failed to parse rules JSON")?;
        Ok(doc.into())
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let doc: RulesDocument = serde_yaml::from_str(text).context("failed to parse rules YAML")?;
        Ok(doc.into())
    }

    /// Load from a `.json`, `.yaml` or `.yml` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read rules data: {}", path.display()))?;
        let data = if is_yaml(path) {
            Self::from_yaml_str(&text)
        } else {
            Self::from_json_str(&text)
        };
        data.with_context(|| format!("in {}", path.display()))
    }

    pub fn add_race(&mut self, race: Race) {
        self.races.insert(normalize_key(&race.name), race);
    }

    pub fn add_class(&mut self, class: Class) {
        self.classes.insert(normalize_key(&class.name), class);
    }

    pub fn add_feat(&mut self, feat: Feat) {
        self.feats.insert(normalize_key(&feat.name), feat);
    }

    pub fn add_equipment(&mut self, item: Equipment) {
        self.equipment.insert(normalize_key(item.name()), item);
    }

    pub fn add_spell(&mut self, spell: Spell) {
        self.spells.insert(normalize_key(&spell.name), spell);
    }

    /// Extra or overriding condition definitions shipped with the data.
    pub fn conditions(&self) -> &[ConditionDef] {
        &self.conditions
    }

    pub fn weapon(&self, name: &str) -> Option<&Weapon> {
        match self.equipment(name)? {
            Equipment::Weapon(w) => Some(w),
            _ => None,
        }
    }

    pub fn spells(&self) -> impl Iterator<Item = &Spell> {
        self.spells.values()
    }
}

impl RulesProvider for RulesData {
    fn race(&self, name: &str) -> Option<&Race> {
        self.races.get(&normalize_key(name))
    }

    fn class(&self, name: &str) -> Option<&Class> {
        self.classes.get(&normalize_key(name))
    }

    fn feat(&self, name: &str) -> Option<&Feat> {
        self.feats.get(&normalize_key(name))
    }

    fn equipment(&self, name: &str) -> Option<&Equipment> {
        self.equipment.get(&normalize_key(name))
    }

    fn spell(&self, name: &str) -> Option<&Spell> {
        self.spells.get(&normalize_key(name))
    }
}

pub(crate) fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}
