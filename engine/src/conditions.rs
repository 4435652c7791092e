use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::combatant::{Combatant, CombatantId};
use crate::error::ValidationError;
use crate::rules::normalize_key;

/// Behavioural flags; true if any active condition sets them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionFlags {
    pub no_actions: bool,
    pub loses_dex_to_ac: bool,
    pub half_speed: bool,
    pub immobile: bool,
    /// Only a single move or standard action per turn.
    pub single_action: bool,
}

impl ConditionFlags {
    fn union(self, other: ConditionFlags) -> ConditionFlags {
        ConditionFlags {
            no_actions: self.no_actions || other.no_actions,
            loses_dex_to_ac: self.loses_dex_to_ac || other.loses_dex_to_ac,
            half_speed: self.half_speed || other.half_speed,
            immobile: self.immobile || other.immobile,
            single_action: self.single_action || other.single_action,
        }
    }
}

/// Numeric deltas and flags a condition contributes to derived stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectBundle {
    pub attack: i32,
    /// Applies to melee attack rolls only.
    pub melee_attack: i32,
    pub damage: i32,
    pub armor_class: i32,
    pub ac_vs_melee: i32,
    pub ac_vs_ranged: i32,
    pub saves: i32,
    pub skills: i32,
    pub strength: i32,
    pub dexterity: i32,
    pub flags: ConditionFlags,
}

impl EffectBundle {
    fn stack(&mut self, other: &EffectBundle) {
        self.attack += other.attack;
        self.melee_attack += other.melee_attack;
        self.damage += other.damage;
        self.armor_class += other.armor_class;
        self.ac_vs_melee += other.ac_vs_melee;
        self.ac_vs_ranged += other.ac_vs_ranged;
        self.saves += other.saves;
        self.skills += other.skills;
        self.strength += other.strength;
        self.dexterity += other.dexterity;
        self.flags = self.flags.union(other.flags);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnBoundary {
    StartOfTurn,
    EndOfTurn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConditionDuration {
    /// Lasts until explicitly removed.
    #[default]
    Indefinite,
    /// Counts down at the given boundary of the holder's turns; expires at 0.
    Turns { count: u32, at: TurnBoundary },
}

impl ConditionDuration {
    pub fn rounds(count: u32) -> Self {
        ConditionDuration::Turns {
            count,
            at: TurnBoundary::StartOfTurn,
        }
    }

    /// Ends when the holder's next turn begins.
    pub fn until_next_turn() -> Self {
        Self::rounds(1)
    }
}

/// Registry entry: the effect bundle copied onto a combatant at attach time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionDef {
    pub name: String,
    #[serde(default)]
    pub effects: EffectBundle,
    /// Exclusive conditions override every other bundle; higher wins.
    #[serde(default)]
    pub exclusive: Option<u8>,
}

impl ConditionDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: normalize_key(name),
            effects: EffectBundle::default(),
            exclusive: None,
        }
    }

    fn attack(mut self, delta: i32) -> Self {
        self.effects.attack = delta;
        self
    }

    fn melee_attack(mut self, delta: i32) -> Self {
        self.effects.melee_attack = delta;
        self
    }

    fn damage(mut self, delta: i32) -> Self {
        self.effects.damage = delta;
        self
    }

    fn armor_class(mut self, delta: i32) -> Self {
        self.effects.armor_class = delta;
        self
    }

    fn ac_by_attack(mut self, vs_melee: i32, vs_ranged: i32) -> Self {
        self.effects.ac_vs_melee = vs_melee;
        self.effects.ac_vs_ranged = vs_ranged;
        self
    }

    fn saves_and_skills(mut self, delta: i32) -> Self {
        self.effects.saves = delta;
        self.effects.skills = delta;
        self
    }

    fn abilities(mut self, strength: i32, dexterity: i32) -> Self {
        self.effects.strength = strength;
        self.effects.dexterity = dexterity;
        self
    }

    fn no_actions(mut self) -> Self {
        self.effects.flags.no_actions = true;
        self
    }

    fn loses_dex(mut self) -> Self {
        self.effects.flags.loses_dex_to_ac = true;
        self
    }

    fn half_speed(mut self) -> Self {
        self.effects.flags.half_speed = true;
        self
    }

    fn immobile(mut self) -> Self {
        self.effects.flags.immobile = true;
        self
    }

    fn single_action(mut self) -> Self {
        self.effects.flags.single_action = true;
        self
    }

    fn exclusive(mut self, precedence: u8) -> Self {
        self.exclusive = Some(precedence);
        self
    }
}

/// A condition attached to a combatant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub name: String,
    pub effects: EffectBundle,
    /// While present, the highest-precedence exclusive condition is the only
    /// bundle that counts. An unconscious target is also prone, but prone's
    /// melee and ranged AC shifts do not apply until it wakes up.
    #[serde(default)]
    pub exclusive: Option<u8>,
    #[serde(default)]
    pub duration: ConditionDuration,
    #[serde(default)]
    pub source: Option<CombatantId>,
}

/// Condition name → effect bundle. Built once and passed by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionRegistry {
    defs: IndexMap<String, ConditionDef>,
}

impl Default for ConditionRegistry {
    fn default() -> Self {
        Self::srd()
    }
}

impl ConditionRegistry {
    pub fn srd() -> Self {
        Self::from_defs(srd_conditions())
    }

    pub fn from_defs(defs: impl IntoIterator<Item = ConditionDef>) -> Self {
        let mut registry = Self {
            defs: IndexMap::new(),
        };
        registry.extend(defs);
        registry
    }

    /// Adds or replaces definitions.
    pub fn extend(&mut self, defs: impl IntoIterator<Item = ConditionDef>) {
        for mut def in defs {
            def.name = normalize_key(&def.name);
            self.defs.insert(def.name.clone(), def);
        }
    }

    pub fn get(&self, name: &str) -> Option<&ConditionDef> {
        self.defs.get(&normalize_key(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.defs.keys().map(String::as_str)
    }

    /// Attach a condition. Unknown names are an error, never skipped.
    pub fn apply(
        &self,
        combatant: &mut Combatant,
        name: &str,
        duration: ConditionDuration,
        source: Option<CombatantId>,
    ) -> Result<(), ValidationError> {
        let def = self
            .get(name)
            .ok_or_else(|| ValidationError::UnknownCondition(name.to_string()))?;
        combatant.conditions.push(Condition {
            name: def.name.clone(),
            effects: def.effects,
            exclusive: def.exclusive,
            duration,
            source,
        });
        tracing::debug!(combatant = %combatant.id, condition = %def.name, "condition applied");
        Ok(())
    }
}

/// Sum the bundles of all active conditions. When an exclusive condition is
/// present only the highest-precedence one counts.
pub fn aggregate(conditions: &[Condition]) -> EffectBundle {
    let dominant = conditions
        .iter()
        .filter_map(|c| c.exclusive.map(|precedence| (precedence, c)))
        .max_by_key(|(precedence, _)| *precedence);
    if let Some((_, condition)) = dominant {
        return condition.effects;
    }

    let mut total = EffectBundle::default();
    for condition in conditions {
        total.stack(&condition.effects);
    }
    total
}

/// Tick durations at a turn boundary and return the conditions that expired.
pub fn process_turn_boundary(boundary: TurnBoundary, conditions: &mut Vec<Condition>) -> Vec<Condition> {
    for condition in conditions.iter_mut() {
        if let ConditionDuration::Turns { count, at } = &mut condition.duration {
            if *at == boundary {
                *count = count.saturating_sub(1);
            }
        }
    }

    let mut expired = Vec::new();
    let mut idx = 0;
    while idx < conditions.len() {
        if matches!(conditions[idx].duration, ConditionDuration::Turns { count: 0, .. }) {
            expired.push(conditions.remove(idx));
        } else {
            idx += 1;
        }
    }
    expired
}

fn srd_conditions() -> Vec<ConditionDef> {
    vec![
        ConditionDef::new("blinded").armor_class(-2).half_speed(),
        ConditionDef::new("charging").armor_class(-2),
        ConditionDef::new("dazed").no_actions(),
        ConditionDef::new("dazzled").attack(-1),
        ConditionDef::new("dead").no_actions().exclusive(2),
        ConditionDef::new("disabled").single_action(),
        ConditionDef::new("entangled")
            .attack(-2)
            .abilities(0, -4)
            .half_speed(),
        ConditionDef::new("exhausted").abilities(-6, -6).half_speed(),
        ConditionDef::new("fatigued").abilities(-2, -2),
        ConditionDef::new("flat_footed").loses_dex(),
        ConditionDef::new("frightened").attack(-2).saves_and_skills(-2),
        ConditionDef::new("full_defense").armor_class(4),
        ConditionDef::new("grappled").immobile(),
        ConditionDef::new("paralyzed").no_actions().loses_dex().immobile(),
        ConditionDef::new("prone").melee_attack(-4).ac_by_attack(-4, 4),
        ConditionDef::new("shaken").attack(-2).saves_and_skills(-2),
        ConditionDef::new("sickened")
            .attack(-2)
            .damage(-2)
            .saves_and_skills(-2),
        ConditionDef::new("staggered").single_action(),
        ConditionDef::new("stunned").no_actions().armor_class(-2),
        ConditionDef::new("unconscious").no_actions().exclusive(1),
    ]
}
