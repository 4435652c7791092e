//! D&D 3.5 SRD rules and tactical combat engine.
//!
//! The crate is organised leaves first:
//! - [`rules`]: read-only SRD records (races, classes, feats, equipment, spells)
//! - [`modifiers`]: pure calculators for attack bonus, AC, saves and damage
//! - [`conditions`]: the condition registry and per-combatant status effects
//! - [`combat`]: maneuvers, the action executor and the initiative scheduler
//!
//! Everything that rolls dice takes a [`DiceSource`], so tests can script exact
//! sequences with [`Dice::from_scripted`].

pub mod ai;
pub mod api;
pub mod character;
pub mod checks;
pub mod combat;
pub mod combatant;
pub mod conditions;
pub mod config;
pub mod content;
pub mod dice;
pub mod error;
pub mod life;
pub mod modifiers;
pub mod rules;
pub mod spells;

use serde::{Deserialize, Serialize};

pub use ai::{ActionSource, ScriptedActions, TacticalAi};
pub use combat::{
    Action, ActionKind, ActionResult, CombatContext, CombatEncounter, CombatEvent,
    EncounterStatus, Environment, EventKind, ManeuverKind,
};
pub use combatant::{
    Combatant, CombatantId, DamageReduction, DamageType, Defense, Faction, Position, Size,
    Weapon, WeaponKind,
};
pub use config::{EngineConfig, Ruleset};
pub use dice::{DiceExpr, DiceRoll, DiceSource};
pub use error::{EngineError, RuleViolation, ValidationError};

/// Seeded or scripted dice; the default [`DiceSource`].
pub use dice::Dice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ability {
    Str,
    Dex,
    Con,
    Int,
    Wis,
    Cha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityScores {
    #[serde(rename = "str")]
    pub str_: i32,
    pub dex: i32,
    pub con: i32,
    #[serde(rename = "int")]
    pub int_: i32,
    pub wis: i32,
    pub cha: i32,
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self {
            str_: 10,
            dex: 10,
            con: 10,
            int_: 10,
            wis: 10,
            cha: 10,
        }
    }
}

impl AbilityScores {
    pub fn score(&self, ability: Ability) -> i32 {
        match ability {
            Ability::Str => self.str_,
            Ability::Dex => self.dex,
            Ability::Con => self.con,
            Ability::Int => self.int_,
            Ability::Wis => self.wis,
            Ability::Cha => self.cha,
        }
    }

    pub fn score_mut(&mut self, ability: Ability) -> &mut i32 {
        match ability {
            Ability::Str => &mut self.str_,
            Ability::Dex => &mut self.dex,
            Ability::Con => &mut self.con,
            Ability::Int => &mut self.int_,
            Ability::Wis => &mut self.wis,
            Ability::Cha => &mut self.cha,
        }
    }

    pub fn mod_of(&self, ability: Ability) -> i32 {
        ability_mod(self.score(ability))
    }
}

/// The three SRD saving throws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveKind {
    Fortitude,
    Reflex,
    Will,
}

impl SaveKind {
    pub fn key_ability(self) -> Ability {
        match self {
            SaveKind::Fortitude => Ability::Con,
            SaveKind::Reflex => Ability::Dex,
            SaveKind::Will => Ability::Wis,
        }
    }
}

/* ---------------- typed check API ---------------- */

#[derive(Debug, Clone, Copy)]
pub struct CheckInput {
    pub dc: i32,
    pub modifier: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub roll: i32,
    pub total: i32,
    pub dc: i32,
    pub passed: bool,
}

/// Roll a d20, add modifier, compare vs DC.
pub fn check(dice: &mut dyn DiceSource, input: CheckInput) -> CheckResult {
    let roll = dice.d20();
    let total = roll + input.modifier;
    CheckResult {
        roll,
        total,
        dc: input.dc,
        passed: total >= input.dc,
    }
}

/// D&D ability modifier = floor((score - 10) / 2) for integer scores.
pub fn ability_mod(score: i32) -> i32 {
    // `div_euclid` with positive divisor matches mathematical floor division.
    (score - 10).div_euclid(2)
}
