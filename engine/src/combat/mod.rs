//! Tactical combat: action types, attack and maneuver resolution, the action
//! executor and the initiative-ordered scheduler.

pub mod actions;
pub mod attack;
pub mod encounter;
pub mod executor;
pub mod log;
pub mod maneuvers;

pub use actions::{
    Action, ActionCost, ActionEconomy, ActionKind, ActionResult, AppliedCondition, ManeuverKind,
    ManeuverOutcome, Outcome, ReadyTrigger, SpellReport, WeaponChange,
};
pub use attack::{attack_roll, AttackOutcome, AttackRoll, Confirmation};
pub use encounter::{CombatEncounter, EncounterStatus, Environment, ReadiedAction};
pub use executor::execute;
pub use log::{CombatEvent, EventKind};

use crate::config::Ruleset;
use crate::dice::DiceSource;
use crate::spells::Spellcaster;

/// Collaborators borrowed for the duration of one call into the engine.
pub struct CombatContext<'a> {
    pub rules: &'a Ruleset,
    pub dice: &'a mut dyn DiceSource,
    pub spells: &'a mut dyn Spellcaster,
}

impl<'a> CombatContext<'a> {
    pub fn new(rules: &'a Ruleset, dice: &'a mut dyn DiceSource, spells: &'a mut dyn Spellcaster) -> Self {
        Self { rules, dice, spells }
    }
}
