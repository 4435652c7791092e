use serde::Serialize;

use crate::combatant::Combatant;
use crate::dice::DiceSource;
use crate::modifiers::effective_ability_mod;
use crate::{check, Ability, CheckInput, CheckResult};

/// Result of a contested check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContestOutcome {
    AttackerWins,
    DefenderWins,
    TieDefender,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Contest {
    pub attacker_roll: i32,
    pub attacker_total: i32,
    pub defender_roll: i32,
    pub defender_total: i32,
    pub outcome: ContestOutcome,
}

impl Contest {
    pub fn attacker_won(&self) -> bool {
        self.outcome == ContestOutcome::AttackerWins
    }

    pub fn margin(&self) -> i32 {
        self.attacker_total - self.defender_total
    }
}

/// Roll contested d20 + mod; ties go to defender.
pub fn contested_check(dice: &mut dyn DiceSource, att_mod: i32, def_mod: i32) -> Contest {
    let attacker_roll = dice.d20();
    let defender_roll = dice.d20();
    let attacker_total = attacker_roll + att_mod;
    let defender_total = defender_roll + def_mod;
    let outcome = if attacker_total > defender_total {
        ContestOutcome::AttackerWins
    } else if attacker_total == defender_total {
        ContestOutcome::TieDefender
    } else {
        ContestOutcome::DefenderWins
    };
    tracing::debug!(
        attacker_roll,
        attacker_total,
        defender_roll,
        defender_total,
        ?outcome,
        "contested check"
    );
    Contest {
        attacker_roll,
        attacker_total,
        defender_roll,
        defender_total,
        outcome,
    }
}

/// Choose the better of STR or DEX.
pub fn best_of_str_dex(combatant: &Combatant) -> (Ability, i32) {
    let str_mod = effective_ability_mod(combatant, Ability::Str);
    let dex_mod = effective_ability_mod(combatant, Ability::Dex);
    if dex_mod > str_mod {
        (Ability::Dex, dex_mod)
    } else {
        (Ability::Str, str_mod)
    }
}

/// d20 + caster level + key ability modifier (+ feat bonuses) vs `dc`.
pub fn concentration_check(dice: &mut dyn DiceSource, caster: &Combatant, dc: i32, defensive: bool) -> CheckResult {
    let (level, ability) = match &caster.spellcasting {
        Some(sc) => (sc.caster_level, sc.ability),
        None => (0, Ability::Con),
    };
    let combat_casting = if defensive && caster.has_feat("Combat Casting") { 4 } else { 0 };
    let modifier = level
        + effective_ability_mod(caster, ability)
        + caster.bonuses.concentration
        + caster.effects().skills
        + combat_casting;
    check(dice, CheckInput { dc, modifier })
}
