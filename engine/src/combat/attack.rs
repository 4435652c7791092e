use serde::Serialize;

use crate::combatant::Combatant;
use crate::dice::DiceSource;
use crate::life::DamageTaken;
use crate::modifiers::{
    armor_class, attack_bonus, threat_floor, weapon_damage, AttackBreakdown, AttackOptions, AttackStyle,
    DamageBreakdown,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Confirmation {
    pub natural: i32,
    pub total: i32,
    pub confirmed: bool,
}

/// The d20 side of one attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttackRoll {
    pub natural: i32,
    pub bonus: i32,
    pub total: i32,
    pub armor_class: i32,
    pub hit: bool,
    pub threatened: bool,
    pub confirmation: Option<Confirmation>,
    pub critical: bool,
}

/// Natural 1 always misses, natural 20 always hits. A hit whose natural roll
/// is at or above `threat_floor` threatens, and a second roll confirms it
/// unless that roll is a natural 1.
pub fn attack_roll(dice: &mut dyn DiceSource, bonus: i32, armor_class: i32, threat_floor: u8) -> AttackRoll {
    let natural = dice.d20();
    let total = natural + bonus;
    let hit = match natural {
        1 => false,
        20 => true,
        _ => total >= armor_class,
    };
    let threatened = hit && (natural == 20 || natural >= i32::from(threat_floor));

    let confirmation = threatened.then(|| {
        let natural = dice.d20();
        let total = natural + bonus;
        let confirmed = natural != 1 && (natural == 20 || total >= armor_class);
        Confirmation {
            natural,
            total,
            confirmed,
        }
    });
    let critical = confirmation.is_some_and(|c| c.confirmed);

    AttackRoll {
        natural,
        bonus,
        total,
        armor_class,
        hit,
        threatened,
        confirmation,
        critical,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttackOutcome {
    pub weapon: String,
    pub breakdown: AttackBreakdown,
    pub roll: AttackRoll,
    pub damage: Option<DamageBreakdown>,
    /// Filled in once the damage has been applied to the target.
    pub applied: Option<DamageTaken>,
}

/// Roll one attack and, on a hit, its damage. Nothing is applied yet.
pub fn resolve_attack(
    dice: &mut dyn DiceSource,
    attacker: &Combatant,
    target: &Combatant,
    style: AttackStyle,
    options: &AttackOptions,
) -> AttackOutcome {
    let weapon = attacker.wielded();
    let breakdown = attack_bonus(attacker, style, options);
    let ac = armor_class(target, style).total();
    let roll = attack_roll(dice, breakdown.total(), ac, threat_floor(attacker, &weapon));
    tracing::debug!(
        attacker = %attacker.id,
        target = %target.id,
        natural = roll.natural,
        total = roll.total,
        ac,
        hit = roll.hit,
        critical = roll.critical,
        "attack roll"
    );

    let damage = roll
        .hit
        .then(|| weapon_damage(dice, attacker, target, style, roll.critical, options));

    AttackOutcome {
        weapon: weapon.name.clone(),
        breakdown,
        roll,
        damage,
        applied: None,
    }
}

/// One-line description: `Valeros hits Goblin 1 with longsword (d20 14+5=19 vs AC 15) for 7 slashing (HP 5 -> -2)`.
pub fn describe_attack(attacker: &str, target: &str, outcome: &AttackOutcome) -> String {
    let roll = &outcome.roll;
    let dice = format!(
        "(d20 {}{:+}={} vs AC {})",
        roll.natural, roll.bonus, roll.total, roll.armor_class
    );
    if !roll.hit {
        let why = if roll.natural == 1 { " natural 1" } else { "" };
        return format!("{attacker} misses {target} with {}{why} {dice}", outcome.weapon);
    }

    let verb = if roll.critical { "critically hits" } else { "hits" };
    let mut line = format!("{attacker} {verb} {target} with {} {dice}", outcome.weapon);
    if let Some(damage) = &outcome.damage {
        line.push_str(&format!(" for {} {}", damage.total, damage.damage_type.as_str()));
        if damage.reduced_by > 0 {
            line.push_str(&format!(" ({} absorbed)", damage.reduced_by));
        }
    }
    if let Some(applied) = &outcome.applied {
        line.push_str(&format!(" (HP {} -> {})", applied.hp_before, applied.hp_after));
    }
    line
}
