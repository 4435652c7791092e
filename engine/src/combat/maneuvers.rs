use crate::checks::{best_of_str_dex, contested_check, Contest};
use crate::combat::actions::{AppliedCondition, ManeuverKind, WeaponChange};
use crate::combatant::{Combatant, CombatantId, Position};
use crate::conditions::{ConditionDuration, ConditionRegistry};
use crate::dice::DiceSource;
use crate::error::ValidationError;
use crate::modifiers::{attack_bonus, effective_ability_mod, grapple_bonus, AttackOptions, AttackStyle};
use crate::Ability;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Attacker,
    Defender,
}

/// Modifier each side adds to its d20 in the opposed roll.
pub fn maneuver_modifier(kind: ManeuverKind, combatant: &Combatant, side: Side) -> i32 {
    match kind {
        ManeuverKind::Grapple => grapple_bonus(combatant),
        ManeuverKind::BullRush => {
            effective_ability_mod(combatant, Ability::Str) + combatant.size.special_modifier()
        }
        ManeuverKind::Trip | ManeuverKind::Overrun => {
            let ability = match side {
                Side::Attacker => effective_ability_mod(combatant, Ability::Str),
                Side::Defender => best_of_str_dex(combatant).1,
            };
            ability + combatant.size.special_modifier()
        }
        ManeuverKind::Disarm | ManeuverKind::Sunder => {
            let weapon = combatant.wielded();
            let handling = if weapon.two_handed {
                4
            } else if weapon.light || combatant.weapon.is_none() {
                -4
            } else {
                0
            };
            attack_bonus(combatant, AttackStyle::Melee, &AttackOptions::default()).total() + handling
        }
    }
}

pub fn roll_contest(dice: &mut dyn DiceSource, kind: ManeuverKind, attacker: &Combatant, defender: &Combatant) -> Contest {
    let contest = contested_check(
        dice,
        maneuver_modifier(kind, attacker, Side::Attacker),
        maneuver_modifier(kind, defender, Side::Defender),
    );
    tracing::debug!(
        maneuver = %kind,
        attacker = %attacker.id,
        defender = %defender.id,
        outcome = ?contest.outcome,
        "maneuver contest"
    );
    contest
}

/// 5 ft plus another 5 ft for every full 5 points the check was won by.
pub fn push_distance(margin: i32) -> u32 {
    5 + 5 * (margin.max(0) as u32 / 5)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManeuverEffect {
    pub conditions: Vec<AppliedCondition>,
    pub pushed_ft: u32,
    pub weapon: Option<WeaponChange>,
}

fn attach_once(
    registry: &ConditionRegistry,
    combatant: &mut Combatant,
    name: &str,
    source: &CombatantId,
    applied: &mut Vec<AppliedCondition>,
) -> Result<(), ValidationError> {
    if combatant.has_condition(name) {
        return Ok(());
    }
    registry.apply(combatant, name, ConditionDuration::Indefinite, Some(source.clone()))?;
    applied.push(AppliedCondition::new(&combatant.id, name));
    Ok(())
}

/// Apply what a won maneuver does. `is_free` says whether a square can take
/// the pushed defender.
pub fn apply_success(
    kind: ManeuverKind,
    registry: &ConditionRegistry,
    attacker: &mut Combatant,
    defender: &mut Combatant,
    contest: &Contest,
    is_free: impl Fn(Position) -> bool,
) -> Result<ManeuverEffect, ValidationError> {
    let mut effect = ManeuverEffect::default();
    match kind {
        ManeuverKind::Grapple => {
            attach_once(registry, defender, "grappled", &attacker.id, &mut effect.conditions)?;
            attach_once(registry, attacker, "grappled", &defender.id, &mut effect.conditions)?;
        }
        ManeuverKind::Trip | ManeuverKind::Overrun => {
            attach_once(registry, defender, "prone", &attacker.id, &mut effect.conditions)?;
        }
        ManeuverKind::BullRush => {
            let dx = (defender.position.x - attacker.position.x).signum();
            let dy = (defender.position.y - attacker.position.y).signum();
            let squares = push_distance(contest.margin()) / 5;
            let mut landing = defender.position;
            for _ in 0..squares {
                let next = landing.offset(dx, dy);
                if (dx == 0 && dy == 0) || !is_free(next) {
                    break;
                }
                landing = next;
            }
            effect.pushed_ft = defender.position.distance_ft(landing);
            defender.position = landing;
        }
        ManeuverKind::Disarm => {
            if let Some(weapon) = defender.weapon.take() {
                effect.weapon = Some(WeaponChange::Disarmed(weapon.name));
            }
        }
        ManeuverKind::Sunder => {
            let name = defender.weapon.as_ref().map(|w| (w.name.clone(), w.broken));
            match name {
                Some((name, true)) => {
                    defender.weapon = None;
                    effect.weapon = Some(WeaponChange::Destroyed(name));
                }
                Some((name, false)) => {
                    if let Some(weapon) = defender.weapon.as_mut() {
                        weapon.broken = true;
                    }
                    effect.weapon = Some(WeaponChange::Broken(name));
                }
                None => {}
            }
        }
    }
    Ok(effect)
}
