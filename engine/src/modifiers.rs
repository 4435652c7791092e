//! Pure SRD calculators. No side effects and no dice, except for
//! [`weapon_damage`] which rolls through the supplied [`DiceSource`].

use serde::{Deserialize, Serialize};

use crate::combatant::{Combatant, Weapon};
use crate::dice::DiceSource;
use crate::{ability_mod, Ability, SaveKind};

pub use crate::ability_mod as ability_modifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackStyle {
    Melee,
    Ranged,
}

impl AttackStyle {
    pub fn of(weapon: &Weapon) -> Self {
        if weapon.is_ranged() {
            AttackStyle::Ranged
        } else {
            AttackStyle::Melee
        }
    }
}

/// Situational modifiers for one attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackOptions {
    pub charging: bool,
    /// Attack penalty traded for damage.
    pub power_attack: i32,
    /// Position in a full attack sequence (0 = first attack).
    pub attack_index: u8,
    /// Full range increments beyond the first.
    pub range_increments: u32,
}

/// Every term of an attack bonus, individually reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AttackBreakdown {
    pub base_attack_bonus: i32,
    pub ability: i32,
    pub enhancement: i32,
    pub size: i32,
    pub feats: i32,
    pub conditions: i32,
    pub charge: i32,
    pub power_attack: i32,
    pub iterative: i32,
    pub range: i32,
    pub broken: i32,
}

impl AttackBreakdown {
    pub fn total(&self) -> i32 {
        self.base_attack_bonus
            + self.ability
            + self.enhancement
            + self.size
            + self.feats
            + self.conditions
            + self.charge
            + self.power_attack
            + self.iterative
            + self.range
            + self.broken
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AcBreakdown {
    pub base: i32,
    pub armor: i32,
    pub shield: i32,
    pub dexterity: i32,
    pub size: i32,
    pub natural_armor: i32,
    pub deflection: i32,
    pub dodge: i32,
    pub conditions: i32,
}

impl AcBreakdown {
    pub fn total(&self) -> i32 {
        self.base
            + self.armor
            + self.shield
            + self.dexterity
            + self.size
            + self.natural_armor
            + self.deflection
            + self.dodge
            + self.conditions
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DamageBreakdown {
    pub rolls: Vec<u32>,
    pub dice_total: i32,
    pub bonus: i32,
    pub multiplier: u8,
    /// Damage before reduction.
    pub raw: i32,
    pub reduced_by: i32,
    pub total: i32,
    pub damage_type: crate::combatant::DamageType,
}

/// Ability score including condition deltas (fatigue, entanglement, ...).
pub fn effective_ability_mod(combatant: &Combatant, ability: Ability) -> i32 {
    let effects = combatant.effects();
    let delta = match ability {
        Ability::Str => effects.strength,
        Ability::Dex => effects.dexterity,
        _ => 0,
    };
    ability_mod(combatant.abilities.score(ability) + delta)
}

/// Ability used for attack rolls with `weapon`.
pub fn attack_ability(combatant: &Combatant, weapon: &Weapon) -> Ability {
    if weapon.is_ranged() {
        return Ability::Dex;
    }
    if weapon.finesse
        && effective_ability_mod(combatant, Ability::Dex) > effective_ability_mod(combatant, Ability::Str)
    {
        Ability::Dex
    } else {
        Ability::Str
    }
}

pub fn attack_bonus(combatant: &Combatant, style: AttackStyle, options: &AttackOptions) -> AttackBreakdown {
    let weapon = combatant.wielded();
    let effects = combatant.effects();
    let ability = match style {
        AttackStyle::Ranged => Ability::Dex,
        AttackStyle::Melee => attack_ability(combatant, &weapon),
    };
    let conditions = effects.attack
        + match style {
            AttackStyle::Melee => effects.melee_attack,
            AttackStyle::Ranged => 0,
        };

    AttackBreakdown {
        base_attack_bonus: combatant.base_attack_bonus,
        ability: effective_ability_mod(combatant, ability),
        enhancement: weapon.enhancement,
        size: combatant.size.modifier(),
        feats: combatant.bonuses.attack,
        conditions,
        charge: if options.charging { 2 } else { 0 },
        power_attack: -options.power_attack,
        iterative: -5 * i32::from(options.attack_index),
        range: -2 * options.range_increments as i32,
        broken: if weapon.broken { -2 } else { 0 },
    }
}

pub fn armor_class(combatant: &Combatant, style: AttackStyle) -> AcBreakdown {
    let effects = combatant.effects();
    let defense = &combatant.defense;
    let (dexterity, dodge) = if effects.flags.loses_dex_to_ac {
        (0, 0)
    } else {
        let dex = effective_ability_mod(combatant, Ability::Dex);
        let capped = match defense.max_dex {
            Some(max) => dex.min(max),
            None => dex,
        };
        (capped, defense.dodge + combatant.bonuses.armor_class)
    };
    let situational = match style {
        AttackStyle::Melee => effects.ac_vs_melee,
        AttackStyle::Ranged => effects.ac_vs_ranged,
    };

    AcBreakdown {
        base: 10,
        armor: defense.armor_bonus,
        shield: defense.shield_bonus,
        dexterity,
        size: combatant.size.modifier(),
        natural_armor: defense.natural_armor,
        deflection: defense.deflection,
        dodge,
        conditions: effects.armor_class + situational,
    }
}

pub fn saving_throw_bonus(combatant: &Combatant, save: SaveKind) -> i32 {
    let (base, feat) = match save {
        SaveKind::Fortitude => (combatant.saves.fortitude, combatant.bonuses.fortitude),
        SaveKind::Reflex => (combatant.saves.reflex, combatant.bonuses.reflex),
        SaveKind::Will => (combatant.saves.will, combatant.bonuses.will),
    };
    base + effective_ability_mod(combatant, save.key_ability()) + feat + combatant.effects().saves
}

pub fn initiative_modifier(combatant: &Combatant) -> i32 {
    effective_ability_mod(combatant, Ability::Dex) + combatant.bonuses.initiative
}

/// Base attack bonus + Strength modifier + special size modifier.
pub fn grapple_bonus(combatant: &Combatant) -> i32 {
    combatant.base_attack_bonus
        + effective_ability_mod(combatant, Ability::Str)
        + combatant.size.special_modifier()
}

/// Speed after half-speed and immobilizing conditions, in whole squares.
pub fn effective_speed(combatant: &Combatant) -> u32 {
    let flags = combatant.effects().flags;
    if flags.immobile {
        0
    } else if flags.half_speed {
        combatant.speed / 2 / 5 * 5
    } else {
        combatant.speed
    }
}

/// Lowest natural roll that threatens; Improved Critical doubles the range.
pub fn threat_floor(combatant: &Combatant, weapon: &Weapon) -> u8 {
    let floor = i32::from(weapon.threat_floor.clamp(2, 20));
    if combatant.has_feat("Improved Critical") {
        (21 - 2 * (21 - floor)).max(2) as u8
    } else {
        floor as u8
    }
}

/// Attacks in a full attack: +6, +11 and +16 BAB each add one.
pub fn iterative_attack_count(base_attack_bonus: i32) -> u8 {
    match base_attack_bonus {
        i32::MIN..=5 => 1,
        6..=10 => 2,
        11..=15 => 3,
        _ => 4,
    }
}

/// Per-attack penalties for `count` iterative attacks: 0, -5, -10, ...
pub fn iterative_penalties(count: u8) -> Vec<i32> {
    (0..count).map(|i| -5 * i32::from(i)).collect()
}

/// Flat damage bonus added once per hit, never multiplied on a critical.
pub fn damage_bonus(combatant: &Combatant, weapon: &Weapon, style: AttackStyle, options: &AttackOptions) -> i32 {
    let strength = effective_ability_mod(combatant, Ability::Str);
    let ability = match style {
        AttackStyle::Melee if weapon.two_handed && strength > 0 => strength * 3 / 2,
        AttackStyle::Melee => strength,
        AttackStyle::Ranged => strength.min(0),
    };
    let power_attack = match style {
        AttackStyle::Melee if weapon.two_handed => options.power_attack * 2,
        AttackStyle::Melee => options.power_attack,
        AttackStyle::Ranged => 0,
    };
    let broken = if weapon.broken { -2 } else { 0 };
    ability + weapon.damage.modifier + weapon.enhancement + combatant.bonuses.damage + power_attack + combatant.effects().damage + broken
}

/// `max(0, raw - amount)` unless the weapon overcomes the target's DR.
pub fn apply_damage_reduction(target: &Combatant, raw: i32, weapon: &Weapon) -> i32 {
    match &target.damage_reduction {
        Some(dr) if !dr.is_bypassed_by(weapon) => (raw - dr.amount).max(0),
        _ => raw,
    }
}

/// Roll weapon damage. A critical rolls the dice `crit_multiplier` times and
/// adds the flat bonus once; every hit deals at least 1 before reduction.
pub fn weapon_damage(
    dice: &mut dyn DiceSource,
    attacker: &Combatant,
    target: &Combatant,
    style: AttackStyle,
    is_critical: bool,
    options: &AttackOptions,
) -> DamageBreakdown {
    let weapon = attacker.wielded();
    let multiplier = if is_critical { weapon.crit_multiplier.max(1) } else { 1 };

    let mut rolls = Vec::new();
    let mut dice_total = 0;
    for _ in 0..multiplier {
        let roll = dice.roll(&weapon.damage);
        dice_total += roll.dice_total();
        rolls.extend(roll.rolls);
    }

    let bonus = damage_bonus(attacker, &weapon, style, options);
    let raw = (dice_total + bonus).max(1);
    let total = apply_damage_reduction(target, raw, &weapon);
    tracing::debug!(attacker = %attacker.id, ?rolls, bonus, raw, total, "weapon damage");

    DamageBreakdown {
        rolls,
        dice_total,
        bonus,
        multiplier,
        raw,
        reduced_by: raw - total,
        total,
        damage_type: weapon.damage_type,
    }
}
