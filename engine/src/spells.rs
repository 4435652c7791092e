//! Spell resolution behind the [`Spellcaster`] seam.
//!
//! The executor owns everything around a cast (action cost, slots,
//! concentration, attacks of opportunity) and hands the actual effect to a
//! `Spellcaster`. [`RulesSpellcaster`] resolves the damage, healing, save and
//! condition fields of SRD spell records.

use serde::Serialize;

use crate::combatant::{Combatant, CombatantId, DamageType};
use crate::conditions::ConditionDuration;
use crate::dice::{DiceExpr, DiceSource};
use crate::modifiers::saving_throw_bonus;
use crate::rules::{SaveEffect, Spell};
use crate::{check, CheckInput, SaveKind};

/// Everything a spellcaster needs to resolve one cast.
#[derive(Debug, Clone)]
pub struct SpellRequest<'a> {
    pub caster: &'a Combatant,
    pub spell: &'a Spell,
    pub targets: Vec<&'a Combatant>,
    pub caster_level: i32,
    pub save_dc: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum SpellEffect {
    Damage {
        target: CombatantId,
        amount: i32,
        damage_type: DamageType,
    },
    Heal {
        target: CombatantId,
        amount: i32,
    },
    Condition {
        target: CombatantId,
        condition: String,
        duration: ConditionDuration,
    },
    SavingThrow {
        target: CombatantId,
        save: SaveKind,
        roll: i32,
        total: i32,
        dc: i32,
        passed: bool,
    },
}

impl SpellEffect {
    pub fn target(&self) -> &CombatantId {
        match self {
            SpellEffect::Damage { target, .. }
            | SpellEffect::Heal { target, .. }
            | SpellEffect::Condition { target, .. }
            | SpellEffect::SavingThrow { target, .. } => target,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpellOutcome {
    pub success: bool,
    pub effects: Vec<SpellEffect>,
}

pub trait Spellcaster {
    fn cast_spell(&mut self, request: &SpellRequest<'_>, dice: &mut dyn DiceSource) -> anyhow::Result<SpellOutcome>;
}

/// Resolves spells straight from their rules records.
#[derive(Debug, Clone, Copy, Default)]
pub struct RulesSpellcaster;

impl RulesSpellcaster {
    fn damage_expr(spell: &Spell, caster_level: i32) -> Option<(DiceExpr, DamageType)> {
        let damage = spell.damage.as_ref()?;
        let mut multiplier = 1;
        if damage.per_caster_level {
            multiplier = caster_level.max(1) as u32;
            if let Some(max) = damage.max_multiplier {
                multiplier = multiplier.min(max);
            }
        }
        let expr = DiceExpr {
            count: damage.dice.count * multiplier,
            ..damage.dice
        };
        Some((expr, damage.damage_type))
    }
}

impl Spellcaster for RulesSpellcaster {
    fn cast_spell(&mut self, request: &SpellRequest<'_>, dice: &mut dyn DiceSource) -> anyhow::Result<SpellOutcome> {
        let spell = request.spell;
        let mut effects = Vec::new();

        // One damage roll shared by every target.
        let damage = Self::damage_expr(spell, request.caster_level).map(|(expr, kind)| (dice.roll(&expr).total.max(0), kind));

        for target in &request.targets {
            let save = spell.save.map(|save| {
                let result = check(
                    dice,
                    CheckInput {
                        dc: request.save_dc,
                        modifier: saving_throw_bonus(target, save.kind),
                    },
                );
                effects.push(SpellEffect::SavingThrow {
                    target: target.id.clone(),
                    save: save.kind,
                    roll: result.roll,
                    total: result.total,
                    dc: result.dc,
                    passed: result.passed,
                });
                (save.effect, result.passed)
            });
            let negated = matches!(save, Some((SaveEffect::Negates, true)));
            let halved = matches!(save, Some((SaveEffect::Half, true)));

            if let Some((amount, damage_type)) = damage {
                let amount = if halved { amount / 2 } else { amount };
                if !negated && amount > 0 {
                    effects.push(SpellEffect::Damage {
                        target: target.id.clone(),
                        amount,
                        damage_type,
                    });
                }
            }

            if let Some(healing) = &spell.healing {
                let bonus = if healing.max_level_bonus > 0 {
                    request.caster_level.clamp(0, healing.max_level_bonus)
                } else {
                    0
                };
                effects.push(SpellEffect::Heal {
                    target: target.id.clone(),
                    amount: dice.roll(&healing.dice).total + bonus,
                });
            }

            if let Some(condition) = &spell.condition {
                if !negated {
                    let rounds = if condition.rounds_per_level {
                        request.caster_level.max(1) as u32
                    } else {
                        condition.rounds
                    };
                    let duration = if rounds == 0 {
                        ConditionDuration::Indefinite
                    } else {
                        ConditionDuration::rounds(rounds)
                    };
                    effects.push(SpellEffect::Condition {
                        target: target.id.clone(),
                        condition: condition.name.clone(),
                        duration,
                    });
                }
            }
        }

        let success = effects
            .iter()
            .any(|e| !matches!(e, SpellEffect::SavingThrow { .. }));
        tracing::debug!(spell = %spell.name, caster = %request.caster.id, effects = effects.len(), "spell resolved");
        Ok(SpellOutcome { success, effects })
    }
}
