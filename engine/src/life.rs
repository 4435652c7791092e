use serde::{Deserialize, Serialize};

use crate::combatant::Combatant;
use crate::conditions::{ConditionDuration, ConditionRegistry};
use crate::error::ValidationError;

/// Hit points at or below this are death.
pub const DEATH_THRESHOLD: i32 = -10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifeState {
    Conscious,
    Unconscious,
    Dead,
}

impl LifeState {
    pub fn of(combatant: &Combatant) -> Self {
        if combatant.has_condition("dead") || combatant.hp.current <= DEATH_THRESHOLD {
            LifeState::Dead
        } else if combatant.has_condition("unconscious") || combatant.hp.current <= 0 {
            LifeState::Unconscious
        } else {
            LifeState::Conscious
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DamageTaken {
    pub hp_before: i32,
    pub hp_after: i32,
    /// Damage as displayed: never more than the hit points that were left.
    pub taken: i32,
    pub state: LifeState,
    /// Set when this hit changed the life state.
    pub transition: Option<LifeState>,
}

/// Apply damage and handle the unconscious/dead transitions. The counter may
/// go negative; once dead, further damage is ignored.
pub fn apply_damage(
    registry: &ConditionRegistry,
    combatant: &mut Combatant,
    amount: i32,
) -> Result<DamageTaken, ValidationError> {
    let before = combatant.hp.current;
    let was = LifeState::of(combatant);
    if was == LifeState::Dead || amount <= 0 {
        return Ok(DamageTaken {
            hp_before: before,
            hp_after: before,
            taken: 0,
            state: was,
            transition: None,
        });
    }

    combatant.hp.current -= amount;
    let after = combatant.hp.current;
    let mut transition = None;

    if after <= DEATH_THRESHOLD {
        combatant.remove_condition("unconscious");
        registry.apply(combatant, "dead", ConditionDuration::Indefinite, None)?;
        transition = Some(LifeState::Dead);
        tracing::info!(combatant = %combatant.id, hp = after, "dies");
    } else if after <= 0 && !combatant.has_condition("unconscious") {
        registry.apply(combatant, "unconscious", ConditionDuration::Indefinite, None)?;
        if !combatant.has_condition("prone") {
            registry.apply(combatant, "prone", ConditionDuration::Indefinite, None)?;
        }
        transition = Some(LifeState::Unconscious);
        tracing::info!(combatant = %combatant.id, hp = after, "falls unconscious");
    }

    Ok(DamageTaken {
        hp_before: before,
        hp_after: after,
        taken: amount.min(before.max(0)),
        state: LifeState::of(combatant),
        transition,
    })
}

/// Healing up to max HP; regaining positive HP ends unconsciousness.
/// Returns the hit points actually restored.
pub fn heal(combatant: &mut Combatant, amount: i32) -> i32 {
    if amount <= 0 || LifeState::of(combatant) == LifeState::Dead {
        return 0;
    }
    let before = combatant.hp.current;
    combatant.hp.current = (before + amount).min(combatant.hp.max);
    if combatant.hp.current > 0 && combatant.remove_condition("unconscious") {
        tracing::info!(combatant = %combatant.id, hp = combatant.hp.current, "regains consciousness");
    }
    combatant.hp.current - before
}
