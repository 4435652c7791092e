use serde::Serialize;

use crate::combat::actions::{ActionKind, ActionResult};
use crate::combat::encounter::EncounterStatus;
use crate::combatant::CombatantId;
use crate::life::LifeState;

/// One entry in the encounter's append-only log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CombatEvent {
    pub round: u32,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventKind {
    CombatStarted {
        combatants: usize,
    },
    InitiativeRolled {
        combatant: CombatantId,
        roll: i32,
        modifier: i32,
        total: i32,
    },
    RoundStarted,
    TurnStarted {
        combatant: CombatantId,
    },
    TurnSkipped {
        combatant: CombatantId,
        reason: String,
    },
    ActionResolved {
        result: ActionResult,
    },
    ActionRejected {
        combatant: CombatantId,
        action: ActionKind,
        reason: String,
    },
    ReadiedActionTriggered {
        combatant: CombatantId,
        trigger: CombatantId,
    },
    ReadiedActionExpired {
        combatant: CombatantId,
    },
    ConditionExpired {
        combatant: CombatantId,
        condition: String,
    },
    CombatantDown {
        combatant: CombatantId,
        state: LifeState,
    },
    CombatEnded {
        status: EncounterStatus,
    },
}

impl CombatEvent {
    /// Human-readable line in the `[TAG] ...` style of the text log.
    pub fn describe(&self) -> String {
        match &self.kind {
            EventKind::CombatStarted { combatants } => format!("[COMBAT] begins with {combatants} combatants"),
            EventKind::InitiativeRolled {
                combatant,
                roll,
                modifier,
                total,
            } => format!("[INIT] {combatant}: d20 {roll}{modifier:+} = {total}"),
            EventKind::RoundStarted => format!("[ROUND] {}", self.round),
            EventKind::TurnStarted { combatant } => format!("[TURN] {combatant}"),
            EventKind::TurnSkipped { combatant, reason } => format!("[TURN] {combatant} skipped: {reason}"),
            EventKind::ActionResolved { result } => format!("[{}] {}", tag(result.kind), result.message),
            EventKind::ActionRejected {
                combatant,
                action,
                reason,
            } => format!("[REJECTED][{combatant}] {action}: {reason}"),
            EventKind::ReadiedActionTriggered { combatant, trigger } => {
                format!("[READY][{combatant}] readied action triggered by {trigger}")
            }
            EventKind::ReadiedActionExpired { combatant } => format!("[READY][{combatant}] readied action expires"),
            EventKind::ConditionExpired { combatant, condition } => {
                format!("[COND][{combatant}] {condition} ends")
            }
            EventKind::CombatantDown { combatant, state } => match state {
                LifeState::Dead => format!("[COND][{combatant}] is dead"),
                _ => format!("[COND][{combatant}] falls unconscious"),
            },
            EventKind::CombatEnded { status } => format!("[COMBAT] ends: {status}"),
        }
    }
}

fn tag(kind: ActionKind) -> &'static str {
    match kind {
        ActionKind::MeleeAttack | ActionKind::RangedAttack | ActionKind::FullAttack | ActionKind::Charge => "ATTACK",
        ActionKind::CastSpell => "SPELL",
        ActionKind::CombatManeuver => "MANEUVER",
        ActionKind::Move => "MOVE",
        ActionKind::FullDefense => "DEFEND",
        ActionKind::ReadyAction => "READY",
    }
}
