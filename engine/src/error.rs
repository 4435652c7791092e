use thiserror::Error;

use crate::combat::ActionCost;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    #[error("invalid dice notation: {0}")]
    InvalidNotation(String),
    #[error("invalid die size: d{0}")]
    InvalidDieSize(u32),
}

/// Malformed input. Always surfaced to the caller, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("unknown combatant: {0}")]
    UnknownCombatant(String),
    #[error("{actor} targets {target}, which is not part of this encounter")]
    UnknownTarget { actor: String, target: String },
    #[error("duplicate combatant id: {0}")]
    DuplicateCombatant(String),
    #[error("unknown condition: {0}")]
    UnknownCondition(String),
    #[error("unknown combat maneuver: {0}")]
    UnknownManeuver(String),
    #[error("unknown {kind}: {name}")]
    UnknownRecord { kind: &'static str, name: String },
    #[error("unsupported action: {0}")]
    UnsupportedAction(String),
    #[error("malformed action: {0}")]
    MalformedAction(String),
    #[error("combat is not active")]
    CombatNotActive,
    #[error(transparent)]
    Dice(#[from] DiceError),
}

/// A legal-looking action the rules forbid right now. The scheduler records
/// these as rejected actions and carries on with the turn.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleViolation {
    #[error("no {0} action left this turn")]
    ActionSpent(ActionCost),
    #[error("only a single move or standard action is allowed this turn")]
    LimitedActions,
    #[error("{0} cannot act")]
    CannotAct(String),
    #[error("{0} is already down")]
    TargetDown(String),
    #[error("target is out of reach ({distance} ft, reach {reach} ft)")]
    OutOfReach { distance: u32, reach: u32 },
    #[error("target is out of range ({distance} ft, max {max} ft)")]
    OutOfRange { distance: u32, max: u32 },
    #[error("a {0} weapon is required")]
    WrongWeapon(&'static str),
    #[error("no clear charge path: {0}")]
    NoChargePath(String),
    #[error("cannot move {requested} ft (speed {speed} ft)")]
    TooFar { requested: u32, speed: u32 },
    #[error("destination square is blocked")]
    Blocked,
    #[error("cannot move while immobilized")]
    Immobile,
    #[error("{attacks} attacks requested but base attack bonus allows {allowed}")]
    TooManyAttacks { attacks: u8, allowed: u8 },
    #[error("power attack of {requested} exceeds base attack bonus {bab}")]
    PowerAttackTooHigh { requested: i32, bab: i32 },
    #[error("requires the {0} feat")]
    MissingFeat(&'static str),
    #[error("{0} is not a spellcaster")]
    NotACaster(String),
    #[error("no level {0} spell slot remaining")]
    NoSpellSlot(u8),
    #[error("{0} holds no weapon")]
    Unarmed(String),
    #[error("{0} cannot be readied")]
    CannotReady(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("rule violation: {0}")]
    Rule(#[from] RuleViolation),
    #[error("external collaborator failed: {0:#}")]
    External(anyhow::Error),
}

impl From<DiceError> for EngineError {
    fn from(err: DiceError) -> Self {
        EngineError::Validation(err.into())
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
