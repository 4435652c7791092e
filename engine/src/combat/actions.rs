use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::checks::Contest;
use crate::combat::attack::AttackOutcome;
use crate::combatant::{CombatantId, Position};
use crate::error::{RuleViolation, ValidationError};
use crate::life::DamageTaken;
use crate::spells::SpellEffect;
use crate::CheckResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCost {
    Free,
    Swift,
    Immediate,
    Move,
    Standard,
    FullRound,
}

impl fmt::Display for ActionCost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActionCost::Free => "free",
            ActionCost::Swift => "swift",
            ActionCost::Immediate => "immediate",
            ActionCost::Move => "move",
            ActionCost::Standard => "standard",
            ActionCost::FullRound => "full-round",
        })
    }
}

/// What a combatant may still do this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionEconomy {
    pub standard: bool,
    #[serde(rename = "move")]
    pub move_action: bool,
    pub swift: bool,
    pub immediate: bool,
    /// Staggered or disabled: one move or standard action, never both.
    pub single_action: bool,
    pub attacks_of_opportunity: u8,
}

impl ActionEconomy {
    pub fn fresh(single_action: bool, attacks_of_opportunity: u8) -> Self {
        Self {
            standard: true,
            move_action: true,
            swift: true,
            immediate: true,
            single_action,
            attacks_of_opportunity,
        }
    }

    /// Spend `cost`, or report why it cannot be paid. A standard action may be
    /// traded for a move action.
    pub fn spend(&mut self, cost: ActionCost) -> Result<(), RuleViolation> {
        match cost {
            ActionCost::Free => {}
            ActionCost::Swift if self.swift => self.swift = false,
            ActionCost::Immediate if self.immediate => self.immediate = false,
            ActionCost::Standard if self.standard => {
                self.standard = false;
                if self.single_action {
                    self.move_action = false;
                }
            }
            ActionCost::Move if self.move_action => {
                self.move_action = false;
                if self.single_action {
                    self.standard = false;
                }
            }
            ActionCost::Move if self.standard && !self.single_action => self.standard = false,
            ActionCost::FullRound if self.single_action => return Err(RuleViolation::LimitedActions),
            ActionCost::FullRound if self.standard && self.move_action => {
                self.standard = false;
                self.move_action = false;
            }
            _ => return Err(RuleViolation::ActionSpent(cost)),
        }
        Ok(())
    }

    pub fn can_afford(&self, cost: ActionCost) -> bool {
        let mut copy = *self;
        copy.spend(cost).is_ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManeuverKind {
    BullRush,
    Disarm,
    Grapple,
    Overrun,
    Sunder,
    Trip,
}

impl ManeuverKind {
    /// Overrun is the one maneuver that never provokes.
    pub fn provokes(self) -> bool {
        self != ManeuverKind::Overrun
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ManeuverKind::BullRush => "bull_rush",
            ManeuverKind::Disarm => "disarm",
            ManeuverKind::Grapple => "grapple",
            ManeuverKind::Overrun => "overrun",
            ManeuverKind::Sunder => "sunder",
            ManeuverKind::Trip => "trip",
        }
    }
}

impl fmt::Display for ManeuverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ManeuverKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match crate::rules::normalize_key(s).as_str() {
            "bull_rush" => Ok(ManeuverKind::BullRush),
            "disarm" => Ok(ManeuverKind::Disarm),
            "grapple" => Ok(ManeuverKind::Grapple),
            "overrun" => Ok(ManeuverKind::Overrun),
            "sunder" => Ok(ManeuverKind::Sunder),
            "trip" => Ok(ManeuverKind::Trip),
            _ => Err(ValidationError::UnknownManeuver(s.to_string())),
        }
    }
}

/// Condition that fires a readied action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "when", content = "combatant", rename_all = "snake_case")]
pub enum ReadyTrigger {
    /// Just before the named combatant takes an action.
    Acts(CombatantId),
    /// After the named combatant moves within the readier's reach.
    EntersReach(CombatantId),
}

impl ReadyTrigger {
    pub fn combatant(&self) -> &CombatantId {
        match self {
            ReadyTrigger::Acts(id) | ReadyTrigger::EntersReach(id) => id,
        }
    }
}

impl fmt::Display for ReadyTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadyTrigger::Acts(id) => write!(f, "when {id} acts"),
            ReadyTrigger::EntersReach(id) => write!(f, "when {id} enters reach"),
        }
    }
}

fn no_power_attack() -> i32 {
    0
}

/// A request to do something on the battlefield.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    MeleeAttack {
        target: CombatantId,
        #[serde(default = "no_power_attack")]
        power_attack: i32,
    },
    RangedAttack {
        target: CombatantId,
    },
    FullAttack {
        target: CombatantId,
        /// Defaults to every iterative attack the base attack bonus allows.
        #[serde(default)]
        attacks: Option<u8>,
        #[serde(default = "no_power_attack")]
        power_attack: i32,
    },
    CastSpell {
        spell: String,
        #[serde(default)]
        targets: Vec<CombatantId>,
        #[serde(default)]
        defensively: bool,
    },
    Charge {
        target: CombatantId,
        #[serde(default = "no_power_attack")]
        power_attack: i32,
    },
    CombatManeuver {
        maneuver: ManeuverKind,
        target: CombatantId,
        #[serde(default)]
        suppress_attack_of_opportunity: bool,
    },
    Move {
        to: Position,
    },
    FullDefense,
    ReadyAction {
        trigger: ReadyTrigger,
        action: Box<Action>,
    },
}

impl Action {
    pub fn melee(target: impl Into<CombatantId>) -> Self {
        Action::MeleeAttack {
            target: target.into(),
            power_attack: 0,
        }
    }

    /// Decode an action, telling an unknown `type` tag apart from a malformed body.
    pub fn from_json(value: serde_json::Value) -> Result<Self, ValidationError> {
        let tag = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| ValidationError::MalformedAction("missing action type".to_string()))?;
        tag.parse::<ActionKind>()?;
        serde_json::from_value(value).map_err(|err| ValidationError::MalformedAction(err.to_string()))
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Action::MeleeAttack { .. } => ActionKind::MeleeAttack,
            Action::RangedAttack { .. } => ActionKind::RangedAttack,
            Action::FullAttack { .. } => ActionKind::FullAttack,
            Action::CastSpell { .. } => ActionKind::CastSpell,
            Action::Charge { .. } => ActionKind::Charge,
            Action::CombatManeuver { .. } => ActionKind::CombatManeuver,
            Action::Move { .. } => ActionKind::Move,
            Action::FullDefense => ActionKind::FullDefense,
            Action::ReadyAction { .. } => ActionKind::ReadyAction,
        }
    }

    /// Every combatant this action names.
    pub fn targets(&self) -> Vec<&CombatantId> {
        match self {
            Action::MeleeAttack { target, .. }
            | Action::RangedAttack { target }
            | Action::FullAttack { target, .. }
            | Action::Charge { target, .. }
            | Action::CombatManeuver { target, .. } => vec![target],
            Action::CastSpell { targets, .. } => targets.iter().collect(),
            Action::Move { .. } | Action::FullDefense => Vec::new(),
            Action::ReadyAction { trigger, action } => {
                let mut ids = vec![trigger.combatant()];
                ids.extend(action.targets());
                ids
            }
        }
    }

    /// Cost for everything but spells, whose casting time comes from the rules data.
    pub fn base_cost(&self) -> ActionCost {
        match self {
            Action::MeleeAttack { .. }
            | Action::RangedAttack { .. }
            | Action::CastSpell { .. }
            | Action::CombatManeuver { .. }
            | Action::FullDefense
            | Action::ReadyAction { .. } => ActionCost::Standard,
            Action::FullAttack { .. } | Action::Charge { .. } => ActionCost::FullRound,
            Action::Move { .. } => ActionCost::Move,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    MeleeAttack,
    RangedAttack,
    FullAttack,
    CastSpell,
    Charge,
    CombatManeuver,
    Move,
    FullDefense,
    ReadyAction,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::MeleeAttack => "melee_attack",
            ActionKind::RangedAttack => "ranged_attack",
            ActionKind::FullAttack => "full_attack",
            ActionKind::CastSpell => "cast_spell",
            ActionKind::Charge => "charge",
            ActionKind::CombatManeuver => "combat_maneuver",
            ActionKind::Move => "move",
            ActionKind::FullDefense => "full_defense",
            ActionKind::ReadyAction => "ready_action",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match crate::rules::normalize_key(s).as_str() {
            "melee_attack" => ActionKind::MeleeAttack,
            "ranged_attack" => ActionKind::RangedAttack,
            "full_attack" => ActionKind::FullAttack,
            "cast_spell" => ActionKind::CastSpell,
            "charge" => ActionKind::Charge,
            "combat_maneuver" => ActionKind::CombatManeuver,
            "move" => ActionKind::Move,
            "full_defense" => ActionKind::FullDefense,
            "ready_action" => ActionKind::ReadyAction,
            _ => return Err(ValidationError::UnsupportedAction(s.to_string())),
        };
        Ok(kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedCondition {
    pub combatant: CombatantId,
    pub condition: String,
}

impl AppliedCondition {
    pub fn new(combatant: &CombatantId, condition: &str) -> Self {
        Self {
            combatant: combatant.clone(),
            condition: condition.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManeuverOutcome {
    pub maneuver: ManeuverKind,
    /// Attack of opportunity the attempt provoked.
    pub attack_of_opportunity: Option<AttackOutcome>,
    /// `None` when the attempt was spoiled before the opposed roll.
    pub contest: Option<Contest>,
    pub success: bool,
    pub pushed_ft: u32,
    pub weapon: Option<WeaponChange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "change", content = "weapon", rename_all = "snake_case")]
pub enum WeaponChange {
    Disarmed(String),
    Broken(String),
    Destroyed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpellReport {
    pub spell: String,
    pub level: u8,
    pub attacks_of_opportunity: Vec<AttackOutcome>,
    pub concentration: Option<CheckResult>,
    /// The spell was disrupted before it took effect.
    pub lost: bool,
    pub slot_consumed: bool,
    pub success: bool,
    pub effects: Vec<SpellEffect>,
    pub damage: Vec<(CombatantId, DamageTaken)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Attack(AttackOutcome),
    /// `attack` is `None` when a readied action stopped the charge short.
    Charge {
        from: Position,
        to: Position,
        attack: Option<AttackOutcome>,
    },
    Maneuver(ManeuverOutcome),
    Spell(SpellReport),
    Moved { from: Position, to: Position, distance_ft: u32 },
    Defending,
    Readied { trigger: ReadyTrigger, action: ActionKind },
}

/// One resolved action, as recorded in the combat log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionResult {
    pub actor: CombatantId,
    pub kind: ActionKind,
    pub target: Option<CombatantId>,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub conditions_applied: Vec<AppliedCondition>,
    pub message: String,
}

impl ActionResult {
    fn attacks(&self) -> Vec<&AttackOutcome> {
        match &self.outcome {
            Outcome::Attack(a) => vec![a],
            Outcome::Charge { attack, .. } => attack.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Whether any attack of this action hit.
    pub fn hit(&self) -> bool {
        self.attacks().iter().any(|a| a.roll.hit)
    }

    pub fn critical(&self) -> bool {
        self.attacks().iter().any(|a| a.roll.critical)
    }

    /// Hit points removed from the target by this action's own attacks and spells.
    pub fn damage(&self) -> i32 {
        match &self.outcome {
            Outcome::Spell(report) => report.damage.iter().map(|(_, d)| d.taken).sum(),
            _ => self
                .attacks()
                .iter()
                .filter_map(|a| a.applied.as_ref())
                .map(|d| d.taken)
                .sum(),
        }
    }
}
