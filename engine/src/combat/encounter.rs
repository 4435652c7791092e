use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ai::ActionSource;
use crate::combat::actions::{Action, ActionEconomy, ReadyTrigger};
use crate::combat::executor::execute;
use crate::combat::log::{CombatEvent, EventKind};
use crate::combat::CombatContext;
use crate::combatant::{Combatant, CombatantId, Faction, Position};
use crate::conditions::{process_turn_boundary, ConditionDuration, TurnBoundary};
use crate::config::Ruleset;
use crate::dice::DiceSource;
use crate::error::{EngineError, Result, RuleViolation, ValidationError};
use crate::modifiers::{effective_ability_mod, effective_speed, initiative_modifier};
use crate::Ability;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncounterStatus {
    NotStarted,
    Active,
    Victory,
    Defeat,
}

impl EncounterStatus {
    pub fn is_over(self) -> bool {
        matches!(self, EncounterStatus::Victory | EncounterStatus::Defeat)
    }
}

impl fmt::Display for EncounterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EncounterStatus::NotStarted => "not started",
            EncounterStatus::Active => "active",
            EncounterStatus::Victory => "victory",
            EncounterStatus::Defeat => "defeat",
        })
    }
}

/// Static battlefield features.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    pub name: String,
    /// Squares nobody can enter or charge through.
    pub blocked: BTreeSet<Position>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadiedAction {
    pub owner: CombatantId,
    pub trigger: ReadyTrigger,
    pub action: Action,
}

/// Attacks of opportunity per round: Combat Reflexes adds the Dexterity bonus.
pub(crate) fn attacks_of_opportunity_per_round(combatant: &Combatant) -> u8 {
    if combatant.has_feat("Combat Reflexes") {
        1 + effective_ability_mod(combatant, Ability::Dex).clamp(0, 20) as u8
    } else {
        1
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CombatEncounter {
    id: Uuid,
    combatants: Vec<Combatant>,
    round: u32,
    turn_index: usize,
    status: EncounterStatus,
    environment: Environment,
    pub(crate) readied: Vec<ReadiedAction>,
    log: Vec<CombatEvent>,
}

impl CombatEncounter {
    /// Roll initiative and start combat. Ties keep input order, party first.
    pub fn initialize_combat(
        party: Vec<Combatant>,
        enemies: Vec<Combatant>,
        environment: Environment,
        rules: &Ruleset,
        dice: &mut dyn DiceSource,
    ) -> Result<Self> {
        let mut combatants: Vec<Combatant> = party.into_iter().chain(enemies).collect();
        let mut seen = BTreeSet::new();
        for c in &combatants {
            if !seen.insert(c.id.clone()) {
                return Err(ValidationError::DuplicateCombatant(c.id.to_string()).into());
            }
        }

        let mut encounter = Self {
            id: Uuid::new_v4(),
            combatants: Vec::new(),
            round: 1,
            turn_index: 0,
            status: EncounterStatus::NotStarted,
            environment,
            readied: Vec::new(),
            log: Vec::new(),
        };

        for c in combatants.iter_mut() {
            let roll = dice.d20();
            let modifier = initiative_modifier(c);
            c.initiative = roll + modifier;
            c.economy = ActionEconomy::fresh(false, attacks_of_opportunity_per_round(c));
            if rules.config.flat_footed_at_start {
                rules
                    .conditions
                    .apply(c, "flat_footed", ConditionDuration::until_next_turn(), None)?;
            }
            encounter.push(EventKind::InitiativeRolled {
                combatant: c.id.clone(),
                roll,
                modifier,
                total: c.initiative,
            });
        }
        // `sort_by` is stable.
        combatants.sort_by(|a, b| b.initiative.cmp(&a.initiative));

        encounter.combatants = combatants;
        encounter.status = EncounterStatus::Active;
        encounter.push(EventKind::CombatStarted {
            combatants: encounter.combatants.len(),
        });
        encounter.push(EventKind::RoundStarted);
        tracing::info!(
            encounter = %encounter.id,
            order = ?encounter.combatants.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
            "combat started"
        );
        encounter.check_end();
        Ok(encounter)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Combatants in initiative order.
    pub fn combatants(&self) -> &[Combatant] {
        &self.combatants
    }

    pub fn combatant(&self, id: &CombatantId) -> Option<&Combatant> {
        self.combatants.iter().find(|c| &c.id == id)
    }

    pub fn combatant_mut(&mut self, id: &CombatantId) -> Option<&mut Combatant> {
        self.combatants.iter_mut().find(|c| &c.id == id)
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn turn_index(&self) -> usize {
        self.turn_index
    }

    /// Whose turn it is.
    pub fn current(&self) -> Option<&Combatant> {
        self.combatants.get(self.turn_index)
    }

    pub fn status(&self) -> EncounterStatus {
        self.status
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn readied(&self) -> &[ReadiedAction] {
        &self.readied
    }

    pub fn log(&self) -> &[CombatEvent] {
        &self.log
    }

    /// Hostile combatants still standing.
    pub fn enemies_of<'a>(&'a self, faction: Faction) -> impl Iterator<Item = &'a Combatant> + 'a {
        self.combatants
            .iter()
            .filter(move |c| c.faction != faction && !c.is_defeated())
    }

    pub(crate) fn push(&mut self, kind: EventKind) {
        self.log.push(CombatEvent {
            round: self.round,
            kind,
        });
    }

    pub(crate) fn ensure_active(&self) -> Result<(), ValidationError> {
        if self.status == EncounterStatus::Active {
            Ok(())
        } else {
            Err(ValidationError::CombatNotActive)
        }
    }

    pub(crate) fn index_of(&self, id: &CombatantId) -> Result<usize, ValidationError> {
        self.combatants
            .iter()
            .position(|c| &c.id == id)
            .ok_or_else(|| ValidationError::UnknownCombatant(id.to_string()))
    }

    pub(crate) fn target_index(&self, actor: &CombatantId, target: &CombatantId) -> Result<usize, ValidationError> {
        self.combatants
            .iter()
            .position(|c| &c.id == target)
            .ok_or_else(|| ValidationError::UnknownTarget {
                actor: actor.to_string(),
                target: target.to_string(),
            })
    }

    pub(crate) fn at(&self, idx: usize) -> &Combatant {
        &self.combatants[idx]
    }

    pub(crate) fn at_mut(&mut self, idx: usize) -> &mut Combatant {
        &mut self.combatants[idx]
    }

    /// Two distinct combatants, mutably.
    pub(crate) fn pair_mut(&mut self, a: usize, b: usize) -> (&mut Combatant, &mut Combatant) {
        debug_assert_ne!(a, b);
        if a < b {
            let (left, right) = self.combatants.split_at_mut(b);
            (&mut left[a], &mut right[0])
        } else {
            let (left, right) = self.combatants.split_at_mut(a);
            (&mut right[0], &mut left[b])
        }
    }

    /// Indices of combatants other than `exclude`.
    pub(crate) fn others(&self, exclude: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.combatants.len()).filter(move |&i| i != exclude)
    }

    /// Squares held by standing combatants other than `ignore`, plus blocked terrain.
    pub(crate) fn occupied(&self, ignore: &[usize]) -> BTreeSet<Position> {
        let mut squares = self.environment.blocked.clone();
        for (idx, c) in self.combatants.iter().enumerate() {
            if !ignore.contains(&idx) && !c.is_defeated() {
                squares.insert(c.position);
            }
        }
        squares
    }

    /// Where a charge from `actor` toward `target` ends: the nearest free
    /// square adjacent to the target, reached in a straight unobstructed line
    /// of at least 10 ft and at most double speed.
    pub fn charge_path(&self, actor: &CombatantId, target: &CombatantId) -> Result<Position> {
        let a = self.index_of(actor)?;
        let t = self.target_index(actor, target)?;
        Ok(self.charge_destination(a, t)?)
    }

    pub(crate) fn charge_destination(&self, a: usize, t: usize) -> Result<Position, RuleViolation> {
        let charger = &self.combatants[a];
        let speed = effective_speed(charger);
        if speed == 0 {
            return Err(RuleViolation::Immobile);
        }
        let max = speed * 2;
        let from = charger.position;
        let target = self.combatants[t].position;
        let occupied = self.occupied(&[a]);

        // Feet first, then straight-line closeness to break ties.
        let mut candidates: Vec<(u32, i32, Position)> = Vec::new();
        for dx in -1..=1 {
            for dy in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let square = target.offset(dx, dy);
                let distance = from.distance_ft(square);
                if distance < 10 || distance > max || occupied.contains(&square) {
                    continue;
                }
                if from.line_to(square).iter().any(|p| occupied.contains(p)) {
                    continue;
                }
                let (ex, ey) = (square.x - from.x, square.y - from.y);
                candidates.push((distance, ex * ex + ey * ey, square));
            }
        }
        candidates.sort();
        match candidates.first() {
            Some((_, _, square)) => Ok(*square),
            None => {
                let distance = from.distance_ft(target);
                let reason = if distance <= 10 {
                    format!("{} is too close to charge ({distance} ft)", self.combatants[t].name)
                } else if distance > max + 5 {
                    format!("{} is {distance} ft away, beyond double speed ({max} ft)", self.combatants[t].name)
                } else {
                    format!("no straight, unobstructed line to {}", self.combatants[t].name)
                };
                Err(RuleViolation::NoChargePath(reason))
            }
        }
    }

    /// No standing pc is a defeat, otherwise no standing npc is a victory.
    pub fn check_end(&mut self) -> EncounterStatus {
        if self.status != EncounterStatus::Active {
            return self.status;
        }
        let standing = |faction| {
            self.combatants
                .iter()
                .any(|c| c.faction == faction && !c.is_defeated())
        };
        let next = if !standing(Faction::Pc) {
            EncounterStatus::Defeat
        } else if !standing(Faction::Npc) {
            EncounterStatus::Victory
        } else {
            EncounterStatus::Active
        };
        if next != EncounterStatus::Active {
            self.status = next;
            self.push(EventKind::CombatEnded { status: next });
            tracing::info!(encounter = %self.id, round = self.round, status = %next, "combat ended");
        }
        self.status
    }

    /// Resolve the current combatant's turn, then advance the order. On any
    /// error other than a rule violation the encounter is left as it was.
    pub fn process_turn(&mut self, ctx: &mut CombatContext<'_>, source: &mut dyn ActionSource) -> Result<()> {
        self.ensure_active()?;
        let checkpoint = self.clone();
        if let Err(err) = self.run_turn(ctx, source) {
            *self = checkpoint;
            return Err(err);
        }
        self.advance();
        Ok(())
    }

    /// Turns from the current index to the end of the initiative order.
    pub fn process_round(&mut self, ctx: &mut CombatContext<'_>, source: &mut dyn ActionSource) -> Result<()> {
        self.ensure_active()?;
        let round = self.round;
        while self.status == EncounterStatus::Active && self.round == round {
            self.process_turn(ctx, source)?;
        }
        Ok(())
    }

    /// Play rounds until the encounter ends or `max_rounds` have passed.
    pub fn run(
        &mut self,
        ctx: &mut CombatContext<'_>,
        source: &mut dyn ActionSource,
        max_rounds: u32,
    ) -> Result<EncounterStatus> {
        while self.status == EncounterStatus::Active && self.round <= max_rounds {
            self.process_round(ctx, source)?;
        }
        Ok(self.status)
    }

    fn run_turn(&mut self, ctx: &mut CombatContext<'_>, source: &mut dyn ActionSource) -> Result<()> {
        let idx = self.turn_index;
        let id = self.combatants[idx].id.clone();

        self.tick(idx, TurnBoundary::StartOfTurn);
        self.expire_readied(&id);

        let combatant = &self.combatants[idx];
        if !combatant.can_act() {
            let reason = if combatant.is_defeated() { "defeated" } else { "cannot act" };
            tracing::debug!(combatant = %id, reason, "turn skipped");
            self.push(EventKind::TurnSkipped {
                combatant: id,
                reason: reason.to_string(),
            });
            self.check_end();
            return Ok(());
        }

        let single_action = combatant.effects().flags.single_action;
        let aoo = attacks_of_opportunity_per_round(combatant);
        self.combatants[idx].economy = ActionEconomy::fresh(single_action, aoo);
        self.push(EventKind::TurnStarted { combatant: id.clone() });

        let actions = source.choose_actions(self, &id).map_err(EngineError::External)?;
        for action in actions {
            if self.status != EncounterStatus::Active || !self.combatants[idx].can_act() {
                break;
            }
            match execute(ctx, self, &id, &action) {
                Ok(_) => {}
                Err(EngineError::Rule(violation)) => {
                    tracing::warn!(combatant = %id, action = %action.kind(), %violation, "action rejected");
                    self.push(EventKind::ActionRejected {
                        combatant: id.clone(),
                        action: action.kind(),
                        reason: violation.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        self.tick(idx, TurnBoundary::EndOfTurn);
        self.check_end();
        Ok(())
    }

    fn tick(&mut self, idx: usize, boundary: TurnBoundary) {
        let expired = process_turn_boundary(boundary, &mut self.combatants[idx].conditions);
        let id = self.combatants[idx].id.clone();
        for condition in expired {
            self.push(EventKind::ConditionExpired {
                combatant: id.clone(),
                condition: condition.name,
            });
        }
    }

    fn expire_readied(&mut self, owner: &CombatantId) {
        let before = self.readied.len();
        self.readied.retain(|r| &r.owner != owner);
        if self.readied.len() != before {
            self.push(EventKind::ReadiedActionExpired {
                combatant: owner.clone(),
            });
        }
    }

    fn advance(&mut self) {
        self.turn_index += 1;
        if self.turn_index >= self.combatants.len() {
            self.turn_index = 0;
            if self.status == EncounterStatus::Active {
                self.round += 1;
                self.push(EventKind::RoundStarted);
                tracing::debug!(encounter = %self.id, round = self.round, "round started");
            }
        }
    }
}
