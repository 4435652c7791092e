use std::collections::{HashMap, VecDeque};

use anyhow::anyhow;

use crate::combat::{Action, CombatEncounter};
use crate::combatant::{Combatant, CombatantId, Position};
use crate::modifiers::{effective_speed, iterative_attack_count};

/// Decides what a combatant does on its turn.
pub trait ActionSource {
    fn choose_actions(&mut self, encounter: &CombatEncounter, actor: &CombatantId) -> anyhow::Result<Vec<Action>>;
}

/// Goes for the nearest standing enemy: attacks when it can, charges when
/// the lane is clear, otherwise closes the distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct TacticalAi;

impl TacticalAi {
    fn nearest_enemy<'a>(encounter: &'a CombatEncounter, me: &Combatant) -> Option<&'a Combatant> {
        encounter
            .enemies_of(me.faction)
            .min_by_key(|enemy| me.position.distance_ft(enemy.position))
    }

    fn attack(me: &Combatant, target: &CombatantId, single_action: bool) -> Action {
        if !single_action && iterative_attack_count(me.base_attack_bonus) > 1 {
            Action::FullAttack {
                target: target.clone(),
                attacks: None,
                power_attack: 0,
            }
        } else if me.wielded().is_ranged() {
            Action::RangedAttack { target: target.clone() }
        } else {
            Action::melee(target.clone())
        }
    }

    /// Greedy straight-ish walk toward `goal`, stopping next to it.
    fn approach(encounter: &CombatEncounter, me: &Combatant, goal: Position) -> Position {
        let Ok(my_idx) = encounter.index_of(&me.id) else {
            return me.position;
        };
        let occupied = encounter.occupied(&[my_idx]);
        let speed = effective_speed(me);
        let start = me.position;
        let mut here = start;
        loop {
            if here.distance_ft(goal) <= 5 {
                break;
            }
            let next = here.offset((goal.x - here.x).signum(), (goal.y - here.y).signum());
            if next == goal || occupied.contains(&next) || start.distance_ft(next) > speed {
                break;
            }
            here = next;
        }
        here
    }
}

impl ActionSource for TacticalAi {
    fn choose_actions(&mut self, encounter: &CombatEncounter, actor: &CombatantId) -> anyhow::Result<Vec<Action>> {
        let me = encounter
            .combatant(actor)
            .ok_or_else(|| anyhow!("no combatant {actor} in this encounter"))?;
        let Some(target) = Self::nearest_enemy(encounter, me) else {
            return Ok(Vec::new());
        };
        let single_action = me.effects().flags.single_action;
        let distance = me.position.distance_ft(target.position);

        if me.wielded().is_ranged() || distance <= me.reach_ft() {
            return Ok(vec![Self::attack(me, &target.id, single_action)]);
        }
        if !single_action && encounter.charge_path(actor, &target.id).is_ok() {
            return Ok(vec![Action::Charge {
                target: target.id.clone(),
                power_attack: 0,
            }]);
        }

        let to = Self::approach(encounter, me, target.position);
        if to == me.position {
            return Ok(vec![Action::FullDefense]);
        }
        let mut actions = vec![Action::Move { to }];
        if !single_action && to.distance_ft(target.position) <= me.reach_ft() {
            actions.push(Action::melee(target.id.clone()));
        }
        Ok(actions)
    }
}

/// Replays queued turns per combatant; a combatant with nothing queued does nothing.
#[derive(Debug, Clone, Default)]
pub struct ScriptedActions {
    turns: HashMap<CombatantId, VecDeque<Vec<Action>>>,
}

impl ScriptedActions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one turn's worth of actions for `actor`.
    pub fn turn(mut self, actor: impl Into<CombatantId>, actions: Vec<Action>) -> Self {
        self.push(actor, actions);
        self
    }

    pub fn push(&mut self, actor: impl Into<CombatantId>, actions: Vec<Action>) {
        self.turns.entry(actor.into()).or_default().push_back(actions);
    }

    pub fn remaining(&self, actor: &CombatantId) -> usize {
        self.turns.get(actor).map_or(0, VecDeque::len)
    }
}

impl ActionSource for ScriptedActions {
    fn choose_actions(&mut self, _encounter: &CombatEncounter, actor: &CombatantId) -> anyhow::Result<Vec<Action>> {
        Ok(self
            .turns
            .get_mut(actor)
            .and_then(VecDeque::pop_front)
            .unwrap_or_default())
    }
}
