//! Validates and resolves single actions against an encounter.
//!
//! [`execute`] is atomic: the encounter is snapshotted first and restored if
//! anything fails, so a rejected action leaves no trace besides the
//! `action_rejected` event the scheduler writes.

use crate::checks::concentration_check;
use crate::combat::actions::{
    Action, ActionKind, ActionResult, AppliedCondition, ManeuverKind, ManeuverOutcome, Outcome, ReadyTrigger,
    SpellReport, WeaponChange,
};
use crate::combat::attack::{describe_attack, resolve_attack, AttackOutcome};
use crate::combat::encounter::{CombatEncounter, ReadiedAction};
use crate::combat::log::EventKind;
use crate::combat::maneuvers::{apply_success, roll_contest, ManeuverEffect};
use crate::combat::CombatContext;
use crate::combatant::{CombatantId, Position};
use crate::conditions::ConditionDuration;
use crate::error::{EngineError, Result, RuleViolation, ValidationError};
use crate::life::{self, DamageTaken, LifeState};
use crate::modifiers::{effective_ability_mod, effective_speed, iterative_attack_count, AttackOptions, AttackStyle};
use crate::rules::RulesProvider;
use crate::spells::{SpellEffect, SpellRequest};

/// Resolve `action` for `actor`. Readied actions waiting on `actor` fire first.
pub fn execute(
    ctx: &mut CombatContext<'_>,
    encounter: &mut CombatEncounter,
    actor: &CombatantId,
    action: &Action,
) -> Result<Vec<ActionResult>> {
    encounter.ensure_active()?;
    let checkpoint = encounter.clone();
    match run_action(ctx, encounter, actor, action) {
        Ok(results) => {
            encounter.check_end();
            Ok(results)
        }
        Err(err) => {
            *encounter = checkpoint;
            Err(err)
        }
    }
}

fn run_action(
    ctx: &mut CombatContext<'_>,
    enc: &mut CombatEncounter,
    actor: &CombatantId,
    action: &Action,
) -> Result<Vec<ActionResult>> {
    let a = enc.index_of(actor)?;
    if !enc.at(a).can_act() {
        return Err(RuleViolation::CannotAct(enc.at(a).name.clone()).into());
    }
    fire_readied(ctx, enc, actor, Moment::Acting)?;
    if !enc.at(a).can_act() || enc.status().is_over() {
        return Ok(Vec::new());
    }
    dispatch(ctx, enc, a, action, true)
}

fn dispatch(
    ctx: &mut CombatContext<'_>,
    enc: &mut CombatEncounter,
    a: usize,
    action: &Action,
    pay: bool,
) -> Result<Vec<ActionResult>> {
    let actor_id = enc.at(a).id.clone();
    if !enc.at(a).can_act() {
        return Err(RuleViolation::CannotAct(enc.at(a).name.clone()).into());
    }
    for target in action.targets() {
        enc.target_index(&actor_id, target)?;
    }

    let cost = match action {
        Action::CastSpell { spell, .. } => lookup_spell(ctx, spell)?.casting_time,
        _ => action.base_cost(),
    };
    if pay {
        enc.at_mut(a).economy.spend(cost)?;
    }
    tracing::debug!(actor = %actor_id, action = %action.kind(), %cost, "executing");

    match action {
        Action::MeleeAttack { target, power_attack } => melee_attack(ctx, enc, a, target, *power_attack),
        Action::RangedAttack { target } => ranged_attack(ctx, enc, a, target),
        Action::FullAttack {
            target,
            attacks,
            power_attack,
        } => full_attack(ctx, enc, a, target, *attacks, *power_attack),
        Action::CastSpell {
            spell,
            targets,
            defensively,
        } => cast_spell(ctx, enc, a, spell, targets, *defensively),
        Action::Charge { target, power_attack } => charge(ctx, enc, a, target, *power_attack),
        Action::CombatManeuver {
            maneuver,
            target,
            suppress_attack_of_opportunity,
        } => combat_maneuver(ctx, enc, a, *maneuver, target, *suppress_attack_of_opportunity),
        Action::Move { to } => move_to(ctx, enc, a, *to),
        Action::FullDefense => full_defense(ctx, enc, a),
        Action::ReadyAction { trigger, action } => ready_action(enc, a, trigger, action),
    }
}

fn lookup_spell(ctx: &CombatContext<'_>, name: &str) -> Result<crate::rules::Spell, ValidationError> {
    ctx.rules
        .data
        .spell(name)
        .cloned()
        .ok_or_else(|| ValidationError::UnknownRecord {
            kind: "spell",
            name: name.to_string(),
        })
}

fn record(enc: &mut CombatEncounter, result: &ActionResult) {
    tracing::info!(actor = %result.actor, action = %result.kind, "{}", result.message);
    enc.push(EventKind::ActionResolved { result: result.clone() });
    for applied in &result.conditions_applied {
        let state = match applied.condition.as_str() {
            "dead" => LifeState::Dead,
            "unconscious" => LifeState::Unconscious,
            _ => continue,
        };
        enc.push(EventKind::CombatantDown {
            combatant: applied.combatant.clone(),
            state,
        });
    }
}

/// An attackable opponent: present, not the actor, still standing.
fn opponent(enc: &CombatEncounter, a: usize, target: &CombatantId) -> Result<usize> {
    let t = enc.target_index(&enc.at(a).id, target)?;
    if t == a {
        return Err(ValidationError::MalformedAction(format!("{} cannot target itself", enc.at(a).id)).into());
    }
    if enc.at(t).is_defeated() {
        return Err(RuleViolation::TargetDown(enc.at(t).name.clone()).into());
    }
    Ok(t)
}

fn check_power_attack(enc: &CombatEncounter, a: usize, amount: i32) -> Result<()> {
    let attacker = enc.at(a);
    if amount < 0 {
        return Err(ValidationError::MalformedAction("power attack cannot be negative".to_string()).into());
    }
    if amount == 0 {
        return Ok(());
    }
    if !attacker.has_feat("Power Attack") {
        return Err(RuleViolation::MissingFeat("Power Attack").into());
    }
    if amount > attacker.base_attack_bonus {
        return Err(RuleViolation::PowerAttackTooHigh {
            requested: amount,
            bab: attacker.base_attack_bonus,
        }
        .into());
    }
    Ok(())
}

fn within_reach(enc: &CombatEncounter, a: usize, t: usize) -> Result<(), RuleViolation> {
    let distance = enc.at(a).position.distance_ft(enc.at(t).position);
    let reach = enc.at(a).reach_ft();
    if distance > reach {
        return Err(RuleViolation::OutOfReach { distance, reach });
    }
    Ok(())
}

/// Full range increments past the first; ten increments is the maximum range.
fn range_increments(enc: &CombatEncounter, a: usize, t: usize) -> Result<u32, RuleViolation> {
    let increment = enc.at(a).wielded().range_increment_ft;
    if increment == 0 {
        return Ok(0);
    }
    let distance = enc.at(a).position.distance_ft(enc.at(t).position);
    let max = increment * 10;
    if distance > max {
        return Err(RuleViolation::OutOfRange { distance, max });
    }
    Ok(distance.saturating_sub(1) / increment)
}

fn note_transition(target: &CombatantId, taken: &DamageTaken, conditions: &mut Vec<AppliedCondition>) {
    match taken.transition {
        Some(LifeState::Dead) => conditions.push(AppliedCondition::new(target, "dead")),
        Some(LifeState::Unconscious) => conditions.push(AppliedCondition::new(target, "unconscious")),
        _ => {}
    }
}

/// Roll one attack and apply its damage.
fn strike(
    ctx: &mut CombatContext<'_>,
    enc: &mut CombatEncounter,
    a: usize,
    t: usize,
    style: AttackStyle,
    options: AttackOptions,
    conditions: &mut Vec<AppliedCondition>,
) -> Result<AttackOutcome> {
    let mut outcome = resolve_attack(ctx.dice, enc.at(a), enc.at(t), style, &options);
    if let Some(damage) = &outcome.damage {
        let taken = life::apply_damage(&ctx.rules.conditions, enc.at_mut(t), damage.total)?;
        note_transition(&enc.at(t).id, &taken, conditions);
        outcome.applied = Some(taken);
    }
    Ok(outcome)
}

fn can_take_attack_of_opportunity(enc: &CombatEncounter, e: usize, provoker: usize) -> bool {
    let threat = enc.at(e);
    threat.threatens(enc.at(provoker))
        && threat.economy.attacks_of_opportunity > 0
        && (!threat.has_condition("flat_footed") || threat.has_feat("Combat Reflexes"))
}

fn attack_of_opportunity(
    ctx: &mut CombatContext<'_>,
    enc: &mut CombatEncounter,
    e: usize,
    provoker: usize,
    conditions: &mut Vec<AppliedCondition>,
) -> Result<AttackOutcome> {
    let economy = &mut enc.at_mut(e).economy;
    economy.attacks_of_opportunity = economy.attacks_of_opportunity.saturating_sub(1);
    tracing::debug!(attacker = %enc.at(e).id, provoker = %enc.at(provoker).id, "attack of opportunity");
    strike(ctx, enc, e, provoker, AttackStyle::Melee, AttackOptions::default(), conditions)
}

fn attack_result(
    enc: &mut CombatEncounter,
    a: usize,
    t: usize,
    kind: ActionKind,
    outcome: AttackOutcome,
    conditions: Vec<AppliedCondition>,
) -> ActionResult {
    let result = ActionResult {
        actor: enc.at(a).id.clone(),
        kind,
        target: Some(enc.at(t).id.clone()),
        message: describe_attack(&enc.at(a).name, &enc.at(t).name, &outcome),
        outcome: Outcome::Attack(outcome),
        conditions_applied: conditions,
    };
    record(enc, &result);
    result
}

fn melee_attack(
    ctx: &mut CombatContext<'_>,
    enc: &mut CombatEncounter,
    a: usize,
    target: &CombatantId,
    power_attack: i32,
) -> Result<Vec<ActionResult>> {
    let t = opponent(enc, a, target)?;
    check_power_attack(enc, a, power_attack)?;
    if enc.at(a).wielded().is_ranged() {
        return Err(RuleViolation::WrongWeapon("melee").into());
    }
    within_reach(enc, a, t)?;

    let mut conditions = Vec::new();
    let options = AttackOptions {
        power_attack,
        ..AttackOptions::default()
    };
    let outcome = strike(ctx, enc, a, t, AttackStyle::Melee, options, &mut conditions)?;
    Ok(vec![attack_result(enc, a, t, ActionKind::MeleeAttack, outcome, conditions)])
}

fn ranged_attack(
    ctx: &mut CombatContext<'_>,
    enc: &mut CombatEncounter,
    a: usize,
    target: &CombatantId,
) -> Result<Vec<ActionResult>> {
    let t = opponent(enc, a, target)?;
    if !enc.at(a).wielded().is_ranged() {
        return Err(RuleViolation::WrongWeapon("ranged").into());
    }
    let options = AttackOptions {
        range_increments: range_increments(enc, a, t)?,
        ..AttackOptions::default()
    };

    let mut conditions = Vec::new();
    let outcome = strike(ctx, enc, a, t, AttackStyle::Ranged, options, &mut conditions)?;
    Ok(vec![attack_result(enc, a, t, ActionKind::RangedAttack, outcome, conditions)])
}

fn full_attack(
    ctx: &mut CombatContext<'_>,
    enc: &mut CombatEncounter,
    a: usize,
    target: &CombatantId,
    attacks: Option<u8>,
    power_attack: i32,
) -> Result<Vec<ActionResult>> {
    let t = opponent(enc, a, target)?;
    check_power_attack(enc, a, power_attack)?;

    let allowed = iterative_attack_count(enc.at(a).base_attack_bonus);
    let count = attacks.unwrap_or(allowed);
    if count == 0 {
        return Err(ValidationError::MalformedAction("a full attack needs at least one attack".to_string()).into());
    }
    if count > allowed {
        return Err(RuleViolation::TooManyAttacks { attacks: count, allowed }.into());
    }

    let style = AttackStyle::of(&enc.at(a).wielded());
    let mut options = AttackOptions {
        power_attack,
        ..AttackOptions::default()
    };
    match style {
        AttackStyle::Melee => within_reach(enc, a, t)?,
        AttackStyle::Ranged if power_attack > 0 => return Err(RuleViolation::WrongWeapon("melee").into()),
        AttackStyle::Ranged => options.range_increments = range_increments(enc, a, t)?,
    }

    let mut results = Vec::new();
    for index in 0..count {
        if enc.at(t).is_defeated() || !enc.at(a).can_act() {
            break;
        }
        options.attack_index = index;
        let mut conditions = Vec::new();
        let outcome = strike(ctx, enc, a, t, style, options, &mut conditions)?;
        results.push(attack_result(enc, a, t, ActionKind::FullAttack, outcome, conditions));
    }
    Ok(results)
}

fn charge(
    ctx: &mut CombatContext<'_>,
    enc: &mut CombatEncounter,
    a: usize,
    target: &CombatantId,
    power_attack: i32,
) -> Result<Vec<ActionResult>> {
    let t = opponent(enc, a, target)?;
    check_power_attack(enc, a, power_attack)?;
    if enc.at(a).wielded().is_ranged() {
        return Err(RuleViolation::WrongWeapon("melee").into());
    }
    let to = enc.charge_destination(a, t)?;

    let actor_id = enc.at(a).id.clone();
    let from = enc.at(a).position;
    enc.at_mut(a).position = to;
    ctx.rules.conditions.apply(
        enc.at_mut(a),
        "charging",
        ConditionDuration::until_next_turn(),
        Some(actor_id.clone()),
    )?;
    let mut conditions = vec![AppliedCondition::new(&actor_id, "charging")];

    fire_readied(ctx, enc, &actor_id, Moment::Moved)?;

    let (attack, message) = if enc.at(a).can_act() && !enc.at(t).is_defeated() && !enc.status().is_over() {
        let options = AttackOptions {
            charging: true,
            power_attack,
            ..AttackOptions::default()
        };
        let outcome = strike(ctx, enc, a, t, AttackStyle::Melee, options, &mut conditions)?;
        let message = format!(
            "{} charges from {from} to {to}; {}",
            enc.at(a).name,
            describe_attack(&enc.at(a).name, &enc.at(t).name, &outcome)
        );
        (Some(outcome), message)
    } else {
        (None, format!("{} charges from {from} to {to} but is stopped short", enc.at(a).name))
    };

    let result = ActionResult {
        actor: actor_id,
        kind: ActionKind::Charge,
        target: Some(target.clone()),
        outcome: Outcome::Charge { from, to, attack },
        conditions_applied: conditions,
        message,
    };
    record(enc, &result);
    Ok(vec![result])
}

fn describe_maneuver(actor: &str, target: &str, outcome: &ManeuverOutcome) -> String {
    let kind = outcome.maneuver.as_str().replace('_', " ");
    let Some(contest) = &outcome.contest else {
        return format!("{actor}'s {kind} against {target} is spoiled by an attack of opportunity");
    };
    let verdict = if outcome.success { "succeeds" } else { "fails" };
    let mut line = format!(
        "{actor}'s {kind} against {target} {verdict} ({} vs {})",
        contest.attacker_total, contest.defender_total
    );
    if outcome.pushed_ft > 0 {
        line.push_str(&format!("; pushed back {} ft", outcome.pushed_ft));
    }
    match &outcome.weapon {
        Some(WeaponChange::Disarmed(name)) => line.push_str(&format!("; {name} knocked away")),
        Some(WeaponChange::Broken(name)) => line.push_str(&format!("; {name} broken")),
        Some(WeaponChange::Destroyed(name)) => line.push_str(&format!("; {name} destroyed")),
        None => {}
    }
    line
}

fn combat_maneuver(
    ctx: &mut CombatContext<'_>,
    enc: &mut CombatEncounter,
    a: usize,
    maneuver: ManeuverKind,
    target: &CombatantId,
    suppress_attack_of_opportunity: bool,
) -> Result<Vec<ActionResult>> {
    let t = opponent(enc, a, target)?;
    within_reach(enc, a, t)?;
    if matches!(maneuver, ManeuverKind::Disarm | ManeuverKind::Sunder) && enc.at(t).weapon.is_none() {
        return Err(RuleViolation::Unarmed(enc.at(t).name.clone()).into());
    }

    let mut conditions = Vec::new();
    let mut provoked = None;
    if maneuver.provokes() && !suppress_attack_of_opportunity && can_take_attack_of_opportunity(enc, t, a) {
        provoked = Some(attack_of_opportunity(ctx, enc, t, a, &mut conditions)?);
    }
    let wounded = provoked
        .as_ref()
        .and_then(|o| o.damage.as_ref())
        .is_some_and(|d| d.total > 0);
    let spoiled = !enc.at(a).can_act() || (maneuver == ManeuverKind::Grapple && wounded);

    let mut outcome = ManeuverOutcome {
        maneuver,
        attack_of_opportunity: provoked,
        contest: None,
        success: false,
        pushed_ft: 0,
        weapon: None,
    };
    if !spoiled {
        let contest = roll_contest(ctx.dice, maneuver, enc.at(a), enc.at(t));
        let effect = if contest.attacker_won() {
            let occupied = enc.occupied(&[a, t]);
            let (attacker, defender) = enc.pair_mut(a, t);
            apply_success(maneuver, &ctx.rules.conditions, attacker, defender, &contest, |p| {
                !occupied.contains(&p)
            })?
        } else {
            ManeuverEffect::default()
        };
        outcome.contest = Some(contest);
        outcome.success = contest.attacker_won();
        outcome.pushed_ft = effect.pushed_ft;
        outcome.weapon = effect.weapon;
        conditions.extend(effect.conditions);
    }

    let result = ActionResult {
        actor: enc.at(a).id.clone(),
        kind: ActionKind::CombatManeuver,
        target: Some(target.clone()),
        message: describe_maneuver(&enc.at(a).name, &enc.at(t).name, &outcome),
        outcome: Outcome::Maneuver(outcome),
        conditions_applied: conditions,
    };
    record(enc, &result);
    Ok(vec![result])
}

fn move_to(ctx: &mut CombatContext<'_>, enc: &mut CombatEncounter, a: usize, to: Position) -> Result<Vec<ActionResult>> {
    let mover = enc.at(a);
    if mover.effects().flags.immobile {
        return Err(RuleViolation::Immobile.into());
    }
    let from = mover.position;
    let speed = effective_speed(mover);
    let distance = from.distance_ft(to);
    if distance > speed {
        return Err(RuleViolation::TooFar {
            requested: distance,
            speed,
        }
        .into());
    }
    if to != from && enc.occupied(&[a]).contains(&to) {
        return Err(RuleViolation::Blocked.into());
    }

    enc.at_mut(a).position = to;
    let actor_id = enc.at(a).id.clone();
    let result = ActionResult {
        actor: actor_id.clone(),
        kind: ActionKind::Move,
        target: None,
        message: format!("{} moves from {from} to {to} ({distance} ft)", enc.at(a).name),
        outcome: Outcome::Moved {
            from,
            to,
            distance_ft: distance,
        },
        conditions_applied: Vec::new(),
    };
    record(enc, &result);
    fire_readied(ctx, enc, &actor_id, Moment::Moved)?;
    Ok(vec![result])
}

fn full_defense(ctx: &mut CombatContext<'_>, enc: &mut CombatEncounter, a: usize) -> Result<Vec<ActionResult>> {
    let actor_id = enc.at(a).id.clone();
    ctx.rules.conditions.apply(
        enc.at_mut(a),
        "full_defense",
        ConditionDuration::until_next_turn(),
        Some(actor_id.clone()),
    )?;
    let result = ActionResult {
        actor: actor_id.clone(),
        kind: ActionKind::FullDefense,
        target: None,
        message: format!("{} takes the full defense action", enc.at(a).name),
        outcome: Outcome::Defending,
        conditions_applied: vec![AppliedCondition::new(&actor_id, "full_defense")],
    };
    record(enc, &result);
    Ok(vec![result])
}

fn ready_action(
    enc: &mut CombatEncounter,
    a: usize,
    trigger: &ReadyTrigger,
    action: &Action,
) -> Result<Vec<ActionResult>> {
    if matches!(
        action,
        Action::ReadyAction { .. } | Action::FullAttack { .. } | Action::Charge { .. }
    ) {
        return Err(RuleViolation::CannotReady(action.kind().to_string()).into());
    }
    let actor_id = enc.at(a).id.clone();
    enc.readied.push(ReadiedAction {
        owner: actor_id.clone(),
        trigger: trigger.clone(),
        action: action.clone(),
    });

    let result = ActionResult {
        actor: actor_id,
        kind: ActionKind::ReadyAction,
        target: Some(trigger.combatant().clone()),
        message: format!("{} readies a {} {trigger}", enc.at(a).name, action.kind()),
        outcome: Outcome::Readied {
            trigger: trigger.clone(),
            action: action.kind(),
        },
        conditions_applied: Vec::new(),
    };
    record(enc, &result);
    Ok(vec![result])
}

fn describe_spell(enc: &CombatEncounter, caster: &str, report: &SpellReport) -> String {
    if report.lost {
        let why = match &report.concentration {
            Some(check) => format!("concentration {} vs DC {}", check.total, check.dc),
            None => "caster dropped".to_string(),
        };
        return format!("{caster} loses {} ({why})", report.spell);
    }
    let name = |id: &CombatantId| enc.combatant(id).map_or_else(|| id.to_string(), |c| c.name.clone());
    let mut parts = Vec::new();
    for effect in &report.effects {
        match effect {
            SpellEffect::Damage {
                target,
                amount,
                damage_type,
            } => parts.push(format!("{} takes {amount} {}", name(target), damage_type.as_str())),
            SpellEffect::Heal { target, amount } => parts.push(format!("{} heals {amount}", name(target))),
            SpellEffect::Condition { target, condition, .. } => {
                parts.push(format!("{} is {condition}", name(target)))
            }
            SpellEffect::SavingThrow { target, passed, .. } => {
                let verdict = if *passed { "saves" } else { "fails to save" };
                parts.push(format!("{} {verdict}", name(target)))
            }
        }
    }
    if parts.is_empty() {
        format!("{caster} casts {}", report.spell)
    } else {
        format!("{caster} casts {}: {}", report.spell, parts.join(", "))
    }
}

fn cast_spell(
    ctx: &mut CombatContext<'_>,
    enc: &mut CombatEncounter,
    a: usize,
    spell_name: &str,
    targets: &[CombatantId],
    defensively: bool,
) -> Result<Vec<ActionResult>> {
    let spell = lookup_spell(ctx, spell_name)?;
    let actor_id = enc.at(a).id.clone();
    let Some(casting) = enc.at(a).spellcasting.clone() else {
        return Err(RuleViolation::NotACaster(enc.at(a).name.clone()).into());
    };
    if casting.slots.get(&spell.level).copied().unwrap_or(0) == 0 {
        return Err(RuleViolation::NoSpellSlot(spell.level).into());
    }
    let has_effect = spell.damage.is_some() || spell.healing.is_some() || spell.condition.is_some();
    if has_effect && targets.is_empty() {
        return Err(ValidationError::MalformedAction(format!("{} needs at least one target", spell.name)).into());
    }
    let target_idx = targets
        .iter()
        .map(|t| enc.target_index(&actor_id, t))
        .collect::<Result<Vec<_>, _>>()?;

    let level = i32::from(spell.level);
    let mut report = SpellReport {
        spell: spell.name.clone(),
        level: spell.level,
        attacks_of_opportunity: Vec::new(),
        concentration: None,
        lost: false,
        slot_consumed: false,
        success: false,
        effects: Vec::new(),
        damage: Vec::new(),
    };
    let mut conditions = Vec::new();

    let threatened = enc.others(a).any(|e| enc.at(e).threatens(enc.at(a)));
    if threatened && defensively {
        let check = concentration_check(ctx.dice, enc.at(a), 15 + 2 * level, true);
        report.concentration = Some(check);
        report.lost = !check.passed;
    } else if threatened {
        let threats: Vec<usize> = enc
            .others(a)
            .filter(|&e| can_take_attack_of_opportunity(enc, e, a))
            .collect();
        let mut wounds = 0;
        for e in threats {
            if !enc.at(a).can_act() {
                break;
            }
            let outcome = attack_of_opportunity(ctx, enc, e, a, &mut conditions)?;
            wounds += outcome.damage.as_ref().map_or(0, |d| d.total);
            report.attacks_of_opportunity.push(outcome);
        }
        if !enc.at(a).can_act() {
            report.lost = true;
        } else if wounds > 0 {
            let check = concentration_check(ctx.dice, enc.at(a), 10 + wounds + level, false);
            report.concentration = Some(check);
            report.lost = !check.passed;
        }
    }

    if !report.lost || ctx.rules.config.lost_spell_consumes_slot {
        if let Some(slots) = enc
            .at_mut(a)
            .spellcasting
            .as_mut()
            .and_then(|sc| sc.slots.get_mut(&spell.level))
        {
            *slots = slots.saturating_sub(1);
        }
        report.slot_consumed = true;
    }

    if !report.lost {
        let outcome = {
            let caster = enc.at(a);
            let request = SpellRequest {
                caster,
                spell: &spell,
                targets: target_idx.iter().map(|&i| enc.at(i)).collect(),
                caster_level: casting.caster_level,
                save_dc: 10 + level + effective_ability_mod(caster, casting.ability),
            };
            ctx.spells
                .cast_spell(&request, &mut *ctx.dice)
                .map_err(EngineError::External)?
        };

        for effect in &outcome.effects {
            let t = enc.target_index(&actor_id, effect.target())?;
            match effect {
                SpellEffect::Damage { amount, .. } => {
                    let taken = life::apply_damage(&ctx.rules.conditions, enc.at_mut(t), *amount)?;
                    note_transition(&enc.at(t).id, &taken, &mut conditions);
                    report.damage.push((enc.at(t).id.clone(), taken));
                }
                SpellEffect::Heal { amount, .. } => {
                    life::heal(enc.at_mut(t), *amount);
                }
                SpellEffect::Condition {
                    condition, duration, ..
                } => {
                    ctx.rules
                        .conditions
                        .apply(enc.at_mut(t), condition, *duration, Some(actor_id.clone()))?;
                    conditions.push(AppliedCondition::new(&enc.at(t).id, condition));
                }
                SpellEffect::SavingThrow { .. } => {}
            }
        }
        report.success = outcome.success;
        report.effects = outcome.effects;
    }

    let result = ActionResult {
        actor: actor_id,
        kind: ActionKind::CastSpell,
        target: targets.first().cloned(),
        message: describe_spell(enc, &enc.at(a).name, &report),
        outcome: Outcome::Spell(report),
        conditions_applied: conditions,
    };
    record(enc, &result);
    Ok(vec![result])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Moment {
    /// The trigger combatant is about to act.
    Acting,
    /// The trigger combatant just moved.
    Moved,
}

/// Fire, once each, the readied actions `mover` sets off at `moment`.
fn fire_readied(ctx: &mut CombatContext<'_>, enc: &mut CombatEncounter, mover: &CombatantId, moment: Moment) -> Result<()> {
    let m = enc.index_of(mover)?;
    let mut fired = Vec::new();
    let mut idx = 0;
    while idx < enc.readied.len() {
        let readied = &enc.readied[idx];
        let triggered = match (&readied.trigger, moment) {
            (ReadyTrigger::Acts(id), Moment::Acting) => id == mover,
            (ReadyTrigger::EntersReach(id), Moment::Moved) if id == mover => match enc.index_of(&readied.owner) {
                Ok(o) => enc.at(o).position.distance_ft(enc.at(m).position) <= enc.at(o).reach_ft(),
                Err(_) => false,
            },
            _ => false,
        };
        if triggered {
            fired.push(enc.readied.remove(idx));
        } else {
            idx += 1;
        }
    }

    for readied in fired {
        let o = enc.index_of(&readied.owner)?;
        if !enc.at(o).can_act() || enc.status().is_over() {
            continue;
        }
        enc.push(EventKind::ReadiedActionTriggered {
            combatant: readied.owner.clone(),
            trigger: mover.clone(),
        });
        let checkpoint = enc.clone();
        match dispatch(ctx, enc, o, &readied.action, false) {
            Ok(_) => {}
            Err(EngineError::Rule(violation)) => {
                *enc = checkpoint;
                tracing::warn!(combatant = %readied.owner, %violation, "readied action rejected");
                enc.push(EventKind::ActionRejected {
                    combatant: readied.owner.clone(),
                    action: readied.action.kind(),
                    reason: violation.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
        enc.check_end();
    }
    Ok(())
}
