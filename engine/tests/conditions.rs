mod common;

use common::{goblin, rules};
use srd_engine::conditions::{
    aggregate, process_turn_boundary, ConditionDef, ConditionDuration, ConditionRegistry, TurnBoundary,
};
use srd_engine::life::{apply_damage, heal, LifeState};
use srd_engine::modifiers::{armor_class, AttackStyle};
use srd_engine::ValidationError;

#[test]
fn unknown_condition_is_an_error() {
    let registry = ConditionRegistry::srd();
    let mut c = goblin(10);
    let err = registry
        .apply(&mut c, "petrified", ConditionDuration::Indefinite, None)
        .unwrap_err();
    assert_eq!(err, ValidationError::UnknownCondition("petrified".into()));
    assert!(c.conditions.is_empty());
}

#[test]
fn names_are_matched_loosely() {
    let registry = ConditionRegistry::srd();
    let mut c = goblin(10);
    registry
        .apply(&mut c, "Flat-Footed", ConditionDuration::Indefinite, None)
        .unwrap();
    assert!(c.has_condition("flat footed"));
    assert!(c.effects().flags.loses_dex_to_ac);
}

#[test]
fn remove_is_idempotent() {
    let registry = ConditionRegistry::srd();
    let mut c = goblin(10);
    registry.apply(&mut c, "shaken", ConditionDuration::Indefinite, None).unwrap();
    assert!(c.remove_condition("shaken"));
    assert!(!c.remove_condition("shaken"));
    assert!(!c.has_condition("shaken"));
}

#[test]
fn deltas_stack_and_flags_union() {
    let registry = ConditionRegistry::srd();
    let mut c = goblin(10);
    for name in ["shaken", "sickened", "entangled"] {
        registry.apply(&mut c, name, ConditionDuration::Indefinite, None).unwrap();
    }
    let fx = aggregate(&c.conditions);
    assert_eq!(fx.attack, -6);
    assert_eq!(fx.damage, -2);
    assert_eq!(fx.saves, -4);
    assert_eq!(fx.dexterity, -4);
    assert!(fx.flags.half_speed);
    assert!(!fx.flags.no_actions);
}

#[test]
fn exclusive_conditions_override_the_rest() {
    let registry = ConditionRegistry::srd();
    let mut c = goblin(10);
    for name in ["prone", "unconscious"] {
        registry.apply(&mut c, name, ConditionDuration::Indefinite, None).unwrap();
    }
    let fx = c.effects();
    assert!(fx.flags.no_actions);
    assert_eq!(fx.ac_vs_melee, 0);

    registry.apply(&mut c, "dead", ConditionDuration::Indefinite, None).unwrap();
    assert_eq!(c.effects(), registry.get("dead").unwrap().effects);
}

#[test]
fn durations_tick_at_their_own_boundary() {
    let registry = ConditionRegistry::srd();
    let mut c = goblin(10);
    registry.apply(&mut c, "dazed", ConditionDuration::rounds(2), None).unwrap();
    registry
        .apply(
            &mut c,
            "sickened",
            ConditionDuration::Turns {
                count: 1,
                at: TurnBoundary::EndOfTurn,
            },
            None,
        )
        .unwrap();
    registry.apply(&mut c, "prone", ConditionDuration::Indefinite, None).unwrap();

    assert!(process_turn_boundary(TurnBoundary::StartOfTurn, &mut c.conditions).is_empty());
    let expired = process_turn_boundary(TurnBoundary::EndOfTurn, &mut c.conditions);
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].name, "sickened");

    let expired = process_turn_boundary(TurnBoundary::StartOfTurn, &mut c.conditions);
    assert_eq!(expired[0].name, "dazed");
    assert_eq!(c.conditions.len(), 1);
    assert!(c.has_condition("prone"));
}

#[test]
fn data_files_can_add_conditions() {
    let mut registry = ConditionRegistry::srd();
    let mut def = ConditionDef::new("Blessed");
    def.effects.attack = 1;
    registry.extend([def]);
    let mut c = goblin(10);
    registry.apply(&mut c, "blessed", ConditionDuration::Indefinite, None).unwrap();
    assert_eq!(c.effects().attack, 1);
}

#[test]
fn damage_past_zero_knocks_out() {
    let rules = rules();
    let mut c = goblin(10);
    let taken = apply_damage(&rules.conditions, &mut c, 11).unwrap();
    assert_eq!(c.hp.current, -1);
    assert_eq!(taken.taken, 10);
    assert_eq!(taken.transition, Some(LifeState::Unconscious));
    assert!(c.has_condition("unconscious"));
    assert!(c.has_condition("prone"));
    assert!(c.is_defeated());
    assert!(!c.can_act());
}

#[test]
fn knocked_out_targets_ignore_prone_armor_shifts() {
    let rules = rules();
    let mut c = goblin(10);
    let melee = armor_class(&c, AttackStyle::Melee).total();
    apply_damage(&rules.conditions, &mut c, 12).unwrap();
    assert!(c.has_condition("prone") && c.has_condition("unconscious"));
    assert_eq!(armor_class(&c, AttackStyle::Melee).total(), melee);
    assert_eq!(armor_class(&c, AttackStyle::Ranged).total(), melee);

    heal(&mut c, 5);
    assert!(!c.has_condition("unconscious"));
    assert_eq!(armor_class(&c, AttackStyle::Melee).total(), melee - 4);
    assert_eq!(armor_class(&c, AttackStyle::Ranged).total(), melee + 4);
}

#[test]
fn damage_to_minus_ten_kills() {
    let rules = rules();
    let mut c = goblin(10);
    let taken = apply_damage(&rules.conditions, &mut c, 21).unwrap();
    assert_eq!(c.hp.current, -11);
    assert_eq!(taken.state, LifeState::Dead);
    assert!(c.has_condition("dead"));
    assert!(!c.has_condition("unconscious"));

    let mut c = goblin(10);
    apply_damage(&rules.conditions, &mut c, 20).unwrap();
    assert_eq!(LifeState::of(&c), LifeState::Dead);
}

#[test]
fn the_dead_take_no_further_damage() {
    let rules = rules();
    let mut c = goblin(10);
    apply_damage(&rules.conditions, &mut c, 25).unwrap();
    let again = apply_damage(&rules.conditions, &mut c, 5).unwrap();
    assert_eq!(again.taken, 0);
    assert_eq!(again.transition, None);
    assert_eq!(c.hp.current, -15);
}

#[test]
fn unconscious_to_dead_replaces_the_condition() {
    let rules = rules();
    let mut c = goblin(10);
    apply_damage(&rules.conditions, &mut c, 12).unwrap();
    let taken = apply_damage(&rules.conditions, &mut c, 9).unwrap();
    assert_eq!(taken.transition, Some(LifeState::Dead));
    assert!(!c.has_condition("unconscious"));
}

#[test]
fn healing_wakes_the_unconscious_up_to_max() {
    let rules = rules();
    let mut c = goblin(10);
    apply_damage(&rules.conditions, &mut c, 12).unwrap();
    assert_eq!(heal(&mut c, 5), 5);
    assert_eq!(c.hp.current, 3);
    assert!(!c.has_condition("unconscious"));
    assert_eq!(heal(&mut c, 50), 7);
    assert_eq!(c.hp.current, 10);
}
