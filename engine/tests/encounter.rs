mod common;

use common::{fighter, goblin, hp, id, javelin, rules, scores, start, start_in};
use proptest::prelude::*;
use srd_engine::ai::{ActionSource, ScriptedActions, TacticalAi};
use srd_engine::combat::execute;
use srd_engine::conditions::ConditionDuration;
use srd_engine::life::apply_damage;
use srd_engine::spells::RulesSpellcaster;
use srd_engine::{
    Action, ActionKind, CombatContext, CombatEncounter, CombatantId, Dice, EncounterStatus, EngineError,
    Environment, EventKind, Position, Ruleset, ValidationError,
};

fn order(enc: &CombatEncounter) -> Vec<&str> {
    enc.combatants().iter().map(|c| c.id.as_str()).collect()
}

fn second_goblin() -> srd_engine::Combatant {
    let mut g = goblin(6).at(1, 1);
    g.id = id("goblin-2");
    g.name = "Goblin Scout".into();
    g
}

#[test]
fn initiative_orders_by_total_and_keeps_ties_stable() {
    let rules = rules();
    let enc = start(&rules, vec![fighter()], vec![goblin(5), second_goblin()]);
    assert_eq!(order(&enc), ["valeros", "goblin", "goblin-2"]);
    assert_eq!(enc.round(), 1);
    assert_eq!(enc.current().unwrap().id, id("valeros"));

    let mut dice = Dice::from_scripted(vec![5, 15, 9]);
    let enc =
        CombatEncounter::initialize_combat(vec![fighter()], vec![goblin(5), second_goblin()], Environment::default(), &rules, &mut dice)
            .unwrap();
    assert_eq!(order(&enc), ["goblin", "goblin-2", "valeros"]);

    let mut dice = Dice::from_scripted(vec![10]);
    let quick = goblin(5).with_abilities(scores(10, 14));
    let enc = CombatEncounter::initialize_combat(vec![fighter()], vec![quick], Environment::default(), &rules, &mut dice)
        .unwrap();
    assert_eq!(order(&enc), ["goblin", "valeros"]);
    assert!(matches!(
        enc.log()[0].kind,
        EventKind::InitiativeRolled { roll: 10, modifier: 0, total: 10, .. }
    ));
}

proptest! {
    #[test]
    fn initiative_is_sorted_and_ties_keep_input_order(rolls in proptest::collection::vec(1u32..=20, 4)) {
        let rules = rules();
        let enemies: Vec<_> = (0..3)
            .map(|i| {
                let mut g = goblin(5).at(i + 1, 0);
                g.id = id(&format!("goblin-{i}"));
                g
            })
            .collect();
        let input = ["valeros", "goblin-0", "goblin-1", "goblin-2"];
        let mut dice = Dice::from_scripted(rolls);
        let enc = CombatEncounter::initialize_combat(vec![fighter()], enemies, Environment::default(), &rules, &mut dice)
            .unwrap();
        let rank = |c: &srd_engine::Combatant| input.iter().position(|i| *i == c.id.as_str()).unwrap();
        for pair in enc.combatants().windows(2) {
            prop_assert!(
                pair[0].initiative > pair[1].initiative
                    || (pair[0].initiative == pair[1].initiative && rank(&pair[0]) < rank(&pair[1]))
            );
        }
    }
}

#[test]
fn duplicate_ids_are_refused() {
    let rules = rules();
    let mut dice = Dice::from_scripted(vec![10]);
    let err = CombatEncounter::initialize_combat(
        vec![fighter()],
        vec![goblin(5), goblin(5)],
        Environment::default(),
        &rules,
        &mut dice,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation(ValidationError::DuplicateCombatant(ref dup)) if dup == "goblin"
    ));
}

#[test]
fn everyone_starts_flat_footed_until_their_turn() {
    let rules = Ruleset::srd().unwrap();
    let mut enc = start(&rules, vec![fighter()], vec![goblin(5)]);
    assert!(enc.combatants().iter().all(|c| c.has_condition("flat_footed")));

    let mut dice = Dice::from_scripted(vec![10]);
    let mut spells = RulesSpellcaster;
    let mut ctx = CombatContext::new(&rules, &mut dice, &mut spells);
    enc.process_turn(&mut ctx, &mut ScriptedActions::new()).unwrap();

    assert!(!enc.combatant(&id("valeros")).unwrap().has_condition("flat_footed"));
    assert!(enc.combatant(&id("goblin")).unwrap().has_condition("flat_footed"));
    assert!(enc.log().iter().any(|e| e.kind
        == EventKind::ConditionExpired {
            combatant: id("valeros"),
            condition: "flat_footed".into(),
        }));
    assert_eq!(enc.turn_index(), 1);
}

#[test]
fn victory_ends_the_encounter_mid_round() {
    let rules = rules();
    let mut enc = start(&rules, vec![fighter()], vec![goblin(5)]);
    let mut script = ScriptedActions::new().turn("valeros", vec![Action::melee("goblin"), Action::FullDefense]);
    let mut dice = Dice::from_scripted(vec![15, 6]);
    let mut spells = RulesSpellcaster;
    let mut ctx = CombatContext::new(&rules, &mut dice, &mut spells);

    enc.process_round(&mut ctx, &mut script).unwrap();
    assert_eq!(enc.status(), EncounterStatus::Victory);
    assert_eq!(enc.round(), 1);
    let last = enc.log().last().unwrap();
    assert_eq!(last.kind, EventKind::CombatEnded { status: EncounterStatus::Victory });
    // The full defense queued after the killing blow never happens.
    assert!(!enc.combatant(&id("valeros")).unwrap().has_condition("full_defense"));

    let err = enc.process_turn(&mut ctx, &mut script).unwrap_err();
    assert!(matches!(err, EngineError::Validation(ValidationError::CombatNotActive)));
    let err = execute(&mut ctx, &mut enc, &id("valeros"), &Action::FullDefense).unwrap_err();
    assert!(matches!(err, EngineError::Validation(ValidationError::CombatNotActive)));
}

#[test]
fn the_party_falling_is_a_defeat() {
    let rules = rules();
    let ogre = goblin(30).with_bab(10).with_weapon(common::morningstar()).at(1, 0);
    let weakling = fighter().with_hp(3);
    let mut enc = start(&rules, vec![weakling], vec![ogre]);
    let mut script = ScriptedActions::new().turn("goblin", vec![Action::melee("valeros")]);
    // Valeros does nothing, the ogre hits 15+10 for 8.
    let mut dice = Dice::from_scripted(vec![15, 8]);
    let mut spells = RulesSpellcaster;
    let mut ctx = CombatContext::new(&rules, &mut dice, &mut spells);

    let status = enc.run(&mut ctx, &mut script, 5).unwrap();
    assert_eq!(status, EncounterStatus::Defeat);
    assert!(enc.log().iter().any(|e| matches!(
        &e.kind,
        EventKind::CombatantDown { combatant, .. } if combatant == &id("valeros")
    )));
}

#[test]
fn rejected_actions_are_logged_and_the_turn_goes_on() {
    let rules = rules();
    let mut enc = start(&rules, vec![fighter()], vec![goblin(5).at(3, 0)]);
    let mut script = ScriptedActions::new().turn(
        "valeros",
        vec![Action::melee("goblin"), Action::Move { to: Position::new(2, 0) }],
    );
    let mut dice = Dice::from_scripted(vec![10]);
    let mut spells = RulesSpellcaster;
    let mut ctx = CombatContext::new(&rules, &mut dice, &mut spells);

    enc.process_turn(&mut ctx, &mut script).unwrap();
    assert!(enc.log().iter().any(|e| e.kind
        == EventKind::ActionRejected {
            combatant: id("valeros"),
            action: ActionKind::MeleeAttack,
            reason: "target is out of reach (15 ft, reach 5 ft)".into(),
        }));
    let valeros = enc.combatant(&id("valeros")).unwrap();
    assert_eq!(valeros.position, Position::new(2, 0));
    assert_eq!(script.remaining(&id("valeros")), 0);
    let rejected = enc
        .log()
        .iter()
        .find(|e| matches!(e.kind, EventKind::ActionRejected { .. }))
        .unwrap();
    insta::assert_snapshot!(
        rejected.describe(),
        @"[REJECTED][valeros] melee_attack: target is out of reach (15 ft, reach 5 ft)"
    );
}

#[test]
fn a_failed_execute_leaves_the_encounter_untouched() {
    let rules = rules();
    let mut enc = start(&rules, vec![fighter()], vec![goblin(5)]);
    let before = enc.log().len();
    let mut dice = Dice::from_scripted(vec![20]);
    let mut spells = RulesSpellcaster;
    let mut ctx = CombatContext::new(&rules, &mut dice, &mut spells);

    let err = execute(&mut ctx, &mut enc, &id("valeros"), &Action::melee("ghost")).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation(ValidationError::UnknownTarget { ref target, .. }) if target == "ghost"
    ));
    assert_eq!(enc.log().len(), before);
    assert!(enc.combatant(&id("valeros")).unwrap().economy.standard);

    let err = execute(&mut ctx, &mut enc, &id("nobody"), &Action::FullDefense).unwrap_err();
    assert!(matches!(err, EngineError::Validation(ValidationError::UnknownCombatant(_))));
}

#[test]
fn defeated_and_helpless_combatants_lose_their_turn() {
    let rules = rules();
    let mut enc = start(&rules, vec![fighter()], vec![goblin(5), second_goblin()]);
    apply_damage(&rules.conditions, enc.combatant_mut(&id("goblin")).unwrap(), 8).unwrap();
    let scout = enc.combatant_mut(&id("goblin-2")).unwrap();
    rules
        .conditions
        .apply(scout, "dazed", ConditionDuration::rounds(2), None)
        .unwrap();

    let mut dice = Dice::from_scripted(vec![10]);
    let mut spells = RulesSpellcaster;
    let mut ctx = CombatContext::new(&rules, &mut dice, &mut spells);
    let mut script = ScriptedActions::new().turn("goblin-2", vec![Action::melee("valeros")]);
    enc.process_round(&mut ctx, &mut script).unwrap();

    let skipped: Vec<(&CombatantId, &str)> = enc
        .log()
        .iter()
        .filter_map(|e| match &e.kind {
            EventKind::TurnSkipped { combatant, reason } => Some((combatant, reason.as_str())),
            _ => None,
        })
        .collect();
    assert_eq!(skipped, [(&id("goblin"), "defeated"), (&id("goblin-2"), "cannot act")]);
    // Skipping a turn does not consume the scripted one.
    assert_eq!(script.remaining(&id("goblin-2")), 1);
    assert_eq!(enc.round(), 2);
}

#[test]
fn run_gives_up_after_max_rounds() {
    let rules = rules();
    let mut enc = start(&rules, vec![fighter()], vec![goblin(5).at(6, 0)]);
    let mut dice = Dice::from_scripted(vec![10]);
    let mut spells = RulesSpellcaster;
    let mut ctx = CombatContext::new(&rules, &mut dice, &mut spells);
    let status = enc.run(&mut ctx, &mut ScriptedActions::new(), 3).unwrap();
    assert_eq!(status, EncounterStatus::Active);
    assert_eq!(enc.round(), 4);
}

struct Unplugged;

impl ActionSource for Unplugged {
    fn choose_actions(&mut self, _encounter: &CombatEncounter, actor: &CombatantId) -> anyhow::Result<Vec<Action>> {
        anyhow::bail!("no controller for {actor}")
    }
}

#[test]
fn a_failing_action_source_rolls_the_turn_back() {
    let rules = Ruleset::srd().unwrap();
    let mut enc = start(&rules, vec![fighter()], vec![goblin(5)]);
    let before = enc.log().len();
    let mut dice = Dice::from_scripted(vec![10]);
    let mut spells = RulesSpellcaster;
    let mut ctx = CombatContext::new(&rules, &mut dice, &mut spells);

    let err = enc.process_turn(&mut ctx, &mut Unplugged).unwrap_err();
    assert!(err.to_string().contains("no controller for valeros"));
    assert_eq!(enc.turn_index(), 0);
    assert_eq!(enc.log().len(), before);
    assert!(enc.combatant(&id("valeros")).unwrap().has_condition("flat_footed"));
}

#[test]
fn tactical_ai_picks_by_distance_and_weapon() {
    let rules = rules();
    let mut ai = TacticalAi;

    let enc = start(&rules, vec![fighter()], vec![goblin(5)]);
    assert_eq!(ai.choose_actions(&enc, &id("valeros")).unwrap(), vec![Action::melee("goblin")]);

    let veteran = fighter().with_bab(6);
    let enc = start(&rules, vec![veteran], vec![goblin(5)]);
    assert!(matches!(
        ai.choose_actions(&enc, &id("valeros")).unwrap()[..],
        [Action::FullAttack { attacks: None, .. }]
    ));

    let enc = start(&rules, vec![fighter()], vec![goblin(5).at(4, 0)]);
    assert_eq!(
        ai.choose_actions(&enc, &id("valeros")).unwrap(),
        vec![Action::Charge {
            target: id("goblin"),
            power_attack: 0
        }]
    );

    let archer = fighter().with_weapon(javelin());
    let enc = start(&rules, vec![archer], vec![goblin(5).at(6, 0)]);
    assert_eq!(
        ai.choose_actions(&enc, &id("valeros")).unwrap(),
        vec![Action::RangedAttack { target: id("goblin") }]
    );
}

#[test]
fn tactical_ai_walks_up_when_it_cannot_charge() {
    let rules = rules();
    let mut ai = TacticalAi;
    let environment = Environment {
        name: "wall".into(),
        blocked: (-2..=2).map(|y| Position::new(2, y)).collect(),
    };
    let enc = start_in(&rules, vec![fighter()], vec![goblin(5).at(4, 0)], environment);
    assert_eq!(
        ai.choose_actions(&enc, &id("valeros")).unwrap(),
        vec![Action::Move { to: Position::new(1, 0) }]
    );
}

#[test]
fn tactical_ai_plays_out_a_fight() {
    let rules = rules();
    let mut enc = start(&rules, vec![fighter()], vec![goblin(5).at(5, 0)]);
    let mut dice = Dice::from_seed(7);
    let mut spells = RulesSpellcaster;
    let mut ctx = CombatContext::new(&rules, &mut dice, &mut spells);
    let status = enc.run(&mut ctx, &mut TacticalAi, 20).unwrap();
    assert_eq!(status, EncounterStatus::Victory);
    assert!(hp(&enc, "goblin") <= 0);
    assert!(enc
        .log()
        .iter()
        .any(|e| matches!(&e.kind, EventKind::ActionResolved { result } if result.kind == ActionKind::Charge)));
}
