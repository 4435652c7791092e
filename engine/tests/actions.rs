use serde_json::json;
use srd_engine::combat::{ActionCost, ActionEconomy, ReadyTrigger};
use srd_engine::{Action, ActionKind, CombatantId, ManeuverKind, Position, RuleViolation, ValidationError};

#[test]
fn a_standard_and_a_move_per_turn() {
    let mut economy = ActionEconomy::fresh(false, 1);
    economy.spend(ActionCost::Standard).unwrap();
    economy.spend(ActionCost::Move).unwrap();
    assert_eq!(
        economy.spend(ActionCost::Standard),
        Err(RuleViolation::ActionSpent(ActionCost::Standard))
    );
    economy.spend(ActionCost::Free).unwrap();
    economy.spend(ActionCost::Swift).unwrap();
    assert!(!economy.can_afford(ActionCost::Swift));
}

#[test]
fn a_standard_can_be_traded_for_a_second_move() {
    let mut economy = ActionEconomy::fresh(false, 1);
    economy.spend(ActionCost::Move).unwrap();
    economy.spend(ActionCost::Move).unwrap();
    assert!(!economy.can_afford(ActionCost::Standard));
    assert_eq!(
        economy.spend(ActionCost::Move),
        Err(RuleViolation::ActionSpent(ActionCost::Move))
    );
}

#[test]
fn full_round_needs_the_whole_turn() {
    let mut economy = ActionEconomy::fresh(false, 1);
    assert!(economy.can_afford(ActionCost::FullRound));
    economy.spend(ActionCost::Move).unwrap();
    assert!(!economy.can_afford(ActionCost::FullRound));

    let mut economy = ActionEconomy::fresh(false, 1);
    economy.spend(ActionCost::FullRound).unwrap();
    assert!(!economy.standard && !economy.move_action);
}

#[test]
fn single_action_turns_allow_one_of_move_or_standard() {
    let mut economy = ActionEconomy::fresh(true, 1);
    assert_eq!(economy.spend(ActionCost::FullRound), Err(RuleViolation::LimitedActions));
    economy.spend(ActionCost::Standard).unwrap();
    assert!(!economy.can_afford(ActionCost::Move));

    let mut economy = ActionEconomy::fresh(true, 1);
    economy.spend(ActionCost::Move).unwrap();
    assert!(!economy.can_afford(ActionCost::Standard));
}

#[test]
fn actions_decode_from_tagged_json() {
    let action = Action::from_json(json!({ "type": "melee_attack", "target": "goblin-1" })).unwrap();
    assert_eq!(action, Action::melee("goblin-1"));
    assert_eq!(action.kind(), ActionKind::MeleeAttack);
    assert_eq!(action.base_cost(), ActionCost::Standard);

    let action = Action::from_json(json!({
        "type": "combat_maneuver",
        "maneuver": "bull_rush",
        "target": "ogre",
        "suppress_attack_of_opportunity": true
    }))
    .unwrap();
    assert_eq!(
        action,
        Action::CombatManeuver {
            maneuver: ManeuverKind::BullRush,
            target: CombatantId::new("ogre"),
            suppress_attack_of_opportunity: true,
        }
    );

    let action = Action::from_json(json!({
        "type": "ready_action",
        "trigger": { "when": "enters_reach", "combatant": "ogre" },
        "action": { "type": "melee_attack", "target": "ogre" }
    }))
    .unwrap();
    assert_eq!(action.targets(), vec![&CombatantId::new("ogre"), &CombatantId::new("ogre")]);
    let Action::ReadyAction { trigger, .. } = &action else {
        panic!("expected a readied action");
    };
    assert_eq!(trigger, &ReadyTrigger::EntersReach(CombatantId::new("ogre")));

    let action = Action::from_json(json!({ "type": "move", "to": { "x": 2, "y": -1 } })).unwrap();
    assert_eq!(action, Action::Move { to: Position::new(2, -1) });
    assert_eq!(action.base_cost(), ActionCost::Move);
}

#[test]
fn unknown_action_types_are_unsupported() {
    let err = Action::from_json(json!({ "type": "dance", "target": "ogre" })).unwrap_err();
    assert_eq!(err, ValidationError::UnsupportedAction("dance".into()));
}

#[test]
fn bad_action_bodies_are_malformed() {
    let err = Action::from_json(json!({ "target": "ogre" })).unwrap_err();
    assert!(matches!(err, ValidationError::MalformedAction(_)));

    let err = Action::from_json(json!({ "type": "melee_attack" })).unwrap_err();
    assert!(matches!(err, ValidationError::MalformedAction(_)));

    let err = Action::from_json(json!({ "type": "combat_maneuver", "maneuver": "headbutt", "target": "ogre" }))
        .unwrap_err();
    assert!(matches!(err, ValidationError::MalformedAction(_)));
}

#[test]
fn maneuver_names_parse_loosely() {
    assert_eq!("Bull Rush".parse::<ManeuverKind>().unwrap(), ManeuverKind::BullRush);
    assert_eq!("trip".parse::<ManeuverKind>().unwrap(), ManeuverKind::Trip);
    assert_eq!(
        "headbutt".parse::<ManeuverKind>(),
        Err(ValidationError::UnknownManeuver("headbutt".into()))
    );
    assert!(!ManeuverKind::Overrun.provokes());
    assert!(ManeuverKind::Grapple.provokes());
}

