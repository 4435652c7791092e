use proptest::prelude::*;
use srd_engine::error::DiceError;
use srd_engine::{check, CheckInput, Dice, DiceExpr, DiceSource};
use srd_engine::checks::{contested_check, ContestOutcome};

#[test]
fn parses_common_notation() {
    let expr: DiceExpr = "2d6+3".parse().unwrap();
    assert_eq!(expr, DiceExpr::new(2, 6).with_modifier(3));
    assert_eq!(expr.min(), 5);
    assert_eq!(expr.max(), 15);

    assert_eq!("d20".parse::<DiceExpr>().unwrap(), DiceExpr::new(1, 20));
    assert_eq!(" 1D8 - 1 ".parse::<DiceExpr>().unwrap(), DiceExpr::new(1, 8).with_modifier(-1));
    assert_eq!(DiceExpr::new(1, 8).with_modifier(-1).to_string(), "1d8-1");
    assert_eq!(DiceExpr::new(3, 4).to_string(), "3d4");
}

#[test]
fn huge_expressions_saturate_their_bounds() {
    let expr: DiceExpr = "100000d100000".parse().unwrap();
    assert_eq!(expr.min(), 100_000);
    assert_eq!(expr.max(), i32::MAX);
    assert_eq!(DiceExpr::new(u32::MAX, 2).with_modifier(-5).min(), i32::MAX - 5);

    let roll = Dice::from_scripted(vec![100_000]).roll(&"30000d100000+7".parse().unwrap());
    assert_eq!(roll.total, i32::MAX);
}

#[test]
fn rejects_bad_notation() {
    for bad in ["", "2x6", "0d6", "d", "2d6+", "twod6"] {
        assert!(
            matches!(bad.parse::<DiceExpr>(), Err(DiceError::InvalidNotation(_))),
            "{bad:?} should not parse"
        );
    }
    assert_eq!("1d1".parse::<DiceExpr>(), Err(DiceError::InvalidDieSize(1)));
}

#[test]
fn same_seed_same_rolls() {
    let mut a = Dice::from_seed(2025);
    let mut b = Dice::from_seed(2025);
    let left: Vec<i32> = (0..20).map(|_| a.d20()).collect();
    let right: Vec<i32> = (0..20).map(|_| b.d20()).collect();
    assert_eq!(left, right);
}

#[test]
fn scripted_dice_clamp_and_wrap() {
    let mut dice = Dice::from_scripted(vec![25, 3]);
    assert_eq!(dice.d20(), 20);
    assert_eq!(dice.die(6), 3);
    assert_eq!(dice.die(6), 6);

    let mut dice = Dice::from_scripted(vec![4, 5]);
    let roll = dice.roll_notation("2d6+1").unwrap();
    assert_eq!(roll.rolls, vec![4, 5]);
    assert_eq!(roll.total, 10);
}

proptest! {
    #[test]
    fn seeded_rolls_stay_in_range(seed in any::<u64>(), count in 1u32..8, sides in 2u32..=20, modifier in -5i32..=5) {
        let expr = DiceExpr::new(count, sides).with_modifier(modifier);
        let roll = Dice::from_seed(seed).roll(&expr);
        prop_assert_eq!(roll.rolls.len(), count as usize);
        prop_assert!(roll.rolls.iter().all(|r| (1..=sides).contains(r)));
        prop_assert!(roll.total >= expr.min() && roll.total <= expr.max());
    }
}

#[test]
fn checks_meet_or_beat_the_dc() {
    let mut dice = Dice::from_scripted(vec![12]);
    let result = check(&mut dice, CheckInput { dc: 15, modifier: 3 });
    assert_eq!(result.total, 15);
    assert!(result.passed);

    let mut dice = Dice::from_scripted(vec![11]);
    assert!(!check(&mut dice, CheckInput { dc: 15, modifier: 3 }).passed);
}

#[test]
fn contested_ties_go_to_the_defender() {
    let mut dice = Dice::from_scripted(vec![10, 12]);
    let contest = contested_check(&mut dice, 4, 2);
    assert_eq!(contest.outcome, ContestOutcome::TieDefender);
    assert!(!contest.attacker_won());

    let mut dice = Dice::from_scripted(vec![11, 12]);
    let contest = contested_check(&mut dice, 4, 2);
    assert!(contest.attacker_won());
    assert_eq!(contest.margin(), 1);
}
