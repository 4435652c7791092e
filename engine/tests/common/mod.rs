#![allow(dead_code)]

use std::collections::BTreeMap;

use srd_engine::combatant::Spellcasting;
use srd_engine::{
    Ability, AbilityScores, CombatEncounter, Combatant, CombatantId, DamageType, Defense, Dice, DiceExpr,
    EngineConfig, Environment, Faction, Ruleset, Weapon,
};

/// SRD content without the start-of-combat flat-footed rule, so AC numbers
/// in tests stay easy to read.
pub fn rules() -> Ruleset {
    Ruleset::srd().unwrap().with_config(EngineConfig {
        flat_footed_at_start: false,
        ..EngineConfig::default()
    })
}

pub fn id(s: &str) -> CombatantId {
    CombatantId::new(s)
}

pub fn scores(str_: i32, dex: i32) -> AbilityScores {
    AbilityScores {
        str_,
        dex,
        ..AbilityScores::default()
    }
}

pub fn longsword() -> Weapon {
    Weapon::new("longsword", DiceExpr::new(1, 8), DamageType::Slashing).with_critical(19, 2)
}

pub fn morningstar() -> Weapon {
    Weapon::new("morningstar", DiceExpr::new(1, 8), DamageType::Bludgeoning)
}

pub fn javelin() -> Weapon {
    Weapon::new("javelin", DiceExpr::new(1, 6), DamageType::Piercing).ranged(30)
}

/// BAB 5, Str 16, longsword: +8 to hit, +3 damage.
pub fn fighter() -> Combatant {
    Combatant::new("valeros", "Valeros", Faction::Pc)
        .with_abilities(scores(16, 10))
        .with_hp(30)
        .with_bab(5)
        .with_weapon(longsword())
        .at(0, 0)
}

/// AC 15, unarmed, standing next to the fighter.
pub fn goblin(hp: i32) -> Combatant {
    Combatant::new("goblin", "Goblin", Faction::Npc)
        .with_hp(hp)
        .with_defense(Defense {
            armor_bonus: 5,
            ..Defense::default()
        })
        .at(1, 0)
}

pub fn wizard() -> Combatant {
    Combatant::new("ezren", "Ezren", Faction::Pc)
        .with_abilities(AbilityScores {
            int_: 16,
            ..AbilityScores::default()
        })
        .with_hp(8)
        .with_spellcasting(Spellcasting {
            caster_level: 1,
            ability: Ability::Int,
            slots: BTreeMap::from([(0, 3), (1, 1)]),
        })
        .at(0, 0)
}

/// Everyone rolls a 10 for initiative, so the order is the input order
/// unless modifiers differ.
pub fn start(rules: &Ruleset, party: Vec<Combatant>, enemies: Vec<Combatant>) -> CombatEncounter {
    start_in(rules, party, enemies, Environment::default())
}

pub fn start_in(
    rules: &Ruleset,
    party: Vec<Combatant>,
    enemies: Vec<Combatant>,
    environment: Environment,
) -> CombatEncounter {
    let mut dice = Dice::from_scripted(vec![10]);
    CombatEncounter::initialize_combat(party, enemies, environment, rules, &mut dice).unwrap()
}

pub fn hp(encounter: &CombatEncounter, who: &str) -> i32 {
    encounter.combatant(&id(who)).unwrap().hp.current
}
