use srd_engine::api::{simulate_encounter, simulate_many, EncounterConfig, EncounterFile};
use srd_engine::content::srd_rules;
use srd_engine::{EncounterStatus, EngineConfig, Faction, Position};

const CAMP: &str = r#"
name: bandit camp
environment:
  name: clearing
  blocked: [{ x: 3, y: 3 }]
party:
  - id: kyra
    name: Kyra
    race: human
    class: cleric
    level: 2
    abilities: { str: 14, dex: 10, con: 12, int: 10, wis: 16, cha: 10 }
    weapon: morningstar
    armor: chainmail
enemies:
  - id: bandit
    name: Bandit
    faction: npc
    hp: { current: 6, max: 6 }
    speed: 30
    base_attack_bonus: 1
    position: { x: 2, y: 0 }
"#;

#[test]
fn same_seed_same_fight() {
    let first = simulate_encounter(EncounterConfig::builtin("goblin_ambush", 42)).unwrap();
    let second = simulate_encounter(EncounterConfig::builtin("goblin_ambush", 42)).unwrap();
    assert_eq!(first.status, second.status);
    assert_eq!(first.rounds, second.rounds);
    assert_eq!(first.log, second.log);
    assert_eq!(first.survivors, second.survivors);

    assert_eq!(first.encounter, "Goblin Ambush");
    assert!(first.log[0].starts_with("[INIT]"));
    assert!(first.rounds >= 1);
    assert!(first.survivors.iter().all(|s| s.hp > 0 && s.hp <= s.max_hp));
    if first.status == EncounterStatus::Victory {
        assert!(first.survivors.iter().all(|s| s.faction == Faction::Pc));
    }
}

#[test]
fn many_samples_are_all_accounted_for() {
    let stats = simulate_many(EncounterConfig::builtin("goblin_ambush", 7), 12).unwrap();
    assert_eq!(stats.samples, 12);
    assert_eq!(stats.victories + stats.defeats + stats.unresolved, 12);
    assert!(stats.average_rounds >= 1.0);
    assert!((0.0..=1.0).contains(&stats.victory_rate()));

    let none = simulate_many(EncounterConfig::builtin("goblin_ambush", 7), 0).unwrap();
    assert_eq!(none.average_rounds, 0.0);
    assert_eq!(none.victory_rate(), 0.0);
}

#[test]
fn round_cap_is_respected() {
    let mut cfg = EncounterConfig::builtin("goblin_ambush", 3);
    cfg.engine = EngineConfig {
        max_rounds: 1,
        ..EngineConfig::default()
    };
    let report = simulate_encounter(cfg).unwrap();
    assert_eq!(report.rounds, 1);
}

#[test]
fn unknown_or_missing_encounters_are_errors() {
    let err = simulate_encounter(EncounterConfig::builtin("dragon_lair", 1)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "unknown built-in encounter 'dragon_lair' (known: goblin_ambush)"
    );

    let err = simulate_encounter(EncounterConfig::default()).unwrap_err();
    assert!(err.to_string().starts_with("no encounter given"));
}

#[test]
fn yaml_encounters_mix_sheets_and_stat_blocks() {
    let file = EncounterFile::from_yaml_str(CAMP).unwrap();
    assert_eq!(file.environment.blocked.len(), 1);

    let rules = srd_rules().unwrap();
    let (party, enemies) = file.combatants(&rules).unwrap();
    let kyra = &party[0];
    assert_eq!(kyra.faction, Faction::Pc);
    assert_eq!(kyra.weapon.as_ref().unwrap().name, "morningstar");
    assert_eq!(kyra.base_attack_bonus, 1);

    let bandit = &enemies[0];
    assert_eq!(bandit.hp.current, 6);
    assert_eq!(bandit.position, Position::new(2, 0));
    assert!(bandit.weapon.is_none());
}

#[test]
fn encounter_files_load_from_disk() {
    let path = std::env::temp_dir().join(format!("srd-engine-camp-{}.yaml", std::process::id()));
    std::fs::write(&path, CAMP).unwrap();

    let cfg = EncounterConfig {
        encounter_path: Some(path.clone()),
        seed: 11,
        ..EncounterConfig::default()
    };
    let report = simulate_encounter(cfg).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(report.encounter, "bandit camp");
    assert_eq!(report.seed, 11);
    assert!(report.status.is_over() || report.rounds == EngineConfig::default().max_rounds);
}

#[test]
fn broken_encounter_files_say_where() {
    let err = EncounterFile::from_json_str(r#"{"name": "empty"}"#).unwrap_err();
    assert!(format!("{err:#}").contains("failed to parse encounter JSON"));
}
