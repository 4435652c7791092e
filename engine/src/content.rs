use std::collections::HashMap;

use crate::rules::RulesData;

/// SRD races, classes, feats, equipment and spells shipped with the engine.
pub const SRD_RULES: &str = include_str!("../content/srd.json");

pub fn srd_rules() -> anyhow::Result<RulesData> {
    RulesData::from_json_str(SRD_RULES)
}

pub fn builtin_encounters() -> HashMap<&'static str, &'static str> {
    HashMap::from([(
        "goblin_ambush",
        include_str!("../content/encounters/goblin_ambush.json"),
    )])
}
