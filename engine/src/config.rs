use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::conditions::ConditionRegistry;
use crate::rules::RulesData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Whether a spell lost to a failed concentration check still uses its slot.
    pub lost_spell_consumes_slot: bool,
    /// Everyone is flat-footed until their first turn.
    pub flat_footed_at_start: bool,
    /// Rounds before a simulated encounter is called unresolved.
    pub max_rounds: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lost_spell_consumes_slot: true,
            flat_footed_at_start: true,
            max_rounds: 50,
        }
    }
}

/// Rules data, condition registry and engine switches, built once before
/// combat and borrowed by everything after.
#[derive(Debug, Clone)]
pub struct Ruleset {
    pub data: RulesData,
    pub conditions: ConditionRegistry,
    pub config: EngineConfig,
}

impl Ruleset {
    /// Conditions shipped with `data` extend (or override) the SRD table.
    pub fn new(data: RulesData, config: EngineConfig) -> Self {
        let mut conditions = ConditionRegistry::srd();
        conditions.extend(data.conditions().iter().cloned());
        Self {
            data,
            conditions,
            config,
        }
    }

    /// The embedded SRD content with default settings.
    pub fn srd() -> anyhow::Result<Self> {
        Ok(Self::new(crate::content::srd_rules()?, EngineConfig::default()))
    }

    pub fn load(path: impl AsRef<Path>, config: EngineConfig) -> anyhow::Result<Self> {
        Ok(Self::new(RulesData::load(path)?, config))
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }
}
