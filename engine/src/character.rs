use serde::{Deserialize, Serialize};

use crate::combatant::{Combatant, Defense, Faction, Position, SaveBases, Spellcasting};
use crate::error::ValidationError;
use crate::rules::{Equipment, RulesProvider};
use crate::{Ability, AbilityScores, SaveKind};

fn first_level() -> u32 {
    1
}

/// A character described by SRD record names, turned into a [`Combatant`]
/// with [`CharacterSheet::build`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterSheet {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub race: String,
    pub class: String,
    #[serde(default = "first_level")]
    pub level: u32,
    #[serde(default)]
    pub abilities: AbilityScores,
    #[serde(default)]
    pub weapon: Option<String>,
    #[serde(default)]
    pub armor: Option<String>,
    #[serde(default)]
    pub shield: Option<String>,
    #[serde(default)]
    pub feats: Vec<String>,
    /// Defaults to the side of the encounter the sheet is listed under.
    #[serde(default)]
    pub faction: Option<Faction>,
    #[serde(default)]
    pub position: Position,
    /// Fixed hit points instead of the rolled-for-average formula.
    #[serde(default)]
    pub hit_points: Option<i32>,
}

fn unknown(kind: &'static str, name: &str) -> ValidationError {
    ValidationError::UnknownRecord {
        kind,
        name: name.to_string(),
    }
}

/// Max hit die at first level, then half the die plus one; Con applies every
/// level and no level gives less than 1.
pub fn hit_points(hit_die: u32, level: u32, con_mod: i32) -> i32 {
    let die = hit_die as i32;
    (1..=level.max(1))
        .map(|lvl| {
            let base = if lvl == 1 { die } else { die / 2 + 1 };
            (base + con_mod).max(1)
        })
        .sum()
}

impl CharacterSheet {
    pub fn build(&self, rules: &dyn RulesProvider, default_faction: Faction) -> Result<Combatant, ValidationError> {
        let race = rules.race(&self.race).ok_or_else(|| unknown("race", &self.race))?;
        let class = rules.class(&self.class).ok_or_else(|| unknown("class", &self.class))?;
        let level = self.level.max(1);

        let mut abilities = self.abilities;
        for (ability, delta) in &race.ability_adjustments {
            *abilities.score_mut(*ability) += delta;
        }
        let con_mod = rules.ability_modifier(abilities.score(Ability::Con));

        let mut defense = Defense {
            natural_armor: race.natural_armor,
            ..Defense::default()
        };
        if let Some(name) = &self.armor {
            match rules.equipment(name) {
                Some(Equipment::Armor(armor)) => {
                    defense.armor_bonus = armor.bonus;
                    defense.max_dex = armor.max_dex;
                }
                _ => return Err(unknown("armor", name)),
            }
        }
        if let Some(name) = &self.shield {
            match rules.equipment(name) {
                Some(Equipment::Shield(shield)) => {
                    defense.shield_bonus = shield.bonus;
                    defense.max_dex = match (defense.max_dex, shield.max_dex) {
                        (Some(a), Some(b)) => Some(a.min(b)),
                        (a, b) => a.or(b),
                    };
                }
                _ => return Err(unknown("shield", name)),
            }
        }

        let save = |kind| class.save_progression(kind).at_level(level);
        let mut combatant = Combatant::new(
            self.id.clone(),
            self.name.clone().unwrap_or_else(|| self.id.clone()),
            self.faction.unwrap_or(default_faction),
        )
        .with_abilities(abilities)
        .with_hp(
            self.hit_points
                .unwrap_or_else(|| hit_points(class.hit_die, level, con_mod)),
        )
        .with_bab(class.bab.at_level(level))
        .with_saves(SaveBases {
            fortitude: save(SaveKind::Fortitude),
            reflex: save(SaveKind::Reflex),
            will: save(SaveKind::Will),
        })
        .with_size(race.size)
        .with_speed(race.speed)
        .with_defense(defense);
        combatant.position = self.position;

        if let Some(name) = &self.weapon {
            match rules.equipment(name) {
                Some(Equipment::Weapon(weapon)) => combatant.weapon = Some(weapon.clone()),
                _ => return Err(unknown("weapon", name)),
            }
        }

        for name in &self.feats {
            let feat = rules.feat(name).ok_or_else(|| unknown("feat", name))?;
            combatant.bonuses.accumulate(&feat.bonuses);
            combatant.feats.insert(feat.name.clone());
        }

        if let Some(casting) = &class.spellcasting {
            let row = casting
                .slots
                .get(level as usize - 1)
                .or_else(|| casting.slots.last());
            let slots = row
                .into_iter()
                .flatten()
                .enumerate()
                .filter(|(_, count)| **count > 0)
                .map(|(spell_level, count)| (spell_level as u8, *count))
                .collect();
            combatant.spellcasting = Some(Spellcasting {
                caster_level: level as i32,
                ability: casting.ability,
                slots,
            });
        }

        tracing::debug!(
            id = %combatant.id,
            race = %race.name,
            class = %class.name,
            level,
            hp = combatant.hp.max,
            "character built"
        );
        Ok(combatant)
    }
}
