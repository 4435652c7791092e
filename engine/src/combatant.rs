use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::combat::ActionEconomy;
use crate::conditions::{aggregate, Condition, EffectBundle};
use crate::dice::DiceExpr;
use crate::rules::normalize_key;
use crate::{Ability, AbilityScores};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CombatantId(String);

impl CombatantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CombatantId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Faction {
    Pc,
    Npc,
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Faction::Pc => "pc",
            Faction::Npc => "npc",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Size {
    Fine,
    Diminutive,
    Tiny,
    Small,
    #[default]
    Medium,
    Large,
    Huge,
    Gargantuan,
    Colossal,
}

impl Size {
    /// Size modifier to attack rolls and AC.
    pub fn modifier(self) -> i32 {
        match self {
            Size::Fine => 8,
            Size::Diminutive => 4,
            Size::Tiny => 2,
            Size::Small => 1,
            Size::Medium => 0,
            Size::Large => -1,
            Size::Huge => -2,
            Size::Gargantuan => -4,
            Size::Colossal => -8,
        }
    }

    /// Special size modifier for grapple checks and Strength-based maneuvers.
    pub fn special_modifier(self) -> i32 {
        match self {
            Size::Fine => -16,
            Size::Diminutive => -12,
            Size::Tiny => -8,
            Size::Small => -4,
            Size::Medium => 0,
            Size::Large => 4,
            Size::Huge => 8,
            Size::Gargantuan => 12,
            Size::Colossal => 16,
        }
    }
}

/// A square on the 5-ft battle grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Grid distance in feet; every second diagonal counts double.
    pub fn distance_ft(self, other: Position) -> u32 {
        let dx = (self.x - other.x).unsigned_abs();
        let dy = (self.y - other.y).unsigned_abs();
        let diagonal = dx.min(dy);
        let straight = dx.max(dy) - diagonal;
        5 * (straight + diagonal + diagonal / 2)
    }

    /// Squares strictly between `self` and `other` on a straight line.
    pub fn line_to(self, other: Position) -> Vec<Position> {
        let mut squares = Vec::new();
        let (dx, dy) = ((other.x - self.x).abs(), -(other.y - self.y).abs());
        let (sx, sy) = ((other.x - self.x).signum(), (other.y - self.y).signum());
        let (mut x, mut y, mut err) = (self.x, self.y, dx + dy);
        loop {
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
            let next = Position::new(x, y);
            if next == other {
                break;
            }
            squares.push(next);
        }
        squares
    }

    pub fn offset(self, dx: i32, dy: i32) -> Position {
        Position::new(self.x + dx, self.y + dy)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DamageType {
    Bludgeoning,
    Piercing,
    Slashing,
    Acid,
    Cold,
    Electricity,
    Fire,
    Force,
    Sonic,
    Positive,
}

impl DamageType {
    pub fn as_str(self) -> &'static str {
        match self {
            DamageType::Bludgeoning => "bludgeoning",
            DamageType::Piercing => "piercing",
            DamageType::Slashing => "slashing",
            DamageType::Acid => "acid",
            DamageType::Cold => "cold",
            DamageType::Electricity => "electricity",
            DamageType::Fire => "fire",
            DamageType::Force => "force",
            DamageType::Sonic => "sonic",
            DamageType::Positive => "positive",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeaponKind {
    #[default]
    Melee,
    Ranged,
}

fn default_threat_floor() -> u8 {
    20
}

fn default_multiplier() -> u8 {
    2
}

fn default_reach() -> u32 {
    5
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weapon {
    pub name: String,
    pub damage: DiceExpr,
    /// Lowest natural roll that threatens a critical (19 for 19–20).
    #[serde(default = "default_threat_floor")]
    pub threat_floor: u8,
    #[serde(default = "default_multiplier")]
    pub crit_multiplier: u8,
    #[serde(default)]
    pub kind: WeaponKind,
    pub damage_type: DamageType,
    #[serde(default)]
    pub finesse: bool,
    #[serde(default)]
    pub light: bool,
    #[serde(default)]
    pub two_handed: bool,
    #[serde(default = "default_reach")]
    pub reach_ft: u32,
    #[serde(default)]
    pub range_increment_ft: u32,
    #[serde(default)]
    pub enhancement: i32,
    /// Material and alignment properties (`silver`, `cold_iron`, `magic`, ...).
    #[serde(default)]
    pub properties: Vec<String>,
    #[serde(default)]
    pub broken: bool,
}

impl Weapon {
    pub fn new(name: impl Into<String>, damage: DiceExpr, damage_type: DamageType) -> Self {
        Self {
            name: name.into(),
            damage,
            threat_floor: default_threat_floor(),
            crit_multiplier: default_multiplier(),
            kind: WeaponKind::Melee,
            damage_type,
            finesse: false,
            light: false,
            two_handed: false,
            reach_ft: default_reach(),
            range_increment_ft: 0,
            enhancement: 0,
            properties: Vec::new(),
            broken: false,
        }
    }

    pub fn unarmed_strike() -> Self {
        let mut weapon = Weapon::new("unarmed strike", DiceExpr::new(1, 3), DamageType::Bludgeoning);
        weapon.light = true;
        weapon
    }

    pub fn with_critical(mut self, threat_floor: u8, multiplier: u8) -> Self {
        self.threat_floor = threat_floor;
        self.crit_multiplier = multiplier;
        self
    }

    pub fn ranged(mut self, range_increment_ft: u32) -> Self {
        self.kind = WeaponKind::Ranged;
        self.range_increment_ft = range_increment_ft;
        self
    }

    pub fn with_enhancement(mut self, enhancement: i32) -> Self {
        self.enhancement = enhancement;
        self
    }

    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.properties.push(property.into());
        self
    }

    pub fn is_ranged(&self) -> bool {
        self.kind == WeaponKind::Ranged
    }

    pub fn is_magic(&self) -> bool {
        self.enhancement > 0 || self.has_property("magic")
    }

    pub fn has_property(&self, property: &str) -> bool {
        let wanted = normalize_key(property);
        self.properties.iter().any(|p| normalize_key(p) == wanted)
    }
}

fn dr_none() -> String {
    "-".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageReduction {
    pub amount: i32,
    /// What overcomes the reduction (`magic`, `silver`, `slashing`, ...). `-`
    /// means nothing does.
    #[serde(rename = "type", default = "dr_none")]
    pub bypass: String,
}

impl DamageReduction {
    pub fn new(amount: i32, bypass: impl Into<String>) -> Self {
        Self {
            amount,
            bypass: bypass.into(),
        }
    }

    pub fn is_bypassed_by(&self, weapon: &Weapon) -> bool {
        match normalize_key(&self.bypass).as_str() {
            "-" | "" => false,
            "magic" => weapon.is_magic(),
            key => weapon.damage_type.as_str() == key || weapon.has_property(key),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HitPoints {
    pub current: i32,
    pub max: i32,
}

impl HitPoints {
    pub fn new(max: i32) -> Self {
        Self { current: max, max }
    }
}

/// Armor class inputs other than Dexterity and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Defense {
    pub armor_bonus: i32,
    pub shield_bonus: i32,
    pub natural_armor: i32,
    pub deflection: i32,
    pub dodge: i32,
    /// Maximum Dexterity bonus allowed by worn armor.
    pub max_dex: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveBases {
    pub fortitude: i32,
    pub reflex: i32,
    pub will: i32,
}

/// Static bonuses granted by feats and equipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatBonuses {
    pub initiative: i32,
    pub attack: i32,
    pub damage: i32,
    pub armor_class: i32,
    pub fortitude: i32,
    pub reflex: i32,
    pub will: i32,
    pub concentration: i32,
}

impl FeatBonuses {
    pub fn accumulate(&mut self, other: &FeatBonuses) {
        self.initiative += other.initiative;
        self.attack += other.attack;
        self.damage += other.damage;
        self.armor_class += other.armor_class;
        self.fortitude += other.fortitude;
        self.reflex += other.reflex;
        self.will += other.will;
        self.concentration += other.concentration;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spellcasting {
    pub caster_level: i32,
    pub ability: Ability,
    /// Remaining slots keyed by spell level.
    #[serde(default)]
    pub slots: BTreeMap<u8, u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combatant {
    pub id: CombatantId,
    pub name: String,
    pub faction: Faction,
    #[serde(default)]
    pub abilities: AbilityScores,
    pub hp: HitPoints,
    #[serde(default)]
    pub defense: Defense,
    #[serde(default)]
    pub size: Size,
    #[serde(default)]
    pub base_attack_bonus: i32,
    #[serde(default)]
    pub saves: SaveBases,
    pub speed: u32,
    /// `None` means empty-handed: attacks use an unarmed strike.
    #[serde(default)]
    pub weapon: Option<Weapon>,
    #[serde(default)]
    pub feats: BTreeSet<String>,
    #[serde(default)]
    pub bonuses: FeatBonuses,
    #[serde(default)]
    pub damage_reduction: Option<DamageReduction>,
    #[serde(default)]
    pub spellcasting: Option<Spellcasting>,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub economy: ActionEconomy,
    #[serde(default)]
    pub initiative: i32,
}

impl Combatant {
    pub fn new(id: impl Into<String>, name: impl Into<String>, faction: Faction) -> Self {
        Self {
            id: CombatantId::new(id),
            name: name.into(),
            faction,
            abilities: AbilityScores::default(),
            hp: HitPoints::new(1),
            defense: Defense::default(),
            size: Size::Medium,
            base_attack_bonus: 0,
            saves: SaveBases::default(),
            speed: 30,
            weapon: None,
            feats: BTreeSet::new(),
            bonuses: FeatBonuses::default(),
            damage_reduction: None,
            spellcasting: None,
            position: Position::default(),
            conditions: Vec::new(),
            economy: ActionEconomy::default(),
            initiative: 0,
        }
    }

    pub fn with_abilities(mut self, abilities: AbilityScores) -> Self {
        self.abilities = abilities;
        self
    }

    pub fn with_hp(mut self, max: i32) -> Self {
        self.hp = HitPoints::new(max);
        self
    }

    pub fn with_bab(mut self, bab: i32) -> Self {
        self.base_attack_bonus = bab;
        self
    }

    pub fn with_weapon(mut self, weapon: Weapon) -> Self {
        self.weapon = Some(weapon);
        self
    }

    pub fn with_defense(mut self, defense: Defense) -> Self {
        self.defense = defense;
        self
    }

    pub fn with_saves(mut self, saves: SaveBases) -> Self {
        self.saves = saves;
        self
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    pub fn with_speed(mut self, speed: u32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_feat(mut self, feat: impl Into<String>) -> Self {
        self.feats.insert(feat.into());
        self
    }

    pub fn with_damage_reduction(mut self, dr: DamageReduction) -> Self {
        self.damage_reduction = Some(dr);
        self
    }

    pub fn with_spellcasting(mut self, spellcasting: Spellcasting) -> Self {
        self.spellcasting = Some(spellcasting);
        self
    }

    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.position = Position::new(x, y);
        self
    }

    pub fn has_feat(&self, feat: &str) -> bool {
        let wanted = normalize_key(feat);
        self.feats.iter().any(|f| normalize_key(f) == wanted)
    }

    pub fn has_condition(&self, name: &str) -> bool {
        let wanted = normalize_key(name);
        self.conditions.iter().any(|c| c.name == wanted)
    }

    /// Removes the first condition with this name. Returns whether one was found.
    pub fn remove_condition(&mut self, name: &str) -> bool {
        let wanted = normalize_key(name);
        match self.conditions.iter().position(|c| c.name == wanted) {
            Some(idx) => {
                self.conditions.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Aggregated effect of every active condition.
    pub fn effects(&self) -> EffectBundle {
        aggregate(&self.conditions)
    }

    pub fn is_defeated(&self) -> bool {
        self.hp.current <= 0 || self.has_condition("dead") || self.has_condition("unconscious")
    }

    pub fn can_act(&self) -> bool {
        !self.is_defeated() && !self.effects().flags.no_actions
    }

    /// The weapon attacks are made with; an unarmed strike when empty-handed.
    pub fn wielded(&self) -> Cow<'_, Weapon> {
        match &self.weapon {
            Some(weapon) => Cow::Borrowed(weapon),
            None => Cow::Owned(Weapon::unarmed_strike()),
        }
    }

    pub fn reach_ft(&self) -> u32 {
        self.wielded().reach_ft
    }

    /// Whether this combatant could make an attack of opportunity against `other`.
    pub fn threatens(&self, other: &Combatant) -> bool {
        if self.faction == other.faction || !self.can_act() {
            return false;
        }
        let armed = match &self.weapon {
            Some(weapon) => !weapon.is_ranged(),
            None => self.has_feat("Improved Unarmed Strike"),
        };
        armed && self.position.distance_ft(other.position) <= self.reach_ft()
    }
}
