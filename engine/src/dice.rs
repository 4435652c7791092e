//! Dice notation and dice sources.
//!
//! Parses and rolls `NdM`, `NdM+K` and `NdM-K`. Every roll in the engine goes
//! through [`DiceSource`] so a scripted source can replace the RNG in tests.

use std::fmt;
use std::str::FromStr;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::DiceError;

/// A parsed dice expression such as `2d6+3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DiceExpr {
    pub count: u32,
    pub sides: u32,
    pub modifier: i32,
}

impl DiceExpr {
    pub const fn new(count: u32, sides: u32) -> Self {
        Self {
            count,
            sides,
            modifier: 0,
        }
    }

    pub const fn with_modifier(mut self, modifier: i32) -> Self {
        self.modifier = modifier;
        self
    }

    /// Smallest possible total. Saturates at the `i32` bounds.
    pub fn min(&self) -> i32 {
        clamp_total(u64::from(self.count)).saturating_add(self.modifier)
    }

    /// Largest possible total. Saturates at the `i32` bounds.
    pub fn max(&self) -> i32 {
        clamp_total(u64::from(self.count) * u64::from(self.sides)).saturating_add(self.modifier)
    }
}

fn clamp_total(sum: u64) -> i32 {
    i32::try_from(sum).unwrap_or(i32::MAX)
}

fn sum_rolls(rolls: &[u32]) -> i32 {
    clamp_total(rolls.iter().map(|&r| u64::from(r)).sum())
}

impl FromStr for DiceExpr {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let notation: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        let invalid = || DiceError::InvalidNotation(s.to_string());

        let (count_str, rest) = notation.split_once('d').ok_or_else(invalid)?;
        let count: u32 = if count_str.is_empty() {
            1
        } else {
            count_str.parse().map_err(|_| invalid())?
        };
        if count == 0 {
            return Err(invalid());
        }

        let (sides_str, modifier) = match rest.find(['+', '-']) {
            Some(pos) => {
                let (sides, modifier) = rest.split_at(pos);
                let modifier: i32 = modifier.parse().map_err(|_| invalid())?;
                (sides, modifier)
            }
            None => (rest, 0),
        };
        let sides: u32 = sides_str.parse().map_err(|_| invalid())?;
        if sides < 2 {
            return Err(DiceError::InvalidDieSize(sides));
        }

        Ok(DiceExpr {
            count,
            sides,
            modifier,
        })
    }
}

impl TryFrom<String> for DiceExpr {
    type Error = DiceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DiceExpr> for String {
    fn from(value: DiceExpr) -> Self {
        value.to_string()
    }
}

impl fmt::Display for DiceExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.modifier {
            0 => write!(f, "{}d{}", self.count, self.sides),
            m if m > 0 => write!(f, "{}d{}+{}", self.count, self.sides, m),
            m => write!(f, "{}d{}{}", self.count, self.sides, m),
        }
    }
}

/// Individual dice plus the total (dice + modifier).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiceRoll {
    pub rolls: Vec<u32>,
    pub modifier: i32,
    pub total: i32,
}

impl DiceRoll {
    pub fn dice_total(&self) -> i32 {
        sum_rolls(&self.rolls)
    }
}

pub trait DiceSource {
    /// One die with `sides` faces, in `1..=sides`.
    fn die(&mut self, sides: u32) -> u32;

    fn d20(&mut self) -> i32 {
        self.die(20) as i32
    }

    fn roll(&mut self, expr: &DiceExpr) -> DiceRoll {
        let rolls: Vec<u32> = (0..expr.count).map(|_| self.die(expr.sides)).collect();
        let total = sum_rolls(&rolls).saturating_add(expr.modifier);
        DiceRoll {
            rolls,
            modifier: expr.modifier,
            total,
        }
    }

    fn roll_notation(&mut self, notation: &str) -> Result<DiceRoll, DiceError> {
        let expr: DiceExpr = notation.parse()?;
        Ok(self.roll(&expr))
    }
}

enum Source {
    Seeded(ChaCha8Rng),
    Scripted { values: Vec<u32>, next: usize },
}

pub struct Dice {
    source: Source,
}

impl Dice {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            source: Source::Seeded(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    /// Replays `values` in order, wrapping around when exhausted. Each value
    /// is clamped into the range of the die being rolled.
    pub fn from_scripted(values: Vec<u32>) -> Self {
        Self {
            source: Source::Scripted { values, next: 0 },
        }
    }
}

impl DiceSource for Dice {
    fn die(&mut self, sides: u32) -> u32 {
        let sides = sides.max(1);
        match &mut self.source {
            Source::Seeded(rng) => rng.gen_range(1..=sides),
            Source::Scripted { values, next } => {
                if values.is_empty() {
                    return 1;
                }
                let value = values[*next % values.len()];
                *next += 1;
                value.clamp(1, sides)
            }
        }
    }
}
