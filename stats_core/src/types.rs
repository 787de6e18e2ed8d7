use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, AddAssign, Index, IndexMut, Mul, Sub, SubAssign};

/// Every stat tracked on a combat participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    Strength,
    Agility,
    Stamina,
    Intellect,
    Spirit,
    SpellPower,
    ArcaneSpellPower,
    FireSpellPower,
    FrostSpellPower,
    HolySpellPower,
    NatureSpellPower,
    ShadowSpellPower,
    SpellHitRating,
    SpellCritRating,
    SpellHasteRating,
    AttackPower,
    RangedAttackPower,
    MeleeHitRating,
    MeleeCritRating,
    MeleeHasteRating,
    Expertise,
    Armor,
    Mana,
    Mp5,
}

impl Stat {
    /// Number of stats in the vector
    pub const COUNT: usize = 24;

    /// All stats in declaration order
    pub fn all() -> &'static [Stat] {
        &[
            Stat::Strength,
            Stat::Agility,
            Stat::Stamina,
            Stat::Intellect,
            Stat::Spirit,
            Stat::SpellPower,
            Stat::ArcaneSpellPower,
            Stat::FireSpellPower,
            Stat::FrostSpellPower,
            Stat::HolySpellPower,
            Stat::NatureSpellPower,
            Stat::ShadowSpellPower,
            Stat::SpellHitRating,
            Stat::SpellCritRating,
            Stat::SpellHasteRating,
            Stat::AttackPower,
            Stat::RangedAttackPower,
            Stat::MeleeHitRating,
            Stat::MeleeCritRating,
            Stat::MeleeHasteRating,
            Stat::Expertise,
            Stat::Armor,
            Stat::Mana,
            Stat::Mp5,
        ]
    }

    /// Position of this stat inside a [`Stats`] vector
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Damage school of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpellSchool {
    Physical,
    Arcane,
    Fire,
    Frost,
    Holy,
    Nature,
    Shadow,
}

impl SpellSchool {
    /// The school-specific spell power stat, if the school has one
    pub fn power_stat(self) -> Option<Stat> {
        match self {
            SpellSchool::Physical => None,
            SpellSchool::Arcane => Some(Stat::ArcaneSpellPower),
            SpellSchool::Fire => Some(Stat::FireSpellPower),
            SpellSchool::Frost => Some(Stat::FrostSpellPower),
            SpellSchool::Holy => Some(Stat::HolySpellPower),
            SpellSchool::Nature => Some(Stat::NatureSpellPower),
            SpellSchool::Shadow => Some(Stat::ShadowSpellPower),
        }
    }
}

impl fmt::Display for SpellSchool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Sparse stat listing as it appears in configuration files
pub type StatMap = BTreeMap<Stat, f64>;

/// Dense stat vector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats([f64; Stat::COUNT]);

impl Default for Stats {
    fn default() -> Self {
        Stats([0.0; Stat::COUNT])
    }
}

impl Stats {
    /// All-zero stat vector
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a vector holding a single stat
    pub fn single(stat: Stat, value: f64) -> Self {
        let mut stats = Self::new();
        stats[stat] = value;
        stats
    }

    /// Build a vector from a sparse map
    pub fn from_map(map: &StatMap) -> Self {
        let mut stats = Self::new();
        for (stat, value) in map {
            stats[*stat] += *value;
        }
        stats
    }

    /// Convert to a sparse map, dropping zero entries
    pub fn to_map(&self) -> StatMap {
        Stat::all()
            .iter()
            .filter(|s| self[**s] != 0.0)
            .map(|s| (*s, self[*s]))
            .collect()
    }

    /// Get a stat value
    pub fn get(&self, stat: Stat) -> f64 {
        self.0[stat.index()]
    }

    /// True when every entry is exactly zero
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|v| *v == 0.0)
    }

    /// Iterate over (stat, value) pairs in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (Stat, f64)> + '_ {
        Stat::all().iter().map(move |s| (*s, self[*s]))
    }
}

impl Index<Stat> for Stats {
    type Output = f64;

    fn index(&self, stat: Stat) -> &f64 {
        &self.0[stat.index()]
    }
}

impl IndexMut<Stat> for Stats {
    fn index_mut(&mut self, stat: Stat) -> &mut f64 {
        &mut self.0[stat.index()]
    }
}

impl Add for Stats {
    type Output = Stats;

    fn add(mut self, rhs: Stats) -> Stats {
        self += rhs;
        self
    }
}

impl AddAssign for Stats {
    fn add_assign(&mut self, rhs: Stats) {
        for (a, b) in self.0.iter_mut().zip(rhs.0.iter()) {
            *a += *b;
        }
    }
}

impl Sub for Stats {
    type Output = Stats;

    fn sub(mut self, rhs: Stats) -> Stats {
        self -= rhs;
        self
    }
}

impl SubAssign for Stats {
    fn sub_assign(&mut self, rhs: Stats) {
        for (a, b) in self.0.iter_mut().zip(rhs.0.iter()) {
            *a -= *b;
        }
    }
}

impl Mul<f64> for Stats {
    type Output = Stats;

    fn mul(mut self, rhs: f64) -> Stats {
        for v in self.0.iter_mut() {
            *v *= rhs;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_count_matches_all() {
        assert_eq!(Stat::all().len(), Stat::COUNT);
        for (i, stat) in Stat::all().iter().enumerate() {
            assert_eq!(stat.index(), i);
        }
    }

    #[test]
    fn test_add_and_sub() {
        let a = Stats::single(Stat::Intellect, 100.0);
        let b = Stats::single(Stat::Intellect, 25.0) + Stats::single(Stat::Mana, 10.0);

        let sum = a + b;
        assert!((sum[Stat::Intellect] - 125.0).abs() < f64::EPSILON);
        assert!((sum[Stat::Mana] - 10.0).abs() < f64::EPSILON);

        let back = sum - b;
        assert_eq!(back, a);
    }

    #[test]
    fn test_map_round_trip_drops_zeroes() {
        let mut map = StatMap::new();
        map.insert(Stat::SpellPower, 500.0);
        map.insert(Stat::Mp5, 0.0);

        let stats = Stats::from_map(&map);
        let out = stats.to_map();
        assert_eq!(out.len(), 1);
        assert!((out[&Stat::SpellPower] - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_school_power_stat() {
        assert_eq!(SpellSchool::Fire.power_stat(), Some(Stat::FireSpellPower));
        assert_eq!(SpellSchool::Physical.power_stat(), None);
    }
}
