//! Decorative touches that never influence which modules a family sees.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::profile::{FamilyProfile, Gender};

/// A boarding or day house a school may suggest to a family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseOption {
    pub name: String,
    #[serde(default)]
    pub house_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Empty means the house takes any pupil.
    #[serde(default)]
    pub genders: Vec<Gender>,
    #[serde(default)]
    pub min_year_group: Option<u8>,
    #[serde(default)]
    pub max_year_group: Option<u8>,
}

impl HouseOption {
    pub fn accepts(&self, profile: &FamilyProfile) -> bool {
        let gender = profile.child.gender;
        let gender_ok = self.genders.is_empty() || self.genders.contains(&gender);

        let year_ok = match (profile.entry.point.year_group(), self.min_year_group, self.max_year_group) {
            (_, None, None) => true,
            (None, _, _) => false,
            (Some(year), min, max) => {
                min.map_or(true, |min| year >= min) && max.map_or(true, |max| year <= max)
            }
        };

        gender_ok && year_ok
    }
}

pub fn eligible_houses<'a>(houses: &'a [HouseOption], profile: &FamilyProfile) -> Vec<&'a HouseOption> {
    houses.iter().filter(|house| house.accepts(profile)).collect()
}

pub fn suggest_house<'a, R>(
    houses: &'a [HouseOption],
    profile: &FamilyProfile,
    rng: &mut R,
) -> Option<&'a HouseOption>
where
    R: Rng + ?Sized,
{
    eligible_houses(houses, profile).choose(rng).copied()
}

/// Reproducible suggestion: the same seed always yields the same house.
pub fn seeded_suggestion<'a>(
    houses: &'a [HouseOption],
    profile: &FamilyProfile,
    seed: u64,
) -> Option<&'a HouseOption> {
    let mut rng = StdRng::seed_from_u64(seed);
    suggest_house(houses, profile, &mut rng)
}

/// FNV-1a hash of an identifier, used as a stable RNG seed.
pub fn seed_for(id: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    id.bytes()
        .fold(OFFSET, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(PRIME))
}
