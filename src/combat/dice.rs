//! Dice rolling for initiative
//!
//! Initiative is a single d20 plus the combatant's dexterity modifier.

use rand::Rng;

/// Sides on the initiative die
pub const INITIATIVE_DIE: i32 = 20;

/// Result of an initiative roll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitiativeRoll {
    /// The natural d20 result
    pub natural: i32,
    /// Dexterity modifier added to the roll
    pub modifier: i32,
}

impl InitiativeRoll {
    /// Roll initiative with a caller-supplied RNG
    pub fn roll_with<R: Rng + ?Sized>(rng: &mut R, modifier: i32) -> Self {
        Self {
            natural: rng.random_range(1..=INITIATIVE_DIE),
            modifier,
        }
    }

    /// Initiative value stored on the combatant, saturating at the i32 range
    pub fn total(&self) -> i32 {
        self.natural.saturating_add(self.modifier)
    }
}

/// Ability modifier for a score: floor((score - 10) / 2)
pub fn ability_modifier(score: i32) -> i32 {
    // Half of any i32 minus 10 fits back into i32
    (i64::from(score) - 10).div_euclid(2) as i32
}

/// Modifier for an optional score, 0 when the score is unknown
pub fn modifier_from_score(score: Option<i32>) -> i32 {
    score.map(ability_modifier).unwrap_or(0)
}
