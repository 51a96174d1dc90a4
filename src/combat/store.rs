//! Combatant store
//!
//! Canonical, insertion-ordered collection of combatants. The initiative
//! order is derived from it on demand and never stored.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::combatant::Combatant;
use super::dice::InitiativeRoll;

/// Insertion-ordered combatant collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CombatantStore {
    combatants: Vec<Combatant>,
}

impl CombatantStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from persisted records, dropping repeated identifiers
    pub fn from_vec(combatants: Vec<Combatant>) -> Self {
        let mut store = Self::new();
        for c in combatants {
            store.push(c);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.combatants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combatants.is_empty()
    }

    /// Combatants in insertion order
    pub fn as_slice(&self) -> &[Combatant] {
        &self.combatants
    }

    pub fn iter(&self) -> impl Iterator<Item = &Combatant> {
        self.combatants.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Combatant> {
        self.combatants.iter_mut().find(|c| c.id() == id)
    }

    /// Append a combatant. Returns false, leaving the store untouched, when
    /// the identifier is already taken.
    pub fn push(&mut self, combatant: Combatant) -> bool {
        if self.contains(combatant.id()) {
            debug!("Ignoring duplicate combatant {}", combatant.id());
            return false;
        }
        self.combatants.push(combatant);
        true
    }

    /// Delete a combatant. Returns whether it was present.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.combatants.len();
        self.combatants.retain(|c| c.id() != id);
        self.combatants.len() != before
    }

    /// Set or clear initiative, without bounds checking
    pub fn set_initiative(&mut self, id: &str, value: Option<i32>) -> bool {
        match self.get_mut(id) {
            Some(c) => {
                c.initiative = value;
                true
            }
            None => false,
        }
    }

    /// Roll d20 + dex modifier for one combatant
    pub fn roll_initiative<R: Rng + ?Sized>(&mut self, id: &str, rng: &mut R) -> Option<i32> {
        let c = self.get_mut(id)?;
        let total = InitiativeRoll::roll_with(rng, c.dex_mod()).total();
        c.initiative = Some(total);
        Some(total)
    }

    /// Roll initiative for every monster. Returns how many were rolled.
    pub fn roll_all_monsters<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        let mut rolled = 0;
        for c in self.combatants.iter_mut().filter(|c| c.is_monster()) {
            c.initiative = Some(InitiativeRoll::roll_with(rng, c.dex_mod()).total());
            rolled += 1;
        }
        rolled
    }

    /// Damage a combatant with hit points
    pub fn damage(&mut self, id: &str, amount: i32) -> bool {
        self.get_mut(id).is_some_and(|c| c.take_damage(amount))
    }

    /// Heal a combatant with hit points
    pub fn heal(&mut self, id: &str, amount: i32) -> bool {
        self.get_mut(id).is_some_and(|c| c.heal(amount))
    }

    /// Set or clear the free-text note
    pub fn set_note(&mut self, id: &str, note: Option<String>) -> bool {
        match self.get_mut(id) {
            Some(c) => {
                c.note = note.filter(|n| !n.trim().is_empty());
                true
            }
            None => false,
        }
    }
}
