//! Combat session
//!
//! The session exclusively owns the combatant store, the round counter and
//! the turn position. It is loaded once with [`CombatSession::init`] and
//! written back with [`CombatSession::flush`] after each mutation; both are
//! best-effort and never fail the caller.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::combat::{
    generate_monster_id, initiative_order, CharacterRecord, Combatant, CombatantStore,
    MonsterRecord, TurnState,
};
use crate::db::Database;

/// Persisted form of the whole session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(default)]
    pub combatants: Vec<Combatant>,
    /// Zero or missing loads as round 1
    #[serde(default)]
    pub round: u32,
    #[serde(default)]
    pub turn_index: usize,
}

/// One row of the initiative order as shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderedEntry {
    #[serde(flatten)]
    pub combatant: Combatant,
    pub is_turn: bool,
}

/// Read model for the rendering layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub round: u32,
    pub turn_index: usize,
    pub current_id: Option<String>,
    pub ordered: Vec<OrderedEntry>,
}

/// Single-owner combat session
#[derive(Debug, Clone, Default)]
pub struct CombatSession {
    store: CombatantStore,
    turn: TurnState,
    dirty: bool,
}

impl CombatSession {
    /// Empty session at round 1
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: SessionSnapshot) -> Self {
        Self {
            store: CombatantStore::from_vec(snapshot.combatants),
            turn: TurnState::new(snapshot.round, snapshot.turn_index),
            dirty: false,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            combatants: self.store.as_slice().to_vec(),
            round: self.turn.round,
            turn_index: self.turn.turn_index,
        }
    }

    /// Load the persisted session, falling back to defaults when nothing is
    /// stored or the stored data cannot be read.
    pub async fn init(db: &Database) -> Self {
        match db.load_snapshot().await {
            Ok(Some(snapshot)) => {
                let session = Self::from_snapshot(snapshot);
                info!(
                    "Restored combat session: {} combatants, round {}",
                    session.store.len(),
                    session.turn.round
                );
                session
            }
            Ok(None) => {
                info!("No saved combat session, starting fresh");
                Self::new()
            }
            Err(e) => {
                warn!("Failed to load combat session, starting fresh: {}", e);
                Self::new()
            }
        }
    }

    /// Persist the session if it changed since the last flush. Save errors
    /// are logged and the session stays dirty so the next flush retries.
    pub async fn flush(&mut self, db: &Database) -> bool {
        if !self.dirty {
            return false;
        }
        match db.save_snapshot(&self.snapshot()).await {
            Ok(()) => {
                self.dirty = false;
                true
            }
            Err(e) => {
                warn!("Failed to save combat session: {}", e);
                false
            }
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn round(&self) -> u32 {
        self.turn.round
    }

    pub fn turn_index(&self) -> usize {
        self.turn.turn_index
    }

    pub fn store(&self) -> &CombatantStore {
        &self.store
    }

    pub fn get(&self, id: &str) -> Option<&Combatant> {
        self.store.get(id)
    }

    /// Combatants sorted by initiative
    pub fn ordered(&self) -> Vec<&Combatant> {
        initiative_order(self.store.as_slice())
    }

    /// Combatant at the active position
    pub fn current(&self) -> Option<&Combatant> {
        self.turn.current(&self.ordered())
    }

    pub fn view(&self) -> SessionView {
        let ordered = self.ordered();
        let current_id = self.turn.current(&ordered).map(|c| c.id().to_string());
        let ordered = ordered
            .into_iter()
            .map(|c| OrderedEntry {
                is_turn: current_id.as_deref() == Some(c.id()),
                combatant: c.clone(),
            })
            .collect();

        SessionView {
            round: self.turn.round,
            turn_index: self.turn.turn_index,
            current_id,
            ordered,
        }
    }

    /// Add a fetched character. Returns false if the id is already present.
    pub fn add_character(&mut self, record: CharacterRecord) -> bool {
        let id = record.id.clone();
        let added = self.store.push(Combatant::character(record));
        if added {
            info!("Added character {}", id);
            self.dirty = true;
        }
        added
    }

    /// Add a monster under a freshly generated id, which is returned
    pub fn add_monster(&mut self, record: MonsterRecord) -> String {
        let id = generate_monster_id();
        info!("Added monster {} ({})", record.name, id);
        self.store.push(Combatant::monster(id.clone(), record));
        self.dirty = true;
        id
    }

    /// Remove a combatant. The turn position always resets to the top.
    pub fn remove(&mut self, id: &str) -> bool {
        let removed = self.store.remove(id);
        if removed {
            info!("Removed combatant {}", id);
        }
        self.turn.turn_index = 0;
        self.dirty = true;
        removed
    }

    pub fn set_initiative(&mut self, id: &str, value: Option<i32>) -> bool {
        self.dirty = true;
        self.store.set_initiative(id, value)
    }

    pub fn roll_initiative(&mut self, id: &str) -> Option<i32> {
        self.dirty = true;
        let total = self.store.roll_initiative(id, &mut rand::rng());
        if let Some(total) = total {
            debug!("{} rolled initiative {}", id, total);
        }
        total
    }

    pub fn roll_all_monsters(&mut self) -> usize {
        self.dirty = true;
        let rolled = self.store.roll_all_monsters(&mut rand::rng());
        debug!("Rolled initiative for {} monsters", rolled);
        rolled
    }

    pub fn damage(&mut self, id: &str, amount: i32) -> bool {
        self.dirty = true;
        self.store.damage(id, amount)
    }

    pub fn heal(&mut self, id: &str, amount: i32) -> bool {
        self.dirty = true;
        self.store.heal(id, amount)
    }

    pub fn set_note(&mut self, id: &str, note: Option<String>) -> bool {
        self.dirty = true;
        self.store.set_note(id, note)
    }

    /// Point the turn at the highest rolled combatant
    pub fn sort_and_jump_to_top(&mut self) {
        let ordered = initiative_order(self.store.as_slice());
        self.turn.jump_to_top(&ordered);
        self.dirty = true;
    }

    /// Next turn
    pub fn advance_turn(&mut self) -> bool {
        let ordered = initiative_order(self.store.as_slice());
        let moved = self.turn.advance(&ordered);
        self.dirty |= moved;
        moved
    }

    /// Previous turn
    pub fn retreat_turn(&mut self) -> bool {
        let ordered = initiative_order(self.store.as_slice());
        let moved = self.turn.retreat(&ordered);
        self.dirty |= moved;
        moved
    }
}
