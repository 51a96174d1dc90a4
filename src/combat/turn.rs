//! Turn sequencing
//!
//! The initiative order is a stable sort of the store, highest initiative
//! first, with unset initiatives treated as
//! [`UNSET_INITIATIVE`](super::combatant::UNSET_INITIATIVE) so they sink
//! to the bottom in insertion order.
//!
//! `turn_index` is a position in that order, not a combatant identity. Any
//! change to membership or initiative can move who sits at that position, and
//! round wraparound is detected by comparing positions only.

use tracing::debug;

use super::combatant::Combatant;

/// Derive the initiative order from insertion-ordered combatants
pub fn initiative_order(combatants: &[Combatant]) -> Vec<&Combatant> {
    let mut ordered: Vec<&Combatant> = combatants.iter().collect();
    // sort_by is stable, so equal initiatives keep insertion order
    ordered.sort_by(|a, b| b.effective_initiative().cmp(&a.effective_initiative()));
    ordered
}

/// Round counter and active position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnState {
    /// Current round, never below 1
    pub round: u32,
    /// Position of the active combatant in the initiative order
    pub turn_index: usize,
}

impl Default for TurnState {
    fn default() -> Self {
        Self {
            round: 1,
            turn_index: 0,
        }
    }
}

impl TurnState {
    pub fn new(round: u32, turn_index: usize) -> Self {
        Self {
            round: round.max(1),
            turn_index,
        }
    }

    /// Combatant whose turn it is, if the position is in range
    pub fn current<'a>(&self, ordered: &[&'a Combatant]) -> Option<&'a Combatant> {
        ordered.get(self.turn_index).copied()
    }

    /// Jump to the first combatant with a set initiative, or the top of the
    /// order when nobody has rolled. No-op on an empty order.
    pub fn jump_to_top(&mut self, ordered: &[&Combatant]) {
        if ordered.is_empty() {
            return;
        }
        self.turn_index = ordered
            .iter()
            .position(|c| c.has_initiative())
            .unwrap_or(0);
    }

    /// Move to the next combatant with a set initiative, bumping the round
    /// when the position wraps. Returns false on an empty order.
    pub fn advance(&mut self, ordered: &[&Combatant]) -> bool {
        let count = ordered.len();
        if count == 0 {
            return false;
        }

        let mut next = (self.turn_index % count + 1) % count;
        let mut guard = 0;
        while !ordered[next].has_initiative() && guard < count {
            next = (next + 1) % count;
            guard += 1;
        }

        if next <= self.turn_index {
            self.round = self.round.saturating_add(1);
            debug!("Round {} begins", self.round);
        }
        self.turn_index = next;
        true
    }

    /// Move to the previous combatant with a set initiative, dropping the
    /// round (not below 1) when the position wraps backwards. Returns false
    /// on an empty order.
    pub fn retreat(&mut self, ordered: &[&Combatant]) -> bool {
        let count = ordered.len();
        if count == 0 {
            return false;
        }

        let mut prev = (self.turn_index % count + count - 1) % count;
        let mut guard = 0;
        while !ordered[prev].has_initiative() && guard < count {
            prev = (prev + count - 1) % count;
            guard += 1;
        }

        if prev > self.turn_index {
            self.round = self.round.saturating_sub(1).max(1);
        }
        self.turn_index = prev;
        true
    }
}
