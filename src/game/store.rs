//! Authoritative player state store

use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{InputState, PlayerId};

/// Coordinates as they appear on the wire
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A full copy of the store at one instant, keyed by player id
pub type Snapshot = BTreeMap<PlayerId, Position>;

/// Player state (authoritative)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerState {
    pub id: PlayerId,
    pub x: f64,
    pub y: f64,
}

impl PlayerState {
    pub fn new(id: PlayerId, x: f64, y: f64) -> Self {
        Self { id, x, y }
    }

    pub fn position(&self) -> Position {
        Position {
            x: self.x,
            y: self.y,
        }
    }

    /// Apply one input message using the discrete step rule
    pub fn apply(&mut self, input: &InputState, step: f64) {
        let (dx, dy) = input.displacement(step);
        self.x += dx;
        self.y += dy;
    }
}

/// Mapping of player id to state.
///
/// Every operation takes the same lock, so inserts, moves, removals and
/// snapshots are serialized against each other. The lock is never held
/// across an await point and no references escape it.
#[derive(Debug, Default)]
pub struct PlayerStore {
    players: Mutex<HashMap<PlayerId, PlayerState>>,
}

impl PlayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new player. Returns false if the id is already present.
    pub fn insert(&self, state: PlayerState) -> bool {
        self.insert_and_snapshot(state).is_some()
    }

    /// Insert a new player and copy the resulting store under the same lock.
    /// Returns None if the id is already present.
    pub fn insert_and_snapshot(&self, state: PlayerState) -> Option<Snapshot> {
        let mut players = self.players.lock();
        if players.contains_key(&state.id) {
            return None;
        }
        players.insert(state.id, state);
        Some(Self::collect(&players))
    }

    pub fn remove(&self, id: &PlayerId) -> Option<PlayerState> {
        self.players.lock().remove(id)
    }

    /// Move a player by one input message.
    ///
    /// Unknown ids are ignored and yield None; input can legitimately arrive
    /// after the sender has been removed.
    pub fn apply_input(&self, id: &PlayerId, input: &InputState, step: f64) -> Option<Position> {
        let mut players = self.players.lock();
        let player = players.get_mut(id)?;
        player.apply(input, step);
        Some(player.position())
    }

    pub fn get(&self, id: &PlayerId) -> Option<PlayerState> {
        self.players.lock().get(id).copied()
    }

    pub fn contains(&self, id: &PlayerId) -> bool {
        self.players.lock().contains_key(id)
    }

    /// Consistent copy of every player's position
    pub fn snapshot(&self) -> Snapshot {
        Self::collect(&self.players.lock())
    }

    pub fn ids(&self) -> Vec<PlayerId> {
        self.players.lock().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.players.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.lock().is_empty()
    }

    fn collect(players: &HashMap<PlayerId, PlayerState>) -> Snapshot {
        players
            .values()
            .map(|p| (p.id, p.position()))
            .collect()
    }
}
