//! Session lifecycle and message dispatch for the synchronization engine

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::config::{Config, SpawnArea};
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

use super::{
    ConnectionRegistry, InputState, Outbound, PlayerId, PlayerState, PlayerStore, Position,
};

/// Owns the player store and the connection registry and applies every
/// lifecycle event, input message and broadcast tick to them.
///
/// Joins, leaves and ticks are serialized by `sequencer`, so every queue sees
/// notices and snapshots in the order the store changed. Input only takes the
/// store lock.
pub struct SyncEngine {
    store: PlayerStore,
    registry: ConnectionRegistry,
    sequencer: Mutex<()>,
    step_speed: f64,
    spawn_area: SpawnArea,
    outbound_queue: usize,
    rng: Mutex<ChaCha8Rng>,
    tick: AtomicU64,
}

impl SyncEngine {
    pub fn new(config: &Config) -> Self {
        let rng = match config.spawn_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::seed_from_u64(rand::random()),
        };

        Self {
            store: PlayerStore::new(),
            registry: ConnectionRegistry::new(),
            sequencer: Mutex::new(()),
            step_speed: config.step_speed,
            spawn_area: config.spawn_area,
            outbound_queue: config.outbound_queue,
            rng: Mutex::new(rng),
            tick: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &PlayerStore {
        &self.store
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn step_speed(&self) -> f64 {
        self.step_speed
    }

    /// Number of broadcast ticks run so far
    pub fn current_tick(&self) -> u64 {
        self.tick.load(Ordering::Relaxed)
    }

    /// Create an outbound queue sized for one connection
    pub fn outbound_channel(&self) -> (mpsc::Sender<Outbound>, mpsc::Receiver<Outbound>) {
        mpsc::channel(self.outbound_queue)
    }

    /// Draw a spawn point uniformly from the configured area
    pub fn spawn_position(&self) -> (f64, f64) {
        let mut rng = self.rng.lock();
        let x = rng.gen_range(0.0..self.spawn_area.width);
        let y = rng.gen_range(0.0..self.spawn_area.height);
        (x, y)
    }

    /// Handle a new connection.
    ///
    /// Creates the player, queues the full world for the newcomer on `tx`,
    /// registers `tx` and announces the player to everyone else.
    pub fn connect(&self, tx: mpsc::Sender<Outbound>) -> PlayerId {
        let (x, y) = self.spawn_position();
        let seq = self.sequencer.lock();

        let (player, players) = loop {
            let player = PlayerState::new(Uuid::new_v4(), x, y);
            match self.store.insert_and_snapshot(player) {
                Some(snapshot) => break (player, snapshot),
                None => warn!(player_id = %player.id, "Generated id already in use, retrying"),
            }
        };
        let id = player.id;

        let welcome = Arc::new(ServerMsg::CurrentPlayers {
            your_id: id,
            players,
        });
        if let Err(e) = tx.try_send(welcome) {
            warn!(player_id = %id, error = %e, "Failed to queue initial snapshot");
        }

        if !self.registry.register(id, tx) {
            warn!(player_id = %id, "Connection already registered");
        }

        let notice = Arc::new(ServerMsg::NewPlayer {
            id,
            x: player.x,
            y: player.y,
        });
        let notified = self.registry.broadcast_except(&id, &notice);
        let player_count = self.store.len();
        drop(seq);

        info!(
            player_id = %id,
            x = player.x,
            y = player.y,
            notified,
            player_count,
            "Player connected"
        );

        id
    }

    /// Handle a closed connection. Unknown ids are a no-op.
    ///
    /// Returns true if a player was removed.
    pub fn disconnect(&self, id: &PlayerId) -> bool {
        let seq = self.sequencer.lock();
        self.registry.unregister(id);

        if self.store.remove(id).is_none() {
            debug!(player_id = %id, "Disconnect for unknown player ignored");
            return false;
        }

        let notice = Arc::new(ServerMsg::PlayerDisconnected { id: *id });
        let notified = self.registry.broadcast(&notice);
        let player_count = self.store.len();
        drop(seq);

        info!(
            player_id = %id,
            notified,
            player_count,
            "Player disconnected"
        );
        true
    }

    /// Dispatch one decoded client message from connection `id`
    pub fn handle_message(&self, id: &PlayerId, msg: ClientMsg) {
        match msg {
            ClientMsg::PlayerInput(input) => {
                self.apply_input(id, &input);
            }
            ClientMsg::PlayerStateUpdate { input_state } => {
                if self.store.contains(id) {
                    debug!(player_id = %id, ?input_state, "Received state update");
                }
            }
            ClientMsg::Ping { t } => {
                let pong = Arc::new(ServerMsg::Pong {
                    t,
                    server_time: unix_millis(),
                });
                if let Err(e) = self.registry.send_to(id, pong) {
                    debug!(player_id = %id, error = %e, "Failed to queue pong");
                }
            }
        }
    }

    /// Move a player by one input message. Input for unknown ids is dropped.
    pub fn apply_input(&self, id: &PlayerId, input: &InputState) -> Option<Position> {
        let moved = self.store.apply_input(id, input, self.step_speed);
        match moved {
            Some(pos) => trace!(player_id = %id, x = pos.x, y = pos.y, "Applied input"),
            None => debug!(player_id = %id, "Input for unknown player discarded"),
        }
        moved
    }

    /// Run one broadcast tick: snapshot the store and queue it for every
    /// connection. Returns the tick number.
    pub fn broadcast_tick(&self) -> u64 {
        let seq = self.sequencer.lock();
        let tick = self.tick.fetch_add(1, Ordering::Relaxed) + 1;
        let players = self.store.snapshot();
        let player_count = players.len();

        let msg = Arc::new(ServerMsg::StateUpdate { tick, players });
        let delivered = self.registry.broadcast(&msg);
        drop(seq);

        trace!(tick, player_count, delivered, "Broadcast tick");
        tick
    }
}
