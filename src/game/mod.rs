//! Synchronization engine: player store, input rule, connections and broadcast

pub mod broadcast;
pub mod engine;
pub mod input;
pub mod registry;
pub mod store;

pub use broadcast::run_broadcast_loop;
pub use engine::SyncEngine;
pub use input::InputState;
pub use registry::{ConnectionRegistry, DeliveryError, Outbound};
pub use store::{PlayerState, PlayerStore, Position, Snapshot};

use uuid::Uuid;

/// Opaque per-connection identifier
pub type PlayerId = Uuid;
