//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};

use crate::game::{InputState, PlayerId, Snapshot};

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Directional input, sent when the client's key state changes
    PlayerInput(InputState),

    /// Periodic client-side state report. Logged only, never applied.
    PlayerStateUpdate {
        #[serde(default)]
        input_state: InputState,
    },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Full world state, sent once to a newly connected client
    CurrentPlayers {
        /// Id assigned to the receiving connection
        your_id: PlayerId,
        players: Snapshot,
    },

    /// Another client connected
    NewPlayer { id: PlayerId, x: f64, y: f64 },

    /// A client disconnected
    PlayerDisconnected { id: PlayerId },

    /// Periodic full world state (sent every broadcast tick)
    StateUpdate {
        /// Broadcast tick number
        tick: u64,
        players: Snapshot,
    },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
        server_time: u64,
    },
}
