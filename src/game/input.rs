//! Directional input and the discrete step movement rule

use serde::{Deserialize, Serialize};

/// Directional intent submitted by a client. Flags are independent, so
/// diagonals are expressed as e.g. `up + left`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl InputState {
    /// Displacement produced by one input message.
    ///
    /// Opposing flags cancel algebraically. The step is fixed per message and
    /// does not depend on elapsed time.
    pub fn displacement(&self, step: f64) -> (f64, f64) {
        let mut dx = 0.0;
        let mut dy = 0.0;

        if self.left {
            dx -= step;
        }
        if self.right {
            dx += step;
        }
        if self.up {
            dy -= step;
        }
        if self.down {
            dy += step;
        }

        (dx, dy)
    }
}
