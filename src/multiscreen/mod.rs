//! Multi-Screen Modes
//!
//! Mirror/extend transitions between a main and a secondary screen, the
//! relative-position policy for extended pairs, and the persisted topology
//! restored when a known panel reconnects.

mod coordinator;
mod persistence;
mod position;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::screen::Combination;

pub use coordinator::MultiScreenCoordinator;
pub use persistence::{MemorySettingsStore, SettingsStore, TomlSettingsStore, TopologyRecord};
pub use position::{are_screens_touching, default_extend_layout, validated_or_default, PairPositions};

/// Mode of a main/secondary screen pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiScreenMode {
    /// Secondary shows the main screen's content
    Mirror,
    /// Secondary extends the desktop
    Extend,
}

impl MultiScreenMode {
    /// Combination given to the secondary screen
    pub fn combination(self) -> Combination {
        match self {
            MultiScreenMode::Mirror => Combination::Mirror,
            MultiScreenMode::Extend => Combination::Extend,
        }
    }
}

impl fmt::Display for MultiScreenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MultiScreenMode::Mirror => f.write_str("mirror"),
            MultiScreenMode::Extend => f.write_str("extend"),
        }
    }
}
