//! # lamco-screen-coordinator
//!
//! Screen session coordination for multi-panel and foldable devices.
//!
//! Maps physical output surfaces to stable logical screen ids, groups
//! screens into mirror/extend/unique topologies, and sequences display power
//! transitions across concurrent hardware and user-initiated events.
//!
//! # Architecture
//!
//! ```text
//! lamco-screen-coordinator
//!   ├─> IdentityMapper          physical surface <-> logical screen ids
//!   ├─> SessionRegistry         screen sessions, keyed by logical id
//!   ├─> GroupingEngine          mirror / extend / unique groups
//!   ├─> PowerStateMachine       on / off / suspend / doze transitions
//!   │     └─> DeviceSequencer   standard / foldable / dual panel
//!   └─> MultiScreenCoordinator  serialized topology changes
//! ```
//!
//! # Data Flow
//!
//! **Hardware Path:** driver event → ScreenSessionManager → registry + groups → client notification
//!
//! **Power Path:** caller → PowerController → power executor → state machine → render service
//!
//! **Topology Path:** caller → coordinator (global lock) → groups + general executor → render service

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Coordinator configuration
pub mod config;

/// Error types
pub mod error;

/// Serialized task executors
pub mod executor;

/// Hardware event feed and component wiring
pub mod manager;

/// Mirror/extend mode changes and topology persistence
pub mod multiscreen;

/// Client notification channel
pub mod notify;

/// Display power state machine and sequencing
pub mod power;

/// Render service call channel
pub mod render;

/// JSON scenario replay
pub mod scenario;

/// Screen sessions, identity mapping and groups
pub mod screen;

/// Utility functions
pub mod utils;

pub use error::{Result, ScreenError};
pub use manager::{HardwareEvent, ScreenSessionManager};
