//! Screen Power
//!
//! Power state machine with device-class sequencing.
//!
//! # Architecture
//!
//! ```text
//! PowerController (any thread)
//!   ├─> OffGate / AckGate      bounded acknowledgment waits (caller thread)
//!   └─> SerialExecutor "power"
//!         └─> PowerStateMachine
//!               ├─> transition table (state.rs)
//!               ├─> DeviceSequencer    standard / foldable / dual panel
//!               └─> RenderService      power-status sets, in order
//! ```
//!
//! The machine is an explicitly owned object living on the power executor,
//! not a process-wide global.

mod controller;
mod gate;
mod machine;
mod sequencer;
mod state;

pub use controller::PowerController;
pub use gate::{AckGate, CancelOutcome, GateResult, OffGate};
pub use machine::{LowPowerAck, LowPowerFlag, PowerContext, PowerStateMachine};
pub use sequencer::{
    sequencer_for, DeviceSequencer, DualPanelSequencer, FoldState, FoldableSequencer,
    StandardSequencer,
};
pub use state::{
    init_target, next_state, DisplayState, PowerEvent, PowerReason, ScreenPowerState,
    TransitionState,
};
