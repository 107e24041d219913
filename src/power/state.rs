//! Power transition table
//!
//! Pure data: the states, the events and which state an event leads to. The
//! side effects of entering a state live in [`super::machine`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Transition state of the power state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionState {
    /// Legacy direct path; left on the first event
    Init,
    /// Panels on
    On,
    /// Panels off
    Off,
    /// Dual-panel boot handoff
    OffFake,
    /// Waiting for the render service's suspend acknowledgment
    Suspend,
    /// Always-on low power
    Doze,
    /// Always-on low power, suspended
    DozeSuspend,
    /// Pre-bright on
    AdvancedOn,
    /// Pre-bright authentication failed
    AdvancedOff,
    /// Pre-bright wake started, full wake not completed
    WaitAdvancedOnReady,
    /// Waiting for the always-on subsystem to acknowledge low power
    WaitLowPowerAck,
}

impl fmt::Display for TransitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransitionState::Init => "init",
            TransitionState::On => "on",
            TransitionState::Off => "off",
            TransitionState::OffFake => "off_fake",
            TransitionState::Suspend => "suspend",
            TransitionState::Doze => "doze",
            TransitionState::DozeSuspend => "doze_suspend",
            TransitionState::AdvancedOn => "advanced_on",
            TransitionState::AdvancedOff => "advanced_off",
            TransitionState::WaitAdvancedOnReady => "wait_advanced_on_ready",
            TransitionState::WaitLowPowerAck => "wait_low_power_ack",
        };
        f.write_str(name)
    }
}

/// Target display state of a `SetDisplayState` request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayState {
    /// Always-on low power
    Doze,
    /// Always-on low power, suspended
    DozeSuspend,
}

/// Power target for all screens at once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenPowerState {
    /// All on
    On,
    /// All off
    Off,
}

/// Why a power change was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerReason {
    /// Power key press
    PowerKey,
    /// Application or system request
    #[default]
    Application,
    /// Inactivity timeout
    Timeout,
    /// Pre-bright wake started
    PreBright,
    /// Pre-bright authentication succeeded
    PreBrightAuthSuccess,
    /// Pre-bright authentication failed
    PreBrightAuthFail,
    /// Cold boot
    Boot,
    /// Fold/unfold panel switch
    FoldSwitch,
    /// Always-on subsystem did not acknowledge in time
    LowPowerTimeout,
}

impl fmt::Display for PowerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Event processed by the power state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "event", content = "value", rename_all = "snake_case")]
pub enum PowerEvent {
    /// Wake started
    WakeBegin,
    /// Pre-bright wake started
    WakeBeginAdvanced,
    /// Suspend started
    SuspendBegin,
    /// Enter an always-on low-power display state
    SetDisplayState(DisplayState),
    /// Direct power on (only valid in `Init`)
    PowerOn,
    /// Direct power off (only valid in `Init`)
    PowerOff,
    /// Always-on subsystem entered low power
    LowPowerEnterSuccess,
    /// Always-on subsystem failed to enter low power
    LowPowerEnterFail,
    /// Render service acknowledged suspend
    PowerCallbackEnd,
    /// Power was turned on out of band, resynchronize
    SyncPowerOn,
    /// Set power for all screens
    SetAllScreensPower(ScreenPowerState),
}

impl fmt::Display for PowerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

fn display_target(state: DisplayState) -> TransitionState {
    match state {
        DisplayState::Doze => TransitionState::Doze,
        DisplayState::DozeSuspend => TransitionState::DozeSuspend,
    }
}

/// State reached by the first event, which always takes the direct path
pub fn init_target(event: PowerEvent) -> TransitionState {
    use PowerEvent as E;
    use TransitionState as S;

    match event {
        E::WakeBegin | E::PowerOn | E::SyncPowerOn | E::SetAllScreensPower(ScreenPowerState::On) => {
            S::On
        }
        E::WakeBeginAdvanced => S::AdvancedOn,
        E::SetDisplayState(state) => display_target(state),
        E::LowPowerEnterSuccess => S::Doze,
        E::SuspendBegin
        | E::PowerOff
        | E::LowPowerEnterFail
        | E::PowerCallbackEnd
        | E::SetAllScreensPower(ScreenPowerState::Off) => S::Off,
    }
}

/// Next state for `event` in `state`, or `None` if the pair is invalid
///
/// `pending` is the display state recorded by an earlier `SetDisplayState`;
/// it decides where a suspend acknowledgment and a low-power success lead.
pub fn next_state(
    state: TransitionState,
    event: PowerEvent,
    pending: Option<DisplayState>,
) -> Option<TransitionState> {
    use PowerEvent as E;
    use ScreenPowerState as P;
    use TransitionState as S;

    if state == S::Init {
        return Some(init_target(event));
    }

    let next = match (state, event) {
        (_, E::PowerOn | E::PowerOff) => return None,

        (S::Off, E::SuspendBegin) => S::Off,
        (S::OffFake, E::SuspendBegin) => return None,
        (_, E::SuspendBegin) => S::Suspend,

        (_, E::SetAllScreensPower(P::Off)) => match state {
            S::AdvancedOn | S::WaitAdvancedOnReady => S::AdvancedOff,
            _ => S::Off,
        },

        (S::On, E::WakeBegin | E::SyncPowerOn | E::SetAllScreensPower(P::On)) => S::On,
        (S::On, E::SetDisplayState(_)) => S::Suspend,

        (S::Off, E::WakeBegin | E::SyncPowerOn | E::SetAllScreensPower(P::On)) => S::On,
        (S::Off, E::WakeBeginAdvanced) => S::AdvancedOn,
        (S::Off, E::SetDisplayState(target)) => display_target(target),

        (S::OffFake, E::SyncPowerOn | E::WakeBegin | E::SetAllScreensPower(P::On)) => S::On,

        (S::Suspend, E::WakeBegin | E::SetAllScreensPower(P::On)) => S::On,
        (S::Suspend, E::WakeBeginAdvanced) => S::AdvancedOn,
        (S::Suspend, E::SetDisplayState(_)) => S::Suspend,
        (S::Suspend, E::PowerCallbackEnd) => match pending {
            Some(_) => S::WaitLowPowerAck,
            None => S::Off,
        },

        (S::WaitLowPowerAck, E::LowPowerEnterSuccess) => {
            display_target(pending.unwrap_or(DisplayState::Doze))
        }
        (S::WaitLowPowerAck, E::LowPowerEnterFail) => S::Off,
        (S::WaitLowPowerAck, E::WakeBegin | E::SetAllScreensPower(P::On)) => S::On,
        (S::WaitLowPowerAck, E::WakeBeginAdvanced) => S::AdvancedOn,

        (S::Doze | S::DozeSuspend, E::WakeBegin | E::SetAllScreensPower(P::On)) => S::On,
        (S::Doze | S::DozeSuspend, E::WakeBeginAdvanced) => S::AdvancedOn,
        (S::Doze | S::DozeSuspend, E::SetDisplayState(target)) => display_target(target),

        (S::AdvancedOn, E::WakeBegin | E::WakeBeginAdvanced) => S::WaitAdvancedOnReady,
        (S::AdvancedOn, E::SetAllScreensPower(P::On) | E::SyncPowerOn) => S::On,

        (S::WaitAdvancedOnReady, E::SetAllScreensPower(P::On) | E::SyncPowerOn) => S::On,

        (S::AdvancedOff, E::WakeBegin | E::SetAllScreensPower(P::On)) => S::On,
        (S::AdvancedOff, E::WakeBeginAdvanced) => S::AdvancedOn,

        _ => return None,
    };
    Some(next)
}
