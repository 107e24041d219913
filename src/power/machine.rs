//! Power state machine
//!
//! # Overview
//!
//! [`PowerStateMachine`] is owned by the power executor: every event is
//! applied from that one thread, so the current state needs no lock and the
//! render-service power calls it issues are strictly ordered.
//!
//! Entering a state performs its side effects (power-status sets through the
//! [`DeviceSequencer`], client notifications). Some states chain further:
//!
//! ```text
//! SetDisplayState(Doze)
//!   On ──> Suspend ──(live status == Suspend)──> PowerCallbackEnd
//!                                                   │
//!            WaitLowPowerAck <──────────────────────┘
//!              ├─ flag Success ──> Doze
//!              ├─ flag Fail    ──> Off
//!              └─ flag Unknown ──> stay, timeout ──> Off
//! ```
//!
//! so one public call may advance the machine through up to three
//! transitions before it returns.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::sequencer::{DeviceSequencer, FoldState};
use super::state::{next_state, DisplayState, PowerEvent, PowerReason, TransitionState};
use crate::config::DeviceClass;
use crate::error::ScreenError;
use crate::executor::ExecutorHandle;
use crate::notify::{ClientEvent, DisplayPowerEvent, EventStatus, NotificationHub};
use crate::render::{PowerStatus, RenderService};
use crate::screen::{PhysicalSurfaceId, SessionRegistry};
use crate::utils::PowerDiagnostics;

/// Low-power acknowledgment reported by the always-on subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LowPowerAck {
    /// Nothing reported yet
    Unknown,
    /// Low power entered
    Success,
    /// Low power failed
    Fail,
}

/// One-shot low-power acknowledgment flag
///
/// Set from any thread, consumed by the machine.
#[derive(Debug, Default)]
pub struct LowPowerFlag(AtomicU8);

impl LowPowerFlag {
    /// Create an unset flag
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an acknowledgment
    pub fn set(&self, ack: LowPowerAck) {
        let value = match ack {
            LowPowerAck::Unknown => 0,
            LowPowerAck::Success => 1,
            LowPowerAck::Fail => 2,
        };
        self.0.store(value, Ordering::SeqCst);
    }

    /// Reset to `Unknown`
    pub fn clear(&self) {
        self.set(LowPowerAck::Unknown);
    }

    /// Consume the flag
    pub fn take(&self) -> LowPowerAck {
        match self.0.swap(0, Ordering::SeqCst) {
            1 => LowPowerAck::Success,
            2 => LowPowerAck::Fail,
            _ => LowPowerAck::Unknown,
        }
    }
}

/// Collaborators used while applying power events
pub struct PowerContext {
    render: Arc<dyn RenderService>,
    registry: Arc<SessionRegistry>,
    notifier: Arc<NotificationHub>,
    diagnostics: Arc<PowerDiagnostics>,
    low_power: Arc<LowPowerFlag>,
    low_power_timeout: Duration,
}

impl PowerContext {
    /// Create a power context
    pub fn new(
        render: Arc<dyn RenderService>,
        registry: Arc<SessionRegistry>,
        notifier: Arc<NotificationHub>,
        diagnostics: Arc<PowerDiagnostics>,
        low_power: Arc<LowPowerFlag>,
        low_power_timeout: Duration,
    ) -> Self {
        Self {
            render,
            registry,
            notifier,
            diagnostics,
            low_power,
            low_power_timeout,
        }
    }

    /// Connected physical panels
    pub fn panels(&self) -> Vec<PhysicalSurfaceId> {
        self.registry.real_in_use_physical_ids()
    }

    /// Set a panel's power status; failures are counted, not returned
    pub fn set_power(&self, physical: PhysicalSurfaceId, status: PowerStatus) -> bool {
        match self.render.set_power_status(physical, status) {
            Ok(()) => {
                debug!("Power status {} -> {}", physical, status);
                true
            }
            Err(e) => {
                warn!("Failed to set {} on {}: {}", status, physical, e);
                self.diagnostics.record_set_failure();
                false
            }
        }
    }

    /// Live power status of a panel
    pub fn status(&self, physical: PhysicalSurfaceId) -> PowerStatus {
        self.render.query_power_status(physical)
    }

    /// Detach a panel's compositor node
    pub fn detach(&self, physical: PhysicalSurfaceId) -> bool {
        match self.render.detach_display_node(physical) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to detach node of {}: {}", physical, e);
                false
            }
        }
    }

    fn notify(&self, event: DisplayPowerEvent, status: EventStatus, reason: PowerReason) {
        self.notifier.notify(ClientEvent::PowerStatusChanged {
            event,
            status,
            reason,
        });
    }
}

/// Power state machine, owned by the power executor
pub struct PowerStateMachine {
    state: TransitionState,
    pending_display: Option<DisplayState>,
    sequencer: Box<dyn DeviceSequencer>,
    ctx: PowerContext,
    low_power_generation: u64,
    executor: Option<ExecutorHandle<PowerStateMachine>>,
}

impl PowerStateMachine {
    /// Create a machine in `Init`
    pub fn new(ctx: PowerContext, sequencer: Box<dyn DeviceSequencer>) -> Self {
        Self {
            state: TransitionState::Init,
            pending_display: None,
            sequencer,
            ctx,
            low_power_generation: 0,
            executor: None,
        }
    }

    /// Executor used to schedule the low-power timeout
    pub fn attach_executor(&mut self, executor: ExecutorHandle<PowerStateMachine>) {
        self.executor = Some(executor);
    }

    /// Current transition state
    pub fn state(&self) -> TransitionState {
        self.state
    }

    /// Display state recorded by the last `SetDisplayState`
    pub fn pending_display_state(&self) -> Option<DisplayState> {
        self.pending_display
    }

    /// Device class of the active sequencer
    pub fn device_class(&self) -> DeviceClass {
        self.sequencer.class()
    }

    /// Apply an event
    ///
    /// Returns `false` when the event is not meaningful in the current state;
    /// the machine then stays where it is.
    pub fn apply(&mut self, event: PowerEvent, reason: PowerReason) -> bool {
        let from = self.state;
        let Some(target) = next_state(from, event, self.pending_display) else {
            let err = ScreenError::InvalidTransition {
                state: from.to_string(),
                event: event.to_string(),
            };
            warn!("{}, ignored", err);
            self.ctx.diagnostics.record_invalid_transition();
            return false;
        };

        if from == TransitionState::Init {
            info!("Power FSM: {} takes the direct path, leaving init", event);
        }
        if let PowerEvent::SetDisplayState(display) = event {
            self.pending_display = Some(display);
        }
        self.enter(from, target, event, reason);
        true
    }

    /// Cold-boot power on
    pub fn boot_power_on(&mut self) -> bool {
        let from = self.state;
        if !matches!(
            from,
            TransitionState::Init | TransitionState::Off | TransitionState::OffFake
        ) {
            warn!("Boot power on ignored in state {}", from);
            self.ctx.diagnostics.record_invalid_transition();
            return false;
        }

        self.ctx
            .notify(DisplayPowerEvent::DisplayOn, EventStatus::Begin, PowerReason::Boot);
        if self.sequencer.uses_boot_handoff() {
            info!("Power FSM: {} -> {} (boot handoff)", from, TransitionState::OffFake);
            self.state = TransitionState::OffFake;
        }
        self.sequencer.on_boot_power_on(&self.ctx);

        info!("Power FSM: {} -> {} (boot)", self.state, TransitionState::On);
        self.state = TransitionState::On;
        self.pending_display = None;
        self.ctx.diagnostics.record_transition();
        self.ctx
            .notify(DisplayPowerEvent::DisplayOn, EventStatus::End, PowerReason::Boot);
        true
    }

    /// Hinge state changed; relights the right panel when on
    pub fn set_fold_state(&mut self, fold: FoldState) {
        self.sequencer.set_fold_state(fold);
        if self.state == TransitionState::On {
            debug!("Reapplying power on after fold change");
            self.sequencer.on_power_on(&self.ctx);
        }
    }

    /// Consume a low-power acknowledgment that arrived while waiting for it
    pub fn on_low_power_result(&mut self) -> bool {
        if self.state != TransitionState::WaitLowPowerAck {
            return false;
        }
        match self.ctx.low_power.take() {
            LowPowerAck::Success => self.apply(PowerEvent::LowPowerEnterSuccess, PowerReason::Application),
            LowPowerAck::Fail => self.apply(PowerEvent::LowPowerEnterFail, PowerReason::Application),
            LowPowerAck::Unknown => false,
        }
    }

    /// Render service acknowledged suspend
    pub fn on_suspend_ack(&mut self) -> bool {
        if self.state != TransitionState::Suspend || !self.suspend_acknowledged() {
            return false;
        }
        self.apply(PowerEvent::PowerCallbackEnd, PowerReason::Application)
    }

    fn on_low_power_timeout(&mut self, generation: u64) {
        if self.state != TransitionState::WaitLowPowerAck || generation != self.low_power_generation {
            return;
        }
        warn!("Low-power acknowledgment timed out, powering all screens off");
        self.ctx.diagnostics.record_low_power_timeout();
        self.apply(
            PowerEvent::SetAllScreensPower(super::ScreenPowerState::Off),
            PowerReason::LowPowerTimeout,
        );
    }

    fn enter(
        &mut self,
        from: TransitionState,
        target: TransitionState,
        event: PowerEvent,
        reason: PowerReason,
    ) {
        self.state = target;
        self.ctx.diagnostics.record_transition();

        let reapply = from != target || matches!(event, PowerEvent::SetAllScreensPower(_));
        if !reapply {
            debug!("Power FSM: stays {} on {}", target, event);
            return;
        }
        info!("Power FSM: {} -> {} on {} ({})", from, target, event, reason);

        match target {
            TransitionState::On => {
                self.pending_display = None;
                self.ctx
                    .notify(DisplayPowerEvent::DisplayOn, EventStatus::Begin, reason);
                self.sequencer.on_power_on(&self.ctx);
                self.ctx
                    .notify(DisplayPowerEvent::DisplayOn, EventStatus::End, reason);
            }
            TransitionState::Off => {
                self.pending_display = None;
                self.ctx
                    .notify(DisplayPowerEvent::DisplayOff, EventStatus::Begin, reason);
                self.sequencer.on_power_off(&self.ctx);
                self.ctx
                    .notify(DisplayPowerEvent::DisplayOff, EventStatus::End, reason);
            }
            TransitionState::AdvancedOn => self.set_active(PowerStatus::OnAdvanced),
            TransitionState::AdvancedOff => self.set_active(PowerStatus::OffAdvanced),
            TransitionState::Doze => {
                self.pending_display = None;
                self.notified_set(DisplayPowerEvent::Doze, PowerStatus::Doze, reason);
            }
            TransitionState::DozeSuspend => {
                self.pending_display = None;
                self.notified_set(DisplayPowerEvent::DozeSuspend, PowerStatus::DozeSuspend, reason);
            }
            TransitionState::Suspend => {
                self.notified_set(DisplayPowerEvent::Suspend, PowerStatus::Suspend, reason);
                if self.suspend_acknowledged() {
                    debug!("Suspend already acknowledged, applying PowerCallbackEnd");
                    self.apply(PowerEvent::PowerCallbackEnd, reason);
                }
            }
            TransitionState::WaitLowPowerAck => self.resolve_low_power(reason),
            TransitionState::WaitAdvancedOnReady | TransitionState::OffFake | TransitionState::Init => {}
        }
    }

    fn set_active(&self, status: PowerStatus) {
        for panel in self.sequencer.active_panels(&self.ctx) {
            self.ctx.set_power(panel, status);
        }
    }

    fn notified_set(&self, event: DisplayPowerEvent, status: PowerStatus, reason: PowerReason) {
        self.ctx.notify(event, EventStatus::Begin, reason);
        self.set_active(status);
        self.ctx.notify(event, EventStatus::End, reason);
    }

    fn suspend_acknowledged(&self) -> bool {
        let panels = self.sequencer.active_panels(&self.ctx);
        !panels.is_empty()
            && panels
                .iter()
                .all(|panel| self.ctx.status(*panel) == PowerStatus::Suspend)
    }

    fn resolve_low_power(&mut self, reason: PowerReason) {
        match self.ctx.low_power.take() {
            LowPowerAck::Success => {
                self.apply(PowerEvent::LowPowerEnterSuccess, reason);
            }
            LowPowerAck::Fail => {
                self.apply(PowerEvent::LowPowerEnterFail, reason);
            }
            LowPowerAck::Unknown => {
                self.low_power_generation += 1;
                let generation = self.low_power_generation;
                match &self.executor {
                    Some(executor) => {
                        debug!(
                            "Waiting up to {:?} for low-power acknowledgment",
                            self.ctx.low_power_timeout
                        );
                        executor.post_after(self.ctx.low_power_timeout, move |machine| {
                            machine.on_low_power_timeout(generation);
                        });
                    }
                    None => debug!("No executor attached, low-power timeout not scheduled"),
                }
            }
        }
    }
}
