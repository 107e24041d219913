//! Power controller
//!
//! Synchronous entry points callable from any thread. Each one pushes its
//! event onto the power executor and waits for the result with a bounded
//! call timeout. A timeout is logged and the caller gets `false`, but the
//! queued event is not withdrawn: it still runs on the power executor, in
//! order, once the jobs ahead of it finish.
//!
//! The screen-off and screen-on acknowledgment waits happen on the caller's
//! thread before the event is queued, so the power executor never blocks on
//! an acknowledgment.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::gate::{AckGate, CancelOutcome, GateResult, OffGate};
use super::machine::{LowPowerAck, LowPowerFlag, PowerContext, PowerStateMachine};
use super::sequencer::{sequencer_for, FoldState};
use super::state::{DisplayState, PowerEvent, PowerReason, ScreenPowerState, TransitionState};
use crate::config::{DeviceConfig, PowerConfig};
use crate::error::Result;
use crate::executor::{ExecutorHandle, SerialExecutor};
use crate::notify::{ClientEvent, DisplayPowerEvent, EventStatus, NotificationHub};
use crate::render::{register_with_retry, PowerCallback, PowerStatus, RenderService};
use crate::screen::{PhysicalSurfaceId, SessionRegistry};
use crate::utils::PowerDiagnostics;

/// Forwards render-service suspend acknowledgments to the machine
struct SuspendAckForwarder {
    power: ExecutorHandle<PowerStateMachine>,
}

impl PowerCallback for SuspendAckForwarder {
    fn on_power_status(&self, physical: PhysicalSurfaceId, status: PowerStatus) {
        if status == PowerStatus::Suspend {
            debug!("Suspend acknowledged by {}", physical);
            self.power.post(|machine| {
                machine.on_suspend_ack();
            });
        }
    }
}

/// Public power API
pub struct PowerController {
    power: SerialExecutor<PowerStateMachine>,
    off_gate: OffGate,
    screen_on_gate: AckGate,
    low_power: Arc<LowPowerFlag>,
    render: Arc<dyn RenderService>,
    notifier: Arc<NotificationHub>,
    diagnostics: Arc<PowerDiagnostics>,
    config: PowerConfig,
}

impl PowerController {
    /// Create the controller and its power executor
    ///
    /// # Arguments
    ///
    /// * `render` - Render service channel
    /// * `registry` - Session registry, source of the connected panels
    /// * `notifier` - Client notification channel
    /// * `diagnostics` - Counters for non-fatal failures
    /// * `device` - Device class and panel ids
    /// * `power` - Timings
    ///
    /// # Errors
    ///
    /// Returns error if the power executor cannot be started
    pub fn new(
        render: Arc<dyn RenderService>,
        registry: Arc<SessionRegistry>,
        notifier: Arc<NotificationHub>,
        diagnostics: Arc<PowerDiagnostics>,
        device: &DeviceConfig,
        power: &PowerConfig,
    ) -> Result<Self> {
        let low_power = Arc::new(LowPowerFlag::new());
        let ctx = PowerContext::new(
            Arc::clone(&render),
            registry,
            Arc::clone(&notifier),
            Arc::clone(&diagnostics),
            Arc::clone(&low_power),
            power.low_power_ack_timeout(),
        );
        let machine = PowerStateMachine::new(ctx, sequencer_for(device, power));
        let executor = SerialExecutor::new("power", machine)?;
        let handle = executor.handle();
        executor.post(move |machine| machine.attach_executor(handle));

        info!("Power controller ready ({:?})", device.class);
        Ok(Self {
            power: executor,
            off_gate: OffGate::new(),
            screen_on_gate: AckGate::new(),
            low_power,
            render,
            notifier,
            diagnostics,
            config: power.clone(),
        })
    }

    /// Register for render power reports, retrying with a fixed delay
    ///
    /// Registration runs on the power executor, ahead of any power event
    /// queued after this call. The caller blocks until it succeeds or the
    /// retries are used up.
    pub fn register_render_callback(&self) -> Result<()> {
        let callback = Arc::new(SuspendAckForwarder {
            power: self.power.handle(),
        });
        let render = Arc::clone(&self.render);
        let attempts = self.config.register_retry_count;
        let delay = self.config.register_retry_delay();
        self.power
            .submit(move |_| register_with_retry(render.as_ref(), callback, attempts, delay))
            .wait()?
    }

    fn call<R, F>(&self, what: &str, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut PowerStateMachine) -> R + Send + 'static,
    {
        self.power
            .submit(f)
            .wait_timeout(self.config.call_timeout())
            .map_err(|e| {
                warn!("{} did not complete: {}", what, e);
                e
            })
    }

    fn dispatch(&self, event: PowerEvent, reason: PowerReason) -> bool {
        self.call("power event", move |machine| machine.apply(event, reason))
            .unwrap_or(false)
    }

    /// Wake started; pre-bright reasons take the advanced path
    pub fn wake_up_begin(&self, reason: PowerReason) -> bool {
        self.screen_on_gate.arm();
        let event = match reason {
            PowerReason::PreBright => PowerEvent::WakeBeginAdvanced,
            _ => PowerEvent::WakeBegin,
        };
        self.dispatch(event, reason)
    }

    /// Suspend started
    ///
    /// Waits (bounded) for the screen-off acknowledgment first. Returns
    /// `false` without touching the machine if the screen-off was canceled
    /// in that window.
    pub fn suspend_begin(&self, reason: PowerReason) -> bool {
        self.off_gate.open();
        match self.off_gate.wait(self.config.screen_off_wait()) {
            GateResult::Canceled => {
                info!("Suspend canceled before screen off");
                return false;
            }
            GateResult::TimedOut => debug!("No screen-off acknowledgment, proceeding"),
            GateResult::Proceed => {}
        }
        self.dispatch(PowerEvent::SuspendBegin, reason)
    }

    /// Enter an always-on low-power display state
    pub fn set_display_state(&self, state: DisplayState) -> bool {
        self.low_power.clear();
        self.dispatch(PowerEvent::SetDisplayState(state), PowerReason::Application)
    }

    /// Render service acknowledged suspend
    pub fn power_callback_end(&self) -> bool {
        self.dispatch(PowerEvent::PowerCallbackEnd, PowerReason::Application)
    }

    /// Resynchronize after an out-of-band power on
    pub fn sync_power_on(&self) -> bool {
        self.dispatch(PowerEvent::SyncPowerOn, PowerReason::Application)
    }

    /// Set power for all screens
    ///
    /// Turning on waits (bounded) for the keyguard when a wake armed it.
    pub fn set_screen_power_for_all(&self, state: ScreenPowerState, reason: PowerReason) -> bool {
        if state == ScreenPowerState::On
            && self.screen_on_gate.wait(self.config.screen_on_wait()) == GateResult::TimedOut
        {
            warn!("Keyguard not drawn in time, turning screens on anyway");
        }
        self.dispatch(PowerEvent::SetAllScreensPower(state), reason)
    }

    /// Direct power on (legacy path, only before the first event)
    pub fn power_on_directly(&self, reason: PowerReason) -> bool {
        self.dispatch(PowerEvent::PowerOn, reason)
    }

    /// Direct power off (legacy path, only before the first event)
    pub fn power_off_directly(&self, reason: PowerReason) -> bool {
        self.dispatch(PowerEvent::PowerOff, reason)
    }

    /// Cold-boot power on
    pub fn boot_power_on(&self) -> bool {
        self.call("boot power on", |machine| machine.boot_power_on())
            .unwrap_or(false)
    }

    /// Cancel a pending screen-off
    ///
    /// Only possible between suspend-begin and the screen-off acknowledgment.
    pub fn cancel_screen_off(&self) -> bool {
        match self.off_gate.cancel() {
            CancelOutcome::NotPending => {
                debug!("No screen-off to cancel");
                false
            }
            outcome => {
                debug!("Screen-off cancel: {:?}", outcome);
                self.diagnostics.record_canceled_screen_off();
                self.notifier.notify(ClientEvent::PowerStatusChanged {
                    event: DisplayPowerEvent::DisplayOffCanceled,
                    status: EventStatus::End,
                    reason: PowerReason::Application,
                });
                true
            }
        }
    }

    /// Screen-off acknowledgment from the lock screen
    pub fn notify_screen_off_ack(&self) {
        self.off_gate.ack();
    }

    /// Keyguard drawn, screens may turn on
    pub fn notify_keyguard_drawn(&self) {
        self.screen_on_gate.signal();
    }

    /// Always-on subsystem reported its low-power result
    pub fn on_low_power_result(&self, success: bool) {
        self.low_power.set(if success {
            LowPowerAck::Success
        } else {
            LowPowerAck::Fail
        });
        self.power.post(|machine| {
            machine.on_low_power_result();
        });
    }

    /// Hinge state changed
    pub fn set_fold_state(&self, fold: FoldState) -> bool {
        self.call("fold state", move |machine| machine.set_fold_state(fold))
            .is_ok()
    }

    /// Current transition state, `None` if the executor did not answer
    pub fn state(&self) -> Option<TransitionState> {
        self.call("state query", |machine| machine.state()).ok()
    }

    /// Counters for non-fatal power failures
    pub fn diagnostics(&self) -> &Arc<PowerDiagnostics> {
        &self.diagnostics
    }
}
