//! Device-class power sequencing
//!
//! One [`DeviceSequencer`] is selected at startup from the configured
//! [`DeviceClass`]; the state machine never branches on the device class
//! itself.

use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

use super::machine::PowerContext;
use crate::config::{DeviceClass, DeviceConfig, PowerConfig};
use crate::render::PowerStatus;
use crate::screen::PhysicalSurfaceId;

/// Hinge state of a foldable device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoldState {
    /// Unfolded, inner panel in use
    #[default]
    Expanded,
    /// Folded, outer panel in use
    Folded,
    /// Partially folded, inner panel in use
    HalfFolded,
}

/// Power sequencing strategy for one device class
pub trait DeviceSequencer: Send {
    /// Device class this strategy implements
    fn class(&self) -> DeviceClass;

    /// Panels that follow the machine's state (suspend, doze, pre-bright)
    fn active_panels(&self, ctx: &PowerContext) -> Vec<PhysicalSurfaceId> {
        ctx.panels()
    }

    /// Turn the device's panels on
    fn on_power_on(&mut self, ctx: &PowerContext);

    /// Turn the device's panels off
    fn on_power_off(&mut self, ctx: &PowerContext) {
        for panel in ctx.panels() {
            ctx.set_power(panel, PowerStatus::Off);
        }
    }

    /// Power on along the cold-boot animation path
    fn on_boot_power_on(&mut self, ctx: &PowerContext) {
        self.on_power_on(ctx);
    }

    /// Whether booting passes through the fake-off handoff
    fn uses_boot_handoff(&self) -> bool {
        false
    }

    /// Hinge state changed
    fn set_fold_state(&mut self, _fold: FoldState) {}
}

/// Build the strategy for the configured device
pub fn sequencer_for(device: &DeviceConfig, power: &PowerConfig) -> Box<dyn DeviceSequencer> {
    let pair = match (device.inner_panel, device.outer_panel) {
        (Some(inner), Some(outer)) => Some(PanelPair::new(inner, outer)),
        _ => None,
    };

    match (device.class, pair) {
        (DeviceClass::Foldable, Some(panels)) => Box::new(FoldableSequencer { panels }),
        (DeviceClass::DualPanel, Some(panels)) => Box::new(DualPanelSequencer {
            panels,
            fake_off_delay: power.fake_off_delay(),
        }),
        (class, _) => {
            if class != DeviceClass::Standard {
                debug!("{:?} without panel ids, sequencing as standard", class);
            }
            Box::new(StandardSequencer)
        }
    }
}

/// All panels powered together
#[derive(Debug, Default)]
pub struct StandardSequencer;

impl DeviceSequencer for StandardSequencer {
    fn class(&self) -> DeviceClass {
        DeviceClass::Standard
    }

    fn on_power_on(&mut self, ctx: &PowerContext) {
        for panel in ctx.panels() {
            ctx.set_power(panel, PowerStatus::On);
        }
    }
}

/// Inner/outer panel pair, the fold state decides which one is lit
#[derive(Debug, Clone, Copy)]
struct PanelPair {
    inner: PhysicalSurfaceId,
    outer: PhysicalSurfaceId,
    fold: FoldState,
}

impl PanelPair {
    fn new(inner: PhysicalSurfaceId, outer: PhysicalSurfaceId) -> Self {
        Self {
            inner,
            outer,
            fold: FoldState::default(),
        }
    }

    fn winner(&self) -> PhysicalSurfaceId {
        match self.fold {
            FoldState::Folded => self.outer,
            FoldState::Expanded | FoldState::HalfFolded => self.inner,
        }
    }

    fn loser(&self) -> PhysicalSurfaceId {
        match self.fold {
            FoldState::Folded => self.inner,
            FoldState::Expanded | FoldState::HalfFolded => self.outer,
        }
    }

    fn active(&self, ctx: &PowerContext) -> Vec<PhysicalSurfaceId> {
        let panels = ctx.panels();
        if panels.contains(&self.winner()) {
            vec![self.winner()]
        } else {
            panels
        }
    }

    fn switch_on(&self, ctx: &PowerContext) {
        let panels = ctx.panels();
        if panels.contains(&self.loser()) {
            ctx.set_power(self.loser(), PowerStatus::Off);
        }
        if panels.contains(&self.winner()) {
            ctx.set_power(self.winner(), PowerStatus::On);
        } else {
            debug!("Active panel {} not connected", self.winner());
        }
    }

    fn set_fold(&mut self, fold: FoldState) {
        if self.fold != fold {
            let previous = self.fold;
            self.fold = fold;
            info!("Fold state {:?} -> {:?}, active panel {}", previous, fold, self.winner());
        }
    }
}

/// Foldable device with two panels, one lit at a time
#[derive(Debug)]
pub struct FoldableSequencer {
    panels: PanelPair,
}

impl DeviceSequencer for FoldableSequencer {
    fn class(&self) -> DeviceClass {
        DeviceClass::Foldable
    }

    fn active_panels(&self, ctx: &PowerContext) -> Vec<PhysicalSurfaceId> {
        self.panels.active(ctx)
    }

    fn on_power_on(&mut self, ctx: &PowerContext) {
        self.panels.switch_on(ctx);
    }

    fn set_fold_state(&mut self, fold: FoldState) {
        self.panels.set_fold(fold);
    }
}

/// Dual-panel device whose boot animation hands over between panels
#[derive(Debug)]
pub struct DualPanelSequencer {
    panels: PanelPair,
    fake_off_delay: Duration,
}

impl DeviceSequencer for DualPanelSequencer {
    fn class(&self) -> DeviceClass {
        DeviceClass::DualPanel
    }

    fn active_panels(&self, ctx: &PowerContext) -> Vec<PhysicalSurfaceId> {
        self.panels.active(ctx)
    }

    fn on_power_on(&mut self, ctx: &PowerContext) {
        self.panels.switch_on(ctx);
    }

    /// Four fixed steps; each one is a plain status set, so a rerun after an
    /// interruption starts over from whatever the panels currently show.
    fn on_boot_power_on(&mut self, ctx: &PowerContext) {
        let loser = self.panels.loser();
        let winner = self.panels.winner();
        info!("Boot handoff: {} -> {}", loser, winner);

        ctx.set_power(loser, PowerStatus::OffFake);
        thread::sleep(self.fake_off_delay);
        ctx.set_power(loser, PowerStatus::Off);
        ctx.detach(loser);
        ctx.set_power(winner, PowerStatus::On);
    }

    fn uses_boot_handoff(&self) -> bool {
        true
    }

    fn set_fold_state(&mut self, fold: FoldState) {
        self.panels.set_fold(fold);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::power::machine::tests::{context_with, RecordingRender};
    use crate::render::PowerStatus;

    fn dual_panel_config() -> DeviceConfig {
        DeviceConfig {
            class: DeviceClass::DualPanel,
            inner_panel: Some(PhysicalSurfaceId(0)),
            outer_panel: Some(PhysicalSurfaceId(5)),
            expand_by_default: false,
        }
    }

    #[test]
    fn test_selection_by_class() {
        let power = PowerConfig::default();
        assert_eq!(
            sequencer_for(&dual_panel_config(), &power).class(),
            DeviceClass::DualPanel
        );

        let mut foldable = dual_panel_config();
        foldable.class = DeviceClass::Foldable;
        assert_eq!(sequencer_for(&foldable, &power).class(), DeviceClass::Foldable);

        foldable.inner_panel = None;
        assert_eq!(sequencer_for(&foldable, &power).class(), DeviceClass::Standard);
    }

    #[test]
    fn test_dual_panel_boot_sequence() {
        let render = RecordingRender::new();
        let (ctx, _general) = context_with(&render, &[0, 5]);
        let mut power = PowerConfig::default();
        power.fake_off_delay_ms = 1;
        let mut sequencer = sequencer_for(&dual_panel_config(), &power);

        sequencer.on_boot_power_on(&ctx);

        assert_eq!(
            render.calls(),
            vec![
                "set P5 off_fake".to_string(),
                "set P5 off".to_string(),
                "detach P5".to_string(),
                "set P0 on".to_string(),
            ]
        );
    }

    #[test]
    fn test_boot_sequence_follows_fold_state() {
        let render = RecordingRender::new();
        let (ctx, _general) = context_with(&render, &[0, 5]);
        let mut sequencer = sequencer_for(&dual_panel_config(), &PowerConfig::default());
        sequencer.set_fold_state(FoldState::Folded);

        sequencer.on_boot_power_on(&ctx);

        let calls = render.calls();
        assert_eq!(calls.first().map(String::as_str), Some("set P0 off_fake"));
        assert_eq!(calls.last().map(String::as_str), Some("set P5 on"));
    }

    #[test]
    fn test_foldable_lights_one_panel() {
        let render = RecordingRender::new();
        let (ctx, _general) = context_with(&render, &[0, 5]);
        let mut config = dual_panel_config();
        config.class = DeviceClass::Foldable;
        let mut sequencer = sequencer_for(&config, &PowerConfig::default());

        sequencer.on_power_on(&ctx);
        assert_eq!(render.status(PhysicalSurfaceId(0)), Some(PowerStatus::On));
        assert_eq!(render.status(PhysicalSurfaceId(5)), Some(PowerStatus::Off));
        assert_eq!(sequencer.active_panels(&ctx), vec![PhysicalSurfaceId(0)]);

        sequencer.on_power_off(&ctx);
        assert_eq!(render.status(PhysicalSurfaceId(0)), Some(PowerStatus::Off));
    }

    #[test]
    fn test_standard_powers_everything() {
        let render = RecordingRender::new();
        let (ctx, _general) = context_with(&render, &[1, 2, 3]);
        let mut sequencer = StandardSequencer;

        sequencer.on_power_on(&ctx);
        for id in [1, 2, 3] {
            assert_eq!(render.status(PhysicalSurfaceId(id)), Some(PowerStatus::On));
        }
    }
}
