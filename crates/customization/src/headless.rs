//! A vehicle with no renderer or physics behind it.
//!
//! Used by tools that run the customization flow without a game attached,
//! and by tests to observe exactly what the customization layer pushed to the
//! vehicle.

use std::collections::BTreeMap;

use log::debug;
use vehicle_api::{
    CapabilityFlags, PerformanceModifier, Rgb, SpoilerVariant, VehicleFacade, VehicleId,
    WheelVariant,
};

#[derive(Clone, Debug, PartialEq)]
pub enum FacadeCall {
    Paint { channel: String, color: Rgb },
    Wheels(Option<String>),
    Spoiler(Option<String>),
    Siren(bool),
    Modifier(PerformanceModifier, f32),
}

/// Visible state of a [`HeadlessVehicle`] after all calls so far.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeadlessState {
    pub paint: BTreeMap<String, Rgb>,
    /// Asset of the fitted wheel set, `None` for stock wheels.
    pub wheels: Option<String>,
    pub spoiler: Option<String>,
    pub siren: bool,
    pub modifiers: BTreeMap<PerformanceModifier, f32>,
}

#[derive(Clone, Debug)]
pub struct HeadlessVehicle {
    id: VehicleId,
    capabilities: CapabilityFlags,
    calls: Vec<FacadeCall>,
    state: HeadlessState,
}

impl HeadlessVehicle {
    pub fn new(id: impl Into<VehicleId>) -> Self {
        Self {
            id: id.into(),
            capabilities: CapabilityFlags::all(),
            calls: Vec::new(),
            state: HeadlessState::default(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: CapabilityFlags) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Every call received, oldest first.
    pub fn calls(&self) -> &[FacadeCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<FacadeCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn state(&self) -> &HeadlessState {
        &self.state
    }

    fn record(&mut self, call: FacadeCall) {
        debug!("{}: {call:?}", self.id);
        self.calls.push(call);
    }
}

impl VehicleFacade for HeadlessVehicle {
    fn id(&self) -> VehicleId {
        self.id.clone()
    }

    fn capabilities(&self) -> CapabilityFlags {
        self.capabilities
    }

    fn apply_paint(&mut self, channel: &str, color: Rgb) {
        self.state.paint.insert(channel.to_string(), color);
        self.record(FacadeCall::Paint {
            channel: channel.to_string(),
            color,
        });
    }

    fn set_wheels(&mut self, wheels: Option<&WheelVariant>) {
        let asset = wheels.map(|w| w.asset.clone());
        self.state.wheels = asset.clone();
        self.record(FacadeCall::Wheels(asset));
    }

    fn set_spoiler(&mut self, spoiler: Option<&SpoilerVariant>) {
        let asset = spoiler.map(|s| s.asset.clone());
        self.state.spoiler = asset.clone();
        self.record(FacadeCall::Spoiler(asset));
    }

    fn set_siren(&mut self, enabled: bool) {
        self.state.siren = enabled;
        self.record(FacadeCall::Siren(enabled));
    }

    fn apply_modifier(&mut self, modifier: PerformanceModifier, magnitude: f32) {
        self.state.modifiers.insert(modifier, magnitude);
        self.record(FacadeCall::Modifier(modifier, magnitude));
    }
}
