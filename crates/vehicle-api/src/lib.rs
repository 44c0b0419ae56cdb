use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// Optional body parts a vehicle model can carry.
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct CapabilityFlags: u32 {
        const SPOILER_MOUNT = 0b0001;
        const SIREN_MOUNT = 0b0010;
    }
}

/// Stable identity of a vehicle; loadouts are stored under it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VehicleId(String);

impl VehicleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VehicleId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Linear RGB colour with components in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Returns `true` if every component is finite and inside the unit range.
    pub fn is_well_formed(&self) -> bool {
        [self.r, self.g, self.b]
            .iter()
            .all(|c| c.is_finite() && (0.0..=1.0).contains(c))
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::WHITE
    }
}

/// A wheel set the vehicle can be fitted with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WheelVariant {
    pub name: String,
    /// Asset the host resolves to a mesh/prefab.
    pub asset: String,
}

/// A spoiler body part.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpoilerVariant {
    pub name: String,
    pub asset: String,
}

/// Performance values the customization layer scales.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PerformanceModifier {
    EngineTorque,
    HandlingGrip,
    BrakeForce,
}

impl fmt::Display for PerformanceModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PerformanceModifier::EngineTorque => "engine torque",
            PerformanceModifier::HandlingGrip => "handling grip",
            PerformanceModifier::BrakeForce => "brake force",
        };
        f.write_str(name)
    }
}

/// Interface of the vehicle controller the customization layer drives.
///
/// The host owns the actual vehicle (meshes, materials, physics) and exposes
/// it through this trait. Every method is expected to be cheap and
/// synchronous.
pub trait VehicleFacade {
    /// Identity the vehicle's loadout is persisted under.
    fn id(&self) -> VehicleId;

    /// Optional parts this vehicle model supports.
    fn capabilities(&self) -> CapabilityFlags {
        CapabilityFlags::empty()
    }

    /// Paint the named material channel of the body.
    fn apply_paint(&mut self, channel: &str, color: Rgb);

    /// Swap the wheel set. `None` restores the stock wheels.
    fn set_wheels(&mut self, wheels: Option<&WheelVariant>);

    /// Show the given spoiler, or hide all spoilers for `None`.
    fn set_spoiler(&mut self, spoiler: Option<&SpoilerVariant>);

    fn set_siren(&mut self, enabled: bool);

    /// Scale a stock performance value by `magnitude`.
    ///
    /// `magnitude` is absolute relative to the stock value; applying the same
    /// magnitude twice must leave the vehicle as if applied once.
    fn apply_modifier(&mut self, modifier: PerformanceModifier, magnitude: f32);
}
