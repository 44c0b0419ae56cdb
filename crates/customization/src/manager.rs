use std::collections::HashMap;
use std::time::Duration;

use log::{info, warn};
use thiserror::Error;
use vehicle_api::{Rgb, VehicleFacade, VehicleId};

use crate::applier::CustomizationApplier;
use crate::upgrade::UpgradeCategory;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("cannot customize {requested}: {active} is already being customized")]
    Busy {
        active: VehicleId,
        requested: VehicleId,
    },
    #[error("vehicle {0} is not registered for customization")]
    UnknownVehicle(VehicleId),
}

#[derive(Debug)]
struct ActiveSession {
    vehicle: VehicleId,
    idle: Duration,
}

/// Routes customization requests to the one vehicle currently in the garage.
///
/// Vehicles are registered up front; at most one of them is the active
/// session target at any time. Requests arriving without an active session
/// are ignored with a warning.
pub struct CustomizationManager<F> {
    vehicles: HashMap<VehicleId, CustomizationApplier<F>>,
    active: Option<ActiveSession>,
    idle_timeout: Option<Duration>,
}

impl<F: VehicleFacade> Default for CustomizationManager<F> {
    fn default() -> Self {
        Self::new(None)
    }
}

impl<F: VehicleFacade> CustomizationManager<F> {
    /// With `idle_timeout` set, [`tick`](Self::tick) ends a session that has
    /// seen no customization request for that long.
    pub fn new(idle_timeout: Option<Duration>) -> Self {
        Self {
            vehicles: HashMap::new(),
            active: None,
            idle_timeout,
        }
    }

    /// Make a vehicle available for customization, returning any applier
    /// previously registered under the same id.
    pub fn register(
        &mut self,
        applier: CustomizationApplier<F>,
    ) -> Option<CustomizationApplier<F>> {
        self.vehicles.insert(applier.vehicle().clone(), applier)
    }

    /// Remove a vehicle, ending its session if it is the active one.
    pub fn unregister(&mut self, vehicle: &VehicleId) -> Option<CustomizationApplier<F>> {
        if self.active_vehicle() == Some(vehicle) {
            self.end_session();
        }
        self.vehicles.remove(vehicle)
    }

    pub fn applier(&self, vehicle: &VehicleId) -> Option<&CustomizationApplier<F>> {
        self.vehicles.get(vehicle)
    }

    pub fn active_vehicle(&self) -> Option<&VehicleId> {
        self.active.as_ref().map(|s| &s.vehicle)
    }

    pub fn active_applier(&self) -> Option<&CustomizationApplier<F>> {
        self.active_vehicle().and_then(|id| self.vehicles.get(id))
    }

    /// Start customizing `vehicle`.
    ///
    /// Starting a session for the vehicle that is already active is a no-op.
    /// A session for a different vehicle is left untouched and the request is
    /// rejected.
    pub fn begin_session(&mut self, vehicle: &VehicleId) -> Result<(), SessionError> {
        if let Some(active) = &self.active {
            if &active.vehicle == vehicle {
                return Ok(());
            }
            let err = SessionError::Busy {
                active: active.vehicle.clone(),
                requested: vehicle.clone(),
            };
            warn!("{err}");
            return Err(err);
        }
        if !self.vehicles.contains_key(vehicle) {
            let err = SessionError::UnknownVehicle(vehicle.clone());
            warn!("{err}");
            return Err(err);
        }
        info!("customization session started for {vehicle}");
        self.active = Some(ActiveSession {
            vehicle: vehicle.clone(),
            idle: Duration::ZERO,
        });
        Ok(())
    }

    /// End the active session, if any. Nothing is saved here; every change
    /// was already written when it was made.
    pub fn end_session(&mut self) -> Option<VehicleId> {
        let session = self.active.take()?;
        info!("customization session ended for {}", session.vehicle);
        Some(session.vehicle)
    }

    fn with_active<R>(
        &mut self,
        action: &str,
        f: impl FnOnce(&mut CustomizationApplier<F>) -> R,
    ) -> Option<R> {
        let Some(session) = self.active.as_mut() else {
            warn!("{action} ignored: no active customization session");
            return None;
        };
        session.idle = Duration::ZERO;
        let Some(applier) = self.vehicles.get_mut(&session.vehicle) else {
            warn!("{action} ignored: {} is no longer registered", session.vehicle);
            return None;
        };
        Some(f(applier))
    }

    /// Returns whether the paint was applied.
    pub fn paint(&mut self, color: Rgb) -> bool {
        self.with_active("paint", |a| a.set_paint(color)).unwrap_or(false)
    }

    pub fn change_wheel(&mut self, index: Option<usize>) -> bool {
        self.with_active("wheel change", |a| a.set_wheel(index)).unwrap_or(false)
    }

    pub fn change_spoiler(&mut self, index: Option<usize>) -> bool {
        self.with_active("spoiler change", |a| a.set_spoiler(index)).unwrap_or(false)
    }

    pub fn change_siren(&mut self, enabled: bool) -> bool {
        self.with_active("siren change", |a| a.set_siren(enabled)).unwrap_or(false)
    }

    /// Attempt one level increment; returns the resulting level.
    pub fn upgrade(&mut self, category: UpgradeCategory) -> Option<u8> {
        self.with_active("upgrade", |a| a.upgrade(category))
    }

    pub fn upgrade_speed(&mut self) -> Option<u8> {
        self.upgrade(UpgradeCategory::Engine)
    }

    pub fn upgrade_handling(&mut self) -> Option<u8> {
        self.upgrade(UpgradeCategory::Handling)
    }

    pub fn upgrade_brake(&mut self) -> Option<u8> {
        self.upgrade(UpgradeCategory::Brake)
    }

    /// Host hook: a vehicle drove into the customization area.
    pub fn on_vehicle_entered(&mut self, vehicle: &VehicleId) -> Result<(), SessionError> {
        self.begin_session(vehicle)
    }

    /// Host hook: a vehicle left the customization area. Only ends the
    /// session when it belongs to that vehicle.
    pub fn on_vehicle_exited(&mut self, vehicle: &VehicleId) -> bool {
        if self.active_vehicle() != Some(vehicle) {
            return false;
        }
        self.end_session().is_some()
    }

    /// Host hook: advance the session clock by `delta`.
    pub fn tick(&mut self, delta: Duration) {
        let (Some(timeout), Some(session)) = (self.idle_timeout, self.active.as_mut()) else {
            return;
        };
        session.idle = session.idle.saturating_add(delta);
        if session.idle >= timeout {
            info!(
                "customization session for {} idle for {:.1}s",
                session.vehicle,
                session.idle.as_secs_f32()
            );
            self.end_session();
        }
    }
}
