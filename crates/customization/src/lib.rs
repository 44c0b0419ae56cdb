//! Vehicle customization: paint, wheels, spoilers, sirens and tiered
//! performance upgrades, persisted per vehicle.
//!
//! A [`CustomizationApplier`] owns one vehicle's [`LoadoutRecord`] and keeps
//! the vehicle (seen through [`vehicle_api::VehicleFacade`]) in sync with it.
//! A [`CustomizationManager`] routes UI requests to whichever vehicle is
//! currently in the garage.

pub mod applier;
pub mod catalog;
pub mod config;
pub mod headless;
pub mod loadout;
pub mod manager;
pub mod upgrade;

pub use applier::{ApplierSettings, CustomizationApplier, CustomizationContext};
pub use catalog::Catalog;
pub use config::{ConfigError, CustomizationConfig};
pub use headless::{FacadeCall, HeadlessState, HeadlessVehicle};
pub use loadout::{LOADOUT_SCHEMA_VERSION, LoadoutError, LoadoutRecord, storage_key};
pub use manager::{CustomizationManager, SessionError};
pub use upgrade::{
    MAX_UPGRADE_LEVEL, UnknownCategory, UpgradeCategory, UpgradeCurves, UpgradeLevels,
    UpgradeManager,
};
