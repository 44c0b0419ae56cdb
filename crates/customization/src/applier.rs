use std::sync::Arc;

use log::{debug, error, info, warn};
use storage::KeyValueStore;
use vehicle_api::{CapabilityFlags, Rgb, VehicleFacade, VehicleId};

use crate::catalog::Catalog;
use crate::loadout::{LoadoutError, LoadoutRecord, storage_key};
use crate::upgrade::{UpgradeCategory, UpgradeCurves, UpgradeManager};

/// Tunables shared by every applier.
#[derive(Clone, Debug, PartialEq)]
pub struct ApplierSettings {
    /// Material channel the body paint is written to.
    pub paint_channel: String,
    /// Paint of a vehicle that has never been customized.
    pub default_paint: Rgb,
    pub upgrades: UpgradeCurves,
}

impl Default for ApplierSettings {
    fn default() -> Self {
        Self {
            paint_channel: "body".to_string(),
            default_paint: Rgb::WHITE,
            upgrades: UpgradeCurves::default(),
        }
    }
}

/// Collaborators handed to every [`CustomizationApplier`].
#[derive(Clone)]
pub struct CustomizationContext {
    pub catalog: Arc<Catalog>,
    pub store: Arc<dyn KeyValueStore + Send + Sync>,
    pub settings: ApplierSettings,
}

impl CustomizationContext {
    pub fn new(
        catalog: Catalog,
        store: Arc<dyn KeyValueStore + Send + Sync>,
        settings: ApplierSettings,
    ) -> Self {
        Self {
            catalog: Arc::new(catalog),
            store,
            settings,
        }
    }
}

/// Owns the loadout of one vehicle and keeps the vehicle in sync with it.
///
/// Every accepted mutation is pushed to the vehicle and written through to
/// the store before the call returns.
pub struct CustomizationApplier<F> {
    vehicle: VehicleId,
    facade: F,
    record: LoadoutRecord,
    upgrades: UpgradeManager,
    ctx: CustomizationContext,
}

impl<F: VehicleFacade> CustomizationApplier<F> {
    /// Bind to `facade`, load its saved loadout and apply it.
    pub fn attach(facade: F, ctx: CustomizationContext) -> Self {
        let vehicle = facade.id();
        let record = LoadoutRecord::new(ctx.settings.default_paint);
        let upgrades = UpgradeManager::new(record.upgrades, ctx.settings.upgrades);
        let mut applier = Self {
            vehicle,
            facade,
            record,
            upgrades,
            ctx,
        };
        applier.initialize();
        applier
    }

    /// Reload the loadout from storage and re-apply all of it.
    ///
    /// Running this repeatedly leaves the vehicle in the same state as
    /// running it once.
    pub fn initialize(&mut self) {
        let found = self.load_loadout();
        self.apply_record();
        if found {
            info!("restored loadout for {}", self.vehicle);
        } else {
            info!("no saved loadout for {}, using defaults", self.vehicle);
        }
    }

    pub fn vehicle(&self) -> &VehicleId {
        &self.vehicle
    }

    pub fn record(&self) -> &LoadoutRecord {
        &self.record
    }

    pub fn facade(&self) -> &F {
        &self.facade
    }

    pub fn facade_mut(&mut self) -> &mut F {
        &mut self.facade
    }

    pub fn catalog(&self) -> &Catalog {
        &self.ctx.catalog
    }

    pub fn current_level(&self, category: UpgradeCategory) -> u8 {
        self.upgrades.current_level(category)
    }

    fn capabilities(&self) -> CapabilityFlags {
        self.facade.capabilities()
    }

    /// Replace the in-memory record with the stored one.
    ///
    /// Missing, unreadable or incompatible data falls back to defaults.
    /// Returns whether a stored record was used.
    pub fn load_loadout(&mut self) -> bool {
        let key = storage_key(&self.vehicle);
        let stored = match self.ctx.store.get(&key) {
            Ok(Some(json)) => match LoadoutRecord::decode(&json) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("discarding saved loadout for {}: {e}", self.vehicle);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("could not read saved loadout for {}: {e}", self.vehicle);
                None
            }
        };
        let found = stored.is_some();
        let mut record =
            stored.unwrap_or_else(|| LoadoutRecord::new(self.ctx.settings.default_paint));
        record.sanitize(
            &self.vehicle,
            &self.ctx.catalog,
            self.capabilities(),
            self.ctx.settings.default_paint,
        );
        self.upgrades = UpgradeManager::new(record.upgrades, self.ctx.settings.upgrades);
        self.record = record;
        found
    }

    pub fn save_loadout(&self) -> Result<(), LoadoutError> {
        let json = self.record.encode()?;
        self.ctx.store.put(&storage_key(&self.vehicle), &json)?;
        debug!("saved loadout for {}", self.vehicle);
        Ok(())
    }

    fn persist(&self) {
        if let Err(e) = self.save_loadout() {
            error!("failed to save loadout for {}: {e}", self.vehicle);
        }
    }

    fn apply_record(&mut self) {
        let capabilities = self.capabilities();
        let catalog = Arc::clone(&self.ctx.catalog);
        self.facade.apply_paint(&self.ctx.settings.paint_channel, self.record.paint);
        self.facade.set_wheels(self.record.wheel.and_then(|i| catalog.wheel(i)));
        if capabilities.contains(CapabilityFlags::SPOILER_MOUNT) {
            self.facade.set_spoiler(self.record.spoiler.and_then(|i| catalog.spoiler(i)));
        }
        if capabilities.contains(CapabilityFlags::SIREN_MOUNT) {
            self.facade.set_siren(self.record.siren);
        }
        self.upgrades.apply_all(&mut self.facade);
    }

    /// Returns `false` if the colour was rejected.
    pub fn set_paint(&mut self, color: Rgb) -> bool {
        if !color.is_well_formed() {
            warn!("{}: rejected paint {color:?}", self.vehicle);
            return false;
        }
        self.facade.apply_paint(&self.ctx.settings.paint_channel, color);
        self.record.paint = color;
        self.persist();
        true
    }

    /// Fit wheel set `index`, or the stock wheels for `None`.
    ///
    /// Returns `false` if `index` is outside the catalog.
    pub fn set_wheel(&mut self, index: Option<usize>) -> bool {
        match index {
            None if self.record.wheel.is_none() => return true,
            None => self.facade.set_wheels(None),
            Some(i) => {
                let Some(wheel) = self.ctx.catalog.wheel(i) else {
                    warn!(
                        "{}: wheel index {i} is outside the catalog ({} wheels)",
                        self.vehicle,
                        self.ctx.catalog.wheels().len()
                    );
                    return false;
                };
                self.facade.set_wheels(Some(wheel));
            }
        }
        self.record.wheel = index;
        self.persist();
        true
    }

    /// Show spoiler `index`, or no spoiler for `None`.
    ///
    /// Returns `false` if `index` is outside the catalog or the vehicle has
    /// nowhere to mount a spoiler.
    pub fn set_spoiler(&mut self, index: Option<usize>) -> bool {
        match index {
            None if self.record.spoiler.is_none() => return true,
            None => self.facade.set_spoiler(None),
            Some(i) => {
                if !self.capabilities().contains(CapabilityFlags::SPOILER_MOUNT) {
                    warn!("{}: vehicle has no spoiler mount", self.vehicle);
                    return false;
                }
                let Some(spoiler) = self.ctx.catalog.spoiler(i) else {
                    warn!(
                        "{}: spoiler index {i} is outside the catalog ({} spoilers)",
                        self.vehicle,
                        self.ctx.catalog.spoilers().len()
                    );
                    return false;
                };
                self.facade.set_spoiler(Some(spoiler));
            }
        }
        self.record.spoiler = index;
        self.persist();
        true
    }

    /// Returns `false` when enabling a siren on a vehicle without a mount.
    pub fn set_siren(&mut self, enabled: bool) -> bool {
        if self.record.siren == enabled {
            return true;
        }
        if enabled && !self.capabilities().contains(CapabilityFlags::SIREN_MOUNT) {
            warn!("{}: vehicle has no siren mount", self.vehicle);
            return false;
        }
        self.facade.set_siren(enabled);
        self.record.siren = enabled;
        self.persist();
        true
    }

    /// Raise `category` by one level; see [`UpgradeManager::upgrade`].
    pub fn upgrade(&mut self, category: UpgradeCategory) -> u8 {
        let before = self.upgrades.current_level(category);
        let level = self.upgrades.upgrade(category, &mut self.facade);
        if level != before {
            self.record.upgrades = self.upgrades.levels();
            self.persist();
        }
        level
    }
}
