use std::fmt;
use std::str::FromStr;

use log::{debug, info, warn};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use vehicle_api::{PerformanceModifier, VehicleFacade};

/// Highest level any upgrade category can reach.
pub const MAX_UPGRADE_LEVEL: u8 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpgradeCategory {
    Engine,
    Handling,
    Brake,
}

impl UpgradeCategory {
    pub const ALL: [UpgradeCategory; 3] = [
        UpgradeCategory::Engine,
        UpgradeCategory::Handling,
        UpgradeCategory::Brake,
    ];

    /// Performance value the category scales on the vehicle.
    pub fn modifier(self) -> PerformanceModifier {
        match self {
            UpgradeCategory::Engine => PerformanceModifier::EngineTorque,
            UpgradeCategory::Handling => PerformanceModifier::HandlingGrip,
            UpgradeCategory::Brake => PerformanceModifier::BrakeForce,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UpgradeCategory::Engine => "engine",
            UpgradeCategory::Handling => "handling",
            UpgradeCategory::Brake => "brake",
        }
    }
}

impl fmt::Display for UpgradeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("unknown upgrade category {0:?} (expected engine, handling or brake)")]
pub struct UnknownCategory(String);

impl FromStr for UpgradeCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "engine" | "speed" => Ok(UpgradeCategory::Engine),
            "handling" => Ok(UpgradeCategory::Handling),
            "brake" | "brakes" => Ok(UpgradeCategory::Brake),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

/// Level counters as stored in a loadout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeLevels {
    #[serde(default, rename = "engineLevel", deserialize_with = "saturating_level")]
    pub engine: u8,
    #[serde(default, rename = "handlingLevel", deserialize_with = "saturating_level")]
    pub handling: u8,
    #[serde(default, rename = "brakeLevel", deserialize_with = "saturating_level")]
    pub brake: u8,
}

/// Out-of-range stored levels saturate into `u8`; [`UpgradeLevels::clamp`]
/// then caps them at [`MAX_UPGRADE_LEVEL`].
fn saturating_level<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let raw = i64::deserialize(deserializer)?;
    if raw < 0 {
        warn!("negative upgrade level {raw} read as 0");
    }
    Ok(u8::try_from(raw.clamp(0, i64::from(u8::MAX))).unwrap_or(u8::MAX))
}

impl UpgradeLevels {
    pub fn get(&self, category: UpgradeCategory) -> u8 {
        match category {
            UpgradeCategory::Engine => self.engine,
            UpgradeCategory::Handling => self.handling,
            UpgradeCategory::Brake => self.brake,
        }
    }

    fn get_mut(&mut self, category: UpgradeCategory) -> &mut u8 {
        match category {
            UpgradeCategory::Engine => &mut self.engine,
            UpgradeCategory::Handling => &mut self.handling,
            UpgradeCategory::Brake => &mut self.brake,
        }
    }

    /// Clamp every counter into `0..=MAX_UPGRADE_LEVEL`, returning the
    /// categories that had to be corrected.
    pub fn clamp(&mut self) -> Vec<UpgradeCategory> {
        let mut clamped = Vec::new();
        for category in UpgradeCategory::ALL {
            let level = self.get_mut(category);
            if *level > MAX_UPGRADE_LEVEL {
                *level = MAX_UPGRADE_LEVEL;
                clamped.push(category);
            }
        }
        clamped
    }
}

/// Multiplier each category reaches at [`MAX_UPGRADE_LEVEL`].
///
/// Intermediate levels interpolate linearly from 1.0 at level 0.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeCurves {
    pub engine: f32,
    pub handling: f32,
    pub brake: f32,
}

impl Default for UpgradeCurves {
    fn default() -> Self {
        Self {
            engine: 1.25,
            handling: 1.2,
            brake: 1.25,
        }
    }
}

impl UpgradeCurves {
    pub fn max_multiplier(&self, category: UpgradeCategory) -> f32 {
        match category {
            UpgradeCategory::Engine => self.engine,
            UpgradeCategory::Handling => self.handling,
            UpgradeCategory::Brake => self.brake,
        }
    }

    /// Scalar over the stock value for `level`. Depends only on its inputs.
    pub fn magnitude(&self, category: UpgradeCategory, level: u8) -> f32 {
        let level = level.min(MAX_UPGRADE_LEVEL);
        let t = f32::from(level) / f32::from(MAX_UPGRADE_LEVEL);
        1.0 + (self.max_multiplier(category) - 1.0) * t
    }
}

/// Tiered performance upgrades for one vehicle.
#[derive(Clone, Debug)]
pub struct UpgradeManager {
    levels: UpgradeLevels,
    curves: UpgradeCurves,
}

impl UpgradeManager {
    pub fn new(mut levels: UpgradeLevels, curves: UpgradeCurves) -> Self {
        levels.clamp();
        Self { levels, curves }
    }

    pub fn current_level(&self, category: UpgradeCategory) -> u8 {
        self.levels.get(category)
    }

    pub fn levels(&self) -> UpgradeLevels {
        self.levels
    }

    pub fn curves(&self) -> &UpgradeCurves {
        &self.curves
    }

    /// Raise `category` by one level and push the new magnitude to the vehicle.
    ///
    /// At [`MAX_UPGRADE_LEVEL`] nothing happens and the unchanged level is
    /// returned; a maxed category is a normal outcome, not an error.
    pub fn upgrade<F: VehicleFacade + ?Sized>(
        &mut self,
        category: UpgradeCategory,
        facade: &mut F,
    ) -> u8 {
        let level = self.levels.get_mut(category);
        if *level >= MAX_UPGRADE_LEVEL {
            debug!("{category} already at max level {MAX_UPGRADE_LEVEL}");
            return *level;
        }
        *level += 1;
        let new_level = *level;
        let magnitude = self.curves.magnitude(category, new_level);
        facade.apply_modifier(category.modifier(), magnitude);
        info!("{category} upgraded to level {new_level} (x{magnitude:.3})");
        new_level
    }

    /// Re-apply the magnitude of every category's current level.
    pub fn apply_all<F: VehicleFacade + ?Sized>(&self, facade: &mut F) {
        for category in UpgradeCategory::ALL {
            let magnitude = self.curves.magnitude(category, self.levels.get(category));
            facade.apply_modifier(category.modifier(), magnitude);
        }
    }
}
