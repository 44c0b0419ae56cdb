//! Persisted customization choices for a single vehicle.
//!
//! Stored as one JSON document per vehicle:
//!
//! ```json
//! {"version":1,"paint":{"r":1.0,"g":0.0,"b":0.0},"wheel":2,"spoiler":-1,
//!  "siren":false,"engineLevel":3,"handlingLevel":0,"brakeLevel":1}
//! ```
//!
//! `-1` marks an unset wheel or spoiler slot.

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vehicle_api::{CapabilityFlags, Rgb, VehicleId};

use crate::catalog::Catalog;
use crate::upgrade::{MAX_UPGRADE_LEVEL, UpgradeLevels};

// Save format changelog:
// v0: unversioned records, same fields
// v1: adds `version` and `siren`
pub const LOADOUT_SCHEMA_VERSION: u32 = 1;

const KEY_PREFIX: &str = "loadout";

#[derive(Debug, Error)]
pub enum LoadoutError {
    #[error("malformed loadout: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error(
        "loadout schema version {found} is newer than supported version {}",
        LOADOUT_SCHEMA_VERSION
    )]
    UnsupportedVersion { found: u32 },
    #[error(transparent)]
    Store(#[from] storage::StoreError),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoadoutRecord {
    /// Missing in legacy saves, which deserialize as version 0.
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub paint: Rgb,
    #[serde(default, with = "sentinel")]
    pub wheel: Option<usize>,
    #[serde(default, with = "sentinel")]
    pub spoiler: Option<usize>,
    #[serde(default)]
    pub siren: bool,
    #[serde(flatten)]
    pub upgrades: UpgradeLevels,
}

impl Default for LoadoutRecord {
    fn default() -> Self {
        Self::new(Rgb::default())
    }
}

impl LoadoutRecord {
    /// Fresh loadout for a vehicle that has never been customized.
    pub fn new(paint: Rgb) -> Self {
        Self {
            version: LOADOUT_SCHEMA_VERSION,
            paint,
            wheel: None,
            spoiler: None,
            siren: false,
            upgrades: UpgradeLevels::default(),
        }
    }

    pub fn decode(json: &str) -> Result<Self, LoadoutError> {
        let record: LoadoutRecord = serde_json::from_str(json)?;
        if record.version > LOADOUT_SCHEMA_VERSION {
            return Err(LoadoutError::UnsupportedVersion {
                found: record.version,
            });
        }
        Ok(record)
    }

    /// Serialize at the current schema version.
    pub fn encode(&self) -> Result<String, LoadoutError> {
        let current = LoadoutRecord {
            version: LOADOUT_SCHEMA_VERSION,
            ..self.clone()
        };
        Ok(serde_json::to_string(&current)?)
    }

    /// Drop anything the current catalog and vehicle cannot honour.
    ///
    /// Persisted data may predate a catalog change, so indices are never
    /// trusted. Each correction is logged as a warning.
    pub fn sanitize(
        &mut self,
        vehicle: &VehicleId,
        catalog: &Catalog,
        capabilities: CapabilityFlags,
        default_paint: Rgb,
    ) {
        if !self.paint.is_well_formed() {
            warn!("{vehicle}: stored paint {:?} is invalid, using default", self.paint);
            self.paint = default_paint;
        }
        if let Some(index) = self.wheel {
            if catalog.wheel(index).is_none() {
                warn!(
                    "{vehicle}: stored wheel index {index} is outside the catalog ({} wheels)",
                    catalog.wheels().len()
                );
                self.wheel = None;
            }
        }
        if let Some(index) = self.spoiler {
            if catalog.spoiler(index).is_none() {
                warn!(
                    "{vehicle}: stored spoiler index {index} is outside the catalog ({} spoilers)",
                    catalog.spoilers().len()
                );
                self.spoiler = None;
            } else if !capabilities.contains(CapabilityFlags::SPOILER_MOUNT) {
                warn!("{vehicle}: vehicle has no spoiler mount, removing stored spoiler");
                self.spoiler = None;
            }
        }
        if self.siren && !capabilities.contains(CapabilityFlags::SIREN_MOUNT) {
            warn!("{vehicle}: vehicle has no siren mount, clearing stored siren");
            self.siren = false;
        }
        for category in self.upgrades.clamp() {
            warn!("{vehicle}: stored {category} level exceeds {MAX_UPGRADE_LEVEL}, clamping");
        }
    }
}

/// Storage key the loadout of `vehicle` lives under.
///
/// ASCII letters, digits and `-` are kept; every other byte, `_` included,
/// is written as `_XX` in uppercase hex. Distinct ids never share a key.
pub fn storage_key(vehicle: &VehicleId) -> String {
    let id = vehicle.as_str();
    if id.is_empty() {
        return format!("{KEY_PREFIX}/_");
    }
    let mut name = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            name.push(char::from(byte));
        } else {
            name.push_str(&format!("_{byte:02X}"));
        }
    }
    format!("{KEY_PREFIX}/{name}")
}

mod sentinel {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<usize>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(index) => serializer.serialize_u64(*index as u64),
            None => serializer.serialize_i64(-1),
        }
    }

    /// Any negative index reads as unset.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<usize>, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Ok(usize::try_from(raw).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vehicle_api::{SpoilerVariant, WheelVariant};

    fn catalog() -> Catalog {
        let wheels = (0..3)
            .map(|i| WheelVariant {
                name: format!("wheel-{i}"),
                asset: format!("wheels/{i}"),
            })
            .collect();
        let spoilers = vec![SpoilerVariant {
            name: "ducktail".to_string(),
            asset: "spoilers/ducktail".to_string(),
        }];
        Catalog::new(wheels, spoilers)
    }

    #[test]
    fn unset_slots_encode_as_minus_one() {
        let json = LoadoutRecord::default().encode().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["wheel"], -1);
        assert_eq!(value["spoiler"], -1);
        assert_eq!(value["version"], LOADOUT_SCHEMA_VERSION);
        assert_eq!(value["engineLevel"], 0);
    }

    #[test]
    fn decodes_flat_level_fields() {
        let record = LoadoutRecord::decode(
            r#"{"version":1,"paint":{"r":0.5,"g":0.25,"b":0.125},"wheel":2,"spoiler":-1,
                "siren":true,"engineLevel":3,"handlingLevel":1,"brakeLevel":5}"#,
        )
        .unwrap();
        assert_eq!(record.wheel, Some(2));
        assert_eq!(record.spoiler, None);
        assert_eq!(record.paint, Rgb::new(0.5, 0.25, 0.125));
        assert_eq!(record.upgrades.engine, 3);
        assert_eq!(record.upgrades.brake, 5);
        assert!(record.siren);
    }

    #[test]
    fn legacy_record_without_version_is_accepted() {
        let record =
            LoadoutRecord::decode(r#"{"paint":{"r":1.0,"g":0.0,"b":0.0},"wheel":1,"spoiler":0}"#)
                .unwrap();
        assert_eq!(record.version, 0);
        assert_eq!(record.wheel, Some(1));
        assert!(!record.siren);
        let reencoded: serde_json::Value =
            serde_json::from_str(&record.encode().unwrap()).unwrap();
        assert_eq!(reencoded["version"], LOADOUT_SCHEMA_VERSION);
    }

    #[test]
    fn future_versions_are_rejected() {
        let err = LoadoutRecord::decode(r#"{"version":99}"#).unwrap_err();
        assert!(matches!(err, LoadoutError::UnsupportedVersion { found: 99 }));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            LoadoutRecord::decode("{not json"),
            Err(LoadoutError::Malformed(_))
        ));
        assert!(matches!(
            LoadoutRecord::decode(r#"{"engineLevel":"three"}"#),
            Err(LoadoutError::Malformed(_))
        ));
    }

    #[test]
    fn sanitize_drops_stale_indices() {
        let mut record = LoadoutRecord {
            wheel: Some(7),
            spoiler: Some(0),
            upgrades: UpgradeLevels {
                engine: 8,
                handling: 2,
                brake: 0,
            },
            ..LoadoutRecord::default()
        };
        record.sanitize(
            &VehicleId::from("sedan"),
            &catalog(),
            CapabilityFlags::SPOILER_MOUNT,
            Rgb::WHITE,
        );
        assert_eq!(record.wheel, None);
        assert_eq!(record.spoiler, Some(0));
        assert_eq!(record.upgrades.engine, MAX_UPGRADE_LEVEL);
        assert_eq!(record.upgrades.handling, 2);
    }

    #[test]
    fn sanitize_respects_capabilities() {
        let mut record = LoadoutRecord {
            spoiler: Some(0),
            siren: true,
            paint: Rgb::new(f32::NAN, 0.0, 0.0),
            ..LoadoutRecord::default()
        };
        let fallback = Rgb::new(0.1, 0.1, 0.1);
        record.sanitize(
            &VehicleId::from("hatch"),
            &catalog(),
            CapabilityFlags::empty(),
            fallback,
        );
        assert_eq!(record.spoiler, None);
        assert!(!record.siren);
        assert_eq!(record.paint, fallback);
    }

    #[test]
    fn storage_keys_escape_reserved_bytes() {
        assert_eq!(storage_key(&VehicleId::from("police-sedan2")), "loadout/police-sedan2");
        assert_eq!(storage_key(&VehicleId::from("car_1")), "loadout/car_5F1");
        assert_eq!(storage_key(&VehicleId::from("car.1")), "loadout/car_2E1");
        assert_eq!(storage_key(&VehicleId::from("../etc")), "loadout/_2E_2E_2Fetc");
        assert_eq!(storage_key(&VehicleId::from("")), "loadout/_");
    }

    #[test]
    fn lookalike_ids_get_distinct_keys() {
        let ids = [
            "car.1",
            "car_1",
            "car 1",
            "car/1",
            "car_2E1",
            "Police Car",
            "Police_Car",
            "\u{e9}",
        ];
        let keys: std::collections::BTreeSet<_> =
            ids.iter().map(|id| storage_key(&VehicleId::from(*id))).collect();
        assert_eq!(keys.len(), ids.len());
        for key in &keys {
            assert!(storage::validate_key(key).is_ok(), "{key} rejected by the store");
        }
    }

    #[test]
    fn out_of_range_levels_are_clamped_not_discarded() {
        let mut record = LoadoutRecord::decode(
            r#"{"version":1,"paint":{"r":0.2,"g":0.4,"b":0.6},"wheel":1,
                "engineLevel":300,"handlingLevel":-4,"brakeLevel":2}"#,
        )
        .unwrap();
        record.sanitize(
            &VehicleId::from("sedan"),
            &catalog(),
            CapabilityFlags::all(),
            Rgb::WHITE,
        );
        assert_eq!(record.wheel, Some(1));
        assert_eq!(record.paint, Rgb::new(0.2, 0.4, 0.6));
        assert_eq!(record.upgrades.engine, MAX_UPGRADE_LEVEL);
        assert_eq!(record.upgrades.handling, 0);
        assert_eq!(record.upgrades.brake, 2);
    }
}
