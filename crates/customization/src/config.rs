use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};
use storage::KeyValueStore;
use thiserror::Error;
use vehicle_api::{Rgb, SpoilerVariant, WheelVariant};

use crate::applier::{ApplierSettings, CustomizationContext};
use crate::catalog::Catalog;
use crate::upgrade::UpgradeCurves;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Garage configuration, usually read from a TOML file:
///
/// ```toml
/// storage_dir = "saves"
/// paint_channel = "body"
/// idle_timeout_secs = 120.0
///
/// [upgrades]
/// engine = 1.3
///
/// [[wheels]]
/// name = "Sport"
/// asset = "wheels/sport"
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomizationConfig {
    /// Directory loadouts are saved under.
    pub storage_dir: PathBuf,
    pub paint_channel: String,
    pub default_paint: Rgb,
    /// End a session after this many seconds without a request.
    pub idle_timeout_secs: Option<f32>,
    pub upgrades: UpgradeCurves,
    pub wheels: Vec<WheelVariant>,
    pub spoilers: Vec<SpoilerVariant>,
}

impl Default for CustomizationConfig {
    fn default() -> Self {
        let settings = ApplierSettings::default();
        Self {
            storage_dir: PathBuf::from("saves"),
            paint_channel: settings.paint_channel,
            default_paint: settings.default_paint,
            idle_timeout_secs: None,
            upgrades: settings.upgrades,
            wheels: Vec::new(),
            spoilers: Vec::new(),
        }
    }
}

impl CustomizationConfig {
    pub fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, path)
    }

    /// Like [`load`](Self::load), but logs the problem and returns defaults.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|err| {
            warn!("{err}; using default customization config");
            Self::default()
        })
    }

    pub fn catalog(&self) -> Catalog {
        Catalog::new(self.wheels.clone(), self.spoilers.clone())
    }

    pub fn settings(&self) -> ApplierSettings {
        ApplierSettings {
            paint_channel: self.paint_channel.clone(),
            default_paint: self.default_paint,
            upgrades: self.upgrades,
        }
    }

    /// Non-positive values disable the timeout; values a [`Duration`] cannot
    /// hold are ignored with a warning.
    pub fn idle_timeout(&self) -> Option<Duration> {
        let secs = self.idle_timeout_secs.filter(|secs| *secs > 0.0)?;
        match Duration::try_from_secs_f32(secs) {
            Ok(timeout) => Some(timeout),
            Err(e) => {
                warn!("ignoring idle_timeout_secs = {secs}: {e}");
                None
            }
        }
    }

    pub fn context(&self, store: Arc<dyn KeyValueStore + Send + Sync>) -> CustomizationContext {
        CustomizationContext::new(self.catalog(), store, self.settings())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
storage_dir = "profiles/one"
paint_channel = "paint"
default_paint = { r = 0.5, g = 0.5, b = 0.5 }
idle_timeout_secs = 90.0

[upgrades]
engine = 1.4

[[wheels]]
name = "Sport"
asset = "wheels/sport"

[[wheels]]
name = "Offroad"
asset = "wheels/offroad"

[[spoilers]]
name = "Wing"
asset = "spoilers/wing"
"#;

    #[test]
    fn parses_full_config() {
        let cfg = CustomizationConfig::parse(SAMPLE, Path::new("garage.toml")).unwrap();
        assert_eq!(cfg.storage_dir, PathBuf::from("profiles/one"));
        assert_eq!(cfg.paint_channel, "paint");
        assert_eq!(cfg.default_paint, Rgb::new(0.5, 0.5, 0.5));
        assert_eq!(cfg.idle_timeout(), Some(Duration::from_secs(90)));
        assert_eq!(cfg.upgrades.engine, 1.4);
        // Unspecified curves keep their defaults.
        assert_eq!(cfg.upgrades.brake, UpgradeCurves::default().brake);
        let catalog = cfg.catalog();
        assert_eq!(catalog.wheels().len(), 2);
        assert_eq!(catalog.spoiler(0).unwrap().name, "Wing");
    }

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = CustomizationConfig::parse("", Path::new("empty.toml")).unwrap();
        assert_eq!(cfg, CustomizationConfig::default());
        assert_eq!(cfg.idle_timeout(), None);
    }

    #[test]
    fn non_positive_timeout_is_disabled() {
        let cfg = CustomizationConfig {
            idle_timeout_secs: Some(0.0),
            ..CustomizationConfig::default()
        };
        assert_eq!(cfg.idle_timeout(), None);
    }

    #[test]
    fn unrepresentable_timeout_is_disabled() {
        let cfg = CustomizationConfig::parse("idle_timeout_secs = 1e30", Path::new("huge.toml"))
            .unwrap();
        assert_eq!(cfg.idle_timeout(), None);
        let cfg = CustomizationConfig {
            idle_timeout_secs: Some(f32::INFINITY),
            ..CustomizationConfig::default()
        };
        assert_eq!(cfg.idle_timeout(), None);
    }

    #[test]
    fn bad_toml_reports_path() {
        let err = CustomizationConfig::parse("wheels = 3", Path::new("bad.toml")).unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        assert!(matches!(
            CustomizationConfig::load(&path),
            Err(ConfigError::Io { .. })
        ));
        assert_eq!(
            CustomizationConfig::load_or_default(&path),
            CustomizationConfig::default()
        );
    }
}
