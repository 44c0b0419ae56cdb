//! Command-line garage: applies one customization request to a headless
//! vehicle and prints the resulting loadout.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use customization::{
    CustomizationApplier, CustomizationConfig, CustomizationManager, HeadlessVehicle,
    UpgradeCategory,
};
use log::info;
use storage::FileStore;
use vehicle_api::{CapabilityFlags, Rgb, VehicleId};

#[derive(Parser, Debug)]
#[command(about = "Customize a vehicle's saved loadout")]
pub struct Cli {
    /// Garage configuration file.
    #[arg(long, env = "SHOWROOM_CONFIG", default_value = "showroom.toml")]
    pub config: PathBuf,

    /// Overrides `storage_dir` from the configuration.
    #[arg(long, env = "SHOWROOM_STORAGE_DIR")]
    pub storage_dir: Option<PathBuf>,

    /// Vehicle whose loadout is edited.
    #[arg(long, default_value = "demo")]
    pub vehicle: String,

    /// Optional parts the vehicle can carry.
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = [Mount::Spoiler])]
    pub mounts: Vec<Mount>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the saved loadout.
    Show,
    /// List the wheel and spoiler catalog.
    Catalog,
    /// Paint the body; components range from 0 to 1.
    Paint { r: f32, g: f32, b: f32 },
    /// Fit a wheel set by catalog index, or -1 for stock wheels.
    Wheel {
        #[arg(allow_hyphen_values = true)]
        index: Selection,
    },
    /// Fit a spoiler by catalog index, or -1 for none.
    Spoiler {
        #[arg(allow_hyphen_values = true)]
        index: Selection,
    },
    Siren {
        #[arg(value_enum)]
        state: Toggle,
    },
    /// Raise an upgrade category (engine, handling, brake) by one level.
    Upgrade { category: UpgradeCategory },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mount {
    Spoiler,
    Siren,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

/// Catalog slot given on the command line; `-1` or `none` means unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection(pub Option<usize>);

impl FromStr for Selection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "-1" || s.eq_ignore_ascii_case("none") {
            return Ok(Selection(None));
        }
        s.parse::<usize>()
            .map(|i| Selection(Some(i)))
            .map_err(|_| format!("expected a catalog index or -1, got {s:?}"))
    }
}

fn capabilities(mounts: &[Mount]) -> CapabilityFlags {
    mounts.iter().fold(CapabilityFlags::empty(), |flags, mount| {
        flags
            | match mount {
                Mount::Spoiler => CapabilityFlags::SPOILER_MOUNT,
                Mount::Siren => CapabilityFlags::SIREN_MOUNT,
            }
    })
}

/// Execute `cli` and return the text to print.
pub fn run(cli: Cli) -> Result<String> {
    let config = CustomizationConfig::load_or_default(&cli.config);

    if let Command::Catalog = cli.command {
        return serde_json::to_string_pretty(&config.catalog()).context("encoding catalog");
    }

    let storage_dir = cli
        .storage_dir
        .clone()
        .unwrap_or_else(|| config.storage_dir.clone());
    info!("using loadouts in {}", storage_dir.display());
    let ctx = config.context(Arc::new(FileStore::new(storage_dir)));

    let id = VehicleId::new(cli.vehicle.as_str());
    let vehicle = HeadlessVehicle::new(id.clone()).with_capabilities(capabilities(&cli.mounts));
    let mut manager = CustomizationManager::new(config.idle_timeout());
    manager.register(CustomizationApplier::attach(vehicle, ctx));
    manager.on_vehicle_entered(&id)?;

    let accepted = match &cli.command {
        Command::Show | Command::Catalog => true,
        Command::Paint { r, g, b } => manager.paint(Rgb::new(*r, *g, *b)),
        Command::Wheel { index } => manager.change_wheel(index.0),
        Command::Spoiler { index } => manager.change_spoiler(index.0),
        Command::Siren { state } => manager.change_siren(*state == Toggle::On),
        Command::Upgrade { category } => manager.upgrade(*category).is_some(),
    };

    let record = manager
        .active_applier()
        .map(|applier| applier.record().clone())
        .context("customization session ended unexpectedly")?;
    manager.on_vehicle_exited(&id);

    if !accepted {
        bail!("{:?} was rejected for {id}", cli.command);
    }
    serde_json::to_string_pretty(&record).context("encoding loadout")
}
