use serde::{Deserialize, Serialize};
use vehicle_api::{SpoilerVariant, WheelVariant};

/// Ordered wheel and spoiler variants offered in the customization screen.
///
/// Loadouts refer to variants by position, so the order is part of the save
/// format. A catalog may shrink between releases; callers must go through
/// [`Catalog::wheel`] / [`Catalog::spoiler`] rather than trusting an index.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    wheels: Vec<WheelVariant>,
    #[serde(default)]
    spoilers: Vec<SpoilerVariant>,
}

impl Catalog {
    pub fn new(wheels: Vec<WheelVariant>, spoilers: Vec<SpoilerVariant>) -> Self {
        Self { wheels, spoilers }
    }

    pub fn wheel(&self, index: usize) -> Option<&WheelVariant> {
        self.wheels.get(index)
    }

    pub fn spoiler(&self, index: usize) -> Option<&SpoilerVariant> {
        self.spoilers.get(index)
    }

    pub fn wheels(&self) -> &[WheelVariant] {
        &self.wheels
    }

    pub fn spoilers(&self) -> &[SpoilerVariant] {
        &self.spoilers
    }
}
