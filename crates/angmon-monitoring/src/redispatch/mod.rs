//! Compensation of the power moved by remedial actions.
//!
//! A strategy shifts generation (and, for shift keys, load) inside one
//! country so that the country's balance absorbs a signed delta. A positive
//! delta raises net generation. Elements listed in the exclusion set were
//! set manually by a remedial action and are never touched.

mod auto;
mod glsk;

pub use auto::AutoRedispatch;
pub use glsk::{GlskDocument, GlskPoint, GlskRedispatch, ShiftKey, ShiftKeyKind};

use angmon_core::{AngmonResult, Country, Megawatts, Network};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub trait RedispatchStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Countries this strategy holds redispatch data for.
    fn covered_countries(&self) -> BTreeSet<Country>;

    fn redispatch(
        &self,
        network: &mut Network,
        country: &Country,
        delta: Megawatts,
        exclusions: &BTreeSet<String>,
    ) -> AngmonResult<RedispatchOutcome>;
}

/// What a redispatch call actually moved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedispatchOutcome {
    pub country: Country,
    pub requested: Megawatts,
    pub realized: Megawatts,
    /// Change in net generation per element (a load decrease counts positive).
    pub shifts: BTreeMap<String, Megawatts>,
}

impl RedispatchOutcome {
    pub fn empty(country: &Country, requested: Megawatts) -> Self {
        Self {
            country: country.clone(),
            requested,
            realized: Megawatts(0.0),
            shifts: BTreeMap::new(),
        }
    }

    pub fn shortfall(&self) -> Megawatts {
        (self.requested - self.realized).abs()
    }
}
