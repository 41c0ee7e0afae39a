//! Solar-PV technology parameters.
//!
//! One set of global defaults plus optional per-profile overrides, addressed
//! either by profile key (`solar_production__<slug>`) or by load order. A field
//! set on an override beats the global value; unset fields inherit it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Partial parameter set for one profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileParamsOverride {
    pub efficiency: Option<f64>,
    pub capital_cost_per_kw: Option<f64>,
    pub om_per_kw_year: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileOverrides {
    #[default]
    None,
    /// Keyed by profile series key.
    ByKey(BTreeMap<String, ProfileParamsOverride>),
    /// First entry applies to the first profile key, and so on.
    ByPosition(Vec<ProfileParamsOverride>),
}

impl ProfileOverrides {
    fn for_profile(&self, position: usize, key: &str) -> Option<&ProfileParamsOverride> {
        match self {
            ProfileOverrides::None => None,
            ProfileOverrides::ByKey(map) => map.get(key),
            ProfileOverrides::ByPosition(list) => list.get(position),
        }
    }
}

/// Fully populated parameters of one profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedProfileParams {
    pub key: String,
    pub efficiency: f64,
    pub capital_cost_per_kw: f64,
    pub om_per_kw_year: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolarPvParams {
    /// Derating for soiling and inverter losses, 0..1.
    pub efficiency: f64,
    /// $/kW, one-time.
    pub capital_cost_per_kw: f64,
    /// $/kW-year.
    pub om_per_kw_year: f64,
    /// Per-node footprint cap on the sum of capacity / efficiency; `None` = unlimited.
    pub max_capacity_area: Option<f64>,
    pub params_by_profile: ProfileOverrides,
    /// node key -> profile key -> installed kW.
    pub existing_capacity: BTreeMap<String, BTreeMap<String, f64>>,
}

impl Default for SolarPvParams {
    fn default() -> Self {
        Self {
            efficiency: 0.2,
            capital_cost_per_kw: 1500.0,
            om_per_kw_year: 20.0,
            max_capacity_area: None,
            params_by_profile: ProfileOverrides::None,
            existing_capacity: BTreeMap::new(),
        }
    }
}

impl SolarPvParams {
    /// One parameter set per profile key, in key order.
    pub fn resolve(&self, keys: &[String]) -> Vec<ResolvedProfileParams> {
        keys.iter()
            .enumerate()
            .map(|(i, key)| {
                let o = self.params_by_profile.for_profile(i, key).cloned().unwrap_or_default();
                ResolvedProfileParams {
                    key: key.clone(),
                    efficiency: o.efficiency.unwrap_or(self.efficiency),
                    capital_cost_per_kw: o.capital_cost_per_kw.unwrap_or(self.capital_cost_per_kw),
                    om_per_kw_year: o.om_per_kw_year.unwrap_or(self.om_per_kw_year),
                }
            })
            .collect()
    }

    /// Installed capacity (kW) of `profile` at `node`; 0 unless configured.
    pub fn existing_capacity(&self, node: &str, profile: &str) -> f64 {
        self.existing_capacity
            .get(node)
            .and_then(|by_profile| by_profile.get(profile))
            .copied()
            .unwrap_or(0.0)
    }

    /// Area limit, ignoring negative values.
    pub fn area_limit(&self) -> Option<f64> {
        self.max_capacity_area.filter(|a| *a >= 0.0)
    }
}
