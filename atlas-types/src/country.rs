use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Stable country code, e.g. "FRA". Matches the `WB_A3` property of the
/// country data file.
pub type CountryId = String;

/// One ring of `[longitude, latitude]` vertices.
pub type Ring = Vec<[f64; 2]>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Country {
    pub id: CountryId,
    pub name: String,
    pub shape: Vec<Ring>,
}
