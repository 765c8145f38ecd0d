//! Column aggregation by naming convention
//!
//! Voltage-level variables come as `<prefix>.N<k>` with `k` in 1..=7. The
//! aggregator sums each prefix over the bands N1-N4 and N5-N7 and drops the
//! summed originals. Columns that already carry an aggregate marker (`tot`,
//! `sum`) are handled by [`AggregateNaming`].

use crate::config::PipelineConfig;
use crate::dataset::Dataset;
use crate::error::Result;
use std::ops::RangeInclusive;
use tracing::debug;

/// Level bands summed into one column each, with their name suffix
pub const LEVEL_BANDS: [(RangeInclusive<u32>, &str); 2] = [(1..=4, "N1to4"), (5..=7, "N5to7")];

/// Classifies column names by the aggregate markers they carry
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateNaming {
    markers: Vec<String>,
}

impl Default for AggregateNaming {
    fn default() -> Self {
        Self::new(["tot", "sum"])
    }
}

impl AggregateNaming {
    pub fn new<S: Into<String>>(markers: impl IntoIterator<Item = S>) -> Self {
        Self {
            markers: markers.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.aggregate_markers.iter().cloned())
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    /// The name ends with a marker (a pre-computed total)
    pub fn is_aggregate(&self, name: &str) -> bool {
        self.markers.iter().any(|m| name.ends_with(m.as_str()))
    }

    /// The name contains a marker anywhere
    pub fn mentions_aggregate(&self, name: &str) -> bool {
        self.markers.iter().any(|m| name.contains(m.as_str()))
    }
}

/// Split `<prefix>.N<k>` into its prefix and level `k` (1..=7).
///
/// The prefix is everything before the first `.N`; the name must be exactly
/// `<prefix>.N<k>` with no padding or suffix.
pub fn level_member(name: &str) -> Option<(&str, u32)> {
    let (prefix, rest) = name.split_once(".N")?;
    let level: u32 = rest.parse().ok()?;
    if !(1..=7).contains(&level) || rest != level.to_string() {
        return None;
    }
    Some((prefix, level))
}

/// Name of the summed column for a prefix and band suffix
pub fn aggregate_name(prefix: &str, band: &str) -> String {
    format!("{}_agg_{}", prefix, band)
}

/// Sum `<prefix>.N<k>` columns per band and drop the originals.
///
/// Missing cells count as 0 in the sums. Groups are emitted in order of
/// their first member; the target column is never aggregated.
pub fn aggregate_groups(dataset: &Dataset) -> Result<Dataset> {
    let mut prefixes: Vec<String> = Vec::new();
    for name in dataset.feature_names() {
        if let Some((prefix, _)) = level_member(&name) {
            if !prefixes.iter().any(|p| p == prefix) {
                prefixes.push(prefix.to_string());
            }
        }
    }

    let mut members_to_drop: Vec<String> = Vec::new();
    let mut new_columns: Vec<(String, Vec<Option<f64>>)> = Vec::new();

    for prefix in &prefixes {
        for (band, suffix) in LEVEL_BANDS.iter() {
            let members: Vec<String> = band
                .clone()
                .map(|k| format!("{}.N{}", prefix, k))
                .filter(|name| name != dataset.target() && dataset.has_column(name))
                .collect();
            if members.is_empty() {
                continue;
            }

            let mut sums = vec![0.0; dataset.height()];
            for member in &members {
                for (acc, v) in sums.iter_mut().zip(dataset.column_values(member)?) {
                    *acc += v.unwrap_or(0.0);
                }
            }

            let name = aggregate_name(prefix, suffix);
            debug!(column = %name, members = members.len(), "Aggregated level band");
            new_columns.push((name, sums.into_iter().map(Some).collect()));
            members_to_drop.extend(members);
        }
    }

    let mut out = dataset.drop_columns(&members_to_drop)?;
    for (name, values) in new_columns {
        out = out.with_column(&name, values)?;
    }
    Ok(out)
}

/// Remove every feature whose name mentions an aggregate marker
pub fn drop_marked_columns(dataset: &Dataset, naming: &AggregateNaming) -> Result<Dataset> {
    dataset.retain_columns(|name| !naming.mentions_aggregate(name))
}
