//! Core/residual partitioning by density clustering
//!
//! Rows are standardized on the technical-block columns and clustered with
//! DBSCAN. Label 0 is the core partition, noise is the residual partition;
//! rows in any other cluster are left out of both.

use crate::config::PipelineConfig;
use crate::dataset::Dataset;
use crate::error::{CostBenchError, Result};
use crate::preprocessing::StandardScaler;
use crate::training::{DBSCAN, NOISE_LABEL};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Label of the dense majority cluster
pub const CORE_LABEL: i64 = 0;

/// Which side of the clustering a row ended up on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionKind {
    Core,
    Residual,
}

impl PartitionKind {
    pub const ALL: [PartitionKind; 2] = [PartitionKind::Core, PartitionKind::Residual];

    pub fn name(&self) -> &'static str {
        match self {
            PartitionKind::Core => "core",
            PartitionKind::Residual => "residual",
        }
    }

    fn label(&self) -> i64 {
        match self {
            PartitionKind::Core => CORE_LABEL,
            PartitionKind::Residual => NOISE_LABEL,
        }
    }
}

impl fmt::Display for PartitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of partitioning one dataset
#[derive(Debug, Clone)]
pub struct Partition {
    pub core: Dataset,
    pub residual: Dataset,
    /// One label per input row
    pub labels: Vec<i64>,
    /// Technical columns actually clustered on, in scaler order
    pub features: Vec<String>,
    pub scaler: StandardScaler,
    pub clusterer: DBSCAN,
}

impl Partition {
    pub fn get(&self, kind: PartitionKind) -> &Dataset {
        match kind {
            PartitionKind::Core => &self.core,
            PartitionKind::Residual => &self.residual,
        }
    }

    /// Rows that belong to neither partition
    pub fn n_discarded(&self) -> usize {
        self.labels
            .iter()
            .filter(|&&l| l != CORE_LABEL && l != NOISE_LABEL)
            .count()
    }
}

/// DBSCAN partitioner over an injected set of technical columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterPartitioner {
    pub technical_features: Vec<String>,
    pub eps: f64,
    pub min_samples: usize,
}

impl ClusterPartitioner {
    pub fn new(technical_features: Vec<String>, eps: f64, min_samples: usize) -> Self {
        Self {
            technical_features,
            eps,
            min_samples,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.technical_features.clone(), config.eps, config.min_samples)
    }

    /// Technical columns present in `data`; absent ones are reported and skipped
    fn present_features(&self, data: &Dataset) -> Result<Vec<String>> {
        let (present, missing): (Vec<String>, Vec<String>) = self
            .technical_features
            .iter()
            .cloned()
            .partition(|name| data.has_column(name) && name != data.target());

        if present.is_empty() {
            return Err(CostBenchError::FeatureNotFound(format!(
                "none of the {} technical features are present",
                self.technical_features.len()
            )));
        }
        if !missing.is_empty() {
            warn!(
                missing = missing.len(),
                used = present.len(),
                first_missing = %missing[0],
                "Technical features absent from dataset"
            );
        }
        Ok(present)
    }

    /// Fit the scaler on `data`, cluster, and split into core and residual
    pub fn partition(&self, data: &Dataset) -> Result<Partition> {
        let features = self.present_features(data)?;
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&data.feature_matrix(&features)?)?;
        self.cluster(data, features, scaler, &scaled)
    }

    /// Reuse a scaler fitted elsewhere; DBSCAN itself is refit on `data`
    pub fn partition_with_scaler(
        &self,
        data: &Dataset,
        scaler: &StandardScaler,
        features: &[String],
    ) -> Result<Partition> {
        let scaled = scaler.transform(&data.feature_matrix(features)?)?;
        self.cluster(data, features.to_vec(), scaler.clone(), &scaled)
    }

    fn cluster(
        &self,
        data: &Dataset,
        features: Vec<String>,
        scaler: StandardScaler,
        scaled: &ndarray::Array2<f64>,
    ) -> Result<Partition> {
        let mut clusterer = DBSCAN::new(self.eps, self.min_samples);
        let labels = clusterer.fit_predict(scaled)?;

        let split = |kind: PartitionKind| -> Result<Dataset> {
            let mask: Vec<bool> = labels.iter().map(|&l| l == kind.label()).collect();
            data.filter_rows(&mask)
        };
        let core = split(PartitionKind::Core)?;
        let residual = split(PartitionKind::Residual)?;

        let partition = Partition {
            core,
            residual,
            labels,
            features,
            scaler,
            clusterer,
        };
        info!(
            rows = data.height(),
            clusters = partition.clusterer.n_clusters_found,
            core = partition.core.height(),
            residual = partition.residual.height(),
            discarded = partition.n_discarded(),
            "Cluster partition"
        );
        Ok(partition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 20 tight points around the origin, 4 far-away singletons
    fn clustered(offset: f64) -> Dataset {
        let mut t1 = Vec::new();
        let mut t2 = Vec::new();
        for i in 0..20 {
            t1.push(Some(offset + (i % 5) as f64 * 0.01));
            t2.push(Some(offset + (i / 5) as f64 * 0.01));
        }
        for (a, b) in [(10.0, 0.0), (-10.0, 0.0), (0.0, 10.0), (0.0, -10.0)] {
            t1.push(Some(offset + a));
            t2.push(Some(offset + b));
        }
        let y: Vec<Option<f64>> = (0..24).map(|i| Some(i as f64)).collect();
        Dataset::from_columns(
            vec![("t1".to_string(), t1), ("t2".to_string(), t2), ("y".to_string(), y)],
            "y",
        )
        .unwrap()
    }

    fn partitioner() -> ClusterPartitioner {
        ClusterPartitioner::new(vec!["t1".into(), "t2".into(), "absent".into()], 0.5, 5)
    }

    #[test]
    fn test_partition_core_and_residual() {
        let data = clustered(0.0);
        let p = partitioner().partition(&data).unwrap();

        assert_eq!(p.core.height(), 20);
        assert_eq!(p.residual.height(), 4);
        assert_eq!(p.n_discarded(), 0);
        assert_eq!(p.features, vec!["t1".to_string(), "t2".to_string()]);
        assert_eq!(p.labels.len(), 24);
    }

    #[test]
    fn test_partitions_are_disjoint_subsets() {
        let data = clustered(0.0);
        let p = partitioner().partition(&data).unwrap();

        let core_y = p.core.column_values("y").unwrap();
        let residual_y = p.residual.column_values("y").unwrap();
        for v in &core_y {
            assert!(!residual_y.contains(v));
        }
        assert_eq!(core_y.len() + residual_y.len() + p.n_discarded(), data.height());
    }

    #[test]
    fn test_reused_scaler_refits_clustering() {
        let train = clustered(0.0);
        let test = clustered(0.05);
        let fitted = partitioner().partition(&train).unwrap();

        let p = partitioner()
            .partition_with_scaler(&test, &fitted.scaler, &fitted.features)
            .unwrap();
        assert_eq!(p.core.height(), 20);
        assert_eq!(p.residual.height(), 4);
        assert_eq!(p.scaler.mean(), fitted.scaler.mean());
    }

    #[test]
    fn test_no_technical_features() {
        let data = clustered(0.0);
        let err = ClusterPartitioner::new(vec!["nope".into()], 0.5, 5)
            .partition(&data)
            .unwrap_err();
        assert!(matches!(err, CostBenchError::FeatureNotFound(_)));
    }
}
