//! Standard scaling with training-time parameters

use crate::reconciler::{FeatureSchema, FeatureVector};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

/// Center and scale for one column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnScaling {
    pub column: String,
    pub center: f64,
    pub scale: f64,
}

/// Scaler artifact as exported by the training pipeline
#[derive(Debug, Deserialize)]
struct ScalerArtifact {
    columns: Vec<String>,
    #[serde(alias = "center")]
    mean: Vec<f64>,
    scale: Vec<f64>,
}

/// Columns requiring normalization plus their fitted parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ScalingSpec {
    columns: Vec<ColumnScaling>,
}

/// Columns a scaling pass left untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScalingReport {
    /// Scaling columns with no position in the feature schema
    pub absent: Vec<String>,
    /// Scaling columns the record did not provide
    pub defaulted: Vec<String>,
}

impl ScalingReport {
    pub fn skipped(&self) -> usize {
        self.absent.len() + self.defaulted.len()
    }
}

impl ScalingSpec {
    /// Build scaling parameters, rejecting parameters that cannot be applied
    pub fn new(columns: Vec<ColumnScaling>) -> Result<Self> {
        let mut seen = HashSet::new();
        for param in &columns {
            if !seen.insert(param.column.as_str()) {
                bail!("Duplicate scaling column '{}'", param.column);
            }
            if !param.center.is_finite() {
                bail!("Non-finite center for scaling column '{}'", param.column);
            }
            if !param.scale.is_finite() || param.scale == 0.0 {
                bail!(
                    "Scale for column '{}' must be finite and non-zero, got {}",
                    param.column,
                    param.scale
                );
            }
        }
        Ok(Self { columns })
    }

    /// Load the fitted scaler from its JSON artifact
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path)
            .with_context(|| format!("Failed to read scaler from {:?}", path))?;
        let artifact: ScalerArtifact = serde_json::from_slice(&raw)
            .with_context(|| format!("Failed to parse scaler {:?}", path))?;

        if artifact.columns.len() != artifact.mean.len()
            || artifact.columns.len() != artifact.scale.len()
        {
            bail!(
                "Scaler {:?} has {} columns, {} centers and {} scales",
                path,
                artifact.columns.len(),
                artifact.mean.len(),
                artifact.scale.len()
            );
        }

        let columns = artifact
            .columns
            .into_iter()
            .zip(artifact.mean)
            .zip(artifact.scale)
            .map(|((column, center), scale)| ColumnScaling {
                column,
                center,
                scale,
            })
            .collect();

        Self::new(columns).with_context(|| format!("Invalid scaler {:?}", path))
    }

    pub fn columns(&self) -> &[ColumnScaling] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Scaling columns that have no position in `schema`
    pub fn missing_from<'a>(&'a self, schema: &FeatureSchema) -> Vec<&'a str> {
        self.columns
            .iter()
            .filter(|param| !schema.contains(&param.column))
            .map(|param| param.column.as_str())
            .collect()
    }

    /// Apply `(x - center) / scale` to the scaled columns.
    ///
    /// Columns outside the vector's schema and columns the record did not
    /// provide are skipped and reported.
    pub fn apply(&self, mut vector: FeatureVector) -> (FeatureVector, ScalingReport) {
        let mut report = ScalingReport::default();

        for param in &self.columns {
            let Some(idx) = vector.schema().position(&param.column) else {
                report.absent.push(param.column.clone());
                continue;
            };
            if vector.is_defaulted(idx) {
                report.defaulted.push(param.column.clone());
                continue;
            }
            let value = &mut vector.values_mut()[idx];
            *value = ((*value as f64 - param.center) / param.scale) as f32;
        }

        if !report.absent.is_empty() {
            debug!(
                columns = ?report.absent,
                "Scaling columns absent from feature schema, skipped"
            );
        }
        if !report.defaulted.is_empty() {
            warn!(
                columns = ?report.defaulted,
                "Scaling columns missing from claim, left at default"
            );
        }

        (vector, report)
    }
}

/// Scale a reconciled vector; columns outside `spec` pass through unchanged
pub fn scale(vector: FeatureVector, spec: &ScalingSpec) -> FeatureVector {
    spec.apply(vector).0
}
