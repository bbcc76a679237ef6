//! Feature schema reconciliation for classifier inference.
//!
//! Maps an arbitrary claim record onto the exact ordered feature vector
//! the trained model expects. Categorical attributes are expanded into
//! `<column>_<value>` indicator columns, the same encoding the training
//! pipeline produced, then aligned to the training-time column list.

use crate::error::ClaimError;
use crate::types::claim::{ClaimRecord, ClaimValue};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Ordered model input columns fixed at training time
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    columns: Vec<String>,
    positions: HashMap<String, usize>,
}

impl FeatureSchema {
    /// Build a schema from the training column list.
    ///
    /// Empty, blank or duplicated column names mean the artifact is corrupted.
    pub fn new(columns: Vec<String>) -> Result<Self, ClaimError> {
        if columns.is_empty() {
            return Err(ClaimError::SchemaMismatch(
                "feature schema has no columns".to_string(),
            ));
        }

        let mut positions = HashMap::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            if column.trim().is_empty() {
                return Err(ClaimError::SchemaMismatch(format!(
                    "blank column name at position {}",
                    idx
                )));
            }
            if positions.insert(column.clone(), idx).is_some() {
                return Err(ClaimError::SchemaMismatch(format!(
                    "duplicate column '{}'",
                    column
                )));
            }
        }

        Ok(Self { columns, positions })
    }

    /// Load the column list from a JSON array file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path)
            .with_context(|| format!("Failed to read feature schema from {:?}", path))?;
        let columns: Vec<String> = serde_json::from_slice(&raw)
            .with_context(|| format!("Failed to parse feature schema {:?}", path))?;
        Self::new(columns).with_context(|| format!("Invalid feature schema {:?}", path))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Position of a column in the schema
    pub fn position(&self, column: &str) -> Option<usize> {
        self.positions.get(column).copied()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.positions.contains_key(column)
    }
}

/// Model input in schema order.
///
/// Tracks which columns were default-filled because the record did not
/// provide them.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    schema: Arc<FeatureSchema>,
    values: Vec<f32>,
    defaulted: Vec<bool>,
}

impl FeatureVector {
    pub fn schema(&self) -> &Arc<FeatureSchema> {
        &self.schema
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a named column
    pub fn get(&self, column: &str) -> Option<f32> {
        self.schema.position(column).map(|idx| self.values[idx])
    }

    /// Whether the column at `idx` was filled with the default
    pub fn is_defaulted(&self, idx: usize) -> bool {
        self.defaulted.get(idx).copied().unwrap_or(false)
    }

    /// Number of columns filled with the default
    pub fn defaulted_count(&self) -> usize {
        self.defaulted.iter().filter(|&&d| d).count()
    }

    pub(crate) fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }
}

/// Expand a record into encoded columns.
///
/// Text attributes become `<column>_<value>` indicators set to 1, numbers
/// keep their name and value, booleans keep their name as 1 or 0.
pub fn encode(record: &ClaimRecord) -> HashMap<String, f32> {
    let mut encoded = HashMap::with_capacity(record.len());
    for (name, value) in record.iter() {
        match value {
            ClaimValue::Number(n) => {
                encoded.insert(name.to_string(), *n as f32);
            }
            ClaimValue::Bool(b) => {
                encoded.insert(name.to_string(), if *b { 1.0 } else { 0.0 });
            }
            ClaimValue::Text(category) => {
                encoded.insert(format!("{}_{}", name, category), 1.0);
            }
        }
    }
    encoded
}

/// Reconcile a record against the training schema.
///
/// Schema columns missing from the encoded record are filled with 0,
/// encoded columns outside the schema are dropped, and values are laid out
/// in schema order.
pub fn reconcile(
    record: &ClaimRecord,
    schema: &Arc<FeatureSchema>,
) -> Result<FeatureVector, ClaimError> {
    let encoded = encode(record);

    let mut values = Vec::with_capacity(schema.len());
    let mut defaulted = Vec::with_capacity(schema.len());
    for column in schema.columns() {
        match encoded.get(column) {
            Some(&value) => {
                values.push(value);
                defaulted.push(false);
            }
            None => {
                values.push(0.0);
                defaulted.push(true);
            }
        }
    }

    let dropped = encoded.keys().filter(|c| !schema.contains(c)).count();
    if dropped > 0 {
        debug!(
            dropped = dropped,
            encoded = encoded.len(),
            "Dropped encoded columns outside the feature schema"
        );
    }

    if values.len() != schema.len() {
        return Err(ClaimError::SchemaMismatch(format!(
            "reconciled {} values for {} schema columns",
            values.len(),
            schema.len()
        )));
    }

    Ok(FeatureVector {
        schema: Arc::clone(schema),
        values,
        defaulted,
    })
}

/// Reconciler bound to a loaded feature schema.
///
/// Matches the preprocessing done in the training pipeline; vectors come
/// out in the exact column order expected by the classifier.
#[derive(Debug, Clone)]
pub struct Reconciler {
    schema: Arc<FeatureSchema>,
}

impl Reconciler {
    pub fn new(schema: Arc<FeatureSchema>) -> Self {
        Self { schema }
    }

    /// Reconcile a record into a feature vector
    pub fn reconcile(&self, record: &ClaimRecord) -> Result<FeatureVector, ClaimError> {
        reconcile(record, &self.schema)
    }

    pub fn schema(&self) -> &Arc<FeatureSchema> {
        &self.schema
    }

    /// Number of features produced
    pub fn feature_count(&self) -> usize {
        self.schema.len()
    }

    /// Feature names in training order
    pub fn feature_names(&self) -> &[String] {
        self.schema.columns()
    }
}
