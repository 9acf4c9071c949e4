//! Fitted column transformer turning a prepared row into the model's input vector.
//!
//! Numeric columns are median-imputed and standard-scaled; categorical columns
//! are one-hot encoded with unknown categories mapped to all zeros. Numeric
//! outputs come first, in declaration order, followed by the one-hot blocks.

use crate::types::record::FeatureRow;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Fitted statistics for one numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericColumn {
    pub column: String,
    /// Replacement for missing (NaN) values
    pub median: f64,
    pub mean: f64,
    /// Standard deviation used for scaling; must be positive
    pub scale: f64,
}

/// Fitted vocabulary for one categorical column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalColumn {
    pub column: String,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTransformer {
    pub numeric: Vec<NumericColumn>,
    pub categorical: Vec<CategoricalColumn>,
}

impl ColumnTransformer {
    /// Check fitted parameters. Returns a description of the first problem found.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.numeric.is_empty() && self.categorical.is_empty() {
            return Err("preprocessor has no columns".to_string());
        }

        let mut seen = HashSet::new();
        let names = self
            .numeric
            .iter()
            .map(|c| &c.column)
            .chain(self.categorical.iter().map(|c| &c.column));
        for name in names {
            if !seen.insert(name.as_str()) {
                return Err(format!("column '{}' is transformed more than once", name));
            }
        }

        for column in &self.numeric {
            if !column.median.is_finite() || !column.mean.is_finite() {
                return Err(format!("column '{}' has non-finite statistics", column.column));
            }
            if !(column.scale.is_finite() && column.scale > 0.0) {
                return Err(format!(
                    "column '{}' has invalid scale {}",
                    column.column, column.scale
                ));
            }
        }

        for column in &self.categorical {
            if column.categories.is_empty() {
                return Err(format!("column '{}' has no categories", column.column));
            }
        }

        Ok(())
    }

    /// Width of the transformed vector
    pub fn output_width(&self) -> usize {
        self.numeric.len()
            + self
                .categorical
                .iter()
                .map(|c| c.categories.len())
                .sum::<usize>()
    }

    /// Transform one schema-valid row
    pub fn transform(&self, row: &FeatureRow) -> Result<Vec<f64>> {
        let mut output = Vec::with_capacity(self.output_width());

        for column in &self.numeric {
            let value = row
                .number(&column.column)
                .ok_or_else(|| anyhow!("column '{}' is missing or not numeric", column.column))?;
            let value = if value.is_nan() { column.median } else { value };
            output.push((value - column.mean) / column.scale);
        }

        for column in &self.categorical {
            let value = row
                .get(&column.column)
                .and_then(|v| v.as_str())
                .ok_or_else(|| anyhow!("column '{}' is missing or not a string", column.column))?;
            let hit = column.categories.iter().position(|c| c == value);
            if hit.is_none() {
                debug!(column = %column.column, "Unknown category, encoding as all zeros");
            }
            output.extend(
                (0..column.categories.len()).map(|i| if Some(i) == hit { 1.0 } else { 0.0 }),
            );
        }

        Ok(output)
    }
}
