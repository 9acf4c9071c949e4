//! Prepared single-row records handed to the schema validator and preprocessor

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single cell of a prepared record.
///
/// Numbers keep the integer/float distinction of the source so that
/// templates can render `720` rather than `720.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Null,
}

impl FeatureValue {
    /// Numeric view of the value, if it holds one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Int(v) => Some(*v as f64),
            FeatureValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FeatureValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FeatureValue::Int(_) | FeatureValue::Float(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self, FeatureValue::Text(_))
    }

    /// Name of the stored type, used in validation messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FeatureValue::Int(_) => "int",
            FeatureValue::Float(_) => "float",
            FeatureValue::Text(_) => "str",
            FeatureValue::Bool(_) => "bool",
            FeatureValue::Null => "null",
        }
    }

    /// Convert a JSON value. Arrays and objects have no cell representation.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => Some(FeatureValue::Null),
            serde_json::Value::Bool(b) => Some(FeatureValue::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(FeatureValue::Int)
                .or_else(|| n.as_f64().map(FeatureValue::Float)),
            serde_json::Value::String(s) => Some(FeatureValue::Text(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Int(v) => write!(f, "{}", v),
            FeatureValue::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{:.1}", v),
            FeatureValue::Float(v) => write!(f, "{}", v),
            FeatureValue::Text(s) => f.write_str(s),
            FeatureValue::Bool(b) => write!(f, "{}", b),
            FeatureValue::Null => f.write_str("N/A"),
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        FeatureValue::Float(v)
    }
}

impl From<i64> for FeatureValue {
    fn from(v: i64) -> Self {
        FeatureValue::Int(v)
    }
}

impl From<&str> for FeatureValue {
    fn from(v: &str) -> Self {
        FeatureValue::Text(v.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(v: String) -> Self {
        FeatureValue::Text(v)
    }
}

/// One prepared input row: column name to value, iterated in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureRow {
    columns: BTreeMap<String, FeatureValue>,
}

impl FeatureRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<FeatureValue>) {
        self.columns.insert(column.into(), value.into());
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<FeatureValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn remove(&mut self, column: &str) -> Option<FeatureValue> {
        self.columns.remove(column)
    }

    pub fn get(&self, column: &str) -> Option<&FeatureValue> {
        self.columns.get(column)
    }

    /// Numeric value of a column, `None` when absent or not a number
    pub fn number(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(FeatureValue::as_f64)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_keeps_integers() {
        assert_eq!(FeatureValue::from_json(&json!(720)), Some(FeatureValue::Int(720)));
        assert_eq!(FeatureValue::from_json(&json!(0.35)), Some(FeatureValue::Float(0.35)));
        assert_eq!(
            FeatureValue::from_json(&json!("RENT")),
            Some(FeatureValue::Text("RENT".to_string()))
        );
        assert_eq!(FeatureValue::from_json(&json!([1, 2])), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(FeatureValue::Float(5.0).to_string(), "5.0");
        assert_eq!(FeatureValue::Float(2.5).to_string(), "2.5");
        assert_eq!(FeatureValue::Int(3).to_string(), "3");
        assert_eq!(FeatureValue::Null.to_string(), "N/A");
    }

    #[test]
    fn test_row_is_sorted() {
        let row = FeatureRow::new()
            .with("purpose", "car")
            .with("annual_income", 50_000.0)
            .with("credit_score", 700_i64);
        let names: Vec<&str> = row.column_names().collect();
        assert_eq!(names, vec!["annual_income", "credit_score", "purpose"]);
        assert_eq!(row.number("credit_score"), Some(700.0));
        assert_eq!(row.number("purpose"), None);
    }
}
