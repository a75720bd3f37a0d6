//! Request-scoped input records

use crate::error::{InvalidField, PipelineError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Training-time column names of the canonical record
pub mod columns {
    pub const CROP_NAME: &str = "Crop Name";
    pub const SOIL_TYPE: &str = "Soil Type";
    pub const SOIL_MOISTURE: &str = "Soil Moisture (%)";
    pub const TEMPERATURE: &str = "Temp (°C)";
    pub const HUMIDITY: &str = "Humidity (%)";
    pub const WATER_LEVEL: &str = "Water Level (%)";
    pub const CROP_AGE: &str = "Crop Age (days)";
    pub const RAINFALL: &str = "Rainfall (mm)";
    /// Constant column the target-encoded model was trained with
    pub const DUMMY_FEATURE: &str = "Dummy Feature";

    pub const CATEGORICAL: [&str; 2] = [CROP_NAME, SOIL_TYPE];
}

/// Client-supplied fields exactly as received
#[derive(Debug, Clone, Default)]
pub struct RawRequest {
    fields: Map<String, Value>,
}

impl RawRequest {
    /// Wrap a parsed JSON body. Anything other than an object is rejected.
    pub fn from_value(value: Value) -> Result<Self, PipelineError> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(PipelineError::invalid(vec![InvalidField::new(
                "body",
                format!("expected a JSON object, got {}", json_kind(&other)),
            )])),
        }
    }

    /// Parse a request body
    pub fn from_slice(body: &[u8]) -> Result<Self, PipelineError> {
        let value: Value = serde_json::from_slice(body).map_err(|e| {
            PipelineError::invalid(vec![InvalidField::new(
                "body",
                format!("malformed JSON: {}", e),
            )])
        })?;
        Self::from_value(value)
    }

    /// Look up a field. JSON `null` counts as absent.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|v| !v.is_null())
    }

    /// Optional location used for the rainfall lookup
    pub fn city(&self) -> Option<&str> {
        self.get("city")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl From<Map<String, Value>> for RawRequest {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Normalized, correctly typed input consumed by the encoder.
///
/// Serializes with the column names used at training time so it can be
/// echoed back to the client as `features_used`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    #[serde(rename = "Crop Name")]
    pub crop_name: String,

    #[serde(rename = "Soil Type")]
    pub soil_type: String,

    #[serde(rename = "Soil Moisture (%)")]
    pub soil_moisture: f64,

    #[serde(rename = "Temp (°C)")]
    pub temperature: f64,

    #[serde(rename = "Humidity (%)")]
    pub humidity: f64,

    #[serde(rename = "Water Level (%)")]
    pub water_level: f64,

    #[serde(rename = "Crop Age (days)")]
    pub crop_age: i64,

    #[serde(
        rename = "Rainfall (mm)",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub rainfall: Option<f64>,
}

impl CanonicalRecord {
    /// Categorical columns in training order
    pub fn categorical_columns(&self) -> [(&'static str, &str); 2] {
        [
            (columns::CROP_NAME, self.crop_name.as_str()),
            (columns::SOIL_TYPE, self.soil_type.as_str()),
        ]
    }

    /// Category value for a training column name
    pub fn category(&self, column: &str) -> Option<&str> {
        self.categorical_columns()
            .into_iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }

    /// Numeric columns in training order. Rainfall is only present when it was looked up.
    pub fn numeric_columns(&self) -> Vec<(&'static str, f64)> {
        let mut numeric = vec![
            (columns::SOIL_MOISTURE, self.soil_moisture),
            (columns::TEMPERATURE, self.temperature),
            (columns::HUMIDITY, self.humidity),
            (columns::WATER_LEVEL, self.water_level),
            (columns::CROP_AGE, self.crop_age as f64),
        ];
        if let Some(rainfall) = self.rainfall {
            numeric.push((columns::RAINFALL, rainfall));
        }
        numeric
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> CanonicalRecord {
        CanonicalRecord {
            crop_name: "Rice".to_string(),
            soil_type: "Clay".to_string(),
            soil_moisture: 40.0,
            temperature: 28.0,
            humidity: 60.0,
            water_level: 10.0,
            crop_age: 30,
            rainfall: None,
        }
    }

    #[test]
    fn test_null_counts_as_absent() {
        let raw = RawRequest::from_value(json!({"humidity": null, "city": "  "})).unwrap();
        assert!(raw.get("humidity").is_none());
        assert!(raw.city().is_none());
    }

    #[test]
    fn test_non_object_body_rejected() {
        let err = RawRequest::from_value(json!([1, 2, 3])).unwrap_err();
        assert!(err.is_validation());
        assert!(RawRequest::from_slice(b"{not json").is_err());
    }

    #[test]
    fn test_record_serializes_training_columns() {
        let value = serde_json::to_value(record()).unwrap();
        assert_eq!(value["Crop Name"], "Rice");
        assert_eq!(value["Temp (°C)"], 28.0);
        assert_eq!(value["Crop Age (days)"], 30);
        assert!(value.get("Rainfall (mm)").is_none());
    }

    #[test]
    fn test_numeric_columns_include_rainfall_when_present() {
        let mut rec = record();
        assert_eq!(rec.numeric_columns().len(), 5);
        rec.rainfall = Some(1.2);
        let numeric = rec.numeric_columns();
        assert_eq!(numeric.last(), Some(&(columns::RAINFALL, 1.2)));
        assert_eq!(rec.category(columns::SOIL_TYPE), Some("Clay"));
    }
}
