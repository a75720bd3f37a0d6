//! Input normalization.
//!
//! Turns a loosely typed request into a [`CanonicalRecord`]: categories are
//! title-cased so they line up with the training vocabulary, numeric fields are
//! coerced and rounded to one decimal, and absent fields either take a
//! declared default (lenient) or fail the request (strict).

use crate::error::{InvalidField, PipelineError};
use crate::types::request::{json_kind, CanonicalRecord, RawRequest};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// How absent request fields are handled
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Absent fields take their declared default
    #[default]
    Lenient,
    /// Every required field must be present
    Strict,
}

pub const CROP_PLANTED: &str = "crop_planted";
pub const SOIL_TYPE: &str = "soil_type";
pub const SOIL_MOISTURE: &str = "soil_moisture";
pub const TEMPERATURE: &str = "temperature";
pub const HUMIDITY: &str = "humidity";
pub const WATER_LEVEL: &str = "water_level";
pub const AGE_OF_CROP: &str = "age_of_crop";

/// Request fields the model needs, in the order they are reported
pub const REQUIRED_FIELDS: [&str; 7] = [
    CROP_PLANTED,
    SOIL_TYPE,
    SOIL_MOISTURE,
    TEMPERATURE,
    HUMIDITY,
    WATER_LEVEL,
    AGE_OF_CROP,
];

const DEFAULT_CROP: &str = "Corn";
const DEFAULT_SOIL: &str = "Red Soil";
const DEFAULT_SOIL_MOISTURE: f64 = 0.0;
const DEFAULT_TEMPERATURE: f64 = 25.0;
const DEFAULT_HUMIDITY: f64 = 50.0;
const DEFAULT_WATER_LEVEL: f64 = 0.0;
const DEFAULT_CROP_AGE: i64 = 1;

// Ages beyond this cannot round-trip through f64 as integers.
const MAX_CROP_AGE: f64 = 9.0e15;

// The model consumes f32; anything larger would reach it as infinity.
const MAX_MAGNITUDE: f64 = f32::MAX as f64;

/// Validates and coerces raw request fields
#[derive(Debug, Clone, Copy, Default)]
pub struct InputNormalizer {
    mode: ValidationMode,
}

impl InputNormalizer {
    pub fn new(mode: ValidationMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// Produce a canonical record or a validation error naming every offending field
    pub fn normalize(&self, raw: &RawRequest) -> Result<CanonicalRecord, PipelineError> {
        if self.mode == ValidationMode::Strict {
            let missing: Vec<String> = REQUIRED_FIELDS
                .iter()
                .filter(|field| raw.get(field).is_none())
                .map(|field| field.to_string())
                .collect();
            if !missing.is_empty() {
                debug!(missing = ?missing, "Rejecting request with missing fields");
                return Err(PipelineError::missing(missing));
            }
        }

        let mut invalid = Vec::new();

        let crop_name = collect(category(raw, CROP_PLANTED, DEFAULT_CROP), &mut invalid);
        let soil_type = collect(category(raw, SOIL_TYPE, DEFAULT_SOIL), &mut invalid);
        let soil_moisture = collect(
            number(raw, SOIL_MOISTURE, DEFAULT_SOIL_MOISTURE),
            &mut invalid,
        );
        let temperature = collect(number(raw, TEMPERATURE, DEFAULT_TEMPERATURE), &mut invalid);
        let humidity = collect(number(raw, HUMIDITY, DEFAULT_HUMIDITY), &mut invalid);
        let water_level = collect(number(raw, WATER_LEVEL, DEFAULT_WATER_LEVEL), &mut invalid);
        let crop_age = collect(integer(raw, AGE_OF_CROP, DEFAULT_CROP_AGE), &mut invalid);

        if !invalid.is_empty() {
            return Err(PipelineError::invalid(invalid));
        }

        Ok(CanonicalRecord {
            crop_name: crop_name.unwrap_or_default(),
            soil_type: soil_type.unwrap_or_default(),
            soil_moisture: soil_moisture.unwrap_or_default(),
            temperature: temperature.unwrap_or_default(),
            humidity: humidity.unwrap_or_default(),
            water_level: water_level.unwrap_or_default(),
            crop_age: crop_age.unwrap_or_default(),
            rainfall: None,
        })
    }
}

fn collect<T>(result: Result<T, InvalidField>, invalid: &mut Vec<InvalidField>) -> Option<T> {
    result.map_err(|e| invalid.push(e)).ok()
}

fn category(raw: &RawRequest, field: &str, default: &str) -> Result<String, InvalidField> {
    let text = match raw.get(field) {
        None => return Ok(default.to_string()),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(InvalidField::new(
                field,
                format!("expected text, got {}", json_kind(other)),
            ))
        }
    };

    // An empty category is an unseen value; the encoder applies its fallback
    Ok(to_title_case(&text))
}

fn coerce_f64(raw: &RawRequest, field: &str) -> Result<Option<f64>, InvalidField> {
    let value = match raw.get(field) {
        None => return Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| InvalidField::new(field, "number out of range"))?,
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| InvalidField::new(field, format!("'{}' is not a number", s)))?,
        Some(other) => {
            return Err(InvalidField::new(
                field,
                format!("expected a number, got {}", json_kind(other)),
            ))
        }
    };

    if !value.is_finite() {
        return Err(InvalidField::new(field, "must be finite"));
    }
    if value.abs() > MAX_MAGNITUDE {
        return Err(InvalidField::new(field, "out of range"));
    }
    Ok(Some(value))
}

fn number(raw: &RawRequest, field: &str, default: f64) -> Result<f64, InvalidField> {
    let Some(value) = coerce_f64(raw, field)? else {
        return Ok(default);
    };
    let rounded = round_to(value, 1);
    if !rounded.is_finite() || rounded.abs() > MAX_MAGNITUDE {
        return Err(InvalidField::new(field, "out of range"));
    }
    Ok(rounded)
}

fn integer(raw: &RawRequest, field: &str, default: i64) -> Result<i64, InvalidField> {
    match coerce_f64(raw, field)? {
        None => Ok(default),
        Some(v) if v.abs() >= MAX_CROP_AGE => Err(InvalidField::new(field, "out of range")),
        Some(v) => Ok(v.trunc() as i64),
    }
}

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Title-case: a letter following a non-letter is uppercased, every other letter lowercased
pub fn to_title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_is_alpha = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if prev_is_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_alpha = true;
        } else {
            out.push(c);
            prev_is_alpha = false;
        }
    }
    out
}
