//! Deployment configuration.
//!
//! A [`TranscodeConfig`] bundles everything that is fixed per data source: the expected header
//! line, the typed schema, the source timezone, the token sets and the timestamp pattern. It is
//! built once (in code via [`TranscodeConfig::new`] / [`TranscodeConfig::green_taxi`], or from
//! JSON) and then shared read-only.
//!
//! ```rust
//! use strict_csv_transcode::config::TranscodeConfig;
//!
//! let json = r#"{
//!     "header": ["id", "amount"],
//!     "schema": { "fields": [
//!         { "name": "id", "logical_type": { "type": "small_int" } },
//!         { "name": "amount", "logical_type": { "type": "decimal", "precision": 6, "scale": 2 } }
//!     ] },
//!     "timezone": "Europe/Berlin"
//! }"#;
//! let config = TranscodeConfig::from_json_str(json).unwrap();
//! assert_eq!(config.schema.len(), 2);
//! ```

pub mod green_taxi;

use std::fs;
use std::path::Path;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::encode::{
    AmbiguousTime, EncodeOptions, TokenSets, DEFAULT_TIMESTAMP_FORMAT, DEFAULT_TIMEZONE,
};
use crate::error::{TranscodeError, TranscodeResult};
use crate::types::Schema;

/// Fixed per-source configuration shared by the normalizer and the encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscodeConfig {
    /// Expected header fields, compared exactly and in order against the first line.
    pub header: Vec<String>,
    /// Typed schema of cleaned records; must have as many fields as `header`.
    pub schema: Schema,
    /// IANA timezone of wall-clock timestamps.
    #[serde(default = "default_timezone")]
    pub timezone: Tz,
    /// `chrono` format string for timestamp cells.
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
    /// Null/true/false token sets.
    #[serde(default)]
    pub tokens: TokenSets,
    /// Resolution of ambiguous local times.
    #[serde(default)]
    pub ambiguous_time: AmbiguousTime,
}

fn default_timezone() -> Tz {
    DEFAULT_TIMEZONE
}

fn default_timestamp_format() -> String {
    DEFAULT_TIMESTAMP_FORMAT.to_string()
}

impl TranscodeConfig {
    /// Create a config with default timezone, tokens and timestamp pattern.
    pub fn new<I, S>(header: I, schema: Schema) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            header: header.into_iter().map(Into::into).collect(),
            schema,
            timezone: default_timezone(),
            timestamp_format: default_timestamp_format(),
            tokens: TokenSets::default(),
            ambiguous_time: AmbiguousTime::default(),
        }
    }

    /// Reference configuration for the 2013-09 NYC TLC green taxi trip file.
    pub fn green_taxi() -> Self {
        Self::new(green_taxi::HEADER, green_taxi::schema())
    }

    /// Deserialize and validate a config from JSON text.
    pub fn from_json_str(input: &str) -> TranscodeResult<Self> {
        let config: Self = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Deserialize and validate a config from a JSON file.
    pub fn from_json_path(path: impl AsRef<Path>) -> TranscodeResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check the config invariants.
    ///
    /// - the schema is valid (see [`Schema::validate`])
    /// - the header has exactly one entry per schema field
    /// - no token is both null and boolean, or both true and false
    /// - the timestamp pattern is not empty
    pub fn validate(&self) -> TranscodeResult<()> {
        self.schema.validate()?;

        if self.header.len() != self.schema.len() {
            return Err(TranscodeError::config(format!(
                "header has {} fields but schema declares {}",
                self.header.len(),
                self.schema.len()
            )));
        }

        let tokens = &self.tokens;
        for t in &tokens.true_values {
            if tokens.false_values.contains(t) {
                return Err(TranscodeError::config(format!(
                    "token {t:?} is both a true and a false value"
                )));
            }
        }
        for t in tokens.true_values.iter().chain(&tokens.false_values) {
            if tokens.null_values.contains(t) {
                return Err(TranscodeError::config(format!(
                    "token {t:?} is both a null and a boolean value"
                )));
            }
        }

        if self.timestamp_format.is_empty() {
            return Err(TranscodeError::config("timestamp format is empty"));
        }
        Ok(())
    }

    /// Conversion options for [`crate::encode::encode`].
    pub fn encode_options(&self) -> EncodeOptions {
        EncodeOptions {
            timezone: self.timezone,
            timestamp_format: self.timestamp_format.clone(),
            tokens: self.tokens.clone(),
            ambiguous_time: self.ambiguous_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::TranscodeConfig;
    use crate::encode::AmbiguousTime;
    use crate::error::TranscodeError;
    use crate::types::{Field, LogicalType, Schema};

    #[test]
    fn green_taxi_config_is_valid() {
        let config = TranscodeConfig::green_taxi();
        config.validate().unwrap();
        assert_eq!(config.header.len(), 20);
        assert_eq!(config.timezone.name(), "America/New_York");
    }

    #[test]
    fn header_length_must_match_schema() {
        let config = TranscodeConfig::new(
            ["a", "b"],
            Schema::new(vec![Field::new("a", LogicalType::Bool)]),
        );
        let err = config.validate().unwrap_err();
        assert!(matches!(err, TranscodeError::InvalidConfig { .. }));
    }

    #[test]
    fn overlapping_tokens_are_rejected() {
        let mut config = TranscodeConfig::new(
            ["a"],
            Schema::new(vec![Field::new("a", LogicalType::Bool)]),
        );
        config.tokens.false_values.push("Y".to_string());
        assert!(config.validate().is_err());

        let mut config = TranscodeConfig::new(
            ["a"],
            Schema::new(vec![Field::new("a", LogicalType::Bool)]),
        );
        config.tokens.true_values.push(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn json_round_trip_with_defaults() {
        let json = r#"{
            "header": ["when", "ok"],
            "schema": { "fields": [
                { "name": "when", "logical_type": { "type": "timestamp_local" } },
                { "name": "ok", "logical_type": { "type": "bool" } }
            ] },
            "ambiguous_time": "reject"
        }"#;
        let config = TranscodeConfig::from_json_str(json).unwrap();
        assert_eq!(config.timezone.name(), "America/New_York");
        assert_eq!(config.timestamp_format, "%Y-%m-%d %H:%M:%S");
        assert_eq!(config.tokens.true_values, vec!["Y".to_string()]);
        assert_eq!(config.ambiguous_time, AmbiguousTime::Reject);

        let back = serde_json::to_string(&config).unwrap();
        assert_eq!(TranscodeConfig::from_json_str(&back).unwrap(), config);
    }

    #[test]
    fn json_with_bad_schema_is_rejected() {
        let json = r#"{
            "header": ["x"],
            "schema": { "fields": [
                { "name": "x", "logical_type": { "type": "decimal", "precision": 2, "scale": 4 } }
            ] }
        }"#;
        assert!(matches!(
            TranscodeConfig::from_json_str(json),
            Err(TranscodeError::InvalidConfig { .. })
        ));
        assert!(matches!(
            TranscodeConfig::from_json_str("{"),
            Err(TranscodeError::Json(_))
        ));
    }
}
