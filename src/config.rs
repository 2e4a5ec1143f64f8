//! Configuration: decoder limits and JSON protocol descriptions.
//!
//! A protocol can be described in JSON and turned into [`ProtocolRules`]:
//!
//! ```
//! use cmdwire::config::ProtocolConfig;
//!
//! let json = r#"{
//!     "start": "[",
//!     "separator": 59,
//!     "encoding": "utf-8",
//!     "models": [
//!         { "id": 1, "name": "Greet", "params": ["INT", "STRING"] },
//!         { "id": 2, "params": ["BOOLEAN", "IF_TRUE", "RAW"] }
//!     ]
//! }"#;
//!
//! let rules = ProtocolConfig::from_json(json).unwrap().into_rules().unwrap();
//! assert_eq!(rules.separator(), b';');
//! assert_eq!(rules.len(), 2);
//! ```
//!
//! Omitted fields take the protocol defaults.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::protocol::{
    CommandModel, ParamTag, ProtocolRules, TextEncoding, DEFAULT_DEFINITION, DEFAULT_END,
    DEFAULT_MAX_ARRAY_LEN, DEFAULT_MAX_PAYLOAD_SIZE, DEFAULT_SEPARATOR, DEFAULT_START,
};

/// Limits and leniency of a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Silently skip bytes before a start byte. When false, any skipped
    /// byte other than `0x00` makes the decode fail with invalid data.
    pub ignore_garbage: bool,
    /// Largest accepted prefixed payload, in bytes.
    pub max_payload_len: u32,
    /// Largest accepted `ARRAY_OF` element count.
    pub max_array_len: u32,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            ignore_garbage: true,
            max_payload_len: DEFAULT_MAX_PAYLOAD_SIZE,
            max_array_len: DEFAULT_MAX_ARRAY_LEN,
        }
    }
}

/// A framing byte written either as a number or as a one-character string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FramingByte {
    Byte(u8),
    Char(char),
}

impl FramingByte {
    fn to_byte(self, name: &'static str) -> Result<u8, ConfigError> {
        match self {
            Self::Byte(b) => Ok(b),
            Self::Char(c) => u8::try_from(c).map_err(|_| ConfigError::InvalidFraming(name)),
        }
    }

    fn from_byte(byte: u8) -> Self {
        if byte.is_ascii_graphic() {
            Self::Char(char::from(byte))
        } else {
            Self::Byte(byte)
        }
    }
}

/// Serializable description of one command model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub id: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Upper-case tag names, e.g. `"INT"`.
    #[serde(default)]
    pub params: Vec<String>,
}

impl ModelConfig {
    fn into_model(self) -> Result<CommandModel, ConfigError> {
        let params = self
            .params
            .iter()
            .map(|name| {
                name.trim()
                    .to_ascii_uppercase()
                    .parse::<ParamTag>()
                    .map_err(|_| ConfigError::UnknownTagName(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(match self.name {
            Some(name) => CommandModel::named(self.id, name, params),
            None => CommandModel::new(self.id, params),
        })
    }
}

/// Serializable description of a whole protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub start: FramingByte,
    pub separator: FramingByte,
    pub definition: FramingByte,
    pub end: FramingByte,
    pub encoding: TextEncoding,
    pub models: Vec<ModelConfig>,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            start: FramingByte::from_byte(DEFAULT_START),
            separator: FramingByte::from_byte(DEFAULT_SEPARATOR),
            definition: FramingByte::from_byte(DEFAULT_DEFINITION),
            end: FramingByte::from_byte(DEFAULT_END),
            encoding: TextEncoding::default(),
            models: Vec::new(),
        }
    }
}

impl ProtocolConfig {
    /// Parse a JSON protocol description.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Resolve tag names and validate into protocol rules.
    pub fn into_rules(self) -> Result<ProtocolRules, ConfigError> {
        let models = self
            .models
            .into_iter()
            .map(ModelConfig::into_model)
            .collect::<Result<Vec<_>, _>>()?;

        let rules = ProtocolRules::builder()
            .start(self.start.to_byte("start")?)
            .separator(self.separator.to_byte("separator")?)
            .definition(self.definition.to_byte("definition")?)
            .end(self.end.to_byte("end")?)
            .encoding(self.encoding)
            .models(models)
            .build()?;
        Ok(rules)
    }
}

impl From<&ProtocolRules> for ProtocolConfig {
    fn from(rules: &ProtocolRules) -> Self {
        let mut models: Vec<ModelConfig> = rules
            .models()
            .map(|model| ModelConfig {
                id: model.id(),
                name: model.name().map(str::to_string),
                params: model.params().iter().map(ToString::to_string).collect(),
            })
            .collect();
        models.sort_by_key(|model| model.id);

        Self {
            start: FramingByte::from_byte(rules.start()),
            separator: FramingByte::from_byte(rules.separator()),
            definition: FramingByte::from_byte(rules.definition()),
            end: FramingByte::from_byte(rules.end()),
            encoding: rules.encoding(),
            models,
        }
    }
}

impl ProtocolRules {
    /// Build rules from a JSON protocol description.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        ProtocolConfig::from_json(json)?.into_rules()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaError;

    #[test]
    fn test_decoder_config_defaults() {
        let config = DecoderConfig::default();
        assert!(config.ignore_garbage);
        assert_eq!(config.max_payload_len, 1024 * 1024 * 1024);
        assert_eq!(config.max_array_len, 16 * 1024 * 1024);

        let partial: DecoderConfig = serde_json::from_str(r#"{"ignore_garbage": false}"#).unwrap();
        assert!(!partial.ignore_garbage);
        assert_eq!(partial.max_array_len, DEFAULT_MAX_ARRAY_LEN);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let rules = ProtocolRules::from_json("{}").unwrap();
        assert_eq!(rules.start(), b'[');
        assert_eq!(rules.end(), b']');
        assert_eq!(rules.encoding(), TextEncoding::Utf16Le);
        assert!(rules.is_empty());
    }

    #[test]
    fn test_framing_as_char_or_number() {
        let rules = ProtocolRules::from_json(r#"{"start": 2, "end": "$", "separator": ","}"#).unwrap();
        assert_eq!(rules.start(), 2);
        assert_eq!(rules.end(), b'$');
        assert_eq!(rules.separator(), b',');
    }

    #[test]
    fn test_framing_outside_byte_range() {
        let result = ProtocolRules::from_json(r#"{"end": "€"}"#);
        assert!(matches!(result, Err(ConfigError::InvalidFraming("end"))));

        let result = ProtocolRules::from_json(r#"{"end": 300}"#);
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_tag_names_case_insensitive() {
        let rules = ProtocolRules::from_json(
            r#"{"models": [{"id": 3, "params": ["array_of", " Double "]}]}"#,
        )
        .unwrap();
        assert_eq!(
            rules.try_get_model(3).unwrap().params(),
            &[ParamTag::ARRAY_OF, ParamTag::DOUBLE]
        );
    }

    #[test]
    fn test_unknown_tag_name() {
        let result = ProtocolRules::from_json(r#"{"models": [{"id": 1, "params": ["INT128"]}]}"#);
        assert!(matches!(result, Err(ConfigError::UnknownTagName(name)) if name == "INT128"));
    }

    #[test]
    fn test_schema_errors_surface() {
        let result = ProtocolRules::from_json(
            r#"{"models": [{"id": 1, "params": []}, {"id": 1, "params": ["INT"]}]}"#,
        );
        assert!(matches!(
            result,
            Err(ConfigError::Schema(SchemaError::DuplicateId(1)))
        ));
    }

    #[test]
    fn test_rules_to_config_round_trip() {
        let rules = ProtocolRules::builder()
            .start(0x02)
            .encoding(TextEncoding::Latin1)
            .model(CommandModel::named(2, "B", [ParamTag::RAW]))
            .model(CommandModel::new(1, [ParamTag::INT, ParamTag::IF_ZERO, ParamTag::GUID]))
            .build()
            .unwrap();

        let config = ProtocolConfig::from(&rules);
        assert_eq!(config.start, FramingByte::Byte(0x02));
        assert_eq!(config.models[0].id, 1);
        assert_eq!(config.models[0].params, ["INT", "IF_ZERO", "GUID"]);

        let json = config.to_json().unwrap();
        let rebuilt = ProtocolRules::from_json(&json).unwrap();
        assert_eq!(rebuilt.start(), 0x02);
        assert_eq!(rebuilt.encoding(), TextEncoding::Latin1);
        assert!(rebuilt.is_registered(rules.try_get_model(1).unwrap()));
        assert_eq!(rebuilt.try_get_model(2).unwrap().name(), Some("B"));
    }
}
