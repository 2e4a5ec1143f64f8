//! Protocol rules: framing bytes, text encoding and the command model registry.
//!
//! Rules are built once, validated once, and then shared read-only between
//! every decoder and encoder of a connection.
//!
//! # Example
//!
//! ```
//! use cmdwire::protocol::{CommandModel, ParamTag, ProtocolRules, TextEncoding};
//!
//! let rules = ProtocolRules::builder()
//!     .encoding(TextEncoding::Utf8)
//!     .model(CommandModel::named(1, "Greet", [ParamTag::INT, ParamTag::STRING]))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(rules.start(), b'[');
//! assert!(rules.try_get_model(1).is_some());
//! assert!(rules.try_get_model(2).is_none());
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use super::command::Command;
use super::model::CommandModel;
use super::value::Value;
use super::wire_format::{
    TextEncoding, DEFAULT_DEFINITION, DEFAULT_END, DEFAULT_SEPARATOR, DEFAULT_START,
    TERMINATION_SENTINEL,
};
use crate::error::SchemaError;

/// Immutable protocol configuration shared by decoders and encoders.
#[derive(Debug, Clone)]
pub struct ProtocolRules {
    start: u8,
    separator: u8,
    definition: u8,
    end: u8,
    encoding: TextEncoding,
    /// Models by command id.
    models: HashMap<u16, Arc<CommandModel>>,
}

impl ProtocolRules {
    /// Rules with default framing and encoding over the given models.
    pub fn new(models: impl IntoIterator<Item = CommandModel>) -> Result<Self, SchemaError> {
        Self::builder().models(models).build()
    }

    /// Start building rules.
    pub fn builder() -> ProtocolRulesBuilder {
        ProtocolRulesBuilder::default()
    }

    /// Byte opening every command.
    #[inline]
    pub fn start(&self) -> u8 {
        self.start
    }

    /// Byte between consecutive payloads.
    #[inline]
    pub fn separator(&self) -> u8 {
        self.separator
    }

    /// Byte introducing DYNAMIC and prefixed payloads.
    #[inline]
    pub fn definition(&self) -> u8 {
        self.definition
    }

    /// Byte closing every command.
    #[inline]
    pub fn end(&self) -> u8 {
        self.end
    }

    /// Encoding of STRING payloads.
    #[inline]
    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Look up the model registered under `id`.
    pub fn try_get_model(&self, id: u16) -> Option<&Arc<CommandModel>> {
        self.models.get(&id)
    }

    /// Whether `model` is registered with the same id and parameters.
    pub fn is_registered(&self, model: &CommandModel) -> bool {
        self.models
            .get(&model.id())
            .is_some_and(|registered| registered.params() == model.params())
    }

    /// All registered models, in no particular order.
    pub fn models(&self) -> impl Iterator<Item = &Arc<CommandModel>> {
        self.models.values()
    }

    /// Number of registered models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether no model is registered.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Build a command for the model registered under `id`.
    pub fn command(&self, id: u16, args: impl Into<Vec<Value>>) -> Option<Command> {
        self.try_get_model(id)
            .map(|model| Command::new(Arc::clone(model), args.into()))
    }
}

impl Default for ProtocolRules {
    fn default() -> Self {
        Self {
            start: DEFAULT_START,
            separator: DEFAULT_SEPARATOR,
            definition: DEFAULT_DEFINITION,
            end: DEFAULT_END,
            encoding: TextEncoding::default(),
            models: HashMap::new(),
        }
    }
}

/// Builder for [`ProtocolRules`].
#[derive(Debug, Clone)]
pub struct ProtocolRulesBuilder {
    start: u8,
    separator: u8,
    definition: u8,
    end: u8,
    encoding: TextEncoding,
    models: Vec<CommandModel>,
}

impl Default for ProtocolRulesBuilder {
    fn default() -> Self {
        Self {
            start: DEFAULT_START,
            separator: DEFAULT_SEPARATOR,
            definition: DEFAULT_DEFINITION,
            end: DEFAULT_END,
            encoding: TextEncoding::default(),
            models: Vec::new(),
        }
    }
}

impl ProtocolRulesBuilder {
    /// Set the start byte.
    pub fn start(mut self, byte: u8) -> Self {
        self.start = byte;
        self
    }

    /// Set the separator byte.
    pub fn separator(mut self, byte: u8) -> Self {
        self.separator = byte;
        self
    }

    /// Set the definition byte.
    pub fn definition(mut self, byte: u8) -> Self {
        self.definition = byte;
        self
    }

    /// Set the end byte.
    pub fn end(mut self, byte: u8) -> Self {
        self.end = byte;
        self
    }

    /// Set the text encoding.
    pub fn encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Add one model.
    pub fn model(mut self, model: CommandModel) -> Self {
        self.models.push(model);
        self
    }

    /// Add several models.
    pub fn models(mut self, models: impl IntoIterator<Item = CommandModel>) -> Self {
        self.models.extend(models);
        self
    }

    /// Validate and freeze the rules.
    ///
    /// The start byte may not be `0xFF`, since that byte at a command
    /// boundary means end of stream. Other framing bytes may coincide with
    /// each other or with payload data: every payload is length-driven, so
    /// the reader never scans for them.
    pub fn build(self) -> Result<ProtocolRules, SchemaError> {
        if self.start == TERMINATION_SENTINEL {
            return Err(SchemaError::FramingCollision {
                name: "start",
                value: self.start,
            });
        }

        let mut models = HashMap::with_capacity(self.models.len());
        for model in self.models {
            model.validate()?;
            let id = model.id();
            if models.insert(id, Arc::new(model)).is_some() {
                return Err(SchemaError::DuplicateId(id));
            }
        }

        Ok(ProtocolRules {
            start: self.start,
            separator: self.separator,
            definition: self.definition,
            end: self.end,
            encoding: self.encoding,
            models,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ParamTag;

    #[test]
    fn test_defaults() {
        let rules = ProtocolRules::new([]).unwrap();
        assert_eq!(rules.start(), b'[');
        assert_eq!(rules.separator(), b';');
        assert_eq!(rules.definition(), b'>');
        assert_eq!(rules.end(), b']');
        assert_eq!(rules.encoding(), TextEncoding::Utf16Le);
        assert!(rules.is_empty());
    }

    #[test]
    fn test_lookup_and_registration() {
        let rules = ProtocolRules::new([
            CommandModel::new(1, [ParamTag::INT]),
            CommandModel::new(2, [ParamTag::STRING]),
        ])
        .unwrap();

        assert_eq!(rules.len(), 2);
        assert_eq!(rules.try_get_model(2).unwrap().params(), &[ParamTag::STRING]);
        assert!(rules.try_get_model(3).is_none());

        assert!(rules.is_registered(&CommandModel::new(1, [ParamTag::INT])));
        assert!(!rules.is_registered(&CommandModel::new(1, [ParamTag::UINT])));
        assert!(!rules.is_registered(&CommandModel::new(9, [ParamTag::INT])));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let result = ProtocolRules::new([
            CommandModel::new(1, [ParamTag::INT]),
            CommandModel::new(1, [ParamTag::STRING]),
        ]);
        assert_eq!(result.unwrap_err(), SchemaError::DuplicateId(1));
    }

    #[test]
    fn test_sentinel_start_rejected() {
        let result = ProtocolRules::builder().start(0xFF).build();
        assert!(matches!(
            result,
            Err(SchemaError::FramingCollision { name: "start", .. })
        ));
    }

    #[test]
    fn test_shared_framing_bytes_allowed() {
        let rules = ProtocolRules::builder()
            .separator(b'|')
            .definition(b'|')
            .build()
            .unwrap();
        assert_eq!(rules.separator(), rules.definition());
    }

    #[test]
    fn test_invalid_model_rejected() {
        let result = ProtocolRules::new([CommandModel::new(1, [ParamTag::IF_TRUE])]);
        assert!(matches!(
            result,
            Err(SchemaError::DirectiveWithoutValue { model: 1, .. })
        ));
    }

    #[test]
    fn test_command_convenience() {
        let rules = ProtocolRules::new([CommandModel::new(4, [ParamTag::BYTE])]).unwrap();
        let cmd = rules.command(4, [Value::Byte(9)]).unwrap();
        assert_eq!(cmd.id(), 4);
        assert_eq!(cmd.args(), &[Value::Byte(9)]);
        assert!(rules.command(5, Vec::new()).is_none());
    }
}
