//! Command models: the ordered parameter schema behind a command id.

use std::fmt;

use super::param::{Directive, ParamTag};
use crate::error::SchemaError;

/// Immutable parameter schema identified by a 16-bit command id.
///
/// # Example
///
/// ```
/// use cmdwire::protocol::{CommandModel, ParamTag};
///
/// let model = CommandModel::new(7, [ParamTag::BOOLEAN, ParamTag::IF_TRUE, ParamTag::INT]);
/// assert_eq!(model.id(), 7);
/// assert_eq!(model.next_non_special(1), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandModel {
    id: u16,
    name: Option<String>,
    params: Vec<ParamTag>,
}

impl CommandModel {
    /// Create a model from its id and parameter tags.
    pub fn new(id: u16, params: impl Into<Vec<ParamTag>>) -> Self {
        Self {
            id,
            name: None,
            params: params.into(),
        }
    }

    /// Create a model with a display name used in diagnostics.
    pub fn named(id: u16, name: impl Into<String>, params: impl Into<Vec<ParamTag>>) -> Self {
        Self {
            id,
            name: Some(name.into()),
            params: params.into(),
        }
    }

    /// Command id written after the start byte.
    #[inline]
    pub fn id(&self) -> u16 {
        self.id
    }

    /// Display name, if one was given.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Parameter tags in wire order.
    #[inline]
    pub fn params(&self) -> &[ParamTag] {
        &self.params
    }

    /// Tag at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<ParamTag> {
        self.params.get(index).copied()
    }

    /// Number of parameter slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether the model has no parameter slots.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Index to continue at when a guard fails at `index`.
    ///
    /// Scans forward from `index` until two consecutive non-special tags are
    /// seen and returns the index of the second, or `len()` if there is no
    /// such pair. Jumping there skips exactly one concrete slot along with the
    /// directives attached to it.
    pub fn next_non_special(&self, index: usize) -> usize {
        let mut prev = false;
        for (i, tag) in self.params.iter().enumerate().skip(index) {
            let curr = !tag.is_special();
            if curr && prev {
                return i;
            }
            prev = curr;
        }
        self.params.len()
    }

    /// Check directive placement once, before any stream activity.
    pub fn validate(&self) -> Result<(), SchemaError> {
        for (index, tag) in self.params.iter().copied().enumerate() {
            let Some(directive) = tag.directive() else {
                continue;
            };

            if directive == Directive::ArrayOf {
                match self.get(index + 1) {
                    Some(element) if !element.is_special() => {}
                    _ => {
                        return Err(SchemaError::InvalidArrayElement {
                            model: self.id,
                            index,
                        })
                    }
                }
                continue;
            }

            let guarded = self.guarded_tag(index).ok_or(SchemaError::DirectiveWithoutValue {
                model: self.id,
                index,
                directive: tag,
            })?;

            let testable = match directive {
                Directive::IfTrue => guarded == ParamTag::BOOLEAN || guarded.is_dynamic(),
                _ => {
                    guarded.is_dynamic()
                        || guarded.datatype().is_some_and(|d| d.is_zero_testable())
                }
            };
            if !testable {
                return Err(SchemaError::GuardTypeMismatch {
                    model: self.id,
                    index,
                    directive: tag,
                    guarded,
                });
            }
        }
        Ok(())
    }

    /// Tag of the value a guard at `index` tests.
    ///
    /// This is the nearest preceding concrete tag, or `ARRAY_OF` when that
    /// tag is an array element (the produced value is then the array).
    fn guarded_tag(&self, index: usize) -> Option<ParamTag> {
        let producer = (0..index).rev().find(|&i| !self.params[i].is_special())?;
        if producer > 0 && self.params[producer - 1] == ParamTag::ARRAY_OF {
            return Some(ParamTag::ARRAY_OF);
        }
        Some(self.params[producer])
    }
}

impl fmt::Display for CommandModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name}")?,
            None => write!(f, "{}", self.id)?,
        }
        f.write_str(": ")?;
        for (i, tag) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{tag}")?;
        }
        Ok(())
    }
}
