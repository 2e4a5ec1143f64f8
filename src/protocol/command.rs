//! Command instances: a model paired with its argument values.

use std::fmt;
use std::sync::Arc;

use super::model::CommandModel;
use super::value::Value;

/// One schema-typed unit of work, produced by a decode or consumed by an
/// encode.
///
/// Arguments follow the taken branches of the model: a failed guard omits the
/// guarded value, and an `ARRAY_OF` slot holds a single [`Value::Array`].
#[derive(Debug, Clone)]
pub struct Command {
    model: Arc<CommandModel>,
    args: Vec<Value>,
}

impl Command {
    /// Create a command from its model and arguments.
    pub fn new(model: Arc<CommandModel>, args: Vec<Value>) -> Self {
        Self { model, args }
    }

    /// Create a command without arguments.
    pub fn empty(model: Arc<CommandModel>) -> Self {
        Self {
            model,
            args: Vec::new(),
        }
    }

    /// Command id of the model.
    #[inline]
    pub fn id(&self) -> u16 {
        self.model.id()
    }

    /// The model this command follows.
    #[inline]
    pub fn model(&self) -> &Arc<CommandModel> {
        &self.model
    }

    /// Arguments in wire order.
    #[inline]
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Argument at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// Number of arguments.
    #[inline]
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Whether the command has no arguments.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Consume the command, returning its arguments.
    pub fn into_args(self) -> Vec<Value> {
        self.args
    }
}

impl PartialEq for Command {
    fn eq(&self, other: &Self) -> bool {
        (Arc::ptr_eq(&self.model, &other.model) || self.model == other.model)
            && self.args == other.args
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.model.name() {
            Some(name) => write!(f, "{name}: [")?,
            None => write!(f, "{}: [", self.model.id())?,
        }
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ParamTag;

    #[test]
    fn test_positional_access() {
        let model = Arc::new(CommandModel::new(1, [ParamTag::INT, ParamTag::STRING]));
        let cmd = Command::new(model, vec![Value::Int(42), Value::from("hi")]);

        assert_eq!(cmd.id(), 1);
        assert_eq!(cmd.len(), 2);
        assert_eq!(cmd.get(0), Some(&Value::Int(42)));
        assert_eq!(cmd.get(1).and_then(Value::as_str), Some("hi"));
        assert!(cmd.get(2).is_none());
    }

    #[test]
    fn test_equality_by_model_and_args() {
        let a = Arc::new(CommandModel::new(1, [ParamTag::INT]));
        let b = Arc::new(CommandModel::new(1, [ParamTag::INT]));
        let other = Arc::new(CommandModel::new(2, [ParamTag::INT]));

        assert_eq!(
            Command::new(a.clone(), vec![Value::Int(1)]),
            Command::new(b, vec![Value::Int(1)])
        );
        assert_ne!(
            Command::new(a.clone(), vec![Value::Int(1)]),
            Command::new(a.clone(), vec![Value::Int(2)])
        );
        assert_ne!(
            Command::new(a, vec![Value::Int(1)]),
            Command::new(other, vec![Value::Int(1)])
        );
    }

    #[test]
    fn test_display() {
        let model = Arc::new(CommandModel::named(5, "Move", [ParamTag::INT, ParamTag::STRING]));
        let cmd = Command::new(model, vec![Value::Int(3), Value::from("up")]);
        assert_eq!(cmd.to_string(), "Move: [3, \"up\"]");
    }
}
