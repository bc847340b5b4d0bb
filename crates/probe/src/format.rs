//! Formatting of captured values for display on the remote side.

use std::sync::Arc;

use conan_protocol::constants::OBJECT_HINT;
use conan_protocol::{Formatted, RenderedBlock, Value};

use crate::serializer::{JsonSerializer, ValueSerializer};

/// Converts captured values into their transmitted representation.
///
/// Total: every value has a representation, and unrecognized object shapes
/// degrade to their type name rather than failing.
#[derive(Clone)]
pub struct MessageFormatter {
    serializer: Arc<dyn ValueSerializer>,
}

impl MessageFormatter {
    pub fn new(serializer: Arc<dyn ValueSerializer>) -> Self {
        Self { serializer }
    }

    /// The serializer used for arrays, objects and request headers.
    pub fn serializer(&self) -> &Arc<dyn ValueSerializer> {
        &self.serializer
    }

    /// Formats a single value. First match wins:
    ///
    /// 1. arrays are serialized as text;
    /// 2. plain objects are serialized and rendered as a block under
    ///    [`OBJECT_HINT`];
    /// 3. callables render their source text as a block;
    /// 4. other objects collapse to their constructor name;
    /// 5. primitives pass through unchanged.
    pub fn format(&self, value: &Value) -> Formatted {
        match value {
            Value::Array(_) => Formatted::Text(self.serializer.serialize(value)),
            Value::Object(_) => {
                let text = self.serializer.serialize(value);
                Formatted::Block(RenderedBlock::render(&text).with_hint(OBJECT_HINT))
            }
            Value::Function(func) => Formatted::Block(RenderedBlock::render(&func.source)),
            Value::Instance(inst) => Formatted::TypeName(inst.type_name.clone()),
            primitive => Formatted::Primitive(primitive.clone()),
        }
    }

    /// Formats call arguments, preserving their order.
    pub fn format_all(&self, args: &[Value]) -> Vec<Formatted> {
        args.iter().map(|arg| self.format(arg)).collect()
    }
}

impl Default for MessageFormatter {
    fn default() -> Self {
        Self::new(Arc::new(JsonSerializer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conan_protocol::Instance;
    use conan_protocol::constants::NBSP;

    #[test]
    fn array_is_serialized_text() {
        let f = MessageFormatter::default();
        let value = Value::Array(vec![1.into(), "two".into()]);
        assert_eq!(
            f.format(&value),
            Formatted::Text(JsonSerializer.serialize(&value))
        );
    }

    #[test]
    fn plain_object_gets_hint_and_block() {
        let f = MessageFormatter::default();
        let value = Value::object([("a", 1)]);

        let Formatted::Block(block) = f.format(&value) else {
            panic!("expected block");
        };
        assert_eq!(block.hint.as_deref(), Some(OBJECT_HINT));
        assert_eq!(block.flatten(), JsonSerializer.serialize(&value));
        // Indentation is carried by placeholders.
        assert_eq!(block.lines[1][..2], [NBSP, NBSP]);
    }

    #[test]
    fn function_renders_source_without_hint() {
        let f = MessageFormatter::default();
        let source = "function add(a, b) {\n  return a + b;\n}";
        let Formatted::Block(block) = f.format(&Value::function("add", source)) else {
            panic!("expected block");
        };
        assert!(block.hint.is_none());
        assert_eq!(block.lines.len(), 3);
        assert_eq!(block.flatten(), source);
    }

    #[test]
    fn instance_is_type_name_only() {
        let f = MessageFormatter::default();
        let value = Value::from(Instance::new("Point").with_field("secret", "xyz"));
        let formatted = f.format(&value);
        assert_eq!(formatted, Formatted::TypeName("Point".into()));
        assert!(!formatted.text().contains("xyz"));
    }

    #[test]
    fn primitives_pass_through() {
        let f = MessageFormatter::default();
        for value in [
            Value::Undefined,
            Value::Null,
            Value::Bool(false),
            Value::Number(1.5),
            Value::from("text"),
        ] {
            assert_eq!(f.format(&value), Formatted::Primitive(value.clone()));
        }
    }

    #[test]
    fn format_all_preserves_order() {
        let f = MessageFormatter::default();
        let out = f.format_all(&["a".into(), 2.into(), Value::Null]);
        assert_eq!(
            out,
            vec![
                Formatted::from("a"),
                Formatted::Primitive(Value::Number(2.0)),
                Formatted::Primitive(Value::Null),
            ]
        );
    }

    #[test]
    fn custom_serializer_is_used() {
        let f = MessageFormatter::new(Arc::new(|_: &Value| "<x>".to_string()));
        assert_eq!(
            f.format(&Value::Array(vec![])),
            Formatted::Text("<x>".into())
        );
    }
}
