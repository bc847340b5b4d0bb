//! Value-to-text serialization used for transmitted values.

use conan_protocol::Value;

/// Turns any captured value, callables included, into transmissible text.
pub trait ValueSerializer: Send + Sync {
    fn serialize(&self, value: &Value) -> String;
}

impl<F> ValueSerializer for F
where
    F: Fn(&Value) -> String + Send + Sync,
{
    fn serialize(&self, value: &Value) -> String {
        self(value)
    }
}

/// Pretty JSON with two-space indentation.
///
/// Callables are written as their source text and instances as their own
/// fields, see [`Value::to_json`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl ValueSerializer for JsonSerializer {
    fn serialize(&self, value: &Value) -> String {
        serde_json::to_string_pretty(&value.to_json()).unwrap_or_else(|_| value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conan_protocol::Instance;

    #[test]
    fn json_is_pretty() {
        let text = JsonSerializer.serialize(&Value::object([("a", 1)]));
        assert_eq!(text, "{\n  \"a\": 1\n}");
    }

    #[test]
    fn json_keeps_callable_properties() {
        let value = Value::object([
            ("n", Value::from(2)),
            ("f", Value::function("f", "() => 1")),
        ]);
        let text = JsonSerializer.serialize(&value);
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, serde_json::json!({"n": 2, "f": "() => 1"}));
    }

    #[test]
    fn json_writes_instance_fields() {
        let value = Value::from(Instance::new("Headers").with_field("A", "1"));
        assert_eq!(JsonSerializer.serialize(&value), "{\n  \"A\": \"1\"\n}");
    }

    #[test]
    fn closure_serializer() {
        let upper = |v: &Value| v.to_string().to_uppercase();
        assert_eq!(upper.serialize(&Value::from("abc")), "ABC");
    }
}
