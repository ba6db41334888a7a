use serde::{Deserialize, Serialize};

/// The payload flowing along a pipe edge. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Value {
    Text { text: String },
    Json { value: serde_json::Value },
    Unit,
}

impl Value {
    pub fn text(text: impl Into<String>) -> Self {
        Value::Text { text: text.into() }
    }

    pub fn json(value: serde_json::Value) -> Self {
        Value::Json { value }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Value::Unit)
    }

    /// Flatten to plain text, the form handlers receive as piped input.
    pub fn render(&self) -> String {
        match self {
            Value::Text { text } => text.clone(),
            Value::Json { value } => value.to_string(),
            Value::Unit => String::new(),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Unit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_text() {
        assert_eq!(Value::text("hello").render(), "hello");
        assert_eq!(Value::Unit.render(), "");
    }

    #[test]
    fn test_render_json() {
        let v = Value::json(serde_json::json!({"k": 1}));
        assert_eq!(v.render(), r#"{"k":1}"#);
    }

    #[test]
    fn test_serde_roundtrip() {
        let v = Value::text("payload");
        let s = serde_json::to_string(&v).unwrap();
        let back: Value = serde_json::from_str(&s).unwrap();
        assert_eq!(v, back);
    }
}
