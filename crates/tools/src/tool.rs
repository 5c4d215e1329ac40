//! Tool trait and specification.

use crate::{Result, ToolError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool definition exposed to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema for the argument payload: an object with typed
    /// `properties` and a `required` list.
    pub schema: Value,
}

/// A named, schema-described operation the model may request.
///
/// Implementations validate their own argument payload and fail with
/// [`ToolError::InvalidInput`] when it is malformed.
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn schema(&self) -> Value;

    /// Run the tool, returning text to feed back to the model.
    fn execute(&self, input: Value) -> Result<String>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            schema: self.schema(),
        }
    }
}

/// Decode a tool's argument payload.
///
/// A missing payload (`null`) decodes as an empty object so tools whose
/// fields are all optional can be called without arguments. A string
/// payload holding a JSON object is decoded as that object.
pub fn parse_input<T: DeserializeOwned>(input: Value) -> Result<T> {
    let input = match input {
        Value::Null => Value::Object(Default::default()),
        Value::String(text) => {
            serde_json::from_str(&text).map_err(|e| ToolError::InvalidInput(e.to_string()))?
        }
        other => other,
    };
    serde_json::from_value(input).map_err(|e| ToolError::InvalidInput(e.to_string()))
}

/// Build an object schema from `(name, type, description)` properties.
pub(crate) fn object_schema(properties: &[(&str, &str, &str)], required: &[&str]) -> Value {
    let properties: serde_json::Map<String, Value> = properties
        .iter()
        .map(|(name, kind, description)| {
            (
                name.to_string(),
                serde_json::json!({ "type": kind, "description": description }),
            )
        })
        .collect();
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Input {
        #[serde(default)]
        path: String,
    }

    #[test]
    fn null_payload_is_empty_object() {
        let input: Input = parse_input(Value::Null).unwrap();
        assert_eq!(input.path, "");
    }

    #[test]
    fn string_payload_is_decoded() {
        let input: Input = parse_input(json!(r#"{"path": "src"}"#)).unwrap();
        assert_eq!(input.path, "src");
    }

    #[test]
    fn wrong_shape_is_invalid_input() {
        let err = parse_input::<Input>(json!([1, 2])).unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[test]
    fn schema_lists_required_fields() {
        let schema = object_schema(&[("path", "string", "a path")], &["path"]);
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["path"]["type"], "string");
        assert_eq!(schema["required"], json!(["path"]));
    }
}
