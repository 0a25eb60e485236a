use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::descriptor::{ParamModality, ToolParameter};
use super::error::ToolError;

/// The value shape a parameter accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum ParamKind {
    Number,
    String,
    Boolean,
    Enum(Vec<String>),
    Null,
}

impl ParamKind {
    /// Parse the registry's `clazz` string. Matching is case-insensitive.
    pub fn parse(tool: &str, param: &str, spec: &ToolParameter) -> Result<Self, ToolError> {
        match spec.clazz.to_ascii_uppercase().as_str() {
            "NUMBER" => Ok(ParamKind::Number),
            "STRING" => Ok(ParamKind::String),
            "BOOLEAN" => Ok(ParamKind::Boolean),
            "NULL" => Ok(ParamKind::Null),
            "ENUM" if spec.possible_values.is_empty() => Err(ToolError::InvalidDescriptor {
                tool: tool.to_string(),
                reason: format!("enum parameter '{param}' has no possible values"),
            }),
            "ENUM" => Ok(ParamKind::Enum(spec.possible_values.clone())),
            _ => Err(ToolError::UnsupportedParameterClass {
                tool: tool.to_string(),
                param: param.to_string(),
                clazz: spec.clazz.clone(),
            }),
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamKind::Number => value.is_number(),
            ParamKind::String => value.is_string(),
            ParamKind::Boolean => value.is_boolean(),
            ParamKind::Enum(values) => value
                .as_str()
                .is_some_and(|s| values.iter().any(|v| v == s)),
            ParamKind::Null => value.is_null(),
        }
    }

    fn json_type(&self) -> &'static str {
        match self {
            ParamKind::Number => "number",
            ParamKind::String | ParamKind::Enum(_) => "string",
            ParamKind::Boolean => "boolean",
            ParamKind::Null => "null",
        }
    }

    fn expected(&self) -> String {
        match self {
            ParamKind::Enum(values) => format!("one of [{}]", values.join(", ")),
            other => other.json_type().to_string(),
        }
    }
}

/// Whether a key must be present and whether it may hold `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    /// Present and non-null.
    Required,
    /// Present, null allowed.
    Nullable,
    /// May be absent or null.
    Optional,
}

impl From<ParamModality> for Presence {
    fn from(modality: ParamModality) -> Self {
        match modality {
            ParamModality::Auto | ParamModality::Fixed => Presence::Nullable,
            ParamModality::Optional => Presence::Optional,
            ParamModality::Mandatory => Presence::Required,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgSchema {
    pub name: String,
    pub kind: ParamKind,
    pub presence: Presence,
    pub description: String,
}

impl ArgSchema {
    pub fn from_parameter(tool: &str, name: &str, spec: &ToolParameter) -> Result<Self, ToolError> {
        Ok(Self {
            name: name.to_string(),
            kind: ParamKind::parse(tool, name, spec)?,
            presence: spec.modality.into(),
            description: spec.description.clone(),
        })
    }

    /// Check this argument inside `input`. `Ok(None)` means absent and allowed.
    fn check(&self, input: &Map<String, Value>) -> Result<Option<Value>, String> {
        let name = &self.name;
        match input.get(name) {
            None if self.presence == Presence::Optional => Ok(None),
            None => Err(format!("'{name}' is required")),
            Some(Value::Null) if self.kind == ParamKind::Null => Ok(Some(Value::Null)),
            Some(Value::Null) if self.presence == Presence::Required => {
                Err(format!("'{name}' must not be null"))
            }
            Some(Value::Null) => Ok(Some(Value::Null)),
            Some(value) if self.kind.accepts(value) => Ok(Some(value.clone())),
            Some(value) => Err(format!(
                "'{name}' expected {}, got {value}",
                self.kind.expected()
            )),
        }
    }

    fn json_schema(&self) -> Value {
        let ty = match (&self.kind, self.presence) {
            (ParamKind::Null, _) | (_, Presence::Required) => json!(self.kind.json_type()),
            (kind, _) => json!([kind.json_type(), "null"]),
        };
        let mut prop = Map::new();
        prop.insert("type".into(), ty);
        if !self.description.is_empty() {
            prop.insert("description".into(), json!(self.description));
        }
        if let ParamKind::Enum(values) = &self.kind {
            let mut allowed: Vec<Value> = values.iter().map(|v| json!(v)).collect();
            if self.presence != Presence::Required {
                allowed.push(Value::Null);
            }
            prop.insert("enum".into(), Value::Array(allowed));
        }
        Value::Object(prop)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub args: Vec<ArgSchema>,
}

/// Validate raw call arguments against `args`.
///
/// Returns only the declared keys; anything else in `input` is dropped.
/// A `null` input is treated as an empty object.
pub fn validate_args(args: &[ArgSchema], input: &Value) -> Result<Map<String, Value>, ToolError> {
    let empty = Map::new();
    let object = match input {
        Value::Object(map) => map,
        Value::Null => &empty,
        other => {
            return Err(ToolError::ParamsNotMatched(format!(
                "expected an object, got {other}"
            )));
        }
    };

    let mut problems = Vec::new();
    let mut validated = Map::new();
    for arg in args {
        match arg.check(object) {
            Ok(Some(value)) => {
                validated.insert(arg.name.clone(), value);
            }
            Ok(None) => {}
            Err(problem) => problems.push(problem),
        }
    }

    if problems.is_empty() {
        Ok(validated)
    } else {
        Err(ToolError::ParamsNotMatched(problems.join("; ")))
    }
}

/// Render `args` as the JSON Schema object used by function-calling APIs.
pub fn parameters_json_schema(args: &[ArgSchema]) -> Value {
    let properties: Map<String, Value> = args
        .iter()
        .map(|arg| (arg.name.clone(), arg.json_schema()))
        .collect();
    let required: Vec<&str> = args
        .iter()
        .filter(|arg| arg.presence != Presence::Optional)
        .map(|arg| arg.name.as_str())
        .collect();

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}
