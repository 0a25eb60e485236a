use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How a parameter may appear in a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParamModality {
    /// Filled in by the model, may be null.
    Auto,
    /// Pre-set by the institution, may be null.
    Fixed,
    /// May be omitted or null.
    Optional,
    /// Must be present and non-null. Unknown modalities land here too.
    #[default]
    #[serde(other)]
    Mandatory,
}

/// HTTP verb used by a request-backed tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// GET requests never carry a body.
    pub fn sends_body(&self) -> bool {
        !matches!(self, HttpMethod::Get)
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A single parameter as published by the institution tools registry.
///
/// `clazz` stays a raw string on the wire: the registry is free to send
/// kinds we do not know, and those are rejected when the tool is compiled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolParameter {
    #[serde(rename = "type", default, deserialize_with = "modality_or_mandatory")]
    pub modality: ParamModality,
    #[serde(default, deserialize_with = "null_as_default")]
    pub clazz: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub possible_values: Vec<String>,
}

/// Declarative description of a remote HTTP capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_request: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub method: HttpMethod,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub parameters: BTreeMap<String, ToolParameter>,
}

/// The registry sends `null` for fields it has no value for.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Anything that is not a known modality string, `null` included, is MANDATORY.
fn modality_or_mandatory<'de, D>(deserializer: D) -> Result<ParamModality, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(raw).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_registry_payload() {
        let raw = json!({
            "name": "getUser",
            "description": "Fetch a user",
            "isRequest": true,
            "method": "GET",
            "url": "http://svc/users/{id}",
            "parameters": {
                "id": { "type": "MANDATORY", "clazz": "NUMBER", "description": "user id" },
                "role": {
                    "type": "OPTIONAL",
                    "clazz": "ENUM",
                    "description": "role filter",
                    "possibleValues": ["STUDENT", "TEACHER"]
                }
            }
        });

        let descriptor: ToolDescriptor = serde_json::from_value(raw).unwrap();
        assert_eq!(descriptor.name, "getUser");
        assert!(descriptor.is_request);
        assert_eq!(descriptor.method, HttpMethod::Get);
        assert_eq!(descriptor.parameters.len(), 2);
        let role = &descriptor.parameters["role"];
        assert_eq!(role.modality, ParamModality::Optional);
        assert_eq!(role.possible_values, vec!["STUDENT", "TEACHER"]);
    }

    #[test]
    fn unknown_modality_is_mandatory() {
        let param: ToolParameter =
            serde_json::from_value(json!({ "type": "SOMETIMES", "clazz": "STRING" })).unwrap();
        assert_eq!(param.modality, ParamModality::Mandatory);
        assert!(param.description.is_empty());
        assert!(param.possible_values.is_empty());
    }

    #[test]
    fn declarative_tool_with_null_fields() {
        let descriptor: ToolDescriptor = serde_json::from_value(json!({
            "name": "openingHours",
            "description": null,
            "isRequest": false,
            "method": null,
            "url": null,
            "parameters": {}
        }))
        .unwrap();
        assert!(!descriptor.is_request);
        assert_eq!(descriptor.method, HttpMethod::Get);
        assert!(descriptor.url.is_empty());
        assert!(descriptor.description.is_empty());
    }

    #[test]
    fn parameter_with_null_fields() {
        let param: ToolParameter = serde_json::from_value(json!({
            "type": null,
            "clazz": "NUMBER",
            "description": null,
            "possibleValues": null
        }))
        .unwrap();
        assert_eq!(param.modality, ParamModality::Mandatory);
        assert!(param.description.is_empty());
        assert!(param.possible_values.is_empty());

        let param: ToolParameter =
            serde_json::from_value(json!({ "type": 3, "clazz": "STRING" })).unwrap();
        assert_eq!(param.modality, ParamModality::Mandatory);
    }

    #[test]
    fn one_null_entry_does_not_spoil_the_list() {
        let tools: Vec<ToolDescriptor> = serde_json::from_value(json!([
            { "name": "a", "isRequest": false, "method": null, "url": null },
            { "name": "b", "isRequest": true, "method": "POST", "url": "http://svc/b",
              "parameters": { "x": { "type": "OPTIONAL", "clazz": "STRING", "possibleValues": null } } }
        ]))
        .unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[1].parameters["x"].modality, ParamModality::Optional);
    }

    #[test]
    fn null_parameters_means_none() {
        let descriptor: ToolDescriptor = serde_json::from_value(json!({
            "name": "ping",
            "description": "",
            "isRequest": false,
            "method": "POST",
            "url": "http://svc/ping",
            "parameters": null
        }))
        .unwrap();
        assert!(descriptor.parameters.is_empty());
        assert!(descriptor.method.sends_body());
    }
}
