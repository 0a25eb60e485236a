use serde_json::{Map, Value};

use super::descriptor::HttpMethod;
use super::error::ToolError;
use super::schema::ArgSchema;

/// Substitute `{name}` placeholders in `template`.
///
/// Every declared argument replaces all of its placeholders with the
/// URL-encoded value, or with nothing when the value is null or absent.
/// Placeholders naming no declared argument are left untouched.
pub fn render_url(template: &str, args: &[ArgSchema], values: &Map<String, Value>) -> String {
    let mut url = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.name);
        if !url.contains(&placeholder) {
            continue;
        }
        let replacement = match values.get(&arg.name) {
            None | Some(Value::Null) => String::new(),
            Some(value) => urlencoding::encode(&display_value(value)).into_owned(),
        };
        url = url.replace(&placeholder, &replacement);
    }
    url
}

/// Names of every `{...}` placeholder in `template`, in order of appearance.
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                if !name.is_empty() && !name.contains('{') {
                    found.push(name);
                }
                rest = &after[close + 1..];
            }
            None => break,
        }
    }
    found
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            // 7.0 renders as 7, the way the model meant it.
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                (f as i64).to_string()
            }
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// The HTTP half of a request-backed tool.
#[derive(Debug, Clone)]
pub struct HttpInvoker {
    pub(crate) client: reqwest::Client,
    pub(crate) method: HttpMethod,
    pub(crate) url: String,
}

impl HttpInvoker {
    pub fn new(client: reqwest::Client, method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            client,
            method,
            url: url.into(),
        }
    }

    /// Issue the request for already-validated `values` and return the JSON
    /// response re-serialized as text.
    pub async fn invoke(
        &self,
        tool: &str,
        args: &[ArgSchema],
        values: Map<String, Value>,
    ) -> Result<String, ToolError> {
        let url = render_url(&self.url, args, &values);
        tracing::debug!(tool, method = self.method.as_str(), %url, "invoking tool endpoint");

        let mut request = self
            .client
            .request(self.method.into(), &url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if self.method.sends_body() {
            // Absent arguments never made it into `values`; nulls are kept.
            request = request.json(&values);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(tool, %url, error = %e, "tool request failed");
            ToolError::execution(tool, e)
        })?;

        let status = response.status();
        tracing::debug!(tool, status = status.as_u16(), "tool endpoint responded");
        if !status.is_success() {
            tracing::error!(tool, %url, status = status.as_u16(), "tool endpoint returned an error status");
            return Err(ToolError::execution(tool, format!("HTTP status {status}")));
        }

        let body: Value = response.json().await.map_err(|e| {
            tracing::error!(tool, %url, error = %e, "tool endpoint returned malformed JSON");
            ToolError::execution(tool, e)
        })?;
        serde_json::to_string(&body).map_err(|e| ToolError::execution(tool, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::schema::{ParamKind, Presence};
    use serde_json::json;

    fn id_arg() -> Vec<ArgSchema> {
        vec![ArgSchema {
            name: "id".into(),
            kind: ParamKind::Number,
            presence: Presence::Nullable,
            description: String::new(),
        }]
    }

    fn values(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn substitutes_number() {
        let url = render_url("/x/{id}/y", &id_arg(), &values(json!({ "id": 42 })));
        assert_eq!(url, "/x/42/y");
    }

    #[test]
    fn integral_float_renders_as_integer() {
        let url = render_url("/users/{id}", &id_arg(), &values(json!({ "id": 7.0 })));
        assert_eq!(url, "/users/7");
        let url = render_url("/users/{id}", &id_arg(), &values(json!({ "id": 7.5 })));
        assert_eq!(url, "/users/7.5");
    }

    #[test]
    fn null_and_absent_become_empty() {
        assert_eq!(
            render_url("/x/{id}/y", &id_arg(), &values(json!({ "id": null }))),
            "/x//y"
        );
        assert_eq!(render_url("/x/{id}/y", &id_arg(), &Map::new()), "/x//y");
    }

    #[test]
    fn replaces_every_occurrence_and_encodes() {
        let args = vec![ArgSchema {
            name: "q".into(),
            kind: ParamKind::String,
            presence: Presence::Required,
            description: String::new(),
        }];
        let url = render_url("/s/{q}?again={q}", &args, &values(json!({ "q": "a b/c" })));
        assert_eq!(url, "/s/a%20b%2Fc?again=a%20b%2Fc");
    }

    #[test]
    fn unknown_placeholder_stays_literal() {
        let url = render_url("/x/{id}/{other}", &id_arg(), &values(json!({ "id": 1 })));
        assert_eq!(url, "/x/1/{other}");
    }

    #[test]
    fn finds_placeholders() {
        assert_eq!(placeholders("http://h/{a}/b/{c}"), vec!["a", "c"]);
        assert!(placeholders("http://h/{}/open{").is_empty());
    }
}
