//! Normalizes a job-submission result into an `(id, status)` pair.
//!
//! Submission results arrive in wildly different shapes depending on which
//! layer of the plan engine produced them: a plain JSON object, a JSON-encoded
//! string, a wrapped tool-output envelope (`content[0].text` holding JSON), or
//! a stringified struct like `PredictionOutput(id='...' status='...')`. This
//! module is the single source of truth for decoding all of them.

use regex::Regex;
use serde_json::Value;

use super::{JobHandle, JobStatus};

/// Best-effort extraction result. Absence is signaled by `None` fields,
/// never by an error; callers must treat a missing id as a hard failure
/// for their own flow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    pub id: Option<String>,
    pub status: Option<String>,
}

impl Submission {
    fn found(&self) -> bool {
        self.id.is_some() || self.status.is_some()
    }

    /// Convert into a pollable handle. Requires an id; a missing status is
    /// assumed to be `starting` (the submission just happened).
    pub fn into_handle(self) -> Option<JobHandle> {
        let id = self.id?;
        let status = self
            .status
            .map(|s| JobStatus::parse(&s))
            .unwrap_or(JobStatus::Starting);
        Some(JobHandle { id, status })
    }
}

/// Extract a prediction id and status from any submission result shape.
///
/// Priority order, first hit wins:
/// 1. direct `id`/`status` fields on an object
/// 2. wrapped tool envelope: `content[0].text` holding JSON (object or
///    two-element `[id, status]` array)
/// 3. string values: JSON-parse and retry 1/2 on the parsed structure
/// 4. regex over the display form (`id='...'`, `"id": "..."`, pair array)
///
/// Pure and infallible by contract.
pub fn extract_id_and_status(value: &Value) -> Submission {
    let direct = decode_direct(value);
    if direct.found() {
        return direct;
    }

    if let Some(inner) = unwrap_envelope(value) {
        let from_envelope = decode_direct(&inner);
        if from_envelope.found() {
            return from_envelope;
        }
        if let Some(pair) = decode_pair(&inner) {
            return pair;
        }
    }

    if let Value::String(text) = value {
        if let Ok(parsed) = serde_json::from_str::<Value>(text) {
            // Guard against a JSON string that parses to another string
            if !parsed.is_string() {
                let nested = extract_id_and_status(&parsed);
                if nested.found() {
                    return nested;
                }
            }
        }
        return regex_fallback(text);
    }

    if let Some(pair) = decode_pair(value) {
        return pair;
    }

    regex_fallback(&value.to_string())
}

/// Shape 1: an object carrying `id` / `status` fields directly.
fn decode_direct(value: &Value) -> Submission {
    let Some(map) = value.as_object() else {
        return Submission::default();
    };
    Submission {
        id: map.get("id").and_then(field_as_string),
        status: map.get("status").and_then(field_as_string),
    }
}

/// Shape 2: a wrapped tool envelope `{"content": [{"text": "<json>"}, ...]}`.
/// Returns the parsed inner JSON when present.
fn unwrap_envelope(value: &Value) -> Option<Value> {
    let text = value
        .as_object()?
        .get("content")?
        .as_array()?
        .first()?
        .as_object()?
        .get("text")?
        .as_str()?;
    serde_json::from_str(text).ok()
}

/// A bare two-element `["<id>", "<status>"]` array, as emitted by plan steps
/// instructed to "return exactly id and status".
fn decode_pair(value: &Value) -> Option<Submission> {
    let items = value.as_array()?;
    if items.len() < 2 {
        return None;
    }
    let id = items[0].as_str()?;
    let status = items[1].as_str()?;
    Some(Submission {
        id: Some(id.to_string()),
        status: Some(status.to_string()),
    })
}

/// Shape 4: last-resort regex search over the display form.
fn regex_fallback(text: &str) -> Submission {
    let pair = Regex::new(r#"\["([^"]+)",\s*"([^"]+)"\]"#).expect("pair array pattern");
    if let Some(cap) = pair.captures(text) {
        return Submission {
            id: Some(cap[1].to_string()),
            status: Some(cap[2].to_string()),
        };
    }

    let id_re = Regex::new(r#"(?:"id"|\bid)\s*[:=]\s*['"]([^'"]+)['"]"#).expect("id pattern");
    let status_re =
        Regex::new(r#"(?:"status"|\bstatus)\s*[:=]\s*['"]([^'"]+)['"]"#).expect("status pattern");

    Submission {
        id: id_re.captures(text).map(|cap| cap[1].to_string()),
        status: status_re.captures(text).map(|cap| cap[1].to_string()),
    }
}

fn field_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pair(id: &str, status: &str) -> Submission {
        Submission {
            id: Some(id.to_string()),
            status: Some(status.to_string()),
        }
    }

    #[test]
    fn test_direct_object() {
        let value = json!({"id": "abc123", "status": "starting"});
        assert_eq!(extract_id_and_status(&value), pair("abc123", "starting"));
    }

    #[test]
    fn test_json_string() {
        let value = json!(r#"{"id": "abc123", "status": "starting"}"#);
        assert_eq!(extract_id_and_status(&value), pair("abc123", "starting"));
    }

    #[test]
    fn test_tool_envelope_with_pair_array() {
        let value = json!({"content": [{"text": r#"["abc123", "starting"]"#}]});
        assert_eq!(extract_id_and_status(&value), pair("abc123", "starting"));
    }

    #[test]
    fn test_tool_envelope_with_object() {
        let value = json!({"content": [{"text": r#"{"id": "abc123", "status": "processing"}"#}]});
        assert_eq!(extract_id_and_status(&value), pair("abc123", "processing"));
    }

    #[test]
    fn test_doubly_wrapped_envelope_string() {
        // The whole envelope itself arriving JSON-encoded
        let envelope = json!({"content": [{"text": r#"["abc123", "starting"]"#}]}).to_string();
        let value = Value::String(envelope);
        assert_eq!(extract_id_and_status(&value), pair("abc123", "starting"));
    }

    #[test]
    fn test_bare_pair_array() {
        let value = json!(["abc123", "starting"]);
        assert_eq!(extract_id_and_status(&value), pair("abc123", "starting"));
    }

    #[test]
    fn test_repr_style_string() {
        let value = json!("PredictionOutput(id='abc123' status='processing')");
        assert_eq!(extract_id_and_status(&value), pair("abc123", "processing"));
    }

    #[test]
    fn test_shape_invariance() {
        let shapes = vec![
            json!({"id": "p1", "status": "starting"}),
            json!(r#"{"id": "p1", "status": "starting"}"#),
            json!({"content": [{"text": r#"["p1", "starting"]"#}]}),
            json!(["p1", "starting"]),
            json!("id='p1' status='starting'"),
        ];
        for shape in shapes {
            assert_eq!(
                extract_id_and_status(&shape),
                pair("p1", "starting"),
                "shape: {shape}"
            );
        }
    }

    #[test]
    fn test_nothing_recognizable() {
        for value in [
            json!(null),
            json!(42),
            json!("just some text"),
            json!({"foo": "bar"}),
            json!([1, 2, 3]),
            json!({"content": []}),
        ] {
            let found = extract_id_and_status(&value);
            assert_eq!(found, Submission::default(), "value: {value}");
        }
    }

    #[test]
    fn test_partial_status_only() {
        let value = json!({"status": "processing"});
        let found = extract_id_and_status(&value);
        assert_eq!(found.id, None);
        assert_eq!(found.status, Some("processing".to_string()));
        assert!(found.into_handle().is_none());
    }

    #[test]
    fn test_into_handle_defaults_status() {
        let found = Submission {
            id: Some("p9".to_string()),
            status: None,
        };
        let handle = found.into_handle().unwrap();
        assert_eq!(handle.id, "p9");
        assert_eq!(handle.status, JobStatus::Starting);
    }

    #[test]
    fn test_numeric_id_field() {
        let value = json!({"id": 12345, "status": "starting"});
        assert_eq!(extract_id_and_status(&value), pair("12345", "starting"));
    }
}
