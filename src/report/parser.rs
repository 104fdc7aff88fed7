use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::models::Report;

/// First `{` through the last `}`: greedy, not brace-balanced.
static OBJECT_SPAN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// Turn raw model output into a [`Report`]. Never fails.
///
/// Code fences are stripped, the outermost `{...}` span is parsed as JSON and
/// each key is taken if truthy. Output that does not parse to a JSON object
/// becomes the summary verbatim (untrimmed), with the other two fields empty.
pub fn normalize_report(raw: &str) -> Report {
    let cleaned = strip_code_fence(raw.trim());
    let candidate = OBJECT_SPAN
        .find(cleaned)
        .map(|m| m.as_str())
        .unwrap_or(cleaned);

    match serde_json::from_str::<Value>(candidate) {
        Ok(value @ Value::Object(_)) => Report {
            summary: truthy_text(value.get("summary")),
            cause: truthy_text(value.get("cause")),
            suggested_actions: truthy_text(value.get("suggestedActions")),
        },
        _ => Report {
            summary: raw.to_string(),
            ..Report::default()
        },
    }
}

fn strip_code_fence(text: &str) -> &str {
    let body = if let Some(rest) = text.strip_prefix("```json") {
        rest
    } else if let Some(rest) = text.strip_prefix("```") {
        rest
    } else {
        return text;
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Strings pass through; other truthy values (non-zero numbers, `true`,
/// arrays, objects) become their JSON text; falsy values become "".
fn truthy_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => String::new(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(summary: &str, cause: &str, actions: &str) -> Report {
        Report {
            summary: summary.into(),
            cause: cause.into(),
            suggested_actions: actions.into(),
        }
    }

    #[test]
    fn plain_object_passes_through() {
        let raw = r#"{"summary":"Clear lungs","cause":"None","suggestedActions":"Reassure"}"#;
        assert_eq!(normalize_report(raw), report("Clear lungs", "None", "Reassure"));
    }

    #[test]
    fn json_fence_is_stripped() {
        let raw = "```json\n{\"summary\":\"S\",\"cause\":\"C\",\"suggestedActions\":\"A\"}\n```";
        assert_eq!(normalize_report(raw), report("S", "C", "A"));
    }

    #[test]
    fn bare_fence_and_surrounding_prose_are_tolerated() {
        let raw = "```\nHere you go:\n{\"summary\":\"S\",\"cause\":\"C\",\"suggestedActions\":\"A\"}\nThanks\n```";
        assert_eq!(normalize_report(raw), report("S", "C", "A"));
    }

    #[test]
    fn missing_keys_become_empty() {
        assert_eq!(
            normalize_report(r#"{"summary":"Only summary"}"#),
            report("Only summary", "", "")
        );
        assert_eq!(
            normalize_report(r#"{"cause":"Only cause","extra":1}"#),
            report("", "Only cause", "")
        );
    }

    #[test]
    fn falsy_values_become_empty_and_truthy_ones_become_text() {
        let raw = r#"{"summary":"","cause":0,"suggestedActions":["rest","fluids"]}"#;
        assert_eq!(normalize_report(raw), report("", "", r#"["rest","fluids"]"#));

        let raw = r#"{"summary":false,"cause":null,"suggestedActions":{"step":1}}"#;
        assert_eq!(normalize_report(raw), report("", "", r#"{"step":1}"#));

        assert_eq!(normalize_report(r#"{"summary":2.5}"#).summary, "2.5");
    }

    #[test]
    fn text_without_braces_becomes_summary() {
        let raw = "  The lungs look clear.  ";
        assert_eq!(normalize_report(raw), report(raw, "", ""));
    }

    #[test]
    fn greedy_span_over_two_objects_falls_back_to_raw() {
        let raw = r#"{"a":1} trailing {"b":2}"#;
        assert_eq!(normalize_report(raw), report(raw, "", ""));
    }

    #[test]
    fn unparseable_span_keeps_untrimmed_raw() {
        let raw = "\n{summary: unquoted}\n";
        assert_eq!(normalize_report(raw).summary, raw);
    }

    #[test]
    fn bare_json_scalar_becomes_summary() {
        let raw = "\"just text\"";
        assert_eq!(normalize_report(raw), report(raw, "", ""));
        for raw in ["42", "true", "null", "[1, 2]"] {
            assert_eq!(normalize_report(raw), report(raw, "", ""));
        }
    }

    #[test]
    fn fenced_scalar_keeps_the_fence_in_summary() {
        let raw = "```json\n\"just text\"\n```";
        assert_eq!(normalize_report(raw), report(raw, "", ""));
    }
}
