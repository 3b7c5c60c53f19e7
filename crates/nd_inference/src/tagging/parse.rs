use nd_core::Judgment;
use serde_json::{Map, Value};

use crate::error::TaggingError;

/// Drop a surrounding markdown fence, with or without a language tag.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the info string (`json`) up to the first newline.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// The outermost `{ ... }` span, for answers wrapped in prose.
fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn parse_object(raw: &str) -> Result<Map<String, Value>, TaggingError> {
    let text = strip_code_fences(raw);
    let parsed = match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => return Ok(map),
        Ok(_) => Err(TaggingError::MalformedResponse("expected a JSON object".to_string())),
        Err(e) => Err(TaggingError::MalformedResponse(format!("invalid JSON: {}", e))),
    };

    match outermost_object(text).map(serde_json::from_str::<Value>) {
        Some(Ok(Value::Object(map))) => Ok(map),
        _ => parsed,
    }
}

fn coerce_confidence(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Turn a provider's raw text into a validated judgment.
pub fn parse_judgment(raw: &str) -> Result<Judgment, TaggingError> {
    let object = parse_object(raw)?;

    let reason = match object.get("reason") {
        Some(Value::String(reason)) => reason.clone(),
        Some(other) => {
            return Err(TaggingError::MalformedResponse(format!(
                "`reason` must be a string, got {}",
                other
            )))
        }
        None => return Err(TaggingError::MalformedResponse("missing `reason`".to_string())),
    };

    let confidence = coerce_confidence(object.get("confidence"));
    if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
        return Err(TaggingError::Validation(format!(
            "`confidence` must be between 0 and 1, got {}",
            confidence
        )));
    }

    let matched = match object.get("match") {
        Some(Value::Bool(matched)) => *matched,
        Some(other) => {
            return Err(TaggingError::Validation(format!(
                "`match` must be a boolean, got {}",
                other
            )))
        }
        None => return Err(TaggingError::Validation("missing `match`".to_string())),
    };

    Ok(Judgment::new(matched, confidence as f32, reason))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_object() {
        let judgment = parse_judgment(r#"{"match": true, "confidence": 0.82, "reason": "mentions \"trial\""}"#).unwrap();
        assert_eq!(judgment.matched, Some(true));
        assert!((judgment.confidence.unwrap() - 0.82).abs() < 1e-6);
        assert_eq!(judgment.reason, "mentions \"trial\"");
    }

    #[test]
    fn test_fenced_object() {
        let raw = "```json\n{\"match\": false, \"confidence\": 0.1, \"reason\": \"off topic\"}\n```";
        let judgment = parse_judgment(raw).unwrap();
        assert_eq!(judgment.matched, Some(false));

        let bare = "```\n{\"match\": true, \"confidence\": 1, \"reason\": \"r\"}\n```";
        assert_eq!(parse_judgment(bare).unwrap().confidence, Some(1.0));
    }

    #[test]
    fn test_object_inside_prose() {
        let raw = "Sure! Here is my answer: {\"match\": true, \"confidence\": \"0.6\", \"reason\": \"r\"} Hope it helps.";
        let judgment = parse_judgment(raw).unwrap();
        assert_eq!(judgment.confidence, Some(0.6));
    }

    #[test]
    fn test_confidence_coercion_defaults_to_zero() {
        let missing = parse_judgment(r#"{"match": true, "reason": "r"}"#).unwrap();
        assert_eq!(missing.confidence, Some(0.0));
        let garbage = parse_judgment(r#"{"match": true, "confidence": "high", "reason": "r"}"#).unwrap();
        assert_eq!(garbage.confidence, Some(0.0));
    }

    #[test]
    fn test_validation_failures() {
        assert!(matches!(
            parse_judgment(r#"{"match": true, "confidence": 1.5, "reason": "r"}"#),
            Err(TaggingError::Validation(_))
        ));
        assert!(matches!(
            parse_judgment(r#"{"match": true, "confidence": -0.1, "reason": "r"}"#),
            Err(TaggingError::Validation(_))
        ));
        assert!(matches!(
            parse_judgment(r#"{"match": "yes", "confidence": 0.5, "reason": "r"}"#),
            Err(TaggingError::Validation(_))
        ));
        assert!(matches!(
            parse_judgment(r#"{"confidence": 0.5, "reason": "r"}"#),
            Err(TaggingError::Validation(_))
        ));
    }

    #[test]
    fn test_malformed_failures() {
        assert!(matches!(parse_judgment("I think so."), Err(TaggingError::MalformedResponse(_))));
        assert!(matches!(parse_judgment("[1, 2]"), Err(TaggingError::MalformedResponse(_))));
        assert!(matches!(
            parse_judgment(r#"{"match": true, "confidence": 0.5}"#),
            Err(TaggingError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_judgment(r#"{"match": true, "confidence": 0.5, "reason": 3}"#),
            Err(TaggingError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("  {\"a\": 1}  "), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("```{}```"), "{}");
    }
}
