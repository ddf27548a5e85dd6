//! Narrative insight generation seam.
//!
//! The upstream text-generation endpoint returns free prose expected to
//! contain one embedded JSON object matching [`InsightPayload`]. Extraction
//! and parsing live here so the rest of the engine never handles raw model
//! output: an unparseable response degrades to the truncated raw text as the
//! summary, and a failed call degrades to no narrative at all. Structured
//! metrics are never blocked on this seam.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Characters of raw text kept as the fallback summary
const FALLBACK_SUMMARY_LIMIT: usize = 400;

/// Upstream text-generation failure. Non-fatal to the calling operation.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Upstream generation failed: {0}")]
    Upstream(String),

    #[error("Upstream returned an empty response")]
    Empty,
}

/// Text-generation collaborator: prompt in, free text out.
pub trait InsightGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Verdict scale used across step narratives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Strong,
    Good,
    Marginal,
    Weak,
    Poor,
}

/// Structured insight payload embedded in the upstream response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightPayload {
    pub summary: String,
    pub verdict: Verdict,
    /// 0–100 where present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_context: Option<String>,
}

/// Parse an upstream response into a payload. Falls back to the truncated
/// raw text with a `good` verdict when no well-formed payload is embedded;
/// this function never fails on malformed prose.
pub fn parse_response(raw: &str) -> InsightPayload {
    if let Some(json) = extract_json_object(raw) {
        if let Ok(payload) = serde_json::from_str::<InsightPayload>(json) {
            return payload;
        }
    }

    log::warn!("insight response carried no parseable payload; degrading to raw summary");

    InsightPayload {
        summary: truncate(raw.trim(), FALLBACK_SUMMARY_LIMIT),
        verdict: Verdict::Good,
        score: None,
        insights: Vec::new(),
        recommendations: Vec::new(),
        risks: Vec::new(),
        market_context: None,
    }
}

/// Call the generator and parse whatever comes back. `Err` only when the
/// upstream call itself failed.
pub fn request_insights(
    generator: &dyn InsightGenerator,
    prompt: &str,
) -> Result<InsightPayload, GenerationError> {
    let raw = generator.generate(prompt)?;
    if raw.trim().is_empty() {
        return Err(GenerationError::Empty);
    }
    Ok(parse_response(&raw))
}

/// Slice out the first balanced JSON object in the text, respecting string
/// literals and escapes.
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let bytes = raw.as_bytes();

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

fn truncate(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    // Cut on a char boundary at or below the limit
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_embedded_payload() {
        let raw = r#"Here is my assessment of the scheme:
{"summary": "Viable conversion", "verdict": "strong", "score": 82,
 "insights": ["High margin"], "recommendations": [], "risks": ["Article 4 pending"],
 "marketContext": "Stable regional demand"}
Let me know if you need more detail."#;

        let payload = parse_response(raw);
        assert_eq!(payload.summary, "Viable conversion");
        assert_eq!(payload.verdict, Verdict::Strong);
        assert_eq!(payload.score, Some(82));
        assert_eq!(payload.insights, vec!["High margin".to_string()]);
        assert_eq!(payload.market_context.as_deref(), Some("Stable regional demand"));
    }

    #[test]
    fn test_braces_inside_strings_do_not_confuse_extraction() {
        let raw = r#"{"summary": "Uses {placeholders} and \"quotes\"", "verdict": "good"}"#;
        let payload = parse_response(raw);
        assert_eq!(payload.summary, "Uses {placeholders} and \"quotes\"");
        assert_eq!(payload.verdict, Verdict::Good);
    }

    #[test]
    fn test_malformed_json_degrades_to_raw_summary() {
        let raw = "The scheme looks { broadly viable but I ran out of tokens";
        let payload = parse_response(raw);
        assert_eq!(payload.summary, raw);
        assert_eq!(payload.verdict, Verdict::Good);
        assert!(payload.score.is_none());
    }

    #[test]
    fn test_prose_without_json_degrades() {
        let raw = "A thoroughly decent scheme with sensible leverage.";
        let payload = parse_response(raw);
        assert_eq!(payload.summary, raw);
        assert_eq!(payload.verdict, Verdict::Good);
    }

    #[test]
    fn test_fallback_summary_is_truncated() {
        let raw = "x".repeat(FALLBACK_SUMMARY_LIMIT * 2);
        let payload = parse_response(&raw);
        assert_eq!(payload.summary.len(), FALLBACK_SUMMARY_LIMIT);
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let raw = r#"{"summary": "Short", "verdict": "marginal"}"#;
        let payload = parse_response(raw);
        assert_eq!(payload.verdict, Verdict::Marginal);
        assert!(payload.insights.is_empty());
        assert!(payload.recommendations.is_empty());
        assert!(payload.risks.is_empty());
        assert!(payload.market_context.is_none());
    }

    struct FailingGenerator;

    impl InsightGenerator for FailingGenerator {
        fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            Err(GenerationError::Upstream("503".into()))
        }
    }

    struct EmptyGenerator;

    impl InsightGenerator for EmptyGenerator {
        fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            Ok("   ".into())
        }
    }

    #[test]
    fn test_request_insights_propagates_upstream_failure() {
        let err = request_insights(&FailingGenerator, "prompt").unwrap_err();
        assert!(matches!(err, GenerationError::Upstream(_)));
    }

    #[test]
    fn test_request_insights_rejects_blank_response() {
        let err = request_insights(&EmptyGenerator, "prompt").unwrap_err();
        assert!(matches!(err, GenerationError::Empty));
    }
}
