//! Turns loosely formatted model output into the canonical result types.
//!
//! The model is asked for JSON but regularly wraps it in a markdown code
//! fence, and sometimes answers the transcription prompt with a bare list of
//! segments instead of the `{text, segments}` object. Both are accepted here
//! so nothing downstream has to care.

use serde_json::Value;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::pipeline::types::{SummaryResult, TranscriptSegment, TranscriptionResult};

const FENCE: &str = "```";

/// Removes a surrounding markdown code fence, tagged `json` or not. A missing
/// closing fence is tolerated.
pub fn strip_fence(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix(FENCE) {
        text = rest;
        if text.get(..4).is_some_and(|tag| tag.eq_ignore_ascii_case("json")) {
            text = &text[4..];
        }
    }
    if let Some(rest) = text.strip_suffix(FENCE) {
        text = rest;
    }
    text.trim()
}

/// Fence stripping followed by a strict JSON parse.
pub fn normalize(raw: &str, what: &'static str) -> Result<Value> {
    serde_json::from_str(strip_fence(raw)).map_err(|e| PipelineError::malformed(what, e))
}

/// The two shapes the transcription prompt comes back in.
#[derive(Debug)]
enum TranscriptionPayload {
    Document(TranscriptionResult),
    Segments(Vec<TranscriptSegment>),
}

impl TranscriptionPayload {
    fn decode(value: Value) -> Result<Self> {
        match value {
            Value::Object(_) => serde_json::from_value(value)
                .map(TranscriptionPayload::Document)
                .map_err(|e| PipelineError::malformed("transcription", e)),
            Value::Array(_) => serde_json::from_value(value)
                .map(TranscriptionPayload::Segments)
                .map_err(|e| PipelineError::malformed("transcription", e)),
            other => Err(PipelineError::malformed(
                "transcription",
                format!("expected an object or a list of segments, got {}", json_type(&other)),
            )),
        }
    }

    fn into_result(self) -> TranscriptionResult {
        match self {
            TranscriptionPayload::Document(result) => result,
            TranscriptionPayload::Segments(segments) => {
                info!("Model returned a bare segment list, rebuilding transcription object");
                let text = segments
                    .iter()
                    .map(|s| s.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                TranscriptionResult { text, segments }
            }
        }
    }
}

pub fn normalize_transcription(raw: &str) -> Result<TranscriptionResult> {
    let value = normalize(raw, "transcription")?;
    let result = TranscriptionPayload::decode(value)?.into_result();
    info!("Transcription normalized ({} segments)", result.segments.len());
    Ok(result)
}

pub fn normalize_summary(raw: &str) -> Result<SummaryResult> {
    let value = normalize(raw, "summary")?;
    if !value.is_object() {
        return Err(PipelineError::malformed(
            "summary",
            format!("expected an object, got {}", json_type(&value)),
        ));
    }
    let summary: SummaryResult =
        serde_json::from_value(value).map_err(|e| PipelineError::malformed("summary", e))?;
    info!(
        "Summary normalized ({} sections, {} key points)",
        summary.sections.len(),
        summary.key_points.len()
    );
    Ok(summary)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const DOC: &str = r#"{"text":"hola mundo","segments":[{"start":0.0,"end":1.5,"text":"hola"},{"start":1.5,"end":2.0,"text":"mundo"}]}"#;

    #[test]
    fn test_strip_fence_variants() {
        assert_eq!(strip_fence(DOC), DOC);
        assert_eq!(strip_fence(&format!("```json\n{}\n```", DOC)), DOC);
        assert_eq!(strip_fence(&format!("```JSON\n{}\n```", DOC)), DOC);
        assert_eq!(strip_fence(&format!("```\n{}\n```", DOC)), DOC);
        assert_eq!(strip_fence(&format!("  ```json\n{}\n", DOC)), DOC);
        assert_eq!(strip_fence(&format!("{}\n```", DOC)), DOC);
    }

    #[test]
    fn test_fences_do_not_change_parsed_value() -> Result<()> {
        let inputs = [
            r#"{"a":[1,2,{"b":null}]}"#,
            r#"[1, "two", 3.5]"#,
            r#""just a string""#,
            "42",
        ];
        for json in inputs {
            let plain = normalize(json, "test")?;
            for wrapped in [
                format!("```\n{}\n```", json),
                format!("```json\n{}\n```", json),
                format!("```json\n{}", json),
            ] {
                assert_eq!(normalize(&wrapped, "test")?, plain, "fence: {:?}", wrapped);
            }
        }
        Ok(())
    }

    #[test]
    fn test_canonical_transcription() -> Result<()> {
        let result = normalize_transcription(&format!("```json\n{}\n```", DOC))?;
        assert_eq!(result.text, "hola mundo");
        assert_eq!(result.segments.len(), 2);
        assert_eq!(result.segments[1].start, 1.5);
        Ok(())
    }

    #[test]
    fn test_segment_list_is_reshaped() -> Result<()> {
        let raw = r#"[{"start":0.0,"end":1.0,"text":"a"},{"start":1.0,"end":2.0,"text":"b"}]"#;
        let result = normalize_transcription(raw)?;

        assert_eq!(result.text, "a b");
        assert_eq!(
            result.segments,
            vec![
                TranscriptSegment { start: 0.0, end: 1.0, text: "a".to_string() },
                TranscriptSegment { start: 1.0, end: 2.0, text: "b".to_string() },
            ]
        );

        let as_json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            as_json,
            serde_json::json!({
                "text": "a b",
                "segments": [
                    {"start": 0.0, "end": 1.0, "text": "a"},
                    {"start": 1.0, "end": 2.0, "text": "b"}
                ]
            })
        );
        Ok(())
    }

    #[test]
    fn test_empty_segment_list() -> Result<()> {
        let result = normalize_transcription("[]")?;
        assert_eq!(result.text, "");
        assert!(result.segments.is_empty());
        Ok(())
    }

    #[test]
    fn test_truncated_transcription_is_malformed() {
        let err = normalize_transcription(r#"{"text":"hola","segments":[{"start":0.0,"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[test]
    fn test_transcription_scalar_is_malformed() {
        let err = normalize_transcription(r#""hola""#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
        assert!(err.to_string().contains("a string"));
    }

    #[test]
    fn test_summary() -> Result<()> {
        let raw = r#"```json
        {
            "summary": "Resumen ejecutivo",
            "sections": [
                {"title": "Introducción", "start": 0.0, "content": "Presentación"},
                {"title": "Derivadas", "start": 90.0, "content": "Regla de la cadena"}
            ],
            "keyPoints": ["Punto 1", "Punto 2", "Punto 3"]
        }
        ```"#;
        let summary = normalize_summary(raw)?;

        assert_eq!(summary.summary, "Resumen ejecutivo");
        assert_eq!(summary.sections[1].start, 90.0);
        assert_eq!(summary.key_points.len(), 3);

        let as_json = serde_json::to_value(&summary).unwrap();
        assert!(as_json.get("keyPoints").is_some());
        Ok(())
    }

    #[test]
    fn test_summary_missing_fields() {
        let err = normalize_summary(r#"{"sections": []}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);

        let err = normalize_summary(r#"[{"summary": "x"}]"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[test]
    fn test_summary_optional_lists_default_to_empty() -> Result<()> {
        let summary = normalize_summary(r#"{"summary": "corto"}"#)?;
        assert!(summary.sections.is_empty());
        assert!(summary.key_points.is_empty());
        Ok(())
    }
}
